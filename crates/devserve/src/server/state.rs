//! Shared application state injected into every Axum handler.

use std::{path::PathBuf, sync::Arc};

use tower_http::services::ServeDir;

/// Application state shared across all request handlers.
///
/// Both fields are cheap to clone, so Axum can clone the state per request.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Canonical, absolute root of the served tree.
    pub root: Arc<PathBuf>,
    /// Static-file service rooted at `root`.
    pub files: ServeDir,
}

impl AppState {
    /// Create state serving `root`, which must already be canonical.
    pub fn new(root: PathBuf) -> Self {
        let files = ServeDir::new(&root).append_index_html_on_directories(true);
        Self {
            root: Arc::new(root),
            files,
        }
    }
}
