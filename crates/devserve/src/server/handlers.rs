//! Axum request handlers.

use std::{
    io,
    path::{Component, Path, PathBuf},
    str::Utf8Error,
};

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tower::ServiceExt;
use tracing::{debug, warn};

use super::{listing, state::AppState};

/// Why a request path could not be mapped to a file under the root.
#[derive(Debug, Error)]
pub enum PathError {
    /// The path uses `..` or resolves (through a symlink) outside the root.
    #[error("request path escapes the served root")]
    Traversal,

    /// The percent-decoded path is not valid UTF-8.
    #[error("request path is not valid UTF-8: {0}")]
    Malformed(#[from] Utf8Error),

    #[error("no such file or directory")]
    NotFound,

    #[error(transparent)]
    Io(io::Error),
}

/// Fallback for every request: directory listings for index-less directories,
/// static files for everything else.
///
/// Paths that escape the root are answered with `404`, the same as a missing
/// file. Everything the listing does not claim is delegated to
/// [`tower_http::services::ServeDir`], which owns MIME inference, range and
/// conditional requests, trailing-slash redirects (`301`), `404`, and `501`
/// for unsupported methods.
pub async fn serve(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_owned();

    match resolve(&state.root, &path).await {
        Err(err @ (PathError::Traversal | PathError::Malformed(_))) => {
            debug!(%path, error = %err, "rejected request path");
            return StatusCode::NOT_FOUND.into_response();
        }
        Ok(resolved) if wants_listing(request.method(), &path) => {
            if let Some(response) = listing_response(&resolved, &path, request.method()).await {
                return response;
            }
        }
        _ => {}
    }

    let mut response = match state.files.clone().oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };
    *response.status_mut() = classic_status(response.status());
    response
}

/// `ServeDir` answers unsupported methods with `405` and directory redirects
/// with `307`; report them as `501` and `301` like a classic file server.
fn classic_status(status: StatusCode) -> StatusCode {
    match status {
        StatusCode::METHOD_NOT_ALLOWED => StatusCode::NOT_IMPLEMENTED,
        StatusCode::TEMPORARY_REDIRECT => StatusCode::MOVED_PERMANENTLY,
        other => other,
    }
}

/// Listings are only produced for `GET`/`HEAD` on slash-terminated paths;
/// `ServeDir` redirects `/dir` to `/dir/` first.
fn wants_listing(method: &Method, path: &str) -> bool {
    (method == Method::GET || method == Method::HEAD) && path.ends_with('/')
}

/// Render a listing if `dir` is a directory without an `index.html`.
async fn listing_response(dir: &Path, request_path: &str, method: &Method) -> Option<Response> {
    let is_dir = tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return None;
    }
    let has_index = tokio::fs::metadata(dir.join("index.html"))
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if has_index {
        return None;
    }

    let display_path = percent_decode_str(request_path).decode_utf8_lossy();
    match listing::render(dir, &display_path).await {
        Ok(html) => Some(listing::response(html, method == Method::HEAD)),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to list directory");
            Some(StatusCode::NOT_FOUND.into_response())
        }
    }
}

/// Map a request path onto the filesystem and confirm it stays under `root`.
///
/// `root` must be canonical. Symlinks are followed, and the final target must
/// still lie under `root`.
///
/// # Errors
///
/// [`PathError::Traversal`] for `..` components or escaping symlinks,
/// [`PathError::Malformed`] for undecodable paths, [`PathError::NotFound`]
/// when nothing exists at the path.
pub async fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, PathError> {
    let relative = normalize(request_path)?;
    let canonical = tokio::fs::canonicalize(root.join(relative))
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PathError::NotFound,
            _ => PathError::Io(e),
        })?;

    if !canonical.starts_with(root) {
        return Err(PathError::Traversal);
    }
    Ok(canonical)
}

/// Percent-decode a URI path into a relative filesystem path made only of
/// normal components.
fn normalize(request_path: &str) -> Result<PathBuf, PathError> {
    let decoded = percent_decode_str(request_path).decode_utf8()?;

    let mut normalized = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) => normalized.push(segment),
            Component::RootDir | Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::Traversal)
            }
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header, Router};

    use crate::server::router;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    /// ```text
    /// root/
    ///   hello.txt
    ///   site/index.html
    ///   assets/app.js
    ///   assets/Nested Dir/
    /// ```
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("hello.txt"), "hello").unwrap();
        std::fs::create_dir_all(root.join("site")).unwrap();
        std::fs::write(root.join("site/index.html"), "<h1>site</h1>").unwrap();
        std::fs::create_dir_all(root.join("assets/Nested Dir")).unwrap();
        std::fs::write(root.join("assets/app.js"), "console.log(1)").unwrap();
        Fixture { _dir: dir, root }
    }

    fn app(fixture: &Fixture) -> Router {
        router::build(AppState::new(fixture.root.clone()))
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
        let req = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn normalize_allows_simple_paths() {
        let path = normalize("/assets/app.js").unwrap();
        assert_eq!(path, PathBuf::from("assets").join("app.js"));
    }

    #[test]
    fn normalize_handles_root() {
        assert!(normalize("/").unwrap().as_os_str().is_empty());
    }

    #[test]
    fn normalize_decodes_percent_escapes() {
        let path = normalize("/assets/Nested%20Dir/").unwrap();
        assert_eq!(path, PathBuf::from("assets").join("Nested Dir"));
    }

    #[test]
    fn normalize_rejects_traversal() {
        assert!(matches!(normalize("/../secret"), Err(PathError::Traversal)));
        assert!(matches!(normalize("/a/%2e%2e/%2e%2e/secret"), Err(PathError::Traversal)));
    }

    #[test]
    fn normalize_rejects_invalid_utf8() {
        assert!(matches!(normalize("/%FF"), Err(PathError::Malformed(_))));
    }

    #[tokio::test]
    async fn resolve_reports_missing_paths() {
        let fx = fixture();
        assert!(matches!(
            resolve(&fx.root, "/nope.txt").await,
            Err(PathError::NotFound)
        ));
        assert_eq!(
            resolve(&fx.root, "/hello.txt").await.unwrap(),
            fx.root.join("hello.txt")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_rejects_symlink_escaping_root() {
        let fx = fixture();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), fx.root.join("escape")).unwrap();

        assert!(matches!(
            resolve(&fx.root, "/escape/secret.txt").await,
            Err(PathError::Traversal)
        ));

        let resp = send(app(&fx), Method::GET, "/escape/secret.txt").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_returns_404() {
        let fx = fixture();
        let resp = send(app(&fx), Method::GET, "/%2e%2e/etc/passwd").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn serves_existing_file() {
        let fx = fixture();
        let resp = send(app(&fx), Method::GET, "/assets/app.js").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "console.log(1)");
    }

    #[tokio::test]
    async fn directory_with_index_serves_index() {
        let fx = fixture();
        let resp = send(app(&fx), Method::GET, "/site/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "<h1>site</h1>");
    }

    #[tokio::test]
    async fn directory_without_index_is_listed() {
        let fx = fixture();
        let resp = send(app(&fx), Method::GET, "/assets/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");

        let html = body_text(resp).await;
        assert!(html.contains("Directory listing for /assets/"));
        assert!(html.contains(r#"<a href="app.js">app.js</a>"#));
        assert!(html.contains(r#"<a href="Nested%20Dir/">Nested Dir/</a>"#));
    }

    #[tokio::test]
    async fn head_listing_has_no_body() {
        let fx = fixture();
        let resp = send(app(&fx), Method::HEAD, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn directory_without_trailing_slash_redirects() {
        let fx = fixture();
        let resp = send(app(&fx), Method::GET, "/assets").await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[header::LOCATION], "/assets/");
    }

    #[tokio::test]
    async fn options_is_not_listed() {
        let fx = fixture();
        let resp = send(app(&fx), Method::OPTIONS, "/assets/").await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
    }
}
