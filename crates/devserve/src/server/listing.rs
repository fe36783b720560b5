//! HTML directory listings for directories without an `index.html`.

use std::{fmt::Write as _, io, path::Path};

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use html_escape::encode_text;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped in a single path segment of an `href`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

struct Entry {
    name: String,
    is_dir: bool,
    is_symlink: bool,
}

/// Render the listing page for `dir`, titled with the decoded `request_path`.
///
/// Entries are sorted case-insensitively. Directories link with a trailing
/// `/` and are shown with one; symlinks are shown with a trailing `@`.
pub async fn render(dir: &Path, request_path: &str) -> io::Result<String> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let is_symlink = entry.file_type().await?.is_symlink();
        // Follows symlinks; a dangling link is listed as a plain entry.
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }
    entries.sort_by_key(|e| e.name.to_lowercase());

    let title = encode_text(request_path);
    let mut body = String::new();
    let _ = write!(
        body,
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Directory listing for {title}</title>\n</head>\n<body>\n\
         <h1>Directory listing for {title}</h1>\n<hr>\n<ul>\n"
    );
    for entry in &entries {
        let mut href = utf8_percent_encode(&entry.name, SEGMENT).to_string();
        let mut label = entry.name.clone();
        if entry.is_dir {
            href.push('/');
            label.push('/');
        }
        if entry.is_symlink {
            label = format!("{}@", entry.name);
        }
        let _ = writeln!(
            body,
            "<li><a href=\"{href}\">{}</a></li>",
            encode_text(&label)
        );
    }
    body.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    Ok(body)
}

/// Wrap a rendered listing in a `200` response. `HEAD` requests get the
/// headers only.
pub fn response(html: String, head: bool) -> Response {
    let length = html.len();
    let body = if head { Body::empty() } else { Body::from(html) };
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        body,
    )
        .into_response()
}
