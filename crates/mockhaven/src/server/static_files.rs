//! Static content serving from the configured content base.

use std::path::{Component, Path, PathBuf};

use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use tracing::debug;

use super::forward::{error_response, full_body};

/// Resolve a request path under the content base, rejecting traversal.
fn resolve_path(content_base: &Path, request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    let relative = if trimmed.is_empty() {
        "index.html"
    } else {
        trimmed
    };

    let relative = Path::new(relative);
    if relative.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    }) {
        return None;
    }

    Some(content_base.join(relative))
}

pub async fn serve(
    content_base: &Path,
    method: &Method,
    request_path: &str,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    if method != Method::GET && method != Method::HEAD {
        return error_response(405, "Method Not Allowed");
    }

    let Some(path) = resolve_path(content_base, request_path) else {
        return error_response(403, "Forbidden");
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(_) => return error_response(404, "Not Found"),
    };
    // Guard against directory requests; also covers symlinked oddities.
    if !metadata.is_file() {
        return error_response(404, "Not Found");
    }

    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(_) => return error_response(404, "Not Found"),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    debug!("Serving {} ({})", path.display(), mime);

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", mime.as_ref())
        .body(full_body(Bytes::from(contents)))
        .unwrap()
}
