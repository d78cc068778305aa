//! Request forwarding for file-proxy and pass-through requests.

use std::convert::Infallible;

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response};
use tracing::{debug, error};

use super::client::HttpClient;

/// Helper to create a JSON error response.
pub fn error_response(status: u16, message: &str) -> Response<BoxBody<Bytes, hyper::Error>> {
    let body = format!(r#"{{"error": "{message}"}}"#);
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(full_body(Bytes::from(body)))
        .unwrap()
}

pub fn full_body(bytes: Bytes) -> BoxBody<Bytes, hyper::Error> {
    BoxBody::new(Full::new(bytes).map_err(|never: Infallible| match never {}))
}

/// Forward a request to `target` with a streaming body. The target URL
/// replaces the request target entirely; the route planner has already
/// folded in whatever path and query the destination should see.
pub async fn forward(
    client: &HttpClient,
    req: Request<hyper::body::Incoming>,
    target: &str,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let method = req.method().clone();
    let headers = req.headers().clone();

    debug!("Forwarding to: {}", target);

    let mut upstream_req = Request::builder().method(method).uri(target);

    // Copy headers (skip host)
    for (key, value) in headers.iter() {
        if key != "host" {
            upstream_req = upstream_req.header(key, value);
        }
    }

    let upstream_req = match upstream_req.body(BoxBody::new(req.into_body())) {
        Ok(upstream_req) => upstream_req,
        Err(e) => {
            error!("Failed to build upstream request for {target}: {e}");
            return error_response(502, "Bad Gateway");
        }
    };

    match client.request(upstream_req).await {
        Ok(upstream_response) => {
            let (parts, body) = upstream_response.into_parts();
            Response::from_parts(parts, BoxBody::new(body))
        }
        Err(e) => {
            error!("Failed to forward request to {target}: {e}");
            error_response(502, "Bad Gateway")
        }
    }
}
