//! Per-request dispatch: mock routes, then the routing decision, then
//! static serving or proxy forwarding.

use std::convert::Infallible;
use std::path::Path;

use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use tracing::debug;

use crate::mock::{MockRouter, ScriptRequest};
use crate::routing::{RoutePlanner, RoutingDecision};

use super::client::HttpClient;
use super::{forward, static_files};

/// Borrowed server state handed to the request handler.
pub struct RequestHandlerContext<'a> {
    pub planner: &'a RoutePlanner,
    pub mocks: &'a MockRouter,
    pub client: &'a HttpClient,
    pub content_base: &'a Path,
}

pub async fn handle_request(
    ctx: &RequestHandlerContext<'_>,
    req: Request<Incoming>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
    let uri = req.uri().clone();

    // Mock routes sit ahead of the proxy, so a host+path carrying both an
    // ajax-mock and a file-proxy rule is answered by the mock.
    let script_request =
        ScriptRequest::new(req.method().as_str(), uri.path(), uri.query(), req.headers());
    if let Some(response) = ctx.mocks.respond(&script_request) {
        debug!("Mocked {} {}", req.method(), uri.path());
        return Ok(
            response.map(|body| BoxBody::new(body.map_err(|never: Infallible| match never {})))
        );
    }

    match ctx.planner.decide(&uri) {
        RoutingDecision::Local { .. } => {
            Ok(static_files::serve(ctx.content_base, req.method(), uri.path()).await)
        }
        RoutingDecision::ProxyTo { target } => Ok(forward::forward(ctx.client, req, &target).await),
        RoutingDecision::Passthrough { target } => {
            debug!("Passing through to {}", target);
            Ok(forward::forward(ctx.client, req, &target).await)
        }
    }
}
