//! Mock route table and JSON/JSONP response construction.
//!
//! One route is installed per ajax-mock path, covering all HTTP methods.
//! The router answers ahead of the proxy, so a host+path carrying both a
//! mock and a file-proxy rule is served by the mock.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{error, warn};

use crate::routing::AjaxMockTable;

use super::generate;
use super::script::{MockScript, ScriptRequest};

/// Callback names the JSONP body will echo; anything else is treated as
/// no callback, since the name lands verbatim in executable output.
static JSONP_CALLBACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.$]+$").unwrap());

enum MockPayload {
    Inline(Value),
    Script(MockScript),
    /// The script failed to load at startup; requests fall through unmocked.
    Unavailable,
}

struct MockRoute {
    jsonp_param: String,
    payload: MockPayload,
}

/// Request handlers for every ajax-mock path.
pub struct MockRouter {
    routes: HashMap<String, MockRoute>,
}

impl MockRouter {
    /// Build the route table, loading script payloads relative to `cwd`.
    /// Load failures are logged here, once, and leave the route unmocked.
    pub fn build(table: &AjaxMockTable, cwd: &Path) -> Self {
        let mut routes = HashMap::new();

        for (_host, _path, rule) in table.rules() {
            let payload = match &rule.mock {
                Value::String(file) => {
                    let file_path = cwd.join(file);
                    if file_path.exists() {
                        match MockScript::load(&file_path) {
                            Ok(script) => MockPayload::Script(script),
                            Err(e) => {
                                error!("[proxy-ajax] {e:#}");
                                MockPayload::Unavailable
                            }
                        }
                    } else {
                        warn!(
                            "[proxy-ajax] mock script not found: {}",
                            file_path.display()
                        );
                        MockPayload::Unavailable
                    }
                }
                template => MockPayload::Inline(template.clone()),
            };

            routes.insert(
                rule.target.clone(),
                MockRoute {
                    jsonp_param: rule.jsonp_param.clone(),
                    payload,
                },
            );
        }

        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Answer a request if a mock route covers its path. `None` lets the
    /// request fall through to routing and static serving.
    pub fn respond(&self, request: &ScriptRequest) -> Option<Response<Full<Bytes>>> {
        let route = self.routes.get(request.path.as_str())?;

        let data = match &route.payload {
            MockPayload::Inline(template) => Some(template.clone()),
            MockPayload::Script(script) => match script.payload(request) {
                Ok(Some(data)) => Some(data),
                Ok(None) => {
                    warn!(
                        "[proxy-ajax] no data produced by mock script {}",
                        script.source()
                    );
                    None
                }
                Err(e) => {
                    error!("[proxy-ajax] {e:#}");
                    None
                }
            },
            MockPayload::Unavailable => None,
        }?;

        let body = generate::materialize(&data);
        let json = match serde_json::to_string(&body) {
            Ok(json) => json,
            Err(e) => {
                error!("[proxy-ajax] failed to serialize mock body: {e}");
                return None;
            }
        };

        let callback = request
            .query
            .get(&route.jsonp_param)
            .filter(|value| JSONP_CALLBACK.is_match(value));

        let response = match callback {
            Some(callback) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/javascript; charset=utf-8")
                .body(Full::new(Bytes::from(format!("{callback}({json});")))),
            None => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(json))),
        };

        response.ok()
    }
}
