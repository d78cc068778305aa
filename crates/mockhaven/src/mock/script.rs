//! Rhai-scripted mock payloads.
//!
//! Scripts compile once at startup; a file that fails to read or compile is
//! reported there instead of being re-risked on every request. The script
//! contract mirrors the inline-template one: either define
//! `fn data(request)` and return the payload per request, or let the script
//! evaluate straight to the payload value. A unit result means "no mock
//! available".

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use rhai::{Dynamic, Engine, Map, Scope, AST};
use serde_json::Value;

/// Request view handed to a script's `data(request)` function.
#[derive(Debug, Clone, Default)]
pub struct ScriptRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
}

impl ScriptRequest {
    pub fn new(
        method: &str,
        path: &str,
        query_string: Option<&str>,
        headers: &hyper::HeaderMap,
    ) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|val| (k.as_str().to_lowercase(), val.to_string()))
            })
            .collect();

        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: parse_query_string(query_string),
            headers,
        }
    }

    fn to_map(&self) -> Map {
        let mut request = Map::new();
        request.insert("method".into(), Dynamic::from(self.method.clone()));
        request.insert("path".into(), Dynamic::from(self.path.clone()));

        let mut query = Map::new();
        for (k, v) in &self.query {
            query.insert(k.clone().into(), Dynamic::from(v.clone()));
        }
        request.insert("query".into(), Dynamic::from(query));

        let mut headers = Map::new();
        for (k, v) in &self.headers {
            headers.insert(k.clone().into(), Dynamic::from(v.clone()));
        }
        request.insert("headers".into(), Dynamic::from(headers));

        request
    }
}

/// Parse a query string into a map, percent-decoding keys and values.
pub fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                let key = urlencoding::decode(key).unwrap_or_default().to_string();
                let value = urlencoding::decode(value).unwrap_or_default().to_string();
                params.insert(key, value);
            } else if !pair.is_empty() {
                let key = urlencoding::decode(pair).unwrap_or_default().to_string();
                params.insert(key, String::new());
            }
        }
    }
    params
}

/// A mock script compiled at startup.
pub struct MockScript {
    engine: Engine,
    ast: AST,
    has_data_fn: bool,
    source: String,
}

impl MockScript {
    pub fn load(path: &Path) -> Result<Self> {
        let script = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read mock script {}: {e}", path.display()))?;

        let engine = Self::create_engine();
        let ast = engine
            .compile(&script)
            .map_err(|e| anyhow!("failed to compile mock script {}: {e}", path.display()))?;
        let has_data_fn = ast.iter_functions().any(|f| f.name == "data");

        Ok(Self {
            engine,
            ast,
            has_data_fn,
            source: path.display().to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn create_engine() -> Engine {
        let mut engine = Engine::new();

        // Generation helper available to scripts: mock("@name") etc.
        engine.register_fn("mock", |template: &str| -> Dynamic {
            let value = super::generate::materialize(&Value::String(template.to_string()));
            rhai::serde::to_dynamic(&value).unwrap_or(Dynamic::UNIT)
        });

        engine
    }

    /// Evaluate the script's payload for one request. `Ok(None)` means the
    /// script produced no usable data; the route falls through unmocked.
    pub fn payload(&self, request: &ScriptRequest) -> Result<Option<Value>> {
        let mut scope = Scope::new();

        let result: Dynamic = if self.has_data_fn {
            self.engine
                .call_fn(&mut scope, &self.ast, "data", (request.to_map(),))
                .map_err(|e| anyhow!("mock script {}: data() failed: {e}", self.source))?
        } else {
            self.engine
                .eval_ast_with_scope(&mut scope, &self.ast)
                .map_err(|e| anyhow!("mock script {}: evaluation failed: {e}", self.source))?
        };

        if result.is_unit() {
            return Ok(None);
        }

        let value = rhai::serde::from_dynamic(&result)
            .map_err(|e| anyhow!("mock script {}: non-JSON result: {e}", self.source))?;
        Ok(Some(value))
    }
}
