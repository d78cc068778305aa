//! Per-request routing decisions against the file-proxy table.

use hyper::Uri;
use tracing::info;

use crate::config::Protocol;

use super::tables::{host_key, FileProxyTable};

/// Outcome of routing one incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Request addressed to the dev server itself; serve it locally.
    Local { path: String },
    /// A file-proxy rule matched; forward to the resolved target URL,
    /// ignoring the original path.
    ProxyTo { target: String },
    /// No rule matched; forward unchanged to its original destination.
    Passthrough { target: String },
}

/// Decides, per request, whether to serve locally, rewrite to a proxy
/// target, or pass the request straight through. Built once at assembly
/// time; the table it consults is immutable for the server's lifetime.
pub struct RoutePlanner {
    table: FileProxyTable,
    protocol: Protocol,
    hostname: String,
    port: u16,
}

impl RoutePlanner {
    pub fn new(table: FileProxyTable, protocol: Protocol, hostname: String, port: u16) -> Self {
        Self {
            table,
            protocol,
            hostname,
            port,
        }
    }

    pub fn decide(&self, uri: &Uri) -> RoutingDecision {
        // Requests without a host, or addressed to this server, are local.
        let host = match uri.host() {
            None => {
                return RoutingDecision::Local {
                    path: path_and_query(uri),
                }
            }
            Some(host) => host,
        };
        if host == self.hostname && uri.port_u16().unwrap_or_else(|| default_port(uri)) == self.port
        {
            return RoutingDecision::Local {
                path: path_and_query(uri),
            };
        }

        // Exact path first, then wildcard patterns in table-insertion order.
        if let Some(rules) = self.table.host(&host_key(uri)) {
            if let Some(target) = rules.resolve(uri.path()) {
                let resolved = self.resolve_target(&target, uri);
                info!("[proxy] {uri}\n        -> {resolved}");
                return RoutingDecision::ProxyTo { target: resolved };
            }
        }

        RoutingDecision::Passthrough {
            target: format!(
                "{}://{}:{}{}",
                uri.scheme_str().unwrap_or("http"),
                host,
                uri.port_u16().unwrap_or(80),
                path_and_query(uri)
            ),
        }
    }

    /// A target without a host component resolves against this server's own
    /// origin; otherwise the target's scheme/host are used with the port
    /// defaulting to 80. The original request's query string is carried over.
    fn resolve_target(&self, target: &str, request: &Uri) -> String {
        let parsed = target.parse::<Uri>().ok();
        let (scheme, host, port, path) = match parsed.as_ref().filter(|uri| uri.host().is_some()) {
            Some(uri) => (
                uri.scheme_str().unwrap_or(self.protocol.as_str()).to_string(),
                uri.host().unwrap_or_default().to_string(),
                uri.port_u16().unwrap_or(80),
                uri.path().to_string(),
            ),
            None => (
                self.protocol.as_str().to_string(),
                self.hostname.clone(),
                self.port,
                target.to_string(),
            ),
        };

        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };

        let mut url = format!("{scheme}://{host}:{port}{path}");
        if let Some(query) = request.query() {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

fn default_port(uri: &Uri) -> u16 {
    match uri.scheme_str() {
        Some("https") => 443,
        _ => 80,
    }
}

fn path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routing::tables::normalize;

    fn planner(proxy_yaml: &str) -> RoutePlanner {
        let config: Config = serde_yaml::from_str(proxy_yaml).unwrap();
        let (file_table, _) = normalize(&config).unwrap();
        RoutePlanner::new(file_table, config.protocol, config.hostname, config.port)
    }

    const USERS_RULE: &str = r#"
proxy:
  "http://api.example.com":
    path: "users/[id]"
    target: "http://backend.local/u/[id]"
"#;

    #[test]
    fn test_request_without_host_is_local() {
        let planner = planner(USERS_RULE);
        let uri: Uri = "/app.js".parse().unwrap();
        assert_eq!(
            planner.decide(&uri),
            RoutingDecision::Local {
                path: "/app.js".to_string()
            }
        );
    }

    #[test]
    fn test_request_to_own_origin_is_local() {
        let planner = planner(USERS_RULE);
        let uri: Uri = "http://localhost:8080/app.js?v=1".parse().unwrap();
        assert_eq!(
            planner.decide(&uri),
            RoutingDecision::Local {
                path: "/app.js?v=1".to_string()
            }
        );
    }

    #[test]
    fn test_own_hostname_with_other_port_is_not_local() {
        let planner = planner(USERS_RULE);
        let uri: Uri = "http://localhost:3000/app.js".parse().unwrap();
        assert!(matches!(
            planner.decide(&uri),
            RoutingDecision::Passthrough { .. }
        ));
    }

    #[test]
    fn test_wildcard_rewrite_preserves_query() {
        let planner = planner(USERS_RULE);
        let uri: Uri = "http://api.example.com/users/42?full=1".parse().unwrap();
        assert_eq!(
            planner.decide(&uri),
            RoutingDecision::ProxyTo {
                target: "http://backend.local:80/u/42?full=1".to_string()
            }
        );
    }

    #[test]
    fn test_exact_rule_wins_over_wildcard() {
        let planner = planner(
            r#"
proxy:
  "http://api.example.com":
    - path: "users/list"
      target: "http://list.local/all"
    - path: "users/[id]"
      target: "http://backend.local/u/[id]"
"#,
        );
        let uri: Uri = "http://api.example.com/users/list".parse().unwrap();
        assert_eq!(
            planner.decide(&uri),
            RoutingDecision::ProxyTo {
                target: "http://list.local:80/all".to_string()
            }
        );
    }

    #[test]
    fn test_target_with_explicit_port_keeps_it() {
        let planner = planner(
            r#"
proxy:
  "http://api.example.com":
    path: "users"
    target: "http://backend.local:9000/users"
"#,
        );
        let uri: Uri = "http://api.example.com/users".parse().unwrap();
        assert_eq!(
            planner.decide(&uri),
            RoutingDecision::ProxyTo {
                target: "http://backend.local:9000/users".to_string()
            }
        );
    }

    #[test]
    fn test_hostless_target_resolves_against_local_origin() {
        let planner = planner(
            r#"
port: 9000
proxy:
  "http://cdn.example.com":
    path: "assets/app.js"
    target: "/local/app.js"
"#,
        );
        let uri: Uri = "http://cdn.example.com/assets/app.js".parse().unwrap();
        assert_eq!(
            planner.decide(&uri),
            RoutingDecision::ProxyTo {
                target: "http://localhost:9000/local/app.js".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_host_passes_through() {
        let planner = planner(USERS_RULE);
        let uri: Uri = "http://other.example.com/x?y=1".parse().unwrap();
        assert_eq!(
            planner.decide(&uri),
            RoutingDecision::Passthrough {
                target: "http://other.example.com:80/x?y=1".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_path_on_known_host_passes_through() {
        let planner = planner(USERS_RULE);
        let uri: Uri = "http://api.example.com/none/42".parse().unwrap();
        assert!(matches!(
            planner.decide(&uri),
            RoutingDecision::Passthrough { .. }
        ));
    }

    #[test]
    fn test_origin_with_port_only_matches_that_port() {
        let planner = planner(
            r#"
proxy:
  "http://api.example.com:8081":
    path: "users"
    target: "http://backend.local/users"
"#,
        );

        let uri: Uri = "http://api.example.com:8081/users".parse().unwrap();
        assert!(matches!(
            planner.decide(&uri),
            RoutingDecision::ProxyTo { .. }
        ));

        let uri: Uri = "http://api.example.com/users".parse().unwrap();
        assert!(matches!(
            planner.decide(&uri),
            RoutingDecision::Passthrough { .. }
        ));
    }
}
