//! Construction of the immutable proxy lookup tables.
//!
//! The declarative `proxy` configuration (keyed by origin URL) is normalized
//! once at assembly time into two read-only tables: the file-proxy table
//! consulted per request by the route planner, and the ajax-mock table used
//! to install mock routes at startup.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Context};
use hyper::Uri;

use crate::config::Config;
use crate::wildcard::{self, FilterSet, Pattern};

/// File-proxy destination template; may reference captures as `[name]`.
#[derive(Debug, Clone)]
pub struct FileProxyTarget {
    pub target: String,
}

/// Per-host file-proxy rules: exact path keys plus compiled wildcard
/// patterns in insertion order (first match wins).
#[derive(Debug, Default)]
pub struct HostProxyRules {
    exact: HashMap<String, FileProxyTarget>,
    patterns: Vec<(Pattern, FileProxyTarget)>,
}

impl HostProxyRules {
    /// Resolve a request path to a target, substituting every occurrence of
    /// each named capture into the target template. Exact matches always win
    /// over wildcard matches.
    pub fn resolve(&self, path: &str) -> Option<String> {
        if let Some(rule) = self.exact.get(path) {
            return Some(rule.target.clone());
        }

        for (pattern, rule) in &self.patterns {
            if let Some(captures) = pattern.captures(path) {
                let mut target = rule.target.clone();
                for (name, value) in &captures {
                    target = target.replace(&format!("[{name}]"), value);
                }
                return Some(target);
            }
        }

        None
    }
}

#[derive(Debug, Default)]
pub struct FileProxyTable {
    hosts: HashMap<String, HostProxyRules>,
}

impl FileProxyTable {
    fn insert(
        &mut self,
        host: &str,
        path: &str,
        target: &str,
        filters: &FilterSet,
    ) -> Result<(), wildcard::PatternError> {
        let rules = self.hosts.entry(host.to_string()).or_default();
        let rule = FileProxyTarget {
            target: target.to_string(),
        };

        if wildcard::is_wildcard(path) {
            rules.patterns.push((Pattern::compile(path, filters)?, rule));
        } else {
            rules.exact.insert(path.to_string(), rule);
        }
        Ok(())
    }

    pub fn host(&self, host: &str) -> Option<&HostProxyRules> {
        self.hosts.get(host)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// One ajax-mock rule resolved from configuration.
#[derive(Debug, Clone)]
pub struct MockRule {
    /// Route path the mock responder answers on, with a leading separator.
    pub target: String,
    /// A string is a mock-script file path; anything else is an inline
    /// template handed to the generator.
    pub mock: serde_json::Value,
    pub jsonp_param: String,
}

#[derive(Debug, Default)]
pub struct AjaxMockTable {
    hosts: BTreeMap<String, BTreeMap<String, MockRule>>,
}

impl AjaxMockTable {
    fn insert(&mut self, host: &str, path: &str, rule: MockRule) {
        self.hosts
            .entry(host.to_string())
            .or_default()
            .insert(path.to_string(), rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &str, &MockRule)> {
        self.hosts.iter().flat_map(|(host, paths)| {
            paths
                .iter()
                .map(move |(path, rule)| (host.as_str(), path.as_str(), rule))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.values().all(BTreeMap::is_empty)
    }
}

/// Build both lookup tables from the raw configuration.
///
/// Origin keys iterate in sorted order and rules within an origin in
/// declaration order, so the tables (and wildcard precedence) come out the
/// same on every run. Filter and pattern compilation errors are fatal here.
pub fn normalize(config: &Config) -> Result<(FileProxyTable, AjaxMockTable), anyhow::Error> {
    let filters = FilterSet::with_filters(&config.proxy_filters)?;

    let mut file_table = FileProxyTable::default();
    let mut ajax_table = AjaxMockTable::default();

    for (origin, rules) in &config.proxy {
        let uri: Uri = origin
            .parse()
            .with_context(|| format!("invalid proxy origin '{origin}'"))?;
        if uri.host().is_none() {
            return Err(anyhow!("proxy origin '{origin}' has no host"));
        }
        let host = host_key(&uri);
        let base_path = uri.path();

        for rule in rules.iter() {
            let effective_path = join_paths(base_path, rule.path.as_deref());

            if let Some(target) = &rule.target {
                file_table
                    .insert(&host, &effective_path, target, &filters)
                    .with_context(|| format!("invalid file-proxy rule for '{origin}'"))?;
            }

            if let Some(data) = &rule.data {
                let target = rule.path.clone().unwrap_or_else(|| effective_path.clone());
                let target = if target.starts_with('/') {
                    target
                } else {
                    format!("/{target}")
                };
                ajax_table.insert(
                    &host,
                    &effective_path,
                    MockRule {
                        target,
                        mock: data.clone(),
                        jsonp_param: rule
                            .jsonp_name
                            .clone()
                            .unwrap_or_else(|| "jsonpcallback".to_string()),
                    },
                );
            }
        }
    }

    Ok((file_table, ajax_table))
}

/// Host table key: host plus the explicit port when the URL carries one.
pub(crate) fn host_key(uri: &Uri) -> String {
    let host = uri.host().unwrap_or("");
    match uri.port_u16() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Join a base path with an optional sub-path, collapsing repeated
/// separators.
fn join_paths(base: &str, sub: Option<&str>) -> String {
    let joined = match sub {
        Some(sub) => format!("{base}/{sub}"),
        None => base.to_string(),
    };

    let mut out = String::with_capacity(joined.len());
    let mut prev_was_sep = false;
    for ch in joined.chars() {
        if ch == '/' && prev_was_sep {
            continue;
        }
        prev_was_sep = ch == '/';
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from_yaml(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_join_paths_collapses_separators() {
        assert_eq!(join_paths("/", Some("users/[id]")), "/users/[id]");
        assert_eq!(join_paths("/api/", Some("/users")), "/api/users");
        assert_eq!(join_paths("/api", None), "/api");
    }

    #[test]
    fn test_host_key_keeps_explicit_port() {
        let uri: Uri = "http://api.example.com:8081/x".parse().unwrap();
        assert_eq!(host_key(&uri), "api.example.com:8081");

        let uri: Uri = "http://api.example.com/x".parse().unwrap();
        assert_eq!(host_key(&uri), "api.example.com");
    }

    #[test]
    fn test_file_rule_lands_in_file_table() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com":
    path: "users/[id]"
    target: "http://backend.local/u/[id]"
"#,
        );

        let (file_table, ajax_table) = normalize(&config).unwrap();
        assert!(ajax_table.is_empty());

        let rules = file_table.host("api.example.com").unwrap();
        assert_eq!(
            rules.resolve("/users/42"),
            Some("http://backend.local/u/42".to_string())
        );
        assert_eq!(rules.resolve("/users/42/posts"), None);
    }

    #[test]
    fn test_exact_match_beats_wildcard() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com":
    - path: "users/list"
      target: "http://list.local/all"
    - path: "users/[id]"
      target: "http://backend.local/u/[id]"
"#,
        );

        let (file_table, _) = normalize(&config).unwrap();
        let rules = file_table.host("api.example.com").unwrap();
        assert_eq!(
            rules.resolve("/users/list"),
            Some("http://list.local/all".to_string())
        );
        assert_eq!(
            rules.resolve("/users/7"),
            Some("http://backend.local/u/7".to_string())
        );
    }

    #[test]
    fn test_every_capture_occurrence_is_substituted() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com":
    path: "users/[id]"
    target: "http://backend.local/u/[id]/copy/[id]"
"#,
        );

        let (file_table, _) = normalize(&config).unwrap();
        let rules = file_table.host("api.example.com").unwrap();
        assert_eq!(
            rules.resolve("/users/42"),
            Some("http://backend.local/u/42/copy/42".to_string())
        );
    }

    #[test]
    fn test_mock_rule_lands_in_ajax_table() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com/profile":
    data:
      name: "Ann"
    jsonp_name: "callback"
"#,
        );

        let (file_table, ajax_table) = normalize(&config).unwrap();
        assert!(file_table.is_empty());

        let rules: Vec<_> = ajax_table.rules().collect();
        assert_eq!(rules.len(), 1);
        let (host, path, rule) = rules[0];
        assert_eq!(host, "api.example.com");
        assert_eq!(path, "/profile");
        assert_eq!(rule.target, "/profile");
        assert_eq!(rule.jsonp_param, "callback");
        assert_eq!(rule.mock["name"], "Ann");
    }

    #[test]
    fn test_mock_target_gets_leading_separator() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com":
    path: "profile"
    data: "./mocks/profile.rhai"
"#,
        );

        let (_, ajax_table) = normalize(&config).unwrap();
        let (_, _, rule) = ajax_table.rules().next().unwrap();
        assert_eq!(rule.target, "/profile");
        assert_eq!(rule.jsonp_param, "jsonpcallback");
    }

    #[test]
    fn test_rule_with_target_and_data_populates_both_tables() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com":
    path: "users"
    target: "http://backend.local/users"
    data:
      users: []
"#,
        );

        let (file_table, ajax_table) = normalize(&config).unwrap();
        assert_eq!(
            file_table.host("api.example.com").unwrap().resolve("/users"),
            Some("http://backend.local/users".to_string())
        );
        assert_eq!(ajax_table.rules().count(), 1);
    }

    #[test]
    fn test_unknown_filter_fails_normalization() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com":
    path: "users/[uuid4:id]"
    target: "http://backend.local/u/[id]"
"#,
        );

        assert!(normalize(&config).is_err());
    }

    #[test]
    fn test_user_filter_constrains_matching() {
        let config = config_from_yaml(
            r#"
proxy:
  "http://api.example.com":
    path: "users/[digit:id]"
    target: "http://backend.local/u/[id]"
"#,
        );

        let (file_table, _) = normalize(&config).unwrap();
        let rules = file_table.host("api.example.com").unwrap();
        assert!(rules.resolve("/users/42").is_some());
        assert!(rules.resolve("/users/ann").is_none());
    }
}
