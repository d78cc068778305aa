//! Configuration types for the mockhaven dev server.

mod proxy;

use std::path::{Path, PathBuf};

use hyper::Uri;
use serde::{Deserialize, Serialize};

pub use proxy::{FilterMap, Protocol, ProxyMap, RuleDescriptor, RuleSet, StatsConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding the static build output.
    #[serde(default = "default_content_base")]
    pub content_base: String,

    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default = "default_hostname")]
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Hot-reload request flag; surfaced in startup logging only, the build
    /// pipeline owns the actual watch/reload machinery.
    #[serde(default = "default_true")]
    pub hot: bool,

    #[serde(default = "default_true")]
    pub inline: bool,

    #[serde(default)]
    pub stats: StatsConfig,

    /// Base directory for resolving `content_base` and mock-script paths.
    #[serde(default = "default_cwd")]
    pub cwd: PathBuf,

    #[serde(default)]
    pub proxy: ProxyMap,

    #[serde(default)]
    pub proxy_filters: FilterMap,
}

fn default_content_base() -> String {
    "./static/".to_string()
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_cwd() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_base: default_content_base(),
            protocol: Protocol::default(),
            hostname: default_hostname(),
            port: default_port(),
            hot: true,
            inline: true,
            stats: StatsConfig::default(),
            cwd: default_cwd(),
            proxy: ProxyMap::default(),
            proxy_filters: FilterMap::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.protocol != Protocol::Http {
            anyhow::bail!(
                "Unsupported listener protocol: '{}'. The dev server listens on plain http; \
                 proxy targets may still be https",
                self.protocol.as_str()
            );
        }

        for origin in self.proxy.keys() {
            let uri: Uri = origin
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid proxy origin '{origin}': {e}"))?;
            if uri.host().is_none() {
                anyhow::bail!("Proxy origin '{origin}' has no host");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
content_base: ./dist/
hostname: 127.0.0.1
port: 9000
proxy:
  "http://api.example.com":
    - path: "users/[id]"
      target: "http://backend.local/u/[id]"
    - path: "profile"
      data: "./mocks/profile.rhai"
      jsonp_name: "callback"
proxy_filters:
  slug: "[a-z-]+"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.content_base, "./dist/");
        assert_eq!(config.hostname, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.protocol, Protocol::Http);
        assert!(config.hot);
        assert!(config.stats.colors);

        let rules = &config.proxy["http://api.example.com"];
        let rules: Vec<_> = rules.iter().collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].path.as_deref(), Some("users/[id]"));
        assert_eq!(rules[0].target.as_deref(), Some("http://backend.local/u/[id]"));
        assert_eq!(
            rules[1].data,
            Some(serde_json::Value::String("./mocks/profile.rhai".to_string()))
        );
        assert_eq!(rules[1].jsonp_name.as_deref(), Some("callback"));

        assert_eq!(config.proxy_filters["slug"], "[a-z-]+");
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.content_base, "./static/");
        assert_eq!(config.hostname, "localhost");
        assert_eq!(config.port, 8080);
        assert!(config.hot);
        assert!(config.inline);
        assert!(config.proxy.is_empty());
    }

    #[test]
    fn test_single_rule_without_list() {
        let yaml = r#"
proxy:
  "http://cdn.example.com/assets":
    target: "/local/assets"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let rules: Vec<_> = config.proxy["http://cdn.example.com/assets"].iter().collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].target.as_deref(), Some("/local/assets"));
    }

    #[test]
    fn test_inline_mock_data() {
        let yaml = r#"
proxy:
  "http://api.example.com/profile":
    data:
      name: "Ann"
      "friends|3": ["@first_name"]
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let rules: Vec<_> = config.proxy["http://api.example.com/profile"].iter().collect();
        let data = rules[0].data.as_ref().unwrap();
        assert_eq!(data["name"], "Ann");
        assert!(data["friends|3"].is_array());
    }

    #[test]
    fn test_https_listener_rejected() {
        let yaml = "protocol: https";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let yaml = r#"
proxy:
  "/no-host-here":
    target: "http://backend.local/"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
