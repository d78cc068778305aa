//! Proxy rule descriptors and related configuration types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Protocol for the listener and for resolving local proxy targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// One user-declared rule under an origin-URL key.
///
/// A rule with `target` proxies files; a rule with `data` mocks ajax
/// responses. A rule may carry both and participate in both behaviors.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleDescriptor {
    /// Sub-path joined onto the origin URL's base path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// File-proxy destination; may reference wildcard captures as `[name]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Mock payload: a string is a mock-script file path relative to `cwd`,
    /// anything else is an inline mock template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// JSONP callback query parameter name (default "jsonpcallback").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonp_name: Option<String>,
}

/// One rule or a list of rules; the configuration accepts either form.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RuleSet {
    One(RuleDescriptor),
    Many(Vec<RuleDescriptor>),
}

impl RuleSet {
    pub fn iter(&self) -> impl Iterator<Item = &RuleDescriptor> {
        match self {
            RuleSet::One(rule) => std::slice::from_ref(rule).iter(),
            RuleSet::Many(rules) => rules.iter(),
        }
    }
}

/// Declarative proxy configuration keyed by origin URL.
///
/// BTreeMap keeps origin iteration deterministic, so wildcard precedence
/// within a host never depends on hashing order.
pub type ProxyMap = BTreeMap<String, RuleSet>;

/// Named wildcard filters as regex fragments.
pub type FilterMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    #[serde(default = "default_colors")]
    pub colors: bool,
}

fn default_colors() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
        }
    }
}
