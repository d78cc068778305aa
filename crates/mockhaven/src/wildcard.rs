//! Bracketed wildcard path patterns with named captures.
//!
//! A pattern segment `[id]` captures any run of non-separator characters
//! under the name `id`; `[digit:id]` additionally constrains the capture to
//! the named filter. Filters are plain regex fragments, owned by a
//! [`FilterSet`] instead of a process-wide registry so separate servers never
//! share or clobber each other's registrations.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Matches `[name]` and `[filter:name]` placeholders inside a path pattern.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:([A-Za-z0-9_]+):)?([A-Za-z_][A-Za-z0-9_]*)\]").unwrap());

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unknown wildcard filter '{0}'")]
    UnknownFilter(String),
    #[error("invalid wildcard filter '{name}': {source}")]
    InvalidFilter {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid wildcard pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Named filters usable inside `[filter:name]` placeholders.
#[derive(Debug, Clone)]
pub struct FilterSet {
    filters: BTreeMap<String, String>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterSet {
    /// Filter set carrying only the builtin filters.
    pub fn new() -> Self {
        let mut filters = BTreeMap::new();
        filters.insert("digit".to_string(), "[0-9]+".to_string());
        filters.insert("alpha".to_string(), "[A-Za-z]+".to_string());
        filters.insert("alnum".to_string(), "[0-9A-Za-z]+".to_string());
        Self { filters }
    }

    /// Extend the builtins with user-supplied regex fragments.
    ///
    /// Every fragment is compiled eagerly so a mis-declared filter fails
    /// server construction instead of surfacing on the first matching request.
    pub fn with_filters(extra: &BTreeMap<String, String>) -> Result<Self, PatternError> {
        let mut set = Self::new();
        for (name, fragment) in extra {
            Regex::new(fragment).map_err(|source| PatternError::InvalidFilter {
                name: name.clone(),
                source,
            })?;
            set.filters.insert(name.clone(), fragment.clone());
        }
        Ok(set)
    }

    fn fragment(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }
}

/// True when a path key contains at least one capture placeholder.
pub fn is_wildcard(path: &str) -> bool {
    PLACEHOLDER.is_match(path)
}

/// A compiled wildcard pattern, anchored over the whole request path.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    regex: Regex,
}

impl Pattern {
    pub fn compile(pattern: &str, filters: &FilterSet) -> Result<Self, PatternError> {
        let mut source = String::from("^");
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(pattern) {
            let placeholder = caps.get(0).unwrap();
            source.push_str(&regex::escape(&pattern[last..placeholder.start()]));

            let name = caps.get(2).unwrap().as_str();
            let fragment = match caps.get(1) {
                Some(filter) => filters
                    .fragment(filter.as_str())
                    .ok_or_else(|| PatternError::UnknownFilter(filter.as_str().to_string()))?,
                None => "[^/]+",
            };
            source.push_str(&format!("(?P<{name}>{fragment})"));
            last = placeholder.end();
        }

        source.push_str(&regex::escape(&pattern[last..]));
        source.push('$');

        let regex = Regex::new(&source).map_err(|source| PatternError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Named captures on success, `None` when the path does not match.
    pub fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let mut out = BTreeMap::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                out.insert(name.to_string(), m.as_str().to_string());
            }
        }
        Some(out)
    }
}
