//! Scope configuration
//!
//! Rules are authored as plain pattern strings (JSON) and compiled into a
//! [`Scope`] before any matching happens, so invalid patterns are rejected
//! here rather than silently ignored by the matcher.

use crate::error::{ConfigError, ConfigResult};
use crate::scope::{
    header_key_regex, ContainsBodyMatcher, RegexBodyMatcher, Scope, ScopeRule,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Scope configuration (target definition)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub rules: Vec<ScopeRuleConfig>,
}

/// A single rule; every pattern is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRuleConfig {
    /// Regex matched against the full URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderRuleConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyMatcherConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRuleConfig {
    /// Regex matched against header names (case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Regex matched against header values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// How a rule tests request bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMatcherConfig {
    Regex(String),
    Contains(String),
}

impl ScopeConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Compile every rule. The first invalid pattern aborts compilation.
    pub fn compile(&self) -> ConfigResult<Scope> {
        let rules = self
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| rule.compile(index))
            .collect::<ConfigResult<Vec<_>>>()?;

        debug!(rules = rules.len(), "Compiled scope configuration");
        Ok(Scope::new(rules))
    }
}

impl ScopeRuleConfig {
    pub fn compile(&self, index: usize) -> ConfigResult<ScopeRule> {
        let invalid = |field: &'static str, pattern: &str| invalid_pattern(index, field, pattern);
        let mut rule = ScopeRule::new();

        if let Some(url) = &self.url {
            rule.url = Some(Regex::new(url).map_err(invalid("url", url))?);
        }

        if let Some(header) = &self.header {
            if let Some(key) = &header.key {
                let key = header_key_regex(key).map_err(invalid("header.key", key))?;
                rule.header.key = Some(key);
            }
            if let Some(value) = &header.value {
                let value = Regex::new(value).map_err(invalid("header.value", value))?;
                rule.header.value = Some(value);
            }
        }

        match &self.body {
            Some(BodyMatcherConfig::Regex(pattern)) => {
                rule = rule.with_body(
                    RegexBodyMatcher::new(pattern).map_err(invalid("body", pattern))?,
                );
            }
            Some(BodyMatcherConfig::Contains(needle)) => {
                rule = rule.with_body(ContainsBodyMatcher::new(needle.as_bytes()));
            }
            None => {}
        }

        if rule.is_empty() {
            warn!(rule = index, "Scope rule has no patterns and will never match");
        }

        Ok(rule)
    }
}

fn invalid_pattern(
    rule: usize,
    field: &'static str,
    pattern: &str,
) -> impl FnOnce(regex::Error) -> ConfigError {
    let pattern = pattern.to_string();
    move |source| ConfigError::InvalidPattern {
        rule,
        field,
        pattern,
        source,
    }
}
