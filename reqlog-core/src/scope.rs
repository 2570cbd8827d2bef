//! Scope matching
//!
//! A [`Scope`] is an ordered list of [`ScopeRule`]s. A request log is in
//! scope when any rule matches it through its URL, one of its headers, or
//! its body. Absent data and unset patterns never match; scope matching has
//! no error path.

use regex::{Regex, RegexBuilder};
use reqlog_common::RequestLog;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Capability to test a request body
pub trait BodyMatcher: fmt::Debug + Send + Sync {
    fn matches(&self, body: &[u8]) -> bool;
}

/// Matches bodies against a byte-oriented regular expression
#[derive(Debug, Clone)]
pub struct RegexBodyMatcher {
    pattern: regex::bytes::Regex,
}

impl RegexBodyMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: regex::bytes::Regex::new(pattern)?,
        })
    }
}

impl BodyMatcher for RegexBodyMatcher {
    fn matches(&self, body: &[u8]) -> bool {
        self.pattern.is_match(body)
    }
}

/// Matches bodies containing a literal byte sequence
#[derive(Debug, Clone)]
pub struct ContainsBodyMatcher {
    needle: Vec<u8>,
}

impl ContainsBodyMatcher {
    pub fn new(needle: impl Into<Vec<u8>>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl BodyMatcher for ContainsBodyMatcher {
    fn matches(&self, body: &[u8]) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        body.windows(self.needle.len())
            .any(|window| window == self.needle.as_slice())
    }
}

/// Compile a header-name pattern. Header names are matched case-insensitively.
pub fn header_key_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Header key/value patterns of a rule
#[derive(Debug, Clone, Default)]
pub struct HeaderPattern {
    pub key: Option<Regex>,
    pub value: Option<Regex>,
}

impl HeaderPattern {
    /// Decide a single header entry.
    ///
    /// With only one pattern set, that pattern decides; with both set, both
    /// must match; with neither set, nothing matches.
    pub fn matches(&self, name: &str, values: &[String]) -> bool {
        let value_matches = |re: &Regex| values.iter().any(|value| re.is_match(value));

        match (&self.key, &self.value) {
            (Some(key), None) => key.is_match(name),
            (None, Some(value)) => value_matches(value),
            (Some(key), Some(value)) => key.is_match(name) && value_matches(value),
            (None, None) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.value.is_none()
    }
}

/// Which test of a rule put a log in scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Url,
    Header,
    Body,
}

impl fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedBy::Url => f.write_str("url"),
            MatchedBy::Header => f.write_str("header"),
            MatchedBy::Body => f.write_str("body"),
        }
    }
}

/// First rule that matched a log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeHit {
    pub rule: usize,
    pub matched_by: MatchedBy,
}

/// A single scope rule; every pattern is optional
#[derive(Debug, Clone, Default)]
pub struct ScopeRule {
    /// Matched against the full URL text
    pub url: Option<Regex>,
    pub header: HeaderPattern,
    pub body: Option<Arc<dyn BodyMatcher>>,
}

impl ScopeRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: Regex) -> Self {
        self.url = Some(url);
        self
    }

    /// Pattern should come from [`header_key_regex`] to get case-insensitive names
    pub fn with_header_key(mut self, key: Regex) -> Self {
        self.header.key = Some(key);
        self
    }

    pub fn with_header_value(mut self, value: Regex) -> Self {
        self.header.value = Some(value);
        self
    }

    pub fn with_body(mut self, body: impl BodyMatcher + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    /// A rule without any pattern can never match
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.header.is_empty() && self.body.is_none()
    }

    /// Which test, if any, matches `log`. Tests run url, headers, body.
    pub fn matched_by(&self, log: &RequestLog) -> Option<MatchedBy> {
        if let (Some(pattern), Some(url)) = (&self.url, &log.url) {
            if pattern.is_match(url.as_str()) {
                return Some(MatchedBy::Url);
            }
        }

        if log
            .headers
            .iter()
            .any(|(name, values)| self.header.matches(name, values))
        {
            return Some(MatchedBy::Header);
        }

        match &self.body {
            Some(body) if body.matches(&log.body) => Some(MatchedBy::Body),
            _ => None,
        }
    }

    pub fn matches(&self, log: &RequestLog) -> bool {
        self.matched_by(log).is_some()
    }
}

/// Ordered set of scope rules
#[derive(Debug, Clone, Default)]
pub struct Scope {
    rules: Vec<ScopeRule>,
}

impl Scope {
    pub fn new(rules: Vec<ScopeRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ScopeRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule, in order, that matches `log`
    pub fn find_match(&self, log: &RequestLog) -> Option<ScopeHit> {
        self.rules.iter().enumerate().find_map(|(rule, scope_rule)| {
            scope_rule.matched_by(log).map(|matched_by| {
                trace!(log_id = %log.id, rule, %matched_by, "Request log in scope");
                ScopeHit { rule, matched_by }
            })
        })
    }

    pub fn contains(&self, log: &RequestLog) -> bool {
        self.find_match(log).is_some()
    }
}

impl FromIterator<ScopeRule> for Scope {
    fn from_iter<I: IntoIterator<Item = ScopeRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Returns true if any rule of `scope` matches `log`
pub fn in_scope(log: &RequestLog, scope: &Scope) -> bool {
    scope.contains(log)
}

/// Scope that can be replaced at runtime.
///
/// Matchers take a [`snapshot`](SharedScope::snapshot) and never observe a
/// half-updated rule list; [`replace`](SharedScope::replace) swaps the whole
/// set at once.
#[derive(Debug, Default)]
pub struct SharedScope {
    current: RwLock<Arc<Scope>>,
}

impl SharedScope {
    pub fn new(scope: Scope) -> Self {
        Self {
            current: RwLock::new(Arc::new(scope)),
        }
    }

    pub fn snapshot(&self) -> Arc<Scope> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install `scope`, returning the previous rule set
    pub fn replace(&self, scope: Scope) -> Arc<Scope> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqlog_common::Url;

    fn log_with_url(url: &str) -> RequestLog {
        RequestLog::new("GET", Url::parse(url).ok())
    }

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    #[test]
    fn test_url_rule() {
        let scope = Scope::new(vec![ScopeRule::new().with_url(re(r"^https://example\.com"))]);

        assert!(in_scope(&log_with_url("https://example.com/x"), &scope));
        assert!(!in_scope(&log_with_url("https://other.com"), &scope));
        assert!(!in_scope(&RequestLog::new("GET", None), &scope));
    }

    #[test]
    fn test_header_key_and_value() {
        let rule = ScopeRule::new()
            .with_header_key(header_key_regex("^X-Api-Key$").unwrap())
            .with_header_value(re("^secret"));
        let scope = Scope::new(vec![rule]);

        let secret = log_with_url("https://a.test/").with_header("X-Api-Key", "secret123");
        let public = log_with_url("https://a.test/").with_header("X-Api-Key", "public");

        assert!(in_scope(&secret, &scope));
        assert!(!in_scope(&public, &scope));
    }

    #[test]
    fn test_header_names_case_insensitive() {
        let scope = Scope::new(vec![
            ScopeRule::new().with_header_key(header_key_regex("^X-Api-Key$").unwrap())
        ]);
        let log = log_with_url("https://a.test/").with_header("x-api-key", "anything");
        assert!(in_scope(&log, &scope));
    }

    #[test]
    fn test_value_matches_any_of_multiple() {
        let scope = Scope::new(vec![ScopeRule::new().with_header_value(re("^b=2$"))]);
        let log = log_with_url("https://a.test/")
            .with_header("Cookie", "a=1")
            .with_header("Cookie", "b=2");
        assert!(in_scope(&log, &scope));
    }

    #[test]
    fn test_key_and_value_must_match_same_header() {
        let rule = ScopeRule::new()
            .with_header_key(header_key_regex("^Host$").unwrap())
            .with_header_value(re("secret"));
        let log = log_with_url("https://a.test/")
            .with_header("Host", "a.test")
            .with_header("Authorization", "secret");
        assert!(!rule.matches(&log));
    }

    #[test]
    fn test_body_matchers() {
        let regex_rule =
            ScopeRule::new().with_body(RegexBodyMatcher::new(r"token=\w+").unwrap());
        let contains_rule = ScopeRule::new().with_body(ContainsBodyMatcher::new("needle"));

        let log = log_with_url("https://a.test/").with_body("a=1&token=abc");
        assert_eq!(regex_rule.matched_by(&log), Some(MatchedBy::Body));
        assert!(!contains_rule.matches(&log));

        let mut body = vec![0xff];
        body.extend_from_slice(b"needle");
        let binary = log_with_url("https://a.test/").with_body(body);
        assert!(contains_rule.matches(&binary));
    }

    #[test]
    fn test_empty_rule_and_scope_never_match() {
        let log = log_with_url("https://a.test/")
            .with_header("Host", "a.test")
            .with_body("x");
        assert!(ScopeRule::new().is_empty());
        assert!(!ScopeRule::new().matches(&log));
        assert!(!in_scope(&log, &Scope::default()));
    }

    #[test]
    fn test_first_matching_rule_reported() {
        let scope: Scope = vec![
            ScopeRule::new().with_url(re("other")),
            ScopeRule::new().with_header_value(re("a.test")),
            ScopeRule::new().with_url(re("a.test")),
        ]
        .into_iter()
        .collect();
        let log = log_with_url("https://a.test/").with_header("Host", "a.test");

        assert_eq!(
            scope.find_match(&log),
            Some(ScopeHit {
                rule: 1,
                matched_by: MatchedBy::Header
            })
        );
    }

    #[test]
    fn test_shared_scope_replace() {
        let shared = SharedScope::default();
        let log = log_with_url("https://example.com/");

        let before = shared.snapshot();
        assert!(!in_scope(&log, &before));

        let previous = shared.replace(Scope::new(vec![ScopeRule::new().with_url(re("example"))]));
        assert!(previous.is_empty());
        assert!(in_scope(&log, &shared.snapshot()));
        // Snapshots taken earlier keep the old rules
        assert!(!in_scope(&log, &before));
    }
}
