//! Request Log Filtering Core
//!
//! Decides, for each captured request/response pair, whether it satisfies an
//! operator's search expression and whether it falls inside the configured
//! scope. Both decisions are pure functions over immutable inputs and can be
//! called concurrently without locking.

/// Field resolution for dotted names (`req.*`, `res.*`)
pub mod fields;

/// Search expression evaluation
pub mod search;

/// Scope rules and matching
pub mod scope;

/// Scope configuration loading
pub mod config;

/// Combined scope + search filtering of log sets
pub mod filter;

/// Error types
pub mod error;

pub use config::{BodyMatcherConfig, HeaderRuleConfig, ScopeConfig, ScopeRuleConfig};
pub use error::{ConfigError, ConfigResult, EvalError, EvalResult, OperandRequirement};
pub use fields::{get_field, standard_fields, FieldRegistry};
pub use filter::{filter_logs, RequestLogFilter};
pub use scope::{
    header_key_regex, in_scope, BodyMatcher, ContainsBodyMatcher, HeaderPattern, MatchedBy,
    RegexBodyMatcher, Scope, ScopeHit, ScopeRule, SharedScope,
};
pub use search::{matches, Evaluator};
