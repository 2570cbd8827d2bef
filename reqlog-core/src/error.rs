//! Error types for search evaluation and scope configuration

use reqlog_common::Operator;
use std::fmt;
use thiserror::Error;

/// Operand shape an operator requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRequirement {
    LeftStringLiteral,
    RightStringLiteral,
    RightRegex,
}

impl fmt::Display for OperandRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandRequirement::LeftStringLiteral => {
                f.write_str("left operand must be a string literal")
            }
            OperandRequirement::RightStringLiteral => {
                f.write_str("right operand must be a string literal")
            }
            OperandRequirement::RightRegex => {
                f.write_str("right operand must be a regular expression")
            }
        }
    }
}

/// Errors raised while evaluating a search expression against a log
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("expression type ({kind}) not supported")]
    UnsupportedExpressionType { kind: &'static str },

    #[error("operator {operator} is not supported")]
    UnsupportedOperator { operator: Operator },

    #[error("{requirement}, found {found}")]
    InvalidOperandType {
        requirement: OperandRequirement,
        found: &'static str,
    },
}

/// Result type alias for expression evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while loading or compiling scope configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scope rule {rule}: invalid {field} pattern '{pattern}': {source}")]
    InvalidPattern {
        rule: usize,
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read scope configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scope configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
