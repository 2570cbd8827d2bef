//! Parsed search expression tree
//!
//! Trees are produced by the query parser and consumed read-only by the
//! evaluator. Operators are opaque tokens: the tree shape alone does not
//! guarantee an operator is meaningful in its position (a `Prefix` carrying
//! `And`, say), which the evaluator reports as an error.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Operator tokens of the query language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Not,
    And,
    Or,
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    /// Matches regular expression
    Re,
    /// Does not match regular expression
    NotRe,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Operator::Not => "NOT",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::GtEq => ">=",
            Operator::LtEq => "<=",
            Operator::Re => "=~",
            Operator::NotRe => "!~",
        };
        f.write_str(token)
    }
}

/// Search expression node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Prefix {
        operator: Operator,
        right: Box<Expression>,
    },
    Infix {
        operator: Operator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Bare text token; may name a known field
    StringLiteral(String),
    /// Compiled pattern, only valid as the right operand of `=~`/`!~`
    Regex(
        #[serde(serialize_with = "serialize_regex", deserialize_with = "deserialize_regex")]
        Regex,
    ),
}

impl Expression {
    pub fn literal(value: impl Into<String>) -> Self {
        Expression::StringLiteral(value.into())
    }

    /// Compile `pattern` into a regex node
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Expression::Regex)
    }

    pub fn prefix(operator: Operator, right: Expression) -> Self {
        Expression::Prefix {
            operator,
            right: Box::new(right),
        }
    }

    pub fn infix(operator: Operator, left: Expression, right: Expression) -> Self {
        Expression::Infix {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(right: Expression) -> Self {
        Self::prefix(Operator::Not, right)
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::infix(Operator::And, left, right)
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Self::infix(Operator::Or, left, right)
    }

    /// Human readable name of the node variant
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Prefix { .. } => "prefix expression",
            Expression::Infix { .. } => "infix expression",
            Expression::StringLiteral(_) => "string literal",
            Expression::Regex(_) => "regular expression",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Prefix { operator, right } => write!(f, "{} {}", operator, right),
            Expression::Infix {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::StringLiteral(value) => write!(f, "{:?}", value),
            Expression::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

fn serialize_regex<S>(re: &Regex, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(re.as_str())
}

fn deserialize_regex<'de, D>(deserializer: D) -> Result<Regex, D::Error>
where
    D: Deserializer<'de>,
{
    let pattern = String::deserialize(deserializer)?;
    Regex::new(&pattern).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_renders_query() {
        let expr = Expression::and(
            Expression::infix(
                Operator::Eq,
                Expression::literal("req.method"),
                Expression::literal("GET"),
            ),
            Expression::not(Expression::infix(
                Operator::Re,
                Expression::literal("req.url"),
                Expression::regex(r"example\.com").unwrap(),
            )),
        );

        assert_eq!(
            expr.to_string(),
            r#"(("req.method" = "GET") AND NOT ("req.url" =~ /example\.com/))"#
        );
    }

    #[test]
    fn test_expression_from_json() {
        let json = r#"{
            "infix": {
                "operator": "re",
                "left": { "string_literal": "req.url" },
                "right": { "regex": "^https://" }
            }
        }"#;

        let expr: Expression = serde_json::from_str(json).unwrap();
        match expr {
            Expression::Infix {
                operator, right, ..
            } => {
                assert_eq!(operator, Operator::Re);
                assert!(matches!(*right, Expression::Regex(ref re) if re.as_str() == "^https://"));
            }
            other => panic!("unexpected node: {}", other.kind()),
        }
    }

    #[test]
    fn test_invalid_regex_rejected_on_deserialize() {
        let json = r#"{ "regex": "(unclosed" }"#;
        assert!(serde_json::from_str::<Expression>(json).is_err());
    }

    #[test]
    fn test_regex_serializes_as_pattern() {
        let expr = Expression::regex("a+b").unwrap();
        assert_eq!(serde_json::to_string(&expr).unwrap(), r#"{"regex":"a+b"}"#);
    }
}
