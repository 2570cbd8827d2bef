//! Search expression evaluation
//!
//! Walks a parsed [`Expression`] against a [`RequestLog`]:
//!
//! - `NOT e` negates `e`
//! - `a AND b` / `a OR b` evaluate both sides, then combine
//! - `field <op> value` resolves both literals through the [`FieldRegistry`]
//!   and compares them as text (ordering operators are lexicographic, no
//!   numeric coercion)
//! - `field =~ /re/` / `field !~ /re/` test the resolved left side
//! - a bare literal is a case-insensitive substring search over every field
//!
//! The first error aborts the whole evaluation.

use crate::error::{EvalError, EvalResult, OperandRequirement};
use crate::fields::{standard_fields, FieldRegistry};
use reqlog_common::{Expression, Operator, RequestLog};
use std::borrow::Cow;
use tracing::debug;

/// Evaluate `expr` against `log` using the standard field registry
pub fn matches(log: &RequestLog, expr: &Expression) -> EvalResult<bool> {
    Evaluator::default().matches(log, expr)
}

/// Expression evaluator bound to a field registry
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'f> {
    fields: &'f FieldRegistry,
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Self::new(standard_fields())
    }
}

impl<'f> Evaluator<'f> {
    pub fn new(fields: &'f FieldRegistry) -> Self {
        Self { fields }
    }

    /// Returns true if `expr` evaluates to true for `log`
    pub fn matches(&self, log: &RequestLog, expr: &Expression) -> EvalResult<bool> {
        self.eval(log, expr).map_err(|err| {
            debug!(log_id = %log.id, expression = %expr, error = %err, "Search expression evaluation failed");
            err
        })
    }

    fn eval(&self, log: &RequestLog, expr: &Expression) -> EvalResult<bool> {
        match expr {
            Expression::Prefix { operator, right } => self.eval_prefix(log, *operator, right),
            Expression::Infix {
                operator,
                left,
                right,
            } => self.eval_infix(log, *operator, left, right),
            Expression::StringLiteral(value) => Ok(self.eval_string_literal(log, value)),
            other => Err(EvalError::UnsupportedExpressionType { kind: other.kind() }),
        }
    }

    fn eval_prefix(
        &self,
        log: &RequestLog,
        operator: Operator,
        right: &Expression,
    ) -> EvalResult<bool> {
        match operator {
            Operator::Not => Ok(!self.eval(log, right)?),
            operator => Err(EvalError::UnsupportedOperator { operator }),
        }
    }

    fn eval_infix(
        &self,
        log: &RequestLog,
        operator: Operator,
        left: &Expression,
        right: &Expression,
    ) -> EvalResult<bool> {
        // Both sides are always evaluated so an error on the right is never masked.
        match operator {
            Operator::And => {
                let left = self.eval(log, left)?;
                let right = self.eval(log, right)?;
                return Ok(left && right);
            }
            Operator::Or => {
                let left = self.eval(log, left)?;
                let right = self.eval(log, right)?;
                return Ok(left || right);
            }
            _ => {}
        }

        let left_value = match left {
            Expression::StringLiteral(value) => self.fields.resolve(log, value),
            other => {
                return Err(EvalError::InvalidOperandType {
                    requirement: OperandRequirement::LeftStringLiteral,
                    found: other.kind(),
                })
            }
        };

        if let Operator::Re | Operator::NotRe = operator {
            let Expression::Regex(re) = right else {
                return Err(EvalError::InvalidOperandType {
                    requirement: OperandRequirement::RightRegex,
                    found: right.kind(),
                });
            };
            let is_match = re.is_match(&left_value);
            return Ok(if operator == Operator::Re {
                is_match
            } else {
                !is_match
            });
        }

        let right_value = match right {
            Expression::StringLiteral(value) => self.fields.resolve(log, value),
            other => {
                return Err(EvalError::InvalidOperandType {
                    requirement: OperandRequirement::RightStringLiteral,
                    found: other.kind(),
                })
            }
        };

        compare(operator, &left_value, &right_value)
    }

    fn eval_string_literal(&self, log: &RequestLog, value: &str) -> bool {
        let needle = value.to_lowercase();
        let contains = |haystack: String| haystack.to_lowercase().contains(&needle);

        self.fields.request_values(log).any(contains)
            || log
                .response
                .as_ref()
                .is_some_and(|res| self.fields.response_values(res).any(contains))
    }
}

/// Text comparison; `>`/`<` family is plain lexicographic order
fn compare(operator: Operator, left: &Cow<'_, str>, right: &Cow<'_, str>) -> EvalResult<bool> {
    let (left, right) = (left.as_ref(), right.as_ref());
    match operator {
        Operator::Eq => Ok(left == right),
        Operator::NotEq => Ok(left != right),
        Operator::Gt => Ok(left > right),
        Operator::Lt => Ok(left < right),
        Operator::GtEq => Ok(left >= right),
        Operator::LtEq => Ok(left <= right),
        operator => Err(EvalError::UnsupportedOperator { operator }),
    }
}
