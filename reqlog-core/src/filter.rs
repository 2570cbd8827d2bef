//! Filtering of captured request logs
//!
//! Combines the scope check and the search expression the way the request
//! log listing uses them: a log is kept when it is in scope (if requested)
//! and matches the search expression (if any).

use crate::error::EvalResult;
use crate::scope::Scope;
use crate::search::Evaluator;
use reqlog_common::{Expression, RequestLog};

#[derive(Debug, Clone, Default)]
pub struct RequestLogFilter {
    pub only_in_scope: bool,
    pub search_expr: Option<Expression>,
}

impl RequestLogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_in_scope(mut self) -> Self {
        self.only_in_scope = true;
        self
    }

    pub fn with_search_expr(mut self, expr: Expression) -> Self {
        self.search_expr = Some(expr);
        self
    }

    /// Out-of-scope logs are rejected before the expression is evaluated.
    pub fn matches(&self, log: &RequestLog, scope: &Scope) -> EvalResult<bool> {
        if self.only_in_scope && !scope.contains(log) {
            return Ok(false);
        }

        match &self.search_expr {
            Some(expr) => Evaluator::default().matches(log, expr),
            None => Ok(true),
        }
    }
}

/// Logs accepted by `filter`, in input order. The first evaluation error aborts.
pub fn filter_logs<'a>(
    logs: &'a [RequestLog],
    filter: &RequestLogFilter,
    scope: &Scope,
) -> EvalResult<Vec<&'a RequestLog>> {
    let mut kept = Vec::new();
    for log in logs {
        if filter.matches(log, scope)? {
            kept.push(log);
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeRule;
    use regex::Regex;
    use reqlog_common::{Operator, Url};

    fn logs() -> Vec<RequestLog> {
        vec![
            RequestLog::new("GET", Url::parse("https://target.test/a").ok()),
            RequestLog::new("POST", Url::parse("https://target.test/b").ok()),
            RequestLog::new("POST", Url::parse("https://cdn.test/c").ok()),
        ]
    }

    fn target_scope() -> Scope {
        Scope::new(vec![
            ScopeRule::new().with_url(Regex::new(r"^https://target\.test/").unwrap())
        ])
    }

    fn is_post() -> Expression {
        Expression::infix(
            Operator::Eq,
            Expression::literal("req.method"),
            Expression::literal("POST"),
        )
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let logs = logs();
        let kept = filter_logs(&logs, &RequestLogFilter::new(), &Scope::default()).unwrap();
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_scope_and_expression_combined() {
        let logs = logs();
        let filter = RequestLogFilter::new()
            .only_in_scope()
            .with_search_expr(is_post());

        let kept = filter_logs(&logs, &filter, &target_scope()).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, logs[1].id);
    }

    #[test]
    fn test_scope_ignored_unless_requested() {
        let logs = logs();
        let filter = RequestLogFilter::new().with_search_expr(is_post());
        let kept = filter_logs(&logs, &filter, &target_scope()).unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_evaluation_error_aborts() {
        let logs = logs();
        let filter = RequestLogFilter::new().with_search_expr(Expression::regex("x").unwrap());
        assert!(filter_logs(&logs, &filter, &Scope::default()).is_err());
    }
}
