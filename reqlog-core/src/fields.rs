//! Searchable fields of a request log
//!
//! Dotted names (`req.method`, `res.statusCode`, ...) map to pure extraction
//! functions. The table is built once and shared read-only.
//! Headers are not addressable by name yet.

use lazy_static::lazy_static;
use reqlog_common::{RequestLog, ResponseLog};
use std::borrow::Cow;
use std::fmt;

pub const REQUEST_PREFIX: &str = "req.";
pub const RESPONSE_PREFIX: &str = "res.";

pub type RequestFieldFn = fn(&RequestLog) -> String;
pub type ResponseFieldFn = fn(&ResponseLog) -> String;

lazy_static! {
    static ref STANDARD_FIELDS: FieldRegistry = FieldRegistry::standard();
}

/// Registry shared by every evaluator that does not bring its own
pub fn standard_fields() -> &'static FieldRegistry {
    &STANDARD_FIELDS
}

/// Resolve `name` against `log` using the standard registry
pub fn get_field(log: &RequestLog, name: &str) -> String {
    standard_fields().resolve(log, name).into_owned()
}

/// Mapping from dotted field name to extraction function
#[derive(Clone)]
pub struct FieldRegistry {
    request: Vec<(&'static str, RequestFieldFn)>,
    response: Vec<(&'static str, ResponseFieldFn)>,
}

impl FieldRegistry {
    /// The request and response fields known to the query language
    pub fn standard() -> Self {
        let request: [(&'static str, RequestFieldFn); 6] = [
            ("req.id", |log: &RequestLog| log.id.to_string()),
            ("req.proto", |log: &RequestLog| log.proto.clone()),
            ("req.url", |log: &RequestLog| log.url_text()),
            ("req.method", |log: &RequestLog| log.method.clone()),
            ("req.body", |log: &RequestLog| log.body_text().into_owned()),
            ("req.timestamp", |log: &RequestLog| {
                log.id
                    .timestamp()
                    .map(|ts| ts.to_string())
                    .unwrap_or_default()
            }),
        ];
        let response: [(&'static str, ResponseFieldFn); 4] = [
            ("res.proto", |res: &ResponseLog| res.proto.clone()),
            ("res.statusCode", |res: &ResponseLog| res.status_code.to_string()),
            ("res.statusReason", |res: &ResponseLog| res.status_reason.clone()),
            ("res.body", |res: &ResponseLog| res.body_text().into_owned()),
        ];

        Self {
            request: request.to_vec(),
            response: response.to_vec(),
        }
    }

    pub fn request_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.request.iter().map(|(key, _)| *key)
    }

    pub fn response_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.response.iter().map(|(key, _)| *key)
    }

    pub fn request_field(&self, log: &RequestLog, key: &str) -> Option<String> {
        self.request
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, extract)| extract(log))
    }

    pub fn response_field(&self, res: &ResponseLog, key: &str) -> Option<String> {
        self.response
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, extract)| extract(res))
    }

    fn is_response_key(&self, key: &str) -> bool {
        self.response.iter().any(|(name, _)| *name == key)
    }

    /// Resolve a literal operand.
    ///
    /// Registered `req.*` names yield the request's value. Registered `res.*`
    /// names yield the response's value, or empty text while no response is
    /// attached. Anything else is returned unchanged.
    pub fn resolve<'a>(&self, log: &RequestLog, literal: &'a str) -> Cow<'a, str> {
        if literal.starts_with(REQUEST_PREFIX) {
            if let Some(value) = self.request_field(log, literal) {
                return Cow::Owned(value);
            }
        } else if literal.starts_with(RESPONSE_PREFIX) && self.is_response_key(literal) {
            return match &log.response {
                Some(res) => Cow::Owned(self.response_field(res, literal).unwrap_or_default()),
                None => Cow::Borrowed(""),
            };
        }

        Cow::Borrowed(literal)
    }

    /// Values of every request field, in registration order
    pub fn request_values<'r>(
        &'r self,
        log: &'r RequestLog,
    ) -> impl Iterator<Item = String> + 'r {
        self.request.iter().map(move |(_, extract)| extract(log))
    }

    /// Values of every response field, in registration order
    pub fn response_values<'r>(
        &'r self,
        res: &'r ResponseLog,
    ) -> impl Iterator<Item = String> + 'r {
        self.response.iter().map(move |(_, extract)| extract(res))
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("request", &self.request_keys().collect::<Vec<_>>())
            .field("response", &self.response_keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reqlog_common::{LogId, Url};

    fn sample_log() -> RequestLog {
        let id = LogId::at(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()).unwrap();
        RequestLog::new("POST", Url::parse("https://example.com/api?x=1").ok())
            .with_id(id)
            .with_proto("HTTP/2.0")
            .with_body("user=admin")
    }

    #[test]
    fn test_request_fields() {
        let log = sample_log();
        assert_eq!(get_field(&log, "req.method"), "POST");
        assert_eq!(get_field(&log, "req.proto"), "HTTP/2.0");
        assert_eq!(get_field(&log, "req.url"), "https://example.com/api?x=1");
        assert_eq!(get_field(&log, "req.body"), "user=admin");
        assert_eq!(get_field(&log, "req.id"), log.id.to_string());
        assert_eq!(get_field(&log, "req.timestamp"), "2024-01-02 03:04:05 UTC");
    }

    #[test]
    fn test_response_fields_without_response() {
        let log = sample_log();
        assert_eq!(get_field(&log, "res.statusCode"), "");
        assert_eq!(get_field(&log, "res.body"), "");
    }

    #[test]
    fn test_response_fields() {
        let log = sample_log()
            .with_response(ResponseLog::new(404, "Not Found").with_body("missing"));
        assert_eq!(get_field(&log, "res.statusCode"), "404");
        assert_eq!(get_field(&log, "res.statusReason"), "Not Found");
        assert_eq!(get_field(&log, "res.proto"), "HTTP/1.1");
        assert_eq!(get_field(&log, "res.body"), "missing");
    }

    #[test]
    fn test_unknown_names_are_literals() {
        let log = sample_log();
        assert_eq!(get_field(&log, "GET"), "GET");
        assert_eq!(get_field(&log, "req.headers"), "req.headers");
        assert_eq!(get_field(&log, "res.unknown"), "res.unknown");
    }

    #[test]
    fn test_missing_url_resolves_empty() {
        let log = RequestLog::new("GET", None);
        assert_eq!(get_field(&log, "req.url"), "");
    }

    #[test]
    fn test_registered_keys() {
        let fields = standard_fields();
        assert_eq!(fields.request_keys().count(), 6);
        assert_eq!(
            fields.response_keys().collect::<Vec<_>>(),
            ["res.proto", "res.statusCode", "res.statusReason", "res.body"]
        );
    }
}
