//! Captured request/response records
//!
//! A [`RequestLog`] is produced by the capture layer once a request has been
//! fully read. The matching [`ResponseLog`] is attached when the upstream
//! reply completes; after that the log is never modified again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;
use uuid::{NoContext, Timestamp, Uuid};

/// Time-sortable request log identifier (UUIDv7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(Uuid);

impl LogId {
    /// Create a new identifier stamped with the current time
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create an identifier stamped with the given time (millisecond precision).
    ///
    /// Returns `None` for times before the Unix epoch, which UUIDv7 cannot carry.
    pub fn at(time: DateTime<Utc>) -> Option<Self> {
        let seconds = u64::try_from(time.timestamp()).ok()?;
        let ts = Timestamp::from_unix(NoContext, seconds, time.timestamp_subsec_nanos());
        Some(Self(Uuid::new_v7(ts)))
    }

    /// Wrap an existing uuid
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Time embedded in the identifier.
    ///
    /// Returns `None` for uuids that carry no timestamp (e.g. v4).
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let (seconds, nanos) = self.0.get_timestamp()?.to_unix();
        DateTime::from_timestamp(i64::try_from(seconds).ok()?, nanos)
    }
}

impl Default for LogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// HTTP headers, keeping every value of a name in arrival order.
///
/// Serialized as a plain name -> values map. Deserialization goes through
/// [`Headers::append`], so names differing only in case are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Names differing only in ASCII case share one entry,
    /// stored under the spelling seen first.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let existing = self
            .0
            .keys()
            .find(|key| key.eq_ignore_ascii_case(&name))
            .cloned();
        self.0
            .entry(existing.unwrap_or(name))
            .or_default()
            .push(value.into());
    }

    /// All values recorded for `name` (ASCII-case-insensitive)
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Vec<String>>> for Headers {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut headers = Headers::new();
        for (name, values) in map {
            for value in values {
                headers.append(name.as_str(), value);
            }
        }
        headers
    }
}

impl From<Headers> for BTreeMap<String, Vec<String>> {
    fn from(headers: Headers) -> Self {
        headers.0
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// A captured request and, once received, its response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    pub id: LogId,
    pub proto: String,
    pub method: String,
    /// `None` when the capture layer failed to parse the request target
    pub url: Option<Url>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Vec<u8>,
    #[serde(default)]
    pub response: Option<ResponseLog>,
}

impl RequestLog {
    /// Create a new HTTP/1.1 request log with a fresh id
    pub fn new(method: impl Into<String>, url: Option<Url>) -> Self {
        Self {
            id: LogId::new(),
            proto: "HTTP/1.1".to_string(),
            method: method.into(),
            url,
            headers: Headers::new(),
            body: Vec::new(),
            response: None,
        }
    }

    pub fn with_id(mut self, id: LogId) -> Self {
        self.id = id;
        self
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = proto.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach the upstream response
    pub fn with_response(mut self, response: ResponseLog) -> Self {
        self.response = Some(response);
        self
    }

    /// URL text, empty when the URL is absent
    pub fn url_text(&self) -> String {
        self.url.as_ref().map(Url::to_string).unwrap_or_default()
    }

    /// Body decoded as UTF-8 (lossy)
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A captured upstream response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseLog {
    pub proto: String,
    pub status_code: u16,
    pub status_reason: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl ResponseLog {
    pub fn new(status_code: u16, status_reason: impl Into<String>) -> Self {
        Self {
            proto: "HTTP/1.1".to_string(),
            status_code,
            status_reason: status_reason.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = proto.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
