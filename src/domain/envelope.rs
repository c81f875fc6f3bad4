use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const STATUS_KEY: &str = "status";
pub const CONTEXT_KEY: &str = "context";
pub const ERROR_KEY: &str = "error";
pub const HTTP_KEY: &str = "http$";

/// A built response: a JSON object carrying `status` (or `http$` once forwarded),
/// `context` and whatever fields the template and caller merged in.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn status(&self) -> Option<&Value> {
        self.0.get(STATUS_KEY)
    }

    /// Raw `status.code` value, if present.
    #[must_use]
    pub fn status_code_value(&self) -> Option<&Value> {
        self.status().and_then(|s| s.get("code"))
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.0.get(CONTEXT_KEY).and_then(Value::as_str)
    }

    /// The `http$` summary attached by `forward`.
    #[must_use]
    pub fn http(&self) -> Option<HttpSummary> {
        self.0
            .get(HTTP_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        envelope.into_value()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HttpHeaders {
    pub date: String,
    #[serde(rename = "content-type")]
    pub content_type: String,
}

/// Flat HTTP-shaped status that replaces `status` on forwarded envelopes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HttpSummary {
    pub status: u16,
    pub headers: HttpHeaders,
}

impl HttpSummary {
    #[must_use]
    pub fn new(status: u16, now: DateTime<Utc>) -> Self {
        Self {
            status,
            headers: HttpHeaders {
                date: rfc1123(now),
                content_type: "application/json".to_string(),
            },
        }
    }
}

/// `Tue, 15 Nov 1994 08:12:31 GMT`
#[must_use]
pub fn rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
