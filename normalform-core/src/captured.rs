use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extract::{
    endpoint_of, is_credential_header, join_header, max_tokens_of, optional_f64,
    optional_messages, optional_str,
};

/// Snapshot of one outbound API request.
///
/// Every field is derived once, at construction, from the request line, the
/// JSON body and the headers. There are no setters: a record handed out by a
/// history is a copy and can never change the history's own entry.
///
/// Deserializing goes through the same construction, so derived fields are
/// recomputed from the stored body and credential headers are dropped again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRequest")]
pub struct CapturedRequest {
    timestamp: DateTime<Utc>,
    method: String,
    url: String,
    base_url: String,
    endpoint: String,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    messages: Option<Vec<Map<String, Value>>>,
    body: Map<String, Value>,
    headers: BTreeMap<String, String>,
}

impl CapturedRequest {
    /// Builds a record stamped with the current UTC time.
    ///
    /// `model`, `temperature`, `max_tokens` and `messages` are looked up in
    /// `body`; a missing or mistyped key leaves the field empty. Credential
    /// headers are dropped regardless of how their names are cased.
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        base_url: impl Into<String>,
        body: Map<String, Value>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self::at(Utc::now(), method, url, base_url, body, headers)
    }

    /// Same as [`CapturedRequest::new`] with an explicit capture time.
    pub fn at(
        timestamp: DateTime<Utc>,
        method: impl Into<String>,
        url: impl Into<String>,
        base_url: impl Into<String>,
        body: Map<String, Value>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        let url: String = url.into();
        let method: String = method.into();
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        let endpoint = endpoint_of(&url, &base_url);
        let headers = headers
            .into_iter()
            .filter(|(name, _)| !is_credential_header(name))
            .fold(BTreeMap::new(), |mut out, (name, value)| {
                join_header(&mut out, name.to_ascii_lowercase(), value);
                out
            });

        Self {
            timestamp,
            method: method.to_ascii_uppercase(),
            model: optional_str(&body, "model"),
            temperature: optional_f64(&body, "temperature"),
            max_tokens: max_tokens_of(&body),
            messages: optional_messages(&body),
            url,
            base_url,
            endpoint,
            body,
            headers,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path of the call relative to the base URL, e.g. `chat/completions`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn max_tokens(&self) -> Option<u64> {
        self.max_tokens
    }

    pub fn messages(&self) -> Option<&[Map<String, Value>]> {
        self.messages.as_deref()
    }

    /// The full JSON payload. Empty when the request had no JSON object body.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Outbound headers keyed by lower-cased name, credentials removed.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Deserialize)]
struct StoredRequest {
    timestamp: DateTime<Utc>,
    method: String,
    url: String,
    base_url: String,
    #[serde(default)]
    body: Map<String, Value>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl From<StoredRequest> for CapturedRequest {
    fn from(stored: StoredRequest) -> Self {
        Self::at(
            stored.timestamp,
            stored.method,
            stored.url,
            stored.base_url,
            stored.body,
            stored.headers,
        )
    }
}
