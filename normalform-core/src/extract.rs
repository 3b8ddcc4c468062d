//! Field extraction for captured requests.
//!
//! Everything here is lenient: a key that is missing or holds an unexpected
//! type yields `None`, and a body that cannot be decoded is reported as a
//! [`CaptureError::Extraction`] for the caller to log and drop.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use http::header::HeaderMap;
use serde_json::{Map, Value};

use crate::{CaptureError, CapturedRequest, OutboundRequest};

const CREDENTIAL_HEADERS: [&str; 2] = ["authorization", "proxy-authorization"];

/// Decodes a request body into a JSON object.
pub fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, CaptureError> {
    if bytes.is_empty() {
        return Ok(Map::new());
    }
    let text = std::str::from_utf8(bytes).map_err(|err| CaptureError::Extraction {
        reason: format!("body is not valid UTF-8: {err}"),
    })?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CaptureError::Extraction {
            reason: format!("body is JSON {} rather than an object", json_kind(&other)),
        }),
        Err(err) => Err(CaptureError::Extraction {
            reason: format!("body is not JSON: {err}"),
        }),
    }
}

pub fn optional_str(body: &Map<String, Value>, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn optional_f64(body: &Map<String, Value>, key: &str) -> Option<f64> {
    body.get(key).and_then(Value::as_f64)
}

pub fn optional_u64(body: &Map<String, Value>, key: &str) -> Option<u64> {
    body.get(key).and_then(Value::as_u64)
}

/// `max_tokens`, or `max_completion_tokens` when the former is absent or zero.
pub fn max_tokens_of(body: &Map<String, Value>) -> Option<u64> {
    optional_u64(body, "max_tokens")
        .filter(|tokens| *tokens != 0)
        .or_else(|| optional_u64(body, "max_completion_tokens"))
}

/// The `messages` array, provided every element is a JSON object.
pub fn optional_messages(body: &Map<String, Value>) -> Option<Vec<Map<String, Value>>> {
    let items = body.get("messages")?.as_array()?;
    items
        .iter()
        .map(|item| item.as_object().cloned())
        .collect::<Option<Vec<_>>>()
}

pub fn is_credential_header(name: &str) -> bool {
    CREDENTIAL_HEADERS
        .iter()
        .any(|credential| name.eq_ignore_ascii_case(credential))
}

/// Copies `headers` into a name-ordered map without credential headers.
///
/// Repeated headers are joined with `", "`. Values that are not visible ASCII
/// are kept in lossy UTF-8 form.
pub fn redact_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        if is_credential_header(name.as_str()) {
            continue;
        }
        let value = match value.to_str() {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };
        join_header(&mut out, name.as_str().to_string(), value);
    }
    out
}

/// Adds `value` under `name`, appending with `", "` when the name is
/// already present.
pub(crate) fn join_header(headers: &mut BTreeMap<String, String>, name: String, value: String) {
    match headers.entry(name) {
        Entry::Occupied(mut entry) => {
            let existing = entry.get_mut();
            existing.push_str(", ");
            existing.push_str(&value);
        }
        Entry::Vacant(entry) => {
            entry.insert(value);
        }
    }
}

/// Path of `url` relative to `base_url`, without a leading `/`.
///
/// The base is only stripped on a path boundary; a URL outside the base is
/// returned whole.
pub fn endpoint_of(url: &str, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let relative = match url.strip_prefix(base_url) {
        Some(rest) if base_url.is_empty() => rest,
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '?']) => rest,
        _ => url,
    };
    relative.trim_start_matches('/').to_string()
}

/// Builds a [`CapturedRequest`] from an outbound request. Never fails: a body
/// that cannot be decoded is logged and recorded as an empty object.
pub fn capture_request(request: &OutboundRequest<'_>) -> CapturedRequest {
    let body = match request.body.map(parse_body).transpose() {
        Ok(body) => body.unwrap_or_default(),
        Err(err) => {
            tracing::debug!(
                url = %request.url,
                error = %err,
                "recording request without body fields"
            );
            Map::new()
        }
    };

    CapturedRequest::new(
        request.method.as_str(),
        request.url.as_str(),
        request.base_url,
        body,
        redact_headers(request.headers),
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderValue, AUTHORIZATION, PROXY_AUTHORIZATION};
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn endpoint_strips_base_on_path_boundary() {
        let base = "https://api.openai.com/v1";
        assert_eq!(
            endpoint_of("https://api.openai.com/v1/chat/completions", base),
            "chat/completions"
        );
        assert_eq!(endpoint_of("https://api.openai.com/v1", base), "");
        assert_eq!(
            endpoint_of("https://api.openai.com/v1/", "https://api.openai.com/v1/"),
            ""
        );
        assert_eq!(
            endpoint_of("https://api.openai.com/v10/models", base),
            "https://api.openai.com/v10/models"
        );
    }

    #[test]
    fn endpoint_keeps_query_string() {
        assert_eq!(
            endpoint_of(
                "http://localhost:8080/v1/models?limit=2",
                "http://localhost:8080/v1"
            ),
            "models?limit=2"
        );
    }

    #[test]
    fn max_tokens_falls_back_to_completion_tokens() {
        assert_eq!(max_tokens_of(&object(json!({"max_tokens": 12}))), Some(12));
        assert_eq!(
            max_tokens_of(&object(json!({"max_completion_tokens": 30}))),
            Some(30)
        );
        assert_eq!(
            max_tokens_of(&object(json!({"max_tokens": 0, "max_completion_tokens": 30}))),
            Some(30)
        );
        assert_eq!(max_tokens_of(&object(json!({"max_tokens": 0}))), None);
        assert_eq!(max_tokens_of(&object(json!({"max_tokens": "many"}))), None);
    }

    #[test]
    fn mistyped_fields_are_absent() {
        let body = object(json!({
            "model": 4,
            "temperature": "hot",
            "messages": [{"role": "user", "content": "hi"}, "loose string"]
        }));
        assert_eq!(optional_str(&body, "model"), None);
        assert_eq!(optional_f64(&body, "temperature"), None);
        assert_eq!(optional_messages(&body), None);
    }

    #[test]
    fn integer_temperature_reads_as_float() {
        let body = object(json!({"temperature": 1}));
        assert_eq!(optional_f64(&body, "temperature"), Some(1.0));
    }

    #[test]
    fn parse_body_rejects_non_objects() {
        assert_eq!(parse_body(b"").unwrap(), Map::new());
        assert!(matches!(
            parse_body(b"[1, 2]"),
            Err(CaptureError::Extraction { .. })
        ));
        assert!(matches!(
            parse_body(b"{not json"),
            Err(CaptureError::Extraction { .. })
        ));
        assert!(matches!(
            parse_body(&[0xff, 0xfe]),
            Err(CaptureError::Extraction { .. })
        ));
    }

    #[test]
    fn redact_headers_joins_repeats_and_drops_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk-test"));
        headers.insert(
            PROXY_AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.append("accept", HeaderValue::from_static("text/plain"));
        headers.insert("openai-project", HeaderValue::from_static("proj_1"));

        let redacted = redact_headers(&headers);
        assert_eq!(redacted.len(), 2);
        assert_eq!(redacted["accept"], "application/json, text/plain");
        assert_eq!(redacted["openai-project"], "proj_1");
    }
}
