use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("invalid configuration: api key is required")]
    MissingApiKey,
    #[error("invalid configuration: base_url '{url}' is not a valid URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid configuration: header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("OpenAI API returned HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        error_type: Option<String>,
        code: Option<String>,
    },
    #[error("invalid response: {message}")]
    Decode { message: String },
}

impl OpenAiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenAiError::Api { status, .. } => Some(*status),
            OpenAiError::Request(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let trimmed = body.trim();
        match serde_json::from_str::<ErrorEnvelope>(trimmed) {
            Ok(envelope) => OpenAiError::Api {
                status,
                message: envelope.error.message,
                error_type: envelope.error.error_type,
                code: envelope.error.code.and_then(code_to_string),
            },
            Err(_) => OpenAiError::Api {
                status,
                message: if trimmed.is_empty() {
                    "empty error body".to_string()
                } else {
                    trimmed.to_string()
                },
                error_type: None,
                code: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

fn code_to_string(code: Value) -> Option<String> {
    match code {
        Value::Null => None,
        Value::String(code) => Some(code),
        other => Some(other.to_string()),
    }
}
