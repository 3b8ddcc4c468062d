//! Capture primitives shared by the normalform clients.
//!
//! A [`HistoryRecorder`] is registered as a [`RequestHook`] on an HTTP client's
//! single send path. Every outbound request is turned into an immutable
//! [`CapturedRequest`] and appended to a bounded [`HistoryBuffer`], evicting the
//! oldest record once the configured size is reached.
//!
//! ```rust
//! use normalform_core::{HistoryRecorder, OutboundRequest, RequestHook};
//! use http::{HeaderMap, Method};
//! use url::Url;
//!
//! let recorder = HistoryRecorder::new(2).unwrap();
//! let url = Url::parse("https://api.openai.com/v1/chat/completions").unwrap();
//! let body = br#"{"model":"gpt-4o-mini","messages":[]}"#;
//! let headers = HeaderMap::new();
//!
//! recorder.on_request(&OutboundRequest {
//!     method: &Method::POST,
//!     url: &url,
//!     base_url: "https://api.openai.com/v1",
//!     headers: &headers,
//!     body: Some(body),
//! });
//!
//! let last = recorder.history().last().unwrap();
//! assert_eq!(last.model(), Some("gpt-4o-mini"));
//! assert_eq!(last.endpoint(), "chat/completions");
//! ```

mod captured;
mod error;
pub mod extract;
mod history;
mod hook;

pub use captured::CapturedRequest;
pub use error::CaptureError;
pub use history::{HistoryBuffer, SharedHistory, DEFAULT_HISTORY_SIZE};
pub use hook::{HistoryRecorder, OutboundRequest, RequestHook};
