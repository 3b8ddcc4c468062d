//! Capture the payloads an OpenAI-compatible client sends.
//!
//! [`TrackedOpenAi`] wraps an [`OpenAiClient`] and keeps its last few
//! outbound requests (model, messages, temperature, full body and redacted
//! headers) in a bounded in-memory history. Requests and responses pass
//! through untouched, and errors from the API reach the caller unchanged.
//!
//! Enable the `blocking` feature for [`BlockingTrackedOpenAi`].

mod builder;
mod error;
mod tracked;

#[cfg(feature = "blocking")]
mod blocking;

pub use builder::TrackedOpenAiBuilder;
pub use error::Error;
pub use tracked::TrackedOpenAi;

#[cfg(feature = "blocking")]
pub use blocking::BlockingTrackedOpenAi;

pub use normalform_core::{
    CaptureError, CapturedRequest, HistoryBuffer, HistoryRecorder, OutboundRequest, RequestHook,
    SharedHistory, DEFAULT_HISTORY_SIZE,
};
pub use normalform_openai::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, EmbeddingInput, EmbeddingRequest,
    EmbeddingResponse, Method, ModelList, OpenAiClient, OpenAiClientBuilder, OpenAiError, Role,
};

#[cfg(feature = "blocking")]
pub use normalform_openai::BlockingOpenAiClient;
