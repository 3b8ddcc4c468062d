//! OpenAI-compatible HTTP client for normalform.
//!
//! Chat completions, embeddings and model listing all go through one send
//! path per client. Hooks registered on the client see each fully built
//! request there, before it is executed, and cannot change it.

mod client;
mod config;
mod error;
pub mod types;

#[cfg(feature = "blocking")]
mod blocking;

pub use client::OpenAiClient;
pub use config::{OpenAiClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::OpenAiError;
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, EmbeddingData,
    EmbeddingInput, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage, Model, ModelList,
    ResponseMessage, Role, Usage,
};

#[cfg(feature = "blocking")]
pub use blocking::BlockingOpenAiClient;

pub use normalform_core::{OutboundRequest, RequestHook};
pub use reqwest::Method;
