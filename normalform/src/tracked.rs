use std::sync::Arc;

use normalform_core::{CapturedRequest, HistoryRecorder};
use normalform_openai::{
    ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest, EmbeddingResponse, Method,
    ModelList, OpenAiClient, OpenAiError,
};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, TrackedOpenAiBuilder};

/// [`OpenAiClient`] that remembers the last few requests it sent.
///
/// The history recorder is installed as the first hook on the wrapped
/// client, so requests are captured whether they are issued through this
/// type or through [`TrackedOpenAi::inner`]. Capture happens just before a
/// request is sent: a call that then fails still leaves its attempted request
/// in the history.
///
/// ```rust,no_run
/// use normalform::{ChatCompletionRequest, ChatMessage, TrackedOpenAi};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TrackedOpenAi::builder()
///     .api_key("sk-...")
///     .history_size(5)
///     .build()?;
///
/// let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hello")]);
/// client.chat_completion(&request).await?;
///
/// let last = client.last_request().expect("one request was sent");
/// assert_eq!(last.model(), Some("gpt-4o-mini"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct TrackedOpenAi {
    client: OpenAiClient,
    recorder: HistoryRecorder,
}

impl TrackedOpenAi {
    pub fn builder() -> TrackedOpenAiBuilder {
        TrackedOpenAiBuilder::new()
    }

    /// Client configured from the `OPENAI_*` environment variables, keeping
    /// the default number of requests.
    pub fn from_env() -> Result<Self, Error> {
        TrackedOpenAiBuilder::from_env().build()
    }

    /// Wraps `client`, keeping up to `history_size` requests. Hooks already
    /// registered on `client` keep running after the recorder.
    pub fn new(client: OpenAiClient, history_size: usize) -> Result<Self, Error> {
        Ok(Self::with_recorder(client, HistoryRecorder::new(history_size)?))
    }

    pub(crate) fn with_recorder(client: OpenAiClient, recorder: HistoryRecorder) -> Self {
        tracing::debug!(
            base_url = client.base_url(),
            history_size = recorder.history().capacity(),
            "tracking outbound requests"
        );
        let client = client.with_leading_hook(Arc::new(recorder.clone()));
        Self { client, recorder }
    }

    pub fn inner(&self) -> &OpenAiClient {
        &self.client
    }

    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        self.client.chat_completion(request).await
    }

    pub async fn embeddings(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, OpenAiError> {
        self.client.embeddings(request).await
    }

    pub async fn list_models(&self) -> Result<ModelList, OpenAiError> {
        self.client.list_models().await
    }

    pub async fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, OpenAiError> {
        self.client.request_json(method, path, body).await
    }

    /// Captured requests, oldest first.
    pub fn history(&self) -> Vec<CapturedRequest> {
        self.recorder.history().snapshot()
    }

    /// The most recent captured request, if any request has been sent.
    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.recorder.history().last()
    }

    pub fn clear_history(&self) {
        self.recorder.history().clear();
    }

    /// Maximum number of requests kept.
    pub fn history_size(&self) -> usize {
        self.recorder.history().capacity()
    }
}
