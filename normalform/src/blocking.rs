use std::sync::Arc;

use normalform_core::{CapturedRequest, HistoryRecorder};
use normalform_openai::{
    BlockingOpenAiClient, ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest,
    EmbeddingResponse, Method, ModelList, OpenAiError,
};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, TrackedOpenAiBuilder};

/// Blocking counterpart of [`crate::TrackedOpenAi`], with the same capture
/// behaviour.
#[derive(Clone, Debug)]
pub struct BlockingTrackedOpenAi {
    client: BlockingOpenAiClient,
    recorder: HistoryRecorder,
}

impl BlockingTrackedOpenAi {
    pub fn builder() -> TrackedOpenAiBuilder {
        TrackedOpenAiBuilder::new()
    }

    pub fn from_env() -> Result<Self, Error> {
        TrackedOpenAiBuilder::from_env().build_blocking()
    }

    pub fn new(client: BlockingOpenAiClient, history_size: usize) -> Result<Self, Error> {
        Ok(Self::with_recorder(client, HistoryRecorder::new(history_size)?))
    }

    pub(crate) fn with_recorder(client: BlockingOpenAiClient, recorder: HistoryRecorder) -> Self {
        tracing::debug!(
            base_url = client.base_url(),
            history_size = recorder.history().capacity(),
            "tracking outbound requests"
        );
        let client = client.with_leading_hook(Arc::new(recorder.clone()));
        Self { client, recorder }
    }

    pub fn inner(&self) -> &BlockingOpenAiClient {
        &self.client
    }

    pub fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        self.client.chat_completion(request)
    }

    pub fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, OpenAiError> {
        self.client.embeddings(request)
    }

    pub fn list_models(&self) -> Result<ModelList, OpenAiError> {
        self.client.list_models()
    }

    pub fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, OpenAiError> {
        self.client.request_json(method, path, body)
    }

    pub fn history(&self) -> Vec<CapturedRequest> {
        self.recorder.history().snapshot()
    }

    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.recorder.history().last()
    }

    pub fn clear_history(&self) {
        self.recorder.history().clear();
    }

    pub fn history_size(&self) -> usize {
        self.recorder.history().capacity()
    }
}
