use std::fmt;
use std::sync::Arc;

use normalform_core::RequestHook;
use reqwest::blocking::{Request, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientSettings;
use crate::{
    ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest, EmbeddingResponse,
    ModelList, OpenAiClientBuilder, OpenAiError,
};

/// Blocking counterpart of [`crate::OpenAiClient`].
///
/// Must not be used from inside an async runtime.
#[derive(Clone)]
pub struct BlockingOpenAiClient {
    http: reqwest::blocking::Client,
    settings: Arc<ClientSettings>,
}

impl fmt::Debug for BlockingOpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingOpenAiClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl BlockingOpenAiClient {
    pub fn builder() -> OpenAiClientBuilder {
        OpenAiClientBuilder::new()
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self, OpenAiError> {
        Self::builder().api_key(api_key).build_blocking()
    }

    pub fn from_env() -> Result<Self, OpenAiError> {
        OpenAiClientBuilder::from_env().build_blocking()
    }

    pub(crate) fn from_parts(http: reqwest::blocking::Client, settings: ClientSettings) -> Self {
        Self {
            http,
            settings: Arc::new(settings),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    pub fn hooks(&self) -> &[Arc<dyn RequestHook>] {
        &self.settings.hooks
    }

    pub fn with_leading_hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        Arc::make_mut(&mut self.settings).hooks.insert(0, hook);
        self
    }

    pub fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        self.send_json(Method::POST, "chat/completions", Some(request))
    }

    pub fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, OpenAiError> {
        self.send_json(Method::POST, "embeddings", Some(request))
    }

    pub fn list_models(&self) -> Result<ModelList, OpenAiError> {
        self.send_json::<(), _>(Method::GET, "models", None)
    }

    pub fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, OpenAiError> {
        self.send_json(method, path, body)
    }

    fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, OpenAiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self
            .http
            .request(method, self.settings.endpoint(path))
            .headers(self.settings.headers.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = self.execute(builder.build()?)?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(OpenAiError::from_response(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|err| OpenAiError::Decode {
            message: format!("failed to decode response body: {err}"),
        })
    }

    fn execute(&self, request: Request) -> Result<Response, OpenAiError> {
        self.settings.observe(
            request.method(),
            request.url(),
            request.headers(),
            request.body().and_then(|body| body.as_bytes()),
        );
        Ok(self.http.execute(request)?)
    }
}
