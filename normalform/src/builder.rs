use std::sync::Arc;
use std::time::Duration;

use normalform_core::{HistoryRecorder, RequestHook, DEFAULT_HISTORY_SIZE};
use normalform_openai::OpenAiClientBuilder;

use crate::{Error, TrackedOpenAi};

/// Client options plus the size of the request history.
#[derive(Clone, Debug)]
pub struct TrackedOpenAiBuilder {
    client: OpenAiClientBuilder,
    history_size: usize,
}

impl Default for TrackedOpenAiBuilder {
    fn default() -> Self {
        Self::with_client(OpenAiClientBuilder::new())
    }
}

impl TrackedOpenAiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::with_client(OpenAiClientBuilder::from_env())
    }

    pub fn with_client(client: OpenAiClientBuilder) -> Self {
        Self {
            client,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }

    /// Number of requests kept; must be at least 1.
    pub fn history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        self.client = self.client.api_key(value);
        self
    }

    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.client = self.client.base_url(value);
        self
    }

    pub fn organization(mut self, value: impl Into<String>) -> Self {
        self.client = self.client.organization(value);
        self
    }

    pub fn project(mut self, value: impl Into<String>) -> Self {
        self.client = self.client.project(value);
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.client = self.client.timeout(value);
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.client = self.client.default_header(name, value);
        self
    }

    /// Additional hook; it runs after the history recorder.
    pub fn hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.client = self.client.hook(hook);
        self
    }

    pub fn build(self) -> Result<TrackedOpenAi, Error> {
        let recorder = HistoryRecorder::new(self.history_size)?;
        Ok(TrackedOpenAi::with_recorder(self.client.build()?, recorder))
    }

    #[cfg(feature = "blocking")]
    pub fn build_blocking(self) -> Result<crate::BlockingTrackedOpenAi, Error> {
        let recorder = HistoryRecorder::new(self.history_size)?;
        Ok(crate::BlockingTrackedOpenAi::with_recorder(
            self.client.build_blocking()?,
            recorder,
        ))
    }
}
