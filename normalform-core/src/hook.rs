use http::{HeaderMap, Method};
use url::Url;

use crate::extract::capture_request;
use crate::{CaptureError, CapturedRequest, SharedHistory};

/// Borrowed view of a request that is about to be sent.
#[derive(Clone, Copy, Debug)]
pub struct OutboundRequest<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    /// Base URL the client was configured with.
    pub base_url: &'a str,
    pub headers: &'a HeaderMap,
    /// `None` for requests without a body or with a streaming body.
    pub body: Option<&'a [u8]>,
}

/// Observer invoked on the client's send path, once per request, before the
/// request leaves the process.
///
/// Hooks can only look at the request. They run synchronously and must not
/// block; anything that can fail has to be handled inside the hook.
pub trait RequestHook: Send + Sync {
    fn on_request(&self, request: &OutboundRequest<'_>);
}

impl<F> RequestHook for F
where
    F: Fn(&OutboundRequest<'_>) + Send + Sync,
{
    fn on_request(&self, request: &OutboundRequest<'_>) {
        self(request)
    }
}

/// Hook that snapshots every request into a [`SharedHistory`].
#[derive(Clone, Debug, Default)]
pub struct HistoryRecorder {
    history: SharedHistory,
}

impl HistoryRecorder {
    pub fn new(history_size: usize) -> Result<Self, CaptureError> {
        Ok(Self {
            history: SharedHistory::new(history_size)?,
        })
    }

    pub fn with_history(history: SharedHistory) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub fn record(&self, captured: CapturedRequest) {
        if let Some(evicted) = self.history.append(captured) {
            tracing::trace!(
                endpoint = evicted.endpoint(),
                "evicted oldest captured request"
            );
        }
    }
}

impl RequestHook for HistoryRecorder {
    fn on_request(&self, request: &OutboundRequest<'_>) {
        let captured = capture_request(request);
        tracing::debug!(
            method = captured.method(),
            endpoint = captured.endpoint(),
            model = captured.model().unwrap_or_default(),
            "captured outbound request"
        );
        self.record(captured);
    }
}
