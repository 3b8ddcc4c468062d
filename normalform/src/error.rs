use normalform_core::CaptureError;
use normalform_openai::OpenAiError;
use thiserror::Error;

/// Failures while constructing a tracked client.
///
/// Calls made through a tracked client return the wrapped client's own
/// [`OpenAiError`] unchanged; this type never appears on that path.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Client(#[from] OpenAiError),
}
