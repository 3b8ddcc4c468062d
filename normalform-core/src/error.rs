use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("invalid configuration: history size must be at least 1, got {0}")]
    InvalidHistorySize(usize),
    #[error("could not extract request snapshot: {reason}")]
    Extraction { reason: String },
}
