//! Typed errors for the structuring library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to keep the
//! retryable/permanent distinction explicit at every call site.

use thiserror::Error;

/// Errors that can occur during extraction operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Upstream rate-limit rejection. Retryable via model rotation.
    #[error("model throttled: {model}")]
    Throttled { model: String },

    /// Input-validity failure (content exceeds the model's context limit,
    /// schema rejected). Permanent; surfaced to the user without retry.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Any other inference-endpoint failure. Not retried.
    #[error("inference error: {0}")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Model output could not be decoded as JSON, even after repair.
    /// Carries the raw text for diagnostics.
    #[error("failed to parse model output: {source}")]
    Parse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// The retry policy's wall-clock budget ran out while throttled.
    #[error("retry deadline exceeded")]
    DeadlineExceeded,

    /// The model returned nothing usable for the record.
    #[error("model returned no usable result")]
    EmptyResult,

    /// Document-to-text collaborator failed.
    #[error("document read error: {0}")]
    Reader(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Ticket/status store collaborator failed.
    #[error("status store error: {0}")]
    Status(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Caller-supplied configuration is unusable (e.g. empty model pool).
    #[error("config error: {message}")]
    Config { message: String },
}

impl ExtractError {
    /// Whether this error is throttle-class (retryable with rotation).
    pub fn is_throttle(&self) -> bool {
        matches!(self, ExtractError::Throttled { .. })
    }

    /// Whether this error is permanent input-class (never retried).
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ExtractError::InvalidInput { .. })
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
