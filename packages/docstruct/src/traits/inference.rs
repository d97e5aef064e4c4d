//! Inference trait for hosted LLM endpoints.

use async_trait::async_trait;

use crate::error::Result;

/// A hosted text-generation endpoint.
///
/// Implementations wrap a specific provider and MUST classify failures:
/// rate-limit rejections as [`ExtractError::Throttled`], input-validity
/// failures (context window exceeded, schema rejected) as
/// [`ExtractError::InvalidInput`], anything else as
/// [`ExtractError::Inference`]. The router's retry behavior depends on
/// that classification.
///
/// [`ExtractError::Throttled`]: crate::error::ExtractError::Throttled
/// [`ExtractError::InvalidInput`]: crate::error::ExtractError::InvalidInput
/// [`ExtractError::Inference`]: crate::error::ExtractError::Inference
#[async_trait]
pub trait Inference: Send + Sync {
    /// Generate text for `prompt` using the model identified by `model_id`.
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String>;
}
