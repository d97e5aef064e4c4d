//! OpenAI-compatible implementation of the Inference trait.
//!
//! Works against any chat-completions endpoint that speaks the OpenAI
//! wire format (OpenAI itself, Azure, gateways, local servers). Error
//! classification is the important part: 429 maps to `Throttled`,
//! request-rejection 4xx (context window, bad schema) to `InvalidInput`,
//! everything else to `Inference`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::traits::inference::Inference;

/// Inference client for OpenAI-compatible chat-completions endpoints.
#[derive(Clone)]
pub struct OpenAIInference {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAIInference {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 8192,
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| ExtractError::Config {
            message: "OPENAI_API_KEY not set".into(),
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (Azure, proxies, local servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the completion token cap (default 8192).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Request-rejection phrases that mean the input itself is the problem.
const INPUT_ERROR_MARKERS: &[&str] = &["context_length", "maximum context length", "too large"];

#[async_trait]
impl Inference for OpenAIInference {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String> {
        let request = ChatRequest {
            model: model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractError::Inference(Box::new(e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractError::Throttled {
                model: model_id.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_client_error()
                && INPUT_ERROR_MARKERS.iter().any(|m| body.contains(m))
            {
                return Err(ExtractError::InvalidInput {
                    message: format!("model {model_id} rejected the input: {body}"),
                });
            }
            return Err(ExtractError::Inference(
                format!("inference endpoint returned {status}: {body}").into(),
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Inference(Box::new(e)))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ExtractError::EmptyResult)
    }
}
