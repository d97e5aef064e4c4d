use std::time::Duration;

use anyhow::{Context, Result};
use docstruct::{ModelPool, ModelSpec};
use dotenvy::dotenv;
use std::env;

/// Job configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    /// Override for OpenAI-compatible gateways; default is api.openai.com.
    pub inference_base_url: Option<String>,
    pub layout_service_url: String,
    pub status_service_url: String,
    /// `id:backoff_secs` pairs, most capable first.
    pub model_pool: Vec<(String, u64)>,
    /// Whole-job wall-clock deadline.
    pub deadline: Duration,
    /// Concurrent outbound-call admission limit across the job.
    pub admission_limit: usize,
    /// Files processed concurrently per batch, and the pause between batches.
    pub file_batch_size: usize,
    pub file_batch_pause: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let model_pool = parse_model_pool(
            &env::var("MODEL_POOL").unwrap_or_else(|_| "gpt-4o:60,gpt-4o-mini:20".to_string()),
        )
        .context("MODEL_POOL must be a comma-separated list of id:backoff_secs")?;

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            inference_base_url: env::var("INFERENCE_BASE_URL").ok(),
            layout_service_url: env::var("LAYOUT_SERVICE_URL")
                .context("LAYOUT_SERVICE_URL must be set")?,
            status_service_url: env::var("STATUS_SERVICE_URL")
                .context("STATUS_SERVICE_URL must be set")?,
            model_pool,
            deadline: Duration::from_secs(
                env::var("JOB_DEADLINE_SECS")
                    .unwrap_or_else(|_| "84600".to_string())
                    .parse()
                    .context("JOB_DEADLINE_SECS must be a number")?,
            ),
            admission_limit: 20,
            file_batch_size: 5,
            file_batch_pause: Duration::from_secs(30),
        })
    }

    /// Build a fresh model pool for one file's extraction.
    pub fn build_pool(&self) -> ModelPool {
        ModelPool::new(
            self.model_pool
                .iter()
                .map(|(id, backoff)| ModelSpec::new(id, Duration::from_secs(*backoff))),
        )
    }
}

fn parse_model_pool(raw: &str) -> Result<Vec<(String, u64)>> {
    let mut pool = Vec::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let (id, backoff) = entry
            .trim()
            .rsplit_once(':')
            .with_context(|| format!("invalid model pool entry: {entry}"))?;
        pool.push((id.to_string(), backoff.parse()?));
    }
    anyhow::ensure!(!pool.is_empty(), "model pool is empty");
    Ok(pool)
}

/// Concatenate the `JOB_DATA_{i}` environment chunks into one payload.
/// Large payloads arrive split across numbered variables.
pub fn read_job_payload() -> String {
    let count: usize = env::var("JOB_DATA_COUNT")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(1);

    let mut payload = String::new();
    for i in 1..=count {
        if let Ok(chunk) = env::var(format!("JOB_DATA_{i}")) {
            payload.push_str(&chunk);
        }
    }
    payload
}
