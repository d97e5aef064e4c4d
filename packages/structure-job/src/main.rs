// Entry point for the document structuring job.
//
// Consumes a job descriptor from the trigger payload, fans out per-file
// processing in bounded batches, and races the whole run against a
// wall-clock deadline. Individual file failures are recorded and
// swallowed; the process exits non-zero only on process-level errors or
// the deadline, which triggers a wholesale retry upstream.

mod callback;
mod config;
mod files;
mod job;
mod process;
mod reader;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use docstruct::{OpenAIInference, StatusSink};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::callback::HttpResultSink;
use crate::config::Config;
use crate::job::JobDescriptor;
use crate::process::ProcessConfig;
use crate::reader::HttpDocumentReader;
use crate::status::HttpStatusSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,structure_job=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting document structuring job");

    let config = Config::from_env().context("Failed to load configuration")?;

    let payload = config::read_job_payload();
    if payload.trim().is_empty() {
        tracing::info!("No job payload provided");
        return Ok(());
    }

    let job: JobDescriptor =
        serde_json::from_str(&payload).context("Failed to parse job payload")?;
    tracing::info!(
        ticket_id = %job.ticket_id,
        files = job.files.len(),
        mode = ?job.type_output,
        "Job payload parsed"
    );

    let client = reqwest::Client::new();
    let mut inference = OpenAIInference::new(&config.openai_api_key);
    if let Some(base_url) = &config.inference_base_url {
        inference = inference.with_base_url(base_url);
    }
    let reader = HttpDocumentReader::new(client.clone(), &config.layout_service_url);
    let status = HttpStatusSink::new(client.clone(), &config.status_service_url);
    let callback = HttpResultSink::new(client.clone());
    let process_config = ProcessConfig::default();

    tokio::select! {
        _ = run_job(&job, &config, &client, &inference, &reader, &status, &callback, &process_config) => {
            tracing::info!(ticket_id = %job.ticket_id, "Job complete");
            Ok(())
        }
        _ = tokio::time::sleep(config.deadline) => {
            tracing::error!(ticket_id = %job.ticket_id, "Job deadline exceeded");
            if let Err(err) = status
                .fail_ticket(
                    &job.ticket_id,
                    "The job timed out. Split the work into fewer files and retry.",
                )
                .await
            {
                tracing::warn!(error = %err, "could not record ticket failure");
            }
            anyhow::bail!("job deadline exceeded after {:?}", config.deadline)
        }
    }
}

/// Process the job's files in fixed-size concurrent batches, pausing
/// between batches. A global semaphore caps concurrent outbound work
/// across the whole job.
#[allow(clippy::too_many_arguments)]
async fn run_job(
    job: &JobDescriptor,
    config: &Config,
    client: &reqwest::Client,
    inference: &OpenAIInference,
    reader: &HttpDocumentReader,
    status: &HttpStatusSink,
    callback: &HttpResultSink,
    process_config: &ProcessConfig,
) {
    let semaphore = Arc::new(Semaphore::new(config.admission_limit));

    let mut batches = job.files.chunks(config.file_batch_size).peekable();
    while let Some(batch) = batches.next() {
        join_all(batch.iter().map(|file| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                process::process_file(
                    job,
                    file,
                    client,
                    inference,
                    reader,
                    status,
                    callback,
                    config.build_pool(),
                    process_config,
                )
                .await;
            }
        }))
        .await;

        if batches.peek().is_some() {
            tokio::time::sleep(config.file_batch_pause).await;
        }
    }
}
