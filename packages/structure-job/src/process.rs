//! Per-file processing: resolve, read, structure, deliver, record.
//!
//! Failures here are isolated: they are recorded in the status store and
//! swallowed so sibling files keep processing.

use std::time::Duration;

use docstruct::{
    default_confidence, run, DocumentReader, DocumentSource, ExtractError, ExtractionOutcome,
    ExtractionRequest, FileStatus, Inference, ModelPool, OutputMode, PipelineConfig,
    SourceContent, StatusSink,
};
use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::callback::{CallbackPayload, ResultSink};
use crate::files;
use crate::job::{JobDescriptor, JobFile};

/// Per-file processing knobs.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub pipeline: PipelineConfig,
    /// Document-conversion attempts before the file fails.
    pub ocr_attempts: usize,
    pub ocr_retry_pause: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            ocr_attempts: 5,
            ocr_retry_pause: Duration::from_secs(60),
        }
    }
}

/// Download a file, process it, and clean up the temp copy.
#[allow(clippy::too_many_arguments)]
pub async fn process_file<I, R, S, C>(
    job: &JobDescriptor,
    file: &JobFile,
    client: &reqwest::Client,
    inference: &I,
    reader: &R,
    status: &S,
    callback: &C,
    pool: ModelPool,
    config: &ProcessConfig,
) where
    I: Inference + ?Sized,
    R: DocumentReader + ?Sized,
    S: StatusSink + ?Sized,
    C: ResultSink + ?Sized,
{
    let url = file.url.trim();
    tracing::info!(file_id = %file.id, url, "resolving file");

    match files::resolve_file(client, url).await {
        Ok((extension, path)) => {
            let location = path.to_string_lossy().to_string();
            process_resolved(
                job, file, &extension, &location, inference, reader, status, callback, pool,
                config,
            )
            .await;
            files::cleanup(&path).await;
        }
        Err(err) => {
            tracing::warn!(file_id = %file.id, error = %err, "download failed");
            record_failure(
                status,
                job,
                file,
                "Could not download the file for processing.",
            )
            .await;
        }
    }
}

/// Process an already-resolved file. Never propagates: success posts the
/// callback and marks Completed, failure marks Failed.
#[allow(clippy::too_many_arguments)]
pub async fn process_resolved<I, R, S, C>(
    job: &JobDescriptor,
    file: &JobFile,
    extension: &str,
    location: &str,
    inference: &I,
    reader: &R,
    status: &S,
    callback: &C,
    pool: ModelPool,
    config: &ProcessConfig,
) where
    I: Inference + ?Sized,
    R: DocumentReader + ?Sized,
    S: StatusSink + ?Sized,
    C: ResultSink + ?Sized,
{
    let url = file.url.trim();

    if let Err(err) = status
        .upsert_file(&job.ticket_id, &FileStatus::processing(&file.id, url))
        .await
    {
        tracing::warn!(file_id = %file.id, error = %err, "status upsert failed");
    }

    match structure_file(job, file, extension, location, inference, reader, pool, config).await {
        Ok((data, confidence)) => {
            let payload = CallbackPayload {
                ticket_id: job.ticket_id.clone(),
                file_id: file.id.clone(),
                data,
                confidence,
                suggestion: json!({}),
            };
            if let Err(err) = callback.deliver(&job.api_endpoint, &payload).await {
                tracing::warn!(file_id = %file.id, error = %err, "callback delivery failed");
            }

            if let Err(err) = status
                .upsert_file(
                    &job.ticket_id,
                    &FileStatus::completed(&file.id, url, "Processing succeeded."),
                )
                .await
            {
                tracing::warn!(file_id = %file.id, error = %err, "status upsert failed");
            }
        }
        Err(message) => {
            tracing::warn!(file_id = %file.id, message, "file processing failed");
            record_failure(status, job, file, &message).await;
        }
    }
}

/// Read and structure one file, returning the callback `data` value and
/// per-field confidence. Errors are user-facing messages.
#[allow(clippy::too_many_arguments)]
async fn structure_file<I, R>(
    job: &JobDescriptor,
    file: &JobFile,
    extension: &str,
    location: &str,
    inference: &I,
    reader: &R,
    pool: ModelPool,
    config: &ProcessConfig,
) -> Result<(Value, IndexMap<String, f64>), String>
where
    I: Inference + ?Sized,
    R: DocumentReader + ?Sized,
{
    if !files::is_supported(extension) {
        return Err(
            "Unsupported file extension. Provide a PDF, DOCX, or XLSX file.".to_string(),
        );
    }

    let schema = job.schema.to_field_schema();
    let url = file.url.trim();

    let tabular = matches!(extension, "xlsx" | "xls") && job.type_output == OutputMode::Array;
    let content = if tabular {
        let sheets = reader.read_workbook(location).await.map_err(|err| {
            tracing::warn!(file_id = %file.id, error = %err, "workbook read failed");
            format!("Could not read the spreadsheet {url}. Check that the file is valid.")
        })?;
        SourceContent::Sheets(sheets)
    } else {
        let pages = read_text_with_retries(reader, location, extension, file, config).await?;
        let text = pages.join("\n");
        if text.trim().is_empty() {
            return Err(format!(
                "Could not convert {url} to text. The file may be empty or unreadable."
            ));
        }
        SourceContent::Text(text)
    };

    let request = ExtractionRequest {
        content,
        schema: schema.clone(),
        instruction: job.prompt.clone(),
        mode: job.type_output,
        ensemble: true,
        pool,
    };
    let source =
        DocumentSource::new(&file.id, url).with_name_parts(job.gen_source_name.clone());

    match run(inference, &request, &source, &config.pipeline).await {
        Ok(ExtractionOutcome::Object(outcome)) => Ok((
            Value::Object(outcome.record.into_payload()),
            outcome.confidence,
        )),
        Ok(ExtractionOutcome::Array(records)) => Ok((
            Value::Array(
                records
                    .into_iter()
                    .map(|r| Value::Object(r.into_payload()))
                    .collect(),
            ),
            default_confidence(&schema),
        )),
        Err(err) => Err(user_message(&err)),
    }
}

/// Document conversion with bounded retries; the converter rate-limits
/// too.
async fn read_text_with_retries<R: DocumentReader + ?Sized>(
    reader: &R,
    location: &str,
    extension: &str,
    file: &JobFile,
    config: &ProcessConfig,
) -> Result<Vec<String>, String> {
    let mut last_error = None;
    for attempt in 1..=config.ocr_attempts.max(1) {
        match reader.read_text(location, extension).await {
            Ok(pages) => return Ok(pages),
            Err(err) => {
                tracing::warn!(
                    file_id = %file.id,
                    attempt,
                    error = %err,
                    "document conversion failed"
                );
                last_error = Some(err);
                if attempt < config.ocr_attempts {
                    tokio::time::sleep(config.ocr_retry_pause).await;
                }
            }
        }
    }

    let url = file.url.trim();
    tracing::warn!(file_id = %file.id, error = ?last_error, "document conversion exhausted retries");
    Err(format!(
        "Could not convert {url} to text. The conversion service may be rate limited or the \
         URL invalid; wait a while and retry."
    ))
}

/// Translate pipeline errors into user-facing failure messages.
fn user_message(err: &ExtractError) -> String {
    match err {
        ExtractError::InvalidInput { .. } => {
            "The input exceeds the model's limits. Reduce the input by removing unnecessary \
             pages and keeping only the ones you need."
                .to_string()
        }
        ExtractError::EmptyResult => {
            "The model returned no result. Check that the file content is clear, readable, and \
             not corrupted, then try again."
                .to_string()
        }
        ExtractError::Parse { .. } => {
            "The model response could not be interpreted. Try a different document or contact \
             support."
                .to_string()
        }
        ExtractError::DeadlineExceeded => {
            "Extraction kept hitting rate limits until the retry budget ran out. Retry later."
                .to_string()
        }
        other => other.to_string(),
    }
}

async fn record_failure<S: StatusSink + ?Sized>(
    status: &S,
    job: &JobDescriptor,
    file: &JobFile,
    message: &str,
) {
    if let Err(err) = status
        .upsert_file(
            &job.ticket_id,
            &FileStatus::failed(&file.id, file.url.trim(), message),
        )
        .await
    {
        tracing::warn!(file_id = %file.id, error = %err, "status upsert failed");
    }
}
