//! Pipeline orchestration: object-mode and array-mode drivers.
//!
//! Object mode runs the consensus aggregator once over the document and
//! emits one record. Array mode segments the content, fans chunks out in
//! fixed concurrent batches with an inter-batch cooldown, and flattens
//! per-chunk record arrays in dispatch order.

use std::time::Duration;

use futures::future::{join_all, try_join_all};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{ExtractError, Result};
use crate::pipeline::consensus::{reconcile, ConsensusResult, DEFAULT_MIN_CLUSTER_LEN};
use crate::pipeline::extract::{extract_array_chunk, extract_object_chunk};
use crate::pipeline::router::{RetryPolicy, SharedModelPool};
use crate::segment::{self, ChunkedContent};
use crate::traits::inference::Inference;
use crate::types::record::{render_display_name, NamePart, Provenance, StructuredRecord};
use crate::types::request::{ExtractionRequest, OutputMode, PromptStrategy, SourceContent};
use crate::types::schema::FieldSchema;

/// Tuning for the pipeline drivers.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum substring length for consensus clustering.
    pub min_cluster_len: usize,

    /// Prompt strategies run concurrently when ensembling.
    pub ensemble_strategies: Vec<PromptStrategy>,

    /// Chunks dispatched concurrently per array-mode batch.
    pub chunk_batch_size: usize,

    /// Pause between array-mode batches, to respect upstream quotas.
    pub batch_cooldown: Duration,

    /// Generic-mode segmentation delimiter.
    pub delimiter: String,

    /// Generic-mode maximum chunk length.
    pub max_chunk_len: usize,

    /// Wall-clock retry budget per extraction call; `None` leaves
    /// termination to the external job watchdog.
    pub retry_budget: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_cluster_len: DEFAULT_MIN_CLUSTER_LEN,
            ensemble_strategies: vec![
                PromptStrategy::Default,
                PromptStrategy::Table,
                PromptStrategy::KeyValue,
            ],
            chunk_batch_size: 5,
            batch_cooldown: Duration::from_secs(10),
            delimiter: segment::PAGE_BREAK.to_string(),
            max_chunk_len: segment::DEFAULT_MAX_CHUNK_LEN,
            retry_budget: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_cooldown(mut self, cooldown: Duration) -> Self {
        self.batch_cooldown = cooldown;
        self
    }

    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = Some(budget);
        self
    }

    fn policy(&self) -> RetryPolicy {
        match self.retry_budget {
            Some(budget) => RetryPolicy::with_budget(budget),
            None => RetryPolicy::unbounded(),
        }
    }
}

/// Identity of the document being extracted, for provenance stamping.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub id: String,
    pub url: String,
    pub name_parts: Vec<NamePart>,
}

impl DocumentSource {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name_parts: Vec::new(),
        }
    }

    pub fn with_name_parts(mut self, parts: Vec<NamePart>) -> Self {
        self.name_parts = parts;
        self
    }

    fn stamp(&self, fields: Map<String, Value>) -> StructuredRecord {
        let display_name = render_display_name(&self.name_parts, &fields);
        StructuredRecord::new(
            fields,
            Provenance {
                source_id: self.id.clone(),
                source_url: self.url.clone(),
                display_name,
            },
        )
    }
}

/// Object-mode result: one record plus per-field confidence.
#[derive(Debug, Clone)]
pub struct ObjectOutcome {
    pub record: StructuredRecord,
    pub confidence: IndexMap<String, f64>,
}

/// Either mode's result.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    Object(ObjectOutcome),
    Array(Vec<StructuredRecord>),
}

/// Run one extraction request end to end, dispatching on its mode.
pub async fn run<I: Inference + ?Sized>(
    inference: &I,
    request: &ExtractionRequest,
    source: &DocumentSource,
    config: &PipelineConfig,
) -> Result<ExtractionOutcome> {
    match request.mode {
        OutputMode::Object => extract_object(inference, request, source, config)
            .await
            .map(ExtractionOutcome::Object),
        OutputMode::Array => extract_array(inference, request, source, config)
            .await
            .map(ExtractionOutcome::Array),
    }
}

/// Object mode: ensemble the prompt strategies over the whole document,
/// vote per field, stamp provenance. Empty properties are a terminal
/// failure for the document.
pub async fn extract_object<I: Inference + ?Sized>(
    inference: &I,
    request: &ExtractionRequest,
    source: &DocumentSource,
    config: &PipelineConfig,
) -> Result<ObjectOutcome> {
    let content = match &request.content {
        SourceContent::Text(text) => text.as_str(),
        SourceContent::Sheets(_) => {
            return Err(ExtractError::Config {
                message: "object mode requires text content".into(),
            })
        }
    };

    let pool = SharedModelPool::new(request.pool.clone());
    let policy = config.policy();

    let strategies: Vec<PromptStrategy> = if request.ensemble {
        config.ensemble_strategies.clone()
    } else {
        vec![PromptStrategy::Default]
    };

    tracing::info!(
        source_id = %source.id,
        strategies = strategies.len(),
        "starting object-mode extraction"
    );

    let attempts = try_join_all(strategies.into_iter().map(|strategy| {
        extract_object_chunk(
            inference,
            &pool,
            &policy,
            content,
            &request.schema,
            &request.instruction,
            strategy,
        )
    }))
    .await?;

    let consensus: ConsensusResult = reconcile(&attempts, &request.schema, config.min_cluster_len);
    if consensus.is_empty() {
        return Err(ExtractError::EmptyResult);
    }

    Ok(ObjectOutcome {
        record: source.stamp(consensus.fields),
        confidence: consensus.confidence,
    })
}

/// Array mode: segment, fan out chunks in fixed concurrent batches with a
/// cooldown between batches, and flatten per-chunk records in dispatch
/// order. Failed chunks are logged and skipped; zero records overall is a
/// terminal failure.
pub async fn extract_array<I: Inference + ?Sized>(
    inference: &I,
    request: &ExtractionRequest,
    source: &DocumentSource,
    config: &PipelineConfig,
) -> Result<Vec<StructuredRecord>> {
    let chunks = match &request.content {
        SourceContent::Text(text) => ChunkedContent::Text(segment::split_content(
            text,
            &config.delimiter,
            config.max_chunk_len,
        )),
        SourceContent::Sheets(sheets) => {
            ChunkedContent::Table(segment::chunk_workbook(sheets, request.schema.len()))
        }
    };

    let pool = SharedModelPool::new(request.pool.clone());
    let policy = config.policy();
    let texts = chunks.texts();

    tracing::info!(
        source_id = %source.id,
        chunks = texts.len(),
        "starting array-mode extraction"
    );

    let mut records: Vec<Map<String, Value>> = Vec::new();
    let mut batches = texts.chunks(config.chunk_batch_size).peekable();
    while let Some(batch) = batches.next() {
        // join_all keeps results in dispatch order, so concurrent
        // completion cannot reorder rows.
        let results = join_all(batch.iter().map(|chunk| {
            extract_array_chunk(
                inference,
                &pool,
                &policy,
                chunk,
                &request.schema,
                &request.instruction,
            )
        }))
        .await;

        for result in results {
            match result {
                Ok(chunk_records) => records.extend(chunk_records),
                Err(err) => {
                    tracing::warn!(source_id = %source.id, error = %err, "chunk extraction failed; skipping chunk");
                }
            }
        }

        if batches.peek().is_some() {
            tokio::time::sleep(config.batch_cooldown).await;
        }
    }

    if records.is_empty() {
        return Err(ExtractError::EmptyResult);
    }

    Ok(records
        .into_iter()
        .map(|fields| source.stamp(fields))
        .collect())
}

/// Confidence map used when no ensemble ran (array mode): 1.0 per field.
pub fn default_confidence(schema: &FieldSchema) -> IndexMap<String, f64> {
    schema.keys().map(|k| (k.to_string(), 1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::router::{ModelPool, ModelSpec};
    use crate::testing::MockInference;
    use crate::types::schema::FieldType;
    use serde_json::json;

    fn pool() -> ModelPool {
        ModelPool::new([ModelSpec::new("primary", Duration::from_millis(1))])
    }

    fn schema_ab() -> FieldSchema {
        FieldSchema::new()
            .with_field("A", FieldType::Number, "value of A")
            .with_field("B", FieldType::Number, "value of B")
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new().with_batch_cooldown(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_object_mode_unanimous_ensemble() {
        let inference = MockInference::new().with_default_response(r#"{"A":1,"B":2}"#);
        let request = ExtractionRequest::new(
            SourceContent::Text("A: 1\nB: 2".into()),
            schema_ab(),
            pool(),
        );
        let source = DocumentSource::new("f-1", "https://example.com/form.pdf");

        let outcome = extract_object(&inference, &request, &source, &config())
            .await
            .unwrap();

        assert_eq!(outcome.record.fields["A"], json!(1));
        assert_eq!(outcome.record.fields["B"], json!(2));
        assert_eq!(outcome.confidence["A"], 1.0);
        assert_eq!(outcome.confidence["B"], 1.0);
        // Three ensemble strategies ran.
        assert_eq!(inference.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_object_mode_is_deterministic() {
        let request = ExtractionRequest::new(
            SourceContent::Text("A: 1\nB: 2".into()),
            schema_ab(),
            pool(),
        );
        let source = DocumentSource::new("f-1", "https://example.com/form.pdf");

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let inference = MockInference::new().with_default_response(r#"{"A":1,"B":2}"#);
            outcomes.push(
                extract_object(&inference, &request, &source, &config())
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(outcomes[0].record.fields, outcomes[1].record.fields);
        assert_eq!(outcomes[0].confidence, outcomes[1].confidence);
    }

    #[tokio::test]
    async fn test_object_mode_empty_properties_is_terminal() {
        let inference = MockInference::new().with_default_response("{}");
        let request = ExtractionRequest::new(
            SourceContent::Text("blank page".into()),
            schema_ab(),
            pool(),
        );
        let source = DocumentSource::new("f-1", "https://example.com/blank.pdf");

        let err = extract_object(&inference, &request, &source, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyResult));
    }

    #[tokio::test]
    async fn test_object_mode_stamps_display_name() {
        let inference =
            MockInference::new().with_default_response(r#"{"A":7,"B":"northern region"}"#);
        let request = ExtractionRequest::new(
            SourceContent::Text("doc".into()),
            FieldSchema::new()
                .with_field("A", FieldType::Number, "")
                .with_field("B", FieldType::String, ""),
            pool(),
        );
        let source = DocumentSource::new("f-9", "https://example.com/r.pdf").with_name_parts(vec![
            NamePart::Text("report-".into()),
            NamePart::Column("A".into()),
        ]);

        let outcome = extract_object(&inference, &request, &source, &config())
            .await
            .unwrap();

        assert_eq!(outcome.record.provenance.display_name, "report-7");
        assert_eq!(outcome.record.provenance.source_id, "f-9");
        assert_eq!(
            outcome.record.provenance.source_url,
            "https://example.com/r.pdf"
        );
    }

    #[tokio::test]
    async fn test_array_mode_preserves_chunk_order() {
        let delim = segment::PAGE_BREAK;
        let content = format!("first page{delim}second page");
        // Force one chunk per page.
        let mut cfg = config();
        cfg.max_chunk_len = 12;

        let inference = MockInference::new()
            .with_keyed_response("first page", r#"{"records":[{"A":1,"B":1},{"A":2,"B":2}]}"#)
            .with_keyed_response("second page", r#"{"records":[{"A":3,"B":3}]}"#);

        let request = ExtractionRequest::new(SourceContent::Text(content), schema_ab(), pool())
            .with_mode(OutputMode::Array);
        let source = DocumentSource::new("f-2", "https://example.com/table.xlsx");

        let records = extract_array(&inference, &request, &source, &cfg)
            .await
            .unwrap();

        let values: Vec<_> = records.iter().map(|r| r.fields["A"].clone()).collect();
        assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
        for record in &records {
            assert_eq!(record.provenance.source_id, "f-2");
        }
    }

    #[tokio::test]
    async fn test_array_mode_backfills_and_nulls_compounds() {
        let inference = MockInference::new()
            .with_default_response(r#"{"records":[{"A":1},{"A":{"nested":true},"B":2}]}"#);
        let request = ExtractionRequest::new(
            SourceContent::Text("rows".into()),
            schema_ab(),
            pool(),
        )
        .with_mode(OutputMode::Array);
        let source = DocumentSource::new("f-3", "https://example.com/t.xlsx");

        let records = extract_array(&inference, &request, &source, &config())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields["A"], json!(1));
        assert_eq!(records[0].fields["B"], Value::Null);
        // Compound value nulled.
        assert_eq!(records[1].fields["A"], Value::Null);
        assert_eq!(records[1].fields["B"], json!(2));
    }

    #[tokio::test]
    async fn test_array_mode_failed_chunk_skipped() {
        let delim = segment::PAGE_BREAK;
        let content = format!("alpha{delim}beta");
        let mut cfg = config();
        cfg.max_chunk_len = 6;

        // "alpha" gets a keyed response; "beta" falls through to an error.
        let inference = MockInference::new()
            .with_keyed_response("alpha", r#"{"records":[{"A":1,"B":1}]}"#);

        let request = ExtractionRequest::new(SourceContent::Text(content), schema_ab(), pool())
            .with_mode(OutputMode::Array);
        let source = DocumentSource::new("f-4", "https://example.com/t.xlsx");

        let records = extract_array(&inference, &request, &source, &cfg)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["A"], json!(1));
    }

    #[tokio::test]
    async fn test_array_mode_zero_records_is_terminal() {
        let inference = MockInference::new().with_default_response(r#"{"records":[]}"#);
        let request = ExtractionRequest::new(
            SourceContent::Text("rows".into()),
            schema_ab(),
            pool(),
        )
        .with_mode(OutputMode::Array);
        let source = DocumentSource::new("f-5", "https://example.com/t.xlsx");

        let err = extract_array(&inference, &request, &source, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyResult));
    }

    #[tokio::test]
    async fn test_run_dispatches_on_mode() {
        let inference = MockInference::new()
            .with_default_response(r#"{"A":1,"B":2,"records":[{"A":1,"B":2}]}"#);
        let source = DocumentSource::new("f-6", "https://example.com/d.pdf");

        let object_request = ExtractionRequest::new(
            SourceContent::Text("doc".into()),
            schema_ab(),
            pool(),
        );
        match run(&inference, &object_request, &source, &config()).await.unwrap() {
            ExtractionOutcome::Object(_) => {}
            other => panic!("expected object outcome, got {other:?}"),
        }

        let array_request = object_request.clone().with_mode(OutputMode::Array);
        match run(&inference, &array_request, &source, &config()).await.unwrap() {
            ExtractionOutcome::Array(records) => assert_eq!(records.len(), 1),
            other => panic!("expected array outcome, got {other:?}"),
        }
    }
}
