//! The extraction pipeline: prompting, routing, consensus, orchestration.

pub mod consensus;
pub mod extract;
pub mod orchestrate;
pub mod prompts;
pub mod router;

pub use consensus::{cluster_texts, reconcile, ConsensusResult, DEFAULT_MIN_CLUSTER_LEN};
pub use extract::{
    backfill_schema_keys, extract_array_chunk, extract_object_chunk, null_compound_values,
    parse_array_response, parse_object_response, ExtractionAttempt,
};
pub use orchestrate::{
    default_confidence, extract_array, extract_object, run, DocumentSource, ExtractionOutcome,
    ObjectOutcome, PipelineConfig,
};
pub use prompts::{format_extract_prompt, format_instructions, strategy_emphasis};
pub use router::{generate_with_rotation, ModelPool, ModelSpec, RetryPolicy, SharedModelPool};
