//! Consensus aggregation: vote per field across ensemble attempts.
//!
//! Agreement is approximated by substring clustering: the most frequent
//! substring (at least a minimum length) across the stringified values
//! defines the majority cluster. Matching is case-sensitive with no
//! whitespace normalization; numbers compare via their JSON rendering.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::pipeline::extract::ExtractionAttempt;
use crate::types::schema::FieldSchema;

/// Default minimum substring length for clustering.
pub const DEFAULT_MIN_CLUSTER_LEN: usize = 10;

/// Per-field chosen values and confidence scores. Every requested field
/// key is present.
#[derive(Debug, Clone, Default)]
pub struct ConsensusResult {
    pub fields: Map<String, Value>,
    pub confidence: IndexMap<String, f64>,
}

impl ConsensusResult {
    /// True when no field received a non-null value (total parse or
    /// consensus failure; callers treat this as a whole-record failure).
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Value::is_null)
    }
}

/// Stringify a field value for clustering. Null and compound values
/// render empty so they never dominate a cluster.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null | Value::Object(_) | Value::Array(_) => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Count every substring of at least `min_len` characters across all
/// texts and return the most frequent; ties break by longer substring,
/// then first-found. Insertion-ordered counting keeps this deterministic.
fn most_common_substring(texts: &[String], min_len: usize) -> Option<String> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();

    for text in texts {
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let chars = bounds.len() - 1;
        for i in 0..chars {
            for j in (i + min_len)..=chars {
                let substring = &text[bounds[i]..bounds[j]];
                *counts.entry(substring.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut best: Option<(&String, usize)> = None;
    for (substring, &count) in &counts {
        match best {
            None => best = Some((substring, count)),
            Some((current, current_count)) => {
                if count > current_count
                    || (count == current_count && substring.len() > current.len())
                {
                    best = Some((substring, count));
                }
            }
        }
    }
    best.map(|(s, _)| s.clone())
}

/// Partition texts into the majority cluster (contains the most common
/// substring) and the rest. When no substring of the minimum length
/// exists at all, every text lands in the majority cluster.
pub fn cluster_texts(texts: &[String], min_len: usize) -> Vec<bool> {
    match most_common_substring(texts, min_len) {
        None => vec![true; texts.len()],
        Some(substring) => texts.iter().map(|t| t.contains(&substring)).collect(),
    }
}

/// Reconcile ensemble attempts into one value and confidence per field.
///
/// For each schema key: compound values are treated as null, values are
/// stringified, the clustering minimum length is capped at the shortest
/// value (but never below 1, so an empty value cannot join a cluster),
/// and confidence is the majority-cluster fraction rounded to 2 decimals.
/// The chosen value is the first majority-cluster member's, falling back
/// to the first attempt's value when no clusters form.
pub fn reconcile(
    attempts: &[ExtractionAttempt],
    schema: &FieldSchema,
    min_cluster_len: usize,
) -> ConsensusResult {
    let parsed: Vec<&Map<String, Value>> = attempts
        .iter()
        .filter_map(|a| a.fields.as_ref())
        .collect();

    let mut result = ConsensusResult::default();
    if parsed.is_empty() {
        for key in schema.keys() {
            result.fields.insert(key.to_string(), Value::Null);
            result.confidence.insert(key.to_string(), 0.0);
        }
        return result;
    }

    for key in schema.keys() {
        let values: Vec<Value> = parsed
            .iter()
            .map(|fields| match fields.get(key) {
                Some(v) if !v.is_object() && !v.is_array() => v.clone(),
                _ => Value::Null,
            })
            .collect();
        let texts: Vec<String> = values.iter().map(stringify).collect();

        let shortest = texts.iter().map(|t| t.chars().count()).min().unwrap_or(0);
        let min_len = min_cluster_len.min(shortest).max(1);

        let clusters = cluster_texts(&texts, min_len);
        let majority = clusters.iter().filter(|c| **c).count();
        let score = (majority as f64 / clusters.len() as f64 * 100.0).round() / 100.0;

        let chosen = clusters
            .iter()
            .position(|c| *c)
            .map(|i| values[i].clone())
            .unwrap_or_else(|| values[0].clone());

        result.fields.insert(key.to_string(), chosen);
        result.confidence.insert(key.to_string(), score);
    }

    result
}
