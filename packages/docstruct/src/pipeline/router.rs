//! Model routing with rotation-on-throttle and deadline-aware retry.
//!
//! The pool is an explicit value owned by the call path, never a module
//! global. Throttle-class errors rotate the pool and back off for the
//! used model's interval; everything else propagates immediately.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::{ExtractError, Result};
use crate::traits::inference::Inference;

/// One model in the pool: its identifier and the backoff slept after a
/// throttle while it was at the head. Higher-capability models get longer
/// backoffs, smaller fallbacks shorter ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub id: String,
    pub backoff: Duration,
}

impl ModelSpec {
    pub fn new(id: impl Into<String>, backoff: Duration) -> Self {
        Self {
            id: id.into(),
            backoff,
        }
    }
}

/// Ordered pool of model identifiers, most to least capable.
///
/// Rotation moves the head to the tail. The pool is a plain value so
/// retries stay composable and testable; share it across concurrent
/// calls only through [`SharedModelPool`].
#[derive(Debug, Clone, Default)]
pub struct ModelPool {
    models: VecDeque<ModelSpec>,
}

impl ModelPool {
    pub fn new(models: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self {
            models: models.into_iter().collect(),
        }
    }

    /// The model currently used for calls.
    pub fn head(&self) -> Option<&ModelSpec> {
        self.models.front()
    }

    /// Move the head to the tail, returning the rotated model.
    pub fn rotate(&mut self) -> Option<ModelSpec> {
        let used = self.models.pop_front()?;
        self.models.push_back(used.clone());
        Some(used)
    }

    /// Current pool order, for logging and assertions.
    pub fn order(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// A pool shared by concurrently-issued calls within one job. Rotations
/// serialize behind the lock so concurrent throttles cannot race.
#[derive(Clone, Default)]
pub struct SharedModelPool {
    inner: Arc<Mutex<ModelPool>>,
}

impl SharedModelPool {
    pub fn new(pool: ModelPool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    pub async fn head(&self) -> Option<ModelSpec> {
        self.inner.lock().await.head().cloned()
    }

    pub async fn rotate(&self) -> Option<ModelSpec> {
        self.inner.lock().await.rotate()
    }

    /// Snapshot of the current order.
    pub async fn order(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .order()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Wall-clock retry budget. Replaces unbounded retry loops: throttles are
/// retried until the deadline, then fail with `DeadlineExceeded`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    deadline: Option<Instant>,
}

impl RetryPolicy {
    /// Retry until `budget` from now has elapsed.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + budget),
        }
    }

    /// No internal deadline; termination is the external job watchdog's
    /// responsibility.
    pub fn unbounded() -> Self {
        Self { deadline: None }
    }

    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Call the head model, rotating and backing off on throttle until the
/// policy's deadline.
///
/// State machine per call:
/// `InvokeModel → {Success → Done | Throttled → Rotate+Backoff → InvokeModel | OtherError → Failed}`.
pub async fn generate_with_rotation<I: Inference + ?Sized>(
    inference: &I,
    pool: &SharedModelPool,
    policy: &RetryPolicy,
    prompt: &str,
) -> Result<String> {
    loop {
        let model = pool.head().await.ok_or_else(|| ExtractError::Config {
            message: "model pool is empty".into(),
        })?;

        match inference.generate(prompt, &model.id).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_throttle() => {
                let used = pool.rotate().await.unwrap_or(model);
                if policy.expired() {
                    return Err(ExtractError::DeadlineExceeded);
                }
                tracing::warn!(
                    model = %used.id,
                    backoff_secs = used.backoff.as_secs_f64(),
                    "throttled; rotated pool, backing off"
                );
                tokio::time::sleep(used.backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockInference;

    fn pool() -> SharedModelPool {
        SharedModelPool::new(ModelPool::new([
            ModelSpec::new("primary", Duration::from_millis(1)),
            ModelSpec::new("fallback", Duration::from_millis(1)),
        ]))
    }

    #[test]
    fn test_two_throttles_restore_pool_order() {
        let mut pool = ModelPool::new([
            ModelSpec::new("primary", Duration::from_secs(60)),
            ModelSpec::new("fallback", Duration::from_secs(20)),
        ]);

        assert_eq!(pool.order(), vec!["primary", "fallback"]);

        pool.rotate();
        assert_eq!(pool.order(), vec!["fallback", "primary"]);

        pool.rotate();
        assert_eq!(pool.order(), vec!["primary", "fallback"]);
    }

    #[tokio::test]
    async fn test_throttle_rotates_then_succeeds() {
        let inference = MockInference::new()
            .with_throttle()
            .with_response(r#"{"a":1}"#);
        let pool = pool();
        let policy = RetryPolicy::with_budget(Duration::from_secs(5));

        let text = generate_with_rotation(&inference, &pool, &policy, "p")
            .await
            .unwrap();
        assert_eq!(text, r#"{"a":1}"#);

        // First call hit the primary, retry hit the rotated-in fallback.
        let calls = inference.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "primary");
        assert_eq!(calls[1].1, "fallback");
        assert_eq!(pool.order().await, vec!["fallback", "primary"]);
    }

    #[tokio::test]
    async fn test_invalid_input_propagates_without_rotation() {
        let inference = MockInference::new().with_invalid_input("content exceeds context limit");
        let pool = pool();
        let policy = RetryPolicy::with_budget(Duration::from_secs(5));

        let err = generate_with_rotation(&inference, &pool, &policy, "p")
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(inference.calls().len(), 1);
        assert_eq!(pool.order().await, vec!["primary", "fallback"]);
    }

    #[tokio::test]
    async fn test_persistent_throttle_hits_deadline() {
        let inference = MockInference::new().always_throttled();
        let pool = pool();
        let policy = RetryPolicy::with_budget(Duration::from_millis(10));

        let err = generate_with_rotation(&inference, &pool, &policy, "p")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::DeadlineExceeded));
    }
}
