//! Request/response correlation across the client/transport boundary.
//!
//! The same shape as riker's `ask` pattern — a oneshot channel registered
//! under a message id, resolved when the matching reply arrives — except
//! here the "reply" crosses a real transport instead of coming back through
//! an in-process actor, so completion happens from a background receive
//! loop rather than another actor's `recv`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::oneshot;

use crate::error::{QuarkError, Result};
use crate::identity::MessageId;
use crate::message::Envelope;

#[derive(Default)]
pub struct CorrelationMap {
    pending: DashMap<MessageId, oneshot::Sender<Envelope>>,
}

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, message_id: MessageId) -> oneshot::Receiver<Envelope> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(message_id, tx);
        rx
    }

    pub fn cancel(&self, message_id: &MessageId) {
        self.pending.remove(message_id);
    }

    /// Completes the pending call matching `envelope.correlation_id`, if any
    /// is still outstanding. Replies with no matching registration (already
    /// timed out, or a stray duplicate) are silently dropped.
    pub fn complete(&self, envelope: Envelope) {
        if let Some(id) = envelope.correlation_id.clone() {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(envelope);
            }
        }
    }
}

/// Exponential backoff with jitter, matching the client's default retry
/// posture: 50ms base, factor 2, +/-20% jitter.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub base: Duration,
    pub factor: f64,
    pub jitter: f64,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base: Duration::from_millis(50),
            factor: 2.0,
            jitter: 0.2,
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base.as_secs_f64() * self.factor.powi(attempt as i32);
        let jitter_span = exp * self.jitter;
        let jittered = exp + rand::thread_rng().gen_range(-jitter_span..=jitter_span);
        Duration::from_secs_f64(jittered.max(0.0))
    }

    /// Whether a failed call should be retried at all. Non-idempotent calls
    /// are never retried — a retry after a timeout can't tell whether the
    /// original request was applied, so retrying risks a duplicate effect.
    pub fn should_retry(&self, attempt: u32, idempotent: bool) -> bool {
        idempotent && attempt < self.max_retries
    }
}

/// Runs `attempt` with the configured retry policy, retrying only if
/// `idempotent` and the policy permits another attempt.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, idempotent: bool, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_err = None;
    for n in 0..=policy.max_retries {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
                if !policy.should_retry(n, idempotent) {
                    break;
                }
                tokio::time::sleep(policy.delay_for(n)).await;
            }
        }
    }
    Err(last_err.unwrap_or(QuarkError::DeadlineExceeded))
}

pub type SharedCorrelationMap = Arc<CorrelationMap>;
