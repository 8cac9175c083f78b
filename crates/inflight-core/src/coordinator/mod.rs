//! Keyed single-flight execution with classified retries.
//!
//! [`Coordinator`] is the public entry point: it acquires the operation key,
//! runs the action through the retry loop, and releases the key whatever the
//! outcome. A call that arrives while its key is busy is dropped and reports
//! [`Outcome::Skipped`]; nothing is queued.

mod outcome;
mod timed;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::registry::{AcquireResult, BusyChange, InFlightEntry, KeyRegistry, OperationKey};
use crate::retry::{self, AttemptTimeout, Classifier, Classify, DefaultClassifier, RetryPolicy};

pub use outcome::Outcome;
use timed::{Timed, TimedClassifier};

/// Shared handle; clones coordinate through the same registry.
#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: Arc<KeyRegistry>,
    policy: RetryPolicy,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// Coordinator with a fresh registry and the default retry policy.
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self {
            registry: KeyRegistry::new(),
            policy,
        }
    }

    /// Policy used by [`run`](Self::run).
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `action` under `key` with the default policy and classifier.
    ///
    /// If the policy carries an attempt timeout it is not applied here; use
    /// [`run_with_timeout`](Self::run_with_timeout) for that.
    pub async fn run<T, E, F, Fut>(
        &self,
        key: impl Into<OperationKey>,
        action: F,
    ) -> Result<Outcome<T>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let policy = self.policy;
        if let Some(limit) = policy.attempt_timeout() {
            tracing::debug!(
                timeout_ms = limit.as_millis() as u64,
                "attempt timeout not applied by run; use run_with_timeout"
            );
        }
        self.run_with(key, &policy, &DefaultClassifier, action).await
    }

    /// Run `action` under `key` with an explicit policy and classifier.
    pub async fn run_with<T, E, F, Fut, C>(
        &self,
        key: impl Into<OperationKey>,
        policy: &RetryPolicy,
        classifier: &C,
        action: F,
    ) -> Result<Outcome<T>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Classifier<E> + ?Sized,
        E: fmt::Display,
    {
        let key = key.into();
        let lease = match self.registry.try_acquire(key.clone()) {
            AcquireResult::Acquired(lease) => lease,
            AcquireResult::AlreadyBusy => {
                tracing::debug!(key = %key, "skipped: already in progress");
                return Ok(Outcome::Skipped);
            }
        };

        let result = retry::drive(
            key.as_str(),
            policy,
            classifier,
            |attempt| lease.record_attempt(attempt),
            action,
        )
        .await;
        // Released before the caller sees the result so it may immediately run again.
        lease.release();
        result.map(Outcome::Completed)
    }

    /// Like [`run_with`](Self::run_with), but every attempt is bounded by the
    /// policy's attempt timeout. An expired attempt counts as retryable; once
    /// the budget is spent the timeout is returned as `E::from(AttemptTimeout)`.
    pub async fn run_with_timeout<T, E, F, Fut, C>(
        &self,
        key: impl Into<OperationKey>,
        policy: &RetryPolicy,
        classifier: &C,
        mut action: F,
    ) -> Result<Outcome<T>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Classifier<E> + ?Sized,
        E: From<AttemptTimeout> + fmt::Display,
    {
        let Some(limit) = policy.attempt_timeout() else {
            return self.run_with(key, policy, classifier, action).await;
        };

        let timed = TimedClassifier::new(classifier);
        let outcome = self
            .run_with(key, policy, &timed, || {
                let attempt = action();
                async move {
                    match tokio::time::timeout(limit, attempt).await {
                        Ok(result) => result.map_err(Timed::Action),
                        Err(_) => Err(Timed::TimedOut(AttemptTimeout { after: limit })),
                    }
                }
            })
            .await;
        outcome.map_err(Timed::into_inner)
    }

    /// Whether an operation for `key` is currently in flight.
    pub fn is_busy(&self, key: &str) -> bool {
        self.registry.is_busy(key)
    }

    /// Read-only copies of every in-flight entry, ordered by key.
    pub fn in_flight(&self) -> Vec<InFlightEntry> {
        self.registry.snapshot()
    }

    /// Stream of idle/busy transitions, for UI spinners and disabled buttons.
    pub fn subscribe(&self) -> broadcast::Receiver<BusyChange> {
        self.registry.subscribe()
    }
}

#[cfg(test)]
mod tests;
