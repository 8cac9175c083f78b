//! Retry loop: re-invoke an async action until success or the policy says stop.

use std::fmt;
use std::future::Future;

use super::classify::Classifier;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `action` until it succeeds or the retry policy says to stop.
///
/// Every attempt calls `action()` again to obtain a fresh future; on a
/// retryable failure the loop sleeps for the backoff delay first. The final
/// error is returned exactly as the action produced it. `label` only appears
/// in log lines.
pub async fn run_with_retry<T, E, F, Fut, C>(
    label: &str,
    policy: &RetryPolicy,
    classifier: &C,
    action: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Classifier<E> + ?Sized,
    E: fmt::Display,
{
    drive(label, policy, classifier, |_| {}, action).await
}

/// Retry loop shared with the coordinator; `on_attempt` observes each attempt
/// number right before the action is invoked.
pub(crate) async fn drive<T, E, F, Fut, C, A>(
    label: &str,
    policy: &RetryPolicy,
    classifier: &C,
    mut on_attempt: A,
    mut action: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Classifier<E> + ?Sized,
    A: FnMut(u32),
    E: fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        on_attempt(attempt);
        match action().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(key = label, attempts = attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                let classification = classifier.classify(&e);
                match policy.decide(attempt, classification) {
                    RetryDecision::NoRetry => {
                        if classification.is_retryable() {
                            tracing::warn!(
                                key = label,
                                attempts = attempt,
                                error = %e,
                                "retries exhausted"
                            );
                        } else {
                            tracing::debug!(key = label, attempt, error = %e, "terminal failure");
                        }
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(delay) => {
                        tracing::warn!(
                            key = label,
                            attempt,
                            max_attempts = policy.max_attempts(),
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retryable failure, backing off"
                        );
                        drop(e);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::retry::{ActionError, Classification, DefaultClassifier};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(100), 2.0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn reinvokes_action_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = run_with_retry("t", &fast_policy(3), &DefaultClassifier, || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ActionError::http(503, "unavailable"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> =
            run_with_retry("t", &fast_policy(5), &DefaultClassifier, || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ActionError::http(400, "bad request"))
                }
            })
            .await;
        assert_eq!(result, Err(ActionError::http(400, "bad request")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_classifier_is_consulted() {
        let calls = Arc::new(AtomicU32::new(0));
        let never = |_: &ActionError| Classification::Terminal;
        let result: Result<(), _> = run_with_retry("t", &fast_policy(5), &never, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ActionError::http(429, "slow down"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_reported_in_order() {
        let mut seen = Vec::new();
        let result: Result<(), _> = drive(
            "t",
            &fast_policy(3),
            &DefaultClassifier,
            |n| seen.push(n),
            || async { Err(ActionError::Connection("refused".into())) },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
