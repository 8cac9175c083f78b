//! Coordinator tests for timeouts, cancellation and notifications.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Coordinator, Outcome};
use crate::retry::{ActionError, AttemptTimeout, Classification, DefaultClassifier, RetryPolicy};

fn timed_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(100), 2.0)
        .unwrap()
        .with_attempt_timeout(Duration::from_millis(50))
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempt_is_retried() {
    let coord = Coordinator::new();
    let calls = Arc::new(AtomicU32::new(0));
    let outcome = coord
        .run_with_timeout("refresh_buses", &timed_policy(), &DefaultClassifier, || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                Ok::<_, ActionError>(7)
            }
        })
        .await;
    assert_eq!(outcome, Ok(Outcome::Completed(7)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_becomes_final_error_when_budget_spent() {
    let coord = Coordinator::new();
    let calls = Arc::new(AtomicU32::new(0));
    let outcome: Result<Outcome<()>, ActionError> = coord
        .run_with_timeout("refresh_buses", &timed_policy(), &DefaultClassifier, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            }
        })
        .await;
    assert_eq!(
        outcome,
        Err(ActionError::AttemptTimedOut(AttemptTimeout {
            after: Duration::from_millis(50)
        }))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!coord.is_busy("refresh_buses"));
}

#[tokio::test(start_paused = true)]
async fn timeout_is_retried_even_when_classifier_says_terminal() {
    let coord = Coordinator::new();
    let calls = Arc::new(AtomicU32::new(0));
    let never = |_: &ActionError| Classification::Terminal;
    let outcome: Result<Outcome<()>, ActionError> = coord
        .run_with_timeout("k", &timed_policy(), &never, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            }
        })
        .await;
    assert!(outcome.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn without_attempt_timeout_runs_untimed() {
    let coord = Coordinator::new();
    let policy = RetryPolicy::new(2, Duration::from_millis(10), 2.0).unwrap();
    let outcome = coord
        .run_with_timeout("slow", &policy, &DefaultClassifier, || async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok::<_, ActionError>("late")
        })
        .await;
    assert_eq!(outcome, Ok(Outcome::Completed("late")));
}

#[tokio::test(start_paused = true)]
async fn plain_run_leaves_attempts_unbounded() {
    let coord = Coordinator::with_policy(timed_policy());
    let calls = Arc::new(AtomicU32::new(0));
    let outcome = coord
        .run("refresh_buses", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ActionError>("slow but fine")
            }
        })
        .await;
    assert_eq!(outcome, Ok(Outcome::Completed("slow but fine")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_run_releases_key() {
    let coord = Coordinator::new();
    let cancelled = tokio::time::timeout(
        Duration::from_millis(20),
        coord.run("delete_employee_9", || async {
            std::future::pending::<Result<(), ActionError>>().await
        }),
    )
    .await;
    assert!(cancelled.is_err());
    assert!(!coord.is_busy("delete_employee_9"));
}

#[tokio::test(start_paused = true)]
async fn in_flight_shows_current_attempt() {
    let coord = Coordinator::with_policy(
        RetryPolicy::new(5, Duration::from_millis(100), 2.0).unwrap(),
    );
    let held = coord.clone();
    let handle = tokio::spawn(async move {
        let calls = Arc::new(AtomicU32::new(0));
        held.run("update_booking_manager_4", || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ActionError::http(429, "slow down"))
                } else {
                    std::future::pending::<Result<(), ActionError>>().await
                }
            }
        })
        .await
    });

    // Past the first 100ms backoff: the second attempt is now pending.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let entries = coord.in_flight();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key.as_str(), "update_booking_manager_4");
    assert_eq!(entries[0].attempt, 2);

    handle.abort();
    let _ = handle.await;
    assert!(!coord.is_busy("update_booking_manager_4"));
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_busy_transitions() {
    let coord = Coordinator::new();
    let mut rx = coord.subscribe();
    let outcome = coord
        .run("create_bus", || async { Ok::<_, ActionError>(1) })
        .await;
    assert_eq!(outcome, Ok(Outcome::Completed(1)));
    let busy = rx.recv().await.unwrap();
    let idle = rx.recv().await.unwrap();
    assert_eq!(busy.key.as_str(), "create_bus");
    assert!(busy.busy);
    assert!(!idle.busy);
}

#[tokio::test]
async fn clones_share_registry() {
    let a = Coordinator::new();
    let b = a.clone();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let mut rx = Some(rx);
    let (first, second) = tokio::join!(
        a.run("k", move || {
            let rx = rx.take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok::<_, ActionError>("first")
            }
        }),
        async {
            let r = b.run("k", || async { Ok::<_, ActionError>("second") }).await;
            let _ = tx.send(());
            r
        }
    );
    assert_eq!(first, Ok(Outcome::Completed("first")));
    assert_eq!(second, Ok(Outcome::Skipped));
}
