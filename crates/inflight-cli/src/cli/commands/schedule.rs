//! `inflight schedule` – print the backoff schedule.

use std::time::Duration;

use anyhow::{Context, Result};
use inflight_core::config::InflightConfig;
use inflight_core::RetryPolicy;

/// One row of the schedule: the wait before `attempt` and the total so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScheduleRow {
    pub attempt: u32,
    pub delay: Duration,
    pub cumulative: Duration,
}

/// Waits preceding attempts 2..=attempts (attempt 1 starts immediately).
pub(crate) fn schedule_rows(policy: &RetryPolicy, attempts: u32) -> Vec<ScheduleRow> {
    let mut cumulative = Duration::ZERO;
    (2..=attempts)
        .map(|attempt| {
            let delay = policy.next_delay(attempt - 1);
            cumulative = cumulative.saturating_add(delay);
            ScheduleRow {
                attempt,
                delay,
                cumulative,
            }
        })
        .collect()
}

pub fn run_schedule(cfg: &InflightConfig, attempts: Option<u32>) -> Result<()> {
    let policy = cfg.retry_policy().context("invalid [retry] config")?;
    let attempts = attempts.unwrap_or(policy.max_attempts()).max(1);
    println!(
        "max_attempts={} base_delay={}ms multiplier={} max_delay={}ms jitter={}",
        policy.max_attempts(),
        policy.base_delay().as_millis(),
        policy.backoff_multiplier(),
        policy.max_delay().as_millis(),
        policy.jitter()
    );
    println!("{:>8}  {:>12}  {:>14}", "ATTEMPT", "WAIT(ms)", "ELAPSED(ms)");
    println!("{:>8}  {:>12}  {:>14}", 1, 0, 0);
    for row in schedule_rows(&policy, attempts) {
        println!(
            "{:>8}  {:>12}  {:>14}",
            row.attempt,
            row.delay.as_millis(),
            row.cumulative.as_millis()
        );
    }
    if attempts > policy.max_attempts() {
        println!(
            "(attempts past {} are not made by this policy)",
            policy.max_attempts()
        );
    }
    Ok(())
}
