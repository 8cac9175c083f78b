//! `inflight simulate` – run a scripted action through a coordinator.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use inflight_core::config::InflightConfig;
use inflight_core::retry::{classify, DefaultClassifier};
use inflight_core::{ActionError, Classification, Coordinator, Outcome, RetryPolicy};
use serde::Serialize;
use tokio::time::Instant;

/// Result of one scripted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Ok,
    Fail(ActionError),
    /// Never completes; only meaningful with an attempt timeout.
    Hang,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "ok" => Ok(Step::Ok),
            "hang" => Ok(Step::Hang),
            "reset" => Ok(Step::Fail(ActionError::Connection(
                "connection reset by peer".into(),
            ))),
            "timeout" => Ok(Step::Fail(ActionError::Timeout("read timed out".into()))),
            other => match other.parse::<u16>() {
                Ok(status) if (100..=599).contains(&status) => {
                    Ok(Step::Fail(ActionError::http(status, "simulated response")))
                }
                _ => Err(format!(
                    "invalid step '{s}': expected ok, hang, reset, timeout or an HTTP status"
                )),
            },
        }
    }
}

/// Arguments of the `simulate` subcommand.
#[derive(Debug)]
pub struct SimulateArgs {
    pub key: String,
    pub script: Vec<Step>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub attempt_timeout_ms: Option<u64>,
    pub overlap: bool,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AttemptRecord {
    pub attempt: u32,
    pub started_ms: u64,
    pub step: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SimulationReport {
    pub key: String,
    pub outcome: &'static str,
    pub value: Option<String>,
    pub error: Option<String>,
    pub classification: Option<&'static str>,
    pub overlap: Option<&'static str>,
    pub attempts: Vec<AttemptRecord>,
    pub elapsed_ms: u64,
}

/// Apply command-line overrides on top of the configured policy.
fn effective_policy(cfg: &InflightConfig, args: &SimulateArgs) -> Result<RetryPolicy> {
    let mut retry = cfg.retry.clone();
    if let Some(n) = args.max_attempts {
        retry.max_attempts = n;
    }
    if let Some(ms) = args.base_delay_ms {
        retry.base_delay_ms = ms;
    }
    if let Some(ms) = args.attempt_timeout_ms {
        retry.attempt_timeout_ms = Some(ms);
    }
    RetryPolicy::try_from(&retry).context("invalid retry policy")
}

struct Script {
    steps: VecDeque<Step>,
    last: Step,
    attempts: Vec<AttemptRecord>,
}

impl Script {
    fn new(steps: Vec<Step>) -> Self {
        let last = steps.last().cloned().unwrap_or(Step::Ok);
        Self {
            steps: steps.into(),
            last,
            attempts: Vec::new(),
        }
    }

    fn next(&mut self, started_ms: u64) -> Step {
        let step = self.steps.pop_front().unwrap_or_else(|| self.last.clone());
        let attempt = self.attempts.len() as u32 + 1;
        self.attempts.push(AttemptRecord {
            attempt,
            started_ms,
            step: describe(&step),
        });
        step
    }
}

fn describe(step: &Step) -> String {
    match step {
        Step::Ok => "ok".to_string(),
        Step::Hang => "hang".to_string(),
        Step::Fail(e) => e.to_string(),
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

/// Drive the script through a fresh coordinator and collect the report.
pub(crate) async fn simulate(policy: RetryPolicy, args: &SimulateArgs) -> Result<SimulationReport> {
    if args.script.contains(&Step::Hang) && policy.attempt_timeout().is_none() {
        bail!("a 'hang' step needs an attempt timeout (--attempt-timeout-ms or [retry].attempt_timeout_ms)");
    }

    let coord = Coordinator::with_policy(policy);
    let script = Arc::new(Mutex::new(Script::new(args.script.clone())));
    let start = Instant::now();

    let action = {
        let script = Arc::clone(&script);
        move || {
            let step = script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .next(millis(start.elapsed()));
            async move {
                // Every attempt suspends at least once, so an overlapping call
                // always finds the key held.
                tokio::task::yield_now().await;
                match step {
                    Step::Ok => Ok(format!("completed after {}ms", millis(start.elapsed()))),
                    Step::Fail(e) => Err(e),
                    Step::Hang => std::future::pending().await,
                }
            }
        }
    };

    let primary = coord.run_with_timeout(args.key.as_str(), &policy, &DefaultClassifier, action);
    let (result, overlap) = if args.overlap {
        let second = async {
            let r = coord
                .run(args.key.as_str(), || async {
                    Ok::<_, ActionError>("overlapping call ran".to_string())
                })
                .await;
            Some(match r {
                Ok(Outcome::Skipped) => "skipped",
                Ok(Outcome::Completed(_)) => "completed",
                Err(_) => "failed",
            })
        };
        tokio::join!(primary, second)
    } else {
        (primary.await, None)
    };

    let elapsed_ms = millis(start.elapsed());
    let attempts = std::mem::take(
        &mut script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts,
    );
    let mut report = SimulationReport {
        key: args.key.clone(),
        outcome: "completed",
        value: None,
        error: None,
        classification: None,
        overlap,
        attempts,
        elapsed_ms,
    };
    match result {
        Ok(Outcome::Completed(v)) => report.value = Some(v),
        Ok(Outcome::Skipped) => report.outcome = "skipped",
        Err(e) => {
            report.outcome = "failed";
            report.classification = Some(match classify(&e) {
                Classification::Retryable => "retryable (exhausted)",
                Classification::Terminal => "terminal",
            });
            report.error = Some(e.to_string());
        }
    }
    Ok(report)
}

fn print_report(report: &SimulationReport) {
    println!("key: {}", report.key);
    println!("  {:>7}  {:>10}  {}", "ATTEMPT", "START(ms)", "RESULT");
    for a in &report.attempts {
        println!("  {:>7}  {:>10}  {}", a.attempt, a.started_ms, a.step);
    }
    match (&report.value, &report.error) {
        (Some(v), _) => println!("outcome: {} ({})", report.outcome, v),
        (_, Some(e)) => println!(
            "outcome: {} [{}]: {}",
            report.outcome,
            report.classification.unwrap_or("-"),
            e
        ),
        _ => println!("outcome: {}", report.outcome),
    }
    if let Some(o) = report.overlap {
        println!("overlapping call: {o}");
    }
    println!("elapsed: {}ms", report.elapsed_ms);
}

pub async fn run_simulate(cfg: &InflightConfig, args: SimulateArgs) -> Result<()> {
    let policy = effective_policy(cfg, &args)?;
    let report = simulate(policy, &args).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
