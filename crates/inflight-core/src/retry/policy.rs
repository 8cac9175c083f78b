use std::time::Duration;

use rand::Rng;

use super::error::PolicyError;

/// Upper bound applied to every computed backoff delay unless overridden.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// High-level classification of an error for retry purposes.
///
/// This intentionally stays generic; callers map HTTP status codes,
/// transport errors, or IO failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read, or the attempt timeout fired).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Any other error: validation, auth, not-found, malformed request.
    Other,
}

impl ErrorKind {
    /// Map the kind onto the two-way retry taxonomy.
    pub fn classification(self) -> Classification {
        match self {
            ErrorKind::Timeout
            | ErrorKind::Throttled
            | ErrorKind::Connection
            | ErrorKind::Http5xx(_) => Classification::Retryable,
            ErrorKind::Other => Classification::Terminal,
        }
    }
}

/// Whether re-attempting a failed operation is expected to help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Terminal,
}

impl Classification {
    pub fn is_retryable(self) -> bool {
        matches!(self, Classification::Retryable)
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a delay ceiling and optional jitter.
///
/// Fields are private so a policy can only exist in a validated state; build
/// one with [`RetryPolicy::new`] and the `with_*` adjusters, or from config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Duration,
    jitter: f64,
    attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: 0.0,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Build a policy with the default ceiling, no jitter and no attempt timeout.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if base_delay.is_zero() {
            return Err(PolicyError::ZeroBaseDelay);
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier <= 1.0 {
            return Err(PolicyError::Multiplier(backoff_multiplier));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            backoff_multiplier,
            max_delay: DEFAULT_MAX_DELAY.max(base_delay),
            jitter: 0.0,
            attempt_timeout: None,
        })
    }

    /// Replace the delay ceiling. It must be at least `base_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Result<Self, PolicyError> {
        if max_delay < self.base_delay {
            return Err(PolicyError::CeilingBelowBase {
                max_delay,
                base_delay: self.base_delay,
            });
        }
        self.max_delay = max_delay;
        Ok(self)
    }

    /// Add up to `fraction` of extra random delay to every backoff (0.0 disables).
    pub fn with_jitter(mut self, fraction: f64) -> Result<Self, PolicyError> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(PolicyError::Jitter(fraction));
        }
        self.jitter = fraction;
        Ok(self)
    }

    /// Bound each individual attempt; expiry counts as a retryable timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Result<Self, PolicyError> {
        if timeout.is_zero() {
            return Err(PolicyError::ZeroTimeout);
        }
        self.attempt_timeout = Some(timeout);
        Ok(self)
    }

    /// Maximum number of attempts (including the first).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Upper bound on any single backoff delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Deterministic delay before the attempt following `attempt`.
    ///
    /// `attempt` is 1-based: `next_delay(1)` is the wait between attempts 1
    /// and 2 and equals `base_delay`. The result never exceeds `max_delay`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.base_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exp);
        self.capped(nanos)
    }

    /// Round a delay in nanoseconds, saturating at `max_delay`.
    fn capped(&self, nanos: f64) -> Duration {
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.round() as u64).min(self.max_delay)
    }

    /// `true` when the failure is retryable and the attempt budget is not spent.
    pub fn should_retry(&self, attempt: u32, classification: Classification) -> bool {
        classification.is_retryable() && attempt < self.max_attempts
    }

    /// Combine [`should_retry`](Self::should_retry) and the (jittered) delay.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, classification: Classification) -> RetryDecision {
        if !self.should_retry(attempt, classification) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.jittered(self.next_delay(attempt)))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(0.0..=self.jitter);
        self.capped(delay.as_nanos() as f64 * factor)
    }
}
