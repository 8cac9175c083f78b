//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures) and exponential backoff decisions so that the
//! coordinator and any direct callers share a consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{
    classify, classify_http_status, classify_io_error, Classifier, Classify, DefaultClassifier,
};
pub use error::{ActionError, AttemptTimeout, PolicyError};
pub use policy::{Classification, ErrorKind, RetryDecision, RetryPolicy, DEFAULT_MAX_DELAY};
pub use run::run_with_retry;

pub(crate) use run::drive;
