//! Attempt-timeout wrapper around an action's error type.

use std::fmt;

use crate::retry::{AttemptTimeout, Classification, Classifier};

/// Failure of one timed attempt: the action's own error, or the timeout.
#[derive(Debug)]
pub(super) enum Timed<E> {
    Action(E),
    TimedOut(AttemptTimeout),
}

impl<E: From<AttemptTimeout>> Timed<E> {
    pub(super) fn into_inner(self) -> E {
        match self {
            Timed::Action(e) => e,
            Timed::TimedOut(t) => E::from(t),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Timed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timed::Action(e) => e.fmt(f),
            Timed::TimedOut(t) => t.fmt(f),
        }
    }
}

/// Delegates action errors to the caller's classifier; timeouts are always retryable.
pub(super) struct TimedClassifier<'a, C: ?Sized> {
    inner: &'a C,
}

impl<'a, C: ?Sized> TimedClassifier<'a, C> {
    pub(super) fn new(inner: &'a C) -> Self {
        Self { inner }
    }
}

impl<E, C> Classifier<Timed<E>> for TimedClassifier<'_, C>
where
    C: Classifier<E> + ?Sized,
{
    fn classify(&self, error: &Timed<E>) -> Classification {
        match error {
            Timed::Action(e) => self.inner.classify(e),
            Timed::TimedOut(_) => Classification::Retryable,
        }
    }
}
