//! Classify HTTP statuses, IO errors and action failures into retry kinds.

use std::io;

use super::error::{ActionError, AttemptTimeout};
use super::policy::{Classification, ErrorKind};

/// Errors that can report which [`ErrorKind`] they belong to.
///
/// Anything the implementation cannot recognize should map to
/// [`ErrorKind::Other`], which is never retried.
pub trait Classify {
    fn error_kind(&self) -> ErrorKind;
}

/// Per-call override point: decides whether a failure is worth retrying.
///
/// Closures `Fn(&E) -> Classification` implement this, so call sites with an
/// unusual transient-failure surface can pass a one-off rule.
pub trait Classifier<E: ?Sized> {
    fn classify(&self, error: &E) -> Classification;
}

impl<E: ?Sized, F> Classifier<E> for F
where
    F: Fn(&E) -> Classification,
{
    fn classify(&self, error: &E) -> Classification {
        self(error)
    }
}

/// Classifier used when the caller does not supply one: defers to [`Classify`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<E: Classify + ?Sized> Classifier<E> for DefaultClassifier {
    fn classify(&self, error: &E) -> Classification {
        classify(error)
    }
}

/// Classify any [`Classify`] error with the default taxonomy.
pub fn classify<E: Classify + ?Sized>(error: &E) -> Classification {
    error.error_kind().classification()
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        408 => ErrorKind::Timeout,
        // Not Implemented / HTTP Version Not Supported will not change on retry.
        501 | 505 => ErrorKind::Other,
        500..=599 => ErrorKind::Http5xx(code),
        _ => ErrorKind::Other,
    }
}

/// Classify an IO error from a socket-level transport.
pub fn classify_io_error(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::Interrupted => ErrorKind::Connection,
        _ => ErrorKind::Other,
    }
}

impl Classify for ActionError {
    fn error_kind(&self) -> ErrorKind {
        match self {
            ActionError::Http { status, .. } => classify_http_status(*status),
            ActionError::Connection(_) => ErrorKind::Connection,
            ActionError::Timeout(_) | ActionError::AttemptTimedOut(_) => ErrorKind::Timeout,
            ActionError::Other(_) => ErrorKind::Other,
        }
    }
}

impl Classify for io::Error {
    fn error_kind(&self) -> ErrorKind {
        classify_io_error(self)
    }
}

impl Classify for AttemptTimeout {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::Timeout
    }
}
