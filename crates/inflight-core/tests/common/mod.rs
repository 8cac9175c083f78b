//! Shared helpers: a scripted action that records when it was invoked.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use inflight_core::ActionError;
use tokio::time::Instant;

/// Action whose successive invocations return scripted results.
///
/// Once the script runs out the last entry repeats.
#[derive(Clone)]
pub struct Scripted<T> {
    script: Arc<Mutex<VecDeque<Result<T, ActionError>>>>,
    last: Arc<Mutex<Option<Result<T, ActionError>>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl<T: Clone + Send + 'static> Scripted<T> {
    pub fn new(script: Vec<Result<T, ActionError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always(result: Result<T, ActionError>) -> Self {
        Self::new(vec![result])
    }

    /// Closure suitable for `Coordinator::run`.
    pub fn action(
        &self,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<T, ActionError>> + Send>>
    {
        let this = self.clone();
        move || {
            let this = this.clone();
            Box::pin(async move { this.next() })
        }
    }

    fn next(&self) -> Result<T, ActionError> {
        self.calls.lock().unwrap().push(Instant::now());
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match script.pop_front() {
            Some(r) => {
                *last = Some(r.clone());
                r
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ActionError::Other("empty script".into()))),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Instants of every invocation, in order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn rate_limited() -> ActionError {
    ActionError::http(429, "Too Many Requests")
}
