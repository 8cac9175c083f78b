pub mod config;
pub mod logging;

pub mod coordinator;
pub mod registry;
pub mod retry;

pub use coordinator::{Coordinator, Outcome};
pub use registry::OperationKey;
pub use retry::{ActionError, Classification, RetryPolicy};
