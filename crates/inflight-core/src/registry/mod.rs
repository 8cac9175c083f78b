//! Single-flight key registry.
//!
//! Tracks which operation keys currently have an action in flight. A key is
//! acquired before the action starts and released through the returned
//! [`Lease`] when the operation reaches a terminal outcome. At most one entry
//! exists per key at any time.
//!
//! The registry is process-local and owned by whoever needs single-flight
//! guarantees: one per client, or one per feature area.

mod entry;
mod key;
mod state;

pub use entry::{BusyChange, InFlightEntry};
pub use key::OperationKey;
pub use state::{AcquireResult, KeyRegistry, Lease};
