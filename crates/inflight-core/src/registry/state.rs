//! Key registry and the scoped lease that releases a busy key.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use super::entry::{BusyChange, InFlightEntry};
use super::OperationKey;

/// Buffered busy/idle notifications per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Process-local map of busy keys.
///
/// The lock is only held for the map operation itself, never across an
/// `.await`, so readers never observe a half-updated registry.
pub struct KeyRegistry {
    entries: Mutex<HashMap<OperationKey, InFlightEntry>>,
    events: broadcast::Sender<BusyChange>,
}

/// Result of [`KeyRegistry::try_acquire`].
#[derive(Debug)]
pub enum AcquireResult {
    /// Key was idle and is now busy; the lease releases it.
    Acquired(Lease),
    /// Another operation already holds the key.
    AlreadyBusy,
}

impl KeyRegistry {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            events,
        })
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<OperationKey, InFlightEntry>> {
        // Nothing panics while the lock is held, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `key` busy if it is idle.
    pub fn try_acquire(self: &Arc<Self>, key: impl Into<OperationKey>) -> AcquireResult {
        let key = key.into();
        {
            let mut entries = self.entries();
            if entries.contains_key(&key) {
                return AcquireResult::AlreadyBusy;
            }
            entries.insert(key.clone(), InFlightEntry::new(key.clone()));
        }
        tracing::debug!(key = %key, "acquired");
        self.notify(&key, true);
        AcquireResult::Acquired(Lease {
            registry: Arc::clone(self),
            key,
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    /// Number of busy keys.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Copies of all in-flight entries, ordered by key.
    pub fn snapshot(&self) -> Vec<InFlightEntry> {
        let mut out: Vec<InFlightEntry> = self.entries().values().cloned().collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// Receive a [`BusyChange`] for every acquire and release from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BusyChange> {
        self.events.subscribe()
    }

    fn release(&self, key: &OperationKey) {
        let removed = self.entries().remove(key).is_some();
        if removed {
            tracing::debug!(key = %key, "released");
            self.notify(key, false);
        }
    }

    fn set_attempt(&self, key: &OperationKey, attempt: u32) {
        if let Some(entry) = self.entries().get_mut(key) {
            entry.attempt = attempt;
        }
    }

    fn notify(&self, key: &OperationKey, busy: bool) {
        // No subscribers is the common case; the send error only reports that.
        let _ = self.events.send(BusyChange {
            key: key.clone(),
            busy,
        });
    }
}

impl fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("busy", &self.len())
            .finish()
    }
}

/// Exclusive hold on a busy key; releases it when dropped.
///
/// Exactly one lease exists per busy key, so release happens exactly once on
/// every exit path: normal return, early `?`, panic, or a cancelled future.
#[derive(Debug)]
pub struct Lease {
    registry: Arc<KeyRegistry>,
    key: OperationKey,
}

impl Lease {
    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    /// Update the attempt number shown in registry snapshots.
    pub fn record_attempt(&self, attempt: u32) {
        self.registry.set_attempt(&self.key, attempt);
    }

    /// Release the key now instead of at end of scope.
    pub fn release(self) {}
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
