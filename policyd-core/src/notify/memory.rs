//! In-memory ChangeBus implementation
//!
//! MemoryChangeBus keeps the set of registered signals and fans changes out
//! to live subscribers over a broadcast channel.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

use super::bus::{ChangeBus, NotifyError, PolicyChange};

pub struct MemoryChangeBus {
    signals: RwLock<HashSet<String>>,
    tx: broadcast::Sender<PolicyChange>,
}

impl MemoryChangeBus {
    /// Create a new MemoryChangeBus with the given broadcast channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            signals: RwLock::new(HashSet::new()),
            tx,
        }
    }

    /// Subscribe to all changes from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PolicyChange> {
        self.tx.subscribe()
    }

    pub fn is_registered(&self, signal: &str) -> bool {
        self.signals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(signal)
    }
}

impl Default for MemoryChangeBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeBus for MemoryChangeBus {
    fn register(&self, signal: &str) -> Result<(), NotifyError> {
        self.signals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(signal.to_string());
        Ok(())
    }

    fn emit(&self, change: PolicyChange) -> Result<(), NotifyError> {
        if !self.is_registered(&change.policy) {
            return Err(NotifyError::UnregisteredSignal(change.policy));
        }
        // No subscribers is fine
        let _ = self.tx.send(change);
        Ok(())
    }
}
