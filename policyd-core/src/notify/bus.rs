//! ChangeBus trait definition

use policyd_api::Scope;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A policy's effective value changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyChange {
    /// Signal name; equal to the policy name
    pub policy: String,
    pub scope: Scope,
    /// Serialized value (see `PolicyValue::dump`)
    pub value: String,
}

/// Errors from the change bus
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Signal '{0}' was never registered")]
    UnregisteredSignal(String),
}

/// Named-signal notification bus.
///
/// Every signal must be registered before its first emission.
pub trait ChangeBus: Send + Sync {
    /// Register a signal; registering twice is harmless
    fn register(&self, signal: &str) -> Result<(), NotifyError>;

    /// Emit a change on the signal named by `change.policy`
    fn emit(&self, change: PolicyChange) -> Result<(), NotifyError>;
}
