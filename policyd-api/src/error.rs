//! Error types for policy authors

use thiserror::Error;

use crate::model::Scope;
use crate::value::ValueKind;

/// Errors raised by policy values and models
#[derive(Error, Debug)]
pub enum PolicyError {
    /// `get` was called before any value was set for the scope
    #[error("Policy '{policy}' has no value yet for {scope}")]
    NotInitialized { policy: String, scope: Scope },

    /// A value of the wrong kind was submitted
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueKind, found: ValueKind },

    /// A global policy was addressed with a domain scope or vice versa
    #[error("Policy '{policy}' does not accept {scope}")]
    ScopeMismatch { policy: String, scope: Scope },

    /// Text could not be parsed as a value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The enforcement hook failed; the cached value was rolled back
    #[error("Enforcement of '{policy}' failed: {source}")]
    Enforcement {
        policy: String,
        #[source]
        source: EnforcementError,
    },
}

/// Error returned by an enforcement hook
#[derive(Error, Debug)]
pub enum EnforcementError {
    /// IO error while touching the device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The subsystem refused the value
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl EnforcementError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}
