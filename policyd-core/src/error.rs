//! Error types for policyd-core

use policyd_api::{EnforcementError, PolicyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::LoaderError;
use crate::storage::StorageError;

/// Errors surfaced by [`PolicyManager`](crate::PolicyManager)
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Unknown administrator: {0}")]
    UnknownAdmin(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Enforcement of '{policy}' failed: {source}")]
    EnforcementFailed {
        policy: String,
        #[source]
        source: EnforcementError,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(#[source] PolicyError),

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("Provider loading failed: {0}")]
    Loader(#[from] LoaderError),
}

impl From<StorageError> for ManagerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownAdmin(admin) => ManagerError::UnknownAdmin(admin),
            StorageError::UnknownPolicy(policy) => ManagerError::UnknownPolicy(policy),
            StorageError::ProtectedAdmin(admin) => {
                ManagerError::PermissionDenied(format!("administrator '{}' is protected", admin))
            }
            other => ManagerError::Storage(other),
        }
    }
}

impl From<PolicyError> for ManagerError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Enforcement { policy, source } => {
                ManagerError::EnforcementFailed { policy, source }
            }
            other => ManagerError::InvalidValue(other),
        }
    }
}

impl ManagerError {
    /// Stable code reported across the service boundary
    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::UnknownPolicy(_) => ErrorCode::UnknownPolicy,
            ManagerError::UnknownAdmin(_) => ErrorCode::UnknownAdmin,
            ManagerError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            ManagerError::EnforcementFailed { .. } => ErrorCode::EnforcementFailed,
            ManagerError::InvalidValue(_) => ErrorCode::InvalidValue,
            ManagerError::Storage(_) => ErrorCode::StorageError,
            ManagerError::Loader(_) => ErrorCode::PluginLoadError,
        }
    }
}

/// Error codes returned to callers. Discriminants are part of the wire
/// contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum ErrorCode {
    BadRequest = -1,
    UnknownPolicy = -2,
    UnknownAdmin = -3,
    PermissionDenied = -4,
    InvalidValue = -5,
    EnforcementFailed = -6,
    StorageError = -7,
    PluginLoadError = -8,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
