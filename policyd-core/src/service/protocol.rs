//! Wire messages of the policy service
//!
//! Requests and responses are JSON objects, one per line on stream transports.

use policyd_api::PolicyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ErrorCode;

/// Calls accepted from clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Register an administrator
    Enroll { admin: String },

    /// Remove an administrator and every value it submitted
    Disenroll { admin: String },

    /// Change an administrator's activation state
    Activate { admin: String, state: bool },

    /// Submit the caller's value for a policy.
    ///
    /// `value` is untagged text parsed against the policy's value type.
    Set {
        policy: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<u32>,
    },

    /// Effective value of one policy
    Get {
        policy: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<u32>,
    },

    /// Effective values of every global policy, or every per-domain policy
    /// when `domain` is given
    GetAll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<u32>,
    },
}

/// Replies sent back to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok,

    Value { value: PolicyValue },

    Values { values: BTreeMap<String, PolicyValue> },

    /// Failure with a stable code; internal details are never included
    Error { code: i32, error: ErrorCode },
}

impl Response {
    pub fn error(code: ErrorCode) -> Self {
        Response::Error {
            code: code.as_i32(),
            error: code,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
