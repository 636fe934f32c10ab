//! Rows of the policy store

use policyd_api::{PolicyValue, Scope};
use serde::{Deserialize, Serialize};

/// Administrator that may submit policy values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
    pub name: String,
    pub activated: bool,
    /// Unix timestamp (seconds)
    pub enrolled_at: i64,
}

/// Value an administrator currently wants for a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedValue {
    pub admin: String,
    pub policy: String,
    pub scope: Scope,
    pub value: PolicyValue,
    /// Unix timestamp (seconds)
    pub updated_at: i64,
}

/// Which administrators' values take part in aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationFilter {
    /// Every enrolled administrator constrains the aggregate
    #[default]
    Any,
    /// Only activated administrators constrain the aggregate
    ActivatedOnly,
}

/// Column value used for the global slot
pub(crate) const GLOBAL_DOMAIN: i64 = -1;

pub(crate) fn scope_to_column(scope: Scope) -> i64 {
    match scope {
        Scope::Global => GLOBAL_DOMAIN,
        Scope::Domain(uid) => uid as i64,
    }
}

pub(crate) fn column_to_scope(domain: i64) -> Scope {
    if domain < 0 {
        Scope::Global
    } else {
        Scope::Domain(domain as u32)
    }
}
