//! Per-policy privilege checks for callers of the service

use std::collections::{BTreeMap, BTreeSet};

/// Matches any policy or any identity
pub const WILDCARD: &str = "*";

/// Decides whether an identity may set a policy
pub trait PrivilegeChecker: Send + Sync {
    fn may_set(&self, identity: &str, policy: &str) -> bool;
}

/// Grants every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PrivilegeChecker for AllowAll {
    fn may_set(&self, _identity: &str, _policy: &str) -> bool {
        true
    }
}

/// Policy name to the identities allowed to set it.
///
/// A `*` policy entry applies to every policy and a `*` identity matches every
/// caller. An empty table allows everything.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeTable {
    grants: BTreeMap<String, BTreeSet<String>>,
}

impl PrivilegeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(table: &BTreeMap<String, Vec<String>>) -> Self {
        let grants = table
            .iter()
            .map(|(policy, identities)| (policy.clone(), identities.iter().cloned().collect()))
            .collect();
        Self { grants }
    }

    pub fn grant(mut self, policy: impl Into<String>, identity: impl Into<String>) -> Self {
        self.grants
            .entry(policy.into())
            .or_default()
            .insert(identity.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    fn grants(&self, key: &str, identity: &str) -> bool {
        self.grants
            .get(key)
            .is_some_and(|ids| ids.contains(identity) || ids.contains(WILDCARD))
    }
}

impl PrivilegeChecker for PrivilegeTable {
    fn may_set(&self, identity: &str, policy: &str) -> bool {
        self.is_empty() || self.grants(policy, identity) || self.grants(WILDCARD, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_allows_everything() {
        assert!(PrivilegeTable::new().may_set("anyone", "camera"));
    }

    #[test]
    fn test_grant_is_per_policy() {
        let table = PrivilegeTable::new().grant("camera", "mdm");
        assert!(table.may_set("mdm", "camera"));
        assert!(!table.may_set("mdm", "wifi"));
        assert!(!table.may_set("intruder", "camera"));
    }

    #[test]
    fn test_wildcards() {
        let table = PrivilegeTable::new()
            .grant(WILDCARD, "root")
            .grant("wifi", WILDCARD);
        assert!(table.may_set("root", "camera"));
        assert!(table.may_set("guest", "wifi"));
        assert!(!table.may_set("guest", "camera"));
    }

    #[test]
    fn test_from_config() {
        let mut raw = BTreeMap::new();
        raw.insert("bluetooth".to_string(), vec!["mdm".to_string(), "ops".to_string()]);
        let table = PrivilegeTable::from_config(&raw);
        assert!(table.may_set("ops", "bluetooth"));
        assert!(!table.may_set("ops", "camera"));
    }
}
