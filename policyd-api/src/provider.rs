//! Policy providers: named bundles of policy models

use std::collections::BTreeMap;

use crate::model::PolicyModel;

/// A named, immutable set of policies built by a provider module
#[derive(Debug)]
pub struct PolicyProvider {
    name: String,
    policies: BTreeMap<String, PolicyModel>,
}

impl PolicyProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policies: BTreeMap::new(),
        }
    }

    /// Add a policy. The first model registered under a name wins.
    pub fn with_policy(mut self, model: PolicyModel) -> Self {
        if self.policies.contains_key(model.name()) {
            tracing::warn!(
                provider = %self.name,
                policy = %model.name(),
                "Duplicate policy in provider, keeping the first definition"
            );
            return self;
        }
        self.policies.insert(model.name().to_string(), model);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self, name: &str) -> Option<&PolicyModel> {
        self.policies.get(name)
    }

    /// Policies in name order
    pub fn policies(&self) -> impl Iterator<Item = &PolicyModel> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PolicyValue;

    #[test]
    fn test_with_policy_keeps_first_duplicate() {
        let provider = PolicyProvider::new("device")
            .with_policy(PolicyModel::global("camera", 1))
            .with_policy(PolicyModel::global("camera", 0));

        assert_eq!(provider.len(), 1);
        assert_eq!(
            provider.policy("camera").unwrap().initial(),
            &PolicyValue::Int(1)
        );
    }

    #[test]
    fn test_policies_are_name_ordered() {
        let provider = PolicyProvider::new("device")
            .with_policy(PolicyModel::global("wifi", 1))
            .with_policy(PolicyModel::global("bluetooth", 1))
            .with_policy(PolicyModel::global("camera", 1));

        let names: Vec<_> = provider.policies().map(|p| p.name()).collect();
        assert_eq!(names, vec!["bluetooth", "camera", "wifi"]);
    }

    #[test]
    fn test_empty_provider() {
        let provider = PolicyProvider::new("empty");
        assert!(provider.is_empty());
        assert!(provider.policy("anything").is_none());
    }
}
