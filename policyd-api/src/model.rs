//! Policy models: one instance per policy name

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::compare::{Comparator, StateComparator};
use crate::error::{EnforcementError, PolicyError};
use crate::value::PolicyValue;

/// Where a policy value applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "uid", rename_all = "snake_case")]
pub enum Scope {
    /// The single system-wide slot
    Global,
    /// A per-user/session slot keyed by uid
    Domain(u32),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global scope"),
            Scope::Domain(uid) => write!(f, "domain {}", uid),
        }
    }
}

/// Whether a policy has one system-wide value or one value per domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Global,
    Domain,
}

impl PolicyKind {
    pub fn accepts(&self, scope: Scope) -> bool {
        matches!(
            (self, scope),
            (PolicyKind::Global, Scope::Global) | (PolicyKind::Domain, Scope::Domain(_))
        )
    }
}

/// Side effect run whenever a policy's effective value changes.
///
/// Hooks run while the model's cache is locked; they must not call back into
/// the same model.
pub trait EnforcementHook: Send + Sync {
    fn on_changed(&self, scope: Scope, value: &PolicyValue) -> Result<(), EnforcementError>;
}

impl<F> EnforcementHook for F
where
    F: Fn(Scope, &PolicyValue) -> Result<(), EnforcementError> + Send + Sync,
{
    fn on_changed(&self, scope: Scope, value: &PolicyValue) -> Result<(), EnforcementError> {
        self(scope, value)
    }
}

struct NoEnforcement;

impl EnforcementHook for NoEnforcement {
    fn on_changed(&self, _scope: Scope, _value: &PolicyValue) -> Result<(), EnforcementError> {
        Ok(())
    }
}

/// A single policy: its initial value, ordering, enforcement hook and the
/// cache of values that were successfully enforced.
pub struct PolicyModel {
    name: String,
    kind: PolicyKind,
    initial: PolicyValue,
    comparator: Box<dyn Comparator>,
    hook: Box<dyn EnforcementHook>,
    current: Mutex<HashMap<Scope, PolicyValue>>,
}

impl PolicyModel {
    /// A policy with one system-wide value
    pub fn global(name: impl Into<String>, initial: impl Into<PolicyValue>) -> Self {
        Self::new(name.into(), PolicyKind::Global, initial.into())
    }

    /// A policy with one value per domain
    pub fn domain(name: impl Into<String>, initial: impl Into<PolicyValue>) -> Self {
        Self::new(name.into(), PolicyKind::Domain, initial.into())
    }

    fn new(name: String, kind: PolicyKind, initial: PolicyValue) -> Self {
        Self {
            name,
            kind,
            comparator: Box::new(StateComparator::with_default(initial.clone())),
            initial,
            hook: Box::new(NoEnforcement),
            current: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the default [`StateComparator`], which is anchored at the
    /// initial value
    pub fn with_comparator(mut self, comparator: impl Comparator + 'static) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    /// Install the enforcement hook
    pub fn on_changed(mut self, hook: impl EnforcementHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn initial(&self) -> &PolicyValue {
        &self.initial
    }

    pub fn comparator(&self) -> &dyn Comparator {
        self.comparator.as_ref()
    }

    /// Compare two values by this policy's restrictiveness ordering
    pub fn compare(&self, a: &PolicyValue, b: &PolicyValue) -> Ordering {
        self.comparator.compare(a, b)
    }

    /// Check that `value` may be stored under `scope` for this policy
    pub fn validate(&self, scope: Scope, value: &PolicyValue) -> Result<(), PolicyError> {
        self.check_scope(scope)?;
        if value.kind() != self.initial.kind() {
            return Err(PolicyError::TypeMismatch {
                expected: self.initial.kind(),
                found: value.kind(),
            });
        }
        Ok(())
    }

    fn check_scope(&self, scope: Scope) -> Result<(), PolicyError> {
        if self.kind.accepts(scope) {
            Ok(())
        } else {
            Err(PolicyError::ScopeMismatch {
                policy: self.name.clone(),
                scope,
            })
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<Scope, PolicyValue>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap the cached value for `scope` and run the enforcement hook.
    ///
    /// If the hook fails the cache is restored to its previous state (or left
    /// uninitialized) and the error is returned.
    pub fn set(&self, scope: Scope, value: PolicyValue) -> Result<(), PolicyError> {
        self.validate(scope, &value)?;

        let mut cache = self.cache();
        let previous = cache.insert(scope, value.clone());

        if let Err(source) = self.hook.on_changed(scope, &value) {
            match previous {
                Some(prev) => cache.insert(scope, prev),
                None => cache.remove(&scope),
            };
            tracing::warn!(
                policy = %self.name,
                %scope,
                value = %value.dump(),
                error = %source,
                "Enforcement failed, cached value rolled back"
            );
            return Err(PolicyError::Enforcement {
                policy: self.name.clone(),
                source,
            });
        }

        tracing::debug!(policy = %self.name, %scope, value = %value.dump(), "Policy enforced");
        Ok(())
    }

    /// The last successfully enforced value for `scope`
    pub fn get(&self, scope: Scope) -> Result<PolicyValue, PolicyError> {
        self.check_scope(scope)?;
        self.cache()
            .get(&scope)
            .cloned()
            .ok_or_else(|| PolicyError::NotInitialized {
                policy: self.name.clone(),
                scope,
            })
    }

    pub fn is_ready(&self, scope: Scope) -> bool {
        self.cache().contains_key(&scope)
    }

    /// Scopes holding an enforced value, in order
    pub fn ready_scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.cache().keys().copied().collect();
        scopes.sort();
        scopes
    }
}

impl fmt::Debug for PolicyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyModel")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}
