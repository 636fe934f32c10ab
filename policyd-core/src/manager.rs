//! PolicyManager - the engine façade
//!
//! Owns the policy store, the loaded providers and the change bus, and keeps
//! three things consistent: the persisted values, each model's cache, and the
//! side effects performed by enforcement hooks.

use policyd_api::{PolicyError, PolicyKind, PolicyModel, PolicyValue, Scope};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::EngineConfig;
use crate::error::ManagerError;
use crate::loader::{LoadReport, PolicyLoader, ProviderRegistry};
use crate::notify::{ChangeBus, PolicyChange};
use crate::storage::{ActivationFilter, Administrator, PolicyStorage};

/// Catalog entry for one policy
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyInfo {
    pub name: String,
    pub provider: String,
    pub kind: PolicyKind,
    pub initial: PolicyValue,
}

pub struct PolicyManager {
    storage: PolicyStorage,
    bus: Arc<dyn ChangeBus>,
    /// Policy name to the provider that owns it
    lookup: BTreeMap<String, String>,
    /// One lock per policy; mutations of a policy hold its lock from
    /// validation through enforcement and persistence
    locks: BTreeMap<String, Mutex<()>>,
    report: LoadReport,
    // Declared last so every model reference above is gone before the
    // provider modules are unloaded
    registry: ProviderRegistry,
}

impl PolicyManager {
    /// Open the store, load providers from the configured directory and
    /// bring every policy to its persisted effective value.
    pub fn start(config: &EngineConfig, bus: Arc<dyn ChangeBus>) -> Result<Self, ManagerError> {
        let storage = PolicyStorage::open(&config.database)?
            .with_activation_filter(config.aggregation)
            .with_default_admin(config.default_admin.clone());

        let mut registry = ProviderRegistry::new();
        let report = PolicyLoader::new().load_dir(&config.provider_dir, &mut registry)?;
        tracing::info!(
            dir = %config.provider_dir.display(),
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "Provider loading finished"
        );

        Self::with_registry(storage, registry, bus, report)
    }

    /// Build a manager over providers that are already loaded
    pub fn new(
        storage: PolicyStorage,
        registry: ProviderRegistry,
        bus: Arc<dyn ChangeBus>,
    ) -> Result<Self, ManagerError> {
        let report = LoadReport {
            passed: registry.len(),
            ..LoadReport::default()
        };
        Self::with_registry(storage, registry, bus, report)
    }

    fn with_registry(
        storage: PolicyStorage,
        registry: ProviderRegistry,
        bus: Arc<dyn ChangeBus>,
        report: LoadReport,
    ) -> Result<Self, ManagerError> {
        let mut lookup: BTreeMap<String, String> = BTreeMap::new();
        let mut locks: BTreeMap<String, Mutex<()>> = BTreeMap::new();

        for loaded in registry.iter() {
            let provider = loaded.provider();
            for model in provider.policies() {
                if let Some(owner) = lookup.get(model.name()) {
                    tracing::warn!(
                        policy = %model.name(),
                        provider = %provider.name(),
                        owner = %owner,
                        "Policy already provided, ignoring duplicate"
                    );
                    continue;
                }

                if !storage.define(model.name(), model.initial())? {
                    let stored = storage.definition(model.name())?;
                    if stored.as_ref() != Some(model.initial()) {
                        tracing::warn!(
                            policy = %model.name(),
                            provider_initial = %model.initial().dump(),
                            "Provider initial value differs from the stored definition"
                        );
                    }
                }

                if let Err(e) = bus.register(model.name()) {
                    tracing::warn!(policy = %model.name(), error = %e, "Failed to register signal");
                }

                lookup.insert(model.name().to_string(), provider.name().to_string());
                locks.insert(model.name().to_string(), Mutex::new(()));
            }
        }

        if lookup.is_empty() {
            tracing::warn!("No policies available; every policy request will fail");
        }

        let default_admin = storage.default_admin().to_string();
        storage.enroll(&default_admin)?;
        storage.activate(&default_admin, true)?;

        let manager = Self {
            storage,
            bus,
            lookup,
            locks,
            report,
            registry,
        };
        manager.reconcile_all();
        Ok(manager)
    }

    // ─── Catalog ─────────────────────────────────────────────────────

    pub fn load_report(&self) -> LoadReport {
        self.report
    }

    pub fn storage(&self) -> &PolicyStorage {
        &self.storage
    }

    pub fn default_admin(&self) -> &str {
        self.storage.default_admin()
    }

    pub fn model(&self, policy: &str) -> Option<&PolicyModel> {
        self.lookup
            .get(policy)
            .and_then(|provider| self.registry.model(provider, policy))
    }

    fn require_model(&self, policy: &str) -> Result<&PolicyModel, ManagerError> {
        self.model(policy)
            .ok_or_else(|| ManagerError::UnknownPolicy(policy.to_string()))
    }

    /// Every known policy in name order
    pub fn policies(&self) -> Vec<PolicyInfo> {
        self.lookup
            .iter()
            .filter_map(|(policy, provider)| {
                self.registry
                    .model(provider, policy)
                    .map(|model| PolicyInfo {
                        name: policy.clone(),
                        provider: provider.clone(),
                        kind: model.kind(),
                        initial: model.initial().clone(),
                    })
            })
            .collect()
    }

    pub fn admins(&self) -> Result<Vec<Administrator>, ManagerError> {
        Ok(self.storage.admins()?)
    }

    // ─── Administration ──────────────────────────────────────────────

    pub fn enroll(&self, admin: &str) -> Result<(), ManagerError> {
        self.storage.enroll(admin)?;
        Ok(())
    }

    /// Remove an administrator and re-enforce every policy it constrained
    pub fn disenroll(&self, admin: &str) -> Result<(), ManagerError> {
        let _guards = self.lock_all();
        if self.storage.disenroll(admin)? {
            self.reconcile_locked();
        }
        Ok(())
    }

    pub fn activate(&self, admin: &str, state: bool) -> Result<(), ManagerError> {
        let _guards = self.lock_all();
        self.storage.activate(admin, state)?;
        if self.storage.activation_filter() == ActivationFilter::ActivatedOnly {
            self.reconcile_locked();
        }
        Ok(())
    }

    // ─── Policy values ───────────────────────────────────────────────

    /// Submit `admin`'s value for a global policy
    pub fn set(&self, policy: &str, value: PolicyValue, admin: &str) -> Result<(), ManagerError> {
        self.set_scoped(policy, Scope::Global, value, admin)
    }

    /// Submit `admin`'s value for `policy` in `scope`.
    ///
    /// Validation happens before anything changes. The resulting effective
    /// value is enforced first and persisted only if enforcement succeeded; a
    /// failed write re-enforces whatever the store still says.
    pub fn set_scoped(
        &self,
        policy: &str,
        scope: Scope,
        value: PolicyValue,
        admin: &str,
    ) -> Result<(), ManagerError> {
        let model = self.require_model(policy)?;
        model.validate(scope, &value)?;

        let _guard = self.lock_policy(policy);

        let effective = self.storage.preview(admin, model, scope, &value)?;
        let changed = model.get(scope).ok().as_ref() != Some(&effective);
        if changed {
            model.set(scope, effective.clone())?;
        }

        if let Err(e) = self.storage.update(admin, policy, scope, &value) {
            tracing::error!(
                policy,
                admin,
                %scope,
                error = %e,
                "Failed to persist policy value, restoring stored state"
            );
            if changed {
                self.reconcile_scope(model, scope);
            }
            return Err(e.into());
        }

        tracing::info!(
            policy,
            admin,
            %scope,
            value = %value.dump(),
            effective = %effective.dump(),
            "Policy value set"
        );
        self.notify(policy, scope, &effective);
        Ok(())
    }

    /// Effective value of a global policy
    pub fn get(&self, policy: &str) -> Result<PolicyValue, ManagerError> {
        self.get_scoped(policy, Scope::Global)
    }

    pub fn get_scoped(&self, policy: &str, scope: Scope) -> Result<PolicyValue, ManagerError> {
        let model = self.require_model(policy)?;
        if !model.kind().accepts(scope) {
            return Err(PolicyError::ScopeMismatch {
                policy: policy.to_string(),
                scope,
            }
            .into());
        }
        Ok(self.storage.strictest(model, scope)?)
    }

    /// Effective values of every global policy
    pub fn get_all(&self) -> Result<BTreeMap<String, PolicyValue>, ManagerError> {
        self.collect(PolicyKind::Global, Scope::Global)
    }

    /// Effective values of every per-domain policy for `uid`
    pub fn get_all_in(&self, uid: u32) -> Result<BTreeMap<String, PolicyValue>, ManagerError> {
        self.collect(PolicyKind::Domain, Scope::Domain(uid))
    }

    fn collect(
        &self,
        kind: PolicyKind,
        scope: Scope,
    ) -> Result<BTreeMap<String, PolicyValue>, ManagerError> {
        let mut values = BTreeMap::new();
        for info in self.policies().into_iter().filter(|p| p.kind == kind) {
            let value = self.get_scoped(&info.name, scope)?;
            values.insert(info.name, value);
        }
        Ok(values)
    }

    // ─── Reconciliation ──────────────────────────────────────────────

    fn lock_policy(&self, policy: &str) -> Option<MutexGuard<'_, ()>> {
        self.locks
            .get(policy)
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Take every policy lock in name order
    fn lock_all(&self) -> Vec<MutexGuard<'_, ()>> {
        self.locks
            .values()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }

    fn reconcile_all(&self) {
        let _guards = self.lock_all();
        self.reconcile_locked();
    }

    /// Bring every model in line with the store. Callers hold all locks.
    fn reconcile_locked(&self) {
        for (policy, provider) in &self.lookup {
            let Some(model) = self.registry.model(provider, policy) else {
                continue;
            };
            for scope in self.scopes_of(model) {
                self.reconcile_scope(model, scope);
            }
        }
    }

    fn scopes_of(&self, model: &PolicyModel) -> Vec<Scope> {
        match model.kind() {
            PolicyKind::Global => vec![Scope::Global],
            PolicyKind::Domain => {
                // Domains that lost their last row must fall back as well
                let mut scopes = model.ready_scopes();
                match self.storage.domains(model.name()) {
                    Ok(domains) => scopes.extend(domains.into_iter().map(Scope::Domain)),
                    Err(e) => tracing::warn!(
                        policy = %model.name(),
                        error = %e,
                        "Failed to list domains"
                    ),
                }
                scopes.sort();
                scopes.dedup();
                scopes
            }
        }
    }

    fn reconcile_scope(&self, model: &PolicyModel, scope: Scope) {
        let effective = match self.storage.strictest(model, scope) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(policy = %model.name(), %scope, error = %e, "Failed to aggregate policy");
                return;
            }
        };

        if model.get(scope).ok().as_ref() == Some(&effective) {
            return;
        }

        match model.set(scope, effective.clone()) {
            Ok(()) => self.notify(model.name(), scope, &effective),
            Err(e) => tracing::warn!(
                policy = %model.name(),
                %scope,
                error = %e,
                "Failed to enforce effective value"
            ),
        }
    }

    fn notify(&self, policy: &str, scope: Scope, value: &PolicyValue) {
        let change = PolicyChange {
            policy: policy.to_string(),
            scope,
            value: value.dump(),
        };
        if let Err(e) = self.bus.emit(change) {
            tracing::warn!(policy, error = %e, "Failed to emit policy change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryChangeBus;
    use policyd_api::{EnforcementError, MaximizeIntegerComparator, PolicyProvider};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn manager_with(provider: PolicyProvider) -> PolicyManager {
        let mut registry = ProviderRegistry::new();
        registry.register(provider);
        PolicyManager::new(
            PolicyStorage::open_in_memory().unwrap(),
            registry,
            Arc::new(MemoryChangeBus::default()),
        )
        .unwrap()
    }

    fn flaky_bluetooth(fail: Arc<AtomicBool>) -> PolicyProvider {
        PolicyProvider::new("device").with_policy(PolicyModel::global("bluetooth", 1).on_changed(
            move |_scope: Scope, _value: &PolicyValue| -> Result<(), EnforcementError> {
                if fail.load(Ordering::SeqCst) {
                    Err(EnforcementError::rejected("radio busy"))
                } else {
                    Ok(())
                }
            },
        ))
    }

    #[test]
    fn start_up_defines_and_enforces_initial_values() {
        let manager = manager_with(
            PolicyProvider::new("device").with_policy(PolicyModel::global("camera", 1)),
        );

        assert_eq!(
            manager.storage().definition("camera").unwrap(),
            Some(PolicyValue::Int(1))
        );
        assert_eq!(
            manager.model("camera").unwrap().get(Scope::Global).unwrap(),
            PolicyValue::Int(1)
        );
    }

    #[test]
    fn start_up_enrolls_and_activates_default_admin() {
        let manager = manager_with(PolicyProvider::new("empty"));
        let admins = manager.admins().unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].name, "policyd");
        assert!(admins[0].activated);
    }

    #[test]
    fn set_unknown_policy_fails() {
        let manager = manager_with(PolicyProvider::new("empty"));
        manager.enroll("mdm").unwrap();
        let err = manager.set("teleport", PolicyValue::Int(0), "mdm").unwrap_err();
        assert!(matches!(err, ManagerError::UnknownPolicy(_)));
    }

    #[test]
    fn set_unknown_admin_writes_nothing() {
        let fail = Arc::new(AtomicBool::new(false));
        let manager = manager_with(flaky_bluetooth(fail));

        let err = manager.set("bluetooth", PolicyValue::Int(0), "ghost").unwrap_err();
        assert!(matches!(err, ManagerError::UnknownAdmin(_)));
        assert!(manager.storage().managed_values("bluetooth").unwrap().is_empty());
        assert_eq!(
            manager.model("bluetooth").unwrap().get(Scope::Global).unwrap(),
            PolicyValue::Int(1)
        );
    }

    #[test]
    fn set_wrong_kind_fails_before_storage() {
        let manager = manager_with(
            PolicyProvider::new("device").with_policy(PolicyModel::global("camera", 1)),
        );
        manager.enroll("mdm").unwrap();

        let err = manager.set("camera", PolicyValue::Bool(false), "mdm").unwrap_err();
        assert!(matches!(err, ManagerError::InvalidValue(_)));
        assert!(manager.storage().managed_values("camera").unwrap().is_empty());
    }

    #[test]
    fn failed_enforcement_keeps_previous_value_everywhere() {
        let fail = Arc::new(AtomicBool::new(false));
        let manager = manager_with(flaky_bluetooth(fail.clone()));
        manager.enroll("mdm").unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = manager.set("bluetooth", PolicyValue::Int(0), "mdm").unwrap_err();
        assert!(matches!(err, ManagerError::EnforcementFailed { .. }));

        // Cache, store and aggregate all still say "enabled"
        let model = manager.model("bluetooth").unwrap();
        assert_eq!(model.get(Scope::Global).unwrap(), PolicyValue::Int(1));
        assert!(manager.storage().managed_values("bluetooth").unwrap().is_empty());
        assert_eq!(manager.get("bluetooth").unwrap(), PolicyValue::Int(1));
    }

    #[test]
    fn set_enforces_effective_value_not_submitted_value() {
        let manager = manager_with(
            PolicyProvider::new("password").with_policy(
                PolicyModel::global("password-minimum-length", 0)
                    .with_comparator(MaximizeIntegerComparator),
            ),
        );
        manager.enroll("a").unwrap();
        manager.enroll("b").unwrap();

        manager.set("password-minimum-length", PolicyValue::Int(8), "a").unwrap();
        manager.set("password-minimum-length", PolicyValue::Int(4), "b").unwrap();

        let model = manager.model("password-minimum-length").unwrap();
        assert_eq!(model.get(Scope::Global).unwrap(), PolicyValue::Int(8));
    }

    #[test]
    fn get_with_wrong_scope_fails() {
        let manager = manager_with(
            PolicyProvider::new("device").with_policy(PolicyModel::global("camera", 1)),
        );
        let err = manager.get_scoped("camera", Scope::Domain(5001)).unwrap_err();
        assert!(matches!(err, ManagerError::InvalidValue(_)));
    }

    #[test]
    fn duplicate_policy_across_providers_keeps_first() {
        let mut registry = ProviderRegistry::new();
        registry.register(PolicyProvider::new("a").with_policy(PolicyModel::global("camera", 1)));
        registry.register(PolicyProvider::new("b").with_policy(PolicyModel::global("camera", 0)));
        let manager = PolicyManager::new(
            PolicyStorage::open_in_memory().unwrap(),
            registry,
            Arc::new(MemoryChangeBus::default()),
        )
        .unwrap();

        let policies = manager.policies();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].provider, "a");
        assert_eq!(manager.get("camera").unwrap(), PolicyValue::Int(1));
    }

    #[test]
    fn changes_are_announced_on_the_bus() {
        let bus = Arc::new(MemoryChangeBus::default());
        let mut rx = bus.subscribe();
        let mut registry = ProviderRegistry::new();
        registry.register(PolicyProvider::new("device").with_policy(PolicyModel::global("camera", 1)));
        let manager =
            PolicyManager::new(PolicyStorage::open_in_memory().unwrap(), registry, bus.clone())
                .unwrap();

        // Start-up enforcement of the initial value
        assert_eq!(rx.try_recv().unwrap().value, "int:1");

        manager.enroll("mdm").unwrap();
        manager.set("camera", PolicyValue::Int(0), "mdm").unwrap();
        let change = rx.try_recv().unwrap();
        assert_eq!(change.policy, "camera");
        assert_eq!(change.scope, Scope::Global);
        assert_eq!(change.value, "int:0");
    }

    #[test]
    fn disenroll_default_admin_is_denied() {
        let manager = manager_with(PolicyProvider::new("empty"));
        let err = manager.disenroll("policyd").unwrap_err();
        assert!(matches!(err, ManagerError::PermissionDenied(_)));
    }
}
