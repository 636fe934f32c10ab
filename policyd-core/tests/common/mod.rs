//! Shared fixtures for policyd-core integration tests

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use policyd_api::{
    EnforcementError, MaximizeIntegerComparator, MinimizeIntegerComparator, PolicyModel,
    PolicyProvider, PolicyValue, Scope,
};
use policyd_core::{
    ActivationFilter, MemoryChangeBus, PolicyManager, PolicyStorage, ProviderRegistry,
};

/// Records what the enforcement hooks pushed into the "device"
#[derive(Clone, Default)]
pub struct Device {
    pub enforced: Arc<Mutex<Vec<(String, Scope, PolicyValue)>>>,
    pub fail: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Last value enforced for `policy` in `scope`
    pub fn last(&self, policy: &str, scope: Scope) -> Option<PolicyValue> {
        self.enforced
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, s, _)| name == policy && *s == scope)
            .map(|(_, _, value)| value.clone())
    }

    pub fn count(&self, policy: &str) -> usize {
        self.enforced
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == policy)
            .count()
    }

    fn model(&self, model: PolicyModel) -> PolicyModel {
        let name = model.name().to_string();
        let log = self.enforced.clone();
        let fail = self.fail.clone();
        model.on_changed(
            move |scope: Scope, value: &PolicyValue| -> Result<(), EnforcementError> {
                if fail.load(Ordering::SeqCst) {
                    return Err(EnforcementError::rejected("device unavailable"));
                }
                log.lock().unwrap().push((name.clone(), scope, value.clone()));
                Ok(())
            },
        )
    }

    /// The policies shipped by the demo provider, wired to this device
    pub fn provider(&self) -> PolicyProvider {
        PolicyProvider::new("device")
            .with_policy(self.model(PolicyModel::global("bluetooth", 1)))
            .with_policy(self.model(PolicyModel::global("camera", 1)))
            .with_policy(self.model(PolicyModel::global("wifi", 1)))
            .with_policy(self.model(
                PolicyModel::global("password-minimum-length", 0)
                    .with_comparator(MaximizeIntegerComparator),
            ))
            .with_policy(self.model(
                PolicyModel::global("password-maximum-failed-attempts", 0)
                    .with_comparator(MinimizeIntegerComparator),
            ))
            .with_policy(self.model(PolicyModel::domain("browser-autofill", true)))
    }
}

#[allow(dead_code)]
pub fn manager(device: &Device) -> PolicyManager {
    manager_with_storage(device, PolicyStorage::open_in_memory().unwrap())
}

#[allow(dead_code)]
pub fn manager_activated_only(device: &Device) -> PolicyManager {
    manager_with_storage(
        device,
        PolicyStorage::open_in_memory()
            .unwrap()
            .with_activation_filter(ActivationFilter::ActivatedOnly),
    )
}

#[allow(dead_code)]
pub fn manager_at(device: &Device, path: &Path) -> PolicyManager {
    manager_with_storage(device, PolicyStorage::open(path).unwrap())
}

#[allow(dead_code)]
pub fn manager_with_storage(device: &Device, storage: PolicyStorage) -> PolicyManager {
    let mut registry = ProviderRegistry::new();
    registry.register(device.provider());
    PolicyManager::new(storage, registry, Arc::new(MemoryChangeBus::default())).unwrap()
}
