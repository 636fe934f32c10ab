//! Arena of loaded providers keyed by provider name

use libloading::Library;
use policyd_api::{PolicyModel, PolicyProvider};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A provider and the module its code lives in
pub struct LoadedProvider {
    // Field order matters: the provider's models (and the hook closures they
    // hold) must be dropped before the library that contains their code.
    provider: PolicyProvider,
    source: Option<PathBuf>,
    _library: Option<Library>,
}

impl LoadedProvider {
    pub fn provider(&self) -> &PolicyProvider {
        &self.provider
    }

    /// Module file the provider was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Owns every loaded provider for the lifetime of the engine.
///
/// Modules are never unloaded while the registry is alive; dropping the
/// registry drops each provider before its module.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, LoadedProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider compiled into the process.
    ///
    /// Returns `false` (and drops `provider`) if the name is already taken.
    pub fn register(&mut self, provider: PolicyProvider) -> bool {
        self.insert(provider, None, None)
    }

    pub(crate) fn insert(
        &mut self,
        provider: PolicyProvider,
        source: Option<PathBuf>,
        library: Option<Library>,
    ) -> bool {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            tracing::warn!(provider = %name, "Provider already loaded, skipping");
            // Parameters drop in reverse order, which would unload the
            // library before the provider
            drop(provider);
            drop(library);
            return false;
        }
        self.providers.insert(
            name,
            LoadedProvider {
                provider,
                source,
                _library: library,
            },
        );
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&LoadedProvider> {
        self.providers.get(name)
    }

    /// Providers in name order
    pub fn iter(&self) -> impl Iterator<Item = &LoadedProvider> {
        self.providers.values()
    }

    /// Look up a policy model within a named provider
    pub fn model(&self, provider: &str, policy: &str) -> Option<&PolicyModel> {
        self.providers
            .get(provider)
            .and_then(|loaded| loaded.provider.policy(policy))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
