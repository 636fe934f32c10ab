use policyd_core::{ActivationFilter, EngineConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct RawPolicydConfig {
    /// SQLite policy database
    pub database: Option<PathBuf>,

    /// Directory scanned for provider modules
    pub provider_dir: Option<PathBuf>,

    /// Identity representing the platform itself
    pub default_admin: Option<String>,

    /// `any` or `activated-only`
    pub aggregation: Option<ActivationFilter>,

    /// Policy name (or `*`) to identities allowed to set it
    #[serde(default)]
    pub privileges: BTreeMap<String, Vec<String>>,
}

impl RawPolicydConfig {
    /// Convert to the engine configuration with defaults applied
    pub fn finalize(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            database: self.database.unwrap_or(defaults.database),
            provider_dir: self.provider_dir.unwrap_or(defaults.provider_dir),
            default_admin: self.default_admin.unwrap_or(defaults.default_admin),
            aggregation: self.aggregation.unwrap_or(defaults.aggregation),
            privileges: self.privileges,
        }
    }
}

/// Values given on the command line; these win over every file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub provider_dir: Option<PathBuf>,
}

impl From<Overrides> for RawPolicydConfig {
    fn from(overrides: Overrides) -> Self {
        RawPolicydConfig {
            database: overrides.database,
            provider_dir: overrides.provider_dir,
            ..RawPolicydConfig::default()
        }
    }
}
