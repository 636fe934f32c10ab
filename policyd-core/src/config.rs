//! Engine configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::storage::{ActivationFilter, DEFAULT_ADMIN};

/// Everything needed to start a [`PolicyManager`](crate::PolicyManager)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database holding administrators and managed values
    pub database: PathBuf,

    /// Directory scanned for provider modules
    pub provider_dir: PathBuf,

    /// Identity representing the platform itself
    pub default_admin: String,

    /// Whether inactive administrators constrain effective values
    pub aggregation: ActivationFilter,

    /// Policy name (or `*`) to identities allowed to set it (`*` for anyone).
    /// An empty table allows every caller.
    #[serde(default)]
    pub privileges: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: policyd_paths::database_path(),
            provider_dir: policyd_paths::provider_dir(),
            default_admin: DEFAULT_ADMIN.to_string(),
            aggregation: ActivationFilter::default(),
            privileges: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();
        assert!(config.database.ends_with("policy.db"));
        assert!(config.provider_dir.ends_with("providers"));
        assert_eq!(config.default_admin, "policyd");
        assert_eq!(config.aggregation, ActivationFilter::Any);
        assert!(config.privileges.is_empty());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = EngineConfig {
            database: PathBuf::from("/var/lib/policyd/policy.db"),
            provider_dir: PathBuf::from("/usr/lib/policyd/providers"),
            default_admin: "platform".to_string(),
            aggregation: ActivationFilter::ActivatedOnly,
            privileges: BTreeMap::new(),
        };
        config
            .privileges
            .insert("camera".to_string(), vec!["mdm".to_string()]);

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.database, config.database);
        assert_eq!(parsed.default_admin, "platform");
        assert_eq!(parsed.aggregation, ActivationFilter::ActivatedOnly);
        assert_eq!(parsed.privileges["camera"], vec!["mdm".to_string()]);
    }
}
