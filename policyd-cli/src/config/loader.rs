use super::types::{Overrides, RawPolicydConfig};
use anyhow::{Context, Result};
use policyd_core::EngineConfig;
use std::path::{Path, PathBuf};

/// Environment variable naming an extra config file
pub const CONFIG_ENV: &str = "POLICYD_CONFIG";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user file, then `$POLICYD_CONFIG`, then
    /// command-line overrides)
    pub fn load(overrides: &Overrides) -> Result<EngineConfig> {
        let mut layers = Vec::new();

        // Layer 1: User config, optional
        let user_path = Self::user_config_path();
        if user_path.exists() {
            layers.push(user_path);
        }

        // Layer 2: Explicit config file, must exist when named
        if let Some(env_path) = Self::env_config_path() {
            layers.push(env_path);
        }

        Self::load_layers(&layers, overrides)
    }

    /// Merge the given files in order, then apply overrides
    pub fn load_layers(layers: &[PathBuf], overrides: &Overrides) -> Result<EngineConfig> {
        let mut raw = RawPolicydConfig::default();
        for path in layers {
            raw = Self::merge_raw(raw, Self::read(path)?);
        }
        raw = Self::merge_raw(raw, overrides.clone().into());
        Ok(raw.finalize())
    }

    /// `config.toml` in the policyd config directory
    pub fn user_config_path() -> PathBuf {
        policyd_paths::config_dir().join("config.toml")
    }

    pub fn env_config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV).map(PathBuf::from)
    }

    fn read(path: &Path) -> Result<RawPolicydConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawPolicydConfig, overlay: RawPolicydConfig) -> RawPolicydConfig {
        let mut privileges = base.privileges;
        privileges.extend(overlay.privileges);

        RawPolicydConfig {
            database: overlay.database.or(base.database),
            provider_dir: overlay.provider_dir.or(base.provider_dir),
            default_admin: overlay.default_admin.or(base.default_admin),
            aggregation: overlay.aggregation.or(base.aggregation),
            privileges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyd_core::ActivationFilter;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_no_layers_gives_defaults() {
        let config = ConfigLoader::load_layers(&[], &Overrides::default()).unwrap();
        assert_eq!(config.default_admin, "policyd");
        assert!(config.privileges.is_empty());
    }

    #[test]
    fn test_later_layer_wins_per_field() {
        let dir = TempDir::new().unwrap();
        let user = write(
            &dir,
            "user.toml",
            r#"
            database = "/user/policy.db"
            default_admin = "platform"
            [privileges]
            camera = ["mdm"]
            "#,
        );
        let env = write(
            &dir,
            "env.toml",
            r#"
            database = "/env/policy.db"
            aggregation = "activated-only"
            [privileges]
            wifi = ["ops"]
            "#,
        );

        let config = ConfigLoader::load_layers(&[user, env], &Overrides::default()).unwrap();
        assert_eq!(config.database, PathBuf::from("/env/policy.db"));
        assert_eq!(config.default_admin, "platform");
        assert_eq!(config.aggregation, ActivationFilter::ActivatedOnly);
        assert_eq!(config.privileges.len(), 2);
    }

    #[test]
    fn test_overrides_beat_files() {
        let dir = TempDir::new().unwrap();
        let user = write(&dir, "user.toml", r#"database = "/user/policy.db""#);
        let overrides = Overrides {
            database: Some(PathBuf::from("/cli/policy.db")),
            provider_dir: Some(PathBuf::from("/cli/providers")),
        };

        let config = ConfigLoader::load_layers(&[user], &overrides).unwrap();
        assert_eq!(config.database, PathBuf::from("/cli/policy.db"));
        assert_eq!(config.provider_dir, PathBuf::from("/cli/providers"));
    }

    #[test]
    fn test_missing_named_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ConfigLoader::load_layers(&[missing], &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.toml", "database = [");
        assert!(ConfigLoader::load_layers(&[bad], &Overrides::default()).is_err());
    }
}
