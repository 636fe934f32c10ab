//! XDG Base Directory paths for policyd.
//!
//! The engine keeps its configuration and provider modules under the config
//! directory and its policy database under the data directory.

use std::path::PathBuf;

const APP: &str = "policyd";

/// Get the policyd config directory.
///
/// Returns `$XDG_CONFIG_HOME/policyd` if set, otherwise `~/.config/policyd`.
///
/// # Examples
///
/// ```
/// use policyd_paths::config_dir;
///
/// let config = config_dir();
/// let providers = config.join("providers");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP)
    } else {
        PathBuf::from(".config").join(APP)
    }
}

/// Get the policyd data directory.
///
/// Returns `$XDG_DATA_HOME/policyd` if set, otherwise `~/.local/share/policyd`.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join(APP)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share").join(APP)
    } else {
        PathBuf::from(".local/share").join(APP)
    }
}

/// Default location of the policy database
pub fn database_path() -> PathBuf {
    data_dir().join("policy.db")
}

/// Default directory scanned for provider modules
pub fn provider_dir() -> PathBuf {
    config_dir().join("providers")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_policyd() {
        assert!(config_dir().ends_with("policyd"));
    }

    #[test]
    fn test_data_dir_ends_with_policyd() {
        assert!(data_dir().ends_with("policyd"));
    }

    #[test]
    fn test_derived_paths() {
        assert!(database_path().ends_with("policyd/policy.db"));
        assert!(provider_dir().ends_with("policyd/providers"));
    }
}
