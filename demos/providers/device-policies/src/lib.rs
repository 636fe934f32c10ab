//! Device Policies - a demo provider for policyd
//!
//! Ships a handful of common device restrictions. Instead of talking to real
//! hardware, every enforced value is written to a file under the device state
//! directory (`$POLICYD_DEVICE_DIR`, or `policyd-device` in the temp dir), so
//! the effect of aggregation can be watched from a shell.
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.config/policyd/providers
//! cp target/release/libdevice_policies.so ~/.config/policyd/providers/
//! policyd providers
//! ```

use policyd_api::{
    EnforcementError, MaximizeIntegerComparator, MinimizeIntegerComparator, PolicyModel,
    PolicyProvider, PolicyValue, Scope, export_provider,
};
use std::path::PathBuf;

fn device_dir() -> PathBuf {
    std::env::var_os("POLICYD_DEVICE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("policyd-device"))
}

/// Hook that records `value` as the device state for `policy`
fn record(policy: &'static str) -> impl Fn(Scope, &PolicyValue) -> Result<(), EnforcementError> {
    move |scope: Scope, value: &PolicyValue| -> Result<(), EnforcementError> {
        let dir = device_dir();
        std::fs::create_dir_all(&dir)?;
        let file = match scope {
            Scope::Global => dir.join(policy),
            Scope::Domain(uid) => dir.join(format!("{}.{}", policy, uid)),
        };
        std::fs::write(file, value.to_string())?;
        Ok(())
    }
}

fn build() -> PolicyProvider {
    PolicyProvider::new("device-policies")
        .with_policy(PolicyModel::global("bluetooth", 1).on_changed(record("bluetooth")))
        .with_policy(PolicyModel::global("camera", 1).on_changed(record("camera")))
        .with_policy(PolicyModel::global("wifi", 1).on_changed(record("wifi")))
        .with_policy(
            PolicyModel::global("password-minimum-length", 0)
                .with_comparator(MaximizeIntegerComparator)
                .on_changed(record("password-minimum-length")),
        )
        .with_policy(
            PolicyModel::global("password-maximum-failed-attempts", 0)
                .with_comparator(MinimizeIntegerComparator)
                .on_changed(record("password-maximum-failed-attempts")),
        )
        .with_policy(
            PolicyModel::domain("browser-autofill", true).on_changed(record("browser-autofill")),
        )
}

export_provider!(build);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_exposes_all_policies() {
        let provider = build();
        assert_eq!(provider.name(), "device-policies");
        assert_eq!(provider.len(), 6);
        assert!(provider.policy("browser-autofill").is_some());
    }
}
