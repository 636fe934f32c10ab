//! policyd-api - Provider API for the policyd policy engine
//!
//! This crate provides the types needed to write policy providers. A provider
//! is a native Rust dynamic library that builds a [`PolicyProvider`]: a named
//! bundle of [`PolicyModel`]s, each with an initial value, a restrictiveness
//! [`Comparator`] and an enforcement hook that drives the value into the
//! device.
//!
//! # Example
//!
//! ```ignore
//! use policyd_api::{
//!     EnforcementError, MaximizeIntegerComparator, PolicyModel, PolicyProvider, PolicyValue,
//!     Scope, export_provider,
//! };
//!
//! fn build() -> PolicyProvider {
//!     PolicyProvider::new("password")
//!         .with_policy(
//!             PolicyModel::global("password-minimum-length", 0)
//!                 .with_comparator(MaximizeIntegerComparator)
//!                 .on_changed(|_scope: Scope, value: &PolicyValue| -> Result<(), EnforcementError> {
//!                     // push the value into the password service
//!                     Ok(())
//!                 }),
//!         )
//! }
//!
//! export_provider!(build);
//! ```

pub mod compare;
pub mod error;
pub mod model;
pub mod provider;
pub mod value;

pub use compare::{
    Comparator, FnComparator, MaximizeIntegerComparator, MinimizeIntegerComparator,
    StateComparator, strictest_of,
};
pub use error::{EnforcementError, PolicyError};
pub use model::{EnforcementHook, PolicyKind, PolicyModel, Scope};
pub use provider::PolicyProvider;
pub use value::{PolicyValue, ValueKind};

/// Current provider API version. Providers must match this exactly.
pub const API_VERSION: u32 = 1;

/// Symbol of the zero-argument factory every provider module exports
pub const CREATE_SYMBOL: &[u8] = b"_policyd_provider_create";

/// Symbol returning the API version a provider module was built against
pub const API_VERSION_SYMBOL: &[u8] = b"_policyd_provider_api_version";

/// Signature of the factory behind [`CREATE_SYMBOL`]
pub type ProviderFactory = extern "C" fn() -> *mut PolicyProvider;

/// Export a provider builder for dynamic loading.
///
/// The argument is a function `fn() -> PolicyProvider`. The engine calls it at
/// most once per provider name and keeps the module loaded for as long as the
/// provider's models are alive.
///
/// # Generated Functions
///
/// - `_policyd_provider_create()`: Builds the provider and hands ownership to the caller
/// - `_policyd_provider_api_version()`: Returns the API version
#[macro_export]
macro_rules! export_provider {
    ($build:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _policyd_provider_create() -> *mut $crate::PolicyProvider {
            let provider: $crate::PolicyProvider = $build();
            Box::into_raw(Box::new(provider))
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _policyd_provider_api_version() -> u32 {
            $crate::API_VERSION
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_is_set() {
        assert_eq!(API_VERSION, 1);
    }

    #[test]
    fn test_symbol_names() {
        assert_eq!(CREATE_SYMBOL, b"_policyd_provider_create");
        assert_eq!(API_VERSION_SYMBOL, b"_policyd_provider_api_version");
    }

    #[test]
    fn test_comparator_is_object_safe() {
        // This compiles only if Comparator is object-safe
        fn _takes_boxed(_: Box<dyn Comparator>) {}
    }

    mod exported {
        use crate::{PolicyModel, PolicyProvider};

        fn build() -> PolicyProvider {
            PolicyProvider::new("exported").with_policy(PolicyModel::global("camera", 1))
        }

        crate::export_provider!(build);

        #[test]
        fn test_export_macro_round_trip() {
            let raw = _policyd_provider_create();
            assert!(!raw.is_null());
            let provider = unsafe { Box::from_raw(raw) };
            assert_eq!(provider.name(), "exported");
            assert_eq!(_policyd_provider_api_version(), crate::API_VERSION);
        }
    }
}
