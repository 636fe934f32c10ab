//! policyd-core: the policy aggregation and enforcement engine
//!
//! Several administrators may each submit a value for the same device policy.
//! The engine persists every submission, computes the most restrictive one
//! according to the policy's comparator, and drives that effective value into
//! the device through the provider's enforcement hook.
//!
//! - **Storage** - [`PolicyStorage`] keeps administrators, policy definitions
//!   and managed values in SQLite and aggregates them
//! - **Loading** - [`PolicyLoader`] opens provider modules into a
//!   [`ProviderRegistry`]
//! - **Manager** - [`PolicyManager`] keeps storage, model caches and device
//!   state consistent
//! - **Notifications** - [`ChangeBus`] announces effective value changes
//! - **Service** - [`PolicyService`] maps wire requests onto the manager
//!
//! # Quick Start
//!
//! ```no_run
//! use policyd_api::PolicyValue;
//! use policyd_core::{EngineConfig, MemoryChangeBus, PolicyManager};
//! use std::sync::Arc;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = PolicyManager::start(&EngineConfig::default(), Arc::new(MemoryChangeBus::default()))?;
//!     manager.enroll("mdm")?;
//!     manager.set("camera", PolicyValue::Int(0), "mdm")?;
//!     println!("camera = {}", manager.get("camera")?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod notify;
pub mod service;
pub mod storage;

pub use config::EngineConfig;
pub use error::{ErrorCode, ManagerError};
pub use loader::{LoadReport, LoaderError, PolicyLoader, ProviderRegistry};
pub use manager::{PolicyInfo, PolicyManager};
pub use notify::{ChangeBus, MemoryChangeBus, NotifyError, PolicyChange};
pub use service::{Caller, PolicyService, PrivilegeChecker, PrivilegeTable, Request, Response};
pub use storage::{ActivationFilter, Administrator, ManagedValue, PolicyStorage, StorageError};
