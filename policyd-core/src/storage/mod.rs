//! Durable policy state with SQLite storage

mod error;
mod migrations;
mod store;
mod types;

pub use error::StorageError;
pub use store::{DEFAULT_ADMIN, PolicyStorage};
pub use types::{ActivationFilter, Administrator, ManagedValue};
