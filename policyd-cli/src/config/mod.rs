mod loader;
mod types;

pub use loader::{CONFIG_ENV, ConfigLoader};
pub use types::Overrides;
