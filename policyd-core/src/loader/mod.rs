//! Provider module discovery and loading

mod error;
mod module;
mod registry;
mod scan;

pub use error::LoaderError;
pub use module::{LibraryOpener, ModuleOpener, OpenedModule};
pub use registry::{LoadedProvider, ProviderRegistry};
pub use scan::{LoadReport, PolicyLoader};
