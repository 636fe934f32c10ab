//! Opening provider modules

use libloading::{Library, Symbol};
use policyd_api::{API_VERSION, API_VERSION_SYMBOL, CREATE_SYMBOL, PolicyProvider, ProviderFactory};
use std::path::Path;

use super::error::LoaderError;

/// A provider together with the module that owns its code
pub struct OpenedModule {
    pub provider: PolicyProvider,
    /// `None` for providers compiled into the process
    pub library: Option<Library>,
}

/// Turns a file into a provider.
///
/// The production implementation is [`LibraryOpener`]; the seam exists so the
/// scan logic can be exercised without building shared libraries.
pub trait ModuleOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<OpenedModule, LoaderError>;
}

/// Opens provider modules as native dynamic libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryOpener;

impl ModuleOpener for LibraryOpener {
    fn open(&self, path: &Path) -> Result<OpenedModule, LoaderError> {
        // SAFETY: provider modules are installed by the platform into a
        // directory only it can write, and are expected to follow the
        // policyd-api contract.
        let library = unsafe { Library::new(path)? };

        let missing = |symbol: &[u8]| LoaderError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: String::from_utf8_lossy(symbol).into_owned(),
        };

        // Symbols borrow the library; keep them scoped so it can be moved out
        let provider = {
            // SAFETY: the symbol is generated by `export_provider!` with this signature.
            let version_fn: Symbol<extern "C" fn() -> u32> = unsafe {
                library.get(API_VERSION_SYMBOL)
            }
            .map_err(|_| missing(API_VERSION_SYMBOL))?;
            // SAFETY: as above.
            let create_fn: Symbol<ProviderFactory> =
                unsafe { library.get(CREATE_SYMBOL) }.map_err(|_| missing(CREATE_SYMBOL))?;
            instantiate(path, *version_fn, *create_fn)?
        };

        Ok(OpenedModule {
            provider,
            library: Some(library),
        })
    }
}

/// Check the module's API version and take ownership of what its factory returns.
///
/// The factory is only called once the version matches.
fn instantiate(
    path: &Path,
    api_version: extern "C" fn() -> u32,
    create: ProviderFactory,
) -> Result<PolicyProvider, LoaderError> {
    let found = api_version();
    if found != API_VERSION {
        return Err(LoaderError::ApiVersionMismatch {
            expected: API_VERSION,
            found,
        });
    }

    let raw = create();
    if raw.is_null() {
        return Err(LoaderError::NullFactory {
            path: path.to_path_buf(),
        });
    }
    // SAFETY: non-null pointers from the factory come from `Box::into_raw`.
    Ok(*unsafe { Box::from_raw(raw) })
}
