//! PolicyLoader - discovers and loads provider modules from a directory

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::error::LoaderError;
use super::module::{LibraryOpener, ModuleOpener};
use super::registry::ProviderRegistry;

/// Outcome of a directory scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Providers loaded and registered
    pub passed: usize,
    /// Modules that could not be opened or produced no provider
    pub failed: usize,
    /// Modules or providers already loaded under the same name
    pub skipped: usize,
}

/// Loads provider modules into a [`ProviderRegistry`]
pub struct PolicyLoader {
    opener: Box<dyn ModuleOpener>,
    /// Module names already opened, so each factory runs at most once
    seen: HashSet<String>,
}

impl Default for PolicyLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyLoader {
    pub fn new() -> Self {
        Self::with_opener(LibraryOpener)
    }

    pub fn with_opener(opener: impl ModuleOpener + 'static) -> Self {
        Self {
            opener: Box::new(opener),
            seen: HashSet::new(),
        }
    }

    /// Load every regular file in `dir` as a provider module.
    ///
    /// Individual failures are logged and counted; only an unreadable
    /// directory is an error. A missing directory loads nothing.
    pub fn load_dir(
        &mut self,
        dir: &Path,
        registry: &mut ProviderRegistry,
    ) -> Result<LoadReport, LoaderError> {
        let mut report = LoadReport::default();

        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "Provider directory does not exist");
            return Ok(report);
        }

        for path in Self::discover(dir)? {
            let module = module_name(&path);
            if !self.seen.insert(module.clone()) {
                tracing::debug!(module = %module, "Provider module already loaded, skipping");
                report.skipped += 1;
                continue;
            }

            match self.opener.open(&path) {
                Ok(opened) => {
                    let name = opened.provider.name().to_string();
                    let policies = opened.provider.len();
                    if registry.insert(opened.provider, Some(path.clone()), opened.library) {
                        tracing::info!(
                            provider = %name,
                            module = %path.display(),
                            policies,
                            "Provider loaded"
                        );
                        report.passed += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(module = %path.display(), error = %e, "Failed to load provider");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Regular files in `dir`, sorted by name for a stable load order
    fn discover(dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }
}

fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
