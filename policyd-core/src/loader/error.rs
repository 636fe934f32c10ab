//! Provider loading error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading provider modules
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Failed to open the dynamic library
    #[error("Failed to load provider module: {0}")]
    Library(#[from] libloading::Error),

    /// The module does not export a required symbol
    #[error("Provider module {path} does not export {symbol}")]
    MissingSymbol { path: PathBuf, symbol: String },

    /// API version mismatch between policyd and the provider
    #[error("API version mismatch: policyd expects {expected}, provider has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// The factory returned a null provider
    #[error("Provider factory in {path} returned null")]
    NullFactory { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
