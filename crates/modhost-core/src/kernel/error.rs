//! # Modhost Core Kernel Errors
//!
//! Defines the top-level error type of the `modhost-core` crate.
//!
//! Every subsystem carries its own typed error ([`ExtensionError`],
//! [`ManifestError`], [`LifecycleError`], [`StorageSystemError`],
//! [`NetworkError`], [`ArchiveError`]). The kernel [`Error`] wraps all of
//! them so callers that drive several subsystems (the bootstrap, the CLI)
//! can use a single `Result` alias and the `?` operator throughout.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::extension_system::error::ExtensionError;
use crate::lifecycle::archive::ArchiveError;
use crate::lifecycle::error::LifecycleError;
use crate::manifest::error::ManifestError;
use crate::net::NetworkError;
use crate::storage::error::StorageSystemError;

/// Custom error type for the modhost application
#[derive(Debug, ThisError)]
pub enum Error {
    /// Extension loading, sandboxing or hook invocation failed
    #[error("Extension system error: {0}")]
    ExtensionSystem(#[from] ExtensionError),

    /// Manifest document could not be located or written
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// A mod lifecycle transition failed
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Specific, typed storage system error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Outbound HTTP failure
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Unsupported or corrupt archive
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

// Helper to create an I/O error with context, wraps StorageSystemError::Io
impl Error {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }
}
