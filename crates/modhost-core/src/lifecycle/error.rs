//! # Modhost Core Lifecycle Errors
//!
//! [`LifecycleError`] covers failed install, enable, disable and delete
//! transitions. Hook failures arrive as [`ExtensionError`], manifest write
//! failures as [`ManifestError`] and extraction failures as [`ArchiveError`].
use std::path::PathBuf;

use crate::extension_system::error::ExtensionError;
use crate::lifecycle::archive::ArchiveError;
use crate::manifest::error::ManifestError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("No install location configured for game '{0}'")]
    GameNotConfigured(String),

    #[error("Mod '{mod_id}' is not installed for game '{game_id}'")]
    ModNotFound { game_id: String, mod_id: String },

    #[error("Cannot derive a mod id from '{}'", .0.display())]
    InvalidArchiveName(PathBuf),

    #[error("Staging path for mod '{mod_id}' of game '{game_id}' would leave the staging root")]
    UnsafeStagingPath { game_id: String, mod_id: String },

    #[error("I/O error during '{operation}' on '{}': {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Shorthand for lifecycle results
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

impl LifecycleError {
    pub fn io(
        source: std::io::Error,
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        LifecycleError::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }
}
