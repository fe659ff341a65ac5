//! # Modhost Core Extension System Errors
//!
//! Defines [`ExtensionError`], the error enum for everything that can go wrong
//! while discovering, loading or invoking extensions: sandbox failures, script
//! errors raised by hook bodies, jail rejections of capability calls, and the
//! network or I/O failures of the capabilities themselves.
use std::path::PathBuf;

use crate::extension_system::hooks::Hook;
use crate::net::NetworkError;

#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("Extension not found: '{0}'")]
    NotFound(String),

    #[error("Extension '{extension_id}' does not implement hook '{hook}'")]
    HookNotImplemented { extension_id: String, hook: Hook },

    #[error("Access denied: '{operation}' on '{}' is outside the active game root", path.display())]
    AccessDenied { operation: String, path: PathBuf },

    #[error("'{operation}' on '{}' refused: detection runs read-only", path.display())]
    DetectionReadOnly { operation: String, path: PathBuf },

    #[error("Hook '{hook}' of extension '{extension_id}' failed: {message}")]
    Script {
        extension_id: String,
        hook: Hook,
        message: String,
    },

    #[error("Failed to load extension from '{}': {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Invalid extension at '{}': {reason}", path.display())]
    InvalidExtension { path: PathBuf, reason: String },

    #[error("Extension id '{id}' from '{}' is already registered", path.display())]
    DuplicateId { id: String, path: PathBuf },

    #[error("Capability '{operation}' failed: {source}")]
    Network {
        operation: String,
        #[source]
        source: NetworkError,
    },

    #[error("I/O error during '{operation}' on '{}': {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to record '{}' in the manifest: {message}", path.display())]
    Trail { path: PathBuf, message: String },

    #[error("No install location configured for game '{0}'")]
    GameNotConfigured(String),

    #[error("Capability object used after its hook returned")]
    Expired,

    #[error("Capability '{0}' is not available in this host")]
    Unavailable(String),

    #[error("Extension task failed: {0}")]
    TaskFailed(String),
}

/// Shorthand for extension system results
pub type ExtensionResult<T> = std::result::Result<T, ExtensionError>;

impl ExtensionError {
    pub fn io(
        source: std::io::Error,
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        ExtensionError::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// True for rejections raised by the path jail or the detection guard
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            ExtensionError::AccessDenied { .. } | ExtensionError::DetectionReadOnly { .. }
        )
    }
}
