//! # Modhost Core Manifest Errors
//!
//! Failures of the per-game manifest document. Reads never fail on a corrupt
//! or missing document (they degrade to an empty manifest), so these come
//! from writes and from lookups of unknown games or mods.
use std::path::PathBuf;

use crate::storage::error::StorageSystemError;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("No install location known for game '{0}'")]
    UnknownGame(String),

    #[error("Mod '{mod_id}' is not in the manifest of game '{game_id}'")]
    ModNotFound { game_id: String, mod_id: String },

    #[error("Failed to serialize manifest for '{}': {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write manifest: {0}")]
    Storage(#[from] StorageSystemError),
}

/// Shorthand for manifest results
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;
