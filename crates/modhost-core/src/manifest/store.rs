use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::extension_system::capability::FileTrail;
use crate::extension_system::error::{ExtensionError, ExtensionResult};
use crate::extension_system::host::GameDirectory;
use crate::kernel::constants;
use crate::manifest::error::{ManifestError, ManifestResult};
use crate::manifest::model::GameManifest;
use crate::storage::{LocalStorageProvider, StorageProvider};

/// Reads and writes each game's manifest beside the game itself
#[derive(Debug)]
pub struct ManifestStore {
    games: Arc<GameDirectory>,
    storage: LocalStorageProvider,
    // Serializes read-modify-write of trail appends against full writes
    write_lock: Mutex<()>,
}

impl ManifestStore {
    pub fn new(games: Arc<GameDirectory>) -> Self {
        Self {
            games,
            storage: LocalStorageProvider::new(PathBuf::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// `<game root>/.modhost/manifest.json`
    pub fn manifest_path(game_root: &Path) -> PathBuf {
        game_root.join(constants::MANIFEST_DIR).join(constants::MANIFEST_FILE)
    }

    pub fn path_for(&self, game_id: &str) -> ManifestResult<PathBuf> {
        self.games
            .get(game_id)
            .map(|root| Self::manifest_path(&root))
            .ok_or_else(|| ManifestError::UnknownGame(game_id.to_string()))
    }

    /// Read the manifest of `game_id`.
    ///
    /// A missing, unreadable or unparsable document reads as empty.
    pub fn read(&self, game_id: &str) -> GameManifest {
        match self.path_for(game_id) {
            Ok(path) => self.read_at(&path),
            Err(e) => {
                log::warn!("{}", e);
                GameManifest::default()
            }
        }
    }

    fn read_at(&self, path: &Path) -> GameManifest {
        let contents = match self.storage.read_to_string(path) {
            Ok(contents) => contents,
            Err(crate::storage::StorageSystemError::FileNotFound(_)) => {
                return GameManifest::default();
            }
            Err(e) => {
                log::warn!("Failed to read manifest {}: {}", path.display(), e);
                return GameManifest::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::warn!("Manifest {} is corrupt, treating as empty: {}", path.display(), e);
                GameManifest::default()
            }
        }
    }

    /// Overwrite the manifest of `game_id` with `manifest`
    pub fn write(&self, game_id: &str, manifest: &GameManifest) -> ManifestResult<()> {
        let path = self.path_for(game_id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_at(&path, manifest)
    }

    fn write_at(&self, path: &Path, manifest: &GameManifest) -> ManifestResult<()> {
        let contents = serde_json::to_string_pretty(manifest)
            .map_err(|source| ManifestError::Serialize { path: path.to_path_buf(), source })?;
        self.storage.write_string(path, &contents)?;
        Ok(())
    }

    /// Append `file` to the `files` of `mod_id` and persist immediately.
    ///
    /// A path already in the list is not added twice.
    pub fn record_file(&self, game_id: &str, mod_id: &str, file: &Path) -> ManifestResult<()> {
        let path = self.path_for(game_id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut manifest = self.read_at(&path);
        let entry = manifest.find_mut(mod_id).ok_or_else(|| ManifestError::ModNotFound {
            game_id: game_id.to_string(),
            mod_id: mod_id.to_string(),
        })?;
        if entry.files.iter().any(|f| f == file) {
            return Ok(());
        }
        entry.files.push(file.to_path_buf());
        self.write_at(&path, &manifest)
    }
}

impl FileTrail for ManifestStore {
    fn record(&self, game_id: &str, mod_id: &str, path: &Path) -> ExtensionResult<()> {
        self.record_file(game_id, mod_id, path).map_err(|e| ExtensionError::Trail {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
