use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::storage::error::{StorageResult, StorageSystemError};
use crate::storage::provider::StorageProvider;

/// Local filesystem storage provider.
///
/// Relative paths are resolved against `base_path`; absolute paths are used
/// as they are, which is how per-game manifests beside each game root go
/// through the same provider.
#[derive(Clone)]
pub struct LocalStorageProvider {
    base_path: PathBuf,
}

impl LocalStorageProvider {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// The directory relative paths are resolved against
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        self.base_path.join(path)
    }

    /// Write to a temporary file beside `target`, then rename it over `target`
    fn persist_atomically(target: &Path, contents: &[u8]) -> StorageResult<()> {
        let parent = match target.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => return Err(StorageSystemError::NoParentDirectory(target.to_path_buf())),
        };
        if !parent.is_dir() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageSystemError::io(e, "create_dir_all", parent.to_path_buf()))?;
        }

        let mut temp_file = NamedTempFile::new_in(parent)
            .map_err(|e| StorageSystemError::io(e, "create_temp_file", parent.to_path_buf()))?;
        let temp_path = temp_file.path().to_path_buf();
        temp_file
            .write_all(contents)
            .map_err(|e| StorageSystemError::io(e, "write_to_temp_file", temp_path))?;
        temp_file.persist(target).map_err(|e| {
            StorageSystemError::io(e.error, "persist_temp_file", target.to_path_buf())
        })?;
        Ok(())
    }
}

impl StorageProvider for LocalStorageProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve_path(path).exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.resolve_path(path).is_file()
    }

    fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        let full_path = self.resolve_path(path);
        fs::create_dir_all(&full_path)
            .map_err(|e| StorageSystemError::io(e, "create_dir_all", full_path))
    }

    fn read_to_string(&self, path: &Path) -> StorageResult<String> {
        let full_path = self.resolve_path(path);
        fs::read_to_string(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageSystemError::FileNotFound(full_path)
            } else {
                StorageSystemError::io(e, "read_to_string", full_path)
            }
        })
    }

    fn write_string(&self, path: &Path, contents: &str) -> StorageResult<()> {
        Self::persist_atomically(&self.resolve_path(path), contents.as_bytes())
    }
}

impl fmt::Debug for LocalStorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorageProvider")
            .field("base_path", &self.base_path)
            .finish()
    }
}
