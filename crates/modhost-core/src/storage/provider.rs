use std::fmt::Debug;
use std::path::Path;

use crate::storage::error::StorageResult;

/// Where host-owned documents (manifests, configuration) are read from and
/// written to. Relative paths are resolved by the provider.
pub trait StorageProvider: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// Create a directory and all its parent directories
    fn create_dir_all(&self, path: &Path) -> StorageResult<()>;

    fn read_to_string(&self, path: &Path) -> StorageResult<String>;

    /// Replace the document at `path` in one step; readers see either the
    /// old or the new contents, never a partial write
    fn write_string(&self, path: &Path, contents: &str) -> StorageResult<()>;
}
