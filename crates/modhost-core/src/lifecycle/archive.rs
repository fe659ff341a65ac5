//! Extraction of mod archives into staging directories.
use std::fmt::Debug;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::utils::fs::copy_dir_recursive;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Unsupported archive format: '{}'", .0.display())]
    Unsupported(PathBuf),

    #[error("Corrupt archive '{}': {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("Archive '{}' has an entry escaping the destination: {entry}", path.display())]
    UnsafeEntry { path: PathBuf, entry: String },

    #[error("I/O error during '{operation}' on '{}': {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Shorthand for archive results
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

fn io_err(operation: &str, path: &Path) -> impl FnOnce(io::Error) -> ArchiveError {
    let operation = operation.to_string();
    let path = path.to_path_buf();
    move |source| ArchiveError::Io { operation, path, source }
}

/// Lists and unpacks mod archives
pub trait ArchiveExtractor: Send + Sync + Debug {
    /// Unpack `archive` into the existing, empty directory `dest`
    fn extract(&self, archive: &Path, dest: &Path) -> ArchiveResult<()>;
}

/// Handles `.zip` archives and plain directories (copied as-is)
#[derive(Debug, Clone, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_zip(&self, archive_path: &Path, dest: &Path) -> ArchiveResult<()> {
        let file = File::open(archive_path).map_err(io_err("open_archive", archive_path))?;
        let mut archive = ZipArchive::new(file).map_err(|e| ArchiveError::Corrupt {
            path: archive_path.to_path_buf(),
            message: e.to_string(),
        })?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| ArchiveError::Corrupt {
                path: archive_path.to_path_buf(),
                message: e.to_string(),
            })?;
            let raw = entry.name().replace('\\', "/");
            let relative =
                sanitize_entry_path(Path::new(&raw)).ok_or_else(|| ArchiveError::UnsafeEntry {
                    path: archive_path.to_path_buf(),
                    entry: raw.clone(),
                })?;
            let out = dest.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&out).map_err(io_err("create_dir", &out))?;
                continue;
            }
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(io_err("create_dir", parent))?;
            }
            let mut out_file = File::create(&out).map_err(io_err("create_file", &out))?;
            io::copy(&mut entry, &mut out_file).map_err(io_err("extract_entry", &out))?;
        }
        Ok(())
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> ArchiveResult<()> {
        if archive.is_dir() {
            copy_dir_recursive(archive, dest).map_err(io_err("copy_dir", archive))?;
            return Ok(());
        }
        let is_zip = archive
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if !is_zip {
            return Err(ArchiveError::Unsupported(archive.to_path_buf()));
        }
        self.extract_zip(archive, dest)
    }
}

/// Relative form of an archive entry path, or `None` if it would land
/// outside the destination
fn sanitize_entry_path(path: &Path) -> Option<PathBuf> {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => return None,
            Component::CurDir => {}
            Component::Normal(part) => cleaned.push(part),
        }
    }
    if cleaned.as_os_str().is_empty() { None } else { Some(cleaned) }
}
