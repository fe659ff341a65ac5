//! The per-invocation context and the capability object built around it.
//!
//! Every hook call gets a fresh [`InvocationContext`] and a fresh
//! [`Capabilities`] value that captures it. Nothing here reads ambient
//! state: the active game root, mod and extension all come from the context
//! the object was built with, so concurrent invocations cannot see each
//! other's roots.
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::extension_system::error::{ExtensionError, ExtensionResult};
use crate::extension_system::jail::{self, GameRoot};
use crate::net::HttpClient;
use crate::utils::fs::{self as fsutil, LinkKind};

/// Immutable description of one in-flight hook call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub extension_id: String,
    /// The game whose manifest receives the file trail
    pub game_id: String,
    pub root: GameRoot,
    /// Mod whose `files` list records mutations, if any
    pub mod_id: Option<String>,
    pub extension_path: PathBuf,
}

impl InvocationContext {
    pub fn new(extension_id: &str, root: GameRoot, extension_path: &Path) -> Self {
        Self {
            extension_id: extension_id.to_string(),
            game_id: extension_id.to_string(), // One game per extension
            root,
            mod_id: None,
            extension_path: extension_path.to_path_buf(),
        }
    }

    pub fn with_mod(mut self, mod_id: &str) -> Self {
        self.mod_id = Some(mod_id.to_string());
        self
    }
}

/// Sink for paths created by an extension on behalf of a mod.
///
/// Each call must be durable before it returns.
pub trait FileTrail: Send + Sync + Debug {
    fn record(&self, game_id: &str, mod_id: &str, path: &Path) -> ExtensionResult<()>;
}

/// How [`Capabilities::deploy`] placed its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMethod {
    HardLink,
    Symlink,
    Copy,
    /// Files linked one by one into a directory that already existed
    Merge,
}

impl DeployMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployMethod::HardLink => "hardlink",
            DeployMethod::Symlink => "symlink",
            DeployMethod::Copy => "copy",
            DeployMethod::Merge => "merge",
        }
    }
}

/// Host operations available to a hook body
#[derive(Debug)]
pub struct Capabilities {
    context: Arc<InvocationContext>,
    trail: Option<Arc<dyn FileTrail>>,
    http: Option<(Arc<dyn HttpClient>, Handle)>,
    live: AtomicBool,
}

impl Capabilities {
    pub fn new(context: InvocationContext) -> Self {
        Self {
            context: Arc::new(context),
            trail: None,
            http: None,
            live: AtomicBool::new(true),
        }
    }

    pub fn with_trail(mut self, trail: Arc<dyn FileTrail>) -> Self {
        self.trail = Some(trail);
        self
    }

    /// Enable the network capabilities; requests run on `runtime`
    pub fn with_http(mut self, http: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        self.http = Some((http, runtime));
        self
    }

    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    /// Revoke the object; every later call fails with `Expired`
    pub fn expire(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> ExtensionResult<()> {
        if self.is_live() { Ok(()) } else { Err(ExtensionError::Expired) }
    }

    // --- Queries (unrestricted) ---

    pub fn exists(&self, path: &Path) -> ExtensionResult<bool> {
        self.ensure_live()?;
        Ok(fs::symlink_metadata(path).is_ok())
    }

    pub fn is_file(&self, path: &Path) -> ExtensionResult<bool> {
        self.ensure_live()?;
        Ok(path.is_file())
    }

    pub fn is_dir(&self, path: &Path) -> ExtensionResult<bool> {
        self.ensure_live()?;
        Ok(path.is_dir())
    }

    pub fn is_symlink(&self, path: &Path) -> ExtensionResult<bool> {
        self.ensure_live()?;
        Ok(path.is_symlink())
    }

    /// Entry names of a directory, sorted
    pub fn list(&self, path: &Path) -> ExtensionResult<Vec<String>> {
        self.ensure_live()?;
        let entries = fs::read_dir(path).map_err(|e| ExtensionError::io(e, "list", path))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ExtensionError::io(e, "list", path))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    // --- Context ---

    pub fn game_root(&self) -> Option<&Path> {
        self.context.root.path()
    }

    pub fn mod_id(&self) -> Option<&str> {
        self.context.mod_id.as_deref()
    }

    pub fn extension_path(&self) -> &Path {
        &self.context.extension_path
    }

    // --- Gated mutations ---

    /// Jail check for a destination. `follow_final` is false for operations
    /// that act on the entry itself rather than what it points to.
    fn guard(&self, operation: &str, path: &Path, follow_final: bool) -> ExtensionResult<PathBuf> {
        self.ensure_live()?;
        let root = &self.context.root;
        if root.is_detection() {
            return Err(ExtensionError::DetectionReadOnly {
                operation: operation.to_string(),
                path: path.to_path_buf(),
            });
        }
        let safe =
            if follow_final { jail::is_safe(root, path) } else { jail::is_safe_entry(root, path) };
        if !safe {
            log::warn!(
                "Extension '{}' denied {} on {}",
                self.context.extension_id,
                operation,
                path.display()
            );
            return Err(ExtensionError::AccessDenied {
                operation: operation.to_string(),
                path: path.to_path_buf(),
            });
        }
        jail::absolutize(path).ok_or_else(|| ExtensionError::AccessDenied {
            operation: operation.to_string(),
            path: path.to_path_buf(),
        })
    }

    fn record(&self, path: &Path) -> ExtensionResult<()> {
        let (Some(trail), Some(mod_id)) = (&self.trail, &self.context.mod_id) else {
            return Ok(());
        };
        trail.record(&self.context.game_id, mod_id, path)
    }

    fn ensure_parent(path: &Path, operation: &str) -> ExtensionResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtensionError::io(e, operation, parent))?;
        }
        Ok(())
    }

    /// Place `src` below `dest` file by file, checking and recording each
    /// one. Files are copied, or hard linked when `link` is set.
    fn place_tree(
        &self,
        operation: &str,
        src: &Path,
        dest: &Path,
        link: bool,
    ) -> ExtensionResult<Vec<PathBuf>> {
        let files = fsutil::find_files(src, &|_: &Path| true)
            .map_err(|e| ExtensionError::io(e, operation, src))?;
        let mut created = Vec::with_capacity(files.len());
        for file in files {
            let Ok(relative) = file.strip_prefix(src) else { continue };
            let target = dest.join(relative);
            // Links already inside the tree must not redirect the write
            if !jail::is_safe(&self.context.root, &target) {
                return Err(ExtensionError::AccessDenied {
                    operation: operation.to_string(),
                    path: target,
                });
            }
            Self::ensure_parent(&target, operation)?;
            let placed = if link {
                fsutil::free_file_slot(&target)
                    .and_then(|()| fsutil::link_or_copy_file(&file, &target).map(|_| ()))
            } else {
                fs::copy(&file, &target).map(|_| ())
            };
            placed.map_err(|e| ExtensionError::io(e, operation, &target))?;
            self.record(&target)?;
            created.push(target);
        }
        Ok(created)
    }

    /// Copy a file, or a directory recursively. Returns every file created.
    pub fn copy(&self, src: &Path, dest: &Path) -> ExtensionResult<Vec<PathBuf>> {
        let dest = self.guard("copy", dest, true)?;
        if src.is_dir() {
            return self.place_tree("copy", src, &dest, false);
        }
        Self::ensure_parent(&dest, "copy")?;
        fs::copy(src, &dest).map_err(|e| ExtensionError::io(e, "copy", &dest))?;
        self.record(&dest)?;
        Ok(vec![dest])
    }

    /// Place `src` at `dest` by linking: files are hard linked, directories
    /// symlinked, with a copy when linking fails. A file or link already at
    /// `dest` is replaced. A directory already at `dest` is never removed:
    /// a source directory is merged into it file by file, and a source file
    /// is refused.
    pub fn deploy(&self, src: &Path, dest: &Path) -> ExtensionResult<DeployMethod> {
        let dest = self.guard("deploy", dest, false)?;
        if !src.exists() {
            return Err(ExtensionError::io(
                std::io::Error::new(std::io::ErrorKind::NotFound, "deploy source does not exist"),
                "deploy",
                src,
            ));
        }
        Self::ensure_parent(&dest, "deploy")?;

        if src.is_dir() {
            if fs::symlink_metadata(&dest).is_ok_and(|meta| meta.is_dir()) {
                self.place_tree("deploy", src, &dest, true)?;
                return Ok(DeployMethod::Merge);
            }
            fsutil::free_file_slot(&dest).map_err(|e| ExtensionError::io(e, "deploy", &dest))?;
            let source = jail::absolutize(src).unwrap_or_else(|| src.to_path_buf());
            match fsutil::symlink_dir(&source, &dest) {
                Ok(()) => {
                    self.record(&dest)?;
                    Ok(DeployMethod::Symlink)
                }
                Err(e) => {
                    log::debug!("Symlink {} failed ({}), copying instead", dest.display(), e);
                    self.place_tree("deploy", src, &dest, false)?;
                    Ok(DeployMethod::Copy)
                }
            }
        } else {
            fsutil::free_file_slot(&dest).map_err(|e| ExtensionError::io(e, "deploy", &dest))?;
            let kind = fsutil::link_or_copy_file(src, &dest)
                .map_err(|e| ExtensionError::io(e, "deploy", &dest))?;
            self.record(&dest)?;
            Ok(match kind {
                LinkKind::HardLink => DeployMethod::HardLink,
                LinkKind::Copy => DeployMethod::Copy,
            })
        }
    }

    /// Delete a file or link. Directories are refused.
    pub fn delete(&self, path: &Path) -> ExtensionResult<()> {
        let path = self.guard("delete", path, false)?;
        let meta = fs::symlink_metadata(&path).map_err(|e| ExtensionError::io(e, "delete", &path))?;
        if meta.is_dir() {
            return Err(ExtensionError::io(
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
                "delete",
                &path,
            ));
        }
        fsutil::remove_link_or_file(&path).map_err(|e| ExtensionError::io(e, "delete", &path))?;
        self.record(&path)
    }

    pub fn remove_empty_dir(&self, path: &Path) -> ExtensionResult<()> {
        let path = self.guard("remove_empty_dir", path, false)?;
        fs::remove_dir(&path).map_err(|e| ExtensionError::io(e, "remove_empty_dir", &path))
    }

    // --- Network ---

    fn http(&self, operation: &str) -> ExtensionResult<&(Arc<dyn HttpClient>, Handle)> {
        self.ensure_live()?;
        self.http.as_ref().ok_or_else(|| ExtensionError::Unavailable(operation.to_string()))
    }

    /// Download `url` to `dest`; returns the byte count.
    ///
    /// Must be called from a blocking thread, never from an async task.
    pub fn download(&self, url: &str, dest: &Path) -> ExtensionResult<u64> {
        let dest = self.guard("download", dest, true)?;
        let (client, runtime) = self.http("download")?;
        let bytes = runtime
            .block_on(client.download(url, &dest))
            .map_err(|source| ExtensionError::Network { operation: "download".into(), source })?;
        self.record(&dest)?;
        Ok(bytes)
    }

    pub fn fetch_json(&self, url: &str) -> ExtensionResult<serde_json::Value> {
        let (client, runtime) = self.http("fetch_json")?;
        runtime
            .block_on(client.fetch_json(url, &[]))
            .map_err(|source| ExtensionError::Network { operation: "fetch_json".into(), source })
    }

    pub fn fetch_text(&self, url: &str) -> ExtensionResult<String> {
        let (client, runtime) = self.http("fetch_text")?;
        runtime
            .block_on(client.fetch_text(url, &[]))
            .map_err(|source| ExtensionError::Network { operation: "fetch_text".into(), source })
    }
}

// --- Pure path helpers exposed to scripts ---

pub fn join(parts: &[String]) -> String {
    let mut path = PathBuf::new();
    for part in parts {
        path.push(part);
    }
    path.to_string_lossy().into_owned()
}

pub fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn dirname(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}
