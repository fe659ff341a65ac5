//! Path containment checks for mutating capabilities.
//!
//! A path is accepted only when, after resolving every existing component
//! through the filesystem, it lies strictly below the active game root.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The root mutating capabilities are confined to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRoot {
    /// No game is active; nothing is writable
    Unset,
    /// A `detect` hook is running before any root is known
    DetectionOnly,
    Path(PathBuf),
}

impl GameRoot {
    pub fn path(&self) -> Option<&Path> {
        match self {
            GameRoot::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_detection(&self) -> bool {
        matches!(self, GameRoot::DetectionOnly)
    }
}

/// Is `target` inside the active root? Symlinks are followed all the way.
pub fn is_safe(root: &GameRoot, target: &Path) -> bool {
    check(root, target, true)
}

/// Like [`is_safe`], but the final component is taken as-is so a link can
/// be removed or replaced without judging where it points.
pub fn is_safe_entry(root: &GameRoot, target: &Path) -> bool {
    check(root, target, false)
}

fn check(root: &GameRoot, target: &Path, follow_final: bool) -> bool {
    let root = match root {
        GameRoot::Unset => return false,
        GameRoot::DetectionOnly => return true,
        GameRoot::Path(root) => root,
    };
    let (Some(root), Some(candidate)) = (resolve(root, true), resolve(target, follow_final)) else {
        return false;
    };
    let (root, candidate) = (fold_case(root), fold_case(candidate));
    candidate != root && candidate.starts_with(&root)
}

/// Absolute form of `path`, relative paths taken against the working directory
pub fn absolutize(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        std::env::current_dir().ok().map(|cwd| cwd.join(path))
    }
}

fn resolve(path: &Path, follow_final: bool) -> Option<PathBuf> {
    let absolute = absolutize(path)?;
    if follow_final {
        return canonicalize_existing_prefix(&absolute);
    }
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => {
            let mut resolved = canonicalize_existing_prefix(parent)?;
            resolved.push(name);
            Some(resolved)
        }
        // Ends in `..` or is the filesystem root
        _ => canonicalize_existing_prefix(&absolute),
    }
}

/// Canonicalize the deepest ancestor that exists and re-attach the rest.
///
/// `None` when the missing remainder contains `..`, which cannot be
/// resolved without the directories it walks through.
fn canonicalize_existing_prefix(path: &Path) -> Option<PathBuf> {
    let mut current = path;
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        match current.canonicalize() {
            Ok(resolved) => {
                let mut result = resolved;
                for name in missing.iter().rev() {
                    result.push(name);
                }
                return Some(result);
            }
            Err(_) => {
                missing.push(current.file_name()?.to_os_string());
                current = current.parent()?;
            }
        }
    }
}

#[cfg(any(windows, target_os = "macos"))]
fn fold_case(path: PathBuf) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

#[cfg(not(any(windows, target_os = "macos")))]
fn fold_case(path: PathBuf) -> PathBuf {
    path
}
