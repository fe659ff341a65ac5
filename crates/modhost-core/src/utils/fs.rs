use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// How an entry ended up at its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    HardLink,
    Copy,
}

/// Find files recursively in a directory that match a predicate.
///
/// Symlinked directories are not descended into.
pub fn find_files<P, F>(path: P, predicate: &F) -> io::Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> bool + ?Sized,
{
    let mut result = Vec::new();
    let path = path.as_ref();

    if !path.exists() {
        return Ok(result);
    }

    if path.is_file() {
        if predicate(path) {
            result.push(path.to_path_buf());
        }
        return Ok(result);
    }

    let mut entries = fs::read_dir(path)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let entry_path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            let mut sub_results = find_files(&entry_path, predicate)?;
            result.append(&mut sub_results);
        } else if entry_path.is_file() && predicate(&entry_path) {
            result.push(entry_path);
        }
    }

    Ok(result)
}

/// Find files whose name equals one of `names`, ignoring ASCII case
pub fn find_files_named<P: AsRef<Path>>(path: P, names: &[&str]) -> io::Result<Vec<PathBuf>> {
    find_files(path, &|p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|n| names.iter().any(|want| n.eq_ignore_ascii_case(want)))
    })
}

/// All files below `root`, as `/`-separated paths relative to it
pub fn relative_file_list(root: &Path) -> io::Result<Vec<String>> {
    let files = find_files(root, &|_: &Path| true)?;
    Ok(files
        .iter()
        .filter_map(|f| f.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect())
}

/// Copy `src` into `dst` recursively, returning every file created, in order.
///
/// Existing files at the destination are overwritten.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    copy_dir_inner(src, dst, &mut created)?;
    Ok(created)
}

fn copy_dir_inner(src: &Path, dst: &Path, created: &mut Vec<PathBuf>) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    let mut entries = fs::read_dir(src)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copy_dir_inner(&from, &to, created)?;
        } else {
            fs::copy(&from, &to)?;
            created.push(to);
        }
    }
    Ok(())
}

/// Make room for a file at `path`. A file or symlink already there is
/// removed (links are never followed); a real directory is left untouched
/// and reported as `AlreadyExists`.
pub fn free_file_slot(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' is an existing directory", path.display()),
        ));
    }
    remove_link_or_file(path)
}

/// Remove a file or a symlink (including a symlink to a directory)
pub fn remove_link_or_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        // Windows directory symlinks need remove_dir
        #[cfg(windows)]
        Err(_) if fs::symlink_metadata(path).is_ok_and(|m| m.is_symlink()) => fs::remove_dir(path),
        Err(e) => Err(e),
    }
}

/// Hard link a file, falling back to a copy
pub fn link_or_copy_file(src: &Path, dst: &Path) -> io::Result<LinkKind> {
    match fs::hard_link(src, dst) {
        Ok(()) => Ok(LinkKind::HardLink),
        Err(e) => {
            log::debug!("Hard link {} -> {} failed ({}), copying", src.display(), dst.display(), e);
            fs::copy(src, dst)?;
            Ok(LinkKind::Copy)
        }
    }
}

/// Symlink a directory, falling back to nothing (the caller copies)
pub fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(src, dst)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_dir(src, dst)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (src, dst);
        Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks unsupported"))
    }
}
