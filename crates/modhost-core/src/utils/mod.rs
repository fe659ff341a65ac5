//! Filesystem helpers shared by the capability layer, the loader and the
//! lifecycle orchestrator.
pub mod fs;

pub use fs::{
    copy_dir_recursive, find_files, find_files_named, free_file_slot, link_or_copy_file,
    relative_file_list, remove_link_or_file, symlink_dir, LinkKind,
};

/// Create a directory and all its parents
pub fn create_dir_all<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
