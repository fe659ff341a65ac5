use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;

use crate::extension_system::jail::{is_safe, is_safe_entry, GameRoot};

fn game_root() -> (tempfile::TempDir, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let root = temp_dir.path().join("game");
    fs::create_dir_all(&root).unwrap();
    (temp_dir, root)
}

#[test]
fn test_paths_below_root_are_safe() {
    let (_temp_dir, root) = game_root();
    let active = GameRoot::Path(root.clone());

    fs::create_dir_all(root.join("BepInEx")).unwrap();
    assert!(is_safe(&active, &root.join("BepInEx")));
    // Targets that do not exist yet are judged by their existing ancestor
    assert!(is_safe(&active, &root.join("BepInEx/plugins/mod.dll")));
    assert!(is_safe(&active, &root.join("new/dir/file.txt")));
}

#[test]
fn test_root_itself_is_not_safe() {
    let (_temp_dir, root) = game_root();
    let active = GameRoot::Path(root.clone());

    assert!(!is_safe(&active, &root));
    assert!(!is_safe_entry(&active, &root));
}

#[test]
fn test_paths_outside_root_are_rejected() {
    let (temp_dir, root) = game_root();
    let active = GameRoot::Path(root.clone());

    assert!(!is_safe(&active, &temp_dir.path().join("elsewhere.txt")));
    assert!(!is_safe(&active, &root.join("../escape.txt")));
    assert!(!is_safe(&active, &root.join("missing/../../escape.txt")));
    assert!(!is_safe(&active, &PathBuf::from("/")));
}

#[test]
fn test_sibling_with_common_prefix_is_rejected() {
    let (temp_dir, root) = game_root();
    let sibling = temp_dir.path().join("game-backup");
    fs::create_dir_all(&sibling).unwrap();

    assert!(!is_safe(&GameRoot::Path(root), &sibling.join("file.txt")));
}

#[test]
fn test_unset_root_rejects_everything() {
    let (_temp_dir, root) = game_root();
    assert!(!is_safe(&GameRoot::Unset, &root.join("file.txt")));
}

#[test]
fn test_detection_root_accepts_everything() {
    assert!(is_safe(&GameRoot::DetectionOnly, &PathBuf::from("/anywhere/at/all")));
}

#[cfg(unix)]
#[test]
fn test_symlink_inside_root_cannot_escape() {
    let (temp_dir, root) = game_root();
    let outside = temp_dir.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();
    let active = GameRoot::Path(root.clone());

    assert!(!is_safe(&active, &root.join("link/file.txt")));
    assert!(!is_safe(&active, &root.join("link")));
    // The link entry itself lives inside the root and may be removed
    assert!(is_safe_entry(&active, &root.join("link")));
}

#[cfg(unix)]
#[test]
fn test_root_given_through_symlink_is_resolved() {
    let (temp_dir, root) = game_root();
    let alias = temp_dir.path().join("alias");
    std::os::unix::fs::symlink(&root, &alias).unwrap();

    assert!(is_safe(&GameRoot::Path(alias), &root.join("file.txt")));
}
