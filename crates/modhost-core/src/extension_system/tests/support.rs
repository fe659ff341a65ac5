use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::extension_system::capability::{Capabilities, FileTrail, InvocationContext};
use crate::extension_system::error::ExtensionResult;
use crate::extension_system::jail::GameRoot;

/// Trail that keeps every recorded path in memory
#[derive(Debug, Default)]
pub struct RecordingTrail {
    pub entries: Mutex<Vec<(String, String, PathBuf)>>,
}

impl RecordingTrail {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.lock().unwrap().iter().map(|(_, _, p)| p.clone()).collect()
    }
}

impl FileTrail for RecordingTrail {
    fn record(&self, game_id: &str, mod_id: &str, path: &Path) -> ExtensionResult<()> {
        self.entries
            .lock()
            .unwrap()
            .push((game_id.to_string(), mod_id.to_string(), path.to_path_buf()));
        Ok(())
    }
}

/// A game root and a staging directory side by side in one temp dir
pub struct Sandbox {
    pub dir: TempDir,
    pub root: PathBuf,
    pub staging: PathBuf,
    pub outside: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = dir.path().join("game");
        let staging = dir.path().join("staging");
        let outside = dir.path().join("outside");
        for path in [&root, &staging, &outside] {
            fs::create_dir_all(path).unwrap();
        }
        Self { dir, root, staging, outside }
    }

    pub fn caps(&self, trail: &Arc<RecordingTrail>) -> Capabilities {
        let root = GameRoot::Path(self.root.clone());
        let context = InvocationContext::new("demo", root, self.dir.path()).with_mod("cool-mod");
        Capabilities::new(context).with_trail(trail.clone())
    }

    pub fn write_staged(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.staging.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }
}
