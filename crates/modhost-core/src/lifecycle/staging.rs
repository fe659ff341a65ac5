use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::lifecycle::error::{LifecycleError, LifecycleResult};

/// Owner of `<staging>/<game id>/<mod id>` directories.
///
/// Extensions never write here; they only read from it during install.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<game id>/<mod id>`. Both ids must be a single plain path
    /// component, so the result always lies two levels below the root.
    pub fn path_for(&self, game_id: &str, mod_id: &str) -> LifecycleResult<PathBuf> {
        if !is_single_component(game_id) || !is_single_component(mod_id) {
            return Err(LifecycleError::UnsafeStagingPath {
                game_id: game_id.to_string(),
                mod_id: mod_id.to_string(),
            });
        }
        Ok(self.root.join(game_id).join(mod_id))
    }

    /// Fresh empty directory for `mod_id`, replacing any previous contents
    pub async fn prepare(&self, game_id: &str, mod_id: &str) -> LifecycleResult<PathBuf> {
        self.remove(game_id, mod_id).await?;
        let path = self.path_for(game_id, mod_id)?;
        fs::create_dir_all(&path)
            .await
            .map_err(|e| LifecycleError::io(e, "create_staging", &path))?;
        Ok(path)
    }

    pub async fn remove(&self, game_id: &str, mod_id: &str) -> LifecycleResult<()> {
        let path = self.path_for(game_id, mod_id)?;
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LifecycleError::io(e, "remove_staging", &path)),
        }
    }

    pub async fn exists(&self, game_id: &str, mod_id: &str) -> bool {
        match self.path_for(game_id, mod_id) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

fn is_single_component(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == id
    )
}
