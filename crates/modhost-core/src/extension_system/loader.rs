use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::extension_system::error::{ExtensionError, ExtensionResult};
use crate::extension_system::hooks::Extension;
use crate::extension_system::registry::ExtensionRegistry;
use crate::extension_system::sandbox::{entry_script, LuaExtension, ENTRY_FILE};

/// Appended to a file or directory name to keep an extension from loading
pub const DISABLED_SUFFIX: &str = ".disabled";

const SCRIPT_EXTENSION: &str = ".lua";

/// An extension found on disk, loaded or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredExtension {
    /// File or directory name without the disabled suffix
    pub name: String,
    pub location: PathBuf,
    pub enabled: bool,
}

/// Outcome of a full load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Ids registered, in load order
    pub loaded: Vec<String>,
    /// Extensions that failed to load or were rejected, with the reason
    pub skipped: Vec<(PathBuf, String)>,
    pub disabled: Vec<PathBuf>,
}

/// Finds extension packages in the configured directories
#[derive(Debug, Clone, Default)]
pub struct ExtensionLoader {
    dirs: Vec<PathBuf>,
}

impl ExtensionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Add an extension directory to search
    pub fn add_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.dirs.push(dir.as_ref().to_path_buf());
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// List every extension package, directories in configured order and
    /// entries sorted by name within each.
    pub async fn discover(&self) -> ExtensionResult<Vec<DiscoveredExtension>> {
        let mut found = Vec::new();
        for dir in &self.dirs {
            let dir_exists = fs::try_exists(dir).await.unwrap_or(false);
            if !dir_exists {
                log::debug!("Extension directory {} does not exist, skipping", dir.display());
                continue;
            }
            found.extend(self.scan_directory(dir).await?);
        }
        Ok(found)
    }

    async fn scan_directory(&self, dir: &Path) -> ExtensionResult<Vec<DiscoveredExtension>> {
        let mut read_dir = fs::read_dir(dir)
            .await
            .map_err(|e| ExtensionError::io(e, "read_dir", dir))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| ExtensionError::io(e, "read_dir_entry", dir))?
        {
            entries.push(entry.path());
        }
        entries.sort();

        let mut found = Vec::new();
        for path in entries {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let (name, enabled) = match file_name.strip_suffix(DISABLED_SUFFIX) {
                Some(stripped) => (stripped.to_string(), false),
                None => (file_name.clone(), true),
            };

            let metadata = match fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(e) => {
                    log::warn!("Failed to get metadata for {}: {}", path.display(), e);
                    continue;
                }
            };

            let is_package = if metadata.is_dir() {
                fs::try_exists(path.join(ENTRY_FILE)).await.unwrap_or(false)
            } else {
                name.ends_with(SCRIPT_EXTENSION)
            };
            if is_package {
                found.push(DiscoveredExtension { name, location: path, enabled });
            }
        }
        Ok(found)
    }

    /// Clear `registry` and load every enabled extension into it.
    ///
    /// Malformed extensions and duplicate ids are skipped and reported, never
    /// fatal. The first extension in scan order keeps a contested id.
    pub async fn load_into(&self, registry: &mut ExtensionRegistry) -> ExtensionResult<LoadReport> {
        registry.clear();
        let mut report = LoadReport::default();

        for discovered in self.discover().await? {
            if !discovered.enabled {
                report.disabled.push(discovered.location);
                continue;
            }

            let location = discovered.location.clone();
            let loaded = tokio::task::spawn_blocking(move || {
                let entry = entry_script(&location);
                LuaExtension::load(&entry, &location)
            })
            .await
            .map_err(|e| ExtensionError::TaskFailed(e.to_string()))?;

            let extension = match loaded {
                Ok(extension) => Arc::new(extension) as Arc<dyn Extension>,
                Err(e) => {
                    log::warn!("Skipping extension {}: {}", discovered.location.display(), e);
                    report.skipped.push((discovered.location, e.to_string()));
                    continue;
                }
            };

            let id = extension.id().to_string();
            match registry.register(extension) {
                Ok(()) => {
                    log::info!("Loaded extension '{}' from {}", id, discovered.location.display());
                    report.loaded.push(id);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    report.skipped.push((discovered.location, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Enable or disable the package named `name` by renaming it to or from
    /// the disabled suffix. `name` may omit the `.lua` of single-file
    /// extensions. Returns the new location.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> ExtensionResult<PathBuf> {
        let script_name = format!("{}{}", name, SCRIPT_EXTENSION);
        let target = self
            .discover()
            .await?
            .into_iter()
            .find(|d| d.name == name || d.name == script_name)
            .ok_or_else(|| ExtensionError::NotFound(name.to_string()))?;

        if target.enabled == enabled {
            return Ok(target.location);
        }

        let parent = target.location.parent().map(Path::to_path_buf).unwrap_or_default();
        let new_location = if enabled {
            parent.join(&target.name)
        } else {
            parent.join(format!("{}{}", target.name, DISABLED_SUFFIX))
        };
        if fs::try_exists(&new_location).await.unwrap_or(false) {
            return Err(ExtensionError::io(
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target name is taken"),
                "rename_extension",
                new_location,
            ));
        }
        fs::rename(&target.location, &new_location)
            .await
            .map_err(|e| ExtensionError::io(e, "rename_extension", &target.location))?;
        log::info!(
            "{} extension {}",
            if enabled { "Enabled" } else { "Disabled" },
            new_location.display()
        );
        Ok(new_location)
    }
}
