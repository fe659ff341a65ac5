use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lifecycle::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::manager::ModManager;
use crate::manifest::model::Mod;
use crate::utils::fs::copy_dir_recursive;

pub const MODPACK_FILE: &str = "modpack.json";
pub const MODPACK_MODS_DIR: &str = "mods";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModpackMeta {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModpackEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl From<&Mod> for ModpackEntry {
    fn from(entry: &Mod) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            external_id: entry.external_id.clone(),
            version: entry.version.clone(),
        }
    }
}

/// Contents of `modpack.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modpack {
    pub meta: ModpackMeta,
    pub mods: Vec<ModpackEntry>,
}

impl ModManager {
    /// Lay out a modpack for `game_id` in `dest`: `modpack.json`, each listed
    /// mod's staging contents under `mods/<id>/` and an optional icon.
    ///
    /// `mod_ids` empty means every installed mod.
    pub async fn export_modpack(
        &self,
        game_id: &str,
        dest: &Path,
        mut meta: ModpackMeta,
        mod_ids: &[String],
        icon: Option<&Path>,
    ) -> LifecycleResult<Modpack> {
        let manifest = self.store().read(game_id);
        let selected: Vec<Mod> = if mod_ids.is_empty() {
            manifest.mods.clone()
        } else {
            mod_ids
                .iter()
                .map(|id| {
                    manifest.find(id).cloned().ok_or_else(|| LifecycleError::ModNotFound {
                        game_id: game_id.to_string(),
                        mod_id: id.clone(),
                    })
                })
                .collect::<LifecycleResult<_>>()?
        };
        meta.game_id = game_id.to_string();

        let sources: Vec<(String, PathBuf)> = selected
            .iter()
            .map(|m| -> LifecycleResult<(String, PathBuf)> {
                Ok((m.id.clone(), self.staging().path_for(game_id, &m.id)?))
            })
            .collect::<LifecycleResult<_>>()?;
        let modpack = Modpack {
            meta,
            mods: selected.iter().map(ModpackEntry::from).collect(),
        };

        let dest = dest.to_path_buf();
        let icon = icon.map(Path::to_path_buf);
        let document = modpack.clone();
        tokio::task::spawn_blocking(move || {
            write_modpack(&dest, &document, &sources, icon.as_deref())
        })
        .await
        .map_err(|e| LifecycleError::TaskFailed(e.to_string()))??;

        log::info!("Exported {} mod(s) of '{}' as a modpack", modpack.mods.len(), game_id);
        Ok(modpack)
    }
}

fn write_modpack(
    dest: &Path,
    modpack: &Modpack,
    sources: &[(String, PathBuf)],
    icon: Option<&Path>,
) -> LifecycleResult<()> {
    let mods_dir = dest.join(MODPACK_MODS_DIR);
    fs::create_dir_all(&mods_dir)
        .map_err(|e| LifecycleError::io(e, "create_modpack_dir", &mods_dir))?;

    for (id, staging) in sources {
        let target = mods_dir.join(id);
        if !staging.is_dir() {
            log::warn!("No staged files for '{}', exporting an empty directory", id);
            fs::create_dir_all(&target)
                .map_err(|e| LifecycleError::io(e, "create_modpack_dir", &target))?;
            continue;
        }
        copy_dir_recursive(staging, &target)
            .map_err(|e| LifecycleError::io(e, "copy_staging", staging))?;
    }

    if let Some(icon) = icon {
        let extension = icon
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "png".into());
        let target = dest.join(format!("icon.{}", extension));
        fs::copy(icon, &target).map_err(|e| LifecycleError::io(e, "copy_icon", icon))?;
    }

    let document_path = dest.join(MODPACK_FILE);
    let text = serde_json::to_string_pretty(modpack).map_err(|e| LifecycleError::Io {
        operation: "serialize_modpack".into(),
        path: document_path.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    fs::write(&document_path, text)
        .map_err(|e| LifecycleError::io(e, "write_modpack", &document_path))
}
