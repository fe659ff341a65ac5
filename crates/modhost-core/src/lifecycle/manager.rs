use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::extension_system::hooks::{
    Hook, MetadataPatch, RequirementsReport, ToolButton, UpdateInfo,
};
use crate::extension_system::host::ExtensionHost;
use crate::extension_system::jail::{self, GameRoot};
use crate::lifecycle::archive::ArchiveExtractor;
use crate::lifecycle::classify::{self, InstallOptions, ModIdentity};
use crate::lifecycle::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::staging::StagingArea;
use crate::manifest::locks::GameLocks;
use crate::manifest::model::{GameManifest, Mod};
use crate::manifest::store::ManifestStore;
use crate::metadata::remote::MetadataClient;
use crate::utils::fs::{relative_file_list, remove_link_or_file};

/// What a disable did with each tracked path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    pub removed: Vec<PathBuf>,
    /// Already gone, a plain directory, or outside the game root
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives mods through install, enable, disable and delete.
///
/// The game id is the id of the extension managing the game. Every operation
/// holds that game's lock from start to finish.
#[derive(Debug)]
pub struct ModManager {
    host: Arc<ExtensionHost>,
    store: Arc<ManifestStore>,
    locks: GameLocks,
    staging: StagingArea,
    extractor: Arc<dyn ArchiveExtractor>,
    metadata: Option<Arc<dyn MetadataClient>>,
}

impl ModManager {
    pub fn new(
        host: Arc<ExtensionHost>,
        store: Arc<ManifestStore>,
        staging: StagingArea,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            host,
            store,
            locks: GameLocks::new(),
            staging,
            extractor,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, client: Arc<dyn MetadataClient>) -> Self {
        self.metadata = Some(client);
        self
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn store(&self) -> &Arc<ManifestStore> {
        &self.store
    }

    fn game_root(&self, game_id: &str) -> LifecycleResult<PathBuf> {
        self.host
            .games()
            .get(game_id)
            .ok_or_else(|| LifecycleError::GameNotConfigured(game_id.to_string()))
    }

    fn find_mod(manifest: &GameManifest, game_id: &str, mod_id: &str) -> LifecycleResult<Mod> {
        manifest.find(mod_id).cloned().ok_or_else(|| LifecycleError::ModNotFound {
            game_id: game_id.to_string(),
            mod_id: mod_id.to_string(),
        })
    }

    pub fn list_mods(&self, game_id: &str) -> Vec<Mod> {
        self.store.read(game_id).mods
    }

    // --- install ---

    /// Stage `archive` for `game_id` and record it, disabled. Enables it
    /// straight away when `options.auto_enable` is set.
    pub async fn install(
        &self,
        game_id: &str,
        archive: &Path,
        options: InstallOptions,
    ) -> LifecycleResult<Mod> {
        self.game_root(game_id)?;
        let mod_id = classify::mod_id_from_archive(archive)
            .ok_or_else(|| LifecycleError::InvalidArchiveName(archive.to_path_buf()))?;
        let stem = classify::archive_stem(archive).unwrap_or_else(|| mod_id.clone());

        let _guard = self.locks.acquire(game_id).await;
        log::info!("Installing '{}' for '{}' from {}", mod_id, game_id, archive.display());

        // Reinstalling over an enabled copy: undo its files first
        if self.store.read(game_id).find(&mod_id).is_some_and(|m| m.enabled) {
            log::info!("'{}' is enabled, disabling before reinstall", mod_id);
            self.disable_locked(game_id, &mod_id).await?;
        }

        let staging_path = self.staging.prepare(game_id, &mod_id).await?;
        if let Err(e) = self.extract(archive, &staging_path).await {
            self.staging.remove(game_id, &mod_id).await?;
            return Err(e);
        }

        let identity = match self.classify(game_id, &stem, &staging_path, &options).await {
            Ok(identity) => identity,
            Err(e) => {
                self.staging.remove(game_id, &mod_id).await?;
                return Err(e);
            }
        };
        let mut entry = Mod::new(&mod_id, identity.fields.name.as_deref().unwrap_or(&mod_id));
        entry.mod_type = match identity.fields.mod_type.clone() {
            Some(mod_type) => mod_type,
            None => classify::infer_mod_type(&staging_path, &stem),
        };
        entry.version = identity.fields.version;
        entry.external_id = identity.fields.external_id;
        entry.author = identity.fields.author;
        entry.source_url = identity.fields.source_url;
        entry.domain_hint = identity.fields.domain_hint;
        entry.note = identity.fields.note;
        entry.description = identity.description;
        entry.image = identity.image;

        let mut manifest = self.store.read(game_id);
        manifest.upsert(entry.clone());
        self.store.write(game_id, &manifest)?;
        log::info!("Staged '{}' ({}) for '{}'", mod_id, entry.mod_type, game_id);

        if options.auto_enable {
            return self.enable_locked(game_id, &mod_id).await;
        }
        Ok(entry)
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> LifecycleResult<()> {
        let extractor = self.extractor.clone();
        let (archive, dest) = (archive.to_path_buf(), dest.to_path_buf());
        tokio::task::spawn_blocking(move || extractor.extract(&archive, &dest))
            .await
            .map_err(|e| LifecycleError::TaskFailed(e.to_string()))??;
        Ok(())
    }

    /// Merge identity sources, lowest priority first: file name,
    /// `analyzeArchive`, `determineModType`, caller options, remote lookup.
    async fn classify(
        &self,
        game_id: &str,
        stem: &str,
        staging_path: &Path,
        options: &InstallOptions,
    ) -> LifecycleResult<ModIdentity> {
        let mut identity = ModIdentity::from_filename(stem);

        let extension = self.host.get(game_id).await?;
        // A failing classification hook costs only its contribution
        if extension.implements(&Hook::AnalyzeArchive) {
            let files = relative_file_list(staging_path)
                .map_err(|e| LifecycleError::io(e, "list_staging", staging_path))?;
            match self.host.invoke(game_id, &Hook::AnalyzeArchive, vec![json!(files)]).await {
                Ok(Some(result)) => identity.apply(MetadataPatch::from_value(&result)),
                Ok(None) => {}
                Err(e) => log::warn!("analyzeArchive of '{}' failed: {}", game_id, e),
            }
        }
        match self
            .host
            .invoke(game_id, &Hook::DetermineModType, vec![path_value(staging_path)])
            .await
        {
            Ok(Some(result)) => identity.apply(MetadataPatch::from_value(&result)),
            Ok(None) => {}
            Err(e) => log::warn!("determineModType of '{}' failed: {}", game_id, e),
        }
        identity.apply(options.to_patch());

        let external_id = identity.fields.external_id.clone();
        if let (Some(client), Some(external_id)) = (&self.metadata, external_id) {
            if client.has_credentials() {
                let domain = identity
                    .fields
                    .domain_hint
                    .clone()
                    .unwrap_or_else(|| game_id.to_string());
                match client.lookup(&domain, &external_id).await {
                    Ok(Some(info)) => identity.apply_remote(info),
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!("Metadata lookup for {}/{} failed: {}", domain, external_id, e)
                    }
                }
            }
        }
        Ok(identity)
    }

    // --- enable ---

    /// Run the extension's `install` hook for a staged mod. A mod that is
    /// already enabled is left alone.
    pub async fn enable(&self, game_id: &str, mod_id: &str) -> LifecycleResult<Mod> {
        let _guard = self.locks.acquire(game_id).await;
        self.enable_locked(game_id, mod_id).await
    }

    async fn enable_locked(&self, game_id: &str, mod_id: &str) -> LifecycleResult<Mod> {
        let root = self.game_root(game_id)?;
        let entry = Self::find_mod(&self.store.read(game_id), game_id, mod_id)?;
        if entry.enabled {
            log::debug!("'{}' is already enabled", mod_id);
            return Ok(entry);
        }

        let staging_path = self.staging.path_for(game_id, mod_id)?;
        let extension = self.host.get(game_id).await?;
        let outcome = if extension.implements(&Hook::Install) {
            // The staging path doubles as the nominal archive path
            let args = vec![
                path_value(&staging_path),
                path_value(&root),
                path_value(&staging_path),
            ];
            self.host.invoke_for_mod(game_id, mod_id, &Hook::Install, args).await?
        } else {
            log::warn!(
                "Extension '{}' has no install hook; '{}' enabled without files",
                game_id,
                mod_id
            );
            None
        };

        // The hook's trail was written straight to disk, re-read before updating
        let mut manifest = self.store.read(game_id);
        let Some(entry) = manifest.find_mut(mod_id) else {
            return Err(LifecycleError::ModNotFound {
                game_id: game_id.to_string(),
                mod_id: mod_id.to_string(),
            });
        };
        entry.enabled = true;
        if let Some(result) = outcome {
            let patch = MetadataPatch::from_value(&result);
            let take = |slot: &mut Option<String>, value: Option<String>| {
                if value.is_some() {
                    *slot = value;
                }
            };
            take(&mut entry.note, patch.note);
            take(&mut entry.external_id, patch.external_id);
            take(&mut entry.source_url, patch.source_url);
            take(&mut entry.version, patch.version);
            take(&mut entry.author, patch.author);
            take(&mut entry.domain_hint, patch.domain_hint);
        }
        let entry = entry.clone();
        self.store.write(game_id, &manifest)?;
        log::info!("Enabled '{}' for '{}' ({} files)", mod_id, game_id, entry.files.len());
        Ok(entry)
    }

    // --- disable / delete ---

    /// Remove every file the mod's installation created
    pub async fn disable(&self, game_id: &str, mod_id: &str) -> LifecycleResult<RollbackReport> {
        let _guard = self.locks.acquire(game_id).await;
        self.disable_locked(game_id, mod_id).await
    }

    async fn disable_locked(&self, game_id: &str, mod_id: &str) -> LifecycleResult<RollbackReport> {
        let root = GameRoot::Path(self.game_root(game_id)?);
        let mut manifest = self.store.read(game_id);
        let Some(entry) = manifest.find_mut(mod_id) else {
            return Err(LifecycleError::ModNotFound {
                game_id: game_id.to_string(),
                mod_id: mod_id.to_string(),
            });
        };

        let report = rollback(&root, &entry.files);
        entry.files.clear();
        entry.enabled = false;
        self.store.write(game_id, &manifest)?;

        log::info!(
            "Disabled '{}' for '{}': {} removed, {} skipped, {} failed",
            mod_id,
            game_id,
            report.removed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Disable, then drop the staging directory and the manifest entry
    pub async fn delete_mod(&self, game_id: &str, mod_id: &str) -> LifecycleResult<RollbackReport> {
        let _guard = self.locks.acquire(game_id).await;
        let report = self.disable_locked(game_id, mod_id).await?;
        self.staging.remove(game_id, mod_id).await?;

        let mut manifest = self.store.read(game_id);
        manifest.remove(mod_id);
        self.store.write(game_id, &manifest)?;
        log::info!("Deleted '{}' from '{}'", mod_id, game_id);
        Ok(report)
    }

    /// Disable every enabled mod, in manifest order
    pub async fn disable_all(
        &self,
        game_id: &str,
    ) -> LifecycleResult<Vec<(String, RollbackReport)>> {
        let _guard = self.locks.acquire(game_id).await;
        self.disable_all_locked(game_id).await
    }

    async fn disable_all_locked(
        &self,
        game_id: &str,
    ) -> LifecycleResult<Vec<(String, RollbackReport)>> {
        let mut reports = Vec::new();
        for mod_id in self.store.read(game_id).enabled_ids() {
            let report = self.disable_locked(game_id, &mod_id).await?;
            reports.push((mod_id, report));
        }
        Ok(reports)
    }

    // --- manage / unmanage ---

    /// Start managing a game: remember its root, check requirements, let the
    /// extension prepare the install and mark the manifest managed.
    ///
    /// Requirement and preparation hook failures are logged, not returned.
    pub async fn manage_game(
        &self,
        game_id: &str,
        root: Option<&Path>,
    ) -> LifecycleResult<Option<RequirementsReport>> {
        if let Some(root) = root {
            self.host.games().set(game_id, root);
        }
        let root = self.game_root(game_id)?;
        let _guard = self.locks.acquire(game_id).await;

        let requirements = match self
            .host
            .invoke(game_id, &Hook::CheckRequirements, vec![path_value(&root)])
            .await
        {
            Ok(Some(value)) => match serde_json::from_value::<RequirementsReport>(value) {
                Ok(report) => {
                    if !report.valid {
                        log::warn!(
                            "Requirements for '{}' not met: {}",
                            game_id,
                            report.message.as_deref().unwrap_or("no details")
                        );
                    }
                    Some(report)
                }
                Err(e) => {
                    log::warn!("Unreadable checkRequirements result from '{}': {}", game_id, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::error!("checkRequirements of '{}' failed: {}", game_id, e);
                None
            }
        };

        if let Err(e) = self
            .host
            .invoke(game_id, &Hook::PrepareForModding, vec![path_value(&root)])
            .await
        {
            log::error!("prepareForModding of '{}' failed: {}", game_id, e);
        }

        let mut manifest = self.store.read(game_id);
        manifest.managed = true;
        self.store.write(game_id, &manifest)?;
        log::info!("Managing '{}' at {}", game_id, root.display());
        Ok(requirements)
    }

    /// Stop managing a game: disable every mod, run `onUnmanage`, mark the
    /// manifest unmanaged. Failures along the way are logged.
    pub async fn unmanage_game(&self, game_id: &str) -> LifecycleResult<()> {
        let root = self.game_root(game_id)?;
        let _guard = self.locks.acquire(game_id).await;

        if let Err(e) = self.disable_all_locked(game_id).await {
            log::error!("Disabling mods of '{}' failed: {}", game_id, e);
        }
        let unmanaged = self
            .host
            .invoke(game_id, &Hook::OnUnmanage, vec![path_value(&root)])
            .await;
        if let Err(e) = unmanaged {
            log::error!("onUnmanage of '{}' failed: {}", game_id, e);
        }

        let mut manifest = self.store.read(game_id);
        manifest.managed = false;
        self.store.write(game_id, &manifest)?;
        log::info!("Stopped managing '{}'", game_id);
        Ok(())
    }

    /// Ask the extension which of `candidates` is its game
    pub async fn detect_game(
        &self,
        game_id: &str,
        candidates: &[PathBuf],
    ) -> LifecycleResult<Option<PathBuf>> {
        let paths: Vec<Value> = candidates.iter().map(|p| path_value(p)).collect();
        let result = self.host.invoke(game_id, &Hook::Detect, vec![Value::Array(paths)]).await?;
        Ok(match result {
            Some(Value::String(path)) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => None,
        })
    }

    // --- extension tools ---

    pub async fn check_update(
        &self,
        game_id: &str,
        mod_id: &str,
    ) -> LifecycleResult<Option<UpdateInfo>> {
        let entry = Self::find_mod(&self.store.read(game_id), game_id, mod_id)?;
        let summary = json!({
            "id": entry.id,
            "name": entry.name,
            "version": entry.version,
            "externalId": entry.external_id,
            "sourceUrl": entry.source_url,
            "domainHint": entry.domain_hint,
            "type": entry.mod_type,
        });
        let result = self.host.invoke(game_id, &Hook::CheckUpdate, vec![summary]).await?;
        let Some(result) = result else {
            return Ok(None);
        };
        let mut info: UpdateInfo = match serde_json::from_value(result) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Unreadable checkUpdate result from '{}': {}", game_id, e);
                return Ok(None);
            }
        };
        if info.update_available.is_none() {
            info.update_available =
                newer_version(entry.version.as_deref(), info.latest_version.as_deref());
        }
        Ok(Some(info))
    }

    pub async fn tool_buttons(&self, game_id: &str) -> LifecycleResult<Vec<ToolButton>> {
        let root = self.game_root(game_id)?;
        let result = self
            .host
            .invoke(game_id, &Hook::GetToolButtons, vec![path_value(&root)])
            .await?;
        let Some(result) = result else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_value(result).unwrap_or_else(|e| {
            log::warn!("Unreadable getToolButtons result from '{}': {}", game_id, e);
            Vec::new()
        }))
    }

    /// Run a custom action the extension exposes
    pub async fn run_action(
        &self,
        game_id: &str,
        action: &str,
        args: Vec<Value>,
    ) -> LifecycleResult<Option<Value>> {
        let hook = Hook::from_name(action);
        let extension = self.host.get(game_id).await?;
        if !extension.implements(&hook) {
            return Err(crate::extension_system::ExtensionError::HookNotImplemented {
                extension_id: game_id.to_string(),
                hook,
            }
            .into());
        }
        Ok(self.host.invoke(game_id, &hook, args).await?)
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

/// Undo a file trail. Only files and links inside `root` are removed.
fn rollback(root: &GameRoot, files: &[PathBuf]) -> RollbackReport {
    let mut report = RollbackReport::default();
    for path in files {
        if !jail::is_safe_entry(root, path) {
            log::warn!("Not removing {}: outside the game root", path.display());
            report.skipped.push(path.clone());
            continue;
        }
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report.skipped.push(path.clone());
                continue;
            }
            Err(e) => {
                log::warn!("Cannot inspect {}: {}", path.display(), e);
                report.failed.push((path.clone(), e.to_string()));
                continue;
            }
        };
        if meta.is_dir() {
            log::debug!("Leaving directory {} in place", path.display());
            report.skipped.push(path.clone());
            continue;
        }
        match remove_link_or_file(path) {
            Ok(()) => report.removed.push(path.clone()),
            Err(e) => {
                log::warn!("Failed to remove {}: {}", path.display(), e);
                report.failed.push((path.clone(), e.to_string()));
            }
        }
    }
    report
}

/// Lenient semver: `1.2` reads as `1.2.0`, a leading `v` is ignored
fn parse_version(text: &str) -> Option<semver::Version> {
    let trimmed = text.trim().trim_start_matches(['v', 'V']);
    if let Ok(version) = semver::Version::parse(trimmed) {
        return Some(version);
    }
    let mut parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    semver::Version::parse(&parts.join(".")).ok()
}

/// `Some(true)` when `latest` is a newer version than `current`
pub fn newer_version(current: Option<&str>, latest: Option<&str>) -> Option<bool> {
    let current = parse_version(current?)?;
    let latest = parse_version(latest?)?;
    Some(latest > current)
}
