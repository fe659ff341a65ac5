use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tempfile::{tempdir, TempDir};

use crate::extension_system::error::ExtensionError;
use crate::extension_system::host::{ExtensionHost, GameDirectory};
use crate::extension_system::loader::ExtensionLoader;
use crate::extension_system::sandbox::LuaExtension;
use crate::lifecycle::archive::ZipExtractor;
use crate::lifecycle::classify::InstallOptions;
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::manager::{newer_version, ModManager};
use crate::lifecycle::staging::StagingArea;
use crate::manifest::model::{GameManifest, Mod};
use crate::manifest::store::ManifestStore;
use crate::metadata::remote::{MetadataClient, RemoteModInfo};
use crate::net::NetworkResult;

/// Deploys every top-level staged entry into `<root>/Mods` and counts calls
const DEPLOYING_EXTENSION: &str = r#"
local installs = 0
return {
    id = "demo",
    install = function(staging, root, archive)
        installs = installs + 1
        for _, name in ipairs(host.list(staging)) do
            host.deploy(host.join(staging, name), host.join(root, "Mods", name))
        end
        return { note = "deployed", version = "from-hook" }
    end,
    installs = function() return installs end,
}
"#;

struct Env {
    dir: TempDir,
    root: PathBuf,
    store: Arc<ManifestStore>,
    manager: ModManager,
}

impl Env {
    async fn new(script: &str) -> Self {
        Self::build(script, None).await
    }

    async fn build(script: &str, metadata: Option<Arc<dyn MetadataClient>>) -> Self {
        let dir = tempdir().expect("Failed to create temp directory");
        let root = dir.path().join("game");
        fs::create_dir_all(&root).unwrap();

        let games = Arc::new(GameDirectory::new());
        games.set("demo", &root);
        let store = Arc::new(ManifestStore::new(games.clone()));
        let host = ExtensionHost::new(ExtensionLoader::new(), games).with_trail(store.clone());
        let host = Arc::new(host);
        let extension = LuaExtension::from_source(script, "demo.lua", &dir.path().join("demo.lua"))
            .expect("extension should load");
        host.register(Arc::new(extension)).await.unwrap();

        let mut manager = ModManager::new(
            host,
            store.clone(),
            StagingArea::new(dir.path().join("staging")),
            Arc::new(ZipExtractor::new()),
        );
        if let Some(metadata) = metadata {
            manager = manager.with_metadata(metadata);
        }
        Self { dir, root, store, manager }
    }

    /// A directory standing in for a downloaded archive
    fn archive(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let archive = self.dir.path().join("downloads").join(name);
        for (relative, contents) in files {
            let path = archive.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        archive
    }

    fn staged(&self, mod_id: &str) -> PathBuf {
        self.manager.staging().path_for("demo", mod_id).expect("plain mod id")
    }

    fn entry(&self, mod_id: &str) -> Mod {
        self.store.read("demo").find(mod_id).cloned().expect("mod should be in the manifest")
    }
}

#[tokio::test]
async fn test_install_stages_disabled_entry() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("CoolMod-1108-5", &[("plugin.dll", "x")]);

    let entry = env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    assert_eq!(entry.id, "CoolMod-1108-5");
    assert_eq!(entry.name, "CoolMod");
    assert_eq!(entry.external_id.as_deref(), Some("1108"));
    assert_eq!(entry.version.as_deref(), Some("5"));
    assert_eq!(entry.mod_type, "mod");
    assert!(!entry.enabled);
    assert!(entry.files.is_empty());
    assert_eq!(env.entry("CoolMod-1108-5"), entry);
    assert!(env.staged("CoolMod-1108-5").join("plugin.dll").is_file());
    // Nothing reaches the game until enable
    assert!(!env.root.join("Mods").exists());
}

#[tokio::test]
async fn test_install_infers_loader_type() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("Some Pack", &[("bin/dinput8.dll", "x")]);

    let entry = env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    assert_eq!(entry.id, "Some_Pack");
    assert_eq!(entry.mod_type, "loader");
}

#[tokio::test]
async fn test_failing_classifier_falls_back_to_file_name() {
    let script = r#"
    return {
        id = "demo",
        analyzeArchive = function(files) error("cannot read listing") end,
        determineModType = function(staging) error("classifier crashed") end,
    }
    "#;
    let env = Env::new(script).await;
    let archive = env.archive("CoolMod-1108-5", &[("bin/dinput8.dll", "x")]);

    let entry = env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    assert_eq!(entry.name, "CoolMod");
    assert_eq!(entry.external_id.as_deref(), Some("1108"));
    assert_eq!(entry.mod_type, "loader");
    assert_eq!(env.entry("CoolMod-1108-5"), entry);
    assert!(env.staged("CoolMod-1108-5").join("bin/dinput8.dll").is_file());
}

#[tokio::test]
async fn test_dot_only_archive_names_leave_staging_alone() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let good = env.archive("Good", &[("plugin.dll", "x")]);
    env.manager.install("demo", &good, InstallOptions::default()).await.unwrap();

    for name in ["...zip", "..zip"] {
        let archive = env.dir.path().join("downloads").join(name);
        fs::write(&archive, "garbage").unwrap();

        let result = env.manager.install("demo", &archive, InstallOptions::default()).await;
        assert!(
            matches!(result, Err(LifecycleError::InvalidArchiveName(_))),
            "{}: {:?}",
            name,
            result
        );
    }

    let staged = env.staged("Good");
    assert!(staged.join("plugin.dll").is_file());
    assert_eq!(env.store.read("demo").mods.len(), 1);
}

#[tokio::test]
async fn test_install_without_extension_discards_extracted_files() {
    let dir = tempdir().unwrap();
    let games = Arc::new(GameDirectory::new());
    games.set("demo", dir.path());
    let store = Arc::new(ManifestStore::new(games.clone()));
    let host = Arc::new(ExtensionHost::new(ExtensionLoader::new(), games));
    let staging_root = dir.path().join("staging");
    let manager = ModManager::new(
        host,
        store.clone(),
        StagingArea::new(staging_root.clone()),
        Arc::new(ZipExtractor::new()),
    );
    let archive = dir.path().join("downloads/CoolMod");
    fs::create_dir_all(&archive).unwrap();
    fs::write(archive.join("plugin.dll"), "x").unwrap();

    let result = manager.install("demo", &archive, InstallOptions::default()).await;

    assert!(matches!(result, Err(LifecycleError::Extension(ExtensionError::NotFound(_)))));
    assert!(!staging_root.join("demo/CoolMod").exists());
    assert!(store.read("demo").mods.is_empty());
}

#[tokio::test]
async fn test_install_uses_loader_in_archive_name() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("ModLoader-5", &[("readme.txt", "x")]);

    let entry = env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();
    assert_eq!(entry.mod_type, "loader");
}

#[tokio::test]
async fn test_metadata_merge_order() {
    let script = r#"
    return {
        id = "demo",
        analyzeArchive = function(files)
            return { version = "from-analyze", author = "analyzer", domainHint = "subnautica" }
        end,
        determineModType = function(staging)
            return { type = "plugin", author = "classifier" }
        end,
    }
    "#;
    let metadata: Arc<dyn MetadataClient> = Arc::new(FixedMetadata);
    let env = Env::build(script, Some(metadata)).await;
    let archive = env.archive("CoolMod-1108-5", &[("plugin.dll", "x")]);
    let options = InstallOptions {
        version: Some("from-options".into()),
        note: Some("pinned".into()),
        ..Default::default()
    };

    let entry = env.manager.install("demo", &archive, options).await.unwrap();

    assert_eq!(entry.mod_type, "plugin");
    // The remote lookup wins over everything else
    assert_eq!(entry.name, "subnautica/1108");
    assert_eq!(entry.version.as_deref(), Some("9.9"));
    assert_eq!(entry.author.as_deref(), Some("classifier"));
    assert_eq!(entry.note.as_deref(), Some("pinned"));
    assert_eq!(entry.domain_hint.as_deref(), Some("subnautica"));
    assert_eq!(entry.description.as_deref(), Some("remote summary"));
}

#[tokio::test]
async fn test_determine_mod_type_string_result() {
    let script = r#"return { id = "demo", determineModType = function() return "patch" end }"#;
    let env = Env::new(script).await;
    let archive = env.archive("Fix", &[("dinput8.dll", "x")]);

    let entry = env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();
    assert_eq!(entry.mod_type, "patch");
}

#[tokio::test]
async fn test_enable_then_disable_rolls_back_every_file() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let files = [("plugin.dll", "x"), ("assets/texture.png", "y")];
    let archive = env.archive("CoolMod-1108-5", &files);
    env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    let enabled = env.manager.enable("demo", "CoolMod-1108-5").await.unwrap();

    assert!(enabled.enabled);
    assert_eq!(enabled.note.as_deref(), Some("deployed"));
    assert_eq!(enabled.version.as_deref(), Some("from-hook"));
    let mut files = enabled.files.clone();
    files.sort();
    assert_eq!(files, vec![env.root.join("Mods/assets"), env.root.join("Mods/plugin.dll")]);
    for file in &files {
        assert!(fs::symlink_metadata(file).is_ok(), "{} should exist", file.display());
    }

    let report = env.manager.disable("demo", "CoolMod-1108-5").await.unwrap();

    assert_eq!(report.removed.len(), 2);
    assert!(report.is_clean());
    for file in &files {
        assert!(fs::symlink_metadata(file).is_err(), "{} should be gone", file.display());
    }
    let entry = env.entry("CoolMod-1108-5");
    assert!(!entry.enabled);
    assert!(entry.files.is_empty());
    // Staged files survive a disable
    assert!(env.staged("CoolMod-1108-5").join("assets/texture.png").is_file());
}

#[tokio::test]
async fn test_enable_is_idempotent() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("CoolMod", &[("plugin.dll", "x")]);
    env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    env.manager.enable("demo", "CoolMod").await.unwrap();
    let again = env.manager.enable("demo", "CoolMod").await.unwrap();

    assert!(again.enabled);
    let installs = env.manager.run_action("demo", "installs", vec![]).await.unwrap();
    assert_eq!(installs, Some(json!(1)));
}

#[tokio::test]
async fn test_auto_enable() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("CoolMod", &[("plugin.dll", "x")]);
    let options = InstallOptions { auto_enable: true, ..Default::default() };

    let entry = env.manager.install("demo", &archive, options).await.unwrap();

    assert!(entry.enabled);
    assert!(env.root.join("Mods/plugin.dll").is_file());
}

#[tokio::test]
async fn test_failed_install_hook_leaves_mod_disabled() {
    let script = r#"
    return {
        id = "demo",
        install = function(staging, root)
            host.copy(host.join(staging, "plugin.dll"), host.join(root, "plugin.dll"))
            error("disk full")
        end,
    }
    "#;
    let env = Env::new(script).await;
    let archive = env.archive("CoolMod", &[("plugin.dll", "x")]);
    env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    let result = env.manager.enable("demo", "CoolMod").await;

    assert!(matches!(
        result,
        Err(LifecycleError::Extension(ExtensionError::Script { .. }))
    ));
    let entry = env.entry("CoolMod");
    assert!(!entry.enabled);
    // What ran before the failure is still tracked and can be undone
    assert_eq!(entry.files, vec![env.root.join("plugin.dll")]);
    env.manager.disable("demo", "CoolMod").await.unwrap();
    assert!(!env.root.join("plugin.dll").exists());
}

#[tokio::test]
async fn test_enable_without_install_hook() {
    let env = Env::new(r#"return { id = "demo" }"#).await;
    let archive = env.archive("CoolMod", &[("plugin.dll", "x")]);
    env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    let entry = env.manager.enable("demo", "CoolMod").await.unwrap();
    assert!(entry.enabled);
    assert!(entry.files.is_empty());
}

#[tokio::test]
async fn test_rollback_never_leaves_the_game_root() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let outside = env.dir.path().join("precious.txt");
    fs::write(&outside, "keep me").unwrap();
    let gone = env.root.join("already-gone.dll");
    let mut entry = Mod::new("tampered", "Tampered");
    entry.enabled = true;
    entry.files = vec![outside.clone(), gone.clone()];
    env.store.write("demo", &GameManifest { managed: true, mods: vec![entry] }).unwrap();

    let report = env.manager.disable("demo", "tampered").await.unwrap();

    assert!(outside.exists());
    assert_eq!(report.skipped, vec![outside, gone]);
    assert!(report.removed.is_empty());
    assert!(env.entry("tampered").files.is_empty());
}

#[tokio::test]
async fn test_rollback_leaves_plain_directories() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let dir = env.root.join("Saves");
    fs::create_dir_all(&dir).unwrap();
    let mut entry = Mod::new("m", "M");
    entry.enabled = true;
    entry.files = vec![dir.clone()];
    env.store.write("demo", &GameManifest { managed: true, mods: vec![entry] }).unwrap();

    let report = env.manager.disable("demo", "m").await.unwrap();
    assert!(dir.is_dir());
    assert_eq!(report.skipped, vec![dir]);
}

#[tokio::test]
async fn test_reinstall_over_enabled_mod_disables_first() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("CoolMod", &[("old.dll", "x")]);
    let options = InstallOptions { auto_enable: true, ..Default::default() };
    env.manager.install("demo", &archive, options).await.unwrap();
    assert!(env.root.join("Mods/old.dll").exists());

    fs::remove_file(archive.join("old.dll")).unwrap();
    fs::write(archive.join("new.dll"), "y").unwrap();
    let entry = env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    assert!(!entry.enabled);
    assert!(!env.root.join("Mods/old.dll").exists());
    let staging = env.staged("CoolMod");
    assert!(staging.join("new.dll").is_file());
    assert!(!staging.join("old.dll").exists());
    assert_eq!(env.store.read("demo").mods.len(), 1);
}

#[tokio::test]
async fn test_delete_removes_everything() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("CoolMod", &[("plugin.dll", "x")]);
    let options = InstallOptions { auto_enable: true, ..Default::default() };
    env.manager.install("demo", &archive, options).await.unwrap();

    let report = env.manager.delete_mod("demo", "CoolMod").await.unwrap();

    assert_eq!(report.removed, vec![env.root.join("Mods/plugin.dll")]);
    assert!(!env.manager.staging().exists("demo", "CoolMod").await);
    assert!(env.manager.list_mods("demo").is_empty());
}

#[tokio::test]
async fn test_disable_all_in_manifest_order() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    for name in ["Bravo", "Alpha", "Charlie"] {
        let file = format!("{}.dll", name);
        let archive = env.archive(name, &[(file.as_str(), "x")]);
        let options = InstallOptions { auto_enable: name != "Charlie", ..Default::default() };
        env.manager.install("demo", &archive, options).await.unwrap();
    }

    let reports = env.manager.disable_all("demo").await.unwrap();

    let ids: Vec<&str> = reports.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["Bravo", "Alpha"]);
    assert!(env.manager.list_mods("demo").iter().all(|m| !m.enabled && m.files.is_empty()));
}

#[tokio::test]
async fn test_unknown_targets() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.archive("CoolMod", &[("plugin.dll", "x")]);

    let result = env.manager.install("other", &archive, InstallOptions::default()).await;
    assert!(matches!(result, Err(LifecycleError::GameNotConfigured(_))));

    let result = env.manager.enable("demo", "ghost").await;
    assert!(matches!(result, Err(LifecycleError::ModNotFound { .. })));
}

#[tokio::test]
async fn test_unsupported_archive_is_reported() {
    let env = Env::new(DEPLOYING_EXTENSION).await;
    let archive = env.dir.path().join("CoolMod.rar");
    fs::write(&archive, "not really").unwrap();

    let result = env.manager.install("demo", &archive, InstallOptions::default()).await;

    assert!(matches!(result, Err(LifecycleError::Archive(_))));
    assert!(!env.manager.staging().exists("demo", "CoolMod").await);
    assert!(env.manager.list_mods("demo").is_empty());
}

#[tokio::test]
async fn test_manage_and_unmanage_tolerate_hook_failures() {
    let script = r#"
    return {
        id = "demo",
        checkRequirements = function(root)
            return { valid = false, message = "BepInEx missing" }
        end,
        prepareForModding = function(root) error("cannot prepare") end,
        onUnmanage = function(root) error("cannot clean up") end,
        install = function(staging, root)
            host.copy(host.join(staging, "plugin.dll"), host.join(root, "plugin.dll"))
            return true
        end,
    }
    "#;
    let env = Env::new(script).await;

    let report = env.manager.manage_game("demo", None).await.unwrap();
    let report = report.expect("requirements result");
    assert!(!report.valid);
    assert_eq!(report.message.as_deref(), Some("BepInEx missing"));
    assert!(env.store.read("demo").managed);

    let archive = env.archive("CoolMod", &[("plugin.dll", "x")]);
    let options = InstallOptions { auto_enable: true, ..Default::default() };
    env.manager.install("demo", &archive, options).await.unwrap();

    env.manager.unmanage_game("demo").await.unwrap();
    let manifest = env.store.read("demo");
    assert!(!manifest.managed);
    assert!(!manifest.mods[0].enabled);
    assert!(!env.root.join("plugin.dll").exists());
}

#[tokio::test]
async fn test_detect_game_picks_candidate() {
    let script = r#"
    return {
        id = "demo",
        detect = function(candidates)
            for _, path in ipairs(candidates) do
                if host.is_file(host.join(path, "Game.exe")) then return path end
            end
            return nil
        end,
    }
    "#;
    let env = Env::new(script).await;
    let wrong = env.dir.path().join("wrong");
    fs::create_dir_all(&wrong).unwrap();
    fs::write(env.root.join("Game.exe"), "").unwrap();

    let found = env.manager.detect_game("demo", &[wrong.clone(), env.root.clone()]).await.unwrap();
    assert_eq!(found, Some(env.root.clone()));
    assert_eq!(env.manager.detect_game("demo", &[wrong]).await.unwrap(), None);
}

#[tokio::test]
async fn test_check_update_fills_availability() {
    let script = r#"
    return {
        id = "demo",
        checkUpdate = function(m)
            return {
                supported = true,
                latestVersion = "5.1",
                downloadUrl = "https://example.com/" .. m.externalId,
            }
        end,
    }
    "#;
    let env = Env::new(script).await;
    let archive = env.archive("CoolMod-1108-5", &[("plugin.dll", "x")]);
    env.manager.install("demo", &archive, InstallOptions::default()).await.unwrap();

    let info = env.manager.check_update("demo", "CoolMod-1108-5").await.unwrap().unwrap();

    assert_eq!(info.update_available, Some(true));
    assert_eq!(info.download_url.as_deref(), Some("https://example.com/1108"));
}

#[tokio::test]
async fn test_tool_buttons_and_unknown_action() {
    let script = r#"
    return {
        id = "demo",
        getToolButtons = function(root) return { { label = "Open logs", action = "openLogs" } } end,
    }
    "#;
    let env = Env::new(script).await;

    let buttons = env.manager.tool_buttons("demo").await.unwrap();
    assert_eq!(buttons.len(), 1);
    assert_eq!(buttons[0].action, "openLogs");

    let result = env.manager.run_action("demo", "openLogs", vec![]).await;
    assert!(matches!(
        result,
        Err(LifecycleError::Extension(ExtensionError::HookNotImplemented { .. }))
    ));
}

#[test]
fn test_newer_version() {
    assert_eq!(newer_version(Some("1.0.0"), Some("1.0.1")), Some(true));
    assert_eq!(newer_version(Some("v2.0"), Some("1.9.9")), Some(false));
    assert_eq!(newer_version(Some("5"), Some("5.0.0")), Some(false));
    assert_eq!(newer_version(Some("beta"), Some("1.0")), None);
    assert_eq!(newer_version(None, Some("1.0")), None);
}

/// Always knows the mod, naming it after the lookup key
#[derive(Debug)]
struct FixedMetadata;

#[async_trait]
impl MetadataClient for FixedMetadata {
    fn has_credentials(&self) -> bool {
        true
    }

    async fn lookup(
        &self,
        domain: &str,
        external_id: &str,
    ) -> NetworkResult<Option<RemoteModInfo>> {
        Ok(Some(RemoteModInfo {
            name: Some(format!("{}/{}", domain, external_id)),
            version: Some("9.9".into()),
            author: None,
            summary: Some("remote summary".into()),
            picture_url: None,
        }))
    }
}

#[test]
fn test_manager_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ModManager>();
}
