use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::tempdir;

use crate::extension_system::error::ExtensionError;
use crate::extension_system::hooks::Hook;
use crate::extension_system::host::{ExtensionHost, GameDirectory};
use crate::extension_system::loader::ExtensionLoader;
use crate::extension_system::native::NativeExtension;
use crate::extension_system::tests::support::{RecordingTrail, Sandbox};

fn host_with(games: Arc<GameDirectory>) -> ExtensionHost {
    ExtensionHost::new(ExtensionLoader::new(), games)
}

#[tokio::test]
async fn test_missing_hook_resolves_to_none() {
    let host = host_with(Arc::new(GameDirectory::new()));
    host.register(Arc::new(NativeExtension::builder("demo").build())).await.unwrap();

    let result = host.invoke("demo", &Hook::CheckUpdate, vec![]).await.unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_unknown_extension_is_not_found() {
    let host = host_with(Arc::new(GameDirectory::new()));
    let result = host.invoke("ghost", &Hook::Detect, vec![]).await;
    assert!(matches!(result, Err(ExtensionError::NotFound(id)) if id == "ghost"));
}

#[tokio::test]
async fn test_context_reflects_game_and_mod() {
    let sandbox = Sandbox::new();
    let games = Arc::new(GameDirectory::new());
    games.set("demo", &sandbox.root);
    let host = host_with(games);
    let extension = NativeExtension::builder("demo")
        .hook(Hook::Install, |caps, _args| {
            Ok(json!({
                "root": caps.game_root().map(|p| p.to_string_lossy().into_owned()),
                "mod": caps.mod_id(),
            }))
        })
        .hook(Hook::Detect, |caps, _args| Ok(json!(caps.context().root.is_detection())))
        .build();
    host.register(Arc::new(extension)).await.unwrap();

    let result = host.invoke_for_mod("demo", "cool-mod", &Hook::Install, vec![]).await.unwrap();
    assert_eq!(
        result,
        Some(json!({ "root": sandbox.root.to_string_lossy(), "mod": "cool-mod" }))
    );

    let result = host.invoke("demo", &Hook::Install, vec![]).await.unwrap();
    assert_eq!(result.unwrap()["mod"], Value::Null);

    // Detection never sees a game root
    let result = host.invoke("demo", &Hook::Detect, vec![]).await.unwrap();
    assert_eq!(result, Some(json!(true)));
}

#[tokio::test]
async fn test_mod_scoped_mutations_reach_the_trail() {
    let sandbox = Sandbox::new();
    let src = sandbox.write_staged("mod.dll", "binary");
    let games = Arc::new(GameDirectory::new());
    games.set("demo", &sandbox.root);
    let trail = Arc::new(RecordingTrail::default());
    let host = host_with(games).with_trail(trail.clone());

    let dest = sandbox.root.join("mod.dll");
    let (from, to) = (src.clone(), dest.clone());
    let extension = NativeExtension::builder("demo")
        .hook(Hook::Install, move |caps, _args| {
            caps.copy(&from, &to)?;
            Ok(json!(true))
        })
        .build();
    host.register(Arc::new(extension)).await.unwrap();

    host.invoke_for_mod("demo", "cool-mod", &Hook::Install, vec![]).await.unwrap();

    let entries = trail.entries.lock().unwrap().clone();
    assert_eq!(entries, vec![("demo".to_string(), "cool-mod".to_string(), dest)]);
}

#[tokio::test]
async fn test_concurrent_invocations_keep_their_own_roots() {
    let first = Sandbox::new();
    let second = Sandbox::new();
    let games = Arc::new(GameDirectory::new());
    games.set("alpha", &first.root);
    games.set("beta", &second.root);
    let host = Arc::new(host_with(games));

    for id in ["alpha", "beta"] {
        let extension = NativeExtension::builder(id)
            .hook(Hook::Install, |caps, _args| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(json!(caps.game_root().map(|p| p.to_string_lossy().into_owned())))
            })
            .build();
        host.register(Arc::new(extension)).await.unwrap();
    }

    let calls = (0..8).map(|i| {
        let host = host.clone();
        let id = if i % 2 == 0 { "alpha" } else { "beta" };
        async move { (id, host.invoke_for_mod(id, "m", &Hook::Install, vec![]).await.unwrap()) }
    });
    for (id, result) in futures::future::join_all(calls).await {
        let expected = if id == "alpha" { &first.root } else { &second.root };
        assert_eq!(result, Some(json!(expected.to_string_lossy())));
    }
}

#[tokio::test]
async fn test_load_all_and_set_enabled() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("demo.lua"), "return { id = 'demo' }").unwrap();
    let loader = ExtensionLoader::with_dirs(vec![temp_dir.path().to_path_buf()]);
    let host = ExtensionHost::new(loader, Arc::new(GameDirectory::new()));

    let report = host.load_all().await.unwrap();
    assert_eq!(report.loaded, vec!["demo".to_string()]);
    assert!(host.get("demo").await.is_ok());

    host.set_enabled("demo", false).await.unwrap();
    host.load_all().await.unwrap();
    assert!(host.descriptors().await.is_empty());
}
