use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock as StdRwLock};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::RwLock;

use crate::extension_system::capability::{Capabilities, FileTrail, InvocationContext};
use crate::extension_system::descriptor::ExtensionDescriptor;
use crate::extension_system::error::{ExtensionError, ExtensionResult};
use crate::extension_system::hooks::{Extension, Hook};
use crate::extension_system::jail::GameRoot;
use crate::extension_system::loader::{ExtensionLoader, LoadReport};
use crate::extension_system::registry::ExtensionRegistry;
use crate::net::HttpClient;

/// Known install locations, keyed by the id of the extension managing them
#[derive(Debug, Default)]
pub struct GameDirectory {
    paths: StdRwLock<BTreeMap<String, PathBuf>>,
}

impl GameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(paths: BTreeMap<String, PathBuf>) -> Self {
        Self { paths: StdRwLock::new(paths) }
    }

    pub fn set(&self, game_id: &str, path: &Path) {
        let mut paths = self.paths.write().unwrap_or_else(|e| e.into_inner());
        paths.insert(game_id.to_string(), path.to_path_buf());
    }

    pub fn get(&self, game_id: &str) -> Option<PathBuf> {
        let paths = self.paths.read().unwrap_or_else(|e| e.into_inner());
        paths.get(game_id).cloned()
    }

    pub fn remove(&self, game_id: &str) -> Option<PathBuf> {
        let mut paths = self.paths.write().unwrap_or_else(|e| e.into_inner());
        paths.remove(game_id)
    }

    pub fn all(&self) -> BTreeMap<String, PathBuf> {
        self.paths.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Loads extensions and runs their hooks
pub struct ExtensionHost {
    registry: RwLock<ExtensionRegistry>,
    loader: ExtensionLoader,
    games: Arc<GameDirectory>,
    trail: Option<Arc<dyn FileTrail>>,
    http: Option<Arc<dyn HttpClient>>,
}

impl std::fmt::Debug for ExtensionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionHost")
            .field("dirs", &self.loader.dirs())
            .field("games", &self.games)
            .finish_non_exhaustive()
    }
}

impl ExtensionHost {
    pub fn new(loader: ExtensionLoader, games: Arc<GameDirectory>) -> Self {
        Self {
            registry: RwLock::new(ExtensionRegistry::new()),
            loader,
            games,
            trail: None,
            http: None,
        }
    }

    /// Record mutations of mod-scoped invocations in `trail`
    pub fn with_trail(mut self, trail: Arc<dyn FileTrail>) -> Self {
        self.trail = Some(trail);
        self
    }

    pub fn with_http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn games(&self) -> &Arc<GameDirectory> {
        &self.games
    }

    pub fn loader(&self) -> &ExtensionLoader {
        &self.loader
    }

    /// Rebuild the registry from disk. Extensions registered through
    /// [`register`](Self::register) are dropped too.
    pub async fn load_all(&self) -> ExtensionResult<LoadReport> {
        let mut fresh = ExtensionRegistry::new();
        let report = self.loader.load_into(&mut fresh).await?;
        *self.registry.write().await = fresh;
        log::info!(
            "Loaded {} extension(s), {} skipped, {} disabled",
            report.loaded.len(),
            report.skipped.len(),
            report.disabled.len()
        );
        Ok(report)
    }

    pub async fn register(&self, extension: Arc<dyn Extension>) -> ExtensionResult<()> {
        self.registry.write().await.register(extension)
    }

    pub async fn get(&self, id: &str) -> ExtensionResult<Arc<dyn Extension>> {
        self.registry
            .read()
            .await
            .get(id)
            .ok_or_else(|| ExtensionError::NotFound(id.to_string()))
    }

    pub async fn descriptors(&self) -> Vec<ExtensionDescriptor> {
        self.registry.read().await.descriptors()
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> ExtensionResult<PathBuf> {
        self.loader.set_enabled(name, enabled).await
    }

    fn root_for(&self, extension_id: &str, hook: &Hook) -> GameRoot {
        if *hook == Hook::Detect {
            return GameRoot::DetectionOnly;
        }
        match self.games.get(extension_id) {
            Some(path) => GameRoot::Path(path),
            None => GameRoot::Unset,
        }
    }

    /// Run `hook` of `extension_id` outside of any mod
    pub async fn invoke(
        &self,
        extension_id: &str,
        hook: &Hook,
        args: Vec<Value>,
    ) -> ExtensionResult<Option<Value>> {
        self.run(extension_id, None, hook, args).await
    }

    /// Run `hook` with `mod_id` active, so every mutation lands in its trail
    pub async fn invoke_for_mod(
        &self,
        extension_id: &str,
        mod_id: &str,
        hook: &Hook,
        args: Vec<Value>,
    ) -> ExtensionResult<Option<Value>> {
        self.run(extension_id, Some(mod_id), hook, args).await
    }

    async fn run(
        &self,
        extension_id: &str,
        mod_id: Option<&str>,
        hook: &Hook,
        args: Vec<Value>,
    ) -> ExtensionResult<Option<Value>> {
        let extension = self.get(extension_id).await?;
        if !extension.implements(hook) {
            log::debug!("Extension '{}' has no '{}' hook", extension_id, hook);
            return Ok(None);
        }

        let mut context = InvocationContext::new(
            extension_id,
            self.root_for(extension_id, hook),
            &extension.descriptor().location,
        );
        if let Some(mod_id) = mod_id {
            context = context.with_mod(mod_id);
        }

        let mut caps = Capabilities::new(context);
        if let Some(trail) = &self.trail {
            caps = caps.with_trail(trail.clone());
        }
        if let Some(http) = &self.http {
            caps = caps.with_http(http.clone(), Handle::current());
        }
        let caps = Arc::new(caps);

        log::debug!("Invoking '{}' on extension '{}'", hook, extension_id);
        let result = extension.call(hook, caps.clone(), args).await;
        caps.expire();

        if let Err(e) = &result {
            log::debug!("Hook '{}' of '{}' failed: {}", hook, extension_id, e);
        }
        result
    }
}
