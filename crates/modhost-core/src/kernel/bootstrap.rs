use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::extension_system::host::{ExtensionHost, GameDirectory};
use crate::extension_system::loader::{ExtensionLoader, LoadReport};
use crate::kernel::constants;
use crate::kernel::error::{Error, Result};
use crate::lifecycle::archive::{ArchiveExtractor, ZipExtractor};
use crate::lifecycle::manager::ModManager;
use crate::lifecycle::staging::StagingArea;
use crate::manifest::store::ManifestStore;
use crate::metadata::remote::{HttpMetadataClient, MetadataClient};
use crate::net::{HttpClient, ReqwestClient};
use crate::storage::HostConfig;

/// Timeout for outbound requests made by extensions and metadata lookups
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Collaborators the application is built from. Tests swap in their own.
#[derive(Debug, Clone)]
pub struct Components {
    pub http: Option<Arc<dyn HttpClient>>,
    pub extractor: Arc<dyn ArchiveExtractor>,
    pub metadata: Option<Arc<dyn MetadataClient>>,
}

impl Components {
    /// Reqwest for HTTP, zip extraction and the configured metadata service
    pub fn standard(config: &HostConfig) -> Result<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(HTTP_TIMEOUT)?);
        let metadata: Arc<dyn MetadataClient> = Arc::new(HttpMetadataClient::new(
            http.clone(),
            &config.metadata.base_url,
            config.metadata.api_key.clone(),
        ));
        Ok(Self {
            http: Some(http),
            extractor: Arc::new(ZipExtractor::new()),
            metadata: Some(metadata),
        })
    }

    /// No network access at all
    pub fn offline() -> Self {
        Self {
            http: None,
            extractor: Arc::new(ZipExtractor::new()),
            metadata: None,
        }
    }
}

/// Wires the extension host, manifest store and mod manager from a
/// [`HostConfig`]
#[derive(Debug)]
pub struct Application {
    config: HostConfig,
    games: Arc<GameDirectory>,
    store: Arc<ManifestStore>,
    extensions: Arc<ExtensionHost>,
    mods: Arc<ModManager>,
    initialized: bool,
}

impl Application {
    /// Build with the standard components
    pub fn new(config: HostConfig) -> Result<Self> {
        let components = Components::standard(&config)?;
        Ok(Self::with_components(config, components))
    }

    pub fn with_components(config: HostConfig, components: Components) -> Self {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);

        let paths: BTreeMap<String, PathBuf> = config
            .games
            .iter()
            .map(|(id, entry)| (id.clone(), entry.path.clone()))
            .collect();
        let games = Arc::new(GameDirectory::from_map(paths));
        let store = Arc::new(ManifestStore::new(games.clone()));

        let loader = ExtensionLoader::with_dirs(config.extensions_dirs.clone());
        let mut host = ExtensionHost::new(loader, games.clone()).with_trail(store.clone());
        if let Some(http) = components.http {
            host = host.with_http(http);
        }
        let extensions = Arc::new(host);

        let mut manager = ModManager::new(
            extensions.clone(),
            store.clone(),
            StagingArea::new(config.staging_dir.clone()),
            components.extractor,
        );
        if let Some(metadata) = components.metadata {
            manager = manager.with_metadata(metadata);
        }

        Self {
            config,
            games,
            store,
            extensions,
            mods: Arc::new(manager),
            initialized: false,
        }
    }

    /// Create the extension and staging directories, then load extensions
    pub async fn initialize(&mut self) -> Result<LoadReport> {
        if self.initialized {
            return Err(Error::Other("Application already initialized".to_string()));
        }

        for dir in self.config.extensions_dirs.iter().chain([&self.config.staging_dir]) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::io(e, "create_dir_all", dir.clone()))?;
        }

        let report = self.extensions.load_all().await?;
        for (path, reason) in &report.skipped {
            log::warn!("Skipped extension at {}: {}", path.display(), reason);
        }
        self.initialized = true;
        Ok(report)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn games(&self) -> &Arc<GameDirectory> {
        &self.games
    }

    pub fn store(&self) -> &Arc<ManifestStore> {
        &self.store
    }

    pub fn extensions(&self) -> &Arc<ExtensionHost> {
        &self.extensions
    }

    pub fn mods(&self) -> &Arc<ModManager> {
        &self.mods
    }
}
