use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
#[cfg(feature = "yaml-config")]
use serde_yaml;
#[cfg(feature = "toml-config")]
use toml;

use crate::kernel::constants;
use crate::storage::error::{StorageResult, StorageSystemError};
use crate::storage::StorageProvider;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// A game the host knows the install location of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEntry {
    pub path: PathBuf,
}

/// Remote metadata service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub base_url: String,
    /// No lookups are made without a key
    pub api_key: Option<String>,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_METADATA_URL.to_string(),
            api_key: None,
        }
    }
}

/// Host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directories scanned for extensions, in order
    pub extensions_dirs: Vec<PathBuf>,
    /// Root of the per-game, per-mod staging tree
    pub staging_dir: PathBuf,
    /// Known games keyed by extension id
    pub games: BTreeMap<String, GameEntry>,
    pub metadata: MetadataSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            extensions_dirs: vec![data_dir.join(constants::EXTENSIONS_DIR)],
            staging_dir: data_dir.join(constants::STAGING_DIR),
            games: BTreeMap::new(),
            metadata: MetadataSettings::default(),
        }
    }
}

impl HostConfig {
    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> StorageResult<String> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| serialization_error("json", e)),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| serialization_error("yaml", e)),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| serialization_error("toml", e)),
        }
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> StorageResult<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(data)
                .map_err(|e| deserialization_error("json", e)),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data)
                .map_err(|e| deserialization_error("yaml", e)),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data)
                .map_err(|e| deserialization_error("toml", e)),
        }
    }

    /// Load configuration from `path`, the format picked by its extension.
    ///
    /// A missing file yields the default configuration.
    pub fn load(provider: &dyn StorageProvider, path: &Path) -> StorageResult<Self> {
        let format = format_for(path)?;
        if !provider.exists(path) {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = provider.read_to_string(path)?;
        Self::deserialize(&contents, format)
    }

    /// Save configuration to `path`
    pub fn save(&self, provider: &dyn StorageProvider, path: &Path) -> StorageResult<()> {
        let format = format_for(path)?;
        let contents = self.serialize(format)?;
        provider.write_string(path, &contents)
    }

    /// Install location of a game, if configured
    pub fn game_path(&self, game_id: &str) -> Option<&Path> {
        self.games.get(game_id).map(|entry| entry.path.as_path())
    }
}

fn format_for(path: &Path) -> StorageResult<ConfigFormat> {
    ConfigFormat::from_path(path).ok_or_else(|| {
        StorageSystemError::UnsupportedConfigFormat(
            path.extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| "<none>".to_string()),
        )
    })
}

fn serialization_error<E>(format: &str, e: E) -> StorageSystemError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageSystemError::SerializationError { format: format.to_string(), source: Box::new(e) }
}

fn deserialization_error<E>(format: &str, e: E) -> StorageSystemError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageSystemError::DeserializationError { format: format.to_string(), source: Box::new(e) }
}

fn xdg_dir(var: &str, home_fallback: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(home_fallback),
        None => PathBuf::from(".").join(home_fallback), // No home, stay relative
    }
}

/// `$XDG_CONFIG_HOME/modhost/config.toml`
pub fn default_config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
        .join(constants::APP_DIR_NAME)
        .join(constants::CONFIG_FILE_NAME)
}

/// `$XDG_DATA_HOME/modhost`
pub fn default_data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share").join(constants::APP_DIR_NAME)
}
