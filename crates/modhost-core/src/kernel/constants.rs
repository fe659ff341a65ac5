/// Application name
pub const APP_NAME: &str = "modhost";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory name used under the XDG config and data homes
pub const APP_DIR_NAME: &str = "modhost";

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default extensions directory (relative to the data directory)
pub const EXTENSIONS_DIR: &str = "extensions";

/// Default staging directory (relative to the data directory)
pub const STAGING_DIR: &str = "staging";

/// Per-game directory holding the manifest, relative to the game root
pub const MANIFEST_DIR: &str = ".modhost";

/// Manifest document file name
pub const MANIFEST_FILE: &str = "manifest.json";

/// Default base URL of the remote mod metadata service
pub const DEFAULT_METADATA_URL: &str = "https://api.nexusmods.com/v1";
