pub mod extension_system;
pub mod kernel;
pub mod lifecycle;
pub mod manifest;
pub mod metadata;
pub mod net;
pub mod storage;
pub mod utils;

// Re-export key public types for the binary
pub use extension_system::{
    Extension, ExtensionError, ExtensionHost, Hook, LuaExtension, NativeExtension,
};
pub use kernel::error::Error as KernelError;
pub use kernel::{Application, Components};
pub use lifecycle::{InstallOptions, LifecycleError, ModManager, RollbackReport};
pub use manifest::{GameManifest, ManifestStore, Mod};
pub use storage::{HostConfig, StorageProvider};
