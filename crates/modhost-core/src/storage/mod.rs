//! # Modhost Core Storage
//!
//! Host-owned persistence: the [`StorageProvider`] abstraction, its local
//! filesystem implementation and the host configuration document.
//!
//! Writes made through [`LocalStorageProvider`] land in a temporary file
//! next to the target and are persisted over it in one rename, so a crash
//! mid-write never leaves a truncated manifest or config behind.
pub mod config;
pub mod error;
pub mod local;
pub mod provider;

/// Re-export key types
pub use config::{ConfigFormat, GameEntry, HostConfig, MetadataSettings};
pub use error::{StorageResult, StorageSystemError};
pub use local::LocalStorageProvider;
pub use provider::StorageProvider;
