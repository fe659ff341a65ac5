//! # Modhost Core Manifest
//!
//! The per-game record of installed mods. Each managed game keeps one JSON
//! document under its own directory tree; it is the only persisted source of
//! which files a mod's installation created.
pub mod error;
pub mod locks;
pub mod model;
pub mod store;

pub use error::{ManifestError, ManifestResult};
pub use locks::GameLocks;
pub use model::{GameManifest, Mod};
pub use store::ManifestStore;
