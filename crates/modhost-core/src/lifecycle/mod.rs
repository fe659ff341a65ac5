//! # Modhost Core Lifecycle
//!
//! The install → enable → disable → delete state machine.
//!
//! - **[`manager`]**: [`ModManager`], which stages archives, asks the game's
//!   extension to classify and install them, and rolls back exactly the files
//!   an installation created.
//! - **[`staging`]**: per-game, per-mod extraction directories.
//! - **[`classify`]**: mod id derivation, loader detection and the metadata
//!   merge order.
//! - **[`archive`]**: the [`ArchiveExtractor`] seam and its zip implementation.
//! - **[`modpack`]**: exporting installed mods as a modpack directory.
//!
//! All operations for one game run under that game's lock from
//! [`crate::manifest::GameLocks`].
pub mod archive;
pub mod classify;
pub mod error;
pub mod manager;
pub mod modpack;
pub mod staging;

pub use archive::{ArchiveError, ArchiveExtractor, ArchiveResult, ZipExtractor};
pub use classify::{InstallOptions, ModIdentity, LOADER_FILES};
pub use error::{LifecycleError, LifecycleResult};
pub use manager::{newer_version, ModManager, RollbackReport};
pub use modpack::{Modpack, ModpackEntry, ModpackMeta};
pub use staging::StagingArea;

#[cfg(test)]
mod tests;
