//! # Modhost Core Extension System
//!
//! Loads untrusted, game-specific extensions and runs their hooks against a
//! restricted set of host capabilities.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`jail`]**: containment predicate deciding whether a path lies inside
//!   the active game root.
//! - **[`capability`]**: the per-call [`InvocationContext`] and the
//!   [`Capabilities`] object hooks use for file queries, gated mutations and
//!   network access.
//! - **[`hooks`]**: hook names, the [`Extension`] trait, the optional-hook
//!   table and typed hook results.
//! - **[`sandbox`]**: the Lua runtime script extensions execute in.
//! - **[`native`]**: extensions compiled into the host.
//! - **[`loader`]** and **[`registry`]**: discovery, enable/disable by rename,
//!   and the id index.
//! - **[`host`]**: [`ExtensionHost`], which resolves an extension, builds a
//!   fresh context for each call and invokes the hook.
//!
//! Each invocation owns its context. There is no shared "current game" slot,
//! so hooks of different extensions may run at the same time.
pub mod capability;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod host;
pub mod jail;
pub mod loader;
pub mod native;
pub mod registry;
pub mod sandbox;

pub use capability::{Capabilities, DeployMethod, FileTrail, InvocationContext};
pub use descriptor::{DescriptorBuilder, ExtensionDescriptor, ModSource};
pub use error::{ExtensionError, ExtensionResult};
pub use hooks::{
    Extension, Hook, HookTable, MetadataPatch, RequirementsReport, ToolButton, UpdateInfo,
};
pub use host::{ExtensionHost, GameDirectory};
pub use jail::GameRoot;
pub use loader::{DiscoveredExtension, ExtensionLoader, LoadReport, DISABLED_SUFFIX};
pub use native::NativeExtension;
pub use registry::ExtensionRegistry;
pub use sandbox::LuaExtension;

#[cfg(test)]
mod tests;
