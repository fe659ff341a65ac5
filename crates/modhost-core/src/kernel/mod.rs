//! # Modhost Core Kernel
//!
//! The `kernel` module ties the subsystems of `modhost-core` together.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Application Bootstrapping**: [`Application`](bootstrap::Application)
//!   builds the game directory, manifest store, extension host and mod
//!   manager from a [`HostConfig`](crate::storage::HostConfig) and loads
//!   extensions on initialization.
//! - **Core Constants**: names and default locations in the `constants`
//!   submodule.
//! - **Error Handling**: the crate-wide [`Error`](error::Error) and `Result`
//!   alias in the `error` submodule.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::{Application, Components};
pub use error::{Error, Result};
