//! # Modhost Core Metadata
//!
//! Where a mod's name, external id and version come from when an extension
//! does not say: the archive's file name ([`filename`]) and the remote mod
//! site ([`remote`]).
pub mod filename;
pub mod remote;

pub use filename::{extract, FilenameMetadata};
pub use remote::{HttpMetadataClient, MetadataClient, RemoteModInfo};

#[cfg(test)]
mod tests;
