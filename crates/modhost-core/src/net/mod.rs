//! # Modhost Core Network Seam
//!
//! Outbound HTTP used by extension `fetch_*`/`download` capabilities and the
//! remote metadata client. Everything goes through the [`HttpClient`] trait
//! so tests and embedders can substitute a canned implementation.
pub mod client;

pub use client::{HttpClient, ReqwestClient};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by outbound requests
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Request to '{url}' failed: {message}")]
    Request { url: String, message: String },

    #[error("Request to '{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Response from '{url}' is not valid JSON: {message}")]
    Decode { url: String, message: String },

    #[error("Failed to write download to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client unavailable: {0}")]
    Unavailable(String),
}

/// Shorthand for network results
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;
