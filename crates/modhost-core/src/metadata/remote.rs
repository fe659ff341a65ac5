use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::net::{HttpClient, NetworkResult};

/// What a mod-hosting site knows about a mod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteModInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub picture_url: Option<String>,
}

/// Lookup of authoritative mod metadata by external id
#[async_trait]
pub trait MetadataClient: Send + Sync + Debug {
    /// Whether lookups can be made at all
    fn has_credentials(&self) -> bool;

    /// Metadata for mod `external_id` of game `domain`; `None` when the
    /// client has no credentials
    async fn lookup(&self, domain: &str, external_id: &str) -> NetworkResult<Option<RemoteModInfo>>;
}

/// [`MetadataClient`] for the mod-site REST API
#[derive(Debug, Clone)]
pub struct HttpMetadataClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMetadataClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn mod_url(&self, domain: &str, external_id: &str) -> String {
        format!("{}/games/{}/mods/{}.json", self.base_url, domain, external_id)
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn lookup(
        &self,
        domain: &str,
        external_id: &str,
    ) -> NetworkResult<Option<RemoteModInfo>> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };
        let url = self.mod_url(domain, external_id);
        let headers = [("apikey".to_string(), api_key.clone())];
        let body = self.http.fetch_json(&url, &headers).await?;
        Ok(Some(RemoteModInfo {
            name: text_field(&body, "name"),
            version: text_field(&body, "version"),
            author: text_field(&body, "author"),
            summary: text_field(&body, "summary"),
            picture_url: text_field(&body, "picture_url"),
        }))
    }
}
