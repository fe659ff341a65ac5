use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::kernel::constants;
use crate::net::{NetworkError, NetworkResult};

/// Minimal HTTP surface the host needs
#[async_trait]
pub trait HttpClient: Send + Sync + Debug {
    /// GET `url` and decode the body as JSON
    async fn fetch_json(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> NetworkResult<serde_json::Value>;

    /// GET `url` and return the body as text
    async fn fetch_text(&self, url: &str, headers: &[(String, String)]) -> NetworkResult<String>;

    /// GET `url` and stream the body into `dest`, returning the byte count
    async fn download(&self, url: &str, dest: &Path) -> NetworkResult<u64>;
}

/// [`HttpClient`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> NetworkResult<Self> {
        let user_agent = format!("{}/{}", constants::APP_NAME, constants::APP_VERSION);
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Unavailable(e.to_string()))?;
        Ok(Self { http })
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> NetworkResult<reqwest::Response> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await.map_err(|e| NetworkError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch_json(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> NetworkResult<serde_json::Value> {
        let text = self.fetch_text(url, headers).await?;
        serde_json::from_str(&text).map_err(|e| NetworkError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_text(&self, url: &str, headers: &[(String, String)]) -> NetworkResult<String> {
        let response = self.get(url, headers).await?;
        response.text().await.map_err(|e| NetworkError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> NetworkResult<u64> {
        let mut response = self.get(url, &[]).await?;
        let write_err = |source| NetworkError::Write { path: dest.to_path_buf(), source };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let mut file = tokio::fs::File::create(dest).await.map_err(write_err)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| NetworkError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })? {
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;
        log::debug!("Downloaded {} bytes from {} to {}", written, url, dest.display());
        Ok(written)
    }
}
