//! Object storage for generated game pages.

use crate::config::{AssetStoreConfig, AssetStoreKind};
use crate::error::{OgpError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Key under which a freshly submitted game page is stored.
pub fn asset_key() -> String {
    format!("demo-games/{}.html", Uuid::new_v4())
}

/// Public location of an asset stored under `key`.
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key.trim_start_matches('/'))
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous content, and return
    /// the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

pub fn from_config(config: &AssetStoreConfig, timeout: Duration) -> Result<Arc<dyn AssetStore>> {
    match config.kind {
        AssetStoreKind::Local => Ok(Arc::new(LocalAssetStore::new(
            &config.local_dir,
            &config.public_base_url,
        ))),
        AssetStoreKind::Http => {
            let upload_url = config
                .upload_url
                .as_deref()
                .ok_or_else(|| OgpError::config("ASSET_UPLOAD_URL is required for http assets"))?;
            Ok(Arc::new(HttpAssetStore::new(
                upload_url,
                config.upload_token.clone(),
                &config.public_base_url,
                timeout,
            )?))
        }
    }
}

/// Writes assets to a directory the server (or a CDN origin) serves.
pub struct LocalAssetStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalAssetStore {
    pub fn new(root: &Path, public_base_url: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            public_base_url: public_base_url.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(OgpError::asset_store(format!("Invalid asset key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!("Stored asset {} ({} bytes)", key, bytes.len());
        Ok(public_url(&self.public_base_url, key))
    }
}

/// Uploads assets with `PUT {upload_url}/{key}`, e.g. to a bucket endpoint
/// or a presigning proxy.
pub struct HttpAssetStore {
    http: Client,
    upload_url: String,
    token: Option<String>,
    public_base_url: String,
}

impl HttpAssetStore {
    pub fn new(
        upload_url: &str,
        token: Option<String>,
        public_base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OgpError::asset_store(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            upload_url: upload_url.to_string(),
            token,
            public_base_url: public_base_url.to_string(),
        })
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let size = bytes.len();
        let mut request = self
            .http
            .put(public_url(&self.upload_url, key))
            .header("Content-Type", content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OgpError::asset_store(format!(
                "Upload of {} failed with {}: {}",
                key, status, body
            )));
        }

        tracing::info!("Uploaded asset {} ({} bytes)", key, size);
        Ok(public_url(&self.public_base_url, key))
    }
}
