use crate::error::{OgpError, Result};
use crate::types::{DEFAULT_CREATOR_SHARE_BPS, TOTAL_BASIS_POINTS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.opengameprotocol.com";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub api_key: String,
    pub secret_key: String,
    pub api_base_url: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Backend URL baked into generated game pages.
    pub platform_api_url: String,
    pub assets: AssetStoreConfig,
    pub template_path: Option<PathBuf>,
    pub creator_share_bps: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStoreConfig {
    pub kind: AssetStoreKind,
    pub local_dir: PathBuf,
    pub upload_url: Option<String>,
    pub upload_token: Option<String>,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStoreKind {
    Local,
    Http,
}

impl ServerConfig {
    /// Defaults rooted at `data_dir`, with no API credentials.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            port: DEFAULT_PORT,
            database_path: data_dir.join("games.db"),
            platform_api_url: format!("http://localhost:{}/api", DEFAULT_PORT),
            assets: AssetStoreConfig {
                kind: AssetStoreKind::Local,
                local_dir: data_dir.join("assets"),
                upload_url: None,
                upload_token: None,
                public_base_url: format!("http://localhost:{}/assets", DEFAULT_PORT),
            },
            template_path: None,
            creator_share_bps: DEFAULT_CREATOR_SHARE_BPS,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env(data_dir: &Path) -> Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(data_dir: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| OgpError::config(format!("{} environment variable not set", key)))
        };

        let mut config = Self::new(data_dir);
        config.api_key = required("OGP_API_KEY")?;
        config.secret_key = required("OGP_SECRET_KEY")?;

        if let Some(url) = get("OGP_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(port) = get("PORT") {
            config.port = parse_number(&port, "PORT")?;
            config.platform_api_url = format!("http://localhost:{}/api", config.port);
            config.assets.public_base_url = format!("http://localhost:{}/assets", config.port);
        }
        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(url) = get("PLATFORM_API_URL") {
            config.platform_api_url = url;
        }
        if let Some(kind) = get("ASSET_STORE") {
            config.assets.kind = match kind.to_lowercase().as_str() {
                "local" => AssetStoreKind::Local,
                "http" => AssetStoreKind::Http,
                other => {
                    return Err(OgpError::config(format!(
                        "Invalid ASSET_STORE: {}. Supported stores: local, http",
                        other
                    )))
                }
            };
        }
        if let Some(dir) = get("ASSET_DIR") {
            config.assets.local_dir = PathBuf::from(dir);
        }
        config.assets.upload_url = get("ASSET_UPLOAD_URL");
        config.assets.upload_token = get("ASSET_UPLOAD_TOKEN");
        if let Some(url) = get("CDN_BASE_URL") {
            config.assets.public_base_url = url;
        }
        config.template_path = get("GAME_TEMPLATE_PATH").map(PathBuf::from);
        if let Some(share) = get("CREATOR_SHARE_BPS") {
            config.creator_share_bps = parse_number(&share, "CREATOR_SHARE_BPS")?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_number(&secs, "REQUEST_TIMEOUT_SECS")?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(OgpError::config("OGP API key cannot be empty"));
        }

        if self.secret_key.is_empty() {
            return Err(OgpError::config("OGP secret key cannot be empty"));
        }

        if self.api_base_url.is_empty() {
            return Err(OgpError::config("OGP API base URL cannot be empty"));
        }

        if self.creator_share_bps == 0 || self.creator_share_bps >= TOTAL_BASIS_POINTS {
            return Err(OgpError::config(format!(
                "Creator share must be between 1 and {} basis points",
                TOTAL_BASIS_POINTS - 1
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(OgpError::config("Request timeout must be greater than 0"));
        }

        if self.assets.public_base_url.is_empty() {
            return Err(OgpError::config("CDN base URL cannot be empty"));
        }

        if self.assets.kind == AssetStoreKind::Http && self.assets.upload_url.is_none() {
            return Err(OgpError::config(
                "ASSET_UPLOAD_URL is required when ASSET_STORE=http",
            ));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| OgpError::config(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let dir = Path::new("/tmp/ogp");
        let config = ServerConfig::from_lookup(
            dir,
            lookup(&[("OGP_API_KEY", "key"), ("OGP_SECRET_KEY", "secret")]),
        )
        .unwrap();

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.port, 3001);
        assert_eq!(config.database_path, dir.join("games.db"));
        assert_eq!(config.assets.kind, AssetStoreKind::Local);
        assert_eq!(config.creator_share_bps, 5_000);
    }

    #[test]
    fn test_missing_keys() {
        let err = ServerConfig::from_lookup(Path::new("."), lookup(&[("OGP_API_KEY", "key")]))
            .unwrap_err();
        assert!(err.to_string().contains("OGP_SECRET_KEY"));

        let blank = ServerConfig::from_lookup(
            Path::new("."),
            lookup(&[("OGP_API_KEY", "  "), ("OGP_SECRET_KEY", "secret")]),
        );
        assert!(blank.is_err());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(
            Path::new("."),
            lookup(&[
                ("OGP_API_KEY", "key"),
                ("OGP_SECRET_KEY", "secret"),
                ("PORT", "8080"),
                ("ASSET_STORE", "http"),
                ("ASSET_UPLOAD_URL", "https://uploads.example.com"),
                ("CDN_BASE_URL", "https://cdn.example.com"),
                ("CREATOR_SHARE_BPS", "2500"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.assets.kind, AssetStoreKind::Http);
        assert_eq!(config.assets.public_base_url, "https://cdn.example.com");
        assert_eq!(config.creator_share_bps, 2_500);
    }

    #[test]
    fn test_invalid_values() {
        let base = [("OGP_API_KEY", "key"), ("OGP_SECRET_KEY", "secret")];

        let mut bad_port = base.to_vec();
        bad_port.push(("PORT", "abc"));
        assert!(ServerConfig::from_lookup(Path::new("."), lookup(&bad_port)).is_err());

        let mut http_without_url = base.to_vec();
        http_without_url.push(("ASSET_STORE", "http"));
        assert!(ServerConfig::from_lookup(Path::new("."), lookup(&http_without_url)).is_err());

        let mut whole_pool = base.to_vec();
        whole_pool.push(("CREATOR_SHARE_BPS", "10000"));
        assert!(ServerConfig::from_lookup(Path::new("."), lookup(&whole_pool)).is_err());
    }
}
