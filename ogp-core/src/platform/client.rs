use crate::config::ServerConfig;
use crate::error::{OgpError, Result};
use crate::platform::PlatformApi;
use crate::types::{GameQuery, GameRegistration, GameUpdate, PlatformUser, RegisteredGame};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const SIGNATURE_PATH: [&str; 2] = ["market", "getSignature"];

#[derive(Debug, Deserialize)]
struct SignatureData {
    signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureRequest<'a> {
    secret_key: &'a str,
    path: &'a str,
    method: String,
    api_key: &'a str,
}

/// HMAC-authenticated client for the OGP REST API.
pub struct OgpClient {
    http: Client,
    base_url: Url,
    api_key: String,
    secret_key: String,
    platform_user: RwLock<Option<PlatformUser>>,
}

impl OgpClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            OgpError::config(format!("Invalid OGP API base URL {}: {}", config.api_base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(OgpError::config(format!(
                "OGP API base URL cannot be used as a base: {}",
                config.api_base_url
            )));
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OgpError::platform(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            platform_user: RwLock::new(None),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OgpError::internal("OGP API base URL cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn signature(&self, method: &Method, path: &str) -> Result<String> {
        let request = SignatureRequest {
            secret_key: &self.secret_key,
            path,
            method: method.as_str().to_lowercase(),
            api_key: &self.api_key,
        };

        let response = self
            .http
            .post(self.url(&SIGNATURE_PATH)?)
            .json(&request)
            .send()
            .await?;

        let data: SignatureData = read_envelope(response).await?;
        Ok(data.signature)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(segments)?;
        let signature = self.signature(&method, url.path()).await?;

        tracing::debug!("{} {}", method, url.path());

        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json")
            .header("Authorization", signature)
            .header("x-auth-provider", "hmac")
            .header("x-api-key", &self.api_key);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        read_envelope(response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OgpError::PlatformStatus {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    parse_envelope(&bytes)
}

/// Unwrap `{"data": ...}`. An explicit `null` is handed to `T` as is.
fn parse_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut body: Map<String, Value> = serde_json::from_slice(bytes)?;
    let data = body
        .remove("data")
        .ok_or_else(|| OgpError::platform("Response did not contain a data field"))?;
    Ok(serde_json::from_value(data)?)
}

/// `updateGame` answers with either the bare id or the updated game.
fn updated_game_id(data: &Value, fallback: &str) -> String {
    match data {
        Value::String(id) => id.clone(),
        Value::Object(map) => map
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string(),
        _ => fallback.to_string(),
    }
}

fn query_pairs(query: &GameQuery) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("limit", query.limit.to_string()),
        ("offset", query.offset.to_string()),
        ("include_extra", query.include_extra.to_string()),
    ];
    if let Some(collaborator) = &query.collaborator {
        pairs.push(("collaborator", collaborator.clone()));
    }
    pairs
}

#[async_trait]
impl PlatformApi for OgpClient {
    async fn me(&self) -> Result<PlatformUser> {
        if let Some(user) = self.platform_user.read().clone() {
            return Ok(user);
        }

        let user: PlatformUser = self
            .request::<_, Value>(Method::GET, &["users", "me"], &[], None)
            .await?;
        if user.id.is_empty() {
            return Err(OgpError::platform("Platform user has no id"));
        }

        tracing::info!("Authenticated as OGP user {}", user.id);
        *self.platform_user.write() = Some(user.clone());
        Ok(user)
    }

    async fn register_game(&self, registration: &GameRegistration) -> Result<RegisteredGame> {
        tracing::info!("Registering game '{}' with OGP", registration.name);
        self.request(
            Method::POST,
            &["market", "registerGame"],
            &[],
            Some(registration),
        )
        .await
    }

    async fn my_games(&self, query: &GameQuery) -> Result<Value> {
        self.request::<_, Value>(Method::GET, &["games", "mine"], &query_pairs(query), None)
            .await
    }

    async fn game(&self, game_id: &str) -> Result<Value> {
        self.request::<_, Value>(Method::GET, &["games", game_id], &[], None)
            .await
    }

    async fn update_game(&self, game_id: &str, update: &GameUpdate) -> Result<String> {
        let data: Value = self
            .request(Method::PUT, &["games", game_id], &[], Some(update))
            .await?;
        Ok(updated_game_id(&data, game_id))
    }

    async fn leaderboard(&self, game_id: &str, limit: u32) -> Result<Value> {
        self.request::<_, Value>(
            Method::GET,
            &["games", game_id, "leaderboard"],
            &[("limit", limit.to_string())],
            None,
        )
        .await
    }

    async fn add_points(&self, game_id: &str, user_id: &str, points: i64) -> Result<()> {
        let body = json!({ "userId": user_id, "points": points });
        let _: Value = self
            .request(Method::POST, &["games", game_id, "points"], &[], Some(&body))
            .await?;

        tracing::debug!("Added {} points for {} in game {}", points, user_id, game_id);
        Ok(())
    }
}
