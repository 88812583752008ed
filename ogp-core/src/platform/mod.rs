//! Access to the OGP platform REST API.

pub mod client;

pub use client::OgpClient;

use crate::error::Result;
use crate::types::{GameQuery, GameRegistration, GameUpdate, PlatformUser, RegisteredGame};
use async_trait::async_trait;
use serde_json::Value;

/// Operations this backend needs from the platform. Reward computation,
/// claims and leaderboard ranking stay on the platform side.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// The platform account the API keys belong to.
    async fn me(&self) -> Result<PlatformUser>;

    async fn register_game(&self, registration: &GameRegistration) -> Result<RegisteredGame>;

    /// Games owned by the platform account, optionally only those shared
    /// with `query.collaborator`.
    async fn my_games(&self, query: &GameQuery) -> Result<Value>;

    async fn game(&self, game_id: &str) -> Result<Value>;

    /// Returns the id of the updated game.
    async fn update_game(&self, game_id: &str, update: &GameUpdate) -> Result<String>;

    async fn leaderboard(&self, game_id: &str, limit: u32) -> Result<Value>;

    async fn add_points(&self, game_id: &str, user_id: &str, points: i64) -> Result<()>;
}
