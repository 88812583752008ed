use crate::error::{OgpError, Result};
use crate::validation::{discord_url, non_blank, twitter_url};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whole creator-reward pool, in basis points.
pub const TOTAL_BASIS_POINTS: u32 = 10_000;

/// Creator share used when nothing else is configured (50%).
pub const DEFAULT_CREATOR_SHARE_BPS: u32 = 5_000;

const EMAIL_IDENTITY_PREFIX: &str = "email:";

/// Placeholder identity for a user the platform has not resolved yet.
pub fn email_identity(email: &str) -> String {
    format!("{}{}", EMAIL_IDENTITY_PREFIX, email)
}

pub fn is_email_identity(identity: &str) -> bool {
    identity.starts_with(EMAIL_IDENTITY_PREFIX)
}

/// Mapping from platform identity to a basis-points share of creator rewards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardSplit(BTreeMap<String, u32>);

impl RewardSplit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split for a fresh submission: the platform keeps the remainder and the
    /// submitting user is referenced by email until the platform resolves them.
    pub fn for_submission(platform_id: &str, user_email: &str, creator_share: u32) -> Result<Self> {
        if creator_share == 0 || creator_share >= TOTAL_BASIS_POINTS {
            return Err(OgpError::invalid_split(format!(
                "creator share must be between 1 and {} basis points, got {}",
                TOTAL_BASIS_POINTS - 1,
                creator_share
            )));
        }

        let mut split = Self::new();
        split.insert(platform_id, TOTAL_BASIS_POINTS - creator_share);
        split.insert(email_identity(user_email), creator_share);
        Ok(split)
    }

    pub fn insert(&mut self, identity: impl Into<String>, basis_points: u32) {
        self.0.insert(identity.into(), basis_points);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.0.contains_key(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|bps| u64::from(*bps)).sum()
    }

    /// A stored split names the platform and exactly one collaborator, and
    /// hands out the whole pool.
    pub fn validate(&self, platform_id: &str) -> Result<()> {
        if self.total() != u64::from(TOTAL_BASIS_POINTS) {
            return Err(OgpError::invalid_split(format!(
                "shares sum to {} basis points, expected {}",
                self.total(),
                TOTAL_BASIS_POINTS
            )));
        }

        if self.len() != 2 {
            return Err(OgpError::invalid_split(format!(
                "expected exactly 2 identities, found {}",
                self.len()
            )));
        }

        if !self.contains(platform_id) {
            return Err(OgpError::invalid_split(format!(
                "platform identity {} is missing",
                platform_id
            )));
        }

        Ok(())
    }

    /// The identity that shares rewards with the platform.
    pub fn collaborator_identity(&self, platform_id: &str) -> Option<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .find(|identity| *identity != platform_id)
    }

    /// Like [`collaborator_identity`](Self::collaborator_identity) but only once
    /// the platform has replaced the email placeholder with a real identity.
    pub fn resolved_collaborator(&self, platform_id: &str) -> Option<&str> {
        self.collaborator_identity(platform_id)
            .filter(|identity| !is_email_identity(identity))
    }

    pub fn share_of(&self, identity: &str) -> u32 {
        self.0.get(identity).copied().unwrap_or(0)
    }

    pub fn share_percent(&self, identity: &str) -> f64 {
        f64::from(self.share_of(identity)) / 100.0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The account the API keys belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformUser {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Game creation request as sent by the game-creator frontend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points_per_jump: u32,
    #[serde(default)]
    pub lives: u32,
    #[serde(default)]
    pub platform: String,
    pub twitter: Option<String>,
    pub discord: Option<String>,
    pub telegram: Option<String>,
    pub max_score_per_session: Option<u32>,
    pub max_sessions_per_day: Option<u32>,
    pub max_cumulative_points_per_day: Option<u32>,
    pub jwks_url: Option<String>,
    #[serde(default)]
    pub user_email: String,
    pub tokens: Option<Vec<String>>,
}

/// Lower-cased platform tag, `web` when none was given.
pub fn normalize_platform(platform: &str) -> String {
    let platform = platform.trim().to_lowercase();
    if platform.is_empty() {
        "web".to_string()
    } else {
        platform
    }
}

/// An uploaded image, kept in memory until it is forwarded to the platform.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Registration payload for `market/registerGame`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRegistration {
    pub name: String,
    pub description: String,
    pub game_url: String,
    #[serde(rename = "isHTMLGame")]
    pub is_html_game: bool,
    pub iframable: bool,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score_per_session: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sessions_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cumulative_points_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_url: Option<String>,
    pub org_rewards_split: RewardSplit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl GameRegistration {
    pub fn from_submission(
        submission: &GameSubmission,
        game_url: &str,
        org_rewards_split: RewardSplit,
        image: &ImageUpload,
        cover_image: Option<&ImageUpload>,
    ) -> Self {
        Self {
            name: submission.name.clone(),
            description: submission.description.clone(),
            game_url: game_url.to_string(),
            is_html_game: true,
            iframable: true,
            platform: normalize_platform(&submission.platform),
            twitter: non_blank(&submission.twitter).map(twitter_url),
            discord: non_blank(&submission.discord).map(discord_url),
            telegram: submission.telegram.clone(),
            max_score_per_session: submission.max_score_per_session,
            max_sessions_per_day: submission.max_sessions_per_day,
            max_cumulative_points_per_day: submission.max_cumulative_points_per_day,
            jwks_url: submission.jwks_url.clone(),
            org_rewards_split,
            tokens: submission.tokens.clone(),
            image: image.to_data_url(),
            cover_image: cover_image.map(ImageUpload::to_data_url),
        }
    }
}

/// The platform's view of a registered game. Fields we do not model are kept
/// so they can be handed back to clients untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredGame {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_rewards_split: Option<RewardSplit>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Partial update of a registered game. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score_per_session: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sessions_per_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cumulative_points_per_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
}

impl GameUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.platform.is_none()
            && self.twitter.is_none()
            && self.discord.is_none()
            && self.telegram.is_none()
            && self.max_score_per_session.is_none()
            && self.max_sessions_per_day.is_none()
            && self.max_cumulative_points_per_day.is_none()
            && self.tokens.is_none()
    }
}

/// Paging and filtering for the platform's game listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameQuery {
    pub limit: u32,
    pub offset: u32,
    pub include_extra: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaborator: Option<String>,
}

impl Default for GameQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            include_extra: true,
            collaborator: None,
        }
    }
}

/// Points earned by a player in one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    #[serde(default)]
    pub player_email: String,
    pub score: Option<i64>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub game_id: String,
}
