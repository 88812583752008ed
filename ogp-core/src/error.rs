use thiserror::Error;

pub type Result<T> = std::result::Result<T, OgpError>;

#[derive(Error, Debug)]
pub enum OgpError {
    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Platform returned {status}: {body}")]
    PlatformStatus { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Asset store error: {0}")]
    AssetStore(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid submission: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid reward split: {0}")]
    InvalidRewardSplit(String),

    #[error("Game not found: {game_id}")]
    GameNotFound { game_id: String },

    #[error("User not found: {email}")]
    UserNotFound { email: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OgpError {
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    pub fn asset_store(msg: impl Into<String>) -> Self {
        Self::AssetStore(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn invalid_split(msg: impl Into<String>) -> Self {
        Self::InvalidRewardSplit(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for failures caused by the remote platform rather than by us.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Platform(_) | Self::PlatformStatus { .. } | Self::Http(_) | Self::AssetStore(_)
        )
    }
}
