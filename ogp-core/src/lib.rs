//! OGP core - game registration and reward-split management
//!
//! This library wraps the OGP platform API, renders and hosts HTML game
//! pages, and keeps a local SQLite mirror of the users and games a backend
//! has registered on their behalf.

pub mod assets;
pub mod config;
pub mod error;
pub mod platform;
pub mod registry;
pub mod storage;
pub mod template;
pub mod types;
pub mod validation;

pub use assets::{AssetStore, HttpAssetStore, LocalAssetStore};
pub use config::{AssetStoreConfig, AssetStoreKind, ServerConfig};
pub use error::{OgpError, Result};
pub use platform::{OgpClient, PlatformApi};
pub use registry::{GameListing, GameRegistry, SubmittedGame, UserGames};
pub use storage::{GameRecord, Storage, UserRecord};
pub use template::GameTemplate;
pub use types::{
    GameQuery, GameSubmission, GameUpdate, ImageUpload, RegisteredGame, RewardSplit,
    ScoreSubmission,
};
