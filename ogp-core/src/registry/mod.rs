//! Game creation and maintenance on top of the platform, the asset store and
//! the local mirror.

use crate::assets::{self, AssetStore};
use crate::config::ServerConfig;
use crate::error::{OgpError, Result};
use crate::platform::PlatformApi;
use crate::storage::{
    GameChanges, GameRecord, GameStore, NewGameRecord, Storage, UserRecord, UserStore,
};
use crate::template::{GamePage, GameTemplate};
use crate::types::{
    email_identity, is_email_identity, normalize_platform, GameQuery, GameRegistration,
    GameSubmission, GameUpdate, ImageUpload, PlatformUser, RegisteredGame, RewardSplit,
    ScoreSubmission,
};
use crate::validation::validate_submission;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

const HTML_CONTENT_TYPE: &str = "text/html";

/// Result of a successful two-phase registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedGame {
    pub game: RegisteredGame,
    pub game_url: String,
    #[serde(skip)]
    pub record: GameRecord,
}

/// Platform listing, with the caller's resolved identity when filtering by user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameListing {
    pub games: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ogp_id: Option<String>,
}

/// A local user together with the games mirrored for them.
#[derive(Debug, Clone, Serialize)]
pub struct UserGames {
    pub user: UserRecord,
    pub games: Vec<GameRecord>,
}

pub struct GameRegistry {
    platform: Arc<dyn PlatformApi>,
    assets: Arc<dyn AssetStore>,
    storage: Arc<Storage>,
    template: GameTemplate,
    api_key: String,
    platform_api_url: String,
    creator_share_bps: u32,
}

impl GameRegistry {
    pub fn new(
        config: &ServerConfig,
        platform: Arc<dyn PlatformApi>,
        assets: Arc<dyn AssetStore>,
        storage: Arc<Storage>,
        template: GameTemplate,
    ) -> Self {
        Self {
            platform,
            assets,
            storage,
            template,
            api_key: config.api_key.clone(),
            platform_api_url: config.platform_api_url.clone(),
            creator_share_bps: config.creator_share_bps,
        }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub async fn platform_user(&self) -> Result<PlatformUser> {
        let user = self.platform.me().await?;
        if user.id.is_empty() {
            return Err(OgpError::platform("Failed to get platform user information"));
        }
        Ok(user)
    }

    fn render_page(&self, submission: &GameSubmission, game_id: Option<&str>) -> Vec<u8> {
        self.template
            .render(&GamePage {
                name: &submission.name,
                points_per_jump: submission.points_per_jump,
                lives: submission.lives,
                api_key: &self.api_key,
                platform_api_url: &self.platform_api_url,
                game_id,
            })
            .into_bytes()
    }

    /// Register a new game where the platform is the creator and the
    /// submitting user receives the configured share of creator rewards.
    ///
    /// The steps run in a fixed order: upload the page, register it, upload
    /// the page again with the assigned id embedded, then mirror locally.
    /// Nothing is retried or rolled back; a failure after registration leaves
    /// the game on the platform without a local row.
    pub async fn submit_game(
        &self,
        submission: GameSubmission,
        image: Option<ImageUpload>,
        cover_image: Option<ImageUpload>,
    ) -> Result<SubmittedGame> {
        validate_submission(&submission, image.as_ref(), cover_image.as_ref())?;
        let image = image.ok_or_else(|| OgpError::validation("image is required"))?;
        let user_email = submission.user_email.trim().to_string();

        let platform_user = self.platform_user().await?;

        let key = assets::asset_key();
        let game_url = self
            .assets
            .put(&key, self.render_page(&submission, None), HTML_CONTENT_TYPE)
            .await?;
        tracing::debug!("Uploaded placeholder page for '{}' to {}", submission.name, game_url);

        let submitted_split =
            RewardSplit::for_submission(&platform_user.id, &user_email, self.creator_share_bps)?;

        let registration = GameRegistration::from_submission(
            &submission,
            &game_url,
            submitted_split.clone(),
            &image,
            cover_image.as_ref(),
        );
        let game = self.platform.register_game(&registration).await?;
        if game.id.is_empty() {
            return Err(OgpError::platform("Failed to register game with OGP platform"));
        }
        tracing::info!("Registered game '{}' as {}", submission.name, game.id);

        let page = self.render_page(&submission, Some(&game.id));
        if !String::from_utf8_lossy(&page).contains(&game.id) {
            tracing::warn!("Game id {} not found in generated page", game.id);
        }
        if let Err(e) = self.assets.put(&key, page, HTML_CONTENT_TYPE).await {
            tracing::error!(
                "Game {} is registered but re-uploading {} failed: {}",
                game.id,
                key,
                e
            );
            return Err(e);
        }

        let mirrored = self
            .mirror_submission(
                &submission,
                &user_email,
                &platform_user.id,
                &game,
                &game_url,
                submitted_split,
            )
            .await;
        let record = match mirrored {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    "Game {} is registered but was not mirrored locally: {}",
                    game.id,
                    e
                );
                return Err(e);
            }
        };

        Ok(SubmittedGame {
            game,
            game_url,
            record,
        })
    }

    async fn mirror_submission(
        &self,
        submission: &GameSubmission,
        user_email: &str,
        platform_id: &str,
        game: &RegisteredGame,
        game_url: &str,
        submitted_split: RewardSplit,
    ) -> Result<GameRecord> {
        let users = UserStore::new(&self.storage);
        let user = users.get_or_create(user_email).await?;

        let split = match &game.org_rewards_split {
            Some(returned) => {
                match self.check_returned_split(returned, platform_id, &user).await {
                    Ok(()) => returned.clone(),
                    Err(e) => {
                        tracing::warn!(
                            "Platform returned an unexpected split for {}: {}; keeping the submitted one",
                            game.id,
                            e
                        );
                        submitted_split
                    }
                }
            }
            None => submitted_split,
        };

        if user.ogp_user_id.is_none() {
            if let Some(ogp_user_id) = split.resolved_collaborator(platform_id) {
                if let Err(e) = users.update_ogp_user_id(user_email, ogp_user_id).await {
                    tracing::warn!(
                        "Could not link {} to OGP user {} for game {}: {}",
                        user_email,
                        ogp_user_id,
                        game.id,
                        e
                    );
                }
            }
        }

        let record = NewGameRecord {
            game_id: game.id.clone(),
            user_email: user_email.to_string(),
            name: submission.name.clone(),
            description: Some(submission.description.clone()),
            game_url: game_url.to_string(),
            platform: Some(normalize_platform(&submission.platform)),
            points_per_jump: Some(submission.points_per_jump),
            lives: Some(submission.lives),
            image_url: game.image_url.clone(),
            cover_image_url: game.cover_image.clone(),
            twitter: submission.twitter.clone(),
            discord: submission.discord.clone(),
            telegram: submission.telegram.clone(),
            max_score_per_session: submission.max_score_per_session,
            max_sessions_per_day: submission.max_sessions_per_day,
            max_cumulative_points_per_day: submission.max_cumulative_points_per_day,
            org_rewards_split: split,
        };

        GameStore::new(&self.storage).create(&record).await
    }

    /// A returned split must be well formed and its collaborator must be the
    /// submitting user: their placeholder, their linked id, or an id no other
    /// local user holds.
    async fn check_returned_split(
        &self,
        returned: &RewardSplit,
        platform_id: &str,
        user: &UserRecord,
    ) -> Result<()> {
        returned.validate(platform_id)?;

        let collaborator = returned
            .collaborator_identity(platform_id)
            .ok_or_else(|| OgpError::invalid_split("collaborator identity is missing"))?;

        if is_email_identity(collaborator) {
            if collaborator != email_identity(&user.email) {
                return Err(OgpError::invalid_split(format!(
                    "collaborator {} is not {}",
                    collaborator, user.email
                )));
            }
            return Ok(());
        }

        if let Some(linked) = &user.ogp_user_id {
            if linked != collaborator {
                return Err(OgpError::invalid_split(format!(
                    "collaborator {} differs from {}'s linked OGP user {}",
                    collaborator, user.email, linked
                )));
            }
            return Ok(());
        }

        if let Some(owner) = UserStore::new(&self.storage)
            .get_by_ogp_user_id(collaborator)
            .await?
        {
            return Err(OgpError::invalid_split(format!(
                "collaborator {} is already linked to {}",
                collaborator, owner.email
            )));
        }

        Ok(())
    }

    /// Games registered by the platform account. With `user_email`, only the
    /// games that user shares rewards in.
    pub async fn list_games(
        &self,
        mut query: GameQuery,
        user_email: Option<&str>,
    ) -> Result<GameListing> {
        let user_email = user_email.map(str::trim).filter(|email| !email.is_empty());

        match user_email {
            Some(email) => {
                query.collaborator = Some(email_identity(email));
                let games = self.platform.my_games(&query).await?;
                let user = UserStore::new(&self.storage).get_by_email(email).await?;

                Ok(GameListing {
                    games,
                    user_ogp_id: user.and_then(|u| u.ogp_user_id),
                })
            }
            None => {
                query.collaborator = None;
                Ok(GameListing {
                    games: self.platform.my_games(&query).await?,
                    user_ogp_id: None,
                })
            }
        }
    }

    pub async fn game(&self, game_id: &str) -> Result<Value> {
        require_game_id(game_id)?;
        self.platform.game(game_id).await
    }

    /// Update the game on the platform, then mirror the change locally if the
    /// game is known here. Returns the platform's id for the game.
    pub async fn update_game(&self, game_id: &str, update: GameUpdate) -> Result<String> {
        require_game_id(game_id)?;

        let updated_id = self.platform.update_game(game_id, &update).await?;

        let games = GameStore::new(&self.storage);
        if games.get_by_game_id(game_id).await?.is_some() {
            let changes = GameChanges::from_update(&update);
            games.update(game_id, &changes).await?;
        } else {
            tracing::debug!("Game {} has no local row, skipping mirror update", game_id);
        }

        Ok(updated_id)
    }

    pub async fn leaderboard(&self, game_id: &str, limit: Option<u32>) -> Result<Value> {
        require_game_id(game_id)?;
        self.platform
            .leaderboard(game_id, limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT))
            .await
    }

    /// Credit a player's score to the game on the platform.
    pub async fn record_score(&self, score: &ScoreSubmission) -> Result<()> {
        let player_email = score.player_email.trim();
        let mut problems = Vec::new();
        if player_email.is_empty() {
            problems.push("playerEmail is required".to_string());
        }
        if score.game_id.trim().is_empty() {
            problems.push("gameId is required".to_string());
        }
        let points = match score.score {
            Some(points) => points,
            None => {
                problems.push("score is required".to_string());
                0
            }
        };
        if !problems.is_empty() {
            return Err(OgpError::Validation(problems));
        }

        self.platform
            .add_points(score.game_id.trim(), &email_identity(player_email), points)
            .await?;

        tracing::info!(
            "Recorded {} points for {} in game {}",
            points,
            player_email,
            score.game_id
        );
        Ok(())
    }

    /// Remove the local row for a game. The platform registration is untouched.
    pub async fn delete_game(&self, game_id: &str) -> Result<()> {
        require_game_id(game_id)?;

        if !GameStore::new(&self.storage).delete(game_id).await? {
            return Err(OgpError::GameNotFound {
                game_id: game_id.to_string(),
            });
        }

        tracing::info!("Deleted local game {}", game_id);
        Ok(())
    }

    pub async fn local_game(&self, game_id: &str) -> Result<GameRecord> {
        GameStore::new(&self.storage)
            .get_by_game_id(game_id)
            .await?
            .ok_or_else(|| OgpError::GameNotFound {
                game_id: game_id.to_string(),
            })
    }

    pub async fn local_games(
        &self,
        user_email: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<GameRecord>> {
        let games = GameStore::new(&self.storage);
        match user_email {
            Some(email) => games.list_by_user(email, limit, offset).await,
            None => games.list(limit, offset).await,
        }
    }

    pub async fn user(&self, email: &str) -> Result<UserGames> {
        let user = UserStore::new(&self.storage)
            .get_by_email(email)
            .await?
            .ok_or_else(|| OgpError::UserNotFound {
                email: email.to_string(),
            })?;
        let games = GameStore::new(&self.storage).get_by_user_email(email).await?;

        Ok(UserGames { user, games })
    }
}

fn require_game_id(game_id: &str) -> Result<()> {
    if game_id.trim().is_empty() {
        return Err(OgpError::validation("gameId is required"));
    }
    Ok(())
}
