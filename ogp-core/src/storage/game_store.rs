use crate::error::Result;
use crate::storage::Storage;
use crate::types::{GameUpdate, RewardSplit};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: i64,
    pub game_id: String,
    pub user_email: String,
    pub name: String,
    pub description: Option<String>,
    pub game_url: String,
    pub platform: Option<String>,
    pub points_per_jump: Option<u32>,
    pub lives: Option<u32>,
    pub image_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub twitter: Option<String>,
    pub discord: Option<String>,
    pub telegram: Option<String>,
    pub max_score_per_session: Option<u32>,
    pub max_sessions_per_day: Option<u32>,
    pub max_cumulative_points_per_day: Option<u32>,
    pub org_rewards_split: RewardSplit,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A game row about to be mirrored, before the database assigns `id`.
#[derive(Debug, Clone, Default)]
pub struct NewGameRecord {
    pub game_id: String,
    pub user_email: String,
    pub name: String,
    pub description: Option<String>,
    pub game_url: String,
    pub platform: Option<String>,
    pub points_per_jump: Option<u32>,
    pub lives: Option<u32>,
    pub image_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub twitter: Option<String>,
    pub discord: Option<String>,
    pub telegram: Option<String>,
    pub max_score_per_session: Option<u32>,
    pub max_sessions_per_day: Option<u32>,
    pub max_cumulative_points_per_day: Option<u32>,
    pub org_rewards_split: RewardSplit,
}

/// Column updates for an existing game. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub platform: Option<String>,
    pub twitter: Option<String>,
    pub discord: Option<String>,
    pub telegram: Option<String>,
    pub max_score_per_session: Option<u32>,
    pub max_sessions_per_day: Option<u32>,
    pub max_cumulative_points_per_day: Option<u32>,
}

impl GameChanges {
    /// Mirror the parts of a platform update the local table tracks. Blank
    /// strings are treated as "not provided".
    pub fn from_update(update: &GameUpdate) -> Self {
        let text = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        Self {
            name: text(&update.name),
            description: text(&update.description),
            platform: text(&update.platform),
            twitter: text(&update.twitter),
            discord: text(&update.discord),
            telegram: text(&update.telegram),
            max_score_per_session: update.max_score_per_session,
            max_sessions_per_day: update.max_sessions_per_day,
            max_cumulative_points_per_day: update.max_cumulative_points_per_day,
        }
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        let mut columns = Vec::new();

        let texts = [
            ("name", &self.name),
            ("description", &self.description),
            ("platform", &self.platform),
            ("twitter", &self.twitter),
            ("discord", &self.discord),
            ("telegram", &self.telegram),
        ];
        for (column, value) in texts {
            if let Some(value) = value {
                columns.push((column, Value::Text(value.clone())));
            }
        }

        let limits = [
            ("max_score_per_session", self.max_score_per_session),
            ("max_sessions_per_day", self.max_sessions_per_day),
            (
                "max_cumulative_points_per_day",
                self.max_cumulative_points_per_day,
            ),
        ];
        for (column, value) in limits {
            if let Some(value) = value {
                columns.push((column, Value::Integer(i64::from(value))));
            }
        }

        columns
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

const GAME_COLUMNS: &str = "id, game_id, user_email, name, description, game_url, platform, \
     points_per_jump, lives, image_url, cover_image_url, twitter, discord, telegram, \
     max_score_per_session, max_sessions_per_day, max_cumulative_points_per_day, \
     org_rewards_split, created_at, updated_at";

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameRecord> {
    let split_json: String = row.get(17)?;
    let org_rewards_split = RewardSplit::from_json(&split_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(17, Type::Text, Box::new(e))
    })?;

    Ok(GameRecord {
        id: row.get(0)?,
        game_id: row.get(1)?,
        user_email: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        game_url: row.get(5)?,
        platform: row.get(6)?,
        points_per_jump: row.get(7)?,
        lives: row.get(8)?,
        image_url: row.get(9)?,
        cover_image_url: row.get(10)?,
        twitter: row.get(11)?,
        discord: row.get(12)?,
        telegram: row.get(13)?,
        max_score_per_session: row.get(14)?,
        max_sessions_per_day: row.get(15)?,
        max_cumulative_points_per_day: row.get(16)?,
        org_rewards_split,
        created_at: DateTime::from_timestamp(row.get(18)?, 0).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp(row.get(19)?, 0).unwrap_or_else(Utc::now),
    })
}

pub struct GameStore<'a> {
    storage: &'a Storage,
}

impl<'a> GameStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn create(&self, game: &NewGameRecord) -> Result<GameRecord> {
        let split_json = game.org_rewards_split.to_json()?;
        let conn = self.storage.get_connection().await;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO games (
                game_id, user_email, name, description, game_url, platform,
                points_per_jump, lives, image_url, cover_image_url,
                twitter, discord, telegram, max_score_per_session, max_sessions_per_day,
                max_cumulative_points_per_day, org_rewards_split, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)",
            params![
                game.game_id,
                game.user_email,
                game.name,
                game.description,
                game.game_url,
                game.platform,
                game.points_per_jump,
                game.lives,
                game.image_url,
                game.cover_image_url,
                game.twitter,
                game.discord,
                game.telegram,
                game.max_score_per_session,
                game.max_sessions_per_day,
                game.max_cumulative_points_per_day,
                split_json,
                now,
            ],
        )?;

        let record = conn.query_row(
            &format!("SELECT {} FROM games WHERE id = ?1", GAME_COLUMNS),
            params![conn.last_insert_rowid()],
            game_from_row,
        )?;

        tracing::info!("Mirrored game {} for {}", record.game_id, record.user_email);
        Ok(record)
    }

    pub async fn get_by_game_id(&self, game_id: &str) -> Result<Option<GameRecord>> {
        let conn = self.storage.get_connection().await;

        let game = conn
            .query_row(
                &format!("SELECT {} FROM games WHERE game_id = ?1", GAME_COLUMNS),
                params![game_id],
                game_from_row,
            )
            .optional()?;

        Ok(game)
    }

    pub async fn get_by_user_email(&self, email: &str) -> Result<Vec<GameRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM games WHERE user_email = ?1 ORDER BY created_at DESC, id DESC",
            GAME_COLUMNS
        ))?;

        let game_iter = stmt.query_map(params![email], game_from_row)?;

        let mut games = Vec::new();
        for game in game_iter {
            games.push(game?);
        }

        Ok(games)
    }

    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<GameRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM games ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            GAME_COLUMNS
        ))?;

        let game_iter = stmt.query_map(params![limit, offset], game_from_row)?;

        let mut games = Vec::new();
        for game in game_iter {
            games.push(game?);
        }

        Ok(games)
    }

    pub async fn list_by_user(
        &self,
        email: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<GameRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM games WHERE user_email = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            GAME_COLUMNS
        ))?;

        let game_iter = stmt.query_map(params![email, limit, offset], game_from_row)?;

        let mut games = Vec::new();
        for game in game_iter {
            games.push(game?);
        }

        Ok(games)
    }

    /// Apply `changes` to the row for `game_id`. Returns whether a row changed.
    pub async fn update(&self, game_id: &str, changes: &GameChanges) -> Result<bool> {
        let columns = changes.columns();
        if columns.is_empty() {
            return Ok(false);
        }

        let mut assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect();
        assignments.push(format!("updated_at = ?{}", columns.len() + 1));

        let sql = format!(
            "UPDATE games SET {} WHERE game_id = ?{}",
            assignments.join(", "),
            columns.len() + 2
        );

        let mut values: Vec<Value> = columns.into_iter().map(|(_, value)| value).collect();
        values.push(Value::Integer(Utc::now().timestamp()));
        values.push(Value::Text(game_id.to_string()));

        let conn = self.storage.get_connection().await;
        let updated = conn.execute(&sql, params_from_iter(values))?;

        tracing::debug!("Updated local game {} ({} rows)", game_id, updated);
        Ok(updated > 0)
    }

    pub async fn delete(&self, game_id: &str) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let deleted = conn.execute("DELETE FROM games WHERE game_id = ?1", params![game_id])?;

        Ok(deleted > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;

        Ok(count as u64)
    }

    pub async fn count_by_user(&self, email: &str) -> Result<u64> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM games WHERE user_email = ?1",
            params![email],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }
}
