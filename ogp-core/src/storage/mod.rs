pub mod game_store;
pub mod user_store;

pub use game_store::{GameChanges, GameRecord, GameStore, NewGameRecord};
pub use user_store::{UserRecord, UserStore};

use crate::error::{OgpError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

/// Local mirror of the users and games this backend has registered.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OgpError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        tracing::debug!("Opened {} in {} mode", db_path.display(), mode);

        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Users table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                ogp_user_id TEXT UNIQUE,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Games table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id TEXT UNIQUE NOT NULL,
                user_email TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                game_url TEXT NOT NULL,
                platform TEXT,
                points_per_jump INTEGER,
                lives INTEGER,
                image_url TEXT,
                cover_image_url TEXT,
                twitter TEXT,
                discord TEXT,
                telegram TEXT,
                max_score_per_session INTEGER,
                max_sessions_per_day INTEGER,
                max_cumulative_points_per_day INTEGER,
                org_rewards_split TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (user_email) REFERENCES users(email)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_games_user_email ON games(user_email)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_ogp_user_id ON users(ogp_user_id)",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("games.db");

        let storage = Storage::new(&db_path).await.unwrap();
        assert!(db_path.exists());

        let conn = storage.get_connection().await;
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'games')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[tokio::test]
    async fn test_reopen_keeps_schema() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("games.db");

        drop(Storage::new(&db_path).await.unwrap());
        assert!(Storage::new(&db_path).await.is_ok());
    }
}
