use crate::error::{OgpError, Result};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub ogp_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, email, ogp_user_id, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        ogp_user_id: row.get(2)?,
        created_at: DateTime::from_timestamp(row.get(3)?, 0).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp(row.get(4)?, 0).unwrap_or_else(Utc::now),
    })
}

pub struct UserStore<'a> {
    storage: &'a Storage,
}

impl<'a> UserStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Return the user with `email`, inserting a row on first sight.
    pub async fn get_or_create(&self, email: &str) -> Result<UserRecord> {
        let conn = self.storage.get_connection().await;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT OR IGNORE INTO users (email, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![email, now],
        )?;
        if conn.changes() > 0 {
            tracing::info!("Created local user {}", email);
        }

        let user = conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            params![email],
            user_from_row,
        )?;

        Ok(user)
    }

    pub async fn update_ogp_user_id(&self, email: &str, ogp_user_id: &str) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let updated = conn.execute(
            "UPDATE users SET ogp_user_id = ?1, updated_at = ?2 WHERE email = ?3",
            params![ogp_user_id, Utc::now().timestamp(), email],
        )?;

        if updated == 0 {
            return Err(OgpError::UserNotFound {
                email: email.to_string(),
            });
        }

        tracing::info!("Linked {} to OGP user {}", email, ogp_user_id);
        Ok(())
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let conn = self.storage.get_connection().await;

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    pub async fn get_by_ogp_user_id(&self, ogp_user_id: &str) -> Result<Option<UserRecord>> {
        let conn = self.storage.get_connection().await;

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE ogp_user_id = ?1", USER_COLUMNS),
                params![ogp_user_id],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
            USER_COLUMNS
        ))?;

        let user_iter = stmt.query_map([], user_from_row)?;

        let mut users = Vec::new();
        for user in user_iter {
            users.push(user?);
        }

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage() -> (tempfile::TempDir, Storage) {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("games.db")).await.unwrap();
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (_dir, storage) = storage().await;
        let users = UserStore::new(&storage);

        let first = users.get_or_create("dev@example.com").await.unwrap();
        let second = users.get_or_create("dev@example.com").await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.ogp_user_id.is_none());
        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_link_ogp_identity() {
        let (_dir, storage) = storage().await;
        let users = UserStore::new(&storage);

        users.get_or_create("dev@example.com").await.unwrap();
        users
            .update_ogp_user_id("dev@example.com", "ogp-user-7")
            .await
            .unwrap();

        let by_email = users.get_by_email("dev@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.ogp_user_id.as_deref(), Some("ogp-user-7"));

        let by_id = users.get_by_ogp_user_id("ogp-user-7").await.unwrap().unwrap();
        assert_eq!(by_id.email, "dev@example.com");
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let (_dir, storage) = storage().await;
        let users = UserStore::new(&storage);

        let result = users.update_ogp_user_id("ghost@example.com", "ogp-1").await;
        assert!(matches!(result, Err(OgpError::UserNotFound { .. })));
        assert!(users.get_by_email("ghost@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ogp_identity_is_unique() {
        let (_dir, storage) = storage().await;
        let users = UserStore::new(&storage);

        users.get_or_create("a@example.com").await.unwrap();
        users.get_or_create("b@example.com").await.unwrap();
        users.update_ogp_user_id("a@example.com", "ogp-1").await.unwrap();

        let clash = users.update_ogp_user_id("b@example.com", "ogp-1").await;
        assert!(matches!(clash, Err(OgpError::Storage(_))));
    }
}
