//! Read-only access to the panel's SQLite database.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::{ServiceError, UserStore};
use crate::config::DatabaseSettings;
use crate::models::User;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a database wrapper from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the panel database read-only; the panel stays the only writer.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, ServiceError> {
        let options = SqliteConnectOptions::from_str(&settings.url)?.read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to open panel database {}: {}", settings.url, e);
                e
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for Database {
    async fn first_user(&self) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users ORDER BY id ASC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_database() -> Database {
        // A single connection: every new in-memory connection is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, username TEXT, password TEXT, login_secret TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();

        Database::new(pool)
    }

    #[tokio::test]
    async fn first_user_is_lowest_id() {
        let db = memory_database().await;
        for (id, name) in [(7, "ops"), (2, "admin"), (9, "viewer")] {
            sqlx::query("INSERT INTO users (id, username, password) VALUES (?, ?, 'x')")
                .bind(id)
                .bind(name)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let user = db.first_user().await.unwrap();
        assert_eq!(
            user,
            Some(User {
                id: 2,
                username: "admin".to_string()
            })
        );
    }

    #[tokio::test]
    async fn no_users_yields_none() {
        let db = memory_database().await;
        assert_eq!(db.first_user().await.unwrap(), None);
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn missing_table_is_an_error() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db = Database::new(pool);

        assert!(matches!(
            db.first_user().await,
            Err(ServiceError::Database(_))
        ));
    }
}
