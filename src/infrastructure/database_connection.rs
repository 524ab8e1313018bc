// Database connection and pool management
// SQLite via sqlx; the whole persisted state lives in one key-value table.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Opens (and creates when missing) the database behind `database_url`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        if !db_path.starts_with(":memory:") {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("Failed to create database directory {parent:?}"))?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url: {database_url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {database_url}"))?;

        info!("Opened database: {}", database_url);
        Ok(Self { pool })
    }

    /// Opens a database file by path.
    pub async fn open_path(path: &Path) -> Result<Self> {
        Self::new(&format!("sqlite://{}", path.to_string_lossy())).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_kv_store_sql = r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#;

        sqlx::query(create_kv_store_sql)
            .execute(&self.pool)
            .await
            .context("Failed to create kv_store table")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("nested").join("test.db");

        let db = DatabaseConnection::open_path(&db_path).await?;
        db.migrate().await?;
        // migrations are idempotent
        db.migrate().await?;

        assert!(!db.pool().is_closed());
        assert!(db_path.exists());
        Ok(())
    }
}
