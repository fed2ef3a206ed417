//! SQLite-backed project store.
//!
//! Projects are stored as JSON documents in a single table; `INSERT OR
//! REPLACE` keeps each save atomic for the aggregate.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::ProjectStore;
use crate::domain::Project;
use crate::error::{AppError, Result};

pub struct SqliteProjectStore {
    pool: SqlitePool,
}

impl SqliteProjectStore {
    /// Open (creating if missing) a store at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open project store at {}", path.display()))?;

        Self::with_pool(pool).await
    }

    /// In-memory store, used by tests and `--db`-less runs.
    pub async fn open_in_memory() -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").context("Invalid sqlite options")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory project store")?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create projects table")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ProjectStore for SqliteProjectStore {
    async fn load(&self, project_id: &str) -> Result<Project> {
        let row = sqlx::query("SELECT document FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query project")?;

        let row = row.ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))?;
        let document: String = row.get("document");
        let project = serde_json::from_str(&document)
            .map_err(|e| AppError::store(format!("Corrupt project document: {e}")))?;
        Ok(project)
    }

    async fn save(&self, project: &Project) -> Result<()> {
        let document = serde_json::to_string(project)
            .map_err(|e| AppError::store(format!("Unserializable project: {e}")))?;

        sqlx::query(
            "INSERT OR REPLACE INTO projects (id, document, updated_at) VALUES (?, ?, ?)",
        )
        .bind(&project.id)
        .bind(document)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save project")?;

        log::debug!("[STORE] Saved project {} ({})", project.id, project.progress.stage.tag());
        Ok(())
    }

    async fn delete(&self, project_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete project")?;
        Ok(())
    }
}
