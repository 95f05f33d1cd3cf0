//! SQLite content store.
//!
//! Holds extracted documents and analysed persona profiles in a single
//! database file with two tables:
//! - `content` — every extracted document (source, type, text, metadata)
//! - `persona_profile` — one analysis per persona name, upserted

use std::str::FromStr;

use chrono::{DateTime, Utc};
use opentwin_core::{ContentItem, MemoryError, PersonaProfile};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

pub struct ContentStore {
    pool: SqlitePool,
}

impl ContentStore {
    /// Open the database at `path`, creating it and its tables if needed.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn open(path: &str) -> Result<Self, MemoryError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        MemoryError::Storage(format!("Failed to create database directory: {e}"))
                    })?;
                }
            }
            format!("sqlite://{path}")
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // One connection: an in-memory database is private to its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Content store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                source      TEXT NOT NULL,
                source_type TEXT NOT NULL,
                content     TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("content table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS persona_profile (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT UNIQUE NOT NULL,
                analysis    TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("persona_profile table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_content_created_at ON content(created_at DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::MigrationFailed(format!("created_at index: {e}")))?;

        debug!("Content store migrations complete");
        Ok(())
    }

    /// Store one extracted document, returning its row id.
    pub async fn add_content(
        &self,
        source: &str,
        source_type: &str,
        content: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64, MemoryError> {
        let result = sqlx::query(
            "INSERT INTO content (source, source_type, content, metadata, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(source)
        .bind(source_type)
        .bind(content)
        .bind(metadata.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("Failed to insert content: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// All stored content, newest first.
    pub async fn all_content(&self) -> Result<Vec<ContentItem>, MemoryError> {
        let rows = sqlx::query(
            "SELECT id, source, source_type, content, metadata, created_at FROM content ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Failed to read content: {e}")))?;

        rows.iter().map(row_to_item).collect()
    }

    pub async fn content_count(&self) -> Result<usize, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM content")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Failed to count content: {e}")))?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }

    /// Insert or replace the profile stored under `name`.
    pub async fn save_persona_profile(
        &self,
        name: &str,
        profile: &PersonaProfile,
    ) -> Result<(), MemoryError> {
        let analysis = serde_json::to_string(profile)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize profile: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO persona_profile (name, analysis, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET analysis = excluded.analysis, updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(analysis)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("Failed to save persona profile: {e}")))?;

        info!(persona = name, "Persona profile saved");
        Ok(())
    }

    pub async fn persona_profile(&self, name: &str) -> Result<Option<PersonaProfile>, MemoryError> {
        let row = sqlx::query("SELECT analysis FROM persona_profile WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Failed to read persona profile: {e}")))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let analysis: String = row.get("analysis");
                serde_json::from_str(&analysis).map(Some).map_err(|e| {
                    MemoryError::QueryFailed(format!("Corrupted persona profile for {name}: {e}"))
                })
            }
        }
    }

    /// Names of all analysed personas, alphabetical.
    pub async fn persona_names(&self) -> Result<Vec<String>, MemoryError> {
        let rows = sqlx::query("SELECT name FROM persona_profile ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Failed to list personas: {e}")))?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<ContentItem, MemoryError> {
    let metadata: String = row.get("metadata");
    let created_at: String = row.get("created_at");
    Ok(ContentItem {
        id: row.get("id"),
        source: row.get("source"),
        source_type: row.get("source_type"),
        content: row.get("content"),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MemoryError::QueryFailed(format!("Bad timestamp '{created_at}': {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> ContentStore {
        ContentStore::open("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn add_and_list_content() {
        let store = test_store().await;
        let meta = serde_json::json!({"title": "Opening remarks"});
        let first = store.add_content("https://a", "web", "First", &meta).await.unwrap();
        let second = store.add_content("notes.md", "file", "Second", &serde_json::json!({})).await.unwrap();
        assert!(second > first);

        let items = store.all_content().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content, "Second");
        assert_eq!(items[1].metadata["title"], "Opening remarks");
        assert_eq!(store.content_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn persona_profile_upserts() {
        let store = test_store().await;
        assert!(store.persona_profile("Jerome Powell").await.unwrap().is_none());

        let mut profile = PersonaProfile {
            writing_style: "measured".into(),
            content_count: 1,
            ..Default::default()
        };
        store.save_persona_profile("Jerome Powell", &profile).await.unwrap();

        profile.writing_style = "data-dependent".into();
        store.save_persona_profile("Jerome Powell", &profile).await.unwrap();

        let loaded = store.persona_profile("Jerome Powell").await.unwrap().unwrap();
        assert_eq!(loaded.writing_style, "data-dependent");
        assert_eq!(store.persona_names().await.unwrap(), vec!["Jerome Powell"]);
    }

    #[tokio::test]
    async fn empty_database_counts_zero() {
        let store = test_store().await;
        assert_eq!(store.content_count().await.unwrap(), 0);
        assert!(store.all_content().await.unwrap().is_empty());
    }
}
