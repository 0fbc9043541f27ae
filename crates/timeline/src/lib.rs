//! Persisted event timeline — a conventional relational log of
//! interactions, plus a small key/value settings table.
//!
//! One SQLite database file, WAL mode. The timeline is append-only from
//! the application's point of view; queries filter by sender, time
//! range, and authorization and return newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// One interaction in the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub id: i64,
    /// Unique per-platform message identifier.
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    pub sender_name: String,
    /// TEXT, AUDIO, IMAGE, or SYSTEM.
    pub event_type: String,
    pub content_text: String,
    pub media_path: String,
    /// Whether the sender passed the channel allow-list.
    pub authorized: bool,
}

/// Query filter for [`TimelineService::events`]. All fields optional.
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub sender_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub authorized: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct TimelineService {
    pool: SqlitePool,
}

impl TimelineService {
    /// Open (or create) the timeline database at `path`.
    ///
    /// Pass `":memory:"` for an ephemeral database in tests.
    pub async fn new(path: &str) -> Result<Self, TimelineError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| TimelineError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| TimelineError::Storage(format!("Failed to open SQLite: {e}")))?;

        let service = Self { pool };
        service.run_migrations().await?;
        info!("Timeline database initialized at {path}");
        Ok(service)
    }

    async fn run_migrations(&self) -> Result<(), TimelineError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS timeline (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT UNIQUE,
                timestamp DATETIME,
                sender_id TEXT,
                sender_name TEXT,
                event_type TEXT,
                content_text TEXT,
                media_path TEXT,
                authorized BOOLEAN DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TimelineError::MigrationFailed(format!("timeline table: {e}")))?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_timeline_timestamp ON timeline(timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_timeline_sender ON timeline(sender_id)",
            "CREATE INDEX IF NOT EXISTS idx_timeline_authorized ON timeline(authorized)",
        ] {
            sqlx::query(index)
                .execute(&self.pool)
                .await
                .map_err(|e| TimelineError::MigrationFailed(format!("index: {e}")))?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT,
                updated_at DATETIME
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TimelineError::MigrationFailed(format!("settings table: {e}")))?;

        Ok(())
    }

    pub async fn add_event(&self, event: &TimelineEvent) -> Result<(), TimelineError> {
        sqlx::query(
            r#"
            INSERT INTO timeline
                (event_id, timestamp, sender_id, sender_name, event_type,
                 content_text, media_path, authorized)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&event.event_id)
        .bind(event.timestamp)
        .bind(&event.sender_id)
        .bind(&event.sender_name)
        .bind(&event.event_type)
        .bind(&event.content_text)
        .bind(&event.media_path)
        .bind(event.authorized)
        .execute(&self.pool)
        .await
        .map_err(|e| TimelineError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Query events, newest first.
    pub async fn events(&self, filter: &EventFilter) -> Result<Vec<TimelineEvent>, TimelineError> {
        let mut sql = String::from(
            "SELECT id, event_id, timestamp, sender_id, sender_name, event_type, \
             content_text, media_path, authorized FROM timeline WHERE 1=1",
        );
        if filter.sender_id.is_some() {
            sql.push_str(" AND sender_id = ?");
        }
        if filter.start.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if filter.end.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        if filter.authorized.is_some() {
            sql.push_str(" AND authorized = ?");
        }
        sql.push_str(" ORDER BY timestamp DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }
        if filter.offset.is_some() {
            sql.push_str(" OFFSET ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(sender_id) = &filter.sender_id {
            query = query.bind(sender_id);
        }
        if let Some(start) = filter.start {
            query = query.bind(start);
        }
        if let Some(end) = filter.end {
            query = query.bind(end);
        }
        if let Some(authorized) = filter.authorized {
            query = query.bind(authorized);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.bind(offset);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TimelineError::Storage(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| TimelineEvent {
                id: row.get("id"),
                event_id: row.get("event_id"),
                timestamp: row.get("timestamp"),
                sender_id: row.get("sender_id"),
                sender_name: row.get("sender_name"),
                event_type: row.get("event_type"),
                content_text: row.get("content_text"),
                media_path: row.get("media_path"),
                authorized: row.get("authorized"),
            })
            .collect())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, TimelineError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TimelineError::Storage(e.to_string()))?;
        Ok(row.map(|r| r.get("value")))
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), TimelineError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| TimelineError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Whether silent mode is on. Unset means silent (the safe default).
    pub async fn is_silent_mode(&self) -> bool {
        match self.get_setting("silent_mode").await {
            Ok(Some(value)) => value == "true",
            _ => true,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
