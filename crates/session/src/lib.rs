//! Per-conversation session history.
//!
//! One [`Session`] per conversation key ("channel:chat_id"), created
//! lazily on first use. History grows monotonically in memory and on
//! disk; truncation happens only at read time through
//! [`Session::history`]. Persistence is one JSON file per session under
//! `<workspace>/sessions/`; a failed save is logged and the in-memory
//! state stays authoritative until the next successful save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use ferrobot_core::{Role, SessionError};

/// One role-tagged entry in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered message history for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub messages: Vec<SessionMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump the modification timestamp.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(SessionMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
    }

    /// The most recent `max_count` messages, oldest first. Read-only.
    pub fn history(&self, max_count: usize) -> &[SessionMessage] {
        let start = self.messages.len().saturating_sub(max_count);
        &self.messages[start..]
    }
}

/// Loads, caches, and persists [`Session`]s.
///
/// Each key maps to its own `Arc<Mutex<Session>>`, so different
/// conversations proceed concurrently while mutations to one session
/// are serialized.
pub struct SessionStore {
    dir: PathBuf,
    sessions: std::sync::Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// A store rooted at `<workspace>/sessions`.
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            dir: workspace.as_ref().join("sessions"),
            sessions: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached session for `key`, loading it from disk or
    /// creating an empty one. Idempotent; never fails.
    pub fn get_or_create(&self, key: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = sessions.get(key) {
            return session.clone();
        }

        let session = match self.load_from_disk(key) {
            Ok(Some(session)) => session,
            Ok(None) => Session::new(key),
            Err(e) => {
                warn!(key, error = %e, "Failed to load session, starting fresh");
                Session::new(key)
            }
        };

        let session = Arc::new(Mutex::new(session));
        sessions.insert(key.to_string(), session.clone());
        session
    }

    /// Persist a session to its JSON file.
    ///
    /// Writes to a temp file and renames, so a crash mid-write never
    /// leaves a truncated session on disk.
    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        let path = self.path_for(&session.key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        debug!(key = %session.key, messages = session.messages.len(), "Session saved");
        Ok(())
    }

    fn load_from_disk(&self, key: &str) -> Result<Option<Session>, SessionError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        let session = serde_json::from_str(&raw).map_err(|e| SessionError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(session))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Map a conversation key to a safe file name.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        let a = store.get_or_create("cli:default");
        let b = store.get_or_create("cli:default");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn history_returns_most_recent_oldest_first() {
        let mut session = Session::new("cli:default");
        for i in 0..10 {
            session.add_message(Role::User, format!("m{i}"));
        }

        let window = session.history(3);
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m7", "m8", "m9"]);

        // Window larger than history returns everything
        assert_eq!(session.history(100).len(), 10);
        // Read does not mutate
        assert_eq!(session.messages.len(), 10);
    }

    #[tokio::test]
    async fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        {
            let session = store.get_or_create("telegram:42");
            let mut session = session.lock().await;
            session.add_message(Role::User, "hello");
            session.add_message(Role::Assistant, "hi there");
            session.add_message(Role::User, "how are you?");
            store.save(&session).await.unwrap();
        }

        // A fresh store must reload from disk, not from cache.
        let reloaded_store = SessionStore::new(dir.path());
        let session = reloaded_store.get_or_create("telegram:42");
        let session = session.lock().await;
        assert_eq!(session.key, "telegram:42");
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.messages[0].content, "hello");
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert_eq!(session.messages[2].content, "how are you?");
    }

    #[test]
    fn corrupt_file_falls_back_to_fresh_session() {
        let dir = tempfile::tempdir().unwrap();
        let sessions_dir = dir.path().join("sessions");
        std::fs::create_dir_all(&sessions_dir).unwrap();
        std::fs::write(sessions_dir.join("cli_default.json"), "{not json").unwrap();

        let store = SessionStore::new(dir.path());
        let session = store.get_or_create("cli:default");
        assert!(session.try_lock().unwrap().messages.is_empty());
    }

    #[test]
    fn key_sanitization_is_filesystem_safe() {
        assert_eq!(sanitize_key("telegram:42"), "telegram_42");
        assert_eq!(sanitize_key("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_key("plain-key_1.x"), "plain-key_1.x");
    }
}
