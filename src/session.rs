//! Document sessions.
//!
//! A session is a handle to a working document that callers can use instead
//! of repeating a file path. Tools only ever see [`SessionStore::resolve`];
//! opening and closing is the job of the `document_session` tool.
//!
//! The store is shared across concurrent requests on network transports and
//! guards its table with an async `RwLock`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::registry::{ToolError, ToolResult};

/// Metadata about one open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SessionInfo {
    /// Opaque session identifier.
    pub session_id: String,
    /// Document file name (directory omitted).
    pub document: String,
    /// When the session was opened.
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    path: PathBuf,
    opened_at: DateTime<Utc>,
}

/// In-memory table of open document sessions.
#[derive(Debug)]
pub struct SessionStore {
    max_sessions: usize,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    /// Creates an empty store holding at most `max_sessions` sessions.
    #[must_use]
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a session for an existing document and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns not-found if the document does not exist, or invalid-argument
    /// if the session limit is reached.
    pub async fn open(&self, path: &Path) -> ToolResult<String> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(ToolError::invalid("path must refer to a file"));
        }

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(ToolError::invalid(format!(
                "session limit of {} reached; close a session first",
                self.max_sessions
            )));
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        sessions.insert(
            session_id.clone(),
            SessionEntry {
                path: path.to_path_buf(),
                opened_at: Utc::now(),
            },
        );
        tracing::debug!(session_id = %session_id, "Session opened");
        Ok(session_id)
    }

    /// Closes a session. Returns `false` if it was not open.
    pub async fn close(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::debug!(session_id = %session_id, "Session closed");
        }
        removed
    }

    /// Lists open sessions ordered by opening time.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .map(|(id, entry)| SessionInfo {
                session_id: id.clone(),
                document: entry
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                opened_at: entry.opened_at,
            })
            .collect();
        infos.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        infos
    }

    /// Resolves a session identifier to its working document.
    ///
    /// # Errors
    ///
    /// Returns not-found for unknown identifiers.
    pub async fn resolve(&self, session_id: &str) -> ToolResult<PathBuf> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.path.clone())
            .ok_or_else(|| ToolError::not_found(format!("session {session_id}")))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_resolve_close() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.txt");
        std::fs::write(&doc, "hello").unwrap();

        let store = SessionStore::new(2);
        let id = store.open(&doc).await.unwrap();
        assert_eq!(store.resolve(&id).await.unwrap(), doc);

        let listed = store.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].document, "notes.txt");

        assert!(store.close(&id).await);
        assert!(!store.close(&id).await);
        assert!(matches!(
            store.resolve(&id).await,
            Err(ToolError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_missing_document_is_not_found() {
        let store = SessionStore::new(2);
        let err = store.open(Path::new("/definitely/not/here.txt")).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn session_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("a.txt");
        std::fs::write(&doc, "a").unwrap();

        let store = SessionStore::new(1);
        store.open(&doc).await.unwrap();
        assert!(matches!(
            store.open(&doc).await,
            Err(ToolError::InvalidArgument(_))
        ));
    }
}
