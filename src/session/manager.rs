//! Edit Session Manager
//!
//! Manages edit sessions with:
//! - In-memory session storage behind a `RwLock`
//! - One `Mutex` per session so interactions are applied in order
//! - Automatic idle session cleanup

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::editor::{EditSession, EditorSettings};
use crate::pdf::PageRasterizer;

/// Session lookup and capacity errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Too many open sessions (max: {0})")]
    TooManySessions(usize),
}

impl SessionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Shared handle to one session
pub type SharedSession = Arc<Mutex<EditSession>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: DateTime<Utc>,
}

/// Manages edit sessions
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    /// Active sessions indexed by ID
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,

    /// Settings given to new sessions
    settings: EditorSettings,

    /// Maximum open sessions (0 = unlimited)
    max_sessions: usize,

    /// Idle time after which a session is dropped
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(settings: EditorSettings, max_sessions: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(SessionManagerInner {
                sessions: RwLock::new(HashMap::new()),
                settings,
                max_sessions,
                ttl,
            }),
        }
    }

    // ========================================================================
    // Session Lifecycle
    // ========================================================================

    /// Open a new session over a page source
    pub async fn create(
        &self,
        file_name: &str,
        source: Arc<dyn PageRasterizer>,
    ) -> Result<SharedSession, SessionError> {
        let mut sessions = self.inner.sessions.write().await;

        if self.inner.max_sessions > 0 && sessions.len() >= self.inner.max_sessions {
            return Err(SessionError::TooManySessions(self.inner.max_sessions));
        }

        let id = Uuid::new_v4();
        let page_count = source.page_count();
        let session = Arc::new(Mutex::new(EditSession::new(id, file_name, source, self.inner.settings)));

        sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_seen: Utc::now(),
            },
        );

        tracing::info!(
            session_id = %id,
            file_name = %file_name,
            pages = page_count,
            "Created edit session"
        );

        Ok(session)
    }

    /// Get a session by ID, marking it as recently used
    pub async fn get(&self, id: Uuid) -> Result<SharedSession, SessionError> {
        let mut sessions = self.inner.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.last_seen = Utc::now();
        Ok(entry.session.clone())
    }

    /// Drop a session
    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let removed = self.inner.sessions.write().await.remove(&id);
        if removed.is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        tracing::info!(session_id = %id, "Edit session closed");
        Ok(())
    }

    /// Get session count
    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Drop sessions idle for longer than the TTL
    ///
    /// Returns the number of sessions cleaned up
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_idle_since(Utc::now() - self.inner.ttl).await
    }

    async fn cleanup_idle_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = entry.last_seen >= cutoff;
            if !keep {
                tracing::debug!(session_id = %id, "Cleaned up idle session");
            }
            keep
        });

        let count = before - sessions.len();
        if count > 0 {
            tracing::info!(count = count, "Cleaned up idle edit sessions");
        }
        count
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(300)); // 5 minutes

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(EditorSettings::default(), 0, Duration::hours(2))
    }
}

// ============================================================================
// Tests
// ============================================================================
