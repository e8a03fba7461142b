use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::session::{Session, SessionStatus, SessionView};
use crate::models::GenerationJob;

/// In-memory record of every job's observable lifecycle.
///
/// A session transitions from `Processing` to a terminal state at most
/// once; `complete`/`fail` on a terminal or unknown session is a contract
/// violation and is logged and ignored rather than corrupting state.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session in `Processing` state for an admitted job.
    pub async fn open(&self, job: &GenerationJob) {
        let session = Session {
            id: job.id,
            kiosk_id: job.kiosk_id.clone(),
            started_at: job.submitted_at,
            status: SessionStatus::Processing,
            background_id: job.background_id.clone(),
            gender: job.options.gender,
            prominence: job.options.prominence,
            finished_at: None,
            artifact: None,
            error: None,
        };
        self.sessions.write().await.insert(job.id, session);
    }

    /// Transition a processing session to `Completed`.
    pub async fn complete(&self, id: Uuid, artifact: String, end: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if !session.status.is_terminal() => {
                session.status = SessionStatus::Completed;
                session.finished_at = Some(end);
                session.artifact = Some(artifact);
            }
            Some(_) => {
                tracing::warn!("Ignoring complete() on already-terminal session {}", id);
            }
            None => {
                tracing::warn!("Ignoring complete() on unknown session {}", id);
            }
        }
    }

    /// Transition a processing session to `Failed`.
    pub async fn fail(&self, id: Uuid, error: String, end: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if !session.status.is_terminal() => {
                session.status = SessionStatus::Failed;
                session.finished_at = Some(end);
                session.error = Some(error);
            }
            Some(_) => {
                tracing::warn!("Ignoring fail() on already-terminal session {}", id);
            }
            None => {
                tracing::warn!("Ignoring fail() on unknown session {}", id);
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// The `k` most recently started sessions, newest first, with
    /// computed durations.
    pub async fn recent(&self, k: usize) -> Vec<SessionView> {
        let sessions = self.sessions.read().await;
        let mut all: Vec<&Session> = sessions.values().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.into_iter()
            .take(k)
            .map(|s| SessionView::from_session(s.clone()))
            .collect()
    }

    /// Remove every session that started before `cutoff`. Returns the
    /// number removed.
    pub async fn evict_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.started_at >= cutoff);
        before - sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
