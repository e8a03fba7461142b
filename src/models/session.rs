use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{Gender, Prominence};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Processing)
    }
}

/// Observable lifecycle record for one job. Mutated exactly once, at the
/// terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub kiosk_id: String,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub background_id: String,
    pub gender: Gender,
    pub prominence: Prominence,
    pub finished_at: Option<DateTime<Utc>>,
    /// Relative URL of the generated artifact, set on completion.
    pub artifact: Option<String>,
    /// Short failure message, set on failure.
    pub error: Option<String>,
}

/// Read model returned by the monitoring endpoint: a session plus its
/// computed duration.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    /// Milliseconds from start to finish; absent while still processing.
    pub duration_ms: Option<i64>,
}

impl SessionView {
    pub fn from_session(session: Session) -> Self {
        let duration_ms = session
            .finished_at
            .map(|end| (end - session.started_at).num_milliseconds());
        Self {
            session,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> Session {
        Session {
            id: Uuid::now_v7(),
            kiosk_id: "kiosk-1".to_string(),
            started_at: Utc::now(),
            status: SessionStatus::Processing,
            background_id: "bg-a".to_string(),
            gender: Gender::Female,
            prominence: Prominence::Medium,
            finished_at: None,
            artifact: None,
            error: None,
        }
    }

    #[test]
    fn test_status_terminal() {
        assert!(!SessionStatus::Processing.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let session = make_session();
        let json = serde_json::to_string(&session).expect("serialize");
        let back: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(session, back);
    }

    #[test]
    fn test_view_duration_absent_while_processing() {
        let view = SessionView::from_session(make_session());
        assert!(view.duration_ms.is_none());
    }

    #[test]
    fn test_view_duration_computed_from_endpoints() {
        let mut session = make_session();
        session.status = SessionStatus::Completed;
        session.finished_at = Some(session.started_at + chrono::Duration::milliseconds(2500));
        let view = SessionView::from_session(session);
        assert_eq!(view.duration_ms, Some(2500));
    }
}
