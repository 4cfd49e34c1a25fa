use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::SessionMode;
use crate::difficulty::Difficulty;
use crate::session::{SessionStatus, Verdict};

/// Every committed session transition produces an Event. The CLI prints
/// them as JSON; tests assert on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionOpened {
        candidate_id: String,
        status: SessionStatus,
        at: DateTime<Utc>,
    },
    ProfileCompleted {
        at: DateTime<Utc>,
    },
    QuestionAsked {
        question_index: usize,
        difficulty: Difficulty,
        at: DateTime<Utc>,
    },
    AnswerGraded {
        question_index: usize,
        score: f64,
        at: DateTime<Utc>,
    },
    InterviewCompleted {
        final_score: f64,
        verdict: Verdict,
        at: DateTime<Utc>,
    },
    SessionErrored {
        message: String,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    /// Trial session persisted under a server-issued identity.
    AccountLinked {
        candidate_id: String,
        at: DateTime<Utc>,
    },
    /// Authenticated session demoted to a fresh trial identity after logout.
    RevertedToTrial {
        candidate_id: String,
        at: DateTime<Utc>,
    },
    /// The per-question countdown reached zero.
    CountdownExpired {
        question_index: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: SessionStatus,
        mode: Option<SessionMode>,
        candidate_id: Option<String>,
        question_index: usize,
        pending_question: Option<String>,
        remaining_secs: Option<u64>,
        final_score: Option<f64>,
        at: DateTime<Utc>,
    },
}
