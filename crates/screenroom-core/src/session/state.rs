//! Session aggregate: the canonical record of one interview.
//!
//! All fields are mutated exclusively through the transition functions on
//! the session store; this module holds the data shapes, the derived
//! queries, and the invariant checker those transitions must preserve.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, Profile, SessionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Idle,
    PendingInfo,
    Loading,
    InProgress,
    Completed,
    Error,
}

/// One asked question. `answer` is absent exactly while the question is
/// pending; the record is filled in once, on submission, and never edited
/// after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skill_tags: Vec<String>,
}

impl QuestionRecord {
    pub fn asked(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: None,
            score: None,
            feedback: None,
            skill_tags: Vec::new(),
        }
    }

    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// Five-level hiring recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Strong Hire")]
    StrongHire,
    Hire,
    #[serde(rename = "Leaning Hire")]
    LeaningHire,
    #[serde(rename = "Leaning No Hire")]
    LeaningNoHire,
    #[serde(rename = "No Hire")]
    NoHire,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::StrongHire => "Strong Hire",
            Verdict::Hire => "Hire",
            Verdict::LeaningHire => "Leaning Hire",
            Verdict::LeaningNoHire => "Leaning No Hire",
            Verdict::NoHire => "No Hire",
        }
    }

    /// Ladder from a mean score to a verdict, used by the trial backend.
    pub fn for_mean_score(mean: f64) -> Self {
        if mean >= 8.5 {
            Verdict::StrongHire
        } else if mean >= 7.0 {
            Verdict::Hire
        } else if mean >= 5.5 {
            Verdict::LeaningHire
        } else if mean >= 4.0 {
            Verdict::LeaningNoHire
        } else {
            Verdict::NoHire
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub verdict: Verdict,
    pub justification: String,
}

/// Produced once, when the interview completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSummary {
    pub summary: String,
    pub insights: Insights,
    pub recommendation: Recommendation,
    pub final_score: f64,
}

/// The session aggregate. `version` counts committed transitions; `epoch`
/// advances only on full reset and lets in-flight work detect that the
/// session it started against no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub candidate_id: Option<CandidateId>,
    pub status: SessionStatus,
    pub profile: Profile,
    pub history: Vec<QuestionRecord>,
    pub current_question_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<FinalSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            candidate_id: None,
            status: SessionStatus::Idle,
            profile: Profile::default(),
            history: Vec::new(),
            current_question_index: 0,
            error: None,
            final_summary: None,
            completed_at: None,
            version: 0,
            epoch: 0,
        }
    }
}

impl SessionState {
    // ── Queries ──────────────────────────────────────────────────────

    /// The single unanswered record, if any.
    pub fn pending_question(&self) -> Option<&QuestionRecord> {
        self.history.last().filter(|r| !r.is_answered())
    }

    pub fn answered_count(&self) -> usize {
        self.history.iter().filter(|r| r.is_answered()).count()
    }

    pub fn mode(&self) -> Option<SessionMode> {
        self.candidate_id.as_ref().map(CandidateId::mode)
    }

    /// True while the interview can still be picked back up: the statuses
    /// the resume prompt and mode reconciliation act on.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::InProgress | SessionStatus::PendingInfo
        )
    }

    /// Mean of recorded scores over all history entries (unscored entries
    /// contribute 0), rounded to two decimal places. 0 for empty history.
    pub fn final_score(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let total: f64 = self.history.iter().filter_map(|r| r.score).sum();
        let mean = total / self.history.len() as f64;
        (mean * 100.0).round() / 100.0
    }

    /// Verify the aggregate invariants. Transition code asserts this in
    /// debug builds; property tests call it directly.
    pub fn check_invariants(&self) -> Result<(), String> {
        let unanswered = self.history.iter().filter(|r| !r.is_answered()).count();
        if unanswered > 1 {
            return Err(format!("{unanswered} unanswered records in history"));
        }
        if unanswered == 1 && self.history.last().map(|r| r.is_answered()) != Some(false) {
            return Err("unanswered record is not the last history entry".into());
        }
        if self.current_question_index != self.answered_count() {
            return Err(format!(
                "currentQuestionIndex {} != answered count {}",
                self.current_question_index,
                self.answered_count()
            ));
        }
        if self.status == SessionStatus::Completed {
            if self.final_summary.is_none() {
                return Err("completed without a final summary".into());
            }
            if unanswered != 0 {
                return Err("completed with an unanswered record".into());
            }
        }
        Ok(())
    }
}
