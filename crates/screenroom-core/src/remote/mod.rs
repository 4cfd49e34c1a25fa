//! Interview service backends.
//!
//! The trait is the seam between the session machinery and whatever
//! produces questions and grades: the HTTP client in authenticated mode,
//! the locally seeded trial backend in anonymous mode, scripted fakes in
//! tests. Callers are single-threaded; implementations may keep interior
//! state.

mod http;
mod trial;

pub use http::{CandidateRow, HttpInterviewClient, RowRecommendation};
pub use trial::TrialInterviewClient;

use serde::{Deserialize, Serialize};

use crate::candidate::CandidateId;
use crate::difficulty::Difficulty;
use crate::error::RemoteError;
use crate::session::{FinalSummary, QuestionRecord};

/// Grade for one submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skill_tags: Vec<String>,
}

/// Inputs for generating the next question. `history` carries the full
/// transcript so far so the generator can avoid repeats.
#[derive(Debug, Clone)]
pub struct NextQuestionRequest {
    pub candidate_id: CandidateId,
    pub role: String,
    pub difficulty: Difficulty,
    pub history: Vec<QuestionRecord>,
}

#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub candidate_id: CandidateId,
    pub question: String,
    pub answer: String,
}

/// Inputs for producing the final summary. The HTTP backend only needs
/// the id (the server holds the transcript); the trial backend derives
/// its summary from the graded history.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub candidate_id: CandidateId,
    pub history: Vec<QuestionRecord>,
}

#[allow(async_fn_in_trait)]
pub trait InterviewService {
    async fn next_question(&self, request: NextQuestionRequest) -> Result<String, RemoteError>;

    async fn grade_answer(&self, request: GradeRequest) -> Result<Evaluation, RemoteError>;

    async fn finalize(&self, request: FinalizeRequest) -> Result<FinalSummary, RemoteError>;
}
