//! Single-flight answer submission.
//!
//! Grading, advancing the aggregate, and fetching the follow-up question
//! (or the final summary) happen under one in-flight guard, taken before
//! the first await. A second submission arriving while the guard is held
//! observes `InFlight` and does nothing, so double-entry from a countdown
//! expiring mid-submit cannot grade the same answer twice.
//!
//! The guard is not part of the persisted aggregate. A process restart
//! starts unguarded; the epoch captured at acquisition is what protects
//! the store from results that outlive a reset.

use std::cell::Cell;

use tracing::warn;

use crate::candidate::CandidateId;
use crate::difficulty::{Difficulty, QUESTION_COUNT};
use crate::remote::{FinalizeRequest, GradeRequest, InterviewService, NextQuestionRequest};

use super::state::SessionState;
use super::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Answer graded; the next question is pending.
    Advanced,
    /// Answer graded; the interview completed with a final summary.
    Finalized,
    /// Another call holds the guard. Nothing happened.
    InFlight,
    /// There is no unanswered question to submit against.
    NoPendingQuestion,
    /// The session was reset while the call was outstanding; the result
    /// was discarded.
    Stale,
    /// A remote call failed; the session moved to `Error`.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A new question is pending.
    Asked,
    /// Another call holds the guard. Nothing happened.
    InFlight,
    /// The session has no room for a fetch right now.
    NotFetchable,
    /// The session was reset while the fetch was outstanding.
    Stale,
    /// The fetch failed; the session moved to `Error`.
    Failed,
}

pub struct SubmissionCoordinator {
    store: SessionStore,
    in_flight: Cell<bool>,
}

impl SubmissionCoordinator {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            in_flight: Cell::new(false),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Grade `answer` against the pending question, fill the record, and
    /// advance: fetch the next question, or finalize after the last one.
    /// All of it runs under the in-flight guard.
    pub async fn submit(&self, service: &impl InterviewService, answer: &str) -> SubmitOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return SubmitOutcome::InFlight;
        };
        let epoch = self.store.epoch();
        let Some((_, question)) = self.store.pending_question() else {
            return SubmitOutcome::NoPendingQuestion;
        };
        let Some(candidate_id) = self.store.candidate_id() else {
            return SubmitOutcome::NoPendingQuestion;
        };

        let graded = service
            .grade_answer(GradeRequest {
                candidate_id: candidate_id.clone(),
                question,
                answer: answer.to_string(),
            })
            .await;

        if self.store.epoch() != epoch {
            return SubmitOutcome::Stale;
        }
        let evaluation = match graded {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!(error = %err, "answer grading failed");
                self.store.submission_failed(err.to_string());
                return SubmitOutcome::Failed;
            }
        };

        if self
            .store
            .answer_graded(
                answer,
                evaluation.score,
                evaluation.feedback,
                evaluation.skill_tags,
            )
            .is_none()
        {
            return SubmitOutcome::Stale;
        }

        if self.store.with(SessionState::answered_count) < QUESTION_COUNT {
            match self.fetch_locked(service, epoch, candidate_id).await {
                FetchOutcome::Asked => SubmitOutcome::Advanced,
                FetchOutcome::Stale => SubmitOutcome::Stale,
                _ => SubmitOutcome::Failed,
            }
        } else {
            self.finalize_locked(service, epoch, candidate_id).await
        }
    }

    /// Fetch the next question outside a submission, e.g. right after the
    /// session is established or resumed. Shares the submit guard.
    pub async fn fetch_question(&self, service: &impl InterviewService) -> FetchOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return FetchOutcome::InFlight;
        };
        let epoch = self.store.epoch();
        let Some(candidate_id) = self.store.candidate_id() else {
            return FetchOutcome::NotFetchable;
        };
        self.fetch_locked(service, epoch, candidate_id).await
    }

    /// Finalize outside a submission, for retrying after the completion
    /// call itself failed. Returns `Stale` when the session is not ready
    /// to finalize (or was reset mid-call).
    pub async fn finalize(&self, service: &impl InterviewService) -> SubmitOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return SubmitOutcome::InFlight;
        };
        let epoch = self.store.epoch();
        let Some(candidate_id) = self.store.candidate_id() else {
            return SubmitOutcome::Stale;
        };
        self.finalize_locked(service, epoch, candidate_id).await
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn fetch_locked(
        &self,
        service: &impl InterviewService,
        epoch: u64,
        candidate_id: CandidateId,
    ) -> FetchOutcome {
        if !self.store.begin_fetch() {
            return FetchOutcome::NotFetchable;
        }
        let (role, difficulty, history) = self.store.with(|state| {
            (
                state.profile.role.clone(),
                Difficulty::for_index(state.history.len()),
                state.history.clone(),
            )
        });

        let fetched = service
            .next_question(NextQuestionRequest {
                candidate_id,
                role,
                difficulty,
                history,
            })
            .await;

        if self.store.epoch() != epoch {
            return FetchOutcome::Stale;
        }
        match fetched {
            Ok(question) => match self.store.question_fetched(question) {
                Some(_) => FetchOutcome::Asked,
                None => FetchOutcome::Stale,
            },
            Err(err) => {
                warn!(error = %err, "question fetch failed");
                self.store.fetch_failed(err.to_string());
                FetchOutcome::Failed
            }
        }
    }

    async fn finalize_locked(
        &self,
        service: &impl InterviewService,
        epoch: u64,
        candidate_id: CandidateId,
    ) -> SubmitOutcome {
        if !self.store.begin_finalize() {
            return SubmitOutcome::Stale;
        }
        let history = self.store.with(|state| state.history.clone());
        let finalized = service
            .finalize(FinalizeRequest {
                candidate_id,
                history,
            })
            .await;

        if self.store.epoch() != epoch {
            return SubmitOutcome::Stale;
        }
        match finalized {
            Ok(summary) => match self.store.finalized(summary) {
                Some(_) => SubmitOutcome::Finalized,
                None => SubmitOutcome::Stale,
            },
            Err(err) => {
                warn!(error = %err, "interview completion failed");
                self.store.finalize_failed(err.to_string());
                SubmitOutcome::Failed
            }
        }
    }
}

/// Releases the in-flight flag on every exit path, early returns and
/// errors included.
struct InFlightGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;
    use crate::candidate::{CandidateId, Profile};
    use crate::error::RemoteError;
    use crate::remote::Evaluation;
    use crate::session::state::{
        FinalSummary, Insights, Recommendation, SessionStatus, Verdict,
    };

    struct ScriptedService {
        grade_delay_ms: u64,
        grade_calls: Cell<usize>,
        question_calls: Cell<usize>,
        grades: RefCell<VecDeque<Result<Evaluation, RemoteError>>>,
        finalizes: RefCell<VecDeque<Result<FinalSummary, RemoteError>>>,
    }

    impl ScriptedService {
        fn new() -> Self {
            Self::with_grade_delay(0)
        }

        fn with_grade_delay(ms: u64) -> Self {
            Self {
                grade_delay_ms: ms,
                grade_calls: Cell::new(0),
                question_calls: Cell::new(0),
                grades: RefCell::new(VecDeque::new()),
                finalizes: RefCell::new(VecDeque::new()),
            }
        }

        fn push_grade(&self, grade: Result<Evaluation, RemoteError>) {
            self.grades.borrow_mut().push_back(grade);
        }

        fn push_finalize(&self, summary: Result<FinalSummary, RemoteError>) {
            self.finalizes.borrow_mut().push_back(summary);
        }
    }

    impl InterviewService for ScriptedService {
        async fn next_question(
            &self,
            request: NextQuestionRequest,
        ) -> Result<String, RemoteError> {
            self.question_calls.set(self.question_calls.get() + 1);
            Ok(format!("Q{}", request.history.len()))
        }

        async fn grade_answer(&self, _request: GradeRequest) -> Result<Evaluation, RemoteError> {
            self.grade_calls.set(self.grade_calls.get() + 1);
            if self.grade_delay_ms > 0 {
                sleep(Duration::from_millis(self.grade_delay_ms)).await;
            }
            self.grades.borrow_mut().pop_front().unwrap_or_else(|| {
                Ok(Evaluation {
                    score: 8.0,
                    feedback: "ok".into(),
                    skill_tags: Vec::new(),
                })
            })
        }

        async fn finalize(&self, _request: FinalizeRequest) -> Result<FinalSummary, RemoteError> {
            self.finalizes.borrow_mut().pop_front().unwrap_or_else(|| {
                Ok(FinalSummary {
                    summary: "done".into(),
                    insights: Insights::default(),
                    recommendation: Recommendation {
                        verdict: Verdict::Hire,
                        justification: "steady".into(),
                    },
                    final_score: 8.0,
                })
            })
        }
    }

    fn started_store() -> SessionStore {
        let store = SessionStore::new();
        store.establish(
            CandidateId::new_trial(),
            Profile {
                name: Some("Ada".into()),
                email: Some("ada@example.com".into()),
                phone: Some("555-0100".into()),
                role: "Full Stack Developer".into(),
            },
        );
        store
    }

    #[tokio::test]
    async fn submit_grades_and_fetches_the_next_question() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::new();

        assert_eq!(
            coordinator.fetch_question(&service).await,
            FetchOutcome::Asked
        );
        assert_eq!(
            coordinator.submit(&service, "indexes speed up lookups").await,
            SubmitOutcome::Advanced
        );

        let state = store.snapshot();
        assert_eq!(state.history.len(), 2);
        assert_eq!(
            state.history[0].answer.as_deref(),
            Some("indexes speed up lookups")
        );
        assert_eq!(state.history[0].score, Some(8.0));
        assert!(!state.history[1].is_answered());
        assert_eq!(state.current_question_index, 1);
        assert!(!coordinator.is_in_flight());
    }

    #[tokio::test]
    async fn second_submit_is_refused_while_the_first_holds_the_guard() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::with_grade_delay(10);
        coordinator.fetch_question(&service).await;

        let (first, second) = tokio::join!(
            coordinator.submit(&service, "first answer"),
            coordinator.submit(&service, "second answer"),
        );
        assert_eq!(first, SubmitOutcome::Advanced);
        assert_eq!(second, SubmitOutcome::InFlight);
        assert_eq!(service.grade_calls.get(), 1);

        // Exactly one record got the answer.
        let state = store.snapshot();
        assert_eq!(state.answered_count(), 1);
        assert_eq!(state.history[0].answer.as_deref(), Some("first answer"));

        // The guard is free again afterwards.
        assert!(!coordinator.is_in_flight());
        assert_eq!(
            coordinator.submit(&service, "third answer").await,
            SubmitOutcome::Advanced
        );
    }

    #[tokio::test]
    async fn reset_while_grading_discards_the_result() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::with_grade_delay(20);
        coordinator.fetch_question(&service).await;

        let (outcome, _) = tokio::join!(coordinator.submit(&service, "late answer"), async {
            sleep(Duration::from_millis(5)).await;
            store.reset();
        });
        assert_eq!(outcome, SubmitOutcome::Stale);

        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.history.is_empty());
        assert!(!coordinator.is_in_flight());
    }

    #[tokio::test]
    async fn grading_failure_moves_the_session_to_error() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::new();
        coordinator.fetch_question(&service).await;

        service.push_grade(Err(RemoteError::Api {
            status: 500,
            message: "grader offline".into(),
        }));
        assert_eq!(
            coordinator.submit(&service, "an answer").await,
            SubmitOutcome::Failed
        );

        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::Error);
        assert!(state.error.is_some());
        // The pending question survives, unanswered.
        assert_eq!(state.answered_count(), 0);
        assert_eq!(state.history.len(), 1);
    }

    #[tokio::test]
    async fn last_answer_finalizes_under_the_same_guard() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::new();
        coordinator.fetch_question(&service).await;

        for i in 0..QUESTION_COUNT - 1 {
            assert_eq!(
                coordinator.submit(&service, &format!("answer {i}")).await,
                SubmitOutcome::Advanced
            );
        }
        assert_eq!(
            coordinator.submit(&service, "final answer").await,
            SubmitOutcome::Finalized
        );

        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::Completed);
        assert_eq!(state.answered_count(), QUESTION_COUNT);
        assert!(state.final_summary.is_some());
        assert_eq!(service.question_calls.get(), QUESTION_COUNT);
        assert_eq!(service.grade_calls.get(), QUESTION_COUNT);
    }

    #[tokio::test]
    async fn failed_grading_can_be_retried_with_the_same_answer() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::new();
        coordinator.fetch_question(&service).await;

        service.push_grade(Err(RemoteError::Api {
            status: 502,
            message: "bad gateway".into(),
        }));
        assert_eq!(
            coordinator.submit(&service, "the answer").await,
            SubmitOutcome::Failed
        );
        assert_eq!(store.status(), SessionStatus::Error);

        // Retry with the grader back: the same pending question takes
        // the answer and the session recovers.
        assert_eq!(
            coordinator.submit(&service, "the answer").await,
            SubmitOutcome::Advanced
        );
        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::InProgress);
        assert!(state.error.is_none());
        assert_eq!(state.history[0].answer.as_deref(), Some("the answer"));
    }

    #[tokio::test]
    async fn failed_finalize_can_be_retried_on_its_own() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::new();
        coordinator.fetch_question(&service).await;

        for i in 0..QUESTION_COUNT - 1 {
            coordinator.submit(&service, &format!("answer {i}")).await;
        }
        service.push_finalize(Err(RemoteError::Api {
            status: 500,
            message: "summarizer offline".into(),
        }));
        assert_eq!(
            coordinator.submit(&service, "final answer").await,
            SubmitOutcome::Failed
        );
        // All six answers are graded; only the summary is missing.
        assert_eq!(store.status(), SessionStatus::Error);
        assert_eq!(store.with(SessionState::answered_count), QUESTION_COUNT);

        assert_eq!(coordinator.finalize(&service).await, SubmitOutcome::Finalized);
        let state = store.snapshot();
        assert_eq!(state.status, SessionStatus::Completed);
        assert!(state.final_summary.is_some());
    }

    #[tokio::test]
    async fn submit_without_a_pending_question_is_refused() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::new();

        assert_eq!(
            coordinator.submit(&service, "eager answer").await,
            SubmitOutcome::NoPendingQuestion
        );
        assert_eq!(service.grade_calls.get(), 0);
    }

    #[tokio::test]
    async fn fetch_is_refused_while_a_question_is_pending() {
        let store = started_store();
        let coordinator = SubmissionCoordinator::new(store.clone());
        let service = ScriptedService::new();

        assert_eq!(
            coordinator.fetch_question(&service).await,
            FetchOutcome::Asked
        );
        assert_eq!(
            coordinator.fetch_question(&service).await,
            FetchOutcome::NotFetchable
        );
        assert_eq!(store.snapshot().history.len(), 1);
    }
}
