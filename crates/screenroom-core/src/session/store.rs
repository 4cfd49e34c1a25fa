//! Guarded transitions over the session aggregate.
//!
//! The store is a cheap-to-clone handle (`Rc<RefCell<_>>`) so the
//! submission coordinator, the reconciler, and the interactive runner can
//! all point at the same aggregate on one thread. No method holds the
//! borrow across an await point; async callers re-enter through a fresh
//! call after each suspension.
//!
//! Every command checks its status guard first and returns `None` (or
//! `false`) without touching the state when called out of turn. A
//! successful command is a commit: the version counter advances by one and
//! the aggregate is re-checked against its invariants in debug builds.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;

use crate::candidate::{CandidateId, Profile};
use crate::difficulty::{Difficulty, QUESTION_COUNT};
use crate::events::Event;

use super::state::{FinalSummary, QuestionRecord, SessionState, SessionStatus};

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Rc<RefCell<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a previously persisted aggregate, e.g. on startup.
    pub fn load(state: SessionState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(state)),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionState {
        self.inner.borrow().clone()
    }

    /// Read the aggregate without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.borrow().status
    }

    pub fn epoch(&self) -> u64 {
        self.inner.borrow().epoch
    }

    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    pub fn candidate_id(&self) -> Option<CandidateId> {
        self.inner.borrow().candidate_id.clone()
    }

    /// The unanswered question, as `(ordinal, text)`.
    pub fn pending_question(&self) -> Option<(usize, String)> {
        let state = self.inner.borrow();
        state
            .pending_question()
            .map(|r| (state.current_question_index, r.question.clone()))
    }

    /// One-line description of where the session stands, for status output
    /// and event logs.
    pub fn snapshot_event(&self, remaining_secs: Option<u64>) -> Event {
        let state = self.inner.borrow();
        Event::StateSnapshot {
            status: state.status,
            mode: state.mode(),
            candidate_id: state.candidate_id.as_ref().map(CandidateId::to_wire),
            question_index: state.current_question_index,
            pending_question: state.pending_question().map(|r| r.question.clone()),
            remaining_secs,
            final_score: state.final_summary.as_ref().map(|s| s.final_score),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Open a session under the given identity. Lands in `PendingInfo`
    /// when contact details are still missing, otherwise in `InProgress`
    /// ready for the first question fetch.
    pub fn establish(&self, candidate_id: CandidateId, profile: Profile) -> Option<Event> {
        self.transition(|state| {
            if state.status != SessionStatus::Idle {
                return None;
            }
            let wire = candidate_id.to_wire();
            state.candidate_id = Some(candidate_id);
            state.status = if profile.is_complete() {
                SessionStatus::InProgress
            } else {
                SessionStatus::PendingInfo
            };
            state.profile = profile;
            Some(Event::SessionOpened {
                candidate_id: wire,
                status: state.status,
                at: Utc::now(),
            })
        })
    }

    /// Merge collected contact fields into the profile. Each merge is a
    /// commit; the event fires only when the profile first becomes
    /// complete, which also moves the session to `InProgress`.
    pub fn complete_profile(
        &self,
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        role: Option<String>,
    ) -> Option<Event> {
        let mut state = self.inner.borrow_mut();
        if state.status != SessionStatus::PendingInfo {
            return None;
        }
        state.profile.merge(name, email, phone, role);
        let event = if state.profile.is_complete() {
            state.status = SessionStatus::InProgress;
            Some(Event::ProfileCompleted { at: Utc::now() })
        } else {
            None
        };
        Self::commit(&mut state);
        event
    }

    /// Mark a question fetch as outstanding. Refused while a question is
    /// already pending or the interview has asked its full complement.
    /// Allowed from `Error` so a failed fetch can be retried; the retry
    /// clears the recorded error.
    pub fn begin_fetch(&self) -> bool {
        self.transition_quiet(|state| {
            let fetchable = matches!(
                state.status,
                SessionStatus::InProgress | SessionStatus::Error
            );
            if !fetchable
                || state.pending_question().is_some()
                || state.history.len() >= QUESTION_COUNT
            {
                return false;
            }
            state.error = None;
            state.status = SessionStatus::Loading;
            true
        })
    }

    /// Append the fetched question as the new pending record.
    pub fn question_fetched(&self, question: impl Into<String>) -> Option<Event> {
        self.transition(|state| {
            if state.status != SessionStatus::Loading
                || state.pending_question().is_some()
                || state.history.len() >= QUESTION_COUNT
            {
                return None;
            }
            state.history.push(QuestionRecord::asked(question));
            state.status = SessionStatus::InProgress;
            let question_index = state.history.len() - 1;
            Some(Event::QuestionAsked {
                question_index,
                difficulty: Difficulty::for_index(question_index),
                at: Utc::now(),
            })
        })
    }

    pub fn fetch_failed(&self, message: impl Into<String>) -> Option<Event> {
        self.transition(|state| {
            if state.status != SessionStatus::Loading {
                return None;
            }
            Some(Self::errored(state, message.into()))
        })
    }

    /// Fill the pending record with the submitted answer and its grade,
    /// and advance the question ordinal. The record is never edited again.
    /// Allowed from `Error` so a failed submission can be retried.
    pub fn answer_graded(
        &self,
        answer: impl Into<String>,
        score: f64,
        feedback: impl Into<String>,
        skill_tags: Vec<String>,
    ) -> Option<Event> {
        self.transition(|state| {
            let gradeable = matches!(
                state.status,
                SessionStatus::InProgress | SessionStatus::Error
            );
            if !gradeable || state.pending_question().is_none() {
                return None;
            }
            let question_index = state.current_question_index;
            // Guard above proved the last record exists and is unanswered.
            if let Some(record) = state.history.last_mut() {
                record.answer = Some(answer.into());
                record.score = Some(score);
                record.feedback = Some(feedback.into());
                record.skill_tags = skill_tags;
            }
            state.current_question_index += 1;
            state.error = None;
            state.status = SessionStatus::InProgress;
            Some(Event::AnswerGraded {
                question_index,
                score,
                at: Utc::now(),
            })
        })
    }

    pub fn submission_failed(&self, message: impl Into<String>) -> Option<Event> {
        self.transition(|state| {
            let active = matches!(
                state.status,
                SessionStatus::InProgress | SessionStatus::Error
            );
            if !active || state.pending_question().is_none() {
                return None;
            }
            Some(Self::errored(state, message.into()))
        })
    }

    /// Mark the summary fetch as outstanding. Only legal once every
    /// question has been answered. Allowed from `Error` so a failed
    /// finalize can be retried.
    pub fn begin_finalize(&self) -> bool {
        self.transition_quiet(|state| {
            let finalizable = matches!(
                state.status,
                SessionStatus::InProgress | SessionStatus::Error
            );
            if !finalizable
                || state.pending_question().is_some()
                || state.answered_count() < QUESTION_COUNT
            {
                return false;
            }
            state.error = None;
            state.status = SessionStatus::Loading;
            true
        })
    }

    pub fn finalized(&self, mut summary: FinalSummary) -> Option<Event> {
        self.transition(|state| {
            if state.status != SessionStatus::Loading || state.answered_count() < QUESTION_COUNT {
                return None;
            }
            // The aggregate score is derived from the recorded grades; the
            // backend's figure is advisory.
            summary.final_score = state.final_score();
            let final_score = summary.final_score;
            let verdict = summary.recommendation.verdict;
            state.final_summary = Some(summary);
            state.completed_at = Some(Utc::now());
            state.status = SessionStatus::Completed;
            Some(Event::InterviewCompleted {
                final_score,
                verdict,
                at: Utc::now(),
            })
        })
    }

    pub fn finalize_failed(&self, message: impl Into<String>) -> Option<Event> {
        self.transition(|state| {
            if state.status != SessionStatus::Loading || state.answered_count() < QUESTION_COUNT {
                return None;
            }
            Some(Self::errored(state, message.into()))
        })
    }

    /// Wholesale return to `Idle`. History, summary, and error are
    /// discarded; the epoch advances so in-flight work started against the
    /// old session discards its result instead of landing here.
    pub fn reset(&self) -> Event {
        let mut state = self.inner.borrow_mut();
        *state = SessionState {
            version: state.version,
            epoch: state.epoch + 1,
            ..SessionState::default()
        };
        Self::commit(&mut state);
        Event::SessionReset { at: Utc::now() }
    }

    /// Re-home a trial session under a server-issued identity. History is
    /// not touched, so nothing is lost or duplicated by signing in.
    pub fn link_account(&self, issued: CandidateId) -> Option<Event> {
        self.transition(|state| {
            let trial = state
                .candidate_id
                .as_ref()
                .is_some_and(CandidateId::is_trial);
            if !trial || issued.is_trial() {
                return None;
            }
            let wire = issued.to_wire();
            state.candidate_id = Some(issued);
            Some(Event::AccountLinked {
                candidate_id: wire,
                at: Utc::now(),
            })
        })
    }

    /// Demote to a fresh trial identity after logout. History is not
    /// touched; only the identity changes.
    pub fn revert_to_trial(&self) -> Option<Event> {
        self.transition(|state| {
            let issued = state
                .candidate_id
                .as_ref()
                .is_some_and(|id| !id.is_trial());
            if !issued {
                return None;
            }
            let replacement = CandidateId::new_trial();
            let wire = replacement.to_wire();
            state.candidate_id = Some(replacement);
            Some(Event::RevertedToTrial {
                candidate_id: wire,
                at: Utc::now(),
            })
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn transition(&self, f: impl FnOnce(&mut SessionState) -> Option<Event>) -> Option<Event> {
        let mut state = self.inner.borrow_mut();
        let event = f(&mut state)?;
        Self::commit(&mut state);
        Some(event)
    }

    fn transition_quiet(&self, f: impl FnOnce(&mut SessionState) -> bool) -> bool {
        let mut state = self.inner.borrow_mut();
        if !f(&mut state) {
            return false;
        }
        Self::commit(&mut state);
        true
    }

    fn commit(state: &mut SessionState) {
        state.version += 1;
        debug_assert_eq!(state.check_invariants(), Ok(()));
    }

    fn errored(state: &mut SessionState, message: String) -> Event {
        state.status = SessionStatus::Error;
        state.error = Some(message.clone());
        Event::SessionErrored {
            message,
            at: Utc::now(),
        }
    }
}
