//! Startup gate for a persisted session.
//!
//! One pure function decides which prompt, if any, the stored aggregate
//! deserves on load. The logout warning always outranks the resume offer,
//! so a session stranded by a sign-out can never be resumed silently under
//! the wrong identity.

use chrono::{DateTime, TimeDelta, Utc};

use super::state::{SessionState, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPrompt {
    /// The stored session belongs to an account but nobody is signed in:
    /// warn before demoting it to a trial identity.
    LogoutWarning,
    /// A live interview is stored and can be picked back up.
    ResumeInterview,
}

pub struct RehydrationGate;

impl RehydrationGate {
    pub fn evaluate(state: &SessionState, identity_present: bool) -> Option<StartupPrompt> {
        if !state.is_resumable() {
            return None;
        }
        let orphaned = !identity_present
            && state
                .candidate_id
                .as_ref()
                .is_some_and(|id| !id.is_trial());
        if orphaned {
            return Some(StartupPrompt::LogoutWarning);
        }
        Some(StartupPrompt::ResumeInterview)
    }

    /// Whether a completed session has outlived its linger window and
    /// should be cleared back to idle on load.
    pub fn should_clear_completed(
        state: &SessionState,
        now: DateTime<Utc>,
        linger_secs: u64,
    ) -> bool {
        state.status == SessionStatus::Completed
            && state
                .completed_at
                .is_some_and(|at| now - at >= TimeDelta::seconds(linger_secs as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateId;

    fn in_progress(id: CandidateId) -> SessionState {
        SessionState {
            candidate_id: Some(id),
            status: SessionStatus::InProgress,
            ..SessionState::default()
        }
    }

    #[test]
    fn logout_warning_outranks_the_resume_offer() {
        let state = in_progress(CandidateId::Issued("abc123".into()));
        assert_eq!(
            RehydrationGate::evaluate(&state, false),
            Some(StartupPrompt::LogoutWarning)
        );
        // Signed back in, the same session is simply resumable.
        assert_eq!(
            RehydrationGate::evaluate(&state, true),
            Some(StartupPrompt::ResumeInterview)
        );
    }

    #[test]
    fn trial_sessions_never_warn_about_logout() {
        let state = in_progress(CandidateId::new_trial());
        assert_eq!(
            RehydrationGate::evaluate(&state, false),
            Some(StartupPrompt::ResumeInterview)
        );
    }

    #[test]
    fn idle_and_completed_sessions_prompt_nothing() {
        assert_eq!(RehydrationGate::evaluate(&SessionState::default(), false), None);

        let completed = SessionState {
            candidate_id: Some(CandidateId::new_trial()),
            status: SessionStatus::Completed,
            ..SessionState::default()
        };
        assert_eq!(RehydrationGate::evaluate(&completed, true), None);
    }

    #[test]
    fn finished_interviews_do_not_warn_even_when_orphaned() {
        // The transcript is already graded and archived; there is nothing
        // left to resume under the wrong identity.
        let state = SessionState {
            candidate_id: Some(CandidateId::Issued("abc123".into())),
            status: SessionStatus::Completed,
            ..SessionState::default()
        };
        assert_eq!(RehydrationGate::evaluate(&state, false), None);
    }

    #[test]
    fn completed_sessions_clear_after_the_linger_window() {
        let now = Utc::now();
        let state = SessionState {
            status: SessionStatus::Completed,
            completed_at: Some(now - TimeDelta::seconds(10)),
            ..SessionState::default()
        };
        assert!(RehydrationGate::should_clear_completed(&state, now, 3));
        assert!(!RehydrationGate::should_clear_completed(&state, now, 60));

        let live = SessionState::default();
        assert!(!RehydrationGate::should_clear_completed(&live, now, 3));
    }
}
