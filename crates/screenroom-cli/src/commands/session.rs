//! Shared plumbing for the interview-facing commands: loading and saving
//! the persisted session, choosing the grading backend for its mode, and
//! archiving completed runs.

use std::error::Error;

use chrono::Utc;
use screenroom_core::error::RemoteError;
use screenroom_core::remote::{
    Evaluation, FinalizeRequest, GradeRequest, InterviewService, NextQuestionRequest,
};
use screenroom_core::storage::CandidateRecord;
use screenroom_core::{
    AuthStore, CandidateId, Config, Database, Event, FinalSummary, HttpInterviewClient,
    RehydrationGate, SessionStore, StartupPrompt, TrialInterviewClient,
};

/// The grading backend behind one session: locally simulated for trial
/// ids, the HTTP service (with the account's token) for issued ids.
pub enum Backend {
    Trial(TrialInterviewClient),
    Remote(HttpInterviewClient),
}

impl Backend {
    /// Pick the backend matching the session's current identity. Sessions
    /// without an identity yet get the trial backend.
    pub fn for_store(
        config: &Config,
        store: &SessionStore,
        auth: &AuthStore,
    ) -> Result<Self, Box<dyn Error>> {
        let trial = store
            .candidate_id()
            .as_ref()
            .map_or(true, CandidateId::is_trial);
        if trial {
            return Ok(Backend::Trial(TrialInterviewClient::new(config.trial.seed)));
        }
        let identity = auth.require()?;
        let client = HttpInterviewClient::new(config)?.with_token(identity.token);
        Ok(Backend::Remote(client))
    }
}

impl InterviewService for Backend {
    async fn next_question(&self, request: NextQuestionRequest) -> Result<String, RemoteError> {
        match self {
            Backend::Trial(client) => client.next_question(request).await,
            Backend::Remote(client) => client.next_question(request).await,
        }
    }

    async fn grade_answer(&self, request: GradeRequest) -> Result<Evaluation, RemoteError> {
        match self {
            Backend::Trial(client) => client.grade_answer(request).await,
            Backend::Remote(client) => client.grade_answer(request).await,
        }
    }

    async fn finalize(&self, request: FinalizeRequest) -> Result<FinalSummary, RemoteError> {
        match self {
            Backend::Trial(client) => client.finalize(request).await,
            Backend::Remote(client) => client.finalize(request).await,
        }
    }
}

/// Restore the persisted session, clearing a completed one that has
/// outlived its linger window.
pub fn load_store(db: &Database, config: &Config) -> Result<SessionStore, Box<dyn Error>> {
    let Some(state) = db.load_session()? else {
        return Ok(SessionStore::new());
    };
    let store = SessionStore::load(state);
    let expired = store.with(|state| {
        RehydrationGate::should_clear_completed(
            state,
            Utc::now(),
            config.interview.completed_reset_secs,
        )
    });
    if expired {
        store.reset();
    }
    Ok(store)
}

pub fn save_store(db: &Database, store: &SessionStore) -> Result<(), Box<dyn Error>> {
    db.save_session(&store.snapshot())?;
    Ok(())
}

/// One-shot commands refuse to touch a session stranded by a sign-out;
/// the user decides between logging back in and going on as a guest.
pub fn ensure_not_orphaned(store: &SessionStore, auth: &AuthStore) -> Result<(), Box<dyn Error>> {
    let identity_present = auth.load()?.is_some();
    let prompt = store.with(|state| RehydrationGate::evaluate(state, identity_present));
    if prompt == Some(StartupPrompt::LogoutWarning) {
        return Err("stored session belongs to an account that is signed out; \
             `auth login` to keep it, or `interview continue-as-guest` to \
             keep the transcript under a trial identity"
            .into());
    }
    Ok(())
}

/// Write a just-completed session to the local archive. `None` when the
/// session has not completed.
pub fn archive_completed(
    db: &Database,
    store: &SessionStore,
) -> Result<Option<i64>, Box<dyn Error>> {
    let state = store.snapshot();
    match CandidateRecord::from_completed(&state) {
        Some(record) => Ok(Some(db.record_candidate(&record)?)),
        None => Ok(None),
    }
}

pub fn print_event(event: &Event) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}
