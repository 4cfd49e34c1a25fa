//! Interview session lifecycle: the state aggregate, its guarded
//! transitions, single-flight answer submission, identity reconciliation,
//! and startup rehydration.

mod reconcile;
mod rehydrate;
mod state;
mod store;
mod submission;

pub use reconcile::{ModeReconciler, ReconcileAction};
pub use rehydrate::{RehydrationGate, StartupPrompt};
pub use state::{
    FinalSummary, Insights, QuestionRecord, Recommendation, SessionState, SessionStatus, Verdict,
};
pub use store::SessionStore;
pub use submission::{FetchOutcome, SubmissionCoordinator, SubmitOutcome};

/// Substituted answer when the countdown expires with nothing typed.
pub const FALLBACK_ANSWER: &str = "(No answer provided - time expired)";
