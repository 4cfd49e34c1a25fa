//! # Screenroom Core Library
//!
//! This library provides the core business logic for the Screenroom
//! technical-interview runner. It implements a CLI-first philosophy where
//! every operation is available via a standalone CLI binary; any richer
//! front end is a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Session Engine**: A versioned state machine for the interview
//!   lifecycle, persisted after every transition so a session survives
//!   process restarts without losing or duplicating answers
//! - **Submission Pipeline**: A single-flight coordinator that grades an
//!   answer, fetches the next question, and finalizes the interview,
//!   discarding results that arrive after a reset
//! - **Remote**: One service trait with two backends, the HTTP client for
//!   the grading API and a locally simulated client for anonymous trials
//! - **Storage**: SQLite-based session and results persistence plus
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionStore`]: Guarded transitions over the interview state
//! - [`SubmissionCoordinator`]: Answer submission and question fetching
//! - [`Database`]: Session snapshot and completed-interview persistence
//! - [`Config`]: Application configuration management
//! - [`remote::InterviewService`]: Trait over the grading backends

pub mod auth;
pub mod candidate;
pub mod difficulty;
pub mod error;
pub mod events;
pub mod remote;
pub mod session;
pub mod storage;
pub mod timer;

pub use auth::{AccountRole, AuthIdentity, AuthStore};
pub use candidate::{CandidateId, Profile, SessionMode};
pub use difficulty::Difficulty;
pub use error::{AuthError, ConfigError, CoreError, DatabaseError, RemoteError};
pub use events::Event;
pub use remote::{Evaluation, HttpInterviewClient, TrialInterviewClient};
pub use session::{
    FinalSummary, ModeReconciler, RehydrationGate, SessionState, SessionStatus, SessionStore,
    StartupPrompt, SubmissionCoordinator, SubmitOutcome,
};
pub use storage::{Config, Database};
pub use timer::CountdownTimer;
