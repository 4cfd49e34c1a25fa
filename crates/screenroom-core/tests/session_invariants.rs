//! Property tests for the session aggregate.
//!
//! Random command sequences are thrown at the store; whatever order they
//! arrive in, the aggregate invariants must hold after every command,
//! refused commands must leave the state untouched, and the version must
//! advance exactly once per accepted command.

use proptest::prelude::*;

use screenroom_core::candidate::{CandidateId, Profile};
use screenroom_core::session::{
    FinalSummary, Insights, Recommendation, SessionState, SessionStore, Verdict,
};

#[derive(Debug, Clone)]
enum Command {
    Establish { complete_profile: bool },
    CompleteProfile { with_all_fields: bool },
    BeginFetch,
    QuestionFetched,
    AnswerGraded { score: f64 },
    BeginFinalize,
    Finalized { score: f64 },
    FetchFailed,
    SubmissionFailed,
    FinalizeFailed,
    Reset,
    LinkAccount,
    RevertToTrial,
}

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        any::<bool>().prop_map(|complete_profile| Command::Establish { complete_profile }),
        any::<bool>().prop_map(|with_all_fields| Command::CompleteProfile { with_all_fields }),
        Just(Command::BeginFetch),
        Just(Command::QuestionFetched),
        (0.0f64..10.0).prop_map(|score| Command::AnswerGraded { score }),
        Just(Command::BeginFinalize),
        (0.0f64..10.0).prop_map(|score| Command::Finalized { score }),
        Just(Command::FetchFailed),
        Just(Command::SubmissionFailed),
        Just(Command::FinalizeFailed),
        Just(Command::Reset),
        Just(Command::LinkAccount),
        Just(Command::RevertToTrial),
    ]
}

fn full_profile() -> Profile {
    Profile {
        name: Some("Ada Lovelace".into()),
        email: Some("ada@example.com".into()),
        phone: Some("555-0100".into()),
        role: "Full Stack Developer".into(),
    }
}

fn summary(score: f64) -> FinalSummary {
    FinalSummary {
        summary: "done".into(),
        insights: Insights::default(),
        recommendation: Recommendation {
            verdict: Verdict::for_mean_score(score),
            justification: "generated".into(),
        },
        final_score: score,
    }
}

/// Apply one command; `true` when the store accepted it.
fn apply(store: &SessionStore, command: &Command) -> bool {
    match command {
        Command::Establish { complete_profile } => {
            let profile = if *complete_profile {
                full_profile()
            } else {
                Profile::default()
            };
            store.establish(CandidateId::new_trial(), profile).is_some()
        }
        Command::CompleteProfile { with_all_fields } => {
            let before = store.version();
            if *with_all_fields {
                let p = full_profile();
                store.complete_profile(p.name, p.email, p.phone, Some(p.role));
            } else {
                store.complete_profile(Some("Ada".into()), None, None, None);
            }
            // Merges commit even when no event fires.
            store.version() != before
        }
        Command::BeginFetch => store.begin_fetch(),
        Command::QuestionFetched => store.question_fetched("What is a primary key?").is_some(),
        Command::AnswerGraded { score } => store
            .answer_graded("An answer.", *score, "noted", vec![])
            .is_some(),
        Command::BeginFinalize => store.begin_finalize(),
        Command::Finalized { score } => store.finalized(summary(*score)).is_some(),
        Command::FetchFailed => store.fetch_failed("network down").is_some(),
        Command::SubmissionFailed => store.submission_failed("network down").is_some(),
        Command::FinalizeFailed => store.finalize_failed("network down").is_some(),
        Command::Reset => {
            store.reset();
            true
        }
        Command::LinkAccount => store
            .link_account(CandidateId::Issued("665f1c2e9b1d1f0012ab34cd".into()))
            .is_some(),
        Command::RevertToTrial => store.revert_to_trial().is_some(),
    }
}

proptest! {
    #[test]
    fn invariants_hold_under_random_command_sequences(
        commands in prop::collection::vec(command_strategy(), 1..80),
    ) {
        let store = SessionStore::new();
        let mut expected_version = store.version();
        let mut last_epoch = store.epoch();

        for command in &commands {
            let before = store.snapshot();
            let accepted = apply(&store, command);
            let after = store.snapshot();

            prop_assert_eq!(
                after.check_invariants(),
                Ok(()),
                "invariants broken after {:?}",
                command
            );

            if accepted {
                expected_version += 1;
            } else {
                // Refused commands leave no trace.
                prop_assert_eq!(&after, &before);
            }
            prop_assert_eq!(after.version, expected_version);

            // The epoch only ever advances, and only via reset.
            prop_assert!(after.epoch >= last_epoch);
            if after.epoch != last_epoch {
                prop_assert!(matches!(command, Command::Reset));
            }
            last_epoch = after.epoch;

            // At most one unanswered question, and always the last.
            let unanswered = after.history.iter().filter(|r| !r.is_answered()).count();
            prop_assert!(unanswered <= 1);
        }
    }

    #[test]
    fn aggregate_round_trips_through_json(
        commands in prop::collection::vec(command_strategy(), 1..40),
    ) {
        let store = SessionStore::new();
        for command in &commands {
            apply(&store, command);
        }
        let state = store.snapshot();
        let raw = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&raw).unwrap();
        prop_assert_eq!(back, state);
    }
}
