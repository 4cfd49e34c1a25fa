use std::error::Error;
use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::interval;

use screenroom_core::difficulty::QUESTION_COUNT;
use screenroom_core::session::FetchOutcome;
use screenroom_core::{
    AuthIdentity, AuthStore, CandidateId, Config, CountdownTimer, Database, Difficulty,
    HttpInterviewClient, ModeReconciler, Profile, RehydrationGate, SessionState, SessionStatus,
    SessionStore, StartupPrompt, SubmissionCoordinator, SubmitOutcome,
};

use super::session::{self, Backend};

type StdinLines = Lines<BufReader<Stdin>>;

#[derive(Subcommand)]
pub enum InterviewAction {
    /// Open a session and fetch the first question
    Start {
        /// Interviewer-posted session id to join
        #[arg(long)]
        session: Option<String>,
        /// Target role (overrides the posted or configured one)
        #[arg(long)]
        role: Option<String>,
        /// Candidate name
        #[arg(long)]
        name: Option<String>,
        /// Candidate email
        #[arg(long)]
        email: Option<String>,
        /// Candidate phone number
        #[arg(long)]
        phone: Option<String>,
    },
    /// Fill in missing contact details
    Info {
        /// Candidate name
        #[arg(long)]
        name: Option<String>,
        /// Candidate email
        #[arg(long)]
        email: Option<String>,
        /// Candidate phone number
        #[arg(long)]
        phone: Option<String>,
    },
    /// Submit an answer to the pending question
    Submit {
        /// Answer text
        answer: String,
    },
    /// Pick the session back up: fetch the missing question or retry the
    /// final summary after a failure
    Resume,
    /// Run the interview interactively with per-question countdowns
    Run,
    /// Print the session state as JSON
    Status,
    /// Discard the session and start over
    Reset,
    /// Keep the transcript but re-home it under a trial identity
    ContinueAsGuest,
}

pub async fn run(action: InterviewAction) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let auth = AuthStore::new()?;
    let store = session::load_store(&db, &config)?;

    let result = dispatch(action, &config, &db, &auth, &store).await;
    session::save_store(&db, &store)?;
    result
}

async fn dispatch(
    action: InterviewAction,
    config: &Config,
    db: &Database,
    auth: &AuthStore,
    store: &SessionStore,
) -> Result<(), Box<dyn Error>> {
    match action {
        InterviewAction::Start {
            session: session_id,
            role,
            name,
            email,
            phone,
        } => {
            if store.status() != SessionStatus::Idle {
                return Err("a session is already open; `interview status` shows it, \
                     `interview reset` discards it"
                    .into());
            }
            let role = resolve_role(config, session_id, role).await?;
            let profile = Profile {
                name,
                email,
                phone,
                role,
            };
            let identity = auth.load()?;
            let candidate_id = identity
                .as_ref()
                .and_then(AuthIdentity::issued_candidate_id)
                .unwrap_or_else(CandidateId::new_trial);
            if let Some(event) = store.establish(candidate_id, profile) {
                session::print_event(&event)?;
            }
            sync_if_signed_in(config, identity.as_ref(), store).await?;

            if store.status() == SessionStatus::PendingInfo {
                println!("contact details missing; provide them with `interview info`");
                return Ok(());
            }
            let backend = Backend::for_store(config, store, auth)?;
            let coordinator = SubmissionCoordinator::new(store.clone());
            fetch_and_report(&coordinator, &backend, store).await
        }
        InterviewAction::Info { name, email, phone } => {
            if store.status() != SessionStatus::PendingInfo {
                return Err("no session awaiting contact details".into());
            }
            session::ensure_not_orphaned(store, auth)?;
            publish_details(config, auth, store, name.clone(), email.clone(), phone.clone())
                .await?;
            match store.complete_profile(name, email, phone, None) {
                Some(event) => {
                    session::print_event(&event)?;
                    let backend = Backend::for_store(config, store, auth)?;
                    let coordinator = SubmissionCoordinator::new(store.clone());
                    fetch_and_report(&coordinator, &backend, store).await
                }
                None => {
                    session::print_event(&store.snapshot_event(None))?;
                    Ok(())
                }
            }
        }
        InterviewAction::Submit { answer } => {
            session::ensure_not_orphaned(store, auth)?;
            let backend = Backend::for_store(config, store, auth)?;
            let coordinator = SubmissionCoordinator::new(store.clone());
            report_submission(coordinator.submit(&backend, &answer).await, db, store)
        }
        InterviewAction::Resume => {
            session::ensure_not_orphaned(store, auth)?;
            match store.status() {
                SessionStatus::Idle => {
                    Err("no session to resume; `interview start` opens one".into())
                }
                SessionStatus::PendingInfo => {
                    Err("contact details missing; provide them with `interview info`".into())
                }
                SessionStatus::Completed => print_summary(store),
                SessionStatus::InProgress | SessionStatus::Error | SessionStatus::Loading => {
                    if store.pending_question().is_some() {
                        // The question is already there, waiting on an answer.
                        session::print_event(&store.snapshot_event(None))?;
                        return Ok(());
                    }
                    let backend = Backend::for_store(config, store, auth)?;
                    let coordinator = SubmissionCoordinator::new(store.clone());
                    if store.with(SessionState::answered_count) < QUESTION_COUNT {
                        fetch_and_report(&coordinator, &backend, store).await
                    } else {
                        report_submission(coordinator.finalize(&backend).await, db, store)
                    }
                }
            }
        }
        InterviewAction::Run => run_interactive(config, db, auth, store).await,
        InterviewAction::Status => {
            session::print_event(&store.snapshot_event(None))?;
            Ok(())
        }
        InterviewAction::Reset => {
            let event = store.reset();
            session::print_event(&event)
        }
        InterviewAction::ContinueAsGuest => match ModeReconciler::demote(store) {
            Some(event) => session::print_event(&event),
            None => Err("session is not account-owned; nothing to demote".into()),
        },
    }
}

// ── One-shot helpers ─────────────────────────────────────────────────

async fn resolve_role(
    config: &Config,
    session_id: Option<String>,
    role: Option<String>,
) -> Result<String, Box<dyn Error>> {
    if let Some(role) = role {
        return Ok(role);
    }
    if let Some(id) = session_id {
        let client = HttpInterviewClient::new(config)?;
        return Ok(client.join_session(&id).await?);
    }
    Ok(config.interview.default_role.clone())
}

/// Push a fresh trial session under the signed-in account so it gets a
/// directory record. Best-effort: trial mode carries on if it fails.
async fn sync_if_signed_in(
    config: &Config,
    identity: Option<&AuthIdentity>,
    store: &SessionStore,
) -> Result<(), Box<dyn Error>> {
    let Some(identity) = identity else {
        return Ok(());
    };
    if !store
        .candidate_id()
        .as_ref()
        .is_some_and(CandidateId::is_trial)
    {
        return Ok(());
    }
    let client = HttpInterviewClient::new(config)?.with_token(identity.token.clone());
    if let Some(event) = ModeReconciler::sync_to_account(store, &client).await {
        session::print_event(&event)?;
    }
    Ok(())
}

/// Authenticated sessions publish merged contact details to the directory
/// before applying them locally.
async fn publish_details(
    config: &Config,
    auth: &AuthStore,
    store: &SessionStore,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let Some(id) = store.candidate_id().filter(|id| !id.is_trial()) else {
        return Ok(());
    };
    let mut merged = store.with(|state| state.profile.clone());
    merged.merge(name, email, phone, None);
    let identity = auth.require()?;
    let client = HttpInterviewClient::new(config)?.with_token(identity.token);
    client.update_details(&id, &merged).await?;
    Ok(())
}

async fn fetch_and_report(
    coordinator: &SubmissionCoordinator,
    backend: &Backend,
    store: &SessionStore,
) -> Result<(), Box<dyn Error>> {
    match coordinator.fetch_question(backend).await {
        FetchOutcome::Failed => Err(describe_error(store).into()),
        // Asked prints the pending question; a refusal still shows where
        // the session stands.
        _ => {
            session::print_event(&store.snapshot_event(None))?;
            Ok(())
        }
    }
}

fn report_submission(
    outcome: SubmitOutcome,
    db: &Database,
    store: &SessionStore,
) -> Result<(), Box<dyn Error>> {
    match outcome {
        SubmitOutcome::Advanced => {
            session::print_event(&store.snapshot_event(None))?;
            Ok(())
        }
        SubmitOutcome::Finalized => {
            session::archive_completed(db, store)?;
            print_summary(store)
        }
        SubmitOutcome::Failed => Err(describe_error(store).into()),
        SubmitOutcome::NoPendingQuestion => {
            Err("no pending question; `interview resume` fetches the next one".into())
        }
        SubmitOutcome::Stale => Err("session was reset mid-submission; nothing recorded".into()),
        SubmitOutcome::InFlight => Err("another submission is in flight".into()),
    }
}

fn print_summary(store: &SessionStore) -> Result<(), Box<dyn Error>> {
    let summary = store.with(|state| state.final_summary.clone());
    match summary {
        Some(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        None => Err("interview is not complete".into()),
    }
}

fn describe_error(store: &SessionStore) -> String {
    store
        .with(|state| state.error.clone())
        .unwrap_or_else(|| "remote call failed".into())
}

// ── Interactive runner ───────────────────────────────────────────────

async fn run_interactive(
    config: &Config,
    db: &Database,
    auth: &AuthStore,
    store: &SessionStore,
) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !resolve_startup(config, auth, store, &mut lines).await? {
        return Ok(());
    }
    session::save_store(db, store)?;

    let backend = Backend::for_store(config, store, auth)?;
    let coordinator = SubmissionCoordinator::new(store.clone());
    let mut timer: Option<CountdownTimer> = None;

    loop {
        match store.status() {
            SessionStatus::Idle => {
                println!("no open session; `interview start` opens one");
                return Ok(());
            }
            SessionStatus::PendingInfo => {
                if !collect_details(config, auth, store, &mut lines).await? {
                    return Ok(());
                }
                session::save_store(db, store)?;
                continue;
            }
            SessionStatus::Completed => {
                print_summary(store)?;
                let linger = config.interview.completed_reset_secs;
                println!("clearing the finished session in {linger}s");
                tokio::time::sleep(Duration::from_secs(linger)).await;
                store.reset();
                session::save_store(db, store)?;
                println!("done; `interview start` opens a fresh one");
                return Ok(());
            }
            SessionStatus::Error => {
                println!("previous attempt failed: {}", describe_error(store));
                if !confirm(&mut lines, "retry?").await? {
                    println!("session saved; `interview run` picks it back up");
                    return Ok(());
                }
            }
            SessionStatus::InProgress | SessionStatus::Loading => {}
        }

        if store.pending_question().is_some() {
            let keep_going =
                ask_question(&coordinator, &backend, config, db, store, &mut timer, &mut lines)
                    .await?;
            if !keep_going {
                return Ok(());
            }
        } else {
            advance(&coordinator, &backend, db, store).await?;
            session::save_store(db, store)?;
        }
    }
}

/// Evaluate the startup gate and make sure a session exists. `false`
/// means the user declined to continue.
async fn resolve_startup(
    config: &Config,
    auth: &AuthStore,
    store: &SessionStore,
    lines: &mut StdinLines,
) -> Result<bool, Box<dyn Error>> {
    let identity = auth.load()?;
    let prompt = store.with(|state| RehydrationGate::evaluate(state, identity.is_some()));
    match prompt {
        Some(StartupPrompt::LogoutWarning) => {
            println!("this interview belongs to an account that is signed out.");
            println!("continuing as a guest re-homes the transcript under a trial identity;");
            println!("`auth login` first keeps it on the account.");
            if !confirm(lines, "continue as guest?").await? {
                return Ok(false);
            }
            if let Some(event) = ModeReconciler::demote(store) {
                session::print_event(&event)?;
            }
        }
        Some(StartupPrompt::ResumeInterview) => {
            let answered = store.with(SessionState::answered_count);
            println!("resuming interview: {answered}/{QUESTION_COUNT} questions answered");
        }
        None => {}
    }

    if store.status() == SessionStatus::Idle {
        let candidate_id = identity
            .as_ref()
            .and_then(AuthIdentity::issued_candidate_id)
            .unwrap_or_else(CandidateId::new_trial);
        let profile = Profile {
            role: config.interview.default_role.clone(),
            ..Profile::default()
        };
        if let Some(event) = store.establish(candidate_id, profile) {
            session::print_event(&event)?;
        }
        sync_if_signed_in(config, identity.as_ref(), store).await?;
    }
    Ok(true)
}

/// Prompt for the contact fields the profile still needs. `false` when
/// stdin closed mid-collection.
async fn collect_details(
    config: &Config,
    auth: &AuthStore,
    store: &SessionStore,
    lines: &mut StdinLines,
) -> Result<bool, Box<dyn Error>> {
    println!("a few details before the questions start (empty keeps the shown value):");
    let current = store.with(|state| state.profile.clone());
    let Some(name) = prompt_field(lines, "name", current.name.as_deref()).await? else {
        return Ok(false);
    };
    let Some(email) = prompt_field(lines, "email", current.email.as_deref()).await? else {
        return Ok(false);
    };
    let Some(phone) = prompt_field(lines, "phone", current.phone.as_deref()).await? else {
        return Ok(false);
    };

    publish_details(config, auth, store, name.clone(), email.clone(), phone.clone()).await?;
    if let Some(event) = store.complete_profile(name, email, phone, None) {
        session::print_event(&event)?;
    }
    Ok(true)
}

/// One contact-field prompt. Outer `None` on closed stdin; inner `None`
/// keeps the current value.
async fn prompt_field(
    lines: &mut StdinLines,
    label: &str,
    current: Option<&str>,
) -> Result<Option<Option<String>>, Box<dyn Error>> {
    match current {
        Some(value) if !value.is_empty() => print!("{label} [{value}]: "),
        _ => print!("{label}: "),
    }
    std::io::stdout().flush()?;
    let Some(line) = lines.next_line().await? else {
        return Ok(None);
    };
    let line = line.trim().to_string();
    Ok(Some((!line.is_empty()).then_some(line)))
}

async fn confirm(lines: &mut StdinLines, question: &str) -> Result<bool, Box<dyn Error>> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    match lines.next_line().await? {
        Some(line) => Ok(matches!(line.trim(), "y" | "Y" | "yes")),
        None => Ok(false),
    }
}

/// Present the pending question under its countdown and submit whatever
/// comes back first: the typed answer or the fallback text on expiry.
/// `false` when stdin closed.
async fn ask_question(
    coordinator: &SubmissionCoordinator,
    backend: &Backend,
    config: &Config,
    db: &Database,
    store: &SessionStore,
    timer: &mut Option<CountdownTimer>,
    lines: &mut StdinLines,
) -> Result<bool, Box<dyn Error>> {
    let Some((index, question)) = store.pending_question() else {
        return Ok(true);
    };
    // One countdown per question identity; a retried question keeps the
    // time it had left.
    if !timer.as_ref().is_some_and(|t| t.is_for(index, &question)) {
        *timer = None;
    }
    let countdown = timer.get_or_insert_with(|| CountdownTimer::for_question(index, &question));

    let answer = if countdown.has_fired() {
        println!("the countdown for this question already expired; resubmitting the fallback");
        Some(config.interview.fallback_answer.clone())
    } else {
        prompt_answer(lines, countdown, index, &question, &config.interview.fallback_answer)
            .await?
    };
    let Some(answer) = answer else {
        println!();
        println!("input closed; session saved");
        return Ok(false);
    };

    match coordinator.submit(backend, &answer).await {
        SubmitOutcome::Advanced => {
            report_grade(store, index);
            *timer = None;
        }
        SubmitOutcome::Finalized => {
            report_grade(store, index);
            session::archive_completed(db, store)?;
            *timer = None;
        }
        // Failed keeps the pending question and the countdown; the run
        // loop offers the retry.
        SubmitOutcome::Failed
        | SubmitOutcome::Stale
        | SubmitOutcome::InFlight
        | SubmitOutcome::NoPendingQuestion => {}
    }
    session::save_store(db, store)?;
    Ok(true)
}

async fn prompt_answer(
    lines: &mut StdinLines,
    countdown: &mut CountdownTimer,
    index: usize,
    question: &str,
    fallback: &str,
) -> Result<Option<String>, Box<dyn Error>> {
    println!();
    println!(
        "Question {}/{} [{}] ({}s to answer)",
        index + 1,
        QUESTION_COUNT,
        Difficulty::for_index(index),
        countdown.remaining_secs()
    );
    println!("{question}");
    print!("> ");
    std::io::stdout().flush()?;

    let mut ticker = interval(Duration::from_secs(1));
    ticker.tick().await;
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {
                    print!("> ");
                    std::io::stdout().flush()?;
                }
                Some(line) => return Ok(Some(line)),
                None => return Ok(None),
            },
            _ = ticker.tick() => {
                if countdown.tick().is_some() {
                    println!();
                    println!("time's up; submitting the fallback answer");
                    return Ok(Some(fallback.to_string()));
                }
            }
        }
    }
}

fn report_grade(store: &SessionStore, index: usize) {
    store.with(|state| {
        if let Some(record) = state.history.get(index) {
            if let (Some(score), Some(feedback)) = (record.score, record.feedback.as_deref()) {
                println!("score {score:.1}: {feedback}");
            }
        }
    });
}

/// No pending question: fetch the next one, or produce the summary after
/// the last answer. Failures land in the error status for the run loop.
async fn advance(
    coordinator: &SubmissionCoordinator,
    backend: &Backend,
    db: &Database,
    store: &SessionStore,
) -> Result<(), Box<dyn Error>> {
    if store.with(SessionState::answered_count) < QUESTION_COUNT {
        println!("fetching the next question...");
        match coordinator.fetch_question(backend).await {
            FetchOutcome::NotFetchable | FetchOutcome::Stale => {
                Err("session is not in a fetchable state".into())
            }
            _ => Ok(()),
        }
    } else {
        println!("wrapping up...");
        match coordinator.finalize(backend).await {
            SubmitOutcome::Finalized => {
                session::archive_completed(db, store)?;
                Ok(())
            }
            SubmitOutcome::Stale => Err("session is not ready to finalize".into()),
            _ => Ok(()),
        }
    }
}
