use std::error::Error;

use clap::Subcommand;

use screenroom_core::session::ReconcileAction;
use screenroom_core::{
    AccountRole, AuthStore, Config, Database, Event, HttpInterviewClient, ModeReconciler,
};

use super::session;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
        /// Account role: interviewee or interviewer
        #[arg(long, default_value = "interviewee")]
        role: String,
    },
    /// Sign in and link any in-progress trial interview to the account
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show who is signed in
    Status,
}

pub async fn run(action: AuthAction) -> Result<(), Box<dyn Error>> {
    let auth = AuthStore::new()?;
    match action {
        AuthAction::Register {
            name,
            email,
            password,
            role,
        } => {
            let role = parse_role(&role)?;
            let config = Config::load()?;
            let client = HttpInterviewClient::new(&config)?;
            let identity = client.register(&name, &email, &password, role).await?;
            auth.save(&identity)?;
            println!("registered and signed in as {} <{}>", identity.name, identity.email);
            link_trial_session(&config, &auth).await
        }
        AuthAction::Login { email, password } => {
            let config = Config::load()?;
            let client = HttpInterviewClient::new(&config)?;
            let identity = client.login(&email, &password).await?;
            auth.save(&identity)?;
            println!("signed in as {} <{}>", identity.name, identity.email);
            link_trial_session(&config, &auth).await
        }
        AuthAction::Logout => {
            auth.clear()?;
            println!("signed out");
            // The stored interview is left alone; the startup gate offers
            // the guest demotion on the next run.
            if let Ok(db) = Database::open() {
                if let Ok(Some(state)) = db.load_session() {
                    if ModeReconciler::evaluate(&state, false) == Some(ReconcileAction::Demote) {
                        println!(
                            "an in-progress interview is still stored under this account; \
                             `interview run` offers to continue it as a guest"
                        );
                    }
                }
            }
            Ok(())
        }
        AuthAction::Status => {
            match auth.load()? {
                Some(identity) => {
                    let role = match identity.role {
                        AccountRole::Interviewee => "interviewee",
                        AccountRole::Interviewer => "interviewer",
                    };
                    println!("signed in as {} <{}> ({role})", identity.name, identity.email);
                }
                None => println!("not signed in"),
            }
            Ok(())
        }
    }
}

fn parse_role(role: &str) -> Result<AccountRole, Box<dyn Error>> {
    match role {
        "interviewee" => Ok(AccountRole::Interviewee),
        "interviewer" => Ok(AccountRole::Interviewer),
        other => Err(format!("unknown role: {other} (interviewee|interviewer)").into()),
    }
}

/// Best-effort sync of an in-progress trial interview to the account just
/// signed in. The session stays in trial mode if the upload fails.
async fn link_trial_session(config: &Config, auth: &AuthStore) -> Result<(), Box<dyn Error>> {
    let identity = auth.require()?;
    let db = Database::open()?;
    let store = session::load_store(&db, config)?;
    let action = store.with(|state| ModeReconciler::evaluate(state, true));
    if action != Some(ReconcileAction::Sync) {
        return Ok(());
    }

    let client = HttpInterviewClient::new(config)?.with_token(identity.token.clone());
    if let Some(Event::AccountLinked { candidate_id, .. }) =
        ModeReconciler::sync_to_account(&store, &client).await
    {
        println!("in-progress interview linked to your account");
        session::save_store(&db, &store)?;
        let mut identity = identity;
        identity.candidate_id = Some(candidate_id);
        auth.save(&identity)?;
    }
    Ok(())
}
