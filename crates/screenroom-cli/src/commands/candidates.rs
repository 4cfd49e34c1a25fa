use std::error::Error;

use clap::Subcommand;

use screenroom_core::{AuthStore, Config, Database, HttpInterviewClient};

#[derive(Subcommand)]
pub enum CandidatesAction {
    /// List archived interviews, best score first
    List {
        /// Query the remote directory instead of the local archive
        #[arg(long)]
        remote: bool,
    },
    /// Show one archived interview with its transcript
    Show {
        /// Candidate id of the archived interview
        candidate_id: String,
    },
}

pub async fn run(action: CandidatesAction) -> Result<(), Box<dyn Error>> {
    match action {
        CandidatesAction::List { remote } => {
            if remote {
                let config = Config::load()?;
                let identity = AuthStore::new()?.require()?;
                let client = HttpInterviewClient::new(&config)?.with_token(identity.token);
                let rows = client.fetch_candidates().await?;
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                let db = Database::open()?;
                let records = db.list_candidates()?;
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            Ok(())
        }
        CandidatesAction::Show { candidate_id } => {
            let db = Database::open()?;
            match db.find_candidate(&candidate_id)? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    Ok(())
                }
                None => Err(format!("no archived interview for {candidate_id}").into()),
            }
        }
    }
}
