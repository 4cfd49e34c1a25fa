use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "screenroom-cli", version, about = "Screenroom CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interview session control
    Interview {
        #[command(subcommand)]
        action: commands::interview::InterviewAction,
    },
    /// Account management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Completed interview archive
    Candidates {
        #[command(subcommand)]
        action: commands::candidates::CandidatesAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate a completion script for
        shell: Shell,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SCREENROOM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// The session core is single-threaded by design; a current-thread runtime
// is all the concurrency the CLI needs.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Interview { action } => commands::interview::run(action).await,
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Candidates { action } => commands::candidates::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
