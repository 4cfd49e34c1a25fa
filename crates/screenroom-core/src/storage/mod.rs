mod config;
pub mod database;

pub use config::Config;
pub use database::{CandidateRecord, Database};

use std::path::PathBuf;

/// Returns `~/.config/screenroom[-dev]/` based on SCREENROOM_ENV, or
/// SCREENROOM_DATA_DIR verbatim when set (tests point it at a temp dir).
///
/// Set SCREENROOM_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(dir) = std::env::var("SCREENROOM_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SCREENROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("screenroom-dev")
    } else {
        base_dir.join("screenroom")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
