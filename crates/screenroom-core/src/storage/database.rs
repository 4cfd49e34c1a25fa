//! SQLite-based local storage.
//!
//! Provides persistent storage for:
//! - The live interview session (kv store, JSON payload)
//! - An archive of completed interviews, one row per candidate run
//! - Key-value store for small bits of application state

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CoreError, DatabaseError};
use crate::session::{QuestionRecord, SessionState};

use super::data_dir;

const DB_FILE: &str = "screenroom.db";
const SESSION_KEY: &str = "interview_session";

/// One completed interview in the local archive. Rows are written once,
/// when a session reaches `Completed`, and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: i64,
    pub candidate_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    /// "trial" or "authenticated" at the time the interview completed.
    pub mode: String,
    pub final_score: f64,
    pub verdict: String,
    pub summary: String,
    /// Full graded transcript, question by question.
    pub history: Vec<QuestionRecord>,
    pub completed_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Build an archive row from a completed session. `None` while the
    /// session is still live.
    pub fn from_completed(state: &SessionState) -> Option<Self> {
        let summary = state.final_summary.as_ref()?;
        let candidate_id = state.candidate_id.as_ref()?;
        Some(Self {
            id: 0,
            candidate_id: candidate_id.to_wire(),
            name: state.profile.name.clone().unwrap_or_default(),
            email: state.profile.email.clone().unwrap_or_default(),
            role: state.profile.role.clone(),
            mode: candidate_id.mode().to_string(),
            final_score: summary.final_score,
            verdict: summary.recommendation.verdict.to_string(),
            summary: summary.summary.clone(),
            history: state.history.clone(),
            completed_at: state.completed_at.unwrap_or_else(Utc::now),
        })
    }
}

/// SQLite database for session and archive storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/screenroom/screenroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = match data_dir() {
            Ok(dir) => dir.join(DB_FILE),
            Err(e) => {
                return Err(DatabaseError::OpenFailed {
                    path: PathBuf::from(DB_FILE),
                    message: e.to_string(),
                })
            }
        };
        let conn = Connection::open(&path).map_err(|e| DatabaseError::OpenFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|e| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        })?;
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS candidates (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id TEXT NOT NULL,
                name         TEXT NOT NULL,
                email        TEXT NOT NULL,
                role         TEXT NOT NULL,
                mode         TEXT NOT NULL,
                final_score  REAL NOT NULL,
                verdict      TEXT NOT NULL,
                summary      TEXT NOT NULL,
                history      TEXT NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Create indexes for common query patterns
            CREATE INDEX IF NOT EXISTS idx_candidates_final_score ON candidates(final_score);
            CREATE INDEX IF NOT EXISTS idx_candidates_candidate_id ON candidates(candidate_id);",
        )?;
        Ok(())
    }

    /// Record a completed interview in the archive.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_candidate(&self, record: &CandidateRecord) -> Result<i64, rusqlite::Error> {
        let history = serde_json::to_string(&record.history)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn.execute(
            "INSERT INTO candidates
                (candidate_id, name, email, role, mode, final_score, verdict, summary, history,
                 completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.candidate_id,
                record.name,
                record.email,
                record.role,
                record.mode,
                record.final_score,
                record.verdict,
                record.summary,
                history,
                record.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All archived interviews, best score first.
    pub fn list_candidates(&self) -> Result<Vec<CandidateRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, candidate_id, name, email, role, mode, final_score, verdict, summary,
                    history, completed_at
             FROM candidates
             ORDER BY final_score DESC, completed_at DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_record)?;
        rows.collect()
    }

    /// The most recent archived interview for a candidate id.
    pub fn find_candidate(
        &self,
        candidate_id: &str,
    ) -> Result<Option<CandidateRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, candidate_id, name, email, role, mode, final_score, verdict, summary,
                    history, completed_at
             FROM candidates
             WHERE candidate_id = ?1
             ORDER BY completed_at DESC
             LIMIT 1",
        )?;
        let result = stmt.query_row(params![candidate_id], Self::row_to_record);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The live session, if one was persisted.
    pub fn load_session(&self) -> Result<Option<SessionState>, CoreError> {
        match self.kv_get(SESSION_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persist the live session. Called after every committed transition,
    /// so a reload finds exactly what the last command left behind.
    pub fn save_session(&self, state: &SessionState) -> Result<(), CoreError> {
        let raw = serde_json::to_string(state)?;
        self.kv_set(SESSION_KEY, &raw)?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> Result<CandidateRecord, rusqlite::Error> {
        let history: String = row.get(9)?;
        let completed_at: String = row.get(10)?;
        Ok(CandidateRecord {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            role: row.get(4)?,
            mode: row.get(5)?,
            final_score: row.get(6)?,
            verdict: row.get(7)?,
            summary: row.get(8)?,
            history: serde_json::from_str(&history).unwrap_or_default(),
            completed_at: completed_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
