//! Signed-in account identity.
//!
//! The identity is a small JSON file in the data directory, read on every
//! command. No identity file means nobody is signed in.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::candidate::CandidateId;
use crate::error::AuthError;
use crate::storage::data_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Interviewee,
    Interviewer,
}

/// Identity returned by login/register and kept on disk between runs.
/// `candidate_id` is the account's directory record, present once the
/// account has interviewed (or synced a trial session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthIdentity {
    pub token: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: AccountRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
}

impl AuthIdentity {
    pub fn issued_candidate_id(&self) -> Option<CandidateId> {
        self.candidate_id.clone().map(CandidateId::Issued)
    }
}

pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    pub fn new() -> Result<Self, AuthError> {
        let dir = data_dir().map_err(|e| AuthError::LoadFailed {
            path: PathBuf::from("auth.json"),
            message: e.to_string(),
        })?;
        Ok(Self {
            path: dir.join("auth.json"),
        })
    }

    /// Store at a specific path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The stored identity, if someone is signed in.
    pub fn load(&self) -> Result<Option<AuthIdentity>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| AuthError::LoadFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let identity = serde_json::from_str(&contents).map_err(|e| AuthError::LoadFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(identity))
    }

    /// The stored identity, or `NotLoggedIn`.
    pub fn require(&self) -> Result<AuthIdentity, AuthError> {
        self.load()?.ok_or(AuthError::NotLoggedIn)
    }

    pub fn save(&self, identity: &AuthIdentity) -> Result<(), AuthError> {
        let contents =
            serde_json::to_string_pretty(identity).map_err(|e| AuthError::SaveFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        fs::write(&self.path, contents).map_err(|e| AuthError::SaveFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Sign out. Removing a file that is not there is not an error.
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::SaveFailed {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AuthIdentity {
        AuthIdentity {
            token: "jwt-token".into(),
            user_id: "u1".into(),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            role: AccountRole::Interviewee,
            candidate_id: Some("abc123".into()),
        }
    }

    #[test]
    fn round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::with_path(dir.path().join("auth.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save(&identity()).unwrap();
        assert_eq!(store.load().unwrap(), Some(identity()));
        assert_eq!(
            store.require().unwrap().issued_candidate_id(),
            Some(CandidateId::Issued("abc123".into()))
        );

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(matches!(store.require(), Err(AuthError::NotLoggedIn)));
        // Clearing twice is fine.
        store.clear().unwrap();
    }
}
