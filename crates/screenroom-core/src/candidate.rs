//! Candidate identity and profile.
//!
//! A candidate id is either a locally generated trial id or a server-issued
//! one. The distinction is a real tag here; the `trial-` prefix exists only
//! in the wire/persisted rendering, so no call site ever pattern-matches on
//! strings to decide mode.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TRIAL_PREFIX: &str = "trial-";

/// Resume extraction upstream fills unknown fields with these placeholders;
/// they count as missing for profile completeness.
pub const PLACEHOLDER_NAME: &str = "Candidate";
pub const PLACEHOLDER_PHONE: &str = "000-000-0000";

pub const DEFAULT_ROLE: &str = "Full Stack Developer";

/// Candidate identifier, tagged by origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CandidateId {
    /// Generated locally for an anonymous trial session.
    Trial(String),
    /// Issued by the directory service for a durable record.
    Issued(String),
}

impl CandidateId {
    /// Generate a fresh trial id.
    pub fn new_trial() -> Self {
        CandidateId::Trial(Uuid::new_v4().to_string())
    }

    pub fn is_trial(&self) -> bool {
        matches!(self, CandidateId::Trial(_))
    }

    pub fn mode(&self) -> SessionMode {
        match self {
            CandidateId::Trial(_) => SessionMode::Trial,
            CandidateId::Issued(_) => SessionMode::Authenticated,
        }
    }

    /// Rendering sent on the wire and stored on disk. Trial ids carry the
    /// `trial-` prefix; issued ids are passed through untouched.
    pub fn to_wire(&self) -> String {
        match self {
            CandidateId::Trial(local) => format!("{TRIAL_PREFIX}{local}"),
            CandidateId::Issued(server) => server.clone(),
        }
    }

    /// Recover the tag from a wire string. The prefix is inspected here and
    /// nowhere else.
    pub fn from_wire(s: &str) -> Self {
        match s.strip_prefix(TRIAL_PREFIX) {
            Some(local) => CandidateId::Trial(local.to_string()),
            None => CandidateId::Issued(s.to_string()),
        }
    }
}

impl From<String> for CandidateId {
    fn from(s: String) -> Self {
        CandidateId::from_wire(&s)
    }
}

impl From<CandidateId> for String {
    fn from(id: CandidateId) -> Self {
        id.to_wire()
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Whether the session is backed by the remote service or simulated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Trial,
    Authenticated,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Trial => "trial",
            SessionMode::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate contact details for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: None,
            email: None,
            phone: None,
            role: DEFAULT_ROLE.to_string(),
        }
    }
}

impl Profile {
    /// All contact fields known and none of them a placeholder.
    pub fn is_complete(&self) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .is_some_and(|n| !n.is_empty() && n != PLACEHOLDER_NAME);
        let email_ok = self.email.as_deref().is_some_and(|e| !e.is_empty());
        let phone_ok = self
            .phone
            .as_deref()
            .is_some_and(|p| !p.is_empty() && p != PLACEHOLDER_PHONE);
        name_ok && email_ok && phone_ok
    }

    /// Overlay provided fields; absent fields keep their current value.
    pub fn merge(
        &mut self,
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        role: Option<String>,
    ) {
        if let Some(name) = name {
            self.name = Some(name);
        }
        if let Some(email) = email {
            self.email = Some(email);
        }
        if let Some(phone) = phone {
            self.phone = Some(phone);
        }
        if let Some(role) = role {
            self.role = role;
        }
    }
}
