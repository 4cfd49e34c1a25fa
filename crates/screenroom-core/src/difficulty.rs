//! Question difficulty policy.
//!
//! Maps a question ordinal to a difficulty tier and each tier to a
//! countdown duration. The interview is fixed-length: reaching
//! [`QUESTION_COUNT`] answered questions triggers finalization instead of
//! another fetch.

use serde::{Deserialize, Serialize};

/// Number of questions in a full interview.
pub const QUESTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Tier for a question ordinal: 0-1 Easy, 2-3 Medium, 4+ Hard.
    pub fn for_index(index: usize) -> Self {
        if index >= 4 {
            Difficulty::Hard
        } else if index >= 2 {
            Difficulty::Medium
        } else {
            Difficulty::Easy
        }
    }

    /// Countdown allotted to answer one question of this tier.
    pub fn countdown_secs(self) -> u64 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }

    /// Wire string understood by the grading service.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
