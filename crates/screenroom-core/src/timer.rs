//! Per-question countdown.
//!
//! No internal thread -- the caller ticks once per second and reacts to the
//! returned event. A countdown is bound to one question identity; when the
//! pending question changes, the owner drops this value and arms a fresh
//! one, so a stale countdown can never fire for a later question.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::events::Event;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownTimer {
    question_index: usize,
    question: String,
    duration_secs: u64,
    remaining_secs: u64,
    fired: bool,
}

impl CountdownTimer {
    pub fn new(question_index: usize, question: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            question_index,
            question: question.into(),
            duration_secs,
            remaining_secs: duration_secs,
            fired: false,
        }
    }

    /// Arm with the duration the difficulty policy assigns to this ordinal.
    pub fn for_question(question_index: usize, question: impl Into<String>) -> Self {
        let secs = Difficulty::for_index(question_index).countdown_secs();
        Self::new(question_index, question, secs)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Whether this countdown belongs to the given pending question.
    pub fn is_for(&self, question_index: usize, question: &str) -> bool {
        self.question_index == question_index && self.question == question
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// One-second tick. Returns the expiry event exactly once, when the
    /// counter reaches zero; every later tick is inert.
    pub fn tick(&mut self) -> Option<Event> {
        if self.fired {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.fired = true;
            return Some(Event::CountdownExpired {
                question_index: self.question_index,
                at: Utc::now(),
            });
        }
        None
    }
}
