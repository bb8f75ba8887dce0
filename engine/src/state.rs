//! The pool state object exchanged with storage.
//!
//! A `PoolState` is both the shape the store persists and the shape the merge
//! consumes and produces. It replaces the old ambient `DataManager` data: it
//! is passed by value into merges and returned from them.

use crate::identity::normalize_name;
use crate::{
    error::Result, Error, GuessRecord, MatchRecord, Settings, SettingsRecord, Tombstones,
    UserRecord, Week,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Matches, users, guesses, settings and pending deletions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub user_guesses: Vec<GuessRecord>,
    #[serde(default)]
    pub settings: SettingsRecord,
    /// `deletedWeeks`, `deletedGuessKeys` and `deletedUsers` at the top level
    #[serde(flatten)]
    pub tombstones: Tombstones,
}

impl PoolState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with defaults applied.
    pub fn settings(&self) -> Settings {
        self.settings.resolved()
    }

    /// Every week that has at least one match.
    pub fn weeks(&self) -> BTreeSet<Week> {
        self.matches.iter().filter_map(|m| m.week).collect()
    }

    /// Matches of a week, in collection order.
    pub fn matches_for_week(&self, week: Week) -> impl Iterator<Item = &MatchRecord> {
        self.matches.iter().filter(move |m| m.week == Some(week))
    }

    /// Guesses of a week, in collection order.
    pub fn guesses_for_week(&self, week: Week) -> impl Iterator<Item = &GuessRecord> {
        self.user_guesses
            .iter()
            .filter(move |g| g.week == Some(week))
    }

    pub fn find_match(&self, id: &str) -> Option<&MatchRecord> {
        self.matches.iter().find(|m| m.id == id)
    }

    /// Look a user up by name, ignoring case and surrounding whitespace.
    pub fn find_user(&self, name: &str) -> Option<&UserRecord> {
        let wanted = normalize_name(name);
        self.users.iter().find(|u| u.normalized_name() == wanted)
    }

    pub fn find_guess(&self, name: &str, week: Week) -> Option<&GuessRecord> {
        let wanted = normalize_name(name);
        self.user_guesses
            .iter()
            .find(|g| g.week == Some(week) && g.normalized_name() == wanted)
    }

    /// A copy without pending deletions, as it should be persisted once the
    /// deletions have been applied.
    pub fn without_tombstones(&self) -> Self {
        Self {
            tombstones: Tombstones::default(),
            ..self.clone()
        }
    }

    /// Counts for logging and status displays.
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            match_count: self.matches.len(),
            user_count: self.users.len(),
            guess_count: self.user_guesses.len(),
            week_count: self.weeks().len(),
            pending_deletions: self.tombstones.len(),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidState(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidState(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidState(e.to_string()))
    }
}

/// Counts describing a state (without the data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub match_count: usize,
    pub user_count: usize,
    pub guess_count: usize,
    pub week_count: usize,
    pub pending_deletions: usize,
}
