//! Local edits.
//!
//! Changes made on this device are expressed as mutations and applied through
//! a [`LocalSession`](crate::LocalSession), which stamps them and records the
//! tombstones that deletions need to survive the next merge.

use crate::{MatchRecord, PaymentStatus, Pick, RecordId, SettingsRecord, Week};
use serde::{Deserialize, Serialize};

/// A single local edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Create a match, or replace the one with the same id
    UpsertMatch {
        #[serde(rename = "match")]
        record: MatchRecord,
    },
    /// Record the final result of a match
    SetResult {
        #[serde(rename = "matchId")]
        match_id: RecordId,
        result: Pick,
    },
    /// Remove every match and guess of a week
    DeleteWeek { week: Week },
    AddUser {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<RecordId>,
    },
    SetUserPayment { name: String, status: PaymentStatus },
    /// Remove a user along with their guesses
    DeleteUser { name: String },
    /// Create or replace a user's guess for a week
    SubmitGuess {
        name: String,
        week: Week,
        #[serde(alias = "guesses")]
        picks: Vec<Pick>,
    },
    SetGuessPayment {
        name: String,
        week: Week,
        status: PaymentStatus,
    },
    DeleteGuess { name: String, week: Week },
    /// Overlay the present fields onto the local settings
    UpdateSettings { patch: SettingsRecord },
}

impl Mutation {
    /// Wire tag of this mutation.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::UpsertMatch { .. } => "upsertMatch",
            Mutation::SetResult { .. } => "setResult",
            Mutation::DeleteWeek { .. } => "deleteWeek",
            Mutation::AddUser { .. } => "addUser",
            Mutation::SetUserPayment { .. } => "setUserPayment",
            Mutation::DeleteUser { .. } => "deleteUser",
            Mutation::SubmitGuess { .. } => "submitGuess",
            Mutation::SetGuessPayment { .. } => "setGuessPayment",
            Mutation::DeleteGuess { .. } => "deleteGuess",
            Mutation::UpdateSettings { .. } => "updateSettings",
        }
    }

    /// Does this mutation delete something (and so leave a tombstone)?
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Mutation::DeleteWeek { .. } | Mutation::DeleteUser { .. } | Mutation::DeleteGuess { .. }
        )
    }

    /// Settings edits make the local settings win the next merge.
    pub fn touches_settings(&self) -> bool {
        matches!(self, Mutation::UpdateSettings { .. })
    }
}
