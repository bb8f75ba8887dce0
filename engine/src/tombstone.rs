//! Deletion markers.
//!
//! A tombstone records that this device deleted something. While it exists,
//! the merger refuses any copy of the deleted row, whichever side it comes
//! from. Tombstones are only cleared by the caller after the merged state has
//! been saved.

use crate::identity::{guess_key, normalize_name};
use crate::record::lenient;
use crate::Week;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The three tombstone sets.
///
/// BTreeSet keeps the serialized arrays in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstones {
    /// Weeks whose matches and guesses were wiped
    #[serde(default, deserialize_with = "lenient::week_set")]
    pub deleted_weeks: BTreeSet<Week>,
    /// Guess keys, `"<normalizedName>__<week>"`
    #[serde(default, deserialize_with = "lenient::string_set")]
    pub deleted_guess_keys: BTreeSet<String>,
    /// Normalized user names
    #[serde(default, deserialize_with = "lenient::string_set")]
    pub deleted_users: BTreeSet<String>,
}

impl Tombstones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_week_deleted(&mut self, week: Week) {
        self.deleted_weeks.insert(week);
    }

    pub fn mark_guess_deleted(&mut self, name: &str, week: Week) {
        self.deleted_guess_keys.insert(guess_key(name, week));
    }

    pub fn mark_user_deleted(&mut self, name: &str) {
        self.deleted_users.insert(normalize_name(name));
    }

    pub fn is_week_deleted(&self, week: Week) -> bool {
        self.deleted_weeks.contains(&week)
    }

    pub fn is_guess_deleted(&self, key: &str) -> bool {
        self.deleted_guess_keys.contains(key)
    }

    pub fn is_user_deleted(&self, normalized_name: &str) -> bool {
        self.deleted_users.contains(normalized_name)
    }

    /// A guess is suppressed by its week, its own key or its user.
    pub fn is_guess_suppressed(&self, name: &str, week: Week) -> bool {
        self.is_week_deleted(week)
            || self.is_guess_deleted(&guess_key(name, week))
            || self.is_user_deleted(&normalize_name(name))
    }

    /// Drop a pending user deletion (the user was re-created locally).
    pub fn unmark_user(&mut self, name: &str) -> bool {
        self.deleted_users.remove(&normalize_name(name))
    }

    /// Drop a pending guess deletion (the guess was re-submitted locally).
    pub fn unmark_guess(&mut self, name: &str, week: Week) -> bool {
        self.deleted_guess_keys.remove(&guess_key(name, week))
    }

    /// Union with another set of tombstones.
    pub fn extend(&mut self, other: &Tombstones) {
        self.deleted_weeks.extend(other.deleted_weeks.iter().copied());
        self.deleted_guess_keys
            .extend(other.deleted_guess_keys.iter().cloned());
        self.deleted_users.extend(other.deleted_users.iter().cloned());
    }

    pub fn clear(&mut self) {
        self.deleted_weeks.clear();
        self.deleted_guess_keys.clear();
        self.deleted_users.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of markers across all three sets.
    pub fn len(&self) -> usize {
        self.deleted_weeks.len() + self.deleted_guess_keys.len() + self.deleted_users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_idempotent() {
        let mut t = Tombstones::new();
        t.mark_week_deleted(2);
        t.mark_week_deleted(2);
        t.mark_user_deleted("Dana");
        t.mark_user_deleted(" dana ");
        t.mark_guess_deleted("Dana", 1);
        t.mark_guess_deleted("DANA", 1);

        assert_eq!(t.len(), 3);
        assert!(t.is_week_deleted(2));
        assert!(t.is_user_deleted("dana"));
        assert!(t.is_guess_deleted("dana__1"));
    }

    #[test]
    fn guess_suppression_sources() {
        let mut t = Tombstones::new();
        assert!(!t.is_guess_suppressed("Dana", 1));

        t.mark_week_deleted(3);
        assert!(t.is_guess_suppressed("anyone", 3));

        t.mark_guess_deleted("Dana", 1);
        assert!(t.is_guess_suppressed(" DANA", 1));
        assert!(!t.is_guess_suppressed("Dana", 2));

        t.mark_user_deleted("Avi");
        assert!(t.is_guess_suppressed("avi", 9));
    }

    #[test]
    fn extend_and_clear() {
        let mut a = Tombstones::new();
        a.mark_week_deleted(1);
        let mut b = Tombstones::new();
        b.mark_week_deleted(2);
        b.mark_user_deleted("dana");

        a.extend(&b);
        assert_eq!(a.deleted_weeks.len(), 2);
        assert!(a.is_user_deleted("dana"));

        a.clear();
        assert!(a.is_empty());
    }

    #[test]
    fn serializes_as_camel_case_arrays() {
        let mut t = Tombstones::new();
        t.mark_week_deleted(2);
        t.mark_guess_deleted("Dana", 1);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["deletedWeeks"], serde_json::json!([2]));
        assert_eq!(json["deletedGuessKeys"], serde_json::json!(["dana__1"]));
        assert_eq!(json["deletedUsers"], serde_json::json!([]));
    }

    #[test]
    fn legacy_week_strings_are_accepted() {
        let t: Tombstones = serde_json::from_value(serde_json::json!({
            "deletedWeeks": ["2", 3, "junk", 0]
        }))
        .unwrap();
        assert_eq!(t.deleted_weeks.into_iter().collect::<Vec<_>>(), vec![2, 3]);
        assert!(t.deleted_users.is_empty());
    }
}
