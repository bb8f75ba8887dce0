//! Identity and key derivation.
//!
//! Ids are generated locally and are not stable across devices, so users and
//! guesses are matched by normalized name wherever it matters.

use crate::{GuessRecord, MatchRecord, Timestamp, UserRecord, Week};

/// Separator between the name and the week in a guess key.
pub const GUESS_KEY_SEPARATOR: &str = "__";

/// Lower-case, trimmed form of a user name.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Key of a guess: `"<normalizedName>__<week>"`.
pub fn guess_key(name: &str, week: Week) -> String {
    format!("{}{}{}", normalize_name(name), GUESS_KEY_SEPARATOR, week)
}

/// Split a guess key back into normalized name and week.
///
/// Splits on the last separator so names containing `__` survive.
pub fn parse_guess_key(key: &str) -> Option<(String, Week)> {
    let (name, week) = key.rsplit_once(GUESS_KEY_SEPARATOR)?;
    let week: Week = week.parse().ok().filter(|w| *w >= 1)?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), week))
}

/// Records that carry modification timestamps.
pub trait Stamped {
    fn updated_at(&self) -> Option<Timestamp>;
    fn created_at(&self) -> Option<Timestamp>;

    /// `updatedAt`, falling back to `createdAt`, falling back to epoch.
    fn recency(&self) -> Timestamp {
        self.updated_at().or_else(|| self.created_at()).unwrap_or(0)
    }
}

/// Records with an identity key. `None` means the record is malformed.
pub trait Keyed {
    fn key(&self) -> Option<String>;
}

macro_rules! impl_stamped {
    ($($ty:ty),*) => {
        $(impl Stamped for $ty {
            fn updated_at(&self) -> Option<Timestamp> {
                self.updated_at
            }

            fn created_at(&self) -> Option<Timestamp> {
                self.created_at
            }
        })*
    };
}

impl_stamped!(MatchRecord, UserRecord, GuessRecord);

impl Keyed for MatchRecord {
    fn key(&self) -> Option<String> {
        self.week?;
        let id = self.id.trim();
        (!id.is_empty()).then(|| id.to_string())
    }
}

impl Keyed for UserRecord {
    fn key(&self) -> Option<String> {
        let id = self.id.trim();
        (!id.is_empty() && !normalize_name(&self.name).is_empty()).then(|| id.to_string())
    }
}

impl Keyed for GuessRecord {
    fn key(&self) -> Option<String> {
        let week = self.week?;
        (!normalize_name(&self.name).is_empty()).then(|| guess_key(&self.name, week))
    }
}

impl UserRecord {
    /// Secondary identity used to collapse cross-device duplicates.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

impl GuessRecord {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_name("  Dana "), "dana");
        assert_eq!(normalize_name("DANA"), "dana");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn guess_key_format() {
        assert_eq!(guess_key(" Dana ", 1), "dana__1");
        assert_eq!(guess_key("Avi Cohen", 12), "avi cohen__12");
    }

    #[test]
    fn parse_guess_key_inverts() {
        assert_eq!(parse_guess_key("dana__1"), Some(("dana".to_string(), 1)));
        assert_eq!(
            parse_guess_key("a__b__3"),
            Some(("a__b".to_string(), 3))
        );
        assert_eq!(parse_guess_key("dana"), None);
        assert_eq!(parse_guess_key("dana__x"), None);
        assert_eq!(parse_guess_key("dana__0"), None);
        assert_eq!(parse_guess_key("__4"), None);
    }

    #[test]
    fn recency_falls_back() {
        let mut user = UserRecord::new("u1", "Dana", 100);
        assert_eq!(user.recency(), 100);

        user.updated_at = None;
        assert_eq!(user.recency(), 100);

        user.created_at = None;
        assert_eq!(user.recency(), 0);
    }

    #[test]
    fn malformed_records_have_no_key() {
        let mut m = MatchRecord::new("m1", 1, "A", "B", 0);
        assert_eq!(m.key(), Some("m1".to_string()));
        m.week = None;
        assert_eq!(m.key(), None);

        let u = UserRecord::new("", "Dana", 0);
        assert_eq!(u.key(), None);
        let u = UserRecord::new("u1", "  ", 0);
        assert_eq!(u.key(), None);

        let g = GuessRecord::new("Dana", 2, vec![], 0);
        assert_eq!(g.key(), Some("dana__2".to_string()));
    }
}
