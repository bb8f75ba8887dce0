//! Record types for matches, users and guesses.
//!
//! Records are plain typed structs. Fields the engine does not know about are
//! kept in an `extra` map (the extension bag) and written back verbatim, so
//! newer clients can add fields without older ones dropping them.

use crate::{RecordId, Timestamp, Week};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A single 1/X/2 prediction or match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pick {
    /// Home win, `"1"`
    One,
    /// Draw, `"X"`
    Draw,
    /// Away win, `"2"`
    Two,
    /// Undecided / not picked, `""`
    #[default]
    Empty,
}

impl Pick {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pick::One => "1",
            Pick::Draw => "X",
            Pick::Two => "2",
            Pick::Empty => "",
        }
    }

    /// Parse leniently: surrounding whitespace and case are ignored, anything
    /// unrecognised is treated as undecided.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "1" => Pick::One,
            "X" => Pick::Draw,
            "2" => Pick::Two,
            _ => Pick::Empty,
        }
    }

    /// True for `1`, `X` and `2`.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Pick::Empty)
    }
}

impl std::fmt::Display for Pick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Pick {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Pick {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Pick::parse(s),
            Value::Number(n) => Pick::parse(&n.to_string()),
            _ => Pick::Empty,
        }
    }
}

impl<'de> Deserialize<'de> for Pick {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Pick::from_value(&Value::deserialize(deserializer)?))
    }
}

/// Whether a user (or a user's weekly entry) has paid the entry fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    #[default]
    Unpaid,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

// Only an explicit "paid" (or `true`) counts; every other value is unpaid.
impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if s.trim().eq_ignore_ascii_case("paid") => PaymentStatus::Paid,
            Value::Bool(true) => PaymentStatus::Paid,
            _ => PaymentStatus::Unpaid,
        })
    }
}

/// Where a record came from during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Held by this device
    Local,
    /// Fetched from the server snapshot
    Server,
}

/// A fixture in the weekly slate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Opaque identifier, empty when missing
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: RecordId,
    /// Week this match belongs to; `None` when unresolvable
    #[serde(
        default,
        deserialize_with = "lenient::week",
        skip_serializing_if = "Option::is_none"
    )]
    pub week: Option<Week>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub home_team: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub away_team: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub league: Option<String>,
    /// Final result, `Empty` until decided
    #[serde(default)]
    pub result: Pick,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<Timestamp>,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Timestamp>,
    /// Unknown fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MatchRecord {
    /// Create a new undecided match.
    pub fn new(
        id: impl Into<RecordId>,
        week: Week,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            week: Some(week),
            home_team: home_team.into(),
            away_team: away_team.into(),
            date: None,
            time: None,
            league: None,
            result: Pick::Empty,
            created_at: Some(timestamp),
            updated_at: Some(timestamp),
            extra: Map::new(),
        }
    }

    /// Builder-style result setter.
    pub fn with_result(mut self, result: Pick) -> Self {
        self.result = result;
        self
    }

    /// Builder-style `updatedAt` setter.
    pub fn with_updated_at(mut self, timestamp: Timestamp) -> Self {
        self.updated_at = Some(timestamp);
        self
    }
}

/// A pool participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<Timestamp>,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payment_status: PaymentStatus::Unpaid,
            created_at: Some(timestamp),
            updated_at: Some(timestamp),
            extra: Map::new(),
        }
    }

    pub fn with_updated_at(mut self, timestamp: Timestamp) -> Self {
        self.updated_at = Some(timestamp);
        self
    }
}

/// One user's predictions for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRecord {
    #[serde(
        default,
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// Display name of the user; identity is its normalized form
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<RecordId>,
    #[serde(
        default,
        deserialize_with = "lenient::week",
        skip_serializing_if = "Option::is_none"
    )]
    pub week: Option<Week>,
    /// Picks in match order
    #[serde(
        default,
        rename = "guesses",
        alias = "picks",
        deserialize_with = "lenient::picks"
    )]
    pub picks: Vec<Pick>,
    /// Derived: number of correct picks against decided results
    #[serde(default, deserialize_with = "lenient::count")]
    pub score: u32,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<Timestamp>,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GuessRecord {
    pub fn new(name: impl Into<String>, week: Week, picks: Vec<Pick>, timestamp: Timestamp) -> Self {
        Self {
            id: None,
            name: name.into(),
            user_id: None,
            week: Some(week),
            picks,
            score: 0,
            payment_status: PaymentStatus::Unpaid,
            created_at: Some(timestamp),
            updated_at: Some(timestamp),
            extra: Map::new(),
        }
    }

    pub fn with_updated_at(mut self, timestamp: Timestamp) -> Self {
        self.updated_at = Some(timestamp);
        self
    }
}

/// Tolerant decoders for rows written by older clients.
pub(crate) mod lenient {
    use super::Pick;
    use crate::{Timestamp, Week};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeSet;

    /// String or number. Anything else is an empty id, which the merge
    /// treats as malformed.
    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(opt_id(deserializer)?.unwrap_or_default())
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    /// A string; `null` or any other type reads as empty.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(opt_text(deserializer)?.unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    /// `true`/`false`, `"true"`/`"false"` or `0`/`1`.
    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Some(Value::Number(n)) => match n.as_u64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        })
    }

    /// Small non-negative count; anything unreadable is 0.
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let parsed = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        Ok(parsed.and_then(|c| u32::try_from(c).ok()).unwrap_or(0))
    }

    /// An array of picks; a non-array reads as no picks.
    pub fn picks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Pick>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items.iter().map(Pick::from_value).collect(),
            _ => Vec::new(),
        })
    }

    /// A list of strings; numbers are kept as text, other entries skipped.
    pub fn string_set<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeSet<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|value| match value {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => BTreeSet::new(),
        })
    }

    /// Integer or numeric string, at least 1.
    pub fn week<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Week>, D::Error> {
        let parsed = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        Ok(parsed
            .filter(|w| *w >= 1)
            .and_then(|w| Week::try_from(w).ok()))
    }

    /// A list of weeks; entries that do not resolve are skipped.
    pub fn week_set<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeSet<Week>, D::Error> {
        let values = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => None,
            })
            .filter(|w| *w >= 1)
            .filter_map(|w| Week::try_from(w).ok())
            .collect())
    }

    /// Non-negative integer amount, or a numeric string.
    pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
    }

    /// Milliseconds since epoch, or an RFC 3339 string.
    pub fn timestamp<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Some(Value::String(s)) => parse_timestamp_str(&s),
            _ => None,
        })
    }

    fn parse_timestamp_str(raw: &str) -> Option<Timestamp> {
        let raw = raw.trim();
        if let Ok(millis) = raw.parse::<u64>() {
            return Some(millis);
        }
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok())
    }
}
