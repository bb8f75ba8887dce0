//! Pool settings and their reconciliation.
//!
//! Settings are a flat bag of scalars. The server copy wins field by field,
//! unless the caller asks for the local copy to win because an admin just
//! changed something on this device.

use crate::record::lenient;
use crate::Week;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CURRENT_WEEK: Week = 1;
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
pub const DEFAULT_ENTRY_FEE: u64 = 35;
pub const DEFAULT_TOTO_PRIZE: u64 = 0;

/// Settings as stored. Every field is optional: absent means "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    #[serde(
        default,
        deserialize_with = "lenient::week",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_week: Option<Week>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub admin_password: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub entry_fee: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub toto_prize: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub submissions_locked: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub countdown_active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub countdown_target: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub current_week: Week,
    pub admin_password: String,
    pub entry_fee: u64,
    pub toto_prize: u64,
    pub submissions_locked: bool,
    pub countdown_active: bool,
    /// Empty when no countdown is scheduled
    pub countdown_target: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            current_week: DEFAULT_CURRENT_WEEK,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            entry_fee: DEFAULT_ENTRY_FEE,
            toto_prize: DEFAULT_TOTO_PRIZE,
            submissions_locked: false,
            countdown_active: false,
            countdown_target: String::new(),
        }
    }
}

impl SettingsRecord {
    /// Fill every absent field with its default.
    pub fn resolved(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            current_week: self.current_week.unwrap_or(defaults.current_week),
            admin_password: self
                .admin_password
                .clone()
                .unwrap_or(defaults.admin_password),
            entry_fee: self.entry_fee.unwrap_or(defaults.entry_fee),
            toto_prize: self.toto_prize.unwrap_or(defaults.toto_prize),
            submissions_locked: self
                .submissions_locked
                .unwrap_or(defaults.submissions_locked),
            countdown_active: self.countdown_active.unwrap_or(defaults.countdown_active),
            countdown_target: self
                .countdown_target
                .clone()
                .unwrap_or(defaults.countdown_target),
        }
    }

    /// Overlay every field present in `patch` onto `self`.
    pub fn apply_patch(&mut self, patch: &SettingsRecord) {
        fn overlay<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if let Some(value) = src {
                *dst = Some(value.clone());
            }
        }

        overlay(&mut self.current_week, &patch.current_week);
        overlay(&mut self.admin_password, &patch.admin_password);
        overlay(&mut self.entry_fee, &patch.entry_fee);
        overlay(&mut self.toto_prize, &patch.toto_prize);
        overlay(&mut self.submissions_locked, &patch.submissions_locked);
        overlay(&mut self.countdown_active, &patch.countdown_active);
        overlay(&mut self.countdown_target, &patch.countdown_target);
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

impl From<Settings> for SettingsRecord {
    fn from(settings: Settings) -> Self {
        Self {
            current_week: Some(settings.current_week),
            admin_password: Some(settings.admin_password),
            entry_fee: Some(settings.entry_fee),
            toto_prize: Some(settings.toto_prize),
            submissions_locked: Some(settings.submissions_locked),
            countdown_active: Some(settings.countdown_active),
            countdown_target: Some(settings.countdown_target),
            extra: Map::new(),
        }
    }
}

/// Reconcile server and local settings.
///
/// Each field takes the server value, then the local value, then the default.
/// With `prefer_local` the order of the first two is swapped. The result has
/// every field present. An active countdown without a target is switched off.
pub fn reconcile_settings(
    server: &SettingsRecord,
    local: &SettingsRecord,
    prefer_local: bool,
) -> SettingsRecord {
    let (primary, secondary) = if prefer_local {
        (local, server)
    } else {
        (server, local)
    };

    let mut merged = secondary.clone();
    merged.apply_patch(primary);

    let mut settings = merged.resolved();
    if settings.countdown_active && settings.countdown_target.trim().is_empty() {
        settings.countdown_active = false;
    }

    let mut record = SettingsRecord::from(settings);
    record.extra = merged.extra;
    record
}
