//! Reconciliation of a server snapshot with the local state.
//!
//! # Algorithm
//!
//! For each collection (matches, users, guesses):
//!
//! 1. Drop records without an identity key (counted, never raised)
//! 2. Drop records covered by a tombstone, from either side
//! 3. Collapse duplicates inside each side, keeping the most recent copy
//! 4. Walk the server records in order, then fold in local records: a shared
//!    key keeps the more recent copy (local wins ties), a new key is appended
//! 5. Users get a second pass keyed by normalized name, since ids are not
//!    stable across devices
//!
//! Settings are reconciled field by field (see [`crate::settings`]).
//!
//! The merge is pure and total: any two states produce a state.

use crate::clock::local_wins;
use crate::identity::{Keyed, Stamped};
use crate::record::Origin;
use crate::settings::reconcile_settings;
use crate::{GuessRecord, MatchRecord, PoolState, Tombstones, UserRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options for a single merge call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    /// Local settings override the server's for this merge only
    #[serde(default)]
    pub prefer_local_settings: bool,
}

impl MergeOptions {
    pub fn prefer_local_settings() -> Self {
        Self {
            prefer_local_settings: true,
        }
    }
}

/// What happened to one collection during a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    /// Server records that made it into the result unchanged
    pub server_kept: usize,
    /// Local records with no server counterpart
    pub local_inserted: usize,
    /// Shared keys where the local copy won
    pub local_won: usize,
    /// Shared keys where the server copy won
    pub server_won: usize,
    /// Records refused because of a tombstone
    pub suppressed: usize,
    /// Records without an identity key
    pub dropped_malformed: usize,
    /// Duplicates collapsed into another record
    pub collapsed: usize,
}

/// Per-collection merge statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub matches: CollectionReport,
    pub users: CollectionReport,
    pub guesses: CollectionReport,
}

impl MergeReport {
    /// Malformed records dropped across all collections.
    pub fn dropped_malformed(&self) -> usize {
        self.matches.dropped_malformed
            + self.users.dropped_malformed
            + self.guesses.dropped_malformed
    }

    /// Records refused because of tombstones across all collections.
    pub fn suppressed(&self) -> usize {
        self.matches.suppressed + self.users.suppressed + self.guesses.suppressed
    }

    /// Did any local record win or get inserted?
    pub fn has_local_changes(&self) -> bool {
        [self.matches, self.users, self.guesses]
            .iter()
            .any(|c| c.local_won > 0 || c.local_inserted > 0)
    }
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Reconciled state, carrying the union of both sides' tombstones
    pub state: PoolState,
    pub report: MergeReport,
}

/// A record tagged with the side it came from.
#[derive(Debug, Clone)]
struct Entry<R> {
    key: String,
    record: R,
    origin: Origin,
}

/// Merge a server snapshot with the local state.
pub fn merge(server: &PoolState, local: &PoolState, options: MergeOptions) -> MergeOutcome {
    let mut tombstones = local.tombstones.clone();
    tombstones.extend(&server.tombstones);

    let mut report = MergeReport::default();

    let matches = merge_matches(
        &server.matches,
        &local.matches,
        &tombstones,
        &mut report.matches,
    );
    let users = merge_users(&server.users, &local.users, &tombstones, &mut report.users);
    let user_guesses = merge_guesses(
        &server.user_guesses,
        &local.user_guesses,
        &tombstones,
        &mut report.guesses,
    );
    let settings = reconcile_settings(
        &server.settings,
        &local.settings,
        options.prefer_local_settings,
    );

    MergeOutcome {
        state: PoolState {
            matches,
            users,
            user_guesses,
            settings,
            tombstones,
        },
        report,
    }
}

/// Merge match lists. A deleted week removes every match in it.
pub fn merge_matches(
    server: &[MatchRecord],
    local: &[MatchRecord],
    tombstones: &Tombstones,
    report: &mut CollectionReport,
) -> Vec<MatchRecord> {
    let suppressed = |m: &MatchRecord| m.week.is_some_and(|w| tombstones.is_week_deleted(w));
    into_records(merge_collection(server, local, suppressed, report))
}

/// Merge user lists: first by id, then by normalized name.
pub fn merge_users(
    server: &[UserRecord],
    local: &[UserRecord],
    tombstones: &Tombstones,
    report: &mut CollectionReport,
) -> Vec<UserRecord> {
    let suppressed = |u: &UserRecord| tombstones.is_user_deleted(&u.normalized_name());
    let by_id = merge_collection(server, local, suppressed, report);
    let by_name = collapse_by(by_id, |u| u.normalized_name(), report);
    into_records(by_name)
}

/// Merge guess lists keyed by `(normalized name, week)`.
pub fn merge_guesses(
    server: &[GuessRecord],
    local: &[GuessRecord],
    tombstones: &Tombstones,
    report: &mut CollectionReport,
) -> Vec<GuessRecord> {
    let suppressed = |g: &GuessRecord| {
        g.week
            .is_some_and(|w| tombstones.is_guess_suppressed(&g.name, w))
    };
    into_records(merge_collection(server, local, suppressed, report))
}

fn into_records<R>(entries: Vec<Entry<R>>) -> Vec<R> {
    entries.into_iter().map(|e| e.record).collect()
}

/// Core last-writer-wins merge over one collection.
///
/// Output order: server order first, then local-only records in local order.
fn merge_collection<R, S>(
    server: &[R],
    local: &[R],
    suppressed: S,
    report: &mut CollectionReport,
) -> Vec<Entry<R>>
where
    R: Clone + Keyed + Stamped,
    S: Fn(&R) -> bool,
{
    let mut merged = admit(server, Origin::Server, &suppressed, report);
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, e)| (e.key.clone(), i))
        .collect();

    for incoming in admit(local, Origin::Local, &suppressed, report) {
        match index.get(&incoming.key) {
            Some(&i) => {
                let slot = &mut merged[i];
                if local_wins(incoming.record.recency(), slot.record.recency()) {
                    *slot = incoming;
                    report.local_won += 1;
                } else {
                    report.server_won += 1;
                }
            }
            None => {
                index.insert(incoming.key.clone(), merged.len());
                merged.push(incoming);
                report.local_inserted += 1;
            }
        }
    }

    report.server_kept += merged
        .iter()
        .filter(|e| e.origin == Origin::Server)
        .count();
    merged
}

/// Filter one side's records and collapse its internal duplicates.
///
/// Within a side, the later timestamp wins; on a tie the later position wins.
/// The surviving record keeps the position of the first occurrence.
fn admit<R, S>(
    records: &[R],
    origin: Origin,
    suppressed: &S,
    report: &mut CollectionReport,
) -> Vec<Entry<R>>
where
    R: Clone + Keyed + Stamped,
    S: Fn(&R) -> bool,
{
    let mut admitted: Vec<Entry<R>> = Vec::with_capacity(records.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());

    for record in records {
        let Some(key) = record.key() else {
            report.dropped_malformed += 1;
            continue;
        };
        if suppressed(record) {
            report.suppressed += 1;
            continue;
        }

        match index.get(&key) {
            Some(&i) => {
                report.collapsed += 1;
                if record.recency() >= admitted[i].record.recency() {
                    admitted[i].record = record.clone();
                }
            }
            None => {
                index.insert(key.clone(), admitted.len());
                admitted.push(Entry {
                    key,
                    record: record.clone(),
                    origin,
                });
            }
        }
    }

    admitted
}

/// Second reduction pass over already-merged entries under another key.
///
/// The more recent record wins; on a tie a local record beats a server one.
fn collapse_by<R, K>(
    entries: Vec<Entry<R>>,
    key: K,
    report: &mut CollectionReport,
) -> Vec<Entry<R>>
where
    R: Stamped,
    K: Fn(&R) -> String,
{
    let mut out: Vec<Entry<R>> = Vec::with_capacity(entries.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(entries.len());

    for entry in entries {
        let k = key(&entry.record);
        match index.get(&k) {
            Some(&i) => {
                report.collapsed += 1;
                let current = &out[i];
                let newer = entry.record.recency() > current.record.recency();
                let tie_to_local = entry.record.recency() == current.record.recency()
                    && entry.origin == Origin::Local
                    && current.origin == Origin::Server;
                if newer || tie_to_local {
                    out[i] = entry;
                }
            }
            None => {
                index.insert(k, out.len());
                out.push(entry);
            }
        }
    }

    out
}
