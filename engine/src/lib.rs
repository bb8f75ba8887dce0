//! # Toto Engine
//!
//! Reconciliation engine for a weekly football pool.
//!
//! Several devices hold copies of the same pool (matches, users, weekly
//! guesses and settings) and save them to a single shared key. Before saving,
//! a device fetches the server copy and merges it with its own so that neither
//! side's edits are lost and deletions are not undone by a stale copy.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never talks to storage; callers bracket the merge
//!   with their own fetch and save (see [`sync()`])
//! - **Total**: any two states merge into a state; malformed records are
//!   dropped and counted, never raised
//! - **Deterministic**: same inputs, same output, same order
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! [`MatchRecord`], [`UserRecord`] and [`GuessRecord`] are typed structs with
//! an `extra` map for fields this crate does not know about.
//!
//! ### Last writer wins
//!
//! Two copies of the same record are compared by `updatedAt` (then
//! `createdAt`). On an exact tie the local copy wins, see [`clock::local_wins`].
//!
//! ### Tombstones
//!
//! [`Tombstones`] record deletions made on this device. While present they
//! suppress the deleted rows on both sides of a merge. They are cleared only
//! after the merged state has been saved.
//!
//! ## Quick Start
//!
//! ```rust
//! use toto_engine::{merge, MatchRecord, MergeOptions, Pick, PoolState};
//!
//! let mut server = PoolState::new();
//! server.matches.push(MatchRecord::new("m1", 1, "Hapoel", "Maccabi", 1000));
//!
//! let mut local = PoolState::new();
//! let edited = MatchRecord::new("m1", 1, "Hapoel", "Maccabi", 1000)
//!     .with_result(Pick::One)
//!     .with_updated_at(2000);
//! local.matches.push(edited);
//! local.tombstones.mark_week_deleted(2);
//!
//! let outcome = merge(&server, &local, MergeOptions::default());
//! assert_eq!(outcome.state.matches[0].result, Pick::One);
//! assert!(outcome.state.tombstones.is_week_deleted(2));
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes the merge, scoring and a local session over a C
//! ABI. All data is exchanged as JSON strings.

pub mod clock;
pub mod error;
pub mod ffi;
pub mod identity;
pub mod merge;
pub mod mutation;
pub mod record;
pub mod score;
pub mod session;
pub mod settings;
pub mod state;
pub mod sync;
pub mod tombstone;

// Re-export main types at crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::Error;
pub use identity::{guess_key, normalize_name, parse_guess_key};
pub use merge::{merge, CollectionReport, MergeOptions, MergeOutcome, MergeReport};
pub use mutation::Mutation;
pub use record::{GuessRecord, MatchRecord, Origin, PaymentStatus, Pick, UserRecord};
pub use score::{
    leaderboard, paid_pot, pot, recompute_scores, score, week_results, LeaderboardRow, SLATE_SIZE,
};
pub use session::{ApplyResult, LocalSession};
pub use settings::{reconcile_settings, Settings, SettingsRecord};
pub use state::{PoolState, StateSummary};
pub use sync::{sync, MemoryStore, StateStore};
pub use tombstone::Tombstones;

/// Type aliases for clarity
pub type RecordId = String;
pub type Week = u32;
pub type Timestamp = u64;
