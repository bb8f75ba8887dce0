//! The I/O bracket around a merge.
//!
//! A sync is fetch, merge, save, acknowledge. Only the merge lives in this
//! crate; fetching and saving go through a [`StateStore`] supplied by the
//! caller. A session with no unsaved changes only fetches: its copy may be
//! older than the server's and must not be written back over it.

use crate::{error::Result, Error, LocalSession, MergeOutcome, PoolState};

/// Storage holding the shared pool state under a single key.
pub trait StateStore {
    /// Fetch the stored state. `None` when nothing has been saved yet.
    fn load(&mut self) -> Result<Option<PoolState>>;

    /// Replace the stored state.
    fn save(&mut self, state: &PoolState) -> Result<()>;
}

/// Fetch the server state, merge it into the session and save the result.
///
/// The saved copy has no tombstones: once it is stored the deleted rows are
/// gone and the markers have done their job. If the save fails the session
/// keeps its tombstones so the deletions survive the retry.
pub fn sync<S>(session: &mut LocalSession, store: &mut S) -> Result<MergeOutcome>
where
    S: StateStore + ?Sized,
{
    let server = store.load()?.unwrap_or_default();
    if !session.has_unsaved_changes() {
        return Ok(session.refresh_from(&server));
    }

    let outcome = session.merge_with(&server);
    store.save(&outcome.state.without_tombstones())?;
    session.acknowledge_saved();
    Ok(outcome)
}

/// In-memory [`StateStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<PoolState>,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PoolState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn state(&self) -> Option<&PoolState> {
        self.state.as_ref()
    }

    /// Make every following save fail (or succeed again).
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStore {
    fn load(&mut self) -> Result<Option<PoolState>> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &PoolState) -> Result<()> {
        if self.fail_saves {
            return Err(Error::Storage("store unavailable".into()));
        }
        self.state = Some(state.clone());
        self.saves += 1;
        Ok(())
    }
}
