//! LocalSession - the state held by one device.
//!
//! The session owns the local [`PoolState`], applies [`Mutation`]s to it and
//! remembers what has not been saved yet. Merging with a server snapshot and
//! acknowledging a successful save are separate steps so that tombstones
//! outlive a failed save.

use crate::score::{recompute_scores, score, week_results, SLATE_SIZE};
use crate::{
    error::Result, merge, Clock, Error, GuessRecord, MatchRecord, MergeOptions, MergeOutcome,
    Mutation, PaymentStatus, Pick, PoolState, RecordId, SettingsRecord, Timestamp, UserRecord,
    Week,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of applying a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// Wire tag of the applied mutation
    pub kind: String,
    /// Number of records added, changed or removed
    pub affected: usize,
    /// Time stamped onto the touched records
    pub timestamp: Timestamp,
}

/// A mutation waiting to be saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    pub mutation: Mutation,
    pub applied_at: Timestamp,
}

/// Local pool state plus the edits made since the last save.
pub struct LocalSession {
    state: PoolState,
    pending: Vec<PendingMutation>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LocalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSession")
            .field("state", &self.state.summary())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl LocalSession {
    /// Start from an empty state.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_state(PoolState::new(), clock)
    }

    /// Start from a previously loaded state. Tombstones in it are kept.
    pub fn with_state(state: PoolState, clock: Arc<dyn Clock>) -> Self {
        Self {
            state,
            pending: Vec::new(),
            clock,
        }
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn into_state(self) -> PoolState {
        self.state
    }

    /// Mutations applied since the last acknowledged save.
    pub fn pending(&self) -> &[PendingMutation] {
        &self.pending
    }

    /// Is there anything to save?
    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty() || !self.state.tombstones.is_empty()
    }

    /// Should the next merge let the local settings win?
    pub fn prefers_local_settings(&self) -> bool {
        self.pending.iter().any(|p| p.mutation.touches_settings())
    }

    /// Apply a local edit.
    pub fn apply(&mut self, mutation: Mutation) -> Result<ApplyResult> {
        let now = self.clock.now_millis();

        let affected = match &mutation {
            Mutation::UpsertMatch { record } => self.upsert_match(record, now)?,
            Mutation::SetResult { match_id, result } => self.set_result(match_id, *result, now)?,
            Mutation::DeleteWeek { week } => self.delete_week(*week)?,
            Mutation::AddUser { name, id } => self.add_user(name, id.as_ref(), now)?,
            Mutation::SetUserPayment { name, status } => {
                self.set_user_payment(name, *status, now)?
            }
            Mutation::DeleteUser { name } => self.delete_user(name)?,
            Mutation::SubmitGuess { name, week, picks } => {
                self.submit_guess(name, *week, picks, now)?
            }
            Mutation::SetGuessPayment { name, week, status } => {
                self.set_guess_payment(name, *week, *status, now)?
            }
            Mutation::DeleteGuess { name, week } => self.delete_guess(name, *week)?,
            Mutation::UpdateSettings { patch } => self.update_settings(patch)?,
        };

        let result = ApplyResult {
            kind: mutation.kind().to_string(),
            affected,
            timestamp: now,
        };
        self.pending.push(PendingMutation {
            mutation,
            applied_at: now,
        });
        Ok(result)
    }

    /// Merge a server snapshot into the local state.
    ///
    /// The local state is replaced by the merged one, which still carries the
    /// tombstones. Save `outcome.state` and call [`acknowledge_saved`] once the
    /// save is confirmed.
    ///
    /// [`acknowledge_saved`]: LocalSession::acknowledge_saved
    pub fn merge_with(&mut self, server: &PoolState) -> MergeOutcome {
        let options = MergeOptions {
            prefer_local_settings: self.prefers_local_settings(),
        };
        let outcome = merge(server, &self.state, options);
        self.state = outcome.state.clone();
        outcome
    }

    /// Adopt a server snapshot when there is nothing local to keep.
    ///
    /// The snapshot still goes through the merge (against an empty state) so
    /// malformed rows and duplicates are cleaned up the same way.
    pub fn refresh_from(&mut self, server: &PoolState) -> MergeOutcome {
        let outcome = merge(server, &PoolState::new(), MergeOptions::default());
        self.replace_state(outcome.state.clone());
        outcome
    }

    /// The merged state has been persisted: drop tombstones and pending edits.
    pub fn acknowledge_saved(&mut self) {
        self.state.tombstones.clear();
        self.pending.clear();
    }

    /// Replace the local state wholesale, e.g. after loading a backup.
    pub fn replace_state(&mut self, state: PoolState) {
        self.state = state;
        self.pending.clear();
    }

    fn check_week(&self, week: Week) -> Result<()> {
        if week == 0 {
            return Err(Error::InvalidWeek(0));
        }
        if self.state.tombstones.is_week_deleted(week) {
            return Err(Error::WeekPendingDeletion(week));
        }
        Ok(())
    }

    fn upsert_match(&mut self, record: &MatchRecord, now: Timestamp) -> Result<usize> {
        let week = record
            .week
            .ok_or_else(|| Error::InvalidRecord("match without a week".into()))?;
        self.check_week(week)?;
        if record.id.trim().is_empty() {
            return Err(Error::InvalidRecord("match without an id".into()));
        }

        let mut record = record.clone();
        record.updated_at = Some(now);

        match self.state.matches.iter_mut().find(|m| m.id == record.id) {
            Some(existing) => {
                record.created_at = existing.created_at.or(Some(now));
                *existing = record;
            }
            None => {
                record.created_at = record.created_at.or(Some(now));
                self.state.matches.push(record);
            }
        }
        recompute_scores(&mut self.state, week);
        Ok(1)
    }

    fn set_result(&mut self, match_id: &str, result: Pick, now: Timestamp) -> Result<usize> {
        let record = self
            .state
            .matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or_else(|| Error::MatchNotFound(match_id.to_string()))?;
        record.result = result;
        record.updated_at = Some(now);

        if let Some(week) = record.week {
            recompute_scores(&mut self.state, week);
        }
        Ok(1)
    }

    fn delete_week(&mut self, week: Week) -> Result<usize> {
        if week == 0 {
            return Err(Error::InvalidWeek(0));
        }
        let before = self.state.matches.len() + self.state.user_guesses.len();
        self.state.matches.retain(|m| m.week != Some(week));
        self.state.user_guesses.retain(|g| g.week != Some(week));
        self.state.tombstones.mark_week_deleted(week);
        Ok(before - self.state.matches.len() - self.state.user_guesses.len())
    }

    fn add_user(&mut self, name: &str, id: Option<&RecordId>, now: Timestamp) -> Result<usize> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidRecord("user without a name".into()));
        }
        if self.state.find_user(trimmed).is_some() {
            return Err(Error::DuplicateUser(trimmed.to_string()));
        }

        let id = match id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => format!("user_{now}_{}", crate::normalize_name(trimmed)),
        };
        self.state.tombstones.unmark_user(trimmed);
        self.state.users.push(UserRecord::new(id, trimmed, now));
        Ok(1)
    }

    fn set_user_payment(
        &mut self,
        name: &str,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Result<usize> {
        let wanted = crate::normalize_name(name);
        let user = self
            .state
            .users
            .iter_mut()
            .find(|u| u.normalized_name() == wanted)
            .ok_or_else(|| Error::UserNotFound(name.to_string()))?;
        user.payment_status = status;
        user.updated_at = Some(now);
        Ok(1)
    }

    fn delete_user(&mut self, name: &str) -> Result<usize> {
        let wanted = crate::normalize_name(name);
        if wanted.is_empty() {
            return Err(Error::InvalidRecord("user without a name".into()));
        }

        let users_before = self.state.users.len();
        self.state.users.retain(|u| u.normalized_name() != wanted);
        let removed_users = users_before - self.state.users.len();

        let mut removed_guesses = 0;
        let tombstones = &mut self.state.tombstones;
        self.state.user_guesses.retain(|g| {
            if g.normalized_name() != wanted {
                return true;
            }
            if let Some(week) = g.week {
                tombstones.mark_guess_deleted(&g.name, week);
            }
            removed_guesses += 1;
            false
        });
        tombstones.mark_user_deleted(name);

        Ok(removed_users + removed_guesses)
    }

    fn submit_guess(
        &mut self,
        name: &str,
        week: Week,
        picks: &[Pick],
        now: Timestamp,
    ) -> Result<usize> {
        if self.state.settings().submissions_locked {
            return Err(Error::SubmissionsLocked);
        }
        self.check_week(week)?;
        if picks.len() != SLATE_SIZE {
            return Err(Error::PickCount {
                expected: SLATE_SIZE,
                actual: picks.len(),
            });
        }
        let user = self
            .state
            .find_user(name)
            .ok_or_else(|| Error::UserNotFound(name.to_string()))?;
        let (user_id, display_name) = (user.id.clone(), user.name.clone());

        let results = week_results(&self.state.matches, week);
        let fresh = score(picks, &results);
        let wanted = crate::normalize_name(name);

        match self
            .state
            .user_guesses
            .iter_mut()
            .find(|g| g.week == Some(week) && g.normalized_name() == wanted)
        {
            Some(existing) => {
                existing.picks = picks.to_vec();
                existing.score = fresh;
                existing.user_id = Some(user_id);
                existing.updated_at = Some(now);
            }
            None => {
                let mut guess = GuessRecord::new(display_name, week, picks.to_vec(), now);
                guess.id = Some(format!("guess_{now}_{wanted}_{week}"));
                guess.user_id = Some(user_id);
                guess.score = fresh;
                self.state.user_guesses.push(guess);
            }
        }
        self.state.tombstones.unmark_guess(name, week);
        Ok(1)
    }

    fn set_guess_payment(
        &mut self,
        name: &str,
        week: Week,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Result<usize> {
        let wanted = crate::normalize_name(name);
        let guess = self
            .state
            .user_guesses
            .iter_mut()
            .find(|g| g.week == Some(week) && g.normalized_name() == wanted)
            .ok_or_else(|| Error::GuessNotFound {
                name: name.to_string(),
                week,
            })?;
        guess.payment_status = status;
        guess.updated_at = Some(now);
        Ok(1)
    }

    // The tombstone is recorded even when the guess is only known to the
    // server copy.
    fn delete_guess(&mut self, name: &str, week: Week) -> Result<usize> {
        if week == 0 {
            return Err(Error::InvalidWeek(0));
        }
        let wanted = crate::normalize_name(name);
        let before = self.state.user_guesses.len();
        self.state
            .user_guesses
            .retain(|g| !(g.week == Some(week) && g.normalized_name() == wanted));
        self.state.tombstones.mark_guess_deleted(name, week);
        Ok(before - self.state.user_guesses.len())
    }

    fn update_settings(&mut self, patch: &SettingsRecord) -> Result<usize> {
        if patch.current_week == Some(0) {
            return Err(Error::InvalidWeek(0));
        }
        self.state.settings.apply_patch(patch);
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedClock;

    fn slate(pick: Pick) -> Vec<Pick> {
        vec![pick; SLATE_SIZE]
    }

    fn session() -> (LocalSession, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(1_000));
        let session = LocalSession::new(clock.clone());
        (session, clock)
    }

    fn add_user(session: &mut LocalSession, name: &str) {
        session
            .apply(Mutation::AddUser {
                name: name.into(),
                id: None,
            })
            .unwrap();
    }

    #[test]
    fn apply_stamps_and_tracks_pending() {
        let (mut session, clock) = session();
        clock.set(5_000);
        let result = session
            .apply(Mutation::UpsertMatch {
                record: MatchRecord::new("m1", 1, "A", "B", 0),
            })
            .unwrap();

        assert_eq!(result.kind, "upsertMatch");
        assert_eq!(result.timestamp, 5_000);
        assert_eq!(session.state().matches[0].updated_at, Some(5_000));
        assert_eq!(session.state().matches[0].created_at, Some(0));
        assert_eq!(session.pending().len(), 1);
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn upsert_replaces_by_id_and_keeps_created_at() {
        let (mut session, clock) = session();
        session
            .apply(Mutation::UpsertMatch {
                record: MatchRecord::new("m1", 1, "A", "B", 1_000),
            })
            .unwrap();
        clock.advance(10);
        session
            .apply(Mutation::UpsertMatch {
                record: MatchRecord::new("m1", 1, "A", "C", 9_999),
            })
            .unwrap();

        let matches = &session.state().matches;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].away_team, "C");
        assert_eq!(matches[0].created_at, Some(1_000));
        assert_eq!(matches[0].updated_at, Some(1_010));
    }

    #[test]
    fn set_result_rescored_guesses() {
        let (mut session, _) = session();
        for i in 0..SLATE_SIZE {
            session
                .apply(Mutation::UpsertMatch {
                    record: MatchRecord::new(format!("m{i}"), 1, "A", "B", 0),
                })
                .unwrap();
        }
        add_user(&mut session, "Dana");
        session
            .apply(Mutation::SubmitGuess {
                name: "dana".into(),
                week: 1,
                picks: slate(Pick::One),
            })
            .unwrap();
        assert_eq!(session.state().user_guesses[0].score, 0);

        session
            .apply(Mutation::SetResult {
                match_id: "m3".into(),
                result: Pick::One,
            })
            .unwrap();
        assert_eq!(session.state().user_guesses[0].score, 1);
        assert_eq!(session.state().user_guesses[0].name, "Dana");

        let err = session
            .apply(Mutation::SetResult {
                match_id: "nope".into(),
                result: Pick::Two,
            })
            .unwrap_err();
        assert_eq!(err, Error::MatchNotFound("nope".into()));
    }

    #[test]
    fn delete_week_records_tombstone() {
        let (mut session, _) = session();
        session
            .apply(Mutation::UpsertMatch {
                record: MatchRecord::new("m1", 2, "A", "B", 0),
            })
            .unwrap();
        let result = session.apply(Mutation::DeleteWeek { week: 2 }).unwrap();

        assert_eq!(result.affected, 1);
        assert!(session.state().matches.is_empty());
        assert!(session.state().tombstones.is_week_deleted(2));

        let err = session
            .apply(Mutation::UpsertMatch {
                record: MatchRecord::new("m2", 2, "A", "B", 0),
            })
            .unwrap_err();
        assert_eq!(err, Error::WeekPendingDeletion(2));
    }

    #[test]
    fn duplicate_user_names_are_rejected() {
        let (mut session, _) = session();
        add_user(&mut session, "Dana");
        let err = session
            .apply(Mutation::AddUser {
                name: " dana ".into(),
                id: None,
            })
            .unwrap_err();
        assert_eq!(err, Error::DuplicateUser("dana".into()));
    }

    #[test]
    fn delete_user_cascades_to_guesses() {
        let (mut session, _) = session();
        add_user(&mut session, "Dana");
        add_user(&mut session, "Avi");
        for name in ["Dana", "Avi"] {
            session
                .apply(Mutation::SubmitGuess {
                    name: name.into(),
                    week: 1,
                    picks: slate(Pick::Draw),
                })
                .unwrap();
        }

        let result = session
            .apply(Mutation::DeleteUser {
                name: "DANA".into(),
            })
            .unwrap();
        assert_eq!(result.affected, 2);

        let state = session.state();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.user_guesses.len(), 1);
        assert!(state.tombstones.is_user_deleted("dana"));
        assert!(state.tombstones.is_guess_deleted("dana__1"));
    }

    #[test]
    fn re_adding_a_deleted_user_clears_the_tombstone() {
        let (mut session, _) = session();
        add_user(&mut session, "Dana");
        session
            .apply(Mutation::DeleteUser {
                name: "Dana".into(),
            })
            .unwrap();
        add_user(&mut session, "dana");
        assert!(!session.state().tombstones.is_user_deleted("dana"));
    }

    #[test]
    fn submit_guess_validation() {
        let (mut session, _) = session();

        let err = session
            .apply(Mutation::SubmitGuess {
                name: "ghost".into(),
                week: 1,
                picks: slate(Pick::One),
            })
            .unwrap_err();
        assert_eq!(err, Error::UserNotFound("ghost".into()));

        add_user(&mut session, "Dana");
        let err = session
            .apply(Mutation::SubmitGuess {
                name: "Dana".into(),
                week: 1,
                picks: vec![Pick::One; 3],
            })
            .unwrap_err();
        assert_eq!(
            err,
            Error::PickCount {
                expected: SLATE_SIZE,
                actual: 3
            }
        );

        let err = session
            .apply(Mutation::SubmitGuess {
                name: "Dana".into(),
                week: 0,
                picks: slate(Pick::One),
            })
            .unwrap_err();
        assert_eq!(err, Error::InvalidWeek(0));

        session
            .apply(Mutation::UpdateSettings {
                patch: SettingsRecord {
                    submissions_locked: Some(true),
                    ..Default::default()
                },
            })
            .unwrap();
        let err = session
            .apply(Mutation::SubmitGuess {
                name: "Dana".into(),
                week: 1,
                picks: slate(Pick::One),
            })
            .unwrap_err();
        assert_eq!(err, Error::SubmissionsLocked);
        assert!(session.state().user_guesses.is_empty());
    }

    #[test]
    fn resubmitting_replaces_the_guess() {
        let (mut session, clock) = session();
        add_user(&mut session, "Dana");
        session
            .apply(Mutation::SubmitGuess {
                name: "Dana".into(),
                week: 1,
                picks: slate(Pick::One),
            })
            .unwrap();
        session
            .apply(Mutation::DeleteGuess {
                name: "Dana".into(),
                week: 1,
            })
            .unwrap();
        assert!(session.state().tombstones.is_guess_deleted("dana__1"));

        clock.advance(1);
        session
            .apply(Mutation::SubmitGuess {
                name: "dana".into(),
                week: 1,
                picks: slate(Pick::Two),
            })
            .unwrap();
        clock.advance(1);
        session
            .apply(Mutation::SubmitGuess {
                name: "Dana".into(),
                week: 1,
                picks: slate(Pick::Draw),
            })
            .unwrap();

        let state = session.state();
        assert_eq!(state.user_guesses.len(), 1);
        assert_eq!(state.user_guesses[0].picks, slate(Pick::Draw));
        assert_eq!(state.user_guesses[0].updated_at, Some(1_002));
        assert!(!state.tombstones.is_guess_deleted("dana__1"));
    }

    #[test]
    fn payments() {
        let (mut session, _) = session();
        add_user(&mut session, "Dana");
        session
            .apply(Mutation::SetUserPayment {
                name: "dana".into(),
                status: PaymentStatus::Paid,
            })
            .unwrap();
        assert!(session.state().users[0].payment_status.is_paid());

        let err = session
            .apply(Mutation::SetGuessPayment {
                name: "Dana".into(),
                week: 1,
                status: PaymentStatus::Paid,
            })
            .unwrap_err();
        assert!(matches!(err, Error::GuessNotFound { week: 1, .. }));
    }

    #[test]
    fn failed_mutations_are_not_pending() {
        let (mut session, _) = session();
        let _ = session.apply(Mutation::SetUserPayment {
            name: "nobody".into(),
            status: PaymentStatus::Paid,
        });
        assert!(session.pending().is_empty());
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn settings_edit_prefers_local_until_saved() {
        let (mut session, _) = session();
        session
            .apply(Mutation::UpdateSettings {
                patch: SettingsRecord {
                    current_week: Some(7),
                    ..Default::default()
                },
            })
            .unwrap();
        assert!(session.prefers_local_settings());

        let mut server = PoolState::new();
        server.settings.current_week = Some(6);
        let outcome = session.merge_with(&server);
        assert_eq!(outcome.state.settings().current_week, 7);

        session.acknowledge_saved();
        assert!(!session.prefers_local_settings());
        let outcome = session.merge_with(&server);
        assert_eq!(outcome.state.settings().current_week, 6);
    }

    #[test]
    fn acknowledge_clears_tombstones_only_when_called() {
        let (mut session, _) = session();
        session.apply(Mutation::DeleteWeek { week: 3 }).unwrap();

        let mut server = PoolState::new();
        server
            .matches
            .push(MatchRecord::new("old", 3, "A", "B", 10_000));
        let outcome = session.merge_with(&server);
        assert!(outcome.state.matches.is_empty());
        assert!(session.state().tombstones.is_week_deleted(3));

        session.acknowledge_saved();
        assert!(session.state().tombstones.is_empty());
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn debug_shows_summary() {
        let (session, _) = session();
        let text = format!("{session:?}");
        assert!(text.contains("LocalSession"));
    }
}
