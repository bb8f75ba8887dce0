//! Scoring, leaderboard and pot.
//!
//! A guess scores one point for every position where both the pick and the
//! match result are decided and equal. Scores are derived data: they are
//! refreshed from the results rather than merged.

use crate::identity::normalize_name;
use crate::{MatchRecord, PaymentStatus, Pick, PoolState, Week};
use serde::{Deserialize, Serialize};

/// Number of matches in a weekly slate.
pub const SLATE_SIZE: usize = 16;

/// Count positions where the pick equals a decided result.
///
/// Undecided results never count, even against an empty pick. Extra picks or
/// results beyond the shorter of the two are ignored.
pub fn score(picks: &[Pick], results: &[Pick]) -> u32 {
    picks
        .iter()
        .zip(results)
        .filter(|(pick, result)| result.is_decided() && pick == result)
        .count() as u32
}

/// Results of a week's matches, in collection order.
pub fn week_results(matches: &[MatchRecord], week: Week) -> Vec<Pick> {
    matches
        .iter()
        .filter(|m| m.week == Some(week))
        .map(|m| m.result)
        .collect()
}

/// Refresh the `score` of every guess in `week`. Returns how many changed.
pub fn recompute_scores(state: &mut PoolState, week: Week) -> usize {
    let results = week_results(&state.matches, week);
    let mut changed = 0;
    for guess in state
        .user_guesses
        .iter_mut()
        .filter(|g| g.week == Some(week))
    {
        let fresh = score(&guess.picks, &results);
        if guess.score != fresh {
            guess.score = fresh;
            changed += 1;
        }
    }
    changed
}

/// One line of a weekly leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    /// 1-based; equal scores share a rank
    pub rank: usize,
    pub name: String,
    pub score: u32,
    pub payment_status: PaymentStatus,
}

/// Rank the guesses of `week` against the current results.
///
/// Ordered by score (highest first), then by normalized name. Tied scores
/// share a rank and the next rank skips ahead (1, 1, 3).
pub fn leaderboard(state: &PoolState, week: Week) -> Vec<LeaderboardRow> {
    let results = week_results(&state.matches, week);

    let mut scored: Vec<_> = state
        .guesses_for_week(week)
        .map(|g| {
            (
                score(&g.picks, &results),
                normalize_name(&g.name),
                g.name.clone(),
                g.payment_status,
            )
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut rows: Vec<LeaderboardRow> = Vec::with_capacity(scored.len());
    for (position, (score, _, name, payment_status)) in scored.into_iter().enumerate() {
        let rank = match rows.last() {
            Some(prev) if prev.score == score => prev.rank,
            _ => position + 1,
        };
        rows.push(LeaderboardRow {
            rank,
            name,
            score,
            payment_status,
        });
    }
    rows
}

/// Entry fee times the number of guesses submitted for `week`.
pub fn pot(state: &PoolState, week: Week) -> u64 {
    let entries = state.guesses_for_week(week).count() as u64;
    state.settings().entry_fee.saturating_mul(entries)
}

/// Like [`pot`], counting only paid guesses.
pub fn paid_pot(state: &PoolState, week: Week) -> u64 {
    let paid = state
        .guesses_for_week(week)
        .filter(|g| g.payment_status.is_paid())
        .count() as u64;
    state.settings().entry_fee.saturating_mul(paid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuessRecord;

    fn picks(raw: &[&str]) -> Vec<Pick> {
        raw.iter().map(|s| Pick::parse(s)).collect()
    }

    #[test]
    fn counts_exact_matches() {
        assert_eq!(score(&picks(&["1", "X", "2"]), &picks(&["1", "X", "2"])), 3);
        assert_eq!(score(&picks(&["1", "X", "2"]), &picks(&["2", "X", "1"])), 1);
    }

    #[test]
    fn undecided_results_never_count() {
        assert_eq!(score(&picks(&["", "", ""]), &picks(&["", "", ""])), 0);
        // A decided pick on a decided result counts even when the rest of the
        // slate is open. An older worked example gave 0 here; the counting rule wins.
        assert_eq!(score(&picks(&["1", "", ""]), &picks(&["1", "", ""])), 1);
        assert_eq!(score(&picks(&["1", "X", "2"]), &picks(&["", "", ""])), 0);
    }

    #[test]
    fn length_mismatch_uses_shorter() {
        assert_eq!(score(&picks(&["1", "1"]), &picks(&["1"])), 1);
        assert_eq!(score(&[], &picks(&["1"])), 0);
    }

    #[test]
    fn score_is_pure() {
        let p = picks(&["1", "X", "2", "1"]);
        let r = picks(&["1", "2", "2", ""]);
        assert_eq!(score(&p, &r), score(&p, &r));
    }

    fn week_state() -> PoolState {
        let mut state = PoolState::new();
        for (i, result) in ["1", "X", "2"].iter().enumerate() {
            state.matches.push(
                MatchRecord::new(format!("m{i}"), 1, "H", "A", 100).with_result(Pick::parse(result)),
            );
        }
        state
            .matches
            .push(MatchRecord::new("other", 2, "H", "A", 100).with_result(Pick::One));

        state
            .user_guesses
            .push(GuessRecord::new("Noa", 1, picks(&["1", "X", "1"]), 100));
        let mut avi = GuessRecord::new("Avi", 1, picks(&["1", "X", "2"]), 100);
        avi.payment_status = PaymentStatus::Paid;
        state.user_guesses.push(avi);
        state
            .user_guesses
            .push(GuessRecord::new("dana", 1, picks(&["1", "1", "1"]), 100));
        state
            .user_guesses
            .push(GuessRecord::new("Beni", 1, picks(&["2", "X", "2"]), 100));
        state
    }

    #[test]
    fn week_results_in_order() {
        let state = week_state();
        assert_eq!(week_results(&state.matches, 1), picks(&["1", "X", "2"]));
        assert_eq!(week_results(&state.matches, 2), picks(&["1"]));
        assert!(week_results(&state.matches, 3).is_empty());
    }

    #[test]
    fn recompute_updates_only_the_week() {
        let mut state = week_state();
        state
            .user_guesses
            .push(GuessRecord::new("Avi", 2, picks(&["1"]), 100));

        let changed = recompute_scores(&mut state, 1);
        assert_eq!(changed, 4);
        let scores: Vec<_> = state.user_guesses.iter().map(|g| g.score).collect();
        assert_eq!(scores, vec![2, 3, 1, 2, 0]);

        assert_eq!(recompute_scores(&mut state, 1), 0);
    }

    #[test]
    fn leaderboard_shares_ranks() {
        let board = leaderboard(&week_state(), 1);
        let summary: Vec<_> = board
            .iter()
            .map(|r| (r.rank, r.name.as_str(), r.score))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "Avi", 3), (2, "Beni", 2), (2, "Noa", 2), (4, "dana", 1)]
        );
        assert!(board[0].payment_status.is_paid());
    }

    #[test]
    fn leaderboard_of_empty_week() {
        assert!(leaderboard(&week_state(), 9).is_empty());
    }

    #[test]
    fn pot_uses_entry_fee() {
        let mut state = week_state();
        assert_eq!(pot(&state, 1), 4 * crate::settings::DEFAULT_ENTRY_FEE);
        assert_eq!(paid_pot(&state, 1), crate::settings::DEFAULT_ENTRY_FEE);

        state.settings.entry_fee = Some(50);
        assert_eq!(pot(&state, 1), 200);
        assert_eq!(pot(&state, 2), 0);
    }

    #[test]
    fn pot_saturates_on_huge_fee() {
        let mut state = week_state();
        state.settings.entry_fee = Some(u64::MAX / 2);
        assert_eq!(pot(&state, 1), u64::MAX);
        assert_eq!(paid_pot(&state, 1), u64::MAX / 2);
    }
}
