//! Performance benchmarks for toto-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use toto_engine::{
    leaderboard, merge, score, FixedClock, GuessRecord, LocalSession, MatchRecord, MergeOptions,
    Mutation, Pick, PoolState, UserRecord, SLATE_SIZE,
};

/// A pool with `weeks` full slates and `players` guesses per week.
fn pool(weeks: u32, players: usize, stamp: u64) -> PoolState {
    let mut state = PoolState::new();
    for week in 1..=weeks {
        for slot in 0..SLATE_SIZE {
            state.matches.push(
                MatchRecord::new(format!("w{week}-m{slot}"), week, "Home", "Away", stamp)
                    .with_result(if slot % 3 == 0 { Pick::One } else { Pick::Draw }),
            );
        }
        for p in 0..players {
            state.user_guesses.push(GuessRecord::new(
                format!("Player {p}"),
                week,
                vec![Pick::One; SLATE_SIZE],
                stamp + p as u64,
            ));
        }
    }
    for p in 0..players {
        state
            .users
            .push(UserRecord::new(format!("u{p}"), format!("Player {p}"), stamp));
    }
    state
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for players in [10usize, 100, 500].iter() {
        let server = pool(10, *players, 1_000);
        let mut local = pool(10, *players, 2_000);
        local.tombstones.mark_week_deleted(3);
        local.tombstones.mark_user_deleted("player 1");

        group.bench_with_input(
            BenchmarkId::new("server_vs_local", players),
            players,
            |b, _| b.iter(|| merge(black_box(&server), black_box(&local), MergeOptions::default())),
        );
    }

    // Merging against an identical snapshot is the common case on save.
    group.bench_function("identical_snapshot", |b| {
        let state = pool(10, 100, 1_000);
        b.iter(|| merge(black_box(&state), black_box(&state), MergeOptions::default()))
    });

    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");

    group.bench_function("score_slate", |b| {
        let picks = vec![Pick::One; SLATE_SIZE];
        let results: Vec<_> = (0..SLATE_SIZE)
            .map(|i| if i % 2 == 0 { Pick::One } else { Pick::Empty })
            .collect();
        b.iter(|| score(black_box(&picks), black_box(&results)))
    });

    group.bench_function("leaderboard_500", |b| {
        let state = pool(1, 500, 1_000);
        b.iter(|| leaderboard(black_box(&state), black_box(1)))
    });

    group.finish();
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    group.bench_function("submit_guess", |b| {
        let clock = Arc::new(FixedClock::new(1_000));
        let mut session = LocalSession::with_state(pool(1, 200, 1_000), clock.clone());
        b.iter(|| {
            clock.advance(1);
            session.apply(black_box(Mutation::SubmitGuess {
                name: "Player 42".into(),
                week: 1,
                picks: vec![Pick::Two; SLATE_SIZE],
            }))
        })
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let state = pool(10, 100, 1_000);
    let json = state.to_json().unwrap_or_default();

    group.bench_function("state_to_json", |b| b.iter(|| black_box(&state).to_json()));
    group.bench_function("state_from_json", |b| {
        b.iter(|| PoolState::from_json(black_box(&json)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_merge,
    bench_scoring,
    bench_session,
    bench_serialization,
);
criterion_main!(benches);
