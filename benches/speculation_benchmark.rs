//! Benchmarks for the per-turn hot paths: applying server updates, cloning
//! the live state, and predicting queued actions.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use battlehack::game::{Map, NEUTRAL_TEAM_ID, Team};
use battlehack::protocol::{EntityData, NextTurn};
use battlehack::{Direction, EntityKind, Location, State};

const SIDE: u32 = 64;

/// A 64x64 board with a checkerboard of throwers for both teams.
fn crowded_state() -> State {
    let map = Map::new(SIDE, SIDE, 8).unwrap();
    let teams = [
        Team::new(NEUTRAL_TEAM_ID, "neutral"),
        Team::new(1, "red"),
        Team::new(2, "blue"),
    ];
    let mut state = State::new(map, teams, 1, 2).unwrap();
    let mut records = Vec::new();
    let mut id = 0;
    for y in (0..64).step_by(3) {
        for x in (0..64).step_by(3) {
            id += 1;
            records.push(EntityData {
                id,
                kind: EntityKind::Thrower,
                team_id: if (x + y) % 2 == 0 { 1 } else { 2 },
                hp: 10,
                location: Location::new(x, y),
                cooldown_end: None,
                holding_end: None,
                held_by: None,
                holding: None,
            });
        }
    }
    state.apply_changed(&records).unwrap();
    state
}

fn bench_apply_update(c: &mut Criterion) {
    let state = crowded_state();
    let moved: Vec<EntityData> = state
        .entities()
        .map(|e| EntityData {
            id: e.id(),
            kind: e.kind(),
            team_id: e.team(),
            hp: e.hp(),
            location: e.location().adjacent_in(Direction::East),
            cooldown_end: Some(1),
            holding_end: None,
            held_by: None,
            holding: None,
        })
        .collect();
    let update = NextTurn {
        turn: 0,
        changed: moved,
        dead: vec![],
        changed_sectors: vec![],
        last_team_id: Some(2),
        next_team_id: Some(1),
        failed: vec![],
        reasons: vec![],
        winner_id: None,
    };

    c.bench_function("apply_next_turn_all_moved", |b| {
        b.iter(|| {
            let mut state = state.clone();
            state.apply_next_turn(black_box(&update)).unwrap();
            black_box(state)
        });
    });
}

fn bench_clone_state(c: &mut Criterion) {
    let state = crowded_state();
    c.bench_function("clone_working_copy", |b| b.iter(|| black_box(state.clone())));
}

fn bench_speculate_turn(c: &mut Criterion) {
    let state = crowded_state();
    let mine: Vec<_> = state
        .entities()
        .filter(|e| e.team() == 1)
        .map(|e| e.id())
        .collect();

    c.bench_function("speculate_moves_and_builds", |b| {
        b.iter(|| {
            let mut state = state.clone();
            for (i, &id) in mine.iter().enumerate() {
                let direction = Direction::ALL[i % 8];
                if i % 2 == 0 && state.can_move(id, direction) {
                    let _ = state.queue_move(id, direction);
                } else if state.can_build(id, direction) {
                    let _ = state.queue_build(id, direction);
                }
            }
            black_box(state.queued_actions().len())
        });
    });
}

fn bench_nearby_queries(c: &mut Criterion) {
    let state = crowded_state();
    let ids: Vec<_> = state.entities().map(|e| e.id()).collect();
    c.bench_function("entities_within_euclidean_distance", |b| {
        b.iter(|| {
            let mut total = 0;
            for &id in ids.iter().step_by(16) {
                total += state
                    .entities_within_euclidean_distance(id, black_box(5.0), false, None)
                    .count();
            }
            black_box(total)
        });
    });
}

criterion_group!(
    benches,
    bench_apply_update,
    bench_clone_state,
    bench_speculate_turn,
    bench_nearby_queries
);
criterion_main!(benches);
