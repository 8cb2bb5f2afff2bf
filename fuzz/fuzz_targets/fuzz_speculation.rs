#![no_main]

//! Action prediction fuzzer.
//!
//! Builds a small board from fuzzer input, then queues arbitrary actions
//! across several turns. Prediction must never break occupancy.

use arbitrary::Arbitrary;
use battlehack::game::{Map, NEUTRAL_TEAM_ID, Team, Tile, check_occupancy};
use battlehack::protocol::{EntityData, NextTurn};
use battlehack::{Direction, EntityKind, Location, State};
use libfuzzer_sys::fuzz_target;

/// One entity on the starting board.
#[derive(Arbitrary, Debug)]
struct FuzzEntity {
    x: u8,
    y: u8,
    kind: u8,
    mine: bool,
    hp: u8,
}

/// One attempted action.
#[derive(Arbitrary, Debug)]
enum FuzzAction {
    Move { actor: u8, direction: u8 },
    Build { actor: u8, direction: u8 },
    Throw { actor: u8, direction: u8 },
    Pickup { actor: u8, target: u8 },
    Disintegrate { actor: u8 },
    Damage { target: u8, amount: u8 },
    EndTurn,
}

/// Structured input for prediction fuzzing.
#[derive(Arbitrary, Debug)]
struct SpeculationInput {
    dirt: Vec<(u8, u8)>,
    entities: Vec<FuzzEntity>,
    actions: Vec<FuzzAction>,
}

const SIDE: u8 = 12;

fuzz_target!(|input: SpeculationInput| {
    let Some(mut map) = Map::new(u32::from(SIDE), u32::from(SIDE), 4) else {
        return;
    };
    for (x, y) in input.dirt.into_iter().take(40) {
        map.set_tile(Location::new(i32::from(x % SIDE), i32::from(y % SIDE)), Tile::Dirt);
    }
    let teams = [
        Team::new(NEUTRAL_TEAM_ID, "neutral"),
        Team::new(1, "red"),
        Team::new(2, "blue"),
    ];
    let Ok(mut state) = State::new(map, teams, 1, 2) else {
        return;
    };

    let mut records: Vec<EntityData> = Vec::new();
    for (entity, id) in input.entities.into_iter().take(40).zip(1u32..) {
        let location = Location::new(i32::from(entity.x % SIDE), i32::from(entity.y % SIDE));
        if records.iter().any(|r| r.location == location) {
            continue;
        }
        let kind = match entity.kind % 3 {
            0 => EntityKind::Thrower,
            1 => EntityKind::Hedge,
            _ => EntityKind::Statue,
        };
        records.push(EntityData {
            id,
            kind,
            team_id: if entity.mine { 1 } else { 2 },
            hp: i32::from(entity.hp % 20) + 1,
            location,
            cooldown_end: None,
            holding_end: None,
            held_by: None,
            holding: None,
        });
    }
    if records.is_empty() || state.apply_changed(&records).is_err() {
        return;
    }
    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    let pick = |n: u8| ids[usize::from(n) % ids.len()];
    let direction = |n: u8| Direction::ALL[usize::from(n) % 8];

    for action in input.actions.into_iter().take(200) {
        match action {
            FuzzAction::Move { actor, direction: d } => {
                let _ = state.queue_move(pick(actor), direction(d));
            }
            FuzzAction::Build { actor, direction: d } => {
                let _ = state.queue_build(pick(actor), direction(d));
            }
            FuzzAction::Throw { actor, direction: d } => {
                let _ = state.queue_throw(pick(actor), direction(d));
            }
            FuzzAction::Pickup { actor, target } => {
                let _ = state.queue_pickup(pick(actor), pick(target));
            }
            FuzzAction::Disintegrate { actor } => {
                let _ = state.queue_disintegrate(pick(actor));
            }
            FuzzAction::Damage { target, amount } => {
                state.deal_damage(pick(target), i32::from(amount));
            }
            FuzzAction::EndTurn => {
                let update = NextTurn {
                    turn: state.turn(),
                    changed: vec![],
                    dead: vec![],
                    changed_sectors: vec![],
                    last_team_id: Some(1),
                    next_team_id: Some(1),
                    failed: vec![],
                    reasons: vec![],
                    winner_id: None,
                };
                assert!(state.apply_next_turn(&update).is_ok());
            }
        }
        assert!(check_occupancy(&state).is_empty(), "{:?}", check_occupancy(&state));
    }
});
