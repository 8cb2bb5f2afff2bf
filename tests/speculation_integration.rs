//! Multi-step prediction scenarios checked against authoritative data.
//!
//! Each scenario predicts a turn locally, then applies the delta the server
//! would send and compares both against a keyframe.
//! Run with: cargo test --release speculation_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use serde_json::json;

use battlehack::error::KeyframeError;
use battlehack::game::{EntityQuery, NEUTRAL_TEAM_ID, Team};
use battlehack::protocol::{NextTurn, WorldData};
use battlehack::{ActionError, Direction, EntityKind, Location, State};

fn roster() -> Vec<Team> {
    vec![
        Team::new(NEUTRAL_TEAM_ID, "neutral"),
        Team::new(1, "red"),
        Team::new(2, "blue"),
    ]
}

fn world(entities: serde_json::Value, sectors: serde_json::Value) -> WorldData {
    serde_json::from_value(json!({
        "width": 10,
        "height": 6,
        "tiles": [
            "GGGGGGGGGG",
            "GGGGGGGGGG",
            "GGGGGGGGGD",
            "GGGGGGGGGG",
            "GGGGGGGGGG",
            "GGGGGGGGGG",
        ],
        "sectorSize": 5,
        "entities": entities,
        "sectors": sectors,
    }))
    .unwrap()
}

fn opening() -> WorldData {
    world(
        json!([
            {"id": 1, "type": "thrower", "teamID": 1, "hp": 10, "location": {"x": 1, "y": 3}},
            {"id": 2, "type": "thrower", "teamID": 2, "hp": 10, "location": {"x": 2, "y": 3}},
            {"id": 3, "type": "hedge", "teamID": 0, "hp": 5, "location": {"x": 1, "y": 4}},
        ]),
        json!([]),
    )
}

fn advance(state: &mut State, update: serde_json::Value) {
    let update: NextTurn = serde_json::from_value(update).unwrap();
    state.apply_next_turn(&update).unwrap();
}

#[test]
fn test_identical_keyframe_has_no_mismatch() {
    let state = State::from_world(roster(), 1, 2, &opening()).unwrap();
    assert!(state.validate().is_ok());
    assert!(state.validate_keyframe(&opening()).is_ok());
}

#[test]
fn test_pickup_and_throw_lifecycle() {
    let mut state = State::from_world(roster(), 1, 2, &opening()).unwrap();
    assert_eq!(state.queue_pickup(1, 2), Ok(true));
    let held = state.entity(2).unwrap();
    assert_eq!(held.held_by(), Some(1));
    assert!(state.map().occupant(Location::new(2, 3)).is_none());

    // a holder may not act again until its cooldown expires
    assert_eq!(
        state.queue_throw(1, Direction::East).unwrap_err(),
        ActionError::Illegal {
            id: 1,
            action: battlehack::error::ActionKind::Throw
        }
    );

    for turn in 0..10 {
        advance(
            &mut state,
            json!({"command": "nextTurn", "turn": turn, "changed": [], "dead": [], "changedSectors": []}),
        );
    }
    assert_eq!(state.turn(), 10);
    assert!(state.can_throw(1, Direction::East));
    state.queue_throw(1, Direction::East).unwrap();

    // clear path of 8 cells ends on the dirt tile at the map edge
    let thrown = state.entity(2).unwrap();
    assert_eq!(thrown.location(), Location::new(9, 3));
    assert_eq!(thrown.hp(), 9);
    assert_eq!(state.entity(1).unwrap().cooldown_end(), Some(20));
    assert!(state.validate().is_ok());
}

#[test]
fn test_build_then_server_confirms() {
    let mut state = State::from_world(roster(), 1, 2, &opening()).unwrap();
    assert!(state.can_build(1, Direction::South));
    assert_eq!(state.queue_build(1, Direction::South), Ok(true));

    let statue_query = EntityQuery::default().kind(EntityKind::Statue);
    let statue = state
        .query(&statue_query)
        .next()
        .unwrap();
    assert_eq!(statue.id(), 4);
    assert_eq!(statue.team(), 1);
    assert_eq!(statue.hp(), 1);
    assert_eq!(statue.location(), Location::new(1, 2));

    // prediction never touches sector control
    assert!(state.map().sectors().all(|s| s.team == NEUTRAL_TEAM_ID));

    advance(
        &mut state,
        json!({
            "command": "nextTurn",
            "turn": 0,
            "changed": [
                {"id": 1, "type": "thrower", "teamID": 1, "hp": 10, "location": {"x": 1, "y": 3}, "cooldownEnd": 10},
                {"id": 4, "type": "statue", "teamID": 1, "hp": 1, "location": {"x": 1, "y": 2}},
            ],
            "dead": [],
            "changedSectors": [{"topLeft": {"x": 0, "y": 0}, "controllingTeamID": 1}],
            "lastTeamID": 1,
            "nextTeamID": 2,
        }),
    );
    assert_eq!(state.map().sector_at(Location::new(1, 2)).unwrap().team, 1);

    let keyframe = world(
        json!([
            {"id": 1, "type": "thrower", "teamID": 1, "hp": 10, "location": {"x": 1, "y": 3}, "cooldownEnd": 10},
            {"id": 2, "type": "thrower", "teamID": 2, "hp": 10, "location": {"x": 2, "y": 3}},
            {"id": 3, "type": "hedge", "teamID": 0, "hp": 5, "location": {"x": 1, "y": 4}},
            {"id": 4, "type": "statue", "teamID": 1, "hp": 1, "location": {"x": 1, "y": 2}},
        ]),
        json!([{"topLeft": {"x": 0, "y": 0}, "controllingTeamID": 1}]),
    );
    assert!(state.validate_keyframe(&keyframe).is_ok());
}

#[test]
fn test_disintegration_is_confirmed_by_dead_list() {
    let mut state = State::from_world(roster(), 1, 2, &opening()).unwrap();
    assert_eq!(state.queue_disintegrate(1), Ok(true));
    assert!(state.entity(1).is_none());
    assert!(state.map().is_free(Location::new(1, 3)));

    // the live state only learns of the death from the dead list
    let mut live = State::from_world(roster(), 1, 2, &opening()).unwrap();
    live.set_speculate(false);
    advance(
        &mut live,
        json!({"command": "nextTurn", "turn": 0, "changed": [], "dead": [1], "changedSectors": []}),
    );
    assert!(live.entity(1).is_none());
    assert!(live.validate().is_ok());
}

#[test]
fn test_enemy_entities_cannot_be_commanded() {
    let mut state = State::from_world(roster(), 1, 2, &opening()).unwrap();
    assert!(state.can_move(2, Direction::East));
    assert_eq!(state.queue_move(2, Direction::East), Ok(false));
    assert_eq!(state.entity(2).unwrap().location(), Location::new(2, 3));
    assert!(state.queued_actions().is_empty());
}

#[test]
fn test_drift_is_reported() {
    let mut state = State::from_world(roster(), 1, 2, &opening()).unwrap();
    state.queue_move(1, Direction::South).unwrap();
    match state.validate_keyframe(&opening()).unwrap_err() {
        KeyframeError::Desync(desync) => assert_eq!(desync.violations.len(), 1),
        KeyframeError::Decode(e) => panic!("keyframe should decode: {e}"),
    }
}
