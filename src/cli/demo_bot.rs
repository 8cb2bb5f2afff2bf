//! Sample bot used by `battlehack play`.
//!
//! Claims neutral sectors with statues, carries and throws enemy throwers,
//! and otherwise walks toward the nearest enemy.

use battlehack::error::ActionError;
use battlehack::game::{EntityQuery, NEUTRAL_TEAM_ID};
use battlehack::{Bot, Direction, EntityId, EntityKind, Location, State};
use tracing::debug;

/// Small rule-based bot.
#[derive(Debug, Default)]
pub(super) struct DemoBot {
    /// Actions queued over the whole game.
    pub(super) actions: u64,
}

impl Bot for DemoBot {
    fn play_turn(&mut self, state: &mut State) {
        let query = EntityQuery::default()
            .team(state.my_team_id())
            .kind(EntityKind::Thrower);
        let throwers: Vec<EntityId> = state.query(&query).map(|e| e.id()).collect();
        for id in throwers {
            match handle_thrower(state, id) {
                Ok(true) => self.actions += 1,
                Ok(false) => {}
                Err(e) => debug!(id, error = %e, "skipped thrower"),
            }
        }
    }
}

/// Queue at most one action for `id`. Returns whether one was queued.
fn handle_thrower(state: &mut State, id: EntityId) -> Result<bool, ActionError> {
    if !state.can_act(id) {
        return Ok(false);
    }
    let Some(me) = state.entity(id) else {
        return Ok(false);
    };
    let location = me.location();
    let holding = me.is_holding();
    let enemy = nearest_enemy(state, id, location);

    if holding {
        if let Some(direction) = enemy.and_then(|(_, at)| location.direction_to(at)) {
            if state.can_throw(id, direction) {
                return state.queue_throw(id, direction);
            }
        }
    }

    for direction in Direction::CARDINAL {
        let target = location.adjacent_in(direction);
        let neutral = state
            .map()
            .sector_at(target)
            .is_some_and(|sector| sector.team == NEUTRAL_TEAM_ID);
        if neutral && state.can_build(id, direction) {
            return state.queue_build(id, direction);
        }
    }

    let Some((enemy_id, enemy_at)) = enemy else {
        return Ok(false);
    };
    if state.can_pickup(id, enemy_id) {
        return state.queue_pickup(id, enemy_id);
    }
    let Some(heading) = location.direction_to(enemy_at) else {
        return Ok(false);
    };
    for degrees in [0, 45, -45] {
        let Ok(direction) = heading.rotate_counter_clockwise_degrees(degrees) else {
            continue;
        };
        if state.can_move(id, direction) {
            return state.queue_move(id, direction);
        }
    }
    Ok(false)
}

/// Closest free-standing entity of another (non-neutral) team.
fn nearest_enemy(state: &State, id: EntityId, location: Location) -> Option<(EntityId, Location)> {
    let mine = state.my_team_id();
    state
        .entities_within_euclidean_distance(id, f64::INFINITY, false, None)
        .filter(|e| e.team() != mine && e.team() != NEUTRAL_TEAM_ID)
        .min_by_key(|e| (location.distance_squared_to(e.location()), e.id()))
        .map(|e| (e.id(), e.location()))
}
