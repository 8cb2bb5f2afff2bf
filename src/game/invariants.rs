//! World model invariants.
//!
//! These should never trigger while the local model follows the server. A
//! violation means the client can no longer trust its own world model.

use tracing::error;

use crate::error::{DecodeError, DesyncError, KeyframeError};
use crate::game::State;
use crate::protocol::WorldData;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// What was wrong.
    pub message: String,
}

impl Violation {
    /// Create a violation.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Check the occupancy index against the registry.
///
/// Every free-standing entity must be indexed at its location, every index
/// entry must name a free-standing entity standing there, and every holder
/// must be live.
#[must_use]
pub fn check_occupancy(state: &State) -> Vec<Violation> {
    let mut violations = Vec::new();

    for entity in state.entities() {
        match entity.held_by() {
            None => {
                let occupant = state.map().occupant(entity.location());
                if occupant != Some(entity.id()) {
                    violations.push(Violation::new(format!(
                        "entity {} at {} is indexed as {:?}",
                        entity.id(),
                        entity.location(),
                        occupant
                    )));
                }
            }
            Some(holder) => {
                if state.entity(holder).is_none() {
                    violations.push(Violation::new(format!(
                        "entity {} is held by missing entity {holder}",
                        entity.id()
                    )));
                }
            }
        }
    }

    for (location, id) in state.map().occupied() {
        match state.entity(id) {
            None => violations.push(Violation::new(format!(
                "ghost occupant {id} at {location}"
            ))),
            Some(entity) if entity.is_held() || entity.location() != location => {
                violations.push(Violation::new(format!(
                    "index places {id} at {location} but it is {entity}"
                )));
            }
            Some(_) => {}
        }
    }

    violations
}

/// Compare a state against an authoritative snapshot.
///
/// Each live entity must exist in the snapshot and agree with it, and each
/// sector must have the same controller. Occupancy is checked as well.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the snapshot itself cannot be decoded.
pub fn check_keyframe(state: &State, world: &WorldData) -> Result<Vec<Violation>, DecodeError> {
    let reference = state.rebuild(world)?;
    let mut violations = Vec::new();

    for entity in state.entities() {
        match reference.entity(entity.id()) {
            None => violations.push(Violation::new(format!(
                "entity {} is not in the keyframe",
                entity.id()
            ))),
            Some(expected) if !entity.agrees_with(expected) => {
                violations.push(Violation::new(format!(
                    "entity {entity} disagrees with keyframe {expected}"
                )));
            }
            Some(_) => {}
        }
    }

    for sector in state.map().sectors() {
        match reference.map().sector(sector.top_left) {
            None => violations.push(Violation::new(format!(
                "sector {} is not in the keyframe",
                sector.top_left
            ))),
            Some(expected) if expected != sector => {
                violations.push(Violation::new(format!(
                    "sector {} is controlled by {} but keyframe says {}",
                    sector.top_left, sector.team, expected.team
                )));
            }
            Some(_) => {}
        }
    }

    violations.extend(check_occupancy(state));
    Ok(violations)
}

impl State {
    /// Check the occupancy invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`DesyncError`] listing every violation.
    pub fn validate(&self) -> Result<(), DesyncError> {
        into_result(check_occupancy(self))
    }

    /// Check this state against a keyframe snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::Decode`] if the keyframe is malformed and
    /// [`KeyframeError::Desync`] if it disagrees with this state.
    pub fn validate_keyframe(&self, world: &WorldData) -> Result<(), KeyframeError> {
        Ok(into_result(check_keyframe(self, world)?)?)
    }
}

fn into_result(violations: Vec<Violation>) -> Result<(), DesyncError> {
    if violations.is_empty() {
        return Ok(());
    }
    for violation in &violations {
        error!(%violation, "world model desync");
    }
    Err(DesyncError { violations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{EntityKind, Location, Map, NEUTRAL_TEAM_ID, Team};
    use crate::protocol::{EntityData, SectorData};

    fn world() -> WorldData {
        WorldData {
            width: 4,
            height: 4,
            tiles: vec!["GGGG".into(), "GDDG".into(), "GGGG".into(), "GGGG".into()],
            sector_size: 2,
            entities: vec![EntityData {
                id: 1,
                kind: EntityKind::Thrower,
                team_id: 1,
                hp: 10,
                location: Location::new(1, 1),
                cooldown_end: None,
                holding_end: None,
                held_by: None,
                holding: None,
            }],
            sectors: vec![SectorData {
                top_left: Location::new(0, 0),
                controlling_team_id: 1,
            }],
        }
    }

    fn teams() -> Vec<Team> {
        vec![Team::new(NEUTRAL_TEAM_ID, "neutral"), Team::new(1, "red"), Team::new(2, "blue")]
    }

    #[test]
    fn test_identical_keyframe_is_clean() {
        let state = State::from_world(teams(), 1, 2, &world()).unwrap();
        assert!(state.validate().is_ok());
        assert!(check_keyframe(&state, &world()).unwrap().is_empty());
        assert!(state.validate_keyframe(&world()).is_ok());
    }

    #[test]
    fn test_keyframe_detects_drift() {
        let mut state = State::from_world(teams(), 1, 2, &world()).unwrap();
        state.queue_move(1, crate::game::Direction::East).unwrap();
        let violations = check_keyframe(&state, &world()).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("disagrees"));
    }

    #[test]
    fn test_keyframe_detects_sector_drift() {
        let state = State::from_world(teams(), 1, 2, &world()).unwrap();
        let mut keyframe = world();
        keyframe.sectors[0].controlling_team_id = 2;
        let violations = check_keyframe(&state, &keyframe).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            state.validate_keyframe(&keyframe),
            Err(KeyframeError::Desync(_))
        ));
    }

    #[test]
    fn test_ghost_occupant_detected() {
        let mut state = State::from_world(teams(), 1, 2, &world()).unwrap();
        state.map.occupy(Location::new(3, 3), 99);
        let violations = check_occupancy(&state);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("ghost"));
    }

    #[test]
    fn test_missing_index_entry_detected() {
        let mut state = State::new(Map::new(4, 4, 2).unwrap(), teams(), 1, 2).unwrap();
        state.apply_changed(&world().entities).unwrap();
        state.map.vacate_if(Location::new(1, 1), 1);
        assert!(state.validate().is_err());
    }
}
