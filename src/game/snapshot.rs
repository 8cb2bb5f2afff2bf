//! Read-only per-turn snapshots of the world.
//!
//! A [`Snapshot`] is a plain value: it shares nothing with the [`State`] it
//! was taken from, so a bot can keep it across turns.

use serde::Serialize;

use crate::game::{Entity, EntityId, EntityKind, Location, Sector, State, TeamId};

/// Frozen copy of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Entity kind.
    pub kind: EntityKind,
    /// Owning team.
    pub team: TeamId,
    /// Hit points.
    pub hp: i32,
    /// Location.
    pub location: Location,
    /// Cooldown end turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_end: Option<u32>,
    /// Holding end turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_end: Option<u32>,
    /// Carried entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding: Option<EntityId>,
    /// Carrying entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_by: Option<EntityId>,
}

impl From<&Entity> for EntitySnapshot {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            kind: entity.kind,
            team: entity.team,
            hp: entity.hp,
            location: entity.location,
            cooldown_end: entity.cooldown_end,
            holding_end: entity.holding_end,
            holding: entity.holding,
            held_by: entity.held_by,
        }
    }
}

/// Immutable view of a whole turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    turn: u32,
    my_team: TeamId,
    entities: Vec<EntitySnapshot>,
    sectors: Vec<Sector>,
}

impl Snapshot {
    /// Turn the snapshot was taken on.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// The local team.
    #[must_use]
    pub const fn my_team(&self) -> TeamId {
        self.my_team
    }

    /// Entities in ascending id order.
    #[must_use]
    pub fn entities(&self) -> &[EntitySnapshot] {
        &self.entities
    }

    /// Sectors ordered by top-left corner.
    #[must_use]
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Look up one entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.entities[idx])
    }

    /// Number of entities owned by `team`.
    #[must_use]
    pub fn count_for_team(&self, team: TeamId) -> usize {
        self.entities.iter().filter(|e| e.team == team).count()
    }

    /// Number of sectors controlled by `team`.
    #[must_use]
    pub fn sectors_for_team(&self, team: TeamId) -> usize {
        self.sectors.iter().filter(|s| s.team == team).count()
    }
}

impl State {
    /// Freeze the current turn into a [`Snapshot`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            turn: self.turn,
            my_team: self.my_team,
            entities: self.entities.values().map(EntitySnapshot::from).collect(),
            sectors: self.map.sectors().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Direction, Map, NEUTRAL_TEAM_ID, Team};
    use crate::protocol::EntityData;

    #[test]
    fn test_snapshot_outlives_mutation() {
        let teams = [Team::new(NEUTRAL_TEAM_ID, "neutral"), Team::new(1, "red")];
        let mut state = State::new(Map::new(6, 6, 3).unwrap(), teams, 1, NEUTRAL_TEAM_ID).unwrap();
        state
            .apply_changed(&[EntityData {
                id: 3,
                kind: EntityKind::Thrower,
                team_id: 1,
                hp: 10,
                location: Location::new(2, 2),
                cooldown_end: None,
                holding_end: None,
                held_by: None,
                holding: None,
            }])
            .unwrap();

        let before = state.snapshot();
        state.queue_build(3, Direction::North).unwrap();
        let after = state.snapshot();

        assert_eq!(before.entities().len(), 1);
        assert_eq!(after.entities().len(), 2);
        assert_eq!(before.entity(3).map(|e| e.cooldown_end), Some(None));
        assert_eq!(after.entity(4).map(|e| e.kind), Some(EntityKind::Statue));
        assert_eq!(after.count_for_team(1), 2);
        assert_eq!(after.sectors().len(), 4);
        assert_eq!(after.sectors_for_team(NEUTRAL_TEAM_ID), 4);
    }

    #[test]
    fn test_snapshot_serializes() {
        let teams = [Team::new(NEUTRAL_TEAM_ID, "neutral")];
        let state = State::new(Map::new(2, 2, 2).unwrap(), teams, 0, 0).unwrap();
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["turn"], 0);
        assert_eq!(json["sectors"][0]["team"], 0);
    }
}
