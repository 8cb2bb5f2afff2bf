//! Turn state: entity registry, teams, map and the pending action queue.

use std::collections::BTreeMap;

use crate::error::DecodeError;
use crate::game::{
    Entity, EntityId, EntityKind, Location, Map, SPAWN_INTERVAL, Team, TeamId,
};
use crate::protocol::{Action, EntityData, NextTurn, SectorData, WorldData};

/// Filter for [`State::query`]. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityQuery {
    /// Only this id.
    pub id: Option<EntityId>,
    /// Only this kind.
    pub kind: Option<EntityKind>,
    /// Only entities at this location (held ones included).
    pub location: Option<Location>,
    /// Only this team.
    pub team: Option<TeamId>,
}

impl EntityQuery {
    /// Restrict to one kind.
    #[must_use]
    pub const fn kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to one team.
    #[must_use]
    pub const fn team(mut self, team: TeamId) -> Self {
        self.team = Some(team);
        self
    }

    /// Restrict to one location.
    #[must_use]
    pub const fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Restrict to one id.
    #[must_use]
    pub const fn id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether `entity` passes every set filter.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        self.id.is_none_or(|id| entity.id == id)
            && self.kind.is_none_or(|kind| entity.kind == kind)
            && self.location.is_none_or(|location| entity.location == location)
            && self.team.is_none_or(|team| entity.team == team)
    }
}

/// The world as seen by one client on one turn.
///
/// Authoritative updates arrive through the `apply_*` methods. The action
/// API in the speculation module queues actions and, when speculation is
/// enabled, predicts their effect in place.
#[derive(Debug, Clone)]
pub struct State {
    pub(crate) turn: u32,
    pub(crate) map: Map,
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    pub(crate) teams: BTreeMap<TeamId, Team>,
    pub(crate) my_team: TeamId,
    pub(crate) other_team: TeamId,
    pub(crate) max_id: EntityId,
    pub(crate) action_queue: Vec<Action>,
    pub(crate) speculate: bool,
}

impl State {
    /// Create a state with an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownTeam`] if either team id is missing from
    /// the roster.
    pub fn new(
        map: Map,
        teams: impl IntoIterator<Item = Team>,
        my_team: TeamId,
        other_team: TeamId,
    ) -> Result<Self, DecodeError> {
        let teams: BTreeMap<TeamId, Team> = teams.into_iter().map(|t| (t.id, t)).collect();
        for id in [my_team, other_team] {
            if !teams.contains_key(&id) {
                return Err(DecodeError::UnknownTeam(id));
            }
        }
        Ok(Self {
            turn: 0,
            map,
            entities: BTreeMap::new(),
            teams,
            my_team,
            other_team,
            max_id: 0,
            action_queue: Vec::new(),
            speculate: true,
        })
    }

    /// Build a state from a full authoritative snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the map is malformed or the snapshot
    /// references unknown teams, sectors or entities.
    pub fn from_world(
        teams: impl IntoIterator<Item = Team>,
        my_team: TeamId,
        other_team: TeamId,
        world: &WorldData,
    ) -> Result<Self, DecodeError> {
        let map = Map::from_rows(world.width, world.height, &world.tiles, world.sector_size)?;
        let mut state = Self::new(map, teams, my_team, other_team)?;
        state.apply_changed(&world.entities)?;
        state.apply_sectors(&world.sectors)?;
        Ok(state)
    }

    /// A fresh state with the same roster built from `world`.
    ///
    /// # Errors
    ///
    /// See [`State::from_world`].
    pub fn rebuild(&self, world: &WorldData) -> Result<Self, DecodeError> {
        Self::from_world(
            self.teams.values().cloned(),
            self.my_team,
            self.other_team,
            world,
        )
    }

    /// Current turn.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    #[cfg(test)]
    pub(crate) const fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    /// Turn of the next spawn wave.
    #[must_use]
    pub const fn turn_next_spawn(&self) -> u32 {
        if self.turn == 0 {
            0
        } else {
            ((self.turn - 1) / SPAWN_INTERVAL + 1).saturating_mul(SPAWN_INTERVAL)
        }
    }

    /// The map.
    #[must_use]
    pub const fn map(&self) -> &Map {
        &self.map
    }

    /// The local team.
    #[must_use]
    pub fn my_team(&self) -> &Team {
        &self.teams[&self.my_team]
    }

    /// The local team's id.
    #[must_use]
    pub const fn my_team_id(&self) -> TeamId {
        self.my_team
    }

    /// The opposing team.
    #[must_use]
    pub fn other_team(&self) -> &Team {
        &self.teams[&self.other_team]
    }

    /// Look up a team in the roster.
    #[must_use]
    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    /// The full roster in id order.
    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    /// Whether actions are predicted locally as they are queued.
    #[must_use]
    pub const fn speculate(&self) -> bool {
        self.speculate
    }

    /// Turn local prediction on or off.
    pub const fn set_speculate(&mut self, speculate: bool) {
        self.speculate = speculate;
    }

    /// Highest entity id seen or allocated so far.
    #[must_use]
    pub const fn max_id(&self) -> EntityId {
        self.max_id
    }

    /// Actions queued for submission, oldest first.
    #[must_use]
    pub fn queued_actions(&self) -> &[Action] {
        &self.action_queue
    }

    pub(crate) fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.action_queue)
    }

    pub(crate) fn clear_actions(&mut self) {
        self.action_queue.clear();
    }

    /// Look up a live entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Every live entity in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Live entities matching `query`, ascending by id.
    pub fn query<'a>(&'a self, query: &'a EntityQuery) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities.values().filter(move |e| query.matches(e))
    }

    /// The free-standing entity at a location.
    #[must_use]
    pub fn entity_at(&self, location: Location) -> Option<&Entity> {
        self.map
            .occupant(location)
            .and_then(|id| self.entities.get(&id))
    }

    /// Entities inside the sector with the given top-left corner.
    pub fn entities_in_sector(&self, top_left: Location) -> impl Iterator<Item = &Entity> {
        self.entities
            .values()
            .filter(move |e| self.map.sector_origin(e.location) == Some(top_left))
    }

    /// Other entities within `distance` single steps of `id`.
    ///
    /// Held entities are skipped unless `include_held`. When `candidates` is
    /// given only those ids are considered, in that order. Yields nothing if
    /// `id` is not live.
    pub fn entities_within_adjacent_distance<'a>(
        &'a self,
        id: EntityId,
        distance: u32,
        include_held: bool,
        candidates: Option<&'a [EntityId]>,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        self.nearby(id, include_held, candidates, move |from, to| {
            from.adjacent_distance_to(to) <= distance
        })
    }

    /// Other entities within Euclidean `distance` of `id`.
    ///
    /// Same filtering rules as [`State::entities_within_adjacent_distance`].
    pub fn entities_within_euclidean_distance<'a>(
        &'a self,
        id: EntityId,
        distance: f64,
        include_held: bool,
        candidates: Option<&'a [EntityId]>,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        self.nearby(id, include_held, candidates, move |from, to| {
            from.distance_to(to) <= distance
        })
    }

    fn nearby<'a>(
        &'a self,
        id: EntityId,
        include_held: bool,
        candidates: Option<&'a [EntityId]>,
        within: impl Fn(Location, Location) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        let origin = self.entities.get(&id).map(|e| e.location);
        let pool: Box<dyn Iterator<Item = &'a Entity> + 'a> = match (origin, candidates) {
            (None, _) => Box::new(std::iter::empty()),
            (Some(_), Some(ids)) => Box::new(ids.iter().filter_map(move |i| self.entities.get(i))),
            (Some(_), None) => Box::new(self.entities.values()),
        };
        pool.filter(move |other| {
            other.id != id
                && (include_held || !other.is_held())
                && origin.is_some_and(|from| within(from, other.location))
        })
    }

    fn check_team(&self, team: TeamId) -> Result<(), DecodeError> {
        if self.teams.contains_key(&team) {
            Ok(())
        } else {
            Err(DecodeError::UnknownTeam(team))
        }
    }

    /// Create or overwrite entities from authoritative records.
    ///
    /// Holding references are resolved after the whole batch is applied, so
    /// a record may name an entity that appears later in the same batch.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for unknown teams, dangling holding
    /// references, or a change to an entity's kind or team.
    pub fn apply_changed(&mut self, changed: &[EntityData]) -> Result<(), DecodeError> {
        for data in changed {
            self.check_team(data.team_id)?;
            self.max_id = self.max_id.max(data.id);

            if let Some(existing) = self.entities.get(&data.id) {
                if existing.kind != data.kind {
                    return Err(DecodeError::ImmutableChanged {
                        id: data.id,
                        field: "type",
                    });
                }
                if existing.team != data.team_id {
                    return Err(DecodeError::ImmutableChanged {
                        id: data.id,
                        field: "team",
                    });
                }
                let stale = existing.location;
                self.map.vacate_if(stale, data.id);
            }

            let entity = Entity {
                id: data.id,
                kind: data.kind,
                team: data.team_id,
                hp: data.hp,
                location: data.location,
                cooldown_end: data.cooldown_end,
                holding_end: data.holding_end,
                holding: data.holding,
                held_by: data.held_by,
            };
            if entity.held_by.is_none() {
                self.map.occupy(entity.location, entity.id);
            }
            self.entities.insert(data.id, entity);
        }

        for data in changed {
            for reference in [data.held_by, data.holding].into_iter().flatten() {
                if !self.entities.contains_key(&reference) {
                    return Err(DecodeError::UnknownEntity(reference));
                }
            }
        }
        Ok(())
    }

    /// Remove entities the server reports dead.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownEntity`] if an id is not live.
    pub fn apply_dead(&mut self, dead: &[EntityId]) -> Result<(), DecodeError> {
        for &id in dead {
            let entity = self
                .entities
                .remove(&id)
                .ok_or(DecodeError::UnknownEntity(id))?;
            if !entity.is_held() {
                self.map.vacate_if(entity.location, id);
            }
        }
        Ok(())
    }

    /// Record new sector controllers.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for unknown teams or sector origins.
    pub fn apply_sectors(&mut self, sectors: &[SectorData]) -> Result<(), DecodeError> {
        for sector in sectors {
            self.check_team(sector.controlling_team_id)?;
            self.map
                .set_sector_team(sector.top_left, sector.controlling_team_id)?;
        }
        Ok(())
    }

    /// Apply a whole `nextTurn` delta and advance to the following turn.
    ///
    /// # Errors
    ///
    /// See [`State::apply_changed`], [`State::apply_dead`] and
    /// [`State::apply_sectors`].
    pub fn apply_next_turn(&mut self, turn: &NextTurn) -> Result<(), DecodeError> {
        self.apply_changed(&turn.changed)?;
        self.apply_dead(&turn.dead)?;
        self.apply_sectors(&turn.changed_sectors)?;
        self.turn = turn
            .turn
            .checked_add(1)
            .ok_or(DecodeError::TurnOverflow(turn.turn))?;
        Ok(())
    }
}
