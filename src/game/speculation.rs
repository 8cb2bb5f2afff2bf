//! Action predicates, the action queue and local prediction of action effects.
//!
//! Every queued action is checked against the same legality rules the server
//! applies. With speculation enabled the state is then updated exactly as the
//! server will update it, so later predicates in the same turn see the result.

use tracing::trace;

use crate::error::{ActionError, ActionKind};
use crate::game::{
    BUILD_DELAY, Direction, Entity, EntityId, EntityKind, HOLD_DURATION, Location, MOVEMENT_DELAY,
    PICKUP_DELAY, STATUE_HP, State, THROW_DELAY, THROW_ENTITY_DAMAGE, THROW_ENTITY_DIRT,
    THROW_ENTITY_RECOIL, THROW_HEDGE_DAMAGE, THROW_RANGE, Tile,
};
use crate::protocol::Action;

impl State {
    /// True if `id` is a free thrower whose cooldown has expired.
    #[must_use]
    pub fn can_act(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| {
            e.cooldown(self.turn) == 0 && e.kind == EntityKind::Thrower && !e.is_held()
        })
    }

    /// True if `id` can act and the adjacent cell in `direction` is free.
    #[must_use]
    pub fn can_move(&self, id: EntityId, direction: Direction) -> bool {
        self.can_act(id) && self.adjacent_free(id, direction)
    }

    /// Building has the same requirements as moving.
    #[must_use]
    pub fn can_build(&self, id: EntityId, direction: Direction) -> bool {
        self.can_move(id, direction)
    }

    /// True if `id` holds something, can act, and the launch cell is free.
    ///
    /// Only the launch cell matters; the landing cell is found during the throw.
    #[must_use]
    pub fn can_throw(&self, id: EntityId, direction: Direction) -> bool {
        self.entities.get(&id).is_some_and(Entity::is_holding)
            && self.can_act(id)
            && self.adjacent_free(id, direction)
    }

    /// True if `id` can lift `other` this turn.
    #[must_use]
    pub fn can_pickup(&self, id: EntityId, other: EntityId) -> bool {
        if id == other {
            return false;
        }
        let (Some(me), Some(target)) = (self.entities.get(&id), self.entities.get(&other)) else {
            return false;
        };
        !me.is_holding()
            && self.can_act(id)
            && me.location.distance_squared_to(target.location) <= 2
            && target.can_be_picked()
    }

    fn adjacent_free(&self, id: EntityId, direction: Direction) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|e| self.map.is_free(e.location.adjacent_in(direction)))
    }

    /// `Ok(true)` if the local team owns `id`.
    fn owns(&self, id: EntityId) -> Result<bool, ActionError> {
        self.entities
            .get(&id)
            .map(|e| e.team == self.my_team)
            .ok_or(ActionError::UnknownEntity(id))
    }

    fn enqueue(&mut self, action: Action) {
        trace!(turn = self.turn, ?action, "queued action");
        self.action_queue.push(action);
    }

    /// Queue a move.
    ///
    /// Returns `Ok(false)` without queuing for entities of another team.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownEntity`] if `id` is not live and
    /// [`ActionError::Illegal`] if [`State::can_move`] is false.
    pub fn queue_move(&mut self, id: EntityId, direction: Direction) -> Result<bool, ActionError> {
        if !self.owns(id)? {
            return Ok(false);
        }
        if !self.can_move(id, direction) {
            return Err(ActionError::Illegal {
                id,
                action: ActionKind::Move,
            });
        }
        self.enqueue(Action::movement(id, direction));
        if self.speculate {
            self.predict_move(id, direction);
        }
        Ok(true)
    }

    /// Queue a statue build.
    ///
    /// # Errors
    ///
    /// Same as [`State::queue_move`], with [`State::can_build`] as the predicate.
    pub fn queue_build(&mut self, id: EntityId, direction: Direction) -> Result<bool, ActionError> {
        if !self.owns(id)? {
            return Ok(false);
        }
        if !self.can_build(id, direction) {
            return Err(ActionError::Illegal {
                id,
                action: ActionKind::Build,
            });
        }
        self.enqueue(Action::build(id, direction));
        if self.speculate {
            self.predict_build(id, direction);
        }
        Ok(true)
    }

    /// Queue a throw of the held entity.
    ///
    /// # Errors
    ///
    /// Same as [`State::queue_move`], with [`State::can_throw`] as the predicate.
    pub fn queue_throw(&mut self, id: EntityId, direction: Direction) -> Result<bool, ActionError> {
        if !self.owns(id)? {
            return Ok(false);
        }
        if !self.can_throw(id, direction) {
            return Err(ActionError::Illegal {
                id,
                action: ActionKind::Throw,
            });
        }
        self.enqueue(Action::throw(id, direction));
        if self.speculate {
            self.predict_throw(id, direction);
        }
        Ok(true)
    }

    /// Queue a pickup of `other`.
    ///
    /// # Errors
    ///
    /// Same as [`State::queue_move`], with [`State::can_pickup`] as the predicate.
    pub fn queue_pickup(&mut self, id: EntityId, other: EntityId) -> Result<bool, ActionError> {
        if !self.owns(id)? {
            return Ok(false);
        }
        if !self.can_pickup(id, other) {
            return Err(ActionError::Illegal {
                id,
                action: ActionKind::Pickup,
            });
        }
        self.enqueue(Action::Pickup {
            id,
            pickup_id: other,
        });
        if self.speculate {
            self.predict_pickup(id, other);
        }
        Ok(true)
    }

    /// Queue self-destruction.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownEntity`] if `id` is not live.
    pub fn queue_disintegrate(&mut self, id: EntityId) -> Result<bool, ActionError> {
        if !self.owns(id)? {
            return Ok(false);
        }
        self.enqueue(Action::Disintegrate { id });
        if self.speculate {
            let hp = self.entities.get(&id).map_or(0, |e| e.hp);
            self.deal_damage(id, hp.saturating_add(1));
        }
        Ok(true)
    }

    fn predict_move(&mut self, id: EntityId, direction: Direction) {
        let turn = self.turn;
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let from = entity.location;
        let to = from.adjacent_in(direction);
        entity.location = to;
        entity.cooldown_end = Some(turn.saturating_add(MOVEMENT_DELAY));
        let holding = entity.holding;

        self.map.vacate_if(from, id);
        self.map.occupy(to, id);
        if let Some(held) = holding.and_then(|h| self.entities.get_mut(&h)) {
            held.location = to;
        }
    }

    fn predict_build(&mut self, id: EntityId, direction: Direction) {
        let turn = self.turn;
        let Some(builder) = self.entities.get_mut(&id) else {
            return;
        };
        builder.cooldown_end = Some(turn.saturating_add(BUILD_DELAY));
        let location = builder.location.adjacent_in(direction);
        self.spawn_statue(location);
    }

    fn spawn_statue(&mut self, location: Location) {
        let Some(id) = self.max_id.checked_add(1) else {
            return;
        };
        self.max_id = id;
        let statue = Entity {
            id,
            kind: EntityKind::Statue,
            team: self.my_team,
            hp: STATUE_HP,
            location,
            cooldown_end: None,
            holding_end: None,
            holding: None,
            held_by: None,
        };
        self.map.occupy(location, statue.id);
        self.entities.insert(statue.id, statue);
    }

    fn predict_pickup(&mut self, id: EntityId, other: EntityId) {
        let turn = self.turn;
        let Some(holder) = self.entities.get_mut(&id) else {
            return;
        };
        holder.holding = Some(other);
        holder.holding_end = Some(turn.saturating_add(HOLD_DURATION));
        holder.cooldown_end = Some(turn.saturating_add(PICKUP_DELAY));
        let location = holder.location;

        if let Some(target) = self.entities.get_mut(&other) {
            self.map.vacate_if(target.location, other);
            target.held_by = Some(id);
            target.location = location;
        }
    }

    fn predict_throw(&mut self, id: EntityId, direction: Direction) {
        let turn = self.turn;
        let Some(thrower) = self.entities.get_mut(&id) else {
            return;
        };
        let Some(held) = thrower.holding.take() else {
            return;
        };
        thrower.holding_end = None;
        thrower.cooldown_end = Some(turn.saturating_add(THROW_DELAY));
        let origin = thrower.location;

        let mut target = origin.adjacent_in(direction);
        for _ in 0..=THROW_RANGE {
            if !self.map.is_free(target) {
                break;
            }
            target = target.adjacent_in(direction);
        }

        if let Some(struck) = self.entity_at(target).map(|e| (e.id, e.kind)) {
            let damage = match struck.1 {
                EntityKind::Hedge => THROW_HEDGE_DAMAGE,
                EntityKind::Thrower | EntityKind::Statue => THROW_ENTITY_DAMAGE,
            };
            self.deal_damage(struck.0, damage);
            self.deal_damage(held, THROW_ENTITY_RECOIL);
        }

        let landing = target.adjacent_in(direction.opposite());
        if let Some(entity) = self.entities.get_mut(&held) {
            entity.location = landing;
        }
        if self.map.tile_at(landing) == Some(Tile::Dirt) {
            self.deal_damage(held, THROW_ENTITY_DIRT);
        }
        if let Some(entity) = self.entities.get_mut(&held) {
            entity.held_by = None;
            self.map.occupy(landing, held);
        }
        trace!(thrower = id, held, %landing, "predicted throw");
    }

    /// Predict `damage` hit points of damage to `id`.
    ///
    /// An entity reaching zero hit points is removed from the registry and
    /// the occupancy index. Whatever it was holding is dropped in its cell.
    /// Ids that are not live are ignored, so repeated kills are harmless.
    pub fn deal_damage(&mut self, id: EntityId, damage: i32) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.hp = entity.hp.saturating_sub(damage);
        if entity.hp > 0 {
            return;
        }
        let Some(dead) = self.entities.remove(&id) else {
            return;
        };
        trace!(id, location = %dead.location, "predicted disintegration");

        match dead.held_by {
            None => {
                self.map.vacate_if(dead.location, id);
            }
            Some(holder) => {
                if let Some(holder) = self.entities.get_mut(&holder) {
                    holder.holding = None;
                    holder.holding_end = None;
                }
            }
        }

        if let Some(released) = dead.holding.and_then(|h| self.entities.get_mut(&h)) {
            released.held_by = None;
            released.location = dead.location;
            let released = released.id;
            self.map.occupy(dead.location, released);
        }
    }
}
