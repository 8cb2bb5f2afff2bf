//! Teams and entity records.

use serde::{Deserialize, Serialize};

use crate::game::Location;

/// Unique identifier for an entity. Never reused while the game lasts.
pub type EntityId = u32;

/// Unique identifier for a team.
pub type TeamId = u32;

/// The team that controls nothing; owns unclaimed sectors.
pub const NEUTRAL_TEAM_ID: TeamId = 0;

/// The three kinds of entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// The only kind that can act.
    Thrower,
    /// Obstacle; takes reduced impact damage.
    Hedge,
    /// Created by the build action.
    Statue,
}

/// A team in the roster. Equality is by id only.
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    /// Team id (index in the roster).
    pub id: TeamId,
    /// Display name.
    pub name: String,
}

impl Team {
    /// Create a team.
    #[must_use]
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Whether this is the neutral team.
    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        self.id == NEUTRAL_TEAM_ID
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Team {}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<team {:?} ({})>", self.name, self.id)
    }
}

/// One unit in the world.
///
/// Fields are only mutated by [`State`](crate::game::State), which keeps the
/// occupancy index in step with `location` and the holding relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) kind: EntityKind,
    pub(crate) team: TeamId,
    pub(crate) hp: i32,
    pub(crate) location: Location,
    pub(crate) cooldown_end: Option<u32>,
    pub(crate) holding_end: Option<u32>,
    pub(crate) holding: Option<EntityId>,
    pub(crate) held_by: Option<EntityId>,
}

impl Entity {
    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Entity kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> TeamId {
        self.team
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Current location. A held entity shares its holder's location.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Turn at which the cooldown expires, if any.
    #[must_use]
    pub const fn cooldown_end(&self) -> Option<u32> {
        self.cooldown_end
    }

    /// Turn at which the held entity is automatically released, if any.
    #[must_use]
    pub const fn holding_end(&self) -> Option<u32> {
        self.holding_end
    }

    /// The entity being carried.
    #[must_use]
    pub const fn holding(&self) -> Option<EntityId> {
        self.holding
    }

    /// The entity carrying this one.
    #[must_use]
    pub const fn held_by(&self) -> Option<EntityId> {
        self.held_by
    }

    /// Turns left before this entity may act again at `turn`.
    #[must_use]
    pub fn cooldown(&self, turn: u32) -> u32 {
        self.cooldown_end
            .map_or(0, |end| end.saturating_sub(turn))
    }

    /// True for throwers.
    #[must_use]
    pub fn is_thrower(&self) -> bool {
        self.kind == EntityKind::Thrower
    }

    /// True for hedges.
    #[must_use]
    pub fn is_hedge(&self) -> bool {
        self.kind == EntityKind::Hedge
    }

    /// True for statues.
    #[must_use]
    pub fn is_statue(&self) -> bool {
        self.kind == EntityKind::Statue
    }

    /// True if carrying another entity.
    #[must_use]
    pub const fn is_holding(&self) -> bool {
        self.holding.is_some()
    }

    /// True if being carried.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.held_by.is_some()
    }

    /// Throwers that are neither carrying nor carried can be picked up.
    #[must_use]
    pub fn can_be_picked(&self) -> bool {
        self.is_thrower() && !self.is_holding() && !self.is_held()
    }

    /// Compare against an authoritative record.
    ///
    /// Holding relations are only compared when both sides have one.
    #[must_use]
    pub fn agrees_with(&self, other: &Entity) -> bool {
        let same = |(a, b): (EntityId, EntityId)| a == b;
        self.holding.zip(other.holding).is_none_or(same)
            && self.held_by.zip(other.held_by).is_none_or(same)
            && self.id == other.id
            && self.kind == other.kind
            && self.location == other.location
            && self.team == other.team
            && self.hp == other.hp
            && self.cooldown_end == other.cooldown_end
            && self.holding_end == other.holding_end
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<id:{},type:{:?},team:{},location:{},hp:{}",
            self.id, self.kind, self.team, self.location, self.hp
        )?;
        if let Some(end) = self.cooldown_end {
            write!(f, ",cooldown_end:{end}")?;
        }
        if let Some(held) = self.holding {
            write!(f, ",holding:{held}")?;
            if let Some(end) = self.holding_end {
                write!(f, ",holding_end:{end}")?;
            }
        }
        if let Some(holder) = self.held_by {
            write!(f, ",held_by:{holder}")?;
        }
        f.write_str(">")
    }
}
