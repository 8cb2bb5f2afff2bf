//! World model for battlehack games.
//!
//! Mirrors the authoritative server closely enough to predict the outcome of
//! the local team's own actions:
//! - Map with terrain tiles, an occupancy index and sectors
//! - Entity registry with holding relations
//! - Speculative action queue and damage model
//! - Occupancy and keyframe invariant checks

mod entity;
mod geometry;
mod invariants;
mod map;
mod snapshot;
mod speculation;
mod state;

pub use entity::{Entity, EntityId, EntityKind, NEUTRAL_TEAM_ID, Team, TeamId};
pub use geometry::{Direction, Location};
pub use invariants::{Violation, check_keyframe, check_occupancy};
pub use map::{Map, Sector, Tile};
pub use snapshot::{EntitySnapshot, Snapshot};
pub use state::{EntityQuery, State};

/// Maximum number of cells a thrown entity travels past the launch cell.
pub const THROW_RANGE: u32 = 7;
/// Damage dealt to a hedge struck by a thrown entity.
pub const THROW_HEDGE_DAMAGE: i32 = 1;
/// Damage dealt to any other entity struck by a thrown entity.
pub const THROW_ENTITY_DAMAGE: i32 = 4;
/// Damage taken by the thrown entity when it strikes something.
pub const THROW_ENTITY_RECOIL: i32 = 2;
/// Damage taken by a thrown entity landing on dirt.
pub const THROW_ENTITY_DIRT: i32 = 1;

/// Cooldown after moving.
pub const MOVEMENT_DELAY: u32 = 1;
/// Cooldown after building a statue.
pub const BUILD_DELAY: u32 = 10;
/// Cooldown after throwing.
pub const THROW_DELAY: u32 = 10;
/// Cooldown after a pickup.
pub const PICKUP_DELAY: u32 = 10;
/// Turns an entity may be held before it is released.
pub const HOLD_DURATION: u32 = 10;
/// Turns between spawn waves.
pub const SPAWN_INTERVAL: u32 = 10;
/// Hit points of a freshly built statue.
pub const STATUE_HP: i32 = 1;
