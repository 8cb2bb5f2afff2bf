//! Wire messages exchanged with the game server.
//!
//! Every message is one JSON object per line. Client and server messages are
//! tagged by their `command` field, queued actions by their `action` field.

use serde::{Deserialize, Serialize};

use crate::error::{ActionKind, ProtocolError};
use crate::game::{Direction, EntityId, EntityKind, Location, TeamId};

/// Authoritative record of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    /// Entity id.
    pub id: EntityId,
    /// Entity kind.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Owning team.
    #[serde(rename = "teamID")]
    pub team_id: TeamId,
    /// Hit points.
    pub hp: i32,
    /// Location (the holder's location while held).
    pub location: Location,
    /// Turn at which the cooldown expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_end: Option<u32>,
    /// Turn at which the held entity is released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holding_end: Option<u32>,
    /// Entity carrying this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_by: Option<EntityId>,
    /// Entity carried by this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holding: Option<EntityId>,
}

/// Authoritative controller of one sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorData {
    /// Sector origin.
    #[serde(rename = "topLeft")]
    pub top_left: Location,
    /// Controlling team, neutral if nobody.
    #[serde(rename = "controllingTeamID")]
    pub controlling_team_id: TeamId,
}

/// A full world snapshot, sent at start and in keyframes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldData {
    /// Map width.
    pub width: u32,
    /// Map height.
    pub height: u32,
    /// Tile rows, northmost first.
    pub tiles: Vec<String>,
    /// Sector side length.
    pub sector_size: u32,
    /// Every live entity.
    pub entities: Vec<EntityData>,
    /// Every sector.
    pub sectors: Vec<SectorData>,
}

/// Roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamData {
    /// Team id.
    #[serde(rename = "teamID")]
    pub team_id: TeamId,
    /// Display name.
    pub name: String,
}

/// One queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Step into an adjacent cell.
    Move {
        /// Acting entity.
        id: EntityId,
        /// Step x.
        dx: i32,
        /// Step y.
        dy: i32,
    },
    /// Build a statue in an adjacent cell.
    Build {
        /// Acting entity.
        id: EntityId,
        /// Step x.
        dx: i32,
        /// Step y.
        dy: i32,
    },
    /// Throw the held entity.
    Throw {
        /// Acting entity.
        id: EntityId,
        /// Step x.
        dx: i32,
        /// Step y.
        dy: i32,
    },
    /// Pick up an adjacent entity.
    Pickup {
        /// Acting entity.
        id: EntityId,
        /// Entity to pick up.
        #[serde(rename = "pickupID")]
        pickup_id: EntityId,
    },
    /// Destroy self.
    Disintegrate {
        /// Acting entity.
        id: EntityId,
    },
}

impl Action {
    /// Move `id` one step in `direction`.
    #[must_use]
    pub const fn movement(id: EntityId, direction: Direction) -> Self {
        Action::Move {
            id,
            dx: direction.dx(),
            dy: direction.dy(),
        }
    }

    /// Build a statue next to `id` in `direction`.
    #[must_use]
    pub const fn build(id: EntityId, direction: Direction) -> Self {
        Action::Build {
            id,
            dx: direction.dx(),
            dy: direction.dy(),
        }
    }

    /// Throw whatever `id` holds in `direction`.
    #[must_use]
    pub const fn throw(id: EntityId, direction: Direction) -> Self {
        Action::Throw {
            id,
            dx: direction.dx(),
            dy: direction.dy(),
        }
    }

    /// The entity performing the action.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match *self {
            Action::Move { id, .. }
            | Action::Build { id, .. }
            | Action::Throw { id, .. }
            | Action::Pickup { id, .. }
            | Action::Disintegrate { id } => id,
        }
    }

    /// What kind of action this is.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Action::Move { .. } => ActionKind::Move,
            Action::Build { .. } => ActionKind::Build,
            Action::Throw { .. } => ActionKind::Throw,
            Action::Pickup { .. } => ActionKind::Pickup,
            Action::Disintegrate { .. } => ActionKind::Disintegrate,
        }
    }
}

/// Messages sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join the game.
    Login {
        /// Bot name.
        name: String,
        /// Optional player key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    /// Submit the actions for a turn.
    MakeTurn {
        /// Turn being played.
        turn: u32,
        /// Actions in queue order.
        actions: Vec<Action>,
    },
}

/// Per-turn authoritative delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTurn {
    /// Turn that was just played.
    pub turn: u32,
    /// Entities created or changed.
    pub changed: Vec<EntityData>,
    /// Ids of entities that died.
    pub dead: Vec<EntityId>,
    /// Sectors whose controller changed.
    pub changed_sectors: Vec<SectorData>,
    /// Team that played `turn`.
    #[serde(rename = "lastTeamID", default, skip_serializing_if = "Option::is_none")]
    pub last_team_id: Option<TeamId>,
    /// Team due to play next.
    #[serde(rename = "nextTeamID", default, skip_serializing_if = "Option::is_none")]
    pub next_team_id: Option<TeamId>,
    /// Actions of the last team that the server rejected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<Action>,
    /// One reason per rejected action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    /// Present once the game is decided.
    #[serde(rename = "winnerID", default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<TeamId>,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Login accepted.
    LoginConfirm {
        /// Team assigned to this client.
        #[serde(rename = "teamID")]
        team_id: TeamId,
    },
    /// Game begins.
    Start {
        /// All teams, neutral included.
        teams: Vec<TeamData>,
        /// Initial world.
        #[serde(rename = "initialState")]
        initial_state: WorldData,
    },
    /// A turn was played.
    NextTurn(NextTurn),
    /// Full snapshot for cross-checking.
    Keyframe {
        /// Authoritative world.
        state: WorldData,
    },
    /// Server-side error or warning.
    Error {
        /// Human-readable reason.
        reason: String,
    },
    /// The client did not act in time.
    MissedTurn {
        /// Turn that was missed.
        turn: u32,
    },
}

impl ServerMessage {
    /// Parse one line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] for invalid JSON or an unknown command.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(line).map_err(|source| ProtocolError::Malformed {
            line: line.to_string(),
            source,
        })
    }

    /// Wire name of the command.
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            ServerMessage::LoginConfirm { .. } => "loginConfirm",
            ServerMessage::Start { .. } => "start",
            ServerMessage::NextTurn(_) => "nextTurn",
            ServerMessage::Keyframe { .. } => "keyframe",
            ServerMessage::Error { .. } => "error",
            ServerMessage::MissedTurn { .. } => "missedTurn",
        }
    }

    /// True for the benign warning sent when a turn arrives out of order.
    #[must_use]
    pub fn is_wrong_turn_warning(&self) -> bool {
        matches!(self, ServerMessage::Error { reason } if reason.starts_with("wrong turn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_wire_shape() {
        let login = ClientMessage::Login {
            name: "testbot".to_string(),
            key: None,
        };
        let json = serde_json::to_value(&login).unwrap();
        assert_eq!(json, serde_json::json!({"command": "login", "name": "testbot"}));
    }

    #[test]
    fn test_make_turn_wire_shape() {
        let turn = ClientMessage::MakeTurn {
            turn: 4,
            actions: vec![
                Action::movement(3, Direction::NorthWest),
                Action::Pickup { id: 3, pickup_id: 9 },
                Action::Disintegrate { id: 5 },
            ],
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "command": "makeTurn",
                "turn": 4,
                "actions": [
                    {"action": "move", "id": 3, "dx": -1, "dy": 1},
                    {"action": "pickup", "id": 3, "pickupID": 9},
                    {"action": "disintegrate", "id": 5},
                ]
            })
        );
    }

    #[test]
    fn test_decode_next_turn() {
        let line = r#"{"command":"nextTurn","turn":3,"changed":[
            {"id":4,"type":"thrower","teamID":1,"hp":10,"location":{"x":1,"y":2},"cooldownEnd":5,"heldBy":2}
        ],"dead":[7],"changedSectors":[{"topLeft":{"x":0,"y":0},"controllingTeamID":2}],
        "lastTeamID":1,"nextTeamID":2,
        "failed":[{"action":"build","id":4,"dx":0,"dy":1}],"reasons":["occupied"]}"#;
        let ServerMessage::NextTurn(turn) = ServerMessage::decode(line).unwrap() else {
            panic!("expected nextTurn");
        };
        assert_eq!(turn.turn, 3);
        assert_eq!(turn.changed[0].held_by, Some(2));
        assert_eq!(turn.changed[0].cooldown_end, Some(5));
        assert_eq!(turn.changed[0].holding, None);
        assert_eq!(turn.dead, vec![7]);
        assert_eq!(turn.changed_sectors[0].controlling_team_id, 2);
        assert_eq!(turn.failed[0].kind(), ActionKind::Build);
        assert_eq!(turn.winner_id, None);
    }

    #[test]
    fn test_decode_rejects_unknown_command() {
        let err = ServerMessage::decode(r#"{"command":"dance"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));
        assert!(ServerMessage::decode("not json").is_err());
    }

    #[test]
    fn test_wrong_turn_warning() {
        let warning = ServerMessage::Error {
            reason: "wrong turn: expected 4".to_string(),
        };
        let fatal = ServerMessage::Error {
            reason: "bad login".to_string(),
        };
        assert!(warning.is_wrong_turn_warning());
        assert!(!fatal.is_wrong_turn_warning());
    }
}
