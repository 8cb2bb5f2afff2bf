//! Error types for the client runtime.
//!
//! Errors are split by who is at fault: the caller (`ActionError`,
//! `ConfigError`), the server payload (`DecodeError`, `ProtocolError`), the
//! local prediction model (`DesyncError`) or the wire (`TransportError`).
//! `SessionError` is what the session driver returns.

use thiserror::Error;

use crate::game::{EntityId, Location, TeamId, Violation};

/// Geometry contract violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Rotations must be multiples of 45 degrees.
    #[error("rotation of {0} degrees is not a multiple of 45")]
    UnalignedRotation(i32),
}

/// The kinds of action an entity can queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Step into an adjacent cell.
    Move,
    /// Place a statue in an adjacent cell.
    Build,
    /// Throw the held entity.
    Throw,
    /// Pick up an adjacent entity.
    Pickup,
    /// Destroy self.
    Disintegrate,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionKind::Move => "move",
            ActionKind::Build => "build",
            ActionKind::Throw => "throw",
            ActionKind::Pickup => "pickup",
            ActionKind::Disintegrate => "disintegrate",
        };
        f.write_str(name)
    }
}

/// A caller asked for an action the rules do not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The entity id is not in the registry (never existed or disintegrated).
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    /// The matching `can_*` predicate is false.
    #[error("entity {id} cannot {action} right now")]
    Illegal {
        /// Acting entity.
        id: EntityId,
        /// Requested action.
        action: ActionKind,
    },
}

/// A server payload could not be applied to the world model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A payload referenced an entity id the registry does not hold.
    #[error("payload references unknown entity {0}")]
    UnknownEntity(EntityId),
    /// A payload referenced a team missing from the roster.
    #[error("payload references unknown team {0}")]
    UnknownTeam(TeamId),
    /// A sector delta named a top-left corner that is not a sector origin.
    #[error("no sector with top-left corner {0}")]
    UnknownSector(Location),
    /// A tile character is neither grass nor dirt.
    #[error("unknown tile {0:?}")]
    UnknownTile(char),
    /// The tile grid does not match the declared dimensions.
    #[error("map is {width}x{height} but tile rows do not match: {detail}")]
    MapShape {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// What was wrong.
        detail: String,
    },
    /// An existing entity changed an immutable attribute.
    #[error("entity {id} changed its {field}")]
    ImmutableChanged {
        /// Entity whose record disagreed.
        id: EntityId,
        /// Which attribute changed.
        field: &'static str,
    },
    /// A turn number too large to advance past.
    #[error("turn {0} cannot be advanced")]
    TurnOverflow(u32),
}

/// The local prediction model no longer matches the authoritative rules.
///
/// This is never recoverable: the client cannot trust its own world model.
#[derive(Debug, Clone, Error)]
#[error("world model desynchronized ({} violations): {}", .violations.len(), summarize(.violations))]
pub struct DesyncError {
    /// Every mismatch found.
    pub violations: Vec<Violation>,
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .take(3)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A keyframe could not be checked or did not match.
#[derive(Debug, Clone, Error)]
pub enum KeyframeError {
    /// The keyframe payload was malformed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The keyframe disagreed with the local model.
    #[error(transparent)]
    Desync(#[from] DesyncError),
}

/// Invalid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Bot names must be between 6 and 99 characters.
    #[error("invalid bot name {0:?}: must be 6 to 99 characters")]
    InvalidName(String),
    /// The server address could not be parsed.
    #[error("invalid server address {0:?}")]
    InvalidServer(String),
    /// More than one team could be the opponent.
    #[error("cannot infer the opposing team among {0:?}; configure it explicitly")]
    AmbiguousOpponent(Vec<TeamId>),
    /// The configured opponent is not in the roster.
    #[error("configured opponent {0} is not in the roster")]
    UnknownOpponent(TeamId),
}

/// Byte-stream failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying socket or file error.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The server broke the protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The server reported a fatal error.
    #[error("server error: {0}")]
    Server(String),
    /// A line was not valid JSON or not a known message.
    #[error("undecodable server message {line:?}: {source}")]
    Malformed {
        /// The raw line.
        line: String,
        /// Parser error.
        source: serde_json::Error,
    },
    /// A valid message arrived at the wrong point of the session.
    #[error("expected {expected}, got {got}")]
    Unexpected {
        /// What the state machine was waiting for.
        expected: &'static str,
        /// What arrived.
        got: &'static str,
    },
    /// The stream ended before the session started.
    #[error("connection closed during {0}")]
    ClosedEarly(&'static str),
}

/// Everything that can stop the session driver.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Socket-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Protocol violation by the server.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// A payload could not be applied.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Local model diverged from the server.
    #[error(transparent)]
    Desync(#[from] DesyncError),
    /// The caller cancelled a blocking wait.
    #[error("session cancelled")]
    Cancelled,
}

impl From<KeyframeError> for SessionError {
    fn from(e: KeyframeError) -> Self {
        match e {
            KeyframeError::Decode(e) => Self::Decode(e),
            KeyframeError::Desync(e) => Self::Desync(e),
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(TransportError::Io(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_display() {
        let err = ActionError::Illegal {
            id: 7,
            action: ActionKind::Throw,
        };
        assert_eq!(err.to_string(), "entity 7 cannot throw right now");
    }

    #[test]
    fn test_desync_display_lists_first_violations() {
        let err = DesyncError {
            violations: vec![
                Violation::new("a"),
                Violation::new("b"),
                Violation::new("c"),
                Violation::new("d"),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("4 violations"));
        assert!(text.contains("a; b; c"));
        assert!(!text.contains("; d"));
    }
}
