// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Battlehack: client runtime for turn-based battlecode hackathon games.
//!
//! The crate connects a bot to a game server, keeps an up-to-date world
//! model from the server's per-turn deltas, and predicts the effect of the
//! bot's own queued actions before the server confirms them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Session driver (Game)             │
//! ├─────────────────────────────────────┤
//! │   World model + speculation (State) │
//! ├─────────────────────────────────────┤
//! │   Wire protocol (JSON lines)        │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use battlehack::{ClientConfig, Direction, Game};
//!
//! let config = ClientConfig::from_env("example-bot")?;
//! let mut game = Game::connect(config)?;
//! let outcome = game.run(&mut |state: &mut battlehack::State| {
//!     let mine: Vec<_> = state
//!         .entities()
//!         .filter(|e| e.team() == state.my_team_id())
//!         .map(|e| e.id())
//!         .collect();
//!     for id in mine {
//!         if state.can_move(id, Direction::North) {
//!             let _ = state.queue_move(id, Direction::North);
//!         }
//!     }
//! })?;
//! println!("{outcome}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod game;
pub mod protocol;
pub mod session;

pub use error::{ActionError, DecodeError, DesyncError, ProtocolError, SessionError};

// Re-export key types at crate root for convenience
pub use game::{Direction, Entity, EntityId, EntityKind, Location, Snapshot, State, TeamId};
pub use session::{Bot, CancelHandle, ClientConfig, Endpoint, Game, Outcome, TurnMode};
