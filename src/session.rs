//! Session driver: login handshake, turn submission and turn synchronization.
//!
//! A [`Game`] owns the connection and the live [`State`]. Each call to
//! [`Game::next_turn`] submits the actions queued on the previous turn's
//! state, applies authoritative updates until it is the local team's turn
//! again, and hands out the state for the new turn.

mod config;
mod transport;

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::error::{ProtocolError, SessionError};
use crate::game::{Snapshot, State, Team, TeamId};
use crate::protocol::{ClientMessage, NextTurn, ServerMessage, TeamData, WorldData};

pub use config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT, Endpoint, KEY_ENV, SERVER_ENV};
pub use transport::CancelHandle;

use transport::{Event, Link};

/// How the per-turn state is handed to the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TurnMode {
    /// The live state itself, without speculation.
    Live,
    /// An isolated copy of the live state, without speculation.
    Copy,
    /// An isolated copy with speculation enabled.
    #[default]
    Speculate,
}

impl TurnMode {
    /// True if the bot gets a copy rather than the live state.
    #[must_use]
    pub const fn is_isolated(self) -> bool {
        !matches!(self, TurnMode::Live)
    }

    /// True if queued actions are predicted locally.
    #[must_use]
    pub const fn speculates(self) -> bool {
        matches!(self, TurnMode::Speculate)
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The server declared a winner.
    Winner(TeamId),
    /// The server closed the stream without declaring a winner.
    ConnectionClosed,
}

impl Outcome {
    /// The winning team; the neutral team when the stream just ended.
    #[must_use]
    pub const fn winner(self) -> TeamId {
        match self {
            Outcome::Winner(team) => team,
            Outcome::ConnectionClosed => crate::game::NEUTRAL_TEAM_ID,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(team) => write!(f, "team {team} won"),
            Outcome::ConnectionClosed => f.write_str("connection closed without a winner"),
        }
    }
}

/// Where the session driver is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Login sent, waiting for `loginConfirm`.
    AwaitingLogin,
    /// Logged in, waiting for `start`.
    AwaitingStart,
    /// Started, no turn received yet.
    AwaitingTurn,
    /// Turns are flowing; the team due to act next.
    InTurn(TeamId),
    /// The game is over.
    Finished(Outcome),
}

/// Per-turn decision logic.
pub trait Bot {
    /// Inspect the state and queue this turn's actions on it.
    fn play_turn(&mut self, state: &mut State);
}

impl<F: FnMut(&mut State)> Bot for F {
    fn play_turn(&mut self, state: &mut State) {
        self(state);
    }
}

/// A connected game session.
#[derive(Debug)]
pub struct Game {
    config: ClientConfig,
    link: Link,
    live: State,
    working: Option<State>,
    phase: SessionPhase,
    awaited_first: bool,
    turns_played: u32,
    updates_applied: u32,
    keyframes_checked: u32,
}

impl Game {
    /// Connect to the configured server and complete the handshake.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] for invalid configuration, connection
    /// failures, or a broken handshake.
    pub fn connect(config: ClientConfig) -> Result<Self, SessionError> {
        Self::connect_inner(config, None)
    }

    /// Like [`Game::connect`], copying every received line to `transcript`.
    ///
    /// # Errors
    ///
    /// See [`Game::connect`].
    pub fn connect_recording(
        config: ClientConfig,
        transcript: Box<dyn Write + Send>,
    ) -> Result<Self, SessionError> {
        Self::connect_inner(config, Some(transcript))
    }

    fn connect_inner(
        config: ClientConfig,
        transcript: Option<Box<dyn Write + Send>>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        info!(endpoint = %config.endpoint, name = %config.name, "connecting");
        let (reader, writer) = transport::open(&config.endpoint)?;
        Self::handshake(reader, writer, config, transcript)
    }

    /// Run the handshake over arbitrary byte streams.
    ///
    /// # Errors
    ///
    /// See [`Game::connect`].
    pub fn from_streams<R, W>(reader: R, writer: W, config: ClientConfig) -> Result<Self, SessionError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        config.validate()?;
        Self::handshake(Box::new(reader), Box::new(writer), config, None)
    }

    fn handshake(
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
        config: ClientConfig,
        transcript: Option<Box<dyn Write + Send>>,
    ) -> Result<Self, SessionError> {
        let inbox = transport::spawn_receiver(reader, transcript)?;
        let mut link = Link::new(writer, inbox);

        link.send(&ClientMessage::Login {
            name: config.name.clone(),
            key: config.key.clone(),
        })?;

        let my_team = match expect_message(&mut link, "loginConfirm")? {
            ServerMessage::LoginConfirm { team_id } => team_id,
            other => return Err(unexpected("loginConfirm", &other)),
        };
        info!(team = my_team, "login confirmed");

        let (teams, world) = match expect_message(&mut link, "start")? {
            ServerMessage::Start {
                teams,
                initial_state,
            } => (teams, initial_state),
            other => return Err(unexpected("start", &other)),
        };
        let live = build_state(&config, my_team, &teams, &world)?;
        info!(
            team = my_team,
            opponent = live.other_team().id,
            entities = live.entity_count(),
            width = world.width,
            height = world.height,
            "game started"
        );

        Ok(Self {
            config,
            link,
            live,
            working: None,
            phase: SessionPhase::AwaitingTurn,
            awaited_first: false,
            turns_played: 0,
            updates_applied: 0,
            keyframes_checked: 0,
        })
    }

    /// The authoritative state as of the last update.
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.live
    }

    /// Immutable snapshot of the authoritative state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.live.snapshot()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// How the game ended, once it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            SessionPhase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// The local team's id.
    #[must_use]
    pub const fn my_team_id(&self) -> TeamId {
        self.live.my_team_id()
    }

    /// Configuration this session was started with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Turns handed to the bot so far.
    #[must_use]
    pub const fn turns_played(&self) -> u32 {
        self.turns_played
    }

    /// `nextTurn` updates applied so far.
    #[must_use]
    pub const fn updates_applied(&self) -> u32 {
        self.updates_applied
    }

    /// Keyframes validated so far.
    #[must_use]
    pub const fn keyframes_checked(&self) -> u32 {
        self.keyframes_checked
    }

    /// Turns the server reported as missed, ascending.
    pub fn missed_turns(&self) -> impl Iterator<Item = u32> + '_ {
        self.link.missed_turns()
    }

    /// Handle that makes a blocked [`Game::next_turn`] return
    /// [`SessionError::Cancelled`].
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.link.cancel_handle()
    }

    /// Submit the previous turn's actions and wait for the next local turn.
    ///
    /// Returns `Ok(None)` once the game is over. The first call only waits.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] on transport failure, protocol violations,
    /// undecodable payloads, keyframe mismatches, or cancellation.
    pub fn next_turn(&mut self) -> Result<Option<&mut State>, SessionError> {
        if self.outcome().is_some() {
            return Ok(None);
        }
        if self.awaited_first {
            self.submit()?;
        }
        self.awaited_first = true;

        if let Some(outcome) = self.await_turn()? {
            self.finish(outcome);
            return Ok(None);
        }
        self.turns_played += 1;

        let mode = self.config.mode;
        if mode.is_isolated() {
            let mut copy = self.live.clone();
            copy.set_speculate(mode.speculates());
            Ok(Some(self.working.insert(copy)))
        } else {
            Ok(Some(&mut self.live))
        }
    }

    /// Play until the game ends, handing each turn to `bot`.
    ///
    /// # Errors
    ///
    /// See [`Game::next_turn`].
    pub fn run<B: Bot + ?Sized>(&mut self, bot: &mut B) -> Result<Outcome, SessionError> {
        while let Some(state) = self.next_turn()? {
            bot.play_turn(state);
        }
        Ok(self.outcome().unwrap_or(Outcome::ConnectionClosed))
    }

    fn finish(&mut self, outcome: Outcome) {
        info!(%outcome, turns = self.turns_played, "game over");
        self.working = None;
        self.phase = SessionPhase::Finished(outcome);
    }

    fn submit(&mut self) -> Result<(), SessionError> {
        let turn = self.live.turn();
        let actions = match self.working.take() {
            Some(mut working) => working.take_actions(),
            None => self.live.take_actions(),
        };
        self.live.clear_actions();

        if self.link.is_missed(turn) {
            warn!(turn, dropped = actions.len(), "turn was missed; dropping queued actions");
            return Ok(());
        }
        debug!(turn, actions = actions.len(), "submitting turn");
        self.link.send(&ClientMessage::MakeTurn { turn, actions })?;
        Ok(())
    }

    /// Apply updates until it is our turn with nothing left to catch up on.
    fn await_turn(&mut self) -> Result<Option<Outcome>, SessionError> {
        loop {
            let message = match self.link.recv()? {
                Event::Message(message) => message,
                Event::Closed => return Ok(Some(Outcome::ConnectionClosed)),
                Event::Failed(e) => return Err(e),
            };

            match message {
                ServerMessage::Keyframe { state } => {
                    self.live.validate_keyframe(&state)?;
                    self.keyframes_checked += 1;
                    debug!(turn = self.live.turn(), "keyframe matches");
                }
                ServerMessage::NextTurn(update) => {
                    self.live.apply_next_turn(&update)?;
                    self.updates_applied += 1;
                    if let Some(winner) = update.winner_id {
                        return Ok(Some(Outcome::Winner(winner)));
                    }
                    self.report_failures(&update);
                    if let Some(next) = update.next_team_id {
                        self.phase = SessionPhase::InTurn(next);
                    }
                    debug!(
                        turn = update.turn,
                        next_team = ?update.next_team_id,
                        changed = update.changed.len(),
                        dead = update.dead.len(),
                        "applied turn"
                    );
                    if update.next_team_id == Some(self.my_team_id()) && !self.link.can_recv_more() {
                        return Ok(None);
                    }
                }
                other => return Err(unexpected("nextTurn or keyframe", &other)),
            }
        }
    }

    fn report_failures(&self, update: &NextTurn) {
        if update.last_team_id != Some(self.my_team_id()) {
            return;
        }
        for (action, reason) in update.failed.iter().zip(&update.reasons) {
            warn!(
                turn = update.turn,
                id = action.id(),
                action = %action.kind(),
                reason = %reason,
                "action failed"
            );
        }
    }
}

fn expect_message(link: &mut Link, expected: &'static str) -> Result<ServerMessage, SessionError> {
    match link.recv()? {
        Event::Message(message) => Ok(message),
        Event::Failed(e) => Err(e),
        Event::Closed => Err(ProtocolError::ClosedEarly(expected).into()),
    }
}

fn unexpected(expected: &'static str, got: &ServerMessage) -> SessionError {
    ProtocolError::Unexpected {
        expected,
        got: got.command(),
    }
    .into()
}

fn build_state(
    config: &ClientConfig,
    my_team: TeamId,
    teams: &[TeamData],
    world: &WorldData,
) -> Result<State, SessionError> {
    let roster: Vec<Team> = teams
        .iter()
        .map(|t| Team::new(t.team_id, t.name.clone()))
        .collect();
    let opponent = config.resolve_opponent(my_team, &roster)?;
    let mut state = State::from_world(roster, my_team, opponent, world)?;
    state.set_speculate(false);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_mode_coupling() {
        assert!(!TurnMode::Live.is_isolated());
        assert!(TurnMode::Copy.is_isolated());
        assert!(!TurnMode::Copy.speculates());
        assert!(TurnMode::Speculate.is_isolated());
        assert!(TurnMode::Speculate.speculates());
        assert_eq!(TurnMode::default(), TurnMode::Speculate);
    }

    #[test]
    fn test_outcome_winner() {
        assert_eq!(Outcome::Winner(2).winner(), 2);
        assert_eq!(Outcome::ConnectionClosed.winner(), 0);
        assert_eq!(Outcome::Winner(2).to_string(), "team 2 won");
    }
}
