//! Client configuration: bot name, server endpoint, credentials, turn mode.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::game::{NEUTRAL_TEAM_ID, Team, TeamId};
use crate::session::TurnMode;

/// Default game server port.
pub const DEFAULT_PORT: u16 = 6147;
/// Default game server host.
pub const DEFAULT_HOST: &str = "localhost";
/// Environment variable naming the server host.
pub const SERVER_ENV: &str = "BATTLECODE_IP";
/// Environment variable holding the player key.
pub const KEY_ENV: &str = "BATTLECODE_PLAYER_KEY";

/// Shortest accepted bot name.
const MIN_NAME_LEN: usize = 6;
/// Longest accepted bot name.
const MAX_NAME_LEN: usize = 99;

/// Where the game server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP host and port.
    Tcp {
        /// Host name or address.
        host: String,
        /// Port.
        port: u16,
    },
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl Endpoint {
    /// Parse `host`, `host:port`, or (on Unix) an absolute socket path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServer`] for an empty host, a bad port,
    /// or a socket path on a platform without Unix sockets.
    pub fn parse(server: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidServer(server.to_string());
        let server = server.trim();
        if server.starts_with('/') {
            return if cfg!(unix) {
                Ok(Endpoint::Unix(PathBuf::from(server)))
            } else {
                Err(invalid())
            };
        }
        let (host, port) = match server.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
            None => (server, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Everything needed to join a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bot name sent at login (6 to 99 characters).
    pub name: String,
    /// Server to connect to.
    pub endpoint: Endpoint,
    /// Player key for authenticated servers.
    pub key: Option<String>,
    /// How per-turn state is handed to the bot.
    pub mode: TurnMode,
    /// Opposing team; inferred from the roster when unset.
    pub opponent: Option<TeamId>,
}

impl ClientConfig {
    /// Configuration for the default local server.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: Endpoint::default(),
            key: None,
            mode: TurnMode::default(),
            opponent: None,
        }
    }

    /// Configuration from `BATTLECODE_IP` and `BATTLECODE_PLAYER_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServer`] if `BATTLECODE_IP` is unusable.
    pub fn from_env(name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(name, |key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`] with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServer`] if the server variable is unusable.
    pub fn from_lookup(
        name: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::new(name);
        if let Some(server) = lookup(SERVER_ENV) {
            config.endpoint = Endpoint::parse(&server)?;
        }
        config.key = lookup(KEY_ENV);
        Ok(config)
    }

    /// Use a different server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Use a player key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Use a different turn mode.
    #[must_use]
    pub fn with_mode(mut self, mode: TurnMode) -> Self {
        self.mode = mode;
        self
    }

    /// Name the opposing team explicitly.
    #[must_use]
    pub fn with_opponent(mut self, opponent: TeamId) -> Self {
        self.opponent = Some(opponent);
        self
    }

    /// Check the bot name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidName`] unless the name has 6 to 99 characters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.name.chars().count();
        if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
            Ok(())
        } else {
            Err(ConfigError::InvalidName(self.name.clone()))
        }
    }

    /// Pick the opposing team from the roster.
    ///
    /// A configured opponent must be in the roster. Otherwise the single
    /// team that is neither ours nor neutral is chosen, or the neutral team
    /// when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOpponent`] for a configured team missing
    /// from the roster and [`ConfigError::AmbiguousOpponent`] when several
    /// teams qualify.
    pub fn resolve_opponent(&self, my_team: TeamId, roster: &[Team]) -> Result<TeamId, ConfigError> {
        if let Some(opponent) = self.opponent {
            return if roster.iter().any(|t| t.id == opponent) {
                Ok(opponent)
            } else {
                Err(ConfigError::UnknownOpponent(opponent))
            };
        }
        let candidates: Vec<TeamId> = roster
            .iter()
            .map(|t| t.id)
            .filter(|&id| id != my_team && id != NEUTRAL_TEAM_ID)
            .collect();
        match candidates.as_slice() {
            [] => Ok(NEUTRAL_TEAM_ID),
            [only] => Ok(*only),
            _ => Err(ConfigError::AmbiguousOpponent(candidates)),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("battlehack")
    }
}
