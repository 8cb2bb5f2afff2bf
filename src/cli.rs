//! CLI command implementations for battlehack.

pub(crate) mod check;
pub(crate) mod play;

mod demo_bot;
mod output;

use clap::ValueEnum;
use std::error::Error;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use battlehack::TurnMode;

/// Output format for command summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// How turns are handed to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ModeArg {
    /// Live state, no prediction.
    Live,
    /// Isolated copy, no prediction.
    Copy,
    /// Isolated copy with local prediction.
    Speculate,
}

impl From<ModeArg> for TurnMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Live => TurnMode::Live,
            ModeArg::Copy => TurnMode::Copy,
            ModeArg::Speculate => TurnMode::Speculate,
        }
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over `verbosity` (0 = info, 1 = debug, 2+ = trace).
pub(crate) fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let console_layer = log_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<battlehack::SessionError> for CliError {
    fn from(e: battlehack::SessionError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<battlehack::error::ConfigError> for CliError {
    fn from(e: battlehack::error::ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("Failed to encode output: {e}"))
    }
}
