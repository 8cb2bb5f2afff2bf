//! Play command implementation.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use battlehack::{ClientConfig, Endpoint, Game, TeamId};
use tracing::info;

use super::demo_bot::DemoBot;
use super::output::{SessionReport, format_text};
use super::{CliError, ModeArg, OutputFormat};

/// Options for `battlehack play`.
#[derive(Debug)]
pub(crate) struct PlayOptions {
    pub(crate) name: String,
    pub(crate) server: Option<String>,
    pub(crate) key: Option<String>,
    pub(crate) mode: ModeArg,
    pub(crate) opponent: Option<TeamId>,
    pub(crate) record: Option<PathBuf>,
    pub(crate) format: OutputFormat,
}

/// Execute the play command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the connection fails,
/// or the session breaks.
pub(crate) fn execute(options: PlayOptions) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env(options.name)?.with_mode(options.mode.into());
    if let Some(server) = options.server.as_deref() {
        config = config.with_endpoint(Endpoint::parse(server)?);
    }
    if let Some(key) = options.key {
        config = config.with_key(key);
    }
    if let Some(opponent) = options.opponent {
        config = config.with_opponent(opponent);
    }

    let mut game = match &options.record {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                CliError::new(format!("Failed to create {}: {e}", path.display()))
            })?;
            Game::connect_recording(config, Box::new(BufWriter::new(file)))?
        }
        None => Game::connect(config)?,
    };

    let mut bot = DemoBot::default();
    let outcome = game.run(&mut bot)?;
    info!(%outcome, actions = bot.actions, "game over");

    let report = SessionReport::from_game(&game, outcome);
    match options.format {
        OutputFormat::Text => print!("{}", format_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
