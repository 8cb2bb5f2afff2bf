//! Transcript check command implementation.
//!
//! Replays a recorded server transcript through the session driver with a
//! passive bot. Every update is applied and every keyframe is compared with
//! the local model, so a clean run means the model tracks the server.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use battlehack::{ClientConfig, Game, State, TurnMode};

use super::output::{SessionReport, format_text};
use super::{CliError, OutputFormat};

/// Execute the check command.
///
/// # Errors
///
/// Returns an error if the transcript cannot be read, is malformed, or
/// disagrees with the local model.
pub(crate) fn execute(transcript: &Path, name: String, format: OutputFormat) -> Result<(), CliError> {
    let file = File::open(transcript)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", transcript.display())))?;

    let report = check(BufReader::new(file), name)
        .map_err(|e| CliError::new(format!("{}: {e}", transcript.display())))?;

    match format {
        OutputFormat::Text => {
            println!("Checked: {}", transcript.display());
            print!("{}", format_text(&report));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Drive a session over `transcript` without queuing anything.
pub(super) fn check<R: io::Read + Send + 'static>(
    transcript: R,
    name: String,
) -> Result<SessionReport, CliError> {
    let config = ClientConfig::new(name).with_mode(TurnMode::Live);
    let mut game = Game::from_streams(transcript, io::sink(), config)?;
    let outcome = game.run(&mut |_: &mut State| {})?;
    Ok(SessionReport::from_game(&game, outcome))
}
