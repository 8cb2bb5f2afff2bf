//! Battlehack CLI - play games against a server and check recorded transcripts.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Battlehack - client for turn-based battlecode hackathon games
#[derive(Parser, Debug)]
#[command(name = "battlehack")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a server and play with the built-in sample bot
    Play {
        /// Bot name sent at login (6-99 characters)
        #[arg(short, long, default_value = "battlehack")]
        name: String,

        /// Server as host, host:port or a unix socket path (default: $BATTLECODE_IP or localhost:6147)
        #[arg(short, long)]
        server: Option<String>,

        /// Player key sent at login
        #[arg(short, long, env = "BATTLECODE_PLAYER_KEY")]
        key: Option<String>,

        /// How turns are handed to the bot
        #[arg(short, long, default_value = "speculate")]
        mode: cli::ModeArg,

        /// Opponent team id, when the roster has several
        #[arg(long)]
        opponent: Option<u32>,

        /// Save the raw server transcript to file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Replay a recorded transcript and check the world model against it
    Check {
        /// Transcript file (one server message per line)
        #[arg(required = true)]
        transcript: PathBuf,

        /// Bot name used for the replayed login
        #[arg(short, long, default_value = "battlehack")]
        name: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_logging(args.verbose);

    let result = match args.command {
        Commands::Play {
            name,
            server,
            key,
            mode,
            opponent,
            record,
            format,
        } => cli::play::execute(cli::play::PlayOptions {
            name,
            server,
            key,
            mode,
            opponent,
            record,
            format,
        }),

        Commands::Check {
            transcript,
            name,
            format,
        } => cli::check::execute(&transcript, name, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
