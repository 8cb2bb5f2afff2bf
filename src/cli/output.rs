//! Output formatting utilities for CLI.

use std::fmt::Write as _;

use battlehack::{Game, Outcome};
use serde::Serialize;

/// JSON-serializable session summary.
#[derive(Debug, Serialize)]
pub(super) struct SessionReport {
    /// Local team id.
    pub(super) my_team: u32,
    /// Winning team id (null if the stream closed first).
    pub(super) winner: Option<u32>,
    /// Turns handed to the bot.
    pub(super) turns_played: u32,
    /// Authoritative turn updates applied.
    pub(super) updates_applied: u32,
    /// Keyframes checked against the local model.
    pub(super) keyframes_checked: u32,
    /// Turns the server reported as missed.
    pub(super) missed_turns: Vec<u32>,
    /// Last turn reached.
    pub(super) final_turn: u32,
    /// Per-team standing at the end.
    pub(super) teams: Vec<TeamReport>,
}

/// JSON-serializable standing of one team.
#[derive(Debug, Serialize)]
pub(super) struct TeamReport {
    /// Team id.
    pub(super) id: u32,
    /// Team name.
    pub(super) name: String,
    /// Live entities owned.
    pub(super) entities: usize,
    /// Sectors controlled.
    pub(super) sectors: usize,
}

impl SessionReport {
    /// Summarize a finished session.
    pub(super) fn from_game(game: &Game, outcome: Outcome) -> Self {
        let snapshot = game.snapshot();
        Self {
            my_team: game.my_team_id(),
            winner: match outcome {
                Outcome::Winner(team) => Some(team),
                Outcome::ConnectionClosed => None,
            },
            turns_played: game.turns_played(),
            updates_applied: game.updates_applied(),
            keyframes_checked: game.keyframes_checked(),
            missed_turns: game.missed_turns().collect(),
            final_turn: snapshot.turn(),
            teams: game
                .state()
                .teams()
                .filter(|team| !team.is_neutral())
                .map(|team| TeamReport {
                    id: team.id,
                    name: team.name.clone(),
                    entities: snapshot.count_for_team(team.id),
                    sectors: snapshot.sectors_for_team(team.id),
                })
                .collect(),
        }
    }
}

/// Format a session summary as human-readable text.
pub(super) fn format_text(report: &SessionReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Session Result (team {})", report.my_team);
    match report.winner {
        Some(winner) if winner == report.my_team => {
            let _ = writeln!(output, "  Winner: team {winner} (us)");
        }
        Some(winner) => {
            let _ = writeln!(output, "  Winner: team {winner}");
        }
        None => output.push_str("  Winner: none (connection closed)\n"),
    }
    let _ = writeln!(output, "  Final turn: {}", report.final_turn);
    let _ = writeln!(output, "  Turns played: {}", report.turns_played);
    let _ = writeln!(output, "  Updates applied: {}", report.updates_applied);
    let _ = writeln!(output, "  Keyframes checked: {}", report.keyframes_checked);
    if !report.missed_turns.is_empty() {
        let missed: Vec<String> = report.missed_turns.iter().map(u32::to_string).collect();
        let _ = writeln!(output, "  Missed turns: {}", missed.join(", "));
    }
    output.push('\n');

    for team in &report.teams {
        let _ = writeln!(
            output,
            "  Team {} ({}): {} entities, {} sectors",
            team.id, team.name, team.entities, team.sectors
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(winner: Option<u32>) -> SessionReport {
        SessionReport {
            my_team: 1,
            winner,
            turns_played: 3,
            updates_applied: 6,
            keyframes_checked: 1,
            missed_turns: vec![4, 7],
            final_turn: 7,
            teams: vec![TeamReport {
                id: 1,
                name: "red".into(),
                entities: 2,
                sectors: 1,
            }],
        }
    }

    #[test]
    fn test_format_text_marks_own_win() {
        let text = format_text(&report(Some(1)));
        assert!(text.contains("Winner: team 1 (us)"));
        assert!(text.contains("Missed turns: 4, 7"));
        assert!(text.contains("Team 1 (red): 2 entities, 1 sectors"));
    }

    #[test]
    fn test_format_text_without_winner() {
        let text = format_text(&report(None));
        assert!(text.contains("connection closed"));
    }

    #[test]
    fn test_json_uses_null_winner() {
        let json = serde_json::to_value(report(None)).unwrap();
        assert!(json["winner"].is_null());
        assert_eq!(json["missed_turns"][1], 7);
    }
}
