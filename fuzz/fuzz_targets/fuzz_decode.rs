#![no_main]

//! Server message fuzzer.
//!
//! Feeds arbitrary lines through the decoder and, for messages that carry
//! world data, through the world model. Nothing may panic, however the
//! payloads contradict each other.

use battlehack::State;
use battlehack::game::Team;
use battlehack::protocol::ServerMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut state: Option<State> = None;

    for line in text.lines() {
        let Ok(message) = ServerMessage::decode(line) else {
            continue;
        };
        match message {
            ServerMessage::Start {
                teams,
                initial_state,
            } => {
                if initial_state.width > 256 || initial_state.height > 256 {
                    continue;
                }
                let (Some(first), Some(last)) = (teams.first(), teams.last()) else {
                    continue;
                };
                let (mine, other) = (first.team_id, last.team_id);
                let roster = teams.into_iter().map(|t| Team::new(t.team_id, t.name));
                state = State::from_world(roster, mine, other, &initial_state).ok();
            }
            ServerMessage::NextTurn(update) => {
                if let Some(current) = state.as_mut() {
                    if current.apply_next_turn(&update).is_err() {
                        state = None;
                    }
                }
            }
            ServerMessage::Keyframe { state: world } => {
                if let Some(current) = state.as_ref() {
                    let _ = current.validate_keyframe(&world);
                }
            }
            _ => {}
        }
        if let Some(current) = state.as_ref() {
            let _ = current.validate();
            let _ = current.snapshot();
        }
    }
});
