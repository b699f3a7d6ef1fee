//! Per-connection session - one exercise driven by protocol lines and a host clock
//!
//! The session is synchronous and owns its exercise outright. The server calls
//! [`Session::handle_line`] for each inbound line and [`Session::advance_clock`] from its
//! timer, both from the same task, so operations on the exercise never interleave.

use std::sync::mpsc;

use tracing::{debug, info};

use crate::core::{Exercise, ExerciseConfig, ExerciseError, ExerciseSnapshot};
use crate::cues::derive_cues;
use crate::protocol::*;
use crate::types::{ExerciseCommand, ExerciseStatus, DEFAULT_TIME_LIMIT_SECS};

/// Drives one exercise for one client
pub struct Session {
    exercise: Option<Exercise>,
    updates: Option<mpsc::Receiver<ExerciseSnapshot>>,
    /// Last snapshot sent, for cue derivation
    last: Option<ExerciseSnapshot>,
    out_seq: u64,
    default_time_limit: u32,
    /// Sub-second remainder carried between clock advances
    pending_ms: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_LIMIT_SECS)
    }
}

impl Session {
    pub fn new(default_time_limit: u32) -> Self {
        Self {
            exercise: None,
            updates: None,
            last: None,
            out_seq: 0,
            default_time_limit,
            pending_ms: 0,
        }
    }

    pub fn exercise(&self) -> Option<&Exercise> {
        self.exercise.as_ref()
    }

    /// True while the host clock should be running
    pub fn is_active(&self) -> bool {
        self.exercise
            .as_ref()
            .is_some_and(|e| e.status() == ExerciseStatus::Active)
    }

    /// Handle one inbound protocol line and return the replies in order
    pub fn handle_line(&mut self, line: &str) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        match parse_message(line) {
            Ok(ParsedMessage::Load(msg)) => self.handle_load(msg, &mut out),
            Ok(ParsedMessage::Command(msg)) => self.handle_command(msg, &mut out),
            Ok(ParsedMessage::Unknown(u)) => {
                let seq = self.next_seq();
                out.push(ServerMessage::Error(create_error(
                    seq,
                    u.seq,
                    ErrorCode::InvalidCommand,
                    "unknown message type",
                )));
            }
            Err(e) => {
                let seq = self.next_seq();
                out.push(ServerMessage::Error(create_error(
                    seq,
                    extract_seq(line),
                    ErrorCode::ParseError,
                    &e.to_string(),
                )));
            }
        }
        out
    }

    /// Feed wall-clock time into the exercise; whole seconds become ticks
    pub fn advance_clock(&mut self, elapsed_ms: u64) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        if !self.is_active() {
            self.pending_ms = 0;
            return out;
        }

        self.pending_ms += elapsed_ms;
        let secs = self.pending_ms / 1000;
        self.pending_ms %= 1000;
        if secs == 0 {
            return out;
        }

        let secs = u32::try_from(secs).unwrap_or(u32::MAX);
        if let Some(exercise) = self.exercise.as_mut() {
            if let Err(e) = exercise.tick(secs) {
                debug!(error = %e, "clock tick rejected");
            }
        }
        self.drain_observations(&mut out);
        out
    }

    fn handle_load(&mut self, msg: LoadMessage, out: &mut Vec<ServerMessage>) {
        let config = ExerciseConfig {
            time_limit_secs: msg.time_limit.unwrap_or(self.default_time_limit),
            difficulty: msg.difficulty.map(|d| d.0).unwrap_or_default(),
            seed: msg.seed.unwrap_or_else(|| current_timestamp_ms() as u32),
        };

        let mut exercise = match Exercise::with_config(&msg.source, &config) {
            Ok(exercise) => exercise,
            Err(e) => {
                self.push_core_error(msg.seq, &e, out);
                return;
            }
        };

        info!(
            fragments = exercise.solution().len(),
            time_limit = config.time_limit_secs,
            difficulty = config.difficulty.as_str(),
            "exercise loaded"
        );

        self.updates = Some(exercise.subscribe_channel());
        let snapshot = exercise.snapshot();
        self.exercise = Some(exercise);
        self.last = None;
        self.pending_ms = 0;

        let seq = self.next_seq();
        out.push(ServerMessage::Ack(create_ack(seq, msg.seq)));
        self.push_observation(snapshot, out);
    }

    fn handle_command(&mut self, msg: CommandMessage, out: &mut Vec<ServerMessage>) {
        let Some(exercise) = self.exercise.as_mut() else {
            let seq = self.next_seq();
            out.push(ServerMessage::Error(create_error(
                seq,
                msg.seq,
                ErrorCode::NoExercise,
                "no exercise loaded",
            )));
            return;
        };

        match apply_command(exercise, &msg) {
            Ok(()) => {
                let seq = self.next_seq();
                out.push(ServerMessage::Ack(create_ack(seq, msg.seq)));
                self.drain_observations(out);
            }
            Err(CommandFailure::Protocol(code, message)) => {
                let seq = self.next_seq();
                out.push(ServerMessage::Error(create_error(seq, msg.seq, code, &message)));
            }
            Err(CommandFailure::Core(e)) => self.push_core_error(msg.seq, &e, out),
        }
    }

    fn push_core_error(&mut self, request_seq: u64, e: &ExerciseError, out: &mut Vec<ServerMessage>) {
        let seq = self.next_seq();
        out.push(ServerMessage::Error(create_error(
            seq,
            request_seq,
            ErrorCode::from(e),
            &e.to_string(),
        )));
    }

    fn drain_observations(&mut self, out: &mut Vec<ServerMessage>) {
        let mut pending = Vec::new();
        if let Some(rx) = self.updates.as_ref() {
            while let Ok(snapshot) = rx.try_recv() {
                pending.push(snapshot);
            }
        }
        for snapshot in pending {
            self.push_observation(snapshot, out);
        }
    }

    fn push_observation(&mut self, snapshot: ExerciseSnapshot, out: &mut Vec<ServerMessage>) {
        let cues = derive_cues(self.last.as_ref(), &snapshot);
        let seq = self.next_seq();
        out.push(ServerMessage::Observation(Box::new(build_observation(
            seq, &snapshot, cues,
        ))));
        self.last = Some(snapshot);
    }

    fn next_seq(&mut self) -> u64 {
        self.out_seq += 1;
        self.out_seq
    }
}

enum CommandFailure {
    Protocol(ErrorCode, String),
    Core(ExerciseError),
}

impl From<ExerciseError> for CommandFailure {
    fn from(value: ExerciseError) -> Self {
        CommandFailure::Core(value)
    }
}

fn apply_command(exercise: &mut Exercise, msg: &CommandMessage) -> Result<(), CommandFailure> {
    match msg.command.0 {
        ExerciseCommand::Start => exercise.start().map(|_| ())?,
        ExerciseCommand::Pause => exercise.pause().map(|_| ())?,
        ExerciseCommand::Resume => exercise.resume().map(|_| ())?,
        ExerciseCommand::Reset => exercise.reset().map(|_| ())?,
        ExerciseCommand::Abort => exercise.abort().map(|_| ())?,
        ExerciseCommand::Tick => exercise.tick(msg.elapsed.unwrap_or(1)).map(|_| ())?,
        ExerciseCommand::Withdraw => {
            let id = require_fragment_id(msg)?;
            exercise.withdraw(id).map(|_| ())?
        }
        ExerciseCommand::Drop => {
            let id = require_fragment_id(msg)?;
            if let Some(index) = msg.index {
                exercise.drop_at(id, index).map(|_| ())?
            } else if let Some(pointer) = msg.pointer_context() {
                exercise.drop(id, &pointer).map(|_| ())?
            } else {
                return Err(CommandFailure::Protocol(
                    ErrorCode::InvalidCommand,
                    "drop requires index or pointer_y".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn require_fragment_id(msg: &CommandMessage) -> Result<&str, CommandFailure> {
    msg.fragment_id.as_deref().ok_or_else(|| {
        CommandFailure::Protocol(
            ErrorCode::InvalidCommand,
            format!("{} requires fragment_id", msg.command.0),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(messages: &[ServerMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| serde_json::to_value(m).unwrap())
            .collect()
    }

    fn loaded(source: &str) -> Session {
        let mut session = Session::new(30);
        let line = serde_json::json!({
            "type": "load", "seq": 1, "source": source, "seed": 7, "difficulty": "easy"
        });
        session.handle_line(&line.to_string());
        session
    }

    fn command(seq: u64, body: serde_json::Value) -> String {
        let mut v = body;
        v["type"] = "command".into();
        v["seq"] = seq.into();
        v.to_string()
    }

    #[test]
    fn test_load_acks_and_observes() {
        let mut session = Session::new(30);
        let out = to_json(&session.handle_line(r#"{"type":"load","seq":4,"source":"a\nb\nc"}"#));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["type"], "ack");
        assert_eq!(out[0]["request_seq"], 4);
        assert_eq!(out[1]["type"], "observation");
        assert_eq!(out[1]["status"], "waiting");
        assert_eq!(out[1]["time_limit"], 30);
        assert_eq!(out[1]["available"].as_array().unwrap().len(), 3);
        assert!(out[1]["seq"].as_u64().unwrap() > out[0]["seq"].as_u64().unwrap());
    }

    #[test]
    fn test_load_empty_source() {
        let mut session = Session::new(30);
        let out = to_json(&session.handle_line(r#"{"type":"load","seq":1,"source":"\n  \n"}"#));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["code"], "empty_source");
        assert!(session.exercise().is_none());
    }

    #[test]
    fn test_load_zero_time_limit() {
        let mut session = Session::new(30);
        let out = to_json(&session.handle_line(r#"{"type":"load","seq":1,"source":"a","time_limit":0}"#));
        assert_eq!(out[0]["code"], "invalid_time_limit");
    }

    #[test]
    fn test_command_without_exercise() {
        let mut session = Session::new(30);
        let out = to_json(&session.handle_line(&command(2, serde_json::json!({"command": "start"}))));
        assert_eq!(out[0]["code"], "no_exercise");
        assert_eq!(out[0]["request_seq"], 2);
    }

    #[test]
    fn test_parse_error_keeps_seq() {
        let mut session = Session::new(30);
        let out = to_json(&session.handle_line(r#"{"type":"command","seq":9,"command":"undo"}"#));
        assert_eq!(out[0]["code"], "parse_error");
        assert_eq!(out[0]["request_seq"], 9);
    }

    #[test]
    fn test_unknown_type() {
        let mut session = Session::new(30);
        let out = to_json(&session.handle_line(r#"{"type":"hello","seq":3}"#));
        assert_eq!(out[0]["code"], "invalid_command");
    }

    #[test]
    fn test_play_to_completion() {
        let mut session = loaded("a\nb");
        let out = to_json(&session.handle_line(&command(2, serde_json::json!({"command": "start"}))));
        assert_eq!(out[1]["status"], "active");

        let out = to_json(&session.handle_line(&command(
            3,
            serde_json::json!({"command": "drop", "fragment_id": "block-0", "pointer_y": 0.0, "positions": []}),
        )));
        assert_eq!(out[0]["type"], "ack");
        assert_eq!(out[1]["arrangement"][0]["id"], "block-0");
        assert_eq!(out[1]["cues"][0]["kind"], "score");

        let out = to_json(&session.handle_line(&command(
            4,
            serde_json::json!({"command": "drop", "fragment_id": "block-1", "index": 1}),
        )));
        assert_eq!(out[1]["status"], "completed");
        // Two correct placements plus the full time bonus on easy.
        assert_eq!(out[1]["score"]["score"], 10 + 11 + 100);
        let cues = out[1]["cues"].as_array().unwrap();
        assert_eq!(cues.last().unwrap()["kind"], "completed");
        assert!(!session.is_active());
    }

    #[test]
    fn test_invalid_transition_reported() {
        let mut session = loaded("a\nb");
        let out = to_json(&session.handle_line(&command(2, serde_json::json!({"command": "pause"}))));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["code"], "invalid_transition");
        assert_eq!(out[0]["message"], "cannot pause while exercise is waiting");
    }

    #[test]
    fn test_drop_requires_target() {
        let mut session = loaded("a\nb");
        session.handle_line(&command(2, serde_json::json!({"command": "start"})));
        let out = to_json(&session.handle_line(&command(
            3,
            serde_json::json!({"command": "drop", "fragment_id": "block-0"}),
        )));
        assert_eq!(out[0]["code"], "invalid_command");

        let out = to_json(&session.handle_line(&command(4, serde_json::json!({"command": "drop", "index": 0}))));
        assert_eq!(out[0]["code"], "invalid_command");

        let out = to_json(&session.handle_line(&command(
            5,
            serde_json::json!({"command": "drop", "fragment_id": "block-9", "index": 0}),
        )));
        assert_eq!(out[0]["code"], "unknown_fragment");
    }

    #[test]
    fn test_drop_with_max_position_index() {
        let mut session = loaded("a\nb\nc");
        session.handle_line(&command(2, serde_json::json!({"command": "start"})));
        session.handle_line(&command(
            3,
            serde_json::json!({"command": "drop", "fragment_id": "block-0", "index": 0}),
        ));

        let out = to_json(&session.handle_line(&command(
            4,
            serde_json::json!({
                "command": "drop", "fragment_id": "block-1", "pointer_y": 20.0,
                "positions": [{"index": u64::MAX, "center_y": 10.0}]
            }),
        )));
        assert_eq!(out[0]["type"], "ack");
        assert_eq!(out[1]["arrangement"][1]["id"], "block-1");
    }

    #[test]
    fn test_advance_clock_ticks_whole_seconds() {
        let mut session = loaded("a\nb");
        assert!(session.advance_clock(5000).is_empty());

        session.handle_line(&command(2, serde_json::json!({"command": "start"})));
        assert!(session.advance_clock(400).is_empty());
        let out = to_json(&session.advance_clock(700));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["time_remaining"], 29);

        let out = to_json(&session.advance_clock(29_000));
        assert_eq!(out[0]["status"], "failed");
        assert_eq!(out[0]["cues"][0]["kind"], "failed");
        assert!(session.advance_clock(1000).is_empty());
    }

    #[test]
    fn test_pause_stops_clock() {
        let mut session = loaded("a\nb");
        session.handle_line(&command(2, serde_json::json!({"command": "start"})));
        session.handle_line(&command(3, serde_json::json!({"command": "pause"})));
        assert!(!session.is_active());
        assert!(session.advance_clock(10_000).is_empty());
        let out = to_json(&session.handle_line(&command(4, serde_json::json!({"command": "resume"}))));
        assert_eq!(out[1]["time_remaining"], 30);
    }

    #[test]
    fn test_client_tick_command() {
        let mut session = loaded("a\nb");
        session.handle_line(&command(2, serde_json::json!({"command": "start"})));
        let out = to_json(&session.handle_line(&command(3, serde_json::json!({"command": "tick", "elapsed": 5}))));
        assert_eq!(out[1]["time_remaining"], 25);

        // A zero tick changes nothing, so only the ack goes out.
        let out = to_json(&session.handle_line(&command(4, serde_json::json!({"command": "tick", "elapsed": 0}))));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_reload_replaces_exercise() {
        let mut session = loaded("a\nb");
        session.handle_line(&command(2, serde_json::json!({"command": "start"})));
        let out = to_json(&session.handle_line(r#"{"type":"load","seq":3,"source":"x\ny\nz","seed":1}"#));
        assert_eq!(out[1]["status"], "waiting");
        assert_eq!(out[1]["total"], 3);
        assert!(out[1].get("cues").is_none());
    }
}
