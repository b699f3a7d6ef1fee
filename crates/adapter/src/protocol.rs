//! Protocol module - JSON message types for the exercise adapter
//!
//! Line-delimited JSON. All messages have: type, seq (sequence number), ts (timestamp in ms)

use serde::{Deserialize, Serialize};

use crate::core::{ExerciseError, ExerciseSnapshot, FeedbackEntry, Fragment, PlacedPosition, PointerContext};
use crate::cues::Cue;
use crate::types::{Difficulty, ExerciseCommand, ExerciseStatus, FeedbackKind};

/// Protocol version reported in observations
pub const PROTOCOL_VERSION: &str = "1.0.0";

// ============== Client -> Server Messages ==============

/// Load a new exercise, replacing any current one on this connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<DifficultyName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

/// Operate on the current exercise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub command: CommandName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<PositionEntry>>,
    /// Explicit target index (used instead of pointer geometry when present)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Seconds for a client-driven `tick`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<u32>,
}

impl CommandMessage {
    /// Pointer geometry carried by a `drop`
    pub fn pointer_context(&self) -> Option<PointerContext> {
        let pointer_y = self.pointer_y?;
        let positions = self
            .positions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| PlacedPosition::new(p.index, p.center_y))
            .collect();
        Some(PointerContext::new(pointer_y, positions))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub index: usize,
    pub center_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandName(pub ExerciseCommand);

impl<'de> Deserialize<'de> for CommandName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        ExerciseCommand::from_str(&s)
            .map(CommandName)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown command: {}", s)))
    }
}

impl Serialize for CommandName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DifficultyName(pub Difficulty);

impl<'de> Deserialize<'de> for DifficultyName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Difficulty::from_str(&s)
            .map(DifficultyName)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown difficulty: {}", s)))
    }
}

impl Serialize for DifficultyName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "parse_error")]
    ParseError,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
    #[serde(rename = "no_exercise")]
    NoExercise,
    #[serde(rename = "empty_source")]
    EmptySource,
    #[serde(rename = "invalid_time_limit")]
    InvalidTimeLimit,
    #[serde(rename = "invalid_transition")]
    InvalidTransition,
    #[serde(rename = "unknown_fragment")]
    UnknownFragment,
}

impl From<&ExerciseError> for ErrorCode {
    fn from(value: &ExerciseError) -> Self {
        match value {
            ExerciseError::EmptySource => ErrorCode::EmptySource,
            ExerciseError::InvalidTimeLimit => ErrorCode::InvalidTimeLimit,
            ExerciseError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            ExerciseError::UnknownFragment { .. } => ErrorCode::UnknownFragment,
        }
    }
}

/// Command acknowledgment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    /// Client seq being acknowledged
    pub request_seq: u64,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub request_seq: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// Exercise state after a change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub episode: u32,
    pub revision: u64,
    pub status: StatusLower,
    pub difficulty: String,
    pub playable: bool,
    pub time_remaining: u32,
    pub time_limit: u32,
    pub elapsed: u32,
    pub arrangement: Vec<FragmentView>,
    pub available: Vec<FragmentView>,
    pub total: usize,
    pub correct_prefix: usize,
    pub score: ScoreView,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<Cue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLower {
    Waiting,
    Active,
    Paused,
    Completed,
    Failed,
    Aborted,
}

impl From<ExerciseStatus> for StatusLower {
    fn from(value: ExerciseStatus) -> Self {
        match value {
            ExerciseStatus::Waiting => StatusLower::Waiting,
            ExerciseStatus::Active => StatusLower::Active,
            ExerciseStatus::Paused => StatusLower::Paused,
            ExerciseStatus::Completed => StatusLower::Completed,
            ExerciseStatus::Failed => StatusLower::Failed,
            ExerciseStatus::Aborted => StatusLower::Aborted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentView {
    pub id: String,
    pub content: String,
    pub indent: usize,
}

impl From<&Fragment> for FragmentView {
    fn from(value: &Fragment) -> Self {
        Self {
            id: value.id.clone(),
            content: value.content.clone(),
            indent: value.indentation_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreView {
    pub score: u32,
    pub streak: u32,
    pub combo_multiplier: f64,
    pub max_combo: f64,
    pub correct_placements: u32,
    pub incorrect_placements: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_feedback: Option<FeedbackView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackKindLower {
    #[serde(rename = "correct")]
    Correct,
    #[serde(rename = "incorrect")]
    Incorrect,
    #[serde(rename = "timeBonus")]
    TimeBonus,
    #[serde(rename = "streakBonus")]
    StreakBonus,
}

impl From<FeedbackKind> for FeedbackKindLower {
    fn from(value: FeedbackKind) -> Self {
        match value {
            FeedbackKind::Correct => FeedbackKindLower::Correct,
            FeedbackKind::Incorrect => FeedbackKindLower::Incorrect,
            FeedbackKind::TimeBonus => FeedbackKindLower::TimeBonus,
            FeedbackKind::StreakBonus => FeedbackKindLower::StreakBonus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackView {
    pub kind: FeedbackKindLower,
    pub points: i64,
    pub elapsed: u32,
    pub seq: u32,
}

impl From<&FeedbackEntry> for FeedbackView {
    fn from(value: &FeedbackEntry) -> Self {
        Self {
            kind: value.kind.into(),
            points: value.points,
            elapsed: value.elapsed_secs,
            seq: value.seq,
        }
    }
}

/// Any message the server writes
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(Box<ObservationMessage>),
}

// ============== Message Parsing ==============

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Load(LoadMessage),
    Command(CommandMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "load")]
        Load(LoadMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Load(m)) => Ok(ParsedMessage::Load(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Err(e) => {
            // Unknown message type is not a hard parse error for the protocol.
            #[derive(Debug, Deserialize)]
            struct Header {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let header = serde_json::from_str::<Header>(json)?;
            match header.msg_type.as_deref() {
                Some("load") | Some("command") => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: header.seq.unwrap_or(0),
                })),
            }
        }
    }
}

/// Best-effort `seq` of a line that failed to parse
pub fn extract_seq(json: &str) -> u64 {
    #[derive(Deserialize)]
    struct SeqOnly {
        seq: Option<u64>,
    }
    serde_json::from_str::<SeqOnly>(json)
        .ok()
        .and_then(|s| s.seq)
        .unwrap_or(0)
}

// ============== Utility Functions ==============

/// Create an acknowledgment
pub fn create_ack(seq: u64, request_seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        request_seq,
    }
}

/// Create an error message
pub fn create_error(seq: u64, request_seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        request_seq,
        code,
        message: message.to_string(),
    }
}

/// Build an observation from a snapshot
pub fn build_observation(seq: u64, snapshot: &ExerciseSnapshot, cues: Vec<Cue>) -> ObservationMessage {
    let score = &snapshot.score;
    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        episode: snapshot.episode,
        revision: snapshot.revision,
        status: snapshot.status.into(),
        difficulty: snapshot.difficulty.as_str().to_string(),
        playable: snapshot.playable(),
        time_remaining: snapshot.time_remaining,
        time_limit: snapshot.time_limit,
        elapsed: snapshot.elapsed_secs(),
        arrangement: snapshot.arrangement.iter().map(FragmentView::from).collect(),
        available: snapshot.available.iter().map(FragmentView::from).collect(),
        total: snapshot.total_count,
        correct_prefix: snapshot.correct_prefix_len,
        score: ScoreView {
            score: score.score,
            streak: score.streak_count,
            combo_multiplier: score.combo_multiplier(),
            max_combo: score.max_combo_reached(),
            correct_placements: score.correct_placements,
            incorrect_placements: score.incorrect_placements,
            last_feedback: score.last_feedback().map(FeedbackView::from),
        },
        cues,
    }
}

/// Get current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
