//! Shared types module - enums and tuning constants
//!
//! This crate defines the vocabulary shared by the exercise core, the protocol adapter
//! and any presentation layer. Everything here is plain data with no external
//! dependencies, so it can be used from headless tools, servers and tests alike.
//!
//! # Exercise Lifecycle
//!
//! ```text
//! waiting --start--> active <--pause/resume--> paused
//!                      |
//!                      +--(arrangement == solution)--> completed
//!                      +--(time runs out)-----------> failed
//! active/paused --abort--> aborted (terminal)
//! any non-aborted state --reset--> waiting
//! ```
//!
//! # Scoring Constants
//!
//! Per-difficulty tables are indexed by [`Difficulty::index`]:
//!
//! | Table | Easy | Medium | Hard | Description |
//! |-------|------|--------|------|-------------|
//! | `BASE_POINTS` | 10 | 20 | 30 | Points for a correct placement at 1.0x |
//! | `INCORRECT_PENALTY` | 0 | 5 | 10 | Points removed for an incorrect placement |
//! | `STREAK_BONUS_POINTS` | 25 | 50 | 75 | Flat bonus every `STREAK_BONUS_INTERVAL` correct placements |
//! | `TIME_BONUS_MAX` | 100 | 200 | 300 | Completion bonus at full remaining time |
//!
//! # Combo Multiplier
//!
//! Multipliers are integer percentages (100 = 1.0x):
//!
//! | Streak | Multiplier |
//! |--------|------------|
//! | 0-1 | 1.0x |
//! | 2 | 1.1x |
//! | 3 | 1.2x |
//! | n | 1.0x + 0.1x * (n - 1) |
//! | 11+ | 2.0x (cap) |
//!
//! # Examples
//!
//! ```
//! use code_arrange_types::{Difficulty, ExerciseCommand, ExerciseStatus, BASE_POINTS};
//!
//! let difficulty = Difficulty::from_str("HARD").unwrap();
//! assert_eq!(difficulty, Difficulty::Hard);
//! assert_eq!(BASE_POINTS[difficulty.index()], 30);
//!
//! let command = ExerciseCommand::from_str("resume").unwrap();
//! assert_eq!(command.as_str(), "resume");
//!
//! assert!(ExerciseStatus::Aborted.is_terminal());
//! assert!(!ExerciseStatus::Paused.is_terminal());
//! ```

/// Default exercise time limit in seconds
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 120;

/// Points for a correct placement at 1.0x, by difficulty
pub const BASE_POINTS: [u32; 3] = [10, 20, 30];

/// Points removed for an incorrect placement, by difficulty
pub const INCORRECT_PENALTY: [u32; 3] = [0, 5, 10];

/// Flat bonus awarded every `STREAK_BONUS_INTERVAL` consecutive correct placements
pub const STREAK_BONUS_POINTS: [u32; 3] = [25, 50, 75];

/// Maximum completion bonus (awarded when no time has elapsed), by difficulty
pub const TIME_BONUS_MAX: [u32; 3] = [100, 200, 300];

/// Combo multiplier with no streak (1.0x)
pub const COMBO_BASE_PCT: u32 = 100;

/// Combo multiplier growth per additional streak step (0.1x)
pub const COMBO_STEP_PCT: u32 = 10;

/// Combo multiplier cap (2.0x)
pub const COMBO_MAX_PCT: u32 = 200;

/// A streak bonus is awarded each time the streak reaches a multiple of this
pub const STREAK_BONUS_INTERVAL: u32 = 5;

/// Multiplier at which presentation layers show a combo banner (1.2x)
pub const COMBO_CUE_PCT: u32 = 120;

/// Streak length at which presentation layers show a streak banner
pub const STREAK_CUE_MIN: u32 = 3;

/// Shuffle retries before falling back to a rotation when the permutation is the identity
pub const SHUFFLE_MAX_ATTEMPTS: u32 = 8;

/// Lifecycle status of an exercise
///
/// - **Waiting**: Loaded, timer not running
/// - **Active**: Timer running, drops accepted
/// - **Paused**: Timer frozen
/// - **Completed**: Arrangement matched the solution in time
/// - **Failed**: Time ran out first
/// - **Aborted**: Discarded by the learner; accepts nothing further
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExerciseStatus {
    #[default]
    Waiting,
    Active,
    Paused,
    Completed,
    Failed,
    Aborted,
}

impl ExerciseStatus {
    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseStatus::Waiting => "waiting",
            ExerciseStatus::Active => "active",
            ExerciseStatus::Paused => "paused",
            ExerciseStatus::Completed => "completed",
            ExerciseStatus::Failed => "failed",
            ExerciseStatus::Aborted => "aborted",
        }
    }

    /// True once no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExerciseStatus::Aborted)
    }

    /// True when the exercise has ended, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ExerciseStatus::Completed | ExerciseStatus::Failed | ExerciseStatus::Aborted
        )
    }
}

impl std::fmt::Display for ExerciseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exercise difficulty
///
/// Selects the row of every per-difficulty scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse difficulty from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use code_arrange_types::Difficulty;
    ///
    /// assert_eq!(Difficulty::from_str("easy"), Some(Difficulty::Easy));
    /// assert_eq!(Difficulty::from_str("Medium"), Some(Difficulty::Medium));
    /// assert_eq!(Difficulty::from_str("impossible"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Row index into the per-difficulty tables
    pub fn index(&self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }
}

/// Kind of a scoring feedback entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackKind {
    /// Fragment landed on its solution index
    Correct,
    /// Fragment landed anywhere else
    Incorrect,
    /// One-time completion bonus scaled by remaining time
    TimeBonus,
    /// Flat bonus for reaching a streak milestone
    StreakBonus,
}

impl FeedbackKind {
    /// Convert to camelCase string for the adapter protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Correct => "correct",
            FeedbackKind::Incorrect => "incorrect",
            FeedbackKind::TimeBonus => "timeBonus",
            FeedbackKind::StreakBonus => "streakBonus",
        }
    }
}

/// Operations accepted by an exercise
///
/// Used for protocol parsing and to name the rejected operation in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExerciseCommand {
    Start,
    Pause,
    Resume,
    /// Place a fragment (from the available pool or the arrangement)
    Drop,
    /// Return a placed fragment to the available pool
    Withdraw,
    /// Host clock decrement
    Tick,
    Reset,
    Abort,
}

impl ExerciseCommand {
    /// Parse command from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use code_arrange_types::ExerciseCommand;
    ///
    /// assert_eq!(ExerciseCommand::from_str("start"), Some(ExerciseCommand::Start));
    /// assert_eq!(ExerciseCommand::from_str("DROP"), Some(ExerciseCommand::Drop));
    /// assert_eq!(ExerciseCommand::from_str("undo"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "start" => Some(ExerciseCommand::Start),
            "pause" => Some(ExerciseCommand::Pause),
            "resume" => Some(ExerciseCommand::Resume),
            "drop" => Some(ExerciseCommand::Drop),
            "withdraw" => Some(ExerciseCommand::Withdraw),
            "tick" => Some(ExerciseCommand::Tick),
            "reset" => Some(ExerciseCommand::Reset),
            "abort" => Some(ExerciseCommand::Abort),
            _ => None,
        }
    }

    /// Convert to lowercase string for the adapter protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseCommand::Start => "start",
            ExerciseCommand::Pause => "pause",
            ExerciseCommand::Resume => "resume",
            ExerciseCommand::Drop => "drop",
            ExerciseCommand::Withdraw => "withdraw",
            ExerciseCommand::Tick => "tick",
            ExerciseCommand::Reset => "reset",
            ExerciseCommand::Abort => "abort",
        }
    }
}

impl std::fmt::Display for ExerciseCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
