use crate::blocks::Fragment;
use crate::scoring::ScoreState;
use crate::types::{Difficulty, ExerciseStatus};

/// Immutable view of an exercise after an operation
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSnapshot {
    /// Increments on every reset
    pub episode: u32,
    /// Increments on every state change within the exercise
    pub revision: u64,
    pub status: ExerciseStatus,
    pub difficulty: Difficulty,
    pub arrangement: Vec<Fragment>,
    pub available: Vec<Fragment>,
    pub score: ScoreState,
    pub time_remaining: u32,
    pub time_limit: u32,
    pub total_count: usize,
    /// Length of the leading run of the arrangement that matches the solution
    pub correct_prefix_len: usize,
}

impl ExerciseSnapshot {
    pub fn clear(&mut self) {
        self.episode = 0;
        self.revision = 0;
        self.status = ExerciseStatus::Waiting;
        self.difficulty = Difficulty::default();
        self.arrangement.clear();
        self.available.clear();
        self.score = ScoreState::new();
        self.time_remaining = 0;
        self.time_limit = 0;
        self.total_count = 0;
        self.correct_prefix_len = 0;
    }

    pub fn placed_count(&self) -> usize {
        self.arrangement.len()
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.time_limit.saturating_sub(self.time_remaining)
    }

    pub fn is_solved(&self) -> bool {
        self.total_count > 0 && self.correct_prefix_len == self.total_count
    }

    /// True while drops are accepted
    pub fn playable(&self) -> bool {
        self.status == ExerciseStatus::Active
    }

    /// Ids of the arrangement, in order
    pub fn arrangement_ids(&self) -> Vec<&str> {
        self.arrangement.iter().map(|f| f.id.as_str()).collect()
    }

    /// Ids of the available pool, in order
    pub fn available_ids(&self) -> Vec<&str> {
        self.available.iter().map(|f| f.id.as_str()).collect()
    }
}

impl Default for ExerciseSnapshot {
    fn default() -> Self {
        Self {
            episode: 0,
            revision: 0,
            status: ExerciseStatus::Waiting,
            difficulty: Difficulty::default(),
            arrangement: Vec::new(),
            available: Vec::new(),
            score: ScoreState::new(),
            time_remaining: 0,
            time_limit: 0,
            total_count: 0,
            correct_prefix_len: 0,
        }
    }
}
