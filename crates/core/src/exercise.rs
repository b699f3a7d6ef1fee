//! Exercise state module - owns the lifecycle of one code-ordering exercise
//!
//! This module ties together the block set, insertion resolution and scoring. All
//! mutation goes through the operations on [`Exercise`]; each returns an immutable
//! [`ExerciseSnapshot`] and notifies observers. A rejected operation returns an error and
//! leaves the exercise untouched.
//!
//! The core never schedules anything. A host clock calls [`Exercise::tick`] while the
//! exercise is active, and callers serialize operations on one instance (it takes
//! `&mut self`, so the borrow checker enforces that within a process).

use std::fmt;
use std::hash::Hasher;
use std::sync::mpsc;

use tracing::debug;

use crate::blocks::{build_fragments, shuffle, Fragment};
use crate::error::{ExerciseError, Result};
use crate::insertion::PointerContext;
use crate::observer::ExerciseObserver;
use crate::rng::{RandomSource, SimpleRng};
use crate::scoring::{
    apply_placement, apply_time_bonus, is_correct_placement, PlacementOutcome, ScoreState,
    ScoringRules,
};
use crate::snapshot::ExerciseSnapshot;
use crate::types::{Difficulty, ExerciseCommand, ExerciseStatus, DEFAULT_TIME_LIMIT_SECS};

/// Construction inputs for an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseConfig {
    pub time_limit_secs: u32,
    pub difficulty: Difficulty,
    pub seed: u32,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            difficulty: Difficulty::default(),
            seed: 1,
        }
    }
}

/// Create a `waiting` exercise seeded from the source text
///
/// The same source always shuffles the same way; use [`Exercise::with_config`] to pick
/// a seed.
pub fn create_exercise(
    source_code: &str,
    time_limit: u32,
    difficulty: Difficulty,
) -> Result<Exercise> {
    let config = ExerciseConfig {
        time_limit_secs: time_limit,
        difficulty,
        seed: source_seed(source_code),
    };
    Exercise::with_config(source_code, &config)
}

/// Stable FNV-1a fold of the source, truncated to a seed
fn source_seed(source_code: &str) -> u32 {
    struct Fnv1a(u64);

    impl Hasher for Fnv1a {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 ^= b as u64;
                self.0 = self.0.wrapping_mul(0x100000001b3);
            }
        }
    }

    let mut hasher = Fnv1a(0xcbf29ce484222325);
    hasher.write(source_code.as_bytes());
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}

/// Where a fragment currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Available(usize),
    Placed(usize),
}

/// One code-ordering exercise
pub struct Exercise<R: RandomSource = SimpleRng> {
    /// Canonical order; doubles as the solution
    fragments: Vec<Fragment>,
    available: Vec<Fragment>,
    arrangement: Vec<Fragment>,
    score: ScoreState,
    rules: ScoringRules,
    difficulty: Difficulty,
    status: ExerciseStatus,
    time_limit: u32,
    time_remaining: u32,
    episode: u32,
    revision: u64,
    rng: R,
    observers: Vec<Box<dyn ExerciseObserver>>,
}

impl Exercise<SimpleRng> {
    /// Create a `waiting` exercise from a config
    pub fn with_config(source_code: &str, config: &ExerciseConfig) -> Result<Self> {
        Self::with_rng(
            source_code,
            config.time_limit_secs,
            config.difficulty,
            SimpleRng::new(config.seed),
        )
    }
}

impl<R: RandomSource> Exercise<R> {
    /// Create a `waiting` exercise shuffled by `rng`
    pub fn with_rng(
        source_code: &str,
        time_limit: u32,
        difficulty: Difficulty,
        mut rng: R,
    ) -> Result<Self> {
        if time_limit == 0 {
            return Err(ExerciseError::InvalidTimeLimit);
        }
        let fragments = build_fragments(source_code)?;
        let available = shuffle(&mut rng, &fragments);

        debug!(
            fragments = fragments.len(),
            time_limit,
            difficulty = difficulty.as_str(),
            "exercise created"
        );

        Ok(Self {
            fragments,
            available,
            arrangement: Vec::new(),
            score: ScoreState::new(),
            rules: ScoringRules::for_difficulty(difficulty),
            difficulty,
            status: ExerciseStatus::Waiting,
            time_limit,
            time_remaining: time_limit,
            episode: 0,
            revision: 0,
            rng,
            observers: Vec::new(),
        })
    }

    /// Replace the scoring rules (applies to later placements)
    pub fn with_rules(mut self, rules: ScoringRules) -> Self {
        self.rules = rules;
        self
    }

    /// Register an observer for future state changes
    pub fn subscribe<O: ExerciseObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    /// Register a channel observer and return its receiving end
    pub fn subscribe_channel(&mut self) -> mpsc::Receiver<ExerciseSnapshot> {
        let (tx, rx) = mpsc::channel();
        self.subscribe(tx);
        rx
    }

    pub fn status(&self) -> ExerciseStatus {
        self.status
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn arrangement(&self) -> &[Fragment] {
        &self.arrangement
    }

    pub fn available(&self) -> &[Fragment] {
        &self.available
    }

    /// Fragments in solution order
    pub fn solution(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot_into(&self, out: &mut ExerciseSnapshot) {
        out.episode = self.episode;
        out.revision = self.revision;
        out.status = self.status;
        out.difficulty = self.difficulty;
        out.arrangement.clone_from(&self.arrangement);
        out.available.clone_from(&self.available);
        out.score.clone_from(&self.score);
        out.time_remaining = self.time_remaining;
        out.time_limit = self.time_limit;
        out.total_count = self.fragments.len();
        out.correct_prefix_len = self.correct_prefix_len();
    }

    pub fn snapshot(&self) -> ExerciseSnapshot {
        let mut s = ExerciseSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    /// Start the timer
    pub fn start(&mut self) -> Result<ExerciseSnapshot> {
        self.require(ExerciseCommand::Start, &[ExerciseStatus::Waiting])?;
        self.time_remaining = self.time_limit;
        self.transition(ExerciseStatus::Active);
        Ok(self.commit())
    }

    /// Freeze the timer
    pub fn pause(&mut self) -> Result<ExerciseSnapshot> {
        self.require(ExerciseCommand::Pause, &[ExerciseStatus::Active])?;
        self.transition(ExerciseStatus::Paused);
        Ok(self.commit())
    }

    /// Continue from the frozen timer value
    pub fn resume(&mut self) -> Result<ExerciseSnapshot> {
        self.require(ExerciseCommand::Resume, &[ExerciseStatus::Paused])?;
        self.transition(ExerciseStatus::Active);
        Ok(self.commit())
    }

    /// Drop a fragment where the pointer was released
    ///
    /// `pointer.positions` describe the arrangement as drawn during the drag, which
    /// still includes the fragment when it is being moved within the arrangement.
    pub fn drop(&mut self, fragment_id: &str, pointer: &PointerContext) -> Result<ExerciseSnapshot> {
        self.require(ExerciseCommand::Drop, &[ExerciseStatus::Active])?;
        let slot = self.locate(fragment_id)?;

        let mut index = pointer.resolve();
        if let Slot::Placed(from) = slot {
            // Removing the fragment first shifts everything after it up by one.
            if from < index {
                index -= 1;
            }
        }
        self.place(slot, index)
    }

    /// Drop a fragment at an explicit final index (clamped to the arrangement length)
    pub fn drop_at(&mut self, fragment_id: &str, index: usize) -> Result<ExerciseSnapshot> {
        self.require(ExerciseCommand::Drop, &[ExerciseStatus::Active])?;
        let slot = self.locate(fragment_id)?;
        self.place(slot, index)
    }

    /// Move a placed fragment back to the end of the available pool
    pub fn withdraw(&mut self, fragment_id: &str) -> Result<ExerciseSnapshot> {
        self.require(ExerciseCommand::Withdraw, &[ExerciseStatus::Active])?;
        let from = match self.locate(fragment_id)? {
            Slot::Placed(from) => from,
            Slot::Available(_) => {
                return Err(ExerciseError::UnknownFragment {
                    id: fragment_id.to_string(),
                })
            }
        };

        let fragment = self.arrangement.remove(from);
        debug!(id = %fragment.id, from, "fragment withdrawn");
        self.available.push(fragment);
        Ok(self.commit())
    }

    /// Advance the timer by `elapsed_secs`
    ///
    /// Reaching zero fails the exercise. A tick that arrives after completion is rejected,
    /// so whichever of the completing drop and the expiring tick is applied first wins.
    pub fn tick(&mut self, elapsed_secs: u32) -> Result<ExerciseSnapshot> {
        self.require(ExerciseCommand::Tick, &[ExerciseStatus::Active])?;
        if elapsed_secs == 0 {
            return Ok(self.snapshot());
        }

        self.time_remaining = self.time_remaining.saturating_sub(elapsed_secs);
        if self.time_remaining == 0 {
            self.transition(ExerciseStatus::Failed);
        }
        Ok(self.commit())
    }

    /// Start over with a freshly shuffled pool
    ///
    /// Valid from every state except `aborted`.
    pub fn reset(&mut self) -> Result<ExerciseSnapshot> {
        if self.status.is_terminal() {
            return Err(self.invalid(ExerciseCommand::Reset));
        }

        self.available = shuffle(&mut self.rng, &self.fragments);
        self.arrangement.clear();
        self.score = ScoreState::new();
        self.time_remaining = self.time_limit;
        self.episode = self.episode.wrapping_add(1);
        self.transition(ExerciseStatus::Waiting);
        Ok(self.commit())
    }

    /// Discard the exercise; nothing is accepted afterwards
    pub fn abort(&mut self) -> Result<ExerciseSnapshot> {
        self.require(
            ExerciseCommand::Abort,
            &[ExerciseStatus::Active, ExerciseStatus::Paused],
        )?;
        self.transition(ExerciseStatus::Aborted);
        Ok(self.commit())
    }

    fn require(&self, operation: ExerciseCommand, allowed: &[ExerciseStatus]) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: ExerciseCommand) -> ExerciseError {
        debug!(
            operation = operation.as_str(),
            status = self.status.as_str(),
            "operation rejected"
        );
        ExerciseError::InvalidTransition {
            operation,
            status: self.status,
        }
    }

    fn locate(&self, fragment_id: &str) -> Result<Slot> {
        if let Some(i) = self.available.iter().position(|f| f.id == fragment_id) {
            return Ok(Slot::Available(i));
        }
        if let Some(i) = self.arrangement.iter().position(|f| f.id == fragment_id) {
            return Ok(Slot::Placed(i));
        }
        Err(ExerciseError::UnknownFragment {
            id: fragment_id.to_string(),
        })
    }

    /// Move a located fragment into the arrangement, score it, and detect completion
    fn place(&mut self, slot: Slot, index: usize) -> Result<ExerciseSnapshot> {
        if let Slot::Placed(from) = slot {
            // Dropping a fragment back onto its own slot changes nothing.
            if index.min(self.arrangement.len() - 1) == from {
                return Ok(self.snapshot());
            }
        }

        let fragment = match slot {
            Slot::Available(i) => self.available.remove(i),
            Slot::Placed(i) => self.arrangement.remove(i),
        };
        let index = index.min(self.arrangement.len());
        let id = fragment.id.clone();
        self.arrangement.insert(index, fragment);

        let correct = is_correct_placement(
            &self.arrangement_ids(),
            &self.solution_ids(),
            index,
        );
        let outcome = PlacementOutcome {
            correct,
            elapsed_secs: self.elapsed_secs(),
        };
        let score = std::mem::take(&mut self.score);
        self.score = apply_placement(&self.rules, score, outcome);
        debug!(%id, index, correct, score = self.score.score, "fragment placed");

        if self.is_solved() {
            let score = std::mem::take(&mut self.score);
            self.score = apply_time_bonus(&self.rules, score, self.time_remaining, self.time_limit);
            self.transition(ExerciseStatus::Completed);
        }
        Ok(self.commit())
    }

    fn transition(&mut self, next: ExerciseStatus) {
        debug!(
            from = self.status.as_str(),
            to = next.as_str(),
            episode = self.episode,
            time_remaining = self.time_remaining,
            "exercise transition"
        );
        self.status = next;
    }

    /// Bump the revision, notify observers, and hand back the new snapshot
    fn commit(&mut self) -> ExerciseSnapshot {
        self.revision = self.revision.wrapping_add(1);
        let snapshot = self.snapshot();
        for observer in self.observers.iter_mut() {
            observer.on_snapshot(&snapshot);
        }
        snapshot
    }

    fn elapsed_secs(&self) -> u32 {
        self.time_limit.saturating_sub(self.time_remaining)
    }

    fn arrangement_ids(&self) -> Vec<&str> {
        self.arrangement.iter().map(|f| f.id.as_str()).collect()
    }

    fn solution_ids(&self) -> Vec<&str> {
        self.fragments.iter().map(|f| f.id.as_str()).collect()
    }

    fn correct_prefix_len(&self) -> usize {
        self.arrangement
            .iter()
            .zip(self.fragments.iter())
            .take_while(|(placed, expected)| placed.id == expected.id)
            .count()
    }

    fn is_solved(&self) -> bool {
        self.arrangement.len() == self.fragments.len()
            && self.correct_prefix_len() == self.fragments.len()
    }
}

impl<R: RandomSource> fmt::Debug for Exercise<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exercise")
            .field("status", &self.status)
            .field("difficulty", &self.difficulty)
            .field("episode", &self.episode)
            .field("revision", &self.revision)
            .field("time_remaining", &self.time_remaining)
            .field("time_limit", &self.time_limit)
            .field("placed", &self.arrangement.len())
            .field("available", &self.available.len())
            .field("score", &self.score.score)
            .field("observers", &self.observers.len())
            .finish()
    }
}
