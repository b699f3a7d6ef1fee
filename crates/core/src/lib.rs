//! Core exercise logic - pure, deterministic, and testable
//!
//! This crate contains the rules of the code-ordering exercise: a learner receives the
//! lines of a program in scrambled order and must rebuild the original order before the
//! timer runs out. It has **zero dependencies** on rendering, networking, or I/O:
//!
//! - **Deterministic**: the shuffle source is injected, so a seed replays an exercise
//! - **Testable**: scoring is a pure function of the previous score state
//! - **Portable**: any host (terminal, web bridge, test harness) drives it the same way
//!
//! # Module Structure
//!
//! - [`blocks`]: split source into fragments and shuffle them
//! - [`insertion`]: turn drop geometry into an insertion index
//! - [`scoring`]: points, streaks, combo multiplier and bonuses
//! - [`exercise`]: the lifecycle state machine that ties it together
//! - [`snapshot`]: immutable views handed to callers and observers
//! - [`observer`]: change notification
//! - [`rng`]: seedable randomness
//!
//! # Example
//!
//! ```
//! use code_arrange_core::{create_exercise, PointerContext};
//! use code_arrange_core::types::{Difficulty, ExerciseStatus};
//!
//! let mut exercise = create_exercise("let a = 1;\nlet b = a + 1;", 60, Difficulty::Easy).unwrap();
//! exercise.start().unwrap();
//!
//! // Nothing placed yet, so any pointer position inserts at 0.
//! exercise.drop("block-0", &PointerContext::new(0.0, Vec::new())).unwrap();
//! let snapshot = exercise.drop_at("block-1", 1).unwrap();
//!
//! assert_eq!(snapshot.status, ExerciseStatus::Completed);
//! assert!(snapshot.score.score > 0);
//! ```
//!
//! # Timing
//!
//! The exercise counts whole seconds. The host calls
//! [`Exercise::tick`](exercise::Exercise::tick) with the seconds elapsed since the last
//! call while the exercise is active; reaching zero fails it.

pub mod blocks;
pub mod error;
pub mod exercise;
pub mod insertion;
pub mod observer;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use code_arrange_types as types;

// Re-export commonly used types for convenience
pub use blocks::{build_fragments, shuffle, Fragment};
pub use error::{ExerciseError, Result};
pub use exercise::{create_exercise, Exercise, ExerciseConfig};
pub use insertion::{resolve_insertion_index, PlacedPosition, PointerContext};
pub use observer::{ExerciseObserver, SnapshotRecorder};
pub use rng::{shuffle_in_place, RandomSource, SimpleRng};
pub use scoring::{
    apply_placement, apply_time_bonus, is_correct_placement, FeedbackEntry, PlacementOutcome,
    ScoreState, ScoringRules,
};
pub use snapshot::ExerciseSnapshot;
