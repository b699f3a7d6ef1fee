//! Scoring module - placement points, streaks and combo multiplier
//!
//! All updates are pure: `(ScoreState, PlacementOutcome) -> ScoreState`. Replaying the
//! same outcomes over the same rules always yields the same state, and the score always
//! equals the sum of the feedback log.
//!
//! Multipliers are integer percentages (100 = 1.0x) so that arithmetic stays exact:
//! - correct placement: `base_points * multiplier_pct / 100`
//! - incorrect placement: `-incorrect_penalty`, never taking the score below zero
//! - every `streak_bonus_interval`-th consecutive correct placement adds a flat bonus
//! - completion adds `time_bonus_max * time_remaining / time_limit` once

use tracing::trace;

use crate::types::{
    Difficulty, FeedbackKind, BASE_POINTS, COMBO_BASE_PCT, COMBO_MAX_PCT, COMBO_STEP_PCT,
    INCORRECT_PENALTY, STREAK_BONUS_INTERVAL, STREAK_BONUS_POINTS, TIME_BONUS_MAX,
};

/// Tunable scoring parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringRules {
    pub base_points: u32,
    pub incorrect_penalty: u32,
    /// Multiplier growth per streak step beyond the first, in percent
    pub combo_step_pct: u32,
    /// Multiplier cap, in percent
    pub combo_max_pct: u32,
    /// 0 disables streak bonuses
    pub streak_bonus_interval: u32,
    pub streak_bonus_points: u32,
    pub time_bonus_max: u32,
}

impl ScoringRules {
    /// Preset rules for a difficulty
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let row = difficulty.index();
        Self {
            base_points: BASE_POINTS[row],
            incorrect_penalty: INCORRECT_PENALTY[row],
            combo_step_pct: COMBO_STEP_PCT,
            combo_max_pct: COMBO_MAX_PCT,
            streak_bonus_interval: STREAK_BONUS_INTERVAL,
            streak_bonus_points: STREAK_BONUS_POINTS[row],
            time_bonus_max: TIME_BONUS_MAX[row],
        }
    }

    /// Combo multiplier for a streak length, in percent
    ///
    /// 1.0x for streaks of 0 and 1, then `combo_step_pct` more per step, capped at
    /// `combo_max_pct`.
    ///
    /// # Examples
    ///
    /// ```
    /// use code_arrange_core::ScoringRules;
    ///
    /// let rules = ScoringRules::default();
    /// assert_eq!(rules.combo_multiplier_pct(0), 100);
    /// assert_eq!(rules.combo_multiplier_pct(1), 100);
    /// assert_eq!(rules.combo_multiplier_pct(3), 120);
    /// assert_eq!(rules.combo_multiplier_pct(50), 200);
    /// ```
    pub fn combo_multiplier_pct(&self, streak: u32) -> u32 {
        let steps = streak.saturating_sub(1);
        let cap = self.combo_max_pct.max(COMBO_BASE_PCT);
        COMBO_BASE_PCT
            .saturating_add(self.combo_step_pct.saturating_mul(steps))
            .min(cap)
    }

    /// Points for a correct placement at the given multiplier
    pub fn placement_points(&self, multiplier_pct: u32) -> u32 {
        self.base_points.saturating_mul(multiplier_pct) / 100
    }

    /// Completion bonus for the remaining time
    pub fn time_bonus(&self, time_remaining: u32, time_limit: u32) -> u32 {
        if time_limit == 0 {
            return 0;
        }
        let remaining = time_remaining.min(time_limit) as u64;
        (self.time_bonus_max as u64 * remaining / time_limit as u64) as u32
    }

    fn earns_streak_bonus(&self, streak: u32) -> bool {
        self.streak_bonus_interval > 0 && streak > 0 && streak % self.streak_bonus_interval == 0
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::for_difficulty(Difficulty::default())
    }
}

/// One scoring event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackEntry {
    pub kind: FeedbackKind,
    /// Score delta actually applied (negative for penalties)
    pub points: i64,
    /// Seconds since the exercise started
    pub elapsed_secs: u32,
    /// Position in the feedback log
    pub seq: u32,
}

/// Score, streak and combo state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreState {
    pub score: u32,
    pub streak_count: u32,
    pub combo_multiplier_pct: u32,
    pub max_combo_pct: u32,
    pub correct_placements: u32,
    pub incorrect_placements: u32,
    pub feedback_log: Vec<FeedbackEntry>,
}

impl ScoreState {
    pub fn new() -> Self {
        Self {
            score: 0,
            streak_count: 0,
            combo_multiplier_pct: COMBO_BASE_PCT,
            max_combo_pct: COMBO_BASE_PCT,
            correct_placements: 0,
            incorrect_placements: 0,
            feedback_log: Vec::new(),
        }
    }

    /// Current combo multiplier (1.0 = no combo)
    pub fn combo_multiplier(&self) -> f64 {
        self.combo_multiplier_pct as f64 / 100.0
    }

    /// Highest combo multiplier reached so far
    pub fn max_combo_reached(&self) -> f64 {
        self.max_combo_pct as f64 / 100.0
    }

    /// Most recent feedback entry
    pub fn last_feedback(&self) -> Option<&FeedbackEntry> {
        self.feedback_log.last()
    }

    /// True once a time bonus has been recorded
    pub fn has_time_bonus(&self) -> bool {
        self.feedback_log
            .iter()
            .any(|e| e.kind == FeedbackKind::TimeBonus)
    }

    fn push(&mut self, kind: FeedbackKind, points: i64, elapsed_secs: u32) {
        let seq = self.feedback_log.len() as u32;
        self.feedback_log.push(FeedbackEntry {
            kind,
            points,
            elapsed_secs,
            seq,
        });
    }

    fn credit(&mut self, kind: FeedbackKind, points: u32, elapsed_secs: u32) {
        self.score = self.score.saturating_add(points);
        self.push(kind, points as i64, elapsed_secs);
    }
}

impl Default for ScoreState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of judging one placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementOutcome {
    pub correct: bool,
    /// Seconds since the exercise started
    pub elapsed_secs: u32,
}

/// Judge a committed placement
///
/// `arrangement_ids` is the arrangement after insertion. The placement is correct when the
/// id at `index` matches the solution id at the same index.
pub fn is_correct_placement<A, S>(arrangement_ids: &[A], solution_ids: &[S], index: usize) -> bool
where
    A: AsRef<str>,
    S: AsRef<str>,
{
    match (arrangement_ids.get(index), solution_ids.get(index)) {
        (Some(placed), Some(expected)) => placed.as_ref() == expected.as_ref(),
        _ => false,
    }
}

/// Apply a placement outcome to the score state
pub fn apply_placement(
    rules: &ScoringRules,
    mut state: ScoreState,
    outcome: PlacementOutcome,
) -> ScoreState {
    if outcome.correct {
        state.streak_count = state.streak_count.saturating_add(1);
        state.correct_placements = state.correct_placements.saturating_add(1);
        state.combo_multiplier_pct = rules.combo_multiplier_pct(state.streak_count);
        state.max_combo_pct = state.max_combo_pct.max(state.combo_multiplier_pct);

        let points = rules.placement_points(state.combo_multiplier_pct);
        state.credit(FeedbackKind::Correct, points, outcome.elapsed_secs);

        if rules.earns_streak_bonus(state.streak_count) {
            state.credit(
                FeedbackKind::StreakBonus,
                rules.streak_bonus_points,
                outcome.elapsed_secs,
            );
        }
    } else {
        state.streak_count = 0;
        state.combo_multiplier_pct = COMBO_BASE_PCT;
        state.incorrect_placements = state.incorrect_placements.saturating_add(1);

        let applied = rules.incorrect_penalty.min(state.score);
        state.score -= applied;
        state.push(FeedbackKind::Incorrect, -(applied as i64), outcome.elapsed_secs);
    }

    trace!(
        correct = outcome.correct,
        score = state.score,
        streak = state.streak_count,
        combo_pct = state.combo_multiplier_pct,
        "placement scored"
    );
    state
}

/// Apply the one-time completion bonus
///
/// Does nothing if a time bonus was already recorded.
pub fn apply_time_bonus(
    rules: &ScoringRules,
    mut state: ScoreState,
    time_remaining: u32,
    time_limit: u32,
) -> ScoreState {
    if state.has_time_bonus() {
        return state;
    }
    let bonus = rules.time_bonus(time_remaining, time_limit);
    let elapsed_secs = time_limit.saturating_sub(time_remaining);
    state.credit(FeedbackKind::TimeBonus, bonus, elapsed_secs);
    trace!(bonus, score = state.score, "time bonus awarded");
    state
}
