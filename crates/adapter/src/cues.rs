//! Presentation cues derived from consecutive snapshots
//!
//! The core has no notion of animation or sound. A front end diffing two observations
//! would compute the same facts, so the adapter does it once and ships them along.

use serde::{Deserialize, Serialize};

use crate::core::ExerciseSnapshot;
use crate::types::{ExerciseStatus, COMBO_CUE_PCT, COMBO_MAX_PCT, STREAK_CUE_MIN};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cue {
    /// Multiplier climbed to the combo threshold or past it
    Combo { multiplier: f64 },
    /// Multiplier hit the cap
    MaxCombo { multiplier: f64 },
    Streak { count: u32 },
    Score { delta: i64 },
    Completed { score: u32 },
    Failed,
}

/// Cues for the change from `prev` to `next`
///
/// Without a previous snapshot, or across a reset, nothing is derived: a fresh episode
/// starts from zero and has nothing to celebrate yet.
pub fn derive_cues(prev: Option<&ExerciseSnapshot>, next: &ExerciseSnapshot) -> Vec<Cue> {
    let mut cues = Vec::new();
    let Some(prev) = prev else {
        return cues;
    };
    if prev.episode != next.episode {
        return cues;
    }

    let before = &prev.score;
    let after = &next.score;

    if before.combo_multiplier_pct < COMBO_CUE_PCT && after.combo_multiplier_pct >= COMBO_CUE_PCT {
        cues.push(Cue::Combo {
            multiplier: after.combo_multiplier(),
        });
    }
    if before.combo_multiplier_pct < COMBO_MAX_PCT && after.combo_multiplier_pct >= COMBO_MAX_PCT {
        cues.push(Cue::MaxCombo {
            multiplier: after.combo_multiplier(),
        });
    }
    if after.streak_count >= STREAK_CUE_MIN && after.streak_count > before.streak_count {
        cues.push(Cue::Streak {
            count: after.streak_count,
        });
    }

    let delta = after.score as i64 - before.score as i64;
    if delta > 0 {
        cues.push(Cue::Score { delta });
    }

    if prev.status != next.status {
        match next.status {
            ExerciseStatus::Completed => cues.push(Cue::Completed { score: after.score }),
            ExerciseStatus::Failed => cues.push(Cue::Failed),
            _ => {}
        }
    }
    cues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{create_exercise, Exercise};
    use crate::types::Difficulty;

    fn exercise(lines: usize) -> Exercise {
        let source: Vec<String> = (0..lines).map(|i| format!("line{}", i)).collect();
        create_exercise(&source.join("\n"), 60, Difficulty::Medium).unwrap()
    }

    #[test]
    fn test_no_previous_snapshot() {
        let ex = exercise(3);
        assert!(derive_cues(None, &ex.snapshot()).is_empty());
    }

    #[test]
    fn test_score_cue_on_correct_drop() {
        let mut ex = exercise(3);
        let started = ex.start().unwrap();
        let placed = ex.drop_at("block-0", 0).unwrap();
        assert_eq!(
            derive_cues(Some(&started), &placed),
            vec![Cue::Score { delta: 20 }]
        );
    }

    #[test]
    fn test_incorrect_drop_has_no_score_cue() {
        let mut ex = exercise(3);
        ex.start().unwrap();
        let before = ex.drop_at("block-0", 0).unwrap();
        let after = ex.drop_at("block-2", 1).unwrap();
        assert!(derive_cues(Some(&before), &after).is_empty());
    }

    #[test]
    fn test_combo_and_streak_at_third_correct() {
        let mut ex = exercise(6);
        ex.start().unwrap();
        ex.drop_at("block-0", 0).unwrap();
        let second = ex.drop_at("block-1", 1).unwrap();
        let third = ex.drop_at("block-2", 2).unwrap();
        let cues = derive_cues(Some(&second), &third);
        assert_eq!(
            cues,
            vec![
                Cue::Combo { multiplier: 1.2 },
                Cue::Streak { count: 3 },
                Cue::Score { delta: 24 },
            ]
        );

        // Fourth correct: streak cue again, combo threshold already crossed.
        let fourth = ex.drop_at("block-3", 3).unwrap();
        let cues = derive_cues(Some(&third), &fourth);
        assert_eq!(cues, vec![Cue::Streak { count: 4 }, Cue::Score { delta: 26 }]);
    }

    #[test]
    fn test_max_combo_when_cap_reached() {
        let mut ex = exercise(12);
        ex.start().unwrap();
        let mut prev = ex.snapshot();
        let mut saw_max = 0;
        for i in 0..12 {
            let next = ex.drop_at(&format!("block-{}", i), i).unwrap();
            if derive_cues(Some(&prev), &next)
                .iter()
                .any(|c| matches!(c, Cue::MaxCombo { .. }))
            {
                saw_max += 1;
                assert_eq!(next.score.streak_count, 11);
            }
            prev = next;
        }
        assert_eq!(saw_max, 1);
    }

    #[test]
    fn test_completed_cue() {
        let mut ex = exercise(2);
        ex.start().unwrap();
        let first = ex.drop_at("block-0", 0).unwrap();
        let done = ex.drop_at("block-1", 1).unwrap();
        let cues = derive_cues(Some(&first), &done);
        assert_eq!(
            cues.last(),
            Some(&Cue::Completed {
                score: done.score.score
            })
        );
    }

    #[test]
    fn test_failed_cue() {
        let mut ex = exercise(2);
        let started = ex.start().unwrap();
        let failed = ex.tick(60).unwrap();
        assert_eq!(derive_cues(Some(&started), &failed), vec![Cue::Failed]);
    }

    #[test]
    fn test_reset_suppresses_cues() {
        let mut ex = exercise(2);
        ex.start().unwrap();
        let before = ex.drop_at("block-0", 0).unwrap();
        let after = ex.reset().unwrap();
        assert!(derive_cues(Some(&before), &after).is_empty());
    }

    #[test]
    fn test_cue_json_tags() {
        let v = serde_json::to_value(Cue::MaxCombo { multiplier: 2.0 }).unwrap();
        assert_eq!(v["kind"], "max_combo");
        let v = serde_json::to_value(Cue::Failed).unwrap();
        assert_eq!(v["kind"], "failed");
    }
}
