//! Block set module - split source code into fragments and scramble them
//!
//! A [`Fragment`] is one non-blank source line. Its id and original index never change
//! for the lifetime of an exercise; the canonical order of ids is the solution.

use tracing::trace;

use crate::error::{ExerciseError, Result};
use crate::rng::{shuffle_in_place, RandomSource};
use crate::types::SHUFFLE_MAX_ATTEMPTS;

/// One line of the source program
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    pub id: String,
    /// Line text without its leading indentation or trailing whitespace
    pub content: String,
    /// Count of leading whitespace characters (a tab counts as one)
    pub indentation_level: usize,
    /// Position in the source once blank lines are dropped
    pub original_index: usize,
}

impl Fragment {
    /// Stable id for the fragment at `original_index`
    pub fn id_for(original_index: usize) -> String {
        format!("block-{}", original_index)
    }
}

/// Split source code into ordered fragments
///
/// Blank and whitespace-only lines are discarded; the remaining lines are numbered in
/// source order.
///
/// # Examples
///
/// ```
/// use code_arrange_core::build_fragments;
///
/// let fragments = build_fragments("fn main() {\n\n    run();\n}\n").unwrap();
/// assert_eq!(fragments.len(), 3);
/// assert_eq!(fragments[1].content, "run();");
/// assert_eq!(fragments[1].indentation_level, 4);
/// assert_eq!(fragments[2].original_index, 2);
/// ```
pub fn build_fragments(source_code: &str) -> Result<Vec<Fragment>> {
    let fragments: Vec<Fragment> = source_code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(original_index, line)| {
            let indentation_level = line.chars().take_while(|c| c.is_whitespace()).count();
            Fragment {
                id: Fragment::id_for(original_index),
                content: line.trim().to_string(),
                indentation_level,
                original_index,
            }
        })
        .collect();

    if fragments.is_empty() {
        return Err(ExerciseError::EmptySource);
    }

    trace!(count = fragments.len(), "built fragments");
    Ok(fragments)
}

/// Produce a shuffled copy of `fragments`
///
/// Uses Fisher-Yates, so every permutation is reachable. For two or more fragments the
/// result is never the input order: identity permutations are redrawn, and if the source
/// keeps producing them the input is rotated by one instead.
pub fn shuffle<R: RandomSource + ?Sized>(rng: &mut R, fragments: &[Fragment]) -> Vec<Fragment> {
    let mut shuffled = fragments.to_vec();
    if shuffled.len() < 2 {
        return shuffled;
    }

    for attempt in 0..SHUFFLE_MAX_ATTEMPTS {
        shuffle_in_place(rng, &mut shuffled);
        if !same_order(&shuffled, fragments) {
            trace!(attempt, "shuffled fragments");
            return shuffled;
        }
    }

    shuffled.rotate_left(1);
    shuffled
}

fn same_order(a: &[Fragment], b: &[Fragment]) -> bool {
    a.iter().map(|f| &f.id).eq(b.iter().map(|f| &f.id))
}
