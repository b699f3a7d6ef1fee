//! Insertion index resolution for drops
//!
//! The presentation layer reports where each placed fragment is drawn (its vertical
//! center) and where the pointer was released. Nothing here knows about pixels, DOM nodes
//! or terminals; a coordinate is just an `f64` on the same axis for both inputs.

/// Vertical center of one placed fragment, as reported by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedPosition {
    /// Index of the fragment in the arrangement
    pub index: usize,
    pub center_y: f64,
}

impl PlacedPosition {
    pub fn new(index: usize, center_y: f64) -> Self {
        Self { index, center_y }
    }
}

/// Geometry captured at the moment a fragment is dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerContext {
    pub pointer_y: f64,
    /// Positions of the placed fragments, in any order
    pub positions: Vec<PlacedPosition>,
}

impl PointerContext {
    pub fn new(pointer_y: f64, positions: Vec<PlacedPosition>) -> Self {
        Self {
            pointer_y,
            positions,
        }
    }

    /// Build positions for a uniform vertical list: fragment `i` centered at
    /// `top + row_height * (i + 0.5)`.
    pub fn uniform_rows(pointer_y: f64, placed: usize, top: f64, row_height: f64) -> Self {
        let positions = (0..placed)
            .map(|i| PlacedPosition::new(i, top + row_height * (i as f64 + 0.5)))
            .collect();
        Self::new(pointer_y, positions)
    }

    /// Resolve the insertion index for this context
    pub fn resolve(&self) -> usize {
        resolve_insertion_index(&self.positions, self.pointer_y)
    }
}

/// Compute where a dropped fragment goes among the placed fragments
///
/// Returns an index in `0..=positions.len()`:
/// - no placed fragments: 0
/// - otherwise the nearest center wins (first one on ties); a pointer above it inserts
///   before it, anything else inserts after it
///
/// # Examples
///
/// ```
/// use code_arrange_core::{resolve_insertion_index, PlacedPosition};
///
/// let positions = [PlacedPosition::new(0, 10.0), PlacedPosition::new(1, 30.0)];
/// assert_eq!(resolve_insertion_index(&positions, 5.0), 0);
/// assert_eq!(resolve_insertion_index(&positions, 12.0), 1);
/// assert_eq!(resolve_insertion_index(&positions, 29.0), 1);
/// assert_eq!(resolve_insertion_index(&positions, 90.0), 2);
/// assert_eq!(resolve_insertion_index(&[], 90.0), 0);
/// ```
pub fn resolve_insertion_index(positions: &[PlacedPosition], pointer_y: f64) -> usize {
    let mut nearest: Option<(PlacedPosition, f64)> = None;
    for &position in positions {
        let distance = (position.center_y - pointer_y).abs();
        match nearest {
            // Strictly closer only, so the first of equal distances is kept.
            Some((_, best)) if distance >= best => {}
            _ => nearest = Some((position, distance)),
        }
    }

    let Some((closest, _)) = nearest else {
        return 0;
    };

    let index = if pointer_y < closest.center_y {
        closest.index
    } else {
        closest.index.saturating_add(1)
    };
    index.min(positions.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(centers: &[f64]) -> Vec<PlacedPosition> {
        centers
            .iter()
            .enumerate()
            .map(|(i, &y)| PlacedPosition::new(i, y))
            .collect()
    }

    #[test]
    fn test_empty_arrangement() {
        assert_eq!(resolve_insertion_index(&[], -100.0), 0);
        assert_eq!(resolve_insertion_index(&[], 100.0), 0);
    }

    #[test]
    fn test_above_and_below_single() {
        let positions = rows(&[50.0]);
        assert_eq!(resolve_insertion_index(&positions, 10.0), 0);
        assert_eq!(resolve_insertion_index(&positions, 90.0), 1);
    }

    #[test]
    fn test_exactly_on_center_inserts_after() {
        let positions = rows(&[50.0, 100.0]);
        assert_eq!(resolve_insertion_index(&positions, 50.0), 1);
        assert_eq!(resolve_insertion_index(&positions, 100.0), 2);
    }

    #[test]
    fn test_nearest_center_wins() {
        let positions = rows(&[20.0, 60.0, 100.0]);
        assert_eq!(resolve_insertion_index(&positions, 55.0), 1);
        assert_eq!(resolve_insertion_index(&positions, 65.0), 2);
        assert_eq!(resolve_insertion_index(&positions, 95.0), 2);
        assert_eq!(resolve_insertion_index(&positions, 400.0), 3);
    }

    #[test]
    fn test_tie_uses_first_in_iteration_order() {
        // 40 is equidistant from 20 and 60; the first (index 0) is chosen, pointer below it.
        let positions = rows(&[20.0, 60.0]);
        assert_eq!(resolve_insertion_index(&positions, 40.0), 1);

        // Same geometry reported in reverse order: index 1 is seen first, pointer above it.
        let reversed = vec![PlacedPosition::new(1, 60.0), PlacedPosition::new(0, 20.0)];
        assert_eq!(resolve_insertion_index(&reversed, 40.0), 1);
    }

    #[test]
    fn test_unordered_positions() {
        let positions = vec![
            PlacedPosition::new(2, 100.0),
            PlacedPosition::new(0, 20.0),
            PlacedPosition::new(1, 60.0),
        ];
        assert_eq!(resolve_insertion_index(&positions, 15.0), 0);
        assert_eq!(resolve_insertion_index(&positions, 70.0), 2);
    }

    #[test]
    fn test_result_never_exceeds_placed_count() {
        // A stale index from the presentation layer cannot push past the end.
        let positions = vec![PlacedPosition::new(7, 10.0)];
        assert_eq!(resolve_insertion_index(&positions, 20.0), 1);
    }

    #[test]
    fn test_max_index_saturates() {
        let positions = vec![PlacedPosition::new(usize::MAX, 10.0)];
        assert_eq!(resolve_insertion_index(&positions, 20.0), 1);
        assert_eq!(resolve_insertion_index(&positions, 5.0), 1);
    }

    #[test]
    fn test_uniform_rows() {
        let ctx = PointerContext::uniform_rows(25.0, 3, 0.0, 20.0);
        assert_eq!(ctx.positions[0].center_y, 10.0);
        assert_eq!(ctx.positions[2].center_y, 50.0);
        assert_eq!(ctx.resolve(), 1);
    }
}
