//! Repeatability estimation (spec section 4.2.3): mechanical stage jitter,
//! in pixels, derived from the valid edges of one axis.

use crate::model::{Direction, Grid};

/// `R1`: half the peak-to-peak spread of the orthogonal component across
/// every valid edge on `axis`.
fn r1(grid: &Grid, axis: Direction, valid: &[(usize, usize)]) -> f32 {
    let orthos: Vec<f32> = valid
        .iter()
        .filter_map(|&(r, c)| grid.get(r, c).and_then(|t| t.peak(axis)))
        .map(|p| p.orthogonal(axis) as f32)
        .collect();
    spread(&orthos)
}

/// `R2`: the largest per-row (vertical) or per-column (horizontal) half
/// peak-to-peak spread of the primary component, over all groups holding at
/// least one valid edge.
fn r2(grid: &Grid, axis: Direction, valid: &[(usize, usize)]) -> f32 {
    let group_count = match axis {
        Direction::Vertical => grid.height(),
        Direction::Horizontal => grid.width(),
    };
    let mut worst = 0.0f32;
    for group in 0..group_count {
        let primaries: Vec<f32> = valid
            .iter()
            .filter(|&&(r, c)| match axis {
                Direction::Vertical => r == group,
                Direction::Horizontal => c == group,
            })
            .filter_map(|&(r, c)| grid.get(r, c).and_then(|t| t.peak(axis)))
            .map(|p| p.primary(axis) as f32)
            .collect();
        worst = worst.max(spread(&primaries));
    }
    worst
}

fn spread(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let max = values.iter().cloned().fold(f32::MIN, f32::max);
    let min = values.iter().cloned().fold(f32::MAX, f32::min);
    ((max - min) / 2.0).ceil()
}

/// `max(R1, R2)` over the given axis's valid edges, or `fallback` (the
/// user-supplied repeatability, or 0) when no valid edges exist.
pub(super) fn estimate(grid: &Grid, axis: Direction, valid: &[(usize, usize)], fallback: f32) -> f32 {
    if valid.is_empty() {
        return fallback;
    }
    r1(grid, axis, valid).max(r2(grid, axis, valid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_of_empty_is_zero() {
        assert_eq!(spread(&[]), 0.0);
    }

    #[test]
    fn spread_rounds_up() {
        assert_eq!(spread(&[0.0, 5.0]), 3.0);
    }
}
