//! Edge validity filtering: overlap/threshold bounds followed by a Tukey
//! 1.5*IQR pass using the median-split quartile definition (kept for parity
//! with the reference implementation rather than the conventional
//! linear-interpolation quartiles).

use crate::model::{Direction, Grid};

pub(super) struct Bounds {
    pub t_min: f32,
    pub t_max: f32,
    pub ortho_err: f32,
}

pub(super) fn bounds(overlap: f32, uncertainty: f32, dim: f32) -> Bounds {
    Bounds {
        t_min: dim * (1.0 - (overlap + uncertainty) / 100.0),
        t_max: dim * (1.0 - (overlap - uncertainty) / 100.0),
        ortho_err: dim * uncertainty / 100.0,
    }
}

/// Coordinates of edges on `axis` that pass the NCC threshold, the
/// overlap-derived primary/orthogonal bounds, and the two-pass IQR filter.
pub(super) fn valid_edges(
    grid: &Grid,
    axis: Direction,
    bounds: &Bounds,
    valid_correlation_threshold: f32,
) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(usize, usize, f32, f32)> = Vec::new(); // r, c, x, y
    for (r, c) in grid.iter_coords() {
        let Some(tile) = grid.get(r, c) else { continue };
        let Some(peak) = tile.peak(axis) else { continue };
        if !peak.ncc.is_finite() || peak.ncc < valid_correlation_threshold {
            continue;
        }
        let primary = peak.primary(axis) as f32;
        let ortho = peak.orthogonal(axis) as f32;
        if primary < bounds.t_min || primary > bounds.t_max {
            continue;
        }
        if ortho < -bounds.ortho_err || ortho > bounds.ortho_err {
            continue;
        }
        candidates.push((r, c, peak.x as f32, peak.y as f32));
    }

    let y_vals: Vec<f32> = candidates.iter().map(|c| c.3).collect();
    let y_keep = tukey_keep_mask(&y_vals);
    let after_y: Vec<(usize, usize, f32, f32)> = candidates
        .into_iter()
        .zip(y_keep)
        .filter(|(_, keep)| *keep)
        .map(|(c, _)| c)
        .collect();

    let x_vals: Vec<f32> = after_y.iter().map(|c| c.2).collect();
    let x_keep = tukey_keep_mask(&x_vals);
    after_y
        .into_iter()
        .zip(x_keep)
        .filter(|(_, keep)| *keep)
        .map(|(c, _)| (c.0, c.1))
        .collect()
}

pub(super) fn median_of(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n == 0 {
        return f32::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Median-split quartiles: the median of the strictly-less half is Q1, the
/// median of the strictly-greater half is Q3. `None` if fewer than 3 samples
/// land in either half (filtering is then skipped).
fn median_split_quartiles(sorted: &[f32]) -> Option<(f32, f32)> {
    let median = median_of(sorted);
    let lower: Vec<f32> = sorted.iter().copied().filter(|&v| v < median).collect();
    let upper: Vec<f32> = sorted.iter().copied().filter(|&v| v > median).collect();
    if lower.len() < 3 || upper.len() < 3 {
        return None;
    }
    Some((median_of(&lower), median_of(&upper)))
}

fn tukey_keep_mask(values: &[f32]) -> Vec<bool> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    match median_split_quartiles(&sorted) {
        None => vec![true; values.len()],
        Some((q1, q3)) => {
            let iqr = q3 - q1;
            let lo = q1 - 1.5 * iqr;
            let hi = q3 + 1.5 * iqr;
            values.iter().map(|&v| v >= lo && v <= hi).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_everything_with_fewer_than_three_per_half() {
        let mask = tukey_keep_mask(&[1.0, 2.0, 3.0]);
        assert_eq!(mask, vec![true, true, true]);
    }

    #[test]
    fn rejects_a_clear_outlier() {
        let mut values: Vec<f32> = (0..20).map(|i| 100.0 + i as f32).collect();
        values.push(5000.0);
        let mask = tukey_keep_mask(&values);
        assert!(!mask.last().unwrap());
        assert!(mask[..20].iter().all(|&k| k));
    }
}
