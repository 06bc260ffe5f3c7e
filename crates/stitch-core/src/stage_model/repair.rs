//! Invalid-edge removal and row/column median repair (spec section 4.2.4).

use std::collections::HashMap;

use tracing::warn;

use crate::model::{Direction, Grid};

use super::filter::median_of;

/// Group key for a tile's edge on `axis`: the row for Vertical (north edges
/// line up along a row), the column for Horizontal (west edges line up along
/// a column).
fn group_key(axis: Direction, r: usize, c: usize) -> usize {
    match axis {
        Direction::Vertical => r,
        Direction::Horizontal => c,
    }
}

/// Step 1: mark edges invalid (NaN NCC) whose NCC is below threshold or whose
/// (x, y) falls outside `median +/- repeatability` for their row/column.
/// `valid` is the bounds/threshold/Tukey-IQR-filtered edge set from
/// [`super::filter::valid_edges`] -- the per-row/col medians are taken over
/// that set, not every finite-NCC edge, so an edge the filter already
/// rejected can't still skew which of its neighbors get invalidated here.
pub(super) fn remove_invalid(grid: &mut Grid, axis: Direction, valid: &[(usize, usize)], repeatability: f32, threshold: f32) {
    let mut groups: HashMap<usize, Vec<(f32, f32)>> = HashMap::new();
    for &(r, c) in valid {
        let Some(tile) = grid.get(r, c) else { continue };
        let Some(peak) = tile.peak(axis) else { continue };
        groups
            .entry(group_key(axis, r, c))
            .or_default()
            .push((peak.x as f32, peak.y as f32));
    }

    let medians: HashMap<usize, (f32, f32)> = groups
        .into_iter()
        .map(|(k, vals)| {
            let xs: Vec<f32> = vals.iter().map(|v| v.0).collect();
            let ys: Vec<f32> = vals.iter().map(|v| v.1).collect();
            (k, (median_of(&xs), median_of(&ys)))
        })
        .collect();

    for (r, c) in grid.iter_coords() {
        let key = group_key(axis, r, c);
        let Some(&(mx, my)) = medians.get(&key) else { continue };
        let Some(tile) = grid.get_mut(r, c) else { continue };
        let Some(mut peak) = tile.peak(axis) else { continue };
        if !peak.ncc.is_finite() {
            continue;
        }
        let out_of_band = (peak.x as f32 - mx).abs() > repeatability || (peak.y as f32 - my).abs() > repeatability;
        if peak.ncc < threshold || out_of_band {
            peak.ncc = f32::NAN;
            tile.set_peak(axis, peak);
        }
    }
}

/// Step 2: recompute per-row/column medians over *all* edges on this axis
/// (rows with no north edge, or columns with no west edge, are structurally
/// skipped -- they can never hold one) and overwrite NaN-NCC edges' (x, y)
/// with that median. Groups with no finite median are logged as missing.
pub(super) fn repair_with_medians(grid: &mut Grid, axis: Direction) {
    let mut groups: HashMap<usize, Vec<(f32, f32)>> = HashMap::new();
    for (r, c) in grid.iter_coords() {
        let Some(tile) = grid.get(r, c) else { continue };
        let Some(peak) = tile.peak(axis) else { continue };
        groups
            .entry(group_key(axis, r, c))
            .or_default()
            .push((peak.x as f32, peak.y as f32));
    }

    let medians: HashMap<usize, (f32, f32)> = groups
        .into_iter()
        .map(|(k, vals)| {
            let xs: Vec<f32> = vals.iter().map(|v| v.0).collect();
            let ys: Vec<f32> = vals.iter().map(|v| v.1).collect();
            (k, (median_of(&xs), median_of(&ys)))
        })
        .collect();

    for (r, c) in grid.iter_coords() {
        let key = group_key(axis, r, c);
        let Some(tile) = grid.get_mut(r, c) else { continue };
        let Some(mut peak) = tile.peak(axis) else { continue };
        if peak.ncc.is_finite() {
            continue;
        }
        match medians.get(&key) {
            Some(&(mx, my)) if mx.is_finite() && my.is_finite() => {
                peak.x = mx.round() as i32;
                peak.y = my.round() as i32;
                tile.set_peak(axis, peak);
            }
            _ => {
                warn!(axis = %axis, group = key, "no finite median to repair edge, deferring to backfill");
            }
        }
    }
}

/// Step 3: backfill any edge still carrying a NaN NCC with the global
/// direction-of-travel estimate (median of valid primaries, or the
/// overlap-derived estimate if none remain), orthogonal component zeroed.
pub(super) fn backfill(grid: &mut Grid, axis: Direction, overlap: f32, dim: f32) {
    let valid_primaries: Vec<f32> = grid
        .iter()
        .filter_map(|t| t.peak(axis))
        .filter(|p| p.ncc.is_finite())
        .map(|p| p.primary(axis) as f32)
        .collect();

    let estimate = if valid_primaries.is_empty() {
        dim * (1.0 - overlap / 100.0)
    } else {
        median_of(&valid_primaries)
    };

    for (r, c) in grid.iter_coords() {
        let Some(tile) = grid.get_mut(r, c) else { continue };
        let Some(mut peak) = tile.peak(axis) else { continue };
        if peak.ncc.is_finite() {
            continue;
        }
        peak.set_primary(axis, estimate.round() as i32);
        peak.set_orthogonal(axis, 0);
        tile.set_peak(axis, peak);
    }
}
