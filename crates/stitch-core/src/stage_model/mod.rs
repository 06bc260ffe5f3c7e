//! Stage model (SM): infers per-axis overlap and repeatability from the
//! phase-correlation engine's raw peaks, then filters and repairs them.

mod filter;
mod mle;
mod repair;
mod repeatability;

use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::consts::{
    DEFAULT_OVERLAP_UNCERTAINTY, DEFAULT_VALID_CORRELATION_THRESHOLD, REPEATABILITY_WARN_THRESHOLD,
};
use crate::error::{Result, StitchError};
use crate::model::{Direction, Grid};

/// Tunables for a stage-model build; CLI/config values feed in here unchanged.
#[derive(Clone, Debug)]
pub struct StageModelConfig {
    pub overlap_uncertainty: f32,
    pub valid_correlation_threshold: f32,
    pub horizontal_overlap: Option<f32>,
    pub vertical_overlap: Option<f32>,
    pub stage_repeatability: Option<f32>,
}

impl Default for StageModelConfig {
    fn default() -> Self {
        Self {
            overlap_uncertainty: DEFAULT_OVERLAP_UNCERTAINTY,
            valid_correlation_threshold: DEFAULT_VALID_CORRELATION_THRESHOLD,
            horizontal_overlap: None,
            vertical_overlap: None,
            stage_repeatability: None,
        }
    }
}

/// Inferred overlap and repeatability for one axis.
#[derive(Clone, Debug)]
pub struct AxisModel {
    pub inferred_overlap: f32,
    pub overlap: f32,
    pub repeatability: f32,
}

/// The full (vertical, horizontal) stage model plus the derived search radius.
#[derive(Clone, Debug)]
pub struct StageModel {
    pub vertical: AxisModel,
    pub horizontal: AxisModel,
    pub search_radius: i32,
}

impl StageModel {
    /// Build the stage model from a grid whose Peaks were just written by
    /// the phase-correlation engine, repairing the grid's Peaks in place.
    pub fn build(grid: &mut Grid, config: &StageModelConfig) -> Result<Self> {
        let (h, w) = grid.image_shape()?;

        let vertical = build_axis(grid, Direction::Vertical, h as f32, config)?;
        let horizontal = build_axis(grid, Direction::Horizontal, w as f32, config)?;

        let search_radius = (2.0 * vertical.repeatability.max(horizontal.repeatability) + 1.0) as i32;

        info!(
            vertical_overlap = vertical.overlap,
            horizontal_overlap = horizontal.overlap,
            vertical_repeatability = vertical.repeatability,
            horizontal_repeatability = horizontal.repeatability,
            search_radius,
            "stage model built"
        );

        Ok(Self {
            vertical,
            horizontal,
            search_radius,
        })
    }

    /// Write the grouped `key: value` statistics file (spec section 6).
    pub fn save_stats(&self, path: &Path) -> Result<()> {
        let mut out = std::fs::File::create(path)?;
        writeln!(out, "search_radius: {}", self.search_radius)?;
        writeln!(out)?;
        writeln!(out, "vertical_overlap: {}", self.vertical.overlap)?;
        writeln!(out, "vertical_overlap_inferred: {}", self.vertical.inferred_overlap)?;
        writeln!(out, "vertical_repeatability: {}", self.vertical.repeatability)?;
        writeln!(out)?;
        writeln!(out, "horizontal_overlap: {}", self.horizontal.overlap)?;
        writeln!(out, "horizontal_overlap_inferred: {}", self.horizontal.inferred_overlap)?;
        writeln!(out, "horizontal_repeatability: {}", self.horizontal.repeatability)?;
        Ok(())
    }
}

fn build_axis(grid: &mut Grid, axis: Direction, dim: f32, config: &StageModelConfig) -> Result<AxisModel> {
    let samples: Vec<f32> = grid
        .iter()
        .filter_map(|t| t.peak(axis))
        .map(|p| p.primary(axis) as f32)
        .filter(|&v| v > 1.0 && v < dim - 1.0)
        .collect();

    if samples.is_empty() {
        return Err(StitchError::NoTranslations { axis });
    }

    let inferred_mu = mle::infer_mu_percent(&samples, dim);
    let inferred_overlap = 100.0 - inferred_mu;
    if !inferred_overlap.is_finite() {
        return Err(StitchError::NonFiniteOverlap {
            axis,
            value: inferred_overlap,
        });
    }

    let override_overlap = match axis {
        Direction::Vertical => config.vertical_overlap,
        Direction::Horizontal => config.horizontal_overlap,
    };
    let overlap = override_overlap.unwrap_or(inferred_overlap);

    let bounds = filter::bounds(overlap, config.overlap_uncertainty, dim);
    let valid = filter::valid_edges(grid, axis, &bounds, config.valid_correlation_threshold);

    let estimated_repeatability = repeatability::estimate(grid, axis, &valid, config.stage_repeatability.unwrap_or(0.0));
    let repeatability = config.stage_repeatability.unwrap_or(estimated_repeatability);
    if repeatability > REPEATABILITY_WARN_THRESHOLD {
        warn!(axis = %axis, repeatability, "unusually large stage repeatability");
    }

    repair::remove_invalid(grid, axis, &valid, repeatability, config.valid_correlation_threshold);
    repair::repair_with_medians(grid, axis);
    repair::backfill(grid, axis, overlap, dim);

    Ok(AxisModel {
        inferred_overlap,
        overlap,
        repeatability,
    })
}
