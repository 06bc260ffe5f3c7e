use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_NUM_FFT_PEAKS, DEFAULT_NUM_HILL_CLIMBS, DEFAULT_OVERLAP_UNCERTAINTY,
    DEFAULT_VALID_CORRELATION_THRESHOLD,
};
use crate::io::{GridOrigin, NumberingPattern, PatternType};
use crate::refine::RefinementMethod;

/// Everything the orchestrator needs to stitch one tile grid. Mirrors the
/// CLI flag table; constructed directly from `clap` args or loaded from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub image_dirpath: PathBuf,
    pub output_dirpath: PathBuf,
    /// Allow reusing an existing output directory instead of erroring.
    #[serde(default)]
    pub overwrite_output: bool,

    pub grid_width: usize,
    pub grid_height: usize,

    #[serde(default)]
    pub start_row: usize,
    #[serde(default)]
    pub start_col: usize,
    #[serde(default)]
    pub start_tile: usize,

    pub filename_pattern: String,
    #[serde(default = "default_pattern_type")]
    pub filename_pattern_type: PatternType,
    #[serde(default = "default_grid_origin")]
    pub grid_origin: GridOrigin,
    #[serde(default = "default_numbering_pattern")]
    pub numbering_pattern: NumberingPattern,

    #[serde(default)]
    pub output_prefix: String,
    #[serde(default)]
    pub save_image: bool,
    #[serde(default)]
    pub disable_mem_cache: bool,

    #[serde(default)]
    pub stage_repeatability: Option<f32>,
    #[serde(default)]
    pub horizontal_overlap: Option<f32>,
    #[serde(default)]
    pub vertical_overlap: Option<f32>,

    #[serde(default = "default_overlap_uncertainty")]
    pub overlap_uncertainty: f32,
    #[serde(default = "default_valid_correlation_threshold")]
    pub valid_correlation_threshold: f32,

    #[serde(default)]
    pub time_slice: Option<usize>,

    #[serde(default = "default_refinement_method")]
    pub translation_refinement_method: RefinementMethod,
    #[serde(default = "default_num_hill_climbs")]
    pub num_hill_climbs: usize,
    #[serde(default = "default_num_fft_peaks")]
    pub num_fft_peaks: usize,
}

fn default_pattern_type() -> PatternType {
    PatternType::RowCol
}

fn default_grid_origin() -> GridOrigin {
    GridOrigin::UpperLeft
}

fn default_numbering_pattern() -> NumberingPattern {
    NumberingPattern::HorizontalCombing
}

fn default_overlap_uncertainty() -> f32 {
    DEFAULT_OVERLAP_UNCERTAINTY
}

fn default_valid_correlation_threshold() -> f32 {
    DEFAULT_VALID_CORRELATION_THRESHOLD
}

fn default_refinement_method() -> RefinementMethod {
    RefinementMethod::SingleHillClimb
}

fn default_num_hill_climbs() -> usize {
    DEFAULT_NUM_HILL_CLIMBS
}

fn default_num_fft_peaks() -> usize {
    DEFAULT_NUM_FFT_PEAKS
}

impl std::fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} grid from {} -> {}",
            self.grid_width,
            self.grid_height,
            self.image_dirpath.display(),
            self.output_dirpath.display()
        )
    }
}
