use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use stitch_core::io::{GridOrigin, NumberingPattern, PatternType};
use stitch_core::pipeline::config::PipelineConfig;
use stitch_core::pipeline::types::{PipelineStage, ProgressReporter};
use stitch_core::refine::RefinementMethod;

use crate::summary::print_pipeline_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum FilenamePatternTypeArg {
    Sequential,
    RowCol,
}

impl From<FilenamePatternTypeArg> for PatternType {
    fn from(v: FilenamePatternTypeArg) -> Self {
        match v {
            FilenamePatternTypeArg::Sequential => PatternType::Sequential,
            FilenamePatternTypeArg::RowCol => PatternType::RowCol,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GridOriginArg {
    Ul,
    Ur,
    Ll,
    Lr,
}

impl From<GridOriginArg> for GridOrigin {
    fn from(v: GridOriginArg) -> Self {
        match v {
            GridOriginArg::Ul => GridOrigin::UpperLeft,
            GridOriginArg::Ur => GridOrigin::UpperRight,
            GridOriginArg::Ll => GridOrigin::LowerLeft,
            GridOriginArg::Lr => GridOrigin::LowerRight,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum NumberingPatternArg {
    HorizontalCombing,
    VerticalCombing,
    HorizontalContinuous,
    VerticalContinuous,
}

impl From<NumberingPatternArg> for NumberingPattern {
    fn from(v: NumberingPatternArg) -> Self {
        match v {
            NumberingPatternArg::HorizontalCombing => NumberingPattern::HorizontalCombing,
            NumberingPatternArg::VerticalCombing => NumberingPattern::VerticalCombing,
            NumberingPatternArg::HorizontalContinuous => NumberingPattern::HorizontalContinuous,
            NumberingPatternArg::VerticalContinuous => NumberingPattern::VerticalContinuous,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RefinementMethodArg {
    SingleHillClimb,
    MultiPointHillClimb,
}

impl From<RefinementMethodArg> for RefinementMethod {
    fn from(v: RefinementMethodArg) -> Self {
        match v {
            RefinementMethodArg::SingleHillClimb => RefinementMethod::SingleHillClimb,
            RefinementMethodArg::MultiPointHillClimb => RefinementMethod::MultiPointHillClimb,
        }
    }
}

/// Stitch a grid of overlapping tile images into a single mosaic.
#[derive(Args)]
pub struct StitchArgs {
    /// Directory holding the tile images
    pub image_dirpath: PathBuf,

    /// Fresh output directory (error if it exists, unless --overwrite-output)
    pub output_dirpath: PathBuf,

    /// Load a saved PipelineConfig from TOML instead of the flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reuse an existing output directory instead of erroring
    #[arg(long)]
    pub overwrite_output: bool,

    #[arg(long)]
    pub grid_width: usize,
    #[arg(long)]
    pub grid_height: usize,

    #[arg(long, default_value = "0")]
    pub start_row: usize,
    #[arg(long, default_value = "0")]
    pub start_col: usize,
    #[arg(long, default_value = "0")]
    pub start_tile: usize,

    /// Pattern with `{rrr}`, `{ccc}`, optional `{ppp}`, `{ttt}` fields
    #[arg(long)]
    pub filename_pattern: String,
    #[arg(long, value_enum, default_value = "row-col")]
    pub filename_pattern_type: FilenamePatternTypeArg,
    #[arg(long, value_enum, default_value = "ul")]
    pub grid_origin: GridOriginArg,
    #[arg(long, value_enum, default_value = "horizontal-combing")]
    pub numbering_pattern: NumberingPatternArg,

    #[arg(long, default_value = "")]
    pub output_prefix: String,
    #[arg(long)]
    pub save_image: bool,
    #[arg(long)]
    pub disable_mem_cache: bool,

    #[arg(long)]
    pub stage_repeatability: Option<f32>,
    #[arg(long)]
    pub horizontal_overlap: Option<f32>,
    #[arg(long)]
    pub vertical_overlap: Option<f32>,

    #[arg(long, default_value = "3.0")]
    pub overlap_uncertainty: f32,
    #[arg(long, default_value = "0.5")]
    pub valid_correlation_threshold: f32,

    /// Selects a time slice when `{t+}` is present in the filename pattern
    #[arg(long)]
    pub time_slice: Option<usize>,

    #[arg(long, value_enum, default_value = "single-hill-climb")]
    pub translation_refinement_method: RefinementMethodArg,
    #[arg(long, default_value = "16")]
    pub num_hill_climbs: usize,
    #[arg(long, default_value = "2")]
    pub num_fft_peaks: usize,
}

/// Build the `PipelineConfig` this invocation should run with, either from
/// `--config` or from the flag table directly. Does not touch the filesystem.
pub fn build_config(args: &StitchArgs) -> Result<PipelineConfig> {
    if let Some(ref path) = args.config {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
        return toml::from_str(&contents).context("invalid pipeline config");
    }

    Ok(PipelineConfig {
        image_dirpath: args.image_dirpath.clone(),
        output_dirpath: args.output_dirpath.clone(),
        overwrite_output: args.overwrite_output,
        grid_width: args.grid_width,
        grid_height: args.grid_height,
        start_row: args.start_row,
        start_col: args.start_col,
        start_tile: args.start_tile,
        filename_pattern: args.filename_pattern.clone(),
        filename_pattern_type: args.filename_pattern_type.into(),
        grid_origin: args.grid_origin.into(),
        numbering_pattern: args.numbering_pattern.into(),
        output_prefix: args.output_prefix.clone(),
        save_image: args.save_image,
        disable_mem_cache: args.disable_mem_cache,
        stage_repeatability: args.stage_repeatability,
        horizontal_overlap: args.horizontal_overlap,
        vertical_overlap: args.vertical_overlap,
        overlap_uncertainty: args.overlap_uncertainty,
        valid_correlation_threshold: args.valid_correlation_threshold,
        time_slice: args.time_slice,
        translation_refinement_method: args.translation_refinement_method.into(),
        num_hill_climbs: args.num_hill_climbs,
        num_fft_peaks: args.num_fft_peaks,
    })
}

struct CliProgress {
    bar: ProgressBar,
}

impl ProgressReporter for CliProgress {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.bar.set_length(total_items.unwrap_or(1) as u64);
        self.bar.set_position(0);
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.bar.set_position(self.bar.length().unwrap_or(1));
    }
}

/// Run the pipeline against an already-prepared `config.output_dirpath`
/// (logging is expected to already be wired up by `main`).
pub fn run(config: &PipelineConfig) -> Result<()> {
    print_pipeline_summary(config);

    let bar = ProgressBar::new(1);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:28} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    let progress = CliProgress { bar: bar.clone() };

    let summary = stitch_core::pipeline::run_stages(config, &progress)?;
    bar.finish_and_clear();

    println!();
    println!(
        "Visited {}/{} tiles (search radius {})",
        summary.visited_tiles, summary.total_tiles, summary.stage_model.search_radius
    );
    if summary.visited_tiles < summary.total_tiles {
        println!(
            "warning: {} tile(s) were unreachable from the correlation graph and were left at the grid origin",
            summary.total_tiles - summary.visited_tiles
        );
    }

    Ok(())
}
