//! Orchestrator: drives Grid construction and the four stitching stages
//! (PCE -> SM -> RF -> GP) in order and writes the text/image outputs
//! spec section 6 names.

pub mod config;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::error::{Result, StitchError};
use crate::global_position;
use crate::io::{mosaic, output, FilenamePattern, FsPixelReader};
use crate::model::{Grid, PixelReader, Tile};
use crate::pce;
use crate::refine::Refiner;
use crate::stage_model::{StageModel, StageModelConfig};

use self::config::PipelineConfig;
pub use self::types::{PipelineStage, ProgressReporter};
use self::types::NoOpReporter;

/// What a completed run produced, for callers that want to report on it
/// beyond the files already written to `output_dirpath`.
#[derive(Debug)]
pub struct PipelineSummary {
    pub stage_model: StageModel,
    pub visited_tiles: usize,
    pub total_tiles: usize,
}

/// Create `path` fresh, erroring if it already exists (spec section 6:
/// "fresh output directory; error if exists, unless debug"). `overwrite`
/// is that debug escape hatch: an already-present directory is reused
/// in place rather than rejected.
pub fn prepare_output_dir(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() {
        if overwrite {
            return Ok(());
        }
        return Err(StitchError::OutputExists(path.to_path_buf()));
    }
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Run the full pipeline against a freshly-prepared `config.output_dirpath`,
/// reporting no progress.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineSummary> {
    prepare_output_dir(&config.output_dirpath, config.overwrite_output)?;
    run_stages(config, &NoOpReporter)
}

/// As [`run_pipeline`], but drives `progress` through each stage. Callers
/// that need to attach a log file under `output_dirpath` (as the CLI does)
/// should call [`prepare_output_dir`] themselves first, then call
/// [`run_stages`] directly once logging is wired up.
pub fn run_pipeline_with_progress(config: &PipelineConfig, progress: &dyn ProgressReporter) -> Result<PipelineSummary> {
    prepare_output_dir(&config.output_dirpath, config.overwrite_output)?;
    run_stages(config, progress)
}

/// The four-stage pipeline body, assuming `output_dirpath` already exists.
pub fn run_stages(config: &PipelineConfig, progress: &dyn ProgressReporter) -> Result<PipelineSummary> {
    let reader: Arc<dyn PixelReader> = Arc::new(FsPixelReader);
    let mut grid = build_grid(config, reader)?;
    grid.validate_shapes()?;
    info!(height = grid.height(), width = grid.width(), tiles = grid.len(), "tile grid constructed");

    progress.begin_stage(PipelineStage::Correlating, Some(grid.len()));
    let stage_start = Instant::now();
    let pce_engine = pce::Engine {
        num_fft_peaks: config.num_fft_peaks,
    };
    pce_engine.execute(&mut grid)?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "phase correlation complete");
    progress.finish_stage();

    output::write_relative_positions(&grid, &output_path(config, "relative-positions-no-optimization"))?;

    progress.begin_stage(PipelineStage::StageModel, None);
    let stage_start = Instant::now();
    let sm_config = StageModelConfig {
        overlap_uncertainty: config.overlap_uncertainty,
        valid_correlation_threshold: config.valid_correlation_threshold,
        horizontal_overlap: config.horizontal_overlap,
        vertical_overlap: config.vertical_overlap,
        stage_repeatability: config.stage_repeatability,
    };
    let stage_model = StageModel::build(&mut grid, &sm_config)?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "stage model built");
    progress.finish_stage();

    stage_model.save_stats(&output_path(config, "statistics"))?;

    progress.begin_stage(PipelineStage::Refining, Some(grid.len()));
    let stage_start = Instant::now();
    let refiner = Refiner {
        method: config.translation_refinement_method,
        num_hill_climbs: config.num_hill_climbs,
        search_radius: stage_model.search_radius,
    };
    refiner.execute(&mut grid)?;
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, "translation refinement complete");
    progress.finish_stage();

    output::write_relative_positions(&grid, &output_path(config, "relative-positions"))?;

    progress.begin_stage(PipelineStage::GlobalPosition, None);
    let stage_start = Instant::now();
    let total = grid.len();
    let visited = match global_position::execute(&mut grid) {
        Ok(()) => total,
        // A disconnected correlation graph is documented (spec section 4.4
        // step 5 / section 8): unreachable tiles stay at the origin, but the
        // run is not aborted.
        Err(StitchError::Disconnected { visited, .. }) => visited,
        Err(e) => return Err(e),
    };
    info!(elapsed_ms = stage_start.elapsed().as_millis() as u64, visited, total, "global positioning complete");
    progress.finish_stage();

    output::write_global_positions(&grid, &output_path(config, "global-positions"))?;

    if config.save_image {
        progress.begin_stage(PipelineStage::Writing, None);
        let time = config.time_slice.unwrap_or(0);
        let mosaic_path = config
            .output_dirpath
            .join(format!("{}stitched-{}.tif", config.output_prefix, time));
        mosaic::write_mosaic(&grid, &mosaic_path)?;
        progress.finish_stage();
    }

    Ok(PipelineSummary {
        stage_model,
        visited_tiles: visited,
        total_tiles: total,
    })
}

fn output_path(config: &PipelineConfig, stem: &str) -> PathBuf {
    let time = config.time_slice.unwrap_or(0);
    config
        .output_dirpath
        .join(format!("{}{}-{}.txt", config.output_prefix, stem, time))
}

/// Build the grid by expanding the filename pattern for every cell and
/// probing the filesystem; cells whose file is absent are left `None`
/// (spec section 6: "tiles missing from disk are tolerated").
fn build_grid(config: &PipelineConfig, reader: Arc<dyn PixelReader>) -> Result<Grid> {
    let pattern = FilenamePattern {
        pattern: config.filename_pattern.clone(),
        pattern_type: config.filename_pattern_type,
        grid_origin: config.grid_origin,
        numbering_pattern: config.numbering_pattern,
        start_row: config.start_row,
        start_col: config.start_col,
        start_tile: config.start_tile,
    };

    let mut tiles = Vec::with_capacity(config.grid_height * config.grid_width);
    for r in 0..config.grid_height {
        for c in 0..config.grid_width {
            let name = pattern.expand(r, c, config.grid_height, config.grid_width, config.time_slice)?;
            let path = config.image_dirpath.join(&name);
            if path.is_file() {
                tiles.push(Some(Tile::new(r, c, name, path, reader.clone(), config.disable_mem_cache)));
            } else {
                tiles.push(None);
            }
        }
    }

    Ok(Grid::from_tiles(config.grid_height, config.grid_width, tiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{GridOrigin, NumberingPattern, PatternType};
    use crate::refine::RefinementMethod;
    use image::{ImageBuffer, Luma};
    use tempfile::tempdir;

    const TILE_SIZE: u32 = 64;
    const STEP: u32 = 20;

    /// A deterministic, non-periodic texture sampled from one shared "world"
    /// image. Adjacent tiles are cropped `STEP` pixels apart so their west/north
    /// overlap lands inside `(1, TILE_SIZE - 1)`, the MLE's valid-translation
    /// range, rather than at the degenerate zero-shift edge.
    fn world_pixel(x: u32, y: u32) -> u16 {
        let v = x.wrapping_mul(2654435761).wrapping_add(y.wrapping_mul(40503)) ^ x.wrapping_mul(y);
        (v % 65536) as u16
    }

    fn write_world_tiles(dir: &Path, present: &[(usize, usize)]) {
        for &(r, c) in present {
            let row_off = r as u32 * STEP;
            let col_off = c as u32 * STEP;
            let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_fn(TILE_SIZE, TILE_SIZE, |x, y| {
                Luma([world_pixel(col_off + x, row_off + y)])
            });
            img.save(dir.join(format!("tile_r{r:02}_c{c:02}.tif"))).unwrap();
        }
    }

    fn base_config(image_dir: PathBuf, output_dir: PathBuf) -> PipelineConfig {
        PipelineConfig {
            image_dirpath: image_dir,
            output_dirpath: output_dir,
            grid_width: 2,
            grid_height: 2,
            start_row: 0,
            start_col: 0,
            start_tile: 0,
            filename_pattern: "tile_r{rr}_c{cc}.tif".to_string(),
            filename_pattern_type: PatternType::RowCol,
            grid_origin: GridOrigin::UpperLeft,
            numbering_pattern: NumberingPattern::HorizontalCombing,
            output_prefix: String::new(),
            save_image: false,
            disable_mem_cache: true,
            stage_repeatability: None,
            horizontal_overlap: None,
            vertical_overlap: None,
            overlap_uncertainty: 3.0,
            valid_correlation_threshold: 0.5,
            time_slice: None,
            translation_refinement_method: RefinementMethod::SingleHillClimb,
            num_hill_climbs: 16,
            num_fft_peaks: 2,
        }
    }

    #[test]
    fn overlapping_grid_produces_all_outputs() {
        let image_dir = tempdir().unwrap();
        write_world_tiles(image_dir.path(), &[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let output_dir = image_dir.path().join("out");
        let config = base_config(image_dir.path().to_path_buf(), output_dir.clone());

        let summary = run_pipeline(&config).unwrap();
        assert_eq!(summary.total_tiles, 4);
        assert_eq!(summary.visited_tiles, 4);

        assert!(output_dir.join("relative-positions-no-optimization-0.txt").exists());
        assert!(output_dir.join("relative-positions-0.txt").exists());
        assert!(output_dir.join("global-positions-0.txt").exists());
        assert!(output_dir.join("statistics-0.txt").exists());
    }

    #[test]
    fn missing_output_dir_is_created_but_not_recreated() {
        let image_dir = tempdir().unwrap();
        write_world_tiles(image_dir.path(), &[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let output_dir = image_dir.path().join("out");
        let config = base_config(image_dir.path().to_path_buf(), output_dir.clone());
        run_pipeline(&config).unwrap();

        let second = run_pipeline(&config);
        assert!(matches!(second, Err(StitchError::OutputExists(_))));
    }

    #[test]
    fn missing_tile_file_leaves_a_hole_without_failing() {
        let image_dir = tempdir().unwrap();
        write_world_tiles(image_dir.path(), &[(0, 0), (0, 1), (1, 0)]);
        // tile_r01_c01.tif intentionally absent.
        let output_dir = image_dir.path().join("out");
        let config = base_config(image_dir.path().to_path_buf(), output_dir.clone());

        let summary = run_pipeline(&config).unwrap();
        assert_eq!(summary.total_tiles, 3);
    }
}
