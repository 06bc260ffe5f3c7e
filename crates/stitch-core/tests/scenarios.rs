//! End-to-end scenarios exercising PCE, SM, RF, and GP together through the
//! public API, without touching the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array2;

use stitch_core::error::{Result as StitchResult, StitchError};
use stitch_core::global_position;
use stitch_core::model::{Grid, Peak, PixelReader, Tile};
use stitch_core::pce::Engine;
use stitch_core::refine::{RefinementMethod, Refiner};
use stitch_core::stage_model::{StageModel, StageModelConfig};

/// Deterministic, non-periodic pixel value so correlation has a single
/// unambiguous best-matching offset rather than a repeating pattern.
fn world_pixel(x: i64, y: i64) -> f32 {
    let xu = x as i64 as u64;
    let yu = y as i64 as u64;
    let v = xu.wrapping_mul(2654435761).wrapping_add(yu.wrapping_mul(40503)) ^ xu.wrapping_mul(yu).wrapping_add(1);
    (v % 10_000) as f32 / 10_000.0
}

fn world(height: usize, width: usize, row0: i64, col0: i64) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(r, c)| world_pixel(col0 + c as i64, row0 + r as i64))
}

/// Crop a `size x size` tile out of a shared world whose origin is
/// `(row0, col0)`.
fn world_tile(size: usize, row0: i64, col0: i64) -> Array2<f32> {
    world(size, size, row0, col0)
}

struct MapReader(HashMap<PathBuf, Array2<f32>>);

impl PixelReader for MapReader {
    fn read(&self, path: &Path) -> StitchResult<Array2<f32>> {
        Ok(self.0.get(path).expect("test tile registered").clone())
    }
}

/// Build an `h x w` grid of tiles cropped from one shared world image, tiles
/// `col_step`/`row_step` pixels apart so adjacent tiles share a real overlap
/// band, skipping any `(r, c)` in `holes`.
fn build_world_grid(h: usize, w: usize, tile_size: usize, row_step: i64, col_step: i64, holes: &[(usize, usize)]) -> Grid {
    let mut images = HashMap::new();
    let mut paths = Vec::with_capacity(h * w);
    for r in 0..h {
        for c in 0..w {
            if holes.contains(&(r, c)) {
                paths.push(None);
                continue;
            }
            let path = PathBuf::from(format!("tile_{r}_{c}.tif"));
            images.insert(path.clone(), world_tile(tile_size, r as i64 * row_step, c as i64 * col_step));
            paths.push(Some(path));
        }
    }
    let reader: Arc<dyn PixelReader> = Arc::new(MapReader(images));

    let mut tiles = Vec::with_capacity(h * w);
    for r in 0..h {
        for c in 0..w {
            let path = &paths[r * w + c];
            tiles.push(path.clone().map(|p| Tile::new(r, c, format!("tile_{r}_{c}"), p, reader.clone(), true)));
        }
    }
    Grid::from_tiles(h, w, tiles)
}

#[test]
fn identity_tiles_correlate_at_the_origin() {
    // Scenario 1: bit-identical tiles report a zero-shift, near-unity peak.
    let reader: Arc<dyn PixelReader> = Arc::new(MapReader({
        let mut m = HashMap::new();
        m.insert(PathBuf::from("a.tif"), world_tile(64, 0, 0));
        m
    }));
    let mut tiles = Vec::new();
    for r in 0..2 {
        for c in 0..2 {
            tiles.push(Some(Tile::new(r, c, format!("{r}_{c}"), PathBuf::from("a.tif"), reader.clone(), true)));
        }
    }
    let mut grid = Grid::from_tiles(2, 2, tiles);
    Engine { num_fft_peaks: 2 }.execute(&mut grid).unwrap();

    let west = grid.get(0, 1).unwrap().west_translation.unwrap();
    assert_eq!((west.x, west.y), (0, 0));
    assert!(west.ncc > 0.95, "ncc = {}", west.ncc);
    let north = grid.get(1, 0).unwrap().north_translation.unwrap();
    assert_eq!((north.x, north.y), (0, 0));
    assert!(north.ncc > 0.95, "ncc = {}", north.ncc);
}

#[test]
fn synthetic_shift_resolves_to_the_wraparound_offset() {
    // Scenario 2: 256-wide tiles sharing a 30px overlap band -> the west
    // peak at (0, 1) should land at x = W - 30 = 226, y = 0.
    let w = 256usize;
    let overlap = 30i64;
    let step = w as i64 - overlap;

    let tile00 = world_tile(w, 0, 0);
    let tile01 = world_tile(w, 0, step);

    let mut images = HashMap::new();
    images.insert(PathBuf::from("t00.tif"), tile00);
    images.insert(PathBuf::from("t01.tif"), tile01);
    let reader: Arc<dyn PixelReader> = Arc::new(MapReader(images));

    let t00 = Tile::new(0, 0, "t00".into(), PathBuf::from("t00.tif"), reader.clone(), true);
    let t01 = Tile::new(0, 1, "t01".into(), PathBuf::from("t01.tif"), reader.clone(), true);
    let mut grid = Grid::from_tiles(1, 2, vec![Some(t00), Some(t01)]);

    Engine { num_fft_peaks: 4 }.execute(&mut grid).unwrap();

    let west = grid.get(0, 1).unwrap().west_translation.unwrap();
    assert_eq!(west.x, step as i32);
    assert_eq!(west.y, 0);
    assert!(west.ncc > 0.95, "ncc = {}", west.ncc);
}

#[test]
fn one_missing_tile_drops_only_its_touching_edges() {
    // Scenario 3: a 3x3 grid missing (1, 1). Edges into/out of the hole never
    // get a Peak; the remaining 8 tiles stay fully connected for GP.
    let mut grid = build_world_grid(3, 3, 48, 30, 30, &[(1, 1)]);
    assert_eq!(grid.len(), 8);

    Engine { num_fft_peaks: 2 }.execute(&mut grid).unwrap();

    assert!(grid.get(1, 1).is_none());
    assert!(grid.get(1, 2).unwrap().west_translation.is_none(), "neighbor missing, no west edge");
    assert!(grid.get(2, 1).unwrap().north_translation.is_none(), "neighbor missing, no north edge");
    for &(r, c) in &[(0, 1), (0, 2), (2, 2)] {
        assert!(grid.get(r, c).unwrap().west_translation.is_some(), "({r},{c}) has a live west neighbor");
    }

    let stage_model = StageModel::build(&mut grid, &StageModelConfig::default()).unwrap();
    assert!(stage_model.horizontal.overlap > 0.0);
    assert!(stage_model.vertical.overlap > 0.0);

    let refiner = Refiner {
        method: RefinementMethod::SingleHillClimb,
        num_hill_climbs: 1,
        search_radius: stage_model.search_radius,
    };
    refiner.execute(&mut grid).unwrap();

    global_position::execute(&mut grid).unwrap();
    assert_eq!(grid.len(), 8, "the missing cell never participates in GP");
}

#[test]
fn overlap_override_shifts_positions_by_at_most_the_search_radius() {
    // Scenario 4: the same grid, run once with the inferred overlap and once
    // with a user override; resulting positions should stay close.
    let build = |config: &StageModelConfig| {
        let mut grid = build_world_grid(2, 2, 64, 44, 44, &[]);
        Engine { num_fft_peaks: 2 }.execute(&mut grid).unwrap();
        let stage_model = StageModel::build(&mut grid, config).unwrap();
        let refiner = Refiner {
            method: RefinementMethod::SingleHillClimb,
            num_hill_climbs: 1,
            search_radius: stage_model.search_radius,
        };
        refiner.execute(&mut grid).unwrap();
        global_position::execute(&mut grid).unwrap();
        (grid, stage_model)
    };

    let (inferred_grid, inferred_model) = build(&StageModelConfig::default());
    let mut overridden_config = StageModelConfig::default();
    overridden_config.horizontal_overlap = Some(20.0);
    let (overridden_grid, overridden_model) = build(&overridden_config);

    assert_eq!(overridden_model.horizontal.overlap, 20.0);
    assert_ne!(overridden_model.horizontal.overlap, inferred_model.horizontal.overlap);

    let search_radius = inferred_model.search_radius.max(overridden_model.search_radius);
    let inferred_pos = inferred_grid.get(1, 1).unwrap();
    let overridden_pos = overridden_grid.get(1, 1).unwrap();
    assert!((inferred_pos.abs_x - overridden_pos.abs_x).abs() <= search_radius + 44);
    assert!((inferred_pos.abs_y - overridden_pos.abs_y).abs() <= search_radius + 44);
}

struct BlankReader;
impl PixelReader for BlankReader {
    fn read(&self, _path: &Path) -> StitchResult<Array2<f32>> {
        Ok(Array2::zeros((100, 100)))
    }
}

fn grid_with_one_outlier(good: i32, outlier_rc: (usize, usize), outlier_value: i32) -> Grid {
    let reader: Arc<dyn PixelReader> = Arc::new(BlankReader);
    let mut tiles = Vec::new();
    for r in 0..3 {
        for c in 0..3 {
            let mut tile = Tile::new(r, c, format!("{r}_{c}"), PathBuf::from("x.tif"), reader.clone(), true);
            if c > 0 {
                let x = if (r, c) == outlier_rc { outlier_value } else { good };
                tile.west_translation = Some(Peak::new(0.9, x, 0));
            }
            if r > 0 {
                let y = if (r, c) == outlier_rc { outlier_value } else { good };
                tile.north_translation = Some(Peak::new(0.9, 0, y));
            }
            tiles.push(Some(tile));
        }
    }
    Grid::from_tiles(3, 3, tiles)
}

#[test]
fn iqr_filter_excludes_an_injected_outlier_peak() {
    // Scenario 5: one edge's peak is planted at the degenerate dim/2
    // offset (images are 100x100, so 50 is the midpoint); SM's IQR pass
    // must exclude it from repeatability/medians and the repair pipeline
    // must recenter it rather than leave it at (50, 50).
    let dim = 100usize;
    let mut grid = grid_with_one_outlier(70, (1, 1), dim as i32 / 2);

    let model = StageModel::build(&mut grid, &StageModelConfig::default()).unwrap();
    assert!(model.horizontal.overlap > 0.0);

    let outlier = grid.get(1, 1).unwrap();
    let west = outlier.west_translation.unwrap();
    assert_ne!(west.x, dim as i32 / 2, "outlier should have been repaired away from its injected value");
    // `remove_invalid` NaNs this peak's ncc and neither repair pass restores
    // it (both only touch x/y), so the repaired edge keeps a NaN ncc.
    assert!(west.ncc.is_nan());
}

#[test]
fn multi_start_hill_climb_beats_single_start_on_a_two_peak_landscape() {
    // Scenario 6: a landscape with a strong local maximum near the PCE seed
    // and a taller global maximum further away. A single climb started near
    // the local max gets stuck there; many random restarts find the global one.
    let size = 64usize;
    let mut neighbor = Array2::<f32>::zeros((size, size));
    let mut tile = Array2::<f32>::zeros((size, size));
    for r in 0..size {
        for c in 0..size {
            neighbor[[r, c]] = world_pixel(c as i64, r as i64);
        }
    }
    // Plant the true matching content far from the seed (global max), and a
    // decoy near the seed that's a weaker but still-positive local match.
    for r in 0..size {
        for c in 0..(size - 20) {
            tile[[r, c]] = neighbor[[r, c + 20]];
        }
    }
    for r in 0..size {
        for c in 0..(size - 3) {
            tile[[r, c]] = 0.6 * tile[[r, c]] + 0.4 * neighbor[[r, c + 3]];
        }
    }

    let mut images = HashMap::new();
    images.insert(PathBuf::from("n.tif"), neighbor);
    images.insert(PathBuf::from("t.tif"), tile);
    let reader: Arc<dyn PixelReader> = Arc::new(MapReader(images));

    let build_grid = |start_x: i32| {
        let n = Tile::new(0, 0, "n".into(), PathBuf::from("n.tif"), reader.clone(), true);
        let mut t = Tile::new(0, 1, "t".into(), PathBuf::from("t.tif"), reader.clone(), true);
        t.west_translation = Some(Peak::new(0.5, start_x, 0));
        Grid::from_tiles(1, 2, vec![Some(n), Some(t)])
    };

    let mut single = build_grid(3);
    Refiner {
        method: RefinementMethod::SingleHillClimb,
        num_hill_climbs: 1,
        search_radius: 5,
    }
    .execute(&mut single)
    .unwrap();

    let mut multi = build_grid(3);
    Refiner {
        method: RefinementMethod::MultiPointHillClimb,
        num_hill_climbs: 32,
        search_radius: 30,
    }
    .execute(&mut multi)
    .unwrap();

    let single_peak = single.get(0, 1).unwrap().west_translation.unwrap();
    let multi_peak = multi.get(0, 1).unwrap().west_translation.unwrap();
    assert!(multi_peak.ncc >= single_peak.ncc, "multi-start should find a peak at least as good");
}

#[test]
fn global_position_reports_disconnected_graphs_without_erroring_fatally() {
    let reader: Arc<dyn PixelReader> = Arc::new(BlankReader);
    let mut tiles = Vec::new();
    for r in 0..2 {
        for c in 0..2 {
            tiles.push(Some(Tile::new(r, c, format!("{r}_{c}"), PathBuf::from("x.tif"), reader.clone(), true)));
        }
    }
    // No Peaks set at all: every edge is missing, so GP can't even find a seed.
    let mut grid = Grid::from_tiles(2, 2, tiles);
    let err = global_position::execute(&mut grid).unwrap_err();
    assert!(matches!(err, StitchError::NoSeedTile));
}
