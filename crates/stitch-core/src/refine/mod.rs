//! Refiner (RF): bounded multi-start hill-climb search for the
//! maximum-NCC translation around each edge's phase-correlation peak.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{NCC_TRUST_BONUS, PARALLEL_EDGE_THRESHOLD};
use crate::error::Result;
use crate::model::{Direction, Grid, Peak};

/// Search strategy for one edge's bounded rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefinementMethod {
    SingleHillClimb,
    MultiPointHillClimb,
}

pub struct Refiner {
    pub method: RefinementMethod,
    pub num_hill_climbs: usize,
    pub search_radius: i32,
}

impl Refiner {
    pub fn execute(&self, grid: &mut Grid) -> Result<()> {
        let edges: Vec<(usize, usize, Direction)> = grid
            .iter_coords()
            .flat_map(|(r, c)| {
                let mut v = Vec::with_capacity(2);
                if grid.west_of(r, c).is_some() {
                    v.push((r, c, Direction::Horizontal));
                }
                if grid.north_of(r, c).is_some() {
                    v.push((r, c, Direction::Vertical));
                }
                v
            })
            .collect();

        info!(edges = edges.len(), "Refining pairwise translations");

        let n = match self.method {
            RefinementMethod::SingleHillClimb => 1,
            RefinementMethod::MultiPointHillClimb => self.num_hill_climbs.max(1),
        };

        let results: Vec<(usize, usize, Direction, Peak)> = if edges.len() >= PARALLEL_EDGE_THRESHOLD {
            edges
                .par_iter()
                .map(|&(r, c, dir)| self.refine_one(grid, r, c, dir, n))
                .collect()
        } else {
            edges.iter().map(|&(r, c, dir)| self.refine_one(grid, r, c, dir, n)).collect()
        };

        for (r, c, dir, peak) in results {
            let tile = grid.get_mut(r, c).expect("edge coordinate came from this grid");
            tile.set_peak(dir, peak);
        }

        Ok(())
    }

    fn refine_one(&self, grid: &Grid, r: usize, c: usize, dir: Direction, n: usize) -> (usize, usize, Direction, Peak) {
        let tile = grid.get(r, c).expect("edge coordinate came from this grid");
        let neighbor = match dir {
            Direction::Horizontal => grid.west_of(r, c).expect("west edge implies west neighbor"),
            Direction::Vertical => grid.north_of(r, c).expect("north edge implies north neighbor"),
        };
        let input = tile.peak(dir).unwrap_or_else(Peak::invalid);

        let neighbor_px = match neighbor.pixels() {
            Ok(p) => p,
            Err(_) => return (r, c, dir, input),
        };
        let tile_px = match tile.pixels() {
            Ok(p) => p,
            Err(_) => return (r, c, dir, input),
        };
        let (h, w) = neighbor_px.dim();

        let mut refined = hill_climb_search(&neighbor_px, &tile_px, input.x, input.y, self.search_radius, w, h, n);

        if input.is_valid() {
            refined.ncc += NCC_TRUST_BONUS;
        }

        (r, c, dir, refined)
    }
}

struct Rect {
    x0: i32,
    x1: i32,
    y0: i32,
    y1: i32,
}

impl Rect {
    fn width(&self) -> usize {
        (self.x1 - self.x0 + 1) as usize
    }
    fn height(&self) -> usize {
        (self.y1 - self.y0 + 1) as usize
    }
    fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(self.x0, self.x1), y.clamp(self.y0, self.y1))
    }
    fn contains(&self, x: i32, y: i32) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }
}

/// Run `n` hill climbs (the first from `(start_x, start_y)`, the rest from
/// uniformly random points in the rectangle) sharing one NCC cache, and
/// return the best-NCC endpoint.
fn hill_climb_search(
    neighbor: &ndarray::Array2<f32>,
    tile: &ndarray::Array2<f32>,
    start_x: i32,
    start_y: i32,
    search_radius: i32,
    w: usize,
    h: usize,
    n: usize,
) -> Peak {
    let ww = w as i32;
    let hh = h as i32;
    let rect = Rect {
        x0: (start_x - search_radius).max(-(ww - 1)),
        x1: (start_x + search_radius).min(ww - 1),
        y0: (start_y - search_radius).max(-(hh - 1)),
        y1: (start_y + search_radius).min(hh - 1),
    };

    let mut cache = vec![f32::NAN; rect.width() * rect.height()];
    let idx = |x: i32, y: i32| -> usize { ((y - rect.y0) as usize) * rect.width() + (x - rect.x0) as usize };

    let mut eval = |x: i32, y: i32, cache: &mut Vec<f32>| -> f32 {
        let i = idx(x, y);
        if cache[i].is_nan() {
            cache[i] = crate::pce::ncc_overlap(neighbor, tile, x, y);
        }
        cache[i]
    };

    let (sx, sy) = rect.clamp(start_x, start_y);
    let mut best = single_climb(&rect, sx, sy, &mut eval, &mut cache);

    let mut rng = rand::rng();
    for _ in 1..n {
        let rx = rng.random_range(rect.x0..=rect.x1);
        let ry = rng.random_range(rect.y0..=rect.y1);
        let candidate = single_climb(&rect, rx, ry, &mut eval, &mut cache);
        if candidate.ncc.is_nan() || (best.ncc.is_finite() && candidate.ncc <= best.ncc) {
            continue;
        }
        if best.ncc.is_nan() || candidate.ncc > best.ncc {
            best = candidate;
        }
    }

    if best.ncc.is_nan() {
        let (cx, cy) = rect.clamp(start_x, start_y);
        Peak::new(-1.0, cx, cy)
    } else {
        best
    }
}

fn single_climb(
    rect: &Rect,
    start_x: i32,
    start_y: i32,
    eval: &mut impl FnMut(i32, i32, &mut Vec<f32>) -> f32,
    cache: &mut Vec<f32>,
) -> Peak {
    let (mut x, mut y) = (start_x, start_y);
    let mut ncc = eval(x, y, cache);

    loop {
        let neighbors = [(x, y - 1), (x, y + 1), (x - 1, y), (x + 1, y)];
        let mut moved = false;
        for (nx, ny) in neighbors {
            if !rect.contains(nx, ny) {
                continue;
            }
            let candidate = eval(nx, ny, cache);
            if candidate.is_finite() && (!ncc.is_finite() || candidate > ncc) {
                x = nx;
                y = ny;
                ncc = candidate;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    Peak::new(ncc, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn checkerboard(h: usize, w: usize) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(r, c)| if (r + c) % 2 == 0 { 1.0 } else { 0.0 })
    }

    #[test]
    fn climbs_toward_identity_peak() {
        let img = checkerboard(32, 32);
        let peak = hill_climb_search(&img, &img, 3, -2, 5, 32, 32, 1);
        assert_eq!((peak.x, peak.y), (0, 0));
        assert!(peak.ncc > 0.99);
    }

    #[test]
    fn multi_start_shares_cache_and_finds_same_peak() {
        let img = checkerboard(32, 32);
        let peak = hill_climb_search(&img, &img, 3, -2, 5, 32, 32, 8);
        assert_eq!((peak.x, peak.y), (0, 0));
    }

    #[test]
    fn trust_bonus_is_applied_when_input_was_valid() {
        let refiner = Refiner {
            method: RefinementMethod::SingleHillClimb,
            num_hill_climbs: 1,
            search_radius: 4,
        };
        let img = checkerboard(32, 32);
        let peak = hill_climb_search(&img, &img, 0, 0, refiner.search_radius, 32, 32, 1);
        assert!(peak.ncc > 0.0);
    }
}
