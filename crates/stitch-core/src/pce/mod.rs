//! Phase-correlation engine: pairwise translation estimation via FFT cross-power
//! spectrum followed by NCC disambiguation of the ambiguous wrap-around peak.

use std::collections::HashSet;

use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use tracing::info;

use crate::compute::{fft2d_forward, ifft2d_inverse};
use crate::consts::{DEFAULT_NUM_FFT_PEAKS, EPSILON, INVALID_NCC, PARALLEL_EDGE_THRESHOLD};
use crate::error::Result;
use crate::model::{Direction, Grid, Peak};

/// Computes every west/north Peak in the grid and writes them in place.
pub struct Engine {
    pub num_fft_peaks: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            num_fft_peaks: DEFAULT_NUM_FFT_PEAKS,
        }
    }
}

impl Engine {
    pub fn execute(&self, grid: &mut Grid) -> Result<()> {
        let edges: Vec<(usize, usize, Direction)> = grid
            .iter_coords()
            .flat_map(|(r, c)| {
                let mut v = Vec::with_capacity(2);
                if grid.get(r, c).is_some() {
                    if grid.west_of(r, c).is_some() {
                        v.push((r, c, Direction::Horizontal));
                    }
                    if grid.north_of(r, c).is_some() {
                        v.push((r, c, Direction::Vertical));
                    }
                }
                v
            })
            .collect();

        info!(edges = edges.len(), "Computing pairwise translations");

        let results: Vec<Result<(usize, usize, Direction, Peak)>> =
            if edges.len() >= PARALLEL_EDGE_THRESHOLD {
                edges
                    .par_iter()
                    .map(|&(r, c, dir)| self.compute_one(grid, r, c, dir))
                    .collect()
            } else {
                edges
                    .iter()
                    .map(|&(r, c, dir)| self.compute_one(grid, r, c, dir))
                    .collect()
            };

        for res in results {
            let (r, c, dir, peak) = res?;
            let tile = grid.get_mut(r, c).expect("edge coordinate came from this grid");
            match dir {
                Direction::Horizontal => tile.west_translation = Some(peak),
                Direction::Vertical => tile.north_translation = Some(peak),
            }
        }

        Ok(())
    }

    fn compute_one(
        &self,
        grid: &Grid,
        r: usize,
        c: usize,
        dir: Direction,
    ) -> Result<(usize, usize, Direction, Peak)> {
        let tile = grid.get(r, c).expect("edge coordinate came from this grid");
        let neighbor = match dir {
            Direction::Horizontal => grid.west_of(r, c).expect("west edge implies west neighbor"),
            Direction::Vertical => grid.north_of(r, c).expect("north edge implies north neighbor"),
        };
        let neighbor_px = neighbor.pixels()?;
        let tile_px = tile.pixels()?;
        let peak = compute_pciam(&neighbor_px, &tile_px, dir, self.num_fft_peaks);
        Ok((r, c, dir, peak))
    }
}

/// One pairwise phase correlation + NCC disambiguation between a neighbor
/// and the tile it feeds into, along `direction`'s edge.
fn compute_pciam(neighbor: &Array2<f32>, tile: &Array2<f32>, direction: Direction, n_peaks: usize) -> Peak {
    let (h, w) = neighbor.dim();

    let f1 = fft2d_forward(neighbor);
    let f2 = fft2d_forward(tile);

    let mut cross = Array2::<Complex<f64>>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            let mut val = f1[[row, col]] * f2[[row, col]].conj();
            if !val.re.is_finite() || !val.im.is_finite() {
                val = Complex::new(EPSILON, 0.0);
            }
            let mag = val.norm().max(EPSILON);
            cross[[row, col]] = val / mag;
        }
    }

    let pcm = ifft2d_inverse(&cross);
    let candidates = top_n_indices(&pcm, n_peaks);

    let mut best: Option<Peak> = None;
    for (yc, xc) in candidates {
        for (dx, dy) in disambiguate(xc as i32, yc as i32, w as i32, h as i32, direction) {
            let ncc = ncc_overlap(neighbor, tile, dx, dy);
            let better = match best {
                Some(b) => ncc > b.ncc,
                None => true,
            };
            if better {
                best = Some(Peak::new(ncc, dx, dy));
            }
        }
    }

    best.unwrap_or_else(Peak::invalid)
}

/// Indices of the `n` largest values in `data`, via partial selection
/// (no full sort), as `(row, col)`.
fn top_n_indices(data: &Array2<f64>, n: usize) -> Vec<(usize, usize)> {
    let (h, w) = data.dim();
    let mut flat: Vec<(f64, usize, usize)> = Vec::with_capacity(h * w);
    for row in 0..h {
        for col in 0..w {
            flat.push((data[[row, col]], row, col));
        }
    }
    let n = n.min(flat.len());
    if n == 0 {
        return Vec::new();
    }
    let k = flat.len() - n;
    flat.select_nth_unstable_by(k, |a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    flat[k..].iter().map(|&(_, r, c)| (r, c)).collect()
}

/// Disambiguate an FFT peak `(xc, yc)` into the 8 real-world translation
/// candidates valid for this edge's direction, preserving discovery order.
///
/// A west edge is a left-right pair: the primary (x) axis only takes its two
/// wrap-around magnitudes unsigned, while the orthogonal (y) jitter carries
/// the sign ambiguity. A north edge is the mirror image: y takes the
/// unsigned pair, x carries the sign ambiguity.
fn disambiguate(xc: i32, yc: i32, w: i32, h: i32, direction: Direction) -> Vec<(i32, i32)> {
    let wrap_x = w - xc;
    let wrap_y = h - yc;

    let mut seen = HashSet::with_capacity(8);
    let mut out = Vec::with_capacity(8);
    let mut push = |dx: i32, dy: i32| {
        if seen.insert((dx, dy)) {
            out.push((dx, dy));
        }
    };

    match direction {
        Direction::Horizontal => {
            for &dx in &[xc, wrap_x] {
                for &dy in &[yc, wrap_y, -yc, -wrap_y] {
                    push(dx, dy);
                }
            }
        }
        Direction::Vertical => {
            for &dy in &[yc, wrap_y] {
                for &dx in &[xc, wrap_x, -xc, -wrap_x] {
                    push(dx, dy);
                }
            }
        }
    }
    out
}

/// NCC of the overlapping sub-regions of `a` and `b` under translation
/// `(dx, dy)` from `a` to `b`. Shared by PCE disambiguation and the refiner's
/// hill climb.
pub fn ncc_overlap(a: &Array2<f32>, b: &Array2<f32>, dx: i32, dy: i32) -> f32 {
    let (h, w) = a.dim();
    let (hh, ww) = (h as i32, w as i32);
    if dx.abs() >= ww || dy.abs() >= hh {
        return INVALID_NCC;
    }

    let ax0 = dx.max(0);
    let ax1 = (ww + dx).min(ww);
    let ay0 = dy.max(0);
    let ay1 = (hh + dy).min(hh);

    let bx0 = (-dx).max(0);
    let bx1 = (ww - dx).min(ww);
    let by0 = (-dy).max(0);
    let by1 = (hh - dy).min(hh);

    let a_sub = a.slice(ndarray::s![ay0 as usize..ay1 as usize, ax0 as usize..ax1 as usize]);
    let b_sub = b.slice(ndarray::s![by0 as usize..by1 as usize, bx0 as usize..bx1 as usize]);

    let a_mean = a_sub.iter().copied().sum::<f32>() as f64 / a_sub.len().max(1) as f64;
    let b_mean = b_sub.iter().copied().sum::<f32>() as f64 / b_sub.len().max(1) as f64;

    let mut num = 0.0f64;
    let mut da = 0.0f64;
    let mut db = 0.0f64;
    for (av, bv) in a_sub.iter().zip(b_sub.iter()) {
        let ac = *av as f64 - a_mean;
        let bc = *bv as f64 - b_mean;
        num += ac * bc;
        da += ac * ac;
        db += bc * bc;
    }

    let denom = (da * db).sqrt();
    let ncc = if denom > 0.0 { (num / denom) as f32 } else { f32::NAN };
    if ncc.is_finite() {
        ncc
    } else {
        INVALID_NCC
    }
}
