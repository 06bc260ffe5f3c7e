//! Global positioner (GP): lays out absolute tile coordinates by traversing
//! a maximum spanning tree over the refined west/north Peaks.

use std::collections::HashSet;

use tracing::warn;

use crate::error::{Result, StitchError};
use crate::model::Grid;

/// One candidate expansion: `frontier` tile `f`, its unvisited neighbor `n`,
/// and the (dx, dy, ncc) of the edge between them, oriented `f -> n`.
struct Candidate {
    f: (usize, usize),
    n: (usize, usize),
    dx: i32,
    dy: i32,
    ncc: f32,
}

/// Cardinal neighbors of `(r, c)` that exist in an `H x W` grid, as
/// `(neighbor, dx, dy, ncc)` where `(dx, dy)` is the translation from `f` to
/// the neighbor and `ncc` is that edge's trust weight, or `None` if the edge
/// itself is absent (missing tile / no Peak).
fn cardinal_edges(grid: &Grid, r: usize, c: usize) -> Vec<((usize, usize), i32, i32, f32)> {
    let mut out = Vec::with_capacity(4);

    // North: (r-1, c) -> (r, c) is `tile.north_translation`.
    if r > 0 {
        if let Some(t) = grid.get(r, c) {
            if let Some(p) = t.north_translation {
                if p.ncc.is_finite() {
                    out.push(((r - 1, c), -p.x, -p.y, p.ncc));
                }
            }
        }
    }
    // South: (r, c) -> (r+1, c) is the south neighbor's north_translation.
    if r + 1 < grid.height() {
        if let Some(t) = grid.get(r + 1, c) {
            if let Some(p) = t.north_translation {
                if p.ncc.is_finite() {
                    out.push(((r + 1, c), p.x, p.y, p.ncc));
                }
            }
        }
    }
    // West: (r, c-1) -> (r, c) is `tile.west_translation`.
    if c > 0 {
        if let Some(t) = grid.get(r, c) {
            if let Some(p) = t.west_translation {
                if p.ncc.is_finite() {
                    out.push(((r, c - 1), -p.x, -p.y, p.ncc));
                }
            }
        }
    }
    // East: (r, c) -> (r, c+1) is the east neighbor's west_translation.
    if c + 1 < grid.width() {
        if let Some(t) = grid.get(r, c + 1) {
            if let Some(p) = t.west_translation {
                if p.ncc.is_finite() {
                    out.push(((r, c + 1), p.x, p.y, p.ncc));
                }
            }
        }
    }

    out
}

/// Raw in-grid cardinal neighbors of `(r, c)`, regardless of edge validity.
fn raw_neighbors(grid: &Grid, r: usize, c: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(4);
    if r > 0 && grid.get(r - 1, c).is_some() {
        out.push((r - 1, c));
    }
    if r + 1 < grid.height() && grid.get(r + 1, c).is_some() {
        out.push((r + 1, c));
    }
    if c > 0 && grid.get(r, c - 1).is_some() {
        out.push((r, c - 1));
    }
    if c + 1 < grid.width() && grid.get(r, c + 1).is_some() {
        out.push((r, c + 1));
    }
    out
}

/// Traverse the maximum spanning tree of the grid's cardinal-neighbor NCC
/// graph, writing `abs_x`/`abs_y` on every reachable tile. Unreachable
/// tiles (disconnected sub-grids) keep `abs = (0, 0)` and are logged.
pub fn execute(grid: &mut Grid) -> Result<()> {
    let total = grid.len();
    if total == 0 {
        return Ok(());
    }

    let mut release = vec![0i32; grid.height() * grid.width()];
    let key = |r: usize, c: usize| r * grid.width() + c;
    for (r, c) in grid.iter_coords() {
        if grid.get(r, c).is_none() {
            continue;
        }
        let mut count = 0;
        if r > 0 && grid.get(r - 1, c).is_some() {
            count += 1;
        }
        if r + 1 < grid.height() && grid.get(r + 1, c).is_some() {
            count += 1;
        }
        if c > 0 && grid.get(r, c - 1).is_some() {
            count += 1;
        }
        if c + 1 < grid.width() && grid.get(r, c + 1).is_some() {
            count += 1;
        }
        release[key(r, c)] = count;
    }

    // Seed: the tile maximizing max(west.ncc, north.ncc) over finite values.
    let seed = grid
        .iter_coords()
        .filter(|&(r, c)| grid.get(r, c).is_some())
        .filter_map(|(r, c)| {
            let t = grid.get(r, c).unwrap();
            let best = [t.west_translation, t.north_translation]
                .into_iter()
                .flatten()
                .map(|p| p.ncc)
                .filter(|v| v.is_finite())
                .fold(f32::MIN, f32::max);
            if best.is_finite() {
                Some(((r, c), best))
            } else {
                None
            }
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(pos, _)| pos)
        .ok_or(StitchError::NoSeedTile)?;

    let mut visited: HashSet<(usize, usize)> = HashSet::new();
    let mut frontier: HashSet<(usize, usize)> = HashSet::new();

    {
        let t = grid.get_mut(seed.0, seed.1).unwrap();
        t.abs_x = 0;
        t.abs_y = 0;
    }
    visited.insert(seed);
    frontier.insert(seed);
    for n in raw_neighbors(grid, seed.0, seed.1) {
        release[key(n.0, n.1)] -= 1;
    }

    let mut mst_size = 1usize;

    while mst_size < total {
        let mut best: Option<Candidate> = None;
        for &f in &frontier {
            for (n, dx, dy, ncc) in cardinal_edges(grid, f.0, f.1) {
                if visited.contains(&n) {
                    continue;
                }
                let better = match &best {
                    Some(b) => ncc > b.ncc,
                    None => true,
                };
                if better {
                    best = Some(Candidate { f, n, dx, dy, ncc });
                }
            }
        }

        let Some(candidate) = best else {
            break;
        };

        let (fx, fy) = {
            let t = grid.get(candidate.f.0, candidate.f.1).unwrap();
            (t.abs_x, t.abs_y)
        };
        {
            let t = grid.get_mut(candidate.n.0, candidate.n.1).unwrap();
            t.abs_x = fx + candidate.dx;
            t.abs_y = fy + candidate.dy;
        }

        visited.insert(candidate.n);
        frontier.insert(candidate.n);
        mst_size += 1;
        for n in raw_neighbors(grid, candidate.n.0, candidate.n.1) {
            release[key(n.0, n.1)] -= 1;
        }

        frontier.retain(|&t| release[key(t.0, t.1)] > 0);
    }

    if mst_size < total {
        warn!(visited = mst_size, total, "global positioning left a disconnected sub-grid at the origin");
    }

    let (min_x, min_y) = grid
        .iter()
        .fold((i32::MAX, i32::MAX), |(mx, my), t| (mx.min(t.abs_x), my.min(t.abs_y)));
    if min_x != i32::MAX {
        for (r, c) in grid.iter_coords() {
            if let Some(t) = grid.get_mut(r, c) {
                t.abs_x -= min_x;
                t.abs_y -= min_y;
            }
        }
    }

    if mst_size < total {
        return Err(StitchError::Disconnected { visited: mst_size, total });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use ndarray::Array2;

    use crate::error::Result as StitchResult;
    use crate::model::{Peak, PixelReader, Tile};

    use super::*;

    struct BlankReader;
    impl PixelReader for BlankReader {
        fn read(&self, _path: &std::path::Path) -> StitchResult<Array2<f32>> {
            Ok(Array2::zeros((4, 4)))
        }
    }

    fn grid_2x2(overlap: i32) -> Grid {
        let reader: Arc<dyn PixelReader> = Arc::new(BlankReader);
        let mut tiles = Vec::new();
        for r in 0..2 {
            for c in 0..2 {
                let mut tile = Tile::new(r, c, format!("{r}_{c}"), PathBuf::from("x.tif"), reader.clone(), true);
                if c > 0 {
                    tile.west_translation = Some(Peak::new(0.9, overlap, 0));
                }
                if r > 0 {
                    tile.north_translation = Some(Peak::new(0.9, 0, overlap));
                }
                tiles.push(Some(tile));
            }
        }
        Grid::from_tiles(2, 2, tiles)
    }

    #[test]
    fn origin_is_translated_to_zero() {
        let mut grid = grid_2x2(30);
        execute(&mut grid).unwrap();
        let min_x = grid.iter().map(|t| t.abs_x).min().unwrap();
        let min_y = grid.iter().map(|t| t.abs_y).min().unwrap();
        assert_eq!(min_x, 0);
        assert_eq!(min_y, 0);
    }

    #[test]
    fn every_tile_is_visited_once() {
        let mut grid = grid_2x2(30);
        execute(&mut grid).unwrap();
        assert_eq!(grid.iter().count(), 4);
    }
}
