//! Text output writers, byte-for-byte compatible line formats (spec section 6).

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::model::Grid;

/// Write one `west, <name>, <neighbor>, <ncc:.10f>, <x>, <y>` line per west
/// edge and one analogous `north, ...` line per north edge, in row-major order.
pub fn write_relative_positions(grid: &Grid, path: &Path) -> Result<()> {
    let mut out = std::fs::File::create(path)?;
    for (r, c) in grid.iter_coords() {
        let Some(tile) = grid.get(r, c) else { continue };
        if let Some(west) = grid.west_of(r, c) {
            if let Some(p) = tile.west_translation {
                writeln!(out, "west, {}, {}, {:.10}, {}, {}", tile.name, west.name, p.ncc, p.x, p.y)?;
            }
        }
        if let Some(north) = grid.north_of(r, c) {
            if let Some(p) = tile.north_translation {
                writeln!(out, "north, {}, {}, {:.10}, {}, {}", tile.name, north.name, p.ncc, p.x, p.y)?;
            }
        }
    }
    Ok(())
}

/// Write one `file: <name>; corr: <ncc:.10f>; position: (<x>, <y>); grid: (<c>, <r>);`
/// line per tile, in row-major order. `corr` is the best of the tile's two
/// incoming edge NCCs, or -1.0 for a tile with neither (e.g. the MST seed).
pub fn write_global_positions(grid: &Grid, path: &Path) -> Result<()> {
    let mut out = std::fs::File::create(path)?;
    for (r, c) in grid.iter_coords() {
        let Some(tile) = grid.get(r, c) else { continue };
        let corr = [tile.west_translation, tile.north_translation]
            .into_iter()
            .flatten()
            .map(|p| p.ncc)
            .filter(|v| v.is_finite())
            .fold(f32::MIN, f32::max);
        let corr = if corr.is_finite() { corr } else { -1.0 };
        writeln!(
            out,
            "file: {}; corr: {:.10}; position: ({}, {}); grid: ({}, {});",
            tile.name, corr, tile.abs_x, tile.abs_y, c, r
        )?;
    }
    Ok(())
}
