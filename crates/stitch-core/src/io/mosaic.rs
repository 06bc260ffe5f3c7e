//! Optional stitched-mosaic assembly: a plain nearest-position blit with no
//! feathering or blending (radiometric correction is out of scope).

use std::path::Path;

use image::{ImageBuffer, Luma};

use crate::error::Result;
use crate::model::Grid;

/// Blit every tile's pixels at its `(abs_x, abs_y)` into one canvas sized to
/// the union of all tile footprints, later tiles (row-major order)
/// overwriting earlier ones where they overlap, then save as 16-bit TIFF.
pub fn write_mosaic(grid: &Grid, path: &Path) -> Result<()> {
    let (tile_h, tile_w) = grid.image_shape()?;

    let (mut max_x, mut max_y) = (0i32, 0i32);
    for tile in grid.iter() {
        max_x = max_x.max(tile.abs_x + tile_w as i32);
        max_y = max_y.max(tile.abs_y + tile_h as i32);
    }
    let (canvas_w, canvas_h) = (max_x.max(0) as u32, max_y.max(0) as u32);

    let mut canvas = ImageBuffer::<Luma<u16>, Vec<u16>>::new(canvas_w.max(1), canvas_h.max(1));

    for (r, c) in grid.iter_coords() {
        let Some(tile) = grid.get(r, c) else { continue };
        let pixels = tile.pixels()?;
        let (ox, oy) = (tile.abs_x, tile.abs_y);
        for row in 0..tile_h {
            for col in 0..tile_w {
                let (cx, cy) = (ox + col as i32, oy + row as i32);
                if cx < 0 || cy < 0 || cx as u32 >= canvas_w || cy as u32 >= canvas_h {
                    continue;
                }
                let val = (pixels[[row, col]].clamp(0.0, 1.0) * 65535.0) as u16;
                canvas.put_pixel(cx as u32, cy as u32, Luma([val]));
            }
        }
    }

    canvas.save(path)?;
    Ok(())
}
