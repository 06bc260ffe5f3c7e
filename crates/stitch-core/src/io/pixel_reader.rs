use std::path::Path;

use ndarray::Array2;

use crate::error::Result;
use crate::model::PixelReader;

/// Reads any format the `image` crate supports and normalizes it to
/// grayscale `[0, 1]`.
pub struct FsPixelReader;

impl PixelReader for FsPixelReader {
    fn read(&self, path: &Path) -> Result<Array2<f32>> {
        let img = image::open(path)?;
        let gray = img.to_luma16();
        let (w, h) = gray.dimensions();
        let mut data = Array2::<f32>::zeros((h as usize, w as usize));

        for row in 0..h as usize {
            for col in 0..w as usize {
                let pixel = gray.get_pixel(col as u32, row as u32);
                data[[row, col]] = pixel.0[0] as f32 / 65535.0;
            }
        }

        Ok(data)
    }
}
