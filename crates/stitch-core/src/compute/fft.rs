use ndarray::Array2;
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// 2D forward FFT, row transform then column transform, Rayon-parallel
/// across rows/columns once the image is large enough to pay for it.
pub fn fft2d_forward(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = Array2::<Complex<f64>>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            result[[row, col]] = Complex::new(data[[row, col]] as f64, 0.0);
        }
    }

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        fft2d_forward_parallel(&mut result, &fft_row, &fft_col, h, w);
    } else {
        fft2d_forward_sequential(&mut result, &fft_row, &fft_col, h, w);
    }

    result
}

fn fft2d_forward_parallel(
    result: &mut Array2<Complex<f64>>,
    fft_row: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    fft_col: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    h: usize,
    w: usize,
) {
    use rayon::prelude::*;

    let processed_rows: Vec<Vec<Complex<f64>>> = (0..h)
        .into_par_iter()
        .map(|row| {
            let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| result[[row, c]]).collect();
            fft_row.process(&mut row_data);
            row_data
        })
        .collect();
    for (row, row_data) in processed_rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }

    let processed_cols: Vec<Vec<Complex<f64>>> = (0..w)
        .into_par_iter()
        .map(|col| {
            let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| result[[r, col]]).collect();
            fft_col.process(&mut col_data);
            col_data
        })
        .collect();
    for (col, col_data) in processed_cols.into_iter().enumerate() {
        for (row, val) in col_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }
}

fn fft2d_forward_sequential(
    result: &mut Array2<Complex<f64>>,
    fft_row: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    fft_col: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    h: usize,
    w: usize,
) {
    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| result[[row, c]]).collect();
        fft_row.process(&mut row_data);
        for col in 0..w {
            result[[row, col]] = row_data[col];
        }
    }
    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| result[[r, col]]).collect();
        fft_col.process(&mut col_data);
        for row in 0..h {
            result[[row, col]] = col_data[row];
        }
    }
}

/// 2D inverse FFT, returning the real part normalized by `1/(h*w)`.
pub fn ifft2d_inverse(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        ifft2d_inverse_parallel(&mut work, &ifft_row, &ifft_col, h, w);
    } else {
        ifft2d_inverse_sequential(&mut work, &ifft_row, &ifft_col, h, w);
    }

    let scale = 1.0 / (h * w) as f64;
    let mut result = Array2::<f64>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            result[[row, col]] = work[[row, col]].re * scale;
        }
    }

    result
}

fn ifft2d_inverse_parallel(
    work: &mut Array2<Complex<f64>>,
    ifft_row: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    ifft_col: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    h: usize,
    w: usize,
) {
    use rayon::prelude::*;

    let processed_cols: Vec<Vec<Complex<f64>>> = (0..w)
        .into_par_iter()
        .map(|col| {
            let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| work[[r, col]]).collect();
            ifft_col.process(&mut col_data);
            col_data
        })
        .collect();
    for (col, col_data) in processed_cols.into_iter().enumerate() {
        for (row, val) in col_data.into_iter().enumerate() {
            work[[row, col]] = val;
        }
    }

    let processed_rows: Vec<Vec<Complex<f64>>> = (0..h)
        .into_par_iter()
        .map(|row| {
            let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| work[[row, c]]).collect();
            ifft_row.process(&mut row_data);
            row_data
        })
        .collect();
    for (row, row_data) in processed_rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            work[[row, col]] = val;
        }
    }
}

fn ifft2d_inverse_sequential(
    work: &mut Array2<Complex<f64>>,
    ifft_row: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    ifft_col: &std::sync::Arc<dyn rustfft::Fft<f64>>,
    h: usize,
    w: usize,
) {
    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| work[[r, col]]).collect();
        ifft_col.process(&mut col_data);
        for row in 0..h {
            work[[row, col]] = col_data[row];
        }
    }
    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| work[[row, c]]).collect();
        ifft_row.process(&mut row_data);
        for col in 0..w {
            work[[row, col]] = row_data[col];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trips_a_constant_image() {
        let data = Array2::<f32>::from_elem((8, 8), 1.0);
        let spectrum = fft2d_forward(&data);
        let back = ifft2d_inverse(&spectrum);
        for v in back.iter() {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn impulse_spreads_energy_evenly_in_frequency_domain() {
        let mut data = Array2::<f32>::zeros((16, 16));
        data[[0, 0]] = 1.0;
        let spectrum = fft2d_forward(&data);
        for v in spectrum.iter() {
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-9);
        }
    }
}
