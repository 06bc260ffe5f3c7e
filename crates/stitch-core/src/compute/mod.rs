pub mod fft;

pub use fft::{fft2d_forward, ifft2d_inverse};
