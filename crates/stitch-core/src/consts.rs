/// Minimum pixel count (h*w) to use row/column-level Rayon parallelism inside the FFT.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum edge count to use Rayon parallelism across PCE/RF tasks.
pub const PARALLEL_EDGE_THRESHOLD: usize = 4;

/// Floor applied to cross-power-spectrum magnitudes before normalizing.
pub const EPSILON: f64 = 1e-16;

/// Threshold below which the NCC of an overlap is replaced by `-1.0`.
pub const INVALID_NCC: f32 = -1.0;

/// Consecutive failed restarts before the MLE hill climb gives up and reports its best point.
pub const STABLE_ITERATIONS: usize = 20;

/// Resolution of the MLE likelihood cache along each of (pi, mu, sigma).
pub const MLE_CACHE_DIM: usize = 100;

/// Bonus added to a refined edge's NCC when the pre-refinement Peak was already trusted
/// (finite NCC). Preserved bit-exact: downstream MST selection depends on the constant.
pub const NCC_TRUST_BONUS: f32 = 3.0;

/// Repeatability value above which the stage model warns about unusually large jitter.
pub const REPEATABILITY_WARN_THRESHOLD: f32 = 10.0;

/// Default number of top FFT phase-correlation peaks considered per edge.
pub const DEFAULT_NUM_FFT_PEAKS: usize = 2;

/// Default number of random-restart hill climbs in `MULTIPOINTHILLCLIMB` mode.
pub const DEFAULT_NUM_HILL_CLIMBS: usize = 16;

/// Default overlap uncertainty, in percent of image dimension.
pub const DEFAULT_OVERLAP_UNCERTAINTY: f32 = 3.0;

/// Default minimum NCC for an edge to be considered valid.
pub const DEFAULT_VALID_CORRELATION_THRESHOLD: f32 = 0.5;
