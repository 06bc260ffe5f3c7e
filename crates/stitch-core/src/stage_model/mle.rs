//! Maximum-likelihood estimation of the true stage overlap on one axis.
//!
//! Translations are modeled as a mixture of a uniform background and a
//! truncated Gaussian, both measured in percent of the image extent. Search
//! is an integer-resolution hill climb over `(pi, mu, sigma)` with a dense
//! memoization cache, restarted from random points until the global best
//! stops improving.

use ndarray::Array3;
use rand::Rng;

use crate::consts::{MLE_CACHE_DIM, STABLE_ITERATIONS};

const MOVES: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

fn is_valid(pi: i32, mu: i32, sigma: i32) -> bool {
    (0..MLE_CACHE_DIM as i32).contains(&pi) && (1..MLE_CACHE_DIM as i32).contains(&mu) && (1..MLE_CACHE_DIM as i32).contains(&sigma)
}

fn log_likelihood(pi: i32, mu: i32, sigma: i32, samples_pct: &[f32]) -> f32 {
    let p = pi as f64 / 100.0;
    let mu = mu as f64;
    let sigma = sigma as f64;
    let norm = (2.0 * std::f64::consts::PI).sqrt() * sigma;

    let mut sum = 0.0f64;
    for &t in samples_pct {
        let z = (t as f64 - mu) / sigma;
        let gauss = (-0.5 * z * z).exp() / norm;
        let mixture = p + (1.0 - p) * gauss;
        sum += mixture.abs().ln();
    }
    sum as f32
}

struct Cache {
    data: Array3<f32>,
}

impl Cache {
    fn new() -> Self {
        Self {
            data: Array3::from_elem((MLE_CACHE_DIM, MLE_CACHE_DIM, MLE_CACHE_DIM), f32::NAN),
        }
    }

    fn get_or_compute(&mut self, pi: i32, mu: i32, sigma: i32, samples_pct: &[f32]) -> f32 {
        let idx = [pi as usize, mu as usize, sigma as usize];
        let cached = self.data[idx];
        if cached.is_nan() {
            let ll = log_likelihood(pi, mu, sigma, samples_pct);
            self.data[idx] = ll;
            ll
        } else {
            cached
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Point {
    pi: i32,
    mu: i32,
    sigma: i32,
    likelihood: f32,
}

fn hill_climb(start: (i32, i32, i32), cache: &mut Cache, samples_pct: &[f32]) -> Point {
    let (mut pi, mut mu, mut sigma) = start;
    let mut likelihood = cache.get_or_compute(pi, mu, sigma, samples_pct);

    loop {
        // Evaluate all 6 neighbors of this iteration's starting point, then
        // take at most one step -- to the single strictly-best improving
        // neighbor. Mutating (pi, mu, sigma) mid-pass would let a later move
        // in MOVES see the earlier move's result and walk more than one axis
        // per iteration.
        let mut step: Option<(i32, i32, i32, f32)> = None;
        for &(dp, dm, ds) in &MOVES {
            let (np, nm, ns) = (pi + dp, mu + dm, sigma + ds);
            if !is_valid(np, nm, ns) {
                continue;
            }
            let ll = cache.get_or_compute(np, nm, ns, samples_pct);
            let improves_on_current_best = match step {
                Some((_, _, _, best)) => ll > best,
                None => true,
            };
            if ll > likelihood && improves_on_current_best {
                step = Some((np, nm, ns, ll));
            }
        }
        match step {
            Some((np, nm, ns, ll)) => {
                pi = np;
                mu = nm;
                sigma = ns;
                likelihood = ll;
            }
            None => break,
        }
    }

    Point { pi, mu, sigma, likelihood }
}

fn random_start(rng: &mut impl Rng) -> (i32, i32, i32) {
    (
        rng.random_range(0..MLE_CACHE_DIM as i32),
        rng.random_range(1..MLE_CACHE_DIM as i32),
        rng.random_range(1..MLE_CACHE_DIM as i32),
    )
}

/// Infer `mu*` (the overlap complement, in percent) from a set of raw pixel
/// translations already restricted to `(1, dim - 1)`. Panics if `samples_px`
/// is empty -- callers are expected to check for that per-axis first.
pub fn infer_mu_percent(samples_px: &[f32], dim: f32) -> f32 {
    assert!(!samples_px.is_empty(), "infer_mu_percent requires at least one sample");
    let samples_pct: Vec<f32> = samples_px.iter().map(|&v| v / dim * 100.0).collect();

    let mut cache = Cache::new();
    let mut rng = rand::rng();

    let mut best = hill_climb(random_start(&mut rng), &mut cache, &samples_pct);
    let mut stable = 0usize;

    while stable < STABLE_ITERATIONS {
        let candidate = hill_climb(random_start(&mut rng), &mut cache, &samples_pct);
        if candidate.likelihood > best.likelihood {
            best = candidate;
            stable = 0;
        } else {
            stable += 1;
        }
    }

    best.mu as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_overlap_from_tight_cluster() {
        // All samples near 30% of a 1000px dimension -> mu* should land near 30.
        let samples: Vec<f32> = (0..40).map(|i| 295.0 + (i % 11) as f32).collect();
        let mu = infer_mu_percent(&samples, 1000.0);
        assert!((20.0..40.0).contains(&mu), "mu = {mu}");
    }

    #[test]
    fn does_not_diverge_on_a_single_unique_value() {
        let mu = infer_mu_percent(&[300.0], 1000.0);
        assert!(mu.is_finite());
        assert!((1.0..100.0).contains(&mu));
    }
}
