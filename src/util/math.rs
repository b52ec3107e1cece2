//! Numeric helpers shared by the pipeline and the filter.

use std::f64::consts::PI;

/// Exponential smoothing factor `r / (r + 1)` with `r = 2 * pi * cutoff * dt`.
///
/// No clamping is applied; for non-negative `r` the value lies in `[0, 1)`.
#[inline]
pub(crate) fn smoothing_factor(dt: f64, cutoff: f64) -> f64 {
    let r = 2.0 * PI * cutoff * dt;
    r / (r + 1.0)
}

/// Hamming distance between two packed binary descriptors.
///
/// Descriptors of different length are compared over the shared prefix;
/// missing words count as fully different.
pub(crate) fn hamming(a: &[u32], b: &[u32]) -> u32 {
    let shared: u32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    let extra = a.len().abs_diff(b.len()) as u32 * u32::BITS;
    shared + extra
}

/// Scales a dimension and rounds to the nearest pixel, keeping at least one.
#[inline]
pub(crate) fn scaled_dim(dim: usize, scale: f32) -> usize {
    ((dim as f32 * scale).round() as usize).max(1)
}

/// Small deterministic generator for sampling patterns and medoid seeds.
#[derive(Clone, Debug)]
pub(crate) struct Lcg {
    state: u64,
}

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.state >> 33) as u32
    }

    /// Uniform integer in `0..bound`; `bound` must be non-zero.
    pub(crate) fn next_below(&mut self, bound: usize) -> usize {
        ((u64::from(self.next_u32()) * bound as u64) >> 31) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{hamming, scaled_dim, smoothing_factor, Lcg};

    #[test]
    fn lcg_is_deterministic_and_bounded() {
        let mut a = Lcg::new(7);
        let mut b = Lcg::new(7);
        for _ in 0..100 {
            let v = a.next_below(13);
            assert_eq!(v, b.next_below(13));
            assert!(v < 13);
        }
    }

    #[test]
    fn smoothing_factor_matches_formula() {
        let dt = 16.0;
        let cutoff = 0.001;
        let r = 2.0 * std::f64::consts::PI * cutoff * dt;
        assert!((smoothing_factor(dt, cutoff) - r / (r + 1.0)).abs() < 1e-15);
        assert_eq!(smoothing_factor(0.0, 1.0), 0.0);
        assert!(smoothing_factor(1e9, 1.0) < 1.0);
    }

    #[test]
    fn hamming_counts_bits() {
        assert_eq!(hamming(&[0b1011], &[0b0001]), 2);
        assert_eq!(hamming(&[u32::MAX, 0], &[0, 0]), 32);
        assert_eq!(hamming(&[0], &[0, 0]), 32);
    }

    #[test]
    fn scaled_dim_never_collapses() {
        assert_eq!(scaled_dim(100, 0.5), 50);
        assert_eq!(scaled_dim(3, 0.1), 1);
        assert_eq!(scaled_dim(10, 0.25), 3);
    }
}
