//! Adaptive low-pass filtering of noisy tracking signals.
//!
//! [`OneEuroFilter`] smooths a fixed-dimension vector per component. The
//! cutoff of each component rises with the smoothed speed of that component,
//! so slow jitter is suppressed while fast motion is followed with little lag.
//!
//! Smoothed values live in a two-slot buffer: each update writes the inactive
//! slot from the active one and then flips the active index. The returned
//! slice borrows the filter, so it stays a stable snapshot until the caller
//! lets go of it and the next call can proceed.

use crate::util::math::smoothing_factor;
use crate::util::{TargetIdxError, TargetIdxResult};

/// Filter parameters, in the time unit of the caller's timestamps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterConfig {
    /// Cutoff frequency at zero speed. Must be positive.
    pub min_cutoff: f64,
    /// Cutoff increase per unit of smoothed speed. Must be non-negative.
    pub beta: f64,
    /// Cutoff used to smooth the derivative itself.
    pub d_cutoff: f64,
}

impl Default for FilterConfig {
    /// Defaults for millisecond timestamps.
    fn default() -> Self {
        Self {
            min_cutoff: 0.001,
            beta: 1000.0,
            d_cutoff: 0.001,
        }
    }
}

impl FilterConfig {
    fn validate(&self) -> TargetIdxResult<()> {
        if !self.min_cutoff.is_finite() || self.min_cutoff <= 0.0 {
            return Err(TargetIdxError::InvalidFilterConfig("min_cutoff must be positive"));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(TargetIdxError::InvalidFilterConfig("beta must be non-negative"));
        }
        if !self.d_cutoff.is_finite() || self.d_cutoff <= 0.0 {
            return Err(TargetIdxError::InvalidFilterConfig("d_cutoff must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct FilterState {
    slots: [Vec<f64>; 2],
    active: usize,
    dx_prev: Vec<f64>,
    t_prev: f64,
}

/// One-euro style adaptive smoothing filter.
#[derive(Clone, Debug)]
pub struct OneEuroFilter {
    cfg: FilterConfig,
    state: Option<FilterState>,
}

impl OneEuroFilter {
    /// Creates an uninitialized filter.
    pub fn new(cfg: FilterConfig) -> TargetIdxResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg, state: None })
    }

    /// Returns the filter parameters.
    pub fn config(&self) -> FilterConfig {
        self.cfg
    }

    /// Returns `true` once a first sample has been accepted.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Forgets all stored state; the next call behaves like the first one.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Filters sample `x` taken at time `t` and returns the smoothed value.
    ///
    /// The first sample is returned unchanged. A timestamp that does not
    /// advance returns the previous output and leaves the state untouched.
    pub fn filter(&mut self, t: f64, x: &[f64]) -> TargetIdxResult<&[f64]> {
        let cfg = self.cfg;
        let state = self.state.get_or_insert_with(|| FilterState {
            slots: [x.to_vec(), vec![0.0; x.len()]],
            active: 0,
            dx_prev: vec![0.0; x.len()],
            t_prev: t,
        });

        let expected = state.slots[state.active].len();
        if x.len() != expected {
            return Err(TargetIdxError::DimensionMismatch {
                expected,
                got: x.len(),
            });
        }

        let dt = t - state.t_prev;
        if dt > 0.0 {
            let a_d = smoothing_factor(dt, cfg.d_cutoff);
            let (first, second) = state.slots.split_at_mut(1);
            let (prev, next) = if state.active == 0 {
                (&first[0], &mut second[0])
            } else {
                (&second[0], &mut first[0])
            };
            for i in 0..x.len() {
                let dx = (x[i] - prev[i]) / dt;
                let dx_hat = a_d * dx + (1.0 - a_d) * state.dx_prev[i];
                let cutoff = cfg.min_cutoff + cfg.beta * dx_hat.abs();
                let a = smoothing_factor(dt, cutoff);
                next[i] = a * x[i] + (1.0 - a) * prev[i];
                state.dx_prev[i] = dx_hat;
            }
            state.active ^= 1;
            state.t_prev = t;
        }

        Ok(&state.slots[state.active])
    }
}
