//! Convergence tracking & tolerance checks for iterative solvers.

use num_traits::Float;

/// Stopping criteria.
///
/// The total tolerance `ttol = max(atol, rtol · ‖r₀‖)` is fixed from the
/// first residual norm of a solve and reused by every restart cycle.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub max_iters: usize,
}

impl<T: Float> Convergence<T> {
    /// Total tolerance for an initial residual norm `res0_norm`.
    pub fn target(&self, res0_norm: T) -> T {
        let rtol = self.rtol * res0_norm;
        if self.atol > rtol { self.atol } else { rtol }
    }

    /// Default test: converged once `res_norm <= ttol`.
    pub fn check(&self, res_norm: T, ttol: T) -> bool {
        res_norm <= ttol
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.rtol >= T::zero()) {
            return Err("relative tolerance must be non-negative".into());
        }
        if !(self.atol >= T::zero()) {
            return Err("absolute tolerance must be non-negative".into());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats<T> {
    /// Inner iterations summed over all cycles.
    pub iterations: usize,
    /// Last residual estimate (preconditioned norm for left preconditioning).
    pub final_residual: T,
    pub converged: bool,
    /// Number of cycles after the first.
    pub restarts: usize,
}

/// Bounded residual history.
///
/// Entries are written by iteration index; writes past the capacity are
/// dropped silently.
#[derive(Clone, Debug, Default)]
pub struct ResidualHistory<T> {
    buf: Vec<T>,
    capacity: usize,
    len: usize,
}

impl<T: Float> ResidualHistory<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: vec![T::zero(); capacity], capacity, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    pub(crate) fn record(&mut self, index: usize, res: T) {
        if index < self.capacity {
            self.buf[index] = res;
        }
    }

    /// Mark entries `0..=last` as valid, clipped to the capacity.
    pub(crate) fn finish(&mut self, last: usize) {
        self.len = self.capacity.min(last + 1);
    }

    /// Number of valid entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buf[..self.len]
    }
}
