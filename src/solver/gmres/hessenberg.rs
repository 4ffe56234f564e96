//! Hessenberg storage, Givens-rotation QR update and triangular solve.
//!
//! Column `j` of the Hessenberg matrix is written by the orthogonalization of
//! inner iteration `j`. Two copies are kept: `hh`, reduced in place to upper
//! triangular form by the rotations, and `hes`, the untouched Hessenberg
//! matrix. `rs` is the right-hand side of the least-squares problem
//! (`‖r‖ e₁` rotated along with `hh`), and `cc`/`ss` hold one rotation per
//! eliminated sub-diagonal entry.

use num_traits::Float;

use crate::error::KError;

pub(crate) fn try_zeroed<T: Float>(len: usize, what: &'static str) -> Result<Vec<T>, KError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|source| KError::Allocation { what, source })?;
    v.resize(len, T::zero());
    Ok(v)
}

#[derive(Debug, Clone)]
pub struct Hessenberg<T> {
    max_k: usize,
    /// (max_k + 2) × (max_k + 1), column-major.
    hh: Vec<T>,
    /// (max_k + 1) × (max_k + 1), column-major.
    hes: Vec<T>,
    rs: Vec<T>,
    cc: Vec<T>,
    ss: Vec<T>,
}

impl<T: Float> Hessenberg<T> {
    pub fn new(max_k: usize) -> Result<Self, KError> {
        Ok(Self {
            max_k,
            hh: try_zeroed((max_k + 2) * (max_k + 1), "Hessenberg matrix")?,
            hes: try_zeroed((max_k + 1) * (max_k + 1), "Hessenberg copy")?,
            rs: try_zeroed(max_k + 2, "residual projections")?,
            cc: try_zeroed(max_k + 1, "rotation cosines")?,
            ss: try_zeroed(max_k + 1, "rotation sines")?,
        })
    }

    pub fn max_k(&self) -> usize {
        self.max_k
    }

    #[inline]
    fn hh_at(&self, i: usize, j: usize) -> usize {
        j * (self.max_k + 2) + i
    }

    #[inline]
    fn hes_at(&self, i: usize, j: usize) -> usize {
        j * (self.max_k + 1) + i
    }

    /// Entry of the (partially) triangularized matrix.
    pub fn hh(&self, i: usize, j: usize) -> T {
        self.hh[self.hh_at(i, j)]
    }

    /// Entry of the original Hessenberg matrix.
    pub fn hes(&self, i: usize, j: usize) -> T {
        self.hes[self.hes_at(i, j)]
    }

    /// Write `v` at (i, j) in both copies.
    pub fn set_entry(&mut self, i: usize, j: usize, v: T) {
        let (a, b) = (self.hh_at(i, j), self.hes_at(i, j));
        self.hh[a] = v;
        self.hes[b] = v;
    }

    /// Add `v` at (i, j) in both copies.
    pub fn add_to_entry(&mut self, i: usize, j: usize, v: T) {
        let (a, b) = (self.hh_at(i, j), self.hes_at(i, j));
        self.hh[a] = self.hh[a] + v;
        self.hes[b] = self.hes[b] + v;
    }

    pub fn rs(&self, i: usize) -> T {
        self.rs[i]
    }

    pub fn set_rs(&mut self, i: usize, v: T) {
        self.rs[i] = v;
    }

    /// Rotation `(c, s)` that eliminated the sub-diagonal of column `j`.
    pub fn rotation(&self, j: usize) -> (T, T) {
        (self.cc[j], self.ss[j])
    }

    /// Zero everything for a new cycle.
    pub fn reset(&mut self) {
        for buf in [&mut self.hh, &mut self.hes, &mut self.rs, &mut self.cc, &mut self.ss] {
            buf.iter_mut().for_each(|x| *x = T::zero());
        }
    }

    /// Fold column `it` into the triangular factor.
    ///
    /// Applies the rotations of columns `0..it` to the new column, then builds
    /// the rotation that annihilates `hh[it+1, it]` and applies it to the
    /// column and to `rs`. Returns `|rs[it+1]|`, the new residual-norm
    /// estimate.
    pub fn update(&mut self, it: usize) -> T {
        let base = self.hh_at(0, it);
        let col = &mut self.hh[base..base + it + 2];
        for j in 0..it {
            let (c, s) = (self.cc[j], self.ss[j]);
            let tt = col[j];
            col[j] = c * tt + s * col[j + 1];
            col[j + 1] = c * col[j + 1] - s * tt;
        }

        let (h, h1) = (col[it], col[it + 1]);
        let tt = h.hypot(h1);
        // A zero column leaves the residual unchanged: swap it into rs[it+1].
        let (c, s) = if tt == T::zero() { (T::zero(), T::one()) } else { (h / tt, h1 / tt) };
        self.cc[it] = c;
        self.ss[it] = s;
        self.rs[it + 1] = -(s * self.rs[it]);
        self.rs[it] = c * self.rs[it];
        col[it] = c * h + s * h1;
        col[it + 1] = T::zero();
        self.rs[it + 1].abs()
    }

    /// Back-substitution on `hh[0..=it, 0..=it] · y = rs[0..=it]`.
    ///
    /// A zero pivot gives a zero coefficient for that column. Returns the
    /// number of zero pivots met.
    pub fn solve_triangular(&self, it: usize, y: &mut [T]) -> usize {
        let mut zero_pivots = 0;
        for k in (0..=it).rev() {
            let mut tt = self.rs[k];
            for j in (k + 1)..=it {
                tt = tt - self.hh(k, j) * y[j];
            }
            let pivot = self.hh(k, k);
            if pivot == T::zero() {
                y[k] = T::zero();
                zero_pivots += 1;
            } else {
                y[k] = tt / pivot;
            }
        }
        zero_pivots
    }
}
