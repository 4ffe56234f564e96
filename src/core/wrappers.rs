//! Trait implementations for `faer` dense operators and `Vec<T>` vectors.
//!
//! These make the generic GMRES engine usable on plain dense data. Reductions and the element-wise
//! vector kernels run on the rayon pool when the `rayon` feature is enabled.

use crate::core::traits::{Indexing, InnerProduct, MatVec, Vector};
use faer::{Mat, MatRef};
use num_traits::Float;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// `y = A x` for an owned dense matrix.
impl<T: Float> MatVec<Vec<T>> for Mat<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        self.as_ref().matvec(x, y);
    }
}

/// `y = A x` for a borrowed dense matrix, accumulated column by column to
/// follow faer's column-major layout.
impl<'a, T: Float> MatVec<Vec<T>> for MatRef<'a, T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.nrows(), y.len(), "operator rows and output length differ");
        assert_eq!(self.ncols(), x.len(), "operator columns and input length differ");
        y.iter_mut().for_each(|yi| *yi = T::zero());
        for (j, &xj) in x.iter().enumerate() {
            if xj == T::zero() {
                continue;
            }
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = *yi + self[(i, j)] * xj;
            }
        }
    }
}

/// Sum of `f(i)` over `0..n`, split across the rayon pool when enabled.
fn reduce_sum<T, F>(n: usize, f: F) -> T
where
    T: Float + Send + Sync,
    F: Fn(usize) -> T + Send + Sync,
{
    #[cfg(feature = "rayon")]
    {
        (0..n).into_par_iter().map(f).reduce(T::zero, |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..n).map(f).fold(T::zero(), |acc, v| acc + v)
    }
}

/// Euclidean inner product on `Vec<T>`; the unit type carries no state.
impl<T: Float + From<f64> + Send + Sync> InnerProduct<Vec<T>> for () {
    type Scalar = T;

    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        assert_eq!(x.len(), y.len(), "dot of vectors with different lengths");
        reduce_sum(x.len(), |i| x[i] * y[i])
    }

    fn norm(&self, x: &Vec<T>) -> T {
        reduce_sum(x.len(), |i| x[i] * x[i]).sqrt()
    }
}

/// Dense `Vec<T>` as a Krylov vector.
impl<T: Float + Send + Sync> Vector for Vec<T> {
    type Scalar = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn duplicate(&self) -> Self {
        vec![T::zero(); self.as_slice().len()]
    }

    fn set(&mut self, alpha: T) {
        self.iter_mut().for_each(|xi| *xi = alpha);
    }

    fn copy_from(&mut self, x: &Self) {
        assert_eq!(self.as_slice().len(), x.len(), "Vectors must have the same length");
        self.copy_from_slice(x);
    }

    fn scale(&mut self, alpha: T) {
        #[cfg(feature = "rayon")]
        self.par_iter_mut().for_each(|xi| *xi = *xi * alpha);
        #[cfg(not(feature = "rayon"))]
        self.iter_mut().for_each(|xi| *xi = *xi * alpha);
    }

    fn axpy(&mut self, alpha: T, x: &Self) {
        assert_eq!(self.as_slice().len(), x.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        self.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, xi)| *yi = *yi + alpha * *xi);
        #[cfg(not(feature = "rayon"))]
        self.iter_mut()
            .zip(x.iter())
            .for_each(|(yi, xi)| *yi = *yi + alpha * *xi);
    }

    /// One sweep over the entries instead of one axpy per basis vector.
    fn maxpy(&mut self, alphas: &[T], xs: &[Self]) {
        assert_eq!(alphas.len(), xs.len(), "Coefficient and vector counts differ");
        let update = |(i, yi): (usize, &mut T)| {
            let mut acc = *yi;
            for (alpha, x) in alphas.iter().zip(xs) {
                acc = acc + *alpha * x[i];
            }
            *yi = acc;
        };
        #[cfg(feature = "rayon")]
        self.par_iter_mut().enumerate().for_each(update);
        #[cfg(not(feature = "rayon"))]
        self.iter_mut().enumerate().for_each(update);
    }
}

/// Row count of a dense operator, used by preconditioner set-up.
impl<T> Indexing for Mat<T> {
    fn nrows(&self) -> usize {
        self.nrows()
    }
}
