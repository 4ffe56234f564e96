// Jacobi preconditioner implementation

use crate::core::traits::{Indexing, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use num_traits::Float;

/// Jacobi preconditioner: M⁻¹ = D⁻¹
#[derive(Debug, Clone)]
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
}

impl<T: Float> Jacobi<T> {
    /// new with empty state; user must call `setup`.
    pub fn new() -> Self {
        Self { inv_diag: Vec::new() }
    }

    /// Build directly from a known diagonal.
    pub fn from_diagonal(diag: &[T]) -> Result<Self, KError> {
        Ok(Self { inv_diag: invert_diagonal(diag)? })
    }

    /// The stored D⁻¹ entries.
    pub fn inv_diag(&self) -> &[T] {
        &self.inv_diag
    }
}

impl<T: Float> Default for Jacobi<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn invert_diagonal<T: Float>(diag: &[T]) -> Result<Vec<T>, KError> {
    diag.iter()
        .enumerate()
        .map(|(i, &d)| if d == T::zero() { Err(KError::ZeroPivot(i)) } else { Ok(T::one() / d) })
        .collect()
}

impl<M, V, T> Preconditioner<M, V> for Jacobi<T>
where
    M: MatVec<V> + Indexing,
    V: AsRef<[T]> + AsMut<[T]> + From<Vec<T>>,
    T: Float + Send + Sync,
{
    /// Probe the diagonal with unit vectors so any `MatVec` operator works.
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        let n = a.nrows();
        let mut diag = vec![T::zero(); n];
        let mut e = V::from(vec![T::zero(); n]);
        let mut col = V::from(vec![T::zero(); n]);
        for i in 0..n {
            e.as_mut()[i] = T::one();
            a.matvec(&e, &mut col);
            diag[i] = col.as_ref()[i];
            e.as_mut()[i] = T::zero();
        }
        self.inv_diag = invert_diagonal(&diag)?;
        Ok(())
    }

    fn apply(&self, x: &V, y: &mut V) -> Result<(), KError> {
        let x_ref = x.as_ref();
        let n = self.inv_diag.len();
        if x_ref.len() != n {
            return Err(KError::DimensionMismatch { expected: n, found: x_ref.len() });
        }
        if y.as_ref().len() != n {
            return Err(KError::DimensionMismatch { expected: n, found: y.as_ref().len() });
        }
        for ((yi, xi), di) in y.as_mut().iter_mut().zip(x_ref).zip(&self.inv_diag) {
            *yi = *di * *xi;
        }
        Ok(())
    }
}
