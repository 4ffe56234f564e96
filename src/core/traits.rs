//! Core linear-algebra traits for kgmres.
//!
//! The solver never looks inside a vector. Everything it needs from the
//! vector, operator and preconditioner collaborators is expressed here, so a
//! distributed or device-resident vector type only has to implement these
//! traits (with global reductions inside `dot`/`norm`) to be usable.

/// Matrix–vector product: y ← A x.
pub trait MatVec<V> {
    /// Compute y = A · x. `x` and `y` never alias.
    fn matvec(&self, x: &V, y: &mut V);
}

/// Inner products & norms.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
}

/// Shape query for operators.
pub trait Indexing {
    /// Number of rows.
    fn nrows(&self) -> usize;
}

/// Vector-space operations used by the Krylov kernels.
///
/// All operations are blocking: they must be complete when they return.
pub trait Vector: Sized {
    /// Scalar type of the entries.
    type Scalar: Copy;

    /// Global length of the vector.
    fn len(&self) -> usize;

    /// Whether the vector has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A new zero vector with the same layout as `self`.
    fn duplicate(&self) -> Self;

    /// self ← alpha for every entry.
    fn set(&mut self, alpha: Self::Scalar);

    /// self ← x.
    fn copy_from(&mut self, x: &Self);

    /// self ← alpha · self.
    fn scale(&mut self, alpha: Self::Scalar);

    /// self ← self + alpha · x.
    fn axpy(&mut self, alpha: Self::Scalar, x: &Self);

    /// self ← self + Σ alphas[j] · xs[j].
    ///
    /// `alphas` and `xs` must have the same length.
    fn maxpy(&mut self, alphas: &[Self::Scalar], xs: &[Self]) {
        debug_assert_eq!(alphas.len(), xs.len());
        for (alpha, x) in alphas.iter().zip(xs) {
            self.axpy(*alpha, x);
        }
    }
}
