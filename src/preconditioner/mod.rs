//! Preconditioners for linear solvers.
//!
//! This module defines the `Preconditioner` trait consumed by GMRES together with a diagonal (Jacobi)
//! and an identity implementation. Where the preconditioner is applied (left or right of the operator)
//! is decided by the solver, not by the preconditioner.

use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> { Ok(()) }
}

pub mod identity;
pub mod jacobi;

// Re-exports for convenience
pub use identity::Identity;
pub use jacobi::Jacobi;
