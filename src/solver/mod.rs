//! Krylov solver interfaces.

use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for iterative solvers.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar: Copy + PartialOrd + From<f64>;

    /// Solve A·x = b, writing the result into `x`. `pc`, when given, is
    /// applied on the side the solver is configured for.
    /// Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<Self::Scalar>, Self::Error>;
}

pub mod gmres;
pub use gmres::{GmresSolver, Preconditioning};
