//! Convergence testing, solve statistics and residual history.

pub mod convergence;
