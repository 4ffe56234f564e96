//! kgmres: restarted GMRES over abstract vectors, operators and preconditioners
//!
//! The solver touches data only through the traits in [`core::traits`], so the same engine runs on
//! `Vec<T>` with `faer` dense operators (implementations provided here) or on any other backend that
//! implements those traits.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use crate::core::*;
pub use error::*;
pub use preconditioner::*;
pub use solver::*;

// Re-export the convergence types at the crate root for convenience
pub use utils::convergence::{Convergence, ResidualHistory, SolveStats};
