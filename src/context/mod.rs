//! Context module: solver selection and the top-level solve context.
//!
//! Modules:
//! - [`registry`]: the `SolverRegistry` mapping solver names to constructors.
//! - [`ksp_context`]: `KspContext`, which owns the operator, preconditioner, options and registry.
//!
//! # Example
//! ```rust,ignore
//! use kgmres::context::KspContext;
//! let mut ksp = KspContext::new(a);
//! ksp.set_option("-ksp_gmres_restart", "30")?;
//! let stats = ksp.solve(&b, &mut x)?;
//! ```

pub mod ksp_context;
pub mod registry;

pub use ksp_context::KspContext;
pub use registry::{DynSolver, SolverFactory, SolverRegistry};
