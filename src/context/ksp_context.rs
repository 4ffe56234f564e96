//! Top-level solve context (KSP).
//!
//! `KspContext` owns the operator, an optional preconditioner, an option set
//! and a [`SolverRegistry`]. The solver is selected by name and built lazily
//! on the first `solve` (or an explicit `set_up`); changing the type or any
//! option drops the built solver so the next solve picks the change up.
//!
//! # Usage
//!
//! 1. Construct a `KspContext` from the operator.
//! 2. Optionally pick a solver type, attach a preconditioner and set options.
//! 3. Call `solve` for each right-hand side.
//!
//! # References
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

use num_traits::Float;

use super::registry::{DynSolver, SolverRegistry};
use crate::config::options::GmresOptions;
use crate::core::traits::{InnerProduct, MatVec, Vector};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Context and configuration for a Krylov solve.
pub struct KspContext<M, V, T> {
    /// The system operator
    pub a: M,
    pc: Option<Box<dyn Preconditioner<M, V>>>,
    options: GmresOptions<T>,
    registry: SolverRegistry<M, V, T>,
    kind: String,
    solver: Option<DynSolver<M, V, T>>,
    pc_ready: bool,
}

impl<M, V, T> KspContext<M, V, T>
where
    M: MatVec<V> + 'static,
    V: Vector<Scalar = T> + 'static,
    (): InnerProduct<V, Scalar = T>,
    T: Float + From<f64> + 'static,
{
    /// A GMRES context with default options and the built-in registry.
    pub fn new(a: M) -> Self {
        Self {
            a,
            pc: None,
            options: GmresOptions::default(),
            registry: SolverRegistry::with_defaults(),
            kind: "gmres".to_string(),
            solver: None,
            pc_ready: false,
        }
    }
}

impl<M, V, T> KspContext<M, V, T>
where
    T: Float + From<f64>,
{
    /// Registry used to resolve solver names; extend it to add solver types.
    pub fn registry_mut(&mut self) -> &mut SolverRegistry<M, V, T> {
        self.solver = None;
        &mut self.registry
    }

    /// Select the solver by registered name.
    pub fn set_type(&mut self, name: &str) -> Result<(), KError> {
        if !self.registry.contains(name) {
            return Err(KError::UnknownSolver(name.to_string()));
        }
        self.kind = name.to_ascii_lowercase();
        self.solver = None;
        Ok(())
    }

    pub fn solver_type(&self) -> &str {
        &self.kind
    }

    /// Attach a preconditioner; it is set up against `a` before the next solve.
    pub fn set_pc(&mut self, pc: Box<dyn Preconditioner<M, V>>) {
        self.pc = Some(pc);
        self.pc_ready = false;
    }

    pub fn options(&self) -> &GmresOptions<T> {
        &self.options
    }

    /// Replace the whole option set.
    pub fn set_options(&mut self, options: GmresOptions<T>) -> Result<(), KError> {
        options.validate()?;
        self.options = options;
        self.solver = None;
        Ok(())
    }

    /// Set one option from its string form (see [`GmresOptions::set`]).
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), KError> {
        self.options.set(key, value)?;
        self.solver = None;
        Ok(())
    }

    /// Set up the preconditioner and build the selected solver.
    pub fn set_up(&mut self) -> Result<(), KError> {
        if !self.pc_ready {
            if let Some(pc) = self.pc.as_mut() {
                pc.setup(&self.a)?;
            }
            self.pc_ready = true;
        }
        if self.solver.is_none() {
            log::debug!("building {} solver", self.kind);
            self.solver = Some(self.registry.create(&self.kind, &self.options)?);
        }
        Ok(())
    }

    /// Solve `a x = b` with the configured solver and preconditioner.
    pub fn solve(&mut self, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        self.set_up()?;
        let solver = self.solver.as_mut().ok_or(KError::NotSetUp)?;
        solver.solve(&self.a, self.pc.as_deref(), b, x)
    }
}
