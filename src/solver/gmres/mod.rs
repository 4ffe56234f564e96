//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! This module implements restarted GMRES for large, possibly nonsymmetric linear systems Ax = b. The
//! implementation is data-structure neutral: it touches vectors, the operator and the preconditioner only
//! through [`Vector`], [`InnerProduct`], [`MatVec`] and [`Preconditioner`], so it runs on any backend that
//! implements those traits.
//!
//! # Structure
//! - [`basis`]: growable arena of Krylov vectors
//! - [`hessenberg`]: Hessenberg storage, Givens-rotation update, back-substitution
//! - [`orthog`]: pluggable Gram-Schmidt strategies
//! - [`cycle`]: one restart cycle and solution reconstruction
//! - this module: the solver context and the restart driver
//!
//! # Preconditioning
//! With left preconditioning GMRES minimizes ‖B⁻¹(b − Ax)‖ and the residual estimates it reports are
//! preconditioned norms. With right preconditioning it solves AB⁻¹y = b, x = B⁻¹y, and the estimates are
//! true residual norms. Restarts recompute the residual from the current solution.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4
//! - Saad, Y. & Schultz, M. (1986). GMRES: A generalized minimal residual algorithm. SIAM J. Sci. Stat. Comput.

pub mod basis;
pub mod cycle;
pub mod hessenberg;
pub mod orthog;

use std::fmt;
use std::str::FromStr;

use num_traits::Float;

use crate::config::options::{GmresOptions, SolveFlags};
use crate::core::traits::{InnerProduct, MatVec, Vector};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, ResidualHistory, SolveStats};

use basis::KrylovBasis;
use hessenberg::{Hessenberg, try_zeroed};
use orthog::{OrthogKind, Orthogonalizer};

/// Preconditioning mode for GMRES (none, left, or right)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Preconditioning {
    None,
    #[default]
    Left,
    Right,
}

impl FromStr for Preconditioning {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Preconditioning::None),
            "left" => Ok(Preconditioning::Left),
            "right" => Ok(Preconditioning::Right),
            other => Err(KError::InvalidConfig(format!("unknown preconditioning side {other:?}"))),
        }
    }
}

impl fmt::Display for Preconditioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Preconditioning::None => "none",
            Preconditioning::Left => "left",
            Preconditioning::Right => "right",
        })
    }
}

type Monitor<T> = Box<dyn FnMut(usize, T)>;
type ConvergenceTest<T> = Box<dyn FnMut(usize, T, T) -> bool>;

/// Working memory owned by the solver between solves.
pub(crate) struct GmresWork<V, T> {
    pub(crate) basis: KrylovBasis<V>,
    pub(crate) hess: Hessenberg<T>,
    /// B⁻¹b for left preconditioning, b otherwise.
    pub(crate) rhs: V,
    pub(crate) temp: V,
    pub(crate) temp_matop: V,
    /// Back-substitution coefficients.
    pub(crate) coeffs: Vec<T>,
}

/// GMRES solver context.
///
/// Holds configuration, per-solve state and all working memory. Working
/// memory is created by [`GmresSolver::setup`] (called from `solve`) and
/// reused by later solves of the same size.
///
/// # Type Parameters
/// * `V` - Vector type
/// * `T` - Scalar type (e.g., f32, f64)
pub struct GmresSolver<V, T> {
    /// Number of Krylov directions before restart (`max_k`)
    pub restart: usize,
    /// Convergence criteria (tolerances and iteration budget)
    pub conv: Convergence<T>,
    /// Preconditioning mode
    pub preconditioning: Preconditioning,
    /// Cap on the happy breakdown threshold
    pub haptol: T,
    /// Scale of the happy breakdown threshold
    pub epsabs: T,
    /// Basis vectors added per growth step
    pub delta_allocate: usize,
    pub flags: SolveFlags,
    orthog: Box<dyn Orthogonalizer<V, T>>,
    monitor: Option<Monitor<T>>,
    convergence_test: Option<ConvergenceTest<T>>,
    history: Option<ResidualHistory<T>>,
    work: Option<GmresWork<V, T>>,
    /// Total tolerance fixed on the first cycle of a solve.
    ttol: T,
    /// Last completed inner index of the most recent cycle.
    it: Option<usize>,
    /// Side actually used by the most recent solve.
    active_side: Preconditioning,
    nmatop: usize,
    nvectors: usize,
    breakdowns: usize,
}

impl<V, T> GmresSolver<V, T>
where
    V: Vector<Scalar = T>,
    (): InnerProduct<V, Scalar = T>,
    T: Float,
{
    /// Create a new GMRES solver with restart, relative tolerance, and max iterations.
    pub fn new(restart: usize, tol: T, max_iters: usize) -> Self {
        let defaults = GmresOptions::<T>::default();
        Self {
            restart,
            conv: Convergence { rtol: tol, atol: defaults.atol, max_iters },
            preconditioning: defaults.preconditioning,
            haptol: defaults.haptol,
            epsabs: defaults.epsabs,
            delta_allocate: defaults.delta_allocate,
            flags: defaults.flags,
            orthog: defaults.orthog.strategy(),
            monitor: None,
            convergence_test: None,
            history: None,
            work: None,
            ttol: T::zero(),
            it: None,
            active_side: Preconditioning::None,
            nmatop: 0,
            nvectors: 0,
            breakdowns: 0,
        }
    }

    /// Create a solver from a validated option set.
    pub fn from_options(opts: &GmresOptions<T>) -> Result<Self, KError> {
        opts.validate()?;
        let mut solver = Self::new(opts.restart, opts.rtol, opts.max_it)
            .with_atol(opts.atol)
            .with_preconditioning(opts.preconditioning)
            .with_orthog(opts.orthog)
            .with_haptol(opts.haptol)
            .with_epsabs(opts.epsabs)
            .with_delta_allocate(opts.delta_allocate);
        solver.flags = opts.flags;
        if let Some(len) = opts.history_len {
            solver = solver.with_residual_history(len);
        }
        Ok(solver)
    }

    /// Set the preconditioning mode (left, right, or none).
    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.preconditioning = mode;
        self
    }
    /// Set the absolute tolerance.
    pub fn with_atol(mut self, atol: T) -> Self {
        self.conv.atol = atol;
        self
    }
    /// Select one of the built-in orthogonalization methods.
    pub fn with_orthog(mut self, kind: OrthogKind) -> Self {
        self.orthog = kind.strategy();
        self
    }
    /// Install a custom orthogonalization strategy.
    pub fn with_orthogonalizer(mut self, orthog: Box<dyn Orthogonalizer<V, T>>) -> Self {
        self.orthog = orthog;
        self
    }
    /// Set the happy breakdown cap.
    pub fn with_haptol(mut self, haptol: T) -> Self {
        self.haptol = haptol;
        self
    }
    /// Set the happy breakdown scale.
    pub fn with_epsabs(mut self, epsabs: T) -> Self {
        self.epsabs = epsabs;
        self
    }
    /// Set the amount to grow basis storage by when needed.
    pub fn with_delta_allocate(mut self, delta: usize) -> Self {
        self.delta_allocate = delta;
        self
    }
    /// Enable or disable preallocation of all basis vectors.
    pub fn with_preallocate(mut self, preallocate: bool) -> Self {
        self.flags.set(SolveFlags::PREALLOCATE, preallocate);
        self
    }
    /// Treat the incoming solution as zero.
    pub fn with_guess_zero(mut self, guess_zero: bool) -> Self {
        self.flags.set(SolveFlags::GUESS_ZERO, guess_zero);
        self
    }
    /// Set a callback receiving `(iteration, residual estimate)`.
    pub fn with_monitor<F>(mut self, f: F) -> Self
    where F: FnMut(usize, T) + 'static {
        self.monitor = Some(Box::new(f));
        self
    }
    /// Replace the default `res <= ttol` test by `f(iteration, res, ttol)`.
    pub fn with_convergence_test<F>(mut self, f: F) -> Self
    where F: FnMut(usize, T, T) -> bool + 'static {
        self.convergence_test = Some(Box::new(f));
        self
    }
    /// Keep a residual history of at most `len` entries.
    pub fn with_residual_history(mut self, len: usize) -> Self {
        self.history = Some(ResidualHistory::with_capacity(len));
        self
    }

    /// Residual estimates recorded by the last solve, if a history is kept.
    pub fn residual_history(&self) -> Option<&[T]> {
        self.history.as_ref().map(|h| h.as_slice())
    }
    /// Operator applications performed by the last solve's cycles.
    pub fn operator_applications(&self) -> usize {
        self.nmatop
    }
    /// Estimated vector operations performed by the last solve's cycles.
    pub fn vector_operations(&self) -> usize {
        self.nvectors
    }
    /// Happy breakdowns seen by the last solve.
    pub fn happy_breakdowns(&self) -> usize {
        self.breakdowns
    }
    /// Total tolerance of the last solve.
    pub fn ttol(&self) -> T {
        self.ttol
    }
    /// Name of the orthogonalization in use.
    pub fn orthog_name(&self) -> &'static str {
        self.orthog.name()
    }
    /// Basis vectors currently allocated, or 0 before setup.
    pub fn allocated_basis_vectors(&self) -> usize {
        self.work.as_ref().map_or(0, |w| w.basis.allocated())
    }

    /// Reject configurations the solver cannot run with.
    pub fn validate(&self) -> Result<(), KError> {
        if self.restart == 0 {
            return Err(KError::InvalidConfig("restart must be at least 1".into()));
        }
        if self.delta_allocate == 0 {
            return Err(KError::InvalidConfig("delta_allocate must be at least 1".into()));
        }
        if !(self.haptol >= T::zero()) || !(self.epsabs >= T::zero()) {
            return Err(KError::InvalidConfig("happy breakdown tolerances must be non-negative".into()));
        }
        self.conv.validate().map_err(KError::InvalidConfig)
    }

    /// Validate the configuration and create working memory shaped like
    /// `template`. Existing memory is kept when it still fits.
    pub fn setup(&mut self, template: &V) -> Result<(), KError> {
        self.validate()?;
        let preallocate = self.flags.contains(SolveFlags::PREALLOCATE);
        if let Some(work) = &self.work {
            let fits = work.hess.max_k() == self.restart
                && work.basis.vector_len() == template.len()
                && (!preallocate || work.basis.allocated() == self.restart + 1);
            if fits {
                return Ok(());
            }
        }
        log::debug!(
            "gmres setup: n={} restart={} orthog={} preallocate={}",
            template.len(),
            self.restart,
            self.orthog.name(),
            preallocate
        );
        self.work = None;
        self.work = Some(GmresWork {
            basis: KrylovBasis::new(template, self.restart, self.delta_allocate, preallocate)?,
            hess: Hessenberg::new(self.restart)?,
            rhs: template.duplicate(),
            temp: template.duplicate(),
            temp_matop: template.duplicate(),
            coeffs: try_zeroed(self.restart + 1, "back-substitution coefficients")?,
        });
        self.it = None;
        Ok(())
    }

    /// Write `x0` plus the correction accumulated by the most recent cycle
    /// into `dest`, without touching the solver's solution.
    ///
    /// `pc` must be the preconditioner the solve used (it is applied for
    /// right preconditioning).
    pub fn build_solution<M>(&mut self, pc: Option<&dyn Preconditioner<M, V>>, x0: &V, dest: &mut V) -> Result<(), KError> {
        let work = self.work.as_mut().ok_or(KError::NotSetUp)?;
        dest.copy_from(x0);
        if let Some(it) = self.it {
            let correction = work.correction(pc, self.active_side, it)?;
            dest.axpy(T::one(), correction);
        }
        Ok(())
    }
}

/// Apply the preconditioner, or copy when there is none.
pub(crate) fn apply_pc<M, V: Vector>(pc: Option<&dyn Preconditioner<M, V>>, x: &V, y: &mut V) -> Result<(), KError> {
    match pc {
        Some(pc) => pc.apply(x, y),
        None => {
            y.copy_from(x);
            Ok(())
        }
    }
}

/// The operator GMRES iterates with: B⁻¹A (left), AB⁻¹ (right) or A.
pub(crate) fn apply_operator<M, V>(
    a: &M,
    pc: Option<&dyn Preconditioner<M, V>>,
    side: Preconditioning,
    x: &V,
    y: &mut V,
    scratch: &mut V,
) -> Result<(), KError>
where
    M: MatVec<V>,
    V: Vector,
{
    match side {
        Preconditioning::Left => {
            a.matvec(x, scratch);
            apply_pc(pc, scratch, y)
        }
        Preconditioning::Right => {
            apply_pc(pc, x, scratch)?;
            a.matvec(scratch, y);
            Ok(())
        }
        Preconditioning::None => {
            a.matvec(x, y);
            Ok(())
        }
    }
}

impl<V, T> GmresWork<V, T>
where
    V: Vector<Scalar = T>,
    T: Float,
{
    /// V[0] ← rhs − op(x), where op is B⁻¹A for left preconditioning and A
    /// otherwise (the right-preconditioned iterate is the true solution).
    fn initial_residual<M: MatVec<V>>(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        side: Preconditioning,
        x: &V,
    ) -> Result<(), KError> {
        if side == Preconditioning::Left {
            a.matvec(x, &mut self.temp_matop);
            apply_pc(pc, &self.temp_matop, &mut self.temp)?;
        } else {
            a.matvec(x, &mut self.temp);
        }
        let v0 = self.basis.vec_mut(0);
        v0.copy_from(&self.rhs);
        v0.axpy(-T::one(), &self.temp);
        Ok(())
    }
}

impl<M, V, T> LinearSolver<M, V> for GmresSolver<V, T>
where
    M: MatVec<V>,
    V: Vector<Scalar = T>,
    (): InnerProduct<V, Scalar = T>,
    T: Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    /// Solve the linear system Ax = b using restarted GMRES.
    ///
    /// # Arguments
    /// * `a` - Matrix implementing `MatVec`
    /// * `pc` - Optional preconditioner, applied on the configured side
    /// * `b` - Right-hand side vector
    /// * `x` - On input: initial guess (unless `GUESS_ZERO`); on output: solution vector
    ///
    /// # Returns
    /// * `Ok(SolveStats)` whether or not the tolerance was reached; check `converged`
    /// * `Err(KError)` on invalid configuration, allocation or preconditioner failure
    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        if b.len() != x.len() {
            return Err(KError::DimensionMismatch { expected: b.len(), found: x.len() });
        }
        self.setup(b)?;
        let side = if pc.is_some() { self.preconditioning } else { Preconditioning::None };
        self.active_side = side;
        self.it = None;
        self.nmatop = 0;
        self.nvectors = 0;
        self.breakdowns = 0;
        if let Some(h) = self.history.as_mut() {
            h.clear();
        }

        {
            let work = self.work.as_mut().ok_or(KError::NotSetUp)?;
            if side == Preconditioning::Left {
                apply_pc(pc, b, &mut work.rhs)?;
            } else {
                work.rhs.copy_from(b);
            }
            if self.flags.contains(SolveFlags::GUESS_ZERO) {
                x.set(T::zero());
                work.basis.vec_mut(0).copy_from(&work.rhs);
            } else {
                work.initial_residual(a, pc, side, x)?;
            }
        }

        let max_it = self.conv.max_iters;
        let mut total = 0;
        let mut restarts = 0;
        let outcome = loop {
            let outcome = self.cycle(a, pc, side, x, total, restarts > 0)?;
            total += outcome.iterations;
            if outcome.converged || total >= max_it {
                break outcome;
            }
            restarts += 1;
            log::debug!("gmres restart {} after {} iterations", restarts, total);
            let work = self.work.as_mut().ok_or(KError::NotSetUp)?;
            work.initial_residual(a, pc, side, x)?;
        };

        if !outcome.converged {
            log::warn!(
                "GMRES did not converge after {} iterations (residual: {:.2e}, target: {:.2e})",
                total,
                outcome.residual.to_f64().unwrap_or(f64::NAN),
                self.ttol.to_f64().unwrap_or(f64::NAN)
            );
        }
        Ok(SolveStats {
            iterations: total,
            final_residual: outcome.residual,
            converged: outcome.converged,
            restarts,
        })
    }
}
