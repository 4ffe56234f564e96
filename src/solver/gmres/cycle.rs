//! One GMRES restart cycle and the solution reconstruction that ends it.

use num_traits::Float;

use super::{ConvergenceTest, GmresSolver, GmresWork, Monitor, Preconditioning, apply_operator, apply_pc};
use crate::core::traits::{InnerProduct, MatVec, Vector};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::{Convergence, ResidualHistory};

/// Result of one cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleOutcome<T> {
    /// Inner iterations performed.
    pub iterations: usize,
    pub converged: bool,
    /// Residual estimate at exit.
    pub residual: T,
}

fn as_f64<T: Float>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

fn is_converged<T: Float>(
    test: &mut Option<ConvergenceTest<T>>,
    conv: &Convergence<T>,
    n: usize,
    res: T,
    ttol: T,
) -> bool {
    match test {
        Some(f) => f(n, res, ttol),
        None => conv.check(res, ttol),
    }
}

fn report<T: Float>(
    history: &mut Option<ResidualHistory<T>>,
    monitor: &mut Option<Monitor<T>>,
    n: usize,
    res: T,
) {
    if let Some(h) = history {
        h.record(n, res);
    }
    if let Some(m) = monitor {
        m(n, res);
    }
}

impl<V, T> GmresWork<V, T>
where
    V: Vector<Scalar = T>,
    T: Float,
{
    /// Σ y_j V_j for j in 0..=it, with y from the triangular solve, pushed
    /// through B⁻¹ for right preconditioning.
    pub(crate) fn correction<M>(
        &mut self,
        pc: Option<&dyn Preconditioner<M, V>>,
        side: Preconditioning,
        it: usize,
    ) -> Result<&V, KError> {
        let zero_pivots = self.hess.solve_triangular(it, &mut self.coeffs);
        if zero_pivots > 0 {
            log::warn!("gmres back-substitution met {} zero pivot(s); their coefficients were set to zero", zero_pivots);
        }
        self.temp.set(T::zero());
        self.temp.maxpy(&self.coeffs[..=it], self.basis.vectors(it + 1));
        if side == Preconditioning::Right {
            apply_pc(pc, &self.temp, &mut self.temp_matop)?;
            Ok(&self.temp_matop)
        } else {
            Ok(&self.temp)
        }
    }
}

impl<V, T> GmresSolver<V, T>
where
    V: Vector<Scalar = T>,
    (): InnerProduct<V, Scalar = T>,
    T: Float,
{
    /// Run one cycle from the residual stored in `V[0]`.
    ///
    /// Iterates until the convergence test passes, `restart` directions have
    /// been built, or `its_so_far` plus the inner count reaches the iteration
    /// budget. The solution is updated in place whenever at least one
    /// iteration ran. `is_restart` keeps the total tolerance of the first
    /// cycle.
    pub(crate) fn cycle<M: MatVec<V>>(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        side: Preconditioning,
        x: &mut V,
        its_so_far: usize,
        is_restart: bool,
    ) -> Result<CycleOutcome<T>, KError> {
        let Self {
            restart: max_k,
            conv,
            haptol,
            epsabs,
            orthog,
            monitor,
            convergence_test,
            history,
            work,
            ttol,
            it: last_it,
            nmatop,
            nvectors,
            breakdowns,
            ..
        } = self;
        let work = work.as_mut().ok_or(KError::NotSetUp)?;
        let ip = ();
        let max_k = *max_k;
        let max_it = conv.max_iters;

        *last_it = None;
        work.hess.reset();
        let res_norm = ip.norm(work.basis.vec(0));
        work.hess.set_rs(0, res_norm);
        if res_norm == T::zero() {
            log::debug!("gmres cycle: zero initial residual, nothing to do");
            return Ok(CycleOutcome { iterations: 0, converged: true, residual: res_norm });
        }
        work.basis.vec_mut(0).scale(T::one() / res_norm);
        if !is_restart {
            *ttol = conv.target(res_norm);
        }
        log::debug!(
            "gmres cycle start: its_so_far={} res={:.3e} ttol={:.3e}",
            its_so_far,
            as_f64(res_norm),
            as_f64(*ttol)
        );

        let mut it = 0;
        let mut res = res_norm;
        let mut converged;
        loop {
            converged = is_converged(convergence_test, conv, its_so_far + it, res, *ttol);
            if converged || it >= max_k || its_so_far + it >= max_it {
                break;
            }
            report(history, monitor, its_so_far + it, res);

            work.basis.ensure(it + 1)?;
            {
                let (done, next) = work.basis.split_newest(it);
                apply_operator(a, pc, side, &done[it], next, &mut work.temp_matop)?;
            }
            orthog.orthogonalize(&mut work.basis, &mut work.hess, it);

            let tt = ip.norm(work.basis.vec(it + 1));
            work.hess.set_entry(it + 1, it, tt);

            // Not dimensionally normalized; kept as the historical heuristic.
            let hapbnd = (*epsabs * (work.hess.hh(it, it) / work.hess.rs(it)).abs()).min(*haptol);
            let breakdown = !(tt > hapbnd);
            if breakdown {
                *breakdowns += 1;
                log::debug!(
                    "gmres happy breakdown at iteration {}: ||v||={:.3e} <= {:.3e}",
                    its_so_far + it,
                    as_f64(tt),
                    as_f64(hapbnd)
                );
            } else {
                work.basis.vec_mut(it + 1).scale(T::one() / tt);
            }

            res = work.hess.update(it);
            log::trace!("gmres iteration {}: res={:.6e}", its_so_far + it + 1, as_f64(res));
            it += 1;
            *last_it = Some(it - 1);

            if breakdown {
                converged = is_converged(convergence_test, conv, its_so_far + it, res, *ttol);
                break;
            }
        }

        *nmatop += it;
        *nvectors += 3 + it * (it + 2);
        report(history, monitor, its_so_far + it, res);
        if let Some(h) = history {
            h.finish(its_so_far + it);
        }

        if it > 0 {
            let correction = work.correction(pc, side, it - 1)?;
            x.axpy(T::one(), correction);
        }
        log::debug!(
            "gmres cycle end: {} iterations, res={:.3e}, converged={}",
            it,
            as_f64(res),
            converged
        );
        Ok(CycleOutcome { iterations: it, converged, residual: res })
    }
}
