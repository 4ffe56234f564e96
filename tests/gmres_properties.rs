//! Behavioural properties of restarted GMRES: restarts, workspace growth, residual history,
//! monitoring, custom convergence tests and configuration handling.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use faer::Mat;
use kgmres::config::GmresOptions;
use kgmres::core::traits::{InnerProduct, MatVec};
use kgmres::error::KError;
use kgmres::solver::gmres::orthog::OrthogKind;
use kgmres::solver::{GmresSolver, LinearSolver};

type Solver = GmresSolver<Vec<f64>, f64>;

/// 4 on the diagonal, 0.5 above, -0.3 below.
fn banded(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| {
        if i == j {
            4.0
        } else if j == i + 1 {
            0.5
        } else if i == j + 1 {
            -0.3
        } else {
            0.0
        }
    })
}

fn rhs(n: usize) -> Vec<f64> {
    (0..n).map(|i| 1.0 + (i as f64 * 0.7).sin()).collect()
}

fn true_residual(a: &Mat<f64>, b: &[f64], x: &Vec<f64>) -> f64 {
    let mut ax = vec![0.0; b.len()];
    a.matvec(x, &mut ax);
    b.iter().zip(&ax).map(|(p, q)| (p - q).powi(2)).sum::<f64>().sqrt()
}

/// Three GMRES(5) cycles and one GMRES(15) cycle, both with a budget of 15 iterations, reach the
/// same solution on a system larger than the Krylov space either run builds.
#[test]
fn restart_equivalence() {
    let n = 40;
    let a = banded(n);
    let b = rhs(n);

    // rtol = 0: both runs spend the whole budget.
    let mut short = vec![0.0; n];
    let s_short = Solver::new(5, 0.0, 15).solve(&a, None, &b, &mut short).unwrap();
    let mut long = vec![0.0; n];
    let s_long = Solver::new(15, 0.0, 15).solve(&a, None, &b, &mut long).unwrap();

    assert_eq!(s_short.iterations, 15);
    assert_eq!(s_long.iterations, 15);
    assert_eq!(s_short.restarts, 2);
    assert_eq!(s_long.restarts, 0);

    let b_norm = ().norm(&b);
    assert!(true_residual(&a, &b, &short) < 1e-9 * b_norm);
    assert!(true_residual(&a, &b, &long) < 1e-9 * b_norm);
    for (p, q) in short.iter().zip(&long) {
        assert_abs_diff_eq!(*p, *q, epsilon = 1e-8);
    }
}


/// After a restart the tolerance from the first cycle is kept, and the final estimate matches the
/// true residual of the returned iterate.
#[test]
fn restart_keeps_first_cycle_tolerance() {
    let n = 30;
    let a = banded(n);
    let b = rhs(n);
    let mut x = vec![0.0; n];
    let mut solver = Solver::new(3, 1e-9, 500);
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert!(stats.converged);
    assert!(stats.restarts > 0);
    assert_abs_diff_eq!(solver.ttol(), 1e-9 * ().norm(&b), epsilon = 1e-20);
    assert!(stats.final_residual <= solver.ttol());
    assert_abs_diff_eq!(true_residual(&a, &b, &x), stats.final_residual, epsilon = 1e-10);
}

/// Exhausting the iteration budget reports non-convergence but still returns the improved iterate.
#[test]
fn budget_exhaustion_across_restarts() {
    let n = 40;
    let a = banded(n);
    let b = rhs(n);
    let mut x = vec![0.0; n];
    let mut solver = Solver::new(3, 1e-15, 7);
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert!(!stats.converged);
    assert_eq!(stats.iterations, 7);
    assert_eq!(stats.restarts, 2);
    assert_eq!(solver.operator_applications(), 7);
    // 3 + 3*5, 3 + 3*5, 3 + 1*3
    assert_eq!(solver.vector_operations(), 18 + 18 + 6);
    assert!(x.iter().all(|v| v.is_finite()));
    assert!(true_residual(&a, &b, &x) < ().norm(&b));
}

/// Basis vectors are created in `delta_allocate` batches unless preallocation is requested; the
/// iterates do not depend on it.
#[test]
fn preallocation_vs_delta_growth() {
    let n = 16;
    let a = banded(n);
    let b = rhs(n);

    let mut grown = Solver::new(20, 1e-8, 100).with_delta_allocate(3);
    let mut x1 = vec![0.0; n];
    let s1 = grown.solve(&a, None, &b, &mut x1).unwrap();

    let mut pre = Solver::new(20, 1e-8, 100).with_preallocate(true);
    let mut x2 = vec![0.0; n];
    let s2 = pre.solve(&a, None, &b, &mut x2).unwrap();

    assert_eq!(pre.allocated_basis_vectors(), 21);
    let grown_count = grown.allocated_basis_vectors();
    assert_eq!(grown_count % 3, 0);
    assert!(grown_count >= s1.iterations + 1);
    assert!(grown_count < 21);

    assert_eq!(s1.iterations, s2.iterations);
    for (p, q) in x1.iter().zip(&x2) {
        assert_abs_diff_eq!(*p, *q, epsilon = 1e-12);
    }
}

/// A second solve of the same size reuses the workspace; changing the restart length rebuilds it.
#[test]
fn workspace_reuse_between_solves() {
    let n = 12;
    let a = banded(n);
    let b = rhs(n);
    let mut solver = Solver::new(6, 1e-12, 200).with_preallocate(true);
    let mut x = vec![0.0; n];
    let first = solver.solve(&a, None, &b, &mut x).unwrap();
    assert_eq!(solver.allocated_basis_vectors(), 7);

    let mut x_again = vec![0.0; n];
    let second = solver.solve(&a, None, &b, &mut x_again).unwrap();
    assert_eq!(first.iterations, second.iterations);

    solver.restart = 9;
    let mut x_third = vec![0.0; n];
    solver.solve(&a, None, &b, &mut x_third).unwrap();
    assert_eq!(solver.allocated_basis_vectors(), 10);
}

/// The history keeps the first `len` estimates and drops the rest silently.
#[test]
fn residual_history_truncation() {
    let n = 20;
    let a = banded(n);
    let b = rhs(n);

    let mut full = Solver::new(20, 1e-12, 100).with_residual_history(100);
    let mut x = vec![0.0; n];
    let stats = full.solve(&a, None, &b, &mut x).unwrap();
    let full_hist = full.residual_history().unwrap().to_vec();
    assert_eq!(full_hist.len(), stats.iterations + 1);
    assert_abs_diff_eq!(full_hist[0], ().norm(&b), epsilon = 1e-12);
    assert!(stats.iterations > 3);

    let mut short = Solver::new(20, 1e-12, 100).with_residual_history(3);
    let mut x = vec![0.0; n];
    short.solve(&a, None, &b, &mut x).unwrap();
    let short_hist = short.residual_history().unwrap();
    assert_eq!(short_hist.len(), 3);
    for (p, q) in short_hist.iter().zip(&full_hist) {
        assert_abs_diff_eq!(*p, *q, epsilon = 1e-12);
    }
}

/// Monitor indices never decrease, start at 0 and end at the total iteration count, across restarts.
#[test]
fn monitor_order_across_restarts() {
    let n = 25;
    let a = banded(n);
    let b = rhs(n);
    let calls = Rc::new(RefCell::new(Vec::<(usize, f64)>::new()));
    let sink = Rc::clone(&calls);
    let mut solver = Solver::new(4, 1e-10, 300).with_monitor(move |it, res| sink.borrow_mut().push((it, res)));
    let mut x = vec![0.0; n];
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert!(stats.restarts > 0);
    let calls = calls.borrow();
    assert_eq!(calls.first().map(|c| c.0), Some(0));
    assert_eq!(calls.last().map(|c| c.0), Some(stats.iterations));
    assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_abs_diff_eq!(calls.last().map_or(f64::NAN, |c| c.1), stats.final_residual, epsilon = 0.0);
}

/// A user convergence test replaces the tolerance check.
#[test]
fn custom_convergence_test() {
    let n = 30;
    let a = banded(n);
    let b = rhs(n);
    let mut solver = Solver::new(10, 0.0, 1000).with_convergence_test(|it, _res, _ttol| it >= 4);
    let mut x = vec![0.0; n];
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert!(stats.converged);
    assert_eq!(stats.iterations, 4);
}

/// Classical, modified and refined Gram-Schmidt agree on a well-conditioned problem.
#[test]
fn orthogonalization_variants_agree() {
    let n = 18;
    let a = banded(n);
    let b = rhs(n);
    let mut solutions = Vec::new();
    for kind in [OrthogKind::Modified, OrthogKind::Classical, OrthogKind::Refined] {
        let mut solver = Solver::new(8, 1e-12, 200).with_orthog(kind);
        let mut x = vec![0.0; n];
        assert!(solver.solve(&a, None, &b, &mut x).unwrap().converged);
        solutions.push(x);
    }
    for other in &solutions[1..] {
        for (p, q) in solutions[0].iter().zip(other) {
            assert_abs_diff_eq!(*p, *q, epsilon = 1e-9);
        }
    }
}

/// With `guess_zero` the incoming contents of `x` are ignored.
#[test]
fn guess_zero_ignores_incoming_solution() {
    let n = 10;
    let a = banded(n);
    let b = rhs(n);
    let mut from_zero = vec![0.0; n];
    Solver::new(10, 1e-12, 100).solve(&a, None, &b, &mut from_zero).unwrap();
    let mut garbage = vec![1e6; n];
    Solver::new(10, 1e-12, 100)
        .with_guess_zero(true)
        .solve(&a, None, &b, &mut garbage)
        .unwrap();
    for (p, q) in garbage.iter().zip(&from_zero) {
        assert_abs_diff_eq!(*p, *q, epsilon = 1e-12);
    }
}

/// A nonzero initial guess is used as the starting point.
#[test]
fn nonzero_initial_guess() {
    let n = 10;
    let a = banded(n);
    let b = rhs(n);
    let mut x = vec![0.3; n];
    let stats = Solver::new(10, 1e-12, 100).solve(&a, None, &b, &mut x).unwrap();
    assert!(stats.converged);
    assert!(true_residual(&a, &b, &x) < 1e-10);
}

#[test]
fn length_mismatch_is_rejected() {
    let a = banded(3);
    let b = vec![1.0; 3];
    let mut x = vec![0.0; 4];
    let err = Solver::new(3, 1e-8, 10).solve(&a, None, &b, &mut x).unwrap_err();
    assert!(matches!(err, KError::DimensionMismatch { expected: 3, found: 4 }));
}

#[test]
fn invalid_configuration_is_rejected() {
    let a = banded(3);
    let b = vec![1.0; 3];
    let mut x = vec![0.0; 3];
    let err = Solver::new(0, 1e-8, 10).solve(&a, None, &b, &mut x).unwrap_err();
    assert!(matches!(err, KError::InvalidConfig(_)));
    let err = Solver::new(3, -1.0, 10).solve(&a, None, &b, &mut x).unwrap_err();
    assert!(matches!(err, KError::InvalidConfig(_)));
    let err = Solver::new(3, 1e-8, 10).with_delta_allocate(0).solve(&a, None, &b, &mut x).unwrap_err();
    assert!(matches!(err, KError::InvalidConfig(_)));
}

/// Options parsed from strings produce a solver configured accordingly.
#[test]
fn solver_from_string_options() {
    let mut opts = GmresOptions::<f64>::default();
    for (k, v) in [
        ("-ksp_gmres_restart", "7"),
        ("-ksp_rtol", "1e-11"),
        ("-ksp_gmres_orthog", "refined"),
        ("-ksp_gmres_preallocate", "yes"),
        ("-ksp_gmres_history", "5"),
    ] {
        opts.set(k, v).unwrap();
    }
    let mut solver = Solver::from_options(&opts).unwrap();
    assert_eq!(solver.restart, 7);
    assert_eq!(solver.orthog_name(), "refined classical Gram-Schmidt");
    let n = 15;
    let a = banded(n);
    let b = rhs(n);
    let mut x = vec![0.0; n];
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert!(stats.converged);
    assert_eq!(solver.allocated_basis_vectors(), 8);
    assert!(solver.residual_history().unwrap().len() <= 5);
}
