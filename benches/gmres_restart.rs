use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use faer::Mat;
use kgmres::preconditioner::{Jacobi, Preconditioner};
use kgmres::solver::gmres::orthog::OrthogKind;
use kgmres::solver::{GmresSolver, LinearSolver, Preconditioning};

fn convection_diffusion(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| {
        if i == j {
            2.0 + (i as f64 / n as f64)
        } else if j + 1 == i {
            -1.3
        } else if i + 1 == j {
            -0.7
        } else {
            0.0
        }
    })
}

fn bench_restart_lengths(c: &mut Criterion) {
    let n = 400;
    let a = convection_diffusion(n);
    let b: Vec<f64> = (0..n).map(|i| (i as f64).cos()).collect();
    let mut jacobi = Jacobi::<f64>::new();
    Preconditioner::<Mat<f64>, Vec<f64>>::setup(&mut jacobi, &a).unwrap();
    let pc: &dyn Preconditioner<Mat<f64>, Vec<f64>> = &jacobi;

    let mut group = c.benchmark_group("gmres restart");
    for restart in [10, 30, 60] {
        group.bench_with_input(BenchmarkId::new("right jacobi", restart), &restart, |ben, &restart| {
            let mut solver = GmresSolver::new(restart, 1e-8, 5000)
                .with_preconditioning(Preconditioning::Right)
                .with_guess_zero(true);
            let mut x = vec![0.0; n];
            ben.iter(|| {
                let _stats = solver.solve(black_box(&a), Some(pc), black_box(&b), &mut x).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_orthogonalization(c: &mut Criterion) {
    let n = 400;
    let a = convection_diffusion(n);
    let b: Vec<f64> = (0..n).map(|i| (i as f64).sin() + 1.0).collect();

    let mut group = c.benchmark_group("gmres orthog");
    for kind in [OrthogKind::Modified, OrthogKind::Classical, OrthogKind::Refined] {
        group.bench_function(kind.to_string(), |ben| {
            let mut solver = GmresSolver::new(30, 1e-8, 5000).with_orthog(kind).with_guess_zero(true);
            let mut x = vec![0.0; n];
            ben.iter(|| {
                let _stats = solver.solve(black_box(&a), None, black_box(&b), &mut x).unwrap();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_restart_lengths, bench_orthogonalization);
criterion_main!(benches);
