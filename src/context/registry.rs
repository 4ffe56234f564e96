//! Name → constructor table for solvers.
//!
//! The registry is an ordinary value owned by whoever needs dynamic solver
//! selection (usually a [`KspContext`](super::KspContext)); there is no
//! process-wide table.

use std::collections::BTreeMap;

use num_traits::Float;

use crate::config::options::GmresOptions;
use crate::core::traits::{InnerProduct, MatVec, Vector};
use crate::error::KError;
use crate::solver::{GmresSolver, LinearSolver};

/// A solver behind the common interface.
pub type DynSolver<M, V, T> = Box<dyn LinearSolver<M, V, Scalar = T, Error = KError>>;

/// Builds a configured solver from an option set.
pub type SolverFactory<M, V, T> = fn(&GmresOptions<T>) -> Result<DynSolver<M, V, T>, KError>;

fn gmres_factory<M, V, T>(opts: &GmresOptions<T>) -> Result<DynSolver<M, V, T>, KError>
where
    M: MatVec<V> + 'static,
    V: Vector<Scalar = T> + 'static,
    (): InnerProduct<V, Scalar = T>,
    T: Float + From<f64> + 'static,
{
    Ok(Box::new(GmresSolver::<V, T>::from_options(opts)?))
}

pub struct SolverRegistry<M, V, T> {
    factories: BTreeMap<String, SolverFactory<M, V, T>>,
}

impl<M, V, T> SolverRegistry<M, V, T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Register `factory` under `name`, replacing any previous entry.
    /// Returns `true` if an entry was replaced.
    pub fn register(&mut self, name: &str, factory: SolverFactory<M, V, T>) -> bool {
        let replaced = self.factories.insert(name.to_ascii_lowercase(), factory).is_some();
        log::debug!("registered solver {:?} (replaced: {})", name, replaced);
        replaced
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct the solver registered as `name`.
    pub fn create(&self, name: &str, opts: &GmresOptions<T>) -> Result<DynSolver<M, V, T>, KError> {
        let factory = self
            .factories
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| KError::UnknownSolver(name.to_string()))?;
        factory(opts)
    }
}

impl<M, V, T> SolverRegistry<M, V, T>
where
    M: MatVec<V> + 'static,
    V: Vector<Scalar = T> + 'static,
    (): InnerProduct<V, Scalar = T>,
    T: Float + From<f64> + 'static,
{
    /// A registry with the built-in solvers (`"gmres"`).
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("gmres", gmres_factory::<M, V, T>);
        reg
    }
}

impl<M, V, T> Default for SolverRegistry<M, V, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;

    type Registry = SolverRegistry<Mat<f64>, Vec<f64>, f64>;

    #[test]
    fn defaults_contain_gmres() {
        let reg = Registry::with_defaults();
        assert!(reg.contains("gmres"));
        assert!(reg.contains("GMRES"));
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["gmres"]);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let reg = Registry::with_defaults();
        let err = reg.create("bicg", &GmresOptions::default()).err().unwrap();
        assert!(matches!(err, KError::UnknownSolver(ref n) if n == "bicg"));
    }

    #[test]
    fn created_solver_solves() {
        let reg = Registry::with_defaults();
        let mut opts = GmresOptions::default();
        opts.rtol = 1e-12;
        let mut solver = reg.create("gmres", &opts).unwrap();
        let a = Mat::from_fn(3, 3, |i, j| if i == j { 2.0 } else { 0.0 });
        let b = vec![2.0, 4.0, 6.0];
        let mut x = vec![0.0; 3];
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged);
        for (xi, want) in x.iter().zip([1.0, 2.0, 3.0]) {
            assert!((xi - want).abs() < 1e-12);
        }
    }

    #[test]
    fn invalid_options_fail_at_creation() {
        let reg = Registry::with_defaults();
        let mut opts = GmresOptions::default();
        opts.restart = 0;
        assert!(matches!(reg.create("gmres", &opts), Err(KError::InvalidConfig(_))));
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut reg = Registry::with_defaults();
        assert!(reg.register("gmres", gmres_factory::<Mat<f64>, Vec<f64>, f64>));
        assert!(!reg.register("gmres-copy", gmres_factory::<Mat<f64>, Vec<f64>, f64>));
        assert_eq!(reg.names().count(), 2);
    }
}
