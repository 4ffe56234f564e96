//! Orthogonalization strategies for the Arnoldi step.
//!
//! A strategy receives the basis with `V[it+1]` holding the freshly applied
//! operator, orthogonalizes it against `V[0..=it]` and writes the projection
//! coefficients into rows `0..=it` of Hessenberg column `it`. Normalization
//! and the sub-diagonal entry are left to the cycle driver.

use std::fmt;
use std::str::FromStr;

use num_traits::Float;

use super::basis::KrylovBasis;
use super::hessenberg::Hessenberg;
use crate::core::traits::{InnerProduct, Vector};
use crate::error::KError;

/// Pluggable Gram-Schmidt variant.
pub trait Orthogonalizer<V, T> {
    fn orthogonalize(&self, basis: &mut KrylovBasis<V>, hess: &mut Hessenberg<T>, it: usize);

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Modified Gram-Schmidt: project and subtract one basis vector at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifiedGramSchmidt;

/// Classical (unmodified) Gram-Schmidt: all projections from the same vector,
/// then a single fused update. Fewer global reductions in a row, weaker
/// orthogonality.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassicalGramSchmidt;

/// Classical Gram-Schmidt followed by one refinement pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefinedGramSchmidt;

impl<V, T> Orthogonalizer<V, T> for ModifiedGramSchmidt
where
    V: Vector<Scalar = T>,
    (): InnerProduct<V, Scalar = T>,
    T: Float,
{
    fn orthogonalize(&self, basis: &mut KrylovBasis<V>, hess: &mut Hessenberg<T>, it: usize) {
        let ip = ();
        let (done, w) = basis.split_newest(it);
        for (j, vj) in done.iter().enumerate() {
            let h = ip.dot(w, vj);
            hess.set_entry(j, it, h);
            w.axpy(-h, vj);
        }
    }

    fn name(&self) -> &'static str {
        "modified Gram-Schmidt"
    }
}

/// One classical pass; coefficients are added onto column `it`.
fn classical_pass<V, T>(done: &[V], w: &mut V, hess: &mut Hessenberg<T>, it: usize, coeffs: &mut Vec<T>)
where
    V: Vector<Scalar = T>,
    (): InnerProduct<V, Scalar = T>,
    T: Float,
{
    let ip = ();
    coeffs.clear();
    coeffs.extend(done.iter().map(|vj| ip.dot(w, vj)));
    for (j, h) in coeffs.iter_mut().enumerate() {
        hess.add_to_entry(j, it, *h);
        *h = -*h;
    }
    w.maxpy(coeffs, done);
}

impl<V, T> Orthogonalizer<V, T> for ClassicalGramSchmidt
where
    V: Vector<Scalar = T>,
    (): InnerProduct<V, Scalar = T>,
    T: Float,
{
    fn orthogonalize(&self, basis: &mut KrylovBasis<V>, hess: &mut Hessenberg<T>, it: usize) {
        let (done, w) = basis.split_newest(it);
        for j in 0..=it {
            hess.set_entry(j, it, T::zero());
        }
        let mut coeffs = Vec::with_capacity(it + 1);
        classical_pass(done, w, hess, it, &mut coeffs);
    }

    fn name(&self) -> &'static str {
        "classical Gram-Schmidt"
    }
}

impl<V, T> Orthogonalizer<V, T> for RefinedGramSchmidt
where
    V: Vector<Scalar = T>,
    (): InnerProduct<V, Scalar = T>,
    T: Float,
{
    fn orthogonalize(&self, basis: &mut KrylovBasis<V>, hess: &mut Hessenberg<T>, it: usize) {
        let (done, w) = basis.split_newest(it);
        for j in 0..=it {
            hess.set_entry(j, it, T::zero());
        }
        let mut coeffs = Vec::with_capacity(it + 1);
        classical_pass(done, w, hess, it, &mut coeffs);
        classical_pass(done, w, hess, it, &mut coeffs);
    }

    fn name(&self) -> &'static str {
        "refined classical Gram-Schmidt"
    }
}

/// Orthogonalization method, selectable from configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum OrthogKind {
    #[default]
    Modified,
    Classical,
    Refined,
}

impl OrthogKind {
    /// The strategy object for this kind.
    pub fn strategy<V, T>(self) -> Box<dyn Orthogonalizer<V, T>>
    where
        V: Vector<Scalar = T>,
        (): InnerProduct<V, Scalar = T>,
        T: Float,
    {
        match self {
            OrthogKind::Modified => Box::new(ModifiedGramSchmidt),
            OrthogKind::Classical => Box::new(ClassicalGramSchmidt),
            OrthogKind::Refined => Box::new(RefinedGramSchmidt),
        }
    }
}

impl FromStr for OrthogKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mgs" | "modified" => Ok(OrthogKind::Modified),
            "cgs" | "classical" | "unmodified" => Ok(OrthogKind::Classical),
            "refined" | "cgs2" => Ok(OrthogKind::Refined),
            other => Err(KError::InvalidConfig(format!("unknown orthogonalization {other:?}"))),
        }
    }
}

impl fmt::Display for OrthogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrthogKind::Modified => "modified",
            OrthogKind::Classical => "classical",
            OrthogKind::Refined => "refined",
        };
        f.write_str(name)
    }
}
