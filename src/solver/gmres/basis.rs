//! Growable arena of Krylov basis vectors.
//!
//! Vectors are created in batches of `delta` as the inner iteration advances,
//! never past `max_k + 1` in total, and are kept until the arena is dropped.
//! The sizes of the batches are recorded so callers can inspect how the
//! storage was built up.

use crate::core::traits::Vector;
use crate::error::KError;

#[derive(Debug)]
pub struct KrylovBasis<V> {
    vecs: Vec<V>,
    limit: usize,
    delta: usize,
    batches: Vec<usize>,
}

impl<V: Vector> KrylovBasis<V> {
    /// Create the arena for restart length `max_k`, with one batch of
    /// vectors shaped like `template` (all `max_k + 1` when `preallocate`).
    pub fn new(template: &V, max_k: usize, delta: usize, preallocate: bool) -> Result<Self, KError> {
        let limit = max_k + 1;
        let mut basis = Self { vecs: Vec::new(), limit, delta: delta.max(1), batches: Vec::new() };
        let first = if preallocate { limit } else { basis.delta.min(limit) };
        basis.push_batch(template, first)?;
        Ok(basis)
    }

    fn push_batch(&mut self, template: &V, n: usize) -> Result<(), KError> {
        self.vecs
            .try_reserve_exact(n)
            .map_err(|source| KError::Allocation { what: "Krylov basis", source })?;
        self.batches
            .try_reserve(1)
            .map_err(|source| KError::Allocation { what: "Krylov basis", source })?;
        self.vecs.extend((0..n).map(|_| template.duplicate()));
        self.batches.push(n);
        Ok(())
    }

    /// Make sure `V[index]` exists, growing by at least one batch if not.
    pub fn ensure(&mut self, index: usize) -> Result<(), KError> {
        let have = self.vecs.len();
        if index < have {
            return Ok(());
        }
        let needed = index + 1 - have;
        let nalloc = needed.max(self.delta.min(self.limit.saturating_sub(have)));
        log::trace!("growing Krylov basis from {} by {} vectors", have, nalloc);
        let template = self.vecs[0].duplicate();
        self.push_batch(&template, nalloc)
    }

    /// Number of vectors currently allocated.
    pub fn allocated(&self) -> usize {
        self.vecs.len()
    }

    /// Sizes of the batches allocated so far, oldest first.
    pub fn batches(&self) -> &[usize] {
        &self.batches
    }

    /// Length of each basis vector.
    pub fn vector_len(&self) -> usize {
        self.vecs[0].len()
    }

    pub fn vec(&self, i: usize) -> &V {
        &self.vecs[i]
    }

    pub fn vec_mut(&mut self, i: usize) -> &mut V {
        &mut self.vecs[i]
    }

    /// The first `n` vectors.
    pub fn vectors(&self, n: usize) -> &[V] {
        &self.vecs[..n]
    }

    /// `(V[0..=it], V[it+1])`: the orthonormal part and the vector being
    /// orthogonalized against it.
    pub fn split_newest(&mut self, it: usize) -> (&[V], &mut V) {
        let (head, tail) = self.vecs.split_at_mut(it + 1);
        (head, &mut tail[0])
    }
}
