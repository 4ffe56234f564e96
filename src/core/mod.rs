//! Operator, vector and inner-product abstractions plus their implementations
//! for `faer` matrices and `Vec<T>`.

pub mod traits;
pub mod wrappers;

pub use traits::{Indexing, InnerProduct, MatVec, Vector};
