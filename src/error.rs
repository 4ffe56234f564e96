use std::collections::TryReserveError;
use thiserror::Error;

// Unified error type for kgmres

#[derive(Error, Debug)]
pub enum KError {
    #[error("allocation failed while growing {what}: {source}")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("dimension mismatch: expected length {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("preconditioner error: {0}")]
    PreconditionerError(String),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("unknown solver type: {0}")]
    UnknownSolver(String),
    #[error("solve called before setup")]
    NotSetUp,
}
