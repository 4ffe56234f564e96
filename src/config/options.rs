//! Options for the GMRES solver.
//!
//! `GmresOptions` collects every knob of the solver in one plain struct with
//! PETSc-like defaults. Options can be set field by field or through
//! `GmresOptions::set`, which accepts string keys and values (for example
//! from a configuration file or command line) and validates them.

use bitflags::bitflags;
use num_traits::Float;

use crate::error::KError;
use crate::solver::gmres::Preconditioning;
use crate::solver::gmres::orthog::OrthogKind;

bitflags! {
    /// Per-solve switches.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SolveFlags: u32 {
        /// The incoming solution vector is ignored and treated as zero.
        const GUESS_ZERO  = 0b0000_0001;
        /// Allocate all `restart + 1` basis vectors during setup.
        const PREALLOCATE = 0b0000_0010;
    }
}

/// Default restart length.
pub const DEFAULT_RESTART: usize = 10;
/// Default number of basis vectors added when the basis grows.
pub const DEFAULT_DELTA_ALLOCATE: usize = 5;

/// GMRES options & parameters.
#[derive(Debug, Clone)]
pub struct GmresOptions<T> {
    /// Krylov directions per cycle (`max_k`).
    pub restart: usize,
    /// Upper bound of the happy-breakdown threshold.
    pub haptol: T,
    /// Scale of the happy-breakdown threshold.
    pub epsabs: T,
    pub rtol: T,
    pub atol: T,
    /// Total inner-iteration budget over all cycles.
    pub max_it: usize,
    pub delta_allocate: usize,
    pub preconditioning: Preconditioning,
    pub orthog: OrthogKind,
    pub flags: SolveFlags,
    /// Length of the residual-history buffer, if one is kept.
    pub history_len: Option<usize>,
}

impl<T: Float> Default for GmresOptions<T> {
    fn default() -> Self {
        Self {
            restart: DEFAULT_RESTART,
            haptol: from_f64(1.0e-8),
            epsabs: from_f64(1.0e-8),
            rtol: from_f64(1.0e-5),
            atol: from_f64(1.0e-50),
            max_it: 10_000,
            delta_allocate: DEFAULT_DELTA_ALLOCATE,
            preconditioning: Preconditioning::Left,
            orthog: OrthogKind::Modified,
            flags: SolveFlags::empty(),
            history_len: None,
        }
    }
}

fn from_f64<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::epsilon)
}

fn parse_scalar<T: Float>(key: &str, value: &str) -> Result<T, KError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|v| T::from(v))
        .ok_or_else(|| KError::InvalidConfig(format!("{key}: expected a number, got {value:?}")))
}

fn parse_count(key: &str, value: &str) -> Result<usize, KError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| KError::InvalidConfig(format!("{key}: expected a non-negative integer, got {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, KError> {
    match value.trim() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(KError::InvalidConfig(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

impl<T: Float> GmresOptions<T> {
    /// Set one option from its string form.
    ///
    /// Recognised keys: `restart`, `haptol`, `epsabs`, `rtol`, `atol`,
    /// `max_it`, `delta_allocate`, `pc_side`, `orthog`, `guess_zero`,
    /// `preallocate`, `history`. A leading `-ksp_gmres_` or `-ksp_` prefix is
    /// accepted and ignored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), KError> {
        let name = key
            .trim_start_matches("-ksp_gmres_")
            .trim_start_matches("-ksp_");
        match name {
            "restart" => self.restart = parse_count(key, value)?,
            "haptol" => self.haptol = parse_scalar(key, value)?,
            "epsabs" => self.epsabs = parse_scalar(key, value)?,
            "rtol" => self.rtol = parse_scalar(key, value)?,
            "atol" => self.atol = parse_scalar(key, value)?,
            "max_it" => self.max_it = parse_count(key, value)?,
            "delta_allocate" => self.delta_allocate = parse_count(key, value)?,
            "pc_side" => self.preconditioning = value.parse()?,
            "orthog" => self.orthog = value.parse()?,
            "guess_zero" => self.flags.set(SolveFlags::GUESS_ZERO, parse_bool(key, value)?),
            "preallocate" => self.flags.set(SolveFlags::PREALLOCATE, parse_bool(key, value)?),
            "history" => self.history_len = Some(parse_count(key, value)?),
            _ => return Err(KError::InvalidConfig(format!("unknown option {key:?}"))),
        }
        Ok(())
    }

    /// Reject settings the solver cannot run with.
    pub fn validate(&self) -> Result<(), KError> {
        if self.restart == 0 {
            return Err(KError::InvalidConfig("restart must be at least 1".into()));
        }
        if self.delta_allocate == 0 {
            return Err(KError::InvalidConfig("delta_allocate must be at least 1".into()));
        }
        for (name, v) in [("haptol", self.haptol), ("epsabs", self.epsabs), ("rtol", self.rtol), ("atol", self.atol)] {
            if !(v >= T::zero()) {
                return Err(KError::InvalidConfig(format!("{name} must be non-negative")));
            }
        }
        Ok(())
    }
}
