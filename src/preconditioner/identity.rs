// Identity preconditioner: z = r

use crate::core::traits::Vector;
use crate::error::KError;
use crate::preconditioner::Preconditioner;

/// M⁻¹ = I. Useful as an explicit "no preconditioning" object.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl<M, V: Vector> Preconditioner<M, V> for Identity {
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError> {
        z.copy_from(r);
        Ok(())
    }
}
