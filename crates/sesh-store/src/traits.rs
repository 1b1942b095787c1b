use sesh_core::Environment;

use crate::error::StoreError;

/// Durably carries an environment across process boundaries.
pub trait Store {
    /// Read the snapshot. A missing snapshot is the normal first-run path
    /// and produces an empty environment, not an error.
    fn load(&self) -> Result<Environment, StoreError>;

    /// Replace the snapshot with the full contents of `env`. All-or-nothing:
    /// a failed save leaves the previous snapshot readable.
    fn save(&self, env: &Environment) -> Result<(), StoreError>;
}
