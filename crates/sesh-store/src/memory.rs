use std::path::PathBuf;
use std::sync::Mutex;

use sesh_core::Environment;

use crate::error::StoreError;
use crate::snapshot;
use crate::traits::Store;

/// In-memory store for tests. Not durable, but it runs the same encode and
/// decode paths as the file-backed store, snapshot format included.
#[derive(Default)]
pub struct InMemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    fn load(&self) -> Result<Environment, StoreError> {
        match &*self.blob.lock().unwrap() {
            None => Ok(Environment::new()),
            Some(bytes) => {
                snapshot::decode(bytes, false).map_err(|e| StoreError::CorruptSnapshot {
                    path: PathBuf::from("<memory>"),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn save(&self, env: &Environment) -> Result<(), StoreError> {
        let bytes = snapshot::encode(env, false)?;
        *self.blob.lock().unwrap() = Some(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sesh_core::Value;

    #[test]
    fn starts_empty_and_round_trips() {
        let store = InMemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let mut env = Environment::new();
        env.set("x", Value::Int(5));
        store.save(&env).unwrap();
        assert_eq!(store.load().unwrap(), env);
    }
}
