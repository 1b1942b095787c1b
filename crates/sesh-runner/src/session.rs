use anyhow::{Context, Result};

use sesh_store::{FileStore, SessionLock, Store};

use crate::config::Config;

/// One invocation's exclusive handle on a persistent session.
///
/// Opening acquires the session lock; it is held until the session drops,
/// covering the whole load..save window.
#[derive(Debug)]
pub struct Session {
    store: FileStore,
    _lock: SessionLock,
}

impl Session {
    pub fn open(cfg: &Config) -> Result<Self> {
        let lock = SessionLock::acquire(&cfg.state_file)?;
        let mut store = FileStore::new(cfg.state_file.clone());
        store.lenient = cfg.lenient;
        Ok(Self { store, _lock: lock })
    }

    /// Run one payload: restore the environment, execute the code against
    /// it, persist the result.
    ///
    /// An execution error returns before the save, so the snapshot keeps the
    /// bindings exactly as they were before this invocation.
    pub fn run(&self, code: &str) -> Result<()> {
        let mut env = self.store.load()?;
        tracing::debug!(bindings = env.len(), "restored environment");

        sesh_lang::execute(code, &mut env)?;
        tracing::debug!(bindings = env.len(), "execution finished");

        self.store.save(&env).context("persist session")?;
        Ok(())
    }
}
