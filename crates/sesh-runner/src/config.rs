use std::path::PathBuf;

/// Default snapshot location, relative to the working directory. The dot
/// prefix marks it as hidden session state.
pub const DEFAULT_STATE_FILE: &str = ".sesh_state.json";

#[derive(Clone, Debug)]
pub struct Config {
    /// Snapshot file carrying the environment between invocations.
    pub state_file: PathBuf,
    /// Skip per-binding defects on load/save instead of failing whole.
    pub lenient: bool,
}

impl Config {
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            lenient: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_FILE)
    }
}
