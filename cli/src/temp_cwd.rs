use std::{
    env,
    path::{Path, PathBuf},
};

/// Runs a test from inside another directory, such as an empty storage
/// directory for commands that default to the current one.
///
/// The previous working directory comes back on drop. The working directory
/// is process-wide, so tests using this must be `#[serial]`.
pub(crate) struct TempCwd {
    previous: PathBuf,
}

impl TempCwd {
    pub fn new<P: AsRef<Path>>(path: P) -> TempCwd {
        let previous = env::current_dir().unwrap();
        env::set_current_dir(path).unwrap();

        TempCwd { previous }
    }
}

impl Drop for TempCwd {
    fn drop(&mut self) {
        env::set_current_dir(&self.previous).unwrap();
    }
}
