use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// An exclusive lock on `<path>`, held by creating `<path>.lock`.
///
/// The same protocol git uses for its index and refs: whoever manages to
/// create the lock file owns the target. New content is written into the
/// lock file and published by renaming it over the target with `commit`.
/// Dropping an uncommitted lock releases it and leaves the target alone,
/// including after a failed `commit`.
#[derive(Debug)]
pub struct LockFile {
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl LockFile {
    /// Try to take the lock once.
    ///
    /// Fails with `io::ErrorKind::AlreadyExists` if somebody else holds it.
    pub fn try_acquire(target: &Path) -> io::Result<LockFile> {
        let lock_path = lock_path_for(target);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)?;

        Ok(LockFile {
            target: target.to_path_buf(),
            lock_path,
            file: Some(file),
            committed: false,
        })
    }

    /// Take the lock, waiting up to `timeout` for the current holder.
    ///
    /// Fails with `io::ErrorKind::TimedOut` if the lock could not be taken.
    pub fn acquire(target: &Path, timeout: Duration) -> io::Result<LockFile> {
        let deadline = Instant::now() + timeout;
        loop {
            match LockFile::try_acquire(target) {
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("{} is locked", lock_path_for(target).display()),
                        ));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                result => return result,
            }
        }
    }

    /// Path of the file this lock protects.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Replace the target with `content`.
    ///
    /// Readers observe either the old or the new file, never a mix.
    pub fn commit(mut self, content: &[u8]) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.write_all(content)?;
            file.sync_all()?;
        }
        fs::rename(&self.lock_path, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // A committed lock file has become the target.
        self.file.take();
        if !self.committed {
            if let Err(err) = fs::remove_file(&self.lock_path) {
                log::warn!(
                    target: "permissions",
                    "Could not release lock {}: {}",
                    self.lock_path.display(),
                    err
                );
            }
        }
    }
}

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}
