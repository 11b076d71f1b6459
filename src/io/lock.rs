use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

/// Lock file kept in the board directory while a write command runs
pub const LOCK_FILE: &str = ".taskboard.lock";

/// How long write commands wait for another `tb` process
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Error type for the board write lock
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError { path: PathBuf, source: io::Error },
    #[error("board is locked ({path}): another tb process is writing")]
    Timeout { path: PathBuf },
}

/// Exclusive advisory lock over a board's documents, held for one
/// read-modify-write. Released (and the lock file removed) on drop.
#[derive(Debug)]
pub struct BoardLock {
    _file: File,
    path: PathBuf,
}

impl BoardLock {
    /// Take the lock on `board_dir`, retrying until `timeout` has passed.
    pub fn acquire(board_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = board_dir.join(LOCK_FILE);
        let deadline = Instant::now() + timeout;

        loop {
            let file = open_lock_file(&path)?;
            if flock_exclusive(&file).is_ok() {
                debug!(path = %path.display(), "board lock taken");
                return Ok(BoardLock { _file: file, path });
            }
            if Instant::now() >= deadline {
                return Err(LockError::Timeout { path });
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
    }

    pub fn acquire_default(board_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(board_dir, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BoardLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|source| LockError::CreateError {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(unix)]
fn flock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor stays open for the duration of the call
    match unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } {
        0 => Ok(()),
        _ => Err(io::Error::last_os_error()),
    }
}

#[cfg(not(unix))]
fn flock_exclusive(_file: &File) -> io::Result<()> {
    Ok(())
}
