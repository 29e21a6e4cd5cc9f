//! Advisory lock on a store directory, shared by every process using it.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

const LOCK_FILE: &str = ".lock";

/// Exclusive lock on `<dir>/.lock`, released on drop.
///
/// Only Unix platforms are locked. Elsewhere acquiring always succeeds.
#[derive(Debug)]
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Blocks until no other holder, in this or another process, has the lock.
    pub fn acquire(dir: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        Self::lock(&file)?;

        Ok(Self { _file: file })
    }

    /// Non-blocking variant. Fails with [`io::ErrorKind::WouldBlock`] if held.
    pub fn try_acquire(dir: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        Self::try_lock(&file)?;

        Ok(Self { _file: file })
    }

    #[cfg(unix)]
    fn lock(file: &File) -> io::Result<()> {
        Self::flock(file, libc::LOCK_EX)
    }

    #[cfg(unix)]
    fn try_lock(file: &File) -> io::Result<()> {
        Self::flock(file, libc::LOCK_EX | libc::LOCK_NB).map_err(|e| {
            if e.raw_os_error() == Some(libc::EWOULDBLOCK) {
                io::Error::new(io::ErrorKind::WouldBlock, "store directory is locked")
            } else {
                e
            }
        })
    }

    #[cfg(unix)]
    fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        // SAFETY: the descriptor stays open for the lifetime of `file`.
        let result = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn lock(_file: &File) -> io::Result<()> {
        Ok(())
    }

    #[cfg(not(unix))]
    fn try_lock(_file: &File) -> io::Result<()> {
        Ok(())
    }
}
