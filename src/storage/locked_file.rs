//! Scoped, locked access to a single data file.
//!
//! A [`LockedFile`] serializes access to one path in two layers, always taken in this order:
//! 1. a per-file gate ([`parking_lot::Mutex`]) so threads of this process queue up instead of
//!    racing on the OS lock call
//! 2. an advisory whole-file OS lock ([`fs2::FileExt`]) so other processes using the same
//!    data directory are serialized too
//!
//! The returned [`FileGuard`] releases both, in reverse order, when it goes out of scope.
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use parking_lot::{Mutex, MutexGuard};
use tracing::{trace, warn};

use crate::{RegistryError, Result};

// how long a bounded acquisition sleeps between attempts on a contended OS lock
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// Whether a guard permits other readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// read access, other shared holders allowed (across processes)
    Shared,
    /// read/write access, no other holder allowed
    Exclusive,
}

/// How long [`LockedFile::acquire`] may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    /// wait until the lock is granted, however long that takes
    Block,
    /// give up with `StorageUnavailable` once the duration has passed
    Timeout(Duration),
}

/// One data file plus the gate that serializes this process' access to it.
#[derive(Debug)]
pub struct LockedFile {
    path: PathBuf,
    gate: Mutex<()>,
    wait: LockWait,
}

impl LockedFile {
    /// a handle for `path`. The file itself is not touched until [`LockedFile::create`] or
    /// [`LockedFile::acquire`] is called.
    pub fn new(path: impl Into<PathBuf>, wait: LockWait) -> Self {
        LockedFile {
            path: path.into(),
            gate: Mutex::new(()),
            wait,
        }
    }

    /// the path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// creates the file if it does not exist yet
    pub fn create(&self) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(drop)
            .map_err(|e| RegistryError::storage(&self.path, e))
    }

    /// Blocks (subject to the [`LockWait`] policy) until this thread holds the gate and an OS
    /// lock in `mode` on the file.
    ///
    /// Shared access requires the file to exist; exclusive access creates it.
    ///
    /// # Errors
    /// `StorageUnavailable` if the file cannot be opened or locked, or the wait timed out
    pub fn acquire(&self, mode: LockMode) -> Result<FileGuard<'_>> {
        let deadline = match self.wait {
            LockWait::Block => None,
            LockWait::Timeout(timeout) => Some(Instant::now() + timeout),
        };

        let gate = match deadline {
            None => self.gate.lock(),
            Some(deadline) => self
                .gate
                .try_lock_until(deadline)
                .ok_or_else(|| self.timed_out())?,
        };

        loop {
            let file = self.open(mode)?;
            self.lock_os(&file, mode, deadline)?;

            // a rewrite may have renamed a new file over the one we just locked
            if self.still_linked(&file)? {
                trace!(path = ?self.path, ?mode, "file lock acquired");
                return Ok(FileGuard {
                    file,
                    mode,
                    path: &self.path,
                    _gate: gate,
                });
            }
            let _ = FileExt::unlock(&file);
        }
    }

    fn open(&self, mode: LockMode) -> Result<File> {
        let mut options = OpenOptions::new();
        options.read(true);
        if mode == LockMode::Exclusive {
            options.write(true).create(true).truncate(false);
        }
        options
            .open(&self.path)
            .map_err(|e| RegistryError::storage(&self.path, e))
    }

    fn lock_os(&self, file: &File, mode: LockMode, deadline: Option<Instant>) -> Result<()> {
        let deadline = match deadline {
            None => {
                let locked = match mode {
                    LockMode::Shared => FileExt::lock_shared(file),
                    LockMode::Exclusive => FileExt::lock_exclusive(file),
                };
                return locked.map_err(|e| RegistryError::storage(&self.path, e));
            }
            Some(deadline) => deadline,
        };

        let contended = fs2::lock_contended_error().raw_os_error();
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(file),
            };
            match attempt {
                Ok(()) => return Ok(()),
                Err(e) if e.raw_os_error() == contended => {
                    if Instant::now() >= deadline {
                        return Err(self.timed_out());
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(RegistryError::storage(&self.path, e)),
            }
        }
    }

    #[cfg(unix)]
    fn still_linked(&self, file: &File) -> Result<bool> {
        use std::os::unix::fs::MetadataExt;

        let locked = file.metadata()?;
        match std::fs::metadata(&self.path) {
            Ok(on_disk) => Ok(on_disk.dev() == locked.dev() && on_disk.ino() == locked.ino()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RegistryError::storage(&self.path, e)),
        }
    }

    #[cfg(not(unix))]
    fn still_linked(&self, _file: &File) -> Result<bool> {
        Ok(true)
    }

    fn timed_out(&self) -> RegistryError {
        RegistryError::storage(
            &self.path,
            io::Error::new(io::ErrorKind::TimedOut, "timed out waiting for file lock"),
        )
    }
}

/// Scoped access to a locked data file.
///
/// Dropping the guard releases the OS lock first and the gate second.
#[derive(Debug)]
pub struct FileGuard<'a> {
    // dropped before the gate
    file: File,
    mode: LockMode,
    path: &'a Path,
    _gate: MutexGuard<'a, ()>,
}

impl FileGuard<'_> {
    /// the locked file
    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    /// the mode the lock was taken in
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// path of the locked file
    pub fn path(&self) -> &Path {
        self.path
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = ?self.path, "could not release file lock: {}", e);
        }
        trace!(path = ?self.path, "file lock released");
    }
}
