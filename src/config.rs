//! Capacity constants, data file names and the store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::LockWait;

/// Capacity of an identifier field in bytes, terminator included (9 usable characters).
pub const ID_CAPACITY: usize = 10;

/// Capacity of a display name field in bytes, terminator included.
pub const NAME_CAPACITY: usize = 50;

/// Capacity of a password field in bytes, terminator included.
pub const PASSWORD_CAPACITY: usize = 50;

/// Number of enrollment slots every student record carries.
pub const MAX_COURSES: usize = 100;

/// Number of enrolled-student entries every course record carries. Also the largest seat count.
pub const MAX_SEATS: usize = 100;

/// file holding [`User`](crate::User) records
pub const USERS_FILE: &str = "users.dat";
/// file holding [`Student`](crate::Student) records
pub const STUDENTS_FILE: &str = "students.dat";
/// file holding [`Faculty`](crate::Faculty) records
pub const FACULTY_FILE: &str = "faculty.dat";
/// file holding [`Course`](crate::Course) records
pub const COURSES_FILE: &str = "courses.dat";

/// the address the server listens on, and the client connects to, by default
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";

/// Where the registry keeps its data files and how long lock acquisition may wait.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// directory containing the four data files, created if missing
    pub data_dir: PathBuf,
    /// wait policy used for every file lock
    pub lock_wait: LockWait,
}

impl StoreConfig {
    /// a config for `data_dir` that blocks without limit on contended files
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_dir: data_dir.into(),
            lock_wait: LockWait::Block,
        }
    }

    /// bound every lock acquisition by `timeout`
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait = LockWait::Timeout(timeout);
        self
    }

    pub(crate) fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// the data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
