//! Thread pools that run one client session per job.
//!
//! The server only talks to the [`ThreadPool`] trait, so the default unbounded
//! [`ThreadPerConnection`] can be swapped for the bounded [`SharedQueueThreadPool`] without
//! touching the session or storage code.
use crate::Result;

/// Runs jobs on background threads.
pub trait ThreadPool {
    /// Creates a pool with `threads` workers. Pools that are not bounded may ignore it.
    ///
    /// # Errors
    /// Returns an error if a worker thread could not be started or `threads` is invalid.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Hands `job` to the pool.
    ///
    /// # Errors
    /// Returns an error if the job could not be scheduled.
    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;
}

mod per_connection;
mod shared_queue;

pub use self::per_connection::ThreadPerConnection;
pub use self::shared_queue::SharedQueueThreadPool;
