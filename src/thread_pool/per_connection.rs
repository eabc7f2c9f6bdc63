use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::debug;

use super::ThreadPool;
use crate::Result;

/// a "pool" that is not actually a pool. It starts a new, named thread on every spawn
/// request, so every connection gets its own thread and there is no upper bound.
#[derive(Debug, Default)]
pub struct ThreadPerConnection {
    spawned: AtomicU64,
}

impl ThreadPool for ThreadPerConnection {
    fn new(_threads: u32) -> Result<Self> {
        Ok(ThreadPerConnection::default())
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed) + 1;
        thread::Builder::new()
            .name(format!("academia-session-{}", n))
            .spawn(job)?;
        debug!(session = n, "started session thread");
        Ok(())
    }
}
