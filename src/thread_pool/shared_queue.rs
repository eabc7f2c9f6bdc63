use std::io;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, instrument};

use super::ThreadPool;
use crate::{RegistryError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded worker pool fed by a shared job queue.
///
/// This implementation uses the MPMC [`channel`] provided by the crossbeam crate as a single
/// producer (the pool itself), multiple consumer (the workers) queue. With `n` workers at most
/// `n` sessions are served at once; further connections wait in the queue.
///
/// If a job panics, its worker is replaced by a new thread. Failing to start the replacement
/// is only logged, so the number of workers can shrink, and once it reaches zero
/// [`ThreadPool::spawn`] returns an error.
///
/// [`channel`]: https://docs.rs/crossbeam/0.8.1/crossbeam/channel/index.html
#[derive(Debug)]
pub struct SharedQueueThreadPool {
    /// the sending part of the channel
    tx: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {
    /// create a new pool with the given number of `threads`.
    /// Every worker gets a handle to the receiving end of the channel
    fn new(threads: u32) -> Result<Self> {
        if threads == 0 {
            return Err(RegistryError::InvalidInput(
                "a shared queue pool needs at least one thread".into(),
            ));
        }
        let (tx, rx) = channel::unbounded::<Job>();
        for n in 0..threads {
            let task_rx = TaskReceiver(rx.clone());
            thread::Builder::new()
                .name(format!("academia-worker-{}", n))
                .spawn(move || run_tasks(task_rx))?;
        }
        debug!(threads, "created shared queue pool");
        Ok(SharedQueueThreadPool { tx })
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(job)).map_err(|_| {
            RegistryError::Io(io::Error::new(
                io::ErrorKind::Other,
                "there are no threads left in the pool",
            ))
        })
    }
}

/// A type that can receive jobs from a channel and run them.
/// This type is also responsible for restarting any worker that panicked
#[derive(Clone, Debug)]
struct TaskReceiver(Receiver<Job>);

impl Drop for TaskReceiver {
    fn drop(&mut self) {
        if thread::panicking() {
            debug!("worker panicked, starting a new one");
            let task_rx = self.clone();
            if let Err(e) = thread::Builder::new().spawn(move || run_tasks(task_rx)) {
                error!("Failed to spawn a worker: {}", e);
            }
        }
    }
}

/// waits for jobs to arrive on the (wrapped) receiver and runs them, until the pool is dropped
#[instrument(skip(rx))]
fn run_tasks(rx: TaskReceiver) {
    while let Ok(job) = rx.0.recv() {
        job();
    }
    debug!("worker exited because the pool was dropped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_utils::sync::WaitGroup;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_every_job() {
        let pool = SharedQueueThreadPool::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let wg = WaitGroup::new();
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            let wg = wg.clone();
            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(wg);
            })
            .unwrap();
        }
        wg.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn panicking_job_does_not_shrink_the_pool() {
        let pool = SharedQueueThreadPool::new(1).unwrap();
        pool.spawn(|| panic!("job failed")).unwrap();

        let wg = WaitGroup::new();
        let done = wg.clone();
        pool.spawn(move || drop(done)).unwrap();
        wg.wait();
    }

    #[test]
    fn zero_threads_is_invalid() {
        assert!(matches!(
            SharedQueueThreadPool::new(0),
            Err(RegistryError::InvalidInput(_))
        ));
    }
}
