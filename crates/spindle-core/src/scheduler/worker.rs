//! Worker thread that resumes units
//!
//! Workers block on the shared ready queue, resume one unit at a time and
//! exit once stop is requested and the queue has run dry.

use crate::scheduler::shared::{Dispatch, Shared};
use std::io;
use std::sync::Arc;
use std::thread;

/// Worker thread that resumes units
pub(crate) struct Worker {
    /// Worker ID
    id: usize,

    /// Worker thread handle
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Self {
        Self { id, handle: None }
    }

    /// Start the worker thread
    pub(crate) fn start(&mut self, shared: &Arc<Shared>) -> io::Result<()> {
        let id = self.id;
        let shared = shared.clone();
        let name = format!("{}-{}", shared.config().thread_name_prefix, id);

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || Worker::run_loop(id, &shared))?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Wait for the worker thread to exit. The stop flag must already be set.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("worker {} terminated by a panic", self.id);
            }
        }
    }

    /// Worker thread main loop
    fn run_loop(id: usize, shared: &Shared) {
        log::debug!("worker {} started", id);

        while let Some(dispatch) = shared.next() {
            match dispatch {
                Dispatch::Run(runnable) => shared.run(runnable),
                Dispatch::Discard(runnable) => shared.discard(runnable),
            }
        }

        log::debug!("worker {} exiting", id);
    }

    /// Check if the worker thread has been started and not joined
    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::task::Task;
    use std::time::Duration;

    #[test]
    fn test_worker_start_join() {
        let shared = Arc::new(Shared::new(SchedulerConfig::default()));
        let mut worker = Worker::new(0);
        assert!(!worker.is_running());

        worker.start(&shared).unwrap();
        assert!(worker.is_running());

        shared.request_stop();
        worker.join();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_worker_executes_queued_units() {
        let shared = Arc::new(Shared::new(SchedulerConfig::default()));
        let handles: Vec<_> = (0..3)
            .map(|_| shared.admit(Task::new(async {})).unwrap())
            .collect();

        let mut worker = Worker::new(0);
        worker.start(&shared).unwrap();

        for handle in handles {
            assert!(handle.join_timeout(Duration::from_secs(5)).unwrap().is_ok());
        }

        shared.request_stop();
        worker.join();
        assert_eq!(shared.occupancy().pending, 0);
    }
}
