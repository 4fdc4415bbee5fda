//! Scheduler owning the worker pool

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::join::JoinHandle;
use crate::scheduler::shared::Shared;
use crate::scheduler::spawner::Spawner;
use crate::scheduler::worker::Worker;
use crate::task::{Task, TaskOutput};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scheduler statistics
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Total units accepted by `submit`
    pub tasks_submitted: u64,

    /// Units that finished successfully
    pub tasks_completed: u64,

    /// Units that finished with an error or a panic
    pub tasks_failed: u64,

    /// Units destroyed during shutdown before finishing
    pub tasks_abandoned: u64,

    /// Total resume calls
    pub resumes: u64,

    /// Times a suspended unit went back on the ready queue
    pub requeues: u64,

    /// Submitted units not yet destroyed
    pub pending: usize,

    /// Units currently in the ready queue
    pub queued: usize,

    /// Suspended units waiting for a wake
    pub parked: usize,
}

/// Units destroyed by [`Scheduler::shutdown`] without finishing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Units still yielding after their shutdown resume budget ran out
    pub exhausted: usize,

    /// Units left parked or queued once the workers had exited
    pub leftover: usize,
}

impl DrainReport {
    /// Total units destroyed without finishing
    pub fn abandoned(&self) -> usize {
        self.exhausted + self.leftover
    }
}

/// Cooperative scheduler running units on a fixed pool of worker threads
///
/// Units are taken from a single FIFO ready queue. A unit runs until it
/// finishes or reaches a suspension point such as
/// [`yield_now`](crate::yield_now); a yielding unit goes to the back of the
/// queue and may be resumed on any worker. Units must not block a worker
/// thread.
///
/// Dropping the scheduler shuts it down. See [`Scheduler::shutdown`].
pub struct Scheduler {
    /// State shared with workers and wakers
    shared: Arc<Shared>,

    /// Worker threads
    workers: Vec<Worker>,

    /// Set once shutdown has completed
    drained: Option<DrainReport>,
}

impl Scheduler {
    /// Create a scheduler with the specified number of workers
    /// If worker_count is 0, defaults to the number of CPU cores
    pub fn new(worker_count: usize) -> Result<Self> {
        Self::with_config(SchedulerConfig::with_workers(worker_count))
    }

    /// Create a scheduler from a full configuration
    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        let worker_count = config.resolved_worker_count();
        let mut scheduler = Self {
            shared: Arc::new(Shared::new(config)),
            workers: Vec::with_capacity(worker_count),
            drained: None,
        };

        for id in 0..worker_count {
            let mut worker = Worker::new(id);
            // On failure, dropping `scheduler` joins the workers started so far.
            worker.start(&scheduler.shared)?;
            scheduler.workers.push(worker);
        }

        log::debug!("scheduler started with {} workers", worker_count);
        Ok(scheduler)
    }

    /// Submit a unit; the scheduler owns it from here on
    ///
    /// Fails with [`SchedulerError::Stopped`](crate::SchedulerError::Stopped)
    /// once shutdown has begun, and with
    /// [`SchedulerError::AtCapacity`](crate::SchedulerError::AtCapacity) when
    /// `max_pending` is configured and reached.
    pub fn submit(&self, task: Task) -> Result<JoinHandle> {
        self.shared.admit(task)
    }

    /// Create a unit from a future and submit it
    pub fn spawn<F>(&self, future: F) -> Result<JoinHandle>
    where
        F: Future + Send + 'static,
        F::Output: TaskOutput,
    {
        self.submit(Task::new(future))
    }

    /// A submission handle that units can carry
    pub fn spawner(&self) -> Spawner {
        Spawner::new(Arc::downgrade(&self.shared))
    }

    /// Block until every submitted unit has been destroyed and the queue is empty
    ///
    /// Must not be called from inside a unit: the calling unit would wait for itself.
    pub fn wait_idle(&self) {
        self.shared.wait_idle();
    }

    /// Like [`wait_idle`](Self::wait_idle), giving up after `timeout`.
    /// Returns whether the scheduler became idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        self.shared.wait_idle_until(Instant::now() + timeout)
    }

    /// Submitted units not yet destroyed
    pub fn pending(&self) -> usize {
        self.shared.occupancy().pending
    }

    /// Number of workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether shutdown has been requested
    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Stop accepting units, let the workers drain the queue, join them,
    /// and destroy whatever could not finish
    ///
    /// Once stop is set, workers keep resuming queued units until the queue
    /// is empty. Each unit gets at most
    /// [`shutdown_resume_budget`](SchedulerConfig::shutdown_resume_budget)
    /// further resumes, after which it is destroyed unresumed. Units still
    /// parked when the workers exit are destroyed too. Destroyed units report
    /// [`TaskError::Abandoned`](crate::TaskError::Abandoned) to their join
    /// handles.
    ///
    /// Calling this again returns the first report.
    pub fn shutdown(&mut self) -> DrainReport {
        if let Some(report) = self.drained {
            return report;
        }

        self.shared.request_stop();
        log::debug!("scheduler stop requested");

        for worker in &mut self.workers {
            worker.join();
        }

        let leftover = self.shared.destroy_leftovers();
        let report = DrainReport {
            exhausted: self.shared.counters.exhausted.load(Ordering::Relaxed) as usize,
            leftover,
        };

        if report.abandoned() > 0 {
            log::warn!(
                "shutdown destroyed {} unfinished units ({} over budget, {} left over)",
                report.abandoned(),
                report.exhausted,
                report.leftover
            );
        } else {
            log::debug!("scheduler drained cleanly");
        }

        self.drained = Some(report);
        report
    }

    /// Get scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        let occupancy = self.shared.occupancy();

        SchedulerStats {
            tasks_submitted: counters.submitted.load(Ordering::Relaxed),
            tasks_completed: counters.completed.load(Ordering::Relaxed),
            tasks_failed: counters.failed.load(Ordering::Relaxed),
            tasks_abandoned: counters.exhausted.load(Ordering::Relaxed)
                + counters.leftover.load(Ordering::Relaxed),
            resumes: counters.resumes.load(Ordering::Relaxed),
            requeues: counters.requeues.load(Ordering::Relaxed),
            pending: occupancy.pending,
            queued: occupancy.queued,
            parked: occupancy.parked,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
