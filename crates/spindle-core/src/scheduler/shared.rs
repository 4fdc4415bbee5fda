//! State shared between the scheduler, its workers and unit wakers
//!
//! One mutex protects the ready queue, the parked set, the pending count and
//! the stop flag. A unit's execution state is never touched while that mutex
//! is held: units are resumed and destroyed outside of it.

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::join::JoinHandle;
use crate::scheduler::waker::TaskWaker;
use crate::task::{Resume, Task, TaskId, TaskState};
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::Waker;
use std::time::Instant;

/// A submitted unit together with the waker it is resumed with
pub(crate) struct Runnable {
    task: Task,
    signal: Arc<TaskWaker>,
    waker: Waker,
    /// Resumes handed out since shutdown was requested
    resumes_after_stop: usize,
}

/// What a worker should do with a dequeued unit
pub(crate) enum Dispatch {
    /// Resume it
    Run(Runnable),
    /// Shutdown budget exhausted; destroy it without resuming
    Discard(Runnable),
}

/// Mutex-protected scheduler state
#[derive(Default)]
pub(crate) struct ReadyState {
    /// FIFO of units waiting to be resumed
    queue: VecDeque<Runnable>,
    /// Suspended units with no wake delivered yet
    parked: FxHashMap<TaskId, Runnable>,
    /// Submitted units not yet destroyed (queued, parked or running)
    pending: usize,
    stopped: bool,
}

impl ReadyState {
    fn is_idle(&self) -> bool {
        self.pending == 0 && self.queue.is_empty()
    }

    fn enqueue(&mut self, mut runnable: Runnable) {
        runnable.task.set_state(TaskState::Queued);
        self.queue.push_back(runnable);
    }
}

/// Monotonic counters
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub exhausted: AtomicU64,
    pub leftover: AtomicU64,
    pub resumes: AtomicU64,
    pub requeues: AtomicU64,
}

/// Point-in-time view of the mutex-protected state
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Occupancy {
    pub pending: usize,
    pub queued: usize,
    pub parked: usize,
}

/// Retires units when dropped, so the pending count stays right even if
/// destroying a unit unwinds
struct Retire<'a> {
    shared: &'a Shared,
    count: usize,
}

impl<'a> Retire<'a> {
    fn new(shared: &'a Shared, count: usize) -> Self {
        Self { shared, count }
    }
}

impl Drop for Retire<'_> {
    fn drop(&mut self) {
        self.shared.retire(self.count);
    }
}

pub(crate) struct Shared {
    state: Mutex<ReadyState>,
    /// Signalled when the queue gains a unit or stop is requested
    work_available: Condvar,
    /// Signalled when pending reaches zero with an empty queue
    idle: Condvar,
    pub(crate) counters: Counters,
    config: SchedulerConfig,
}

impl Shared {
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            state: Mutex::new(ReadyState::default()),
            work_available: Condvar::new(),
            idle: Condvar::new(),
            counters: Counters::default(),
            config,
        }
    }

    pub(crate) fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Take ownership of a unit and append it to the ready queue
    pub(crate) fn admit(self: &Arc<Self>, task: Task) -> Result<JoinHandle> {
        let handle = task.join_handle();
        let signal = Arc::new(TaskWaker::new(task.id(), Arc::downgrade(self)));
        let waker = Waker::from(signal.clone());
        let runnable = Runnable {
            task,
            signal,
            waker,
            resumes_after_stop: 0,
        };

        let mut state = self.state.lock();
        if state.stopped {
            drop(state);
            return Err(SchedulerError::Stopped);
        }
        if let Some(limit) = self.config.max_pending {
            if state.pending >= limit {
                drop(state);
                return Err(SchedulerError::AtCapacity { limit });
            }
        }

        let id = runnable.task.id();
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        state.pending += 1;
        state.enqueue(runnable);
        drop(state);

        self.work_available.notify_one();
        log::trace!("task {} submitted", id);
        Ok(handle)
    }

    /// Block until a unit is ready. Returns `None` once stop is requested and
    /// the queue is empty.
    pub(crate) fn next(&self) -> Option<Dispatch> {
        let mut state = self.state.lock();
        loop {
            if let Some(mut runnable) = state.queue.pop_front() {
                runnable.signal.clear();
                if !state.stopped {
                    return Some(Dispatch::Run(runnable));
                }
                runnable.resumes_after_stop += 1;
                if runnable.resumes_after_stop > self.config.shutdown_resume_budget {
                    return Some(Dispatch::Discard(runnable));
                }
                return Some(Dispatch::Run(runnable));
            }
            if state.stopped {
                return None;
            }
            self.work_available.wait(&mut state);
        }
    }

    /// Resume a dequeued unit once, then retire, requeue or park it
    pub(crate) fn run(&self, mut runnable: Runnable) {
        let id = runnable.task.id();
        self.counters.resumes.fetch_add(1, Ordering::Relaxed);

        match runnable.task.resume(&runnable.waker) {
            Resume::Finished => {
                match runnable.task.failure() {
                    Some(error) => {
                        log::warn!("{}", error);
                        self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    }
                    None => {
                        log::trace!("task {} completed", id);
                        self.counters.completed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                let _retire = Retire::new(self, 1);
                drop(runnable);
            }
            Resume::Suspended => {
                let mut state = self.state.lock();
                if runnable.signal.take_notified() {
                    self.counters.requeues.fetch_add(1, Ordering::Relaxed);
                    state.enqueue(runnable);
                    drop(state);
                    self.work_available.notify_one();
                    log::trace!("task {} yielded", id);
                } else {
                    state.parked.insert(id, runnable);
                    log::trace!("task {} parked", id);
                }
            }
        }
    }

    /// Destroy a unit whose shutdown budget ran out
    pub(crate) fn discard(&self, runnable: Runnable) {
        log::warn!(
            "task {} destroyed after {} resumes during shutdown",
            runnable.task.id(),
            self.config.shutdown_resume_budget
        );
        self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
        let _retire = Retire::new(self, 1);
        drop(runnable);
    }

    /// Called from a unit's waker
    pub(crate) fn wake(&self, signal: &TaskWaker) {
        let mut state = self.state.lock();
        match state.parked.remove(&signal.id()) {
            Some(runnable) => {
                self.counters.requeues.fetch_add(1, Ordering::Relaxed);
                state.enqueue(runnable);
                drop(state);
                self.work_available.notify_one();
            }
            // Running or already queued: the worker picks this up after the resume.
            None => signal.set_notified(),
        }
    }

    fn retire(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.pending -= count;
        if state.is_idle() {
            self.idle.notify_all();
        }
    }

    pub(crate) fn wait_idle(&self) {
        let mut state = self.state.lock();
        while !state.is_idle() {
            self.idle.wait(&mut state);
        }
    }

    pub(crate) fn wait_idle_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while !state.is_idle() {
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return state.is_idle();
            }
        }
        true
    }

    /// Set the stop flag and wake every worker. Returns false if it was already set.
    pub(crate) fn request_stop(&self) -> bool {
        let mut state = self.state.lock();
        if state.stopped {
            return false;
        }
        state.stopped = true;
        drop(state);
        self.work_available.notify_all();
        true
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Destroy everything still queued or parked. Only valid once the workers are joined.
    pub(crate) fn destroy_leftovers(&self) -> usize {
        let (queued, parked) = {
            let mut state = self.state.lock();
            (
                std::mem::take(&mut state.queue),
                std::mem::take(&mut state.parked),
            )
        };

        let count = queued.len() + parked.len();
        self.counters
            .leftover
            .fetch_add(count as u64, Ordering::Relaxed);
        let _retire = Retire::new(self, count);

        for runnable in queued.into_iter().chain(parked.into_values()) {
            log::warn!(
                "task {} destroyed at shutdown in state {:?}",
                runnable.task.id(),
                runnable.task.state()
            );
            drop(runnable);
        }
        count
    }

    pub(crate) fn occupancy(&self) -> Occupancy {
        let state = self.state.lock();
        Occupancy {
            pending: state.pending,
            queued: state.queue.len(),
            parked: state.parked.len(),
        }
    }
}
