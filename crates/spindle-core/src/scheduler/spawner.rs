//! Submission capability handed to running units

use crate::error::{Result, SchedulerError};
use crate::join::JoinHandle;
use crate::scheduler::shared::Shared;
use crate::task::{Task, TaskOutput};
use std::future::Future;
use std::sync::Weak;

/// Cloneable handle for submitting units to a scheduler
///
/// Unlike the [`Scheduler`](crate::Scheduler) itself, a `Spawner` can be
/// moved into unit bodies. It does not keep the scheduler alive; once the
/// scheduler is stopped or dropped, submissions fail with
/// [`SchedulerError::Stopped`].
#[derive(Clone)]
pub struct Spawner {
    shared: Weak<Shared>,
}

impl Spawner {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self { shared }
    }

    /// Submit an already created unit
    pub fn submit(&self, task: Task) -> Result<JoinHandle> {
        match self.shared.upgrade() {
            Some(shared) => shared.admit(task),
            None => Err(SchedulerError::Stopped),
        }
    }

    /// Create a unit from a future and submit it
    pub fn spawn<F>(&self, future: F) -> Result<JoinHandle>
    where
        F: Future + Send + 'static,
        F::Output: TaskOutput,
    {
        self.submit(Task::new(future))
    }
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawner")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}
