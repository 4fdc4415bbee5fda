//! Join handles for observing a unit's outcome

use crate::error::TaskError;
use crate::task::TaskId;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome slot shared between a unit and its join handle
#[derive(Default)]
pub(crate) struct Completion {
    outcome: Mutex<Option<Result<(), TaskError>>>,
    done: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store the final outcome and wake every joiner. Called once, when the unit is destroyed.
    pub(crate) fn publish(&self, outcome: Result<(), TaskError>) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }
}

/// Handle for awaiting a submitted unit's outcome
///
/// The outcome becomes available once the unit has been destroyed, either
/// after completing or because shutdown discarded it.
pub struct JoinHandle {
    id: TaskId,
    completion: Arc<Completion>,
}

impl JoinHandle {
    pub(crate) fn new(id: TaskId, completion: Arc<Completion>) -> Self {
        Self { id, completion }
    }

    /// Id of the unit this handle observes
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the outcome is available
    pub fn is_finished(&self) -> bool {
        self.completion.outcome.lock().is_some()
    }

    /// Block until the unit has been destroyed and return its outcome
    pub fn join(self) -> Result<(), TaskError> {
        let mut outcome = self.completion.outcome.lock();
        loop {
            if let Some(result) = outcome.take() {
                return result;
            }
            self.completion.done.wait(&mut outcome);
        }
    }

    /// Like [`join`](Self::join), but gives the handle back if the outcome
    /// is not available within `timeout`
    pub fn join_timeout(self, timeout: Duration) -> Result<Result<(), TaskError>, JoinHandle> {
        let deadline = Instant::now() + timeout;
        {
            let mut outcome = self.completion.outcome.lock();
            loop {
                if let Some(result) = outcome.take() {
                    return Ok(result);
                }
                if self
                    .completion
                    .done
                    .wait_until(&mut outcome, deadline)
                    .timed_out()
                {
                    if let Some(result) = outcome.take() {
                        return Ok(result);
                    }
                    break;
                }
            }
        }
        Err(self)
    }
}

impl std::fmt::Debug for JoinHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinHandle")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}
