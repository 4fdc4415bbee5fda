//! Resumable units and their execution state

use crate::error::TaskError;
use crate::join::{Completion, JoinHandle};
use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Unique identifier for a Task
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

impl TaskId {
    /// Generate a new unique TaskId
    pub fn new() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a Task
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Just created, never resumed
    Created,
    /// Waiting in the ready queue
    Queued,
    /// Currently being resumed
    Running,
    /// Stopped at a suspension point
    Suspended,
    /// Finished successfully
    Completed,
    /// Finished with a failure
    Failed,
}

/// Result of a single [`Task::resume`] call
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resume {
    /// The unit stopped at a suspension point and can be resumed again
    Suspended,
    /// The unit finished; see [`Task::is_done`]
    Finished,
}

/// Values a unit body may finish with
pub trait TaskOutput {
    /// Convert into the unit's outcome
    fn into_outcome(self, task: TaskId) -> Result<(), TaskError>;
}

impl TaskOutput for () {
    fn into_outcome(self, _task: TaskId) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Bodies that never return, such as `async fn serve() -> Infallible`
impl TaskOutput for Infallible {
    fn into_outcome(self, _task: TaskId) -> Result<(), TaskError> {
        match self {}
    }
}

impl<E> TaskOutput for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_outcome(self, task: TaskId) -> Result<(), TaskError> {
        self.map_err(|e| TaskError::Failed {
            task,
            error: e.into(),
        })
    }
}

type Body = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;

/// A resumable unit of work
///
/// A `Task` is the single owner of its execution state. It is moved, never
/// shared: from its creator into the scheduler, from the ready queue into a
/// worker and back. Dropping it destroys the execution state and publishes
/// the outcome to its [`JoinHandle`]; a unit dropped before finishing reports
/// [`TaskError::Abandoned`].
pub struct Task {
    id: TaskId,
    body: Option<Body>,
    state: TaskState,
    resumes: u64,
    outcome: Option<Result<(), TaskError>>,
    completion: Arc<Completion>,
}

impl Task {
    /// Create a unit from a future. Nothing runs until the first resume.
    ///
    /// The body must finish with `()`, `Result<(), E>` or [`Infallible`].
    /// An `async` block whose only exit is an endless `loop` has type `!`,
    /// which does not infer to any of these; put the loop in an
    /// `async fn ... -> Infallible` instead:
    ///
    /// ```rust
    /// use spindle_core::{yield_now, Task};
    /// use std::convert::Infallible;
    ///
    /// async fn heartbeat() -> Infallible {
    ///     loop {
    ///         yield_now().await;
    ///     }
    /// }
    ///
    /// let task = Task::new(heartbeat());
    /// assert!(!task.is_done());
    /// ```
    pub fn new<F>(future: F) -> Self
    where
        F: Future + Send + 'static,
        F::Output: TaskOutput,
    {
        let id = TaskId::new();
        Self {
            id,
            body: Some(Box::pin(async move { future.await.into_outcome(id) })),
            state: TaskState::Created,
            resumes: 0,
            outcome: None,
            completion: Completion::new(),
        }
    }

    /// Get the Task's unique ID
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the current state
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    /// Number of times this unit has been resumed
    pub fn resumes(&self) -> u64 {
        self.resumes
    }

    /// Whether the unit has finished (successfully or not)
    pub fn is_done(&self) -> bool {
        matches!(self.state, TaskState::Completed | TaskState::Failed)
    }

    /// Stored failure, if the unit finished with one
    pub fn failure(&self) -> Option<&TaskError> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().err())
    }

    pub(crate) fn join_handle(&self) -> JoinHandle {
        JoinHandle::new(self.id, self.completion.clone())
    }

    /// Run the unit until its next suspension point or until it finishes
    ///
    /// `waker` is handed to the unit's suspension points; the scheduler uses
    /// it to learn that the unit wants to be resumed again. A panic in the
    /// unit is caught and recorded as [`TaskError::Panicked`]. Resuming a
    /// finished unit does nothing.
    pub fn resume(&mut self, waker: &Waker) -> Resume {
        let Some(body) = self.body.as_mut() else {
            return Resume::Finished;
        };

        self.state = TaskState::Running;
        self.resumes += 1;

        let mut cx = Context::from_waker(waker);
        match panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx))) {
            Ok(Poll::Pending) => {
                self.state = TaskState::Suspended;
                Resume::Suspended
            }
            Ok(Poll::Ready(outcome)) => self.finish(outcome),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.finish(Err(TaskError::Panicked {
                    task: self.id,
                    message,
                }))
            }
        }
    }

    fn finish(&mut self, outcome: Result<(), TaskError>) -> Resume {
        let outcome = match (self.release_body(), outcome) {
            (Some(message), Ok(())) => Err(TaskError::Panicked {
                task: self.id,
                message,
            }),
            (_, outcome) => outcome,
        };
        self.state = if outcome.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        self.outcome = Some(outcome);
        Resume::Finished
    }

    /// Drop the execution state, catching a panic from a captured value's
    /// destructor. Returns the panic message if there was one.
    fn release_body(&mut self) -> Option<String> {
        let body = self.body.take()?;
        panic::catch_unwind(AssertUnwindSafe(move || drop(body)))
            .err()
            .map(|payload| panic_message(payload.as_ref()))
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        // Execution state goes first so its destructors run before joiners wake.
        if let Some(message) = self.release_body() {
            log::warn!("task {} panicked while being destroyed: {}", self.id, message);
        }
        let outcome = self
            .outcome
            .take()
            .unwrap_or(Err(TaskError::Abandoned { task: self.id }));
        self.completion.publish(outcome);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("resumes", &self.resumes)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
