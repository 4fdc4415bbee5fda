//! Units written as explicit step functions instead of `async` blocks

use crate::task::Task;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// What a step function wants after running one step
#[derive(Debug)]
pub enum Step {
    /// Suspend and be called again later
    Yield,
    /// The unit is finished
    Done,
    /// The unit is finished with a failure
    Fail(anyhow::Error),
}

struct StepFn<F> {
    step: F,
}

// The closure is only ever called through `&mut`, never pinned.
impl<F> Unpin for StepFn<F> {}

impl<F> Future for StepFn<F>
where
    F: FnMut() -> Step,
{
    type Output = anyhow::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match (self.step)() {
            Step::Yield => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Step::Done => Poll::Ready(Ok(())),
            Step::Fail(error) => Poll::Ready(Err(error)),
        }
    }
}

impl Task {
    /// Create a unit from a step function
    ///
    /// Each resume calls `step` once. The closure keeps its own locals
    /// between calls, which makes it a hand-written state machine.
    pub fn from_steps<F>(step: F) -> Task
    where
        F: FnMut() -> Step + Send + 'static,
    {
        Task::new(StepFn { step })
    }
}
