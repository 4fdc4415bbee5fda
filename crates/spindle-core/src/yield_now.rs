//! Cooperative suspension point

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that suspends the current unit exactly once.
///
/// The first poll wakes the unit's own waker, which tells the scheduler to
/// put the unit back at the end of the ready queue, then returns
/// `Poll::Pending`. The next poll completes immediately.
#[must_use = "yielding does nothing unless awaited"]
#[derive(Debug, Default)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Hand the worker back to the scheduler and continue later.
///
/// Other queued units get to run before this one is resumed, possibly on a
/// different worker thread. Nothing is passed in or out.
///
/// # Examples
///
/// ```rust,no_run
/// use spindle_core::{yield_now, Scheduler};
///
/// let scheduler = Scheduler::new(2).unwrap();
/// scheduler
///     .spawn(async {
///         for step in 1..=3 {
///             println!("step {step}");
///             yield_now().await;
///         }
///     })
///     .unwrap();
/// scheduler.wait_idle();
/// ```
pub fn yield_now() -> YieldNow {
    YieldNow::default()
}
