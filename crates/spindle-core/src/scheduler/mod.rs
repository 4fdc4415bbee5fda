//! Task Scheduler - cooperative multiplexing onto a fixed worker pool
//!
//! Workers share one mutex-protected FIFO ready queue. Units hand their
//! worker back at suspension points and are requeued by their waker.

#[allow(clippy::module_inception)]
mod scheduler;
mod shared;
mod spawner;
mod waker;
mod worker;

pub use scheduler::{DrainReport, Scheduler, SchedulerStats};
pub use spawner::Spawner;
