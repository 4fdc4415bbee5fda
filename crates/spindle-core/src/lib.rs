//! Spindle Core
//!
//! A cooperative task scheduler that multiplexes many resumable units onto a
//! fixed pool of worker threads:
//! - Resumable units ([`Task`]) built from futures or step functions
//! - A suspension point ([`yield_now`]) that requeues the running unit
//! - A [`Scheduler`] with a shared FIFO ready queue, pending-count tracking
//!   and an idle barrier
//! - Outcome propagation through [`JoinHandle`]
//!
//! ```rust,no_run
//! use spindle_core::{yield_now, Scheduler};
//!
//! let scheduler = Scheduler::new(4).unwrap();
//! for id in 0..8 {
//!     scheduler
//!         .spawn(async move {
//!             for step in 1..=5 {
//!                 println!("[task {id}] step {step}/5");
//!                 yield_now().await;
//!             }
//!         })
//!         .unwrap();
//! }
//! scheduler.wait_idle();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod join;
pub mod scheduler;
pub mod step;
pub mod task;
pub mod yield_now;

pub use config::SchedulerConfig;
pub use error::{Result, SchedulerError, TaskError};
pub use join::JoinHandle;
pub use scheduler::{DrainReport, Scheduler, SchedulerStats, Spawner};
pub use step::Step;
pub use task::{Resume, Task, TaskId, TaskOutput, TaskState};
pub use yield_now::{yield_now, YieldNow};
