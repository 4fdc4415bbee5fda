//! Scheduler configuration

/// Default number of resumes a unit may still receive once shutdown starts
pub const DEFAULT_SHUTDOWN_RESUME_BUDGET: usize = 1024;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub worker_count: usize,

    /// Worker thread name prefix; the worker index is appended
    pub thread_name_prefix: String,

    /// Maximum submitted-but-unfinished units (None = unbounded)
    pub max_pending: Option<usize>,

    /// Resumes each unit may still receive after shutdown is requested.
    /// Units exceeding it are destroyed without being resumed again.
    pub shutdown_resume_budget: usize,
}

impl SchedulerConfig {
    /// Configuration with a fixed worker count and defaults elsewhere
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Self::default()
        }
    }

    /// Worker count after resolving 0 to the CPU count (never below 1)
    pub fn resolved_worker_count(&self) -> usize {
        let count = if self.worker_count == 0 {
            num_cpus::get()
        } else {
            self.worker_count
        };
        count.max(1)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 0,
            thread_name_prefix: "spindle-worker".to_string(),
            max_pending: None,
            shutdown_resume_budget: DEFAULT_SHUTDOWN_RESUME_BUDGET,
        }
    }
}
