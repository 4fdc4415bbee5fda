//! Per-unit waker
//!
//! Holds a weak reference to the scheduler state, so a waker that outlives
//! the scheduler wakes nothing. The `notified` flag is only read and written
//! under the scheduler mutex.

use crate::scheduler::shared::Shared;
use crate::task::TaskId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::Wake;

pub(crate) struct TaskWaker {
    id: TaskId,
    shared: Weak<Shared>,
    notified: AtomicBool,
}

impl TaskWaker {
    pub(crate) fn new(id: TaskId, shared: Weak<Shared>) -> Self {
        Self {
            id,
            shared,
            notified: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn set_notified(&self) {
        self.notified.store(true, Ordering::Release);
    }

    pub(crate) fn take_notified(&self) -> bool {
        self.notified.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn clear(&self) {
        self.notified.store(false, Ordering::Release);
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.wake(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use std::task::Waker;

    #[test]
    fn test_wake_without_scheduler_is_noop() {
        let signal = Arc::new(TaskWaker::new(TaskId::new(), Weak::new()));
        let waker = Waker::from(signal.clone());
        waker.wake_by_ref();
        assert!(!signal.take_notified());
    }

    #[test]
    fn test_wake_of_unparked_unit_sets_flag() {
        let shared = Arc::new(Shared::new(SchedulerConfig::default()));
        let signal = Arc::new(TaskWaker::new(TaskId::new(), Arc::downgrade(&shared)));
        let waker = Waker::from(signal.clone());

        waker.wake();
        assert!(signal.take_notified());
        assert!(!signal.take_notified());
    }
}
