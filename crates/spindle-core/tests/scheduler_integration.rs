//! Integration tests for the scheduler: barrier, fairness and failure propagation

use parking_lot::Mutex;
use spindle_core::{
    yield_now, Scheduler, SchedulerConfig, SchedulerError, Step, Task, TaskError,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::Duration;

/// One-shot gate woken from outside the scheduler
#[derive(Clone, Default)]
struct Gate {
    inner: Arc<Mutex<(bool, Option<Waker>)>>,
}

impl Gate {
    fn open(&self) {
        let waker = {
            let mut inner = self.inner.lock();
            inner.0 = true;
            inner.1.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn wait(&self) -> GateWait {
        GateWait(self.clone())
    }
}

struct GateWait(Gate);

impl Future for GateWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut inner = self.0.inner.lock();
        if inner.0 {
            Poll::Ready(())
        } else {
            inner.1 = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

#[test]
fn test_wait_idle_observes_every_completion() {
    const UNITS: usize = 16;
    const YIELDS: usize = 10;

    let scheduler = Scheduler::new(4).unwrap();
    let finished = Arc::new(AtomicUsize::new(0));

    for _ in 0..UNITS {
        let finished = finished.clone();
        scheduler
            .spawn(async move {
                for _ in 0..YIELDS {
                    yield_now().await;
                }
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    scheduler.wait_idle();

    assert_eq!(finished.load(Ordering::SeqCst), UNITS);
    assert_eq!(scheduler.pending(), 0);

    let stats = scheduler.stats();
    assert_eq!(stats.tasks_completed, UNITS as u64);
    assert_eq!(stats.requeues, (UNITS * YIELDS) as u64);
    assert_eq!(stats.resumes, (UNITS * (YIELDS + 1)) as u64);
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.parked, 0);
}

#[test]
fn test_eight_units_five_steps_four_workers() {
    let scheduler = Scheduler::new(4).unwrap();
    let log: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..8)
        .map(|unit| {
            let log = log.clone();
            scheduler
                .spawn(async move {
                    for step in 1..=5 {
                        log.lock().push((unit, step));
                        yield_now().await;
                    }
                })
                .unwrap()
        })
        .collect();

    scheduler.wait_idle();

    for handle in &handles {
        assert!(handle.is_finished());
    }
    for handle in handles {
        assert!(handle.join().is_ok());
    }

    let log = log.lock();
    assert_eq!(log.len(), 40);
    for unit in 0..8 {
        let steps: Vec<usize> = log
            .iter()
            .filter(|(u, _)| *u == unit)
            .map(|(_, step)| *step)
            .collect();
        assert_eq!(steps, vec![1, 2, 3, 4, 5], "unit {} ran out of order", unit);
    }
}

#[test]
fn test_wait_idle_with_no_units() {
    let scheduler = Scheduler::new(2).unwrap();
    scheduler.wait_idle();
    assert_eq!(scheduler.stats().tasks_submitted, 0);
}

#[test]
fn test_unit_without_suspension_runs_in_one_resume() {
    let scheduler = Scheduler::new(2).unwrap();
    let handle = scheduler.spawn(async {}).unwrap();

    scheduler.wait_idle();
    assert!(handle.join().is_ok());

    let stats = scheduler.stats();
    assert_eq!(stats.resumes, 1);
    assert_eq!(stats.requeues, 0);
}

#[test]
fn test_yielding_units_resume_on_worker_threads() {
    let scheduler = Scheduler::new(3).unwrap();
    let names: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..6 {
        let names = names.clone();
        scheduler
            .spawn(async move {
                for _ in 0..4 {
                    let name = thread::current().name().unwrap_or_default().to_string();
                    names.lock().push(name);
                    yield_now().await;
                }
            })
            .unwrap();
    }

    scheduler.wait_idle();

    let names = names.lock();
    assert_eq!(names.len(), 24);
    assert!(names.iter().all(|name| name.starts_with("spindle-worker-")));
}

#[test]
fn test_concurrent_submitters_and_barriers() {
    let scheduler = Scheduler::new(4).unwrap();
    let finished = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..5 {
                    let handles: Vec<_> = (0..10)
                        .map(|_| {
                            scheduler
                                .spawn(async {
                                    yield_now().await;
                                    yield_now().await;
                                })
                                .unwrap()
                        })
                        .collect();

                    scheduler.wait_idle();

                    // Everything submitted before the barrier returned has finished
                    for handle in handles {
                        assert!(handle.is_finished());
                        assert!(handle.join().is_ok());
                        finished.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(finished.load(Ordering::SeqCst), 200);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
#[allow(dependency_on_unit_never_type_fallback)]
fn test_failures_propagate_to_join_handles() {
    let scheduler = Scheduler::new(2).unwrap();

    let failing = scheduler
        .spawn(async {
            yield_now().await;
            Err::<(), _>(anyhow::anyhow!("connection refused"))
        })
        .unwrap();
    let panicking = scheduler
        .spawn(async {
            yield_now().await;
            panic!("index out of range");
        })
        .unwrap();
    let healthy = scheduler.spawn(async { yield_now().await }).unwrap();

    scheduler.wait_idle();

    let failing_id = failing.id();
    match failing.join() {
        Err(TaskError::Failed { task, error }) => {
            assert_eq!(task, failing_id);
            assert_eq!(error.to_string(), "connection refused");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    match panicking.join() {
        Err(TaskError::Panicked { message, .. }) => assert_eq!(message, "index out of range"),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(healthy.join().is_ok());

    let stats = scheduler.stats();
    assert_eq!(stats.tasks_failed, 2);
    assert_eq!(stats.tasks_completed, 1);

    // Workers survive failing units
    let after = scheduler.spawn(async {}).unwrap();
    scheduler.wait_idle();
    assert!(after.join().is_ok());
}

#[test]
fn test_units_spawn_children_through_spawner() {
    let scheduler = Scheduler::new(3).unwrap();
    let spawner = scheduler.spawner();
    let children_done = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let spawner = spawner.clone();
        let children_done = children_done.clone();
        scheduler
            .spawn(async move {
                for _ in 0..5 {
                    let children_done = children_done.clone();
                    spawner.spawn(async move {
                        yield_now().await;
                        children_done.fetch_add(1, Ordering::SeqCst);
                    })?;
                    yield_now().await;
                }
                Ok::<(), SchedulerError>(())
            })
            .unwrap();
    }

    scheduler.wait_idle();
    assert_eq!(children_done.load(Ordering::SeqCst), 20);
    assert_eq!(scheduler.stats().tasks_submitted, 24);
}

#[test]
fn test_step_function_units_on_scheduler() {
    let scheduler = Scheduler::new(2).unwrap();
    let total = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let total = total.clone();
            let mut remaining = 3;
            scheduler
                .submit(Task::from_steps(move || {
                    total.fetch_add(1, Ordering::SeqCst);
                    if remaining == 0 {
                        return Step::Done;
                    }
                    remaining -= 1;
                    Step::Yield
                }))
                .unwrap()
        })
        .collect();

    scheduler.wait_idle();
    for handle in handles {
        assert!(handle.join().is_ok());
    }
    assert_eq!(total.load(Ordering::SeqCst), 16);
}

#[test]
fn test_bounded_scheduler_rejects_when_full() {
    let scheduler = Scheduler::with_config(SchedulerConfig {
        worker_count: 1,
        max_pending: Some(1),
        ..SchedulerConfig::default()
    })
    .unwrap();

    let gate = Gate::default();
    let wait = gate.wait();
    let blocked = scheduler.spawn(wait).unwrap();

    assert!(matches!(
        scheduler.spawn(async {}),
        Err(SchedulerError::AtCapacity { limit: 1 })
    ));

    gate.open();
    scheduler.wait_idle();
    assert!(blocked.join().is_ok());
    assert!(scheduler.spawn(async {}).is_ok());
}

#[test]
fn test_external_wake_resumes_parked_unit() {
    let scheduler = Scheduler::new(2).unwrap();
    let gate = Gate::default();
    let reached = Arc::new(AtomicBool::new(false));

    let wait = gate.wait();
    let reached_clone = reached.clone();
    let handle = scheduler
        .spawn(async move {
            wait.await;
            yield_now().await;
            reached_clone.store(true, Ordering::SeqCst);
        })
        .unwrap();

    assert!(!scheduler.wait_idle_timeout(Duration::from_millis(50)));
    assert_eq!(scheduler.stats().parked, 1);
    assert!(!reached.load(Ordering::SeqCst));

    let opener = {
        let gate = gate.clone();
        thread::spawn(move || gate.open())
    };
    opener.join().unwrap();

    scheduler.wait_idle();
    assert!(reached.load(Ordering::SeqCst));
    assert!(handle.join().is_ok());
}

#[test]
fn test_worker_survives_panicking_destructor() {
    struct Bomb;

    impl Drop for Bomb {
        fn drop(&mut self) {
            panic!("destructor blew up");
        }
    }

    let scheduler = Scheduler::new(1).unwrap();

    // The step closure, and the bomb with it, is dropped when the unit completes
    let bomb = Bomb;
    let exploding = scheduler
        .submit(Task::from_steps(move || {
            let _armed = &bomb;
            Step::Done
        }))
        .unwrap();

    match exploding.join_timeout(Duration::from_secs(5)) {
        Ok(Err(TaskError::Panicked { message, .. })) => {
            assert_eq!(message, "destructor blew up")
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // The only worker is still alive
    let after = scheduler.spawn(async { yield_now().await }).unwrap();
    assert!(scheduler.wait_idle_timeout(Duration::from_secs(5)));
    assert!(after.join().is_ok());
    assert_eq!(scheduler.stats().tasks_failed, 1);
    assert_eq!(scheduler.pending(), 0);
}
