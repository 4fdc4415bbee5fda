//! `spindle fanout`: parent units spawning children through a `Spawner`.

use crate::output::StyledOutput;
use spindle_core::{yield_now, Scheduler, SchedulerError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use termcolor::ColorChoice;

pub fn execute(
    parents: usize,
    children: usize,
    workers: usize,
    color: ColorChoice,
) -> anyhow::Result<()> {
    let mut scheduler = Scheduler::new(workers)?;
    let spawner = scheduler.spawner();
    let finished = Arc::new(AtomicUsize::new(0));
    log::info!(
        "{} parents x {} children on {} workers",
        parents,
        children,
        scheduler.worker_count()
    );

    let started = Instant::now();
    let mut handles = Vec::with_capacity(parents);
    for parent in 0..parents {
        let spawner = spawner.clone();
        let finished = finished.clone();
        let handle = scheduler.spawn(async move {
            for child in 0..children {
                let finished = finished.clone();
                spawner.spawn(async move {
                    yield_now().await;
                    finished.fetch_add(1, Ordering::Relaxed);
                    log::debug!("child {}.{} done", parent, child);
                })?;
                yield_now().await;
            }
            Ok::<(), SchedulerError>(())
        })?;
        handles.push(handle);
    }

    scheduler.wait_idle();

    for handle in handles {
        handle.join()?;
    }
    println!(
        "{} children finished across {} parents",
        finished.load(Ordering::Relaxed),
        parents
    );

    let elapsed = started.elapsed();
    let report = scheduler.shutdown();
    StyledOutput::new(color).summary(&scheduler.stats(), elapsed, report);
    Ok(())
}
