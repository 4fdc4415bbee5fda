//! `spindle stepper`: units that print each step and yield between steps.

use crate::output::StyledOutput;
use spindle_core::{yield_now, Scheduler, SchedulerConfig};
use std::thread;
use std::time::{Duration, Instant};
use termcolor::ColorChoice;

pub fn execute(
    tasks: usize,
    steps: usize,
    workers: usize,
    work_ms: u64,
    color: ColorChoice,
) -> anyhow::Result<()> {
    let mut scheduler = Scheduler::with_config(SchedulerConfig {
        thread_name_prefix: "stepper".to_string(),
        ..SchedulerConfig::with_workers(workers)
    })?;
    log::info!(
        "running {} units of {} steps on {} workers",
        tasks,
        steps,
        scheduler.worker_count()
    );

    let started = Instant::now();
    let mut handles = Vec::with_capacity(tasks);
    for id in 0..tasks {
        let handle = scheduler.spawn(async move {
            for step in 1..=steps {
                // Stand-in for real work between suspension points
                thread::sleep(Duration::from_millis(work_ms));
                println!("[task {}] step {}/{}", id, step, steps);
                yield_now().await;
            }
        })?;
        handles.push(handle);
    }

    scheduler.wait_idle();
    println!("All tasks done.");

    for handle in handles {
        handle.join()?;
    }

    let elapsed = started.elapsed();
    let report = scheduler.shutdown();
    StyledOutput::new(color).summary(&scheduler.stats(), elapsed, report);
    Ok(())
}
