//! Spindle demonstration CLI
//!
//! Drives the scheduler with small synthetic workloads. Set `RUST_LOG` to
//! see the scheduler's own logging (e.g. `RUST_LOG=spindle_core=debug`).

use clap::{Parser, Subcommand};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "spindle")]
#[command(about = "Cooperative task scheduler demos", long_about = None)]
#[command(version)]
struct Cli {
    /// Colored output: auto, always or never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run units that print a line per step and yield between steps
    Stepper {
        /// Number of units
        #[arg(short, long, default_value_t = 8)]
        tasks: usize,
        /// Steps per unit
        #[arg(short, long, default_value_t = 5)]
        steps: usize,
        /// Worker threads (0 = number of CPU cores)
        #[arg(short, long, default_value_t = 4)]
        workers: usize,
        /// Simulated work per step, in milliseconds
        #[arg(long, default_value_t = 30)]
        work_ms: u64,
    },

    /// Run parent units that spawn child units from inside the scheduler
    Fanout {
        /// Number of parent units
        #[arg(short, long, default_value_t = 4)]
        parents: usize,
        /// Children spawned by each parent
        #[arg(short, long, default_value_t = 8)]
        children: usize,
        /// Worker threads (0 = number of CPU cores)
        #[arg(short, long, default_value_t = 0)]
        workers: usize,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let color = output::resolve_color_choice(cli.color.as_deref());

    match cli.command {
        Commands::Stepper {
            tasks,
            steps,
            workers,
            work_ms,
        } => commands::stepper::execute(tasks, steps, workers, work_ms, color),

        Commands::Fanout {
            parents,
            children,
            workers,
        } => commands::fanout::execute(parents, children, workers, color),
    }
}
