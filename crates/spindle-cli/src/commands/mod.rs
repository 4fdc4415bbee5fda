//! Subcommand implementations.

pub mod fanout;
pub mod stepper;
