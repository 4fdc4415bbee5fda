//! Colored summary output.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects `NO_COLOR` environment variable and `--color` flag.

use spindle_core::{DrainReport, SchedulerStats};
use std::io::Write;
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
}

impl StyledOutput {
    /// Create a new styled output with the given color choice.
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
        }
    }

    fn label(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Cyan)).set_bold(true);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{:>12}", text);
        let _ = self.stdout.reset();
    }

    fn row(&mut self, text: &str, value: impl std::fmt::Display) {
        self.label(text);
        let _ = writeln!(self.stdout, " {}", value);
    }

    /// Print scheduler statistics after a run.
    pub fn summary(&mut self, stats: &SchedulerStats, elapsed: Duration, report: DrainReport) {
        self.row("elapsed", format!("{:.2?}", elapsed));
        self.row("submitted", stats.tasks_submitted);
        self.row("completed", stats.tasks_completed);
        self.row("resumes", stats.resumes);
        self.row("requeues", stats.requeues);

        if stats.tasks_failed > 0 || report.abandoned() > 0 {
            let mut spec = ColorSpec::new();
            spec.set_fg(Some(Color::Red)).set_bold(true);
            let _ = self.stdout.set_color(&spec);
            let _ = writeln!(
                self.stdout,
                "{:>12} {} failed, {} abandoned",
                "problems", stats.tasks_failed, report.abandoned()
            );
            let _ = self.stdout.reset();
        }
    }
}
