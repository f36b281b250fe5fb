//! Terminal progress reporting.
//!
//! A bounded, cancellable reporter for export runs: a bar when the page
//! count is known up front, a ticking spinner for indeterminate paths
//! (MP4 recording length depends on the deck's animations).

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner tick interval
const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Progress reporter for one export run
#[derive(Debug)]
pub struct ExportProgress {
    bar: ProgressBar,
    quiet: bool,
}

impl ExportProgress {
    /// Bounded progress over a known number of pages
    #[must_use]
    pub fn bounded(total: u64, message: impl Into<String>) -> Self {
        let bar = ProgressBar::new(total.max(1));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar, quiet: false }
    }

    /// Indeterminate progress (total pinned to 1, spinner carries the news)
    #[must_use]
    pub fn indeterminate(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new(1);
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar, quiet: false }
    }

    /// Reporter that draws nothing (service/background use)
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet: true,
        }
    }

    /// One page done
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Update the message line
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Finish successfully
    pub fn finish(&self, message: impl Into<String>) {
        let message = message.into();
        self.bar.finish_and_clear();
        if !self.quiet {
            eprintln!("{} {message}", style("✓").green().bold());
        }
    }

    /// Abandon after a failure
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.bar.abandon();
        if !self.quiet {
            eprintln!("{} {message}", style("✗").red().bold());
        }
    }

    /// Print a warning line without disturbing the bar
    pub fn warn(&self, message: impl Into<String>) {
        if !self.quiet {
            self.bar
                .println(format!("{} {}", style("⚠").yellow().bold(), message.into()));
        }
    }
}

/// Whether verbose MP4 diagnostics are enabled (`EXPORTAR_DEBUG`)
#[must_use]
pub fn debug_enabled() -> bool {
    std::env::var_os("EXPORTAR_DEBUG").is_some_and(|v| !v.is_empty() && v != "0")
}

/// Print a diagnostic line to stderr when `EXPORTAR_DEBUG` is set
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::progress::debug_enabled() {
            eprintln!("[exportar] {}", format!($($arg)*));
        }
    };
}
