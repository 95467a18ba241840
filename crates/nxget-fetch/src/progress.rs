//! Terminal progress feedback for download passes.

use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use thiserror::Error;

const PB_STYLE: &str = "{msg:.cyan} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len}";

const PB_CHARS: &str = "█▓▒░  ";

/// Redraw cadence. Completions only move the counter; the terminal is
/// repainted on this timer.
const DRAW_RATE_HZ: u8 = 1;

/// Misuse of the reporter API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReporterMisuse {
    #[error("progress advanced after completion")]
    AdvanceAfterFinish,
    #[error("progress reporter finished twice")]
    DoubleFinish,
}

/// Counts completed jobs against a known total on one terminal line.
///
/// Hidden automatically when stderr is not a terminal or when verbose
/// logging owns the output. Increments are thread-safe.
pub struct ProgressReporter {
    bar: ProgressBar,
    finished: AtomicBool,
}

impl ProgressReporter {
    pub fn new(total: u64, message: impl Into<String>, verbose: bool) -> Self {
        let bar = if verbose || !Term::stderr().is_term() {
            ProgressBar::hidden()
        } else {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(DRAW_RATE_HZ))
        };
        bar.set_length(total);
        bar.set_message(message.into());
        if let Ok(style) = ProgressStyle::with_template(PB_STYLE) {
            bar.set_style(style.progress_chars(PB_CHARS));
        }
        Self { bar, finished: AtomicBool::new(false) }
    }

    /// Record one completed job.
    pub fn advance(&self) -> Result<(), ReporterMisuse> {
        if self.finished.load(Ordering::Acquire) {
            return Err(ReporterMisuse::AdvanceAfterFinish);
        }
        self.bar.inc(1);
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Stop the redraw timer and render the final state.
    pub fn finish(&self, message: impl Into<String>) -> Result<(), ReporterMisuse> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(ReporterMisuse::DoubleFinish);
        }
        self.bar.finish_with_message(message.into());
        Ok(())
    }
}
