//! Live progress indicator.
//!
//! Rendering is a pure function of elapsed time, budget, and iteration
//! count. Sinks only display it and never fail the campaign.

use std::io::Write;
use std::time::Duration;

/// Number of cells in the progress bar.
pub const BAR_WIDTH: usize = 50;

/// Render one progress line.
///
/// ```
/// use optfuzz_campaign::render_progress;
/// use std::time::Duration;
///
/// let line = render_progress(Duration::from_secs(30), Duration::from_secs(60), 90);
/// assert!(line.ends_with("50.00% (L: 60s; E: 90; T: 3/s)"));
/// ```
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn render_progress(elapsed: Duration, budget: Duration, executed: u64) -> String {
    let ratio = if budget.is_zero() {
        1.0
    } else {
        (elapsed.as_secs_f64() / budget.as_secs_f64()).clamp(0.0, 1.0)
    };
    let filled = ((BAR_WIDTH as f64 * ratio).floor() as usize).min(BAR_WIDTH);

    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        (executed as f64 / secs).floor() as u64
    } else {
        0
    };

    format!(
        " Progress: |{}{}| {:.2}% (L: {}s; E: {}; T: {}/s)",
        "█".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        ratio * 100.0,
        budget.as_secs(),
        executed,
        rate
    )
}

/// Receives progress updates from the campaign loop.
pub trait ProgressSink {
    /// Called once before the first iteration and after every iteration.
    fn update(&mut self, elapsed: Duration, budget: Duration, executed: u64);

    /// Called once when the loop ends, on every exit path.
    fn finish(&mut self, elapsed: Duration, budget: Duration, executed: u64);
}

/// Redraws a single terminal line on stderr.
#[derive(Debug, Default)]
pub struct TerminalProgress;

impl TerminalProgress {
    /// Create a terminal progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProgressSink for TerminalProgress {
    fn update(&mut self, elapsed: Duration, budget: Duration, executed: u64) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", render_progress(elapsed, budget, executed));
        let _ = stderr.flush();
    }

    fn finish(&mut self, elapsed: Duration, budget: Duration, executed: u64) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "\r{}", render_progress(elapsed, budget, executed));
    }
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _: Duration, _: Duration, _: u64) {}

    fn finish(&mut self, _: Duration, _: Duration, _: u64) {}
}
