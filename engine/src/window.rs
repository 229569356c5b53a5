//! Date-window math for bounding a sync run.
//!
//! The upper bound always trails `now` by the buffer so the run never
//! races records still being written at the source.

use chrono::{DateTime, Duration, Utc};

/// The instant range of records eligible for a run.
///
/// Invariant: `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    /// Build a window, clamping `from` down to `to` if the bounds cross.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: from.min(to),
            to,
        }
    }

    /// Whether an instant falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from < at && at <= self.to
    }
}

/// Compute the effective window for a run.
///
/// `lookback_days = None` means full-table resync: no window at all.
/// Otherwise the window is `[now - lookback, now - buffer]`.
pub fn effective_window(
    now: DateTime<Utc>,
    lookback_days: Option<i64>,
    buffer_minutes: i64,
) -> Option<DateWindow> {
    let days = lookback_days?;
    let from = now - Duration::days(days);
    let to = now - Duration::minutes(buffer_minutes);
    Some(DateWindow::new(from, to))
}

/// The watermark to persist once a run's draining completes.
///
/// Window-driven by design: advances to the window's upper bound (or
/// `now - buffer` in unbounded mode) regardless of per-record failures.
/// Failed rows are never added to the ExistingIdSet, which is rebuilt
/// from the destination every run, so later runs whose window still
/// covers them will re-insert them.
pub fn run_watermark(
    now: DateTime<Utc>,
    window: Option<&DateWindow>,
    buffer_minutes: i64,
) -> DateTime<Utc> {
    match window {
        Some(window) => window.to,
        None => now - Duration::minutes(buffer_minutes),
    }
}
