//! Progress throttling and rate formatting
//!
//! Rate is windowed: bytes written since the last emitted sample divided by
//! the wall-clock time since that sample, not an average over the whole
//! transfer. Samples are throttled to one per interval, with a single
//! unconditional exception — the final sample of a transfer whose total size
//! is known.

use crate::types::UNKNOWN_PERCENT;
use std::time::{Duration, Instant};

/// One emitted progress sample
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Sample {
    /// Percentage 0..=100, or [`UNKNOWN_PERCENT`] when the total is unknown
    pub percent: i32,
    /// Formatted windowed rate, e.g. `"512.00 KB/s"`
    pub rate: String,
}

/// Throttles progress emission to at most one sample per interval
pub(crate) struct ProgressThrottle {
    interval: Duration,
    last_emit: Instant,
    last_bytes: u64,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self::with_origin(Instant::now(), interval)
    }

    fn with_origin(origin: Instant, interval: Duration) -> Self {
        Self {
            interval,
            last_emit: origin,
            last_bytes: 0,
        }
    }

    /// Evaluate whether a sample is due after a chunk was written
    ///
    /// `finished` marks the final call of a transfer; combined with a known
    /// total it forces the sample out regardless of the window, so consumers
    /// always see the terminal 100%.
    pub fn sample(&mut self, bytes: u64, total: Option<u64>, finished: bool) -> Option<Sample> {
        self.sample_at(Instant::now(), bytes, total, finished)
    }

    fn sample_at(
        &mut self,
        now: Instant,
        bytes: u64,
        total: Option<u64>,
        finished: bool,
    ) -> Option<Sample> {
        let elapsed = now.duration_since(self.last_emit);
        let window_due = elapsed >= self.interval;
        let unconditional = finished && total.is_some();
        if !window_due && !unconditional {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let rate_bps = if secs > 0.0 {
            bytes.saturating_sub(self.last_bytes) as f64 / secs
        } else {
            0.0
        };

        let percent = match total {
            Some(total) if total > 0 => {
                let pct = (bytes as u128 * 100 / total as u128) as i32;
                pct.min(100)
            }
            _ => UNKNOWN_PERCENT,
        };

        self.last_emit = now;
        self.last_bytes = bytes;

        Some(Sample {
            percent,
            rate: format_speed(rate_bps),
        })
    }
}

/// Format a transfer rate in bytes per second for display
///
/// Below 1024 B/s the rate renders as B/s, below 1024² as KB/s, otherwise
/// MB/s, all with two-decimal precision.
pub fn format_speed(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.2} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.2} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.2} MB/s", bytes_per_sec / MIB)
    }
}
