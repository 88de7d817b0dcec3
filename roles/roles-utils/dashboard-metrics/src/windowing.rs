//! Lookback window selection over the rolling history log.
//!
//! A window is always a contiguous suffix of the log: samples are ascending by
//! timestamp, so the first sample inside the lookback marks the start and
//! everything after it is kept. Windows borrow from the log and never copy or
//! mutate it.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::HistoryLog;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Get current Unix timestamp in (fractional) seconds.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Index of the first timestamp at or after `now - hours`.
///
/// Falls back to `0` (the whole sequence) when no timestamp qualifies.
pub fn window_start(timestamps: &[f64], now: f64, hours: f64) -> usize {
    let cutoff = now - hours * SECONDS_PER_HOUR;
    timestamps.iter().position(|&t| t >= cutoff).unwrap_or(0)
}

/// Borrowed suffix of a [`HistoryLog`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryWindow<'a> {
    pub timestamps: &'a [f64],
    pub my_hash: &'a [f64],
    pub pool_hash: Option<&'a [f64]>,
    pub net_hash: Option<&'a [f64]>,
    pub price: &'a [f64],
}

impl<'a> HistoryWindow<'a> {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Pair each timestamp (converted to milliseconds) with a value, ready for
    /// a time-axis chart. Gaps are left out.
    pub fn points(&self, values: &[f64]) -> Vec<(f64, f64)> {
        self.timestamps
            .iter()
            .zip(values)
            .filter(|&(_, &v)| v.is_finite())
            .map(|(&t, &v)| (t * 1000.0, v))
            .collect()
    }
}

fn tail(values: &[f64], start: usize) -> &[f64] {
    values.get(start..).unwrap_or(&[])
}

impl HistoryLog {
    /// Select the samples recorded within the last `hours` hours.
    pub fn window(&self, now: f64, hours: f64) -> HistoryWindow<'_> {
        let start = window_start(&self.timestamps, now, hours);
        HistoryWindow {
            timestamps: tail(&self.timestamps, start),
            my_hash: tail(&self.my_hash, start),
            pool_hash: self.pool_hash.as_deref().map(|v| tail(v, start)),
            net_hash: self.net_hash.as_deref().map(|v| tail(v, start)),
            price: tail(&self.price, start),
        }
    }
}

/// Hours of history usable for averaging, capped at `max_hours`.
///
/// With no history the cap itself is returned; a log whose oldest sample lies
/// in the future yields `0.0`.
pub fn effective_window_hours(history: &HistoryLog, now: f64, max_hours: f64) -> f64 {
    match history.earliest() {
        Some(earliest) => {
            let available = (now - earliest) / SECONDS_PER_HOUR;
            available.min(max_hours).max(0.0)
        }
        None => max_hours,
    }
}
