//! Duty-cycle pacing.
//!
//! Converts a target intensity or allocation rate into a
//! work-slice-then-sleep schedule. Two formulas cover every injector:
//!
//! - `duty_pause` - percentage intensity over a fixed 5ms work slice
//! - `chunks_per_window` - allocation count per fixed 100ms window

use std::time::Duration;

use crate::constants::{MAX_DUTY_PAUSE, WORK_SLICE};

/// Sleep owed after one work slice at the given intensity.
///
/// At 100% the pause is zero; below that it scales as
/// `slice * (100 - p) / p`, capped so a worker never sleeps longer than
/// [`MAX_DUTY_PAUSE`] between run-flag checks. Intensity 0 gets the cap
/// outright; callers are expected to park and re-check instead of working.
pub fn duty_pause(intensity: u32) -> Duration {
    if intensity >= 100 {
        return Duration::ZERO;
    }
    if intensity == 0 {
        return MAX_DUTY_PAUSE;
    }
    let nanos = WORK_SLICE.as_nanos() as f64 * (100.0 - f64::from(intensity)) / f64::from(intensity);
    Duration::from_nanos(nanos as u64).min(MAX_DUTY_PAUSE)
}

/// Allocations of `chunk_bytes` needed per 100ms window to sustain
/// `rate_mb_per_sec`, floored at one so a tiny rate still makes progress.
pub fn chunks_per_window(rate_mb_per_sec: u64, chunk_bytes: u64) -> u64 {
    let per_sec = ((rate_mb_per_sec * 1024 * 1024) / chunk_bytes.max(1)).max(1);
    (per_sec / 10).max(1)
}
