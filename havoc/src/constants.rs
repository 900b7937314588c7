//! Havoc Timing Constants
//!
//! Shared pacing and lifecycle constants used by the injectors.

use std::time::Duration;

/// Uninterrupted payload execution per duty cycle
pub const WORK_SLICE: Duration = Duration::from_millis(5);

/// Upper bound on the pacing sleep, keeps workers responsive to the run flag
pub const MAX_DUTY_PAUSE: Duration = Duration::from_millis(200);

/// Park time when a worker has nothing to do but must keep re-checking
pub const IDLE_RECHECK: Duration = Duration::from_millis(1);

/// Fixed allocation-pacing window
pub const ALLOC_WINDOW: Duration = Duration::from_millis(100);

/// How long `stop()` waits for workers before abandoning them
pub const JOIN_TIMEOUT: Duration = Duration::from_millis(300);

/// Poll interval while waiting for workers to drain
pub const JOIN_POLL: Duration = Duration::from_millis(10);

/// Tick between descriptor-leak bursts
pub const LEAK_TICK: Duration = Duration::from_millis(100);

/// Idle time once the descriptor cap is reached
pub const LEAK_FULL_IDLE: Duration = Duration::from_millis(200);

/// Backoff after a failed file create/open before the next attempt
pub const ACQUIRE_BACKOFF: Duration = Duration::from_millis(50);

/// How long each deadlock thread holds its first lock before crossing
pub const DEADLOCK_HOLD: Duration = Duration::from_millis(50);

/// Total deadlock pairs a process may ever create
pub const MAX_DEADLOCK_PAIRS: u32 = 3;
