//! Worker-thread starvation injector.
//!
//! No pool here: a shared flag turns every dispatched unit of work into a
//! long synchronous sleep, monopolizing whatever execution pool the
//! transport runs units of work on. `start`/`stop` only toggle the flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

const MAX_SLEEP_MS: i64 = 600_000;
const MAX_WORK_MS: i64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StarvationConfig {
    pub sleep_ms: i64,
}

impl Default for StarvationConfig {
    fn default() -> Self {
        Self { sleep_ms: 3000 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StarvationStatus {
    pub blocking: bool,
    pub sleep_ms: u64,
}

pub struct Starvation {
    blocking: AtomicBool,
    sleep_ms: AtomicU64,
}

impl Starvation {
    pub fn new() -> Self {
        Self {
            blocking: AtomicBool::new(false),
            sleep_ms: AtomicU64::new(0),
        }
    }

    pub fn start(&self, config: StarvationConfig) -> StarvationStatus {
        let sleep_ms = config.sleep_ms.clamp(1, MAX_SLEEP_MS) as u64;
        self.sleep_ms.store(sleep_ms, Ordering::Relaxed);
        self.blocking.store(true, Ordering::Relaxed);
        tracing::info!(sleep_ms, "starvation started");
        self.status()
    }

    pub fn stop(&self) {
        self.blocking.store(false, Ordering::Relaxed);
        self.sleep_ms.store(0, Ordering::Relaxed);
    }

    pub fn status(&self) -> StarvationStatus {
        StarvationStatus {
            blocking: self.blocking.load(Ordering::Relaxed),
            sleep_ms: self.sleep_ms.load(Ordering::Relaxed),
        }
    }

    /// One externally-dispatched unit of work. Starved units sleep the
    /// configured duration; healthy units simulate `ms` of ordinary latency.
    /// Returns the time actually spent.
    pub fn work_unit(&self, ms: i64) -> Duration {
        let started = Instant::now();
        if self.blocking.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(self.sleep_ms.load(Ordering::Relaxed)));
        } else {
            thread::sleep(Duration::from_millis(ms.clamp(1, MAX_WORK_MS) as u64));
        }
        started.elapsed()
    }
}

impl Default for Starvation {
    fn default() -> Self {
        Self::new()
    }
}
