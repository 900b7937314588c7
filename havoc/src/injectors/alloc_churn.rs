//! Allocation-churn injector.
//!
//! Workers allocate and immediately drop short-lived buffers at a target
//! MB/s rate. Nothing is retained; the pressure is allocator and reclaim
//! churn, not footprint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::{ALLOC_WINDOW, IDLE_RECHECK};
use crate::pacing;
use crate::pool::{RunState, WorkerPool};

const MAX_THREADS: i64 = 64;
const MAX_ALLOC_MB_PER_SEC: i64 = 4096;
const MAX_CHUNK_KB: i64 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocChurnConfig {
    pub threads: i64,
    pub alloc_mb_per_sec: i64,
    pub chunk_kb: i64,
}

impl Default for AllocChurnConfig {
    fn default() -> Self {
        Self {
            threads: (num_cpus::get() / 2).max(1) as i64,
            alloc_mb_per_sec: 512,
            chunk_kb: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocChurnStatus {
    pub running: bool,
    pub threads: usize,
    pub alloc_mb_per_sec: u64,
    pub chunk_kb: u64,
}

struct ChurnShared {
    alloc_mb_per_sec: AtomicU64,
    chunk_kb: AtomicU64,
}

pub struct AllocChurn {
    pool: WorkerPool,
    shared: Arc<ChurnShared>,
}

impl AllocChurn {
    pub fn new() -> Self {
        Self {
            pool: WorkerPool::new(),
            shared: Arc::new(ChurnShared {
                alloc_mb_per_sec: AtomicU64::new(0),
                chunk_kb: AtomicU64::new(0),
            }),
        }
    }

    pub fn start(&self, config: AllocChurnConfig) -> AllocChurnStatus {
        let threads = config.threads.clamp(1, MAX_THREADS) as usize;
        let rate = config.alloc_mb_per_sec.clamp(1, MAX_ALLOC_MB_PER_SEC) as u64;
        let chunk_kb = config.chunk_kb.clamp(1, MAX_CHUNK_KB) as u64;
        self.stop();

        self.shared.alloc_mb_per_sec.store(rate, Ordering::Relaxed);
        self.shared.chunk_kb.store(chunk_kb, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        tracing::info!(threads, rate, chunk_kb, "allocation churn started");
        self.pool
            .start(threads, "alloc-churn", move |_, run| churn_loop(run, &shared));
        self.status()
    }

    pub fn stop(&self) {
        self.pool.stop();
        self.shared.alloc_mb_per_sec.store(0, Ordering::Relaxed);
        self.shared.chunk_kb.store(0, Ordering::Relaxed);
    }

    pub fn status(&self) -> AllocChurnStatus {
        AllocChurnStatus {
            running: self.pool.is_running(),
            threads: self.pool.live_workers(),
            alloc_mb_per_sec: self.shared.alloc_mb_per_sec.load(Ordering::Relaxed),
            chunk_kb: self.shared.chunk_kb.load(Ordering::Relaxed),
        }
    }
}

impl Default for AllocChurn {
    fn default() -> Self {
        Self::new()
    }
}

fn churn_loop(run: &RunState, shared: &ChurnShared) {
    while run.should_run() {
        let rate = shared.alloc_mb_per_sec.load(Ordering::Relaxed);
        let chunk_bytes = shared.chunk_kb.load(Ordering::Relaxed) * 1024;
        if rate == 0 || chunk_bytes == 0 {
            thread::sleep(IDLE_RECHECK);
            continue;
        }

        let chunks = pacing::chunks_per_window(rate, chunk_bytes);
        let window_start = Instant::now();
        for _ in 0..chunks {
            let mut buf = vec![0u8; chunk_bytes as usize];
            rand::rng().fill_bytes(&mut buf);
            std::hint::black_box(&buf);
        }
        // sleep whatever is left of the window; allocation time counts
        if let Some(remaining) = ALLOC_WINDOW.checked_sub(window_start.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_is_clamped() {
        let churn = AllocChurn::new();
        let applied = churn.start(AllocChurnConfig {
            threads: 500,
            alloc_mb_per_sec: 100_000,
            chunk_kb: -1,
        });
        assert_eq!(applied.threads, 64);
        assert_eq!(applied.alloc_mb_per_sec, 4096);
        assert_eq!(applied.chunk_kb, 1);
        churn.stop();
    }

    #[test]
    fn test_stop_zeroes_counters() {
        let churn = AllocChurn::new();
        churn.start(AllocChurnConfig {
            threads: 1,
            alloc_mb_per_sec: 2,
            chunk_kb: 64,
        });
        churn.stop();

        let status = churn.status();
        assert!(!status.running);
        assert_eq!(status.threads, 0);
        assert_eq!(status.alloc_mb_per_sec, 0);
        assert_eq!(status.chunk_kb, 0);
    }
}
