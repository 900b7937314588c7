//! Heap-retention injector.
//!
//! A single worker grows an owned collection of random-filled chunks until
//! it holds the target footprint, then idles. Random fill defeats page
//! dedup and compaction, so the retained size is real resident pressure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::pool::{RunState, WorkerPool};

const MAX_TARGET_MB: i64 = 2048;
const MAX_CHUNK_MB: i64 = 64;
const MAX_INTERVAL_MS: i64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemRetainConfig {
    pub target_mb: i64,
    pub chunk_mb: i64,
    pub interval_ms: i64,
}

impl Default for MemRetainConfig {
    fn default() -> Self {
        Self {
            target_mb: 512,
            chunk_mb: 4,
            interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemRetainStatus {
    pub running: bool,
    pub target_mb: u64,
    pub chunk_mb: u64,
    pub interval_ms: u64,
    pub retained_mb: u64,
    pub retained_chunks: usize,
}

struct RetainShared {
    target_mb: AtomicU64,
    chunk_mb: AtomicU64,
    interval_ms: AtomicU64,
    retained_mb: AtomicU64,
    retained: Mutex<Vec<Vec<u8>>>,
}

pub struct MemRetain {
    pool: WorkerPool,
    shared: Arc<RetainShared>,
}

impl MemRetain {
    pub fn new() -> Self {
        Self {
            pool: WorkerPool::new(),
            shared: Arc::new(RetainShared {
                target_mb: AtomicU64::new(0),
                chunk_mb: AtomicU64::new(0),
                interval_ms: AtomicU64::new(0),
                retained_mb: AtomicU64::new(0),
                retained: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn start(&self, config: MemRetainConfig) -> MemRetainStatus {
        let target = config.target_mb.clamp(1, MAX_TARGET_MB) as u64;
        let chunk = config.chunk_mb.clamp(1, MAX_CHUNK_MB) as u64;
        let interval = config.interval_ms.clamp(1, MAX_INTERVAL_MS) as u64;
        self.stop();

        self.shared.target_mb.store(target, Ordering::Relaxed);
        self.shared.chunk_mb.store(chunk, Ordering::Relaxed);
        self.shared.interval_ms.store(interval, Ordering::Relaxed);
        self.shared.retained_mb.store(0, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        tracing::info!(target, chunk, interval, "heap retention started");
        self.pool
            .start(1, "mem-retain", move |_, run| retain_loop(run, &shared));
        self.status()
    }

    /// Stop the worker, drop every retained chunk, zero the counters.
    pub fn stop(&self) {
        self.pool.stop();
        {
            let mut retained = self.shared.retained.lock();
            retained.clear();
            self.shared.retained_mb.store(0, Ordering::Relaxed);
        }
        self.shared.target_mb.store(0, Ordering::Relaxed);
        self.shared.chunk_mb.store(0, Ordering::Relaxed);
        self.shared.interval_ms.store(0, Ordering::Relaxed);
    }

    pub fn status(&self) -> MemRetainStatus {
        MemRetainStatus {
            running: self.pool.is_running(),
            target_mb: self.shared.target_mb.load(Ordering::Relaxed),
            chunk_mb: self.shared.chunk_mb.load(Ordering::Relaxed),
            interval_ms: self.shared.interval_ms.load(Ordering::Relaxed),
            retained_mb: self.shared.retained_mb.load(Ordering::Relaxed),
            retained_chunks: self.shared.retained.lock().len(),
        }
    }
}

impl Default for MemRetain {
    fn default() -> Self {
        Self::new()
    }
}

fn retain_loop(run: &RunState, shared: &RetainShared) {
    while run.should_run() {
        let interval = Duration::from_millis(shared.interval_ms.load(Ordering::Relaxed).max(1));
        let current = shared.retained_mb.load(Ordering::Relaxed);
        let target = shared.target_mb.load(Ordering::Relaxed);
        if current >= target {
            thread::sleep(interval);
            continue;
        }

        let chunk_mb = shared.chunk_mb.load(Ordering::Relaxed);
        let mut chunk = vec![0u8; (chunk_mb * 1024 * 1024) as usize];
        rand::rng().fill_bytes(&mut chunk);
        {
            let mut retained = shared.retained.lock();
            retained.push(chunk);
            shared.retained_mb.fetch_add(chunk_mb, Ordering::Relaxed);
        }
        thread::sleep(interval);
    }
}
