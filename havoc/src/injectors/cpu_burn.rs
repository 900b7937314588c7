//! CPU saturation injector.
//!
//! Workers hash a small buffer in a tight loop for one work slice, then
//! sleep whatever the duty cycle owes. The digest is XOR-mixed back into
//! the buffer so the optimizer cannot discard the work.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{IDLE_RECHECK, WORK_SLICE};
use crate::pacing;
use crate::pool::{RunState, WorkerPool};

const MAX_THREADS: i64 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuBurnConfig {
    pub threads: i64,
    pub intensity: i64,
}

impl Default for CpuBurnConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get() as i64,
            intensity: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuBurnStatus {
    pub running: bool,
    pub threads: usize,
    pub intensity: u32,
}

pub struct CpuBurn {
    pool: WorkerPool,
    intensity: Arc<AtomicU32>,
}

impl CpuBurn {
    pub fn new() -> Self {
        Self {
            pool: WorkerPool::new(),
            intensity: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Restart with a clamped configuration and return the applied snapshot.
    pub fn start(&self, config: CpuBurnConfig) -> CpuBurnStatus {
        let threads = config.threads.clamp(1, MAX_THREADS) as usize;
        let intensity = config.intensity.clamp(1, 100) as u32;
        self.stop();

        self.intensity.store(intensity, Ordering::Relaxed);
        let shared = Arc::clone(&self.intensity);
        tracing::info!(threads, intensity, "cpu burn started");
        self.pool
            .start(threads, "cpu-burn", move |_, run| burn_loop(run, &shared));
        self.status()
    }

    pub fn stop(&self) {
        self.pool.stop();
        self.intensity.store(0, Ordering::Relaxed);
    }

    pub fn status(&self) -> CpuBurnStatus {
        CpuBurnStatus {
            running: self.pool.is_running(),
            threads: self.pool.live_workers(),
            intensity: self.intensity.load(Ordering::Relaxed),
        }
    }
}

impl Default for CpuBurn {
    fn default() -> Self {
        Self::new()
    }
}

fn burn_loop(run: &RunState, intensity: &AtomicU32) {
    let mut buf = [0u8; 256];
    rand::rng().fill_bytes(&mut buf);

    while run.should_run() {
        let p = intensity.load(Ordering::Relaxed);
        if p == 0 {
            thread::sleep(IDLE_RECHECK);
            continue;
        }

        let slice_start = Instant::now();
        while run.should_run() && slice_start.elapsed() < WORK_SLICE {
            hot_loop(&mut buf);
        }

        let pause = pacing::duty_pause(p);
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}

/// One hash-and-mix round. Named so it stands out in a thread dump.
#[inline(never)]
pub fn hot_loop(buf: &mut [u8; 256]) {
    let digest = Sha256::digest(&*buf);
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= digest[i % digest.len()];
    }
}

/// Synchronous burst: run the hot loop on the calling thread for `ms`
/// milliseconds and return the number of rounds completed.
pub fn burn_for(ms: u64) -> u64 {
    let deadline = Instant::now() + Duration::from_millis(ms.max(1));
    let mut buf = [0u8; 256];
    rand::rng().fill_bytes(&mut buf);
    let mut rounds = 0u64;
    while Instant::now() < deadline {
        hot_loop(&mut buf);
        rounds += 1;
    }
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_is_clamped_both_ways() {
        let burn = CpuBurn::new();
        let applied = burn.start(CpuBurnConfig {
            threads: 1,
            intensity: 500,
        });
        assert_eq!(applied.intensity, 100);
        burn.stop();

        let applied = burn.start(CpuBurnConfig {
            threads: 1,
            intensity: -5,
        });
        assert_eq!(applied.intensity, 1);
        burn.stop();
    }

    #[test]
    fn test_stop_zeroes_counters() {
        let burn = CpuBurn::new();
        let applied = burn.start(CpuBurnConfig {
            threads: 2,
            intensity: 10,
        });
        assert!(applied.running);
        assert_eq!(applied.threads, 2);

        burn.stop();
        let status = burn.status();
        assert!(!status.running);
        assert_eq!(status.threads, 0);
        assert_eq!(status.intensity, 0);
    }

    #[test]
    fn test_thread_count_is_floored() {
        let burn = CpuBurn::new();
        let applied = burn.start(CpuBurnConfig {
            threads: -3,
            intensity: 5,
        });
        assert_eq!(applied.threads, 1);
        burn.stop();
    }

    #[test]
    fn test_hot_loop_mutates_buffer() {
        let mut buf = [7u8; 256];
        hot_loop(&mut buf);
        assert_ne!(buf, [7u8; 256]);
    }

    #[test]
    fn test_burn_for_makes_progress() {
        assert!(burn_for(5) > 0);
    }
}
