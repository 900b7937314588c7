//! File-descriptor leak injector.
//!
//! A single worker opens read handles in paced bursts and retains them
//! without closing, up to a hard cap. Unlike a genuine leak the handles are
//! recoverable: `stop()` closes every one, modeling an operator remediating
//! a descriptor leak on demand.

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{ACQUIRE_BACKOFF, LEAK_FULL_IDLE, LEAK_TICK};
use crate::pool::{RunState, WorkerPool};

const MAX_OPEN_PER_SEC: i64 = 500;
const MAX_FDS: i64 = 2048;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FdLeakConfig {
    pub open_per_sec: i64,
    pub max: i64,
    pub dir: Option<PathBuf>,
}

impl Default for FdLeakConfig {
    fn default() -> Self {
        Self {
            open_per_sec: 50,
            max: 256,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FdLeakStatus {
    pub running: bool,
    pub open_per_sec: u64,
    pub max: u64,
    pub opened: u64,
    pub dir: String,
}

struct LeakShared {
    open_per_sec: AtomicU64,
    max: AtomicU64,
    opened: AtomicU64,
    dir: Mutex<PathBuf>,
    handles: Mutex<Vec<File>>,
}

pub struct FdLeak {
    pool: WorkerPool,
    shared: Arc<LeakShared>,
}

impl FdLeak {
    pub fn new() -> Self {
        Self {
            pool: WorkerPool::new(),
            shared: Arc::new(LeakShared {
                open_per_sec: AtomicU64::new(0),
                max: AtomicU64::new(0),
                opened: AtomicU64::new(0),
                dir: Mutex::new(std::env::temp_dir()),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn start(&self, config: FdLeakConfig) -> FdLeakStatus {
        let open_per_sec = config.open_per_sec.clamp(1, MAX_OPEN_PER_SEC) as u64;
        let max = config.max.clamp(1, MAX_FDS) as u64;
        let dir = config.dir.unwrap_or_else(std::env::temp_dir);
        self.stop();

        if let Err(err) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), %err, "could not create leak directory");
        }
        self.shared.open_per_sec.store(open_per_sec, Ordering::Relaxed);
        self.shared.max.store(max, Ordering::Relaxed);
        self.shared.opened.store(0, Ordering::Relaxed);
        *self.shared.dir.lock() = dir;
        let shared = Arc::clone(&self.shared);
        tracing::info!(open_per_sec, max, "descriptor leak started");
        self.pool
            .start(1, "fd-leak", move |_, run| leak_loop(run, &shared));
        self.status()
    }

    /// Stop the worker and close every retained handle.
    pub fn stop(&self) {
        self.pool.stop();
        {
            let mut handles = self.shared.handles.lock();
            handles.clear();
            self.shared.opened.store(0, Ordering::Relaxed);
        }
        self.shared.open_per_sec.store(0, Ordering::Relaxed);
        self.shared.max.store(0, Ordering::Relaxed);
    }

    pub fn status(&self) -> FdLeakStatus {
        FdLeakStatus {
            running: self.pool.is_running(),
            open_per_sec: self.shared.open_per_sec.load(Ordering::Relaxed),
            max: self.shared.max.load(Ordering::Relaxed),
            opened: self.shared.opened.load(Ordering::Relaxed),
            dir: self.shared.dir.lock().display().to_string(),
        }
    }
}

impl Default for FdLeak {
    fn default() -> Self {
        Self::new()
    }
}

fn leak_loop(run: &RunState, shared: &LeakShared) {
    while run.should_run() {
        if shared.opened.load(Ordering::Relaxed) >= shared.max.load(Ordering::Relaxed) {
            thread::sleep(LEAK_FULL_IDLE);
            continue;
        }

        let burst = (shared.open_per_sec.load(Ordering::Relaxed) / 10).max(1);
        for _ in 0..burst {
            if !run.should_run()
                || shared.opened.load(Ordering::Relaxed) >= shared.max.load(Ordering::Relaxed)
            {
                break;
            }
            open_one(shared);
        }
        thread::sleep(LEAK_TICK);
    }
}

fn open_one(shared: &LeakShared) {
    let dir = shared.dir.lock().clone();
    let path = dir.join(format!(
        "fd-leak-{}.txt",
        rand::rng().random_range(0..1_000_000)
    ));
    let opened = (|| {
        if !path.exists() {
            fs::write(&path, b"hello\n")?;
        }
        File::open(&path)
    })();
    match opened {
        Ok(file) => {
            let mut handles = shared.handles.lock();
            handles.push(file);
            shared.opened.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "open failed, backing off");
            thread::sleep(ACQUIRE_BACKOFF);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let leak = FdLeak::new();
        let applied = leak.start(FdLeakConfig {
            open_per_sec: 9_999,
            max: 0,
            dir: Some(dir.path().to_path_buf()),
        });
        assert_eq!(applied.open_per_sec, 500);
        assert_eq!(applied.max, 1);
        leak.stop();
    }

    #[test]
    fn test_stop_closes_and_zeroes() {
        let dir = tempfile::tempdir().unwrap();
        let leak = FdLeak::new();
        leak.start(FdLeakConfig {
            open_per_sec: 500,
            max: 3,
            dir: Some(dir.path().to_path_buf()),
        });
        leak.stop();

        let status = leak.status();
        assert!(!status.running);
        assert_eq!(status.opened, 0);
        assert_eq!(status.open_per_sec, 0);
        assert_eq!(status.max, 0);
    }
}
