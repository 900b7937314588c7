//! Disk I/O saturation injector.
//!
//! Workers loop create / write / flush / delete over uniquely named scratch
//! files. A stateless one-shot variant runs the same sequence once on the
//! calling thread for ad hoc burst testing.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::constants::ACQUIRE_BACKOFF;
use crate::error::Result;
use crate::pool::{RunState, WorkerPool};

const MAX_THREADS: i64 = 256;
const MAX_MB_PER_OP: i64 = 4096;

/// Write unit; every scratch file is written in increments of this size.
const CHUNK_BYTES: usize = 1 << 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoBurnConfig {
    pub threads: i64,
    pub mb_per_op: i64,
    pub fsync: bool,
    pub dir: Option<PathBuf>,
}

impl Default for IoBurnConfig {
    fn default() -> Self {
        Self {
            threads: (num_cpus::get() / 2).max(1) as i64,
            mb_per_op: 64,
            fsync: true,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IoBurnStatus {
    pub running: bool,
    pub threads: usize,
    pub mb_per_op: u64,
    pub fsync: bool,
    pub ops: u64,
    pub dir: String,
}

/// Outcome of the one-shot write, returned to the caller as-is.
#[derive(Debug, Clone, Serialize)]
pub struct IoOnceReport {
    pub bytes_written: u64,
    pub elapsed_ms: u64,
    pub fsync: bool,
}

struct IoShared {
    mb_per_op: AtomicU64,
    fsync: AtomicBool,
    ops: AtomicU64,
    dir: Mutex<PathBuf>,
}

pub struct IoBurn {
    pool: WorkerPool,
    shared: Arc<IoShared>,
}

impl IoBurn {
    pub fn new() -> Self {
        Self {
            pool: WorkerPool::new(),
            shared: Arc::new(IoShared {
                mb_per_op: AtomicU64::new(0),
                fsync: AtomicBool::new(false),
                ops: AtomicU64::new(0),
                dir: Mutex::new(std::env::temp_dir()),
            }),
        }
    }

    pub fn start(&self, config: IoBurnConfig) -> IoBurnStatus {
        let threads = config.threads.clamp(1, MAX_THREADS) as usize;
        let mb_per_op = config.mb_per_op.clamp(1, MAX_MB_PER_OP) as u64;
        let dir = config.dir.unwrap_or_else(std::env::temp_dir);
        self.stop();

        self.shared.mb_per_op.store(mb_per_op, Ordering::Relaxed);
        self.shared.fsync.store(config.fsync, Ordering::Relaxed);
        self.shared.ops.store(0, Ordering::Relaxed);
        *self.shared.dir.lock() = dir;
        let shared = Arc::clone(&self.shared);
        tracing::info!(threads, mb_per_op, fsync = config.fsync, "io burn started");
        self.pool
            .start(threads, "io-burn", move |n, run| burn_loop(n, run, &shared));
        self.status()
    }

    pub fn stop(&self) {
        self.pool.stop();
        self.shared.mb_per_op.store(0, Ordering::Relaxed);
        self.shared.fsync.store(false, Ordering::Relaxed);
        self.shared.ops.store(0, Ordering::Relaxed);
    }

    pub fn status(&self) -> IoBurnStatus {
        IoBurnStatus {
            running: self.pool.is_running(),
            threads: self.pool.live_workers(),
            mb_per_op: self.shared.mb_per_op.load(Ordering::Relaxed),
            fsync: self.shared.fsync.load(Ordering::Relaxed),
            ops: self.shared.ops.load(Ordering::Relaxed),
            dir: self.shared.dir.lock().display().to_string(),
        }
    }
}

impl Default for IoBurn {
    fn default() -> Self {
        Self::new()
    }
}

fn burn_loop(worker: usize, run: &RunState, shared: &IoShared) {
    let mut fill = vec![0u8; CHUNK_BYTES];
    rand::rng().fill_bytes(&mut fill);
    let pid = std::process::id();
    // distinguishes this generation's files from an abandoned straggler's
    let tag: u32 = rand::rng().random();
    let mut seq = 0u64;

    while run.should_run() {
        let mb = shared.mb_per_op.load(Ordering::Relaxed).max(1);
        let fsync = shared.fsync.load(Ordering::Relaxed);
        let dir = shared.dir.lock().clone();
        if let Err(err) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), %err, "scratch dir unavailable, backing off");
            thread::sleep(ACQUIRE_BACKOFF);
            continue;
        }

        seq += 1;
        let path = dir.join(format!("io-burn-{pid}-{tag:08x}-{}-{seq}.dat", worker + 1));
        match write_scratch(&path, &fill, mb, fsync) {
            Ok(()) => {
                shared.ops.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "scratch write failed, skipping op");
                thread::sleep(ACQUIRE_BACKOFF);
            }
        }
        let _ = fs::remove_file(&path);
    }
}

fn write_scratch(path: &Path, fill: &[u8], mb: u64, fsync: bool) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    for _ in 0..mb {
        file.write_all(fill)?;
    }
    if fsync {
        file.sync_all()?;
    }
    Ok(())
}

/// One synchronous create / write / flush / delete sequence, independent of
/// any pool lifecycle. I/O failures surface to the caller instead of being
/// retried.
pub fn write_once(dir: Option<PathBuf>, mb: i64, fsync: bool) -> Result<IoOnceReport> {
    let dir = dir.unwrap_or_else(std::env::temp_dir);
    fs::create_dir_all(&dir)?;
    let mb = mb.clamp(1, MAX_MB_PER_OP) as u64;

    let mut fill = vec![0u8; CHUNK_BYTES];
    rand::rng().fill_bytes(&mut fill);
    let path = dir.join(format!(
        "io-once-{}-{:08x}.dat",
        std::process::id(),
        rand::rng().random::<u32>()
    ));

    let started = Instant::now();
    let written = write_scratch(&path, &fill, mb, fsync);
    let _ = fs::remove_file(&path);
    written?;

    Ok(IoOnceReport {
        bytes_written: mb * CHUNK_BYTES as u64,
        elapsed_ms: started.elapsed().as_millis() as u64,
        fsync,
    })
}
