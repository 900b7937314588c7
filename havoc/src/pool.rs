//! Bounded worker lifecycles.
//!
//! Every injector that runs background load owns a [`WorkerPool`]. A pool
//! manages one *generation* of workers at a time: all spawned together, all
//! polling the same run flag, all stopped together with a bounded join.
//! Workers that fail to finish inside the join bound are abandoned, never
//! killed - a thread mid-write cannot be safely terminated, so `stop()`
//! trades a possible brief overlap for a guaranteed return.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::constants::{JOIN_POLL, JOIN_TIMEOUT};

/// Run flag and live-worker accounting for one generation of workers.
///
/// The flag is the sole shutdown signal: workers poll it at every
/// suspension point and exit cooperatively. Each generation gets a fresh
/// `RunState`, so a straggler abandoned past the join deadline can never be
/// revived by a later `start()`.
pub struct RunState {
    run: AtomicBool,
    live: AtomicUsize,
}

impl RunState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            run: AtomicBool::new(true),
            live: AtomicUsize::new(0),
        })
    }

    /// Whether workers of this generation should keep looping.
    #[inline]
    pub fn should_run(&self) -> bool {
        self.run.load(Ordering::Relaxed)
    }

    /// Workers of this generation that have not exited yet.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

/// Decrements the live count when a worker exits, panicking or not.
struct LiveGuard(Arc<RunState>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::Relaxed);
    }
}

struct Generation {
    run: Arc<RunState>,
    handles: Vec<JoinHandle<()>>,
}

/// N background workers started together and stopped together.
pub struct WorkerPool {
    // serializes start/stop; status reads only touch `current`
    lifecycle: Mutex<()>,
    current: Mutex<Option<Generation>>,
    join_timeout: Duration,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::with_join_timeout(JOIN_TIMEOUT)
    }

    pub fn with_join_timeout(join_timeout: Duration) -> Self {
        Self {
            lifecycle: Mutex::new(()),
            current: Mutex::new(None),
            join_timeout,
        }
    }

    /// Stop any previous generation, then spawn `workers` named threads all
    /// sharing a fresh run flag. The payload receives its worker index and
    /// the generation's [`RunState`] and is expected to loop on
    /// [`RunState::should_run`].
    pub fn start<F>(&self, workers: usize, name: &str, payload: F)
    where
        F: Fn(usize, &RunState) + Send + Sync + 'static,
    {
        let _lifecycle = self.lifecycle.lock();
        let previous = self.current.lock().take();
        self.shutdown(previous);

        let run = RunState::new();
        let payload = Arc::new(payload);
        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let worker_run = Arc::clone(&run);
            let payload = Arc::clone(&payload);
            // counted before spawn so stop() cannot observe a short window
            run.live.fetch_add(1, Ordering::Relaxed);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, n + 1))
                .spawn(move || {
                    let guard = LiveGuard(worker_run);
                    payload(n, guard.0.as_ref());
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    run.live.fetch_sub(1, Ordering::Relaxed);
                    tracing::warn!(pool = name, worker = n + 1, %err, "failed to spawn worker");
                }
            }
        }
        *self.current.lock() = Some(Generation { run, handles });
    }

    /// Flip the run flag, wait up to the join bound for workers to drain,
    /// then detach whatever is left. Safe to call from any state; returns
    /// `true` when every worker exited inside the bound.
    pub fn stop(&self) -> bool {
        let _lifecycle = self.lifecycle.lock();
        let previous = self.current.lock().take();
        self.shutdown(previous)
    }

    fn shutdown(&self, generation: Option<Generation>) -> bool {
        let Some(generation) = generation else {
            return true;
        };
        generation.run.run.store(false, Ordering::Relaxed);

        let deadline = Instant::now() + self.join_timeout;
        while generation.run.live() > 0 && Instant::now() < deadline {
            thread::sleep(JOIN_POLL);
        }

        let mut abandoned = 0usize;
        for handle in generation.handles {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            tracing::warn!(abandoned, "workers still running past the join bound, detached");
        }
        abandoned == 0
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map_or(false, |g| g.run.should_run())
    }

    /// Live workers in the current generation; 0 once stopped.
    pub fn live_workers(&self) -> usize {
        self.current.lock().as_ref().map_or(0, |g| g.run.live())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}
