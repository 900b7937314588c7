//! Lock-order deadlock injector.
//!
//! Each invocation spawns two threads that take the shared mutex pair in
//! opposite orders, guaranteeing a cycle once both reach their second
//! acquisition. Pairs are permanent for the life of the process: there is
//! deliberately no stop, no timeout, no remediation. The injector exists so
//! an external agent can find a *real* deadlock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::constants::{DEADLOCK_HOLD, MAX_DEADLOCK_PAIRS};
use crate::error::{HavocError, Result};

/// How long to wait for both threads to report in before giving up on the
/// rendezvous (the pair is still created either way).
const STARTED_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
pub struct DeadlockStatus {
    pub created: u32,
    pub limit: u32,
}

pub struct Deadlock {
    lock_a: Arc<Mutex<()>>,
    lock_b: Arc<Mutex<()>>,
    created: AtomicU32,
}

impl Deadlock {
    pub fn new() -> Self {
        Self {
            lock_a: Arc::new(Mutex::new(())),
            lock_b: Arc::new(Mutex::new(())),
            created: AtomicU32::new(0),
        }
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> DeadlockStatus {
        DeadlockStatus {
            created: self.created(),
            limit: MAX_DEADLOCK_PAIRS,
        }
    }

    /// Spawn one deadlocked thread pair. Returns the pair number once both
    /// threads have signaled they started - not once the deadlock has
    /// formed, which takes another lock-hold interval. Fails with
    /// [`HavocError::DeadlockLimit`] once the cap is reached.
    pub fn try_create(&self) -> Result<u32> {
        let pair = self
            .created
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |created| {
                (created < MAX_DEADLOCK_PAIRS).then_some(created + 1)
            })
            .map_err(|created| HavocError::DeadlockLimit { created })?
            + 1;

        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(2);

        let first = Arc::clone(&self.lock_a);
        let second = Arc::clone(&self.lock_b);
        let tx = started_tx.clone();
        spawn_half(format!("deadlock-a-then-b-{pair}"), first, second, tx);

        let first = Arc::clone(&self.lock_b);
        let second = Arc::clone(&self.lock_a);
        spawn_half(format!("deadlock-b-then-a-{pair}"), first, second, started_tx);

        for _ in 0..2 {
            if started_rx.recv_timeout(STARTED_WAIT).is_err() {
                tracing::warn!(pair, "deadlock thread never reported started");
                break;
            }
        }
        tracing::info!(pair, "deadlock pair created");
        Ok(pair)
    }
}

impl Default for Deadlock {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_half(
    name: String,
    first: Arc<Mutex<()>>,
    second: Arc<Mutex<()>>,
    started: crossbeam_channel::Sender<()>,
) {
    let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
        let _ = started.send(());
        let _first = first.lock();
        thread::sleep(DEADLOCK_HOLD);
        let _second = second.lock();
        // unreachable once the partner holds the other lock
    });
    if let Err(err) = spawned {
        tracing::warn!(thread = %name, %err, "failed to spawn deadlock thread");
    }
}
