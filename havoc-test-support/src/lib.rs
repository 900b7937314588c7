//! # havoc-test-support
//!
//! Testing infrastructure for the havoc harness.
//!
//! ## Components
//!
//! - **wait_for** - poll a condition until it holds or a deadline passes
//! - **init_tracing** - console subscriber for debugging noisy tests

use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(5);

/// Poll `condition` until it returns true or `timeout` elapses. Returns the
/// final observation, so asserting on the result reads naturally.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(POLL);
    }
    condition()
}

/// Install a fmt subscriber honoring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
