//! Convergence and bounds for the accumulation injectors.

use std::time::Duration;

use havoc::injectors::{FdLeak, FdLeakConfig, MemRetain, MemRetainConfig};
use havoc_test_support::wait_for;

const CONVERGE: Duration = Duration::from_secs(5);

#[test]
fn test_mem_retain_converges_to_target() {
    let retain = MemRetain::new();
    let applied = retain.start(MemRetainConfig {
        target_mb: 10,
        chunk_mb: 4,
        interval_ms: 1,
    });
    assert_eq!(applied.target_mb, 10);

    assert!(wait_for(CONVERGE, || retain.status().retained_mb >= 10));

    // growth stops once at target; overshoot is bounded by one chunk
    let settled = retain.status().retained_mb;
    assert!(settled <= 10 + 4 - 1, "retained {settled} MB");
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(retain.status().retained_mb, settled);

    retain.stop();
    assert_eq!(retain.status().retained_mb, 0);
}

#[test]
fn test_fd_leak_never_exceeds_cap() {
    let dir = tempfile::tempdir().unwrap();
    let leak = FdLeak::new();
    leak.start(FdLeakConfig {
        open_per_sec: 500,
        max: 7,
        dir: Some(dir.path().to_path_buf()),
    });

    assert!(wait_for(CONVERGE, || leak.status().opened == 7));

    // sample for a few ticks; the cap must hold at every observation
    for _ in 0..20 {
        assert!(leak.status().opened <= 7);
        std::thread::sleep(Duration::from_millis(10));
    }

    leak.stop();
    assert_eq!(leak.status().opened, 0);
}

#[test]
fn test_fd_leak_restart_resets_count() {
    let dir = tempfile::tempdir().unwrap();
    let leak = FdLeak::new();
    leak.start(FdLeakConfig {
        open_per_sec: 500,
        max: 4,
        dir: Some(dir.path().to_path_buf()),
    });
    assert!(wait_for(CONVERGE, || leak.status().opened == 4));

    // restart with a lower cap; the count starts over rather than carrying
    let applied = leak.start(FdLeakConfig {
        open_per_sec: 500,
        max: 2,
        dir: Some(dir.path().to_path_buf()),
    });
    assert!(applied.opened <= 2);
    assert!(wait_for(CONVERGE, || leak.status().opened == 2));
    leak.stop();
}
