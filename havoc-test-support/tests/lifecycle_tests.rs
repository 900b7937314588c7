//! Lifecycle tests for the pool-backed injectors.
//!
//! Every injector must satisfy the same contract: start() replaces any
//! prior worker generation, stop() drains workers and zeroes counters
//! within the join bound, and both are safe from any state.

use std::time::Duration;

use havoc::injectors::{
    AllocChurn, AllocChurnConfig, CpuBurn, CpuBurnConfig, FdLeak, FdLeakConfig, IoBurn,
    IoBurnConfig, MemRetain, MemRetainConfig, Starvation, StarvationConfig,
};
use havoc_test_support::wait_for;

const DRAIN: Duration = Duration::from_secs(2);

#[test]
fn test_cpu_burn_stop_drains_workers() {
    havoc_test_support::init_tracing();
    let burn = CpuBurn::new();
    let applied = burn.start(CpuBurnConfig {
        threads: 2,
        intensity: 5,
    });
    assert!(applied.running);
    assert_eq!(applied.threads, 2);
    assert_eq!(applied.intensity, 5);

    burn.stop();
    let status = burn.status();
    assert!(!status.running);
    assert_eq!(status.threads, 0);
    assert_eq!(status.intensity, 0);
}

#[test]
fn test_cpu_burn_restart_replaces_generation() {
    let burn = CpuBurn::new();
    burn.start(CpuBurnConfig {
        threads: 4,
        intensity: 5,
    });
    let applied = burn.start(CpuBurnConfig {
        threads: 2,
        intensity: 5,
    });
    // the second generation exactly replaces the first
    assert_eq!(applied.threads, 2);
    burn.stop();
    assert_eq!(burn.status().threads, 0);
}

#[test]
fn test_alloc_churn_lifecycle() {
    let churn = AllocChurn::new();
    let applied = churn.start(AllocChurnConfig {
        threads: 2,
        alloc_mb_per_sec: 2,
        chunk_kb: 64,
    });
    assert!(applied.running);
    assert_eq!(applied.threads, 2);
    assert_eq!(applied.alloc_mb_per_sec, 2);

    churn.stop();
    let status = churn.status();
    assert!(!status.running);
    assert_eq!(status.threads, 0);
    assert_eq!(status.alloc_mb_per_sec, 0);
    assert_eq!(status.chunk_kb, 0);
}

#[test]
fn test_mem_retain_stop_releases_heap() {
    let retain = MemRetain::new();
    retain.start(MemRetainConfig {
        target_mb: 6,
        chunk_mb: 2,
        interval_ms: 1,
    });
    assert!(wait_for(DRAIN, || retain.status().retained_mb > 0));

    retain.stop();
    let status = retain.status();
    assert!(!status.running);
    assert_eq!(status.retained_mb, 0);
    assert_eq!(status.retained_chunks, 0);
}

#[test]
fn test_fd_leak_stop_closes_handles() {
    let dir = tempfile::tempdir().unwrap();
    let leak = FdLeak::new();
    leak.start(FdLeakConfig {
        open_per_sec: 500,
        max: 5,
        dir: Some(dir.path().to_path_buf()),
    });
    assert!(wait_for(DRAIN, || leak.status().opened > 0));

    leak.stop();
    let status = leak.status();
    assert!(!status.running);
    assert_eq!(status.opened, 0);
}

#[test]
fn test_io_burn_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let burn = IoBurn::new();
    let applied = burn.start(IoBurnConfig {
        threads: 1,
        mb_per_op: 1,
        fsync: false,
        dir: Some(dir.path().to_path_buf()),
    });
    assert!(applied.running);
    assert_eq!(applied.threads, 1);
    assert!(wait_for(DRAIN, || burn.status().ops > 0));

    burn.stop();
    let status = burn.status();
    assert!(!status.running);
    assert_eq!(status.threads, 0);
    assert_eq!(status.ops, 0);

    // workers delete their scratch file after every op, so once the loop
    // winds down nothing should be left behind
    assert!(wait_for(DRAIN, || {
        std::fs::read_dir(dir.path()).map(|d| d.count() == 0).unwrap_or(false)
    }));
}

#[test]
fn test_starvation_has_nothing_to_join() {
    let starvation = Starvation::new();
    let applied = starvation.start(StarvationConfig { sleep_ms: 50 });
    assert!(applied.blocking);

    starvation.stop();
    starvation.stop();
    assert!(!starvation.status().blocking);
    assert_eq!(starvation.status().sleep_ms, 0);
}

#[test]
fn test_stop_from_idle_is_a_no_op() {
    let burn = CpuBurn::new();
    burn.stop();
    burn.stop();
    let status = burn.status();
    assert!(!status.running);
    assert_eq!(status.threads, 0);
}
