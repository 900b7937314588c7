//! # havoc
//!
//! A remotely-controllable fault-injection harness: seven independently
//! switchable injectors, each reproducing a classic resource-exhaustion
//! pathology with real OS threads, so external diagnostic tooling can be
//! exercised against genuine symptoms.
//!
//! ## Components
//!
//! - **WorkerPool** - bounded worker generations with join-or-abandon stop
//! - **Pacing** - intensity and rate converted into work/sleep duty cycles
//! - **Injectors** - CpuBurn, AllocChurn, MemRetain, FdLeak, IoBurn,
//!   Starvation, Deadlock
//! - **Harness** - all injectors under one owner plus the route table and
//!   JSON dispatcher the (external) transport drives
//!
//! ## Usage
//!
//! ```rust,ignore
//! use havoc::{Harness, Method};
//!
//! let harness = Harness::new();
//! let reply = harness.handle("/burn/start", Method::Post, Some(r#"{"intensity": 80}"#));
//! assert_eq!(reply.code.http_status(), 200);
//! harness.cpu_burn.stop();
//! ```
//!
//! Stopping is cooperative: workers poll a per-generation run flag and are
//! joined with a bounded wait, never killed. The deadlock injector is the
//! deliberate exception - its pairs are permanent for the process lifetime.

pub mod constants;
pub mod control;
pub mod error;
pub mod injectors;
pub mod pacing;
pub mod pool;

pub use control::{resolve, Harness, Method, Op, Reply, ReplyCode, Route, ROUTES};
pub use error::{HavocError, Result};
pub use injectors::{
    AllocChurn, AllocChurnConfig, AllocChurnStatus, CpuBurn, CpuBurnConfig, CpuBurnStatus,
    Deadlock, DeadlockStatus, FdLeak, FdLeakConfig, FdLeakStatus, IoBurn, IoBurnConfig,
    IoBurnStatus, IoOnceReport, MemRetain, MemRetainConfig, MemRetainStatus, Starvation,
    StarvationConfig, StarvationStatus,
};
pub use pool::{RunState, WorkerPool};
