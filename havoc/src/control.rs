//! Control surface for the transport layer.
//!
//! The transport maps incoming requests 1:1 onto injector operations; this
//! module gives it everything it needs without owning any socket: a static
//! route table, a JSON dispatcher, and reply codes with HTTP mappings.
//! Configuration bodies are decoded here so out-of-range values clamp and
//! only genuinely malformed bodies are rejected.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::HavocError;
use crate::injectors::{
    cpu_burn, io_burn, AllocChurn, AllocChurnConfig, CpuBurn, CpuBurnConfig, Deadlock, FdLeak,
    FdLeakConfig, IoBurn, IoBurnConfig, MemRetain, MemRetainConfig, Starvation, StarvationConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Every operation the transport can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Health,
    Pid,
    CpuBurnStart,
    CpuBurnStop,
    CpuBurnStatus,
    CpuBurnOnce,
    AllocChurnStart,
    AllocChurnStop,
    AllocChurnStatus,
    MemRetainStart,
    MemRetainStop,
    MemRetainStatus,
    FdLeakStart,
    FdLeakStop,
    FdLeakStatus,
    IoBurnStart,
    IoBurnStop,
    IoBurnStatus,
    IoBurnOnce,
    StarvationStart,
    StarvationStop,
    StarvationStatus,
    WorkUnit,
    DeadlockCreate,
    DeadlockStatus,
}

pub struct Route {
    pub path: &'static str,
    pub method: Method,
    pub op: Op,
}

const fn route(path: &'static str, method: Method, op: Op) -> Route {
    Route { path, method, op }
}

/// The full (path, method) -> operation table.
pub const ROUTES: &[Route] = &[
    route("/health", Method::Get, Op::Health),
    route("/pid", Method::Get, Op::Pid),
    route("/burn/start", Method::Post, Op::CpuBurnStart),
    route("/burn/stop", Method::Post, Op::CpuBurnStop),
    route("/burn/status", Method::Get, Op::CpuBurnStatus),
    route("/cpu", Method::Get, Op::CpuBurnOnce),
    route("/alloc/start", Method::Post, Op::AllocChurnStart),
    route("/alloc/stop", Method::Post, Op::AllocChurnStop),
    route("/alloc/status", Method::Get, Op::AllocChurnStatus),
    route("/mem/start", Method::Post, Op::MemRetainStart),
    route("/mem/stop", Method::Post, Op::MemRetainStop),
    route("/mem/status", Method::Get, Op::MemRetainStatus),
    route("/fd/start", Method::Post, Op::FdLeakStart),
    route("/fd/stop", Method::Post, Op::FdLeakStop),
    route("/fd/status", Method::Get, Op::FdLeakStatus),
    route("/io/start", Method::Post, Op::IoBurnStart),
    route("/io/stop", Method::Post, Op::IoBurnStop),
    route("/io/status", Method::Get, Op::IoBurnStatus),
    route("/io/once", Method::Get, Op::IoBurnOnce),
    route("/block/start", Method::Post, Op::StarvationStart),
    route("/block/stop", Method::Post, Op::StarvationStop),
    route("/block/status", Method::Get, Op::StarvationStatus),
    route("/work", Method::Get, Op::WorkUnit),
    route("/deadlock/start", Method::Post, Op::DeadlockCreate),
    route("/deadlock/status", Method::Get, Op::DeadlockStatus),
];

/// Look up an operation; `None` means the transport should answer not-found.
pub fn resolve(path: &str, method: Method) -> Option<Op> {
    ROUTES
        .iter()
        .find(|r| r.path == path && r.method == method)
        .map(|r| r.op)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyCode {
    Ok,
    BadRequest,
    NotFound,
    LimitReached,
    Internal,
}

impl ReplyCode {
    /// Status the transport should put on the wire.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::LimitReached => 429,
            Self::Internal => 500,
        }
    }
}

/// A fully-formed control reply; the transport only serializes `body` and
/// maps `code` onto its wire status.
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: ReplyCode,
    pub body: Value,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self {
            code: ReplyCode::Ok,
            body,
        }
    }

    fn not_found() -> Self {
        Self {
            code: ReplyCode::NotFound,
            body: json!({"error": "not_found"}),
        }
    }

    fn failure(err: &HavocError) -> Self {
        let code = match err {
            HavocError::BadRequest(_) => ReplyCode::BadRequest,
            HavocError::DeadlockLimit { .. } => ReplyCode::LimitReached,
            _ => ReplyCode::Internal,
        };
        let label = match code {
            ReplyCode::BadRequest => "bad_request",
            ReplyCode::LimitReached => "limit_reached",
            _ => "internal",
        };
        Self {
            code,
            body: json!({"ok": false, "error": label, "detail": err.to_string()}),
        }
    }
}

/// Parameters for the synchronous one-shot burn.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BurnOnceParams {
    pub ms: i64,
}

impl Default for BurnOnceParams {
    fn default() -> Self {
        Self { ms: 3000 }
    }
}

/// Parameters for one dispatched unit of work.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkParams {
    pub ms: i64,
}

impl Default for WorkParams {
    fn default() -> Self {
        Self { ms: 10 }
    }
}

/// Parameters for the one-shot scratch write.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IoOnceParams {
    pub mb: i64,
    pub fsync: bool,
    pub dir: Option<std::path::PathBuf>,
}

impl Default for IoOnceParams {
    fn default() -> Self {
        Self {
            mb: 256,
            fsync: true,
            dir: None,
        }
    }
}

/// All seven injectors under one owner, with well-defined construction and
/// teardown. The transport holds one of these by reference; there is no
/// ambient shared state.
pub struct Harness {
    pub cpu_burn: CpuBurn,
    pub alloc_churn: AllocChurn,
    pub mem_retain: MemRetain,
    pub fd_leak: FdLeak,
    pub io_burn: IoBurn,
    pub starvation: Starvation,
    pub deadlock: Deadlock,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            cpu_burn: CpuBurn::new(),
            alloc_churn: AllocChurn::new(),
            mem_retain: MemRetain::new(),
            fd_leak: FdLeak::new(),
            io_burn: IoBurn::new(),
            starvation: Starvation::new(),
            deadlock: Deadlock::new(),
        }
    }

    /// Resolve and dispatch in one step; unknown routes get the not-found
    /// reply instead of an error.
    pub fn handle(&self, path: &str, method: Method, body: Option<&str>) -> Reply {
        match resolve(path, method) {
            Some(op) => self.dispatch(op, body),
            None => Reply::not_found(),
        }
    }

    pub fn dispatch(&self, op: Op, body: Option<&str>) -> Reply {
        match op {
            Op::Health => Reply::ok(json!({"ok": true})),
            Op::Pid => Reply::ok(json!({
                "pid": std::process::id(),
                "version": env!("CARGO_PKG_VERSION"),
            })),

            Op::CpuBurnStart => start(body, |cfg: CpuBurnConfig| self.cpu_burn.start(cfg)),
            Op::CpuBurnStop => stopped(|| self.cpu_burn.stop()),
            Op::CpuBurnStatus => snapshot(&self.cpu_burn.status()),
            Op::CpuBurnOnce => match decode::<BurnOnceParams>(body) {
                Ok(params) => {
                    let ms = params.ms.max(1) as u64;
                    let rounds = cpu_burn::burn_for(ms);
                    Reply::ok(json!({"ok": true, "ms": ms, "rounds": rounds}))
                }
                Err(err) => Reply::failure(&err),
            },

            Op::AllocChurnStart => start(body, |cfg: AllocChurnConfig| self.alloc_churn.start(cfg)),
            Op::AllocChurnStop => stopped(|| self.alloc_churn.stop()),
            Op::AllocChurnStatus => snapshot(&self.alloc_churn.status()),

            Op::MemRetainStart => start(body, |cfg: MemRetainConfig| self.mem_retain.start(cfg)),
            Op::MemRetainStop => stopped(|| self.mem_retain.stop()),
            Op::MemRetainStatus => snapshot(&self.mem_retain.status()),

            Op::FdLeakStart => start(body, |cfg: FdLeakConfig| self.fd_leak.start(cfg)),
            Op::FdLeakStop => stopped(|| self.fd_leak.stop()),
            Op::FdLeakStatus => snapshot(&self.fd_leak.status()),

            Op::IoBurnStart => start(body, |cfg: IoBurnConfig| self.io_burn.start(cfg)),
            Op::IoBurnStop => stopped(|| self.io_burn.stop()),
            Op::IoBurnStatus => snapshot(&self.io_burn.status()),
            Op::IoBurnOnce => match decode::<IoOnceParams>(body) {
                Ok(params) => match io_burn::write_once(params.dir, params.mb, params.fsync) {
                    Ok(report) => snapshot(&report),
                    Err(err) => Reply::failure(&err),
                },
                Err(err) => Reply::failure(&err),
            },

            Op::StarvationStart => start(body, |cfg: StarvationConfig| self.starvation.start(cfg)),
            Op::StarvationStop => stopped(|| self.starvation.stop()),
            Op::StarvationStatus => snapshot(&self.starvation.status()),
            Op::WorkUnit => match decode::<WorkParams>(body) {
                Ok(params) => {
                    let elapsed = self.starvation.work_unit(params.ms);
                    Reply::ok(json!({"ok": true, "elapsed_ms": elapsed.as_millis() as u64}))
                }
                Err(err) => Reply::failure(&err),
            },

            Op::DeadlockCreate => match self.deadlock.try_create() {
                Ok(pair) => Reply::ok(json!({"ok": true, "created": pair})),
                Err(err) => Reply::failure(&err),
            },
            Op::DeadlockStatus => snapshot(&self.deadlock.status()),
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Absent or empty bodies mean "all defaults"; only malformed JSON rejects.
fn decode<T: DeserializeOwned + Default>(body: Option<&str>) -> crate::error::Result<T> {
    match body {
        None => Ok(T::default()),
        Some(s) if s.trim().is_empty() => Ok(T::default()),
        Some(s) => Ok(serde_json::from_str(s)?),
    }
}

fn start<C, S, F>(body: Option<&str>, apply: F) -> Reply
where
    C: DeserializeOwned + Default,
    S: Serialize,
    F: FnOnce(C) -> S,
{
    match decode::<C>(body) {
        Ok(config) => snapshot(&apply(config)),
        Err(err) => Reply::failure(&err),
    }
}

fn stopped<F: FnOnce()>(stop: F) -> Reply {
    stop();
    Reply::ok(json!({"ok": true}))
}

fn snapshot<T: Serialize>(status: &T) -> Reply {
    match serde_json::to_value(status) {
        Ok(body) => Reply::ok(body),
        Err(err) => Reply::failure(&HavocError::unexpected(err.to_string())),
    }
}
