//! Background install worker
//!
//! Each trigger owns a [`BusyFlag`]. A request only starts after taking the
//! flag's guard, and the guard travels into the worker so the flag is released
//! when the install ends, however it ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::progress::ChannelSink;
use super::InstallPipeline;
use crate::error::{InstallError, InstallResult};
use crate::logger;
use crate::models::{InstallEvent, InstallReport, InstallRequest};

/// At most one running install per trigger.
#[derive(Clone, Default)]
pub struct BusyFlag {
    busy: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag, or `None` when an install is already running.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Releases its [`BusyFlag`] on drop.
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

pub type InstallHandle = JoinHandle<InstallResult<InstallReport>>;

/// Run `request` on the blocking pool and stream its events back.
///
/// The receiver yields every event in order and closes once the worker is done.
pub fn spawn_install(
    pipeline: Arc<InstallPipeline>,
    request: InstallRequest,
    guard: BusyGuard,
) -> (InstallHandle, UnboundedReceiver<InstallEvent>) {
    let (sink, rx) = ChannelSink::channel();
    let handle = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        pipeline.run(&request, &sink)
    });
    (handle, rx)
}

/// Take the flag and spawn, or fail with [`InstallError::Busy`].
pub fn try_spawn_install(
    pipeline: Arc<InstallPipeline>,
    request: InstallRequest,
    flag: &BusyFlag,
) -> InstallResult<(InstallHandle, UnboundedReceiver<InstallEvent>)> {
    let Some(guard) = flag.try_acquire() else {
        logger::log_info(
            &format!("Ignoring {} request, an install is already running", request.target_id),
            Some("worker"),
        );
        return Err(InstallError::Busy);
    };
    Ok(spawn_install(pipeline, request, guard))
}

/// Wait for a spawned install, folding a panicked worker into an error.
pub async fn join_install(handle: InstallHandle) -> InstallResult<InstallReport> {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            logger::log_error(&format!("Install worker stopped: {}", e), Some("worker"));
            Err(InstallError::Internal(e.to_string()))
        }
    }
}
