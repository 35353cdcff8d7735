//! Bridge between kernel request threads and async handlers.
//!
//! Every request runs as its own tokio task, bounded by a timeout and
//! accounted in the mount's [`StatsRecorder`]. Two entry points:
//!
//! - [`spawn`] for request loops that reply from a callback. The reply
//!   closure runs exactly once, including when the task is aborted or
//!   panics.
//! - [`execute`] for synchronous callback threads that must block until the
//!   answer is known.
//!
//! A timed-out task is aborted so it cannot keep holding locks. There is no
//! rollback: whatever the handler did before the abort stays done.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use vfsgate_stats::StatsRecorder;

use crate::error::DispatchResult;
use crate::op::OpKind;

/// Error from the bridge itself, as opposed to the handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation was cancelled")]
    Cancelled,
}

impl BridgeError {
    pub fn to_errno(&self) -> i32 {
        match self {
            BridgeError::Timeout(_) => libc::ETIMEDOUT,
            BridgeError::Cancelled => libc::ECANCELED,
        }
    }
}

/// Runs `future` as a task and hands its result to `reply`.
///
/// `reply` is called exactly once: with the handler's result, with
/// [`BridgeError::Timeout`] if the handler exceeds `timeout`, or with
/// [`BridgeError::Cancelled`] if the task is aborted through the returned
/// handle, panics, or is dropped by a runtime shutdown.
pub fn spawn<F, T, R>(
    handle: &Handle,
    op: OpKind,
    timeout: Duration,
    stats: Arc<dyn StatsRecorder>,
    future: F,
    reply: R,
) -> JoinHandle<()>
where
    F: Future<Output = DispatchResult<T>> + Send + 'static,
    T: Send + 'static,
    R: FnOnce(DispatchResult<T>) + Send + 'static,
{
    stats.record_start(op.class());
    trace!(op = %op, "Dispatching request");
    let started = Instant::now();
    let pending = PendingReply::new(op, stats, reply);

    handle.spawn(async move {
        let result = match tokio::time::timeout(timeout, future).await {
            Ok(result) => {
                account(pending.stats.as_ref(), op, started, &result);
                result
            }
            Err(_elapsed) => {
                warn!(op = %op, ?timeout, "Request timed out");
                pending.stats.record_timeout(op.class());
                Err(BridgeError::Timeout(timeout).into())
            }
        };
        pending.send(result);
    })
}

/// Runs `future` as a task and blocks the calling thread until it finishes.
///
/// If the operation times out, the task is aborted.
///
/// # Panics
///
/// Panics if called from within an async execution context; the calling
/// thread must be one the runtime does not drive.
pub fn execute<F, T>(
    handle: &Handle,
    op: OpKind,
    timeout: Duration,
    stats: &dyn StatsRecorder,
    future: F,
) -> DispatchResult<T>
where
    F: Future<Output = DispatchResult<T>> + Send + 'static,
    T: Send + 'static,
{
    stats.record_start(op.class());
    trace!(op = %op, "Dispatching request");
    let started = Instant::now();

    let (tx, rx) = oneshot::channel();
    let task = handle.spawn(async move {
        let result = tokio::time::timeout(timeout, future).await;
        // Receiver may already be gone.
        let _ = tx.send(result);
    });

    match rx.blocking_recv() {
        Ok(Ok(result)) => {
            account(stats, op, started, &result);
            result
        }
        Ok(Err(_elapsed)) => {
            task.abort();
            warn!(op = %op, ?timeout, "Request timed out");
            stats.record_timeout(op.class());
            Err(BridgeError::Timeout(timeout).into())
        }
        Err(_recv_error) => {
            task.abort();
            debug!(op = %op, "Request cancelled");
            stats.record_error(op.class());
            Err(BridgeError::Cancelled.into())
        }
    }
}

fn account<T>(
    stats: &dyn StatsRecorder,
    op: OpKind,
    started: Instant,
    result: &DispatchResult<T>,
) {
    match result {
        Ok(_) => stats.record_complete(op.class(), started.elapsed()),
        Err(e) => {
            trace!(op = %op, errno = e.to_errno(), "Request failed");
            stats.record_error(op.class());
        }
    }
}

/// Reply callback that fires `Cancelled` if dropped unsent.
struct PendingReply<T, R>
where
    R: FnOnce(DispatchResult<T>),
{
    reply: Option<R>,
    op: OpKind,
    stats: Arc<dyn StatsRecorder>,
    _result: PhantomData<fn(T)>,
}

impl<T, R> PendingReply<T, R>
where
    R: FnOnce(DispatchResult<T>),
{
    fn new(op: OpKind, stats: Arc<dyn StatsRecorder>, reply: R) -> Self {
        Self {
            reply: Some(reply),
            op,
            stats,
            _result: PhantomData,
        }
    }

    fn send(mut self, result: DispatchResult<T>) {
        if let Some(reply) = self.reply.take() {
            reply(result);
        }
    }
}

impl<T, R> Drop for PendingReply<T, R>
where
    R: FnOnce(DispatchResult<T>),
{
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            debug!(op = %self.op, "Request cancelled");
            self.stats.record_error(self.op.class());
            reply(Err(BridgeError::Cancelled.into()));
        }
    }
}
