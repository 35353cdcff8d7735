use std::time::Duration;

use crate::OpClass;

/// Write-only statistics sink referenced by a dispatcher.
///
/// Implementations must be cheap and non-blocking: every method is called on
/// the request path, possibly from many tasks at once.
pub trait StatsRecorder: Send + Sync {
    /// A request of the given class was submitted.
    fn record_start(&self, class: OpClass);

    /// A request finished successfully after `elapsed`.
    fn record_complete(&self, class: OpClass, elapsed: Duration);

    /// A request finished with an error.
    fn record_error(&self, class: OpClass);

    /// A request was abandoned because it exceeded its timeout.
    fn record_timeout(&self, class: OpClass);

    /// A request fell through to an unsupported default body.
    fn record_unsupported(&self);

    /// Bytes returned to the kernel by a read.
    fn record_bytes_read(&self, bytes: u64);

    /// Bytes accepted from the kernel by a write.
    fn record_bytes_written(&self, bytes: u64);
}

/// Recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStats;

impl StatsRecorder for NoopStats {
    #[inline]
    fn record_start(&self, _class: OpClass) {}

    #[inline]
    fn record_complete(&self, _class: OpClass, _elapsed: Duration) {}

    #[inline]
    fn record_error(&self, _class: OpClass) {}

    #[inline]
    fn record_timeout(&self, _class: OpClass) {}

    #[inline]
    fn record_unsupported(&self) {}

    #[inline]
    fn record_bytes_read(&self, _bytes: u64) {}

    #[inline]
    fn record_bytes_written(&self, _bytes: u64) {}
}
