//! Lock-free request statistics.
//!
//! [`DispatchStats`] keeps one [`ClassCounters`] per [`OpClass`] plus global
//! byte and in-flight counters. All counters are `AtomicU64` with relaxed
//! ordering: they are eventually consistent and never block the request path.
//!
//! # Usage
//!
//! ```
//! use vfsgate_stats::{DispatchStats, OpClass, StatsRecorder};
//! use std::time::Duration;
//!
//! let stats = DispatchStats::new();
//! stats.record_start(OpClass::Metadata);
//! stats.record_error(OpClass::Metadata);
//!
//! assert_eq!(stats.error_count(), 1);
//! assert_eq!(stats.in_flight(), 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{OpClass, StatsRecorder};

/// Statistics for operation latency.
///
/// Tracks total nanoseconds and count for computing average latency.
#[derive(Debug, Default)]
pub struct LatencyStats {
    total_nanos: AtomicU64,
    count: AtomicU64,
}

impl LatencyStats {
    /// Create new latency statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a latency measurement.
    #[inline]
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of operations recorded.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get the average latency in nanoseconds.
    ///
    /// Returns 0.0 if no operations have been recorded.
    pub fn avg_nanos(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.total_nanos.load(Ordering::Relaxed) as f64 / count as f64
    }

    /// Get the average latency in milliseconds.
    pub fn avg_millis(&self) -> f64 {
        self.avg_nanos() / 1_000_000.0
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.total_nanos.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Counters for one [`OpClass`].
#[derive(Debug, Default)]
pub struct ClassCounters {
    started: AtomicU64,
    completed: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    latency: LatencyStats,
}

impl ClassCounters {
    /// Requests submitted.
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Requests that finished successfully.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Requests that finished with an error (timeouts excluded).
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Requests abandoned on timeout.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Latency of successful requests.
    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    fn reset(&self) {
        self.started.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.latency.reset();
    }

    fn snapshot(&self, class: OpClass) -> ClassSnapshot {
        ClassSnapshot {
            class,
            started: self.started(),
            completed: self.completed(),
            errors: self.errors(),
            timeouts: self.timeouts(),
            avg_latency_ms: self.latency.avg_millis(),
        }
    }
}

/// Statistics for a mounted dispatcher.
///
/// Owned by the surrounding process; dispatchers hold it through
/// `Arc<dyn StatsRecorder>` and only write. Readers use the query methods or
/// [`DispatchStats::snapshot`].
///
/// The activity timestamp uses `RwLock` since `Instant` is not atomic, but the
/// lock is only taken for a single store per request.
#[derive(Debug)]
pub struct DispatchStats {
    classes: [ClassCounters; OpClass::COUNT],
    in_flight: AtomicU64,
    unsupported: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    last_activity: RwLock<Instant>,
    session_start: SystemTime,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchStats {
    /// Create new dispatch statistics.
    pub fn new() -> Self {
        Self {
            classes: Default::default(),
            in_flight: AtomicU64::new(0),
            unsupported: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            last_activity: RwLock::new(Instant::now()),
            session_start: SystemTime::now(),
        }
    }

    /// Counters for one class.
    pub fn class(&self, class: OpClass) -> &ClassCounters {
        &self.classes[class.index()]
    }

    /// Requests currently between start and completion.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Requests answered by an unsupported default body.
    pub fn unsupported_count(&self) -> u64 {
        self.unsupported.load(Ordering::Relaxed)
    }

    /// Total requests submitted across all classes.
    pub fn op_count(&self) -> u64 {
        self.classes.iter().map(ClassCounters::started).sum()
    }

    /// Total errors across all classes (timeouts excluded).
    pub fn error_count(&self) -> u64 {
        self.classes.iter().map(ClassCounters::errors).sum()
    }

    /// Total timeouts across all classes.
    pub fn timeout_count(&self) -> u64 {
        self.classes.iter().map(ClassCounters::timeouts).sum()
    }

    /// Total bytes returned by reads.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Total bytes accepted by writes.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Check if a request started within the given duration.
    pub fn is_active(&self, threshold: Duration) -> bool {
        self.last_activity.read().elapsed() < threshold
    }

    /// Duration since the last request started.
    pub fn time_since_activity(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    /// When this statistics instance was created.
    pub fn session_start(&self) -> SystemTime {
        self.session_start
    }

    /// Reset all counters. The in-flight gauge is left alone so requests
    /// already running still balance out.
    pub fn reset(&self) {
        for class in &self.classes {
            class.reset();
        }
        self.unsupported.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
    }

    /// Create a serializable snapshot of current values.
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            classes: OpClass::ALL
                .iter()
                .map(|&class| self.class(class).snapshot(class))
                .collect(),
            in_flight: self.in_flight(),
            unsupported: self.unsupported_count(),
            bytes_read: self.bytes_read(),
            bytes_written: self.bytes_written(),
            session_start: self.session_start,
        }
    }

    #[inline]
    fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    #[inline]
    fn leave(&self) {
        // Saturate so a reset or an unbalanced caller cannot wrap the gauge.
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }
}

impl StatsRecorder for DispatchStats {
    #[inline]
    fn record_start(&self, class: OpClass) {
        self.class(class).started.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    #[inline]
    fn record_complete(&self, class: OpClass, elapsed: Duration) {
        let counters = self.class(class);
        counters.completed.fetch_add(1, Ordering::Relaxed);
        counters.latency.record(elapsed);
        self.leave();
    }

    #[inline]
    fn record_error(&self, class: OpClass) {
        self.class(class).errors.fetch_add(1, Ordering::Relaxed);
        self.leave();
    }

    #[inline]
    fn record_timeout(&self, class: OpClass) {
        self.class(class).timeouts.fetch_add(1, Ordering::Relaxed);
        self.leave();
    }

    #[inline]
    fn record_unsupported(&self) {
        self.unsupported.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    fn record_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// A serializable snapshot of one class's counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSnapshot {
    /// The class these counters belong to.
    pub class: OpClass,
    /// Requests submitted.
    pub started: u64,
    /// Requests that succeeded.
    pub completed: u64,
    /// Requests that failed.
    pub errors: u64,
    /// Requests that timed out.
    pub timeouts: u64,
    /// Average latency of successful requests.
    pub avg_latency_ms: f64,
}

/// A serializable snapshot of [`DispatchStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchStatsSnapshot {
    /// Per-class counters in [`OpClass::ALL`] order.
    pub classes: Vec<ClassSnapshot>,
    /// Requests in flight when the snapshot was taken.
    pub in_flight: u64,
    /// Requests answered by unsupported defaults.
    pub unsupported: u64,
    /// Total bytes read.
    pub bytes_read: u64,
    /// Total bytes written.
    pub bytes_written: u64,
    /// When the statistics session started.
    pub session_start: SystemTime,
}

impl DispatchStatsSnapshot {
    /// Snapshot for one class.
    pub fn class(&self, class: OpClass) -> Option<&ClassSnapshot> {
        self.classes.iter().find(|c| c.class == class)
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let ops: u64 = self.classes.iter().map(|c| c.started).sum();
        let errors: u64 = self.classes.iter().map(|c| c.errors).sum();
        let timeouts: u64 = self.classes.iter().map(|c| c.timeouts).sum();
        format!(
            "ops={ops} errors={errors} timeouts={timeouts} unsupported={} read={} written={}",
            self.unsupported,
            format_bytes(self.bytes_read),
            format_bytes(self.bytes_written),
        )
    }
}

/// Format bytes in human-readable form (B, KB, MB, GB, TB).
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
