//! Request statistics for vfsgate dispatchers.
//!
//! The dispatcher never owns its statistics. The surrounding process creates
//! a recorder, keeps it for as long as it likes, and hands the dispatcher a
//! shared reference that it only ever writes to.
//!
//! # Components
//!
//! - [`StatsRecorder`] - The write-only surface a dispatcher records into
//! - [`DispatchStats`] - Lock-free recorder with per-class counters and latency
//! - [`NoopStats`] - Recorder that discards everything
//! - [`OpClass`] - Coarse grouping of filesystem operations
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vfsgate_stats::{DispatchStats, OpClass, StatsRecorder};
//!
//! let stats = Arc::new(DispatchStats::new());
//! let recorder: Arc<dyn StatsRecorder> = stats.clone();
//!
//! recorder.record_start(OpClass::Read);
//! recorder.record_bytes_read(4096);
//! recorder.record_complete(OpClass::Read, Duration::from_micros(250));
//!
//! assert_eq!(stats.class(OpClass::Read).completed(), 1);
//! assert_eq!(stats.bytes_read(), 4096);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod class;
mod recorder;
pub mod stats;

pub use class::OpClass;
pub use recorder::{NoopStats, StatsRecorder};
pub use stats::{
    ClassCounters, ClassSnapshot, DispatchStats, DispatchStatsSnapshot, LatencyStats, format_bytes,
};
