//! Dispatch configuration.
//!
//! Cache-validity windows handed to the kernel, and how long the request
//! bridge waits for a handler before failing the request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::op::OpKind;

/// Default attribute cache window (1 second).
pub const DEFAULT_ATTR_TIMEOUT: Duration = Duration::from_secs(1);

/// Default entry cache window (1 second).
pub const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bridge timeout for metadata operations (30 seconds).
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bridge timeout for data operations (5 minutes).
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration shared by every request of a mount.
///
/// Default configuration suits a backend that may be remote. Use
/// [`DispatchConfig::local()`] for a local backend where a slow handler means
/// something is stuck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// How long the kernel may cache attribute replies.
    #[serde(with = "humantime_serde")]
    pub attr_timeout: Duration,

    /// How long the kernel may cache name lookups.
    #[serde(with = "humantime_serde")]
    pub entry_timeout: Duration,

    /// Bridge timeout for everything except data operations.
    ///
    /// Requests that exceed it fail with ETIMEDOUT.
    #[serde(with = "humantime_serde")]
    pub op_timeout: Duration,

    /// Bridge timeout for read, write, fsync and fallocate.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            attr_timeout: DEFAULT_ATTR_TIMEOUT,
            entry_timeout: DEFAULT_ENTRY_TIMEOUT,
            op_timeout: DEFAULT_OP_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl DispatchConfig {
    /// Configuration for a local backend: same cache windows, shorter
    /// bridge timeouts.
    pub fn local() -> Self {
        Self {
            op_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// The bridge timeout for `op`.
    pub fn timeout_for(&self, op: OpKind) -> Duration {
        if op.is_data_path() {
            self.write_timeout
        } else {
            self.op_timeout
        }
    }

    /// Attribute cache window in whole seconds, as the kernel reply carries it.
    pub fn attr_timeout_secs(&self) -> u64 {
        self.attr_timeout.as_secs()
    }

    #[must_use]
    pub fn attr_timeout(mut self, timeout: Duration) -> Self {
        self.attr_timeout = timeout;
        self
    }

    #[must_use]
    pub fn entry_timeout(mut self, timeout: Duration) -> Self {
        self.entry_timeout = timeout;
        self
    }

    #[must_use]
    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}
