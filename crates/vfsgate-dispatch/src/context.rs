//! Per-request tracking token for I/O-bearing operations.

use std::fmt;

/// Why data is being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchCause {
    /// Cause not known.
    #[default]
    Unknown,
    /// A kernel request on the mount.
    Kernel,
    /// Speculative fetch issued by the filesystem itself.
    Prefetch,
    /// Maintenance work such as a checkout or a background scan.
    Internal,
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchCause::Unknown => "unknown",
            FetchCause::Kernel => "kernel",
            FetchCause::Prefetch => "prefetch",
            FetchCause::Internal => "internal",
        })
    }
}

/// Who asked for an operation, and why.
///
/// Handed to handlers by reference and scoped to one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchContext {
    /// Kernel request id (`unique`), 0 for requests not from the kernel.
    pub request_id: u64,
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
    pub cause: FetchCause,
}

impl FetchContext {
    /// Context for a kernel request.
    pub fn kernel(request_id: u64, uid: u32, gid: u32, pid: u32) -> Self {
        Self {
            request_id,
            uid,
            gid,
            pid,
            cause: FetchCause::Kernel,
        }
    }

    /// Context for work the filesystem starts on its own.
    pub fn internal(cause: FetchCause) -> Self {
        Self {
            cause,
            ..Self::default()
        }
    }

    /// Whether the request came through the mount.
    pub fn is_kernel(&self) -> bool {
        self.cause == FetchCause::Kernel
    }
}

impl fmt::Display for FetchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "req={} uid={} gid={} pid={} cause={}",
            self.request_id, self.uid, self.gid, self.pid, self.cause
        )
    }
}
