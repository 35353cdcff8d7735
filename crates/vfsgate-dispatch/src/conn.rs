//! Negotiated connection parameters and the `statfs` defaults derived from
//! them.

use std::sync::OnceLock;

use crate::error::{DispatchError, DispatchResult};

/// Capabilities negotiated with the kernel during the mount handshake.
///
/// Mirrors `fuse_init_out`. The zero value stands for "not negotiated yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub major: u32,
    pub minor: u32,
    pub max_readahead: u32,
    pub flags: u32,
    pub max_background: u16,
    pub congestion_threshold: u16,
    pub max_write: u32,
    pub time_gran: u32,
    pub max_pages: u16,
}

impl ConnectionInfo {
    /// Whether this is the zero value.
    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }
}

/// Write-once holder for [`ConnectionInfo`].
///
/// Set by the handshake before concurrent dispatch starts, then read
/// lock-free by every request.
#[derive(Debug, Default)]
pub struct ConnectionCell {
    inner: OnceLock<ConnectionInfo>,
}

impl ConnectionCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the negotiated parameters.
    ///
    /// Fails with [`DispatchError::ConnectionAlreadyInitialized`] if a value
    /// is already present; the first value is kept.
    pub fn init(&self, info: ConnectionInfo) -> DispatchResult<()> {
        self.inner
            .set(info)
            .map_err(|_| DispatchError::ConnectionAlreadyInitialized)
    }

    /// The negotiated parameters, or the zero value before the handshake.
    pub fn get(&self) -> ConnectionInfo {
        self.inner.get().copied().unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// Filesystem statistics. Mirrors `fuse_kstatfs`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
    pub padding: u32,
    pub spare: [u32; 6],
}

impl StatFs {
    /// Fragment size reported when the filesystem has no better answer.
    pub const DEFAULT_FRSIZE: u32 = 4096;

    /// Longest file name reported when the filesystem has no better answer.
    pub const DEFAULT_NAMELEN: u32 = 255;

    /// Synthesized statistics for a filesystem that reports no usage.
    ///
    /// `pathconf` derives several limits from these fields:
    /// `_PC_REC_MIN_XFER_SIZE` from `bsize`, `_PC_REC_XFER_ALIGN` and
    /// `_PC_ALLOC_SIZE_MIN` from `frsize`, `_PC_NAME_MAX` from `namelen`.
    /// `namelen` must be non-zero or some tools refuse to create files.
    pub fn defaults_for(conn: &ConnectionInfo) -> Self {
        Self {
            bsize: conn.max_readahead,
            frsize: Self::DEFAULT_FRSIZE,
            namelen: Self::DEFAULT_NAMELEN,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_cell_reads_zero() {
        let cell = ConnectionCell::new();
        assert!(!cell.is_initialized());
        assert!(cell.get().is_unset());
    }

    #[test]
    fn test_second_init_keeps_first_value() {
        let cell = ConnectionCell::new();
        let first = ConnectionInfo {
            major: 7,
            minor: 31,
            max_readahead: 131_072,
            ..ConnectionInfo::default()
        };
        cell.init(first).unwrap();

        let second = ConnectionInfo {
            max_readahead: 4096,
            ..first
        };
        let err = cell.init(second).unwrap_err();
        assert!(matches!(err, DispatchError::ConnectionAlreadyInitialized));
        assert_eq!(cell.get(), first);
    }

    #[test]
    fn test_statfs_defaults() {
        let conn = ConnectionInfo {
            max_readahead: 65_536,
            max_write: 1 << 20,
            ..ConnectionInfo::default()
        };
        let st = StatFs::defaults_for(&conn);

        assert_eq!(st.bsize, 65_536);
        assert_eq!(st.frsize, 4096);
        assert_eq!(st.namelen, 255);
        assert_eq!(st.blocks, 0);
        assert_eq!(st.files, 0);
    }

    #[test]
    fn test_statfs_before_handshake_still_has_namelen() {
        let st = StatFs::defaults_for(&ConnectionInfo::default());
        assert_eq!(st.bsize, 0);
        assert_ne!(st.namelen, 0);
    }
}
