//! The operation contract and its default policy.
//!
//! [`Dispatcher`] has one provided async method per kernel operation. A
//! filesystem overrides what it supports; every other call gets the default
//! answer:
//!
//! | Operation | Default |
//! |---|---|
//! | `lookup`, `getattr` | [`DispatchError::EntityNotFound`] |
//! | `getxattr` | [`DispatchError::MissingAttribute`] |
//! | `listxattr` | empty list |
//! | `statfs` | [`StatFs::defaults_for`] the negotiated connection |
//! | `forget` | no-op |
//! | everything else | [`DispatchError::NotSupported`] |
//!
//! `lookup`, `getattr` and `getxattr` sit on the path the kernel uses for
//! negative caching, so they answer "does not exist" rather than
//! "unsupported". `access` is only sent when the mount does not use
//! `default_permissions`.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};
use vfsgate_stats::{NoopStats, StatsRecorder};

use crate::attr::{AttributeRecord, EntryOut, SetAttrIn};
use crate::config::DispatchConfig;
use crate::conn::{ConnectionCell, ConnectionInfo, StatFs};
use crate::context::FetchContext;
use crate::dirlist::DirList;
use crate::error::{DispatchError, DispatchResult};
use crate::op::OpKind;
use crate::types::{InodeNumber, PathComponent};

/// State every dispatcher carries: the negotiated connection, the stats
/// sink owned by the surrounding process, and the mount configuration.
pub struct DispatcherState {
    conn: ConnectionCell,
    stats: Arc<dyn StatsRecorder>,
    config: DispatchConfig,
}

impl DispatcherState {
    pub fn new(stats: Arc<dyn StatsRecorder>, config: DispatchConfig) -> Self {
        Self {
            conn: ConnectionCell::new(),
            stats,
            config,
        }
    }

    /// State with the default configuration.
    pub fn with_stats(stats: Arc<dyn StatsRecorder>) -> Self {
        Self::new(stats, DispatchConfig::default())
    }

    pub fn conn(&self) -> &ConnectionCell {
        &self.conn
    }

    pub fn stats(&self) -> &Arc<dyn StatsRecorder> {
        &self.stats
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Wraps `st` with the configured attribute timeout.
    pub fn attr_record(&self, st: libc::stat) -> AttributeRecord {
        AttributeRecord::with_timeout(st, self.config.attr_timeout)
    }

    /// Entry reply for `record` with the configured entry timeout.
    pub fn entry(&self, record: &AttributeRecord, generation: u64) -> EntryOut {
        EntryOut::new(record, generation, self.config.entry_timeout)
    }
}

impl Default for DispatcherState {
    fn default() -> Self {
        Self::with_stats(Arc::new(NoopStats))
    }
}

impl fmt::Debug for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherState")
            .field("conn", &self.conn)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Default body for operations that are not implemented.
fn not_supported<T>(
    stats: &dyn StatsRecorder,
    op: OpKind,
    ino: InodeNumber,
) -> DispatchResult<T> {
    debug!(op = %op, ino = %ino, "Operation not implemented");
    stats.record_unsupported();
    Err(DispatchError::NotSupported(op))
}

/// Kernel-facing filesystem contract.
///
/// Operations may run concurrently, on the same inode too; no ordering is
/// imposed between them. Implementations must not block the calling thread.
#[async_trait]
#[allow(unused_variables)]
pub trait Dispatcher: Send + Sync {
    /// Shared dispatcher state.
    fn state(&self) -> &DispatcherState;

    /// The negotiated connection parameters, zero before the handshake.
    fn conn_info(&self) -> ConnectionInfo {
        self.state().conn().get()
    }

    /// The stats sink for this mount.
    fn stats(&self) -> &dyn StatsRecorder {
        self.state().stats().as_ref()
    }

    /// Stores the parameters negotiated by the mount handshake.
    ///
    /// Only the first call takes effect; later calls fail with
    /// [`DispatchError::ConnectionAlreadyInitialized`].
    fn init_connection(&self, info: ConnectionInfo) -> DispatchResult<()> {
        match self.state().conn().init(info) {
            Ok(()) => {
                info!(
                    major = info.major,
                    minor = info.minor,
                    max_readahead = info.max_readahead,
                    max_write = info.max_write,
                    "Connection initialized"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    rejected_major = info.major,
                    rejected_minor = info.minor,
                    "Connection already initialized, keeping first parameters"
                );
                Err(e)
            }
        }
    }

    /// Called once when the mount goes away.
    async fn destroy(&self) {
        info!("Dispatcher destroyed");
    }

    async fn lookup(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        ctx: &FetchContext,
    ) -> DispatchResult<EntryOut> {
        debug!(parent = %parent, name = %name, "lookup not implemented");
        Err(DispatchError::EntityNotFound)
    }

    /// Drops `nlookup` kernel references to `ino`.
    ///
    /// Has no reply; safe to call concurrently with anything on `ino`.
    async fn forget(&self, ino: InodeNumber, nlookup: u64) {
        debug!(ino = %ino, nlookup, "forget ignored");
    }

    async fn getattr(
        &self,
        ino: InodeNumber,
        ctx: &FetchContext,
    ) -> DispatchResult<AttributeRecord> {
        debug!(ino = %ino, "getattr not implemented");
        Err(DispatchError::EntityNotFound)
    }

    async fn setattr(&self, ino: InodeNumber, attr: &SetAttrIn) -> DispatchResult<AttributeRecord> {
        not_supported(self.stats(), OpKind::Setattr, ino)
    }

    /// Reads a symlink target. `kernel_caches_readlink` says whether the
    /// kernel will cache the answer.
    async fn readlink(
        &self,
        ino: InodeNumber,
        kernel_caches_readlink: bool,
    ) -> DispatchResult<OsString> {
        not_supported(self.stats(), OpKind::Readlink, ino)
    }

    async fn mknod(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        mode: u32,
        rdev: u32,
    ) -> DispatchResult<EntryOut> {
        not_supported(self.stats(), OpKind::Mknod, parent)
    }

    async fn mkdir(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        mode: u32,
    ) -> DispatchResult<EntryOut> {
        not_supported(self.stats(), OpKind::Mkdir, parent)
    }

    async fn unlink(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        ctx: &FetchContext,
    ) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Unlink, parent)
    }

    async fn rmdir(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        ctx: &FetchContext,
    ) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Rmdir, parent)
    }

    async fn symlink(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        target: &OsStr,
    ) -> DispatchResult<EntryOut> {
        not_supported(self.stats(), OpKind::Symlink, parent)
    }

    async fn rename(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        new_parent: InodeNumber,
        new_name: PathComponent<'_>,
    ) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Rename, parent)
    }

    async fn link(
        &self,
        ino: InodeNumber,
        new_parent: InodeNumber,
        new_name: PathComponent<'_>,
    ) -> DispatchResult<EntryOut> {
        not_supported(self.stats(), OpKind::Link, ino)
    }

    /// Opens a file and returns a handle the kernel passes back.
    async fn open(&self, ino: InodeNumber, flags: i32) -> DispatchResult<u64> {
        not_supported(self.stats(), OpKind::Open, ino)
    }

    /// Releases an open file. Implementations should not fail this.
    async fn release(&self, ino: InodeNumber, fh: u64) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Release, ino)
    }

    async fn opendir(&self, ino: InodeNumber, flags: i32) -> DispatchResult<u64> {
        not_supported(self.stats(), OpKind::Opendir, ino)
    }

    /// Releases an open directory. Implementations should not fail this.
    async fn releasedir(&self, ino: InodeNumber, fh: u64) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Releasedir, ino)
    }

    /// Reads up to `size` bytes at `offset`. A short read means end of file.
    async fn read(
        &self,
        ino: InodeNumber,
        size: u32,
        offset: u64,
        ctx: &FetchContext,
    ) -> DispatchResult<Bytes> {
        not_supported(self.stats(), OpKind::Read, ino)
    }

    /// Writes `data` at `offset` and returns the number of bytes accepted.
    async fn write(&self, ino: InodeNumber, data: &[u8], offset: u64) -> DispatchResult<usize> {
        not_supported(self.stats(), OpKind::Write, ino)
    }

    /// Called on every close of a file descriptor.
    async fn flush(&self, ino: InodeNumber, lock_owner: u64) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Flush, ino)
    }

    async fn fallocate(&self, ino: InodeNumber, offset: u64, length: u64) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Fallocate, ino)
    }

    /// Flushes file data, and metadata too unless `datasync`.
    async fn fsync(&self, ino: InodeNumber, datasync: bool) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Fsync, ino)
    }

    async fn fsyncdir(&self, ino: InodeNumber, datasync: bool) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Fsyncdir, ino)
    }

    /// Fills `list` with entries after `offset` and hands it back.
    async fn readdir(
        &self,
        ino: InodeNumber,
        list: DirList,
        offset: u64,
        fh: u64,
        ctx: &FetchContext,
    ) -> DispatchResult<DirList> {
        not_supported(self.stats(), OpKind::Readdir, ino)
    }

    async fn statfs(&self, ino: InodeNumber) -> DispatchResult<StatFs> {
        debug!(ino = %ino, "statfs answered from connection defaults");
        Ok(StatFs::defaults_for(&self.conn_info()))
    }

    async fn setxattr(
        &self,
        ino: InodeNumber,
        name: &OsStr,
        value: &[u8],
        flags: i32,
    ) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Setxattr, ino)
    }

    async fn getxattr(&self, ino: InodeNumber, name: &OsStr) -> DispatchResult<Vec<u8>> {
        debug!(ino = %ino, name = ?name, "getxattr not implemented");
        Err(DispatchError::MissingAttribute)
    }

    async fn listxattr(&self, ino: InodeNumber) -> DispatchResult<Vec<OsString>> {
        debug!(ino = %ino, "listxattr not implemented, reporting no names");
        Ok(Vec::new())
    }

    async fn removexattr(&self, ino: InodeNumber, name: &OsStr) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Removexattr, ino)
    }

    /// Permission check; only sent without `default_permissions`.
    async fn access(&self, ino: InodeNumber, mask: i32) -> DispatchResult<()> {
        not_supported(self.stats(), OpKind::Access, ino)
    }

    async fn create(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        mode: u32,
        flags: i32,
    ) -> DispatchResult<EntryOut> {
        not_supported(self.stats(), OpKind::Create, parent)
    }

    /// Maps block `idx` of the file to a device block.
    async fn bmap(&self, ino: InodeNumber, blocksize: u32, idx: u64) -> DispatchResult<u64> {
        not_supported(self.stats(), OpKind::Bmap, ino)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfsgate_stats::DispatchStats;

    struct Bare {
        state: DispatcherState,
    }

    impl Dispatcher for Bare {
        fn state(&self) -> &DispatcherState {
            &self.state
        }
    }

    #[tokio::test]
    async fn test_unsupported_is_counted() {
        let stats = Arc::new(DispatchStats::new());
        let fs = Bare {
            state: DispatcherState::with_stats(stats.clone()),
        };

        let err = fs.open(InodeNumber::new(2), libc::O_RDONLY).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotSupported(OpKind::Open)));
        assert_eq!(stats.unsupported_count(), 1);

        // Absence answers are not "unsupported".
        let _ = fs.getattr(InodeNumber::ROOT, &FetchContext::default()).await;
        assert_eq!(stats.unsupported_count(), 1);
    }

    #[tokio::test]
    async fn test_statfs_reads_connection() {
        let fs = Bare {
            state: DispatcherState::default(),
        };
        fs.init_connection(ConnectionInfo {
            max_readahead: 8192,
            ..ConnectionInfo::default()
        })
        .unwrap();

        let st = fs.statfs(InodeNumber::ROOT).await.unwrap();
        assert_eq!(st.bsize, 8192);
    }

    #[test]
    fn test_state_builds_replies_with_config_timeouts() {
        let state = DispatcherState::new(
            Arc::new(NoopStats),
            DispatchConfig::default()
                .attr_timeout(std::time::Duration::from_secs(30))
                .entry_timeout(std::time::Duration::from_secs(5)),
        );
        let mut st = crate::stat_times::zeroed_stat();
        st.st_ino = 9;

        let record = state.attr_record(st);
        assert_eq!(record.timeout_seconds(), 30);

        let entry = state.entry(&record, 1);
        assert_eq!(entry.nodeid, 9);
        assert_eq!(entry.entry_valid, 5);
        assert_eq!(entry.attr_valid, 30);
    }

    #[test]
    fn test_state_debug() {
        let dbg = format!("{:?}", DispatcherState::default());
        assert!(dbg.contains("DispatcherState"));
        assert!(dbg.contains("config"));
    }
}
