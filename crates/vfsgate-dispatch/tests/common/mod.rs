//! Shared helpers for dispatch integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use vfsgate_dispatch::dirlist::file_type_from_mode;
use vfsgate_dispatch::stat_times::zeroed_stat;
use vfsgate_dispatch::{
    AttributeRecord, DirList, DispatchError, DispatchResult, Dispatcher, DispatcherState, EntryOut,
    FetchContext, InodeNumber, PathComponent, StatsRecorder,
};

/// Install a test subscriber; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Dispatcher that overrides nothing.
#[derive(Debug, Default)]
pub struct Unimplemented {
    pub state: DispatcherState,
}

impl Unimplemented {
    pub fn with_stats(stats: Arc<dyn StatsRecorder>) -> Self {
        Self {
            state: DispatcherState::with_stats(stats),
        }
    }
}

impl Dispatcher for Unimplemented {
    fn state(&self) -> &DispatcherState {
        &self.state
    }
}

pub fn name(s: &str) -> PathComponent<'_> {
    PathComponent::new(OsStr::new(s)).unwrap()
}

#[derive(Debug, Clone)]
struct Node {
    mode: u32,
    data: Vec<u8>,
    children: BTreeMap<OsString, InodeNumber>,
    xattrs: BTreeMap<OsString, Vec<u8>>,
}

/// Flat in-memory filesystem that implements a read/write subset:
/// lookup, getattr, mkdir, create, read, write, readdir, open, release,
/// getxattr and setxattr. Everything else keeps the default answer.
#[derive(Debug)]
pub struct MemFs {
    state: DispatcherState,
    nodes: RwLock<BTreeMap<InodeNumber, Node>>,
    next_ino: AtomicU64,
    next_fh: AtomicU64,
}

impl MemFs {
    pub fn new(state: DispatcherState) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            InodeNumber::ROOT,
            Node {
                mode: libc::S_IFDIR as u32 | 0o755,
                data: Vec::new(),
                children: BTreeMap::new(),
                xattrs: BTreeMap::new(),
            },
        );
        Self {
            state,
            nodes: RwLock::new(nodes),
            next_ino: AtomicU64::new(2),
            next_fh: AtomicU64::new(1),
        }
    }

    fn record(&self, ino: InodeNumber, node: &Node) -> AttributeRecord {
        let mut st = zeroed_stat();
        st.st_ino = ino.get();
        st.st_mode = node.mode as _;
        st.st_nlink = 1;
        st.st_size = node.data.len() as _;
        st.st_blksize = 4096;
        self.state.attr_record(st)
    }

    fn insert(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        mode: u32,
    ) -> DispatchResult<EntryOut> {
        let mut nodes = self.nodes.write();
        let dir = nodes.get(&parent).ok_or(DispatchError::EntityNotFound)?;
        if dir.children.contains_key(name.as_os_str()) {
            return Err(DispatchError::Errno(libc::EEXIST));
        }

        let ino = InodeNumber::new(self.next_ino.fetch_add(1, Ordering::Relaxed));
        let node = Node {
            mode,
            data: Vec::new(),
            children: BTreeMap::new(),
            xattrs: BTreeMap::new(),
        };
        let entry = self.state.entry(&self.record(ino, &node), 0);
        nodes.insert(ino, node);
        nodes
            .get_mut(&parent)
            .ok_or(DispatchError::EntityNotFound)?
            .children
            .insert(name.as_os_str().to_os_string(), ino);
        Ok(entry)
    }
}

#[async_trait]
impl Dispatcher for MemFs {
    fn state(&self) -> &DispatcherState {
        &self.state
    }

    async fn lookup(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        _ctx: &FetchContext,
    ) -> DispatchResult<EntryOut> {
        let nodes = self.nodes.read();
        let dir = nodes.get(&parent).ok_or(DispatchError::EntityNotFound)?;
        let ino = *dir
            .children
            .get(name.as_os_str())
            .ok_or(DispatchError::EntityNotFound)?;
        let node = nodes.get(&ino).ok_or(DispatchError::EntityNotFound)?;
        Ok(self.state.entry(&self.record(ino, node), 0))
    }

    async fn getattr(
        &self,
        ino: InodeNumber,
        _ctx: &FetchContext,
    ) -> DispatchResult<AttributeRecord> {
        let nodes = self.nodes.read();
        let node = nodes.get(&ino).ok_or(DispatchError::EntityNotFound)?;
        Ok(self.record(ino, node))
    }

    async fn mkdir(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        mode: u32,
    ) -> DispatchResult<EntryOut> {
        self.insert(parent, name, libc::S_IFDIR as u32 | (mode & 0o7777))
    }

    async fn create(
        &self,
        parent: InodeNumber,
        name: PathComponent<'_>,
        mode: u32,
        _flags: i32,
    ) -> DispatchResult<EntryOut> {
        self.insert(parent, name, libc::S_IFREG as u32 | (mode & 0o7777))
    }

    async fn open(&self, ino: InodeNumber, _flags: i32) -> DispatchResult<u64> {
        if !self.nodes.read().contains_key(&ino) {
            return Err(DispatchError::EntityNotFound);
        }
        Ok(self.next_fh.fetch_add(1, Ordering::Relaxed))
    }

    async fn release(&self, _ino: InodeNumber, _fh: u64) -> DispatchResult<()> {
        Ok(())
    }

    async fn read(
        &self,
        ino: InodeNumber,
        size: u32,
        offset: u64,
        _ctx: &FetchContext,
    ) -> DispatchResult<Bytes> {
        let nodes = self.nodes.read();
        let node = nodes.get(&ino).ok_or(DispatchError::EntityNotFound)?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(node.data.len());
        let end = start.saturating_add(size as usize).min(node.data.len());
        let chunk = Bytes::copy_from_slice(&node.data[start..end]);
        self.stats().record_bytes_read(chunk.len() as u64);
        Ok(chunk)
    }

    async fn write(&self, ino: InodeNumber, data: &[u8], offset: u64) -> DispatchResult<usize> {
        let mut nodes = self.nodes.write();
        let node = nodes.get_mut(&ino).ok_or(DispatchError::EntityNotFound)?;
        let start = usize::try_from(offset).map_err(|_| DispatchError::Errno(libc::EFBIG))?;
        let end = start + data.len();
        if node.data.len() < end {
            node.data.resize(end, 0);
        }
        node.data[start..end].copy_from_slice(data);
        self.stats().record_bytes_written(data.len() as u64);
        Ok(data.len())
    }

    async fn readdir(
        &self,
        ino: InodeNumber,
        mut list: DirList,
        offset: u64,
        _fh: u64,
        _ctx: &FetchContext,
    ) -> DispatchResult<DirList> {
        let nodes = self.nodes.read();
        let dir = nodes.get(&ino).ok_or(DispatchError::EntityNotFound)?;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        for (index, (child_name, child)) in dir.children.iter().enumerate().skip(skip) {
            let mode = nodes.get(child).map_or(0, |n| n.mode);
            if !list.add(child_name, *child, file_type_from_mode(mode), index as u64 + 1) {
                break;
            }
        }
        Ok(list)
    }

    async fn setxattr(
        &self,
        ino: InodeNumber,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
    ) -> DispatchResult<()> {
        let mut nodes = self.nodes.write();
        let node = nodes.get_mut(&ino).ok_or(DispatchError::EntityNotFound)?;
        node.xattrs.insert(name.to_os_string(), value.to_vec());
        Ok(())
    }

    async fn getxattr(&self, ino: InodeNumber, name: &OsStr) -> DispatchResult<Vec<u8>> {
        let nodes = self.nodes.read();
        let node = nodes.get(&ino).ok_or(DispatchError::EntityNotFound)?;
        node.xattrs
            .get(name)
            .cloned()
            .ok_or(DispatchError::MissingAttribute)
    }
}
