//! Kernel-facing dispatch contract for user-space filesystems.
//!
//! This crate sits between a FUSE request channel and a filesystem's inode
//! implementation. Each kernel request maps to one async method on the
//! [`Dispatcher`] trait; a filesystem overrides the operations it supports
//! and inherits well-defined defaults for everything else.
//!
//! # Features
//!
//! - One overridable async entry point per FUSE operation
//! - Default policy that keeps negative caching working: `lookup`/`getattr`
//!   answer ENOENT, `getxattr` answers the platform's missing-attribute code,
//!   `listxattr` answers an empty set, everything else answers ENOSYS
//! - Lossless `stat` to `fuse_attr_out` conversion with nanosecond timestamps
//! - Write-once negotiated connection state with sensible `statfs` defaults
//! - A tokio bridge that runs each request as a task with timeout and stats
//!
//! # Usage
//!
//! ```ignore
//! use vfsgate_dispatch::{Dispatcher, DispatcherState, InodeNumber};
//!
//! struct MyFs { state: DispatcherState }
//!
//! #[async_trait::async_trait]
//! impl Dispatcher for MyFs {
//!     fn state(&self) -> &DispatcherState { &self.state }
//!     // override lookup, getattr, read, ... as needed
//! }
//! ```

pub mod attr;
pub mod bridge;
pub mod config;
pub mod conn;
pub mod context;
pub mod dirlist;
pub mod dispatcher;
pub mod error;
pub mod op;
pub mod stat_times;
pub mod types;

pub use attr::{AttributeRecord, EntryOut, FuseAttr, FuseAttrOut, SetAttrIn, SetTime};
pub use bridge::{BridgeError, execute, spawn};
pub use config::DispatchConfig;
pub use conn::{ConnectionCell, ConnectionInfo, StatFs};
pub use context::{FetchCause, FetchContext};
pub use dirlist::{DirEntry, DirList};
pub use dispatcher::{Dispatcher, DispatcherState};
pub use error::{DispatchError, DispatchResult, ENOATTR, ToErrno};
pub use op::OpKind;
pub use types::{InodeNumber, PathComponent};

pub use vfsgate_stats::{DispatchStats, NoopStats, OpClass, StatsRecorder};
