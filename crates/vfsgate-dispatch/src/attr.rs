//! Attribute records and their kernel reply layouts.
//!
//! [`AttributeRecord`] pairs a raw POSIX `stat` with the number of seconds the
//! kernel may cache it. [`AttributeRecord::as_fuse_attr`] turns it into the
//! `fuse_attr_out` reply. The conversion is the only place the `stat` layout
//! leaks into the protocol, so every platform difference is handled here:
//!
//! - The reply starts zero-filled. macOS adds fields (notably `flags`) that
//!   affect file accessibility; they must never carry garbage.
//! - Timestamps go through [`crate::stat_times`] to keep nanoseconds.
//! - Signed seconds are stored in the kernel's `u64` slots by two's-complement
//!   reinterpretation; the kernel reads them back as signed.
//! - Fields narrower in the protocol than in `stat` saturate rather than wrap.

use std::fmt;
use std::fs::Metadata;
use std::time::Duration;

use crate::stat_times::{stat_atime, stat_ctime, stat_from_metadata, stat_mtime};
use crate::types::InodeNumber;

/// Kernel `fuse_attr`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuseAttr {
    pub ino: u64,
    pub size: u64,
    pub blocks: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    #[cfg(target_os = "macos")]
    pub crtime: u64,
    pub atimensec: u32,
    pub mtimensec: u32,
    pub ctimensec: u32,
    #[cfg(target_os = "macos")]
    pub crtimensec: u32,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    #[cfg(target_os = "macos")]
    pub flags: u32,
    pub blksize: u32,
    pub padding: u32,
}

impl FuseAttr {
    /// Access time as the kernel will interpret it.
    pub fn atime_spec(&self) -> libc::timespec {
        to_timespec(self.atime, self.atimensec)
    }

    /// Modification time as the kernel will interpret it.
    pub fn mtime_spec(&self) -> libc::timespec {
        to_timespec(self.mtime, self.mtimensec)
    }

    /// Status change time as the kernel will interpret it.
    pub fn ctime_spec(&self) -> libc::timespec {
        to_timespec(self.ctime, self.ctimensec)
    }

    /// The file type bits of `mode`.
    pub fn file_type(&self) -> u32 {
        self.mode & u32::from(libc::S_IFMT)
    }
}

/// Kernel `fuse_attr_out`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuseAttrOut {
    pub attr_valid: u64,
    pub attr_valid_nsec: u32,
    pub dummy: u32,
    pub attr: FuseAttr,
}

/// POSIX metadata plus the client-side cache-validity window.
///
/// Immutable once built; converted, never mutated, into a reply.
#[derive(Clone, Copy)]
pub struct AttributeRecord {
    st: libc::stat,
    timeout_seconds: u64,
}

impl AttributeRecord {
    /// Wraps a raw `stat` with a cache timeout in whole seconds.
    pub fn new(st: libc::stat, timeout_seconds: u64) -> Self {
        Self { st, timeout_seconds }
    }

    /// Wraps a raw `stat` with a cache timeout. Sub-second precision of the
    /// timeout is dropped; the kernel reply carries whole seconds.
    pub fn with_timeout(st: libc::stat, timeout: Duration) -> Self {
        Self::new(st, timeout.as_secs())
    }

    /// Builds a record from std metadata, e.g. for a passthrough filesystem.
    pub fn from_metadata(meta: &Metadata, timeout: Duration) -> Self {
        Self::with_timeout(stat_from_metadata(meta), timeout)
    }

    /// The raw metadata.
    pub fn stat(&self) -> &libc::stat {
        &self.st
    }

    /// Seconds the kernel may cache this record.
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// The inode this record describes.
    #[allow(clippy::useless_conversion)]
    pub fn ino(&self) -> InodeNumber {
        InodeNumber::new(u64::from(self.st.st_ino))
    }

    /// Whether this record describes a directory.
    pub fn is_dir(&self) -> bool {
        to_u32(self.st.st_mode) & u32::from(libc::S_IFMT) == u32::from(libc::S_IFDIR)
    }

    /// Builds the kernel attribute reply.
    pub fn as_fuse_attr(&self) -> FuseAttrOut {
        let st = &self.st;
        let mut result = FuseAttrOut::default();

        result.attr.ino = to_u64(st.st_ino);
        result.attr.size = to_u64(st.st_size);
        result.attr.blocks = to_u64(st.st_blocks);

        let atime = stat_atime(st);
        let mtime = stat_mtime(st);
        let ctime = stat_ctime(st);
        result.attr.atime = secs_to_wire(atime.tv_sec.into());
        result.attr.atimensec = nsec_to_wire(atime.tv_nsec.into());
        result.attr.mtime = secs_to_wire(mtime.tv_sec.into());
        result.attr.mtimensec = nsec_to_wire(mtime.tv_nsec.into());
        result.attr.ctime = secs_to_wire(ctime.tv_sec.into());
        result.attr.ctimensec = nsec_to_wire(ctime.tv_nsec.into());

        result.attr.mode = to_u32(st.st_mode);
        result.attr.nlink = to_u32(st.st_nlink);
        result.attr.uid = st.st_uid;
        result.attr.gid = st.st_gid;
        result.attr.rdev = to_u32(st.st_rdev);
        result.attr.blksize = to_u32(st.st_blksize);

        #[cfg(target_os = "macos")]
        {
            result.attr.crtime = secs_to_wire(st.st_birthtime.into());
            result.attr.crtimensec = nsec_to_wire(st.st_birthtime_nsec.into());
            result.attr.flags = st.st_flags;
        }

        result.attr_valid = self.timeout_seconds;
        result.attr_valid_nsec = 0;

        result
    }
}

impl From<&AttributeRecord> for FuseAttrOut {
    fn from(record: &AttributeRecord) -> Self {
        record.as_fuse_attr()
    }
}

impl fmt::Debug for AttributeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeRecord")
            .field("ino", &self.st.st_ino)
            .field("size", &self.st.st_size)
            .field("mode", &format_args!("{:o}", self.st.st_mode))
            .field("nlink", &self.st.st_nlink)
            .field("uid", &self.st.st_uid)
            .field("gid", &self.st.st_gid)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish_non_exhaustive()
    }
}

/// Kernel `fuse_entry_out`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOut {
    pub nodeid: u64,
    pub generation: u64,
    pub entry_valid: u64,
    pub attr_valid: u64,
    pub entry_valid_nsec: u32,
    pub attr_valid_nsec: u32,
    pub attr: FuseAttr,
}

impl EntryOut {
    /// Builds an entry reply for a found child.
    ///
    /// The attribute validity comes from the record; the name-to-inode
    /// binding is cached for `entry_timeout`.
    pub fn new(record: &AttributeRecord, generation: u64, entry_timeout: Duration) -> Self {
        let attr_out = record.as_fuse_attr();
        Self {
            nodeid: attr_out.attr.ino,
            generation,
            entry_valid: entry_timeout.as_secs(),
            attr_valid: attr_out.attr_valid,
            entry_valid_nsec: entry_timeout.subsec_nanos(),
            attr_valid_nsec: attr_out.attr_valid_nsec,
            attr: attr_out.attr,
        }
    }

    /// A negative entry: node id 0 tells the kernel to cache the absence of
    /// the name for `entry_timeout` instead of receiving ENOENT.
    pub fn negative(entry_timeout: Duration) -> Self {
        Self {
            entry_valid: entry_timeout.as_secs(),
            entry_valid_nsec: entry_timeout.subsec_nanos(),
            ..Self::default()
        }
    }

    /// The inode this entry resolves to.
    pub fn ino(&self) -> InodeNumber {
        InodeNumber::new(self.nodeid)
    }

    /// Whether this is a negative entry.
    pub fn is_negative(&self) -> bool {
        self.nodeid == 0
    }
}

/// `valid` bit: `mode` is set.
pub const FATTR_MODE: u32 = 1 << 0;
/// `valid` bit: `uid` is set.
pub const FATTR_UID: u32 = 1 << 1;
/// `valid` bit: `gid` is set.
pub const FATTR_GID: u32 = 1 << 2;
/// `valid` bit: `size` is set.
pub const FATTR_SIZE: u32 = 1 << 3;
/// `valid` bit: `atime` is set.
pub const FATTR_ATIME: u32 = 1 << 4;
/// `valid` bit: `mtime` is set.
pub const FATTR_MTIME: u32 = 1 << 5;
/// `valid` bit: `fh` is set.
pub const FATTR_FH: u32 = 1 << 6;
/// `valid` bit: set `atime` to the current time.
pub const FATTR_ATIME_NOW: u32 = 1 << 7;
/// `valid` bit: set `mtime` to the current time.
pub const FATTR_MTIME_NOW: u32 = 1 << 8;
/// `valid` bit: `lock_owner` is set.
pub const FATTR_LOCKOWNER: u32 = 1 << 9;
/// `valid` bit: `ctime` is set.
pub const FATTR_CTIME: u32 = 1 << 10;

/// A timestamp update requested by setattr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTime {
    /// Use the filesystem's current time.
    Now,
    /// Use this exact time (seconds, nanoseconds).
    At(i64, u32),
}

/// Kernel `fuse_setattr_in`.
///
/// Only fields whose bit is set in `valid` carry meaning; the accessors
/// return `None` for the rest.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetAttrIn {
    pub valid: u32,
    pub padding: u32,
    pub fh: u64,
    pub size: u64,
    pub lock_owner: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    pub atimensec: u32,
    pub mtimensec: u32,
    pub ctimensec: u32,
    pub mode: u32,
    pub unused4: u32,
    pub uid: u32,
    pub gid: u32,
    pub unused5: u32,
}

impl SetAttrIn {
    fn has(&self, bit: u32) -> bool {
        self.valid & bit != 0
    }

    pub fn mode(&self) -> Option<u32> {
        self.has(FATTR_MODE).then_some(self.mode)
    }

    pub fn uid(&self) -> Option<u32> {
        self.has(FATTR_UID).then_some(self.uid)
    }

    pub fn gid(&self) -> Option<u32> {
        self.has(FATTR_GID).then_some(self.gid)
    }

    pub fn size(&self) -> Option<u64> {
        self.has(FATTR_SIZE).then_some(self.size)
    }

    pub fn fh(&self) -> Option<u64> {
        self.has(FATTR_FH).then_some(self.fh)
    }

    pub fn lock_owner(&self) -> Option<u64> {
        self.has(FATTR_LOCKOWNER).then_some(self.lock_owner)
    }

    /// Requested access time. `ATIME_NOW` wins over an explicit value.
    pub fn atime(&self) -> Option<SetTime> {
        Self::time(
            self.has(FATTR_ATIME_NOW),
            self.has(FATTR_ATIME),
            self.atime,
            self.atimensec,
        )
    }

    /// Requested modification time. `MTIME_NOW` wins over an explicit value.
    pub fn mtime(&self) -> Option<SetTime> {
        Self::time(
            self.has(FATTR_MTIME_NOW),
            self.has(FATTR_MTIME),
            self.mtime,
            self.mtimensec,
        )
    }

    pub fn ctime(&self) -> Option<SetTime> {
        Self::time(false, self.has(FATTR_CTIME), self.ctime, self.ctimensec)
    }

    fn time(now: bool, set: bool, secs: u64, nsec: u32) -> Option<SetTime> {
        if now {
            Some(SetTime::Now)
        } else if set {
            Some(SetTime::At(secs_from_wire(secs), nsec))
        } else {
            None
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.valid |= FATTR_SIZE;
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.valid |= FATTR_MODE;
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.valid |= FATTR_UID | FATTR_GID;
        self.uid = uid;
        self.gid = gid;
        self
    }

    #[must_use]
    pub fn with_mtime(mut self, time: SetTime) -> Self {
        match time {
            SetTime::Now => self.valid |= FATTR_MTIME_NOW,
            SetTime::At(secs, nsec) => {
                self.valid |= FATTR_MTIME;
                self.mtime = secs_to_wire(secs);
                self.mtimensec = nsec;
            }
        }
        self
    }
}

// Two's-complement reinterpretation; the kernel stores these as signed.
#[allow(clippy::cast_sign_loss)]
fn secs_to_wire(secs: i64) -> u64 {
    secs as u64
}

#[allow(clippy::cast_possible_wrap)]
fn secs_from_wire(secs: u64) -> i64 {
    secs as i64
}

fn nsec_to_wire(nsec: i64) -> u32 {
    u32::try_from(nsec.clamp(0, 999_999_999)).unwrap_or(0)
}

fn to_timespec(secs: u64, nsec: u32) -> libc::timespec {
    libc::timespec {
        tv_sec: secs_from_wire(secs) as _,
        tv_nsec: nsec as _,
    }
}

/// Narrows into a protocol `u32` slot, saturating at either end.
fn to_u32<T>(v: T) -> u32
where
    T: TryInto<u32> + PartialOrd + Default + Copy,
{
    v.try_into()
        .unwrap_or_else(|_| if v < T::default() { 0 } else { u32::MAX })
}

/// Widens into a protocol `u64` slot; negative values clamp to zero.
fn to_u64<T>(v: T) -> u64
where
    T: TryInto<u64> + PartialOrd + Default + Copy,
{
    v.try_into()
        .unwrap_or_else(|_| if v < T::default() { 0 } else { u64::MAX })
}
