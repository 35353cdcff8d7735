use serde::{Deserialize, Serialize};

/// Coarse grouping of filesystem operations for accounting.
///
/// Counters are kept per class rather than per operation so a recorder stays
/// a fixed-size array of atomics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpClass {
    /// lookup, getattr, setattr, readlink, readdir, statfs, access, bmap, forget.
    Metadata,
    /// mknod, mkdir, unlink, rmdir, symlink, rename, link, create.
    Namespace,
    /// open, release, opendir, releasedir.
    Handle,
    /// read.
    Read,
    /// write, fallocate.
    Write,
    /// flush, fsync, fsyncdir.
    Sync,
    /// setxattr, getxattr, listxattr, removexattr.
    Xattr,
}

impl OpClass {
    /// Number of classes.
    pub const COUNT: usize = 7;

    /// Every class, in counter-array order.
    pub const ALL: [OpClass; Self::COUNT] = [
        OpClass::Metadata,
        OpClass::Namespace,
        OpClass::Handle,
        OpClass::Read,
        OpClass::Write,
        OpClass::Sync,
        OpClass::Xattr,
    ];

    /// Position of this class in [`OpClass::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            OpClass::Metadata => 0,
            OpClass::Namespace => 1,
            OpClass::Handle => 2,
            OpClass::Read => 3,
            OpClass::Write => 4,
            OpClass::Sync => 5,
            OpClass::Xattr => 6,
        }
    }

    /// Short lowercase label used in logs.
    pub const fn label(self) -> &'static str {
        match self {
            OpClass::Metadata => "metadata",
            OpClass::Namespace => "namespace",
            OpClass::Handle => "handle",
            OpClass::Read => "read",
            OpClass::Write => "write",
            OpClass::Sync => "sync",
            OpClass::Xattr => "xattr",
        }
    }
}

impl std::fmt::Display for OpClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
