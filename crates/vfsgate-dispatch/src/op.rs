//! Names for every operation of the dispatch surface.

use std::fmt;

use vfsgate_stats::OpClass;

/// One operation of the kernel-facing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Lookup,
    Forget,
    Getattr,
    Setattr,
    Readlink,
    Mknod,
    Mkdir,
    Unlink,
    Rmdir,
    Symlink,
    Rename,
    Link,
    Open,
    Release,
    Opendir,
    Releasedir,
    Read,
    Write,
    Flush,
    Fallocate,
    Fsync,
    Fsyncdir,
    Readdir,
    Statfs,
    Setxattr,
    Getxattr,
    Listxattr,
    Removexattr,
    Access,
    Create,
    Bmap,
}

impl OpKind {
    /// Every operation of the surface.
    pub const ALL: [OpKind; 31] = [
        OpKind::Lookup,
        OpKind::Forget,
        OpKind::Getattr,
        OpKind::Setattr,
        OpKind::Readlink,
        OpKind::Mknod,
        OpKind::Mkdir,
        OpKind::Unlink,
        OpKind::Rmdir,
        OpKind::Symlink,
        OpKind::Rename,
        OpKind::Link,
        OpKind::Open,
        OpKind::Release,
        OpKind::Opendir,
        OpKind::Releasedir,
        OpKind::Read,
        OpKind::Write,
        OpKind::Flush,
        OpKind::Fallocate,
        OpKind::Fsync,
        OpKind::Fsyncdir,
        OpKind::Readdir,
        OpKind::Statfs,
        OpKind::Setxattr,
        OpKind::Getxattr,
        OpKind::Listxattr,
        OpKind::Removexattr,
        OpKind::Access,
        OpKind::Create,
        OpKind::Bmap,
    ];

    /// Lowercase operation name as used by libfuse.
    pub const fn name(self) -> &'static str {
        match self {
            OpKind::Lookup => "lookup",
            OpKind::Forget => "forget",
            OpKind::Getattr => "getattr",
            OpKind::Setattr => "setattr",
            OpKind::Readlink => "readlink",
            OpKind::Mknod => "mknod",
            OpKind::Mkdir => "mkdir",
            OpKind::Unlink => "unlink",
            OpKind::Rmdir => "rmdir",
            OpKind::Symlink => "symlink",
            OpKind::Rename => "rename",
            OpKind::Link => "link",
            OpKind::Open => "open",
            OpKind::Release => "release",
            OpKind::Opendir => "opendir",
            OpKind::Releasedir => "releasedir",
            OpKind::Read => "read",
            OpKind::Write => "write",
            OpKind::Flush => "flush",
            OpKind::Fallocate => "fallocate",
            OpKind::Fsync => "fsync",
            OpKind::Fsyncdir => "fsyncdir",
            OpKind::Readdir => "readdir",
            OpKind::Statfs => "statfs",
            OpKind::Setxattr => "setxattr",
            OpKind::Getxattr => "getxattr",
            OpKind::Listxattr => "listxattr",
            OpKind::Removexattr => "removexattr",
            OpKind::Access => "access",
            OpKind::Create => "create",
            OpKind::Bmap => "bmap",
        }
    }

    /// Accounting class for statistics.
    pub const fn class(self) -> OpClass {
        match self {
            OpKind::Lookup
            | OpKind::Forget
            | OpKind::Getattr
            | OpKind::Setattr
            | OpKind::Readlink
            | OpKind::Readdir
            | OpKind::Statfs
            | OpKind::Access
            | OpKind::Bmap => OpClass::Metadata,
            OpKind::Mknod
            | OpKind::Mkdir
            | OpKind::Unlink
            | OpKind::Rmdir
            | OpKind::Symlink
            | OpKind::Rename
            | OpKind::Link
            | OpKind::Create => OpClass::Namespace,
            OpKind::Open | OpKind::Release | OpKind::Opendir | OpKind::Releasedir => {
                OpClass::Handle
            }
            OpKind::Read => OpClass::Read,
            OpKind::Write | OpKind::Fallocate => OpClass::Write,
            OpKind::Flush | OpKind::Fsync | OpKind::Fsyncdir => OpClass::Sync,
            OpKind::Setxattr | OpKind::Getxattr | OpKind::Listxattr | OpKind::Removexattr => {
                OpClass::Xattr
            }
        }
    }

    /// Operations that move file data and get the longer bridge timeout.
    pub const fn is_data_path(self) -> bool {
        matches!(
            self,
            OpKind::Read | OpKind::Write | OpKind::Fsync | OpKind::Fallocate
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
