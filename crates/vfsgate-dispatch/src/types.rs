//! Identifier and name types shared by every operation.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;

use crate::error::{DispatchError, DispatchResult};

/// Opaque inode identifier.
///
/// Purely a lookup key: it carries no ownership and is passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InodeNumber(u64);

impl InodeNumber {
    /// The root inode number (FUSE convention).
    pub const ROOT: InodeNumber = InodeNumber(1);

    /// Wraps a raw kernel node id.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw kernel node id.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the mount root.
    #[inline]
    pub const fn is_root(self) -> bool {
        self.0 == Self::ROOT.0
    }
}

impl From<u64> for InodeNumber {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<InodeNumber> for u64 {
    fn from(ino: InodeNumber) -> Self {
        ino.0
    }
}

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single directory-entry name as sent by the kernel.
///
/// Borrowed from the request buffer. Construction rejects names the kernel
/// would never legitimately send for a child entry: empty, containing `/`,
/// or containing NUL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathComponent<'a>(&'a OsStr);

impl<'a> PathComponent<'a> {
    /// Validates and wraps a raw entry name.
    pub fn new(name: &'a OsStr) -> DispatchResult<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.contains(&b'/') || bytes.contains(&0) {
            return Err(DispatchError::InvalidName(name.to_string_lossy().into_owned()));
        }
        Ok(Self(name))
    }

    /// The raw name.
    #[inline]
    pub fn as_os_str(&self) -> &'a OsStr {
        self.0
    }

    /// The name as raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0.as_bytes()
    }

    /// The name as UTF-8, if it is valid UTF-8.
    #[inline]
    pub fn to_str(&self) -> Option<&'a str> {
        self.0.to_str()
    }

    /// Whether this is `.` or `..`.
    pub fn is_dot_or_dotdot(&self) -> bool {
        matches!(self.as_bytes(), b"." | b"..")
    }
}

impl AsRef<OsStr> for PathComponent<'_> {
    fn as_ref(&self) -> &OsStr {
        self.0
    }
}

impl fmt::Display for PathComponent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}
