//! Error handling and errno mapping for dispatched operations.
//!
//! Every failure crosses the kernel boundary as a single errno. This module
//! keeps the three kinds the default policy relies on distinct:
//!
//! - [`DispatchError::EntityNotFound`] (ENOENT) lets the kernel cache the
//!   negative lookup.
//! - [`DispatchError::MissingAttribute`] ([`ENOATTR`]) reports a missing
//!   extended attribute.
//! - [`DispatchError::NotSupported`] (ENOSYS) tells the kernel the operation
//!   is not implemented, so it can stop sending it.

use crate::bridge::BridgeError;
use crate::op::OpKind;
use std::io;
use thiserror::Error;

/// The platform's "no such extended attribute" code.
///
/// Platforms that define `ENOATTR` use it; Linux reports `ENODATA` instead.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
pub const ENOATTR: i32 = libc::ENOATTR;

/// The platform's "no such extended attribute" code.
///
/// Platforms that define `ENOATTR` use it; Linux reports `ENODATA` instead.
#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
pub const ENOATTR: i32 = libc::ENODATA;

/// Errors surfaced by dispatched operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inode or directory entry does not exist.
    #[error("Entity not found")]
    EntityNotFound,

    /// The requested extended attribute does not exist.
    #[error("Extended attribute not found")]
    MissingAttribute,

    /// The filesystem does not implement this operation.
    #[error("Operation not supported: {0}")]
    NotSupported(OpKind),

    /// A directory-entry name the kernel should never send.
    #[error("Invalid entry name: {0:?}")]
    InvalidName(String),

    /// Connection parameters were negotiated a second time.
    #[error("Connection already initialized")]
    ConnectionAlreadyInitialized,

    /// IO error from the backing store.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Async bridge error (timeout, cancelled).
    #[error("Async bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// A specific errno chosen by the filesystem.
    #[error("Filesystem error: errno {0}")]
    Errno(i32),

    /// Unexpected internal failure in the filesystem implementation.
    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// Builds an error from a raw errno, keeping the distinguished kinds
    /// recognizable.
    ///
    /// `ENOSYS` carries no operation, so it stays an [`DispatchError::Errno`];
    /// [`DispatchError::is_not_supported`] still recognizes it.
    pub fn from_errno(code: i32) -> Self {
        match code {
            libc::ENOENT => DispatchError::EntityNotFound,
            ENOATTR => DispatchError::MissingAttribute,
            other => DispatchError::Errno(other),
        }
    }

    /// Converts this error to a libc error code for the kernel reply.
    pub fn to_errno(&self) -> i32 {
        match self {
            DispatchError::EntityNotFound => libc::ENOENT,
            DispatchError::MissingAttribute => ENOATTR,
            DispatchError::NotSupported(_) => libc::ENOSYS,
            DispatchError::InvalidName(_) => libc::EINVAL,
            DispatchError::ConnectionAlreadyInitialized => libc::EALREADY,
            DispatchError::Io(e) => io_error_to_errno(e),
            DispatchError::Bridge(e) => e.to_errno(),
            DispatchError::Errno(code) => *code,
            DispatchError::Internal(_) => libc::EIO,
        }
    }

    /// Whether the kernel may cache this answer as a negative entry.
    pub fn is_not_found(&self) -> bool {
        self.to_errno() == libc::ENOENT
    }

    /// Whether this is the unimplemented-operation answer, however it was
    /// produced.
    pub fn is_not_supported(&self) -> bool {
        self.to_errno() == libc::ENOSYS
    }
}

/// Result type for dispatched operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Extension trait to convert errors to errno.
pub trait ToErrno {
    /// Converts this error to a libc error code.
    fn to_errno(&self) -> i32;
}

impl ToErrno for DispatchError {
    fn to_errno(&self) -> i32 {
        DispatchError::to_errno(self)
    }
}

impl ToErrno for io::Error {
    fn to_errno(&self) -> i32 {
        io_error_to_errno(self)
    }
}

/// Converts an IO error to a libc error code, falling back to EIO when the
/// error carries no OS code.
pub fn io_error_to_errno(e: &io::Error) -> i32 {
    e.raw_os_error().unwrap_or(libc::EIO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_distinguished_kinds() {
        assert_eq!(DispatchError::EntityNotFound.to_errno(), libc::ENOENT);
        assert_eq!(DispatchError::MissingAttribute.to_errno(), ENOATTR);
        assert_eq!(
            DispatchError::NotSupported(OpKind::Mkdir).to_errno(),
            libc::ENOSYS
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_enoattr_is_enodata_on_linux() {
        assert_eq!(ENOATTR, libc::ENODATA);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_enoattr_is_native_on_macos() {
        assert_eq!(ENOATTR, libc::ENOATTR);
    }

    #[test]
    fn test_not_found_is_not_unsupported() {
        let missing = DispatchError::EntityNotFound;
        let unsupported = DispatchError::NotSupported(OpKind::Lookup);

        assert!(missing.is_not_found());
        assert!(!missing.is_not_supported());
        assert!(unsupported.is_not_supported());
        assert!(!unsupported.is_not_found());
    }

    #[test]
    fn test_enosys_from_any_source_is_not_supported() {
        assert!(DispatchError::from_errno(libc::ENOSYS).is_not_supported());
        assert!(DispatchError::Errno(libc::ENOSYS).is_not_supported());
        let io = std::io::Error::from_raw_os_error(libc::ENOSYS);
        assert!(DispatchError::Io(io).is_not_supported());
        assert!(!DispatchError::from_errno(libc::EACCES).is_not_supported());
    }

    #[test]
    fn test_from_errno_normalizes() {
        assert!(matches!(
            DispatchError::from_errno(libc::ENOENT),
            DispatchError::EntityNotFound
        ));
        assert!(matches!(
            DispatchError::from_errno(ENOATTR),
            DispatchError::MissingAttribute
        ));
        assert!(matches!(
            DispatchError::from_errno(libc::EACCES),
            DispatchError::Errno(libc::EACCES)
        ));
    }

    #[test]
    fn test_io_error_passthrough() {
        let e = DispatchError::from(io::Error::from_raw_os_error(libc::ENOSPC));
        assert_eq!(e.to_errno(), libc::ENOSPC);

        let e = io::Error::from_raw_os_error(libc::ENOENT);
        assert!(DispatchError::from(e).is_not_found());
    }

    #[test]
    fn test_io_error_without_os_code() {
        let e = io::Error::other("custom error");
        assert_eq!(io_error_to_errno(&e), libc::EIO);
        assert_eq!(e.to_errno(), libc::EIO);
    }

    #[test]
    fn test_bridge_errors() {
        let e = DispatchError::from(BridgeError::Timeout(Duration::from_secs(1)));
        assert_eq!(e.to_errno(), libc::ETIMEDOUT);

        let e = DispatchError::from(BridgeError::Cancelled);
        assert_eq!(e.to_errno(), libc::ECANCELED);
    }

    #[test]
    fn test_internal_maps_to_eio() {
        let e = DispatchError::from(anyhow::anyhow!("index corrupted"));
        assert_eq!(e.to_errno(), libc::EIO);
        assert!(e.to_string().contains("index corrupted"));
    }

    #[test]
    fn test_display() {
        let e = DispatchError::NotSupported(OpKind::Bmap);
        assert!(e.to_string().contains("bmap"));

        let e = DispatchError::InvalidName("a/b".to_string());
        assert!(e.to_string().contains("a/b"));
    }
}
