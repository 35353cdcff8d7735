//! Size-bounded directory listing handed to `readdir`.
//!
//! The kernel sizes its readdir buffer up front. A handler appends entries
//! until [`DirList::add`] refuses one; the refused entry is picked up by the
//! next readdir call at its offset.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::types::InodeNumber;

/// Size of `fuse_dirent` before the name.
const DIRENT_NAME_OFFSET: usize = 24;

/// Bytes one entry with a name of `namelen` bytes takes in the reply.
pub const fn dirent_size(namelen: usize) -> usize {
    (DIRENT_NAME_OFFSET + namelen + 7) & !7
}

/// `DT_*` directory entry type for a `st_mode`.
pub fn file_type_from_mode(mode: u32) -> u32 {
    (mode & u32::from(libc::S_IFMT)) >> 12
}

/// One listed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: InodeNumber,
    pub name: OsString,
    /// `DT_*` value.
    pub file_type: u32,
    /// Offset the kernel passes back to continue after this entry.
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct DirList {
    max_bytes: usize,
    used: usize,
    entries: Vec<DirEntry>,
}

impl DirList {
    /// An empty listing that fits in `max_bytes` of reply.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            used: 0,
            entries: Vec::new(),
        }
    }

    /// Appends an entry. Returns `false` and leaves the listing unchanged
    /// when the entry would not fit.
    pub fn add(&mut self, name: &OsStr, ino: InodeNumber, file_type: u32, offset: u64) -> bool {
        let size = dirent_size(name.as_bytes().len());
        if self.used + size > self.max_bytes {
            return false;
        }
        self.used += size;
        self.entries.push(DirEntry {
            ino,
            name: name.to_os_string(),
            file_type,
            offset,
        });
        true
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DirEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.max_bytes - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirent_size_alignment() {
        assert_eq!(dirent_size(0), 24);
        assert_eq!(dirent_size(1), 32);
        assert_eq!(dirent_size(8), 32);
        assert_eq!(dirent_size(9), 40);
        assert_eq!(dirent_size(255), 280);
    }

    #[test]
    fn test_file_types() {
        assert_eq!(file_type_from_mode(libc::S_IFDIR as u32 | 0o755), u32::from(libc::DT_DIR));
        assert_eq!(file_type_from_mode(libc::S_IFREG as u32 | 0o644), u32::from(libc::DT_REG));
        assert_eq!(file_type_from_mode(libc::S_IFLNK as u32 | 0o777), u32::from(libc::DT_LNK));
    }

    #[test]
    fn test_add_until_full() {
        let mut list = DirList::new(64);
        assert!(list.add(OsStr::new("."), InodeNumber::ROOT, 4, 1));
        assert!(list.add(OsStr::new(".."), InodeNumber::ROOT, 4, 2));
        assert_eq!(list.bytes_used(), 64);
        assert_eq!(list.remaining(), 0);

        assert!(!list.add(OsStr::new("a"), InodeNumber::new(5), 8, 3));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_rejected_entry_leaves_room_for_smaller_one() {
        let mut list = DirList::new(40);
        assert!(!list.add(OsStr::new("a-rather-long-name"), InodeNumber::new(2), 8, 1));
        assert!(list.is_empty());
        assert!(list.add(OsStr::new("short"), InodeNumber::new(3), 8, 1));

        let entries = list.into_entries();
        assert_eq!(entries[0].name.as_os_str(), OsStr::new("short"));
        assert_eq!(entries[0].offset, 1);
    }
}
