//! Platform-neutral access to `struct stat` timestamps.
//!
//! The seconds fields (`st_atime` etc.) carry no sub-second precision. The
//! nanosecond remainder lives in a separate field whose layout differs across
//! platforms, so callers go through these accessors instead of reading the
//! raw fields.

use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;

/// Access time with nanosecond precision.
#[inline]
pub fn stat_atime(st: &libc::stat) -> libc::timespec {
    libc::timespec {
        tv_sec: st.st_atime,
        tv_nsec: st.st_atime_nsec as _,
    }
}

/// Modification time with nanosecond precision.
#[inline]
pub fn stat_mtime(st: &libc::stat) -> libc::timespec {
    libc::timespec {
        tv_sec: st.st_mtime,
        tv_nsec: st.st_mtime_nsec as _,
    }
}

/// Status change time with nanosecond precision.
#[inline]
pub fn stat_ctime(st: &libc::stat) -> libc::timespec {
    libc::timespec {
        tv_sec: st.st_ctime,
        tv_nsec: st.st_ctime_nsec as _,
    }
}

/// Stores an access time, seconds and nanoseconds.
#[inline]
pub fn set_stat_atime(st: &mut libc::stat, ts: libc::timespec) {
    st.st_atime = ts.tv_sec;
    st.st_atime_nsec = ts.tv_nsec as _;
}

/// Stores a modification time, seconds and nanoseconds.
#[inline]
pub fn set_stat_mtime(st: &mut libc::stat, ts: libc::timespec) {
    st.st_mtime = ts.tv_sec;
    st.st_mtime_nsec = ts.tv_nsec as _;
}

/// Stores a status change time, seconds and nanoseconds.
#[inline]
pub fn set_stat_ctime(st: &mut libc::stat, ts: libc::timespec) {
    st.st_ctime = ts.tv_sec;
    st.st_ctime_nsec = ts.tv_nsec as _;
}

/// A zero-filled `stat`.
pub fn zeroed_stat() -> libc::stat {
    // SAFETY: `libc::stat` is plain old data; all-zero is a valid value for
    // every field, including the platform-specific padding and spare fields.
    unsafe { std::mem::zeroed() }
}

/// Rebuilds a raw `stat` from std metadata.
///
/// Every field `MetadataExt` exposes is copied; the values originate from
/// the kernel's own `stat`, so they fit the platform field widths.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn stat_from_metadata(meta: &Metadata) -> libc::stat {
    let mut st = zeroed_stat();
    st.st_dev = meta.dev() as _;
    st.st_ino = meta.ino() as _;
    st.st_mode = meta.mode() as _;
    st.st_nlink = meta.nlink() as _;
    st.st_uid = meta.uid();
    st.st_gid = meta.gid();
    st.st_rdev = meta.rdev() as _;
    st.st_size = meta.size() as _;
    st.st_blksize = meta.blksize() as _;
    st.st_blocks = meta.blocks() as _;
    set_stat_atime(
        &mut st,
        libc::timespec {
            tv_sec: meta.atime() as _,
            tv_nsec: meta.atime_nsec() as _,
        },
    );
    set_stat_mtime(
        &mut st,
        libc::timespec {
            tv_sec: meta.mtime() as _,
            tv_nsec: meta.mtime_nsec() as _,
        },
    );
    set_stat_ctime(
        &mut st,
        libc::timespec {
            tv_sec: meta.ctime() as _,
            tv_nsec: meta.ctime_nsec() as _,
        },
    );
    st
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_accessors_read_back_what_setters_store() {
        let mut st = zeroed_stat();
        set_stat_atime(&mut st, libc::timespec { tv_sec: 10, tv_nsec: 1 });
        set_stat_mtime(&mut st, libc::timespec { tv_sec: 20, tv_nsec: 999_999_999 });
        set_stat_ctime(&mut st, libc::timespec { tv_sec: -5, tv_nsec: 500 });

        let a = stat_atime(&st);
        let m = stat_mtime(&st);
        let c = stat_ctime(&st);
        assert_eq!((a.tv_sec, a.tv_nsec), (10, 1));
        assert_eq!((m.tv_sec, m.tv_nsec), (20, 999_999_999));
        assert_eq!((c.tv_sec, c.tv_nsec), (-5, 500));
    }

    #[test]
    fn test_zeroed_stat_is_zero() {
        let st = zeroed_stat();
        assert_eq!(st.st_size, 0);
        assert_eq!(st.st_mode, 0);
        assert_eq!(stat_mtime(&st).tv_nsec, 0);
    }

    #[test]
    fn test_stat_from_metadata_matches_std() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello vfsgate").unwrap();
        file.flush().unwrap();

        let meta = file.as_file().metadata().unwrap();
        let st = stat_from_metadata(&meta);

        assert_eq!(st.st_size as u64, meta.size());
        assert_eq!(st.st_ino as u64, meta.ino());
        assert_eq!(st.st_mode as u32, meta.mode());
        assert_eq!(st.st_uid, meta.uid());
        assert_eq!(st.st_gid, meta.gid());
        assert_eq!(stat_mtime(&st).tv_sec as i64, meta.mtime());
        assert_eq!(stat_mtime(&st).tv_nsec as i64, meta.mtime_nsec());
    }
}
