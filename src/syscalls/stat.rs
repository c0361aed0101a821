//! AIX's three on-disk `stat` layouts (`stat`, `stat64`, `stat64x`) and
//! conversion from the host's `struct stat`.
//!
//! There is no `stat(2)` syscall on AIX; libc's `stat`/`lstat`/`fstat` all
//! funnel through a single `statx`/`fstatx` syscall that picks one of these
//! three layouts based on flags in the `cmd` argument. None of these structs
//! match Linux's field widths exactly, so every field is converted and
//! written individually rather than reinterpreted in place.

use crate::error::Result;
use scroll::Pwrite;

/// `cmd` flag: include info about the file a symlink points to as well.
pub const STX_LINK: u32 = 0x01;
/// `cmd` flag: do not traverse the final mount point.
pub const STX_MOUNT: u32 = 0x02;
/// `cmd` flag: include info about hidden directories.
pub const STX_HIDDEN: u32 = 0x04;
/// `cmd` flag: caller wants the `stat64` layout.
pub const STX_64: u32 = 0x08;
/// `cmd` flag: caller wants the `stat64x` layout.
pub const STX_64X: u32 = 0x10;

pub const SIZEOF_AIX_STAT: usize = 116;
pub const SIZEOF_AIX_STAT64: usize = 128;
pub const SIZEOF_AIX_STAT64X: usize = 172;

/// Which of the three on-disk layouts a `cmd` value selects.
pub fn stat_size(cmd: u32) -> usize {
    if cmd & STX_64X != 0 {
        SIZEOF_AIX_STAT64X
    } else if cmd & STX_64 != 0 {
        SIZEOF_AIX_STAT64
    } else {
        SIZEOF_AIX_STAT
    }
}

fn make_dev(major: u32, minor: u32) -> u32 {
    (major << 16) | minor
}

fn make_dev64(major: u32, minor: u32) -> u64 {
    ((major as u64) << 32) | (minor as u64 & 0xFFFF_FFFF) | 0x8000_0000_0000_0000
}

/// Writes the 116-byte `struct aix_stat` layout. Fields with no Linux
/// counterpart (`st_flag`, `st_vfstype`, `st_vfs`, `st_type`, `st_gen`,
/// the reserved tail) are left zeroed.
pub fn write_stat(st: &libc::stat) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; SIZEOF_AIX_STAT];
    let dev = make_dev(unsafe { libc::major(st.st_dev) }, unsafe { libc::minor(st.st_dev) });
    let rdev = make_dev(unsafe { libc::major(st.st_rdev) }, unsafe { libc::minor(st.st_rdev) });
    buf.pwrite_with(dev, 0, scroll::BE)?;
    buf.pwrite_with(st.st_ino as u32, 4, scroll::BE)?;
    buf.pwrite_with(st.st_mode as u32, 8, scroll::BE)?;
    buf.pwrite_with(st.st_nlink as u16, 12, scroll::BE)?;
    buf.pwrite_with(st.st_uid, 16, scroll::BE)?;
    buf.pwrite_with(st.st_gid, 20, scroll::BE)?;
    buf.pwrite_with(rdev, 24, scroll::BE)?;
    buf.pwrite_with(st.st_size as i32, 28, scroll::BE)?;
    buf.pwrite_with(st.st_atime as u32, 32, scroll::BE)?;
    buf.pwrite_with(st.st_atime_nsec as u32, 36, scroll::BE)?;
    buf.pwrite_with(st.st_mtime as u32, 40, scroll::BE)?;
    buf.pwrite_with(st.st_mtime_nsec as u32, 44, scroll::BE)?;
    buf.pwrite_with(st.st_ctime as u32, 48, scroll::BE)?;
    buf.pwrite_with(st.st_ctime_nsec as u32, 52, scroll::BE)?;
    buf.pwrite_with(st.st_blksize as u32, 56, scroll::BE)?;
    buf.pwrite_with(st.st_blocks as u32, 60, scroll::BE)?;
    Ok(buf)
}

/// Writes the 128-byte `struct aix_stat64` layout: identical to
/// [`write_stat`] up through `st_rdev`, then a 32-bit truncated `st_ssize`,
/// the same timestamps/block fields, and finally a 64-bit `st_size` tacked
/// on past the reserved tail (matching the original layout's field order).
pub fn write_stat64(st: &libc::stat) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; SIZEOF_AIX_STAT64];
    let dev = make_dev(unsafe { libc::major(st.st_dev) }, unsafe { libc::minor(st.st_dev) });
    let rdev = make_dev(unsafe { libc::major(st.st_rdev) }, unsafe { libc::minor(st.st_rdev) });
    buf.pwrite_with(dev, 0, scroll::BE)?;
    buf.pwrite_with(st.st_ino as u32, 4, scroll::BE)?;
    buf.pwrite_with(st.st_mode as u32, 8, scroll::BE)?;
    buf.pwrite_with(st.st_nlink as u16, 12, scroll::BE)?;
    buf.pwrite_with(st.st_uid, 16, scroll::BE)?;
    buf.pwrite_with(st.st_gid, 20, scroll::BE)?;
    buf.pwrite_with(rdev, 24, scroll::BE)?;
    buf.pwrite_with(st.st_size as u32, 28, scroll::BE)?;
    buf.pwrite_with(st.st_atime as u32, 32, scroll::BE)?;
    buf.pwrite_with(st.st_atime_nsec as u32, 36, scroll::BE)?;
    buf.pwrite_with(st.st_mtime as u32, 40, scroll::BE)?;
    buf.pwrite_with(st.st_mtime_nsec as u32, 44, scroll::BE)?;
    buf.pwrite_with(st.st_ctime as u32, 48, scroll::BE)?;
    buf.pwrite_with(st.st_ctime_nsec as u32, 52, scroll::BE)?;
    buf.pwrite_with(st.st_blksize as u32, 56, scroll::BE)?;
    buf.pwrite_with(st.st_blocks as u32, 60, scroll::BE)?;
    buf.pwrite_with(st.st_size as i64, 120, scroll::BE)?;
    Ok(buf)
}

/// Writes the 172-byte `struct aix_stat64x` layout: wide `st_dev`/`st_ino`/
/// `st_rdev`, and `aix_timespec64`-shaped (8+4+4 byte) timestamps.
pub fn write_stat64x(st: &libc::stat) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; SIZEOF_AIX_STAT64X];
    let dev = make_dev64(unsafe { libc::major(st.st_dev) }, unsafe { libc::minor(st.st_dev) });
    let rdev = make_dev64(unsafe { libc::major(st.st_rdev) }, unsafe { libc::minor(st.st_rdev) });
    buf.pwrite_with(dev, 0, scroll::BE)?;
    buf.pwrite_with(st.st_ino as u64, 8, scroll::BE)?;
    buf.pwrite_with(st.st_mode as u32, 16, scroll::BE)?;
    buf.pwrite_with(st.st_nlink as u16, 20, scroll::BE)?;
    buf.pwrite_with(st.st_uid, 24, scroll::BE)?;
    buf.pwrite_with(st.st_gid, 28, scroll::BE)?;
    buf.pwrite_with(rdev, 32, scroll::BE)?;
    buf.pwrite_with(st.st_size as i64, 40, scroll::BE)?;
    buf.pwrite_with(st.st_atime as u64, 48, scroll::BE)?;
    buf.pwrite_with(st.st_atime_nsec as i32, 56, scroll::BE)?;
    buf.pwrite_with(st.st_mtime as u64, 64, scroll::BE)?;
    buf.pwrite_with(st.st_mtime_nsec as i32, 72, scroll::BE)?;
    buf.pwrite_with(st.st_ctime as u64, 80, scroll::BE)?;
    buf.pwrite_with(st.st_ctime_nsec as i32, 88, scroll::BE)?;
    buf.pwrite_with(st.st_blksize as u64, 96, scroll::BE)?;
    buf.pwrite_with(st.st_blocks as u64, 104, scroll::BE)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_stat() -> libc::stat {
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        st.st_ino = 42;
        st.st_mode = 0o100644;
        st.st_nlink = 1;
        st.st_uid = 1000;
        st.st_gid = 1000;
        st.st_size = 8192;
        st
    }

    #[test]
    fn stat_buffer_is_exact_size() {
        let buf = write_stat(&synthetic_stat()).unwrap();
        assert_eq!(buf.len(), SIZEOF_AIX_STAT);
    }

    #[test]
    fn stat64_buffer_carries_64bit_size_past_reserved_tail() {
        use scroll::Pread;
        let mut st = synthetic_stat();
        st.st_size = 0x1_0000_0000; // only representable in the 64-bit field
        let buf = write_stat64(&st).unwrap();
        assert_eq!(buf.len(), SIZEOF_AIX_STAT64);
        let size: i64 = buf.pread_with(120, scroll::BE).unwrap();
        assert_eq!(size, 0x1_0000_0000);
    }

    #[test]
    fn stat64x_buffer_is_exact_size_and_carries_uid() {
        use scroll::Pread;
        let st = synthetic_stat();
        let buf = write_stat64x(&st).unwrap();
        assert_eq!(buf.len(), SIZEOF_AIX_STAT64X);
        let uid: u32 = buf.pread_with(24, scroll::BE).unwrap();
        assert_eq!(uid, 1000);
    }

    #[test]
    fn stat_size_selects_layout_by_cmd_flags() {
        assert_eq!(stat_size(0), SIZEOF_AIX_STAT);
        assert_eq!(stat_size(STX_64), SIZEOF_AIX_STAT64);
        assert_eq!(stat_size(STX_64X), SIZEOF_AIX_STAT64X);
        assert_eq!(stat_size(STX_64 | STX_64X), SIZEOF_AIX_STAT64X);
    }
}
