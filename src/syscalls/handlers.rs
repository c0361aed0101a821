//! Implementations of the individual AIX syscalls `/unix` exposes.
//!
//! Each handler has the AIX calling convention baked into its doc comment:
//! arguments arrive in r3..r10 (read via [`super::arg`]), the return value
//! goes back in r3 (handled by [`super::Dispatcher::dispatch`]), and errors
//! are reported by writing the guest's `errno` cell, not by the handler's
//! own return value.

use super::errno::*;
use super::open_flags;
use super::stat;
use super::{arg, read_cstr, set_errno, set_errno_from_host, SyscallCtx};
use crate::cpu::CpuBackend;
use crate::error::Result;
use crate::mm::HEAP_ADDR;
use log::debug;

/// r3 = fd, r4 = buf, r5 = count. Returns bytes written, or -1.
pub fn kwrite<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let fd = arg(cpu, 1)? as i32;
    let buf_addr = arg(cpu, 2)?;
    let count = arg(cpu, 3)?;
    if count == 0 {
        return Ok(0);
    }
    let mut buf = vec![0u8; count as usize];
    if cpu.read_mem(buf_addr, &mut buf).is_err() {
        set_errno(cpu, ctx, AIX_EFAULT)?;
        debug!(target: "syscalls", "kwrite({}, {:#x}, {}) = -1 (EFAULT)", fd, buf_addr, count);
        return Ok(-1);
    }
    let ret = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, count as usize) };
    if ret < 0 {
        set_errno_from_host(cpu, ctx)?;
    }
    debug!(target: "syscalls", "kwrite({}, ..., {}) = {}", fd, count, ret);
    Ok(ret as i32)
}

/// r3 = fd, r4 = dest buf, r5 = count. Returns bytes read, or -1.
pub fn kread<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let fd = arg(cpu, 1)? as i32;
    let buf_addr = arg(cpu, 2)?;
    let count = arg(cpu, 3)?;
    if count == 0 {
        return Ok(0);
    }
    let mut buf = vec![0u8; count as usize];
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, count as usize) };
    if ret < 0 {
        set_errno_from_host(cpu, ctx)?;
        debug!(target: "syscalls", "kread({}, ..., {}) = {}", fd, count, ret);
        return Ok(-1);
    }
    if cpu.write_mem(buf_addr, &buf[..ret as usize]).is_err() {
        set_errno(cpu, ctx, AIX_EFAULT)?;
        debug!(target: "syscalls", "kread({}, {:#x}, {}) = -1 (EFAULT)", fd, buf_addr, count);
        return Ok(-1);
    }
    debug!(target: "syscalls", "kread({}, ..., {}) = {}", fd, count, ret);
    Ok(ret as i32)
}

/// r3 = path, r4 = flags, r5 = mode (if `O_CREAT`). Returns a new fd, or -1.
///
/// AIX's `S_ENFMT` has no Linux equivalent and is dropped; every other flag
/// translates 1:1 through [`open_flags::aix_to_host`].
pub fn kopen<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let path_addr = arg(cpu, 1)?;
    let flags = arg(cpu, 2)?;
    let mode = arg(cpu, 3)?;

    let path = match read_cstr(cpu, path_addr, 1024) {
        Ok(p) => p,
        Err(_) => {
            set_errno(cpu, ctx, AIX_EINVAL)?;
            return Ok(-1);
        }
    };
    let cpath = match std::ffi::CString::new(path.as_str()) {
        Ok(c) => c,
        Err(_) => {
            set_errno(cpu, ctx, AIX_EINVAL)?;
            return Ok(-1);
        }
    };

    let host_flags = open_flags::aix_to_host(flags);
    let fd = unsafe { libc::open(cpath.as_ptr(), host_flags, mode as libc::mode_t) };
    if fd < 0 {
        set_errno_from_host(cpu, ctx)?;
    }
    debug!(target: "syscalls", "kopen(\"{}\", {:#x}, {:#x}) = {}", path, flags, mode, fd);
    Ok(fd)
}

/// r3 = fd. Returns 0, or -1.
pub fn close<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let fd = arg(cpu, 1)? as i32;
    let ret = unsafe { libc::close(fd) };
    if ret < 0 {
        set_errno_from_host(cpu, ctx)?;
    }
    debug!(target: "syscalls", "close({}) = {}", fd, ret);
    Ok(ret)
}

/// r3 = status. Never returns.
pub fn exit<C: CpuBackend>(cpu: &mut C, _ctx: &SyscallCtx) -> Result<i32> {
    let status = arg(cpu, 1)? as i32;
    debug!(target: "syscalls", "_exit({})", status);
    std::process::exit(status);
}

/// r3 = new break address. Returns 0, or -1 with `ENOMEM`.
pub fn brk<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let addr = arg(cpu, 1)?;
    if addr < HEAP_ADDR {
        set_errno(cpu, ctx, AIX_ENOMEM)?;
        debug!(target: "syscalls", "brk({:#x}) = -1", addr);
        return Ok(-1);
    }
    ctx.heap_cursor.set(addr);
    debug!(target: "syscalls", "brk({:#x}) = 0", addr);
    Ok(0)
}

/// r3 = increment (signed). Returns the previous break, or -1 with `ENOMEM`.
pub fn sbrk<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let incr = arg(cpu, 1)? as i32;
    let curr = ctx.heap_cursor.get();
    let prev = curr as i32;

    if incr >= 0 {
        let incr = incr as u32;
        if curr > u32::MAX - incr {
            set_errno(cpu, ctx, AIX_ENOMEM)?;
            debug!(target: "syscalls", "sbrk({}) = -1", incr);
            return Ok(-1);
        }
        ctx.heap_cursor.set(curr + incr);
    } else {
        let decr = incr.unsigned_abs();
        if curr < decr || curr - decr < HEAP_ADDR {
            set_errno(cpu, ctx, AIX_ENOMEM)?;
            debug!(target: "syscalls", "sbrk({}) = -1", incr);
            return Ok(-1);
        }
        ctx.heap_cursor.set(curr - decr);
    }
    debug!(target: "syscalls", "sbrk({}) = {:#x}", incr, prev);
    Ok(prev)
}

/// r3 = increment high word (ignored, 32-bit guest), r4 = increment low
/// word. Forwards to [`sbrk`] with r3 rewritten to the low word, exactly as
/// `.__libc_sbrk` does on real AIX.
pub fn libc_sbrk<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let incr_hi = arg(cpu, 1)?;
    let incr_lo = arg(cpu, 2)?;
    cpu.write_gpr(3, incr_lo)?;
    let ret = sbrk(cpu, ctx)?;
    debug!(target: "syscalls", "__libc_sbrk({}, {}) = {}", incr_hi, incr_lo as i32, ret);
    Ok(ret)
}

const AIX_ID_EFFECTIVE: u32 = 1;
const AIX_ID_REAL: u32 = 2;
const AIX_ID_SAVED: u32 = 4;
const AIX_ID_LOGIN: u32 = 8;

/// r3 = id type. Returns the requested user id, or -1.
pub fn getuidx<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let ty = arg(cpu, 1)?;
    let (mut ruid, mut euid, mut suid) = (0, 0, 0);
    unsafe { libc::getresuid(&mut ruid, &mut euid, &mut suid) };
    let ret = match ty {
        AIX_ID_EFFECTIVE | AIX_ID_LOGIN => euid as i32,
        AIX_ID_REAL => ruid as i32,
        AIX_ID_SAVED => suid as i32,
        _ => {
            set_errno(cpu, ctx, AIX_EINVAL)?;
            -1
        }
    };
    debug!(target: "syscalls", "getuidx({}) = {}", ty, ret);
    Ok(ret)
}

/// r3 = id type. Returns the requested group id, or -1. There is no man
/// page for `getgidx` on AIX; behavior is assumed analogous to `getuidx`.
pub fn getgidx<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let ty = arg(cpu, 1)?;
    let (mut rgid, mut egid, mut sgid) = (0, 0, 0);
    unsafe { libc::getresgid(&mut rgid, &mut egid, &mut sgid) };
    let ret = match ty {
        AIX_ID_EFFECTIVE | AIX_ID_LOGIN => egid as i32,
        AIX_ID_REAL => rgid as i32,
        AIX_ID_SAVED => sgid as i32,
        _ => {
            set_errno(cpu, ctx, AIX_EINVAL)?;
            -1
        }
    };
    debug!(target: "syscalls", "getgidx({}) = {}", ty, ret);
    Ok(ret)
}

/// r3 = fd, r4 = cmd, r5 = arg. Only `F_GETFL` is implemented.
pub fn kfcntl<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let fd = arg(cpu, 1)? as i32;
    let cmd = arg(cpu, 2)? as libc::c_int;
    let farg = arg(cpu, 3)?;

    let ret = if cmd == libc::F_GETFL {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            set_errno_from_host(cpu, ctx)?;
            -1
        } else {
            // These flags are numerically identical between AIX and Linux.
            let mut ret = 0;
            if flags & libc::O_WRONLY != 0 {
                ret |= libc::O_WRONLY;
            } else if flags & libc::O_RDWR != 0 {
                ret |= libc::O_RDWR;
            }
            ret
        }
    } else {
        log::warn!(target: "syscalls", "kfcntl: unknown command: {}", cmd);
        set_errno(cpu, ctx, AIX_EINVAL)?;
        -1
    };
    debug!(target: "syscalls", "kfcntl({}, {}, {:#x}) = {}", fd, cmd, farg, ret);
    Ok(ret)
}

/// ioctl command bits: `'X' << 8`, enough to implement `isatty()`.
const TXISATTY: u32 = ('X' as u32) << 8;

/// r3 = fd, r4 = cmd, r5 = arg, r6 = ext. Only the `isatty()` probe is
/// implemented.
pub fn kioctl<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let fd = arg(cpu, 1)? as i32;
    let cmd = arg(cpu, 2)?;
    let farg = arg(cpu, 3)?;
    let ext = arg(cpu, 4)?;
    let mut ret = -1;

    if cmd & TXISATTY != 0 {
        if unsafe { libc::isatty(fd) } != 0 {
            ret = 0;
        } else {
            set_errno_from_host(cpu, ctx)?;
        }
    }
    debug!(target: "syscalls", "kioctl({}, {:#x}, {:#x}, {:#x}) = {}", fd, cmd, farg, ext, ret);
    Ok(ret)
}

/// Command value for `vmgetinfo`'s page-size query, the only command
/// implemented.
const VM_PAGE_INFO: u32 = 7;

/// r3 = out buffer, r4 = command, r5 = extra parameter.
///
/// `vmgetinfo` covers a large swath of AIX's virtual memory manager; only
/// `VM_PAGE_INFO` (reporting a fixed 4 KiB page size) is implemented.
pub fn vmgetinfo<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    let out = arg(cpu, 1)?;
    let cmd = arg(cpu, 2)?;
    let add = arg(cpu, 3)?;

    if cmd != VM_PAGE_INFO {
        set_errno(cpu, ctx, AIX_EINVAL)?;
        debug!(target: "syscalls", "vmgetinfo({:#x}, {}, {}) = -1", out, cmd, add);
        return Ok(-1);
    }

    // struct vm_page_info { u32 addr[2]; u32 pagesize[2]; }; only
    // pagesize[1] (offset 12) is ever populated.
    if cpu.write_u32(out + 12, 4096).is_err() {
        set_errno(cpu, ctx, AIX_EINVAL)?;
        debug!(target: "syscalls", "vmgetinfo({:#x}, {}, {}) = -1", out, cmd, add);
        return Ok(-1);
    }
    debug!(target: "syscalls", "vmgetinfo({:#x}, {}, {}) = 0", out, cmd, add);
    Ok(0)
}

fn do_stat<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx, have_fd: bool) -> Result<i32> {
    let path_or_fd = arg(cpu, 1)?;
    let buff = arg(cpu, 2)?;
    let mut length = arg(cpu, 3)?;
    let cmd = arg(cpu, 4)?;

    let path = if have_fd {
        String::new()
    } else {
        match read_cstr(cpu, path_or_fd, 1024) {
            Ok(p) => p,
            Err(_) => {
                set_errno(cpu, ctx, AIX_EINVAL)?;
                return Ok(-1);
            }
        }
    };

    let exp_len = stat::stat_size(cmd);
    if cmd & stat::STX_64X != 0 && length != 0 && length as usize != exp_len {
        set_errno(cpu, ctx, AIX_EINVAL)?;
        return Ok(-1);
    }
    if length == 0 {
        length = exp_len as u32;
    } else if length as usize > exp_len {
        set_errno(cpu, ctx, AIX_EINVAL)?;
        return Ok(-1);
    }

    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let ret = if have_fd {
        unsafe { libc::fstat(path_or_fd as i32, &mut st) }
    } else {
        let cpath = match std::ffi::CString::new(path.as_str()) {
            Ok(c) => c,
            Err(_) => {
                set_errno(cpu, ctx, AIX_EINVAL)?;
                return Ok(-1);
            }
        };
        if cmd & stat::STX_LINK != 0 {
            unsafe { libc::lstat(cpath.as_ptr(), &mut st) }
        } else {
            unsafe { libc::stat(cpath.as_ptr(), &mut st) }
        }
    };
    if ret < 0 {
        set_errno_from_host(cpu, ctx)?;
        return Ok(-1);
    }

    if cmd & (stat::STX_64 | stat::STX_64X) == 0 && st.st_size > 0x7FFF_FFFF {
        set_errno(cpu, ctx, AIX_EOVERFLOW)?;
        return Ok(-1);
    }

    let buf = if cmd & stat::STX_64X != 0 {
        stat::write_stat64x(&st)?
    } else if cmd & stat::STX_64 != 0 {
        stat::write_stat64(&st)?
    } else {
        stat::write_stat(&st)?
    };

    if cpu.write_mem(buff, &buf[..length as usize]).is_err() {
        set_errno(cpu, ctx, AIX_EINVAL)?;
        return Ok(-1);
    }

    if have_fd {
        debug!(target: "syscalls", "fstatx({}, {:#x}, {}, {:#o}) = 0", path_or_fd, buff, length, cmd);
    } else {
        debug!(target: "syscalls", "statx(\"{}\", {:#x}, {}, {:#o}) = 0", path, buff, length, cmd);
    }
    Ok(0)
}

/// r3 = path, r4 = buffer, r5 = length, r6 = cmd. There is no `stat(2)` on
/// AIX; libc's `stat`/`lstat` both funnel through this one syscall.
pub fn statx<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    do_stat(cpu, ctx, false)
}

/// As [`statx`], but r3 is an already-open fd (`fstat`).
pub fn fstatx<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<i32> {
    do_stat(cpu, ctx, true)
}

/// r3 = flag, r4 = symbol name, r5/r6 = output pointers, r7 = extra.
///
/// `__loadx` is AIX's kernel-level equivalent of `dlopen()`. Dynamic loading
/// at runtime is out of scope here; this always reports success.
pub fn loadx<C: CpuBackend>(cpu: &mut C, _ctx: &SyscallCtx) -> Result<i32> {
    let flg = arg(cpu, 1)?;
    let sname_addr = arg(cpu, 2)?;
    let sym_idx = arg(cpu, 3)?;
    let sym_org = arg(cpu, 4)?;
    let ext = arg(cpu, 5)?;
    let sname = read_cstr(cpu, sname_addr, 32).unwrap_or_default();
    debug!(target: "syscalls", "__loadx({:#x}, \"{}\", {:#x}, {:#x}, {:#x}) = 0", flg, sname, sym_idx, sym_org, ext);
    Ok(0)
}

/// r3..r10 = opaque parameters. Undocumented even by IBM; this is a stub.
pub fn read_sysconfig<C: CpuBackend>(cpu: &mut C, _ctx: &SyscallCtx) -> Result<i32> {
    let args: Result<Vec<u32>> = (1..=8).map(|n| arg(cpu, n)).collect();
    debug!(target: "syscalls", "read_sysconfig({:?}) = 0", args?);
    Ok(0)
}
