//! Syscall dispatch: the far end of every `/unix` function descriptor's
//! trampoline. The loader and [`crate::unix_shim`] hand out descriptors
//! whose code pointer is [`crate::unix_shim::TRAMPOLINE_ADDR`]; when the
//! guest calls through one, the CPU backend's code hook fires, and
//! [`Dispatcher::dispatch`] reads the ordinal back out of r2 to figure out
//! which handler to run.

pub mod errno;
mod handlers;
mod open_flags;
mod stat;

use crate::cpu::CpuBackend;
use crate::error::{Error, Result};
use crate::mm::HEAP_ADDR;
use crate::unix_shim::UnixShim;
use log::warn;
use std::cell::Cell;

/// State a handler needs beyond the CPU registers: where to write `errno`,
/// and the guest heap cursor `brk`/`sbrk` maintain.
pub struct SyscallCtx {
    pub vm_errno: u32,
    pub heap_cursor: Cell<u32>,
}

impl SyscallCtx {
    pub fn new(vm_errno: u32) -> Self {
        SyscallCtx {
            vm_errno,
            heap_cursor: Cell::new(HEAP_ADDR),
        }
    }
}

/// Reads argument `n` (1-based) out of the AIX calling convention's
/// r3..r10 argument registers.
pub fn arg<C: CpuBackend>(cpu: &C, n: u8) -> Result<u32> {
    cpu.read_gpr(2 + n)
}

/// Writes `aix_errno` to the guest's `errno` cell.
pub fn set_errno<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx, aix_errno: i32) -> Result<()> {
    cpu.write_u32(ctx.vm_errno, aix_errno as u32)
}

/// Translates the host's last OS error to its AIX equivalent and writes it
/// to the guest's `errno` cell.
pub fn set_errno_from_host<C: CpuBackend>(cpu: &mut C, ctx: &SyscallCtx) -> Result<()> {
    let host_errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
    set_errno(cpu, ctx, errno::linux_to_aix(host_errno))
}

/// Reads a NUL-terminated string out of guest memory, one byte at a time,
/// up to `max_len` bytes.
pub fn read_cstr<C: CpuBackend>(cpu: &C, addr: u32, max_len: usize) -> Result<String> {
    let mut bytes = Vec::new();
    for i in 0..max_len as u32 {
        let mut b = [0u8; 1];
        cpu.read_mem(addr + i, &mut b)?;
        if b[0] == 0 {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        bytes.push(b[0]);
    }
    Err(Error::Malformed(format!(
        "string at {:#x} not NUL-terminated within {} bytes",
        addr, max_len
    )))
}

/// A single syscall handler: reads its arguments out of the guest's
/// registers via [`arg`], does its work, and returns the value r3 should
/// hold on return (errors are reported through [`set_errno`], not `Result`).
pub type HandlerFn<C> = fn(&mut C, &SyscallCtx) -> Result<i32>;

/// The names `/unix` exposes that this build implements, in the same order
/// their handler indices are assigned in. The index into this table is what
/// [`crate::unix_shim::SyscallRegistry::register`] records as each symbol's
/// `handler_index`.
pub fn handler_names() -> &'static [&'static str] {
    &[
        "kwrite",
        "kread",
        "kopen",
        "close",
        "_exit",
        "brk",
        "sbrk",
        ".__libc_sbrk",
        "getuidx",
        "getgidx",
        "kfcntl",
        "kioctl",
        "vmgetinfo",
        "statx",
        "fstatx",
        "__loadx",
        "read_sysconfig",
    ]
}

fn handler_table<C: CpuBackend>() -> Vec<HandlerFn<C>> {
    vec![
        handlers::kwrite::<C>,
        handlers::kread::<C>,
        handlers::kopen::<C>,
        handlers::close::<C>,
        handlers::exit::<C>,
        handlers::brk::<C>,
        handlers::sbrk::<C>,
        handlers::libc_sbrk::<C>,
        handlers::getuidx::<C>,
        handlers::getgidx::<C>,
        handlers::kfcntl::<C>,
        handlers::kioctl::<C>,
        handlers::vmgetinfo::<C>,
        handlers::statx::<C>,
        handlers::fstatx::<C>,
        handlers::loadx::<C>,
        handlers::read_sysconfig::<C>,
    ]
}

/// Looks up a syscall name's slot in [`handler_table`]. Passed to
/// [`crate::unix_shim::UnixShim::resolve_unix_import`] so every registered
/// descriptor knows, at link time, whether this build actually implements it.
pub fn handler_lookup(name: &str) -> Option<usize> {
    handler_names().iter().position(|n| *n == name)
}

/// Runs the handler for the ordinal currently parked in r2, the calling
/// convention every `/unix` function descriptor uses (not r3 — r3 is the
/// first real argument).
pub struct Dispatcher<C: CpuBackend> {
    table: Vec<HandlerFn<C>>,
    ctx: SyscallCtx,
}

impl<C: CpuBackend> Dispatcher<C> {
    pub fn new(shim: &UnixShim) -> Self {
        Dispatcher {
            table: handler_table(),
            ctx: SyscallCtx::new(shim.vm_errno),
        }
    }

    /// Reads the ordinal out of r2, resolves it against `shim`'s registry,
    /// runs the handler (if this build has one), and writes its return
    /// value to r3. Unimplemented syscalls log a warning and return -1 with
    /// `ENOSYS`; an ordinal past the end of the registry (no descriptor was
    /// ever handed out for it) is guest-visible only, not fatal, and also
    /// returns -1, without touching `errno`.
    pub fn dispatch(&self, cpu: &mut C, shim: &UnixShim) -> Result<()> {
        let ordinal = cpu.read_gpr(2)? as usize;
        let entry = match shim.syscalls.get(ordinal) {
            Some(entry) => entry,
            None => {
                warn!(target: "syscalls", "ordinal {} is past the end of the /unix registry", ordinal);
                return cpu.write_gpr(3, -1i32 as u32);
            }
        };

        let ret = if entry.handler_index >= 0 {
            let handler = self.table[entry.handler_index as usize];
            handler(cpu, &self.ctx)?
        } else {
            warn!(target: "syscalls", "unimplemented syscall '{}' (ordinal {})", entry.name, ordinal);
            set_errno(cpu, &self.ctx, errno::AIX_ENOSYS)?;
            -1
        };

        cpu.write_gpr(3, ret as u32)
    }
}
