//! The guest memory manager: fixed address-space partitioning, the main
//! executable's and libraries' `.text`/`.data`/`.bss` mapping, and the
//! `deltas[3]` bookkeeping dynamic linking relies on.

use crate::cpu::CpuBackend;
use crate::error::{Error, Result};
use crate::xcoff::XcoffImage;
use log::debug;

pub const PAGE_SIZE: u32 = 4096;

pub const EXEC_TEXT_SIZE: u32 = 0x0100_0000; // 16 MiB
pub const EXEC_DATA_SIZE: u32 = 0x0100_0000; // 16 MiB
pub const TEXT_SIZE: u32 = 0x1000_0000; // 256 MiB
pub const DATA_SIZE: u32 = 0x1000_0000; // 256 MiB

pub const UNIX_DATA_ADDR: u32 = 0x0010_0000; // 1 MiB
pub const UNIX_DATA_SIZE: u32 = 0x0010_0000;

pub const UNIX_MILI_ADDR: u32 = 0xD000;
pub const UNIX_MILI_SIZE: u32 = 0x3000; // 3x 4KiB pages

pub const TEXT_START: u32 = 0x1000_0000;
pub const TEXT_END: u32 = TEXT_START + TEXT_SIZE;
pub const DATA_START: u32 = 0x2000_0000;
pub const DATA_END: u32 = DATA_START + DATA_SIZE;

pub const STACK_ADDR: u32 = 0x3000_0000;
pub const STACK_SIZE: u32 = 32 * 1024 * 1024;

pub const UNIX_DESC_ADDR: u32 = 0x0F00_0000;
pub const UNIX_DESC_SIZE: u32 = 0x0010_0000; // 1 MiB

/// The guest heap's starting cursor, consumed by `syscalls::brk`. Chosen
/// just past the library bump-allocation region so `sbrk` growth can never
/// collide with a dynamically loaded library's data.
pub const HEAP_ADDR: u32 = DATA_END;

/// The guest word `/unix`'s synthesized `errno`/`environ` imports resolve to
/// (`unix_shim::UnixShim` just needs to know where they ended up). Carved out
/// of the top of the stack region so they need no mapping of their own.
pub const VM_ERRNO_ADDR: u32 = STACK_ADDR - 4;
pub const VM_ENVIRON_ADDR: u32 = STACK_ADDR - 8;

/// Bytes of untouched gap kept below the reserved `errno`/`environ` words
/// before argv/envp string storage begins.
const STACK_GUARD_GAP: u32 = 256;

pub fn align_up(x: u32) -> u32 {
    (x + (PAGE_SIZE - 1)) & !(PAGE_SIZE - 1)
}

/// Index into [`Deltas`]: runtime address minus XCOFF-declared virtual
/// address, one per segment kind. All zero for the main executable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deltas {
    pub text: u32,
    pub data: u32,
    pub bss: u32,
}

/// Where an object ended up in the guest address space, and by how much its
/// linked-in addresses must be adjusted to match.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadedRegions {
    pub text_start: u32,
    pub data_start: u32,
    pub bss_start: u32,
    pub deltas: Deltas,
}

fn safe_add(a: u32, b: u32) -> Result<u32> {
    a.checked_add(b)
        .ok_or_else(|| Error::Malformed("address computation overflowed u32".into()))
}

fn validate_data_bss_layout(data_vaddr: u32, data_size: u32, bss_vaddr: u32, bss_size: u32) -> Result<()> {
    if bss_vaddr < data_vaddr {
        return Err(Error::Malformed(".bss starts before .data".into()));
    }
    let data_end = safe_add(data_vaddr, data_size)?;
    if bss_vaddr < data_end {
        return Err(Error::Malformed(".bss overlaps .data".into()));
    }
    let _ = bss_size;
    Ok(())
}

/// Memory manager generic over the CPU backend it drives, so tests can swap
/// in a fake implementation of [`CpuBackend`] in place of a real core.
pub struct MemoryManager<C: CpuBackend> {
    cpu: C,
    next_text_base: u32,
    next_data_base: u32,
}

impl<C: CpuBackend> MemoryManager<C> {
    pub fn new(mut cpu: C) -> Result<Self> {
        cpu.map(STACK_ADDR - STACK_SIZE, STACK_SIZE as usize)?;
        cpu.hook_invalid_mem()?;
        Ok(MemoryManager {
            cpu,
            next_text_base: TEXT_START + EXEC_TEXT_SIZE,
            next_data_base: DATA_START + EXEC_DATA_SIZE,
        })
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }
    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    fn alloc_memory(
        &mut self,
        text_runtime: u32,
        text_map_size: u32,
        text_limit: u32,
        data_runtime: u32,
        data_map_size: u32,
        data_limit: u32,
        bss_runtime: u32,
        bss_size: u32,
        deltas: Deltas,
    ) -> Result<LoadedRegions> {
        let text_end = safe_add(text_runtime, text_map_size)?;
        if text_end > text_limit {
            return Err(Error::Malformed(format!(
                "text region exceeds limit ({:#x} > {:#x})",
                text_end, text_limit
            )));
        }
        let data_end = safe_add(data_runtime, data_map_size)?;
        if data_end > data_limit {
            return Err(Error::Malformed(format!(
                "data region exceeds limit ({:#x} > {:#x})",
                data_end, data_limit
            )));
        }

        self.cpu.map(text_runtime, text_map_size as usize)?;
        self.cpu.map(data_runtime, data_map_size as usize)?;

        if bss_size > 0 {
            let zeros = vec![0u8; bss_size as usize];
            self.cpu.write_mem(bss_runtime, &zeros)?;
        }

        Ok(LoadedRegions {
            text_start: text_runtime,
            data_start: data_runtime,
            bss_start: bss_runtime,
            deltas,
        })
    }

    /// Maps the main executable's `.text`/`.data`/`.bss` at the addresses
    /// the XCOFF file itself requests — no relocation for the main executable.
    pub fn alloc_main_exec_memory(
        &mut self,
        text_vaddr: u32,
        text_size: u32,
        data_vaddr: u32,
        data_size: u32,
        bss_vaddr: u32,
        bss_size: u32,
    ) -> Result<LoadedRegions> {
        if text_vaddr < TEXT_START || text_vaddr >= TEXT_START + EXEC_TEXT_SIZE {
            return Err(Error::Malformed(format!(
                "main exec .text at {:#x} outside the executable range",
                text_vaddr
            )));
        }
        validate_data_bss_layout(data_vaddr, data_size, bss_vaddr, bss_size)?;
        if data_vaddr < DATA_START || data_vaddr >= DATA_START + EXEC_DATA_SIZE {
            return Err(Error::Malformed(format!(
                "main exec .data at {:#x} outside the executable range",
                data_vaddr
            )));
        }

        self.alloc_memory(
            TEXT_START,
            EXEC_TEXT_SIZE,
            TEXT_END,
            DATA_START,
            EXEC_DATA_SIZE,
            DATA_END,
            bss_vaddr,
            bss_size,
            Deltas::default(),
        )
    }

    /// Bump-allocates room for a library's `.text`/`.data`/`.bss` and computes
    /// its per-segment deltas for the linker's relocation pass.
    pub fn alloc_library_memory(
        &mut self,
        text_vaddr: u32,
        text_size: u32,
        data_vaddr: u32,
        data_size: u32,
        bss_vaddr: u32,
        bss_size: u32,
    ) -> Result<LoadedRegions> {
        validate_data_bss_layout(data_vaddr, data_size, bss_vaddr, bss_size)?;

        let tsize = align_up(text_size);
        if tsize < text_size {
            return Err(Error::Malformed("library .text size overflowed after alignment".into()));
        }

        let data_end = safe_add(bss_vaddr, bss_size)?;
        let raw_dsize = data_end - data_vaddr;
        let dsize = align_up(raw_dsize);
        if dsize < raw_dsize {
            return Err(Error::Malformed(
                "library .data+.bss size overflowed after alignment".into(),
            ));
        }

        let text_runtime = self.next_text_base;
        let data_runtime = self.next_data_base;

        let text_delta = text_runtime.wrapping_sub(text_vaddr);
        let data_delta = data_runtime.wrapping_sub(data_vaddr);
        let bss_runtime = bss_vaddr.wrapping_add(data_delta);
        let bss_delta = bss_runtime.wrapping_sub(bss_vaddr);

        let regions = self.alloc_memory(
            text_runtime,
            tsize,
            TEXT_END,
            data_runtime,
            dsize,
            DATA_END,
            bss_runtime,
            bss_size,
            Deltas {
                text: text_delta,
                data: data_delta,
                bss: bss_delta,
            },
        )?;

        self.next_text_base += tsize;
        self.next_data_base += dsize;
        debug!(
            "mm: loaded library text@{:#x} data@{:#x} (deltas text={:#x} data={:#x} bss={:#x})",
            text_runtime, data_runtime, text_delta, data_delta, bss_delta
        );

        Ok(regions)
    }

    /// Writes an image's `.text` section into guest memory at `regions.text_start`
    /// if `is_exe` is false, or at the section's own recorded virtual address
    /// if it's the main executable (which was mapped at that same address).
    pub fn write_text(&mut self, image: &XcoffImage, regions: &LoadedRegions, is_exe: bool) -> Result<()> {
        let aux = image
            .aux_header
            .as_ref()
            .ok_or_else(|| Error::Malformed("xcoff object has no auxiliary header".into()))?;
        let sec = image
            .sections
            .get(aux.o_sntext.checked_sub(1).ok_or_else(|| {
                Error::Malformed("invalid .text section number".into())
            })? as usize)
            .ok_or_else(|| Error::Malformed("invalid .text section number".into()))?;
        let data = image.section_data(sec)?;
        let vaddr = if is_exe { sec.s_vaddr } else { regions.text_start };
        self.cpu.write_mem(vaddr, data)
    }

    /// As [`Self::write_text`], but for `.data`.
    pub fn write_data(&mut self, image: &XcoffImage, regions: &LoadedRegions, is_exe: bool) -> Result<()> {
        let aux = image
            .aux_header
            .as_ref()
            .ok_or_else(|| Error::Malformed("xcoff object has no auxiliary header".into()))?;
        let sec = image
            .sections
            .get(aux.o_sndata.checked_sub(1).ok_or_else(|| {
                Error::Malformed("invalid .data section number".into())
            })? as usize)
            .ok_or_else(|| Error::Malformed("invalid .data section number".into()))?;
        let data = image.section_data(sec)?;
        let vaddr = if is_exe { sec.s_vaddr } else { regions.data_start };
        self.cpu.write_mem(vaddr, data)
    }

    pub fn read_u32(&self, vaddr: u32) -> Result<u32> {
        self.cpu.read_u32(vaddr)
    }

    pub fn write_u32(&mut self, vaddr: u32, value: u32) -> Result<()> {
        self.cpu.write_u32(vaddr, value)
    }

    /// Lays out the initial stack: the reserved `errno`/`environ` words at
    /// the very top, a guard gap, argv/envp string bodies descending below
    /// that, then the (16-byte aligned) argv and envp pointer arrays below
    /// the strings. Leaves r1/r3/r4/r5 set the way AIX's startup code expects
    /// (stack pointer, argc, argv, envp) and `VM_ENVIRON_ADDR` pointing at
    /// the envp array, the same word `/unix`'s `environ` import resolves to.
    pub fn init_stack(&mut self, argv: &[String], envp: &[String]) -> Result<()> {
        self.cpu.write_u32(VM_ERRNO_ADDR, 0)?;

        let mut cursor = VM_ENVIRON_ADDR - STACK_GUARD_GAP;

        let mut argv_ptrs = Vec::with_capacity(argv.len() + 1);
        for s in argv {
            let mut buf = s.as_bytes().to_vec();
            buf.push(0);
            cursor -= buf.len() as u32;
            self.cpu.write_mem(cursor, &buf)?;
            argv_ptrs.push(cursor);
        }
        argv_ptrs.push(0);

        let mut envp_ptrs = Vec::with_capacity(envp.len() + 1);
        for s in envp {
            let mut buf = s.as_bytes().to_vec();
            buf.push(0);
            cursor -= buf.len() as u32;
            self.cpu.write_mem(cursor, &buf)?;
            envp_ptrs.push(cursor);
        }
        envp_ptrs.push(0);

        cursor &= !0xF;

        cursor -= (envp_ptrs.len() * 4) as u32;
        let envp_array_addr = cursor;
        for (i, &p) in envp_ptrs.iter().enumerate() {
            self.cpu.write_u32(envp_array_addr + (i as u32) * 4, p)?;
        }

        cursor -= (argv_ptrs.len() * 4) as u32;
        let argv_array_addr = cursor;
        for (i, &p) in argv_ptrs.iter().enumerate() {
            self.cpu.write_u32(argv_array_addr + (i as u32) * 4, p)?;
        }

        cursor &= !0xF;

        self.cpu.write_u32(VM_ENVIRON_ADDR, envp_array_addr)?;
        self.cpu.write_gpr(1, cursor)?;
        self.cpu.write_gpr(3, argv.len() as u32)?;
        self.cpu.write_gpr(4, argv_array_addr)?;
        self.cpu.write_gpr(5, envp_array_addr)?;

        debug!(
            "mm: stack initialized sp={:#x} argc={} argv={:#x} envp={:#x}",
            cursor,
            argv.len(),
            argv_array_addr,
            envp_array_addr
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::FakeCpu;

    #[test]
    fn main_exec_gets_zero_deltas() {
        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        let regions = mm
            .alloc_main_exec_memory(TEXT_START, 0x1000, DATA_START, 0x100, DATA_START + 0x1000, 0x10)
            .unwrap();
        assert_eq!(regions.deltas, Deltas::default());
        assert_eq!(regions.text_start, TEXT_START);
        assert_eq!(regions.data_start, DATA_START);
    }

    #[test]
    fn rejects_main_exec_text_outside_range() {
        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        let err = mm
            .alloc_main_exec_memory(0x1000, 0x100, DATA_START, 0x100, DATA_START + 0x1000, 0x10)
            .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn library_gets_nonzero_deltas_and_bumps_next_base() {
        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        let first = mm.alloc_library_memory(0x1000, 0x100, 0x2000, 0x100, 0x2100, 0x10).unwrap();
        assert_ne!(first.deltas.text, 0);
        assert_eq!(first.text_start, TEXT_START + EXEC_TEXT_SIZE);

        let second = mm.alloc_library_memory(0x1000, 0x100, 0x2000, 0x100, 0x2100, 0x10).unwrap();
        assert!(second.text_start > first.text_start);
    }

    #[test]
    fn rejects_bss_before_data() {
        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        let err = mm.alloc_library_memory(0x1000, 0x100, 0x2000, 0x100, 0x1000, 0x10).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn init_stack_sets_up_argc_argv_envp() {
        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        let argv = vec!["printf".to_string(), "hello".to_string()];
        let envp = vec!["PATH=/bin".to_string()];
        mm.init_stack(&argv, &envp).unwrap();

        assert_eq!(mm.cpu().read_gpr(3).unwrap(), 2);
        let argv_addr = mm.cpu().read_gpr(4).unwrap();
        let envp_addr = mm.cpu().read_gpr(5).unwrap();
        let sp = mm.cpu().read_gpr(1).unwrap();
        assert_eq!(sp % 16, 0);
        assert!(sp < argv_addr);
        assert!(argv_addr < envp_addr);

        let p0 = mm.read_u32(argv_addr).unwrap();
        let p1 = mm.read_u32(argv_addr + 4).unwrap();
        let p_term = mm.read_u32(argv_addr + 8).unwrap();
        assert_eq!(p_term, 0);

        let mut buf = [0u8; 6];
        mm.cpu().read_mem(p0, &mut buf).unwrap();
        assert_eq!(&buf, b"printf");
        let mut buf2 = [0u8; 5];
        mm.cpu().read_mem(p1, &mut buf2).unwrap();
        assert_eq!(&buf2, b"hello");

        let e0 = mm.read_u32(envp_addr).unwrap();
        let e_term = mm.read_u32(envp_addr + 4).unwrap();
        assert_eq!(e_term, 0);
        let mut ebuf = [0u8; 9];
        mm.cpu().read_mem(e0, &mut ebuf).unwrap();
        assert_eq!(&ebuf, b"PATH=/bin");

        assert_eq!(mm.read_u32(VM_ENVIRON_ADDR).unwrap(), envp_addr);
        assert_eq!(mm.read_u32(VM_ERRNO_ADDR).unwrap(), 0);
    }
}
