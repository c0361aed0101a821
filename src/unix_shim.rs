//! `/unix` is the AIX kernel image, and is listed by the loader like any
//! other shared library libc depends on. Rather than "loading" it (there is
//! nothing sensible to load), this module fabricates the illusion: every
//! kernel symbol an importing object asks for gets a synthetic function
//! descriptor or a freshly allocated data page, as appropriate.

use crate::cpu::CpuBackend;
use crate::error::Result;
use crate::mm::{MemoryManager, UNIX_DATA_ADDR, UNIX_DATA_SIZE, UNIX_DESC_ADDR, UNIX_DESC_SIZE};
use crate::xcoff::{is_data_storage_class, is_function_storage_class, LoaderSymbol};
use log::{debug, warn};

/// The guest address every synthesized `/unix` function descriptor targets.
/// The dispatcher (`syscalls::Dispatcher`) installs its code hook here.
pub const TRAMPOLINE_ADDR: u32 = 0x3700;

/// A generic, otherwise-untouched value returned for `/unix` symbols this
/// shim has no idea how to classify. Guest code dereferencing it behaves
/// exactly as badly as it would on pathological input; that's intentional —
/// see spec.md §9 on the LIBPATH poison address for the sibling case in the
/// linker.
pub const UNRECOGNIZED_POISON: u32 = 1;

/// One registered `/unix` syscall: its symbol name, its slot in the handler
/// table (`-1` if this build doesn't implement it), and the guest address of
/// its 3-word function descriptor.
#[derive(Debug, Clone)]
pub struct SyscallEntry {
    pub name: String,
    pub handler_index: i32,
    pub descriptor_addr: u32,
}

/// Append-only registry of synthesized `/unix` function descriptors. The
/// ordinal (index into `entries`) doubles as the value written into each
/// descriptor's "TOC" word, which is what the dispatcher reads back out of
/// r2 to figure out which syscall fired.
pub struct SyscallRegistry {
    entries: Vec<SyscallEntry>,
    next_desc_addr: u32,
}

impl SyscallRegistry {
    pub fn new() -> Self {
        SyscallRegistry {
            entries: Vec::new(),
            next_desc_addr: UNIX_DESC_ADDR,
        }
    }

    pub fn entries(&self) -> &[SyscallEntry] {
        &self.entries
    }

    pub fn get(&self, ordinal: usize) -> Option<&SyscallEntry> {
        self.entries.get(ordinal)
    }

    /// Returns the existing descriptor for `name`, or creates a new one:
    /// allocates the next 12-byte slot, writes `<trampoline, ordinal,
    /// ordinal>` big-endian into it, and records whether `handler_lookup`
    /// recognizes the name.
    pub fn register<C: CpuBackend>(
        &mut self,
        mm: &mut MemoryManager<C>,
        name: &str,
        handler_lookup: impl Fn(&str) -> Option<usize>,
    ) -> Result<u32> {
        if let Some(existing) = self.entries.iter().find(|e| e.name == name) {
            debug!(target: "unix", "reusing /unix descriptor '{}': {:#x}", name, existing.descriptor_addr);
            return Ok(existing.descriptor_addr);
        }

        let ordinal = self.entries.len();
        let addr = self.next_desc_addr;
        mm.write_u32(addr, TRAMPOLINE_ADDR)?;
        mm.write_u32(addr + 4, ordinal as u32)?;
        mm.write_u32(addr + 8, ordinal as u32)?;
        self.next_desc_addr += 12;

        let handler_index = handler_lookup(name).map(|i| i as i32).unwrap_or(-1);
        if handler_index < 0 {
            debug!(target: "unix", "no handler implements '{}' yet", name);
        }
        debug!(target: "unix", "created /unix descriptor '{}': {:#x} (ordinal {})", name, addr, ordinal);

        self.entries.push(SyscallEntry {
            name: name.to_string(),
            handler_index,
            descriptor_addr: addr,
        });
        Ok(addr)
    }
}

impl Default for SyscallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only registry of `/unix` *data* symbols (`environ`, `errno`, and
/// anything else libc happens to import): one 4 KiB page per distinct name,
/// wasteful by design (spec.md §4.E) so a guest touching the page corrupts
/// only itself.
pub struct UnixDataRegistry {
    names: Vec<String>,
    addrs: Vec<u32>,
    next_addr: u32,
}

impl UnixDataRegistry {
    pub fn new() -> Self {
        UnixDataRegistry {
            names: Vec::new(),
            addrs: Vec::new(),
            next_addr: UNIX_DATA_ADDR,
        }
    }

    /// Looks up or allocates a page for `name`. Callers special-case
    /// `errno`/`_errno` and `environ`/`_environ` themselves before reaching
    /// here (those map to the pre-reserved `vm_errno`/`vm_environ` words,
    /// not a page out of this pool).
    pub fn lookup_or_allocate(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.names.iter().position(|n| n == name) {
            debug!(target: "unix", "reusing /unix data '{}': {:#x}", name, self.addrs[idx]);
            return self.addrs[idx];
        }
        let addr = self.next_addr;
        self.names.push(name.to_string());
        self.addrs.push(addr);
        self.next_addr += 4096;
        debug!(target: "unix", "creating /unix data for '{}': {:#x}", name, addr);
        addr
    }
}

impl Default for UnixDataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the two `/unix` registries plus the pre-reserved `errno`/`environ`
/// guest words, and fabricates the illusion of `/unix` as a loadable module
/// for the linker's import resolver.
pub struct UnixShim {
    pub syscalls: SyscallRegistry,
    pub data: UnixDataRegistry,
    pub vm_errno: u32,
    pub vm_environ: u32,
}

impl UnixShim {
    /// `vm_errno`/`vm_environ` are reserved by the memory manager's stack
    /// initialization (the topmost two stack words); the shim just needs to
    /// know where they ended up.
    pub fn new(vm_errno: u32, vm_environ: u32) -> Self {
        UnixShim {
            syscalls: SyscallRegistry::new(),
            data: UnixDataRegistry::new(),
            vm_errno,
            vm_environ,
        }
    }

    pub fn map_regions<C: CpuBackend>(&self, mm: &mut MemoryManager<C>) -> Result<()> {
        mm.cpu_mut().map(UNIX_DESC_ADDR, UNIX_DESC_SIZE as usize)?;
        mm.cpu_mut().map(UNIX_DATA_ADDR, UNIX_DATA_SIZE as usize)?;
        Ok(())
    }

    /// Resolves a single `L_IMPORT` loader symbol whose import file's `base`
    /// is `"unix"`: classifies it as a function or data symbol by storage
    /// mapping class, and returns the guest address the relocation pass
    /// should write in its place.
    pub fn resolve_unix_import<C: CpuBackend>(
        &mut self,
        mm: &mut MemoryManager<C>,
        sym: &LoaderSymbol,
        handler_lookup: impl Fn(&str) -> Option<usize>,
    ) -> Result<u32> {
        if is_function_storage_class(sym.storage_class) {
            return self.syscalls.register(mm, &sym.name, handler_lookup);
        }
        if is_data_storage_class(sym.storage_class) {
            return Ok(match sym.name.as_str() {
                "errno" | "_errno" => self.vm_errno,
                "environ" | "_environ" => self.vm_environ,
                _ => self.data.lookup_or_allocate(&sym.name),
            });
        }
        warn!(
            target: "unix",
            "class ({:#x}) for symbol ({}) not supported yet!",
            sym.storage_class, sym.name
        );
        Ok(UNRECOGNIZED_POISON)
    }
}
