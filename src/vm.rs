//! The orchestrator: wires the memory manager, the `/unix` shim, the syscall
//! dispatcher, the dynamic linker, milicode, and instruction-emulation
//! together into the startup and run-loop sequence a `qemu-user`-style
//! front end needs. Nothing here is clever; it's the glue that makes the
//! other modules' contracts line up.

use crate::cpu::{CpuBackend, SpecialReg, StopReason};
use crate::error::{Error, Result};
use crate::insn_emu;
use crate::linker::Linker;
use crate::milicode;
use crate::mm::{MemoryManager, VM_ENVIRON_ADDR, VM_ERRNO_ADDR};
use crate::syscalls::Dispatcher;
use crate::unix_shim::{UnixShim, TRAMPOLINE_ADDR};
use log::{error, info};
use std::path::PathBuf;

/// Runtime options the CLI front end collects and hands to [`run`]. Nothing
/// in this module interprets the tracing flags itself; they just gate
/// `log`'s `debug!`/`trace!` targets that the loader, shim, and dispatcher
/// already emit under `[loader]`, `[unix]`, `[syscalls]`.
pub struct VmConfig {
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub library_search_paths: Vec<PathBuf>,
}

/// Builds the guest address space, loads `config.binary` and its transitive
/// library closure, and runs the guest to completion.
///
/// Does not return on the guest's normal exit path: every implemented
/// syscall handler for `_exit` calls `std::process::exit` directly, so the
/// only way this function returns at all is a host-side abort (a fault, an
/// unresolved symbol, a malformed object) it reports as an `Err`.
pub fn run<C: CpuBackend>(cpu: C, config: &VmConfig) -> Result<()> {
    let mut mm = MemoryManager::new(cpu)?;

    let mut argv = vec![config.binary.display().to_string()];
    argv.extend(config.args.iter().cloned());
    mm.init_stack(&argv, &config.env)?;

    let mut shim = UnixShim::new(VM_ERRNO_ADDR, VM_ENVIRON_ADDR);
    shim.map_regions(&mut mm)?;

    init_registers(mm.cpu_mut())?;

    milicode::install(&mut mm)?;

    mm.cpu_mut().hook_code_at(TRAMPOLINE_ADDR)?;
    mm.cpu_mut().hook_instruction_emulation()?;

    // The linker borrows `mm` and `shim` only for as long as it takes to
    // load the main executable and its transitive library closure. Once we
    // have the entry point's code address, the borrow ends and both are
    // free for the run loop below.
    let entry_code_addr = {
        let mut linker = Linker::new(&mut mm, &mut shim, config.library_search_paths.clone());
        let main_identifier = linker.load(&config.binary.display().to_string(), None, true)?;

        let main = linker
            .get(&main_identifier)
            .expect("load() just inserted this identifier");
        // Read per spec.md §4.B, directly out of the on-disk function
        // descriptor rather than guest memory: `Linker::load` already wrote
        // the TOC anchor into r2 for the executable, and the main
        // executable's text/data deltas are always 0, so the file-level
        // code address already is the runtime one.
        main.image.entrypoint()?
    };

    let dispatcher: Dispatcher<C> = Dispatcher::new(&shim);

    info!(target: "vm", "starting guest at {:#010x}", entry_code_addr);
    run_loop(&mut mm, &dispatcher, &shim, entry_code_addr)
}

/// Poisons every general-purpose and special register the startup sequence
/// doesn't otherwise give a meaningful value, so that a guest reading an
/// uninitialized register gets an obviously-bogus, repeatable value instead
/// of whatever the core's reset state happens to be. `r1` (stack pointer),
/// `r3..r5` (argc/argv/envp) are set by [`MemoryManager::init_stack`] before
/// this runs, and `r2` (TOC anchor) is set by the linker once the main
/// executable is loaded after this runs — neither is touched here.
fn init_registers<C: CpuBackend>(cpu: &mut C) -> Result<()> {
    const POISON: u32 = 0xDEADBEEF;
    cpu.write_gpr(0, POISON)?;
    for r in 6..=25 {
        cpu.write_gpr(r, POISON)?;
    }
    cpu.write_special(SpecialReg::Lr, POISON)?;
    cpu.write_special(SpecialReg::Ctr, POISON)?;
    cpu.write_special(SpecialReg::Msr, 0x2000)?;
    Ok(())
}

/// Drives the CPU until it halts or faults, handling every suspension point
/// the run loop recognizes except the (out-of-scope) debug-stub single-step
/// hook: the syscall trampoline and the instruction-emulation trap both
/// resume execution after handling; a fault is fatal and reported with a
/// register dump.
fn run_loop<C: CpuBackend>(
    mm: &mut MemoryManager<C>,
    dispatcher: &Dispatcher<C>,
    shim: &UnixShim,
    entry_pc: u32,
) -> Result<()> {
    let mut pc = entry_pc;
    loop {
        let stop = mm.cpu_mut().run(pc)?;
        match stop {
            StopReason::Syscall => {
                dispatcher.dispatch(mm.cpu_mut(), shim)?;
                pc = mm.cpu().read_special(SpecialReg::Pc)?;
            }
            StopReason::InstructionEmulation => {
                insn_emu::handle(mm.cpu_mut())?;
                pc = mm.cpu().read_special(SpecialReg::Pc)?;
            }
            StopReason::Fault => {
                error!(target: "vm", "guest fault\n{}", mm.cpu().dump_registers());
                return Err(Error::Cpu("guest faulted on an unmapped or protected access".into()));
            }
            StopReason::Halted => {
                info!(target: "vm", "guest halted\n{}", mm.cpu().dump_registers());
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::FakeCpu;

    #[test]
    fn init_registers_poisons_scratch_regs_without_touching_abi_regs() {
        let mut cpu = FakeCpu::new();
        cpu.write_gpr(1, 0x1234).unwrap();
        cpu.write_gpr(2, 0x5678).unwrap();
        cpu.write_gpr(3, 1).unwrap();
        cpu.write_gpr(4, 0x9abc).unwrap();
        cpu.write_gpr(5, 0xdef0).unwrap();

        init_registers(&mut cpu).unwrap();

        assert_eq!(cpu.read_gpr(0).unwrap(), 0xDEADBEEF);
        for r in 6..=25 {
            assert_eq!(cpu.read_gpr(r).unwrap(), 0xDEADBEEF, "r{} not poisoned", r);
        }
        assert_eq!(cpu.read_special(SpecialReg::Lr).unwrap(), 0xDEADBEEF);
        assert_eq!(cpu.read_special(SpecialReg::Ctr).unwrap(), 0xDEADBEEF);
        assert_eq!(cpu.read_special(SpecialReg::Msr).unwrap(), 0x2000);

        // r1..r5 are the stack/argc/argv/envp registers init_stack already
        // set; init_registers must leave them alone.
        assert_eq!(cpu.read_gpr(1).unwrap(), 0x1234);
        assert_eq!(cpu.read_gpr(2).unwrap(), 0x5678);
        assert_eq!(cpu.read_gpr(3).unwrap(), 1);
        assert_eq!(cpu.read_gpr(4).unwrap(), 0x9abc);
        assert_eq!(cpu.read_gpr(5).unwrap(), 0xdef0);
    }
}
