//! The boundary between this crate and an external PowerPC-32 big-endian
//! cooperative CPU core.
//!
//! Everything above this module — the memory manager, the `/unix` shim, the
//! syscall dispatcher, the instruction-emulation hooks — is written against
//! the [`CpuBackend`] trait, not against any particular emulation library.
//! The only shipped implementation, [`UnicornBackend`], wraps `unicorn-engine`
//! (a Rust binding for Unicorn), the same CPU core the project this crate is
//! based on links against.

use crate::error::Result;

/// General purpose register index, r0..r31.
pub type Gpr = u8;

/// Special register this crate needs to read or write directly. Unicorn
/// exposes many more; we only name the ones the loader/shim/syscalls touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialReg {
    Pc,
    Lr,
    Ctr,
    Msr,
    Cr,
}

/// The reason execution stopped and control returned to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The guest reached the syscall trampoline and a hook handled it.
    Syscall,
    /// The guest hit the hypervisor-emulation-assist trap (an instruction
    /// this emulator polyfills rather than letting the core execute).
    InstructionEmulation,
    /// The guest faulted (unmapped access, protection violation, ...).
    Fault,
    /// The emulated CPU halted normally (e.g. ran off the end of a region).
    Halted,
}

/// The contract this crate needs from a host-side CPU emulator.
///
/// Implementors own the guest's virtual address space and register file;
/// every method here is expressed in terms of guest (not host) addresses.
pub trait CpuBackend {
    /// Reserves `size` bytes of guest address space starting at `addr`,
    /// with read/write/execute permission (the original project always maps
    /// `UC_PROT_ALL`; this crate does the same since XCOFF gives us no
    /// per-segment protection bits to honor).
    fn map(&mut self, addr: u32, size: usize) -> Result<()>;

    fn read_mem(&self, addr: u32, buf: &mut [u8]) -> Result<()>;
    fn write_mem(&mut self, addr: u32, buf: &[u8]) -> Result<()>;

    fn read_u32(&self, addr: u32) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_mem(addr, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<()> {
        self.write_mem(addr, &value.to_be_bytes())
    }

    fn read_gpr(&self, reg: Gpr) -> Result<u32>;
    fn write_gpr(&mut self, reg: Gpr, value: u32) -> Result<()>;

    fn read_special(&self, reg: SpecialReg) -> Result<u32>;
    fn write_special(&mut self, reg: SpecialReg, value: u32) -> Result<()>;

    /// Installs a hook that fires when the guest executes code at `address`
    /// (used for the syscall trampoline and milicode entry points).
    fn hook_code_at(&mut self, address: u32) -> Result<()>;

    /// Installs the hypervisor-emulation-assist trap handler (fires on
    /// `POWERPC_EXCP_HV_EMU`, exception number 96).
    fn hook_instruction_emulation(&mut self) -> Result<()>;

    /// Installs the invalid-memory-access troubleshooting hook.
    fn hook_invalid_mem(&mut self) -> Result<()>;

    /// Begins execution at `pc` until a hook or fault stops it.
    fn run(&mut self, pc: u32) -> Result<StopReason>;

    /// Dumps registers for diagnostics (mirrors the original's `register_dump`).
    fn dump_registers(&self) -> String;
}

#[cfg(feature = "unicorn-backend")]
pub use unicorn_backend::UnicornBackend;

#[cfg(feature = "unicorn-backend")]
mod unicorn_backend {
    use super::*;
    use crate::error::Error;
    use log::warn;
    use std::cell::RefCell;
    use std::rc::Rc;
    use unicorn_engine::unicorn_const::{Arch, HookType, Mode, Permission};
    use unicorn_engine::{RegisterPPC, Unicorn};

    /// The PowerPC hypervisor-emulation-assist exception number. Unicorn's
    /// PPC core raises this through the generic interrupt hook; there is no
    /// dedicated "unsupported instruction" hook type.
    const POWERPC_EXCP_HV_EMU: u32 = 96;

    /// Shared between the backend and its hook closures, since Unicorn hooks
    /// are plain `'static` closures with no way to borrow back into the
    /// `UnicornBackend` that installed them. `run()` clears this before
    /// starting and reads it back after `emu_start` returns.
    #[derive(Default)]
    struct HookState {
        stop_reason: Option<StopReason>,
    }

    /// The concrete [`CpuBackend`] used by the `aix-user` binary: a 32-bit,
    /// big-endian PowerPC core provided by Unicorn.
    pub struct UnicornBackend<'a> {
        uc: Unicorn<'a, ()>,
        state: Rc<RefCell<HookState>>,
    }

    impl<'a> UnicornBackend<'a> {
        pub fn new() -> Result<Self> {
            let uc = Unicorn::new(Arch::PPC, Mode::PPC32 | Mode::BIG_ENDIAN)
                .map_err(|e| Error::Cpu(format!("uc_open failed: {:?}", e)))?;
            Ok(UnicornBackend {
                uc,
                state: Rc::new(RefCell::new(HookState::default())),
            })
        }

        fn gpr_register(reg: Gpr) -> Result<RegisterPPC> {
            use RegisterPPC::*;
            Ok(match reg {
                0 => PPC_REG_0,
                1 => PPC_REG_1,
                2 => PPC_REG_2,
                3 => PPC_REG_3,
                4 => PPC_REG_4,
                5 => PPC_REG_5,
                6 => PPC_REG_6,
                7 => PPC_REG_7,
                8 => PPC_REG_8,
                9 => PPC_REG_9,
                10 => PPC_REG_10,
                11 => PPC_REG_11,
                12 => PPC_REG_12,
                13 => PPC_REG_13,
                14 => PPC_REG_14,
                15 => PPC_REG_15,
                16 => PPC_REG_16,
                17 => PPC_REG_17,
                18 => PPC_REG_18,
                19 => PPC_REG_19,
                20 => PPC_REG_20,
                21 => PPC_REG_21,
                22 => PPC_REG_22,
                23 => PPC_REG_23,
                24 => PPC_REG_24,
                25 => PPC_REG_25,
                26 => PPC_REG_26,
                27 => PPC_REG_27,
                28 => PPC_REG_28,
                29 => PPC_REG_29,
                30 => PPC_REG_30,
                31 => PPC_REG_31,
                other => return Err(Error::Unsupported(format!("no such GPR: r{}", other))),
            })
        }
    }

    impl<'a> CpuBackend for UnicornBackend<'a> {
        fn map(&mut self, addr: u32, size: usize) -> Result<()> {
            self.uc
                .mem_map(addr as u64, size, Permission::ALL)
                .map_err(|e| Error::Cpu(format!("uc_mem_map({:#x}, {:#x}) failed: {:?}", addr, size, e)))
        }

        fn read_mem(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
            self.uc
                .mem_read(addr as u64, buf)
                .map_err(|e| Error::Cpu(format!("uc_mem_read({:#x}) failed: {:?}", addr, e)))
        }

        fn write_mem(&mut self, addr: u32, buf: &[u8]) -> Result<()> {
            self.uc
                .mem_write(addr as u64, buf)
                .map_err(|e| Error::Cpu(format!("uc_mem_write({:#x}) failed: {:?}", addr, e)))
        }

        fn read_gpr(&self, reg: Gpr) -> Result<u32> {
            let r = Self::gpr_register(reg)?;
            Ok(self
                .uc
                .reg_read(r)
                .map_err(|e| Error::Cpu(format!("reg_read failed: {:?}", e)))? as u32)
        }

        fn write_gpr(&mut self, reg: Gpr, value: u32) -> Result<()> {
            let r = Self::gpr_register(reg)?;
            self.uc
                .reg_write(r, value as u64)
                .map_err(|e| Error::Cpu(format!("reg_write failed: {:?}", e)))
        }

        fn read_special(&self, reg: SpecialReg) -> Result<u32> {
            use RegisterPPC::*;
            let r = match reg {
                SpecialReg::Pc => PPC_REG_PC,
                SpecialReg::Lr => PPC_REG_LR,
                SpecialReg::Ctr => PPC_REG_CTR,
                SpecialReg::Msr => PPC_REG_MSR,
                SpecialReg::Cr => PPC_REG_CR0,
            };
            Ok(self
                .uc
                .reg_read(r)
                .map_err(|e| Error::Cpu(format!("reg_read failed: {:?}", e)))? as u32)
        }

        fn write_special(&mut self, reg: SpecialReg, value: u32) -> Result<()> {
            use RegisterPPC::*;
            let r = match reg {
                SpecialReg::Pc => PPC_REG_PC,
                SpecialReg::Lr => PPC_REG_LR,
                SpecialReg::Ctr => PPC_REG_CTR,
                SpecialReg::Msr => PPC_REG_MSR,
                SpecialReg::Cr => PPC_REG_CR0,
            };
            self.uc
                .reg_write(r, value as u64)
                .map_err(|e| Error::Cpu(format!("reg_write failed: {:?}", e)))
        }

        fn hook_code_at(&mut self, address: u32) -> Result<()> {
            let state = self.state.clone();
            self.uc
                .add_code_hook(address as u64, address as u64, move |uc, _addr, _size| {
                    state.borrow_mut().stop_reason = Some(StopReason::Syscall);
                    uc.emu_stop().ok();
                })
                .map(|_| ())
                .map_err(|e| Error::Cpu(format!("add_code_hook failed: {:?}", e)))
        }

        fn hook_instruction_emulation(&mut self) -> Result<()> {
            let state = self.state.clone();
            self.uc
                .add_intr_hook(move |uc, intno| {
                    if intno == POWERPC_EXCP_HV_EMU {
                        state.borrow_mut().stop_reason = Some(StopReason::InstructionEmulation);
                        uc.emu_stop().ok();
                    }
                })
                .map(|_| ())
                .map_err(|e| Error::Cpu(format!("add_intr_hook failed: {:?}", e)))
        }

        fn hook_invalid_mem(&mut self) -> Result<()> {
            let state = self.state.clone();
            self.uc
                .add_mem_hook(
                    HookType::MEM_READ_UNMAPPED
                        | HookType::MEM_WRITE_UNMAPPED
                        | HookType::MEM_READ_PROT
                        | HookType::MEM_WRITE_PROT,
                    0,
                    u32::MAX as u64,
                    move |_uc, mem_type, addr, size, value| {
                        warn!(target: "mm", "invalid {:?} at {:#x} size={} value={:#x}", mem_type, addr, size, value);
                        state.borrow_mut().stop_reason = Some(StopReason::Fault);
                        false
                    },
                )
                .map(|_| ())
                .map_err(|e| Error::Cpu(format!("add_mem_hook failed: {:?}", e)))
        }

        fn run(&mut self, pc: u32) -> Result<StopReason> {
            self.state.borrow_mut().stop_reason = None;
            self.uc
                .emu_start(pc as u64, 0, 0, 0)
                .map_err(|e| Error::Cpu(format!("uc_emu_start failed: {:?}", e)))?;
            Ok(self.state.borrow_mut().stop_reason.take().unwrap_or(StopReason::Halted))
        }

        fn dump_registers(&self) -> String {
            let mut out = String::new();
            for r in 0u8..32 {
                if let Ok(v) = self.read_gpr(r) {
                    out.push_str(&format!("r{:<2} = {:#010x}\n", r, v));
                }
            }
            out
        }
    }
}
