//! Polyfills PowerPC ISA instructions the emulated CPU core doesn't
//! implement itself. Executing one raises the hypervisor-emulation-assist
//! exception (`POWERPC_EXCP_HV_EMU`); [`crate::cpu::CpuBackend::hook_instruction_emulation`]
//! stops the run before any damage is done, and [`handle`] decodes the
//! offending word and carries out its effect by hand.

use crate::cpu::{CpuBackend, SpecialReg};
use crate::error::{Error, Result};
use log::warn;

fn get_opcode(insn: u32) -> u32 {
    (insn >> 26) & 0x3F
}

fn get_subop(insn: u32) -> u32 {
    (insn >> 1) & 0x3FF
}

/// `cmpb rA,rS,rB` (opcode 31, subop 508): compares `rS` and `rB` byte by
/// byte, writing `0xFF` into each lane of `rA` where the bytes matched and
/// `0x00` where they didn't. Added in POWER6/ISA 2.05, used heavily by
/// glibc-alike `strlen`/`memchr` style loops — which is exactly the kind of
/// code AIX binaries built against a newer toolchain than this core's ISA
/// profile tend to contain.
fn emu_cmpb<C: CpuBackend>(cpu: &mut C, insn: u32) -> Result<()> {
    let rs = ((insn >> 21) & 0x1F) as u8;
    let ra = ((insn >> 16) & 0x1F) as u8;
    let rb = ((insn >> 11) & 0x1F) as u8;

    let s = cpu.read_gpr(rs)?.to_be_bytes();
    let b = cpu.read_gpr(rb)?.to_be_bytes();
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = if s[i] == b[i] { 0xFF } else { 0x00 };
    }
    cpu.write_gpr(ra, u32::from_be_bytes(out))
}

/// Decodes and carries out the instruction the guest just trapped on. The
/// core has already advanced the program counter past it by the time the
/// hook fires, so the faulting word lives at `pc - 4`.
///
/// Only `cmpb` is polyfilled. Any other opcode/subop pair this build doesn't
/// recognize is reported as unsupported rather than silently skipped —
/// skipping it would leave the guest's register file wrong in a way that's
/// much harder to diagnose than a clean abort.
pub fn handle<C: CpuBackend>(cpu: &mut C) -> Result<()> {
    let pc = cpu.read_special(SpecialReg::Pc)?;
    let insn_addr = pc.wrapping_sub(4);
    let insn = cpu.read_u32(insn_addr)?;

    let opcode = get_opcode(insn);
    let subop = get_subop(insn);

    match (opcode, subop) {
        (31, 508) => emu_cmpb(cpu, insn),
        _ => {
            warn!(
                target: "insn_emu",
                "unhandled trapped instruction {:#010x} at {:#x} (opcode={}, subop={})",
                insn, insn_addr, opcode, subop
            );
            Err(Error::Unsupported(format!(
                "no emulation for instruction {:#010x} (opcode={}, subop={}) at {:#x}",
                insn, opcode, subop, insn_addr
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::FakeCpu;

    fn encode_cmpb(ra: u8, rs: u8, rb: u8) -> u32 {
        (31 << 26) | ((rs as u32) << 21) | ((ra as u32) << 16) | ((rb as u32) << 11) | (508 << 1)
    }

    #[test]
    fn cmpb_matches_byte_lanes() {
        let mut cpu = FakeCpu::new();
        cpu.map(0x1000, 0x1000).unwrap();
        let insn = encode_cmpb(6, 3, 4);
        cpu.write_mem(0x1000, &insn.to_be_bytes()).unwrap();
        cpu.write_special(SpecialReg::Pc, 0x1004).unwrap();
        cpu.write_gpr(3, 0xAA11BB22).unwrap();
        cpu.write_gpr(4, 0xAA00BB00).unwrap();

        handle(&mut cpu).unwrap();
        assert_eq!(cpu.read_gpr(6).unwrap(), 0xFF00FF00);
    }

    #[test]
    fn cmpb_matches_only_the_byte_lanes_that_are_equal() {
        let mut cpu = FakeCpu::new();
        cpu.map(0x1000, 0x1000).unwrap();
        let insn = encode_cmpb(5, 3, 4);
        cpu.write_mem(0x1000, &insn.to_be_bytes()).unwrap();
        cpu.write_special(SpecialReg::Pc, 0x1004).unwrap();
        cpu.write_gpr(3, 0x11AA33BB).unwrap();
        cpu.write_gpr(4, 0x11CC33DD).unwrap();

        handle(&mut cpu).unwrap();
        // byte 0: 0x11==0x11 -> 0xFF; byte 1: 0xAA!=0xCC -> 0x00;
        // byte 2: 0x33==0x33 -> 0xFF; byte 3: 0xBB!=0xDD -> 0x00.
        assert_eq!(cpu.read_gpr(5).unwrap(), 0xFF00FF00);
    }

    #[test]
    fn unknown_instruction_is_unsupported() {
        let mut cpu = FakeCpu::new();
        cpu.map(0x1000, 0x1000).unwrap();
        cpu.write_mem(0x1000, &0u32.to_be_bytes()).unwrap();
        cpu.write_special(SpecialReg::Pc, 0x1004).unwrap();
        let err = handle(&mut cpu).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
