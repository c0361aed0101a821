//! AIX milicode: a handful of libc primitives (`memcmp`, `strcmp`, `strlen`,
//! `memmove`, `strcpy`) that real AIX kernels expose as fixed-address,
//! hand-tuned machine code rather than ordinary exported functions. Any
//! binary built against the system libc can branch straight to these
//! addresses without going through the loader at all, so this crate has to
//! make sure something sensible lives there before guest code runs, even
//! though nothing ever "imports" milicode by name.
//!
//! The five routines below are assembled from a small symbolic instruction
//! list rather than hand-transcribed opcode bytes — easier to audit, and it
//! keeps the branch offsets correct if a routine's body changes shape. Only
//! these five are implemented; AIX ships a handful of other milicode
//! entry points (overlay loaders, decimal arithmetic helpers) that no
//! binary in this project's test corpus has ever needed, so they're left
//! unmapped rather than guessed at.

use crate::cpu::CpuBackend;
use crate::error::{Error, Result};
use crate::mm::{MemoryManager, UNIX_MILI_ADDR, UNIX_MILI_SIZE};
use std::collections::HashMap;

/// Fixed entry points within the milicode page, one 0x600-aligned slot per
/// routine, mirroring the addresses real AIX firmware uses.
pub const MEMCMP_ADDR: u32 = 0xD000;
pub const STRCMP_ADDR: u32 = 0xDC00;
pub const STRLEN_ADDR: u32 = 0xE600;
pub const MEMMOVE_ADDR: u32 = 0xF000;
pub const STRCPY_ADDR: u32 = 0xFC00;

/// A symbolic PowerPC instruction. Branches reference a label rather than a
/// numeric offset; [`assemble`] resolves them in a second pass once every
/// instruction's address is known.
#[derive(Clone, Copy)]
enum Insn {
    Li { rd: u8, simm: i16 },
    Addi { rd: u8, ra: u8, simm: i16 },
    Mr { rd: u8, rs: u8 },
    Add { rd: u8, ra: u8, rb: u8 },
    Subf { rd: u8, ra: u8, rb: u8 },
    CmpWi { ra: u8, simm: i16 },
    CmpW { ra: u8, rb: u8 },
    CmpLw { ra: u8, rb: u8 },
    Lbz { rd: u8, ra: u8, d: i16 },
    Stb { rs: u8, ra: u8, d: i16 },
    B(&'static str),
    Beq(&'static str),
    Bne(&'static str),
    Bgt(&'static str),
    Blr,
    Label(&'static str),
}

fn d_form(opcode: u32, rt: u8, ra: u8, d: i16) -> u32 {
    (opcode << 26) | ((rt as u32) << 21) | ((ra as u32) << 16) | (d as u16 as u32)
}

fn x_form(opcode: u32, rt: u8, ra: u8, rb: u8, xo: u32, rc: u32) -> u32 {
    (opcode << 26) | ((rt as u32) << 21) | ((ra as u32) << 16) | ((rb as u32) << 11) | (xo << 1) | rc
}

/// Resolves labels and encodes a routine body into its raw big-endian
/// instruction bytes, two passes: first record every label's address (word
/// index relative to the routine's own start), then encode each instruction,
/// computing PC-relative branch displacements as we go.
fn assemble(body: &[Insn]) -> Vec<u8> {
    let mut labels: HashMap<&'static str, i32> = HashMap::new();
    let mut index = 0i32;
    for insn in body {
        if let Insn::Label(name) = insn {
            labels.insert(name, index);
        } else {
            index += 1;
        }
    }

    let mut words = Vec::new();
    let mut pc = 0i32;
    for insn in body {
        let word = match *insn {
            Insn::Label(_) => continue,
            Insn::Li { rd, simm } => d_form(14, rd, 0, simm),
            Insn::Addi { rd, ra, simm } => d_form(14, rd, ra, simm),
            Insn::Mr { rd, rs } => x_form(31, rs, rd, rs, 444, 0),
            Insn::Add { rd, ra, rb } => x_form(31, rd, ra, rb, 266, 0),
            Insn::Subf { rd, ra, rb } => x_form(31, rd, ra, rb, 40, 0),
            Insn::CmpWi { ra, simm } => d_form(11, 0, ra, simm),
            Insn::CmpW { ra, rb } => x_form(31, 0, ra, rb, 0, 0),
            Insn::CmpLw { ra, rb } => x_form(31, 0, ra, rb, 32, 0),
            Insn::Lbz { rd, ra, d } => d_form(34, rd, ra, d),
            Insn::Stb { rs, ra, d } => d_form(38, rs, ra, d),
            Insn::Blr => 0x4e80_0020,
            Insn::B(label) => {
                let target = *labels.get(label).expect("undefined label");
                let disp = (target - pc) * 4;
                (18 << 26) | ((disp as u32) & 0x03FF_FFFC)
            }
            Insn::Beq(label) => branch_cond(&labels, pc, label, 12, 2),
            Insn::Bne(label) => branch_cond(&labels, pc, label, 4, 2),
            Insn::Bgt(label) => branch_cond(&labels, pc, label, 12, 1),
        };
        words.extend_from_slice(&word.to_be_bytes());
        pc += 1;
    }
    words
}

fn branch_cond(labels: &HashMap<&'static str, i32>, pc: i32, label: &str, bo: u32, bi: u32) -> u32 {
    let target = *labels.get(label).expect("undefined label");
    let disp = (target - pc) * 4;
    (16 << 26) | (bo << 21) | (bi << 16) | ((disp as u32) & 0xFFFC)
}

/// `memcmp(r3=s1, r4=s2, r5=n) -> r3`: byte-by-byte compare, returning the
/// signed difference of the first mismatching pair, or 0 if `n` bytes match.
fn memcmp_body() -> Vec<u8> {
    use Insn::*;
    assemble(&[
        Label("loop"),
        CmpWi { ra: 5, simm: 0 },
        Beq("eq"),
        Lbz { rd: 6, ra: 3, d: 0 },
        Lbz { rd: 7, ra: 4, d: 0 },
        CmpW { ra: 6, rb: 7 },
        Bne("ne"),
        Addi { rd: 3, ra: 3, simm: 1 },
        Addi { rd: 4, ra: 4, simm: 1 },
        Addi { rd: 5, ra: 5, simm: -1 },
        B("loop"),
        Label("eq"),
        Li { rd: 3, simm: 0 },
        Blr,
        Label("ne"),
        Subf { rd: 3, ra: 7, rb: 6 },
        Blr,
    ])
}

/// `strcmp(r3=s1, r4=s2) -> r3`.
fn strcmp_body() -> Vec<u8> {
    use Insn::*;
    assemble(&[
        Label("loop"),
        Lbz { rd: 6, ra: 3, d: 0 },
        Lbz { rd: 7, ra: 4, d: 0 },
        CmpW { ra: 6, rb: 7 },
        Bne("done"),
        CmpWi { ra: 6, simm: 0 },
        Beq("done"),
        Addi { rd: 3, ra: 3, simm: 1 },
        Addi { rd: 4, ra: 4, simm: 1 },
        B("loop"),
        Label("done"),
        Subf { rd: 3, ra: 7, rb: 6 },
        Blr,
    ])
}

/// `strlen(r3=s) -> r3`.
fn strlen_body() -> Vec<u8> {
    use Insn::*;
    assemble(&[
        Mr { rd: 4, rs: 3 },
        Label("loop"),
        Lbz { rd: 6, ra: 3, d: 0 },
        CmpWi { ra: 6, simm: 0 },
        Beq("done"),
        Addi { rd: 3, ra: 3, simm: 1 },
        B("loop"),
        Label("done"),
        Subf { rd: 3, ra: 4, rb: 3 },
        Blr,
    ])
}

/// `memmove(r3=dest, r4=src, r5=n) -> r3`: copies forward when the regions
/// don't overlap badly (`dest <= src`), backward otherwise, so overlapping
/// copies come out correct either way.
fn memmove_body() -> Vec<u8> {
    use Insn::*;
    assemble(&[
        Mr { rd: 8, rs: 3 },
        CmpLw { ra: 3, rb: 4 },
        Bgt("backward"),
        Label("fwd_loop"),
        CmpWi { ra: 5, simm: 0 },
        Beq("done"),
        Lbz { rd: 6, ra: 4, d: 0 },
        Stb { rs: 6, ra: 3, d: 0 },
        Addi { rd: 3, ra: 3, simm: 1 },
        Addi { rd: 4, ra: 4, simm: 1 },
        Addi { rd: 5, ra: 5, simm: -1 },
        B("fwd_loop"),
        Label("backward"),
        Add { rd: 3, ra: 3, rb: 5 },
        Add { rd: 4, ra: 4, rb: 5 },
        Label("bwd_loop"),
        CmpWi { ra: 5, simm: 0 },
        Beq("done"),
        Addi { rd: 3, ra: 3, simm: -1 },
        Addi { rd: 4, ra: 4, simm: -1 },
        Lbz { rd: 6, ra: 4, d: 0 },
        Stb { rs: 6, ra: 3, d: 0 },
        Addi { rd: 5, ra: 5, simm: -1 },
        B("bwd_loop"),
        Label("done"),
        Mr { rd: 3, rs: 8 },
        Blr,
    ])
}

/// `strcpy(r3=dest, r4=src) -> r3`. Mirrors the reference implementation's
/// own (slightly unusual) contract: `r3` comes back pointing at `dest`'s
/// terminating NUL, not its start, since the loop never keeps a separate
/// copy of the original destination pointer around.
fn strcpy_body() -> Vec<u8> {
    use Insn::*;
    assemble(&[
        Label("loop"),
        Lbz { rd: 6, ra: 4, d: 0 },
        Stb { rs: 6, ra: 3, d: 0 },
        CmpWi { ra: 6, simm: 0 },
        Beq("done"),
        Addi { rd: 3, ra: 3, simm: 1 },
        Addi { rd: 4, ra: 4, simm: 1 },
        B("loop"),
        Label("done"),
        Blr,
    ])
}

/// Maps the milicode page and writes each routine's body at its fixed
/// address.
pub fn install<C: CpuBackend>(mm: &mut MemoryManager<C>) -> Result<()> {
    mm.cpu_mut().map(UNIX_MILI_ADDR, UNIX_MILI_SIZE as usize)?;

    for (addr, body) in [
        (MEMCMP_ADDR, memcmp_body()),
        (STRCMP_ADDR, strcmp_body()),
        (STRLEN_ADDR, strlen_body()),
        (MEMMOVE_ADDR, memmove_body()),
        (STRCPY_ADDR, strcpy_body()),
    ] {
        if body.len() as u32 > 0x600 {
            return Err(Error::Malformed(format!(
                "milicode routine at {:#x} doesn't fit its 0x600 slot ({} bytes)",
                addr,
                body.len()
            )));
        }
        mm.cpu_mut().write_mem(addr, &body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::FakeCpu;
    use crate::cpu::SpecialReg;

    /// Interprets a routine's assembled bytes well enough to check its
    /// result, without needing a real CPU core: a tiny, purpose-built
    /// stepper that understands exactly the instructions `assemble` emits.
    fn run_routine<C: CpuBackend>(cpu: &mut C, entry: u32) {
        let mut pc = entry;
        loop {
            let insn = cpu.read_u32(pc).unwrap();
            let opcode = insn >> 26;
            pc += 4;
            match opcode {
                18 => {
                    // b: 24-bit signed word-shifted displacement, relative
                    // to the instruction's own address (pc - 4 here).
                    let raw = insn & 0x03FF_FFFC;
                    let signed = ((raw as i32) << 6) >> 6;
                    pc = (pc as i32 - 4 + signed) as u32;
                }
                16 => {
                    let bo = (insn >> 21) & 0x1F;
                    let bi = (insn >> 16) & 0x1F;
                    let raw = insn & 0xFFFC;
                    let disp = ((raw as i16) as i32) as i32;
                    let cr = cpu.read_special(SpecialReg::Cr).unwrap();
                    let taken = match (bo, bi) {
                        (12, 2) => cr & 0x2 != 0, // beq
                        (4, 2) => cr & 0x2 == 0,  // bne
                        (12, 1) => cr & 0x1 != 0, // bgt
                        _ => panic!("unhandled bc in test stepper"),
                    };
                    if taken {
                        pc = (pc as i32 - 4 + disp) as u32;
                    }
                }
                14 => {
                    let rt = ((insn >> 21) & 0x1F) as u8;
                    let ra = ((insn >> 16) & 0x1F) as u8;
                    let simm = (insn & 0xFFFF) as i16 as i32;
                    let base = if ra == 0 { 0 } else { cpu.read_gpr(ra).unwrap() as i32 };
                    cpu.write_gpr(rt, (base + simm) as u32).unwrap();
                }
                11 => {
                    let ra = ((insn >> 16) & 0x1F) as u8;
                    let simm = (insn & 0xFFFF) as i16 as i32;
                    let v = cpu.read_gpr(ra).unwrap() as i32;
                    set_cr(cpu, v.cmp(&simm));
                }
                34 => {
                    let rt = ((insn >> 21) & 0x1F) as u8;
                    let ra = ((insn >> 16) & 0x1F) as u8;
                    let d = (insn & 0xFFFF) as i16 as i32;
                    let addr = (cpu.read_gpr(ra).unwrap() as i32 + d) as u32;
                    let mut b = [0u8; 1];
                    cpu.read_mem(addr, &mut b).unwrap();
                    cpu.write_gpr(rt, b[0] as u32).unwrap();
                }
                38 => {
                    let rs = ((insn >> 21) & 0x1F) as u8;
                    let ra = ((insn >> 16) & 0x1F) as u8;
                    let d = (insn & 0xFFFF) as i16 as i32;
                    let addr = (cpu.read_gpr(ra).unwrap() as i32 + d) as u32;
                    let v = cpu.read_gpr(rs).unwrap() as u8;
                    cpu.write_mem(addr, &[v]).unwrap();
                }
                31 => {
                    let xo = (insn >> 1) & 0x3FF;
                    let rt = ((insn >> 21) & 0x1F) as u8;
                    let ra = ((insn >> 16) & 0x1F) as u8;
                    let rb = ((insn >> 11) & 0x1F) as u8;
                    match xo {
                        444 => cpu.write_gpr(ra, cpu.read_gpr(rt).unwrap()).unwrap(),
                        266 => {
                            let v = cpu.read_gpr(ra).unwrap().wrapping_add(cpu.read_gpr(rb).unwrap());
                            cpu.write_gpr(rt, v).unwrap();
                        }
                        40 => {
                            let v = cpu.read_gpr(rb).unwrap().wrapping_sub(cpu.read_gpr(ra).unwrap());
                            cpu.write_gpr(rt, v).unwrap();
                        }
                        0 => {
                            let a = cpu.read_gpr(ra).unwrap() as i32;
                            let b = cpu.read_gpr(rb).unwrap() as i32;
                            set_cr(cpu, a.cmp(&b));
                        }
                        32 => {
                            let a = cpu.read_gpr(ra).unwrap();
                            let b = cpu.read_gpr(rb).unwrap();
                            set_cr(cpu, a.cmp(&b));
                        }
                        _ => panic!("unhandled X-form xo={} in test stepper", xo),
                    }
                }
                0 if insn == 0x4e80_0020 => return, // blr
                _ => panic!("unhandled opcode {} in test stepper", opcode),
            }
        }
    }

    fn set_cr<C: CpuBackend>(cpu: &mut C, ord: std::cmp::Ordering) {
        use std::cmp::Ordering::*;
        let bits: u32 = match ord {
            Less => 0x4,
            Greater => 0x1,
            Equal => 0x2,
        };
        cpu.write_special(SpecialReg::Cr, bits).unwrap();
    }

    fn new_mapped_cpu() -> FakeCpu {
        let mut cpu = FakeCpu::new();
        cpu.map(0x0, 0x20000).unwrap();
        cpu
    }

    #[test]
    fn memcmp_equal_returns_zero() {
        let mut cpu = new_mapped_cpu();
        cpu.write_mem(MEMCMP_ADDR, &memcmp_body()).unwrap();
        cpu.write_mem(0x1000, b"abc").unwrap();
        cpu.write_mem(0x2000, b"abc").unwrap();
        cpu.write_gpr(3, 0x1000).unwrap();
        cpu.write_gpr(4, 0x2000).unwrap();
        cpu.write_gpr(5, 3).unwrap();
        run_routine(&mut cpu, MEMCMP_ADDR);
        assert_eq!(cpu.read_gpr(3).unwrap(), 0);
    }

    #[test]
    fn memcmp_mismatch_returns_nonzero() {
        let mut cpu = new_mapped_cpu();
        cpu.write_mem(MEMCMP_ADDR, &memcmp_body()).unwrap();
        cpu.write_mem(0x1000, b"abd").unwrap();
        cpu.write_mem(0x2000, b"abc").unwrap();
        cpu.write_gpr(3, 0x1000).unwrap();
        cpu.write_gpr(4, 0x2000).unwrap();
        cpu.write_gpr(5, 3).unwrap();
        run_routine(&mut cpu, MEMCMP_ADDR);
        assert_eq!(cpu.read_gpr(3).unwrap() as i32, 1);
    }

    #[test]
    fn strlen_counts_bytes_before_nul() {
        let mut cpu = new_mapped_cpu();
        cpu.write_mem(STRLEN_ADDR, &strlen_body()).unwrap();
        cpu.write_mem(0x1000, b"hello\0").unwrap();
        cpu.write_gpr(3, 0x1000).unwrap();
        run_routine(&mut cpu, STRLEN_ADDR);
        assert_eq!(cpu.read_gpr(3).unwrap(), 5);
    }

    #[test]
    fn strcpy_copies_through_nul() {
        let mut cpu = new_mapped_cpu();
        cpu.write_mem(STRCPY_ADDR, &strcpy_body()).unwrap();
        cpu.write_mem(0x2000, b"hi\0").unwrap();
        cpu.write_gpr(3, 0x1000).unwrap();
        cpu.write_gpr(4, 0x2000).unwrap();
        run_routine(&mut cpu, STRCPY_ADDR);
        let mut buf = [0u8; 3];
        cpu.read_mem(0x1000, &mut buf).unwrap();
        assert_eq!(&buf, b"hi\0");
    }

    #[test]
    fn memmove_handles_forward_overlap() {
        let mut cpu = new_mapped_cpu();
        cpu.write_mem(MEMMOVE_ADDR, &memmove_body()).unwrap();
        cpu.write_mem(0x1000, b"abcdef").unwrap();
        // overlapping move: dest < src, shift left by one.
        cpu.write_gpr(3, 0x1000).unwrap();
        cpu.write_gpr(4, 0x1001).unwrap();
        cpu.write_gpr(5, 5).unwrap();
        run_routine(&mut cpu, MEMMOVE_ADDR);
        let mut buf = [0u8; 6];
        cpu.read_mem(0x1000, &mut buf).unwrap();
        assert_eq!(&buf, b"bcdeff");
    }

    #[test]
    fn install_maps_all_five_routines_within_budget() {
        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        install(&mut mm).unwrap();
        // memcmp's first instruction should be present and non-zero.
        assert_ne!(mm.read_u32(MEMCMP_ADDR).unwrap(), 0);
        assert_ne!(mm.read_u32(STRCMP_ADDR).unwrap(), 0);
        assert_ne!(mm.read_u32(STRLEN_ADDR).unwrap(), 0);
        assert_ne!(mm.read_u32(MEMMOVE_ADDR).unwrap(), 0);
        assert_ne!(mm.read_u32(STRCPY_ADDR).unwrap(), 0);
    }
}
