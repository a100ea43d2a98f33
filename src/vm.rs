//! The virtual machine's top level: loader, fetch/decode/execute loop and
//! instruction table, composed from the memory, register and arithmetic
//! primitives into one `boot` fragment.
//!
//! The machine boots in two phases. The loader reads bytes from input into
//! memory at SP until it has seen four consecutive nulls, holding the last
//! four bytes in a small pipeline so the terminator itself is never
//! stored. The execute loop then fetches the cell at IP, matches the
//! opcode through a chain of unary tests, and runs the selected arm; an
//! opcode with no arm clears the run sentinel and the machine stops.
//!
//! IP bookkeeping: every consumed instruction byte, opcode included, bumps
//! r15's slot in place through `incr` before the arm's register write
//! lands. A well-formed instruction therefore advances IP by exactly its
//! length, while a write to r15 itself behaves as a jump and a halting
//! dispatch leaves IP untouched.

use thiserror::Error;

use crate::arith;
use crate::code::{Code, Fragment, LayoutError};
use crate::expand::{ExpandError, MacroSet};
use crate::layout::{IP_REG, REG_BASE, SP_REG, bank, global, hdr, mem_hdr, reg_data, reg_scratch};
use crate::memory;
use crate::registers;

/// Generation failures: either a fragment broke its declared cursor
/// contract or the expansion pass could not resolve the graph.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
}

/// One VM instruction: its opcode, total byte length, and where its
/// operand bytes land before the effect runs.
pub struct Instruction {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub length: u8,
    arm: &'static str,
    /// Cells each operand byte is moved to, in fetch order.
    operands: &'static [i64],
    /// Whether the arm finishes with a banked register write.
    writes_register: bool,
}

/// Register-file cells the operand bytes land in.
const REG_INDEX: i64 = REG_BASE + bank::INDEX;
const REG_BUS: i64 = REG_BASE + bank::BUS_D0;

/// The instruction set, in decode order. Opcodes are contiguous from 1;
/// the decode chain subtracts one per tested arm and relies on that.
pub const INSTRUCTIONS: [Instruction; 3] = [
    Instruction {
        mnemonic: "NOP",
        opcode: 0x01,
        length: 1,
        arm: "arm_nop",
        operands: &[],
        writes_register: false,
    },
    Instruction {
        mnemonic: "CLR",
        opcode: 0x02,
        length: 2,
        arm: "arm_clr",
        operands: &[REG_INDEX],
        writes_register: true,
    },
    Instruction {
        mnemonic: "SETB",
        opcode: 0x03,
        length: 6,
        arm: "arm_setb",
        operands: &[REG_INDEX, REG_BUS, REG_BUS + 1, REG_BUS + 2, REG_BUS + 3],
        writes_register: true,
    },
];

const IP_SCRATCH: i64 = reg_scratch(IP_REG);
const SP_SCRATCH: i64 = reg_scratch(SP_REG);
/// Opcode cell: the low bus byte of the memory header.
const OPCODE: i64 = mem_hdr(hdr::D0);
/// Decode scratch; doubles as bus byte 1, which is zero during decode.
const FLAG: i64 = OPCODE + 1;

/// Copy the low three bytes of the 4-byte register slot starting at
/// `data` into both address fields of the memory header, via the slot's
/// scratch cell.
fn stage_address(c: &mut Code, data: i64, scratch: i64) {
    for b in 0..3 {
        c.copy_byte(
            data + b,
            scratch,
            &[mem_hdr(hdr::I0) + b, mem_hdr(hdr::J0) + b],
        );
    }
}

/// Bump IP by one in place.
fn advance_ip(c: &mut Code, incr: &Fragment) {
    c.goto(IP_SCRATCH);
    c.call(incr);
}

/// Build one decode arm. Arms run with the opcode and flag cells already
/// zeroed, enter and exit on the flag cell, and do their own IP
/// bookkeeping: one `incr` per operand fetched, plus one for the opcode.
fn arm(
    insn: &Instruction,
    incr: &Fragment,
    read: &Fragment,
    write4: &Fragment,
) -> Result<Fragment, LayoutError> {
    let mut c = Code::new_at(FLAG);
    for &dest in insn.operands {
        advance_ip(&mut c, incr);
        stage_address(&mut c, reg_data(IP_REG, 0), IP_SCRATCH);
        c.goto(mem_hdr(hdr::S));
        c.call(read);
        c.move_byte(OPCODE, dest);
    }
    advance_ip(&mut c, incr);
    if insn.writes_register {
        c.goto(REG_INDEX);
        c.call(write4);
    }
    c.goto(FLAG);
    c.seal_traveling(insn.arm, FLAG, Some(0))
}

/// One pass of the fetch/decode/execute loop. Enters and exits on the run
/// sentinel.
fn exec_step(incr: &Fragment, read: &Fragment, arms: &[Fragment]) -> Result<Fragment, LayoutError> {
    let mut c = Code::new_at(global::RUN);
    // Fetch the cell at IP onto the memory bus.
    stage_address(&mut c, reg_data(IP_REG, 0), IP_SCRATCH);
    c.goto(mem_hdr(hdr::S));
    c.call(read);
    // Unary-match chain: each level subtracts one from the opcode and arms
    // the flag; a deeper level disarms it again. The innermost level is
    // the default arm: clear the run sentinel, drain the opcode.
    for _ in arms {
        c.goto(OPCODE);
        c.dec(1);
        c.goto(FLAG);
        c.inc(1);
        c.goto(OPCODE);
        c.open();
        c.goto(FLAG);
        c.dec(1);
    }
    c.goto(global::RUN);
    c.clear();
    c.goto(OPCODE);
    c.clear();
    for a in arms.iter().rev() {
        c.close();
        c.goto(FLAG);
        c.open();
        c.dec(1);
        c.call(a);
        c.close();
        c.goto(OPCODE);
    }
    // Clear decode scratch left on the high bus bytes.
    for k in 1..4 {
        c.goto(mem_hdr(hdr::D0) + k);
        c.clear();
    }
    c.goto(global::RUN);
    c.seal_traveling("vmexec", global::RUN, Some(0))
}

/// Store the pipeline's oldest byte at memory[SP] and bump SP. Enters and
/// exits on `TMP_B`.
fn loader_emit(incr: &Fragment, write: &Fragment) -> Result<Fragment, LayoutError> {
    let mut c = Code::new_at(global::TMP_B);
    c.move_byte(global::PIPE, mem_hdr(hdr::D0));
    stage_address(&mut c, reg_data(SP_REG, 0), SP_SCRATCH);
    c.goto(mem_hdr(hdr::S));
    c.call(write);
    c.goto(SP_SCRATCH);
    c.call(incr);
    c.goto(global::TMP_B);
    c.seal_traveling("ldemit", global::TMP_B, Some(0))
}

/// The store-and-shift half of a loader pass: emit the oldest byte unless
/// the pipeline is still warming up, then slide the pipeline down and push
/// the new byte. Enters and exits on `TMP_B`.
fn loader_store(emit: &Fragment) -> Result<Fragment, LayoutError> {
    let mut c = Code::new_at(global::TMP_B);
    c.copy_byte(global::WARMUP, global::TMP_B, &[global::TMP_A]);
    c.goto(global::TMP_B);
    c.inc(1);
    c.goto(global::TMP_A);
    c.open();
    c.goto(global::TMP_B);
    c.dec(1);
    c.goto(global::WARMUP);
    c.dec(1);
    c.goto(global::TMP_A);
    c.clear();
    c.close();
    c.goto(global::TMP_B);
    c.open();
    c.dec(1);
    c.call(emit);
    c.close();
    c.move_byte(global::PIPE + 1, global::PIPE);
    c.move_byte(global::PIPE + 2, global::PIPE + 1);
    c.move_byte(global::PIPE + 3, global::PIPE + 2);
    c.move_byte(global::INBYTE, global::PIPE + 3);
    c.goto(global::TMP_B);
    c.seal_traveling("ldstore", global::TMP_B, Some(0))
}

/// One loader pass: read a byte, update the nulls countdown, store and
/// shift, then stop the loop if the countdown hit zero. The store runs on
/// the terminating pass too, so the byte four places back is the last one
/// kept and the discarded pipeline holds exactly the terminator. Enters
/// and exits on the loader flag.
fn loader_step(store: &Fragment) -> Result<Fragment, LayoutError> {
    let mut c = Code::new_at(global::LOAD);
    c.goto(global::INBYTE);
    c.input();
    // Nonzero byte: reset the countdown to 4. Zero byte: decrement it.
    c.copy_byte(global::INBYTE, global::TMP_B, &[global::TMP_A]);
    c.goto(global::TMP_B);
    c.inc(1);
    c.goto(global::TMP_A);
    c.open();
    c.goto(global::TMP_B);
    c.dec(1);
    c.goto(global::NULLS);
    c.clear();
    c.inc(4);
    c.goto(global::TMP_A);
    c.clear();
    c.close();
    c.goto(global::TMP_B);
    c.open();
    c.dec(1);
    c.goto(global::NULLS);
    c.dec(1);
    c.goto(global::TMP_B);
    c.close();
    c.call(store);
    // Countdown at zero: clear the loop flag.
    c.copy_byte(global::NULLS, global::TMP_B, &[global::TMP_A]);
    c.goto(global::TMP_B);
    c.inc(1);
    c.goto(global::TMP_A);
    c.open();
    c.goto(global::TMP_B);
    c.dec(1);
    c.goto(global::TMP_A);
    c.clear();
    c.close();
    c.goto(global::TMP_B);
    c.open();
    c.dec(1);
    c.goto(global::LOAD);
    c.clear();
    c.goto(global::TMP_B);
    c.close();
    c.goto(global::LOAD);
    c.seal_traveling("lditer", global::LOAD, Some(0))
}

/// The whole program: arm the loader, run it dry, then loop the execute
/// step until the run sentinel is cleared.
fn boot(loader: &Fragment, exec: &Fragment) -> Result<Fragment, LayoutError> {
    let mut c = Code::new_at(global::RUN);
    c.goto(global::NULLS);
    c.inc(4);
    c.goto(global::WARMUP);
    c.inc(4);
    c.goto(global::LOAD);
    c.inc(1);
    c.open();
    c.call(loader);
    c.close();
    c.goto(global::RUN);
    c.inc(1);
    c.open();
    c.call(exec);
    c.close();
    c.seal_traveling("boot", global::RUN, Some(0))
}

/// Generate the complete Brainfuck program.
pub fn program() -> Result<String, GenerateError> {
    let mem = memory::build()?;
    let regs = registers::build()?;
    let incr = arith::incr()?;

    let arms: Vec<Fragment> = INSTRUCTIONS
        .iter()
        .map(|insn| arm(insn, &incr, &mem.read, &regs.write4))
        .collect::<Result<_, _>>()?;
    let exec = exec_step(&incr, &mem.read, &arms)?;
    let emit = loader_emit(&incr, &mem.write)?;
    let store = loader_store(&emit)?;
    let loader = loader_step(&store)?;
    let root = boot(&loader, &exec)?;

    let mut set = MacroSet::new();
    mem.register(&mut set)?;
    regs.register(&mut set)?;
    set.add(&incr)?;
    for a in &arms {
        set.add(a)?;
    }
    for frag in [&exec, &emit, &store, &loader, &root] {
        set.add(frag)?;
    }
    let out = set.expand(root.name)?;
    log::info!(
        "generated {} commands for {} instructions",
        out.len(),
        INSTRUCTIONS.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_lengths_cover_opcode_plus_operands() {
        for insn in &INSTRUCTIONS {
            assert_eq!(
                insn.length as usize,
                1 + insn.operands.len(),
                "{} length does not match its operand count",
                insn.mnemonic
            );
        }
    }

    #[test]
    fn opcodes_are_contiguous_from_one() {
        for (i, insn) in INSTRUCTIONS.iter().enumerate() {
            assert_eq!(insn.opcode as usize, i + 1, "{}", insn.mnemonic);
        }
    }

    #[test]
    fn program_generates() {
        let out = program().unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn program_is_minified() {
        let out = program().unwrap();
        assert!(out.bytes().all(|b| b"+-<>[],.".contains(&b)));
    }

    #[test]
    fn program_has_no_output_commands() {
        // The instruction set has no output instruction yet, so the whole
        // program must be silent.
        assert!(!program().unwrap().contains('.'));
    }

    #[test]
    fn program_reads_input_in_one_place() {
        // Only the loader consumes input.
        assert_eq!(program().unwrap().matches(',').count(), 1);
    }

    #[test]
    fn program_is_stable_across_builds() {
        assert_eq!(program().unwrap(), program().unwrap());
    }
}
