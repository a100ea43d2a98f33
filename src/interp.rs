//! A Brainfuck interpreter implementing the host contract the generated
//! program is written against.
//!
//! Contract: 8-bit cells with modular wrap-around, a tape that grows
//! rightward without bound, input via `,` where end-of-input reads as
//! `0xFF`, and tolerance for non-command characters (they are stripped at
//! load). Moving left of cell 0 is an error; the generated program never
//! does it, so hitting it means the program under test is wrong.
//!
//! The interpreter reads from and writes to caller-supplied endpoints so
//! tests can drive it from byte slices, and exposes the final tape for
//! inspection, which is the only way to observe the machine's registers
//! and memory (the VM has no output instructions).

use std::io::{Read, Write};

use thiserror::Error;

/// Errors that can occur while executing a program.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// The data pointer attempted to move left of cell 0.
    #[error("pointer underflow at instruction {ip}")]
    PointerUnderflow { ip: usize },

    /// Loops were not balanced; a matching `[` or `]` was not found.
    #[error("unmatched brackets: a loop was not properly closed")]
    UnmatchedBrackets,

    /// The step budget ran out before the program finished.
    #[error("fuel exhausted after {steps} steps")]
    FuelExhausted { steps: u64 },

    /// An underlying I/O error occurred on the input or output endpoint.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Value a `,` stores at end of input, per the host contract. Distinct
/// from `0x00` so the loader's four-null terminator can never be forged
/// by EOF.
pub const EOF_BYTE: u8 = 0xFF;

/// A Brainfuck interpreter over caller-supplied I/O endpoints.
pub struct Interpreter<R, W> {
    code: Vec<u8>,
    jump: Vec<usize>,
    tape: Vec<u8>,
    pointer: usize,
    reader: R,
    writer: W,
    fuel: Option<u64>,
}

impl<R: Read, W: Write> Interpreter<R, W> {
    /// Build an interpreter for `code`, stripping non-command characters
    /// and precomputing bracket matches.
    pub fn new(code: &str, reader: R, writer: W) -> Result<Self, InterpreterError> {
        let code: Vec<u8> = code
            .bytes()
            .filter(|b| b"+-<>[],.".contains(b))
            .collect();

        // jump[i] holds the matching index for '[' or ']' at index i.
        let mut jump = vec![0usize; code.len()];
        let mut stack: Vec<usize> = Vec::new();
        for (i, &b) in code.iter().enumerate() {
            if b == b'[' {
                stack.push(i);
            } else if b == b']' {
                let Some(open) = stack.pop() else {
                    return Err(InterpreterError::UnmatchedBrackets);
                };
                jump[open] = i;
                jump[i] = open;
            }
        }
        if !stack.is_empty() {
            return Err(InterpreterError::UnmatchedBrackets);
        }

        Ok(Interpreter {
            code,
            jump,
            tape: vec![0; 256],
            pointer: 0,
            reader,
            writer,
            fuel: None,
        })
    }

    /// Cap execution at `steps` commands; exceeding the cap is an error
    /// rather than a hang.
    pub fn with_fuel(mut self, steps: u64) -> Self {
        self.fuel = Some(steps);
        self
    }

    /// Execute the program until completion.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        log::debug!("running {} commands", self.code.len());
        let mut ip = 0;
        let mut steps: u64 = 0;
        while ip < self.code.len() {
            if let Some(limit) = self.fuel {
                steps += 1;
                if steps > limit {
                    return Err(InterpreterError::FuelExhausted { steps: limit });
                }
            }
            match self.code[ip] {
                b'>' => {
                    self.pointer += 1;
                    if self.pointer >= self.tape.len() {
                        self.tape.resize(self.tape.len() * 2, 0);
                    }
                }
                b'<' => {
                    if self.pointer == 0 {
                        return Err(InterpreterError::PointerUnderflow { ip });
                    }
                    self.pointer -= 1;
                }
                b'+' => {
                    self.tape[self.pointer] = self.tape[self.pointer].wrapping_add(1);
                }
                b'-' => {
                    self.tape[self.pointer] = self.tape[self.pointer].wrapping_sub(1);
                }
                b'.' => {
                    self.writer.write_all(&[self.tape[self.pointer]])?;
                }
                b',' => {
                    let mut buf = [0u8; 1];
                    self.tape[self.pointer] = match self.reader.read(&mut buf)? {
                        0 => EOF_BYTE,
                        _ => buf[0],
                    };
                }
                b'[' => {
                    if self.tape[self.pointer] == 0 {
                        ip = self.jump[ip];
                    }
                }
                b']' => {
                    if self.tape[self.pointer] != 0 {
                        ip = self.jump[ip];
                    }
                }
                _ => unreachable!("non-command bytes are stripped at load"),
            }
            ip += 1;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// The tape as it stands, for inspecting the final machine state.
    pub fn tape(&self) -> &[u8] {
        &self.tape
    }

    /// Read a single cell; cells the program never touched read as zero.
    pub fn cell(&self, i: usize) -> u8 {
        self.tape.get(i).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_quiet(code: &str) -> Interpreter<std::io::Empty, std::io::Sink> {
        let mut interp = Interpreter::new(code, std::io::empty(), std::io::sink()).unwrap();
        interp.run().unwrap();
        interp
    }

    #[test]
    fn wrapping_addition() {
        let code = "+".repeat(256);
        let interp = run_quiet(&code);
        assert_eq!(interp.cell(0), 0);
    }

    #[test]
    fn wrapping_subtraction() {
        let interp = run_quiet("-");
        assert_eq!(interp.cell(0), 255);
    }

    #[test]
    fn comments_are_tolerated() {
        let interp = run_quiet("set two: + and + (done)");
        assert_eq!(interp.cell(0), 2);
    }

    #[test]
    fn unmatched_open_bracket_is_rejected_at_load() {
        assert!(matches!(
            Interpreter::new("[+", std::io::empty(), std::io::sink()),
            Err(InterpreterError::UnmatchedBrackets)
        ));
    }

    #[test]
    fn unmatched_close_bracket_is_rejected_at_load() {
        assert!(matches!(
            Interpreter::new("]+", std::io::empty(), std::io::sink()),
            Err(InterpreterError::UnmatchedBrackets)
        ));
    }

    #[test]
    fn pointer_underflow_errors() {
        let mut interp = Interpreter::new("<", std::io::empty(), std::io::sink()).unwrap();
        assert!(matches!(
            interp.run(),
            Err(InterpreterError::PointerUnderflow { ip: 0 })
        ));
    }

    #[test]
    fn tape_grows_rightward_on_demand() {
        let code = ">".repeat(70_000) + "+";
        let mut interp = Interpreter::new(&code, std::io::empty(), std::io::sink()).unwrap();
        interp.run().unwrap();
        assert_eq!(interp.cell(70_000), 1);
    }

    #[test]
    fn input_reads_bytes_then_eof() {
        let input: &[u8] = &[7, 0];
        let mut interp = Interpreter::new(",>,>,", input, std::io::sink()).unwrap();
        interp.run().unwrap();
        assert_eq!(interp.cell(0), 7);
        assert_eq!(interp.cell(1), 0);
        // End of input reads as 0xFF, not 0.
        assert_eq!(interp.cell(2), EOF_BYTE);
    }

    #[test]
    fn output_writes_cell_bytes() {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new("+++.+.", std::io::empty(), &mut out).unwrap();
        interp.run().unwrap();
        assert_eq!(out, vec![3, 4]);
    }

    #[test]
    fn nested_loops_zero_out() {
        let interp = run_quiet("++++[>++++[-]<-]");
        assert_eq!(interp.cell(0), 0);
        assert_eq!(interp.cell(1), 0);
    }

    #[test]
    fn fuel_exhaustion_is_an_error() {
        let mut interp = Interpreter::new("+[]", std::io::empty(), std::io::sink())
            .unwrap()
            .with_fuel(1000);
        assert!(matches!(
            interp.run(),
            Err(InterpreterError::FuelExhausted { steps: 1000 })
        ));
    }

    #[test]
    fn empty_loop_on_zero_cell_is_skipped() {
        let interp = run_quiet("[]+");
        assert_eq!(interp.cell(0), 1);
    }
}
