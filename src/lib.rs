//! A generator for a Brainfuck-hosted virtual machine.
//!
//! This crate emits a single Brainfuck program that implements a small
//! register/memory machine on the host interpreter's tape: random-access
//! memory addressed by 3-byte little-endian integers, sixteen 4-byte
//! registers, and a fetch/decode/execute loop over a byte-coded
//! instruction set. Fed to a Brainfuck interpreter with 8-bit wrapping
//! cells, the program first loads a user program from standard input
//! (delimited by four consecutive null bytes) into its simulated memory,
//! then executes it until an unknown opcode halts the machine.
//!
//! The generator assembles the program from named fragments, each with a
//! documented cursor and zero contract, and checks those contracts while
//! emitting. The crate also ships an interpreter implementing the host
//! contract the program is written against, used by the `run` subcommand
//! and the test suite.
//!
//! Quick start:
//!
//! ```no_run
//! use bfvm::Interpreter;
//!
//! // Generate the machine, then run SETB r5, 42 on it.
//! let machine = bfvm::generate().expect("generation is static");
//! let user_program: &[u8] = &[0x03, 0x05, 42, 0, 0, 0, 0x00, 0x00, 0x00, 0x00];
//! let mut host = Interpreter::new(&machine, user_program, std::io::sink()).unwrap();
//! host.run().expect("program should run");
//! assert_eq!(host.cell(bfvm::layout::reg_data(5, 0) as usize), 42);
//! ```

pub mod arith;
pub mod code;
pub mod expand;
pub mod interp;
pub mod layout;
pub mod memory;
pub mod registers;
pub mod vm;

pub use code::{Code, Fragment, LayoutError};
pub use expand::{ExpandError, MacroSet};
pub use interp::{EOF_BYTE, Interpreter, InterpreterError};
pub use vm::{GenerateError, INSTRUCTIONS, Instruction};

/// Generate the complete Brainfuck program.
pub fn generate() -> Result<String, GenerateError> {
    vm::program()
}
