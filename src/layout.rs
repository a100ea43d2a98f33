//! Tape-layout constants shared by every emitted fragment.
//!
//! The generated program carves the host tape into three fixed regions:
//! a block of VM globals at the origin, the banked register file at
//! [`REG_BASE`], and the random-access memory at [`MEM_BASE`]. Every
//! fragment assumes these offsets; nothing else may be moved without
//! re-deriving all of them.

/// Width of the memory header: sentinel + two 3-byte addresses + 4-byte bus.
pub const HDR_WIDTH: i64 = 11;

/// Width of one memory cell in tape cells.
pub const CELL_WIDTH: i64 = 4;

/// Width of one register-bank slot: two scratch cells plus four data bytes.
pub const SLOT_WIDTH: i64 = 6;

/// Number of base-256 digits in a memory address.
pub const ADDR_DIGITS: i64 = 3;

/// Width of the data bus in bytes.
pub const BUS_WIDTH: i64 = 4;

/// Number of architectural registers.
pub const REG_COUNT: i64 = 16;

/// Register holding the stack pointer, used by the loader as its write cursor.
pub const SP_REG: i64 = 14;

/// Register holding the instruction pointer.
pub const IP_REG: i64 = 15;

/// First cell of the register file (the 1-byte index cell).
pub const REG_BASE: i64 = 16;

/// First cell of the memory region (the sentinel `s`).
pub const MEM_BASE: i64 = 128;

// VM globals, below the register file. Offset 0 doubles as the home of the
// outer execute loop, so the run sentinel and the loop cell are one and the
// same.
pub mod global {
    /// Run sentinel: 1 while the VM executes, cleared by the halt path.
    pub const RUN: i64 = 0;
    /// Loader loop flag.
    pub const LOAD: i64 = 1;
    /// Consecutive-nulls countdown, initialised to 4.
    pub const NULLS: i64 = 2;
    /// Most recently read input byte.
    pub const INBYTE: i64 = 3;
    /// Loader warm-up countdown while the delay pipeline fills.
    pub const WARMUP: i64 = 4;
    /// Loader scratch cells.
    pub const TMP_A: i64 = 5;
    pub const TMP_B: i64 = 6;
    /// Four-byte delay pipeline, oldest byte first.
    pub const PIPE: i64 = 8;
}

// Memory header cells, relative to the sentinel `s`. Fragments that travel
// with the header use these same offsets against the header's current
// position.
pub mod hdr {
    pub const S: i64 = 0;
    /// Driving address digits, consumed on the way out.
    pub const I0: i64 = 1;
    pub const I1: i64 = 2;
    pub const I2: i64 = 3;
    /// Address copy, consumed driving the header home.
    pub const J0: i64 = 4;
    pub const J1: i64 = 5;
    pub const J2: i64 = 6;
    /// Data bus.
    pub const D0: i64 = 7;
    /// First byte of the memory cell adjacent to the header.
    pub const C0: i64 = 11;
}

// Register-file cells relative to the index cell. The bus slot sits between
// the index and slot 0 and shares the slot shape, which keeps the
// breadcrumb walk uniform.
pub mod bank {
    use super::SLOT_WIDTH;

    /// The 1-byte register index (the fragment home).
    pub const INDEX: i64 = 0;
    /// Scratch pair of the bus slot.
    pub const BUS_S0: i64 = 1;
    pub const BUS_S1: i64 = 2;
    /// First data byte of the bus slot.
    pub const BUS_D0: i64 = 3;
    /// First scratch cell of register slot `r`.
    pub const fn slot(r: i64) -> i64 {
        7 + SLOT_WIDTH * r
    }
    /// First data byte of register slot `r`.
    pub const fn data(r: i64) -> i64 {
        slot(r) + 2
    }
}

/// Absolute cell of the first scratch cell of register `r`.
pub const fn reg_scratch(r: i64) -> i64 {
    REG_BASE + bank::slot(r)
}

/// Absolute cell of data byte `b` of register `r`.
pub const fn reg_data(r: i64, b: i64) -> i64 {
    REG_BASE + bank::data(r) + b
}

/// Absolute cell of the memory header field at header-relative `off`.
pub const fn mem_hdr(off: i64) -> i64 {
    MEM_BASE + off
}

/// Absolute cell of byte `b` of memory cell `a`, for addresses the header
/// has not displaced.
pub const fn mem_cell(a: i64, b: i64) -> i64 {
    MEM_BASE + HDR_WIDTH + CELL_WIDTH * a + b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_file_fits_below_memory() {
        // The highest register slot must end before the memory sentinel.
        assert!(reg_data(REG_COUNT - 1, 3) < MEM_BASE);
    }

    #[test]
    fn globals_fit_below_register_file() {
        assert!(global::PIPE + 3 < REG_BASE);
    }

    #[test]
    fn slot_shape_matches_increment_layout() {
        // `incr` expects two scratch zeros directly before its operand, so
        // a slot's data must sit exactly two cells after its scratch pair.
        assert_eq!(bank::data(0) - bank::slot(0), 2);
        assert_eq!(SLOT_WIDTH, 2 + BUS_WIDTH);
    }

    #[test]
    fn special_register_cells() {
        assert_eq!(reg_scratch(SP_REG), 107);
        assert_eq!(reg_data(SP_REG, 0), 109);
        assert_eq!(reg_scratch(IP_REG), 113);
        assert_eq!(reg_data(IP_REG, 0), 115);
        assert_eq!(mem_cell(0, 0), 139);
    }
}
