//! Random-access memory over the tape: the efficient-table primitives.
//!
//! The memory region is a fixed header followed by contiguous 4-byte
//! cells. A 3-digit base-256 address drives the header *through* the
//! array: each step slides the whole header one cell-width to the right
//! and relocates the overrun memory cell to the header's left edge, so a
//! cell in transit sits exactly one header-width from home and is restored
//! by the symmetric walk back. The driving digits `i` are consumed on the
//! way out; the duplicate digits `j` are consumed driving home.
//!
//! There are four movers, not two: the store direction carries a full data
//! bus outward and an empty one back, the load direction the reverse, and
//! each mover only relocates cells that can be non-zero. Their move lists
//! are spelled out as data and emitted mechanically.
//!
//! Between top-level operations the cursor rests on the sentinel and every
//! header cell is zero.

use crate::code::{Code, Fragment, LayoutError};
use crate::expand::{ExpandError, MacroSet};
use crate::layout::hdr;

/// One mover step: `(from, to)` cell pairs relative to the mover's entry
/// cell, in an order where every destination is already vacant.
type Moves = &'static [(i64, i64)];

/// Store-direction outbound: header slides right carrying `i`, `j` and a
/// full bus; the adjacent memory cell drops to the left edge.
const STORE_IN: Moves = &[
    (10, -1),
    (6, 10),
    (2, 6),
    (13, 2),
    (9, 13),
    (5, 9),
    (1, 5),
    (12, 1),
    (8, 12),
    (4, 8),
    (0, 4),
    (11, 0),
    (7, 11),
    (3, 7),
];

/// Load-direction outbound: the bus is empty on the way in, so its four
/// cells never move and the displaced memory cell lands where the bus was.
const LOAD_IN: Moves = &[
    (3, 7),
    (4, 8),
    (5, 9),
    (0, 4),
    (1, 5),
    (2, 6),
    (10, -1),
    (11, 0),
    (12, 1),
    (13, 2),
];

/// Store-direction return: `i` and the bus are already consumed; only `j`
/// and the in-transit cell travel.
const STORE_BACK: Moves = &[
    (-8, 3),
    (-7, 4),
    (-6, 5),
    (-5, 6),
    (0, -4),
    (1, -3),
    (2, -2),
];

/// Load-direction return: `j` and the freshly filled bus travel, and the
/// in-transit cell returns over the vacated bus positions.
const LOAD_BACK: Moves = &[
    (0, -4),
    (3, -1),
    (4, 0),
    (1, -3),
    (5, 1),
    (2, -2),
    (6, 2),
    (-8, 3),
    (-7, 4),
    (-6, 5),
    (-5, 6),
];

fn mover(name: &'static str, moves: Moves, travel: i64) -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    for &(from, to) in moves {
        c.move_byte(from, to);
    }
    c.goto(travel);
    c.seal_traveling(name, 0, Some(travel))
}

/// Emit the 3-digit radix-256 drive: apply `step` once per unit of the
/// little-endian counter at `p..p+2`, consuming the counter. A digit that
/// runs dry borrows from the next by wrapping it from zero to 255, the
/// standard nested countdown. The cursor enters anywhere left of `p` and
/// exits on `p`, in the coordinates of wherever the header ends up.
fn drive(c: &mut Code, p: i64, step: &Fragment) {
    // Low digit.
    c.goto(p);
    c.open();
    c.dec(1);
    c.call(step);
    c.close_traveling(p);
    // Middle digit: each unit is one borrow step plus a 255-drain.
    c.goto(p + 1);
    c.open();
    c.dec(1);
    c.goto(p);
    c.dec(1);
    c.call(step);
    c.open();
    c.dec(1);
    c.call(step);
    c.close_traveling(p);
    c.goto(p + 1);
    c.close();
    // High digit: one borrow unit, then a full middle-digit drain.
    c.goto(p + 2);
    c.open();
    c.dec(1);
    c.goto(p + 1);
    c.dec(1);
    c.goto(p);
    c.dec(1);
    c.call(step);
    c.open();
    c.dec(1);
    c.call(step);
    c.close_traveling(p);
    c.goto(p + 1);
    c.open();
    c.dec(1);
    c.goto(p);
    c.dec(1);
    c.call(step);
    c.open();
    c.dec(1);
    c.call(step);
    c.close_traveling(p);
    c.goto(p + 1);
    c.close();
    c.goto(p + 2);
    c.close();
}

fn write_op(store_in: &Fragment, store_back: &Fragment) -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    drive(&mut c, hdr::I0, store_in);
    c.goto(hdr::S);
    // Overwrite the addressed cell with the bus.
    for k in 0..4 {
        c.goto(hdr::C0 + k);
        c.clear();
    }
    for k in 0..4 {
        c.move_byte(hdr::D0 + k, hdr::C0 + k);
    }
    drive(&mut c, hdr::J0, store_back);
    c.goto(hdr::S);
    c.seal("awrite", hdr::S)
}

fn read_op(load_in: &Fragment, load_back: &Fragment) -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    drive(&mut c, hdr::I0, load_in);
    c.goto(hdr::S);
    // Copy the addressed cell onto the bus, restoring it through the
    // consumed i0 cell.
    for k in 0..4 {
        c.copy_byte(hdr::C0 + k, hdr::I0, &[hdr::D0 + k]);
    }
    drive(&mut c, hdr::J0, load_back);
    c.goto(hdr::S);
    c.seal("aread", hdr::S)
}

/// The sealed memory fragment set.
pub struct MemoryFragments {
    pub store_in: Fragment,
    pub store_back: Fragment,
    pub load_in: Fragment,
    pub load_back: Fragment,
    /// `awrite`: cursor on `s`, `i = j = address`, bus holds the value;
    /// stores the value and returns with the header zeroed.
    pub write: Fragment,
    /// `aread`: cursor on `s`, `i = j = address`, bus zero; returns with
    /// the value on the bus and everything else zeroed.
    pub read: Fragment,
}

pub fn build() -> Result<MemoryFragments, LayoutError> {
    let store_in = mover("amovlw", STORE_IN, 4)?;
    let store_back = mover("amovrw", STORE_BACK, -4)?;
    let load_in = mover("amovlr", LOAD_IN, 4)?;
    let load_back = mover("amovrr", LOAD_BACK, -4)?;
    let write = write_op(&store_in, &store_back)?;
    let read = read_op(&load_in, &load_back)?;
    log::debug!(
        "memory fragments built (write {} chars, read {} chars unexpanded)",
        write.body.len(),
        read.body.len()
    );
    Ok(MemoryFragments {
        store_in,
        store_back,
        load_in,
        load_back,
        write,
        read,
    })
}

impl MemoryFragments {
    pub fn register(&self, set: &mut MacroSet) -> Result<(), ExpandError> {
        for frag in [
            &self.store_in,
            &self.store_back,
            &self.load_in,
            &self.load_back,
            &self.write,
            &self.read,
        ] {
            set.add(frag)?;
        }
        Ok(())
    }
}
