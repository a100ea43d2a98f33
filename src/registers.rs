//! The banked register file.
//!
//! Registers live in six-cell slots: two scratch cells, then four data
//! bytes. A one-byte index is walked rightward across the slots, leaving a
//! sentinel `1` in each visited slot's first scratch cell; the trail is
//! what the relays and the return walk steer by. The bus slot between the
//! index cell and slot 0 shares the slot shape, so every hop is the same
//! six-cell stride.
//!
//! Bytes cross the variable distance between bus and slot one at a time,
//! riding the second scratch cell of each slot: the relay loop moves the
//! byte one slot over, steps to the next first-scratch cell, and keeps
//! going while it finds a sentinel there. The sentinels themselves are
//! only consumed by `rremove` at the very end, so a four-byte transfer
//! walks the same trail four times.

use crate::code::{Code, Fragment, LayoutError};
use crate::expand::{ExpandError, MacroSet};
use crate::layout::{SLOT_WIDTH, bank};

/// `rfill`: consume the index, walking it across the slots and dropping a
/// sentinel per visited slot. Enters on the index cell, exits on the
/// target slot's first scratch cell.
fn fill_index() -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    c.move_byte(bank::INDEX, bank::slot(0));
    c.goto(bank::slot(0));
    c.open();
    c.open();
    c.dec(1);
    c.shift(SLOT_WIDTH);
    c.inc(1);
    c.shift(-SLOT_WIDTH);
    c.close();
    c.inc(1);
    c.shift(SLOT_WIDTH);
    c.dec(1);
    c.close_traveling(bank::slot(0));
    c.seal_traveling("rfill", bank::INDEX, None)
}

/// `rremove`: walk the sentinel trail back, zeroing it. Enters on the
/// target slot's first scratch cell, exits on the index cell.
fn remove_index() -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    c.shift(-SLOT_WIDTH);
    c.open();
    c.dec(1);
    c.shift(-SLOT_WIDTH);
    c.close_traveling(bank::BUS_S0);
    c.shift(-1);
    c.seal_traveling("rremove", 0, None)
}

/// Relay the byte on the current slot's second scratch cell down to the
/// bus, one slot per sentinel. Enters on the target's first scratch cell
/// after the byte has been lifted; exits on the bus slot's first scratch
/// cell with the byte on the bus slot's second scratch cell.
fn relay_down(c: &mut Code) {
    c.goto(1);
    c.open();
    c.dec(1);
    c.shift(-SLOT_WIDTH);
    c.inc(1);
    c.shift(SLOT_WIDTH);
    c.close();
    c.shift(-(SLOT_WIDTH + 1));
    c.open();
    c.shift(1);
    c.open();
    c.dec(1);
    c.shift(-SLOT_WIDTH);
    c.inc(1);
    c.shift(SLOT_WIDTH);
    c.close();
    c.shift(-(SLOT_WIDTH + 1));
    c.close_traveling(bank::BUS_S0);
}

/// Relay the byte on the bus slot's second scratch cell up to the target
/// slot. Enters on the bus second scratch cell, exits on the target's
/// first scratch cell with the byte on the target's second scratch cell.
fn relay_up(c: &mut Code) {
    c.open();
    c.dec(1);
    c.shift(SLOT_WIDTH);
    c.inc(1);
    c.shift(-SLOT_WIDTH);
    c.close();
    c.shift(SLOT_WIDTH - 1);
    c.open();
    c.shift(1);
    c.open();
    c.dec(1);
    c.shift(SLOT_WIDTH);
    c.inc(1);
    c.shift(-SLOT_WIDTH);
    c.close();
    c.shift(-1);
    c.shift(SLOT_WIDTH);
    c.close_traveling(0);
}

/// Walk from the bus slot's second scratch cell out to the target slot
/// without touching the trail.
fn seek_target(c: &mut Code) {
    c.goto(bank::BUS_S1);
    c.shift(SLOT_WIDTH - 1);
    c.open();
    c.shift(SLOT_WIDTH);
    c.close_traveling(0);
}

/// Walk from the target slot's first scratch cell back to the bus slot
/// without touching the trail.
fn seek_bus(c: &mut Code) {
    c.shift(-SLOT_WIDTH);
    c.open();
    c.shift(-SLOT_WIDTH);
    c.close_traveling(bank::BUS_S0);
}

/// `rread1`/`rread4`: copy `n` bytes from the indexed slot onto the bus.
/// The slot is preserved; the index is consumed.
fn read_op(
    name: &'static str,
    n: i64,
    fill: &Fragment,
    remove: &Fragment,
) -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    c.call(fill);
    c.assume(0);
    for k in 0..n {
        // Lift the byte: duplicate into the slot's scratch pair, restore
        // the source from the first scratch.
        c.goto(2 + k);
        c.open();
        c.dec(1);
        c.goto(1);
        c.inc(1);
        c.goto(0);
        c.inc(1);
        c.goto(2 + k);
        c.close();
        c.move_byte(0, 2 + k);
        relay_down(&mut c);
        c.move_byte(bank::BUS_S1, bank::BUS_D0 + k);
        seek_target(&mut c);
    }
    c.call(remove);
    c.assume(bank::INDEX);
    c.seal(name, bank::INDEX)
}

/// `rwrite1`/`rwrite4`: move `n` bytes from the bus into the indexed slot,
/// zeroing the slot bytes first. The bus is consumed, as is the index.
fn write_op(
    name: &'static str,
    n: i64,
    fill: &Fragment,
    remove: &Fragment,
) -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    c.call(fill);
    c.assume(0);
    for k in 0..n {
        c.goto(2 + k);
        c.clear();
    }
    c.goto(0);
    seek_bus(&mut c);
    for k in 0..n {
        c.move_byte(bank::BUS_D0 + k, bank::BUS_S1);
        c.goto(bank::BUS_S1);
        relay_up(&mut c);
        c.move_byte(1, 2 + k);
        c.goto(0);
        if k < n - 1 {
            seek_bus(&mut c);
        }
    }
    c.call(remove);
    c.assume(bank::INDEX);
    c.seal(name, bank::INDEX)
}

/// The sealed register fragment set.
pub struct RegisterFragments {
    pub fill: Fragment,
    pub remove: Fragment,
    pub read1: Fragment,
    pub read4: Fragment,
    pub write1: Fragment,
    pub write4: Fragment,
}

pub fn build() -> Result<RegisterFragments, LayoutError> {
    let fill = fill_index()?;
    let remove = remove_index()?;
    let read1 = read_op("rread1", 1, &fill, &remove)?;
    let read4 = read_op("rread4", 4, &fill, &remove)?;
    let write1 = write_op("rwrite1", 1, &fill, &remove)?;
    let write4 = write_op("rwrite4", 4, &fill, &remove)?;
    Ok(RegisterFragments {
        fill,
        remove,
        read1,
        read4,
        write1,
        write4,
    })
}

impl RegisterFragments {
    pub fn register(&self, set: &mut MacroSet) -> Result<(), ExpandError> {
        for frag in [
            &self.fill,
            &self.remove,
            &self.read1,
            &self.read4,
            &self.write1,
            &self.write4,
        ] {
            set.add(frag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Interpreter;
    use crate::layout::bank;

    fn expanded(which: &str) -> String {
        let frags = build().unwrap();
        let mut set = MacroSet::new();
        frags.register(&mut set).unwrap();
        set.expand(which).unwrap()
    }

    fn set_cell(s: &mut String, cell: i64, value: u8) {
        s.push_str(&">".repeat(cell as usize));
        s.push_str(&"+".repeat(value as usize));
        s.push_str(&"<".repeat(cell as usize));
    }

    fn index_setup(r: u8) -> String {
        let mut s = String::new();
        set_cell(&mut s, bank::INDEX, r);
        s
    }

    fn bus_setup(value: u32) -> String {
        let mut s = String::new();
        for (k, byte) in value.to_le_bytes().iter().enumerate() {
            set_cell(&mut s, bank::BUS_D0 + k as i64, *byte);
        }
        s
    }

    type Host = Interpreter<std::io::Empty, std::io::Sink>;

    fn run(program: &str) -> Host {
        let mut interp = Interpreter::new(program, std::io::empty(), std::io::sink())
            .unwrap()
            .with_fuel(50_000_000);
        interp.run().unwrap();
        interp
    }

    fn slot_value(interp: &Host, r: i64) -> u32 {
        let base = bank::data(r) as usize;
        u32::from_le_bytes([
            interp.cell(base),
            interp.cell(base + 1),
            interp.cell(base + 2),
            interp.cell(base + 3),
        ])
    }

    fn bus_value(interp: &Host) -> u32 {
        let base = bank::BUS_D0 as usize;
        u32::from_le_bytes([
            interp.cell(base),
            interp.cell(base + 1),
            interp.cell(base + 2),
            interp.cell(base + 3),
        ])
    }

    fn assert_scratches_clear(interp: &Host, slots: i64) {
        assert_eq!(interp.cell(bank::INDEX as usize), 0);
        assert_eq!(interp.cell(bank::BUS_S0 as usize), 0);
        assert_eq!(interp.cell(bank::BUS_S1 as usize), 0);
        for r in 0..slots {
            assert_eq!(interp.cell(bank::slot(r) as usize), 0, "slot {r} scratch0");
            assert_eq!(
                interp.cell(bank::slot(r) as usize + 1),
                0,
                "slot {r} scratch1"
            );
        }
    }

    #[test]
    fn write4_fills_slot_zero() {
        let program = format!(
            "{}{}{}",
            index_setup(0),
            bus_setup(0x0A0B0C0D),
            expanded("rwrite4")
        );
        let interp = run(&program);
        assert_eq!(slot_value(&interp, 0), 0x0A0B0C0D);
        assert_eq!(bus_value(&interp), 0, "bus is consumed by a write");
        assert_scratches_clear(&interp, 2);
    }

    #[test]
    fn write4_fills_a_distant_slot() {
        let program = format!(
            "{}{}{}",
            index_setup(5),
            bus_setup(0xDEADBEEF),
            expanded("rwrite4")
        );
        let interp = run(&program);
        assert_eq!(slot_value(&interp, 5), 0xDEADBEEF);
        for r in 0..5 {
            assert_eq!(slot_value(&interp, r), 0, "slot {r} must stay clear");
        }
        assert_scratches_clear(&interp, 7);
    }

    #[test]
    fn write4_overwrites_previous_value() {
        let program = format!(
            "{}{}{}{}{}{}",
            index_setup(3),
            bus_setup(0xFFFF_FFFF),
            expanded("rwrite4"),
            index_setup(3),
            bus_setup(0x0000_0001),
            expanded("rwrite4"),
        );
        let interp = run(&program);
        assert_eq!(slot_value(&interp, 3), 1);
    }

    #[test]
    fn read4_round_trips_and_preserves_slot() {
        let program = format!(
            "{}{}{}{}{}",
            index_setup(4),
            bus_setup(0x12345678),
            expanded("rwrite4"),
            index_setup(4),
            expanded("rread4"),
        );
        let interp = run(&program);
        assert_eq!(bus_value(&interp), 0x12345678);
        assert_eq!(slot_value(&interp, 4), 0x12345678);
        assert_scratches_clear(&interp, 6);
    }

    #[test]
    fn read4_of_untouched_slot_is_zero() {
        let program = format!("{}{}", index_setup(2), expanded("rread4"));
        let interp = run(&program);
        assert_eq!(bus_value(&interp), 0);
        assert_scratches_clear(&interp, 4);
    }

    #[test]
    fn neighbouring_slots_are_isolated() {
        let program = format!(
            "{}{}{}{}{}{}{}{}",
            index_setup(3),
            bus_setup(0x33333333),
            expanded("rwrite4"),
            index_setup(4),
            bus_setup(0x44444444),
            expanded("rwrite4"),
            index_setup(3),
            expanded("rread4"),
        );
        let interp = run(&program);
        assert_eq!(bus_value(&interp), 0x33333333);
        assert_eq!(slot_value(&interp, 3), 0x33333333);
        assert_eq!(slot_value(&interp, 4), 0x44444444);
    }

    #[test]
    fn write1_touches_only_the_low_byte() {
        // Fill the slot, then write a single byte over it.
        let mut tail = String::new();
        set_cell(&mut tail, bank::BUS_D0, 0x77);
        let program = format!(
            "{}{}{}{}{}{}",
            index_setup(1),
            bus_setup(0xAABBCCDD),
            expanded("rwrite4"),
            index_setup(1),
            tail,
            expanded("rwrite1"),
        );
        let interp = run(&program);
        assert_eq!(slot_value(&interp, 1), 0xAABBCC77);
    }

    #[test]
    fn read1_produces_only_the_low_byte() {
        let program = format!(
            "{}{}{}{}{}",
            index_setup(2),
            bus_setup(0x01020304),
            expanded("rwrite4"),
            index_setup(2),
            expanded("rread1"),
        );
        let interp = run(&program);
        assert_eq!(bus_value(&interp), 0x04);
        assert_eq!(slot_value(&interp, 2), 0x01020304);
    }
}
