//! In-place 4-byte little-endian increment.
//!
//! Layout: `0 0 x0 x1 x2 x3` with the cursor on the first zero. The two
//! leading zeros are the scratch pair for the wrap test, which is why a
//! register-bank slot is exactly this shape: the fragment runs directly on
//! a slot to bump SP or IP without going through the banked walk.

use crate::code::{Code, Fragment, LayoutError};

const T0: i64 = 0;
const T1: i64 = 1;
const X: i64 = 2;

/// Build `incr`: add 1 to the 4-byte value with an 8-bit carry chain.
///
/// Entry and exit on the first scratch cell. Each byte is bumped and then
/// tested for wrap by draining it into scratch and restoring it; the
/// restore loop clears the carry flag, so the flag survives only when the
/// byte wrapped to zero.
pub fn incr() -> Result<Fragment, LayoutError> {
    let mut c = Code::new();
    c.goto(X);
    c.inc(1);
    for b in 0..3 {
        let x = X + b;
        // Drain x into t0.
        c.move_byte(x, T0);
        // Arm the carry flag, then restore x, disarming the flag on the
        // first restored unit.
        c.goto(T1);
        c.inc(1);
        c.goto(T0);
        c.open();
        c.dec(1);
        c.goto(x);
        c.inc(1);
        c.goto(T1);
        c.clear();
        c.goto(T0);
        c.close();
        // Carry: bump the next byte and keep testing inside the arm.
        c.goto(T1);
        c.open();
        c.dec(1);
        c.goto(x + 1);
        c.inc(1);
    }
    for _ in 0..3 {
        c.goto(T1);
        c.close();
    }
    c.goto(T0);
    c.seal("incr", T0)
}
