//! Brainfuck fragment builder.
//!
//! [`Code`] is an emission buffer that tracks the virtual cursor while
//! Brainfuck text is appended, so tape offsets are always written as
//! computed shifts rather than hand-counted runs of `>` and `<`. Sealing a
//! buffer into a [`Fragment`] checks the tracked cursor against the
//! fragment's declared exit cell; a mismatch is a generation-time error.
//!
//! Loops come in two kinds. A *balanced* loop returns the cursor to the
//! cell it opened on and is verified by the tracker. A *traveling* loop
//! moves the cursor a fixed amount per iteration (array movers, breadcrumb
//! walks); its exit position depends on runtime data, so the caller closes
//! it with the position the surrounding frame convention guarantees.

use std::fmt;

use thiserror::Error;

/// Generation-time layout failures. Any of these aborts emission: a
/// fragment that cannot account for its own cursor cannot be composed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("fragment `{name}` exits at cell {actual}, declared {expected}")]
    CursorMismatch {
        name: String,
        expected: i64,
        actual: i64,
    },
    #[error("fragment `{name}` has {count} unclosed loop(s)")]
    UnclosedLoop { name: String, count: usize },
    #[error("fragment `{name}`: {message}")]
    Emission { name: String, message: String },
}

/// A named, sealed Brainfuck snippet with a known entry cell and, when the
/// walk is not data-dependent, a known net cursor travel.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub name: &'static str,
    pub body: String,
    pub entry: i64,
    /// Net cursor travel of one execution, `None` when it depends on the
    /// values being walked (index seeks).
    pub travel: Option<i64>,
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

/// Cursor-tracked Brainfuck emission buffer.
pub struct Code {
    text: String,
    cursor: i64,
    /// False after calling a data-travel fragment, until `assume` re-anchors.
    known: bool,
    opens: Vec<(i64, bool)>,
    fault: Option<String>,
}

impl Code {
    pub fn new() -> Self {
        Self::new_at(0)
    }

    /// Start a buffer whose entry cursor is `entry` in the fragment's frame.
    pub fn new_at(entry: i64) -> Self {
        Code {
            text: String::with_capacity(256),
            cursor: entry,
            known: true,
            opens: Vec::new(),
            fault: None,
        }
    }

    fn fail(&mut self, message: String) {
        if self.fault.is_none() {
            self.fault = Some(message);
        }
    }

    /// Emit `>` or `<` `|delta|` times.
    pub fn shift(&mut self, delta: i64) {
        let (ch, n) = if delta >= 0 {
            ('>', delta)
        } else {
            ('<', -delta)
        };
        for _ in 0..n {
            self.text.push(ch);
        }
        self.cursor += delta;
    }

    /// Move the cursor to `cell` (frame coordinates).
    pub fn goto(&mut self, cell: i64) {
        if !self.known {
            self.fail(format!("goto({cell}) with unanchored cursor"));
            return;
        }
        let delta = cell - self.cursor;
        self.shift(delta);
    }

    /// Re-anchor the tracker after a data-dependent walk. The new value is
    /// a statement about the frame convention, not something the builder
    /// can verify.
    pub fn assume(&mut self, cell: i64) {
        self.cursor = cell;
        self.known = true;
    }

    pub fn inc(&mut self, n: u8) {
        for _ in 0..n {
            self.text.push('+');
        }
    }

    pub fn dec(&mut self, n: u8) {
        for _ in 0..n {
            self.text.push('-');
        }
    }

    /// `[-]`: clear the current cell.
    pub fn clear(&mut self) {
        self.text.push_str("[-]");
    }

    /// `,`: read one input byte into the current cell.
    pub fn input(&mut self) {
        self.text.push(',');
    }

    /// Open a loop on the current cell.
    pub fn open(&mut self) {
        self.text.push('[');
        self.opens.push((self.cursor, self.known));
    }

    /// Close a balanced loop; the cursor must be back on the opening cell.
    pub fn close(&mut self) {
        self.text.push(']');
        match self.opens.pop() {
            Some((at, known)) => {
                if known && self.known && at != self.cursor {
                    self.fail(format!(
                        "balanced loop opened at cell {at} closes at cell {}",
                        self.cursor
                    ));
                }
            }
            None => self.fail("unmatched `]`".into()),
        }
    }

    /// Close a traveling loop and re-anchor the cursor at `exit`, the cell
    /// the frame convention places it on once the walk runs dry.
    pub fn close_traveling(&mut self, exit: i64) {
        self.text.push(']');
        if self.opens.pop().is_none() {
            self.fail("unmatched `]`".into());
        }
        self.assume(exit);
    }

    /// Reference another fragment by name; the expansion pass inlines it.
    pub fn call(&mut self, frag: &Fragment) {
        self.text.push('{');
        self.text.push_str(frag.name);
        self.text.push('}');
        match frag.travel {
            Some(t) => self.cursor += t,
            None => self.known = false,
        }
    }

    /// Move the byte at `from` onto `to` (which must hold zero), leaving
    /// the cursor on `from`.
    pub fn move_byte(&mut self, from: i64, to: i64) {
        self.goto(from);
        self.open();
        self.dec(1);
        self.goto(to);
        self.inc(1);
        self.goto(from);
        self.close();
    }

    /// Copy the byte at `from` into every cell of `dests` without losing
    /// it, routing through the zero scratch cell `via`. Ends on `via`.
    pub fn copy_byte(&mut self, from: i64, via: i64, dests: &[i64]) {
        self.goto(from);
        self.open();
        self.dec(1);
        self.goto(via);
        self.inc(1);
        for &d in dests {
            self.goto(d);
            self.inc(1);
        }
        self.goto(from);
        self.close();
        self.move_byte(via, from);
    }

    /// Finish the fragment, checking loop balance and the declared exit.
    pub fn seal(self, name: &'static str, exit: i64) -> Result<Fragment, LayoutError> {
        if let Some(message) = self.fault {
            return Err(LayoutError::Emission {
                name: name.into(),
                message,
            });
        }
        if !self.opens.is_empty() {
            return Err(LayoutError::UnclosedLoop {
                name: name.into(),
                count: self.opens.len(),
            });
        }
        if self.known && self.cursor != exit {
            return Err(LayoutError::CursorMismatch {
                name: name.into(),
                expected: exit,
                actual: self.cursor,
            });
        }
        Ok(Fragment {
            name,
            body: self.text,
            entry: 0,
            travel: Some(0),
        })
    }

    /// Like [`Code::seal`] but records a non-zero or data-dependent travel.
    pub fn seal_traveling(
        self,
        name: &'static str,
        entry: i64,
        travel: Option<i64>,
    ) -> Result<Fragment, LayoutError> {
        if let Some(message) = self.fault {
            return Err(LayoutError::Emission {
                name: name.into(),
                message,
            });
        }
        if !self.opens.is_empty() {
            return Err(LayoutError::UnclosedLoop {
                name: name.into(),
                count: self.opens.len(),
            });
        }
        if let Some(t) = travel {
            if self.known && self.cursor != entry + t {
                return Err(LayoutError::CursorMismatch {
                    name: name.into(),
                    expected: entry + t,
                    actual: self.cursor,
                });
            }
        }
        Ok(Fragment {
            name,
            body: self.text,
            entry,
            travel,
        })
    }
}

impl Default for Code {
    fn default() -> Self {
        Code::new()
    }
}

/// Errors from the text-level cursor check.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetShiftError {
    #[error("unbalanced brackets")]
    Unbalanced,
    #[error("loop body at offset {at} has net travel {travel}; not statically decidable")]
    Undecidable { at: usize, travel: i64 },
}

/// Compute the net cursor travel of a Brainfuck text, requiring every loop
/// body to be travel-neutral. Fragments that intentionally travel inside
/// loops (movers, seeks) are rejected as undecidable rather than guessed
/// at; their contracts are exercised at runtime instead.
pub fn net_shift(text: &str) -> Result<i64, NetShiftError> {
    let mut stack: Vec<(usize, i64)> = Vec::new();
    let mut travel = 0i64;
    for (at, ch) in text.char_indices() {
        match ch {
            '>' => travel += 1,
            '<' => travel -= 1,
            '[' => {
                stack.push((at, travel));
                travel = 0;
            }
            ']' => {
                let (open_at, outer) = stack.pop().ok_or(NetShiftError::Unbalanced)?;
                if travel != 0 {
                    return Err(NetShiftError::Undecidable {
                        at: open_at,
                        travel,
                    });
                }
                travel = outer;
            }
            _ => {}
        }
    }
    if stack.is_empty() {
        Ok(travel)
    } else {
        Err(NetShiftError::Unbalanced)
    }
}
