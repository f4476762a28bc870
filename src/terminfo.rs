// SPDX-License-Identifier: MIT
//
// Terminfo — capability records and the machinery to use them.
//
// A `Terminfo` is the description of one terminal type: the escape
// strings for every display action the screen performs, the byte
// sequences its keys send, and its static numbers (geometry, color
// count). The screen treats capability strings as opaque except for
// knowing which one to use for each action.
//
// Three operations make the strings usable:
//
//   tparm  — expand a parameterised capability (the `%` stack language
//            from terminfo(5): push/pop, arithmetic, conditionals).
//   tgoto  — cursor addressing, a tparm over `set_cursor` with the
//            row/column order that `cup` expects.
//   tputs  — write a capability, turning embedded `$<ms>` padding
//            markers into NUL pad bytes scaled by the output baud rate.
//
// Descriptions live in a process-wide registry keyed by terminal name
// and alias. The built-in database seeds it on first lookup; `register`
// adds descriptions at runtime. The registry is effectively read-only
// after startup.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::database;
use crate::error::Error;

// ─── Terminfo ────────────────────────────────────────────────────────────────

/// The capability record for one terminal type.
///
/// Empty strings mean "this terminal has no such capability"; writers
/// emit nothing for them. Key fields hold the byte sequence the terminal
/// sends for that key, again empty when absent. `key_fn[0]` is F1.
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_field_names)] // The `key_` prefix is the grouping.
pub struct Terminfo {
    /// Primary name, as `$TERM` selects it.
    pub name: String,
    /// Alternate names resolving to this record.
    pub aliases: Vec<String>,

    /// Default geometry when the OS cannot be asked.
    pub columns: u16,
    /// Default geometry when the OS cannot be asked.
    pub lines: u16,
    /// Number of colors the terminal supports (0 for monochrome).
    pub colors: u16,

    /// Enter the alternate (cursor-addressing) screen.
    pub enter_ca: String,
    /// Leave the alternate screen.
    pub exit_ca: String,
    /// Enter application keypad mode.
    pub enter_keypad: String,
    /// Leave application keypad mode.
    pub exit_keypad: String,
    /// Make the cursor visible.
    pub show_cursor: String,
    /// Make the cursor invisible.
    pub hide_cursor: String,
    /// Clear the screen and home the cursor.
    pub clear: String,
    /// Turn all attributes off.
    pub attr_off: String,
    /// Enter bold.
    pub bold: String,
    /// Enter underline.
    pub underline: String,
    /// Enter reverse video.
    pub reverse: String,
    /// Enter blink.
    pub blink: String,
    /// Enter dim.
    pub dim: String,
    /// Set foreground color (parameterised, one argument).
    pub set_fg: String,
    /// Set background color (parameterised, one argument).
    pub set_bg: String,
    /// Cursor addressing (parameterised: row, column).
    pub set_cursor: String,
    /// Begin mouse tracking.
    pub enter_mouse: String,
    /// End mouse tracking.
    pub exit_mouse: String,
    /// The prefix bytes of a mouse report. Empty means no mouse.
    pub mouse: String,

    /// Backspace key.
    pub key_backspace: String,
    /// Cursor up key.
    pub key_up: String,
    /// Cursor down key.
    pub key_down: String,
    /// Cursor left key.
    pub key_left: String,
    /// Cursor right key.
    pub key_right: String,
    /// Home key.
    pub key_home: String,
    /// End key.
    pub key_end: String,
    /// Page-up key.
    pub key_page_up: String,
    /// Page-down key.
    pub key_page_down: String,
    /// Insert key.
    pub key_insert: String,
    /// Delete key.
    pub key_delete: String,
    /// Help key.
    pub key_help: String,
    /// Function keys, `key_fn[0]` being F1.
    pub key_fn: Vec<String>,
}

impl Terminfo {
    /// Expand a parameterised capability string.
    ///
    /// Missing parameters read as 0; unknown `%` operations are ignored.
    #[must_use]
    pub fn tparm(&self, cap: &str, params: &[i64]) -> String {
        expand(cap, params)
    }

    /// Cursor addressing for `(x, y)` in screen coordinates.
    ///
    /// `set_cursor` takes the row first, so the arguments swap here.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // Screen coordinates are tiny.
    pub fn tgoto(&self, x: usize, y: usize) -> String {
        expand(&self.set_cursor, &[y as i64, x as i64])
    }
}

// ─── tparm — the `%` stack machine ──────────────────────────────────────────

/// Expand `%` operations in `cap` against `params`.
///
/// Implements the terminfo(5) operations real descriptions use: `%%`,
/// `%i`, `%p1`..`%p9`, `%d`, `%c`, `%s`, `%{n}`, `%'c'`, `%l`,
/// `%P`/`%g` variables, arithmetic (`%+ %- %* %/ %m`), bit and logic ops
/// (`%& %| %^ %A %O %! %~`), comparisons (`%= %> %<`), and the
/// `%? expr %t then %e else %;` conditional with nesting.
#[allow(
    clippy::too_many_lines,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]
fn expand(cap: &str, params: &[i64]) -> String {
    let bytes = cap.as_bytes();
    let mut out = String::with_capacity(cap.len());
    let mut stack: Vec<i64> = Vec::new();
    // Dynamic (a-z) and static (A-Z) variables share one frame; the
    // distinction only matters across calls, which no capability we
    // carry relies on.
    let mut vars = [0i64; 52];

    let mut args = [0i64; 9];
    for (slot, &p) in args.iter_mut().zip(params.iter()) {
        *slot = p;
    }

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i] as char);
            i += 1;
            continue;
        }
        i += 1;
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'%' => out.push('%'),
            b'i' => {
                args[0] += 1;
                args[1] += 1;
            }
            b'c' => {
                let v = stack.pop().unwrap_or(0);
                if let Some(ch) = char::from_u32(v as u32) {
                    out.push(ch);
                }
            }
            b'd' | b's' => {
                let v = stack.pop().unwrap_or(0);
                out.push_str(&v.to_string());
            }
            b'l' => {
                // Length of the decimal rendering.
                let v = stack.pop().unwrap_or(0);
                stack.push(v.to_string().len() as i64);
            }
            b'p' => {
                i += 1;
                if i < bytes.len() && (b'1'..=b'9').contains(&bytes[i]) {
                    stack.push(args[usize::from(bytes[i] - b'1')]);
                }
            }
            b'P' => {
                i += 1;
                if let Some(slot) = var_slot(bytes.get(i)) {
                    vars[slot] = stack.pop().unwrap_or(0);
                }
            }
            b'g' => {
                i += 1;
                if let Some(slot) = var_slot(bytes.get(i)) {
                    stack.push(vars[slot]);
                }
            }
            b'\'' => {
                i += 1;
                if i < bytes.len() {
                    stack.push(i64::from(bytes[i]));
                    i += 1; // closing quote
                }
            }
            b'{' => {
                i += 1;
                let mut v: i64 = 0;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    v = v * 10 + i64::from(bytes[i] - b'0');
                    i += 1;
                }
                stack.push(v);
                // `i` now sits on the closing brace.
            }
            op @ (b'+' | b'-' | b'*' | b'/' | b'm' | b'&' | b'|' | b'^' | b'=' | b'>' | b'<'
            | b'A' | b'O') => {
                let b = stack.pop().unwrap_or(0);
                let a = stack.pop().unwrap_or(0);
                stack.push(binop(op, a, b));
            }
            b'!' => {
                let v = stack.pop().unwrap_or(0);
                stack.push(i64::from(v == 0));
            }
            b'~' => {
                let v = stack.pop().unwrap_or(0);
                stack.push(!v);
            }
            b'?' => {}
            b't' => {
                if stack.pop().unwrap_or(0) == 0 {
                    i = skip_branch(bytes, i + 1, true);
                    continue;
                }
            }
            b'e' => {
                // The then-branch ran; jump past the else part.
                i = skip_branch(bytes, i + 1, false);
                continue;
            }
            b';' => {}
            _ => {}
        }
        i += 1;
    }

    out
}

fn binop(op: u8, a: i64, b: i64) -> i64 {
    match op {
        b'+' => a.wrapping_add(b),
        b'-' => a.wrapping_sub(b),
        b'*' => a.wrapping_mul(b),
        b'/' => {
            if b == 0 {
                0
            } else {
                a / b
            }
        }
        b'm' => {
            if b == 0 {
                0
            } else {
                a % b
            }
        }
        b'&' => a & b,
        b'|' => a | b,
        b'^' => a ^ b,
        b'=' => i64::from(a == b),
        b'>' => i64::from(a > b),
        b'<' => i64::from(a < b),
        b'A' => i64::from(a != 0 && b != 0),
        b'O' => i64::from(a != 0 || b != 0),
        _ => 0,
    }
}

/// Variable slot for `%P`/`%g`: a-z in 0..26, A-Z in 26..52.
fn var_slot(b: Option<&u8>) -> Option<usize> {
    match b {
        Some(&c @ b'a'..=b'z') => Some(usize::from(c - b'a')),
        Some(&c @ b'A'..=b'Z') => Some(26 + usize::from(c - b'A')),
        _ => None,
    }
}

/// Skip forward from inside a conditional.
///
/// With `stop_at_else` the scan stops just past a same-depth `%e`
/// (the then-part was false, run the else-part); either way it stops
/// just past the same-depth `%;`. Returns the index to resume at.
fn skip_branch(bytes: &[u8], mut i: usize, stop_at_else: bool) -> usize {
    let mut depth = 0usize;
    while i + 1 < bytes.len() {
        if bytes[i] == b'%' {
            match bytes[i + 1] {
                b'?' => depth += 1,
                b';' => {
                    if depth == 0 {
                        return i + 2;
                    }
                    depth -= 1;
                }
                b'e' if stop_at_else && depth == 0 => return i + 2,
                _ => {}
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    bytes.len()
}

// ─── tputs — padding-aware capability output ─────────────────────────────────

/// Write a capability string, expanding `$<ms>` padding markers.
///
/// Padding becomes NUL pad bytes: at `baud` bits per second the terminal
/// consumes `baud / 8000` bytes per millisecond, so a `$<ms>` delay is
/// `ms * baud / 8000` pad bytes. A `baud` of 0 drops padding entirely.
/// The marker accepts a decimal delay with an optional tenths digit and
/// the `*`/`/` suffixes, which are passed over.
///
/// # Errors
///
/// Propagates failures from the underlying writer.
pub fn tputs<W: Write + ?Sized>(w: &mut W, s: &str, baud: u32) -> io::Result<()> {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        // Copy the literal run up to the next potential padding marker.
        let start = i;
        while i < bytes.len() && bytes[i] != b'$' {
            i += 1;
        }
        if i > start {
            w.write_all(&bytes[start..i])?;
        }
        if i >= bytes.len() {
            break;
        }

        match parse_padding(&bytes[i..]) {
            Some((ms, consumed)) => {
                if baud > 0 {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let pad = (ms * f64::from(baud) / 8000.0) as usize;
                    for _ in 0..pad {
                        w.write_all(&[0])?;
                    }
                }
                i += consumed;
            }
            None => {
                // A lone '$' with no well-formed marker is literal text.
                w.write_all(&[b'$'])?;
                i += 1;
            }
        }
    }

    Ok(())
}

/// Parse a `$<ms>` marker at the start of `bytes`.
///
/// Returns the delay in milliseconds and the number of bytes consumed,
/// or `None` if this is not a well-formed marker.
fn parse_padding(bytes: &[u8]) -> Option<(f64, usize)> {
    if bytes.len() < 3 || bytes[0] != b'$' || bytes[1] != b'<' {
        return None;
    }
    let mut ms = 0.0f64;
    let mut scale = 0.0f64;
    let mut i = 2;
    loop {
        match bytes.get(i)? {
            d @ b'0'..=b'9' => {
                let digit = f64::from(d - b'0');
                if scale > 0.0 {
                    ms += digit / scale;
                    scale *= 10.0;
                } else {
                    ms = ms * 10.0 + digit;
                }
            }
            b'.' if scale == 0.0 => scale = 10.0,
            b'*' | b'/' => {}
            b'>' => return Some((ms, i + 1)),
            _ => return None,
        }
        i += 1;
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

type Db = Mutex<HashMap<String, Arc<Terminfo>>>;

static DATABASE: OnceLock<Db> = OnceLock::new();

fn db() -> &'static Db {
    DATABASE.get_or_init(|| {
        let mut map = HashMap::new();
        for ti in database::builtins() {
            insert(&mut map, &Arc::new(ti));
        }
        Mutex::new(map)
    })
}

fn insert(map: &mut HashMap<String, Arc<Terminfo>>, ti: &Arc<Terminfo>) {
    map.insert(ti.name.clone(), Arc::clone(ti));
    for alias in &ti.aliases {
        map.insert(alias.clone(), Arc::clone(ti));
    }
}

/// Add a terminal description to the process-wide registry.
///
/// The description becomes visible to [`lookup`] under its name and all
/// of its aliases, replacing earlier entries with the same names.
pub fn register(ti: Terminfo) {
    let ti = Arc::new(ti);
    let mut map = db().lock().unwrap_or_else(PoisonError::into_inner);
    insert(&mut map, &ti);
}

/// Find the description for a terminal name (`$TERM`).
///
/// # Errors
///
/// [`Error::TermNotSet`] for an empty name, [`Error::UnknownTerminal`]
/// when no registered description matches.
pub fn lookup(name: &str) -> Result<Arc<Terminfo>, Error> {
    if name.is_empty() {
        return Err(Error::TermNotSet);
    }
    db().lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownTerminal(name.to_string()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
