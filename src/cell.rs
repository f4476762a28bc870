// SPDX-License-Identifier: MIT
//
// Cell — one character position in the screen grid.
//
// A cell holds a rune sequence (one main rune followed by its combining
// marks), the column width of the main rune, a style token, and a dirty
// bit. The dirty bit means the terminal's displayed state no longer
// matches the cell; the next draw must re-emit it.
//
// Rune normalisation happens on the way in: control runes are dropped,
// the last rune of width 1 or 2 becomes the main rune and fixes the cell
// width, zero-width runes are kept as a combining tail in input order.
// Input with no main rune at all (empty, or combining marks alone)
// collapses to a single space of width 1.
//
// An empty rune sequence is also legal (the state `clear` leaves behind)
// and renders as a space.

use unicode_width::UnicodeWidthChar;

use crate::style::Style;

/// Column width of a rune: 0 (combining / non-spacing), 1, or 2.
#[inline]
#[must_use]
pub fn rune_width(r: char) -> usize {
    r.width().unwrap_or(0)
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single grid cell: main rune + combining tail, width, style, dirty bit.
///
/// Cells are created either blank ([`Cell::blank`]) or from a rune
/// sequence ([`Cell::new`]), which normalises the input. Control runes
/// (code points below `0x20`) are never stored.
///
/// # Examples
///
/// ```
/// use termgrid::cell::Cell;
/// use termgrid::style::Style;
///
/// let cell = Cell::new(Style::DEFAULT, &['e', '\u{0301}']);
/// assert_eq!(cell.runes(), ['e', '\u{0301}']);
/// assert_eq!(cell.width(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    ch: Vec<char>,
    style: Style,
    width: u8,
    dirty: bool,
}

impl Cell {
    /// A blank cell: no runes, the given style, marked dirty.
    ///
    /// Blank cells render as a space of width 1.
    #[must_use]
    pub const fn blank(style: Style) -> Self {
        Self {
            ch: Vec::new(),
            style,
            width: 1,
            dirty: true,
        }
    }

    /// Build a cell from a rune sequence, normalising it.
    ///
    /// The last rune of width 1 or 2 becomes the main rune and sets the
    /// cell width; zero-width runes are appended after it in input
    /// order; control runes are dropped. If nothing qualifies as a main
    /// rune the cell holds a single space.
    #[must_use]
    pub fn new(style: Style, runes: &[char]) -> Self {
        let (ch, width) = normalize(runes);
        Self {
            ch,
            style,
            width,
            dirty: true,
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// The stored rune sequence. Empty means blank.
    #[inline]
    #[must_use]
    pub fn runes(&self) -> &[char] {
        &self.ch
    }

    /// The cell's style token.
    #[inline]
    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    /// Column width of the main rune (1 or 2).
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width as usize
    }

    /// Whether the cell must be re-emitted on the next draw.
    #[inline]
    #[must_use]
    pub const fn dirty(&self) -> bool {
        self.dirty
    }

    /// Whether this cell has the same runes and style as `other`.
    ///
    /// The dirty bit does not participate; this is the comparison that
    /// lets `set_cell` skip writes that would change nothing.
    #[inline]
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.style == other.style && self.ch == other.ch
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Replace the style, leaving runes alone. Marks the cell dirty.
    #[inline]
    pub fn set_style(&mut self, style: Style) {
        self.style = style;
        self.dirty = true;
    }

    /// Replace the rune sequence (normalising). Marks the cell dirty.
    pub fn set_runes(&mut self, runes: &[char]) {
        let (ch, width) = normalize(runes);
        self.ch = ch;
        self.width = width;
        self.dirty = true;
    }

    #[inline]
    pub(crate) fn mark(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::blank(Style::DEFAULT)
    }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Normalise a rune sequence into (main + combining tail, width).
fn normalize(runes: &[char]) -> (Vec<char>, u8) {
    let mut main: Option<(char, u8)> = None;
    let mut combining: Vec<char> = Vec::new();

    for &r in runes {
        if (r as u32) < 0x20 {
            continue;
        }
        match rune_width(r) {
            1 => main = Some((r, 1)),
            2 => main = Some((r, 2)),
            _ => combining.push(r),
        }
    }

    match main {
        Some((m, width)) => {
            let mut ch = Vec::with_capacity(1 + combining.len());
            ch.push(m);
            ch.extend(combining);
            (ch, width)
        }
        // No spacing rune at all: behave exactly like empty input.
        None => (vec![' '], 1),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
