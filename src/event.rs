// SPDX-License-Identifier: MIT
//
// Event — what the screen delivers to its caller.
//
// A closed union of the three things that can happen: a key (a rune or
// a terminfo-named key), a mouse report, a window resize. Events are
// produced by the input thread and the resize path, queued on a bounded
// channel, and consumed through `poll_event`.

use bitflags::bitflags;

// ─── Key identity ────────────────────────────────────────────────────────────

/// Identity of a pressed key.
///
/// Printable input arrives as [`Key::Char`] carrying the decoded rune.
/// The named variants are the keys a terminal description can map to an
/// escape sequence; [`Key::F`] covers the function-key row (`F(1)` is
/// F1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A rune, decoded from printable ASCII or UTF-8.
    Char(char),
    Backspace,
    Insert,
    Delete,
    Home,
    End,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Help,
    /// Function key `F(n)`.
    F(u8),
}

bitflags! {
    /// Modifier keys reported alongside a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Mods: u8 {
        const SHIFT = 1 << 0;
        const META  = 1 << 1;
        const CTRL  = 1 << 2;
    }
}

bitflags! {
    /// Mouse buttons and wheel directions, as a mask.
    ///
    /// An empty mask is a release (no button held). Wheel bits share a
    /// report opcode with buttons 1 and 2 on the wire; the scanner
    /// disambiguates before events reach this type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Buttons: u16 {
        const BUTTON1     = 1 << 0;
        const BUTTON2     = 1 << 1;
        const BUTTON3     = 1 << 2;
        const BUTTON4     = 1 << 3;
        const BUTTON5     = 1 << 4;
        const BUTTON6     = 1 << 5;
        const BUTTON7     = 1 << 6;
        const BUTTON8     = 1 << 7;
        const WHEEL_UP    = 1 << 8;
        const WHEEL_DOWN  = 1 << 9;
        const WHEEL_LEFT  = 1 << 10;
        const WHEEL_RIGHT = 1 << 11;
    }
}

// ─── Event payloads ──────────────────────────────────────────────────────────

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key.
    pub key: Key,
    /// Modifiers held with it.
    pub mods: Mods,
}

impl KeyEvent {
    /// A key press with no modifiers.
    #[inline]
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            mods: Mods::empty(),
        }
    }
}

/// A mouse report: position, held buttons or wheel motion, modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Column, clipped to the window.
    pub x: u16,
    /// Row, clipped to the window.
    pub y: u16,
    /// Buttons currently down, or a wheel direction. Empty on release.
    pub buttons: Buttons,
    /// Modifiers held during the report.
    pub mods: Mods,
}

/// The window changed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    /// New width in columns.
    pub w: u16,
    /// New height in rows.
    pub h: u16,
}

/// Anything the screen can deliver from [`poll_event`].
///
/// [`poll_event`]: crate::screen::Screen::poll_event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A decoded key press.
    Key(KeyEvent),
    /// A decoded mouse report.
    Mouse(MouseEvent),
    /// A window resize.
    Resize(ResizeEvent),
}

impl Event {
    /// Shorthand for an unmodified rune key event.
    #[inline]
    #[must_use]
    pub const fn rune(ch: char) -> Self {
        Self::Key(KeyEvent::plain(Key::Char(ch)))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
