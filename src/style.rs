// SPDX-License-Identifier: MIT
//
// Style — the opaque token a cell carries for its appearance.
//
// A style packs a foreground color, a background color, and an attribute
// bitset into a single comparable word. The renderer never interprets a
// style while cells are being painted; it only compares tokens for
// equality to decide whether escape output is needed, and decomposes the
// token into (fg, bg, attrs) at emission time.
//
// Colors are palette indices with a distinguished Default. Internally the
// index is 1-biased so that Default is zero and a zeroed style is the
// all-default style. Emission subtracts the bias: `Color::indexed(3)`
// reaches the terminal as parameter 3.

use bitflags::bitflags;

// ─── Color ───────────────────────────────────────────────────────────────────

/// A terminal palette color.
///
/// `Color::DEFAULT` means "leave the terminal's default in place"; the
/// renderer emits no set-color sequence for it. Everything else is a
/// palette index: the sixteen named constants cover the base palette,
/// [`Color::indexed`] reaches the rest (88- or 256-color terminals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u16);

impl Color {
    /// The terminal's own default color. No sequence is emitted for it.
    pub const DEFAULT: Self = Self(0);

    pub const BLACK: Self = Self(1);
    pub const MAROON: Self = Self(2);
    pub const GREEN: Self = Self(3);
    pub const OLIVE: Self = Self(4);
    pub const NAVY: Self = Self(5);
    pub const PURPLE: Self = Self(6);
    pub const TEAL: Self = Self(7);
    pub const SILVER: Self = Self(8);
    pub const GRAY: Self = Self(9);
    pub const RED: Self = Self(10);
    pub const LIME: Self = Self(11);
    pub const YELLOW: Self = Self(12);
    pub const BLUE: Self = Self(13);
    pub const FUCHSIA: Self = Self(14);
    pub const AQUA: Self = Self(15);
    pub const WHITE: Self = Self(16);

    /// A color by palette index (0-based, as the terminal numbers them).
    #[inline]
    #[must_use]
    pub const fn indexed(index: u16) -> Self {
        Self(index.saturating_add(1))
    }

    /// The palette index, or `None` for [`Color::DEFAULT`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> Option<u16> {
        match self.0 {
            0 => None,
            n => Some(n - 1),
        }
    }

    /// Whether this is the terminal-default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        self.0 == 0
    }

    #[inline]
    const fn bits(self) -> u64 {
        self.0 as u64
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)] // Masked to 16 bits by callers.
    const fn from_bits(bits: u64) -> Self {
        Self(bits as u16)
    }
}

// ─── Attr ────────────────────────────────────────────────────────────────────

bitflags! {
    /// Text attributes, one bit per terminfo attribute capability.
    ///
    /// These map one-to-one onto the capability strings a terminal
    /// description provides (`bold`, `smul`, `rev`, `blink`, `dim`).
    /// Combine with bitwise OR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// Increased intensity.
        const BOLD      = 1 << 0;
        /// Underlined text.
        const UNDERLINE = 1 << 1;
        /// Foreground and background swapped.
        const REVERSE   = 1 << 2;
        /// Blinking text.
        const BLINK     = 1 << 3;
        /// Decreased intensity.
        const DIM       = 1 << 4;
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// An opaque, cheaply comparable style token.
///
/// Layout: foreground color in bits 0..16, background in 16..32,
/// attributes in 32..40. `Style::DEFAULT` is the zero word: default
/// colors, no attributes.
///
/// # Examples
///
/// ```
/// use termgrid::style::{Attr, Color, Style};
///
/// let st = Style::DEFAULT.foreground(Color::RED).attributes(Attr::BOLD);
/// let (fg, bg, attrs) = st.decompose();
/// assert_eq!(fg, Color::RED);
/// assert_eq!(bg, Color::DEFAULT);
/// assert!(attrs.contains(Attr::BOLD));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style(u64);

const FG_MASK: u64 = 0xffff;
const BG_SHIFT: u32 = 16;
const BG_MASK: u64 = 0xffff << BG_SHIFT;
const ATTR_SHIFT: u32 = 32;
const ATTR_MASK: u64 = 0xff << ATTR_SHIFT;

impl Style {
    /// Default colors, no attributes.
    pub const DEFAULT: Self = Self(0);

    /// Replace the foreground color.
    #[inline]
    #[must_use]
    pub const fn foreground(self, fg: Color) -> Self {
        Self((self.0 & !FG_MASK) | fg.bits())
    }

    /// Replace the background color.
    #[inline]
    #[must_use]
    pub const fn background(self, bg: Color) -> Self {
        Self((self.0 & !BG_MASK) | (bg.bits() << BG_SHIFT))
    }

    /// Replace the attribute set.
    #[inline]
    #[must_use]
    pub const fn attributes(self, attrs: Attr) -> Self {
        Self((self.0 & !ATTR_MASK) | ((attrs.bits() as u64) << ATTR_SHIFT))
    }

    /// Add attributes to the existing set.
    #[inline]
    #[must_use]
    pub const fn with(self, attrs: Attr) -> Self {
        Self(self.0 | ((attrs.bits() as u64) << ATTR_SHIFT))
    }

    /// The foreground color.
    #[inline]
    #[must_use]
    pub const fn fg(self) -> Color {
        Color::from_bits(self.0 & FG_MASK)
    }

    /// The background color.
    #[inline]
    #[must_use]
    pub const fn bg(self) -> Color {
        Color::from_bits((self.0 & BG_MASK) >> BG_SHIFT)
    }

    /// The attribute set.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Attr occupies 8 bits of the word.
    pub const fn attrs(self) -> Attr {
        Attr::from_bits_truncate(((self.0 & ATTR_MASK) >> ATTR_SHIFT) as u8)
    }

    /// Split the token into its parts for emission.
    #[inline]
    #[must_use]
    pub const fn decompose(self) -> (Color, Color, Attr) {
        (self.fg(), self.bg(), self.attrs())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Color ───────────────────────────────────────────────────────────

    #[test]
    fn default_color_has_no_index() {
        assert!(Color::DEFAULT.is_default());
        assert_eq!(Color::DEFAULT.index(), None);
    }

    #[test]
    fn indexed_round_trips() {
        assert_eq!(Color::indexed(0).index(), Some(0));
        assert_eq!(Color::indexed(7).index(), Some(7));
        assert_eq!(Color::indexed(255).index(), Some(255));
    }

    #[test]
    fn named_colors_are_base_palette() {
        assert_eq!(Color::BLACK.index(), Some(0));
        assert_eq!(Color::TEAL.index(), Some(6));
        assert_eq!(Color::SILVER.index(), Some(7));
        assert_eq!(Color::GRAY.index(), Some(8));
        assert_eq!(Color::WHITE.index(), Some(15));
    }

    #[test]
    fn named_colors_are_not_default() {
        assert!(!Color::BLACK.is_default());
        assert!(!Color::WHITE.is_default());
    }

    #[test]
    fn color_equality_is_by_index() {
        assert_eq!(Color::indexed(0), Color::BLACK);
        assert_ne!(Color::BLACK, Color::WHITE);
    }

    // ── Style packing ───────────────────────────────────────────────────

    #[test]
    fn default_style_is_zero_word() {
        let (fg, bg, attrs) = Style::DEFAULT.decompose();
        assert_eq!(fg, Color::DEFAULT);
        assert_eq!(bg, Color::DEFAULT);
        assert!(attrs.is_empty());
    }

    #[test]
    fn foreground_round_trips() {
        let st = Style::DEFAULT.foreground(Color::RED);
        assert_eq!(st.fg(), Color::RED);
        assert_eq!(st.bg(), Color::DEFAULT);
    }

    #[test]
    fn background_round_trips() {
        let st = Style::DEFAULT.background(Color::NAVY);
        assert_eq!(st.bg(), Color::NAVY);
        assert_eq!(st.fg(), Color::DEFAULT);
    }

    #[test]
    fn fields_do_not_clobber_each_other() {
        let st = Style::DEFAULT
            .foreground(Color::indexed(200))
            .background(Color::indexed(17))
            .attributes(Attr::BOLD | Attr::DIM);
        assert_eq!(st.fg(), Color::indexed(200));
        assert_eq!(st.bg(), Color::indexed(17));
        assert_eq!(st.attrs(), Attr::BOLD | Attr::DIM);
    }

    #[test]
    fn replacing_foreground_keeps_rest() {
        let st = Style::DEFAULT
            .foreground(Color::RED)
            .background(Color::BLUE)
            .attributes(Attr::UNDERLINE);
        let st = st.foreground(Color::GREEN);
        assert_eq!(st.fg(), Color::GREEN);
        assert_eq!(st.bg(), Color::BLUE);
        assert_eq!(st.attrs(), Attr::UNDERLINE);
    }

    #[test]
    fn attributes_replace_while_with_accumulates() {
        let st = Style::DEFAULT.attributes(Attr::BOLD);
        assert_eq!(st.attributes(Attr::DIM).attrs(), Attr::DIM);
        assert_eq!(st.with(Attr::DIM).attrs(), Attr::BOLD | Attr::DIM);
    }

    // ── Equality gating ─────────────────────────────────────────────────

    #[test]
    fn equal_styles_compare_equal() {
        let a = Style::DEFAULT.foreground(Color::RED).with(Attr::BOLD);
        let b = Style::DEFAULT.foreground(Color::RED).with(Attr::BOLD);
        assert_eq!(a, b);
    }

    #[test]
    fn any_field_difference_breaks_equality() {
        let base = Style::DEFAULT.foreground(Color::RED);
        assert_ne!(base, base.foreground(Color::GREEN));
        assert_ne!(base, base.background(Color::RED));
        assert_ne!(base, base.with(Attr::BLINK));
    }

    #[test]
    fn style_is_copy() {
        let a = Style::DEFAULT.foreground(Color::AQUA);
        let b = a;
        assert_eq!(a, b);
    }
}
