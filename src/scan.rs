// SPDX-License-Identifier: MIT
//
// Input scanner — raw tty bytes in, events out.
//
// The scanner owns the key map (logical key -> the byte sequence this
// terminal's keys send), the mouse report prefix, and the wheel latch.
// Each call consumes as much of the accumulated byte buffer as can be
// decoded unambiguously and returns the events found, in input order.
//
// The hard case is prefix ambiguity: ESC alone might be the Escape rune
// or the start of a longer key sequence, and short key codes can be
// prefixes of longer ones. The scanner counts the key sequences the
// buffer is a strict prefix of ("partials") and stops decoding while
// any remain, leaving the bytes in place for the next read to extend.
// When the upstream read times out with bytes still pending, the caller
// passes `expire = true` and partial matches are abandoned: the leading
// byte goes out as a rune so a solitary ESC is usable.
//
// Mouse reports are the classic X10 three-byte form behind the terminfo
// mouse prefix. Wheel motion shares opcodes with buttons 1 and 2; bit 6
// plus "no button currently held" tells them apart, which is what the
// `wasbtn` latch tracks.

use crate::event::{Buttons, Event, Key, KeyEvent, Mods, MouseEvent};
use crate::terminfo::Terminfo;

/// Byte-stream decoder for one terminal's input.
pub struct Scanner {
    keys: Vec<(Key, Vec<u8>)>,
    mouse: Vec<u8>,
    /// A button is currently held down. Gates wheel decoding.
    wasbtn: bool,
}

impl Scanner {
    /// Build a scanner for a terminal description.
    ///
    /// Keys with empty sequences in the description are simply absent
    /// from the map.
    #[must_use]
    pub fn new(ti: &Terminfo) -> Self {
        let mut keys: Vec<(Key, Vec<u8>)> = Vec::new();
        let mut prepare = |key: Key, seq: &str| {
            if !seq.is_empty() {
                keys.push((key, seq.as_bytes().to_vec()));
            }
        };

        prepare(Key::Backspace, &ti.key_backspace);
        prepare(Key::Up, &ti.key_up);
        prepare(Key::Down, &ti.key_down);
        prepare(Key::Left, &ti.key_left);
        prepare(Key::Right, &ti.key_right);
        prepare(Key::Home, &ti.key_home);
        prepare(Key::End, &ti.key_end);
        prepare(Key::Insert, &ti.key_insert);
        prepare(Key::Delete, &ti.key_delete);
        prepare(Key::PageUp, &ti.key_page_up);
        prepare(Key::PageDown, &ti.key_page_down);
        prepare(Key::Help, &ti.key_help);
        for (i, seq) in ti.key_fn.iter().enumerate() {
            // Function keys stop well below 255.
            #[allow(clippy::cast_possible_truncation)]
            let number = i as u8 + 1;
            prepare(Key::F(number), seq);
        }

        Self {
            keys,
            mouse: ti.mouse.as_bytes().to_vec(),
            wasbtn: false,
        }
    }

    /// Decode as many events as the buffer allows.
    ///
    /// Consumed bytes are drained from `buf`; bytes held back by a
    /// partial match stay for the next call. `expire` abandons partial
    /// matches (the upstream read timed out). `width`/`height` clip
    /// mouse coordinates to the window.
    pub fn scan(&mut self, buf: &mut Vec<u8>, expire: bool, width: u16, height: u16) -> Vec<Event> {
        let mut events = Vec::new();

        loop {
            let Some(&b0) = buf.first() else {
                return events;
            };

            // Printable ASCII: a rune, one byte, no ambiguity. 0x7F is
            // deliberately excluded so a DEL backspace key can match in
            // the key map.
            if (0x20..=0x7e).contains(&b0) {
                buf.drain(..1);
                events.push(Event::rune(b0 as char));
                continue;
            }

            // UTF-8: decode once the full scalar has arrived. A lead
            // byte whose continuation is still in flight counts as a
            // partial match below.
            let mut utf8_pending = false;
            if b0 >= 0x80 {
                match utf8_len(b0) {
                    0 => {
                        // Stray continuation or invalid lead.
                        buf.drain(..1);
                        events.push(Event::rune(char::REPLACEMENT_CHARACTER));
                        continue;
                    }
                    need if buf.len() >= need => {
                        let ev = match std::str::from_utf8(&buf[..need]) {
                            Ok(s) => {
                                let ch =
                                    s.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                                buf.drain(..need);
                                Event::rune(ch)
                            }
                            Err(_) => {
                                buf.drain(..1);
                                Event::rune(char::REPLACEMENT_CHARACTER)
                            }
                        };
                        events.push(ev);
                        continue;
                    }
                    _ => utf8_pending = true,
                }
            }

            // Key map: exact prefix matches fire, strict-prefix buffers
            // are counted so we know to wait.
            let mut matched = false;
            let mut partials = usize::from(utf8_pending);
            for (key, esc) in &self.keys {
                if buf.starts_with(esc) {
                    events.push(Event::Key(KeyEvent::plain(*key)));
                    buf.drain(..esc.len());
                    matched = true;
                    break;
                }
                if esc.len() > buf.len() && esc.starts_with(buf) {
                    partials += 1;
                }
            }

            // Mouse reports carry three parameter bytes after the prefix.
            if !matched && !self.mouse.is_empty() && buf.starts_with(&self.mouse) {
                let m = self.mouse.len();
                if buf.len() >= m + 3 {
                    let ev = self.decode_mouse(buf[m], buf[m + 1], buf[m + 2], width, height);
                    buf.drain(..m + 3);
                    events.push(ev);
                    continue;
                }
                partials += 1;
            }

            // A timed-out read fails every partial match.
            if expire {
                partials = 0;
            }

            // Nothing recognised and nothing pending: pass the byte
            // through as a rune. Later bytes may still decode.
            if !matched && partials == 0 {
                buf.drain(..1);
                events.push(Event::rune(b0 as char));
                continue;
            }

            if partials > 0 {
                // One or more sequences may still complete; wait for
                // more bytes.
                return events;
            }
        }
    }

    /// Decode one X10 mouse record.
    fn decode_mouse(&mut self, b0: u8, b1: u8, b2: u8, width: u16, height: u16) -> Event {
        let raw = b0 & 3;
        let mut buttons = match raw {
            0 => Buttons::BUTTON1,
            1 => Buttons::BUTTON2,
            2 => Buttons::BUTTON3,
            _ => Buttons::empty(), // release
        };

        // Wheel motion reuses the button-1/2 opcodes with bit 6 set,
        // but only reads as a wheel while no button is held; during a
        // drag the same bytes are still the button.
        if b0 & 0x40 != 0 && !self.wasbtn {
            match raw {
                0 => buttons = Buttons::WHEEL_UP,
                1 => buttons = Buttons::WHEEL_DOWN,
                _ => {}
            }
        }

        if buttons.intersects(Buttons::BUTTON1 | Buttons::BUTTON2 | Buttons::BUTTON3) {
            self.wasbtn = true;
        } else if buttons.is_empty() {
            self.wasbtn = false;
        }

        let mut mods = Mods::empty();
        if b0 & 4 != 0 {
            mods |= Mods::SHIFT;
        }
        if b0 & 8 != 0 {
            mods |= Mods::META;
        }
        if b0 & 16 != 0 {
            mods |= Mods::CTRL;
        }

        let x = clip(i32::from(b1) - 33, width);
        let y = clip(i32::from(b2) - 33, height);

        Event::Mouse(MouseEvent {
            x,
            y,
            buttons,
            mods,
        })
    }
}

/// Clip a coordinate to `[0, extent - 1]`.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn clip(v: i32, extent: u16) -> u16 {
    v.clamp(0, i32::from(extent.saturating_sub(1))) as u16
}

/// Expected byte length of a UTF-8 scalar from its lead byte, 0 when the
/// byte cannot start one.
const fn utf8_len(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 0,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
