// SPDX-License-Identifier: MIT
//
// Built-in terminal descriptions.
//
// A small set of descriptions covering the terminals this library is
// realistically run on: xterm and its 256-color variant (which nearly
// every modern emulator advertises), the Linux console, screen/tmux,
// and vt100 as the minimal hardware baseline. The capability strings
// follow the ncurses terminfo entries for these terminals.
//
// Applications needing something else register their own record through
// `terminfo::register` before constructing a screen.

use crate::terminfo::Terminfo;

/// The descriptions seeded into the registry at first lookup.
pub(crate) fn builtins() -> Vec<Terminfo> {
    vec![xterm(), xterm_256color(), vt100(), linux_console(), screen()]
}

fn s(v: &str) -> String {
    v.to_string()
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|&x| x.to_string()).collect()
}

fn xterm() -> Terminfo {
    Terminfo {
        name: s("xterm"),
        aliases: Vec::new(),
        columns: 80,
        lines: 24,
        colors: 8,

        enter_ca: s("\x1b[?1049h"),
        exit_ca: s("\x1b[?1049l"),
        enter_keypad: s("\x1b[?1h\x1b="),
        exit_keypad: s("\x1b[?1l\x1b>"),
        show_cursor: s("\x1b[?12l\x1b[?25h"),
        hide_cursor: s("\x1b[?25l"),
        clear: s("\x1b[H\x1b[2J"),
        attr_off: s("\x1b(B\x1b[m"),
        bold: s("\x1b[1m"),
        underline: s("\x1b[4m"),
        reverse: s("\x1b[7m"),
        blink: s("\x1b[5m"),
        dim: s("\x1b[2m"),
        set_fg: s("\x1b[3%p1%dm"),
        set_bg: s("\x1b[4%p1%dm"),
        set_cursor: s("\x1b[%i%p1%d;%p2%dH"),
        enter_mouse: s("\x1b[?1000h"),
        exit_mouse: s("\x1b[?1000l"),
        mouse: s("\x1b[M"),

        key_backspace: s("\x7f"),
        key_up: s("\x1bOA"),
        key_down: s("\x1bOB"),
        key_right: s("\x1bOC"),
        key_left: s("\x1bOD"),
        key_home: s("\x1bOH"),
        key_end: s("\x1bOF"),
        key_insert: s("\x1b[2~"),
        key_delete: s("\x1b[3~"),
        key_page_up: s("\x1b[5~"),
        key_page_down: s("\x1b[6~"),
        key_help: String::new(),
        key_fn: strings(&[
            "\x1bOP", "\x1bOQ", "\x1bOR", "\x1bOS", "\x1b[15~", "\x1b[17~", "\x1b[18~",
            "\x1b[19~", "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[1;2P",
            "\x1b[1;2Q", "\x1b[1;2R", "\x1b[1;2S", "\x1b[15;2~", "\x1b[17;2~", "\x1b[18;2~",
            "\x1b[19;2~",
        ]),
    }
}

fn xterm_256color() -> Terminfo {
    Terminfo {
        name: s("xterm-256color"),
        colors: 256,
        // The 256-entry palette needs the conditional form: direct SGR
        // for the first 16 entries, the 38/48;5 form beyond.
        set_fg: s("\x1b[%?%p1%{8}%<%t3%p1%d%e%p1%{16}%<%t9%p1%{8}%-%d%e38;5;%p1%d%;m"),
        set_bg: s("\x1b[%?%p1%{8}%<%t4%p1%d%e%p1%{16}%<%t10%p1%{8}%-%d%e48;5;%p1%d%;m"),
        ..xterm()
    }
}

fn vt100() -> Terminfo {
    Terminfo {
        name: s("vt100"),
        aliases: vec![s("vt100-am")],
        columns: 80,
        lines: 24,
        colors: 0,

        enter_keypad: s("\x1b[?1h\x1b="),
        exit_keypad: s("\x1b[?1l\x1b>"),
        clear: s("\x1b[H\x1b[J$<50>"),
        attr_off: s("\x1b[m\x0f$<2>"),
        bold: s("\x1b[1m$<2>"),
        underline: s("\x1b[4m$<2>"),
        reverse: s("\x1b[7m$<2>"),
        blink: s("\x1b[5m$<2>"),
        set_cursor: s("\x1b[%i%p1%d;%p2%dH$<5>"),

        key_backspace: s("\x08"),
        key_up: s("\x1bOA"),
        key_down: s("\x1bOB"),
        key_right: s("\x1bOC"),
        key_left: s("\x1bOD"),
        key_fn: strings(&["\x1bOP", "\x1bOQ", "\x1bOR", "\x1bOS"]),

        ..Terminfo::default()
    }
}

fn linux_console() -> Terminfo {
    Terminfo {
        name: s("linux"),
        columns: 80,
        lines: 25,
        colors: 8,

        show_cursor: s("\x1b[?25h\x1b[?0c"),
        hide_cursor: s("\x1b[?25l\x1b[?1c"),
        clear: s("\x1b[H\x1b[J"),
        attr_off: s("\x1b[m\x0f"),
        bold: s("\x1b[1m"),
        underline: s("\x1b[4m"),
        reverse: s("\x1b[7m"),
        blink: s("\x1b[5m"),
        dim: s("\x1b[2m"),
        set_fg: s("\x1b[3%p1%dm"),
        set_bg: s("\x1b[4%p1%dm"),
        set_cursor: s("\x1b[%i%p1%d;%p2%dH"),

        key_backspace: s("\x7f"),
        key_up: s("\x1b[A"),
        key_down: s("\x1b[B"),
        key_right: s("\x1b[C"),
        key_left: s("\x1b[D"),
        key_home: s("\x1b[1~"),
        key_end: s("\x1b[4~"),
        key_insert: s("\x1b[2~"),
        key_delete: s("\x1b[3~"),
        key_page_up: s("\x1b[5~"),
        key_page_down: s("\x1b[6~"),
        key_fn: strings(&[
            "\x1b[[A", "\x1b[[B", "\x1b[[C", "\x1b[[D", "\x1b[[E", "\x1b[17~", "\x1b[18~",
            "\x1b[19~", "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[25~", "\x1b[26~",
            "\x1b[28~", "\x1b[29~", "\x1b[31~", "\x1b[32~", "\x1b[33~", "\x1b[34~",
        ]),

        ..Terminfo::default()
    }
}

fn screen() -> Terminfo {
    Terminfo {
        name: s("screen"),
        columns: 80,
        lines: 24,
        colors: 8,

        enter_ca: s("\x1b[?1049h"),
        exit_ca: s("\x1b[?1049l"),
        enter_keypad: s("\x1b[?1h\x1b="),
        exit_keypad: s("\x1b[?1l\x1b>"),
        show_cursor: s("\x1b[34h\x1b[?25h"),
        hide_cursor: s("\x1b[?25l"),
        clear: s("\x1b[H\x1b[J"),
        attr_off: s("\x1b[m\x0f"),
        bold: s("\x1b[1m"),
        underline: s("\x1b[4m"),
        reverse: s("\x1b[7m"),
        blink: s("\x1b[5m"),
        dim: s("\x1b[2m"),
        set_fg: s("\x1b[3%p1%dm"),
        set_bg: s("\x1b[4%p1%dm"),
        set_cursor: s("\x1b[%i%p1%d;%p2%dH"),
        enter_mouse: s("\x1b[?1000h"),
        exit_mouse: s("\x1b[?1000l"),
        mouse: s("\x1b[M"),

        key_backspace: s("\x7f"),
        key_up: s("\x1bOA"),
        key_down: s("\x1bOB"),
        key_right: s("\x1bOC"),
        key_left: s("\x1bOD"),
        key_home: s("\x1b[1~"),
        key_end: s("\x1b[4~"),
        key_insert: s("\x1b[2~"),
        key_delete: s("\x1b[3~"),
        key_page_up: s("\x1b[5~"),
        key_page_down: s("\x1b[6~"),
        key_fn: strings(&[
            "\x1bOP", "\x1bOQ", "\x1bOR", "\x1bOS", "\x1b[15~", "\x1b[17~", "\x1b[18~",
            "\x1b[19~", "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~",
        ]),

        ..Terminfo::default()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_has_a_name_and_geometry() {
        for ti in builtins() {
            assert!(!ti.name.is_empty());
            assert!(ti.columns > 0, "{} has no columns", ti.name);
            assert!(ti.lines > 0, "{} has no lines", ti.name);
        }
    }

    #[test]
    fn every_builtin_can_address_the_cursor() {
        for ti in builtins() {
            assert!(!ti.set_cursor.is_empty(), "{} has no cup", ti.name);
            let s = ti.tgoto(0, 0);
            assert!(s.contains("1;1"), "{}: {s:?}", ti.name);
        }
    }

    #[test]
    fn xterm_mouse_prefix_present() {
        assert_eq!(xterm().mouse, "\x1b[M");
        assert!(!xterm().enter_mouse.is_empty());
    }

    #[test]
    fn vt100_has_no_mouse_or_color() {
        let ti = vt100();
        assert!(ti.mouse.is_empty());
        assert_eq!(ti.colors, 0);
        assert!(ti.set_fg.is_empty());
    }

    #[test]
    fn vt100_carries_padding() {
        assert!(vt100().clear.contains("$<50>"));
    }

    #[test]
    fn xterm_256color_differs_only_in_color_handling() {
        let base = xterm();
        let big = xterm_256color();
        assert_eq!(big.colors, 256);
        assert_ne!(big.set_fg, base.set_fg);
        assert_eq!(big.key_fn, base.key_fn);
        assert_eq!(big.clear, base.clear);
    }

    #[test]
    fn xterm_256color_foreground_forms() {
        let ti = xterm_256color();
        assert_eq!(ti.tparm(&ti.set_fg, &[2]), "\x1b[32m");
        assert_eq!(ti.tparm(&ti.set_fg, &[12]), "\x1b[94m");
        assert_eq!(ti.tparm(&ti.set_fg, &[123]), "\x1b[38;5;123m");
    }

    #[test]
    fn function_key_tables_start_at_f1() {
        let ti = xterm();
        assert_eq!(ti.key_fn[0], "\x1bOP");
        assert_eq!(ti.key_fn.len(), 20);
        assert_eq!(linux_console().key_fn[0], "\x1b[[A");
    }
}
