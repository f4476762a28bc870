// SPDX-License-Identifier: MIT
//
// Screen — the terminfo-backed display surface and its lifecycle.
//
// One long-lived object shared between three contexts:
//
//   - the caller thread, mutating cells and invoking show/sync/poll_event
//   - the input thread, decoding tty bytes into events
//   - the SIGWINCH path, bridged through an atomic the input thread drains
//
// A single mutex over `State` serialises everything that touches the
// grid, the default style, the cursor request, the clear flag, the
// emission caches, and the tty writer. The bounded event channel
// decouples producers from the consumer; a zero-capacity `quit` channel
// closed at `fini` unblocks `poll_event` and stops the input thread.
//
// Drawing walks dirty cells in row-major order and emits the smallest
// escape output that brings the terminal up to date: a goto only when
// the cursor is not already in place (the terminal advances it after
// every rune), a style change only when the effective style differs
// from the last one emitted. A frame accumulates in one buffer and
// reaches the tty in a single write.

use std::env;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};

use crate::buffer::CellBuffer;
use crate::cell::Cell;
use crate::error::Error;
use crate::event::{Event, ResizeEvent};
use crate::style::{Attr, Style};
use crate::terminfo::{self, tputs, Terminfo};
use crate::tty::Tty;

/// Depth of the event queue. Two is enough to absorb a resize posted
/// while the consumer is mid-frame; a little extra keeps fast typists
/// off the blocking path.
const EVENT_QUEUE_DEPTH: usize = 8;

/// How long the input thread waits in poll() before re-checking the
/// quit and resize flags. Also the point at which pending partial key
/// matches are declared expired.
#[cfg(unix)]
const POLL_TIMEOUT_MS: i32 = 50;

/// Input is read in chunks of this size.
#[cfg(unix)]
const READ_CHUNK: usize = 128;

// ─── Screen trait ────────────────────────────────────────────────────────────

/// A full-screen character-cell display with an event stream.
///
/// The one implementation talking to a real terminal is [`TermScreen`];
/// the trait is the seam where a simulation backend would plug in.
pub trait Screen {
    /// Acquire the terminal: raw mode, alternate screen, keypad mode,
    /// hidden cursor, cleared display, input thread started.
    ///
    /// # Errors
    ///
    /// Fails when the process has no usable tty or termios setup fails;
    /// in that case the terminal is left exactly as found and no thread
    /// is started.
    fn init(&mut self) -> Result<(), Error>;

    /// Release the terminal: stop the input thread, restore the cursor,
    /// attributes, primary screen, keypad and mouse state, and put the
    /// saved termios back. Safe to call more than once.
    fn fini(&mut self);

    /// Blank every cell with the default style.
    fn clear(&mut self);

    /// Set the default style used by [`clear`](Screen::clear) and
    /// substituted for cells whose style is `Style::DEFAULT`.
    fn set_style(&mut self, style: Style);

    /// Write a rune sequence with a style at `(x, y)`. Out of range is
    /// a no-op; unchanged content leaves the cell's dirty state alone.
    fn set_cell(&mut self, x: u16, y: u16, style: Style, runes: &[char]);

    /// Store a cell unconditionally at `(x, y)`, dirtying it.
    fn put_cell(&mut self, x: u16, y: u16, cell: &Cell);

    /// A snapshot of the cell at `(x, y)`. Mutating the returned value
    /// does not touch the screen.
    fn get_cell(&self, x: u16, y: u16) -> Option<Cell>;

    /// Request the hardware cursor at `(x, y)`. Positions outside the
    /// grid hide it at draw time.
    fn show_cursor(&mut self, x: u16, y: u16);

    /// Hide the hardware cursor.
    fn hide_cursor(&mut self);

    /// Bring the terminal up to date: pick up window-size changes, then
    /// emit every dirty cell.
    fn show(&mut self);

    /// Force a full repaint: like [`show`](Screen::show), but clears
    /// the terminal and re-emits every cell.
    fn sync(&mut self);

    /// Current grid dimensions.
    fn size(&self) -> (u16, u16);

    /// Number of colors the terminal supports.
    fn colors(&self) -> u16;

    /// Start mouse tracking, when the terminal can report the mouse.
    fn enable_mouse(&mut self);

    /// Stop mouse tracking.
    fn disable_mouse(&mut self);

    /// Block until an event arrives or the screen is finalised.
    /// `None` means shutdown.
    fn poll_event(&self) -> Option<Event>;

    /// Queue an event as if the terminal had produced it. Blocks while
    /// the queue is full; events are never dropped.
    fn post_event(&self, event: Event);
}

// ─── State — everything under the mutex ──────────────────────────────────────

struct State {
    ti: Arc<Terminfo>,
    cells: CellBuffer,
    /// Default style: what `clear` paints and what `Style::DEFAULT`
    /// cells render as.
    style: Style,
    /// Requested cursor position; `None` is hidden.
    cursor: Option<(u16, u16)>,
    /// The next draw must emit the full-clear capability first.
    clear: bool,
    /// Where the terminal cursor actually is; `None` is unknown.
    pos: Option<(usize, usize)>,
    /// The style the terminal is currently set to; `None` forces the
    /// next cell to re-emit.
    curstyle: Option<Style>,
    baud: u32,
    tty_fd: Option<i32>,
    out: Box<dyn Write + Send>,
    scratch: Vec<u8>,
}

impl State {
    fn new(ti: Arc<Terminfo>, width: usize, height: usize) -> Self {
        Self {
            ti,
            cells: CellBuffer::new(width, height),
            style: Style::DEFAULT,
            cursor: None,
            clear: false,
            pos: None,
            curstyle: None,
            baud: 0,
            tty_fd: None,
            out: Box::new(io::sink()),
            scratch: Vec::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation)] // Grids never exceed u16 extents.
    fn dimensions(&self) -> (u16, u16) {
        (self.cells.width() as u16, self.cells.height() as u16)
    }

    /// Write capability strings straight to the terminal, outside the
    /// draw path (mode switches: mouse on/off, init, fini).
    fn emit_caps<S: AsRef<str>>(&mut self, caps: &[S]) {
        let mut out = Vec::new();
        for cap in caps {
            let _ = tputs(&mut out, cap.as_ref(), self.baud);
        }
        let _ = self.out.write_all(&out);
        let _ = self.out.flush();
    }

    // ── Resize ──────────────────────────────────────────────────────────

    /// Ask the OS for the window size and reshape if it changed.
    ///
    /// Returns the resize event to post once the lock is released; the
    /// mutex is never held across a channel send.
    fn resize(&mut self) -> Option<Event> {
        let size = self.probe_size()?;
        self.apply_size(size)
    }

    #[cfg(unix)]
    fn probe_size(&self) -> Option<(u16, u16)> {
        let fd = self.tty_fd?;
        crate::tty::window_size(fd).ok()
    }

    #[cfg(not(unix))]
    fn probe_size(&self) -> Option<(u16, u16)> {
        None
    }

    fn apply_size(&mut self, (w, h): (u16, u16)) -> Option<Event> {
        let (cw, ch) = self.dimensions();
        if (w, h) == (cw, ch) {
            return None;
        }
        tracing::debug!(from = ?(cw, ch), to = ?(w, h), "window resized");
        self.cells.resize(usize::from(w), usize::from(h));
        self.pos = None;
        Some(Event::Resize(ResizeEvent { w, h }))
    }

    // ── Drawing ─────────────────────────────────────────────────────────

    /// Emit every dirty cell, bracketed by cursor hide/restore.
    fn draw(&mut self) {
        let mut out = std::mem::take(&mut self.scratch);
        out.clear();
        let ti = Arc::clone(&self.ti);

        // The cursor will be moved all over the grid; treat its
        // position as unknown and keep it invisible meanwhile.
        self.pos = None;
        let _ = tputs(&mut out, &ti.hide_cursor, self.baud);

        if self.clear {
            let _ = tputs(&mut out, &ti.clear, self.baud);
            self.clear = false;
        }

        let (w, h) = (self.cells.width(), self.cells.height());
        for y in 0..h {
            for x in 0..w {
                if !self.cells.cell_at(x, y).dirty() {
                    continue;
                }
                self.draw_cell(&mut out, x, y);
                self.cells.cell_at_mut(x, y).mark(false);
            }
        }

        self.place_cursor(&mut out);

        let _ = self.out.write_all(&out);
        let _ = self.out.flush();
        self.scratch = out;
    }

    /// Emit one cell: goto if needed, style delta if needed, runes.
    fn draw_cell(&mut self, out: &mut Vec<u8>, x: usize, y: usize) {
        let cell = self.cells.cell_at(x, y).clone();
        let ti = Arc::clone(&self.ti);

        if self.pos != Some((x, y)) {
            let _ = tputs(out, &ti.tgoto(x, y), self.baud);
        }

        let mut style = cell.style();
        if style == Style::DEFAULT {
            style = self.style;
        }
        if self.curstyle != Some(style) {
            let (fg, bg, attrs) = style.decompose();
            let _ = tputs(out, &ti.attr_off, self.baud);
            if attrs.contains(Attr::BOLD) {
                let _ = tputs(out, &ti.bold, self.baud);
            }
            if attrs.contains(Attr::UNDERLINE) {
                let _ = tputs(out, &ti.underline, self.baud);
            }
            if attrs.contains(Attr::REVERSE) {
                let _ = tputs(out, &ti.reverse, self.baud);
            }
            if attrs.contains(Attr::BLINK) {
                let _ = tputs(out, &ti.blink, self.baud);
            }
            if attrs.contains(Attr::DIM) {
                let _ = tputs(out, &ti.dim, self.baud);
            }
            if let Some(idx) = fg.index() {
                let _ = tputs(out, &ti.tparm(&ti.set_fg, &[i64::from(idx)]), self.baud);
            }
            if let Some(idx) = bg.index() {
                let _ = tputs(out, &ti.tparm(&ti.set_bg, &[i64::from(idx)]), self.baud);
            }
            self.curstyle = Some(style);
        }

        // Emit exactly one spacing rune plus any combining tail. A
        // width-2 rune with no room at the last column renders as a
        // space; the cell itself keeps its logical width.
        let mut width = cell.width();
        let runes = cell.runes();
        let text: String = if width == 2 && x + 1 >= self.cells.width() {
            width = 1;
            " ".into()
        } else if runes.is_empty() {
            width = 1;
            " ".into()
        } else {
            runes.iter().collect()
        };
        out.extend_from_slice(text.as_bytes());

        self.pos = Some((x + width, y));
    }

    /// Park the hardware cursor where the caller asked, or hide it.
    fn place_cursor(&mut self, out: &mut Vec<u8>) {
        let ti = Arc::clone(&self.ti);
        let (w, h) = (self.cells.width(), self.cells.height());
        match self.cursor {
            Some((x, y)) if usize::from(x) < w && usize::from(y) < h => {
                let (x, y) = (usize::from(x), usize::from(y));
                if self.pos != Some((x, y)) {
                    let _ = tputs(out, &ti.tgoto(x, y), self.baud);
                }
                let _ = tputs(out, &ti.show_cursor, self.baud);
                self.pos = Some((x, y));
            }
            _ => {
                let _ = tputs(out, &ti.hide_cursor, self.baud);
            }
        }
    }
}

// ─── Core — what the threads share ───────────────────────────────────────────

struct Core {
    ti: Arc<Terminfo>,
    state: Mutex<State>,
    evch_tx: Sender<Event>,
    evch_rx: Receiver<Event>,
    quit_rx: Receiver<()>,
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocking post; the queue is bounded and nothing is dropped.
    fn post(&self, event: Event) {
        let _ = self.evch_tx.send(event);
    }

    /// Post from the input thread: give up when shutdown wins the race,
    /// so a full queue can never wedge `fini`.
    fn post_or_quit(&self, event: Event) -> bool {
        select! {
            send(self.evch_tx, event) -> res => res.is_ok(),
            recv(self.quit_rx) -> _ => false,
        }
    }
}

// ─── TermScreen ──────────────────────────────────────────────────────────────

/// The terminfo-backed [`Screen`] implementation.
///
/// Constructed against `$TERM`'s terminal description; `$LINES` and
/// `$COLUMNS` override the description's geometry until the first
/// window-size probe. Nothing touches the terminal until
/// [`init`](Screen::init).
///
/// # Examples
///
/// ```no_run
/// use termgrid::screen::{Screen, TermScreen};
/// use termgrid::style::Style;
///
/// let mut screen = TermScreen::new()?;
/// screen.init()?;
/// screen.set_cell(0, 0, Style::DEFAULT, &['H']);
/// screen.show();
/// let event = screen.poll_event();
/// screen.fini();
/// # Ok::<(), termgrid::error::Error>(())
/// ```
pub struct TermScreen {
    core: Arc<Core>,
    quit_tx: Option<Sender<()>>,
    input: Option<JoinHandle<()>>,
    tty: Option<Tty>,
}

impl TermScreen {
    /// Bind `$TERM`'s terminal description.
    ///
    /// # Errors
    ///
    /// [`Error::TermNotSet`] when `$TERM` is unset or empty,
    /// [`Error::UnknownTerminal`] when it names nothing registered.
    pub fn new() -> Result<Self, Error> {
        let term = env::var("TERM").unwrap_or_default();
        let ti = terminfo::lookup(&term)?;
        Ok(Self::with_terminfo(ti))
    }

    /// Build a screen over an explicit terminal description.
    #[must_use]
    pub fn with_terminfo(ti: Arc<Terminfo>) -> Self {
        let mut width = usize::from(ti.columns);
        let mut height = usize::from(ti.lines);
        if let Some(n) = positive_env("COLUMNS") {
            width = n;
        }
        if let Some(n) = positive_env("LINES") {
            height = n;
        }

        let (evch_tx, evch_rx) = bounded(EVENT_QUEUE_DEPTH);
        let (quit_tx, quit_rx) = bounded(0);

        Self {
            core: Arc::new(Core {
                ti: Arc::clone(&ti),
                state: Mutex::new(State::new(ti, width, height)),
                evch_tx,
                evch_rx,
                quit_rx,
            }),
            quit_tx: Some(quit_tx),
            input: None,
            tty: None,
        }
    }

    #[cfg(unix)]
    fn initialize(&mut self) -> Result<(), Error> {
        use std::thread;

        if self.tty.is_some() {
            return Ok(());
        }

        let tty = Tty::open()?;
        let reader = tty.reader()?;
        let writer = tty.writer()?;

        {
            let mut st = self.core.lock();
            st.baud = tty.baud();
            st.tty_fd = Some(tty.raw_fd());
            st.out = Box::new(writer);
            st.pos = None;
            st.curstyle = None;
            st.cursor = None;
            st.clear = false;

            let ti = Arc::clone(&st.ti);
            st.emit_caps(&[&ti.enter_ca, &ti.enter_keypad, &ti.hide_cursor, &ti.clear]);
        }

        // From here on a panic must also undo the screen modes, not
        // just termios.
        crate::tty::set_restore_sequence(restore_sequence(&self.core.ti));
        crate::tty::install_winch_handler();

        let core = Arc::clone(&self.core);
        let handle = thread::Builder::new()
            .name("termgrid-input".into())
            .spawn(move || input_loop(&core, reader))
            .map_err(Error::Io)?;

        self.input = Some(handle);
        self.tty = Some(tty);
        tracing::debug!(term = %self.core.ti.name, "screen initialized");
        Ok(())
    }

    #[cfg(not(unix))]
    fn initialize(&mut self) -> Result<(), Error> {
        Err(Error::NotATerminal)
    }

    /// The shared shutdown path for `fini` and `Drop`.
    fn shutdown(&mut self) {
        // Closing `quit` unblocks poll_event and tells the input thread
        // to exit; its poll timeout bounds how long the join waits.
        self.quit_tx.take();
        if let Some(handle) = self.input.take() {
            let _ = handle.join();
        }

        {
            let mut st = self.core.lock();
            let ti = Arc::clone(&st.ti);
            st.emit_caps(&[
                &ti.show_cursor,
                &ti.attr_off,
                &ti.clear,
                &ti.exit_ca,
                &ti.exit_keypad,
                &ti.exit_mouse,
            ]);
            st.out = Box::new(io::sink());
            st.tty_fd = None;
            st.curstyle = None;
            st.cells.resize(0, 0);
        }

        if let Some(tty) = self.tty.take() {
            tty.restore();
            tracing::debug!("screen finalized");
        }
    }
}

impl Screen for TermScreen {
    fn init(&mut self) -> Result<(), Error> {
        self.initialize()
    }

    fn fini(&mut self) {
        self.shutdown();
    }

    fn clear(&mut self) {
        let mut st = self.core.lock();
        let style = st.style;
        st.cells.clear(style);
    }

    fn set_style(&mut self, style: Style) {
        self.core.lock().style = style;
    }

    fn set_cell(&mut self, x: u16, y: u16, style: Style, runes: &[char]) {
        self.core
            .lock()
            .cells
            .set_cell(usize::from(x), usize::from(y), style, runes);
    }

    fn put_cell(&mut self, x: u16, y: u16, cell: &Cell) {
        self.core
            .lock()
            .cells
            .put_cell(usize::from(x), usize::from(y), cell);
    }

    fn get_cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.core
            .lock()
            .cells
            .get(usize::from(x), usize::from(y))
            .cloned()
    }

    fn show_cursor(&mut self, x: u16, y: u16) {
        self.core.lock().cursor = Some((x, y));
    }

    fn hide_cursor(&mut self) {
        self.core.lock().cursor = None;
    }

    fn show(&mut self) {
        let resized = {
            let mut st = self.core.lock();
            let resized = st.resize();
            st.draw();
            resized
        };
        if let Some(event) = resized {
            self.core.post(event);
        }
    }

    fn sync(&mut self) {
        let resized = {
            let mut st = self.core.lock();
            let resized = st.resize();
            st.clear = true;
            st.cells.invalidate();
            st.draw();
            resized
        };
        if let Some(event) = resized {
            self.core.post(event);
        }
    }

    fn size(&self) -> (u16, u16) {
        self.core.lock().dimensions()
    }

    fn colors(&self) -> u16 {
        self.core.ti.colors
    }

    fn enable_mouse(&mut self) {
        if self.core.ti.mouse.is_empty() {
            return;
        }
        let mut st = self.core.lock();
        let ti = Arc::clone(&st.ti);
        st.emit_caps(&[&ti.enter_mouse]);
    }

    fn disable_mouse(&mut self) {
        if self.core.ti.mouse.is_empty() {
            return;
        }
        let mut st = self.core.lock();
        let ti = Arc::clone(&st.ti);
        st.emit_caps(&[&ti.exit_mouse]);
    }

    fn poll_event(&self) -> Option<Event> {
        select! {
            recv(self.core.evch_rx) -> event => event.ok(),
            recv(self.core.quit_rx) -> _ => None,
        }
    }

    fn post_event(&self, event: Event) {
        self.core.post(event);
    }
}

impl Drop for TermScreen {
    fn drop(&mut self) {
        if self.tty.is_some() {
            self.shutdown();
        }
    }
}

// ─── Input thread ────────────────────────────────────────────────────────────

/// Read the tty, decode, publish. Exits on quit, read error, or EOF.
#[cfg(unix)]
fn input_loop(core: &Core, file: std::fs::File) {
    use std::io::Read;
    use std::os::unix::io::AsRawFd;

    use crate::scan::Scanner;
    use crate::tty::{self, ReadReady};

    let fd = file.as_raw_fd();
    let mut file = file;
    let mut scanner = Scanner::new(&core.ti);
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    tracing::debug!("input thread running");
    loop {
        if matches!(core.quit_rx.try_recv(), Err(TryRecvError::Disconnected)) {
            break;
        }

        if tty::take_winch() {
            let resized = core.lock().resize();
            if let Some(event) = resized {
                if !core.post_or_quit(event) {
                    break;
                }
            }
            continue;
        }

        match tty::wait_readable(fd, POLL_TIMEOUT_MS) {
            Ok(ReadReady::Ready) => {}
            Ok(ReadReady::TimedOut) => {
                // Quiet line with bytes still pending: whatever partial
                // key match they were part of is not coming.
                if !buf.is_empty() {
                    let (w, h) = core.lock().dimensions();
                    for event in scanner.scan(&mut buf, true, w, h) {
                        if !core.post_or_quit(event) {
                            return;
                        }
                    }
                }
                continue;
            }
            Ok(ReadReady::Interrupted) => continue,
            Err(err) => {
                tracing::warn!(%err, "input poll failed");
                break;
            }
        }

        match file.read(&mut chunk) {
            Ok(0) => {
                if !buf.is_empty() {
                    let (w, h) = core.lock().dimensions();
                    for event in scanner.scan(&mut buf, true, w, h) {
                        if !core.post_or_quit(event) {
                            return;
                        }
                    }
                }
                break;
            }
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                let (w, h) = core.lock().dimensions();
                for event in scanner.scan(&mut buf, false, w, h) {
                    if !core.post_or_quit(event) {
                        return;
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                tracing::warn!(%err, "input read failed");
                break;
            }
        }
    }
    tracing::debug!("input thread exiting");
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The bytes the panic hook writes: everything `fini` would emit, with
/// padding dropped (an emergency path has no business sleeping).
fn restore_sequence(ti: &Terminfo) -> Vec<u8> {
    let mut seq = Vec::new();
    for cap in [
        &ti.show_cursor,
        &ti.attr_off,
        &ti.clear,
        &ti.exit_ca,
        &ti.exit_keypad,
        &ti.exit_mouse,
    ] {
        let _ = tputs(&mut seq, cap, 0);
    }
    seq
}

/// An environment variable parsed as a positive integer.
fn positive_env(name: &str) -> Option<usize> {
    env::var(name)
        .ok()?
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Key, KeyEvent};
    use crate::style::Color;

    // ── Capture plumbing ────────────────────────────────────────────────

    /// A writer the tests can read back, shared with the state under
    /// test the way the real tty writer is.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn take(&self) -> String {
            let mut bytes = self.0.lock().unwrap();
            let s = String::from_utf8_lossy(&bytes).into_owned();
            bytes.clear();
            s
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_state(width: usize, height: usize) -> (State, Capture) {
        let ti = terminfo::lookup("xterm").unwrap();
        let mut st = State::new(ti, width, height);
        let capture = Capture::default();
        st.out = Box::new(capture.clone());
        (st, capture)
    }

    /// Palette index 1, which xterm's set-foreground renders as SGR 31.
    fn red() -> Style {
        Style::DEFAULT.foreground(Color::MAROON)
    }

    // ── Draw: first frame ───────────────────────────────────────────────

    #[test]
    fn single_cell_write_emits_once() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, red(), &['A']);
        st.draw();

        let out = capture.take();
        assert!(out.starts_with("\x1b[?25l"), "frame starts by hiding cursor");
        assert!(out.contains("\x1b[1;1H"), "cursor addressed to the cell");
        assert!(out.contains('A'));
        assert!(out.contains("\x1b[31m"), "red foreground emitted");
        assert!(out.ends_with("\x1b[?25l"), "no cursor requested: stays hidden");
        assert!(!st.cells.any_dirty());
    }

    #[test]
    fn clean_frame_emits_only_cursor_management() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, red(), &['A']);
        st.draw();
        capture.take();

        st.draw();
        let out = capture.take();
        assert!(!out.contains('A'));
        assert!(!out.contains("\x1b[31m"));
        assert_eq!(out, "\x1b[?25l\x1b[?25l");
    }

    #[test]
    fn draw_consumes_dirty_bits() {
        let (mut st, _capture) = test_state(4, 4);
        st.cells.clear(Style::DEFAULT);
        assert!(st.cells.any_dirty());
        st.draw();
        assert!(!st.cells.any_dirty());
    }

    // ── Draw: cursor motion suppression ─────────────────────────────────

    #[test]
    fn sequential_cells_skip_goto() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, Style::DEFAULT, &['a']);
        st.cells.set_cell(1, 0, Style::DEFAULT, &['b']);
        st.cells.set_cell(2, 0, Style::DEFAULT, &['c']);
        st.draw();

        let out = capture.take();
        assert!(out.contains("abc"), "no escapes between adjacent runes: {out:?}");
        assert_eq!(out.matches('H').count(), 1, "one goto for the run");
    }

    #[test]
    fn gap_forces_goto() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, Style::DEFAULT, &['a']);
        st.cells.set_cell(5, 0, Style::DEFAULT, &['b']);
        st.draw();

        let out = capture.take();
        assert!(out.contains("\x1b[1;1H"));
        assert!(out.contains("\x1b[1;6H"));
    }

    #[test]
    fn wide_rune_advances_two_columns() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, Style::DEFAULT, &['漢']);
        st.cells.set_cell(2, 0, Style::DEFAULT, &['x']);
        st.draw();

        let out = capture.take();
        // The cell at column 2 follows the wide rune directly; no goto
        // for it.
        assert!(out.contains("漢x"), "{out:?}");
    }

    // ── Draw: style gating ──────────────────────────────────────────────

    #[test]
    fn same_style_emitted_once() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, red(), &['a']);
        st.cells.set_cell(1, 0, red(), &['b']);
        st.draw();

        let out = capture.take();
        assert_eq!(out.matches("\x1b[31m").count(), 1);
        assert_eq!(out.matches("\x1b(B\x1b[m").count(), 1, "one attr-off");
    }

    #[test]
    fn style_change_reemits_from_attr_off() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, red(), &['a']);
        st.cells
            .set_cell(1, 0, Style::DEFAULT.foreground(Color::GREEN).with(Attr::BOLD), &['b']);
        st.draw();

        let out = capture.take();
        assert_eq!(out.matches("\x1b(B\x1b[m").count(), 2);
        assert!(out.contains("\x1b[31m"));
        assert!(out.contains("\x1b[1m"), "bold for the second cell");
        assert!(out.contains("\x1b[32m"));
    }

    #[test]
    fn attribute_order_is_bold_underline_reverse_blink_dim() {
        let (mut st, capture) = test_state(10, 4);
        let all = Style::DEFAULT
            .with(Attr::BOLD | Attr::UNDERLINE | Attr::REVERSE | Attr::BLINK | Attr::DIM);
        st.cells.set_cell(0, 0, all, &['x']);
        st.draw();

        let out = capture.take();
        let order: Vec<usize> = ["\x1b[1m", "\x1b[4m", "\x1b[7m", "\x1b[5m", "\x1b[2m"]
            .iter()
            .map(|seq| out.find(seq).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{order:?}");
    }

    #[test]
    fn default_style_cells_render_with_screen_default() {
        let (mut st, capture) = test_state(10, 4);
        st.style = red();
        st.cells.set_cell(0, 0, Style::DEFAULT, &['a']);
        st.draw();
        assert!(capture.take().contains("\x1b[31m"));
    }

    #[test]
    fn default_colors_emit_no_color_sequences() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, Style::DEFAULT.with(Attr::BOLD), &['a']);
        st.draw();
        let out = capture.take();
        assert!(!out.contains("\x1b[3"), "no set-foreground: {out:?}");
        assert!(!out.contains("\x1b[4"), "no set-background: {out:?}");
    }

    // ── Draw: rune handling ─────────────────────────────────────────────

    #[test]
    fn blank_cells_render_as_spaces() {
        let (mut st, capture) = test_state(3, 1);
        st.cells.clear(Style::DEFAULT);
        st.draw();
        let out = capture.take();
        assert_eq!(out.matches(' ').count(), 3);
    }

    #[test]
    fn combining_tail_is_emitted_with_main_rune() {
        let (mut st, capture) = test_state(10, 4);
        st.cells.set_cell(0, 0, Style::DEFAULT, &['e', '\u{0301}']);
        st.draw();
        assert!(capture.take().contains("e\u{0301}"));
    }

    #[test]
    fn wide_rune_at_last_column_renders_as_space() {
        let (mut st, capture) = test_state(1, 1);
        st.cells.set_cell(0, 0, Style::DEFAULT, &['漢']);
        st.draw();

        let out = capture.take();
        assert!(!out.contains('漢'));
        assert!(out.contains(' '));
        // The cell itself still reports its logical width.
        assert_eq!(st.cells.get(0, 0).unwrap().width(), 2);
    }

    // ── Draw: clear flag ────────────────────────────────────────────────

    #[test]
    fn clear_flag_emits_clear_once() {
        let (mut st, capture) = test_state(3, 2);
        st.clear = true;
        st.cells.invalidate();
        st.draw();
        let out = capture.take();
        assert!(out.contains("\x1b[H\x1b[2J"));
        assert!(!st.clear);

        st.draw();
        assert!(!capture.take().contains("\x1b[H\x1b[2J"));
    }

    // ── Draw: hardware cursor ───────────────────────────────────────────

    #[test]
    fn requested_cursor_is_shown_at_position() {
        let (mut st, capture) = test_state(10, 4);
        st.cursor = Some((2, 1));
        st.draw();
        let out = capture.take();
        assert!(out.ends_with("\x1b[2;3H\x1b[?12l\x1b[?25h"), "{out:?}");
    }

    #[test]
    fn off_grid_cursor_is_hidden() {
        let (mut st, capture) = test_state(10, 4);
        st.cursor = Some((10, 1));
        st.draw();
        assert!(capture.take().ends_with("\x1b[?25l"));
    }

    // ── Resize ──────────────────────────────────────────────────────────

    #[test]
    fn shrink_discards_and_repaints() {
        let (mut st, capture) = test_state(10, 5);
        st.cells.set_cell(9, 4, red(), &['Z']);
        st.draw();
        capture.take();

        let event = st.apply_size((5, 5)).unwrap();
        assert_eq!(event, Event::Resize(ResizeEvent { w: 5, h: 5 }));
        assert!(st.cells.get(9, 4).is_none());

        st.draw();
        let out = capture.take();
        // Every surviving cell is re-emitted: 25 blanks.
        assert_eq!(out.matches(' ').count(), 25);
        assert!(!st.cells.any_dirty());
    }

    #[test]
    fn unchanged_size_produces_no_event() {
        let (mut st, _capture) = test_state(10, 5);
        assert!(st.apply_size((10, 5)).is_none());
    }

    #[test]
    fn resize_without_a_tty_is_inert() {
        let (mut st, _capture) = test_state(10, 5);
        assert!(st.resize().is_none());
        assert_eq!(st.dimensions(), (10, 5));
    }

    // ── Screen facade ───────────────────────────────────────────────────

    fn test_screen() -> TermScreen {
        TermScreen::with_terminfo(terminfo::lookup("xterm").unwrap())
    }

    #[test]
    fn colors_come_from_the_description() {
        assert_eq!(test_screen().colors(), 8);
        let big = TermScreen::with_terminfo(terminfo::lookup("xterm-256color").unwrap());
        assert_eq!(big.colors(), 256);
    }

    #[test]
    fn set_and_get_cell_round_trip() {
        let mut screen = test_screen();
        screen.set_cell(3, 2, red(), &['Q']);
        let cell = screen.get_cell(3, 2).unwrap();
        assert_eq!(cell.runes(), ['Q']);
        assert_eq!(cell.style(), red());
    }

    #[test]
    fn get_cell_returns_a_snapshot() {
        let mut screen = test_screen();
        screen.set_cell(0, 0, Style::DEFAULT, &['A']);
        let mut copy = screen.get_cell(0, 0).unwrap();
        copy.set_runes(&['B']);
        assert_eq!(screen.get_cell(0, 0).unwrap().runes(), ['A']);
    }

    #[test]
    fn out_of_range_operations_are_silent() {
        let mut screen = test_screen();
        screen.set_cell(200, 200, red(), &['X']);
        assert!(screen.get_cell(200, 200).is_none());
    }

    #[test]
    fn put_cell_round_trips_through_get_cell() {
        let mut screen = test_screen();
        screen.set_cell(1, 1, red(), &['R']);
        let mut cell = screen.get_cell(1, 1).unwrap();
        cell.set_style(Style::DEFAULT.background(Color::BLUE));
        screen.put_cell(1, 1, &cell);
        assert_eq!(
            screen.get_cell(1, 1).unwrap().style(),
            Style::DEFAULT.background(Color::BLUE)
        );
    }

    #[test]
    fn clear_applies_the_default_style() {
        let mut screen = test_screen();
        screen.set_style(red());
        screen.set_cell(0, 0, Style::DEFAULT, &['A']);
        screen.clear();
        let cell = screen.get_cell(0, 0).unwrap();
        assert!(cell.runes().is_empty());
        assert_eq!(cell.style(), red());
    }

    // ── Event bus ───────────────────────────────────────────────────────

    #[test]
    fn posted_events_come_back_in_order() {
        let screen = test_screen();
        screen.post_event(Event::rune('a'));
        screen.post_event(Event::Key(KeyEvent::plain(Key::Up)));
        assert_eq!(screen.poll_event(), Some(Event::rune('a')));
        assert_eq!(
            screen.poll_event(),
            Some(Event::Key(KeyEvent::plain(Key::Up)))
        );
    }

    #[test]
    fn poll_event_returns_none_after_fini() {
        let mut screen = test_screen();
        screen.fini();
        assert_eq!(screen.poll_event(), None);
        // And keeps returning it.
        assert_eq!(screen.poll_event(), None);
    }

    #[test]
    fn poll_event_drains_across_threads() {
        let screen = Arc::new(test_screen());
        let poster = Arc::clone(&screen);
        let handle = std::thread::spawn(move || {
            for _ in 0..32 {
                poster.post_event(Event::rune('x'));
            }
        });
        let mut seen = 0;
        while seen < 32 {
            assert_eq!(screen.poll_event(), Some(Event::rune('x')));
            seen += 1;
        }
        handle.join().unwrap();
    }

    #[test]
    fn fini_without_init_is_safe_and_repeatable() {
        let mut screen = test_screen();
        screen.fini();
        screen.fini();
    }

    // ── Environment overrides ───────────────────────────────────────────

    #[test]
    fn geometry_from_description_and_env_overrides() {
        // One test mutates the environment; keeping every case here
        // avoids racing parallel tests over the same variables.
        env::remove_var("LINES");
        env::remove_var("COLUMNS");
        assert_eq!(test_screen().size(), (80, 24));

        env::set_var("LINES", "30");
        env::set_var("COLUMNS", "132");
        assert_eq!(test_screen().size(), (132, 30));

        // Zero and garbage do not override.
        env::set_var("LINES", "0");
        env::set_var("COLUMNS", "not-a-number");
        assert_eq!(test_screen().size(), (80, 24));

        env::remove_var("LINES");
        env::remove_var("COLUMNS");
    }
}
