// SPDX-License-Identifier: MIT
//
// Tty — raw terminal access and restoration.
//
// Safety: this module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), poll, read, and sigaction. These are
// the POSIX interfaces for terminal control; each unsafe block is
// minimal. Everything here is unix-only; other platforms get stubs that
// fail at open.
#![allow(unsafe_code)]
//
// The panic hook is the delicate part. A panic while the terminal is
// raw leaves the user's shell unusable: no echo, no line discipline,
// and whatever screen state the frame left behind. The hook writes a
// pre-built restore sequence and the saved termios straight to the tty
// fd, bypassing any stdout lock the panicking thread may hold, then
// hands off to the original panic handler so the message prints to a
// working terminal. It is armed when the tty goes raw, updated once the
// screen knows its terminal's restore capabilities, and disarmed on
// orderly shutdown.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once, PoisonError};

#[cfg(unix)]
use std::fs::{File, OpenOptions};
#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};

/// Outcome of waiting for the input fd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadReady {
    /// Bytes are available.
    Ready,
    /// The timeout elapsed with nothing to read.
    TimedOut,
    /// A signal interrupted the wait.
    Interrupted,
}

// ─── Panic-safe restore ──────────────────────────────────────────────────────

#[cfg(unix)]
struct RestoreState {
    fd: RawFd,
    termios: libc::termios,
    sequence: Vec<u8>,
}

#[cfg(unix)]
static RESTORE: Mutex<Option<RestoreState>> = Mutex::new(None);

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

/// Write the restore sequence and termios directly to the tty fd.
///
/// Raw fd writes only: the panic may have happened while a stdout or
/// screen lock was held.
fn emergency_restore() {
    #[cfg(unix)]
    if let Ok(guard) = RESTORE.lock() {
        if let Some(state) = guard.as_ref() {
            unsafe {
                let _ = libc::write(
                    state.fd,
                    state.sequence.as_ptr().cast::<libc::c_void>(),
                    state.sequence.len(),
                );
                let _ = libc::tcsetattr(state.fd, libc::TCSANOW, &raw const state.termios);
            }
        }
    }
}

/// Replace the capability bytes the panic hook writes before restoring
/// termios. A no-op while the hook is disarmed.
#[cfg(unix)]
pub(crate) fn set_restore_sequence(sequence: Vec<u8>) {
    let mut guard = RESTORE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(state) = guard.as_mut() {
        state.sequence = sequence;
    }
}

#[cfg(not(unix))]
pub(crate) fn set_restore_sequence(_sequence: Vec<u8>) {}

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Set by the signal handler, drained by the input thread.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install the SIGWINCH handler. The handler only stores an atomic flag,
/// which is one of the few operations legal inside a signal handler.
#[cfg(unix)]
pub(crate) fn install_winch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = 0;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
pub(crate) fn install_winch_handler() {}

/// Consume the pending resize notification, if any.
pub(crate) fn take_winch() -> bool {
    SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed)
}

#[cfg(test)]
pub(crate) fn post_winch_for_test() {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

// ─── Tty handle ──────────────────────────────────────────────────────────────

/// The controlling terminal, switched to raw mode.
///
/// Opening saves the termios state and arms the panic hook; `restore`
/// puts the line discipline back and disarms it. The same device serves
/// reads (input thread) and writes (renderer) through cloned handles.
#[cfg(unix)]
pub(crate) struct Tty {
    file: File,
    saved: libc::termios,
    baud: u32,
}

#[cfg(unix)]
impl Tty {
    /// Open `/dev/tty` and enter raw mode.
    ///
    /// On failure the terminal is left exactly as found.
    pub(crate) fn open() -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        let fd = file.as_raw_fd();

        let saved = unsafe {
            let mut tios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut tios) != 0 {
                return Err(io::Error::last_os_error());
            }
            tios
        };

        // Arm the hook before the switch: a panic between here and the
        // first frame still restores the line discipline.
        install_panic_hook();
        *RESTORE.lock().unwrap_or_else(PoisonError::into_inner) = Some(RestoreState {
            fd,
            termios: saved,
            sequence: Vec::new(),
        });

        let mut mode = saved;
        mode.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        mode.c_oflag &= !libc::OPOST;
        mode.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        mode.c_cflag &= !(libc::CSIZE | libc::PARENB);
        mode.c_cflag |= libc::CS8;
        // Block until at least one byte; the input thread's poll()
        // provides the timeouts.
        mode.c_cc[libc::VMIN] = 1;
        mode.c_cc[libc::VTIME] = 0;

        let rc = unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const mode) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            *RESTORE.lock().unwrap_or_else(PoisonError::into_inner) = None;
            return Err(err);
        }

        let baud = baud_rate(&saved);
        Ok(Self { file, saved, baud })
    }

    /// Output baud rate of the line, 0 when unknown.
    pub(crate) const fn baud(&self) -> u32 {
        self.baud
    }

    pub(crate) fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// A read handle for the input thread.
    pub(crate) fn reader(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// A write handle for the renderer.
    pub(crate) fn writer(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// Restore the saved termios and disarm the panic hook.
    pub(crate) fn restore(&self) {
        unsafe {
            let _ = libc::tcsetattr(self.file.as_raw_fd(), libc::TCSAFLUSH, &raw const self.saved);
        }
        *RESTORE.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Current window size of the terminal behind `fd`.
#[cfg(unix)]
pub(crate) fn window_size(fd: RawFd) -> io::Result<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };
    if rc == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Ok((ws.ws_col, ws.ws_row))
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Wait up to `timeout_ms` for `fd` to become readable.
#[cfg(unix)]
pub(crate) fn wait_readable(fd: RawFd, timeout_ms: i32) -> io::Result<ReadReady> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) };
    match rc {
        0 => Ok(ReadReady::TimedOut),
        n if n > 0 => Ok(ReadReady::Ready),
        _ => {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                Ok(ReadReady::Interrupted)
            } else {
                Err(err)
            }
        }
    }
}

/// Map the termios output speed to bits per second.
#[cfg(unix)]
fn baud_rate(tios: &libc::termios) -> u32 {
    let speed = unsafe { libc::cfgetospeed(tios) };
    #[allow(clippy::unreadable_literal)]
    let table: &[(libc::speed_t, u32)] = &[
        (libc::B50, 50),
        (libc::B75, 75),
        (libc::B110, 110),
        (libc::B134, 134),
        (libc::B150, 150),
        (libc::B200, 200),
        (libc::B300, 300),
        (libc::B600, 600),
        (libc::B1200, 1200),
        (libc::B1800, 1800),
        (libc::B2400, 2400),
        (libc::B4800, 4800),
        (libc::B9600, 9600),
        (libc::B19200, 19200),
        (libc::B38400, 38400),
        (libc::B57600, 57600),
        (libc::B115200, 115200),
        (libc::B230400, 230400),
    ];
    table
        .iter()
        .find(|&&(constant, _)| constant == speed)
        .map_or(0, |&(_, bps)| bps)
}

// ─── Non-unix stubs ──────────────────────────────────────────────────────────

#[cfg(not(unix))]
pub(crate) struct Tty;

#[cfg(not(unix))]
impl Tty {
    pub(crate) fn open() -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "terminal control requires a unix tty",
        ))
    }

    pub(crate) const fn baud(&self) -> u32 {
        0
    }

    pub(crate) fn restore(&self) {}
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_winch_drains_the_flag() {
        take_winch(); // clear any prior state
        assert!(!take_winch());
        post_winch_for_test();
        assert!(take_winch());
        assert!(!take_winch());
    }

    #[cfg(unix)]
    #[test]
    fn window_size_on_non_tty_errors_cleanly() {
        // fd 0 in the test harness is usually a pipe; either outcome is
        // fine as long as nothing panics.
        let _ = window_size(0);
    }

    #[cfg(unix)]
    #[test]
    fn wait_readable_times_out_on_quiet_pipe() {
        // A fresh pipe's read end has nothing to deliver.
        let mut fds: [libc::c_int; 2] = [0; 2];
        let rc = unsafe { libc::pipe(&raw mut fds[0]) };
        assert_eq!(rc, 0);
        let ready = wait_readable(fds[0], 10).unwrap();
        assert_eq!(ready, ReadReady::TimedOut);
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
    }

    #[cfg(unix)]
    #[test]
    fn wait_readable_sees_pending_bytes() {
        let mut fds: [libc::c_int; 2] = [0; 2];
        let rc = unsafe { libc::pipe(&raw mut fds[0]) };
        assert_eq!(rc, 0);
        let byte = [0x41u8];
        unsafe {
            libc::write(fds[1], byte.as_ptr().cast(), 1);
        }
        let ready = wait_readable(fds[0], 10).unwrap();
        assert_eq!(ready, ReadReady::Ready);
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
    }
}
