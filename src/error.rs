// SPDX-License-Identifier: MIT
//
// Crate error type.

use std::io;

use thiserror::Error;

/// Errors surfaced by screen construction and lifecycle.
#[derive(Debug, Error)]
pub enum Error {
    /// `$TERM` is unset or empty, so no terminal description can be
    /// selected.
    #[error("TERM environment variable not set")]
    TermNotSet,

    /// `$TERM` named a terminal the description database does not know.
    #[error("terminal type {0:?} is not in the description database")]
    UnknownTerminal(String),

    /// The process has no controlling terminal to attach to.
    #[error("not attached to a terminal")]
    NotATerminal,

    /// Termios or tty I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_terminal_names_the_term() {
        let err = Error::UnknownTerminal("dumb".into());
        assert!(err.to_string().contains("dumb"));
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
