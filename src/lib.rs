// SPDX-License-Identifier: MIT

//! termgrid — a terminfo-driven character-cell terminal screen.
//!
//! A full-screen display layer that hides raw escape-sequence handling
//! behind a buffered, diffed cell grid with a concurrent input event
//! stream. Cells carry runes, a style token, and a dirty bit; each
//! [`show`](screen::Screen::show) emits only what changed, as the
//! escape sequences the terminal's own description specifies. A
//! background thread decodes tty bytes into key, rune, and mouse
//! events, and window resizes arrive on the same event stream.
//!
//! ```no_run
//! use termgrid::screen::{Screen, TermScreen};
//! use termgrid::style::{Color, Style};
//!
//! let mut screen = TermScreen::new()?;
//! screen.init()?;
//! let style = Style::DEFAULT.foreground(Color::WHITE).background(Color::NAVY);
//! screen.set_cell(0, 0, style, &['h']);
//! screen.set_cell(1, 0, style, &['i']);
//! screen.show();
//! while let Some(event) = screen.poll_event() {
//!     // keys, mouse reports, resizes...
//!     # let _ = event; break;
//! }
//! screen.fini();
//! # Ok::<(), termgrid::error::Error>(())
//! ```

pub mod buffer;
pub mod cell;
mod database;
pub mod error;
pub mod event;
pub mod scan;
pub mod screen;
pub mod style;
pub mod terminfo;
mod tty;

pub use crate::buffer::CellBuffer;
pub use crate::cell::Cell;
pub use crate::error::Error;
pub use crate::event::{Buttons, Event, Key, KeyEvent, Mods, MouseEvent, ResizeEvent};
pub use crate::screen::{Screen, TermScreen};
pub use crate::style::{Attr, Color, Style};
