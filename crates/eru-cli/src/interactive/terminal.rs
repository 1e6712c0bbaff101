//! Local terminal control.

use std::io;
use std::sync::Arc;

use eru_proto::WindowSize;
use tracing::{debug, warn};

/// Operations the attach session needs from the local terminal.
pub trait TerminalControl: Send + Sync + 'static {
    /// Save the current attributes and switch to raw mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be configured.
    fn enable_raw_mode(&self) -> io::Result<()>;

    /// Restore the attributes saved by [`enable_raw_mode`](Self::enable_raw_mode).
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be configured.
    fn disable_raw_mode(&self) -> io::Result<()>;

    /// Current geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the size query fails.
    fn size(&self) -> io::Result<WindowSize>;
}

/// The process's controlling terminal, via crossterm.
///
/// Raw mode is `cfmakeraw`: no echo, canonical mode, signal keys or
/// extended input processing, no CR/NL translation, no output
/// post-processing, reads return after a single byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermTerminal;

impl TerminalControl for CrosstermTerminal {
    fn enable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }

    fn size(&self) -> io::Result<WindowSize> {
        let (cols, rows) = crossterm::terminal::size()?;
        Ok(WindowSize::new(rows, cols))
    }
}

/// Holds the terminal in raw mode until dropped.
///
/// Failure to enter raw mode is logged and the session continues in
/// cooked mode; nothing is restored in that case.
#[derive(Debug)]
pub struct RawModeGuard<T: TerminalControl> {
    terminal: Arc<T>,
    active: bool,
}

impl<T: TerminalControl> RawModeGuard<T> {
    /// Enter raw mode.
    pub fn enter(terminal: Arc<T>) -> Self {
        let active = match terminal.enable_raw_mode() {
            Ok(()) => {
                debug!("terminal in raw mode");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to enable raw mode");
                false
            }
        };
        Self { terminal, active }
    }

    /// Whether raw mode was entered.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

impl<T: TerminalControl> Drop for RawModeGuard<T> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(e) = self.terminal.disable_raw_mode() {
            warn!(error = %e, "failed to restore terminal");
        }
    }
}
