//! Terminal mode setup and teardown.
//!
//! [`TerminalModes`] remembers which modes it switched on so that [`undo`]
//! only reverts those, and is safe to call more than once.
//!
//! [`undo`]: TerminalModes::undo

use std::io::{self, stdout};
use std::panic;

use crossterm::ExecutableCommand;
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use log::{debug, info, warn};

/// Modes enabled on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalModes {
    raw_mode: bool,
    alternate_screen: bool,
    keyboard_enhancement: bool,
    bracketed_paste: bool,
}

impl TerminalModes {
    /// Switch the terminal into the modes the interface needs.
    ///
    /// Keyboard enhancement and bracketed paste are optional; failing to
    /// enable either is logged and ignored. On a fatal error every mode
    /// enabled so far is reverted.
    pub fn enable() -> io::Result<Self> {
        let mut modes = Self::default();

        enable_raw_mode()?;
        modes.raw_mode = true;
        debug!("Enabled raw mode");

        // Without this, Ctrl+H arrives as Backspace on most terminals.
        match supports_keyboard_enhancement() {
            Ok(true) => {
                let flags = KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES;
                match stdout().execute(PushKeyboardEnhancementFlags(flags)) {
                    Ok(_) => {
                        modes.keyboard_enhancement = true;
                        debug!("Enabled keyboard enhancement flags: {flags:?}");
                    },
                    Err(err) => warn!("Failed to enable keyboard enhancement: {err}"),
                }
            },
            Ok(false) => info!("Keyboard enhancement not supported by terminal"),
            Err(err) => warn!("Failed to query keyboard enhancement support: {err}"),
        }

        if let Err(err) = stdout().execute(EnterAlternateScreen) {
            modes.undo();
            return Err(err);
        }
        modes.alternate_screen = true;

        match stdout().execute(EnableBracketedPaste) {
            Ok(_) => modes.bracketed_paste = true,
            Err(err) => warn!("Failed to enable bracketed paste: {err}"),
        }

        Ok(modes)
    }

    /// Restore the terminal to its original state.
    pub fn undo(&mut self) {
        if self.bracketed_paste {
            let _ = stdout().execute(DisableBracketedPaste);
            self.bracketed_paste = false;
        }
        if self.keyboard_enhancement {
            let _ = stdout().execute(PopKeyboardEnhancementFlags);
            self.keyboard_enhancement = false;
        }
        if self.alternate_screen {
            let _ = stdout().execute(LeaveAlternateScreen);
            self.alternate_screen = false;
        }
        if self.raw_mode {
            let _ = disable_raw_mode();
            self.raw_mode = false;
            debug!("Disabled raw mode");
        }
    }
}

impl Drop for TerminalModes {
    fn drop(&mut self) {
        self.undo();
    }
}

/// Restore the terminal before the default panic message is printed.
pub fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = stdout().execute(PopKeyboardEnhancementFlags);
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
        default_hook(info);
    }));
}
