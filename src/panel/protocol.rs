//! # Panel Protocol
//!
//! The panel speaks a line-based text protocol with a strict half-duplex
//! discipline: every command line sent is acknowledged by exactly one
//! reply line, which must be consumed before the next command goes out.
//! There is no pipelining and no resynchronization; if replies ever stop
//! lining up one-to-one with commands, later event parsing silently
//! misreads data. [`PanelLink`] keeps that pairing in one place.
//!
//! Command vocabulary used:
//!
//! ```text
//! freeze                  suspend panel rendering during a rebuild
//! clearbuttons            remove all buttons
//! addbutton<x><y><w><h>   add a button (four digits, no separators)
//! button<n> <filename>    set button n's image (n is 1-based)
//! unfreeze                resume panel rendering
//! ```
//!
//! Unsolicited output (boot chatter, diagnostics) is flushed with
//! [`PanelLink::drain`], the only place a bounded read timeout is used.

use std::time::Duration;

use log::info;

use crate::panel::channel::{ChannelError, LineChannel};

/// The protocol driver. Owns the channel exclusively; no other component
/// reads or writes the line.
pub struct PanelLink {
    channel: Box<dyn LineChannel>,
}

impl PanelLink {
    pub fn new(channel: Box<dyn LineChannel>) -> Self {
        Self { channel }
    }

    /// Sends one command line and blocks for its acknowledgement line.
    /// Returns the acknowledgement; callers may ignore it.
    pub fn send_command(&mut self, text: &str) -> Result<String, ChannelError> {
        self.channel.write_line(text)?;
        match self.channel.read_line()? {
            Some(reply) => Ok(reply),
            None => Err(ChannelError::Closed),
        }
    }

    /// Reads and surfaces pending unsolicited lines until `timeout`
    /// elapses with nothing received, then restores blocking mode. An
    /// empty read is the expected termination, not an error.
    pub fn drain(&mut self, timeout: Duration) -> Result<(), ChannelError> {
        self.channel.set_timeout(Some(timeout))?;
        while let Some(line) = self.channel.read_line()? {
            info!("panel: {}", line.trim_end());
        }
        self.channel.set_timeout(None)?;
        Ok(())
    }

    /// One blocking line read; the run loop's event wait.
    pub fn read_event(&mut self) -> Result<String, ChannelError> {
        match self.channel.read_line()? {
            Some(line) => Ok(line),
            None => Err(ChannelError::Closed),
        }
    }

    pub fn freeze(&mut self) -> Result<(), ChannelError> {
        self.send_command("freeze").map(drop)
    }

    pub fn unfreeze(&mut self) -> Result<(), ChannelError> {
        self.send_command("unfreeze").map(drop)
    }

    pub fn clear_buttons(&mut self) -> Result<(), ChannelError> {
        self.send_command("clearbuttons").map(drop)
    }

    /// The firmware parses the four geometry fields as fixed single-width
    /// digits; the page model guarantees they fit.
    pub fn add_button(&mut self, x: u8, y: u8, w: u8, h: u8) -> Result<(), ChannelError> {
        self.send_command(&format!("addbutton{x}{y}{w}{h}")).map(drop)
    }

    /// `n` is the panel's 1-based button number.
    pub fn set_button_image(&mut self, n: usize, image: &str) -> Result<(), ChannelError> {
        self.send_command(&format!("button{n} {image}")).map(drop)
    }
}
