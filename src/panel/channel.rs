//! # Line Channel
//!
//! The transport seam between the protocol driver and the outside world.
//! [`LineChannel`] is the minimal contract the driver needs: write a
//! line, read a line (blocking or bounded), toggle between the two modes.
//! Production uses [`SerialChannel`] over a serial port; tests script the
//! trait directly.

use std::fmt;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use log::debug;
use serialport::SerialPort;

/// Poll interval used to emulate an indefinitely blocking read on top of
/// the serial port's bounded timeout.
const BLOCKING_POLL: Duration = Duration::from_secs(3600);

/// Errors that can occur on the line transport.
#[derive(Debug)]
pub enum ChannelError {
    /// Byte-level read/write failure. Fatal; there is no reconnect.
    Io(io::Error),
    /// Serial port open/configuration failure.
    Serial(serialport::Error),
    /// The peer closed the line (EOF on a blocking read).
    Closed,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Io(e) => write!(f, "channel I/O error: {e}"),
            ChannelError::Serial(e) => write!(f, "serial port error: {e}"),
            ChannelError::Closed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<io::Error> for ChannelError {
    fn from(e: io::Error) -> Self {
        ChannelError::Io(e)
    }
}

impl From<serialport::Error> for ChannelError {
    fn from(e: serialport::Error) -> Self {
        ChannelError::Serial(e)
    }
}

/// A duplex, newline-delimited text channel.
pub trait LineChannel {
    /// Appends a line terminator and transmits.
    fn write_line(&mut self, line: &str) -> Result<(), ChannelError>;

    /// Returns the next newline-delimited line, or `None` if the bounded
    /// timeout elapsed with nothing received. Never `None` in blocking
    /// mode.
    fn read_line(&mut self) -> Result<Option<String>, ChannelError>;

    /// `None` means block indefinitely; `Some` bounds subsequent reads.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ChannelError>;
}

/// [`LineChannel`] over a physical serial port.
pub struct SerialChannel {
    reader: BufReader<Box<dyn SerialPort>>,
    timeout: Option<Duration>,
    /// Bytes of a line received so far, kept across timed-out reads so a
    /// partially transmitted line is not dropped.
    partial: String,
}

impl SerialChannel {
    pub fn open(path: &str, baud: u32) -> Result<Self, ChannelError> {
        let port = serialport::new(path, baud).timeout(BLOCKING_POLL).open()?;
        Ok(Self {
            reader: BufReader::new(port),
            timeout: None,
            partial: String::new(),
        })
    }
}

impl LineChannel for SerialChannel {
    fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        debug!("-> {line}");
        let port = self.reader.get_mut();
        port.write_all(line.as_bytes())?;
        port.write_all(b"\n")?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, ChannelError> {
        loop {
            match self.reader.read_line(&mut self.partial) {
                Ok(0) => return Err(ChannelError::Closed),
                Ok(_) => {
                    let line = self.partial.trim_end_matches(['\r', '\n']).to_string();
                    self.partial.clear();
                    return Ok(Some(line));
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    // Bounded mode: nothing pending. Blocking mode: the
                    // poll interval lapsed, keep waiting.
                    if self.timeout.is_some() {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ChannelError> {
        self.timeout = timeout;
        let effective = timeout.unwrap_or(BLOCKING_POLL);
        self.reader.get_mut().set_timeout(effective)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_forms() {
        let io = ChannelError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(io.to_string().contains("channel I/O error"));
        assert_eq!(ChannelError::Closed.to_string(), "channel closed");
    }
}
