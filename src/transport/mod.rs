//! Transport abstractions for the serial link.
//!
//! The link is split into a read half (`LineSource`, newline-delimited ASCII
//! sample values) and a write half (`CommandSink`, single command bytes) so
//! the acquisition and visualization threads each own the half they use.

use crate::error::TransportError;

mod recording;
mod scripted;
mod serial;
mod synthetic;

pub use recording::RecordingSink;
pub use scripted::ScriptedLineSource;
pub use serial::{list_ports, open_serial, PortDescription, SerialCommandSink, SerialLineSource};
pub use synthetic::{SyntheticConfig, SyntheticLineSource};

/// Read half of the link
pub trait LineSource: Send {
    /// Blocking read of one line
    ///
    /// # Returns
    /// * `Ok(Some(line))` - One line, terminator included or not
    /// * `Ok(None)` - No complete line within the read timeout
    /// * `Err(TransportError)` - The read failed or the link is gone
    fn read_line(&mut self) -> Result<Option<String>, TransportError>;
}

/// Write half of the link
pub trait CommandSink: Send {
    fn write_command(&mut self, command: u8) -> Result<(), TransportError>;
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        (**self).read_line()
    }
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn write_command(&mut self, command: u8) -> Result<(), TransportError> {
        (**self).write_command(command)
    }
}
