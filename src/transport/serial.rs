// Serial link backed by the `serialport` crate
//
// One port is opened and cloned: the original handle feeds the line reader on
// the acquisition thread, the clone carries command bytes from the
// visualization thread. A read timeout keeps the reader responsive to
// shutdown when the sensor goes quiet.

use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};

use super::{CommandSink, LineSource};
use crate::config::SerialConfig;
use crate::error::TransportError;

/// Open and configure the port, returning its read and write halves
///
/// Startup failure here is fatal for the caller; nothing has been spawned
/// yet.
pub fn open_serial(
    config: &SerialConfig,
) -> Result<(SerialLineSource, SerialCommandSink), TransportError> {
    let open_failed = |reason: String| TransportError::OpenFailed {
        port: config.port.clone(),
        reason,
    };

    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(Duration::from_millis(config.read_timeout_ms.max(1)))
        .open()
        .map_err(|err| open_failed(err.to_string()))?;
    let writer = port
        .try_clone()
        .map_err(|err| open_failed(format!("cannot clone handle for writing: {}", err)))?;

    tracing::info!(
        "[Serial] Connected to {} at {} baud",
        config.port,
        config.baud_rate
    );

    Ok((
        SerialLineSource::new(port),
        SerialCommandSink { port: writer },
    ))
}

/// Line reader over a serial port
pub struct SerialLineSource {
    reader: BufReader<Box<dyn SerialPort>>,
    /// Bytes of a line interrupted by a read timeout
    pending: Vec<u8>,
}

impl SerialLineSource {
    fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            reader: BufReader::new(port),
            pending: Vec::with_capacity(16),
        }
    }
}

impl LineSource for SerialLineSource {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        read_line_from(&mut self.reader, &mut self.pending)
    }
}

/// Shared by the serial source and its tests: keeps partial lines across
/// timeouts and maps I/O errors onto `TransportError`
fn read_line_from<R: BufRead>(
    reader: &mut R,
    pending: &mut Vec<u8>,
) -> Result<Option<String>, TransportError> {
    match reader.read_until(b'\n', pending) {
        Ok(0) if pending.is_empty() => Err(TransportError::Disconnected),
        Ok(_) => {
            let line = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            Ok(Some(line))
        }
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(None)
        }
        Err(err) => Err(TransportError::ReadFailed {
            details: err.to_string(),
        }),
    }
}

/// Command writer over a cloned serial handle
pub struct SerialCommandSink {
    port: Box<dyn SerialPort>,
}

impl CommandSink for SerialCommandSink {
    fn write_command(&mut self, command: u8) -> Result<(), TransportError> {
        self.port
            .write_all(&[command])
            .and_then(|_| self.port.flush())
            .map_err(|err| TransportError::WriteFailed {
                details: err.to_string(),
            })
    }
}

/// Port found on the system
#[derive(Debug, Clone, serde::Serialize)]
pub struct PortDescription {
    pub name: String,
    pub kind: String,
}

/// Enumerate serial ports available on this machine
pub fn list_ports() -> Result<Vec<PortDescription>, TransportError> {
    let ports = serialport::available_ports().map_err(|err| TransportError::OpenFailed {
        port: "<enumerate>".to_string(),
        reason: err.to_string(),
    })?;

    Ok(ports
        .into_iter()
        .map(|info| PortDescription {
            kind: describe_port_type(&info.port_type),
            name: info.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => match (&usb.manufacturer, &usb.product) {
            (Some(manufacturer), Some(product)) => format!("usb: {} {}", manufacturer, product),
            (None, Some(product)) => format!("usb: {}", product),
            _ => format!("usb: {:04x}:{:04x}", usb.vid, usb.pid),
        },
        SerialPortType::PciPort => "pci".to_string(),
        SerialPortType::BluetoothPort => "bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    /// Reader that yields its chunks, then a timeout, in order
    struct ChunkedReader {
        chunks: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            match self.chunks.remove(0) {
                Ok(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Err(err) => Err(err),
            }
        }
    }

    #[test]
    fn test_reads_complete_lines() {
        let mut reader = BufReader::new(Cursor::new(b"305\r\n306\n".to_vec()));
        let mut pending = Vec::new();
        assert_eq!(
            read_line_from(&mut reader, &mut pending).unwrap(),
            Some("305\r\n".to_string())
        );
        assert_eq!(
            read_line_from(&mut reader, &mut pending).unwrap(),
            Some("306\n".to_string())
        );
        assert_eq!(
            read_line_from(&mut reader, &mut pending),
            Err(TransportError::Disconnected)
        );
    }

    #[test]
    fn test_timeout_keeps_partial_line() {
        let mut reader = BufReader::with_capacity(
            4,
            ChunkedReader {
                chunks: vec![
                    Ok(b"31".to_vec()),
                    Err(io::Error::new(io::ErrorKind::TimedOut, "timeout")),
                    Ok(b"2\n".to_vec()),
                ],
            },
        );
        let mut pending = Vec::new();

        assert_eq!(read_line_from(&mut reader, &mut pending).unwrap(), None);
        assert_eq!(pending, b"31");
        assert_eq!(
            read_line_from(&mut reader, &mut pending).unwrap(),
            Some("312\n".to_string())
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_hard_error_maps_to_read_failed() {
        let mut reader = BufReader::new(ChunkedReader {
            chunks: vec![Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))],
        });
        let mut pending = Vec::new();
        match read_line_from(&mut reader, &mut pending) {
            Err(TransportError::ReadFailed { details }) => assert!(details.contains("unplugged")),
            other => panic!("Expected ReadFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig {
            port: "/definitely/not/a/serial/port".to_string(),
            ..SerialConfig::default()
        };
        match open_serial(&config) {
            Err(TransportError::OpenFailed { port, .. }) => assert_eq!(port, config.port),
            Err(other) => panic!("Expected OpenFailed, got {:?}", other),
            Ok(_) => panic!("Opening a nonexistent port must fail"),
        }
    }
}
