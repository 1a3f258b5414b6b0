// Transport error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Transport error code constants
///
/// Error code range: 1001-1005
pub struct TransportErrorCodes {}

impl TransportErrorCodes {
    /// Serial link could not be opened at startup
    pub const OPEN_FAILED: i32 = 1001;

    /// Reading a line from the link failed
    pub const READ_FAILED: i32 = 1002;

    /// Writing a command byte to the link failed
    pub const WRITE_FAILED: i32 = 1003;

    /// Link reached end of stream
    pub const DISCONNECTED: i32 = 1004;

    /// Consecutive read failures exceeded the retry budget
    pub const RETRIES_EXHAUSTED: i32 = 1005;
}

/// Log a transport error with structured context
///
/// Logs the numeric code, the component and the message. Never panics.
pub fn log_transport_error(err: &TransportError, context: &str) {
    error!(
        "Transport error in {}: code={}, component=SerialLink, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Transport-related errors
///
/// These errors cover the serial link in both directions: opening the port,
/// reading sample lines and writing command bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Port could not be opened or configured
    OpenFailed { port: String, reason: String },

    /// Read from the link failed
    ReadFailed { details: String },

    /// Write to the link failed
    WriteFailed { details: String },

    /// Link closed (end of stream)
    Disconnected,

    /// Read retries exhausted after `attempts` consecutive failures
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ErrorCode for TransportError {
    fn code(&self) -> i32 {
        match self {
            TransportError::OpenFailed { .. } => TransportErrorCodes::OPEN_FAILED,
            TransportError::ReadFailed { .. } => TransportErrorCodes::READ_FAILED,
            TransportError::WriteFailed { .. } => TransportErrorCodes::WRITE_FAILED,
            TransportError::Disconnected => TransportErrorCodes::DISCONNECTED,
            TransportError::RetriesExhausted { .. } => TransportErrorCodes::RETRIES_EXHAUSTED,
        }
    }

    fn message(&self) -> String {
        match self {
            TransportError::OpenFailed { port, reason } => {
                format!("Could not connect to port {}: {}", port, reason)
            }
            TransportError::ReadFailed { details } => format!("Read failed: {}", details),
            TransportError::WriteFailed { details } => format!("Write failed: {}", details),
            TransportError::Disconnected => "Serial link disconnected".to_string(),
            TransportError::RetriesExhausted {
                attempts,
                last_error,
            } => format!(
                "Giving up after {} consecutive read failures (last: {})",
                attempts, last_error
            ),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransportError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            TransportError::OpenFailed {
                port: "COM4".into(),
                reason: "busy".into(),
            },
            TransportError::ReadFailed {
                details: "x".into(),
            },
            TransportError::WriteFailed {
                details: "x".into(),
            },
            TransportError::Disconnected,
            TransportError::RetriesExhausted {
                attempts: 3,
                last_error: "x".into(),
            },
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec![1001, 1002, 1003, 1004, 1005]);
    }

    #[test]
    fn test_open_failed_message_names_port() {
        let err = TransportError::OpenFailed {
            port: "/dev/ttyUSB0".into(),
            reason: "No such file or directory".into(),
        };
        assert!(err.message().contains("/dev/ttyUSB0"));
        assert!(err.to_string().contains("code 1001"));
    }
}
