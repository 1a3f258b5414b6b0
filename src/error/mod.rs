// Error types for the EMG controller
//
// This module defines custom error types for transport and pipeline operations,
// providing structured error handling with numeric error codes for reporting.

mod pipeline;
mod transport;

pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};
pub use transport::{log_transport_error, TransportError, TransportErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent reporting from the CLI
/// and the telemetry hub.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Why a pipeline loop stopped: either the link or the pipeline itself
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Transport(TransportError),
    Pipeline(PipelineError),
}

impl ErrorCode for EngineError {
    fn code(&self) -> i32 {
        match self {
            EngineError::Transport(err) => err.code(),
            EngineError::Pipeline(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            EngineError::Transport(err) => err.message(),
            EngineError::Pipeline(err) => err.message(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Transport(err) => err.fmt(f),
            EngineError::Pipeline(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<TransportError> for EngineError {
    fn from(err: TransportError) -> Self {
        EngineError::Transport(err)
    }
}

impl From<PipelineError> for EngineError {
    fn from(err: PipelineError) -> Self {
        EngineError::Pipeline(err)
    }
}
