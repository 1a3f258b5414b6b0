// Pipeline error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Pipeline error code constants
///
/// Error code range: 2001-2004
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// Startup configuration failed validation
    pub const INVALID_CONFIG: i32 = 2001;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 2002;

    /// A pipeline thread could not be spawned
    pub const THREAD_SPAWN: i32 = 2003;

    /// A pipeline thread panicked
    pub const THREAD_PANICKED: i32 = 2004;
}

/// Log a pipeline error with structured context
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=Pipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the pipeline itself rather than the transport
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Configuration rejected at startup
    InvalidConfig { reason: String },

    /// Lock poisoned by a panicking thread
    LockPoisoned { component: String },

    /// Thread spawn failed
    ThreadSpawn { name: String, reason: String },

    /// Thread panicked before returning
    ThreadPanicked { name: String },
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::InvalidConfig { .. } => PipelineErrorCodes::INVALID_CONFIG,
            PipelineError::LockPoisoned { .. } => PipelineErrorCodes::LOCK_POISONED,
            PipelineError::ThreadSpawn { .. } => PipelineErrorCodes::THREAD_SPAWN,
            PipelineError::ThreadPanicked { .. } => PipelineErrorCodes::THREAD_PANICKED,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::InvalidConfig { reason } => {
                format!("Invalid configuration: {}", reason)
            }
            PipelineError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            PipelineError::ThreadSpawn { name, reason } => {
                format!("Failed to spawn thread {}: {}", name, reason)
            }
            PipelineError::ThreadPanicked { name } => format!("Thread {} panicked", name),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PipelineError {}
