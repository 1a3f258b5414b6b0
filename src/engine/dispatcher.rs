// CommandDispatcher - forwards classification transitions to the actuator
//
// Writes one command byte per transition. A write failure is handled per
// `DispatchFailurePolicy`: either it stops the pipeline right away, or it is
// logged and the caller re-sends on a later frame until too many writes in a
// row have failed.

use crate::analysis::MovementClass;
use crate::config::{DispatchConfig, DispatchFailurePolicy};
use crate::error::{log_transport_error, ErrorCode, TransportError};
use crate::telemetry;
use crate::transport::CommandSink;

/// Result of a single dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Byte written
    Sent,
    /// The actuator already holds this command
    Suppressed,
    /// Write failed; the caller should try again next frame
    FailedWillRetry,
}

pub struct CommandDispatcher<S: CommandSink> {
    sink: S,
    policy: DispatchFailurePolicy,
    max_consecutive_failures: u32,
    consecutive_failures: u32,
    /// Last command the actuator acknowledged by a successful write
    last_sent: Option<char>,
}

impl<S: CommandSink> CommandDispatcher<S> {
    pub fn new(sink: S, config: &DispatchConfig) -> Self {
        Self {
            sink,
            policy: config.failure_policy,
            max_consecutive_failures: config.max_consecutive_write_failures.max(1),
            consecutive_failures: 0,
            last_sent: None,
        }
    }

    pub fn last_sent(&self) -> Option<char> {
        self.last_sent
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Send `class`'s command byte unless the actuator already has it
    ///
    /// # Errors
    /// Returns the write error under the fatal policy, or once
    /// `max_consecutive_write_failures` writes in a row have failed.
    pub fn dispatch(&mut self, class: MovementClass) -> Result<DispatchOutcome, TransportError> {
        let command = class.command();
        if self.last_sent == Some(command) {
            return Ok(DispatchOutcome::Suppressed);
        }

        match self.sink.write_command(class.command_byte()) {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    tracing::info!(
                        "[Dispatcher] Write recovered after {} failure(s)",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                self.last_sent = Some(command);
                telemetry::hub().record_command(class);
                tracing::debug!("[Dispatcher] Sent '{}' ({})", command, class);
                Ok(DispatchOutcome::Sent)
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                telemetry::hub().record_dispatch_failure(class, err.message());
                log_transport_error(&err, "CommandDispatcher::dispatch");

                match self.policy {
                    DispatchFailurePolicy::Fatal => Err(err),
                    DispatchFailurePolicy::LogAndRetry
                        if self.consecutive_failures >= self.max_consecutive_failures =>
                    {
                        Err(TransportError::WriteFailed {
                            details: format!(
                                "{} consecutive write failures (last: {})",
                                self.consecutive_failures,
                                err.message()
                            ),
                        })
                    }
                    DispatchFailurePolicy::LogAndRetry => Ok(DispatchOutcome::FailedWillRetry),
                }
            }
        }
    }
}
