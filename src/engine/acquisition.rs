// AcquisitionLoop - reads sample lines from the link into the shared buffer
//
// Runs on its own thread and is the only writer of the sample buffer. Lines
// that are not plain non-negative integers are dropped. Read failures are
// retried with exponential backoff and end the loop once too many happen in
// a row. The shutdown signal is checked between reads; sources return
// `Ok(None)` on timeout so an idle link cannot block cancellation.

use std::time::Duration;

use serde::Serialize;

use crate::config::AcquisitionConfig;
use crate::error::{log_transport_error, EngineError, ErrorCode, PipelineError, TransportError};
use crate::shutdown::ShutdownSignal;
use crate::signal::{RawSample, SharedSampleBuffer};
use crate::telemetry;
use crate::transport::LineSource;

/// Parse one wire line into a sample
///
/// Accepts ASCII digits only, after trimming surrounding whitespace (which
/// also strips `\r\n`), and only values that fit `i32`.
pub fn parse_sample(line: &str) -> Option<RawSample> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<RawSample>().ok()
}

/// Exponential delay between consecutive read failures
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    max_attempts: u32,
    attempts: u32,
    current: Duration,
}

impl RetryBackoff {
    pub fn new(config: &AcquisitionConfig) -> Self {
        let initial = Duration::from_millis(config.initial_retry_delay_ms);
        Self {
            initial,
            max: Duration::from_millis(config.max_retry_delay_ms).max(initial),
            multiplier: config.backoff_multiplier.max(1.0),
            max_attempts: config.max_consecutive_failures.max(1),
            attempts: 0,
            current: initial,
        }
    }

    /// Register one failure
    ///
    /// # Returns
    /// * `Some(delay)` - Wait this long, then read again
    /// * `None` - Retry budget spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            return None;
        }
        let delay = self.current;
        self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .map_or(self.max, |next| next.min(self.max));
        Some(delay)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current = self.initial;
    }
}

/// Counters returned when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionStats {
    pub lines_read: u64,
    pub samples_accepted: u64,
    pub lines_discarded: u64,
    pub read_errors: u64,
}

pub struct AcquisitionLoop<L: LineSource> {
    source: L,
    buffer: SharedSampleBuffer,
    shutdown: ShutdownSignal,
    backoff: RetryBackoff,
    stats: AcquisitionStats,
}

impl<L: LineSource> AcquisitionLoop<L> {
    pub fn new(
        source: L,
        buffer: SharedSampleBuffer,
        shutdown: ShutdownSignal,
        config: &AcquisitionConfig,
    ) -> Self {
        Self {
            source,
            buffer,
            shutdown,
            backoff: RetryBackoff::new(config),
            stats: AcquisitionStats::default(),
        }
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    /// Handle one line
    ///
    /// # Returns
    /// The smoothed value appended, or `None` when the line was discarded
    pub fn ingest(&mut self, line: &str) -> Result<Option<f64>, PipelineError> {
        self.stats.lines_read += 1;
        match parse_sample(line) {
            Some(sample) => {
                let smoothed = self.buffer.push(sample)?;
                self.stats.samples_accepted += 1;
                telemetry::hub().record_sample_accepted();
                Ok(Some(smoothed))
            }
            None => {
                self.stats.lines_discarded += 1;
                tracing::debug!("[AcquisitionThread] Discarded line {:?}", line);
                telemetry::hub().record_line_discarded(line);
                Ok(None)
            }
        }
    }

    /// Read until shutdown, or until reads keep failing
    pub fn run(mut self) -> Result<AcquisitionStats, EngineError> {
        tracing::info!("[AcquisitionThread] Starting acquisition loop");

        while !self.shutdown.is_triggered() {
            match self.source.read_line() {
                Ok(Some(line)) => {
                    self.backoff.reset();
                    self.ingest(&line)?;
                }
                Ok(None) => {
                    // Read timeout; loop around to re-check shutdown
                }
                Err(err) => self.handle_read_error(err)?,
            }
        }

        tracing::info!(
            "[AcquisitionThread] Shutdown requested, exiting ({} samples accepted, {} discarded)",
            self.stats.samples_accepted,
            self.stats.lines_discarded
        );
        Ok(self.stats)
    }

    fn handle_read_error(&mut self, err: TransportError) -> Result<(), TransportError> {
        self.stats.read_errors += 1;
        log_transport_error(&err, "AcquisitionLoop::run");

        let delay = self.backoff.next_delay();
        let attempts = self.backoff.attempts();
        telemetry::hub().record_read_error(attempts, err.message());

        match delay {
            Some(delay) => {
                tracing::warn!(
                    "[AcquisitionThread] Read failed ({} in a row), retrying in {:?}",
                    attempts,
                    delay
                );
                self.shutdown.sleep(delay);
                Ok(())
            }
            None => Err(TransportError::RetriesExhausted {
                attempts,
                last_error: err.message(),
            }),
        }
    }
}
