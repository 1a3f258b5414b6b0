// EMG Controller Core - serial EMG acquisition and movement classification
// Real-time pipeline: acquisition thread -> shared buffer -> visualization /
// classification thread -> actuator link, with live-tunable thresholds

// Module declarations
pub mod analysis;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod render;
pub mod shutdown;
pub mod signal;
pub mod telemetry;
pub mod transport;

pub use analysis::{classify, Classifier, MovementClass, ThresholdSet, ThresholdStore};
pub use config::AppConfig;
pub use engine::{Pipeline, PipelineContext, PipelineHandle, PipelineReport};
pub use error::{EngineError, ErrorCode, PipelineError, TransportError};

/// Install the stderr `tracing` subscriber
///
/// Records emitted through the `log` facade are forwarded too. Calling this
/// more than once keeps the first subscriber.
pub fn init_logging(level: tracing::Level) {
    let result = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
