//! Engine module housing the real-time pipeline.
//!
//! `acquisition` reads the link into the shared buffer, `visualization`
//! renders and classifies once per frame, `dispatcher` writes command bytes,
//! and `pipeline` wires them together around a `PipelineContext`.

pub mod acquisition;
pub mod dispatcher;
pub mod pipeline;
pub mod visualization;

pub use acquisition::{parse_sample, AcquisitionLoop, AcquisitionStats, RetryBackoff};
pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use pipeline::{Pipeline, PipelineContext, PipelineHandle, PipelineReport};
pub use visualization::{VisualizationLoop, VisualizationStats};
