//! Core telemetry event types describing pipeline activity exposed to the
//! CLI summary and broadcast subscribers.

use serde::{Deserialize, Serialize};

use crate::analysis::{MovementClass, ThresholdField};

/// Pipeline components that can stop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineComponent {
    Acquisition,
    Visualization,
    ControlSurface,
}

/// Metric events covering acquisition, dispatch and control activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    LineDiscarded {
        preview: String,
    },
    ReadError {
        consecutive: u32,
        message: String,
    },
    BufferOccupancy {
        percent: f32,
    },
    CommandDispatched {
        class: MovementClass,
        command: char,
    },
    DispatchFailed {
        class: MovementClass,
        message: String,
    },
    ThresholdChanged {
        field: ThresholdField,
        value: f64,
    },
    PipelineStopped {
        component: PipelineComponent,
        error: Option<String>,
        timestamp_ms: u64,
    },
}
