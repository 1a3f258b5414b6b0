//! Pipeline telemetry collector and helpers.
//!
//! The collector multiplexes acquisition, dispatch and control events into a
//! bounded history plus a broadcast stream, and keeps running counters that
//! the CLI prints on exit.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::analysis::{MovementClass, ThresholdField};

pub mod events;

pub use events::{MetricEvent, PipelineComponent};

/// Longest prefix of a discarded line kept in an event
const DISCARDED_PREVIEW_CHARS: usize = 32;

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Running totals since process start
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PipelineCounters {
    pub samples_accepted: u64,
    pub lines_discarded: u64,
    pub read_errors: u64,
    pub commands_dispatched: u64,
    pub dispatch_failures: u64,
    pub threshold_changes: u64,
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub counters: PipelineCounters,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = match self.history.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is the normal case
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    fn recent(&self) -> Vec<MetricEvent> {
        let history = match self.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.iter().cloned().collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Top-level hub wrapping the collector plus counters and gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    samples_accepted: AtomicU64,
    lines_discarded: AtomicU64,
    read_errors: AtomicU64,
    commands_dispatched: AtomicU64,
    dispatch_failures: AtomicU64,
    threshold_changes: AtomicU64,
    last_occupancy: Mutex<Option<f32>>,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            samples_accepted: AtomicU64::new(0),
            lines_discarded: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
            commands_dispatched: AtomicU64::new(0),
            dispatch_failures: AtomicU64::new(0),
            threshold_changes: AtomicU64::new(0),
            last_occupancy: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.collector.subscribe()
    }

    pub fn counters(&self) -> PipelineCounters {
        PipelineCounters {
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            lines_discarded: self.lines_discarded.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            threshold_changes: self.threshold_changes.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.collector.recent(),
            total_events: self.collector.total_events.load(Ordering::Relaxed),
            dropped_events: self.collector.dropped_history.load(Ordering::Relaxed),
            counters: self.counters(),
        }
    }

    /// Counted only; one event per sample would drown the history
    pub fn record_sample_accepted(&self) {
        self.samples_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_line_discarded(&self, line: &str) {
        self.lines_discarded.fetch_add(1, Ordering::Relaxed);
        let preview: String = line.chars().take(DISCARDED_PREVIEW_CHARS).collect();
        self.collector
            .publish(MetricEvent::LineDiscarded { preview });
    }

    pub fn record_read_error(&self, consecutive: u32, message: impl Into<String>) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(MetricEvent::ReadError {
            consecutive,
            message: message.into(),
        });
    }

    /// Buffer fill level; only changes of 2.5 points or more are published
    pub fn record_buffer_occupancy(&self, percent: f32) {
        let normalized = percent.clamp(0.0, 100.0);
        let mut last = match self.last_occupancy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let should_emit = last
            .map(|previous| (previous - normalized).abs() >= 2.5)
            .unwrap_or(true);

        if should_emit {
            *last = Some(normalized);
            self.collector.publish(MetricEvent::BufferOccupancy {
                percent: normalized,
            });
        }
    }

    pub fn record_command(&self, class: MovementClass) {
        self.commands_dispatched.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(MetricEvent::CommandDispatched {
            class,
            command: class.command(),
        });
    }

    pub fn record_dispatch_failure(&self, class: MovementClass, message: impl Into<String>) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(MetricEvent::DispatchFailed {
            class,
            message: message.into(),
        });
    }

    pub fn record_threshold_change(&self, field: ThresholdField, value: f64) {
        self.threshold_changes.fetch_add(1, Ordering::Relaxed);
        self.collector
            .publish(MetricEvent::ThresholdChanged { field, value });
    }

    pub fn record_stopped(&self, component: PipelineComponent, error: Option<String>) {
        self.collector.publish(MetricEvent::PipelineStopped {
            component,
            error,
            timestamp_ms: now_timestamp_ms(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(MetricEvent::LineDiscarded {
            preview: "abc".to_string(),
        });
        collector.publish(MetricEvent::CommandDispatched {
            class: MovementClass::Movement1,
            command: '1',
        });
        collector.publish(MetricEvent::BufferOccupancy { percent: 50.0 });

        let recent = collector.recent();
        assert_eq!(recent.len(), 3);
        assert!(matches!(&recent[0], MetricEvent::LineDiscarded { preview } if preview == "abc"));
        assert!(matches!(recent[2], MetricEvent::BufferOccupancy { .. }));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for percent in [10.0, 20.0, 30.0] {
            collector.publish(MetricEvent::BufferOccupancy { percent });
        }

        let recent = collector.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(collector.dropped_history.load(Ordering::Relaxed), 1);
        assert!(
            matches!(recent[0], MetricEvent::BufferOccupancy { percent } if (percent - 20.0).abs() < f32::EPSILON)
        );
    }

    #[test]
    fn hub_counts_and_publishes_commands() {
        let hub = TelemetryHub::new(8, 8);
        hub.record_command(MovementClass::Rest);
        hub.record_command(MovementClass::Movement3);
        hub.record_sample_accepted();

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.counters.commands_dispatched, 2);
        assert_eq!(snapshot.counters.samples_accepted, 1);
        assert!(snapshot.recent.iter().any(|event| matches!(
            event,
            MetricEvent::CommandDispatched { command: '3', .. }
        )));
    }

    #[test]
    fn discarded_line_preview_is_truncated() {
        let hub = TelemetryHub::new(8, 8);
        let long_line = "x".repeat(200);
        hub.record_line_discarded(&long_line);

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.counters.lines_discarded, 1);
        match &snapshot.recent[0] {
            MetricEvent::LineDiscarded { preview } => {
                assert_eq!(preview.len(), DISCARDED_PREVIEW_CHARS)
            }
            other => panic!("Expected LineDiscarded, got {:?}", other),
        }
    }

    #[test]
    fn buffer_gauge_debounces_small_changes() {
        let hub = TelemetryHub::new(8, 8);
        hub.record_buffer_occupancy(10.0);
        hub.record_buffer_occupancy(10.5);
        hub.record_buffer_occupancy(25.0);

        let published = hub
            .snapshot()
            .recent
            .iter()
            .filter(|event| matches!(event, MetricEvent::BufferOccupancy { .. }))
            .count();
        assert_eq!(published, 2);
    }

    #[test]
    fn subscribers_receive_events() {
        let hub = TelemetryHub::new(8, 8);
        let mut rx = hub.subscribe();
        hub.record_threshold_change(ThresholdField::High, 315.0);

        match rx.try_recv() {
            Ok(MetricEvent::ThresholdChanged { field, value }) => {
                assert_eq!(field, ThresholdField::High);
                assert_eq!(value, 315.0);
            }
            other => panic!("Expected ThresholdChanged, got {:?}", other),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&MetricEvent::CommandDispatched {
            class: MovementClass::Movement2,
            command: '2',
        })
        .unwrap();
        assert!(json.contains("\"type\":\"command_dispatched\""));
    }
}
