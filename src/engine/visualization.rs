// VisualizationLoop - periodic render + classification driver
//
// Once per frame: copy the buffer, hand a Frame to the renderer, classify
// the latest smoothed value against the current thresholds, and forward a
// transition to the actuator and to the control-surface label. This is the
// only place the classifier and the dispatcher are invoked.

use std::time::{Duration, Instant};

use serde::Serialize;

use super::dispatcher::{CommandDispatcher, DispatchOutcome};
use super::pipeline::PipelineContext;
use crate::analysis::{Classifier, MovementClass, ThresholdStore};
use crate::control::UiNotifier;
use crate::error::EngineError;
use crate::render::{Frame, Renderer, ViewBounds};
use crate::shutdown::ShutdownSignal;
use crate::signal::SharedSampleBuffer;
use crate::telemetry;
use crate::transport::CommandSink;

/// Counters returned when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VisualizationStats {
    pub frames_rendered: u64,
    pub transitions: u64,
    pub commands_sent: u64,
}

pub struct VisualizationLoop<S: CommandSink, R: Renderer> {
    buffer: SharedSampleBuffer,
    thresholds: ThresholdStore,
    classifier: Classifier,
    dispatcher: CommandDispatcher<S>,
    renderer: R,
    notifier: UiNotifier,
    shutdown: ShutdownSignal,
    bounds: ViewBounds,
    capacity: usize,
    frame_interval: Duration,
    frame_index: u64,
    stats: VisualizationStats,
}

impl<S: CommandSink, R: Renderer> VisualizationLoop<S, R> {
    pub fn new(context: &PipelineContext, sink: S, renderer: R) -> Self {
        let config = &context.config;
        Self {
            buffer: context.buffer.clone(),
            thresholds: context.thresholds.clone(),
            classifier: Classifier::new(),
            dispatcher: CommandDispatcher::new(sink, &config.dispatch),
            renderer,
            notifier: context.notifier.clone(),
            shutdown: context.shutdown.clone(),
            bounds: ViewBounds::from_config(config),
            capacity: config.signal.display_window.max(1),
            frame_interval: config.visualization.frame_interval(),
            frame_index: 0,
            stats: VisualizationStats::default(),
        }
    }

    pub fn stats(&self) -> VisualizationStats {
        self.stats
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S> {
        &self.dispatcher
    }

    /// Run one frame
    ///
    /// # Returns
    /// * `Ok(Some(class))` - The classification changed to `class`
    /// * `Ok(None)` - Empty buffer, no change, or a write to be retried
    pub fn tick(&mut self) -> Result<Option<MovementClass>, EngineError> {
        let snapshot = self.buffer.snapshot()?;
        let latest = match snapshot.latest_smoothed() {
            Some(value) => value,
            None => return Ok(None),
        };
        let thresholds = self.thresholds.get();

        telemetry::hub()
            .record_buffer_occupancy(snapshot.raw.len() as f32 / self.capacity as f32 * 100.0);

        let frame = Frame::new(self.frame_index, snapshot, thresholds, self.bounds);
        self.renderer.render(&frame);
        self.frame_index += 1;
        self.stats.frames_rendered += 1;

        let class = match self.classifier.update(latest, &thresholds) {
            Some(class) => class,
            None => return Ok(None),
        };
        self.stats.transitions += 1;

        match self.dispatcher.dispatch(class)? {
            DispatchOutcome::Sent => self.stats.commands_sent += 1,
            DispatchOutcome::Suppressed => {}
            DispatchOutcome::FailedWillRetry => {
                self.classifier.reset();
                return Ok(None);
            }
        }

        if !self.notifier.notify_classification(class) {
            tracing::debug!("[VisualizationThread] Control surface gone, label not updated");
        }
        Ok(Some(class))
    }

    /// Tick at the configured frame interval until shutdown
    pub fn run(mut self) -> Result<VisualizationStats, EngineError> {
        tracing::info!(
            "[VisualizationThread] Starting visualization loop ({:?} per frame)",
            self.frame_interval
        );

        let mut next_frame = Instant::now();
        while !self.shutdown.is_triggered() {
            self.tick()?;

            next_frame = match next_frame.checked_add(self.frame_interval) {
                Some(deadline) => deadline,
                None => {
                    if self.shutdown.sleep(self.frame_interval) {
                        break;
                    }
                    continue;
                }
            };
            let now = Instant::now();
            if next_frame < now {
                // Fell behind; restart the cadence instead of bursting
                next_frame = now;
                continue;
            }
            if self.shutdown.sleep(next_frame - now) {
                break;
            }
        }

        // Samples pushed since the last frame still get classified
        self.tick()?;

        tracing::info!(
            "[VisualizationThread] Shutdown requested, exiting ({} frames, {} commands)",
            self.stats.frames_rendered,
            self.stats.commands_sent
        );
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, DispatchFailurePolicy};
    use crate::control::{ui_channel, UiEvent, UiEventReceiver};
    use crate::error::TransportError;
    use crate::render::NullRenderer;
    use crate::transport::RecordingSink;

    fn context(config: AppConfig) -> (PipelineContext, UiEventReceiver) {
        let (notifier, events) = ui_channel();
        (PipelineContext::new(config, notifier).unwrap(), events)
    }

    #[test]
    fn test_empty_buffer_renders_nothing() {
        let (ctx, _events) = context(AppConfig::default());
        let sink = RecordingSink::new();
        let mut vis = VisualizationLoop::new(&ctx, sink.clone(), NullRenderer::new());

        assert_eq!(vis.tick().unwrap(), None);
        assert_eq!(vis.renderer().frames(), 0);
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_tick_dispatches_transitions_once() {
        let mut config = AppConfig::default();
        config.signal.averaging_window = 1;
        let (ctx, _events) = context(config);
        let sink = RecordingSink::new();
        let mut vis = VisualizationLoop::new(&ctx, sink.clone(), NullRenderer::new());

        ctx.buffer.push(309).unwrap();
        assert_eq!(vis.tick().unwrap(), Some(MovementClass::Movement1));
        assert_eq!(vis.tick().unwrap(), None);
        ctx.buffer.push(309).unwrap();
        assert_eq!(vis.tick().unwrap(), None);

        assert_eq!(sink.commands(), vec!['1']);
        assert_eq!(vis.renderer().frames(), 3);
        assert_eq!(vis.stats().transitions, 1);
    }

    #[test]
    fn test_transition_updates_label_through_queue() {
        let mut config = AppConfig::default();
        config.signal.averaging_window = 1;
        let (ctx, mut events) = context(config);
        let mut vis = VisualizationLoop::new(&ctx, RecordingSink::new(), NullRenderer::new());

        ctx.buffer.push(315).unwrap();
        vis.tick().unwrap();

        assert_eq!(
            events.try_recv(),
            Some(UiEvent::Classification(MovementClass::Movement3))
        );
    }

    #[test]
    fn test_failed_write_is_resent_next_frame() {
        let mut config = AppConfig::default();
        config.signal.averaging_window = 1;
        config.dispatch.failure_policy = DispatchFailurePolicy::LogAndRetry;
        let (ctx, _events) = context(config);
        let sink = RecordingSink::new();
        let mut vis = VisualizationLoop::new(&ctx, sink.clone(), NullRenderer::new());

        ctx.buffer.push(311).unwrap();
        sink.fail_next(1);
        assert_eq!(vis.tick().unwrap(), None);
        assert!(sink.commands().is_empty());

        assert_eq!(vis.tick().unwrap(), Some(MovementClass::Movement2));
        assert_eq!(sink.commands(), vec!['2']);
    }

    #[test]
    fn test_fatal_write_failure_stops_tick() {
        let mut config = AppConfig::default();
        config.dispatch.failure_policy = DispatchFailurePolicy::Fatal;
        let (ctx, _events) = context(config);
        let sink = RecordingSink::new();
        let mut vis = VisualizationLoop::new(&ctx, sink.clone(), NullRenderer::new());

        ctx.buffer.push(300).unwrap();
        sink.fail_next(1);
        let err = vis.tick().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Transport(TransportError::WriteFailed { .. })
        ));
    }

    #[test]
    fn test_run_exits_on_shutdown() {
        let mut config = AppConfig::default();
        config.visualization.frame_interval_ms = 5;
        let (ctx, _events) = context(config);
        ctx.buffer.push(305).unwrap();
        let vis = VisualizationLoop::new(&ctx, RecordingSink::new(), NullRenderer::new());

        let shutdown = ctx.shutdown.clone();
        let handle = std::thread::spawn(move || vis.run());
        std::thread::sleep(Duration::from_millis(40));
        shutdown.trigger();

        let stats = handle.join().unwrap().unwrap();
        assert!(stats.frames_rendered >= 1);
        assert_eq!(stats.commands_sent, 1);
    }

    #[test]
    fn test_run_classifies_samples_pushed_before_shutdown() {
        let mut config = AppConfig::default();
        config.signal.averaging_window = 1;
        config.visualization.frame_interval_ms = 10_000;
        let (ctx, _events) = context(config);
        let sink = RecordingSink::new();
        let vis = VisualizationLoop::new(&ctx, sink.clone(), NullRenderer::new());

        let handle = std::thread::spawn(move || vis.run());
        std::thread::sleep(Duration::from_millis(30));
        ctx.buffer.push(313).unwrap();
        ctx.shutdown.trigger();

        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.commands_sent, 1);
        assert_eq!(sink.commands(), vec!['3']);
    }
}
