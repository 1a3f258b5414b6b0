//! Control surface: threshold controls plus the live classification label.
//!
//! The surface owns the label and runs on its own thread. Everything that
//! wants to change what it shows (classification transitions from the
//! visualization thread, console input, Ctrl-C, pipeline failures) sends a
//! `UiEvent` over the channel returned by [`ui_channel`]; the surface drains
//! it and mutates its state locally.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::analysis::{MovementClass, ThresholdEvent, ThresholdField, ThresholdSet, ThresholdStore};
use crate::config::ControlConfig;
use crate::shutdown::ShutdownSignal;
use crate::telemetry::{self, PipelineComponent};

pub mod console;

pub use console::{parse_command, spawn_console_input, ConsoleView};

/// Label shown before the first transition
pub const INITIAL_LABEL: &str = "Rest";

/// Messages processed on the control-surface thread
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// One control moved
    Threshold(ThresholdEvent),
    /// The classifier reported a transition
    Classification(MovementClass),
    /// Print thresholds and label
    ShowStatus,
    Help,
    /// Console input that could not be parsed
    Rejected { input: String, reason: String },
    /// A pipeline loop ended; `error` is set when it failed
    PipelineStopped {
        component: PipelineComponent,
        error: Option<String>,
    },
    Quit,
}

/// Sending half of the UI event queue; cheap to clone across threads
#[derive(Debug, Clone)]
pub struct UiNotifier {
    tx: UnboundedSender<UiEvent>,
}

impl UiNotifier {
    /// Queue an event without blocking
    ///
    /// # Returns
    /// `false` once the control surface has gone away
    pub fn send(&self, event: UiEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn notify_classification(&self, class: MovementClass) -> bool {
        self.send(UiEvent::Classification(class))
    }

    pub fn notify_stopped(&self, component: PipelineComponent, error: Option<String>) -> bool {
        self.send(UiEvent::PipelineStopped { component, error })
    }
}

/// Receiving half, owned by the control surface
pub struct UiEventReceiver {
    rx: UnboundedReceiver<UiEvent>,
}

impl UiEventReceiver {
    /// Next queued event, if any, without blocking
    pub fn try_recv(&mut self) -> Option<UiEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create the control surface's event queue
pub fn ui_channel() -> (UiNotifier, UiEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiNotifier { tx }, UiEventReceiver { rx })
}

/// Presentation side of the control surface (widgets, console, ...)
pub trait ControlView: Send {
    fn show_label(&mut self, label: &str);
    fn show_thresholds(&mut self, thresholds: &ThresholdSet);
    fn show_message(&mut self, message: &str);
}

impl<T: ControlView + ?Sized> ControlView for Box<T> {
    fn show_label(&mut self, label: &str) {
        (**self).show_label(label)
    }

    fn show_thresholds(&mut self, thresholds: &ThresholdSet) {
        (**self).show_thresholds(thresholds)
    }

    fn show_message(&mut self, message: &str) {
        (**self).show_message(message)
    }
}

/// Headless view: state changes go to the log only
#[derive(Debug, Default)]
pub struct LogView;

impl ControlView for LogView {
    fn show_label(&mut self, label: &str) {
        tracing::info!("[ControlSurface] Classification: {}", label);
    }

    fn show_thresholds(&mut self, thresholds: &ThresholdSet) {
        tracing::info!(
            "[ControlSurface] Thresholds: low {} mid {} high {}",
            thresholds.low,
            thresholds.mid,
            thresholds.high
        );
    }

    fn show_message(&mut self, message: &str) {
        tracing::info!("[ControlSurface] {}", message);
    }
}

/// How the control surface's event loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum ControlExit {
    /// Operator asked to quit
    Quit,
    /// A pipeline loop failed
    PipelineFailed {
        component: PipelineComponent,
        error: String,
    },
    /// Every sender was dropped
    Disconnected,
}

pub struct ControlSurface<V: ControlView> {
    store: ThresholdStore,
    slider_min: f64,
    slider_max: f64,
    label: String,
    view: V,
    events: UiEventReceiver,
    shutdown: ShutdownSignal,
}

impl<V: ControlView> ControlSurface<V> {
    pub fn new(
        store: ThresholdStore,
        config: &ControlConfig,
        view: V,
        events: UiEventReceiver,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            store,
            slider_min: config.slider_min,
            slider_max: config.slider_max,
            label: INITIAL_LABEL.to_string(),
            view,
            events,
            shutdown,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn thresholds(&self) -> ThresholdSet {
        self.store.get()
    }

    /// Move one control; the value is clamped to the control's range
    ///
    /// # Returns
    /// The value actually written
    pub fn set_threshold(&mut self, field: ThresholdField, value: f64) -> f64 {
        let clamped = value.clamp(self.slider_min, self.slider_max);
        if clamped != value {
            self.view.show_message(&format!(
                "{} clamped to {} (range {}..={})",
                field, clamped, self.slider_min, self.slider_max
            ));
        }

        let thresholds = self.store.apply(ThresholdEvent::new(field, clamped));
        telemetry::hub().record_threshold_change(field, clamped);
        tracing::info!("[ControlSurface] {} threshold set to {}", field, clamped);
        if !thresholds.is_ordered() {
            tracing::warn!(
                "[ControlSurface] Thresholds out of order (low {}, mid {}, high {})",
                thresholds.low,
                thresholds.mid,
                thresholds.high
            );
        }
        self.view.show_thresholds(&thresholds);
        clamped
    }

    /// Process one event
    ///
    /// # Returns
    /// `Some(exit)` when the event ends the event loop
    pub fn handle(&mut self, event: UiEvent) -> Option<ControlExit> {
        match event {
            UiEvent::Threshold(ThresholdEvent { field, value }) => {
                self.set_threshold(field, value);
                None
            }
            UiEvent::Classification(class) => {
                self.label = class.label().to_string();
                self.view.show_label(&self.label);
                None
            }
            UiEvent::ShowStatus => {
                self.view.show_thresholds(&self.store.get());
                self.view.show_label(&self.label);
                None
            }
            UiEvent::Help => {
                self.view.show_message(console::HELP_TEXT);
                None
            }
            UiEvent::Rejected { input, reason } => {
                self.view
                    .show_message(&format!("Ignored '{}': {}", input, reason));
                None
            }
            UiEvent::PipelineStopped { component, error } => match error {
                Some(error) => {
                    self.view
                        .show_message(&format!("{:?} stopped: {}", component, error));
                    self.shutdown.trigger();
                    Some(ControlExit::PipelineFailed { component, error })
                }
                None if self.shutdown.is_triggered() => Some(ControlExit::Quit),
                None => {
                    tracing::debug!("[ControlSurface] {:?} stopped cleanly", component);
                    None
                }
            },
            UiEvent::Quit => {
                self.shutdown.trigger();
                Some(ControlExit::Quit)
            }
        }
    }

    /// Handle every queued event without blocking
    pub fn drain_pending(&mut self) -> Option<ControlExit> {
        loop {
            match self.events.rx.try_recv() {
                Ok(event) => {
                    if let Some(exit) = self.handle(event) {
                        return Some(exit);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(ControlExit::Disconnected),
            }
        }
    }

    /// Event loop; blocks on the queue until quit, failure or disconnect
    ///
    /// Must not be called from inside an async runtime.
    pub fn run(mut self) -> ControlExit {
        self.view.show_thresholds(&self.store.get());
        self.view.show_label(&self.label);

        let exit = loop {
            match self.events.rx.blocking_recv() {
                Some(event) => {
                    if let Some(exit) = self.handle(event) {
                        break exit;
                    }
                }
                None => break ControlExit::Disconnected,
            }
        };

        let error = match &exit {
            ControlExit::PipelineFailed { error, .. } => Some(error.clone()),
            _ => None,
        };
        telemetry::hub().record_stopped(PipelineComponent::ControlSurface, error);
        tracing::info!("[ControlSurface] Event loop finished: {:?}", exit);
        exit
    }
}
