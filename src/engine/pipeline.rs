//! Pipeline: shared context plus the acquisition and visualization threads.
//!
//! `PipelineContext` replaces process-wide globals: it bundles the config,
//! the threshold store, the shared sample buffer, the shutdown signal and
//! the control-surface notifier, and is cloned into every loop.
//!
//! When either loop returns or panics, its supervisor triggers shutdown so
//! the other loop follows, records the stop in telemetry and tells the
//! control surface through `UiEvent::PipelineStopped`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;

use super::acquisition::{AcquisitionLoop, AcquisitionStats};
use super::visualization::{VisualizationLoop, VisualizationStats};
use crate::analysis::{ThresholdSet, ThresholdStore};
use crate::config::AppConfig;
use crate::control::UiNotifier;
use crate::error::{
    log_pipeline_error, log_transport_error, EngineError, ErrorCode, PipelineError,
};
use crate::render::Renderer;
use crate::shutdown::ShutdownSignal;
use crate::signal::SharedSampleBuffer;
use crate::telemetry::{self, PipelineComponent};
use crate::transport::{CommandSink, LineSource};

/// State shared by every pipeline thread
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub config: Arc<AppConfig>,
    pub thresholds: ThresholdStore,
    pub buffer: SharedSampleBuffer,
    pub shutdown: ShutdownSignal,
    pub notifier: UiNotifier,
}

impl PipelineContext {
    /// Validate `config` and build the shared state from it
    pub fn new(config: AppConfig, notifier: UiNotifier) -> Result<Self, PipelineError> {
        config.validate()?;
        let thresholds = ThresholdStore::new(ThresholdSet::from(&config.thresholds));
        let buffer = SharedSampleBuffer::new(
            config.signal.display_window,
            config.signal.averaging_window,
        );
        Ok(Self {
            config: Arc::new(config),
            thresholds,
            buffer,
            shutdown: ShutdownSignal::new(),
            notifier,
        })
    }
}

/// Final counters of both loops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub acquisition: AcquisitionStats,
    pub visualization: VisualizationStats,
}

pub struct Pipeline;

impl Pipeline {
    /// Spawn the acquisition and visualization threads
    ///
    /// The link must already be open: a transport that cannot be opened is
    /// reported by the caller before anything is spawned.
    pub fn start<L, S, R>(
        context: &PipelineContext,
        source: L,
        sink: S,
        renderer: R,
    ) -> Result<PipelineHandle, PipelineError>
    where
        L: LineSource + 'static,
        S: CommandSink + 'static,
        R: Renderer + 'static,
    {
        let acquisition_loop = AcquisitionLoop::new(
            source,
            context.buffer.clone(),
            context.shutdown.clone(),
            &context.config.acquisition,
        );
        let supervisor = Supervisor::new(context, PipelineComponent::Acquisition, "acquisition");
        let acquisition = spawn_loop("acquisition", move || {
            supervisor.supervise(move || acquisition_loop.run())
        })?;

        let visualization_loop = VisualizationLoop::new(context, sink, renderer);
        let supervisor =
            Supervisor::new(context, PipelineComponent::Visualization, "visualization");
        let visualization = match spawn_loop("visualization", move || {
            supervisor.supervise(move || visualization_loop.run())
        }) {
            Ok(handle) => handle,
            Err(err) => {
                context.shutdown.trigger();
                let _ = join_thread(acquisition, "acquisition");
                return Err(err);
            }
        };

        tracing::info!("[Pipeline] Acquisition and visualization threads started");
        Ok(PipelineHandle {
            acquisition,
            visualization,
            shutdown: context.shutdown.clone(),
        })
    }
}

/// Joinable handles of a running pipeline
pub struct PipelineHandle {
    acquisition: JoinHandle<Result<AcquisitionStats, EngineError>>,
    visualization: JoinHandle<Result<VisualizationStats, EngineError>>,
    shutdown: ShutdownSignal,
}

impl PipelineHandle {
    /// Request shutdown and wait for both threads
    pub fn shutdown(self) -> Result<PipelineReport, EngineError> {
        self.shutdown.trigger();
        self.join()
    }

    /// Wait for both threads; the first loop error wins
    pub fn join(self) -> Result<PipelineReport, EngineError> {
        let acquisition = join_thread(self.acquisition, "acquisition");
        let visualization = join_thread(self.visualization, "visualization");
        Ok(PipelineReport {
            acquisition: acquisition?,
            visualization: visualization?,
        })
    }
}

fn spawn_loop<T, F>(name: &str, body: F) -> Result<JoinHandle<T>, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|err| PipelineError::ThreadSpawn {
            name: name.to_string(),
            reason: err.to_string(),
        })
}

fn join_thread<T>(
    handle: JoinHandle<Result<T, EngineError>>,
    name: &str,
) -> Result<T, EngineError> {
    handle.join().unwrap_or_else(|_| {
        tracing::error!("[Pipeline] {} thread panicked", name);
        Err(PipelineError::ThreadPanicked {
            name: name.to_string(),
        }
        .into())
    })
}

/// Reports a loop's exit to the rest of the pipeline
struct Supervisor {
    component: PipelineComponent,
    thread_name: &'static str,
    shutdown: ShutdownSignal,
    notifier: UiNotifier,
}

impl Supervisor {
    fn new(
        context: &PipelineContext,
        component: PipelineComponent,
        thread_name: &'static str,
    ) -> Self {
        Self {
            component,
            thread_name,
            shutdown: context.shutdown.clone(),
            notifier: context.notifier.clone(),
        }
    }

    /// Run a loop body; a panic is reported like any other loop error
    fn supervise<T, F>(self, body: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Result<T, EngineError>,
    {
        let result = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
            Err(PipelineError::ThreadPanicked {
                name: self.thread_name.to_string(),
            }
            .into())
        });
        self.finish(result)
    }

    fn finish<T>(self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        let error = match &result {
            Ok(_) => None,
            Err(err) => {
                match err {
                    EngineError::Pipeline(err) => log_pipeline_error(err, self.thread_name),
                    EngineError::Transport(err) => log_transport_error(err, self.thread_name),
                }
                Some(err.message())
            }
        };

        telemetry::hub().record_stopped(self.component, error.clone());
        // Notify first so the failure reaches the control surface before
        // the other loop's clean stop does
        self.notifier.notify_stopped(self.component, error);
        self.shutdown.trigger();
        result
    }
}
