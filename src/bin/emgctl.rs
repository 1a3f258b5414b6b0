use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use emg_controller::config::AppConfig;
use emg_controller::control::{
    spawn_console_input, ui_channel, ConsoleView, ControlExit, ControlSurface, ControlView,
    LogView, UiEvent, UiNotifier,
};
use emg_controller::engine::{Pipeline, PipelineContext, PipelineReport};
use emg_controller::error::{log_transport_error, ErrorCode};
use emg_controller::render::{NullRenderer, Renderer, TerminalRenderer};
use emg_controller::shutdown::ShutdownSignal;
use emg_controller::telemetry::{self, TelemetrySnapshot};
use emg_controller::transport::{
    list_ports, open_serial, CommandSink, LineSource, RecordingSink, ScriptedLineSource,
    SyntheticConfig, SyntheticLineSource,
};

/// Delay between replayed lines, roughly the sensor's output rate
const REPLAY_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Parser, Debug)]
#[command(
    name = "emgctl",
    about = "EMG acquisition, threshold classification and actuator control"
)]
struct Cli {
    /// Log at DEBUG level
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline against the serial link, a simulation or a replay
    Run(RunArgs),
    /// List serial ports available on this machine
    Ports {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as JSON
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// JSON configuration file; missing keys take defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serial port name (e.g. COM4, /dev/ttyUSB0)
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    baud: Option<u32>,
    /// Display window W, in samples
    #[arg(long)]
    window: Option<usize>,
    /// Averaging window K, in samples
    #[arg(long)]
    average: Option<usize>,
    #[arg(long)]
    low: Option<f64>,
    #[arg(long)]
    mid: Option<f64>,
    #[arg(long)]
    high: Option<f64>,
    /// Visualization frame interval in milliseconds
    #[arg(long)]
    frame_ms: Option<u64>,
}

impl ConfigArgs {
    /// File (or defaults), then command-line overrides
    fn resolve(&self) -> AppConfig {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from_file(path),
            None => AppConfig::default(),
        };

        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(window) = self.window {
            config.signal.display_window = window;
        }
        if let Some(average) = self.average {
            config.signal.averaging_window = average;
        }
        if let Some(low) = self.low {
            config.thresholds.low = low;
        }
        if let Some(mid) = self.mid {
            config.thresholds.mid = mid;
        }
        if let Some(high) = self.high {
            config.thresholds.high = high;
        }
        if let Some(frame_ms) = self.frame_ms {
            config.visualization.frame_interval_ms = frame_ms;
        }
        config
    }
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Use the synthetic EMG generator instead of the serial link
    #[arg(long, conflicts_with = "replay")]
    simulate: bool,
    /// Seed for the synthetic generator
    #[arg(long, requires = "simulate")]
    seed: Option<u64>,
    /// Replay samples from a capture file (one value per line), then stop
    #[arg(long)]
    replay: Option<PathBuf>,
    /// No terminal plot and no console commands
    #[arg(long)]
    headless: bool,
    /// Stop automatically after this many milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,
    /// Print the run report and telemetry snapshot as JSON on exit
    #[arg(long)]
    telemetry_json: bool,
}

#[derive(Serialize)]
struct RunSummary {
    report: Option<PipelineReport>,
    error: Option<String>,
    commands: Option<String>,
    telemetry: TelemetrySnapshot,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    emg_controller::init_logging(level);

    match cli.command {
        Commands::Run(args) => run_pipeline(args),
        Commands::Ports { json } => run_ports(json),
        Commands::Config(args) => run_config(&args),
    }
}

fn run_config(args: &ConfigArgs) -> Result<ExitCode> {
    let config = args.resolve();
    config
        .validate()
        .with_context(|| "configuration rejected")?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(ExitCode::SUCCESS)
}

fn run_ports(json: bool) -> Result<ExitCode> {
    let ports = match list_ports() {
        Ok(ports) => ports,
        Err(err) => {
            eprintln!("{}", err.message());
            return Ok(ExitCode::from(1));
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else if ports.is_empty() {
        println!("No serial ports found");
    } else {
        for port in ports {
            println!("{:<24} {}", port.name, port.kind);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_pipeline(args: RunArgs) -> Result<ExitCode> {
    let config = args.config.resolve();
    let (notifier, events) = ui_channel();
    let context = PipelineContext::new(config, notifier.clone())
        .with_context(|| "configuration rejected")?;

    // Link first: a port that cannot be opened ends the run before any
    // thread exists
    let recording = RecordingSink::new();
    let (source, sink): (Box<dyn LineSource>, Box<dyn CommandSink>) = if args.simulate {
        let synthetic = SyntheticLineSource::new(SyntheticConfig {
            seed: args.seed,
            ..SyntheticConfig::default()
        });
        (Box::new(synthetic), Box::new(recording.clone()))
    } else if let Some(path) = &args.replay {
        let replay = ScriptedLineSource::from_file(path)
            .with_context(|| format!("reading replay file {:?}", path))?
            .with_interval(REPLAY_INTERVAL)
            .shutdown_when_exhausted(context.shutdown.clone());
        (Box::new(replay), Box::new(recording.clone()))
    } else {
        match open_serial(&context.config.serial) {
            Ok((reader, writer)) => (Box::new(reader), Box::new(writer)),
            Err(err) => {
                log_transport_error(&err, "emgctl run");
                eprintln!("{}", err.message());
                return Ok(ExitCode::from(1));
            }
        }
    };
    let uses_recording = args.simulate || args.replay.is_some();

    let renderer: Box<dyn Renderer> = if args.headless {
        Box::new(NullRenderer::new())
    } else {
        Box::new(TerminalRenderer::new(
            context.config.visualization.status_every_n_frames,
        ))
    };
    let view: Box<dyn ControlView> = if args.headless {
        Box::new(LogView)
    } else {
        Box::new(ConsoleView::new())
    };

    let surface = ControlSurface::new(
        context.thresholds.clone(),
        &context.config.control,
        view,
        events,
        context.shutdown.clone(),
    );

    let handle = Pipeline::start(&context, source, sink, renderer)?;

    spawn_ctrl_c_forwarder(notifier.clone());
    if !args.headless {
        spawn_console_input(notifier.clone()).with_context(|| "starting console input")?;
    }
    if let Some(duration_ms) = args.duration_ms {
        spawn_deadline(
            Duration::from_millis(duration_ms),
            context.shutdown.clone(),
            notifier.clone(),
        );
    }

    let exit = surface.run();
    let report = handle.shutdown();

    if args.telemetry_json {
        let summary = RunSummary {
            report: report.as_ref().ok().copied(),
            error: report.as_ref().err().map(|err| err.message()),
            commands: uses_recording.then(|| recording.commands().into_iter().collect()),
            telemetry: telemetry::hub().snapshot(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    match (exit, report) {
        (_, Err(err)) => {
            eprintln!("Pipeline stopped: {}", err);
            Ok(ExitCode::from(1))
        }
        (ControlExit::PipelineFailed { component, error }, Ok(_)) => {
            eprintln!("{:?} stopped: {}", component, error);
            Ok(ExitCode::from(1))
        }
        (_, Ok(report)) => {
            tracing::info!(
                "[emgctl] {} samples, {} frames, {} commands",
                report.acquisition.samples_accepted,
                report.visualization.frames_rendered,
                report.visualization.commands_sent
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Forward Ctrl-C to the control surface as a quit request
fn spawn_ctrl_c_forwarder(notifier: UiNotifier) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::warn!("[emgctl] Ctrl-C handling unavailable: {}", err);
                    return;
                }
            };

            runtime.block_on(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("[emgctl] Ctrl-C received, stopping");
                        notifier.send(UiEvent::Quit);
                    }
                    Err(err) => tracing::warn!("[emgctl] Ctrl-C handling unavailable: {}", err),
                }
            });
        });

    if let Err(err) = spawned {
        tracing::warn!("[emgctl] Could not start Ctrl-C thread: {}", err);
    }
}

/// Send a quit request once `duration` has passed
fn spawn_deadline(duration: Duration, shutdown: ShutdownSignal, notifier: UiNotifier) {
    let spawned = thread::Builder::new()
        .name("deadline".to_string())
        .spawn(move || {
            if !shutdown.sleep(duration) {
                tracing::info!("[emgctl] Run duration elapsed, stopping");
                notifier.send(UiEvent::Quit);
            }
        });

    if let Err(err) = spawned {
        tracing::warn!("[emgctl] Could not start deadline thread: {}", err);
    }
}
