//! Configuration management for the EMG pipeline
//!
//! Startup configuration is loaded from a JSON file when one is given,
//! falling back to defaults, and then overridden from the command line.
//! Everything here is fixed once the pipeline starts; only the thresholds
//! are mutated afterwards, through the control surface.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::PipelineError;

/// Upper bound for `acquisition.backoff_multiplier`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 16.0;
/// Upper bound for every millisecond interval in the configuration
pub const MAX_INTERVAL_MS: u64 = 60_000;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub signal: SignalConfig,
    pub thresholds: ThresholdConfig,
    pub control: ControlConfig,
    pub visualization: VisualizationConfig,
    pub acquisition: AcquisitionConfig,
    pub dispatch: DispatchConfig,
}

/// Serial link parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port identifier (e.g. `COM4`, `/dev/ttyUSB0`)
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout; bounds how long the acquisition loop waits before
    /// re-checking the shutdown signal
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 9600,
            read_timeout_ms: 100,
        }
    }
}

fn default_port() -> &'static str {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            "COM4"
        } else if #[cfg(target_os = "macos")] {
            "/dev/tty.usbmodem1101"
        } else {
            "/dev/ttyUSB0"
        }
    }
}

/// Buffer and smoothing sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Samples retained for plotting (W)
    pub display_window: usize,
    /// Moving-average window (K)
    pub averaging_window: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            display_window: 200,
            averaging_window: 20,
        }
    }
}

/// Initial classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            low: 308.0,
            mid: 310.0,
            high: 312.0,
        }
    }
}

/// Control surface bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub slider_min: f64,
    pub slider_max: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            slider_min: 0.0,
            slider_max: 325.0,
        }
    }
}

/// Rendering cadence and view bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Pause between frames (~20 Hz at 50 ms)
    pub frame_interval_ms: u64,
    pub y_min: f64,
    pub y_max: f64,
    /// Terminal renderer prints a status line every N frames
    pub status_every_n_frames: u64,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 50,
            y_min: 300.0,
            y_max: 320.0,
            status_every_n_frames: 10,
        }
    }
}

impl VisualizationConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Read-failure retry policy for the acquisition loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub max_consecutive_failures: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 10,
            initial_retry_delay_ms: 10,
            max_retry_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

/// What to do when a command byte cannot be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailurePolicy {
    /// Stop the pipeline on the first write failure
    Fatal,
    /// Log, then re-send on the next frame
    LogAndRetry,
}

/// Command dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub failure_policy: DispatchFailurePolicy,
    /// Escalate to fatal after this many consecutive write failures
    pub max_consecutive_write_failures: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_policy: DispatchFailurePolicy::LogAndRetry,
            max_consecutive_write_failures: 20,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// Missing keys take their default values. A missing or unparsable file
    /// is logged and replaced by the default configuration.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |reason: String| Err(PipelineError::InvalidConfig { reason });

        if self.signal.display_window == 0 {
            return invalid("signal.display_window must be greater than 0".into());
        }
        if self.signal.averaging_window == 0 {
            return invalid("signal.averaging_window must be greater than 0".into());
        }
        if self.signal.averaging_window > self.signal.display_window {
            return invalid(format!(
                "signal.averaging_window ({}) must not exceed signal.display_window ({})",
                self.signal.averaging_window, self.signal.display_window
            ));
        }
        if !(1..=MAX_INTERVAL_MS).contains(&self.visualization.frame_interval_ms) {
            return invalid(format!(
                "visualization.frame_interval_ms must be between 1 and {}",
                MAX_INTERVAL_MS
            ));
        }
        if self.visualization.y_min >= self.visualization.y_max {
            return invalid("visualization.y_min must be below visualization.y_max".into());
        }
        if self.control.slider_min >= self.control.slider_max {
            return invalid("control.slider_min must be below control.slider_max".into());
        }
        if self.acquisition.max_consecutive_failures == 0 {
            return invalid("acquisition.max_consecutive_failures must be greater than 0".into());
        }
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.acquisition.backoff_multiplier) {
            return invalid(format!(
                "acquisition.backoff_multiplier must be between 1.0 and {}",
                MAX_BACKOFF_MULTIPLIER
            ));
        }
        if self.acquisition.initial_retry_delay_ms > MAX_INTERVAL_MS
            || self.acquisition.max_retry_delay_ms > MAX_INTERVAL_MS
        {
            return invalid(format!(
                "acquisition retry delays must not exceed {} ms",
                MAX_INTERVAL_MS
            ));
        }
        if self.serial.baud_rate == 0 {
            return invalid("serial.baud_rate must be greater than 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.signal.display_window, 200);
        assert_eq!(config.signal.averaging_window, 20);
        assert_eq!(config.thresholds.low, 308.0);
        assert_eq!(config.thresholds.mid, 310.0);
        assert_eq!(config.thresholds.high, 312.0);
        assert_eq!(config.control.slider_max, 325.0);
        assert_eq!(config.visualization.frame_interval_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "thresholds": { "low": 100.0 }, "serial": { "port": "COM7" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.thresholds.low, 100.0);
        assert_eq!(config.thresholds.mid, 310.0);
        assert_eq!(config.serial.port, "COM7");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(
            config.dispatch.failure_policy,
            DispatchFailurePolicy::LogAndRetry
        );
    }

    #[test]
    fn test_failure_policy_snake_case() {
        let json = r#"{ "dispatch": { "failure_policy": "fatal" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dispatch.failure_policy, DispatchFailurePolicy::Fatal);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/emg_config.json");
        assert_eq!(config.signal.display_window, 200);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("emg-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "signal": { "display_window": 50, "averaging_window": 5 } }"#)
            .unwrap();
        let config = AppConfig::load_from_file(&path);
        let _ = fs::remove_file(&path);
        assert_eq!(config.signal.display_window, 50);
        assert_eq!(config.signal.averaging_window, 5);
    }

    #[test]
    fn test_validate_rejects_averaging_wider_than_display() {
        let mut config = AppConfig::default();
        config.signal.averaging_window = 300;
        match config.validate() {
            Err(PipelineError::InvalidConfig { reason }) => {
                assert!(reason.contains("averaging_window"))
            }
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_windows() {
        let mut config = AppConfig::default();
        config.signal.display_window = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.signal.averaging_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_backoff_and_intervals() {
        let mut config = AppConfig::default();
        config.acquisition.backoff_multiplier = 1e300;
        assert!(config.validate().is_err());

        config.acquisition.backoff_multiplier = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.visualization.frame_interval_ms = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.acquisition.max_retry_delay_ms = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.acquisition.backoff_multiplier = MAX_BACKOFF_MULTIPLIER;
        config.visualization.frame_interval_ms = MAX_INTERVAL_MS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.serial.port, config.serial.port);
        assert_eq!(
            parsed.acquisition.max_consecutive_failures,
            config.acquisition.max_consecutive_failures
        );
    }
}
