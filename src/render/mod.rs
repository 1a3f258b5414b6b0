//! Rendering seam for the visualization loop.
//!
//! Plotting itself is an external concern: the loop builds a `Frame` per tick
//! and hands it to whatever `Renderer` was plugged in.

use crate::analysis::ThresholdSet;
use crate::config::AppConfig;
use crate::signal::{RawSample, SignalSnapshot};

mod terminal;

pub use terminal::TerminalRenderer;

/// Fixed plot extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ViewBounds {
    /// x spans the display window, y the configured signal range
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            x_min: 0.0,
            x_max: config.signal.display_window as f64,
            y_min: config.visualization.y_min,
            y_max: config.visualization.y_max,
        }
    }
}

/// Everything drawn in one frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub raw: Vec<RawSample>,
    pub smoothed: Vec<f64>,
    /// Drawn as three horizontal reference lines
    pub thresholds: ThresholdSet,
    pub bounds: ViewBounds,
    pub total_samples: u64,
}

impl Frame {
    pub fn new(
        index: u64,
        snapshot: SignalSnapshot,
        thresholds: ThresholdSet,
        bounds: ViewBounds,
    ) -> Self {
        Self {
            index,
            total_samples: snapshot.total_pushed,
            raw: snapshot.raw,
            smoothed: snapshot.smoothed,
            thresholds,
            bounds,
        }
    }

    pub fn latest_raw(&self) -> Option<RawSample> {
        self.raw.last().copied()
    }

    pub fn latest_smoothed(&self) -> Option<f64> {
        self.smoothed.last().copied()
    }
}

/// Draws frames; called on the visualization thread only
pub trait Renderer: Send {
    fn render(&mut self, frame: &Frame);
}

impl<T: Renderer + ?Sized> Renderer for Box<T> {
    fn render(&mut self, frame: &Frame) {
        (**self).render(frame)
    }
}

/// Headless runs and tests
#[derive(Debug, Default)]
pub struct NullRenderer {
    frames: u64,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &Frame) {
        self.frames += 1;
    }
}
