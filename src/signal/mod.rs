//! Signal buffering and moving-average smoothing.

pub mod buffer;
pub mod shared;

pub use buffer::{
    RawSample, SampleBuffer, SignalSnapshot, DEFAULT_AVERAGING_WINDOW, DEFAULT_DISPLAY_WINDOW,
};
pub use shared::SharedSampleBuffer;
