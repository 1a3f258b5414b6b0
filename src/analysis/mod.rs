// Analysis module - threshold classification of the smoothed EMG signal
//
// - thresholds: ThresholdStore shared between the control surface and the
//   classification step
// - classifier: pure band classification plus the debouncing Classifier

pub mod classifier;
pub mod thresholds;

pub use classifier::{classify, Classifier, MovementClass};
pub use thresholds::{ThresholdEvent, ThresholdField, ThresholdSet, ThresholdStore};
