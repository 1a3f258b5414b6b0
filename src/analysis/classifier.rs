// Classifier - threshold-band movement classification with debounced output
//
// Maps a smoothed EMG value to one of four movement classes using the live
// ThresholdSet. Bands are evaluated in a fixed priority order and re-evaluated
// in full on every call (no hysteresis):
//
//   low  <= v < mid   -> Movement1 ('1')
//   mid  <= v < high  -> Movement2 ('2')
//   v >= high         -> Movement3 ('3')
//   otherwise         -> Rest      ('0')
//
// `Classifier::update` remembers the last emitted command so a steady state
// produces exactly one command, on the transition into it.

use std::fmt;

use super::thresholds::ThresholdSet;

/// Movement state recognised from the smoothed signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MovementClass {
    /// Below the low threshold
    Rest,
    /// [low, mid)
    Movement1,
    /// [mid, high)
    Movement2,
    /// At or above high
    Movement3,
}

impl MovementClass {
    pub const ALL: [MovementClass; 4] = [
        MovementClass::Rest,
        MovementClass::Movement1,
        MovementClass::Movement2,
        MovementClass::Movement3,
    ];

    /// Single-character actuator command
    pub fn command(self) -> char {
        match self {
            MovementClass::Rest => '0',
            MovementClass::Movement1 => '1',
            MovementClass::Movement2 => '2',
            MovementClass::Movement3 => '3',
        }
    }

    /// Command as the byte written to the link
    pub fn command_byte(self) -> u8 {
        self.command() as u8
    }

    pub fn from_command(command: char) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.command() == command)
    }

    /// Human-readable label shown on the control surface
    pub fn label(self) -> &'static str {
        match self {
            MovementClass::Rest => "Rest",
            MovementClass::Movement1 => "Movement 1",
            MovementClass::Movement2 => "Movement 2",
            MovementClass::Movement3 => "Movement 3",
        }
    }
}

impl fmt::Display for MovementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify one value against a threshold snapshot
///
/// Pure function of its inputs; it never decides whether to dispatch.
///
/// # Returns
/// Tuple of (MovementClass, command symbol)
pub fn classify(value: f64, thresholds: &ThresholdSet) -> (MovementClass, char) {
    let class = if thresholds.low <= value && value < thresholds.mid {
        MovementClass::Movement1
    } else if thresholds.mid <= value && value < thresholds.high {
        MovementClass::Movement2
    } else if value >= thresholds.high {
        MovementClass::Movement3
    } else {
        MovementClass::Rest
    };
    (class, class.command())
}

/// Stateful classifier that only reports transitions
///
/// Owned by the classification step; never shared across threads.
#[derive(Debug, Default)]
pub struct Classifier {
    /// Last command emitted, `None` before the first update
    last_command: Option<char>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and report a transition
    ///
    /// # Returns
    /// * `Some(class)` - The command symbol differs from the last one emitted;
    ///   `class.command()` is to be dispatched and `class.label()` shown
    /// * `None` - Same symbol as last time, nothing to send
    pub fn update(&mut self, value: f64, thresholds: &ThresholdSet) -> Option<MovementClass> {
        let (class, command) = classify(value, thresholds);
        if self.last_command == Some(command) {
            return None;
        }
        self.last_command = Some(command);
        Some(class)
    }

    pub fn last_command(&self) -> Option<char> {
        self.last_command
    }

    /// Forget the last command so the next update emits again
    pub fn reset(&mut self) {
        self.last_command = None;
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
