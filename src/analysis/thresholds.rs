// ThresholdStore - live classification boundaries shared across threads
//
// The control surface writes, the classification step reads once per frame.
// All three boundaries live behind one RwLock so a reader always gets a
// complete triple, never a mix of old and new fields.
//
// No ordering between low/mid/high is enforced; out-of-order values simply
// produce the bands the classifier's priority order implies.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;

/// Three classification boundaries (assumed low <= mid <= high)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl ThresholdSet {
    pub fn new(low: f64, mid: f64, high: f64) -> Self {
        Self { low, mid, high }
    }

    pub fn get(&self, field: ThresholdField) -> f64 {
        match field {
            ThresholdField::Low => self.low,
            ThresholdField::Mid => self.mid,
            ThresholdField::High => self.high,
        }
    }

    fn set(&mut self, field: ThresholdField, value: f64) {
        match field {
            ThresholdField::Low => self.low = value,
            ThresholdField::Mid => self.mid = value,
            ThresholdField::High => self.high = value,
        }
    }

    /// Whether low <= mid <= high holds
    pub fn is_ordered(&self) -> bool {
        self.low <= self.mid && self.mid <= self.high
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::from(&ThresholdConfig::default())
    }
}

impl From<&ThresholdConfig> for ThresholdSet {
    fn from(config: &ThresholdConfig) -> Self {
        Self::new(config.low, config.mid, config.high)
    }
}

/// Identifies one of the three boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdField {
    Low,
    Mid,
    High,
}

impl ThresholdField {
    pub const ALL: [ThresholdField; 3] =
        [ThresholdField::Low, ThresholdField::Mid, ThresholdField::High];

    pub fn name(self) -> &'static str {
        match self {
            ThresholdField::Low => "low",
            ThresholdField::Mid => "mid",
            ThresholdField::High => "high",
        }
    }
}

impl fmt::Display for ThresholdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// "Threshold changed" event raised by one control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEvent {
    pub field: ThresholdField,
    pub value: f64,
}

impl ThresholdEvent {
    pub fn new(field: ThresholdField, value: f64) -> Self {
        Self { field, value }
    }
}

/// Shared, concurrently readable/writable threshold triple
#[derive(Debug, Clone)]
pub struct ThresholdStore {
    inner: Arc<RwLock<ThresholdSet>>,
}

impl ThresholdStore {
    pub fn new(initial: ThresholdSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Snapshot of the current triple
    ///
    /// A poisoned lock still holds a complete triple (writes are plain
    /// copies), so the value is recovered rather than failing the caller.
    pub fn get(&self) -> ThresholdSet {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                log::error!("Threshold store lock poisoned in get, using last value");
                *poisoned.into_inner()
            }
        }
    }

    /// Replace all three boundaries as a unit
    pub fn set(&self, low: f64, mid: f64, high: f64) {
        self.replace(ThresholdSet::new(low, mid, high));
    }

    pub fn replace(&self, thresholds: ThresholdSet) {
        match self.inner.write() {
            Ok(mut guard) => *guard = thresholds,
            Err(poisoned) => {
                log::error!("Threshold store lock poisoned in set, overwriting");
                *poisoned.into_inner() = thresholds;
            }
        }
    }

    /// Update one boundary, last write wins
    pub fn set_field(&self, field: ThresholdField, value: f64) -> ThresholdSet {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("Threshold store lock poisoned in set_field, overwriting");
                poisoned.into_inner()
            }
        };
        guard.set(field, value);
        *guard
    }

    /// Apply a control event; returns the triple after the write
    pub fn apply(&self, event: ThresholdEvent) -> ThresholdSet {
        self.set_field(event.field, event.value)
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new(ThresholdSet::default())
    }
}
