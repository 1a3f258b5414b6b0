// RecordingSink - in-memory actuator link
//
// Stores every command byte written. Clones share the same log, so a test or
// the simulated run can hand one clone to the pipeline and inspect another.
// Failures can be injected to exercise the dispatch failure policy.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::CommandSink;
use crate::error::TransportError;

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    written: Arc<Mutex<Vec<u8>>>,
    failures_pending: Arc<AtomicU32>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` writes fail
    pub fn fail_next(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Commands written so far, as characters
    pub fn commands(&self) -> Vec<char> {
        self.bytes().into_iter().map(char::from).collect()
    }

    pub fn bytes(&self) -> Vec<u8> {
        match self.written.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CommandSink for RecordingSink {
    fn write_command(&mut self, command: u8) -> Result<(), TransportError> {
        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(TransportError::WriteFailed {
                details: "injected write failure".to_string(),
            });
        }

        match self.written.lock() {
            Ok(mut guard) => guard.push(command),
            Err(poisoned) => poisoned.into_inner().push(command),
        }
        Ok(())
    }
}
