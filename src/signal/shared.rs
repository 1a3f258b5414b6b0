// SharedSampleBuffer - mutex-guarded SampleBuffer shared between threads
//
// The acquisition thread is the only writer and the visualization thread the
// only reader. The lock is held for one push or one snapshot copy, never
// across I/O or rendering, so the acquisition path is never held up by the
// renderer.

use std::sync::{Arc, Mutex, MutexGuard};

use super::buffer::{RawSample, SampleBuffer, SignalSnapshot};
use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct SharedSampleBuffer {
    inner: Arc<Mutex<SampleBuffer>>,
}

impl SharedSampleBuffer {
    pub fn new(capacity: usize, averaging_window: usize) -> Self {
        Self::from_buffer(SampleBuffer::new(capacity, averaging_window))
    }

    pub fn from_buffer(buffer: SampleBuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SampleBuffer>, PipelineError> {
        self.inner.lock().map_err(|_| {
            log::error!("Sample buffer lock poisoned");
            PipelineError::LockPoisoned {
                component: "SampleBuffer".to_string(),
            }
        })
    }

    /// Push one raw sample; returns the smoothed value appended for it
    pub fn push(&self, sample: RawSample) -> Result<f64, PipelineError> {
        Ok(self.lock()?.push(sample))
    }

    /// Copy both series under a single lock acquisition
    pub fn snapshot(&self) -> Result<SignalSnapshot, PipelineError> {
        Ok(self.lock()?.snapshot())
    }

    pub fn len(&self) -> Result<usize, PipelineError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, PipelineError> {
        Ok(self.lock()?.is_empty())
    }
}
