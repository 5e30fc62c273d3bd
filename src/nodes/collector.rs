use std::sync::{Arc, Mutex, PoisonError};

/// Append-only sample store shared by the query workers of one round.
///
/// Cloning yields another handle to the same store. Read it back with
/// [`SampleCollector::snapshot`] once every worker has finished.
#[derive(Clone, Debug, Default)]
pub struct SampleCollector {
    samples: Arc<Mutex<Vec<u32>>>,
}

impl SampleCollector {
    pub fn new() -> Self {
        SampleCollector {
            samples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SampleCollector {
            samples: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
        }
    }

    pub fn append(&self, value: u32) {
        // a push is never left half-done, so a poisoned lock is still usable
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
    }

    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
