use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{CaptureError, CapturedRequest};

pub const DEFAULT_HISTORY_SIZE: usize = 3;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_HISTORY_SIZE) {
    Some(capacity) => capacity,
    None => panic!("DEFAULT_HISTORY_SIZE must be non-zero"),
};

/// Fixed-capacity, oldest-first record of captured requests.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<CapturedRequest>,
    capacity: NonZeroUsize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self {
            entries: VecDeque::with_capacity(DEFAULT_HISTORY_SIZE),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Result<Self, CaptureError> {
        let capacity = non_zero(capacity)?;
        Ok(Self {
            entries: VecDeque::with_capacity(capacity.get()),
            capacity,
        })
    }

    /// Changes the maximum size. Shrinking evicts the oldest entries.
    pub fn configure(&mut self, capacity: usize) -> Result<(), CaptureError> {
        self.capacity = non_zero(capacity)?;
        while self.entries.len() > self.capacity.get() {
            self.entries.pop_front();
        }
        Ok(())
    }

    /// Appends `entry`, returning the entry evicted to make room for it.
    pub fn append(&mut self, entry: CapturedRequest) -> Option<CapturedRequest> {
        let evicted = if self.entries.len() == self.capacity.get() {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn snapshot(&self) -> Vec<CapturedRequest> {
        self.entries.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<CapturedRequest> {
        self.entries.back().cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedRequest> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

fn non_zero(capacity: usize) -> Result<NonZeroUsize, CaptureError> {
    NonZeroUsize::new(capacity).ok_or(CaptureError::InvalidHistorySize(capacity))
}

/// Cloneable handle to one [`HistoryBuffer`].
///
/// Clones share the same buffer. Each operation takes the lock once and never
/// holds it across an await point, so concurrent calls only contend for the
/// duration of a single push.
#[derive(Clone, Debug, Default)]
pub struct SharedHistory {
    inner: Arc<Mutex<HistoryBuffer>>,
}

impl SharedHistory {
    pub fn new(capacity: usize) -> Result<Self, CaptureError> {
        Ok(Self::from_buffer(HistoryBuffer::new(capacity)?))
    }

    pub fn from_buffer(buffer: HistoryBuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    pub fn append(&self, entry: CapturedRequest) -> Option<CapturedRequest> {
        self.lock().append(entry)
    }

    pub fn configure(&self, capacity: usize) -> Result<(), CaptureError> {
        self.lock().configure(capacity)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn snapshot(&self) -> Vec<CapturedRequest> {
        self.lock().snapshot()
    }

    pub fn last(&self) -> Option<CapturedRequest> {
        self.lock().last()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    // A panic elsewhere while holding the lock cannot leave the deque in a
    // torn state, so a poisoned guard is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HistoryBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
