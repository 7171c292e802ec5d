use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::types::Sample;

/// Sliding window holding the most recent `capacity` entries.
///
/// One thread appends while any number of readers take snapshots. Eviction
/// and insertion happen under one lock, so a snapshot never sees more than
/// `capacity` entries or a half-applied append.
#[derive(Debug)]
pub struct SampleRing<T = Sample> {
    capacity: usize,
    entries: Mutex<VecDeque<T>>,
}

impl<T: Clone> SampleRing<T> {
    /// A zero capacity is raised to 1; config validation rejects it earlier.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    // 数据都是普通值，锁中毒时内容依然完整，直接取回继续用
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends at the tail, evicting the oldest entry when full.
    pub fn append(&self, entry: T) {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Independent copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<T> {
        self.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
