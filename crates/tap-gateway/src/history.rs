//! Fixed-capacity FIFO store of recent events of one kind.

use std::collections::VecDeque;

use tap_types::event::EventRecord;

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    items: VecDeque<EventRecord>,
}

impl HistoryBuffer {
    /// A zero capacity is bumped to one so the buffer can always hold the
    /// latest record.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert at the tail, evicting from the head once over capacity.
    pub fn append(&mut self, record: EventRecord) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(record);
    }

    /// The last `count` records, oldest first.
    pub fn snapshot(&self, count: usize) -> Vec<EventRecord> {
        let skip = self.items.len().saturating_sub(count);
        self.items.iter().skip(skip).cloned().collect()
    }
}
