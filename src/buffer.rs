//! Record count limited buffer.

/// In-memory chunk of records limited by records count.
/// The allocation is kept between chunks, so a run generator fills and drains the same buffer over and over.
pub struct RecordBuffer {
    limit: usize,
    inner: Vec<String>,
}

impl RecordBuffer {
    /// Creates an empty buffer that reports itself full after `limit` records.
    pub fn new(limit: usize) -> Self {
        RecordBuffer {
            limit,
            inner: Vec::new(),
        }
    }

    /// Adds a new record to the buffer.
    pub fn push(&mut self, record: String) {
        self.inner.push(record);
    }

    /// Returns buffer length.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    /// Sorts buffered records in ascending lexicographic order.
    pub fn sort(&mut self) {
        // equal strings are indistinguishable so stability buys nothing here
        self.inner.sort_unstable();
    }

    /// Removes all records from the buffer in their current order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, String> {
        self.inner.drain(..)
    }
}
