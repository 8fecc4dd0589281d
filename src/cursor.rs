//! One record look-ahead cursor over a sorted run.

use std::cmp::Ordering;

/// Buffered read pointer over a single sorted run.
///
/// A cursor always holds the next record of its run (its head), or nothing once the run is exhausted, so merge
/// placement decisions never have to read from the run itself. Any iterator of fallible records can back a cursor:
/// file runs use [`crate::run::RunReader`], tests use in-memory vectors.
pub struct Cursor<I> {
    source: I,
    head: Option<String>,
}

impl<I, E> Cursor<I>
where
    I: Iterator<Item = Result<String, E>>,
{
    /// Creates a cursor and buffers the first record of the run.
    pub fn new(source: impl IntoIterator<IntoIter = I>) -> Result<Self, E> {
        let mut source = source.into_iter();
        let head = source.next().transpose()?;

        return Ok(Cursor { source, head });
    }

    /// Returns the buffered record and buffers the next one.
    /// Returns [`None`] if the cursor is exhausted.
    ///
    /// A read failure leaves the cursor exhausted.
    pub fn pop(&mut self) -> Result<Option<String>, E> {
        let record = match self.head.take() {
            Some(record) => record,
            None => return Ok(None),
        };
        self.head = self.source.next().transpose()?;

        return Ok(Some(record));
    }

    /// Returns the buffered record without advancing.
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Checks if the run has yielded all its records.
    pub fn is_exhausted(&self) -> bool {
        self.head.is_none()
    }

    /// Merge placement order.
    ///
    /// Cursors with a buffered record compare by that record. An exhausted cursor is greater than any cursor with a
    /// record, so exhausted cursors sink to the bottom of a min-heap. Two exhausted cursors are equal.
    pub fn compare(a: &Self, b: &Self) -> Ordering {
        match (&a.head, &b.head) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
