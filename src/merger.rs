//! K-way merger.

use std::cmp::Ordering;

use crate::cursor::Cursor;
use crate::heap::MinHeap;

type CursorCompare<I> = fn(&Cursor<I>, &Cursor<I>) -> Ordering;

/// Heap based k-way merger.
/// Merges a batch of cursors over sorted runs into a single ascending stream. Duplicates are preserved, so the output
/// length is the sum of the runs lengths. Time complexity is *m* \* log(*k*) where *m* is the number of records,
/// *k* is the number of cursors.
///
/// The merger is lazy: a cursor is advanced only when its head has just been emitted. The first read failure is
/// returned as an item and ends the stream.
pub struct KWayMerger<I> {
    cursors: MinHeap<Cursor<I>, CursorCompare<I>>,
    failed: bool,
}

impl<I, E> KWayMerger<I>
where
    I: Iterator<Item = Result<String, E>>,
{
    /// Creates a merger over a batch of cursors.
    /// Cursor runs should be sorted in ascending order otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `cursors` - Cursors to be merged in a single sorted stream
    pub fn new(cursors: impl IntoIterator<Item = Cursor<I>>) -> Self {
        let cursors = MinHeap::from_vec(Vec::from_iter(cursors), Cursor::compare as CursorCompare<I>);

        return KWayMerger { cursors, failed: false };
    }

    /// Returns the number of merged cursors.
    pub fn fan_in(&self) -> usize {
        self.cursors.len()
    }
}

impl<I, E> Iterator for KWayMerger<I>
where
    I: Iterator<Item = Result<String, E>>,
{
    type Item = Result<String, E>;

    /// Returns the next record from the cursors in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursors.peek()?.is_exhausted() {
            // an exhausted root means every cursor is exhausted
            return None;
        }

        match self.cursors.update_root(Cursor::pop)? {
            Ok(record) => record.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use std::error::Error;
    use std::io::{self, ErrorKind};

    use super::KWayMerger;
    use crate::cursor::Cursor;

    fn test_error() -> io::Error {
        io::Error::new(ErrorKind::Other, "test error")
    }

    fn ok(items: &[&str]) -> Vec<Result<String, io::Error>> {
        items.iter().map(|item| Ok(item.to_string())).collect()
    }

    #[rstest]
    #[case(
        vec![],
        vec![],
    )]
    #[case(
        vec![
            ok(&[]),
            ok(&[])
        ],
        vec![],
    )]
    #[case(
        vec![
            ok(&["d", "e", "g"]),
            ok(&["a", "f"]),
            ok(&["c"]),
            ok(&[]),
        ],
        ok(&["a", "c", "d", "e", "f", "g"]),
    )]
    #[case(
        vec![
            ok(&["a", "b", "b"]),
            ok(&["b", "c"]),
            ok(&["a"]),
        ],
        ok(&["a", "a", "b", "b", "b", "c"]),
    )]
    #[case(
        vec![
            vec![Ok("c".to_string()), Err(test_error())],
            ok(&["a", "b", "d"]),
        ],
        vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Err(test_error()),
        ],
    )]
    fn test_merger(
        #[case] runs: Vec<Vec<Result<String, io::Error>>>,
        #[case] expected_result: Vec<Result<String, io::Error>>,
    ) {
        let cursors: Result<Vec<_>, _> = runs.into_iter().map(Cursor::new).collect();
        let merger = KWayMerger::new(cursors.unwrap());
        let actual_result = merger.collect();
        assert!(
            compare_vectors_of_result::<_, io::Error>(&actual_result, &expected_result),
            "actual={:?}, expected={:?}",
            actual_result,
            expected_result
        );
    }

    #[test]
    fn test_merger_shuffled_runs() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let mut runs: Vec<Vec<io::Result<String>>> = (0..7).map(|_| Vec::new()).collect();
        for value in 0..500 {
            let record = format!("{:04}", value / 2);
            let idx = rng.gen_range(0..runs.len());
            runs[idx].push(Ok(record));
        }

        let cursors: Result<Vec<_>, _> = runs.into_iter().map(Cursor::new).collect();
        let merger = KWayMerger::new(cursors.unwrap());
        assert_eq!(merger.fan_in(), 7);

        let actual_result: Result<Vec<String>, _> = merger.collect();
        let expected_result = Vec::from_iter((0..500).map(|value| format!("{:04}", value / 2)));
        assert_eq!(actual_result.unwrap(), expected_result);
    }

    fn compare_vectors_of_result<T: PartialEq, E: Error + 'static>(
        actual: &Vec<Result<T, E>>,
        expected: &Vec<Result<T, E>>,
    ) -> bool {
        actual.len() == expected.len()
            && actual
                .into_iter()
                .zip(expected)
                .all(
                    |(actual_result, expected_result)| match (actual_result, expected_result) {
                        (Ok(actual_result), Ok(expected_result)) if actual_result == expected_result => true,
                        (Err(actual_err), Err(expected_err)) => actual_err.to_string() == expected_err.to_string(),
                        _ => false,
                    },
                )
    }
}
