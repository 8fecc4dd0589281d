//! Array-based binary min-heap.
//!
//! Unlike [`std::collections::BinaryHeap`] the ordering is supplied as an explicit compare function and the heap
//! exposes [`MinHeap::update_root`], which mutates the least item in place and restores heap order with a single
//! sift-down. A k-way merge advances exactly one input per emitted item, so replacing the root costs about half the
//! comparisons of a pop followed by a push.

use std::cmp::Ordering;

/// Binary min-heap ordered by a compare function.
pub struct MinHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    items: Vec<T>,
    compare: F,
}

impl<T, F> MinHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Builds a heap from arbitrary ordered items in *O(n)*.
    ///
    /// # Arguments
    /// * `items` - Items to be placed on the heap
    /// * `compare` - Function used to compare items, the least item becomes the root
    pub fn from_vec(items: Vec<T>, compare: F) -> Self {
        let mut heap = MinHeap { items, compare };
        for idx in (0..heap.items.len() / 2).rev() {
            heap.sift_down(idx);
        }

        return heap;
    }

    /// Returns the number of items on the heap.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the heap holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the least item.
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Applies `update` to the least item and restores heap order.
    /// Returns [`None`] if the heap is empty, otherwise the value returned by `update`.
    pub fn update_root<R>(&mut self, update: impl FnOnce(&mut T) -> R) -> Option<R> {
        let root = self.items.first_mut()?;
        let result = update(root);
        self.sift_down(0);

        return Some(result);
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len {
                break;
            }

            let right = left + 1;
            let child = if right < len && (self.compare)(&self.items[right], &self.items[left]) == Ordering::Less {
                right
            } else {
                left
            };

            if (self.compare)(&self.items[child], &self.items[idx]) != Ordering::Less {
                break;
            }

            self.items.swap(idx, child);
            idx = child;
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::cmp::Ordering;

    use rand::seq::SliceRandom;
    use rstest::*;

    use super::MinHeap;

    fn drain(heap: &mut MinHeap<Option<i32>, impl Fn(&Option<i32>, &Option<i32>) -> Ordering>) -> Vec<i32> {
        let mut result = Vec::new();
        while let Some(Some(item)) = heap.peek() {
            result.push(*item);
            heap.update_root(|root| *root = None);
        }
        result
    }

    // `None` sorts after every value, just as an exhausted cursor does
    fn none_last(a: &Option<i32>, b: &Option<i32>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![1])]
    #[case(vec![2, 1])]
    #[case(vec![5, 3, 3, 9, 0, 1, 1, 7])]
    fn test_heap_order(#[case] items: Vec<i32>) {
        let mut heap = MinHeap::from_vec(items.iter().copied().map(Some).collect(), none_last);
        assert_eq!(heap.len(), items.len());

        let mut expected = items.clone();
        expected.sort();
        assert_eq!(drain(&mut heap), expected);
    }

    #[test]
    fn test_heap_shuffled() {
        let mut items = Vec::from_iter(0..200);
        items.shuffle(&mut rand::thread_rng());

        let mut heap = MinHeap::from_vec(items.into_iter().map(Some).collect(), none_last);
        assert_eq!(drain(&mut heap), Vec::from_iter(0..200));
    }

    #[test]
    fn test_update_root() {
        let mut heap = MinHeap::from_vec(vec![4, 1, 3], |a: &i32, b: &i32| a.cmp(b));
        assert_eq!(heap.peek(), Some(&1));

        let previous = heap.update_root(|root| std::mem::replace(root, 5));
        assert_eq!(previous, Some(1));
        assert_eq!(heap.peek(), Some(&3));
        assert_eq!(heap.len(), 3);
    }

    #[test]
    fn test_update_root_empty() {
        let mut heap = MinHeap::from_vec(Vec::<i32>::new(), |a: &i32, b: &i32| a.cmp(b));
        assert!(heap.is_empty());
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.update_root(|_| ()), None);
    }

    #[test]
    fn test_update_root_comparisons() {
        let comparisons = Cell::new(0);
        let compare = |a: &i32, b: &i32| {
            comparisons.set(comparisons.get() + 1);
            a.cmp(b)
        };

        let mut heap = MinHeap::from_vec(Vec::from_iter(0..15), compare);
        comparisons.set(0);
        heap.update_root(|root| *root = 100);

        // sifting through a 15 item heap takes at most 3 steps of 2 comparisons each
        assert!(comparisons.get() <= 6, "comparisons={}", comparisons.get());
        assert_eq!(heap.peek(), Some(&1));
    }
}
