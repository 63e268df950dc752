//! Binary min-heap used for both the ready queue and the timer queue.
//!
//! Ordering is total: sort index ascending, then id ascending, so two tasks
//! with equal urgency run in submission order. There is deliberately no
//! remove-by-reference operation; a cancelled entry stays in the heap with a
//! cleared callback and is filtered out when it surfaces at the top. That
//! keeps cancellation O(1) instead of an O(n) heap walk.

use smallvec::SmallVec;

/// Anything storable in a [`MinHeap`]. The key must not change while the
/// entry is inside the heap.
pub trait HeapEntry {
    /// `(sort_index, id)` — compared lexicographically, smallest first.
    fn sort_key(&self) -> (u64, u64);
}

/// Min-heap over a dynamically grown array, inline for small queue depths.
pub struct MinHeap<T: HeapEntry> {
    entries: SmallVec<[T; 8]>,
}

impl<T: HeapEntry> MinHeap<T> {
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// O(1) view of the minimum entry.
    pub fn peek(&self) -> Option<&T> {
        self.entries.first()
    }

    /// O(log n) insertion.
    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
        self.sift_up(self.entries.len() - 1);
    }

    /// O(log n) removal of the minimum entry.
    pub fn pop(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let min = self.entries.pop();
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        min
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.entries[index].sort_key() < self.entries[parent].sort_key() {
                self.entries.swap(index, parent);
                index = parent;
            } else {
                return;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                return;
            }
            let right = left + 1;
            let mut smallest = index;
            if self.entries[left].sort_key() < self.entries[smallest].sort_key() {
                smallest = left;
            }
            if right < len && self.entries[right].sort_key() < self.entries[smallest].sort_key() {
                smallest = right;
            }
            if smallest == index {
                return;
            }
            self.entries.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T: HeapEntry> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}
