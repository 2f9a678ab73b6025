//! Priority Queue Module
//!
//! Comparator-ordered binary heap with an optional length bound.

use std::cmp::Ordering;
use std::fmt;

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

// == Priority Queue ==
/// Binary min-heap ordered by a caller-supplied comparator.
///
/// `remove_first` always yields the smallest element under the comparator;
/// pass a reversed comparator to get max-heap behavior. Equal elements come
/// out in unspecified order.
pub struct PriorityQueue<T> {
    heap: Vec<T>,
    compare: Comparator<T>,
    max_len: Option<usize>,
}

impl<T> fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("len", &self.heap.len())
            .field("max_len", &self.max_len)
            .finish()
    }
}

impl<T: Ord + 'static> PriorityQueue<T> {
    /// Min-heap using `T`'s natural order.
    pub fn min_ordered() -> Self {
        Self::new(|a: &T, b: &T| a.cmp(b))
    }

    /// Max-heap using `T`'s natural order.
    pub fn max_ordered() -> Self {
        Self::new(|a: &T, b: &T| b.cmp(a))
    }
}

impl<T> PriorityQueue<T> {
    // == Constructors ==
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            heap: Vec::new(),
            compare: Box::new(compare),
            max_len: None,
        }
    }

    /// Queue that never holds more than `max_len` elements (at least one).
    ///
    /// When full, adding keeps the `max_len` smallest elements and hands back
    /// the one that no longer fits.
    pub fn bounded<F>(compare: F, max_len: usize) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            max_len: Some(max_len.max(1)),
            ..Self::new(compare)
        }
    }

    // == Add ==
    /// Inserts `item`.
    ///
    /// # Returns
    /// `None` normally. For a full bounded queue, the greatest element among
    /// the current contents and `item`, which is left out of the queue.
    pub fn add(&mut self, item: T) -> Option<T> {
        if let Some(max_len) = self.max_len {
            if self.heap.len() >= max_len {
                let worst = self.index_of_greatest()?;
                if (self.compare)(&item, &self.heap[worst]) != Ordering::Less {
                    return Some(item);
                }
                let displaced = std::mem::replace(&mut self.heap[worst], item);
                self.sift_up(worst);
                return Some(displaced);
            }
        }

        self.heap.push(item);
        self.sift_up(self.heap.len() - 1);
        None
    }

    // == Remove First ==
    /// Removes and returns the smallest element.
    pub fn remove_first(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let first = self.heap.pop();
        self.sift_down(0);
        first
    }

    pub fn peek(&self) -> Option<&T> {
        self.heap.first()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Empties the queue, returning its elements smallest first.
    pub fn drain_ordered(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.remove_first() {
            out.push(item);
        }
        out
    }

    fn index_of_greatest(&self) -> Option<usize> {
        // The greatest element is always a leaf
        let first_leaf = self.heap.len() / 2;
        (first_leaf..self.heap.len())
            .max_by(|&a, &b| (self.compare)(&self.heap[a], &self.heap[b]))
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if (self.compare)(&self.heap[index], &self.heap[parent]) != Ordering::Less {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && (self.compare)(&self.heap[left], &self.heap[smallest]) == Ordering::Less {
                smallest = left;
            }
            if right < len && (self.compare)(&self.heap[right], &self.heap[smallest]) == Ordering::Less {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T> Extend<T> for PriorityQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }
}
