//! Identifier allocation for nodes and edges
//!
//! Ids are dense `u32` slots. Freed ids are recycled smallest-first, so a
//! graph that churns keeps its backing vectors compact. The allocator for
//! nodes and the allocator for edges are two independent instances.
//!
//! The free set is ordered, so `allocate` and `free` cost O(log f) for `f`
//! recycled ids. Liveness checks go through the bitmap and stay O(1).

use super::error::{GraphError, GraphResult};
use std::collections::BTreeSet;
use std::ops::Range;

const WORD_BITS: usize = 64;

/// Issues and recycles integer identifiers
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    /// First id that has never been issued (everything above is free)
    next: u32,
    /// Recycled ids below `next`, smallest popped first
    free: BTreeSet<u32>,
    /// Liveness bitmap, one bit per id below `next`
    live: Vec<u64>,
    /// Number of live ids
    count: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator whose bitmap is pre-sized for `capacity` ids
    pub fn with_capacity(capacity: usize) -> Self {
        IdAllocator {
            live: Vec::with_capacity(capacity.div_ceil(WORD_BITS)),
            ..Self::default()
        }
    }

    /// Return the smallest id that is not currently allocated.
    ///
    /// # Panics
    ///
    /// Panics if the `u32` id space is exhausted.
    pub fn allocate(&mut self) -> u32 {
        let id = match self.free.pop_first() {
            Some(id) => id,
            None => {
                let id = self.next;
                self.next = self
                    .next
                    .checked_add(1)
                    .expect("identifier space exhausted");
                id
            }
        };
        self.mark(id);
        id
    }

    /// Allocate `n` contiguous, never-issued ids from the tail.
    ///
    /// Recycled ids are left in the free set; bulk insertion wants a
    /// contiguous block so the caller can grow its storage once.
    pub fn reserve(&mut self, n: u32) -> Range<u32> {
        let start = self.next;
        let end = start.checked_add(n).expect("identifier space exhausted");
        self.next = end;
        self.ensure_words(end as usize);
        for id in start..end {
            self.mark(id);
        }
        start..end
    }

    /// Mark `id` as reusable. Freeing an id that is not allocated is a
    /// contract violation and is reported rather than ignored.
    pub fn free(&mut self, id: u32) -> GraphResult<()> {
        if !self.is_valid(id) {
            return Err(GraphError::invalid(format!(
                "id {} freed while not allocated",
                id
            )));
        }
        self.unmark(id);
        if id + 1 == self.next {
            // Shrink the tail, absorbing recycled ids that become adjacent to it
            self.next = id;
            while self.next > 0 && self.free.remove(&(self.next - 1)) {
                self.next -= 1;
            }
        } else {
            self.free.insert(id);
        }
        Ok(())
    }

    /// O(1) liveness check
    pub fn is_valid(&self, id: u32) -> bool {
        let idx = id as usize;
        match self.live.get(idx / WORD_BITS) {
            Some(word) => word & (1u64 << (idx % WORD_BITS)) != 0,
            None => false,
        }
    }

    /// Number of live ids
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Upper bound (exclusive) of every id issued so far
    pub fn capacity_hint(&self) -> usize {
        self.next as usize
    }

    /// Number of recycled ids waiting for reuse
    pub fn recycled(&self) -> usize {
        self.free.len()
    }

    /// Live ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.next).filter(move |&id| self.is_valid(id))
    }

    pub fn clear(&mut self) {
        self.next = 0;
        self.free.clear();
        self.live.clear();
        self.count = 0;
    }

    fn ensure_words(&mut self, ids: usize) {
        let words = ids.div_ceil(WORD_BITS);
        if words > self.live.len() {
            self.live.resize(words, 0);
        }
    }

    fn mark(&mut self, id: u32) {
        let idx = id as usize;
        self.ensure_words(idx + 1);
        self.live[idx / WORD_BITS] |= 1u64 << (idx % WORD_BITS);
        self.count += 1;
    }

    fn unmark(&mut self, id: u32) {
        let idx = id as usize;
        self.live[idx / WORD_BITS] &= !(1u64 << (idx % WORD_BITS));
        self.count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocation() {
        let mut ids = IdAllocator::new();
        for i in 0..1000 {
            assert_eq!(ids.allocate(), i);
        }
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_smallest_free_first() {
        let mut ids = IdAllocator::new();
        for _ in 0..1000 {
            ids.allocate();
        }
        for i in 0..500 {
            ids.free(i * 2).unwrap();
        }
        for i in 0..500 {
            assert_eq!(ids.allocate(), i * 2);
        }
        for i in 100..=200 {
            ids.free(i).unwrap();
        }
        for i in 100..=200 {
            assert_eq!(ids.allocate(), i);
        }
    }

    #[test]
    fn test_is_valid() {
        let mut ids = IdAllocator::new();
        for _ in 0..1000 {
            ids.allocate();
        }
        for i in 0..500 {
            ids.free(i * 2).unwrap();
        }
        for i in 0..500 {
            assert!(!ids.is_valid(i * 2));
            assert!(ids.is_valid(i * 2 + 1));
        }
        assert!(!ids.is_valid(1200));
    }

    #[test]
    fn test_iterate_live_ids() {
        let mut ids = IdAllocator::new();
        for _ in 0..1000 {
            ids.allocate();
        }
        for i in 0..500 {
            ids.free(i * 2).unwrap();
        }
        let live: Vec<u32> = ids.ids().collect();
        assert_eq!(live.len(), 500);
        for (i, id) in live.into_iter().enumerate() {
            assert_eq!(id, 2 * i as u32 + 1);
        }
    }

    #[test]
    fn test_double_free_is_reported() {
        let mut ids = IdAllocator::new();
        let id = ids.allocate();
        ids.free(id).unwrap();
        assert!(matches!(ids.free(id), Err(GraphError::InvalidOperation(_))));
        assert!(matches!(ids.free(77), Err(GraphError::InvalidOperation(_))));
    }

    #[test]
    fn test_tail_shrinks() {
        let mut ids = IdAllocator::new();
        for _ in 0..10 {
            ids.allocate();
        }
        ids.free(7).unwrap();
        ids.free(8).unwrap();
        assert_eq!(ids.recycled(), 2);
        ids.free(9).unwrap();
        assert_eq!(ids.recycled(), 0);
        assert_eq!(ids.capacity_hint(), 7);
        assert_eq!(ids.allocate(), 7);
    }

    #[test]
    fn test_reserve_contiguous() {
        let mut ids = IdAllocator::new();
        for _ in 0..4 {
            ids.allocate();
        }
        ids.free(1).unwrap();
        let block = ids.reserve(3);
        assert_eq!(block, 4..7);
        assert!(block.clone().all(|id| ids.is_valid(id)));
        // the recycled id is still handed out first
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 7);
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_clear() {
        let mut ids = IdAllocator::new();
        ids.reserve(16);
        ids.clear();
        assert!(ids.is_empty());
        assert!(!ids.is_valid(3));
        assert_eq!(ids.allocate(), 0);
    }
}
