//! Membership set over element ids
//!
//! Members are kept in a dense vector for iteration and their positions in
//! a [`SparseStore`], so membership tests, inserts and removals are O(1)
//! and a view over a small part of a large graph stays small.

use super::sparse::SparseStore;

const ABSENT: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct IdSet {
    members: Vec<u32>,
    positions: SparseStore<u32>,
}

impl IdSet {
    pub fn new(chunk_size: usize) -> Self {
        IdSet {
            members: Vec::new(),
            positions: SparseStore::with_chunk_size(ABSENT, chunk_size),
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        *self.positions.get(id) != ABSENT
    }

    /// Returns `false` if `id` was already a member
    pub fn insert(&mut self, id: u32) -> bool {
        if self.contains(id) {
            return false;
        }
        self.positions.set(id, self.members.len() as u32);
        self.members.push(id);
        true
    }

    /// Swap-remove; returns `false` if `id` was not a member
    pub fn remove(&mut self, id: u32) -> bool {
        let pos = *self.positions.get(id);
        if pos == ABSENT {
            return false;
        }
        self.positions.clear_override(id);
        self.members.swap_remove(pos as usize);
        if let Some(&moved) = self.members.get(pos as usize) {
            self.positions.set(moved, pos);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in storage order (insertion order, perturbed by removals)
    pub fn as_slice(&self) -> &[u32] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.members.iter().copied()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = IdSet::new(64);
        assert!(set.insert(3));
        assert!(set.insert(700));
        assert!(set.insert(5));
        assert!(!set.insert(3));
        assert_eq!(set.len(), 3);

        assert!(set.remove(3));
        assert!(!set.contains(3));
        assert!(set.contains(5));
        assert!(set.contains(700));
        assert_eq!(set.as_slice(), &[5, 700]);

        assert!(!set.remove(3));
        assert!(set.remove(700));
        assert!(set.remove(5));
        assert!(set.is_empty());
    }

    #[test]
    fn test_position_zero_is_a_member() {
        let mut set = IdSet::new(64);
        set.insert(0);
        assert!(set.contains(0));
        assert!(!set.contains(1));
    }
}
