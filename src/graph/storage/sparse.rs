//! Chunked default-plus-overrides storage keyed by element id
//!
//! The id space is cut into fixed-size chunks. A chunk that holds no
//! override is not materialized at all (a `None` slot); a touched chunk
//! holds a dense value array and a bitmask of its overridden slots, and is
//! released again when its last override goes away. Memory therefore
//! grows with the number of overrides and touched chunks, never with the
//! size of the id universe.
//!
//! Invariant: `get(id) == default()` exactly when `has_override(id)` is false.

use crate::graph::property::{Color, Vec3};
use crate::graph::types::{EdgeId, SubgraphId};

/// Slots per chunk unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

const WORD_BITS: usize = 64;

/// Values a [`SparseStore`] can hold.
///
/// `same` decides whether a write changes anything. Floats compare by bit
/// pattern, so a NaN written twice is one value and can be a default.
pub trait SlotValue: Clone {
    fn same(&self, other: &Self) -> bool;
}

macro_rules! exact_slot {
    ($($t:ty),*) => {
        $(impl SlotValue for $t {
            fn same(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

exact_slot!(bool, u8, u32, i64, String, Color, Option<SubgraphId>, Vec<EdgeId>);

impl SlotValue for f64 {
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl SlotValue for Vec3 {
    fn same(&self, other: &Self) -> bool {
        self.x.same(&other.x) && self.y.same(&other.y) && self.z.same(&other.z)
    }
}

/// Which ids a [`SparseStore::set_all`] applies to
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// Replace the default and drop every override
    All,
    /// Write the value to exactly these ids
    Only(&'a [u32]),
}

#[derive(Debug, Clone)]
struct Chunk<V> {
    values: Vec<V>,
    mask: Vec<u64>,
    count: usize,
}

impl<V: SlotValue> Chunk<V> {
    fn new(size: usize, fill: &V) -> Self {
        Chunk {
            values: vec![fill.clone(); size],
            mask: vec![0; size.div_ceil(WORD_BITS)],
            count: 0,
        }
    }

    fn is_set(&self, slot: usize) -> bool {
        self.mask[slot / WORD_BITS] & (1u64 << (slot % WORD_BITS)) != 0
    }

    fn set_bit(&mut self, slot: usize) {
        self.mask[slot / WORD_BITS] |= 1u64 << (slot % WORD_BITS);
        self.count += 1;
    }

    fn clear_bit(&mut self, slot: usize) {
        self.mask[slot / WORD_BITS] &= !(1u64 << (slot % WORD_BITS));
        self.count -= 1;
    }
}

/// Default value plus sparse overrides
#[derive(Debug, Clone)]
pub struct SparseStore<V> {
    default: V,
    chunk_bits: u32,
    chunks: Vec<Option<Box<Chunk<V>>>>,
    overrides: usize,
}

impl<V: SlotValue> SparseStore<V> {
    pub fn new(default: V) -> Self {
        Self::with_chunk_size(default, DEFAULT_CHUNK_SIZE)
    }

    /// `chunk_size` is rounded up to a power of two
    pub fn with_chunk_size(default: V, chunk_size: usize) -> Self {
        let size = chunk_size.max(1).next_power_of_two();
        SparseStore {
            default,
            chunk_bits: size.trailing_zeros(),
            chunks: Vec::new(),
            overrides: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        1 << self.chunk_bits
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }

    /// Replace the default. Overrides are kept except those now equal to
    /// the new default, which stop being overrides.
    ///
    /// Returns `false` if the default was already `value`.
    pub fn set_default(&mut self, value: V) -> bool {
        if value.same(&self.default) {
            return false;
        }
        for slot in self.chunks.iter_mut() {
            let Some(chunk) = slot.as_mut() else { continue };
            for i in 0..chunk.values.len() {
                if chunk.is_set(i) && chunk.values[i].same(&value) {
                    chunk.clear_bit(i);
                    self.overrides -= 1;
                }
            }
            if chunk.count == 0 {
                *slot = None;
            }
        }
        self.default = value;
        true
    }

    pub fn get(&self, id: u32) -> &V {
        let (c, slot) = self.locate(id);
        match self.chunks.get(c) {
            Some(Some(chunk)) if chunk.is_set(slot) => &chunk.values[slot],
            _ => &self.default,
        }
    }

    pub fn has_override(&self, id: u32) -> bool {
        let (c, slot) = self.locate(id);
        matches!(self.chunks.get(c), Some(Some(chunk)) if chunk.is_set(slot))
    }

    /// Store `value` for `id`. Writing the default removes the override.
    ///
    /// Returns whether the observable value changed.
    pub fn set(&mut self, id: u32, value: V) -> bool {
        if value.same(&self.default) {
            return self.clear_override(id);
        }
        let (c, slot) = self.locate(id);
        if c >= self.chunks.len() {
            self.chunks.resize_with(c + 1, || None);
        }
        let size = self.chunk_size();
        let chunk = self.chunks[c].get_or_insert_with(|| Box::new(Chunk::new(size, &value)));
        if chunk.is_set(slot) {
            if chunk.values[slot].same(&value) {
                return false;
            }
        } else {
            chunk.set_bit(slot);
            self.overrides += 1;
        }
        chunk.values[slot] = value;
        true
    }

    /// Reset `id` to the default. Returns whether an override was removed.
    pub fn clear_override(&mut self, id: u32) -> bool {
        let (c, slot) = self.locate(id);
        let Some(entry) = self.chunks.get_mut(c) else {
            return false;
        };
        let Some(chunk) = entry.as_mut() else {
            return false;
        };
        if !chunk.is_set(slot) {
            return false;
        }
        chunk.clear_bit(slot);
        self.overrides -= 1;
        if chunk.count == 0 {
            *entry = None;
        }
        true
    }

    /// Bulk assignment, see [`Scope`]
    pub fn set_all(&mut self, value: V, scope: Scope<'_>) {
        match scope {
            Scope::All => {
                self.chunks.clear();
                self.overrides = 0;
                self.default = value;
            }
            Scope::Only(ids) => {
                for &id in ids {
                    self.set(id, value.clone());
                }
            }
        }
    }

    /// Drop every override, keeping the default
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.overrides = 0;
    }

    pub fn override_count(&self) -> usize {
        self.overrides
    }

    /// Number of materialized chunks
    pub fn touched_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    /// Overridden `(id, value)` pairs in ascending id order
    pub fn overrides(&self) -> Overrides<'_, V> {
        Overrides {
            store: self,
            chunk: 0,
            slot: 0,
        }
    }

    fn locate(&self, id: u32) -> (usize, usize) {
        let id = id as usize;
        (id >> self.chunk_bits, id & (self.chunk_size() - 1))
    }
}

/// Iterator over the overrides of a [`SparseStore`]
pub struct Overrides<'a, V> {
    store: &'a SparseStore<V>,
    chunk: usize,
    slot: usize,
}

impl<'a, V> Iterator for Overrides<'a, V> {
    type Item = (u32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        let size = 1usize << store.chunk_bits;
        while self.chunk < store.chunks.len() {
            if let Some(chunk) = &store.chunks[self.chunk] {
                while self.slot < size {
                    let slot = self.slot;
                    self.slot += 1;
                    let word = chunk.mask[slot / WORD_BITS];
                    if word == 0 {
                        // skip the rest of an empty mask word
                        self.slot = (slot / WORD_BITS + 1) * WORD_BITS;
                        continue;
                    }
                    if word & (1u64 << (slot % WORD_BITS)) != 0 {
                        let id = (self.chunk << store.chunk_bits) + slot;
                        return Some((id as u32, &chunk.values[slot]));
                    }
                }
            }
            self.chunk += 1;
            self.slot = 0;
        }
        None
    }
}
