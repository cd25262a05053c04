//! Computed cache for apply results.
//!
//! A fixed-size direct-mapped table keyed by `(op, a, b)`. Each key hashes
//! to exactly one slot and collisions overwrite, so the cache is lossy by
//! design: a miss only costs a recomputation, and the unique table collapses
//! whatever gets recomputed back to the same handle.
//!
//! Every slot carries its own tiny mutex so that concurrent apply workers
//! always read and write a consistent entry. The lock covers a four-word
//! critical section and is never held across any other call.

use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use parking_lot::Mutex;

use crate::bdd::Op;
use crate::reference::Ref;

#[derive(Debug, Copy, Clone)]
struct Entry {
    op: Op,
    a: Ref,
    b: Ref,
    result: Ref,
}

impl Entry {
    /// Unoccupied entry; `a == INVALID` never matches a real query.
    const EMPTY: Self = Self {
        op: Op::And,
        a: Ref::INVALID,
        b: Ref::INVALID,
        result: Ref::INVALID,
    };
}

/// Direct-mapped cache of the most recent apply results.
pub struct ApplyCache {
    slots: Box<[Mutex<Entry>]>,
    bitmask: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ApplyCache {
    /// Create a cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        assert!(
            (2..=31).contains(&bits),
            "Cache bits should be in the range 2..=31"
        );

        let size = 1usize << bits;
        Self {
            slots: (0..size).map(|_| Mutex::new(Entry::EMPTY)).collect(),
            bitmask: size - 1,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Relaxed)
    }

    #[inline]
    fn index(&self, a: Ref, b: Ref, op: Op) -> usize {
        (a.raw() as usize)
            .wrapping_add(b.raw() as usize)
            .wrapping_add(op as usize)
            & self.bitmask
    }

    /// Look up a previously computed result.
    #[inline]
    pub fn find(&self, a: Ref, b: Ref, op: Op) -> Option<Ref> {
        let entry = self.slots[self.index(a, b, op)].lock();
        if entry.a == a && entry.b == b && entry.op == op {
            self.hits.fetch_add(1, Relaxed);
            Some(entry.result)
        } else {
            self.misses.fetch_add(1, Relaxed);
            None
        }
    }

    /// Record a result, evicting whatever occupied the slot.
    #[inline]
    pub fn insert(&self, a: Ref, b: Ref, op: Op, result: Ref) {
        *self.slots[self.index(a, b, op)].lock() = Entry { op, a, b, result };
    }
}
