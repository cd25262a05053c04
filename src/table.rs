//! Node arena and hash-consing unique table.
//!
//! All nodes live in one fixed-capacity arena; a same-sized open-addressed
//! hash table of handle slots makes `(variable, low, high)` triples unique.
//! Both structures are append-only: arena slots are claimed with a
//! fetch-and-add, table slots transition from empty to a handle exactly once
//! via compare-and-swap, and nothing is ever freed. This is what lets
//! [`make_node`][NodeTable::make_node] run from many threads without locks.

use std::cell::UnsafeCell;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed};

use log::trace;

use crate::node::Node;
use crate::reference::Ref;

/// Empty table slot. Equals `Ref::INVALID.raw()`.
const EMPTY: u32 = u32::MAX;

/// Fixed-capacity arena of BDD nodes plus the unique table over them.
///
/// The table enforces the ROBDD canonicity invariants:
///
/// - no node with `low == high` is ever created (requests return the child),
/// - at most one node exists per `(variable, low, high)` triple,
/// - the two terminals are created at construction and never replaced.
pub struct NodeTable {
    nodes: Box<[UnsafeCell<Node>]>,
    slots: Box<[AtomicU32]>,
    /// Next free arena slot.
    node_count: AtomicU32,
    bitmask: usize,
    num_vars: u32,
}

// SAFETY: every arena slot is written exactly once, by the thread that
// claimed it through `alloc`, before its handle is published with the
// release CAS in `make_node` (a slot that loses the CAS race is leaked and
// never published). Handles only reach other threads through acquire loads
// of published table slots or through `make_node` return values, so every
// read of a node happens-after its initialization.
unsafe impl Sync for NodeTable {}

impl NodeTable {
    /// Create a table with `2^bits` arena slots and `2^bits` hash slots.
    ///
    /// `num_vars` is the total number of declared input variables; node
    /// weights are counted over that universe and cannot be fixed up later,
    /// which is why the count is set at construction time.
    pub fn new(bits: usize, num_vars: u32) -> Self {
        assert!(
            (2..=31).contains(&bits),
            "Table bits should be in the range 2..=31"
        );

        let capacity = 1usize << bits;
        let mut nodes = Vec::with_capacity(capacity);
        nodes.push(UnsafeCell::new(Node::terminal(false)));
        nodes.push(UnsafeCell::new(Node::terminal(true)));
        nodes.resize_with(capacity, || {
            UnsafeCell::new(Node::new(0, Ref::INVALID, Ref::INVALID, 0))
        });
        let slots = (0..capacity).map(|_| AtomicU32::new(EMPTY)).collect();

        Self {
            nodes: nodes.into_boxed_slice(),
            slots,
            node_count: AtomicU32::new(2),
            bitmask: capacity - 1,
            num_vars,
        }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of allocated arena slots, terminals included.
    pub fn len(&self) -> usize {
        (self.node_count.load(Relaxed) as usize).min(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        false // the terminals are always there
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    fn node(&self, r: Ref) -> &Node {
        assert!(r.is_valid(), "use of the invalid handle");
        // SAFETY: see the `Sync` impl; `r` was published before we saw it.
        unsafe { &*self.nodes[r.index()].get() }
    }

    pub fn variable(&self, r: Ref) -> u32 {
        self.node(r).variable
    }

    pub fn low(&self, r: Ref) -> Ref {
        self.node(r).low
    }

    pub fn high(&self, r: Ref) -> Ref {
        self.node(r).high
    }

    pub fn weight(&self, r: Ref) -> u64 {
        self.node(r).weight
    }

    /// Satisfying-assignment count for a node at `variable` with the given
    /// children. A child's own count covers the variables from the child's
    /// variable on, so it is doubled once per variable skipped in between;
    /// terminals count as sitting at `num_vars`.
    ///
    /// Counts saturate at `u64::MAX` once they stop fitting (possible past
    /// 64 variables).
    fn weight_of(&self, variable: u32, low: Ref, high: Ref) -> u64 {
        fn scaled(weight: u64, skipped: u32) -> u64 {
            if weight == 0 {
                0
            } else if skipped > weight.leading_zeros() {
                u64::MAX
            } else {
                weight << skipped
            }
        }
        let low = self.node(low);
        let high = self.node(high);
        let skipped_low = low.variable.min(self.num_vars) - variable - 1;
        let skipped_high = high.variable.min(self.num_vars) - variable - 1;
        scaled(low.weight, skipped_low).saturating_add(scaled(high.weight, skipped_high))
    }

    fn alloc(&self, variable: u32, low: Ref, high: Ref) -> Ref {
        let index = self.node_count.fetch_add(1, Relaxed);
        if index as usize >= self.capacity() {
            panic!("Node pool exhausted ({} slots)", self.capacity());
        }
        let node = Node::new(variable, low, high, self.weight_of(variable, low, high));
        // SAFETY: the fetch-and-add handed slot `index` to this thread alone,
        // and no other thread can observe the handle before the publishing
        // CAS in `make_node`.
        unsafe {
            *self.nodes[index as usize].get() = node;
        }
        Ref::from_index(index)
    }

    /// Return the unique handle for `(variable, low, high)`, creating the
    /// node if it does not exist yet.
    ///
    /// Safe to call concurrently from any number of threads: all callers
    /// asking for the same triple get the same handle.
    ///
    /// # Panics
    ///
    /// Panics if the arena is full or a child handle is invalid.
    pub fn make_node(&self, variable: u32, low: Ref, high: Ref) -> Ref {
        assert!(low.is_valid(), "invalid low child");
        assert!(high.is_valid(), "invalid high child");
        debug_assert!(
            variable < self.node(low).variable && variable < self.node(high).variable,
            "variable ordering violated: {} above {} / {}",
            variable,
            self.node(low).variable,
            self.node(high).variable,
        );

        // Redundant test: both branches lead to the same place.
        if low == high {
            return low;
        }

        let mut p = (variable as usize)
            .wrapping_add(low.raw() as usize)
            .wrapping_add(high.raw() as usize)
            & self.bitmask;
        // Allocated but not yet published; carried across failed claims.
        let mut fresh: Option<Ref> = None;

        loop {
            let cur = self.slots[p].load(Acquire);
            if cur == EMPTY {
                let r = fresh
                    .take()
                    .unwrap_or_else(|| self.alloc(variable, low, high));
                match self.slots[p].compare_exchange(EMPTY, r.raw(), AcqRel, Acquire) {
                    Ok(_) => {
                        trace!("mk({}, {}, {}) -> new {}", variable, low, high, r);
                        return r;
                    }
                    Err(winner) => {
                        let winner = Ref::from_index(winner);
                        if self.node(winner).key_eq(variable, low, high) {
                            // Another thread created the same node first.
                            // Our arena slot stays allocated: entries are
                            // permanent, losing allocations are leaked.
                            trace!("mk({}, {}, {}) -> lost race to {}", variable, low, high, winner);
                            return winner;
                        }
                        fresh = Some(r);
                    }
                }
            } else {
                let cur = Ref::from_index(cur);
                if self.node(cur).key_eq(variable, low, high) {
                    return cur;
                }
            }
            p = (p + 1) & self.bitmask;
        }
    }
}
