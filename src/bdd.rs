//! The BDD manager and the apply engine.
//!
//! [`Bdd`] owns the node arena, the unique table, the computed cache and the
//! worker pool. All operations go through the manager, which is what keeps
//! the diagram canonical: equivalent formulas compile to the same handle no
//! matter how, or on how many threads, they were built.

use std::collections::HashSet;
use std::fmt::Debug;

use log::debug;
use num_bigint::BigUint;

use crate::cache::ApplyCache;
use crate::reference::Ref;
use crate::table::NodeTable;
use crate::workers::Workers;

/// Binary boolean operators understood by [`Bdd::apply`].
///
/// Negation is not a separate operator: `NOT x` is `x XOR true`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Op {
    And = 0,
    Or = 1,
    Xor = 2,
}

impl Op {
    /// Result for two terminal operands.
    fn terminal(self, a: Ref, b: Ref) -> Ref {
        let (a, b) = (a == Ref::TRUE, b == Ref::TRUE);
        let value = match self {
            Op::And => a && b,
            Op::Or => a || b,
            Op::Xor => a != b,
        };
        if value {
            Ref::TRUE
        } else {
            Ref::FALSE
        }
    }
}

/// Sizing and threading knobs for [`Bdd::with_config`].
#[derive(Debug, Clone)]
pub struct BddConfig {
    storage_bits: usize,
    cache_bits: usize,
    threads: usize,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            storage_bits: 20,
            cache_bits: 16,
            threads: 0,
        }
    }
}

impl BddConfig {
    /// Node arena and unique table size: `2^bits` slots each.
    pub fn with_storage_bits(mut self, bits: usize) -> Self {
        self.storage_bits = bits;
        self
    }

    /// Computed cache size: `2^bits` slots.
    pub fn with_cache_bits(mut self, bits: usize) -> Self {
        self.cache_bits = bits;
        self
    }

    /// Worker thread count; `0` means one per core.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// A manager for reduced ordered binary decision diagrams.
///
/// The variable universe is fixed at construction: node weights count
/// satisfying assignments over all `num_vars` declared variables and are
/// computed once, when a node is created.
///
/// # Examples
///
/// ```
/// use robdd::bdd::Bdd;
///
/// let bdd = Bdd::new(2);
/// let a = bdd.mk_var(0);
/// let b = bdd.mk_var(1);
/// let f = bdd.apply_xor(a, b);
/// assert_eq!(bdd.solution_count(f), 2u32.into());
/// ```
pub struct Bdd {
    table: NodeTable,
    cache: ApplyCache,
    workers: Workers,
}

impl Bdd {
    /// Manager over `num_vars` variables with default sizing.
    pub fn new(num_vars: u32) -> Self {
        Self::with_config(num_vars, BddConfig::default())
    }

    pub fn with_config(num_vars: u32, config: BddConfig) -> Self {
        Self {
            table: NodeTable::new(config.storage_bits, num_vars),
            cache: ApplyCache::new(config.cache_bits),
            workers: Workers::new(config.threads),
        }
    }

    pub fn zero(&self) -> Ref {
        Ref::FALSE
    }

    pub fn one(&self) -> Ref {
        Ref::TRUE
    }

    pub fn num_vars(&self) -> u32 {
        self.table.num_vars()
    }

    /// Allocated nodes, terminals included.
    pub fn num_nodes(&self) -> usize {
        self.table.len()
    }

    pub fn num_threads(&self) -> usize {
        self.workers.num_threads()
    }

    pub fn cache(&self) -> &ApplyCache {
        &self.cache
    }

    pub fn variable(&self, node: Ref) -> u32 {
        self.table.variable(node)
    }

    pub fn low(&self, node: Ref) -> Ref {
        self.table.low(node)
    }

    pub fn high(&self, node: Ref) -> Ref {
        self.table.high(node)
    }

    /// Satisfying assignments of the sub-function at `node`, counted from
    /// the node's own variable on. See [`Bdd::solution_count`] for the total
    /// over all declared variables.
    pub fn weight(&self, node: Ref) -> u64 {
        self.table.weight(node)
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::FALSE
    }

    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::TRUE
    }

    pub fn is_terminal(&self, node: Ref) -> bool {
        node.is_terminal()
    }

    /// The unique node `(v, low, high)`, reduced and hash-consed.
    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert!(
            v < self.num_vars(),
            "variable {} out of range (have {})",
            v,
            self.num_vars()
        );
        self.table.make_node(v, low, high)
    }

    /// The function of a single input variable.
    pub fn mk_var(&self, v: u32) -> Ref {
        self.mk_node(v, Ref::FALSE, Ref::TRUE)
    }

    /// Compute `a op b`.
    ///
    /// Canonical: every call with equivalent operands returns the same
    /// handle, independent of thread count. Parallelism is internal; the
    /// recursion forks until the split depth is exhausted and runs
    /// sequentially below that.
    pub fn apply(&self, a: Ref, b: Ref, op: Op) -> Ref {
        assert!(a.is_valid() && b.is_valid(), "apply on the invalid handle");
        debug!("apply({}, {}, {:?})", a, b, op);

        let depth = self.workers.split_depth();
        if depth == 0 {
            self.apply_seq(a, b, op)
        } else {
            self.workers.install(|| self.apply_par(a, b, op, depth))
        }
    }

    pub fn apply_and(&self, a: Ref, b: Ref) -> Ref {
        self.apply(a, b, Op::And)
    }

    pub fn apply_or(&self, a: Ref, b: Ref) -> Ref {
        self.apply(a, b, Op::Or)
    }

    pub fn apply_xor(&self, a: Ref, b: Ref) -> Ref {
        self.apply(a, b, Op::Xor)
    }

    pub fn apply_not(&self, a: Ref) -> Ref {
        self.apply(a, Ref::TRUE, Op::Xor)
    }

    /// Cofactors of `node` (at `var`) with respect to `v`.
    ///
    /// A node above `v` never exists here (the recursion always descends on
    /// the smallest variable), and a node below `v` does not depend on it.
    fn cofactors(&self, node: Ref, var: u32, v: u32) -> (Ref, Ref) {
        if var == v {
            (self.table.low(node), self.table.high(node))
        } else {
            (node, node)
        }
    }

    /// Forking variant of the apply recursion; `depth` is decremented per
    /// level and hands over to [`Bdd::apply_seq`] at zero.
    fn apply_par(&self, a: Ref, b: Ref, op: Op, depth: u32) -> Ref {
        if depth == 0 {
            return self.apply_seq(a, b, op);
        }

        if let Some(r) = self.cache.find(a, b, op) {
            return r;
        }
        if a.is_terminal() && b.is_terminal() {
            return op.terminal(a, b);
        }

        let va = self.table.variable(a);
        let vb = self.table.variable(b);
        let v = va.min(vb);
        let (a0, a1) = self.cofactors(a, va, v);
        let (b0, b1) = self.cofactors(b, vb, v);

        let d = depth - 1;
        let (low, high) = self
            .workers
            .join(|| self.apply_par(a0, b0, op, d), || self.apply_par(a1, b1, op, d));

        let r = self.table.make_node(v, low, high);
        self.cache.insert(a, b, op, r);
        r
    }

    fn apply_seq(&self, a: Ref, b: Ref, op: Op) -> Ref {
        if let Some(r) = self.cache.find(a, b, op) {
            return r;
        }
        if a.is_terminal() && b.is_terminal() {
            return op.terminal(a, b);
        }

        let va = self.table.variable(a);
        let vb = self.table.variable(b);
        let v = va.min(vb);
        let (a0, a1) = self.cofactors(a, va, v);
        let (b0, b1) = self.cofactors(b, vb, v);

        let low = self.apply_seq(a0, b0, op);
        let high = self.apply_seq(a1, b1, op);

        let r = self.table.make_node(v, low, high);
        self.cache.insert(a, b, op, r);
        r
    }

    /// Satisfying assignments of `node` over all declared variables.
    ///
    /// The node's weight covers the variables from its own on; every
    /// variable above the node is free and doubles the count.
    pub fn solution_count(&self, node: Ref) -> BigUint {
        let free = self.table.variable(node).min(self.num_vars());
        BigUint::from(self.weight(node)) << free
    }

    /// Run one assignment through the diagram. `assignment[v]` is the value
    /// of variable `v`.
    pub fn evaluate(&self, node: Ref, assignment: &[bool]) -> bool {
        assert_eq!(
            assignment.len(),
            self.num_vars() as usize,
            "assignment length must match the variable count"
        );
        let mut r = node;
        while !r.is_terminal() {
            let v = self.table.variable(r) as usize;
            r = if assignment[v] {
                self.table.high(r)
            } else {
                self.table.low(r)
            };
        }
        r == Ref::TRUE
    }

    /// All nodes reachable from `roots`, terminals included, in a traversal
    /// order that depends only on the shape of the graph (not on handle
    /// values). Duplicated roots are visited once.
    pub fn descendants(&self, roots: impl IntoIterator<Item = Ref>) -> Vec<Ref> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<Ref> = roots.into_iter().collect();
        stack.reverse();
        while let Some(r) = stack.pop() {
            if !seen.insert(r) {
                continue;
            }
            order.push(r);
            if !r.is_terminal() {
                stack.push(self.table.high(r));
                stack.push(self.table.low(r));
            }
        }
        order
    }

    /// Number of nodes in the sub-graph rooted at `node`.
    pub fn size(&self, node: Ref) -> usize {
        self.descendants([node]).len()
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("num_vars", &self.num_vars())
            .field("num_nodes", &self.num_nodes())
            .field("num_threads", &self.num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn single_threaded(num_vars: u32) -> Bdd {
        Bdd::with_config(num_vars, BddConfig::default().with_threads(1))
    }

    #[test]
    fn test_terminal_op() {
        let bdd = single_threaded(1);
        assert_eq!(bdd.apply_and(bdd.one(), bdd.one()), bdd.one());
        assert_eq!(bdd.apply_and(bdd.one(), bdd.zero()), bdd.zero());
        assert_eq!(bdd.apply_or(bdd.zero(), bdd.one()), bdd.one());
        assert_eq!(bdd.apply_or(bdd.zero(), bdd.zero()), bdd.zero());
        assert_eq!(bdd.apply_xor(bdd.one(), bdd.one()), bdd.zero());
        assert_eq!(bdd.apply_xor(bdd.one(), bdd.zero()), bdd.one());
    }

    #[test]
    fn test_units_and_annihilators() {
        let bdd = single_threaded(3);
        let x = bdd.mk_var(1);
        assert_eq!(bdd.apply_and(x, bdd.zero()), bdd.zero());
        assert_eq!(bdd.apply_and(x, bdd.one()), x);
        assert_eq!(bdd.apply_or(x, bdd.one()), bdd.one());
        assert_eq!(bdd.apply_or(x, bdd.zero()), x);
        assert_eq!(bdd.apply_xor(x, bdd.zero()), x);
        assert_eq!(bdd.apply_xor(x, x), bdd.zero());
    }

    #[test]
    fn test_commutativity() {
        let bdd = single_threaded(2);
        let a = bdd.mk_var(0);
        let b = bdd.mk_var(1);
        assert_eq!(bdd.apply_and(a, b), bdd.apply_and(b, a));
        assert_eq!(bdd.apply_or(a, b), bdd.apply_or(b, a));
        assert_eq!(bdd.apply_xor(a, b), bdd.apply_xor(b, a));
    }

    #[test]
    fn test_double_negation() {
        let bdd = single_threaded(2);
        let a = bdd.mk_var(0);
        let f = bdd.apply_or(a, bdd.mk_var(1));
        assert_eq!(bdd.apply_not(bdd.apply_not(f)), f);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = single_threaded(2);
        let a = bdd.mk_var(0);
        let b = bdd.mk_var(1);
        let lhs = bdd.apply_not(bdd.apply_and(a, b));
        let rhs = bdd.apply_or(bdd.apply_not(a), bdd.apply_not(b));
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_excluded_middle() {
        let bdd = single_threaded(1);
        let x = bdd.mk_var(0);
        let not_x = bdd.apply_not(x);
        assert_eq!(bdd.apply_and(x, not_x), bdd.zero());
        assert_eq!(bdd.apply_or(x, not_x), bdd.one());
    }

    #[test]
    fn test_xor_shape() {
        // a XOR b: root at a, low = b, high = NOT b.
        let bdd = single_threaded(2);
        let a = bdd.mk_var(0);
        let b = bdd.mk_var(1);
        let f = bdd.apply_xor(a, b);
        assert_eq!(bdd.variable(f), 0);
        assert_eq!(bdd.low(f), b);
        let hi = bdd.high(f);
        assert_eq!(bdd.low(hi), bdd.one());
        assert_eq!(bdd.high(hi), bdd.zero());
        assert_eq!(bdd.size(f), 5);
    }

    #[test]
    fn test_solution_counts() {
        let bdd = single_threaded(3);
        let a = bdd.mk_var(0);
        let b = bdd.mk_var(1);
        let c = bdd.mk_var(2);

        assert_eq!(bdd.solution_count(bdd.zero()), 0u32.into());
        assert_eq!(bdd.solution_count(bdd.one()), 8u32.into());
        assert_eq!(bdd.solution_count(a), 4u32.into());
        assert_eq!(bdd.solution_count(c), 4u32.into());

        let ab = bdd.apply_and(a, b);
        assert_eq!(bdd.solution_count(ab), 2u32.into());
        let abc = bdd.apply_and(ab, c);
        assert_eq!(bdd.solution_count(abc), 1u32.into());
        let any = bdd.apply_or(bdd.apply_or(a, b), c);
        assert_eq!(bdd.solution_count(any), 7u32.into());
    }

    #[test]
    fn test_count_matches_exhaustive_evaluation() {
        let bdd = single_threaded(4);
        let v: Vec<Ref> = (0..4).map(|i| bdd.mk_var(i)).collect();
        // (v0 AND v1) XOR (v2 OR NOT v3)
        let left = bdd.apply_and(v[0], v[1]);
        let right = bdd.apply_or(v[2], bdd.apply_not(v[3]));
        let f = bdd.apply_xor(left, right);

        let mut expected = 0u32;
        for bits in 0..16u32 {
            let assignment: Vec<bool> = (0..4).map(|i| bits >> i & 1 == 1).collect();
            if bdd.evaluate(f, &assignment) {
                expected += 1;
            }
        }
        assert_eq!(bdd.solution_count(f), expected.into());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let build = |threads: usize| {
            let bdd = Bdd::with_config(8, BddConfig::default().with_threads(threads));
            let v: Vec<Ref> = (0..8).map(|i| bdd.mk_var(i)).collect();
            let mut f = bdd.zero();
            for pair in v.chunks(2) {
                f = bdd.apply_or(f, bdd.apply_and(pair[0], pair[1]));
            }
            let count = bdd.solution_count(f);
            (bdd.size(f), count)
        };
        assert_eq!(build(1), build(4));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let bdd = Bdd::with_config(
            1000,
            BddConfig::default().with_storage_bits(12).with_threads(1),
        );
        let mut f = bdd.one();
        for v in (0..1000).rev() {
            f = bdd.apply_and(bdd.mk_var(v), f);
        }
        assert_eq!(bdd.weight(f), 1);
        assert_eq!(bdd.size(f), 1002);
    }

    #[test]
    #[should_panic(expected = "apply on the invalid handle")]
    fn test_apply_invalid_handle() {
        let bdd = single_threaded(1);
        bdd.apply_and(Ref::INVALID, bdd.one());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_var_out_of_range() {
        let bdd = single_threaded(2);
        bdd.mk_var(2);
    }

    #[test]
    fn test_zero_variables() {
        let bdd = single_threaded(0);
        assert_eq!(bdd.apply_and(bdd.one(), bdd.one()), bdd.one());
        assert_eq!(bdd.solution_count(bdd.one()), 1u32.into());
        assert_eq!(bdd.num_nodes(), 2);
    }
}
