//! # robdd: parallel reduced ordered binary decision diagrams
//!
//! **`robdd`** compiles boolean formulas into a canonical shared DAG and
//! answers questions about them --- most importantly, how many satisfying
//! assignments a formula has.
//!
//! Formulas arrive as a small script (see [`script`]), get recorded as a
//! linear instruction stream ([`program`]), and are materialized by the
//! [`Bdd`][crate::bdd::Bdd] manager. The manager hash-conses every node, so
//! equivalent formulas end up at the same handle no matter how they were
//! written --- equivalence checking is pointer comparison.
//!
//! ## What makes it fast
//!
//! - **Concurrent hash-consing**: the unique table is an open-addressed
//!   array of handle slots updated by compare-and-swap over an append-only
//!   node arena; no locks on the insertion path.
//! - **Parallel apply**: the Shannon-decomposition recursion forks its two
//!   cofactor calls onto a work-stealing pool up to a bounded depth.
//! - **Computed cache**: a lossy direct-mapped memo table short-circuits
//!   repeated work on shared subgraphs.
//!
//! Results are deterministic: thread count affects wall-clock time, never
//! the produced diagram.
//!
//! ## Basic usage
//!
//! ```rust
//! use robdd::bdd::Bdd;
//!
//! // A manager over three variables.
//! let bdd = Bdd::new(3);
//! let a = bdd.mk_var(0);
//! let b = bdd.mk_var(1);
//! let c = bdd.mk_var(2);
//!
//! // majority(a, b, c)
//! let ab = bdd.apply_and(a, b);
//! let ac = bdd.apply_and(a, c);
//! let bc = bdd.apply_and(b, c);
//! let maj = bdd.apply_or(bdd.apply_or(ab, ac), bc);
//!
//! assert_eq!(bdd.solution_count(maj), 4u32.into());
//! ```
//!
//! ## Core components
//!
//! - [`bdd`]: the manager and the apply engine.
//! - [`table`]: node arena + unique table (the canonicity invariants live
//!   here).
//! - [`cache`]: the computed cache.
//! - [`program`]: instruction stream, recording builder, decoder.
//! - [`script`]: the scripting front-end.
//! - [`dot`]: Graphviz emission.

pub mod bdd;
pub mod cache;
pub mod dot;
pub mod node;
pub mod program;
pub mod reference;
pub mod script;
pub mod table;
pub mod workers;
