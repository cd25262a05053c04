//! Graphviz emission.
//!
//! Nodes are numbered by traversal order from the roots, not by handle
//! value, so the emitted text depends only on the shape of the graph: the
//! same formulas produce byte-identical output regardless of how many
//! worker threads built them.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::bdd::Bdd;
use crate::reference::Ref;

/// Render `roots` and everything below them.
///
/// `high` edges are solid, `low` edges dotted. Terminals are the square
/// boxes `0` and `1`; every root is a filled box labeled with its name and
/// solution count. `inputs` supplies variable names (falling back to `x<v>`).
pub fn to_dot(
    bdd: &Bdd,
    roots: &[(String, Ref)],
    inputs: &[String],
    title: Option<&str>,
) -> Result<String, std::fmt::Error> {
    let mut dot = String::new();
    writeln!(dot, "digraph robdd {{")?;
    if let Some(title) = title {
        writeln!(dot, "labelloc=\"t\";")?;
        writeln!(dot, "label=\"{}\";", escape(title))?;
    }
    writeln!(dot, "node [shape=circle, fixedsize=true];")?;

    // Terminals
    writeln!(dot, "{{ rank=sink")?;
    writeln!(dot, "n0 [shape=square, label=\"0\"];")?;
    writeln!(dot, "n1 [shape=square, label=\"1\"];")?;
    writeln!(dot, "}}")?;

    // Canonical numbering by traversal order.
    let inner: Vec<Ref> = bdd
        .descendants(roots.iter().map(|(_, r)| *r))
        .into_iter()
        .filter(|r| !r.is_terminal())
        .collect();
    let mut ids = HashMap::new();
    ids.insert(Ref::FALSE, 0usize);
    ids.insert(Ref::TRUE, 1usize);
    for (i, &r) in inner.iter().enumerate() {
        ids.insert(r, i + 2);
    }

    // Nodes, one rank group per variable
    let mut levels = BTreeMap::<u32, Vec<Ref>>::new();
    for &r in &inner {
        levels.entry(bdd.variable(r)).or_default().push(r);
    }
    for (&v, nodes) in &levels {
        let label = match inputs.get(v as usize) {
            Some(name) => escape(name),
            None => format!("x{}", v),
        };
        writeln!(dot, "{{ rank=same")?;
        for &r in nodes {
            writeln!(dot, "n{} [label=\"{}\"];", ids[&r], label)?;
        }
        writeln!(dot, "}}")?;
    }

    // Edges
    for &r in &inner {
        writeln!(dot, "n{} -> n{};", ids[&r], ids[&bdd.high(r)])?;
        writeln!(dot, "n{} -> n{} [style=dotted];", ids[&r], ids[&bdd.low(r)])?;
    }

    // Roots
    writeln!(dot, "{{ rank=source")?;
    for (i, (name, r)) in roots.iter().enumerate() {
        writeln!(
            dot,
            "r{} [shape=rect, style=filled, label=\"{}\\n{}\"];",
            i,
            escape(name),
            bdd.solution_count(*r)
        )?;
    }
    writeln!(dot, "}}")?;
    for (i, (_, r)) in roots.iter().enumerate() {
        writeln!(dot, "r{} -> n{};", i, ids[r])?;
    }

    writeln!(dot, "}}")?;
    Ok(dot)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
