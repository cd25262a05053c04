//! Linear instruction stream and its decoder.
//!
//! The scripting front-end records what the user did as a flat program of
//! tagged instructions; [`decode`] replays that program against a [`Bdd`]
//! manager, materializing one handle per instruction. Ids are dense:
//! `0` and `1` are pre-bound to the constants, user ids start at `2`.

use std::collections::HashMap;

use log::debug;

use crate::bdd::{Bdd, Op};
use crate::reference::Ref;

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// Declare a fresh input. `variable` is the position in the BDD
    /// ordering, assigned in declaration order starting at 0.
    NewInput { dst: usize, variable: u32, name: String },
    And { dst: usize, a: usize, b: usize },
    Or { dst: usize, a: usize, b: usize },
    Xor { dst: usize, a: usize, b: usize },
    Not { dst: usize, src: usize },
}

/// A named root to report after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSpec {
    pub id: usize,
    pub name: String,
}

/// A complete recorded program, ready to decode.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instrs: Vec<Instr>,
    /// Input names, indexed by variable.
    pub inputs: Vec<String>,
    /// One past the largest assigned id.
    pub next_id: usize,
    /// Roots to report, in declaration order.
    pub roots: Vec<RootSpec>,
    pub title: Option<String>,
}

impl Program {
    pub fn num_inputs(&self) -> u32 {
        self.inputs.len() as u32
    }
}

/// Records instructions and hands out ids.
///
/// This is the front-end's only door into the stream: the scripting layer
/// threads a `Builder` value through its callbacks instead of touching any
/// process-wide state.
#[derive(Debug)]
pub struct Builder {
    instrs: Vec<Instr>,
    inputs: Vec<String>,
    input_ids: HashMap<String, usize>,
    next_id: usize,
    roots: Vec<RootSpec>,
    title: Option<String>,
}

impl Builder {
    /// Id pre-bound to the `false` constant.
    pub const FALSE_ID: usize = 0;
    /// Id pre-bound to the `true` constant.
    pub const TRUE_ID: usize = 1;

    pub fn new() -> Self {
        Self {
            instrs: Vec::new(),
            inputs: Vec::new(),
            input_ids: HashMap::new(),
            next_id: 2,
            roots: Vec::new(),
            title: None,
        }
    }

    fn fresh(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Look up an input by name, declaring it on first use.
    pub fn input(&mut self, name: &str) -> usize {
        if let Some(&id) = self.input_ids.get(name) {
            return id;
        }
        let variable = self.inputs.len() as u32;
        let dst = self.fresh();
        self.inputs.push(name.to_string());
        self.input_ids.insert(name.to_string(), dst);
        self.instrs.push(Instr::NewInput {
            dst,
            variable,
            name: name.to_string(),
        });
        dst
    }

    pub fn and(&mut self, a: usize, b: usize) -> usize {
        let dst = self.fresh();
        self.instrs.push(Instr::And { dst, a, b });
        dst
    }

    pub fn or(&mut self, a: usize, b: usize) -> usize {
        let dst = self.fresh();
        self.instrs.push(Instr::Or { dst, a, b });
        dst
    }

    pub fn xor(&mut self, a: usize, b: usize) -> usize {
        let dst = self.fresh();
        self.instrs.push(Instr::Xor { dst, a, b });
        dst
    }

    pub fn not(&mut self, src: usize) -> usize {
        let dst = self.fresh();
        self.instrs.push(Instr::Not { dst, src });
        dst
    }

    /// Bind a root name to an id; rebinding replaces the previous id and
    /// keeps the original position.
    pub fn set_output(&mut self, name: &str, id: usize) {
        if let Some(root) = self.roots.iter_mut().find(|r| r.name == name) {
            root.id = id;
        } else {
            self.roots.push(RootSpec {
                id,
                name: name.to_string(),
            });
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    pub fn finish(self) -> Program {
        Program {
            instrs: self.instrs,
            inputs: self.inputs,
            next_id: self.next_id,
            roots: self.roots,
            title: self.title,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute `program` in order against `bdd` and return the handle for every
/// root, in root order.
///
/// Instructions run sequentially; parallelism lives inside each `apply`.
///
/// # Panics
///
/// Out-of-range and not-yet-assigned operand ids are front-end bugs and
/// panic, as does node pool exhaustion inside the manager.
pub fn decode(bdd: &Bdd, program: &Program) -> Vec<(String, Ref)> {
    let mut id2node: Vec<Ref> = vec![Ref::INVALID; program.next_id.max(2)];
    id2node[Builder::FALSE_ID] = Ref::FALSE;
    id2node[Builder::TRUE_ID] = Ref::TRUE;

    fn fetch(id2node: &[Ref], id: usize) -> Ref {
        let r = *id2node
            .get(id)
            .unwrap_or_else(|| panic!("instruction operand {} out of range", id));
        assert!(r.is_valid(), "instruction operand {} used before assignment", id);
        r
    }

    for instr in &program.instrs {
        let (dst, node) = match *instr {
            Instr::NewInput {
                dst,
                variable,
                ref name,
            } => {
                debug!("decode: {} = input {} (x{})", dst, name, variable);
                (dst, bdd.mk_var(variable))
            }
            Instr::And { dst, a, b } => {
                debug!("decode: {} = {} AND {}", dst, a, b);
                (dst, bdd.apply(fetch(&id2node, a), fetch(&id2node, b), Op::And))
            }
            Instr::Or { dst, a, b } => {
                debug!("decode: {} = {} OR {}", dst, a, b);
                (dst, bdd.apply(fetch(&id2node, a), fetch(&id2node, b), Op::Or))
            }
            Instr::Xor { dst, a, b } => {
                debug!("decode: {} = {} XOR {}", dst, a, b);
                (dst, bdd.apply(fetch(&id2node, a), fetch(&id2node, b), Op::Xor))
            }
            Instr::Not { dst, src } => {
                debug!("decode: {} = NOT {}", dst, src);
                (dst, bdd.apply(fetch(&id2node, src), Ref::TRUE, Op::Xor))
            }
        };
        assert!(dst < id2node.len(), "instruction destination {} out of range", dst);
        id2node[dst] = node;
    }

    program
        .roots
        .iter()
        .map(|root| (root.name.clone(), fetch(&id2node, root.id)))
        .collect()
}
