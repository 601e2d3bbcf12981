// ir.rs — Simulation IR: the lowered process tree
//
// One arena `Tree` per design holds every process, routine body, and
// expression as `Node`s addressed by `NodeId`. The cost passes walk this
// tree read-only; only the lowering pass ever builds or reshapes it.

use std::fmt;

pub use crate::ast::{BinaryOp, BranchHint, EdgeKind, Span, UnaryOp};

// ── Ids ─────────────────────────────────────────────────────────────────────

/// Index of a node in the design's `Tree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcId(pub u32);

// ── Sensitivity ─────────────────────────────────────────────────────────────

/// One entry of a trigger's sensitivity list, with the watched signal
/// resolved to its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sense {
    pub edge: EdgeKind,
    pub signal: SignalId,
}

// ── Nodes ───────────────────────────────────────────────────────────────────

/// Node payload. Child references are `NodeId`s into the owning `Tree`;
/// statement sequences are ordered `Vec`s.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Integer literal.
    Const { value: u64 },
    /// Read of a declared signal. `name` is retained for diagnostics output.
    SignalRef { signal: SignalId, name: String },
    Unop { op: UnaryOp, operand: NodeId },
    Binop { op: BinaryOp, lhs: NodeId, rhs: NodeId },
    /// Element read `base[index]`. The base is deliberately not a cost child.
    IndexSel { base: NodeId, index: NodeId },
    /// Bit slice `base[lsb +: width]`. Offset and width are cost children,
    /// the sliced source is not.
    RangeSel { base: NodeId, lsb: NodeId, width: NodeId },
    /// Bit concatenation `{a, b, ...}`, widths summed.
    Concat { parts: Vec<NodeId> },
    /// Ternary `cond ? then : else`.
    CondExpr {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
        hint: BranchHint,
    },
    /// `lhs = rhs` (blocking) or `lhs <= rhs` (delayed).
    Assign {
        lhs: NodeId,
        rhs: NodeId,
        delayed: bool,
    },
    Block { stmts: Vec<NodeId> },
    If {
        cond: NodeId,
        then_stmts: Vec<NodeId>,
        else_stmts: Vec<NodeId>,
        hint: BranchHint,
    },
    /// Suspension point: control may not resume deterministically past here
    /// within one activation.
    Await { expr: NodeId },
    /// Parallel block; each branch is a statement (usually a `Block`).
    Fork { branches: Vec<NodeId> },
    /// Call of a routine; `func` links to the callee's `FuncDef` node.
    Call {
        func: NodeId,
        callee: FuncId,
        name: String,
        args: Vec<NodeId>,
    },
    /// Routine body. Reached through `Call::func` links, never by sequence.
    FuncDef {
        func: FuncId,
        name: String,
        stmts: Vec<NodeId>,
    },
    /// Scheduling trigger: activation root of one process.
    Trigger {
        proc: ProcId,
        name: String,
        senses: Vec<Sense>,
        stmts: Vec<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Result width in bits; 0 for kinds with no natural width.
    pub width: u32,
    pub span: Span,
}

// ── Tree arena ──────────────────────────────────────────────────────────────

/// Arena of IR nodes. Built once by lowering, then read-only.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append a node and return its id.
    pub fn add(&mut self, kind: NodeKind, width: u32, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            kind,
            width,
            span,
        });
        id
    }

    /// Replace a node's payload in place. Lowering pre-allocates routine
    /// definition nodes so call sites can link forward, then fills the
    /// bodies through this.
    pub(crate) fn patch(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.0 as usize].kind = kind;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0 as usize].kind
    }

    pub fn width(&self, id: NodeId) -> u32 {
        self.nodes[id.0 as usize].width
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0 as usize].span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Short one-line description of a node for dumps and diagnostics.
    pub fn display_node(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { tree: self, id }
    }
}

/// Render helper returned by [`Tree::display_node`].
pub struct NodeDisplay<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.tree.node(self.id);
        match &node.kind {
            NodeKind::Const { value } => write!(f, "const {value}")?,
            NodeKind::SignalRef { name, .. } => write!(f, "sig {name}")?,
            NodeKind::Unop { op, .. } => write!(f, "unop {op}")?,
            NodeKind::Binop { op, .. } => write!(f, "binop {op}")?,
            NodeKind::IndexSel { .. } => write!(f, "indexsel")?,
            NodeKind::RangeSel { .. } => write!(f, "rangesel")?,
            NodeKind::Concat { .. } => write!(f, "concat")?,
            NodeKind::CondExpr { .. } => write!(f, "condexpr")?,
            NodeKind::Assign { delayed: true, .. } => write!(f, "assigndly")?,
            NodeKind::Assign { delayed: false, .. } => write!(f, "assign")?,
            NodeKind::Block { .. } => write!(f, "block")?,
            NodeKind::If { .. } => write!(f, "if")?,
            NodeKind::Await { .. } => write!(f, "await")?,
            NodeKind::Fork { .. } => write!(f, "fork")?,
            NodeKind::Call { name, .. } => write!(f, "call {name}")?,
            NodeKind::FuncDef { name, .. } => write!(f, "func {name}")?,
            NodeKind::Trigger { name, .. } => write!(f, "trigger {name}")?,
        }
        if node.width > 0 {
            write!(f, " w{}", node.width)?;
        }
        write!(f, " {}", node.id)
    }
}

// ── Design ──────────────────────────────────────────────────────────────────

/// A declared signal. `depth` is `Some(n)` for array signals.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub id: SignalId,
    pub name: String,
    pub width: u32,
    pub depth: Option<u32>,
    pub span: Span,
}

/// A routine: name, parameters (name, width), and its `FuncDef` node.
#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub id: FuncId,
    pub name: String,
    pub params: Vec<(String, u32)>,
    pub def: NodeId,
    pub span: Span,
}

/// A triggered process and its `Trigger` root node.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub id: ProcId,
    pub name: String,
    pub trigger: NodeId,
    pub span: Span,
}

/// The lowered design: one tree plus the symbol tables that index into it.
#[derive(Debug, Clone, Default)]
pub struct Design {
    pub tree: Tree,
    pub signals: Vec<Signal>,
    pub funcs: Vec<Func>,
    pub processes: Vec<Process>,
}

impl Design {
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.0 as usize]
    }

    pub fn func(&self, id: FuncId) -> &Func {
        &self.funcs[id.0 as usize]
    }

    pub fn process(&self, id: ProcId) -> &Process {
        &self.processes[id.0 as usize]
    }
}

// ── Tests ──
