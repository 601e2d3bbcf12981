// cost.rs — Static instruction-cost estimation over the simulation IR
//
// Walks a process tree bottom-up, charging each node its intrinsic cost from
// the `CostModel` and summing children, with structural exceptions: selects
// charge only their address operands, conditionals charge the more expensive
// branch, suspension points truncate the remainder of their statement list,
// and calls inline their callee's body cost at the call site.
//
// Preconditions: `tree` is a lowered `ir::Tree`; `marks` was built for this
//                tree by `CostMarks::for_tree` (or `reset` since the last
//                batch of duplicate-checked queries).
// Postconditions: returns the estimated execution cost of the subtree at
//                 `root`; when `dump` is given, appends a pre-order cost
//                 tree in the format described at `estimate`.
// Failure modes: overlapping duplicate-checked queries, a trigger reached by
//                recursion, a routine body reached outside any call, and
//                inconsistent call bookkeeping produce a `CostError`.
// Side effects: records query claims and dump stamps in `marks`.

use std::fmt;
use std::fmt::Write as _;

use crate::cost_model::CostModel;
use crate::ir::{BranchHint, NodeId, NodeKind, Tree};

// ── Errors ──────────────────────────────────────────────────────────────────

/// Fatal faults raised by a cost query. Each names the offending node so the
/// driver can report where in the tree the invariant broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostError {
    /// A duplicate-checked query reached a node already consumed by an
    /// earlier query in the same batch.
    DuplicateClaim { node: NodeId, prior_root: NodeId },
    /// A trigger node was reached by recursion rather than as a query root.
    NestedTrigger { node: NodeId },
    /// A routine body was reached neither through a call nor as a query root.
    StrayRoutine { node: NodeId },
    /// Call bookkeeping out of sync: a traced call did not land on a routine
    /// body, or a body was entered while truncating after a suspension.
    CallNesting { node: NodeId },
}

impl fmt::Display for CostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostError::DuplicateClaim { node, prior_root } => {
                write!(
                    f,
                    "node {node} visited twice in one batch: already claimed by the query rooted at {prior_root}"
                )
            }
            CostError::NestedTrigger { node } => {
                write!(f, "trigger {node} reached by recursion; triggers are costed only as query roots")
            }
            CostError::StrayRoutine { node } => {
                write!(f, "routine body {node} reached outside any call and not as the query root")
            }
            CostError::CallNesting { node } => {
                write!(f, "call bookkeeping out of sync at {node}")
            }
        }
    }
}

impl std::error::Error for CostError {}

// ── Query marks ─────────────────────────────────────────────────────────────

/// Per-node side storage for cost queries: which query root claimed each node
/// (duplicate detection within a batch) and the dump stamp left by the most
/// recent dumping query.
///
/// Claims persist across queries so that a batch of queries over disjoint
/// subtrees can share one value; call `reset` between batches. Stamps are
/// cleared automatically at the start of every dumping query.
#[derive(Debug)]
pub struct CostMarks {
    claims: Vec<Option<NodeId>>,
    stamps: Vec<u32>,
}

impl CostMarks {
    /// Build empty marks sized for `tree`.
    pub fn for_tree(tree: &Tree) -> Self {
        CostMarks {
            claims: vec![None; tree.len()],
            stamps: vec![0; tree.len()],
        }
    }

    /// Forget all claims and stamps, making the marks ready for a fresh
    /// batch of duplicate-checked queries.
    pub fn reset(&mut self) {
        self.claims.fill(None);
        self.stamps.fill(0);
    }

    fn clear_stamps(&mut self) {
        self.stamps.fill(0);
    }

    /// Record `root` as the claimant of `node`. Returns the prior claimant
    /// instead of overwriting when the node is already taken.
    fn claim(&mut self, node: NodeId, root: NodeId) -> Option<NodeId> {
        let slot = &mut self.claims[node.0 as usize];
        match *slot {
            Some(prior) => Some(prior),
            None => {
                *slot = Some(root);
                None
            }
        }
    }

    fn stamp(&self, node: NodeId) -> u32 {
        self.stamps[node.0 as usize]
    }

    fn set_stamp(&mut self, node: NodeId, value: u32) {
        self.stamps[node.0 as usize] = value;
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

/// Estimate the execution cost of the subtree rooted at `root`.
///
/// With `check_duplicates`, every node consumed by this query is claimed in
/// `marks`, and reaching a node claimed by an earlier query in the same
/// batch is a `DuplicateClaim` fault. Nodes inside routine bodies are exempt
/// so that several call sites may share a callee.
///
/// With `dump`, appends one line per costed node in pre-order:
///
/// ```text
///   : cost 7       assign w32 n12
///   :: cost 3      binop + w32 n11
/// ```
///
/// two spaces, one colon per depth level, `cost `, the node's accumulated
/// local cost left-justified to six columns, two spaces, then the node
/// description. A node that contributed nothing (for example the losing
/// branch of a conditional) is omitted together with its whole subtree.
///
/// Preconditions: `marks` was built for `tree`.
/// Postconditions: returns the subtree cost; `marks` carries this query's
///                 claims (when checked) and stamps (when dumped).
/// Failure modes: `CostError` as described on the type.
/// Side effects: mutates `marks`; appends to `dump`.
pub fn estimate(
    tree: &Tree,
    model: &CostModel,
    marks: &mut CostMarks,
    root: NodeId,
    check_duplicates: bool,
    mut dump: Option<&mut String>,
) -> Result<u32, CostError> {
    debug_assert_eq!(marks.claims.len(), tree.len(), "marks built for another tree");
    if dump.is_some() {
        marks.clear_stamps();
    }
    let total = {
        let mut walker = Walker {
            tree,
            model,
            marks,
            root,
            count: 0,
            check_duplicates,
            stamping: dump.is_some(),
            ignore_remaining: false,
            tracing_call: false,
            in_routine: false,
        };
        walker.visit(root)?;
        walker.count
    };
    if let Some(out) = dump.as_deref_mut() {
        let mut depth = 0usize;
        render(tree, marks, root, &mut depth, out);
    }
    Ok(total)
}

// ── Walker ──────────────────────────────────────────────────────────────────

struct Walker<'a> {
    tree: &'a Tree,
    model: &'a CostModel,
    marks: &'a mut CostMarks,
    root: NodeId,
    /// Running cost of the node currently being measured.
    count: u32,
    check_duplicates: bool,
    stamping: bool,
    /// Set by a suspension point: the rest of the enclosing statement list
    /// contributes nothing. Cleared at conditional branch, fork branch, and
    /// routine boundaries.
    ignore_remaining: bool,
    /// Set between visiting a call node and entering its callee's body.
    tracing_call: bool,
    /// Inside a routine body; claims are suspended there so several call
    /// sites can share the callee.
    in_routine: bool,
}

impl Walker<'_> {
    /// Open a node: claim it for this query, park the enclosing running
    /// count, and start fresh from the node's intrinsic cost so the stamp
    /// taken at `end_node` reflects only this subtree.
    fn begin_node(&mut self, id: NodeId) -> Result<u32, CostError> {
        debug_assert!(!self.ignore_remaining, "dispatch must skip nodes once ignoring");
        if self.check_duplicates && !self.in_routine {
            if let Some(prior) = self.marks.claim(id, self.root) {
                return Err(CostError::DuplicateClaim { node: id, prior_root: prior });
            }
        }
        let saved = self.count;
        self.count = self.model.intrinsic(self.tree, id);
        Ok(saved)
    }

    /// Close a node: stamp its accumulated local cost and fold the parked
    /// enclosing count back in, unless a suspension point inside this
    /// subtree discarded the remainder.
    fn end_node(&mut self, id: NodeId, saved: u32) {
        self.stamp_running(id);
        if !self.ignore_remaining {
            self.count = self.count.saturating_add(saved);
        }
    }

    /// Stamps are biased by one so that zero means "never costed".
    fn stamp_running(&mut self, id: NodeId) {
        if self.stamping {
            self.marks.set_stamp(id, self.count.saturating_add(1));
        }
    }

    fn unstamp(&mut self, id: NodeId) {
        if self.stamping {
            self.marks.set_stamp(id, 0);
        }
    }

    /// Start measuring an alternative: branches of a conditional or a fork
    /// are costed in isolation, and a suspension in one alternative does not
    /// bleed into the next.
    fn reset_measure(&mut self) {
        self.count = 0;
        self.ignore_remaining = false;
    }

    fn visit_list(&mut self, stmts: &[NodeId]) -> Result<(), CostError> {
        for &s in stmts {
            self.visit(s)?;
        }
        Ok(())
    }

    fn visit(&mut self, id: NodeId) -> Result<(), CostError> {
        let tree = self.tree;
        match tree.kind(id) {
            // Address arithmetic is the only runtime work in an element
            // select; the base designates storage and is free.
            NodeKind::IndexSel { base: _, index } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.visit(*index)?;
                self.end_node(id, saved);
            }
            NodeKind::RangeSel { base: _, lsb, width } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.visit(*lsb)?;
                self.visit(*width)?;
                self.end_node(id, saved);
            }
            // Concatenation is free and transparent: operands accumulate
            // straight into the enclosing count, so chains stay linear.
            NodeKind::Concat { parts } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                for &p in parts {
                    self.visit(p)?;
                }
                self.stamp_running(id);
            }
            NodeKind::If { cond, then_stmts, else_stmts, hint } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.visit(*cond)?;
                let before_branches = self.count;
                self.reset_measure();
                self.visit_list(then_stmts)?;
                let then_cost = if *hint == BranchHint::Unlikely { 0 } else { self.count };
                self.reset_measure();
                self.visit_list(else_stmts)?;
                let else_cost = if *hint == BranchHint::Likely { 0 } else { self.count };
                self.reset_measure();
                if then_cost >= else_cost {
                    self.count = before_branches.saturating_add(then_cost);
                    for &s in else_stmts {
                        self.unstamp(s);
                    }
                } else {
                    self.count = before_branches.saturating_add(else_cost);
                    for &s in then_stmts {
                        self.unstamp(s);
                    }
                }
                self.end_node(id, saved);
            }
            NodeKind::CondExpr { cond, then_expr, else_expr, hint } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let (then_expr, else_expr) = (*then_expr, *else_expr);
                let saved = self.begin_node(id)?;
                self.visit(*cond)?;
                let before_branches = self.count;
                self.reset_measure();
                self.visit(then_expr)?;
                let then_cost = if *hint == BranchHint::Unlikely { 0 } else { self.count };
                self.reset_measure();
                self.visit(else_expr)?;
                let else_cost = if *hint == BranchHint::Likely { 0 } else { self.count };
                self.reset_measure();
                if then_cost >= else_cost {
                    self.count = before_branches.saturating_add(then_cost);
                    self.unstamp(else_expr);
                } else {
                    self.count = before_branches.saturating_add(else_cost);
                    self.unstamp(then_expr);
                }
                self.end_node(id, saved);
            }
            // A suspension point costs only its wake condition; whatever
            // follows it in the enclosing statement list runs in a later
            // activation and is not this activation's cost.
            NodeKind::Await { expr } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                self.visit(*expr)?;
                self.ignore_remaining = true;
            }
            NodeKind::Fork { branches } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                let mut total = self.count;
                for &b in branches {
                    self.reset_measure();
                    self.visit(b)?;
                    total = total.saturating_add(self.count);
                }
                self.count = total;
                self.ignore_remaining = false;
                self.end_node(id, saved);
            }
            // Triggers are costed only as query roots by the partitioner;
            // reaching one by recursion would double-count its statements.
            NodeKind::Trigger { .. } => {
                self.stamp_running(id);
                if id != self.root {
                    return Err(CostError::NestedTrigger { node: id });
                }
            }
            NodeKind::Call { func, args, .. } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let func = *func;
                let saved = self.begin_node(id)?;
                self.visit_list(args)?;
                self.tracing_call = true;
                self.visit(func)?;
                if self.tracing_call {
                    return Err(CostError::CallNesting { node: id });
                }
                self.end_node(id, saved);
            }
            NodeKind::FuncDef { stmts, .. } => {
                if !self.tracing_call && id != self.root {
                    return Err(CostError::StrayRoutine { node: id });
                }
                if self.ignore_remaining {
                    return Err(CostError::CallNesting { node: id });
                }
                self.tracing_call = false;
                let was_in_routine = self.in_routine;
                self.in_routine = true;
                let saved = self.begin_node(id)?;
                self.visit_list(stmts)?;
                self.end_node(id, saved);
                self.in_routine = was_in_routine;
                // A body ending in a suspension truncates only the body;
                // the caller's statement list resumes counting.
                self.ignore_remaining = false;
            }
            NodeKind::Const { .. } | NodeKind::SignalRef { .. } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.end_node(id, saved);
            }
            NodeKind::Unop { operand, .. } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.visit(*operand)?;
                self.end_node(id, saved);
            }
            NodeKind::Binop { lhs, rhs, .. } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.visit(*lhs)?;
                self.visit(*rhs)?;
                self.end_node(id, saved);
            }
            NodeKind::Assign { lhs, rhs, .. } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.visit(*rhs)?;
                self.visit(*lhs)?;
                self.end_node(id, saved);
            }
            NodeKind::Block { stmts } => {
                if self.ignore_remaining {
                    return Ok(());
                }
                let saved = self.begin_node(id)?;
                self.visit_list(stmts)?;
                self.end_node(id, saved);
            }
        }
        Ok(())
    }
}

// ── Cost-tree dump ──────────────────────────────────────────────────────────

fn render(tree: &Tree, marks: &CostMarks, id: NodeId, depth: &mut usize, out: &mut String) {
    *depth += 1;
    let stamp = marks.stamp(id);
    if stamp != 0 {
        let _ = writeln!(
            out,
            "  {} cost {:<6}  {}",
            ":".repeat(*depth),
            stamp - 1,
            tree.display_node(id)
        );
        for child in dump_children(tree, id) {
            render(tree, marks, child, depth, out);
        }
    }
    *depth -= 1;
}

/// Structural children in source order, for dump traversal. The callee link
/// of a call is a cross-reference, not a child; its body is not printed
/// under the call site.
fn dump_children(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    match tree.kind(id) {
        NodeKind::Const { .. } | NodeKind::SignalRef { .. } => Vec::new(),
        NodeKind::Unop { operand, .. } => vec![*operand],
        NodeKind::Binop { lhs, rhs, .. } => vec![*lhs, *rhs],
        NodeKind::IndexSel { base, index } => vec![*base, *index],
        NodeKind::RangeSel { base, lsb, width } => vec![*base, *lsb, *width],
        NodeKind::Concat { parts } => parts.clone(),
        NodeKind::CondExpr { cond, then_expr, else_expr, .. } => {
            vec![*cond, *then_expr, *else_expr]
        }
        NodeKind::Assign { lhs, rhs, .. } => vec![*rhs, *lhs],
        NodeKind::Block { stmts } => stmts.clone(),
        NodeKind::If { cond, then_stmts, else_stmts, .. } => {
            let mut out = vec![*cond];
            out.extend_from_slice(then_stmts);
            out.extend_from_slice(else_stmts);
            out
        }
        NodeKind::Await { expr } => vec![*expr],
        NodeKind::Fork { branches } => branches.clone(),
        NodeKind::Call { args, .. } => args.clone(),
        NodeKind::FuncDef { stmts, .. } => stmts.clone(),
        NodeKind::Trigger { stmts, .. } => stmts.clone(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
