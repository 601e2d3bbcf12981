// cost_model.rs — Intrinsic per-node instruction costs
//
// Maps each IR node kind to the fixed instruction cost of executing that one
// node at simulation time, scaled by the number of 64-bit words its operands
// occupy. Supplied to the estimator, never owned by it; the estimator treats
// the values as opaque.
//
// Unit costs can be overridden from a JSON file (`--cost-model`); absent
// fields keep their defaults so a partial override tunes one unit at a time.

use serde::{Deserialize, Serialize};

use crate::ir::{BinaryOp, NodeId, NodeKind, Tree};

/// Number of 64-bit words needed to hold a `width`-bit value.
pub fn words(width: u32) -> u32 {
    (width + 63) / 64
}

/// Unit instruction costs. Defaults approximate a scalar in-order core:
/// memory traffic and branches dominate, wide arithmetic scales per word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostModel {
    /// Cost per word of reading a signal or array element.
    pub load: u32,
    /// Cost of a conditional branch.
    pub branch: u32,
    /// Call overhead charged at a call site, on top of the traced body.
    pub call: u32,
    /// Multiply cost per word.
    pub mul_word: u32,
    /// Divide/modulo cost per word.
    pub div_word: u32,
    /// Extra cost of a delayed (non-blocking) assignment's staging write.
    pub delay_write: u32,
    /// Bookkeeping cost of spawning the branches of a fork.
    pub fork_spawn: u32,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            load: 2,
            branch: 4,
            call: 14,
            mul_word: 3,
            div_word: 18,
            delay_write: 3,
            fork_spawn: 6,
        }
    }
}

impl CostModel {
    /// Parse a (possibly partial) JSON override file.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Intrinsic cost of one node, excluding all children.
    ///
    /// Dispatch is an exhaustive match over `NodeKind`: a new kind cannot
    /// silently fall through to a generic rule. Structural kinds are free;
    /// their cost is carried entirely by their children or by special rules
    /// in the estimator.
    pub fn intrinsic(&self, tree: &Tree, id: NodeId) -> u32 {
        let node = tree.node(id);
        match &node.kind {
            NodeKind::Const { .. }
            | NodeKind::Concat { .. }
            | NodeKind::Block { .. }
            | NodeKind::Await { .. }
            | NodeKind::FuncDef { .. }
            | NodeKind::Trigger { .. } => 0,

            NodeKind::SignalRef { .. } => self.load * words(node.width),

            NodeKind::Unop { .. } => words(node.width),

            NodeKind::Binop { op, lhs, rhs } => {
                // Single-bit results still pay for their operand width.
                let w = if op.is_single_bit() {
                    tree.width(*lhs).max(tree.width(*rhs))
                } else {
                    node.width
                };
                match op {
                    BinaryOp::Mul => self.mul_word * words(w),
                    BinaryOp::Div | BinaryOp::Mod => self.div_word * words(w),
                    BinaryOp::Shl | BinaryOp::Shr => words(w) + 1,
                    BinaryOp::LogAnd | BinaryOp::LogOr => self.branch,
                    _ => words(w),
                }
            }

            NodeKind::IndexSel { .. } => self.load * words(node.width),

            NodeKind::RangeSel { .. } => 1 + words(node.width),

            NodeKind::CondExpr { .. } | NodeKind::If { .. } => self.branch,

            NodeKind::Assign { delayed, .. } => {
                words(node.width) + if *delayed { self.delay_write } else { 0 }
            }

            NodeKind::Call { .. } => self.call,

            NodeKind::Fork { .. } => self.fork_spawn,
        }
    }
}

// ── Tests ──
