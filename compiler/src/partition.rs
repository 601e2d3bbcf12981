// partition.rs — Lane assignment for costed process work units
//
// Splits a lowered design into schedulable work units (one per process
// trigger and one per top-level statement beneath it), costs every unit in
// a single duplicate-checked estimator batch, and packs the units onto
// execution lanes by longest-processing-time greedy placement.
//
// Preconditions: `design` is a lowered `ir::Design`; process roots are
//                trigger nodes and routine calls are acyclic.
// Postconditions: returns `PartitionResult` with a plan assigning every
//                 unit to exactly one lane.
// Failure modes: an estimator fault or a zero lane count produce
//                `Diagnostic` entries and no plan.
// Side effects: none.

use std::fmt;

use chumsky::span::Span as _;

use crate::ast::Span;
use crate::cost::{estimate, CostError, CostMarks};
use crate::cost_model::CostModel;
use crate::diag::codes;
use crate::diag::{DiagCode, DiagLevel, Diagnostic};
use crate::ir::{Design, NodeId, NodeKind, ProcId, Tree};

// ── Public types ────────────────────────────────────────────────────────────

/// A schedulable unit of work: one process trigger, or one top-level
/// statement of a process body.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Process this unit belongs to.
    pub process: ProcId,
    /// Subtree costed for this unit.
    pub root: NodeId,
    /// Estimated execution cost of the subtree.
    pub cost: u32,
    /// Display label: the process name, with `#n` appended for the n-th
    /// body statement.
    pub label: String,
}

/// One execution lane of the plan.
#[derive(Debug, Clone)]
pub struct Lane {
    /// Indices into `PartitionPlan::units`, heaviest first.
    pub units: Vec<usize>,
    /// Summed cost of the lane's units.
    pub total: u64,
}

/// A complete lane assignment for a design.
#[derive(Debug, Clone)]
pub struct PartitionPlan {
    pub units: Vec<WorkUnit>,
    pub lanes: Vec<Lane>,
}

/// Result of partitioning.
#[derive(Debug)]
pub struct PartitionResult {
    pub plan: Option<PartitionPlan>,
    /// Postcondition evidence; absent when no plan was built at all.
    pub cert: Option<PartitionCert>,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Verification ────────────────────────────────────────────────────────────

/// Machine-checkable evidence for pass postconditions.
pub trait StageCert {
    fn all_pass(&self) -> bool;
    fn obligations(&self) -> Vec<(&'static str, bool)>;
}

/// Evidence for partition postconditions (P1-P3).
#[derive(Debug, Clone)]
pub struct PartitionCert {
    /// P1: every unit is assigned to exactly one lane.
    pub p1_units_assigned_once: bool,
    /// P2: the plan has exactly the requested number of lanes.
    pub p2_lane_count: bool,
    /// P3: lane totals conserve the summed unit costs.
    pub p3_cost_conserved: bool,
}

impl StageCert for PartitionCert {
    fn all_pass(&self) -> bool {
        self.p1_units_assigned_once && self.p2_lane_count && self.p3_cost_conserved
    }

    fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("P1_units_assigned_once", self.p1_units_assigned_once),
            ("P2_lane_count", self.p2_lane_count),
            ("P3_cost_conserved", self.p3_cost_conserved),
        ]
    }
}

/// Verify partition postconditions against the requested lane count.
pub fn verify_partition(plan: &PartitionPlan, requested_lanes: usize) -> PartitionCert {
    PartitionCert {
        p1_units_assigned_once: verify_p1_units_assigned_once(plan),
        p2_lane_count: plan.lanes.len() == requested_lanes,
        p3_cost_conserved: verify_p3_cost_conserved(plan),
    }
}

/// P1: each unit index appears exactly once across all lanes.
fn verify_p1_units_assigned_once(plan: &PartitionPlan) -> bool {
    let mut seen = vec![false; plan.units.len()];
    let mut assigned = 0usize;
    for lane in &plan.lanes {
        for &u in &lane.units {
            if u >= seen.len() || seen[u] {
                return false;
            }
            seen[u] = true;
            assigned += 1;
        }
    }
    assigned == plan.units.len()
}

/// P3: per-lane totals match their units, and the grand total matches the
/// unit list.
fn verify_p3_cost_conserved(plan: &PartitionPlan) -> bool {
    let mut grand: u64 = 0;
    for lane in &plan.lanes {
        let lane_sum: u64 = lane
            .units
            .iter()
            .map(|&u| u64::from(plan.units[u].cost))
            .sum();
        if lane_sum != lane.total {
            return false;
        }
        grand += lane_sum;
    }
    grand
        == plan
            .units
            .iter()
            .map(|u| u64::from(u.cost))
            .sum::<u64>()
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Partition a design's work units onto `lanes` execution lanes.
pub fn partition(design: &Design, model: &CostModel, lanes: usize) -> PartitionResult {
    let mut ctx = PartitionCtx::new(design, model);
    let plan = ctx.partition_design(lanes);
    ctx.build_result(plan)
}

// ── Internal context ────────────────────────────────────────────────────────

struct PartitionCtx<'a> {
    design: &'a Design,
    model: &'a CostModel,
    diagnostics: Vec<Diagnostic>,
    cert: Option<PartitionCert>,
}

impl<'a> PartitionCtx<'a> {
    fn new(design: &'a Design, model: &'a CostModel) -> Self {
        PartitionCtx {
            design,
            model,
            diagnostics: Vec::new(),
            cert: None,
        }
    }

    fn error(&mut self, code: DiagCode, span: Span, message: String) {
        self.diagnostics
            .push(Diagnostic::new(DiagLevel::Error, span, message).with_code(code));
    }

    fn build_result(self, plan: Option<PartitionPlan>) -> PartitionResult {
        let has_errors = self
            .diagnostics
            .iter()
            .any(|d| d.level == DiagLevel::Error);
        PartitionResult {
            plan: if has_errors { None } else { plan },
            cert: self.cert,
            diagnostics: self.diagnostics,
        }
    }

    fn partition_design(&mut self, lanes: usize) -> Option<PartitionPlan> {
        if lanes == 0 {
            self.error(
                codes::E0301,
                Span::new((), 0..0),
                "cannot partition onto zero lanes".to_string(),
            );
            return None;
        }
        let units = self.collect_units()?;
        let plan = assign_lanes(units, lanes);

        let cert = verify_partition(&plan, lanes);
        if !cert.all_pass() {
            let failing: Vec<&str> = cert
                .obligations()
                .into_iter()
                .filter(|&(_, ok)| !ok)
                .map(|(name, _)| name)
                .collect();
            self.error(
                codes::E0601,
                Span::new((), 0..0),
                format!("partition verification failed: {}", failing.join(", ")),
            );
        }
        self.cert = Some(cert);
        Some(plan)
    }

    // ── Unit collection ─────────────────────────────────────────────────

    /// Cost every process trigger and every top-level statement in one
    /// duplicate-checked estimator batch. The units are disjoint subtrees
    /// by construction, and the claim guard turns any overlap into a fault.
    fn collect_units(&mut self) -> Option<Vec<WorkUnit>> {
        let design = self.design;
        let model = self.model;
        let tree = &design.tree;
        let mut marks = CostMarks::for_tree(tree);
        let mut units = Vec::new();

        for process in &design.processes {
            // The trigger itself: costed as a query root, contributes no work.
            let cost = match estimate(tree, model, &mut marks, process.trigger, true, None) {
                Ok(c) => c,
                Err(err) => {
                    self.report_fault(tree, &err);
                    return None;
                }
            };
            units.push(WorkUnit {
                process: process.id,
                root: process.trigger,
                cost,
                label: process.name.clone(),
            });

            let NodeKind::Trigger { stmts, .. } = tree.kind(process.trigger) else {
                // Lowering roots every process at a trigger node.
                continue;
            };
            for (index, &stmt) in stmts.iter().enumerate() {
                let cost = match estimate(tree, model, &mut marks, stmt, true, None) {
                    Ok(c) => c,
                    Err(err) => {
                        self.report_fault(tree, &err);
                        return None;
                    }
                };
                units.push(WorkUnit {
                    process: process.id,
                    root: stmt,
                    cost,
                    label: format!("{}#{}", process.name, index),
                });
            }
        }
        Some(units)
    }

    fn report_fault(&mut self, tree: &Tree, err: &CostError) {
        let node = match err {
            CostError::DuplicateClaim { node, .. }
            | CostError::NestedTrigger { node }
            | CostError::StrayRoutine { node }
            | CostError::CallNesting { node } => *node,
        };
        self.error(
            codes::E0302,
            tree.span(node),
            format!("cost estimation failed: {err}"),
        );
    }
}

// ── Lane assignment ─────────────────────────────────────────────────────────

/// Longest-processing-time greedy placement: take units in descending cost
/// order and drop each onto the lightest lane. Equal costs keep collection
/// order and ties between lanes pick the lowest index, so the plan is
/// deterministic.
fn assign_lanes(units: Vec<WorkUnit>, lanes: usize) -> PartitionPlan {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by(|&a, &b| units[b].cost.cmp(&units[a].cost).then(a.cmp(&b)));

    let mut lane_units: Vec<Vec<usize>> = vec![Vec::new(); lanes];
    let mut totals: Vec<u64> = vec![0; lanes];
    for u in order {
        let mut lightest = 0usize;
        for l in 1..lanes {
            if totals[l] < totals[lightest] {
                lightest = l;
            }
        }
        lane_units[lightest].push(u);
        totals[lightest] += u64::from(units[u].cost);
    }

    let lanes = lane_units
        .into_iter()
        .zip(totals)
        .map(|(units, total)| Lane { units, total })
        .collect();
    PartitionPlan { units, lanes }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for PartitionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PartitionPlan ({} units over {} lanes)",
            self.units.len(),
            self.lanes.len()
        )?;
        for (i, lane) in self.lanes.iter().enumerate() {
            writeln!(f, "  lane {i} (total {}):", lane.total)?;
            for &u in &lane.units {
                let unit = &self.units[u];
                writeln!(f, "    {}: cost {} ({})", unit.label, unit.cost, unit.root)?;
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Process, SignalId};

    fn sp() -> Span {
        Span::new((), 0..0)
    }

    fn partition_source(source: &str, lanes: usize) -> PartitionResult {
        let parse_result = crate::parser::parse(source);
        assert!(
            parse_result.errors.is_empty(),
            "parse errors: {:?}",
            parse_result.errors
        );
        let design_ast = parse_result.design.expect("parse failed");
        let lower_result = crate::lower::lower(&design_ast);
        assert!(
            lower_result
                .diagnostics
                .iter()
                .all(|d| d.level != DiagLevel::Error),
            "lower errors: {:#?}",
            lower_result.diagnostics
        );
        let design = lower_result.design.expect("lowering failed");
        partition(&design, &CostModel::default(), lanes)
    }

    fn partition_ok(source: &str, lanes: usize) -> PartitionPlan {
        let result = partition_source(source, lanes);
        let errors: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagLevel::Error)
            .collect();
        assert!(errors.is_empty(), "unexpected partition errors: {:#?}", errors);
        result.plan.expect("expected a plan")
    }

    const TWO_PROCESSES: &str = "signal clk: bit;\n\
        signal a: bit<64>;\n\
        signal b: bit<64>;\n\
        signal y: bit<64>;\n\
        signal c: bit;\n\
        signal d: bit;\n\
        process heavy on posedge(clk) {\n\
          y = a / b;\n\
        }\n\
        process light on posedge(clk) {\n\
          c = d;\n\
        }";

    // ── Unit collection ─────────────────────────────────────────────────

    #[test]
    fn one_unit_per_trigger_and_statement() {
        let plan = partition_ok(
            "signal clk: bit;\nsignal a: bit;\nsignal b: bit;\nprocess p on posedge(clk) {\n  a = 1;\n  b = 1;\n  a = b;\n}",
            2,
        );
        assert_eq!(plan.units.len(), 4, "one trigger unit plus three statements");
        assert_eq!(plan.units[0].label, "p");
        assert_eq!(plan.units[1].label, "p#0");
        assert_eq!(plan.units[3].label, "p#2");
    }

    #[test]
    fn trigger_unit_contributes_nothing() {
        let plan = partition_ok(
            "signal clk: bit;\nsignal a: bit;\nprocess p on posedge(clk) {\n  a = 1;\n}",
            1,
        );
        assert_eq!(plan.units[0].cost, 0);
        assert!(plan.units[1].cost > 0);
    }

    #[test]
    fn shared_routine_is_not_an_overlap() {
        // Both processes call `f`; callee bodies are exempt from claims.
        let plan = partition_ok(
            "signal clk: bit;\nsignal a: bit<8>;\nfunc f() {\n  a = a + 1;\n}\nprocess p on posedge(clk) {\n  f();\n}\nprocess q on posedge(clk) {\n  f();\n}",
            2,
        );
        assert_eq!(plan.units.len(), 4);
        assert_eq!(plan.units[1].cost, plan.units[3].cost);
    }

    #[test]
    fn empty_design_still_plans() {
        let plan = partition_ok("signal a: bit;", 2);
        assert!(plan.units.is_empty());
        assert_eq!(plan.lanes.len(), 2);
        assert_eq!(plan.lanes[0].total, 0);
    }

    // ── Lane assignment ─────────────────────────────────────────────────

    #[test]
    fn heaviest_unit_gets_its_own_lane() {
        let plan = partition_ok(TWO_PROCESSES, 2);
        // The division statement dwarfs everything else, so LPT leaves it
        // alone on lane 0 and piles the rest onto lane 1.
        assert_eq!(plan.lanes.len(), 2);
        assert_eq!(plan.lanes[0].units.len(), 1);
        assert_eq!(plan.units[plan.lanes[0].units[0]].label, "heavy#0");
        assert!(plan.lanes[0].total > plan.lanes[1].total);
    }

    #[test]
    fn single_lane_takes_everything() {
        let plan = partition_ok(TWO_PROCESSES, 1);
        assert_eq!(plan.lanes.len(), 1);
        assert_eq!(plan.lanes[0].units.len(), plan.units.len());
        let sum: u64 = plan.units.iter().map(|u| u64::from(u.cost)).sum();
        assert_eq!(plan.lanes[0].total, sum);
    }

    #[test]
    fn surplus_lanes_stay_empty() {
        let plan = partition_ok(
            "signal clk: bit;\nsignal a: bit;\nprocess p on posedge(clk) {\n  a = 1;\n}",
            8,
        );
        assert_eq!(plan.lanes.len(), 8);
        let used = plan.lanes.iter().filter(|l| !l.units.is_empty()).count();
        assert_eq!(used, 2, "trigger and statement unit on separate lanes");
    }

    #[test]
    fn assignment_is_deterministic() {
        let a = partition_ok(TWO_PROCESSES, 3);
        let b = partition_ok(TWO_PROCESSES, 3);
        assert_eq!(a.lanes.len(), b.lanes.len());
        for (la, lb) in a.lanes.iter().zip(&b.lanes) {
            assert_eq!(la.units, lb.units);
            assert_eq!(la.total, lb.total);
        }
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    #[test]
    fn zero_lanes_is_an_error() {
        let result = partition_source(TWO_PROCESSES, 0);
        assert!(result.plan.is_none());
        let errs: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagLevel::Error)
            .collect();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, Some(codes::E0301));
    }

    #[test]
    fn overlapping_units_fault() {
        // Hand-built tree where two triggers share a statement; the
        // duplicate guard must refuse it.
        let mut tree = Tree::new();
        let lhs = tree.add(
            NodeKind::SignalRef { signal: SignalId(0), name: "s".into() },
            8,
            sp(),
        );
        let rhs = tree.add(NodeKind::Const { value: 1 }, 8, sp());
        let shared = tree.add(NodeKind::Assign { lhs, rhs, delayed: false }, 8, sp());
        let t0 = tree.add(
            NodeKind::Trigger {
                proc: ProcId(0),
                name: "a".into(),
                senses: Vec::new(),
                stmts: vec![shared],
            },
            0,
            sp(),
        );
        let t1 = tree.add(
            NodeKind::Trigger {
                proc: ProcId(1),
                name: "b".into(),
                senses: Vec::new(),
                stmts: vec![shared],
            },
            0,
            sp(),
        );
        let design = Design {
            tree,
            signals: Vec::new(),
            funcs: Vec::new(),
            processes: vec![
                Process { id: ProcId(0), name: "a".into(), trigger: t0, span: sp() },
                Process { id: ProcId(1), name: "b".into(), trigger: t1, span: sp() },
            ],
        };
        let result = partition(&design, &CostModel::default(), 2);
        assert!(result.plan.is_none());
        let errs: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagLevel::Error)
            .collect();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, Some(codes::E0302));
        assert!(errs[0].message.contains("visited twice"));
    }

    // ── Certification ───────────────────────────────────────────────────

    #[test]
    fn cert_passes_on_fresh_plan() {
        let plan = partition_ok(TWO_PROCESSES, 2);
        let cert = verify_partition(&plan, 2);
        assert!(cert.all_pass(), "obligations: {:?}", cert.obligations());
        assert_eq!(cert.obligations().len(), 3);
    }

    #[test]
    fn result_carries_cert() {
        let result = partition_source(TWO_PROCESSES, 2);
        let cert = result.cert.expect("cert");
        assert!(cert.all_pass());
    }

    #[test]
    fn cert_catches_wrong_lane_count() {
        let plan = partition_ok(TWO_PROCESSES, 2);
        let cert = verify_partition(&plan, 3);
        assert!(!cert.p2_lane_count);
        assert!(cert.p1_units_assigned_once);
        assert!(cert.p3_cost_conserved);
        assert!(!cert.all_pass());
    }

    #[test]
    fn cert_catches_tampered_total() {
        let mut plan = partition_ok(TWO_PROCESSES, 2);
        plan.lanes[0].total += 1;
        let cert = verify_partition(&plan, 2);
        assert!(!cert.p3_cost_conserved);
    }

    #[test]
    fn cert_catches_dropped_unit() {
        let mut plan = partition_ok(TWO_PROCESSES, 2);
        let dropped = plan.lanes[1].units.pop().expect("lane 1 has units");
        plan.lanes[1].total -= u64::from(plan.units[dropped].cost);
        let cert = verify_partition(&plan, 2);
        assert!(!cert.p1_units_assigned_once);
        assert!(cert.p3_cost_conserved, "totals were adjusted consistently");
    }

    #[test]
    fn cert_catches_double_assignment() {
        let mut plan = partition_ok(TWO_PROCESSES, 2);
        let doubled = plan.lanes[0].units[0];
        plan.lanes[1].units.push(doubled);
        plan.lanes[1].total += u64::from(plan.units[doubled].cost);
        let cert = verify_partition(&plan, 2);
        assert!(!cert.p1_units_assigned_once);
    }

    // ── Display ─────────────────────────────────────────────────────────

    #[test]
    fn display_lists_lanes_and_units() {
        let plan = partition_ok(TWO_PROCESSES, 2);
        let text = plan.to_string();
        assert!(text.starts_with("PartitionPlan (4 units over 2 lanes)"));
        assert!(text.contains("lane 0 (total "));
        assert!(text.contains("heavy#0: cost "));
    }
}
