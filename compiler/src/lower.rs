// lower.rs — AST to simulation IR lowering
//
// Resolves names against the design's declarations, computes result widths
// bottom-up, links routine calls to their definitions, and builds the node
// tree the cost passes walk.
//
// Preconditions: `design` is a well-formed AST from the parser.
// Postconditions: returns the lowered design plus all accumulated
//                 diagnostics; the design is present only when no errors
//                 were produced.
// Failure modes: unresolved names, arity and select violations, and call
//                cycles produce `Diagnostic` entries. Lowering continues
//                past errors to accumulate more.
// Side effects: none.

use std::collections::HashMap;

use crate::ast::{self, BinaryOp, BranchHint, ExprKind, Span, StmtKind, UnaryOp, WaitSpec};
use crate::diag::codes;
use crate::diag::{DiagCode, DiagLevel, Diagnostic};
use crate::ir::{
    Design, Func, FuncId, NodeId, NodeKind, ProcId, Process, Sense, Signal, SignalId, Tree,
};

// ── Public types ────────────────────────────────────────────────────────────

/// Result of lowering.
#[derive(Debug)]
pub struct LowerResult {
    pub design: Option<Design>,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Lower a parsed design to the simulation IR.
pub fn lower(design: &ast::Design) -> LowerResult {
    let mut ctx = LowerCtx::new();

    // Pass 1: collect declarations; routine definition nodes are
    // pre-allocated so call sites can link regardless of order
    ctx.collect_decls(design);

    // Pass 2: lower routine bodies, then process bodies
    ctx.lower_funcs(design);
    ctx.lower_processes(design);

    // Post-pass: the estimator follows call links into callee bodies, so
    // call cycles are fatal
    ctx.check_call_cycles();

    ctx.build_result()
}

// ── Internal context ────────────────────────────────────────────────────────

struct LowerCtx {
    tree: Tree,
    signals: Vec<Signal>,
    funcs: Vec<Func>,
    processes: Vec<Process>,
    diagnostics: Vec<Diagnostic>,
    signals_by_name: HashMap<String, SignalId>,
    funcs_by_name: HashMap<String, FuncId>,
    /// Every declared name with its first site, for redeclaration checks.
    declared: HashMap<String, (Span, &'static str)>,
    /// Parameters of the routine currently being lowered.
    locals: HashMap<String, SignalId>,
    /// Routine-to-routine call sites: (caller, callee, call span).
    call_edges: Vec<(FuncId, FuncId, Span)>,
    /// Set while lowering a routine body.
    current_func: Option<FuncId>,
}

impl LowerCtx {
    fn new() -> Self {
        LowerCtx {
            tree: Tree::new(),
            signals: Vec::new(),
            funcs: Vec::new(),
            processes: Vec::new(),
            diagnostics: Vec::new(),
            signals_by_name: HashMap::new(),
            funcs_by_name: HashMap::new(),
            declared: HashMap::new(),
            locals: HashMap::new(),
            call_edges: Vec::new(),
            current_func: None,
        }
    }

    fn error(&mut self, code: DiagCode, span: Span, message: String) {
        self.diagnostics
            .push(Diagnostic::new(DiagLevel::Error, span, message).with_code(code));
    }

    fn warning(&mut self, code: DiagCode, span: Span, message: String) {
        self.diagnostics
            .push(Diagnostic::new(DiagLevel::Warning, span, message).with_code(code));
    }

    fn build_result(self) -> LowerResult {
        let has_errors = self
            .diagnostics
            .iter()
            .any(|d| d.level == DiagLevel::Error);
        let design = if has_errors {
            None
        } else {
            Some(Design {
                tree: self.tree,
                signals: self.signals,
                funcs: self.funcs,
                processes: self.processes,
            })
        };
        LowerResult {
            design,
            diagnostics: self.diagnostics,
        }
    }

    // ── Pass 1: collect declarations ────────────────────────────────────

    fn collect_decls(&mut self, design: &ast::Design) {
        for decl in &design.decls {
            match &decl.kind {
                ast::DeclKind::Signal(s) => self.collect_signal(s),
                ast::DeclKind::Func(f) => self.collect_func(f, decl.span),
                ast::DeclKind::Process(p) => {
                    self.declare(&p.name, "process");
                }
            }
        }
    }

    /// Record a top-level name. Signals, routines, and processes share one
    /// namespace. Returns false and reports on redeclaration.
    fn declare(&mut self, name: &ast::Ident, what: &'static str) -> bool {
        if let Some(&(first, first_what)) = self.declared.get(&name.name) {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagLevel::Error,
                    name.span,
                    format!("`{}` is already declared as a {}", name.name, first_what),
                )
                .with_code(codes::E0203)
                .with_related(first, "first declared here"),
            );
            false
        } else {
            self.declared.insert(name.name.clone(), (name.span, what));
            true
        }
    }

    fn collect_signal(&mut self, decl: &ast::SignalDecl) {
        if !self.declare(&decl.name, "signal") {
            return;
        }
        let id = SignalId(self.signals.len() as u32);
        self.signals.push(Signal {
            id,
            name: decl.name.name.clone(),
            width: decl.ty.width,
            depth: decl.ty.depth,
            span: decl.name.span,
        });
        self.signals_by_name.insert(decl.name.name.clone(), id);
    }

    fn collect_func(&mut self, decl: &ast::FuncDecl, span: Span) {
        if !self.declare(&decl.name, "routine") {
            return;
        }
        let id = FuncId(self.funcs.len() as u32);
        let def = self.tree.add(
            NodeKind::FuncDef {
                func: id,
                name: decl.name.name.clone(),
                stmts: Vec::new(),
            },
            0,
            span,
        );
        let mut params = Vec::new();
        for p in &decl.params {
            if p.ty.depth.is_some() {
                self.error(
                    codes::E0207,
                    p.ty.span,
                    format!("parameter `{}` cannot have an array type", p.name.name),
                );
            }
            params.push((p.name.name.clone(), p.ty.width));
        }
        self.funcs.push(Func {
            id,
            name: decl.name.name.clone(),
            params,
            def,
            span: decl.name.span,
        });
        self.funcs_by_name.insert(decl.name.name.clone(), id);
    }

    // ── Pass 2: lower bodies ────────────────────────────────────────────

    fn lower_funcs(&mut self, design: &ast::Design) {
        for decl in &design.decls {
            let ast::DeclKind::Func(f) = &decl.kind else {
                continue;
            };
            let Some(&fid) = self.funcs_by_name.get(&f.name.name) else {
                continue;
            };
            if self.funcs[fid.0 as usize].span != f.name.span {
                // Redeclaration, already reported; only the first is lowered.
                continue;
            }

            self.locals.clear();
            for p in &f.params {
                if let Some(&prev) = self.locals.get(&p.name.name) {
                    let first = self.signals[prev.0 as usize].span;
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagLevel::Error,
                            p.name.span,
                            format!("duplicate parameter `{}`", p.name.name),
                        )
                        .with_code(codes::E0203)
                        .with_related(first, "first declared here"),
                    );
                    continue;
                }
                let sid = SignalId(self.signals.len() as u32);
                self.signals.push(Signal {
                    id: sid,
                    name: p.name.name.clone(),
                    width: p.ty.width,
                    depth: None,
                    span: p.name.span,
                });
                self.locals.insert(p.name.name.clone(), sid);
            }

            self.current_func = Some(fid);
            let stmts = self.lower_body(&f.body);
            self.current_func = None;
            self.locals.clear();

            let def = self.funcs[fid.0 as usize].def;
            let name = self.funcs[fid.0 as usize].name.clone();
            self.tree.patch(
                def,
                NodeKind::FuncDef {
                    func: fid,
                    name,
                    stmts,
                },
            );
        }
    }

    fn lower_processes(&mut self, design: &ast::Design) {
        for decl in &design.decls {
            let ast::DeclKind::Process(p) = &decl.kind else {
                continue;
            };
            if self.declared.get(&p.name.name).map(|&(s, _)| s) != Some(p.name.span) {
                // Redeclaration, already reported.
                continue;
            }

            let mut senses = Vec::new();
            for s in &p.senses {
                if let Some(signal) = self.resolve_watched_signal(&s.signal) {
                    senses.push(Sense {
                        edge: s.edge,
                        signal,
                    });
                }
            }
            let stmts = self.lower_body(&p.body);
            let pid = ProcId(self.processes.len() as u32);
            let trigger = self.tree.add(
                NodeKind::Trigger {
                    proc: pid,
                    name: p.name.name.clone(),
                    senses,
                    stmts,
                },
                0,
                decl.span,
            );
            self.processes.push(Process {
                id: pid,
                name: p.name.name.clone(),
                trigger,
                span: p.name.span,
            });
        }
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn lower_body(&mut self, body: &[ast::Stmt]) -> Vec<NodeId> {
        body.iter().filter_map(|s| self.lower_stmt(s)).collect()
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> Option<NodeId> {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                let stmts = self.lower_body(stmts);
                Some(self.tree.add(NodeKind::Block { stmts }, 0, stmt.span))
            }
            StmtKind::If(i) => {
                // Branches are lowered even when the condition fails, to
                // keep accumulating diagnostics.
                let cond = self.lower_expr(&i.cond, None);
                let then_stmts = self.lower_body(&i.then_body);
                let else_stmts = self.lower_body(&i.else_body);
                let cond = cond?;
                Some(self.tree.add(
                    NodeKind::If {
                        cond,
                        then_stmts,
                        else_stmts,
                        hint: i.hint,
                    },
                    0,
                    stmt.span,
                ))
            }
            StmtKind::Await(a) => {
                let expr = match &a.wait {
                    WaitSpec::Edge(sense) => {
                        let signal = self.resolve_watched_signal(&sense.signal)?;
                        let (width, name) = {
                            let s = &self.signals[signal.0 as usize];
                            (s.width, s.name.clone())
                        };
                        self.tree
                            .add(NodeKind::SignalRef { signal, name }, width, sense.span)
                    }
                    WaitSpec::Level(e) => self.lower_expr(e, None)?,
                };
                Some(self.tree.add(NodeKind::Await { expr }, 0, stmt.span))
            }
            StmtKind::Fork(f) => {
                let branches = f
                    .branches
                    .iter()
                    .map(|b| {
                        let stmts = self.lower_body(&b.stmts);
                        self.tree.add(NodeKind::Block { stmts }, 0, b.span)
                    })
                    .collect();
                Some(self.tree.add(NodeKind::Fork { branches }, 0, stmt.span))
            }
            StmtKind::Call(c) => self.lower_call(c, stmt.span),
            StmtKind::Assign(a) => self.lower_assign(a, stmt.span),
        }
    }

    fn lower_call(&mut self, call: &ast::CallStmt, span: Span) -> Option<NodeId> {
        let Some(&fid) = self.funcs_by_name.get(&call.callee.name) else {
            let message = match self.declared.get(&call.callee.name) {
                Some(&(_, what)) => {
                    format!("`{}` is a {}, not a routine", call.callee.name, what)
                }
                None => format!("call to undeclared routine `{}`", call.callee.name),
            };
            self.error(codes::E0202, call.callee.span, message);
            // Still lower the arguments for their own diagnostics.
            for arg in &call.args {
                self.lower_expr(arg, None);
            }
            return None;
        };

        let (def, name, params, def_span) = {
            let f = &self.funcs[fid.0 as usize];
            (f.def, f.name.clone(), f.params.clone(), f.span)
        };

        if call.args.len() != params.len() {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagLevel::Error,
                    span,
                    format!(
                        "routine `{}` takes {} argument(s), {} supplied",
                        name,
                        params.len(),
                        call.args.len()
                    ),
                )
                .with_code(codes::E0204)
                .with_related(def_span, "declared here"),
            );
            return None;
        }

        let mut args = Vec::with_capacity(call.args.len());
        let mut failed = false;
        for (arg, (pname, want)) in call.args.iter().zip(&params) {
            match self.lower_expr(arg, Some(*want)) {
                Some(n) => {
                    let got = self.tree.width(n);
                    if got != *want {
                        self.warning(
                            codes::W0301,
                            arg.span,
                            format!(
                                "argument for `{}` is {} bit(s), the parameter takes {}",
                                pname, got, want
                            ),
                        );
                    }
                    args.push(n);
                }
                None => failed = true,
            }
        }
        if failed {
            return None;
        }

        if let Some(caller) = self.current_func {
            self.call_edges.push((caller, fid, span));
        }
        Some(self.tree.add(
            NodeKind::Call {
                func: def,
                callee: fid,
                name,
                args,
            },
            0,
            span,
        ))
    }

    fn lower_assign(&mut self, assign: &ast::AssignStmt, span: Span) -> Option<NodeId> {
        let lhs = self.lower_expr(&assign.target, None);
        let want = lhs.map(|l| self.tree.width(l));
        let rhs = self.lower_expr(&assign.value, want);
        let (lhs, rhs) = (lhs?, rhs?);

        let target_width = self.tree.width(lhs);
        let value_width = self.tree.width(rhs);
        if value_width != target_width {
            self.warning(
                codes::W0301,
                span,
                format!(
                    "{}-bit value assigned to {}-bit target",
                    value_width, target_width
                ),
            );
        }
        Some(self.tree.add(
            NodeKind::Assign {
                lhs,
                rhs,
                delayed: assign.delayed,
            },
            target_width,
            span,
        ))
    }

    // ── Expressions ─────────────────────────────────────────────────────
    //
    // `want` is the width context, used only to size integer literals.
    // Arithmetic and bitwise operands inherit it; comparison operands,
    // select indices, and shift amounts are self-determined.

    fn lower_expr(&mut self, expr: &ast::Expr, want: Option<u32>) -> Option<NodeId> {
        match &expr.kind {
            ExprKind::Number(value) => {
                let width = match want {
                    Some(w) => {
                        if bits_for(*value) > w {
                            self.warning(
                                codes::W0301,
                                expr.span,
                                format!("literal {} does not fit in {} bit(s)", value, w),
                            );
                        }
                        w
                    }
                    None => bits_for(*value).max(32),
                };
                Some(
                    self.tree
                        .add(NodeKind::Const { value: *value }, width, expr.span),
                )
            }

            ExprKind::Ref(name) => {
                let signal = self.lookup_signal(name)?;
                let (width, depth, sname) = {
                    let s = &self.signals[signal.0 as usize];
                    (s.width, s.depth, s.name.clone())
                };
                if depth.is_some() {
                    self.error(
                        codes::E0207,
                        name.span,
                        format!("array signal `{}` needs an element select here", sname),
                    );
                    return None;
                }
                Some(self.tree.add(
                    NodeKind::SignalRef {
                        signal,
                        name: sname,
                    },
                    width,
                    name.span,
                ))
            }

            ExprKind::Unary(op, operand) => {
                let inner_want = match op {
                    UnaryOp::LogNot => None,
                    _ => want,
                };
                let operand = self.lower_expr(operand, inner_want)?;
                let width = match op {
                    UnaryOp::LogNot => 1,
                    _ => self.tree.width(operand),
                };
                Some(
                    self.tree
                        .add(NodeKind::Unop { op: *op, operand }, width, expr.span),
                )
            }

            ExprKind::Binary(op, lhs, rhs) => {
                let (lhs_want, rhs_want) = operand_contexts(*op, want);
                let lhs_n = self.lower_expr(lhs, lhs_want);
                let rhs_n = self.lower_expr(rhs, rhs_want);
                let (lhs_n, rhs_n) = (lhs_n?, rhs_n?);
                let width = if op.is_single_bit() {
                    1
                } else if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
                    self.tree.width(lhs_n)
                } else {
                    self.tree.width(lhs_n).max(self.tree.width(rhs_n))
                };
                Some(self.tree.add(
                    NodeKind::Binop {
                        op: *op,
                        lhs: lhs_n,
                        rhs: rhs_n,
                    },
                    width,
                    expr.span,
                ))
            }

            ExprKind::Index { base, index } => self.lower_index(base, index, expr.span),

            ExprKind::Range { base, msb, lsb } => {
                let base_n = self.lower_expr(base, None)?;
                let base_w = self.tree.width(base_n);
                if msb < lsb {
                    self.error(
                        codes::E0206,
                        expr.span,
                        format!("descending range required, `[{}:{}]` is inverted", msb, lsb),
                    );
                    return None;
                }
                if u64::from(*msb) >= u64::from(base_w) {
                    self.error(
                        codes::E0206,
                        expr.span,
                        format!("range `[{}:{}]` is outside the {}-bit value", msb, lsb, base_w),
                    );
                    return None;
                }
                let width = msb - lsb + 1;
                let lsb_n = self
                    .tree
                    .add(NodeKind::Const { value: u64::from(*lsb) }, 32, expr.span);
                let width_n = self
                    .tree
                    .add(NodeKind::Const { value: u64::from(width) }, 32, expr.span);
                Some(self.tree.add(
                    NodeKind::RangeSel {
                        base: base_n,
                        lsb: lsb_n,
                        width: width_n,
                    },
                    width,
                    expr.span,
                ))
            }

            ExprKind::Slice {
                base,
                offset,
                width,
            } => {
                let base_n = self.lower_expr(base, None)?;
                let base_w = self.tree.width(base_n);
                let offset_n = self.lower_expr(offset, None)?;
                let ExprKind::Number(w) = &width.kind else {
                    self.error(
                        codes::E0206,
                        width.span,
                        "slice width must be an integer literal".to_string(),
                    );
                    return None;
                };
                if *w == 0 || *w > u64::from(base_w) {
                    self.error(
                        codes::E0206,
                        width.span,
                        format!("slice width {} does not fit the {}-bit value", w, base_w),
                    );
                    return None;
                }
                let width_n = self
                    .tree
                    .add(NodeKind::Const { value: *w }, 32, width.span);
                Some(self.tree.add(
                    NodeKind::RangeSel {
                        base: base_n,
                        lsb: offset_n,
                        width: width_n,
                    },
                    *w as u32,
                    expr.span,
                ))
            }

            ExprKind::Concat(parts) => {
                let mut nodes = Vec::with_capacity(parts.len());
                let mut width: u32 = 0;
                let mut failed = false;
                for part in parts {
                    match self.lower_expr(part, None) {
                        Some(n) => {
                            width = width.saturating_add(self.tree.width(n));
                            nodes.push(n);
                        }
                        None => failed = true,
                    }
                }
                if failed {
                    return None;
                }
                Some(
                    self.tree
                        .add(NodeKind::Concat { parts: nodes }, width, expr.span),
                )
            }

            ExprKind::Cond {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond_n = self.lower_expr(cond, None);
                let then_n = self.lower_expr(then_expr, want);
                let else_n = self.lower_expr(else_expr, want);
                let (cond_n, then_n, else_n) = (cond_n?, then_n?, else_n?);
                let width = self.tree.width(then_n).max(self.tree.width(else_n));
                Some(self.tree.add(
                    NodeKind::CondExpr {
                        cond: cond_n,
                        then_expr: then_n,
                        else_expr: else_n,
                        hint: BranchHint::None,
                    },
                    width,
                    expr.span,
                ))
            }
        }
    }

    /// Lower `base[index]`. An element select of an array signal gets its
    /// own node kind; on anything else this is a single-bit select.
    fn lower_index(&mut self, base: &ast::Expr, index: &ast::Expr, span: Span) -> Option<NodeId> {
        if let ExprKind::Ref(name) = &base.kind {
            let looked_up = self
                .locals
                .get(&name.name)
                .or_else(|| self.signals_by_name.get(&name.name))
                .copied();
            if let Some(signal) = looked_up {
                let (width, depth, sname) = {
                    let s = &self.signals[signal.0 as usize];
                    (s.width, s.depth, s.name.clone())
                };
                if let Some(depth) = depth {
                    let index_n = self.lower_expr(index, None)?;
                    if let Some(value) = self.const_value(index_n) {
                        if value >= u64::from(depth) {
                            self.error(
                                codes::E0206,
                                span,
                                format!(
                                    "element {} is outside array `{}` of depth {}",
                                    value, sname, depth
                                ),
                            );
                            return None;
                        }
                    }
                    let base_n = self.tree.add(
                        NodeKind::SignalRef {
                            signal,
                            name: sname,
                        },
                        width,
                        base.span,
                    );
                    return Some(self.tree.add(
                        NodeKind::IndexSel {
                            base: base_n,
                            index: index_n,
                        },
                        width,
                        span,
                    ));
                }
            }
        }

        // Single-bit select of a vector.
        let base_n = self.lower_expr(base, None)?;
        let base_w = self.tree.width(base_n);
        if base_w <= 1 {
            self.error(
                codes::E0205,
                span,
                "bit select applied to a 1-bit value".to_string(),
            );
            return None;
        }
        let lsb_n = self.lower_expr(index, None)?;
        if let Some(value) = self.const_value(lsb_n) {
            if value >= u64::from(base_w) {
                self.error(
                    codes::E0206,
                    span,
                    format!("bit {} is outside the {}-bit value", value, base_w),
                );
                return None;
            }
        }
        let width_n = self.tree.add(NodeKind::Const { value: 1 }, 32, span);
        Some(self.tree.add(
            NodeKind::RangeSel {
                base: base_n,
                lsb: lsb_n,
                width: width_n,
            },
            1,
            span,
        ))
    }

    fn const_value(&self, id: NodeId) -> Option<u64> {
        match self.tree.kind(id) {
            NodeKind::Const { value } => Some(*value),
            _ => None,
        }
    }

    // ── Name lookup ─────────────────────────────────────────────────────

    fn lookup_signal(&mut self, name: &ast::Ident) -> Option<SignalId> {
        if let Some(&id) = self.locals.get(&name.name) {
            return Some(id);
        }
        if let Some(&id) = self.signals_by_name.get(&name.name) {
            return Some(id);
        }
        let message = match self.declared.get(&name.name) {
            Some(&(_, what)) => format!("`{}` is a {}, not a signal", name.name, what),
            None => format!("undeclared signal `{}`", name.name),
        };
        self.error(codes::E0201, name.span, message);
        None
    }

    /// Resolve a sensitivity-list or edge-await signal. Arrays have no
    /// single value to watch.
    fn resolve_watched_signal(&mut self, name: &ast::Ident) -> Option<SignalId> {
        let id = self.lookup_signal(name)?;
        if self.signals[id.0 as usize].depth.is_some() {
            self.error(
                codes::E0207,
                name.span,
                format!("array signal `{}` cannot be watched for edges", name.name),
            );
            return None;
        }
        Some(id)
    }

    // ── Post-pass: call cycles ──────────────────────────────────────────

    fn check_call_cycles(&mut self) {
        let n = self.funcs.len();
        let mut adjacency: Vec<Vec<(FuncId, Span)>> = vec![Vec::new(); n];
        for &(from, to, span) in &self.call_edges {
            adjacency[from.0 as usize].push((to, span));
        }

        // 0 = unvisited, 1 = on the current path, 2 = done
        let mut color = vec![0u8; n];
        let mut cycle_errors: Vec<(Span, String)> = Vec::new();
        for start in 0..n {
            if color[start] == 0 {
                self.walk_cycles(start, &adjacency, &mut color, &mut Vec::new(), &mut cycle_errors);
            }
        }
        for (span, message) in cycle_errors {
            self.error(codes::E0208, span, message);
        }
    }

    fn walk_cycles(
        &self,
        node: usize,
        adjacency: &[Vec<(FuncId, Span)>],
        color: &mut [u8],
        path: &mut Vec<usize>,
        errors: &mut Vec<(Span, String)>,
    ) {
        color[node] = 1;
        path.push(node);
        for &(to, span) in &adjacency[node] {
            let t = to.0 as usize;
            match color[t] {
                0 => self.walk_cycles(t, adjacency, color, path, errors),
                1 => {
                    let pos = path
                        .iter()
                        .position(|&p| p == t)
                        .expect("internal: cycle target not on path");
                    let chain: Vec<&str> = path[pos..]
                        .iter()
                        .map(|&p| self.funcs[p].name.as_str())
                        .collect();
                    errors.push((
                        span,
                        format!(
                            "recursive call cycle: {} -> {}",
                            chain.join(" -> "),
                            self.funcs[t].name
                        ),
                    ));
                }
                _ => {}
            }
        }
        path.pop();
        color[node] = 2;
    }
}

// ── Width helpers ───────────────────────────────────────────────────────────

/// Bits needed to represent `value`; at least 1.
fn bits_for(value: u64) -> u32 {
    (64 - value.leading_zeros()).max(1)
}

/// Width context handed to each operand of a binary operator.
fn operand_contexts(op: BinaryOp, want: Option<u32>) -> (Option<u32>, Option<u32>) {
    if op.is_single_bit() {
        (None, None)
    } else if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        (want, None)
    } else {
        (want, want)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
