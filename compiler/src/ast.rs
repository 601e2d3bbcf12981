// AST node types for Vireo .vio source files.
//
// Mirrors the grammar in LANGUAGE.md. Every node carries a `SimpleSpan`
// for error reporting in downstream phases.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use std::fmt;

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Operators ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Bitwise complement `~`.
    Not,
    /// Arithmetic negation `-`.
    Neg,
    /// Logical not `!` (1-bit result).
    LogNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            UnaryOp::Not => "~",
            UnaryOp::Neg => "-",
            UnaryOp::LogNot => "!",
        };
        write!(f, "{sym}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    /// Comparison and logical operators produce a 1-bit result.
    pub fn is_single_bit(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::LogAnd
                | BinaryOp::LogOr
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
        };
        write!(f, "{sym}")
    }
}

/// Designer-asserted branch probability on a conditional.
///
/// `Likely` pins the else-branch contribution to zero in the cost estimate;
/// `Unlikely` pins the then-branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchHint {
    #[default]
    None,
    Likely,
    Unlikely,
}

/// Edge selector in a sensitivity list or an await.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Pos,
    Neg,
    Update,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            EdgeKind::Pos => "posedge",
            EdgeKind::Neg => "negedge",
            EdgeKind::Update => "update",
        };
        write!(f, "{word}")
    }
}

// ── Root ──

/// A complete Vireo design: a sequence of top-level declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub decls: Vec<Decl>,
    pub span: Span,
}

// ── Declarations ──

/// A top-level declaration with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Signal(SignalDecl),
    Func(FuncDecl),
    Process(ProcessDecl),
}

// ── signal_decl: 'signal' IDENT ':' type ';' ──

#[derive(Debug, Clone, PartialEq)]
pub struct SignalDecl {
    pub name: Ident,
    pub ty: TypeSpec,
}

// ── type: 'bit' ('<' INT '>')? ('[' INT ']')? ──

/// A signal or parameter type: bit width plus optional array depth.
/// A bare `bit` is one bit wide.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub width: u32,
    pub depth: Option<u32>,
    pub span: Span,
}

// ── func_decl: 'func' IDENT '(' params? ')' block ──

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

/// `IDENT ':' type` inside a routine's parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeSpec,
}

// ── process_decl: 'process' IDENT 'on' sense_list block ──

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDecl {
    pub name: Ident,
    pub senses: Vec<SenseSpec>,
    pub body: Vec<Stmt>,
}

/// `posedge(clk)` / `negedge(rst)` / `update(data)` in a sensitivity list
/// or an await.
#[derive(Debug, Clone, PartialEq)]
pub struct SenseSpec {
    pub edge: EdgeKind,
    pub signal: Ident,
    pub span: Span,
}

// ── Statements ──

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `{ stmt* }`
    Block(Vec<Stmt>),
    If(IfStmt),
    Await(AwaitStmt),
    Fork(ForkStmt),
    Call(CallStmt),
    Assign(AssignStmt),
}

// ── if_stmt: 'if' '(' expr ')' hint? block ('else' (if_stmt | block))? ──

/// An `else if` chain parses as a one-statement `else_body`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub hint: BranchHint,
    pub then_body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

// ── await_stmt: 'await' (sense | expr) ';' ──

#[derive(Debug, Clone, PartialEq)]
pub struct AwaitStmt {
    pub wait: WaitSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaitSpec {
    /// `await posedge(clk);` wakes on a signal edge.
    Edge(SenseSpec),
    /// `await expr;` wakes when the expression becomes true.
    Level(Expr),
}

// ── fork_stmt: 'fork' '{' block+ '}' ──

#[derive(Debug, Clone, PartialEq)]
pub struct ForkStmt {
    pub branches: Vec<ForkBranch>,
}

/// One concurrent branch of a fork.
#[derive(Debug, Clone, PartialEq)]
pub struct ForkBranch {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ── call_stmt: IDENT '(' args? ')' ';' ──

#[derive(Debug, Clone, PartialEq)]
pub struct CallStmt {
    pub callee: Ident,
    pub args: Vec<Expr>,
}

// ── assign_stmt: lvalue ('=' | '<=') expr ';' ──

/// `delayed` distinguishes `<=` (commit at activation end) from `=`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Expr,
    pub value: Expr,
    pub delayed: bool,
}

// ── Expressions ──

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal (decimal or `0x` hex).
    Number(u64),
    /// Signal reference (resolved during lowering).
    Ref(Ident),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Array element select `base[index]`.
    Index { base: Box<Expr>, index: Box<Expr> },
    /// Constant-bound part select `base[msb:lsb]`.
    Range { base: Box<Expr>, msb: u32, lsb: u32 },
    /// Indexed part select `base[offset +: width]`.
    Slice {
        base: Box<Expr>,
        offset: Box<Expr>,
        width: Box<Expr>,
    },
    /// Bit concatenation `{a, b, ...}`, two or more parts.
    Concat(Vec<Expr>),
    /// `cond ? a : b`.
    Cond {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

// ── Identifier ──

/// An identifier with its source text and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}
