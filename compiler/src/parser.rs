// Parser for Vireo .vio source files.
//
// Parses a token stream (from the lexer) into an AST per the grammar in
// LANGUAGE.md. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics; parsing continues.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub design: Option<Design>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a Vireo source string. Lexes then parses.
///
/// Returns an AST (if parsing succeeded) plus any errors.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = design_parser(source);
    let (design, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        design,
        errors: all_errors,
    }
}

/// One bracketed select parsed after a primary expression or lvalue name.
enum Select {
    Index(Expr),
    Range { msb: u32, lsb: u32 },
    Slice { offset: Expr, width: Expr },
}

/// Wrap `base` in the expression node for one parsed select.
fn apply_select(base: Expr, sel: Select, span: SimpleSpan) -> Expr {
    let kind = match sel {
        Select::Index(index) => ExprKind::Index {
            base: Box::new(base),
            index: Box::new(index),
        },
        Select::Range { msb, lsb } => ExprKind::Range {
            base: Box::new(base),
            msb,
            lsb,
        },
        Select::Slice { offset, width } => ExprKind::Slice {
            base: Box::new(base),
            offset: Box::new(offset),
            width: Box::new(width),
        },
    };
    Expr { kind, span }
}

// ── Main parser builder ──
//
// All grammar rules are built inside `design_parser` so that the `source`
// reference is captured once and shared by all combinators. This avoids
// complex lifetime annotations on per-rule helper functions.

fn design_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Design, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    // ── Integer literals ──

    // Any integer literal, as an expression atom.
    let int_atom = select! {
        Token::Number(n) => ExprKind::Number(n),
        Token::HexNumber(n) => ExprKind::Number(n),
    }
    .map_with(|kind, e| Expr {
        kind,
        span: e.span(),
    });

    // A positive literal that fits a width or depth position.
    let dim_int = select! {
        Token::Number(n) if n >= 1 && n <= u32::MAX as u64 => n as u32,
        Token::HexNumber(n) if n >= 1 && n <= u32::MAX as u64 => n as u32,
    };

    // A literal part-select bound. Zero is allowed (`x[7:0]`).
    let bound_int = select! {
        Token::Number(n) if n <= u32::MAX as u64 => n as u32,
        Token::HexNumber(n) if n <= u32::MAX as u64 => n as u32,
    };

    // ── type: 'bit' ('<' INT '>')? ('[' INT ']')? ──

    let typ = just(Token::Bit)
        .ignore_then(
            dim_int
                .delimited_by(just(Token::Lt), just(Token::Gt))
                .or_not(),
        )
        .then(
            dim_int
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .or_not(),
        )
        .map_with(|(width, depth), e| TypeSpec {
            width: width.unwrap_or(1),
            depth,
            span: e.span(),
        });

    // ── sense: ('posedge'|'negedge'|'update') '(' IDENT ')' ──

    let edge = choice((
        just(Token::Posedge).to(EdgeKind::Pos),
        just(Token::Negedge).to(EdgeKind::Neg),
        just(Token::Update).to(EdgeKind::Update),
    ));

    let sense = edge
        .then(
            ident
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map_with(|(edge, signal), e| SenseSpec {
            edge,
            signal,
            span: e.span(),
        });

    // ── Expressions ──
    //
    // Declared up front so the select parsers can be shared between the
    // expression grammar and the assignment lvalue grammar.

    let mut expr = Recursive::declare();

    let concat = expr
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(2)
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
        .map_with(|parts, e| Expr {
            kind: ExprKind::Concat(parts),
            span: e.span(),
        });

    let primary = choice((
        int_atom,
        ident.clone().map_with(|id, e| Expr {
            kind: ExprKind::Ref(id),
            span: e.span(),
        }),
        expr.clone()
            .delimited_by(just(Token::LParen), just(Token::RParen)),
        concat,
    ));

    // Postfix selects. The constant-bound form must come first so `x[7:0]`
    // is not half-parsed as an element index.
    let range_sel = bound_int
        .then_ignore(just(Token::Colon))
        .then(bound_int)
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map(|(msb, lsb)| Select::Range { msb, lsb });

    let slice_sel = expr
        .clone()
        .then_ignore(just(Token::PlusColon))
        .then(expr.clone())
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map(|(offset, width)| Select::Slice { offset, width });

    let index_sel = expr
        .clone()
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map(Select::Index);

    let select_op = choice((range_sel, slice_sel, index_sel));

    let postfixed = primary.foldl_with(select_op.clone().repeated(), |base, sel, e| {
        apply_select(base, sel, e.span())
    });

    let unary_op = choice((
        just(Token::Tilde).to(UnaryOp::Not),
        just(Token::Bang).to(UnaryOp::LogNot),
        just(Token::Minus).to(UnaryOp::Neg),
    ));

    let unary = unary_op
        .repeated()
        .foldr_with(postfixed, |op, operand, e| Expr {
            kind: ExprKind::Unary(op, Box::new(operand)),
            span: e.span(),
        });

    // Binary precedence ladder, loosest at the bottom.
    let product = unary.clone().foldl_with(
        choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::Slash).to(BinaryOp::Div),
            just(Token::Percent).to(BinaryOp::Mod),
        ))
        .then(unary)
        .repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let sum = product.clone().foldl_with(
        choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ))
        .then(product)
        .repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let shift = sum.clone().foldl_with(
        choice((
            just(Token::Shl).to(BinaryOp::Shl),
            just(Token::Shr).to(BinaryOp::Shr),
        ))
        .then(sum)
        .repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let compare = shift.clone().foldl_with(
        choice((
            just(Token::Le).to(BinaryOp::Le),
            just(Token::Ge).to(BinaryOp::Ge),
            just(Token::Lt).to(BinaryOp::Lt),
            just(Token::Gt).to(BinaryOp::Gt),
        ))
        .then(shift)
        .repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let equality = compare.clone().foldl_with(
        choice((
            just(Token::EqEq).to(BinaryOp::Eq),
            just(Token::Ne).to(BinaryOp::Ne),
        ))
        .then(compare)
        .repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let bit_and = equality.clone().foldl_with(
        just(Token::Amp).to(BinaryOp::And).then(equality).repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let bit_xor = bit_and.clone().foldl_with(
        just(Token::Caret).to(BinaryOp::Xor).then(bit_and).repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let bit_or = bit_xor.clone().foldl_with(
        just(Token::Pipe).to(BinaryOp::Or).then(bit_xor).repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let log_and = bit_or.clone().foldl_with(
        just(Token::AmpAmp)
            .to(BinaryOp::LogAnd)
            .then(bit_or)
            .repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    let log_or = log_and.clone().foldl_with(
        just(Token::PipePipe)
            .to(BinaryOp::LogOr)
            .then(log_and)
            .repeated(),
        |lhs, (op, rhs), e| Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            span: e.span(),
        },
    );

    // Ternary. Right-associative: the else arm re-enters the full
    // expression grammar.
    let ternary = log_or
        .then(
            just(Token::Question)
                .ignore_then(expr.clone())
                .then_ignore(just(Token::Colon))
                .then(expr.clone())
                .or_not(),
        )
        .map_with(|(cond, arms), e| match arms {
            Some((then_expr, else_expr)) => Expr {
                kind: ExprKind::Cond {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span: e.span(),
            },
            None => cond,
        });

    expr.define(ternary);

    // ── Assignment lvalue: IDENT select* ──
    //
    // Deliberately narrower than the expression grammar. A full expression
    // on the left would swallow `q <= d` as a comparison before the
    // assignment operator is ever seen.

    let lvalue = ident
        .clone()
        .map_with(|id, e| Expr {
            kind: ExprKind::Ref(id),
            span: e.span(),
        })
        .foldl_with(select_op.repeated(), |base, sel, e| {
            apply_select(base, sel, e.span())
        });

    // ── Statements ──

    let stmt = recursive(|stmt| {
        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace));

        let hint = choice((
            just(Token::Likely).to(BranchHint::Likely),
            just(Token::Unlikely).to(BranchHint::Unlikely),
        ))
        .or_not()
        .map(|h| h.unwrap_or(BranchHint::None));

        let if_stmt = recursive(|if_stmt| {
            just(Token::If)
                .ignore_then(
                    expr.clone()
                        .delimited_by(just(Token::LParen), just(Token::RParen)),
                )
                .then(hint)
                .then(block.clone())
                .then(
                    just(Token::Else)
                        .ignore_then(choice((
                            if_stmt.map_with(|kind: StmtKind, e| {
                                vec![Stmt {
                                    kind,
                                    span: e.span(),
                                }]
                            }),
                            block.clone(),
                        )))
                        .or_not(),
                )
                .map(|(((cond, hint), then_body), else_body)| {
                    StmtKind::If(IfStmt {
                        cond,
                        hint,
                        then_body,
                        else_body: else_body.unwrap_or_default(),
                    })
                })
        });

        let await_stmt = just(Token::Await)
            .ignore_then(choice((
                sense.clone().map(WaitSpec::Edge),
                expr.clone().map(WaitSpec::Level),
            )))
            .then_ignore(just(Token::Semi))
            .map(|wait| StmtKind::Await(AwaitStmt { wait }));

        let fork_branch = block.clone().map_with(|stmts, e| ForkBranch {
            stmts,
            span: e.span(),
        });

        let fork_stmt = just(Token::Fork)
            .ignore_then(
                fork_branch
                    .repeated()
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LBrace), just(Token::RBrace)),
            )
            .map(|branches| StmtKind::Fork(ForkStmt { branches }));

        let call_stmt = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then_ignore(just(Token::Semi))
            .map(|(callee, args)| StmtKind::Call(CallStmt { callee, args }));

        let assign_op = choice((just(Token::Assign).to(false), just(Token::Le).to(true)));

        let assign_stmt = lvalue
            .clone()
            .then(assign_op)
            .then(expr.clone())
            .then_ignore(just(Token::Semi))
            .map(|((target, delayed), value)| {
                StmtKind::Assign(AssignStmt {
                    target,
                    value,
                    delayed,
                })
            });

        choice((
            block.clone().map(StmtKind::Block),
            if_stmt,
            await_stmt,
            fork_stmt,
            call_stmt,
            assign_stmt,
        ))
        .map_with(|kind, e| Stmt {
            kind,
            span: e.span(),
        })
    });

    let body = stmt
        .clone()
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace));

    // ── Declarations ──

    let signal_decl = just(Token::Signal)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Colon))
        .then(typ.clone())
        .then_ignore(just(Token::Semi))
        .map(|(name, ty)| DeclKind::Signal(SignalDecl { name, ty }));

    let param = ident
        .clone()
        .then_ignore(just(Token::Colon))
        .then(typ.clone())
        .map(|(name, ty)| Param { name, ty });

    let func_decl = just(Token::Func)
        .ignore_then(ident.clone())
        .then(
            param
                .separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .then(body.clone())
        .map(|((name, params), body)| DeclKind::Func(FuncDecl { name, params, body }));

    let process_decl = just(Token::Process)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::On))
        .then(
            sense
                .clone()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then(body.clone())
        .map(|((name, senses), body)| DeclKind::Process(ProcessDecl { name, senses, body }));

    let decl = choice((signal_decl, func_decl, process_decl)).map_with(|kind, e| Decl {
        kind,
        span: e.span(),
    });

    decl.repeated()
        .collect::<Vec<_>>()
        .map_with(move |decls, e| Design {
            decls,
            span: e.span(),
        })
}

// ── Tests ──
