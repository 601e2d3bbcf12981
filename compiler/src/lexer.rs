// Lexer for Vireo .vio source files.
//
// Tokenizes source according to LANGUAGE.md §Lexical structure.
// Uses the `logos` crate for DFA-based lexing.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Vireo token types.
///
/// Keywords and symbols are matched as fixed strings. Number literals carry
/// parsed values. Identifiers carry no value; the span retrieves the text
/// from the source.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|//[^\n]*")]
pub enum Token {
    // ── Keywords ──
    #[token("signal")]
    Signal,
    #[token("func")]
    Func,
    #[token("process")]
    Process,
    #[token("on")]
    On,
    #[token("posedge")]
    Posedge,
    #[token("negedge")]
    Negedge,
    #[token("update")]
    Update,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("likely")]
    Likely,
    #[token("unlikely")]
    Unlikely,
    #[token("await")]
    Await,
    #[token("fork")]
    Fork,
    #[token("bit")]
    Bit,

    // ── Symbols ──
    //
    // Two-character symbols are listed alongside their one-character
    // prefixes; logos picks the longest match, so `<=` never lexes as
    // `<` `=`.
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("+:")]
    PlusColon,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("&&")]
    AmpAmp,
    #[token("|")]
    Pipe,
    #[token("||")]
    PipePipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,

    // ── Literals ──
    /// Hex literal (e.g. `0xFF_00`). Underscores are digit separators.
    #[regex(r"0x[0-9a-fA-F][0-9a-fA-F_]*", parse_hex)]
    HexNumber(u64),

    /// Decimal literal (e.g. `1_000`). Underscores are digit separators.
    #[regex(r"[0-9][0-9_]*", parse_dec)]
    Number(u64),

    // ── Identifier ──
    //
    // Placed after keywords; logos prioritises fixed `#[token]` matches
    // over regex for the same length, so `signal` matches Signal, not Ident.
    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Signal => write!(f, "signal"),
            Token::Func => write!(f, "func"),
            Token::Process => write!(f, "process"),
            Token::On => write!(f, "on"),
            Token::Posedge => write!(f, "posedge"),
            Token::Negedge => write!(f, "negedge"),
            Token::Update => write!(f, "update"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::Likely => write!(f, "likely"),
            Token::Unlikely => write!(f, "unlikely"),
            Token::Await => write!(f, "await"),
            Token::Fork => write!(f, "fork"),
            Token::Bit => write!(f, "bit"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::PlusColon => write!(f, "+:"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Amp => write!(f, "&"),
            Token::AmpAmp => write!(f, "&&"),
            Token::Pipe => write!(f, "|"),
            Token::PipePipe => write!(f, "||"),
            Token::Caret => write!(f, "^"),
            Token::Tilde => write!(f, "~"),
            Token::Bang => write!(f, "!"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::HexNumber(v) => write!(f, "{v:#x}"),
            Token::Number(v) => write!(f, "{v}"),
            Token::Ident => write!(f, "<ident>"),
        }
    }
}

// ── Callbacks ──

fn parse_dec(lex: &mut logos::Lexer<'_, Token>) -> Option<u64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_hex(lex: &mut logos::Lexer<'_, Token>) -> Option<u64> {
    u64::from_str_radix(&lex.slice()[2..].replace('_', ""), 16).ok()
}

// ── Public API ──

/// Lex a Vireo source string into tokens.
///
/// Returns all successfully parsed tokens together with any errors for
/// unrecognised characters. Lexing is non-fatal: errors are collected and
/// the lexer continues past bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──
