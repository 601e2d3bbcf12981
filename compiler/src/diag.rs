// diag.rs — Unified diagnostics model
//
// Provides the shared diagnostic types used across all compiler phases.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0201`, `W0301`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different semantic
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The assigned code space: E01xx syntax, E02xx/W03xx lowering,
/// E03xx cost and partitioning, E06xx phase verification.
pub mod codes {
    use super::DiagCode;

    /// Reference to a signal never declared in the design.
    pub const E0201: DiagCode = DiagCode("E0201");
    /// Call to a routine never declared in the design.
    pub const E0202: DiagCode = DiagCode("E0202");
    /// Redeclaration of a signal, routine, or process name.
    pub const E0203: DiagCode = DiagCode("E0203");
    /// Call with the wrong number of arguments.
    pub const E0204: DiagCode = DiagCode("E0204");
    /// Element select applied to a scalar signal.
    pub const E0205: DiagCode = DiagCode("E0205");
    /// Malformed range select (zero width or bounds outside the signal).
    pub const E0206: DiagCode = DiagCode("E0206");
    /// Whole-array use where an element is required.
    pub const E0207: DiagCode = DiagCode("E0207");
    /// Routine call cycle; bodies must inline into call sites.
    pub const E0208: DiagCode = DiagCode("E0208");

    /// Value width differs from the width of its assignment or argument
    /// context.
    pub const W0301: DiagCode = DiagCode("W0301");

    /// Lane count outside the supported range.
    pub const E0301: DiagCode = DiagCode("E0301");
    /// Cost estimation hit an invariant fault (overlapping queries,
    /// nested trigger, stray routine body).
    pub const E0302: DiagCode = DiagCode("E0302");

    /// Partition verification failed.
    pub const E0601: DiagCode = DiagCode("E0601");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A compiler diagnostic emitted by any phase.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint, or related spans.
    pub fn new(level: DiagLevel, span: Span, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
        }
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
