//! Diagnostic infrastructure.
//!
//! Every compilation phase reports problems as [`Diagnostic`] values: an
//! enumerated code, a severity, a message, and a source location. The data
//! model is self-contained; codespan-reporting is used only to render
//! diagnostics to a terminal.

use crate::span::Span;
use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity as CsSeverity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Hint,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Enumerated diagnostic codes, grouped by the phase that emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Lexical / parse
    UnexpectedToken,
    UnexpectedCharacter,
    UnterminatedString,
    InvalidNumber,

    // Name resolution
    UndefinedSymbol,
    AlreadyDeclared,
    ModuleNotFound,

    // Types
    TypeMismatch,
    NarrowingConversionRequired,
    InvalidOperandType,
    ArraySizeMismatch,
    UnknownType,
    InvalidType,

    // Flow
    UseBeforeInit,
    UnreachableCode,
    MissingReturn,
    InvalidBreak,
    InvalidContinue,

    // Hints
    UnusedImport,
    UnusedVariable,
    WriteOnlyVariable,

    // IL / SSA
    MultipleDefinitions,
    UseBeforeDefinition,
    DominanceViolation,
    PhiNotAtBlockStart,
    PhiInEntryBlock,
    PhiMissingOperand,
    PhiOperandCountMismatch,
    PhiInvalidPredecessor,

    // Internal invariant violations
    InternalError,
}

impl DiagnosticCode {
    /// Stable SCREAMING_SNAKE name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnexpectedToken => "UNEXPECTED_TOKEN",
            DiagnosticCode::UnexpectedCharacter => "UNEXPECTED_CHARACTER",
            DiagnosticCode::UnterminatedString => "UNTERMINATED_STRING",
            DiagnosticCode::InvalidNumber => "INVALID_NUMBER",
            DiagnosticCode::UndefinedSymbol => "UNDEFINED_SYMBOL",
            DiagnosticCode::AlreadyDeclared => "ALREADY_DECLARED",
            DiagnosticCode::ModuleNotFound => "MODULE_NOT_FOUND",
            DiagnosticCode::TypeMismatch => "TYPE_MISMATCH",
            DiagnosticCode::NarrowingConversionRequired => "NARROWING_CONVERSION_REQUIRED",
            DiagnosticCode::InvalidOperandType => "INVALID_OPERAND_TYPE",
            DiagnosticCode::ArraySizeMismatch => "ARRAY_SIZE_MISMATCH",
            DiagnosticCode::UnknownType => "UNKNOWN_TYPE",
            DiagnosticCode::InvalidType => "INVALID_TYPE",
            DiagnosticCode::UseBeforeInit => "USE_BEFORE_INIT",
            DiagnosticCode::UnreachableCode => "UNREACHABLE_CODE",
            DiagnosticCode::MissingReturn => "MISSING_RETURN",
            DiagnosticCode::InvalidBreak => "INVALID_BREAK",
            DiagnosticCode::InvalidContinue => "INVALID_CONTINUE",
            DiagnosticCode::UnusedImport => "UNUSED_IMPORT",
            DiagnosticCode::UnusedVariable => "UNUSED_VARIABLE",
            DiagnosticCode::WriteOnlyVariable => "WRITE_ONLY_VARIABLE",
            DiagnosticCode::MultipleDefinitions => "MULTIPLE_DEFINITIONS",
            DiagnosticCode::UseBeforeDefinition => "USE_BEFORE_DEFINITION",
            DiagnosticCode::DominanceViolation => "DOMINANCE_VIOLATION",
            DiagnosticCode::PhiNotAtBlockStart => "PHI_NOT_AT_BLOCK_START",
            DiagnosticCode::PhiInEntryBlock => "PHI_IN_ENTRY_BLOCK",
            DiagnosticCode::PhiMissingOperand => "PHI_MISSING_OPERAND",
            DiagnosticCode::PhiOperandCountMismatch => "PHI_OPERAND_COUNT_MISMATCH",
            DiagnosticCode::PhiInvalidPredecessor => "PHI_INVALID_PREDECESSOR",
            DiagnosticCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A span tagged with the source it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source key (module source name, e.g. `main` or `@stdlib/c64`)
    pub file: String,
    pub span: Span,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, span: Span) -> Self {
        Self { file: file.into(), span }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
    /// Related locations (e.g. the previous declaration for ALREADY_DECLARED)
    pub related: Vec<SourceLocation>,
}

impl Diagnostic {
    pub fn new(
        code: DiagnosticCode,
        severity: Severity,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location,
            related: Vec::new(),
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(code, Severity::Error, message, location)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(code, Severity::Warning, message, location)
    }

    pub fn hint(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(code, Severity::Hint, message, location)
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(code, Severity::Info, message, location)
    }

    pub fn with_related(mut self, location: SourceLocation) -> Self {
        self.related.push(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Append-only list of diagnostics, kept in emission order.
///
/// Phases emit in source order, so the final list is stable across runs.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Sort by source order (file, then start offset) while keeping
    /// emission order within ties. Phases call this once before handing
    /// their diagnostics to the pipeline.
    pub fn sort_by_source_order(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            (&a.location.file, a.location.span.start.offset)
                .cmp(&(&b.location.file, b.location.span.start.offset))
        });
    }
}

/// Render diagnostics to stderr with source context.
///
/// `sources` maps source keys to their text; diagnostics pointing at
/// unknown keys are rendered without context.
pub fn render_diagnostics(diagnostics: &[Diagnostic], sources: &[(String, String)]) {
    let mut files = SimpleFiles::new();
    let mut ids = std::collections::HashMap::new();
    for (name, text) in sources {
        let id = files.add(name.clone(), text.clone());
        ids.insert(name.clone(), id);
    }

    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();

    for diag in diagnostics {
        let severity = match diag.severity {
            Severity::Error => CsSeverity::Error,
            Severity::Warning => CsSeverity::Warning,
            Severity::Hint => CsSeverity::Help,
            Severity::Info => CsSeverity::Note,
        };
        let mut cs = CsDiagnostic::new(severity)
            .with_code(diag.code.as_str())
            .with_message(&diag.message);
        if let Some(&file_id) = ids.get(&diag.location.file) {
            cs = cs.with_labels(vec![Label::primary(file_id, diag.location.span.byte_range())]);
        }
        for related in &diag.related {
            if let Some(&file_id) = ids.get(&related.file) {
                cs.labels.push(Label::secondary(file_id, related.span.byte_range()));
            }
        }
        let _ = term::emit(&mut writer.lock(), &config, &files, &cs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Position, Span};

    fn loc(offset: u32) -> SourceLocation {
        let p = Position::new(1, offset + 1, offset);
        SourceLocation::new("main", Span::new(p, p))
    }

    #[test]
    fn test_bag_tracks_errors() {
        let mut bag = DiagnosticBag::new();
        bag.push(Diagnostic::hint(DiagnosticCode::UnusedImport, "unused", loc(0)));
        assert!(!bag.has_errors());
        bag.push(Diagnostic::error(DiagnosticCode::TypeMismatch, "mismatch", loc(4)));
        assert!(bag.has_errors());
        assert_eq!(bag.error_count(), 1);
    }

    #[test]
    fn test_sort_by_source_order() {
        let mut bag = DiagnosticBag::new();
        bag.push(Diagnostic::error(DiagnosticCode::TypeMismatch, "b", loc(10)));
        bag.push(Diagnostic::error(DiagnosticCode::TypeMismatch, "a", loc(2)));
        bag.sort_by_source_order();
        let msgs: Vec<_> = bag.iter().map(|d| d.message.clone()).collect();
        assert_eq!(msgs, vec!["a", "b"]);
    }

    #[test]
    fn test_code_names() {
        assert_eq!(DiagnosticCode::TypeMismatch.as_str(), "TYPE_MISMATCH");
        assert_eq!(DiagnosticCode::UseBeforeInit.as_str(), "USE_BEFORE_INIT");
        assert_eq!(DiagnosticCode::PhiInEntryBlock.as_str(), "PHI_IN_ENTRY_BLOCK");
    }
}
