// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Kiln diagnostics.
//!
//! Lowering reports one problem per discarded item. A diagnostic carries
//! at most one source position, the item it was raised for, and optional
//! notes and help. Producers convert their errors with [`ToDiagnostic`]
//! and hand the result to a [`DiagnosticSink`]; they never print.

pub mod codes;
pub mod formatter;
pub mod json;

use kiln_ast::Span;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Registry code such as `E0611`
    pub code: Option<String>,
    pub message: String,
    /// Where the problem was found; `None` when no position is known.
    pub span: Option<Span>,
    /// Short text printed under the source excerpt
    pub label: Option<String>,
    /// The routine or initializer being lowered
    pub item: Option<String>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            span: None,
            label: None,
            item: None,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Point at `span`. Unknown spans are dropped so renderers can skip
    /// the excerpt.
    pub fn at(mut self, span: Span, label: impl Into<String>) -> Self {
        if !span.is_unknown() {
            self.span = Some(span);
        }
        self.label = Some(label.into());
        self
    }

    pub fn in_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Convert a compiler error into a diagnostic.
pub trait ToDiagnostic {
    fn to_diagnostic(&self) -> Diagnostic;
}

/// Where diagnostics go.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
