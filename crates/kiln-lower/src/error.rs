// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lowering errors.

use kiln_ast::{Magic, Span};
use kiln_diagnostics::{Diagnostic, ToDiagnostic};
use kiln_ir::{LabelId, SlotId};
use thiserror::Error;

/// An error that aborts lowering of the current top-level item.
#[derive(Debug, Clone, PartialEq)]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub span: Span,
}

impl LowerError {
    pub fn new(kind: LowerErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn internal(msg: impl Into<String>, span: Span) -> Self {
        Self::new(LowerErrorKind::Internal(msg.into()), span)
    }
}

impl std::fmt::Display for LowerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.kind, self.span)
    }
}

impl std::error::Error for LowerError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Unsupported,
    Internal,
    Restriction,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LowerErrorKind {
    #[error("cannot lower {what}")]
    UnsupportedNode { what: String },

    #[error("built-in `{magic}` cannot be lowered at this stage")]
    UnsupportedMagic { magic: Magic },

    #[error("no enclosing block {}", break_target(.target))]
    UnresolvedBreak { target: Option<String> },

    #[error("expression of type `{ty}` produced no value")]
    ResultNotSet { ty: String },

    #[error("missing {what}")]
    MissingDescriptor { what: String },

    #[error("temporary {slot} is still live when its scope closes")]
    TempLeaked { slot: SlotId },

    #[error("label {0} is jumped to but never placed")]
    UnplacedLabel(LabelId),

    #[error("label {0} is placed twice")]
    DuplicateLabel(LabelId),

    #[error("{0}")]
    Internal(String),

    #[error("cannot query the {what} of `{ty}` before its layout is known")]
    IncompleteTypeQuery { what: &'static str, ty: String },

    #[error("call to `{name}` needs dynamic dispatch")]
    DynamicDispatch { name: String },

    #[error("runtime routine `{name}` is not available")]
    MissingRuntimeRoutine { name: String },
}

fn break_target(target: &Option<String>) -> String {
    match target {
        Some(name) => format!("named `{}`", name),
        None => "to break out of".to_string(),
    }
}

impl LowerErrorKind {
    pub fn class(&self) -> ErrorClass {
        use LowerErrorKind::*;
        match self {
            UnsupportedNode { .. } | UnsupportedMagic { .. } => ErrorClass::Unsupported,
            UnresolvedBreak { .. }
            | ResultNotSet { .. }
            | MissingDescriptor { .. }
            | TempLeaked { .. }
            | UnplacedLabel(_)
            | DuplicateLabel(_)
            | Internal(_) => ErrorClass::Internal,
            IncompleteTypeQuery { .. } | DynamicDispatch { .. } | MissingRuntimeRoutine { .. } => {
                ErrorClass::Restriction
            }
        }
    }

    pub fn code(&self) -> &'static str {
        use LowerErrorKind::*;
        match self {
            UnsupportedNode { .. } => "E0601",
            UnsupportedMagic { .. } => "E0602",
            UnresolvedBreak { .. } => "E0610",
            ResultNotSet { .. } => "E0611",
            MissingDescriptor { .. } => "E0612",
            TempLeaked { .. } => "E0613",
            UnplacedLabel(_) => "E0614",
            DuplicateLabel(_) => "E0615",
            Internal(_) => "E0619",
            IncompleteTypeQuery { .. } => "E0620",
            DynamicDispatch { .. } => "E0621",
            MissingRuntimeRoutine { .. } => "E0622",
        }
    }
}

impl ToDiagnostic for LowerError {
    fn to_diagnostic(&self) -> Diagnostic {
        use LowerErrorKind::*;

        let diag = Diagnostic::error(self.kind.to_string()).with_code(self.kind.code());
        match &self.kind {
            UnsupportedNode { .. } => diag.at(self.span, "no lowering for this construct"),
            UnsupportedMagic { magic } => diag
                .at(self.span, format!("`{}` used here", magic))
                .with_note("reflection, set and pointer-reinterpretation built-ins are resolved before this stage"),
            IncompleteTypeQuery { .. } => diag
                .at(self.span, "layout not known yet")
                .with_help("compute the value in a compile-time constant instead"),
            DynamicDispatch { .. } => diag
                .at(self.span, "called here")
                .with_help("call a concrete implementation, or resolve the method before lowering"),
            MissingRuntimeRoutine { .. } => diag
                .at(self.span, "needed here")
                .with_help("declare the routine in the runtime support module"),
            _ => diag
                .at(self.span, "while lowering this")
                .with_note("this is a bug in the compiler, not in your code"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::FileId;

    #[test]
    fn classes_and_codes() {
        let e = LowerErrorKind::ResultNotSet { ty: "int".into() };
        assert_eq!(e.class(), ErrorClass::Internal);
        assert_eq!(e.code(), "E0611");
        let r = LowerErrorKind::IncompleteTypeQuery {
            what: "size",
            ty: "Foreign".into(),
        };
        assert_eq!(r.class(), ErrorClass::Restriction);
        assert_eq!(
            r.to_string(),
            "cannot query the size of `Foreign` before its layout is known"
        );
    }

    #[test]
    fn break_message_names_target() {
        let named = LowerErrorKind::UnresolvedBreak {
            target: Some("outer".into()),
        };
        assert_eq!(named.to_string(), "no enclosing block named `outer`");
        let bare = LowerErrorKind::UnresolvedBreak { target: None };
        assert_eq!(bare.to_string(), "no enclosing block to break out of");
    }

    #[test]
    fn diagnostic_carries_code_and_location() {
        let span = Span::new(FileId(0), 4, 2);
        let d = LowerError::new(
            LowerErrorKind::MissingRuntimeRoutine {
                name: "String_len".into(),
            },
            span,
        )
        .to_diagnostic();
        assert_eq!(d.code.as_deref(), Some("E0622"));
        assert_eq!(d.span, Some(span));
        assert!(d.help.is_some());
    }
}
