// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Interpreter errors.

use kiln_ir::LabelId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpError {
    #[error("no module named `{0}`")]
    UnknownModule(String),

    #[error("undefined routine `{0}`")]
    UndefinedRoutine(String),

    #[error("unresolved symbol {0}")]
    UnresolvedSymbol(String),

    #[error("jump to undefined label {0}")]
    UndefinedLabel(LabelId),

    #[error("{0}")]
    TypeError(String),

    #[error("expected {expected} argument{}, got {got}", if *.expected == 1 { "" } else { "s" })]
    ArityMismatch { expected: usize, got: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("nil dereference")]
    NilDeref,

    #[error("pointer to storage that no longer exists")]
    Dangling,

    #[error("unhandled exception: {0}")]
    Unhandled(String),

    #[error("step limit of {0} exceeded")]
    StepLimit(u64),

    /// `quit` was called; not a failure
    #[error("exit with code {0}")]
    Exit(i64),
}
