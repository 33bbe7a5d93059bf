// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Destinations of lowered expressions.

use kiln_ir::{Operand, Place};

use crate::Temp;

/// Where an expression's result lives, or should be written.
///
/// Callers pass `Empty` when they have no preference; the engine then
/// either fills in an `Inline` operand or allocates a `Temp`.
#[derive(Debug, Default)]
pub enum Value {
    #[default]
    Empty,
    /// Owned temporary; hand it back with `ProcCtx::release`
    Temp(Temp),
    /// Storage owned elsewhere (a local, a global, a field)
    Place(Place),
    /// Literal or symbol that needs no storage
    Inline(Operand),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// The value as an operand, when it can be read without a load.
    pub fn operand(&self) -> Option<Operand> {
        match self {
            Value::Empty => None,
            Value::Temp(t) => Some(t.operand()),
            Value::Inline(op) => Some(op.clone()),
            Value::Place(Place::Slot(s)) => Some(Operand::Slot(*s)),
            Value::Place(Place::Sym(s)) => Some(Operand::Sym(*s)),
            Value::Place(_) => None,
        }
    }

    /// The value as an assignment target.
    pub fn place(&self) -> Option<Place> {
        match self {
            Value::Temp(t) => Some(t.place()),
            Value::Place(p) => Some(p.clone()),
            Value::Empty | Value::Inline(_) => None,
        }
    }
}
