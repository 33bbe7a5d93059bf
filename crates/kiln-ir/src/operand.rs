// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IR operands, places and rvalues.
//!
//! An operand is a leaf: a slot, a literal or a symbol. Rvalues combine
//! operands one level deep, so calls can never nest inside arguments.

use kiln_ast::SymbolId;

use crate::{Call, IntId, IrTypeId, SlotId, StrId};

/// A reference to a symbol from the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymRef {
    /// Declared in the compilation unit being lowered
    Local(SymbolId),
    /// Declared elsewhere: interned module path plus the symbol's item id there
    Module { module: StrId, item: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Int { ty: IrTypeId, value: IntId },
    /// Stored bit-for-bit in the integer table
    UInt { ty: IrTypeId, value: IntId },
    /// `f64` bits, so literals stay `Eq`
    Float { ty: IrTypeId, bits: u64 },
    Str(StrId),
    Bool(bool),
    Char(u8),
    Nil,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    Slot(SlotId),
    Const(Literal),
    Sym(SymRef),
}

impl Operand {
    pub fn bool(v: bool) -> Self {
        Operand::Const(Literal::Bool(v))
    }
}

/// An assignable location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Place {
    Slot(SlotId),
    Sym(SymRef),
    Field { base: Box<Place>, field: u32 },
    Index { base: Box<Place>, index: Operand },
    /// Element of a string or seq, addressed through its payload pointer
    SeqIndex {
        base: Box<Place>,
        index: Operand,
        payload: IrTypeId,
    },
    /// Store through a pointer
    Deref(Operand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    /// Logical shift right
    Shr,
    /// Arithmetic shift right
    Ashr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Le,
    Lt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rvalue {
    Use(Operand),
    /// `ty` is the operand type; comparisons produce `bool`
    Binary {
        op: BinOp,
        ty: IrTypeId,
        lhs: Operand,
        rhs: Operand,
    },
    Unary {
        op: UnOp,
        ty: IrTypeId,
        operand: Operand,
    },
    FieldAt { base: Operand, field: u32 },
    IndexAt { base: Operand, index: Operand },
    SeqIndexAt {
        base: Operand,
        index: Operand,
        payload: IrTypeId,
    },
    /// Read through a pointer
    Load(Operand),
    AddrOf(Place),
    /// Value conversion to `ty`
    Conv { ty: IrTypeId, value: Operand },
    ObjConstr {
        ty: IrTypeId,
        fields: Vec<(u32, Operand)>,
    },
    ArrayConstr { ty: IrTypeId, elems: Vec<Operand> },
    /// The exception currently being handled
    CurrentExc,
    Call(Call),
}

impl Rvalue {
    /// Operands read by this rvalue, callee included.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Rvalue::Use(op) | Rvalue::Load(op) => vec![op],
            Rvalue::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Rvalue::Unary { operand, .. } => vec![operand],
            Rvalue::FieldAt { base, .. } => vec![base],
            Rvalue::IndexAt { base, index } | Rvalue::SeqIndexAt { base, index, .. } => {
                vec![base, index]
            }
            Rvalue::AddrOf(place) => place.operands(),
            Rvalue::Conv { value, .. } => vec![value],
            Rvalue::ObjConstr { fields, .. } => fields.iter().map(|(_, op)| op).collect(),
            Rvalue::ArrayConstr { elems, .. } => elems.iter().collect(),
            Rvalue::CurrentExc => Vec::new(),
            Rvalue::Call(call) => call.operands(),
        }
    }
}

impl Place {
    /// Operands read while computing the address of this place.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Place::Slot(_) | Place::Sym(_) => Vec::new(),
            Place::Field { base, .. } => base.operands(),
            Place::Index { base, index } | Place::SeqIndex { base, index, .. } => {
                let mut ops = base.operands();
                ops.push(index);
                ops
            }
            Place::Deref(op) => vec![op],
        }
    }

    /// The root slot, if the place is rooted in one.
    pub fn root_slot(&self) -> Option<SlotId> {
        match self {
            Place::Slot(s) => Some(*s),
            Place::Sym(_) | Place::Deref(_) => None,
            Place::Field { base, .. }
            | Place::Index { base, .. }
            | Place::SeqIndex { base, .. } => base.root_slot(),
        }
    }
}
