// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Lowered IR - flat, label-addressed instruction sequences.
//!
//! Each procedure is a list of instructions. Control flow is explicit:
//! labels are markers in the list, jumps name them. Expression trees are
//! one level deep; operands are never calls.

mod builder;
mod display;
mod function;
mod ids;
mod instr;
mod operand;
mod remap;
mod types;
mod validate;

pub use builder::TreeBuilder;
pub use function::{ExternDecl, GlobalDecl, IrModule, IrProc, Location, SlotDecl, SlotKind};
pub use ids::{IntId, IrTypeId, LabelId, LocId, SlotId, StrId};
pub use instr::{ArmPattern, Call, CallKind, Instr, SelectArm, SelectValue};
pub use operand::{BinOp, Literal, Operand, Place, Rvalue, SymRef, UnOp};
pub use remap::IdMap;
pub use types::{IrType, IrTypeTable};
pub use validate::{validate, ValidationError};
