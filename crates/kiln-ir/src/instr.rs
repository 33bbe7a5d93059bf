// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IR instructions.

use crate::{IrTypeId, LabelId, Literal, LocId, Operand, Place, Rvalue, SlotId, StrId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CallKind {
    Direct,
    Indirect,
    /// Direct call whose callee may raise
    CheckedDirect,
    /// Indirect call whose callee may raise
    CheckedIndirect,
}

impl CallKind {
    pub fn new(indirect: bool, checked: bool) -> Self {
        match (indirect, checked) {
            (false, false) => CallKind::Direct,
            (true, false) => CallKind::Indirect,
            (false, true) => CallKind::CheckedDirect,
            (true, true) => CallKind::CheckedIndirect,
        }
    }

    pub fn is_checked(self) -> bool {
        matches!(self, CallKind::CheckedDirect | CallKind::CheckedIndirect)
    }
}

/// A flat call. Every argument is already an operand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Call {
    pub kind: CallKind,
    pub ret: IrTypeId,
    pub callee: Operand,
    pub args: Vec<Operand>,
    /// Where control goes when the callee raises; set for checked calls only
    pub exit: Option<LabelId>,
    pub loc: Option<LocId>,
}

impl Call {
    pub fn operands(&self) -> Vec<&Operand> {
        let mut ops = vec![&self.callee];
        ops.extend(self.args.iter());
        ops
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectValue {
    Value(Literal),
    /// Inclusive
    Range(Literal, Literal),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmPattern {
    Values(Vec<SelectValue>),
    Else,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectArm {
    pub pattern: ArmPattern,
    pub target: LabelId,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instr {
    /// Declare a slot and reset it to the zero value of its type
    Summon {
        slot: SlotId,
        ty: IrTypeId,
        name: Option<StrId>,
    },
    Asgn {
        ty: IrTypeId,
        dst: Place,
        src: Rvalue,
    },
    /// Call whose result, if any, is discarded
    Call(Call),
    Label(LabelId),
    /// Loop head; only `GotoLoop` jumps here
    LoopLabel(LabelId),
    Goto(LabelId),
    /// Back edge to a `LoopLabel`
    GotoLoop(LabelId),
    /// Multi-way branch; falls through when no arm matches
    Select {
        ty: IrTypeId,
        value: Operand,
        arms: Vec<SelectArm>,
    },
    /// Make `value` the pending exception
    SetExc { value: Operand },
    /// Take the pending exception if it matches `ty` (any, when `None`);
    /// otherwise jump to `otherwise`
    TestExc {
        ty: Option<IrTypeId>,
        otherwise: LabelId,
    },
    /// Jump to `target` if an exception is pending
    CheckedGoto { target: LabelId },
    SourceLoc(LocId),
}

impl Instr {
    /// A conditional jump: go to `target` when `cond` equals `when`.
    pub fn branch(bool_ty: IrTypeId, cond: Operand, when: bool, target: LabelId) -> Self {
        Instr::Select {
            ty: bool_ty,
            value: cond,
            arms: vec![SelectArm {
                pattern: ArmPattern::Values(vec![SelectValue::Value(Literal::Bool(when))]),
                target,
            }],
        }
    }

    /// Labels this instruction may transfer control to.
    pub fn targets(&self) -> Vec<LabelId> {
        match self {
            Instr::Goto(l) | Instr::GotoLoop(l) => vec![*l],
            Instr::CheckedGoto { target } => vec![*target],
            Instr::TestExc { otherwise, .. } => vec![*otherwise],
            Instr::Select { arms, .. } => arms.iter().map(|a| a.target).collect(),
            Instr::Call(call) => call.exit.into_iter().collect(),
            Instr::Asgn {
                src: Rvalue::Call(call),
                ..
            } => call.exit.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn call(&self) -> Option<&Call> {
        match self {
            Instr::Call(call) => Some(call),
            Instr::Asgn {
                src: Rvalue::Call(call),
                ..
            } => Some(call),
            _ => None,
        }
    }

    /// Never falls through to the next instruction.
    pub fn is_jump(&self) -> bool {
        matches!(self, Instr::Goto(_) | Instr::GotoLoop(_))
    }
}
