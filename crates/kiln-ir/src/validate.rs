// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Structural checks on a lowered procedure.

use indexmap::{IndexMap, IndexSet};

use crate::{Instr, IrProc, LabelId, Operand, SlotId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("label {0} is jumped to but never placed")]
    UnplacedLabel(LabelId),
    #[error("label {0} is placed more than once")]
    DuplicateLabel(LabelId),
    #[error("back edge to {0}, which is not a loop head")]
    NotALoopHead(LabelId),
    #[error("checked call at #{0} has no exit label")]
    MissingExit(usize),
    #[error("unchecked call at #{0} carries an exit label")]
    UnexpectedExit(usize),
    #[error("slot {slot} used at #{index} is not declared")]
    UndeclaredSlot { slot: SlotId, index: usize },
}

#[derive(Clone, Copy, PartialEq)]
enum Placement {
    Plain,
    Loop,
}

/// Check label balance, call exit labels and slot declarations.
pub fn validate(proc: &IrProc) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let declared: IndexSet<SlotId> = proc.slots.iter().map(|s| s.id).collect();

    let mut placed: IndexMap<LabelId, Placement> = IndexMap::new();
    for instr in &proc.body {
        let (label, kind) = match instr {
            Instr::Label(l) => (*l, Placement::Plain),
            Instr::LoopLabel(l) => (*l, Placement::Loop),
            _ => continue,
        };
        if placed.insert(label, kind).is_some() {
            errors.push(ValidationError::DuplicateLabel(label));
        }
    }

    for (index, instr) in proc.body.iter().enumerate() {
        for target in instr.targets() {
            match placed.get(&target) {
                None => errors.push(ValidationError::UnplacedLabel(target)),
                Some(Placement::Plain) if matches!(instr, Instr::GotoLoop(_)) => {
                    errors.push(ValidationError::NotALoopHead(target))
                }
                Some(_) => {}
            }
        }

        if let Some(call) = instr.call() {
            match (call.kind.is_checked(), call.exit) {
                (true, None) => errors.push(ValidationError::MissingExit(index)),
                (false, Some(_)) => errors.push(ValidationError::UnexpectedExit(index)),
                _ => {}
            }
        }

        for slot in slots_used(instr) {
            if !declared.contains(&slot) {
                errors.push(ValidationError::UndeclaredSlot { slot, index });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn slots_used(instr: &Instr) -> Vec<SlotId> {
    let operands: Vec<&Operand> = match instr {
        Instr::Summon { slot, .. } => return vec![*slot],
        Instr::Asgn { dst, src, .. } => {
            let mut ops = dst.operands();
            ops.extend(src.operands());
            let mut slots: Vec<SlotId> = dst.root_slot().into_iter().collect();
            slots.extend(ops.into_iter().filter_map(slot_of));
            return slots;
        }
        Instr::Call(call) => call.operands(),
        Instr::Select { value, .. } | Instr::SetExc { value } => vec![value],
        _ => Vec::new(),
    };
    operands.into_iter().filter_map(slot_of).collect()
}

fn slot_of(op: &Operand) -> Option<SlotId> {
    match op {
        Operand::Slot(s) => Some(*s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Call, CallKind, IrTypeTable, SlotDecl, SlotKind, StrId, SymRef};

    fn proc_with(body: Vec<Instr>) -> IrProc {
        IrProc {
            sym: None,
            name: StrId(0),
            params: Vec::new(),
            result: None,
            slots: vec![SlotDecl {
                id: SlotId(0),
                ty: IrTypeTable::VOID,
                kind: SlotKind::Temp,
                name: None,
            }],
            body,
        }
    }

    fn call(kind: CallKind, exit: Option<LabelId>) -> Instr {
        Instr::Call(Call {
            kind,
            ret: IrTypeTable::VOID,
            callee: Operand::Sym(SymRef::Local(kiln_ast::SymbolId(0))),
            args: vec![Operand::Slot(SlotId(0))],
            exit,
            loc: None,
        })
    }

    #[test]
    fn balanced_proc_passes() {
        let p = proc_with(vec![
            Instr::LoopLabel(LabelId(0)),
            call(CallKind::CheckedDirect, Some(LabelId(1))),
            Instr::GotoLoop(LabelId(0)),
            Instr::Label(LabelId(1)),
        ]);
        assert_eq!(validate(&p), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let p = proc_with(vec![
            Instr::Label(LabelId(0)),
            Instr::Label(LabelId(0)),
            Instr::Goto(LabelId(5)),
            Instr::GotoLoop(LabelId(0)),
            call(CallKind::CheckedDirect, None),
            call(CallKind::Direct, Some(LabelId(0))),
            Instr::SetExc {
                value: Operand::Slot(SlotId(9)),
            },
        ]);
        let errors = validate(&p).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateLabel(LabelId(0))));
        assert!(errors.contains(&ValidationError::UnplacedLabel(LabelId(5))));
        assert!(errors.contains(&ValidationError::NotALoopHead(LabelId(0))));
        assert!(errors.contains(&ValidationError::MissingExit(4)));
        assert!(errors.contains(&ValidationError::UnexpectedExit(5)));
        assert!(errors.contains(&ValidationError::UndeclaredSlot {
            slot: SlotId(9),
            index: 6
        }));
    }
}
