// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Call flattening.
//!
//! Arguments are lowered first, then the call is emitted as one flat
//! instruction. A call to a routine that may raise gets the checked form,
//! with the current exception target as its exit.

use kiln_ast::{Node, NodeKind, SymbolId};
use kiln_ir::{Call, CallKind, Instr, IrType, Operand, Rvalue};

use crate::{LowerError, LowerErrorKind, ProcCtx, Value};

/// Does evaluating `n` involve a call?
fn has_call(n: &Node) -> bool {
    matches!(n.kind, NodeKind::Call { .. }) || n.children().into_iter().any(has_call)
}

impl ProcCtx<'_, '_> {
    /// Lower a call. `dest` is `None` when the result is discarded.
    pub(super) fn gen_call(&mut self, n: &Node, dest: Option<&mut Value>) -> Result<(), LowerError> {
        let NodeKind::Call { callee, args } = &n.kind else {
            return Err(LowerError::internal("call lowering on a non-call node", n.span));
        };

        if let Some(magic) = self.magic_of(callee) {
            let mut scratch = Value::Empty;
            let discard = dest.is_none();
            let d = match dest {
                Some(d) => d,
                None => &mut scratch,
            };
            self.gen_magic(n, magic, args, d)?;
            if discard {
                self.release(scratch);
            }
            return Ok(());
        }

        let mut params: &[SymbolId] = &[];
        let (callee_op, callee_val, checked, indirect) = match &callee.kind {
            NodeKind::Sym(id) if self.m.program.symbol(*id).is_some_and(|s| s.kind.is_routine()) => {
                let sym = self.m.symbol(*id, callee.span)?;
                if sym.flags.dynamic_dispatch {
                    return Err(LowerError::new(
                        LowerErrorKind::DynamicDispatch {
                            name: sym.name.clone(),
                        },
                        n.span,
                    ));
                }
                if let Some(decl) = self.m.decl(*id) {
                    params = &decl.params;
                }
                let target = self.m.reference(sym);
                (Operand::Sym(target), Value::Empty, self.m.routine_may_raise(sym), false)
            }
            _ => {
                let v = self.genx(callee)?;
                let op = self.operand(&v, callee.span)?;
                (op, v, self.m.proc_type_may_raise(callee.ty), true)
            }
        };

        let mut values = Vec::with_capacity(args.len());
        let mut ops = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let by_address = params
                .get(i)
                .and_then(|p| self.m.program.symbol(*p))
                .is_some_and(|p| p.flags.by_address());
            if by_address {
                let t = self.gen_address(arg)?;
                ops.push(t.operand());
                values.push(Value::Temp(t));
                continue;
            }
            let v = self.genx(arg)?;
            // A later call could overwrite what a variable operand names.
            let v = match v {
                Value::Inline(Operand::Slot(_) | Operand::Sym(_)) if args[i + 1..].iter().any(has_call) => {
                    let ty = self.ir_type(arg.ty);
                    let mut copy = Value::Temp(self.alloc(ty));
                    let op = self.operand(&v, arg.span)?;
                    self.put(&mut copy, ty, op, arg.span)?;
                    copy
                }
                v => v,
            };
            ops.push(self.operand(&v, arg.span)?);
            values.push(v);
        }

        let ret = self.ir_type(n.ty);
        let call = Call {
            kind: CallKind::new(indirect, checked),
            ret,
            callee: callee_op,
            args: ops,
            exit: checked.then(|| self.exc_target()),
            loc: self.loc(n.span),
        };
        match dest {
            Some(dest) if !self.is_void(n.ty) => self.assign(dest, ret, Rvalue::Call(call), n.span)?,
            _ => self.emit(Instr::Call(call)),
        }
        self.release_all(values);
        self.release(callee_val);
        Ok(())
    }

    /// Address of an assignable argument, in a fresh temporary.
    pub(super) fn gen_address(&mut self, arg: &Node) -> Result<crate::Temp, LowerError> {
        let (place, held) = self.gen_place(arg)?;
        let pointee = self.ir_type(arg.ty);
        let ty = self.m.types.intern(IrType::Ptr(pointee));
        let t = self.alloc(ty);
        self.emit(Instr::Asgn {
            ty,
            dst: t.place(),
            src: Rvalue::AddrOf(place),
        });
        self.release_all(held);
        Ok(t)
    }

    /// Call a runtime support routine with already-lowered operands.
    pub(super) fn gen_runtime_call(
        &mut self,
        n: &Node,
        routine: &str,
        args: Vec<Operand>,
        dest: &mut Value,
    ) -> Result<(), LowerError> {
        let id = self.m.runtime.lookup(routine).ok_or_else(|| {
            LowerError::new(
                LowerErrorKind::MissingRuntimeRoutine {
                    name: routine.to_string(),
                },
                n.span,
            )
        })?;
        let sym = self.m.symbol(id, n.span)?;
        let checked = self.m.routine_may_raise(sym);
        let ret = self.ir_type(n.ty);
        let call = Call {
            kind: CallKind::new(false, checked),
            ret,
            callee: Operand::Sym(self.m.reference(sym)),
            args,
            exit: checked.then(|| self.exc_target()),
            loc: self.loc(n.span),
        };
        if self.is_void(n.ty) {
            self.emit(Instr::Call(call));
            Ok(())
        } else {
            self.assign(dest, ret, Rvalue::Call(call), n.span)
        }
    }
}
