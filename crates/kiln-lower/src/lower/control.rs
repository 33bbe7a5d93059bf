// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Control flow: conditionals, loops, blocks, `case`, `try`, and the
//! non-local transfers `break`, `return` and `raise`.
//!
//! Every construct is laid out with labels allocated from the procedure
//! context; nested constructs never share a label.

use kiln_ast::{CaseBranch, CaseItem, ExceptClause, IfBranch, Magic, Node, NodeKind, SymbolId};
use kiln_ir::{ArmPattern, Instr, IrType, IrTypeTable, LabelId, Rvalue, SelectArm, SelectValue};

use crate::flow::{falls_through, is_const_true};
use crate::{LowerError, ProcCtx, Value};

impl ProcCtx<'_, '_> {
    /// Lower a branch body into the shared destination when it yields a
    /// value and can complete normally; otherwise as a statement.
    fn gen_arm(&mut self, body: &Node, yields: bool, dest: &mut Value) -> Result<bool, LowerError> {
        let falls = falls_through(self.m.program, body);
        self.open_scope();
        if yields && falls {
            self.gen(body, dest)?;
        } else {
            self.gen_stmt(body)?;
        }
        self.close_scope(body.span)?;
        Ok(falls)
    }

    /// Make a value-producing construct's destination addressable before
    /// any branch writes to it.
    fn prepare_dest(&mut self, n: &Node, dest: &mut Value) -> Result<bool, LowerError> {
        if self.is_void(n.ty) {
            return Ok(false);
        }
        self.dest_place(dest, self.ir_type(n.ty), n.span)?;
        Ok(true)
    }

    /// Jump to `target` when `cond` evaluates to `jump_if`. `not x` is
    /// folded into the jump's sense.
    pub(super) fn gen_cond_jump(&mut self, cond: &Node, jump_if: bool, target: LabelId) -> Result<(), LowerError> {
        if let Some(inner) = self.negated(cond) {
            return self.gen_cond_jump(inner, !jump_if, target);
        }
        let v = self.genx(cond)?;
        let op = self.operand(&v, cond.span)?;
        self.branch(op, jump_if, target);
        self.release(v);
        Ok(())
    }

    fn negated<'n>(&self, cond: &'n Node) -> Option<&'n Node> {
        match &cond.kind {
            NodeKind::Call { callee, args } if args.len() == 1 => {
                (self.magic_of(callee) == Some(Magic::Not)).then(|| &args[0])
            }
            _ => None,
        }
    }

    // ── if ──────────────────────────────────────────────────────

    pub(super) fn gen_if(&mut self, n: &Node, branches: &[IfBranch], dest: &mut Value) -> Result<(), LowerError> {
        let yields = self.prepare_dest(n, dest)?;
        let end = self.new_label();
        let last = branches.len().saturating_sub(1);
        for (i, branch) in branches.iter().enumerate() {
            let next = match &branch.cond {
                Some(cond) => {
                    let next = self.new_label();
                    self.gen_cond_jump(cond, false, next)?;
                    Some(next)
                }
                None => None,
            };
            let falls = self.gen_arm(&branch.body, yields, dest)?;
            if falls && i != last {
                self.goto(end);
            }
            if let Some(next) = next {
                self.place(next, branch.body.span)?;
            }
        }
        self.place(end, n.span)
    }

    // ── Loops and blocks ────────────────────────────────────────

    pub(super) fn gen_while(&mut self, n: &Node, cond: &Node, body: &Node) -> Result<(), LowerError> {
        let exit = self.push_block(None);
        let head = self.new_label();
        self.place_loop(head, n.span)?;
        if !is_const_true(self.m.program, cond) {
            self.gen_cond_jump(cond, false, exit)?;
        }
        self.open_scope();
        self.gen_stmt(body)?;
        self.close_scope(body.span)?;
        self.emit(Instr::GotoLoop(head));
        self.pop_block();
        self.place(exit, n.span)
    }

    pub(super) fn gen_block(
        &mut self,
        n: &Node,
        label: Option<SymbolId>,
        body: &Node,
        dest: &mut Value,
    ) -> Result<(), LowerError> {
        let yields = self.prepare_dest(n, dest)?;
        let exit = self.push_block(label);
        self.open_scope();
        if yields {
            self.gen(body, dest)?;
        } else {
            self.gen_stmt(body)?;
        }
        self.close_scope(body.span)?;
        self.pop_block();
        self.place(exit, n.span)
    }

    pub(super) fn gen_break(&mut self, n: &Node, target: Option<SymbolId>) -> Result<(), LowerError> {
        let label = self.find_block(target, n.span)?;
        self.goto(label);
        Ok(())
    }

    // ── case ────────────────────────────────────────────────────

    pub(super) fn gen_case(
        &mut self,
        n: &Node,
        scrutinee: &Node,
        branches: &[CaseBranch],
        dest: &mut Value,
    ) -> Result<(), LowerError> {
        let yields = self.prepare_dest(n, dest)?;
        let v = self.genx(scrutinee)?;
        let value = self.operand(&v, scrutinee.span)?;

        let labels: Vec<LabelId> = (0..branches.len()).map(|_| self.new_label()).collect();
        let end = self.new_label();
        let mut arms = Vec::with_capacity(branches.len());
        for (branch, &target) in branches.iter().zip(&labels) {
            let pattern = if branch.is_else() {
                ArmPattern::Else
            } else {
                let mut values = Vec::with_capacity(branch.items.len());
                for item in &branch.items {
                    values.push(match item {
                        CaseItem::Value(x) => SelectValue::Value(self.literal_of(x)?),
                        CaseItem::Range(lo, hi) => SelectValue::Range(self.literal_of(lo)?, self.literal_of(hi)?),
                    });
                }
                ArmPattern::Values(values)
            };
            arms.push(SelectArm { pattern, target });
        }
        self.emit(Instr::Select {
            ty: self.ir_type(scrutinee.ty),
            value,
            arms,
        });
        self.release(v);
        if !branches.iter().any(CaseBranch::is_else) {
            self.goto(end);
        }

        let last = branches.len().saturating_sub(1);
        for (i, (branch, &label)) in branches.iter().zip(&labels).enumerate() {
            self.place(label, branch.body.span)?;
            let falls = self.gen_arm(&branch.body, yields, dest)?;
            if falls && i != last {
                self.goto(end);
            }
        }
        self.place(end, n.span)
    }

    // ── try ─────────────────────────────────────────────────────

    /// Layout:
    ///
    /// ```text
    ///     body                 ; raises go to `entry`, returns to `ret`
    ///     goto fin
    /// entry:
    ///     test_exc T1 else n1  ; one test per handler
    ///     handler1
    ///     goto fin
    /// n1: ...                  ; no handler matched: fall into fin
    /// fin:
    ///     finally
    ///     checked_goto outer_exc
    ///     goto after           ; only when some `return` went to `ret`
    /// ret:
    ///     finally
    ///     checked_goto outer_exc
    ///     goto outer_ret
    /// after:
    /// ```
    pub(super) fn gen_try(
        &mut self,
        n: &Node,
        body: &Node,
        handlers: &[ExceptClause],
        finally: Option<&Node>,
        dest: &mut Value,
    ) -> Result<(), LowerError> {
        let yields = self.prepare_dest(n, dest)?;
        let outer_exc = self.exc_target();
        let outer_ret = self.peek_ret();
        let entry = self.new_label();
        let fin = self.new_label();
        let try_ret = match finally {
            Some(_) => self.new_label(),
            None => outer_ret,
        };

        self.push_exit(entry, try_ret);
        let body_falls = self.gen_arm(body, yields, dest)?;
        let body_frame = self.pop_exit();
        if body_falls {
            self.goto(fin);
        }

        self.place(entry, n.span)?;
        match finally {
            Some(_) => self.push_exit(fin, try_ret),
            None => self.push_exit(outer_exc, outer_ret),
        }
        for handler in handlers {
            self.gen_handler(handler, yields, fin, dest)?;
        }
        let handler_frame = self.pop_exit();

        self.place(fin, n.span)?;
        if let Some(f) = finally {
            self.gen_finally(f)?;
        }
        self.emit(Instr::CheckedGoto { target: outer_exc });

        let ret_used = [body_frame, handler_frame]
            .iter()
            .flatten()
            .any(|frame| frame.ret_used);
        if let (Some(f), true) = (finally, ret_used) {
            let after = self.new_label();
            self.goto(after);
            self.place(try_ret, f.span)?;
            self.gen_finally(f)?;
            self.emit(Instr::CheckedGoto { target: outer_exc });
            let ret = self.ret_target();
            self.goto(ret);
            self.place(after, n.span)?;
        }
        Ok(())
    }

    fn gen_handler(
        &mut self,
        handler: &ExceptClause,
        yields: bool,
        fin: LabelId,
        dest: &mut Value,
    ) -> Result<(), LowerError> {
        let next = self.new_label();
        match handler.types.as_slice() {
            [] => self.emit(Instr::TestExc {
                ty: None,
                otherwise: next,
            }),
            [only] => self.emit(Instr::TestExc {
                ty: Some(self.ir_type(*only)),
                otherwise: next,
            }),
            [init @ .., last] => {
                let matched = self.new_label();
                for ty in init {
                    let try_next = self.new_label();
                    self.emit(Instr::TestExc {
                        ty: Some(self.ir_type(*ty)),
                        otherwise: try_next,
                    });
                    self.goto(matched);
                    self.place(try_next, handler.body.span)?;
                }
                self.emit(Instr::TestExc {
                    ty: Some(self.ir_type(*last)),
                    otherwise: next,
                });
                self.place(matched, handler.body.span)?;
            }
        }
        if self.gen_arm(&handler.body, yields, dest)? {
            self.goto(fin);
        }
        self.place(next, handler.body.span)
    }

    fn gen_finally(&mut self, f: &Node) -> Result<(), LowerError> {
        self.open_scope();
        self.gen_stmt(f)?;
        self.close_scope(f.span)
    }

    // ── Non-local transfers ─────────────────────────────────────

    pub(super) fn gen_return(&mut self, value: Option<&Node>) -> Result<(), LowerError> {
        if let Some(value) = value {
            match self.result() {
                Some(slot) => {
                    let mut dest = Value::Place(kiln_ir::Place::Slot(slot));
                    self.gen(value, &mut dest)?;
                }
                None => self.gen_stmt(value)?,
            }
        }
        let target = self.ret_target();
        self.goto(target);
        Ok(())
    }

    pub(super) fn gen_raise(&mut self, value: Option<&Node>) -> Result<(), LowerError> {
        match value {
            Some(value) => {
                let v = self.genx(value)?;
                let op = self.operand(&v, value.span)?;
                self.emit(Instr::SetExc { value: op });
                self.release(v);
            }
            None => {
                // Re-raise the exception being handled.
                let ty = self.m.types.intern(IrType::Ptr(IrTypeTable::VOID));
                let t = self.alloc(ty);
                self.emit(Instr::Asgn {
                    ty,
                    dst: t.place(),
                    src: Rvalue::CurrentExc,
                });
                self.emit(Instr::SetExc { value: t.operand() });
                self.free(t);
            }
        }
        let target = self.exc_target();
        self.goto(target);
        Ok(())
    }
}
