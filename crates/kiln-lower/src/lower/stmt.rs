// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Assignments, variable sections and statement lists.

use kiln_ast::{Node, NodeKind, VarDef};
use kiln_ir::{Instr, Place};

use crate::{LowerError, ProcCtx, Value};

impl ProcCtx<'_, '_> {
    /// `dest = value`: the value is lowered straight into the place.
    pub(super) fn gen_asgn(&mut self, target: &Node, value: &Node) -> Result<(), LowerError> {
        let (place, held) = self.gen_place(target)?;
        let mut dest = Value::Place(place);
        self.gen(value, &mut dest)?;
        self.release(dest);
        self.release_all(held);
        Ok(())
    }

    pub(super) fn gen_var_section(&mut self, n: &Node, defs: &[VarDef]) -> Result<(), LowerError> {
        for def in defs {
            let sym = self.m.symbol(def.sym, n.span)?;
            let ty = self.ir_type(sym.ty);
            let place = if sym.flags.global {
                Place::Sym(self.m.reference(sym))
            } else {
                let name = self.intern(&sym.name);
                let slot = self.slots.declare_local(def.sym, ty, Some(name));
                self.emit(Instr::Summon {
                    slot,
                    ty,
                    name: Some(name),
                });
                Place::Slot(slot)
            };
            if let Some(init) = &def.init {
                let mut dest = Value::Place(place);
                self.gen(init, &mut dest)?;
            }
        }
        Ok(())
    }

    /// A typed list yields its last item; everything before is a statement.
    pub(super) fn gen_stmts(&mut self, n: &Node, items: &[Node], dest: &mut Value) -> Result<(), LowerError> {
        let Some((last, init)) = items.split_last() else {
            return Ok(());
        };
        for item in init {
            self.gen_stmt(item)?;
        }
        if self.is_void(n.ty) {
            self.gen_stmt(last)
        } else {
            self.gen(last, dest)
        }
    }

    pub(super) fn gen_discard(&mut self, value: &Node) -> Result<(), LowerError> {
        if matches!(value.kind, NodeKind::Call { .. }) {
            return self.gen_call(value, None);
        }
        let mut v = Value::Empty;
        self.gen(value, &mut v)?;
        self.release(v);
        Ok(())
    }
}
