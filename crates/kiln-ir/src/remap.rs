// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Rewriting of interned ids.
//!
//! Every string, integer and location id a module stores is visited in
//! instruction order, so a table can be rebuilt by first use.

use crate::{
    ArmPattern, Call, ExternDecl, GlobalDecl, Instr, IntId, IrModule, IrProc, Literal, LocId, Operand, Place,
    Rvalue, SelectValue, StrId, SymRef,
};

/// Replacement for each interned id.
pub trait IdMap {
    fn str_id(&mut self, id: StrId) -> StrId;
    fn int_id(&mut self, id: IntId) -> IntId;
    fn loc_id(&mut self, id: LocId) -> LocId;
}

impl IrModule {
    /// Rewrite ids in declaration order: globals, the initializer,
    /// routines, then externs.
    pub fn remap_ids(&mut self, map: &mut dyn IdMap) {
        for g in &mut self.globals {
            g.remap_ids(map);
        }
        if let Some(init) = &mut self.init {
            init.remap_ids(map);
        }
        for p in &mut self.procs {
            p.remap_ids(map);
        }
        for e in &mut self.externs {
            e.remap_ids(map);
        }
    }
}

impl GlobalDecl {
    fn remap_ids(&mut self, map: &mut dyn IdMap) {
        sym_ref(&mut self.sym, map);
        self.name = map.str_id(self.name);
    }
}

impl ExternDecl {
    fn remap_ids(&mut self, map: &mut dyn IdMap) {
        sym_ref(&mut self.sym, map);
        self.name = map.str_id(self.name);
    }
}

impl IrProc {
    pub fn remap_ids(&mut self, map: &mut dyn IdMap) {
        if let Some(sym) = &mut self.sym {
            sym_ref(sym, map);
        }
        self.name = map.str_id(self.name);
        for slot in &mut self.slots {
            slot.name = slot.name.map(|n| map.str_id(n));
        }
        for instr in &mut self.body {
            instr.remap_ids(map);
        }
    }
}

impl Instr {
    fn remap_ids(&mut self, map: &mut dyn IdMap) {
        match self {
            Instr::Summon { name, .. } => *name = name.map(|n| map.str_id(n)),
            Instr::Asgn { dst, src, .. } => {
                place(dst, map);
                rvalue(src, map);
            }
            Instr::Call(c) => call(c, map),
            Instr::Select { value, arms, .. } => {
                operand(value, map);
                for arm in arms {
                    if let ArmPattern::Values(values) = &mut arm.pattern {
                        for v in values {
                            match v {
                                SelectValue::Value(lit) => literal(lit, map),
                                SelectValue::Range(lo, hi) => {
                                    literal(lo, map);
                                    literal(hi, map);
                                }
                            }
                        }
                    }
                }
            }
            Instr::SetExc { value } => operand(value, map),
            Instr::SourceLoc(loc) => *loc = map.loc_id(*loc),
            Instr::Label(_)
            | Instr::LoopLabel(_)
            | Instr::Goto(_)
            | Instr::GotoLoop(_)
            | Instr::TestExc { .. }
            | Instr::CheckedGoto { .. } => {}
        }
    }
}

fn sym_ref(sym: &mut SymRef, map: &mut dyn IdMap) {
    if let SymRef::Module { module, .. } = sym {
        *module = map.str_id(*module);
    }
}

fn literal(lit: &mut Literal, map: &mut dyn IdMap) {
    match lit {
        Literal::Int { value, .. } | Literal::UInt { value, .. } => *value = map.int_id(*value),
        Literal::Str(s) => *s = map.str_id(*s),
        Literal::Float { .. } | Literal::Bool(_) | Literal::Char(_) | Literal::Nil => {}
    }
}

fn operand(op: &mut Operand, map: &mut dyn IdMap) {
    match op {
        Operand::Slot(_) => {}
        Operand::Const(lit) => literal(lit, map),
        Operand::Sym(sym) => sym_ref(sym, map),
    }
}

fn place(p: &mut Place, map: &mut dyn IdMap) {
    match p {
        Place::Slot(_) => {}
        Place::Sym(sym) => sym_ref(sym, map),
        Place::Field { base, .. } => place(base, map),
        Place::Index { base, index } | Place::SeqIndex { base, index, .. } => {
            place(base, map);
            operand(index, map);
        }
        Place::Deref(op) => operand(op, map),
    }
}

fn call(c: &mut Call, map: &mut dyn IdMap) {
    operand(&mut c.callee, map);
    for arg in &mut c.args {
        operand(arg, map);
    }
    c.loc = c.loc.map(|l| map.loc_id(l));
}

fn rvalue(rv: &mut Rvalue, map: &mut dyn IdMap) {
    match rv {
        Rvalue::Use(op) | Rvalue::Load(op) => operand(op, map),
        Rvalue::Binary { lhs, rhs, .. } => {
            operand(lhs, map);
            operand(rhs, map);
        }
        Rvalue::Unary { operand: op, .. } => operand(op, map),
        Rvalue::FieldAt { base, .. } => operand(base, map),
        Rvalue::IndexAt { base, index } | Rvalue::SeqIndexAt { base, index, .. } => {
            operand(base, map);
            operand(index, map);
        }
        Rvalue::AddrOf(p) => place(p, map),
        Rvalue::Conv { value, .. } => operand(value, map),
        Rvalue::ObjConstr { fields, .. } => {
            for (_, op) in fields {
                operand(op, map);
            }
        }
        Rvalue::ArrayConstr { elems, .. } => {
            for op in elems {
                operand(op, map);
            }
        }
        Rvalue::CurrentExc => {}
        Rvalue::Call(c) => call(c, map),
    }
}
