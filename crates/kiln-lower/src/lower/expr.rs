// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Expression lowering: leaves, symbols, places and aggregate access.

use kiln_ast::{ConstValue, Magic, Node, NodeKind, SymKind, SymbolId, TypeId, TypeKind};
use kiln_ir::{BinOp, Literal, Operand, Place, Rvalue};

use crate::{LowerError, LowerErrorKind, ProcCtx, Value};

pub(super) fn unsupported(what: impl Into<String>, node: &Node) -> LowerError {
    LowerError::new(LowerErrorKind::UnsupportedNode { what: what.into() }, node.span)
}

impl ProcCtx<'_, '_> {
    /// Lower `n`, leaving its value in `dest`.
    pub fn gen(&mut self, n: &Node, dest: &mut Value) -> Result<(), LowerError> {
        match &n.kind {
            NodeKind::Empty | NodeKind::Pragma | NodeKind::Comment(_) | NodeKind::ProcDef(_) => {
                Ok(())
            }
            NodeKind::Meta(what) => Err(unsupported(format!("reflection construct `{}`", what), n)),

            NodeKind::IntLit(v) => {
                let lit = self.int_literal(n.ty, *v);
                self.put(dest, self.ir_type(n.ty), Operand::Const(lit), n.span)
            }
            NodeKind::UIntLit(v) => {
                let lit = self.int_literal(n.ty, *v as i64);
                self.put(dest, self.ir_type(n.ty), Operand::Const(lit), n.span)
            }
            NodeKind::FloatLit(v) => {
                let ty = self.ir_type(n.ty);
                let lit = Literal::Float { ty, bits: v.to_bits() };
                self.put(dest, ty, Operand::Const(lit), n.span)
            }
            NodeKind::StrLit(s) => {
                let lit = Literal::Str(self.intern(s));
                self.put(dest, self.ir_type(n.ty), Operand::Const(lit), n.span)
            }
            NodeKind::CharLit(c) => {
                self.put(dest, self.ir_type(n.ty), Operand::Const(Literal::Char(*c)), n.span)
            }
            NodeKind::BoolLit(b) => self.put(dest, self.bool_ty(), Operand::bool(*b), n.span),
            NodeKind::NilLit => {
                self.put(dest, self.ir_type(n.ty), Operand::Const(Literal::Nil), n.span)
            }

            NodeKind::Sym(id) => self.gen_sym(n, *id, dest),
            NodeKind::Builtin(m) => Err(unsupported(format!("built-in `{}` outside of a call", m), n)),
            NodeKind::Call { .. } => self.gen_call(n, Some(dest)),

            NodeKind::If(branches) => self.gen_if(n, branches, dest),
            NodeKind::While { cond, body } => self.gen_while(n, cond, body),
            NodeKind::Block { label, body } => self.gen_block(n, *label, body, dest),
            NodeKind::Break(target) => self.gen_break(n, *target),
            NodeKind::Case {
                scrutinee,
                branches,
            } => self.gen_case(n, scrutinee, branches, dest),
            NodeKind::Try {
                body,
                handlers,
                finally,
            } => self.gen_try(n, body, handlers, finally.as_deref(), dest),
            NodeKind::Return(value) => self.gen_return(value.as_deref()),
            NodeKind::Raise(value) => self.gen_raise(value.as_deref()),

            NodeKind::Asgn { dest: target, value } => self.gen_asgn(target, value),
            NodeKind::VarSection(defs) => self.gen_var_section(n, defs),
            NodeKind::Stmts(items) => self.gen_stmts(n, items, dest),
            NodeKind::Discard(value) => match value {
                Some(v) => self.gen_discard(v),
                None => Ok(()),
            },

            NodeKind::Field { base, field } => self.gen_field(n, base, *field, dest),
            NodeKind::Index { base, index } => self.gen_index(n, base, index, dest),
            NodeKind::Deref(inner) => {
                let v = self.genx(inner)?;
                let op = self.operand(&v, inner.span)?;
                self.assign(dest, self.ir_type(n.ty), Rvalue::Load(op), n.span)?;
                self.release(v);
                Ok(())
            }
            NodeKind::AddrOf(inner) => {
                let (place, held) = self.gen_place(inner)?;
                self.assign(dest, self.ir_type(n.ty), Rvalue::AddrOf(place), n.span)?;
                self.release_all(held);
                Ok(())
            }
            NodeKind::ObjConstr(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                let mut ops = Vec::with_capacity(fields.len());
                for (field, value) in fields {
                    let pos = self.field_position(*field, value)?;
                    let v = self.genx(value)?;
                    ops.push((pos, self.operand(&v, value.span)?));
                    values.push(v);
                }
                let ty = self.ir_type(n.ty);
                self.assign(dest, ty, Rvalue::ObjConstr { ty, fields: ops }, n.span)?;
                self.release_all(values);
                Ok(())
            }
            NodeKind::TupleConstr(items) => {
                let (values, ops) = self.gen_operands(items)?;
                let ty = self.ir_type(n.ty);
                let fields = ops.into_iter().enumerate().map(|(i, op)| (i as u32, op)).collect();
                self.assign(dest, ty, Rvalue::ObjConstr { ty, fields }, n.span)?;
                self.release_all(values);
                Ok(())
            }
            NodeKind::ArrayConstr(items) => {
                let (values, elems) = self.gen_operands(items)?;
                let ty = self.ir_type(n.ty);
                self.assign(dest, ty, Rvalue::ArrayConstr { ty, elems }, n.span)?;
                self.release_all(values);
                Ok(())
            }
            NodeKind::Conv(inner) | NodeKind::Cast(inner) => {
                let v = self.genx(inner)?;
                let value = self.operand(&v, inner.span)?;
                let ty = self.ir_type(n.ty);
                self.assign(dest, ty, Rvalue::Conv { ty, value }, n.span)?;
                self.release(v);
                Ok(())
            }
        }
    }

    /// Lower an expression whose value is needed.
    pub fn genx(&mut self, n: &Node) -> Result<Value, LowerError> {
        let mut v = Value::Empty;
        self.gen(n, &mut v)?;
        if v.is_empty() && !self.is_void(n.ty) {
            return Err(LowerError::new(
                LowerErrorKind::ResultNotSet {
                    ty: self.type_name(n.ty),
                },
                n.span,
            ));
        }
        Ok(v)
    }

    /// Lower `n` into a fresh temporary, even for leaves.
    pub(super) fn gen_copy(&mut self, n: &Node) -> Result<crate::Temp, LowerError> {
        let mut v = Value::Temp(self.alloc(self.ir_type(n.ty)));
        self.gen(n, &mut v)?;
        match v {
            Value::Temp(t) => Ok(t),
            other => {
                self.release(other);
                Err(LowerError::internal("temporary destination was replaced", n.span))
            }
        }
    }

    /// Lower a statement; any value it produces is dropped.
    pub fn gen_stmt(&mut self, n: &Node) -> Result<(), LowerError> {
        match &n.kind {
            NodeKind::Stmts(_)
            | NodeKind::Empty
            | NodeKind::Comment(_)
            | NodeKind::Pragma
            | NodeKind::ProcDef(_) => {}
            _ => self.source_loc(n.span),
        }
        match &n.kind {
            NodeKind::Call { .. } => self.gen_call(n, None),
            NodeKind::Stmts(items) => {
                for item in items {
                    self.gen_stmt(item)?;
                }
                Ok(())
            }
            _ => {
                let mut v = Value::Empty;
                self.gen(n, &mut v)?;
                self.release(v);
                Ok(())
            }
        }
    }

    pub(super) fn gen_operands(&mut self, items: &[Node]) -> Result<(Vec<Value>, Vec<Operand>), LowerError> {
        let mut values = Vec::with_capacity(items.len());
        let mut ops = Vec::with_capacity(items.len());
        for item in items {
            let v = self.genx(item)?;
            ops.push(self.operand(&v, item.span)?);
            values.push(v);
        }
        Ok((values, ops))
    }

    // ── Literals ────────────────────────────────────────────────

    pub(super) fn int_literal(&self, ty: TypeId, v: i64) -> Literal {
        let ir = self.ir_type(ty);
        let value = self.m.interner.intern_int(v);
        match self.type_kind(ty) {
            TypeKind::Int { signed: false, .. } => Literal::UInt { ty: ir, value },
            _ => Literal::Int { ty: ir, value },
        }
    }

    fn const_literal(&self, ty: TypeId, value: &ConstValue) -> Literal {
        match value {
            ConstValue::Int(v) => self.int_literal(ty, *v),
            ConstValue::UInt(v) => self.int_literal(ty, *v as i64),
            ConstValue::Float(v) => Literal::Float {
                ty: self.ir_type(ty),
                bits: v.to_bits(),
            },
            ConstValue::Bool(b) => Literal::Bool(*b),
            ConstValue::Char(c) => Literal::Char(*c),
            ConstValue::Str(s) => Literal::Str(self.intern(s)),
        }
    }

    /// A compile-time constant operand, as needed for `case` labels.
    pub(super) fn literal_of(&self, n: &Node) -> Result<Literal, LowerError> {
        match &n.kind {
            NodeKind::IntLit(v) => Ok(self.int_literal(n.ty, *v)),
            NodeKind::UIntLit(v) => Ok(self.int_literal(n.ty, *v as i64)),
            NodeKind::CharLit(c) => Ok(Literal::Char(*c)),
            NodeKind::BoolLit(b) => Ok(Literal::Bool(*b)),
            NodeKind::StrLit(s) => Ok(Literal::Str(self.intern(s))),
            NodeKind::NilLit => Ok(Literal::Nil),
            NodeKind::Sym(id) => {
                let sym = self.m.symbol(*id, n.span)?;
                match (&sym.kind, &sym.value) {
                    (SymKind::Const, Some(value)) => Ok(self.const_literal(n.ty, value)),
                    _ => Err(unsupported(format!("non-constant case label `{}`", sym.name), n)),
                }
            }
            _ => Err(unsupported("non-constant case label", n)),
        }
    }

    pub(super) fn magic_of(&self, callee: &Node) -> Option<Magic> {
        match &callee.kind {
            NodeKind::Builtin(m) => Some(*m),
            NodeKind::Sym(id) => self.m.program.symbol(*id).and_then(|s| s.magic),
            _ => None,
        }
    }

    // ── Symbols ─────────────────────────────────────────────────

    fn gen_sym(&mut self, n: &Node, id: SymbolId, dest: &mut Value) -> Result<(), LowerError> {
        let sym = self.m.symbol(id, n.span)?;
        let ty = self.ir_type(n.ty);
        match sym.kind {
            SymKind::Const => match &sym.value {
                Some(value) => {
                    let lit = self.const_literal(n.ty, value);
                    self.put(dest, ty, Operand::Const(lit), n.span)
                }
                None => Err(LowerError::new(
                    LowerErrorKind::MissingDescriptor {
                        what: format!("value of constant `{}`", sym.name),
                    },
                    n.span,
                )),
            },
            kind if kind.is_variable() => {
                if let Some(slot) = self.slots.local(id) {
                    if self.is_by_address(id) {
                        return self.assign(dest, ty, Rvalue::Load(Operand::Slot(slot)), n.span);
                    }
                    return self.put(dest, ty, Operand::Slot(slot), n.span);
                }
                if sym.flags.global {
                    let r = self.m.reference(sym);
                    return self.put(dest, ty, Operand::Sym(r), n.span);
                }
                Err(LowerError::new(
                    LowerErrorKind::MissingDescriptor {
                        what: format!("storage for `{}`", sym.name),
                    },
                    n.span,
                ))
            }
            kind if kind.is_routine() => {
                if let Some(magic) = sym.magic {
                    return Err(unsupported(format!("built-in `{}` used as a value", magic), n));
                }
                let r = self.m.reference(sym);
                self.put(dest, ty, Operand::Sym(r), n.span)
            }
            _ => Err(unsupported(format!("reference to `{}`", sym.name), n)),
        }
    }

    pub(super) fn field_position(&self, field: SymbolId, at: &Node) -> Result<u32, LowerError> {
        let sym = self.m.symbol(field, at.span)?;
        if sym.kind != SymKind::Field {
            return Err(LowerError::new(
                LowerErrorKind::MissingDescriptor {
                    what: format!("field descriptor for `{}`", sym.name),
                },
                at.span,
            ));
        }
        Ok(sym.position)
    }

    // ── Places ──────────────────────────────────────────────────

    /// Lower an assignable expression. The returned values keep the
    /// place's operands alive and must be released after use.
    pub fn gen_place(&mut self, n: &Node) -> Result<(Place, Vec<Value>), LowerError> {
        match &n.kind {
            NodeKind::Sym(id) => {
                let sym = self.m.symbol(*id, n.span)?;
                if let Some(slot) = self.slots.local(*id) {
                    let place = if self.is_by_address(*id) {
                        Place::Deref(Operand::Slot(slot))
                    } else {
                        Place::Slot(slot)
                    };
                    return Ok((place, Vec::new()));
                }
                if sym.flags.global {
                    return Ok((Place::Sym(self.m.reference(sym)), Vec::new()));
                }
                Err(LowerError::new(
                    LowerErrorKind::MissingDescriptor {
                        what: format!("storage for `{}`", sym.name),
                    },
                    n.span,
                ))
            }
            NodeKind::Field { base, field } => {
                let pos = self.field_position(*field, n)?;
                if self.is_pointer(base.ty) {
                    let v = self.genx(base)?;
                    let op = self.operand(&v, base.span)?;
                    let place = Place::Field {
                        base: Box::new(Place::Deref(op)),
                        field: pos,
                    };
                    return Ok((place, vec![v]));
                }
                let (base_place, held) = self.gen_place(base)?;
                let place = Place::Field {
                    base: Box::new(base_place),
                    field: pos,
                };
                Ok((place, held))
            }
            NodeKind::Index { base, index } => {
                let (base_place, mut held) = self.gen_place(base)?;
                let (iv, index_op) = self.gen_index_operand(base.ty, index)?;
                held.push(iv);
                let place = match self.type_kind(base.ty) {
                    TypeKind::String | TypeKind::Seq(_) => Place::SeqIndex {
                        base: Box::new(base_place),
                        index: index_op,
                        payload: self.m.types.payload_ptr(base.ty),
                    },
                    _ => Place::Index {
                        base: Box::new(base_place),
                        index: index_op,
                    },
                };
                Ok((place, held))
            }
            NodeKind::Deref(inner) => {
                let v = self.genx(inner)?;
                let op = self.operand(&v, inner.span)?;
                Ok((Place::Deref(op), vec![v]))
            }
            _ => Err(unsupported("an expression that is not assignable", n)),
        }
    }

    fn is_pointer(&self, ty: TypeId) -> bool {
        matches!(self.type_kind(ty), TypeKind::Ptr(_) | TypeKind::Ref(_))
    }

    /// Lower an index, rebased to zero for arrays with a non-zero low bound.
    fn gen_index_operand(&mut self, base_ty: TypeId, index: &Node) -> Result<(Value, Operand), LowerError> {
        let low = match self.type_kind(base_ty) {
            TypeKind::Array { low, .. } => *low,
            _ => 0,
        };
        let v = self.genx(index)?;
        let op = self.operand(&v, index.span)?;
        if low == 0 {
            return Ok((v, op));
        }
        let ty = self.ir_type(index.ty);
        let low_op = Operand::Const(self.int_literal(index.ty, low));
        let mut rebased = Value::Empty;
        self.assign(
            &mut rebased,
            ty,
            Rvalue::Binary {
                op: BinOp::Sub,
                ty,
                lhs: op,
                rhs: low_op,
            },
            index.span,
        )?;
        self.release(v);
        let op = self.operand(&rebased, index.span)?;
        Ok((rebased, op))
    }

    // ── Reads ───────────────────────────────────────────────────

    fn gen_field(&mut self, n: &Node, base: &Node, field: SymbolId, dest: &mut Value) -> Result<(), LowerError> {
        let pos = self.field_position(field, n)?;
        let v = self.genx(base)?;
        let op = self.operand(&v, base.span)?;
        self.assign(dest, self.ir_type(n.ty), Rvalue::FieldAt { base: op, field: pos }, n.span)?;
        self.release(v);
        Ok(())
    }

    fn gen_index(&mut self, n: &Node, base: &Node, index: &Node, dest: &mut Value) -> Result<(), LowerError> {
        let bv = self.genx(base)?;
        let base_op = self.operand(&bv, base.span)?;
        let (iv, index_op) = self.gen_index_operand(base.ty, index)?;
        let src = match self.type_kind(base.ty) {
            TypeKind::String | TypeKind::Seq(_) => Rvalue::SeqIndexAt {
                base: base_op,
                index: index_op,
                payload: self.m.types.payload_ptr(base.ty),
            },
            _ => Rvalue::IndexAt {
                base: base_op,
                index: index_op,
            },
        };
        self.assign(dest, self.ir_type(n.ty), src, n.span)?;
        self.release(iv);
        self.release(bv);
        Ok(())
    }
}
