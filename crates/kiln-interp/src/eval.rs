// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Operands, places and right-hand sides.

use std::rc::Rc;

use kiln_ir::{BinOp, Call, IrModule, IrType, IrTypeId, Literal, Operand, Place, Rvalue, SlotId, UnOp};

use crate::value::{Callable, Pointer, Root, Value};
use crate::{InterpError, Machine};

fn type_error(msg: impl Into<String>) -> InterpError {
    InterpError::TypeError(msg.into())
}

fn index_of(v: &Value) -> Result<usize, InterpError> {
    let i = v.as_int().ok_or_else(|| type_error(format!("index is not an integer: {}", v)))?;
    usize::try_from(i).map_err(|_| InterpError::IndexOutOfBounds { index: i, len: 0 })
}

/// One step into an aggregate.
fn step(v: &mut Value, i: usize) -> Result<&mut Value, InterpError> {
    let (items, len) = match v {
        Value::Object { fields, .. } => {
            let len = fields.len();
            (fields, len)
        }
        Value::Array(items) | Value::Seq(items) => {
            let len = items.len();
            (items, len)
        }
        other => return Err(type_error(format!("cannot index into {}", other))),
    };
    items.get_mut(i).ok_or(InterpError::IndexOutOfBounds {
        index: i as i64,
        len,
    })
}

fn element(v: &Value, i: usize) -> Result<Value, InterpError> {
    match v {
        Value::Object { fields: items, .. } | Value::Array(items) | Value::Seq(items) => {
            items.get(i).cloned().ok_or(InterpError::IndexOutOfBounds {
                index: i as i64,
                len: items.len(),
            })
        }
        Value::Str(s) => s.as_bytes().get(i).map(|b| Value::Char(*b)).ok_or(InterpError::IndexOutOfBounds {
            index: i as i64,
            len: s.len(),
        }),
        other => Err(type_error(format!("cannot index into {}", other))),
    }
}

impl Machine {
    pub(crate) fn slot_root(&self, slot: SlotId) -> Root {
        Root::Slot {
            frame: self.frames.len().saturating_sub(1),
            slot,
        }
    }

    pub(crate) fn literal(&self, m: &IrModule, lit: &Literal) -> Value {
        match lit {
            Literal::Int { value, .. } | Literal::UInt { value, .. } => Value::Int(m.int(*value)),
            Literal::Float { bits, .. } => Value::Float(f64::from_bits(*bits)),
            Literal::Str(s) => Value::Str(m.string(*s).to_string()),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Char(c) => Value::Char(*c),
            Literal::Nil => Value::Nil,
        }
    }

    pub(crate) fn operand(&mut self, module: usize, op: &Operand) -> Result<Value, InterpError> {
        match op {
            Operand::Slot(s) => self.read(&Pointer::new(self.slot_root(*s))),
            Operand::Const(lit) => {
                let modules = Rc::clone(&self.modules);
                Ok(self.literal(&modules[module], lit))
            }
            Operand::Sym(sym) => {
                if let Some(v) = self.globals.get(&(module, *sym)) {
                    return Ok(v.clone());
                }
                Ok(Value::Proc(self.resolve(module, *sym)?))
            }
        }
    }

    // ── Storage ─────────────────────────────────────────────────

    pub(crate) fn place(&mut self, module: usize, place: &Place) -> Result<Pointer, InterpError> {
        match place {
            Place::Slot(s) => Ok(Pointer::new(self.slot_root(*s))),
            Place::Sym(sym) => {
                if self.globals.contains_key(&(module, *sym)) {
                    Ok(Pointer::new(Root::Global { module, sym: *sym }))
                } else {
                    Err(InterpError::UnresolvedSymbol(format!("global {:?}", sym)))
                }
            }
            Place::Field { base, field } => {
                let mut p = self.place(module, base)?;
                p.path.push(*field as usize);
                Ok(p)
            }
            Place::Index { base, index } | Place::SeqIndex { base, index, .. } => {
                let mut p = self.place(module, base)?;
                let i = self.operand(module, index)?;
                p.path.push(index_of(&i)?);
                Ok(p)
            }
            Place::Deref(op) => match self.operand(module, op)? {
                Value::Ptr(p) => Ok(p),
                Value::Nil => Err(InterpError::NilDeref),
                other => Err(type_error(format!("dereference of {}", other))),
            },
        }
    }

    fn root_mut(&mut self, root: &Root) -> Result<&mut Value, InterpError> {
        match root {
            Root::Slot { frame, slot } => self
                .frames
                .get_mut(*frame)
                .and_then(|f| f.slots.get_mut(slot.index())),
            Root::Global { module, sym } => self.globals.get_mut(&(*module, *sym)),
            Root::Heap(i) => self.heap.get_mut(*i),
        }
        .ok_or(InterpError::Dangling)
    }

    fn root(&self, root: &Root) -> Result<&Value, InterpError> {
        match root {
            Root::Slot { frame, slot } => self.frames.get(*frame).and_then(|f| f.slots.get(slot.index())),
            Root::Global { module, sym } => self.globals.get(&(*module, *sym)),
            Root::Heap(i) => self.heap.get(*i),
        }
        .ok_or(InterpError::Dangling)
    }

    pub(crate) fn read(&self, p: &Pointer) -> Result<Value, InterpError> {
        let mut v = self.root(&p.root)?.clone();
        for &i in &p.path {
            v = element(&v, i)?;
        }
        Ok(v)
    }

    pub(crate) fn write(&mut self, p: &Pointer, value: Value) -> Result<(), InterpError> {
        let mut cell = self.root_mut(&p.root)?;
        let Some((&last, init)) = p.path.split_last() else {
            *cell = value;
            return Ok(());
        };
        for &i in init {
            cell = step(cell, i)?;
        }
        if let Value::Str(s) = cell {
            let Value::Char(c) = value else {
                return Err(type_error(format!("storing {} into a string", value)));
            };
            let mut bytes = std::mem::take(s).into_bytes();
            let len = bytes.len();
            let b = bytes.get_mut(last).ok_or(InterpError::IndexOutOfBounds {
                index: last as i64,
                len,
            })?;
            *b = c;
            *s = String::from_utf8_lossy(&bytes).into_owned();
            return Ok(());
        }
        *step(cell, last)? = value;
        Ok(())
    }

    pub(crate) fn alloc(&mut self, value: Value) -> Pointer {
        self.heap.push(value);
        Pointer::new(Root::Heap(self.heap.len() - 1))
    }

    /// Follow a pointer if `v` is one.
    fn deref_value(&self, v: Value) -> Result<Value, InterpError> {
        match v {
            Value::Ptr(p) => self.read(&p),
            Value::Nil => Err(InterpError::NilDeref),
            other => Ok(other),
        }
    }

    // ── Right-hand sides ────────────────────────────────────────

    pub(crate) fn eval(&mut self, module: usize, src: &Rvalue) -> Result<Value, InterpError> {
        let modules = Rc::clone(&self.modules);
        let m = &modules[module];
        match src {
            Rvalue::Use(op) => self.operand(module, op),
            Rvalue::Binary { op, ty, lhs, rhs } => {
                let l = self.operand(module, lhs)?;
                let r = self.operand(module, rhs)?;
                binary(*op, matches!(m.types.get(*ty), IrType::UInt(_)), l, r)
            }
            Rvalue::Unary { op, operand, .. } => {
                let v = self.operand(module, operand)?;
                match (op, v) {
                    (UnOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
                    (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnOp::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
                    (op, v) => Err(type_error(format!("{:?} on {}", op, v))),
                }
            }
            Rvalue::FieldAt { base, field } => {
                let b = self.operand(module, base)?;
                element(&self.deref_value(b)?, *field as usize)
            }
            Rvalue::IndexAt { base, index } | Rvalue::SeqIndexAt { base, index, .. } => {
                let b = self.operand(module, base)?;
                let i = self.operand(module, index)?;
                element(&self.deref_value(b)?, index_of(&i)?)
            }
            Rvalue::Load(op) => {
                let p = self.operand(module, op)?;
                self.deref_value(p)
            }
            Rvalue::AddrOf(place) => Ok(Value::Ptr(self.place(module, place)?)),
            Rvalue::Conv { ty, value } => {
                let v = self.operand(module, value)?;
                convert(m.types.get(*ty), v)
            }
            Rvalue::ObjConstr { ty, fields } => {
                let (target, on_heap) = match m.types.get(*ty) {
                    IrType::Ptr(inner) => (*inner, true),
                    _ => (*ty, false),
                };
                let mut obj = Value::zero(&m.types, target);
                for (pos, op) in fields {
                    let v = self.operand(module, op)?;
                    *step(&mut obj, *pos as usize)? = v;
                }
                if on_heap {
                    Ok(Value::Ptr(self.alloc(obj)))
                } else {
                    Ok(obj)
                }
            }
            Rvalue::ArrayConstr { elems, .. } => {
                let items = elems
                    .iter()
                    .map(|e| self.operand(module, e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(items))
            }
            Rvalue::CurrentExc => Ok(self.current.clone().unwrap_or(Value::Nil)),
            Rvalue::Call(call) => self.call_value(module, call),
        }
    }

    pub(crate) fn call_value(&mut self, module: usize, call: &Call) -> Result<Value, InterpError> {
        let target = match self.operand(module, &call.callee)? {
            Value::Proc(c) => c,
            Value::Nil => return Err(InterpError::NilDeref),
            other => return Err(type_error(format!("call of non-routine {}", other))),
        };
        let args = call
            .args
            .iter()
            .map(|a| self.operand(module, a))
            .collect::<Result<Vec<_>, _>>()?;
        if let Callable::Host(name) = &target {
            log::trace!("host call `{}`", name);
        }
        self.invoke(module, target, args)
    }
}

fn binary(op: BinOp, unsigned: bool, l: Value, r: Value) -> Result<Value, InterpError> {
    use BinOp::*;
    let v = match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            let (ua, ub) = (a as u64, b as u64);
            match op {
                Add => Value::Int(a.wrapping_add(b)),
                Sub => Value::Int(a.wrapping_sub(b)),
                Mul => Value::Int(a.wrapping_mul(b)),
                Div | Mod if b == 0 => return Err(InterpError::DivisionByZero),
                Div if unsigned => Value::Int((ua / ub) as i64),
                Div => Value::Int(a.wrapping_div(b)),
                Mod if unsigned => Value::Int((ua % ub) as i64),
                Mod => Value::Int(a.wrapping_rem(b)),
                Shl => Value::Int(a.wrapping_shl(b as u32)),
                Shr => Value::Int(ua.wrapping_shr(b as u32) as i64),
                Ashr => Value::Int(a.wrapping_shr(b as u32)),
                BitAnd => Value::Int(a & b),
                BitOr => Value::Int(a | b),
                BitXor => Value::Int(a ^ b),
                Eq => Value::Bool(a == b),
                Le if unsigned => Value::Bool(ua <= ub),
                Le => Value::Bool(a <= b),
                Lt if unsigned => Value::Bool(ua < ub),
                Lt => Value::Bool(a < b),
            }
        }
        (Value::Float(a), Value::Float(b)) => match op {
            Add => Value::Float(a + b),
            Sub => Value::Float(a - b),
            Mul => Value::Float(a * b),
            Div => Value::Float(a / b),
            Eq => Value::Bool(a == b),
            Le => Value::Bool(a <= b),
            Lt => Value::Bool(a < b),
            _ => return Err(type_error(format!("{:?} on floats", op))),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            Eq => Value::Bool(a == b),
            Le => Value::Bool(a <= b),
            Lt => Value::Bool(!a & b),
            BitXor => Value::Bool(a ^ b),
            BitAnd => Value::Bool(a & b),
            BitOr => Value::Bool(a | b),
            _ => return Err(type_error(format!("{:?} on bools", op))),
        },
        (Value::Char(a), Value::Char(b)) => match op {
            Eq => Value::Bool(a == b),
            Le => Value::Bool(a <= b),
            Lt => Value::Bool(a < b),
            _ => return Err(type_error(format!("{:?} on chars", op))),
        },
        (a, b) if op == Eq => Value::Bool(a == b),
        (a, b) => return Err(type_error(format!("{:?} on {} and {}", op, a, b))),
    };
    Ok(v)
}

fn convert(target: &IrType, v: Value) -> Result<Value, InterpError> {
    let as_int = |v: &Value| match v {
        Value::Float(x) => Some(*x as i64),
        other => other.as_int(),
    };
    let out = match target {
        IrType::Int(bits) | IrType::UInt(bits) => {
            let i = as_int(&v).ok_or_else(|| type_error(format!("cannot convert {} to an integer", v)))?;
            let signed = matches!(target, IrType::Int(_));
            Value::Int(truncate(i, *bits, signed))
        }
        IrType::Float(_) => match v {
            Value::Float(x) => Value::Float(x),
            other => Value::Float(as_int(&other).ok_or_else(|| type_error("cannot convert to a float"))? as f64),
        },
        IrType::Char => Value::Char(as_int(&v).ok_or_else(|| type_error("cannot convert to a char"))? as u8),
        IrType::Bool => Value::Bool(as_int(&v).ok_or_else(|| type_error("cannot convert to a bool"))? != 0),
        _ => v,
    };
    Ok(out)
}

fn truncate(i: i64, bits: u8, signed: bool) -> i64 {
    if bits == 0 || bits >= 64 {
        return i;
    }
    let shift = 64 - u32::from(bits);
    if signed {
        (i << shift) >> shift
    } else {
        ((i as u64) << shift >> shift) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ops() {
        assert_eq!(binary(BinOp::Add, false, Value::Int(2), Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(binary(BinOp::Lt, true, Value::Int(-1), Value::Int(1)), Ok(Value::Bool(false)));
        assert_eq!(binary(BinOp::Lt, false, Value::Int(-1), Value::Int(1)), Ok(Value::Bool(true)));
        assert_eq!(binary(BinOp::Div, false, Value::Int(1), Value::Int(0)), Err(InterpError::DivisionByZero));
        assert_eq!(binary(BinOp::Eq, false, Value::Nil, Value::Nil), Ok(Value::Bool(true)));
    }

    #[test]
    fn conversions_truncate() {
        assert_eq!(convert(&IrType::UInt(8), Value::Int(300)), Ok(Value::Int(44)));
        assert_eq!(convert(&IrType::Int(8), Value::Int(200)), Ok(Value::Int(-56)));
        assert_eq!(convert(&IrType::Char, Value::Int(65)), Ok(Value::Char(b'A')));
        assert_eq!(convert(&IrType::Float(64), Value::Int(2)), Ok(Value::Float(2.0)));
    }
}
