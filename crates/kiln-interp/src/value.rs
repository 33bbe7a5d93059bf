// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime values.

use std::fmt;

use kiln_ir::{IrType, IrTypeId, IrTypeTable, SlotId, SymRef};

/// A runtime value in the interpreter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Result of routines without one, and never-written slots
    #[default]
    Void,
    Nil,
    Bool(bool),
    /// Every integer width, signed or not
    Int(i64),
    Float(f64),
    Char(u8),
    Str(String),
    Seq(Vec<Value>),
    Array(Vec<Value>),
    Object { name: String, fields: Vec<Value> },
    Ptr(Pointer),
    Proc(Callable),
}

/// Something that can be called.
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    /// Lowered routine; `proc: None` is the module initializer
    Ir { module: usize, proc: Option<usize> },
    /// Runtime support routine provided by the host
    Host(String),
}

/// Storage a pointer starts from.
#[derive(Debug, Clone, PartialEq)]
pub enum Root {
    Slot { frame: usize, slot: SlotId },
    Global { module: usize, sym: SymRef },
    Heap(usize),
}

/// Address of a value: a root plus field/element positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    pub root: Root,
    pub path: Vec<usize>,
}

impl Pointer {
    pub fn new(root: Root) -> Self {
        Self { root, path: Vec::new() }
    }
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Char(c) => Some(i64::from(*c)),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The zero value of an IR type.
    pub fn zero(types: &IrTypeTable, ty: IrTypeId) -> Value {
        match types.get(ty) {
            IrType::Void => Value::Void,
            IrType::Bool => Value::Bool(false),
            IrType::Char => Value::Char(0),
            IrType::Int(_) | IrType::UInt(_) => Value::Int(0),
            IrType::Float(_) => Value::Float(0.0),
            IrType::Ptr(_) | IrType::PayloadPtr(_) | IrType::ProcPtr => Value::Nil,
            IrType::String => Value::Str(String::new()),
            IrType::Seq(_) => Value::Seq(Vec::new()),
            IrType::Array { elem, len } => Value::Array(vec![Value::zero(types, *elem); *len as usize]),
            IrType::Object { name, fields } => Value::Object {
                name: name.clone(),
                fields: fields.iter().map(|f| Value::zero(types, *f)).collect(),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "()"),
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Char(c) => write!(f, "{}", *c as char),
            Value::Str(s) => write!(f, "{}", s),
            Value::Seq(items) | Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object { name, .. } => write!(f, "{}", name),
            Value::Ptr(_) => write!(f, "<ptr>"),
            Value::Proc(_) => write!(f, "<proc>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values() {
        let mut tt = IrTypeTable::new();
        let int = tt.intern(IrType::Int(64));
        let arr = tt.intern(IrType::Array { elem: int, len: 3 });
        let obj = tt.intern(IrType::Object {
            name: "Point".into(),
            fields: vec![int, arr],
        });
        assert_eq!(Value::zero(&tt, arr), Value::Array(vec![Value::Int(0); 3]));
        let Value::Object { name, fields } = Value::zero(&tt, obj) else {
            panic!("expected an object");
        };
        assert_eq!(name, "Point");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn display() {
        let v = Value::Seq(vec![Value::Int(1), Value::Char(b'x')]);
        assert_eq!(v.to_string(), "[1, x]");
    }
}
