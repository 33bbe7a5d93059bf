// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime support routines provided by the interpreter.

use std::rc::Rc;

use kiln_ir::IrTypeId;

use crate::value::{Pointer, Value};
use crate::{InterpError, Machine};

const HOST_ROUTINES: &[&str] = &[
    "Int_toString",
    "Float_toString",
    "Bool_toString",
    "Char_toString",
    "CString_toString",
    "String_len",
    "Seq_len",
    "String_concat",
    "String_push",
    "String_append",
    "Seq_push",
    "String_setLen",
    "Seq_setLen",
    "Seq_new",
    "String_eq",
    "String_le",
    "String_lt",
    "echo",
    "alloc",
    "quit",
];

pub(crate) fn is_host(name: &str) -> bool {
    HOST_ROUTINES.contains(&name)
}

fn arg(args: &[Value], i: usize) -> Result<Value, InterpError> {
    args.get(i).cloned().ok_or(InterpError::ArityMismatch {
        expected: i + 1,
        got: args.len(),
    })
}

fn string(v: &Value) -> Result<&str, InterpError> {
    v.as_str()
        .ok_or_else(|| InterpError::TypeError(format!("expected a string, got {}", v)))
}

fn int(v: &Value) -> Result<i64, InterpError> {
    v.as_int()
        .ok_or_else(|| InterpError::TypeError(format!("expected an integer, got {}", v)))
}

fn pointer(v: Value) -> Result<Pointer, InterpError> {
    match v {
        Value::Ptr(p) => Ok(p),
        Value::Nil => Err(InterpError::NilDeref),
        other => Err(InterpError::TypeError(format!("expected an address, got {}", other))),
    }
}

impl Machine {
    pub(crate) fn call_host(&mut self, from: usize, name: &str, args: Vec<Value>) -> Result<Value, InterpError> {
        let a = |i: usize| arg(&args, i);
        let v = match name {
            "Int_toString" => Value::Str(int(&a(0)?)?.to_string()),
            "Float_toString" | "Bool_toString" | "Char_toString" => Value::Str(a(0)?.to_string()),
            "CString_toString" => a(0)?,
            "String_len" => Value::Int(string(&a(0)?)?.len() as i64),
            "Seq_len" => match a(0)? {
                Value::Seq(items) => Value::Int(items.len() as i64),
                other => return Err(InterpError::TypeError(format!("`len` of {}", other))),
            },
            "String_concat" => {
                let (x, y) = (a(0)?, a(1)?);
                Value::Str(format!("{}{}", string(&x)?, string(&y)?))
            }
            "String_eq" | "String_le" | "String_lt" => {
                let (x, y) = (a(0)?, a(1)?);
                let (x, y) = (string(&x)?, string(&y)?);
                Value::Bool(match name {
                    "String_eq" => x == y,
                    "String_le" => x <= y,
                    _ => x < y,
                })
            }
            "String_push" | "String_append" => {
                let target = pointer(a(0)?)?;
                let tail = match a(1)? {
                    Value::Char(c) => (c as char).to_string(),
                    other => string(&other)?.to_string(),
                };
                let mut s = self.read(&target)?;
                let Value::Str(ref mut text) = s else {
                    return Err(InterpError::TypeError(format!("append to {}", s)));
                };
                text.push_str(&tail);
                self.write(&target, s)?;
                Value::Void
            }
            "Seq_push" => {
                let target = pointer(a(0)?)?;
                let mut items = self.read(&target)?;
                let Value::Seq(ref mut list) = items else {
                    return Err(InterpError::TypeError(format!("push to {}", items)));
                };
                list.push(a(1)?);
                self.write(&target, items)?;
                Value::Void
            }
            "String_setLen" => {
                let target = pointer(a(0)?)?;
                let len = usize::try_from(int(&a(1)?)?).unwrap_or(0);
                let mut bytes = string(&self.read(&target)?)?.as_bytes().to_vec();
                bytes.resize(len, 0);
                self.write(&target, Value::Str(String::from_utf8_lossy(&bytes).into_owned()))?;
                Value::Void
            }
            "Seq_setLen" | "Seq_new" => {
                // Element types are erased here; new elements start as nil.
                let target = pointer(a(0)?)?;
                let len = usize::try_from(int(&a(1)?)?).unwrap_or(0);
                let mut items = match self.read(&target)? {
                    Value::Seq(items) if name == "Seq_setLen" => items,
                    _ => Vec::new(),
                };
                items.resize(len, Value::Nil);
                self.write(&target, Value::Seq(items))?;
                Value::Void
            }
            "echo" => {
                let line: String = args.iter().map(|v| v.to_string()).collect();
                log::debug!("echo: {}", line);
                self.output.push_str(&line);
                self.output.push('\n');
                Value::Void
            }
            "alloc" => {
                let target = pointer(a(0)?)?;
                let ty = IrTypeId(u32::try_from(int(&a(1)?)?).unwrap_or(0));
                let modules = Rc::clone(&self.modules);
                let zero = modules
                    .get(from)
                    .map(|m| Value::zero(&m.types, ty))
                    .unwrap_or_default();
                let cell = self.alloc(zero);
                self.write(&target, Value::Ptr(cell))?;
                Value::Void
            }
            "quit" => return Err(InterpError::Exit(int(&a(0)?)?)),
            other => return Err(InterpError::UndefinedRoutine(other.to_string())),
        };
        Ok(v)
    }
}
