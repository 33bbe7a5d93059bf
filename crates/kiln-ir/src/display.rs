// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Display implementations for the IR.
//!
//! Instructions print raw ids; `IrModule` prints its string and integer
//! tables first so the listing can be read without lookups.

use std::fmt;

use crate::*;

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Bool => write!(f, "bool"),
            IrType::Char => write!(f, "char"),
            IrType::Int(bits) => write!(f, "i{}", bits),
            IrType::UInt(bits) => write!(f, "u{}", bits),
            IrType::Float(bits) => write!(f, "f{}", bits),
            IrType::Ptr(t) => write!(f, "ptr {}", t),
            IrType::PayloadPtr(t) => write!(f, "payload {}", t),
            IrType::String => write!(f, "string"),
            IrType::Seq(t) => write!(f, "seq {}", t),
            IrType::Array { elem, len } => write!(f, "[{}; {}]", elem, len),
            IrType::Object { name, fields } => {
                write!(f, "object {} {{", name)?;
                for (i, t) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "}}")
            }
            IrType::ProcPtr => write!(f, "procptr"),
        }
    }
}

impl fmt::Display for SymRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymRef::Local(id) => write!(f, "sym{}", id.0),
            SymRef::Module { module, item } => write!(f, "{}::{}", module, item),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int { ty, value } | Literal::UInt { ty, value } => {
                write!(f, "{}:{}", value, ty)
            }
            Literal::Float { ty, bits } => write!(f, "{}:{}", f64::from_bits(*bits), ty),
            Literal::Str(s) => write!(f, "str {}", s),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Char(c) => write!(f, "'{}'", c.escape_ascii()),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Slot(s) => write!(f, "{}", s),
            Operand::Const(c) => write!(f, "{}", c),
            Operand::Sym(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Slot(s) => write!(f, "{}", s),
            Place::Sym(s) => write!(f, "{}", s),
            Place::Field { base, field } => write!(f, "{}.{}", base, field),
            Place::Index { base, index } => write!(f, "{}[{}]", base, index),
            Place::SeqIndex {
                base,
                index,
                payload,
            } => write!(f, "{}[{} via {}]", base, index, payload),
            Place::Deref(op) => write!(f, "*{}", op),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
            BinOp::Ashr => "ashr",
            BinOp::BitAnd => "and",
            BinOp::BitOr => "or",
            BinOp::BitXor => "xor",
            BinOp::Eq => "eq",
            BinOp::Le => "le",
            BinOp::Lt => "lt",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnOp::Neg => "neg",
            UnOp::Not => "not",
            UnOp::BitNot => "bitnot",
        };
        write!(f, "{}", name)
    }
}

fn comma_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            CallKind::Direct => "call",
            CallKind::Indirect => "call_ind",
            CallKind::CheckedDirect => "call_chk",
            CallKind::CheckedIndirect => "call_ind_chk",
        };
        write!(f, "{} {}(", kind, self.callee)?;
        comma_list(f, &self.args)?;
        write!(f, ")")?;
        if let Some(exit) = self.exit {
            write!(f, " unwind {}", exit)?;
        }
        Ok(())
    }
}

impl fmt::Display for Rvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rvalue::Use(op) => write!(f, "{}", op),
            Rvalue::Binary { op, ty, lhs, rhs } => write!(f, "{}.{} {}, {}", op, ty, lhs, rhs),
            Rvalue::Unary { op, ty, operand } => write!(f, "{}.{} {}", op, ty, operand),
            Rvalue::FieldAt { base, field } => write!(f, "{}.{}", base, field),
            Rvalue::IndexAt { base, index } => write!(f, "{}[{}]", base, index),
            Rvalue::SeqIndexAt {
                base,
                index,
                payload,
            } => write!(f, "{}[{} via {}]", base, index, payload),
            Rvalue::Load(op) => write!(f, "*{}", op),
            Rvalue::AddrOf(place) => write!(f, "&{}", place),
            Rvalue::Conv { ty, value } => write!(f, "conv.{} {}", ty, value),
            Rvalue::ObjConstr { ty, fields } => {
                write!(f, "{} {{", ty)?;
                for (i, (idx, op)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", idx, op)?;
                }
                write!(f, "}}")
            }
            Rvalue::ArrayConstr { ty, elems } => {
                write!(f, "{} [", ty)?;
                comma_list(f, elems)?;
                write!(f, "]")
            }
            Rvalue::CurrentExc => write!(f, "current_exc"),
            Rvalue::Call(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for SelectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectValue::Value(v) => write!(f, "{}", v),
            SelectValue::Range(lo, hi) => write!(f, "{}..{}", lo, hi),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Summon { slot, ty, name } => {
                write!(f, "summon {}: {}", slot, ty)?;
                if let Some(name) = name {
                    write!(f, " ({})", name)?;
                }
                Ok(())
            }
            Instr::Asgn { ty, dst, src } => write!(f, "{}: {} = {}", dst, ty, src),
            Instr::Call(call) => write!(f, "{}", call),
            Instr::Label(l) => write!(f, "{}:", l),
            Instr::LoopLabel(l) => write!(f, "loop {}:", l),
            Instr::Goto(l) => write!(f, "goto {}", l),
            Instr::GotoLoop(l) => write!(f, "goto loop {}", l),
            Instr::Select { ty, value, arms } => {
                write!(f, "select.{} {} [", ty, value)?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    match &arm.pattern {
                        ArmPattern::Values(values) => comma_list(f, values)?,
                        ArmPattern::Else => write!(f, "else")?,
                    }
                    write!(f, " => {}", arm.target)?;
                }
                write!(f, "]")
            }
            Instr::SetExc { value } => write!(f, "set_exc {}", value),
            Instr::TestExc { ty, otherwise } => match ty {
                Some(ty) => write!(f, "test_exc {} else {}", ty, otherwise),
                None => write!(f, "test_exc any else {}", otherwise),
            },
            Instr::CheckedGoto { target } => write!(f, "goto_if_exc {}", target),
            Instr::SourceLoc(loc) => write!(f, "loc {}", loc),
        }
    }
}

impl fmt::Display for IrProc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc {}", self.name)?;
        if let Some(sym) = self.sym {
            write!(f, " [{}]", sym)?;
        }
        write!(f, "(")?;
        comma_list(f, &self.params)?;
        write!(f, ")")?;
        if let Some(result) = self.result {
            write!(f, " -> {}", result)?;
        }
        writeln!(f, " {{")?;
        for slot in &self.slots {
            let kind = match slot.kind {
                SlotKind::Param => "param",
                SlotKind::Result => "result",
                SlotKind::Local => "local",
                SlotKind::Temp => "temp",
            };
            writeln!(f, "    {} {}: {}", kind, slot.id, slot.ty)?;
        }
        for instr in &self.body {
            match instr {
                Instr::Label(_) | Instr::LoopLabel(_) => writeln!(f, "  {}", instr)?,
                _ => writeln!(f, "    {}", instr)?,
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for (id, ty) in self.types.iter() {
            writeln!(f, "  type {} = {}", id, ty)?;
        }
        for (i, s) in self.strings.iter().enumerate() {
            writeln!(f, "  string {} = {:?}", StrId(i as u32), s)?;
        }
        for (i, v) in self.ints.iter().enumerate() {
            writeln!(f, "  int {} = {}", IntId(i as u32), v)?;
        }
        for g in &self.globals {
            writeln!(f, "  global {} {}: {}", g.sym, self.string(g.name), g.ty)?;
        }
        for e in &self.externs {
            let what = if e.runtime { "runtime" } else { "extern" };
            writeln!(f, "  {} {} {}", what, e.sym, self.string(e.name))?;
        }
        if let Some(init) = &self.init {
            write!(f, "\n{}", init)?;
        }
        for p in &self.procs {
            write!(f, "\n{}", p)?;
        }
        Ok(())
    }
}
