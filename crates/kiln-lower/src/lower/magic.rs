// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Built-in operation dispatch.
//!
//! Every built-in falls into one strategy: an inline IR operation, a
//! call into the runtime support library, a rewrite into other
//! constructs, or a diagnostic. The table is an exhaustive match, so a
//! new tag cannot be added without deciding how it lowers.

use kiln_ast::{Magic, Node, TypeKind};
use kiln_ir::{BinOp, IrType, Literal, Operand, Rvalue, UnOp};

use crate::runtime;
use crate::{LowerError, LowerErrorKind, ProcCtx, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Inline two-operand IR operation
    Binary(BinOp),
    /// Inline one-operand IR operation
    Unary(UnOp),
    /// The operand itself
    Identity,
    /// Value conversion to the call's type
    Conv,
    /// Address of the operand
    Addr,
    /// `and`/`or` with conditional evaluation of the right operand
    ShortCircuit { and: bool },
    /// Comparison against `nil`
    IsNil,
    /// Call into the runtime; `by_address` passes the first operand's address
    Runtime {
        routine: &'static str,
        by_address: bool,
    },
    /// Expressed through other constructs before lowering
    Rewrite,
    /// Needs a complete layout, which lowering does not compute
    LayoutQuery(&'static str),
    Unsupported,
    /// Lowers to nothing
    Ignore,
}

const fn rt(routine: &'static str) -> Strategy {
    Strategy::Runtime {
        routine,
        by_address: false,
    }
}

const fn rt_addr(routine: &'static str) -> Strategy {
    Strategy::Runtime {
        routine,
        by_address: true,
    }
}

pub fn strategy(magic: Magic) -> Strategy {
    use Strategy::*;
    match magic {
        Magic::AddI | Magic::AddU | Magic::AddF => Binary(BinOp::Add),
        Magic::SubI | Magic::SubU | Magic::SubF => Binary(BinOp::Sub),
        Magic::MulI | Magic::MulU | Magic::MulF => Binary(BinOp::Mul),
        Magic::DivI | Magic::DivU | Magic::DivF => Binary(BinOp::Div),
        Magic::ModI | Magic::ModU => Binary(BinOp::Mod),
        Magic::ShlI => Binary(BinOp::Shl),
        Magic::ShrI => Binary(BinOp::Shr),
        Magic::AshrI => Binary(BinOp::Ashr),
        Magic::BitandI => Binary(BinOp::BitAnd),
        Magic::BitorI => Binary(BinOp::BitOr),
        Magic::BitxorI | Magic::Xor => Binary(BinOp::BitXor),
        Magic::EqI
        | Magic::EqU
        | Magic::EqF
        | Magic::EqB
        | Magic::EqCh
        | Magic::EqEnum
        | Magic::EqRef
        | Magic::EqProc => Binary(BinOp::Eq),
        Magic::LeI | Magic::LeU | Magic::LeF | Magic::LeB | Magic::LeCh | Magic::LeEnum => {
            Binary(BinOp::Le)
        }
        Magic::LtI | Magic::LtU | Magic::LtF | Magic::LtB | Magic::LtCh | Magic::LtEnum => {
            Binary(BinOp::Lt)
        }

        Magic::UnaryMinusI | Magic::UnaryMinusF => Unary(UnOp::Neg),
        Magic::BitnotI => Unary(UnOp::BitNot),
        Magic::Not => Unary(UnOp::Not),
        Magic::UnaryPlus => Identity,

        Magic::Ord
        | Magic::Chr
        | Magic::ToFloat
        | Magic::ToInt
        | Magic::ToU8
        | Magic::ToU16
        | Magic::ToU32 => Conv,
        Magic::Addr => Addr,
        Magic::And => ShortCircuit { and: true },
        Magic::Or => ShortCircuit { and: false },
        Magic::IsNil => IsNil,

        Magic::IntToStr => rt(runtime::INT_TO_STRING),
        Magic::FloatToStr => rt(runtime::FLOAT_TO_STRING),
        Magic::BoolToStr => rt(runtime::BOOL_TO_STRING),
        Magic::CharToStr => rt(runtime::CHAR_TO_STRING),
        Magic::CStrToStr => rt(runtime::CSTRING_TO_STRING),
        Magic::LengthStr => rt(runtime::STRING_LEN),
        Magic::LengthSeq => rt(runtime::SEQ_LEN),
        Magic::ConStrStr => rt(runtime::STRING_CONCAT),
        Magic::AppendStrCh => rt_addr(runtime::STRING_PUSH),
        Magic::AppendStrStr => rt_addr(runtime::STRING_APPEND),
        Magic::AppendSeqElem => rt_addr(runtime::SEQ_PUSH),
        Magic::SetLengthStr => rt_addr(runtime::STRING_SET_LEN),
        Magic::SetLengthSeq => rt_addr(runtime::SEQ_SET_LEN),
        Magic::NewSeq => rt_addr(runtime::SEQ_NEW),
        Magic::EqStr => rt(runtime::STRING_EQ),
        Magic::LeStr => rt(runtime::STRING_LE),
        Magic::LtStr => rt(runtime::STRING_LT),
        Magic::Echo => rt(runtime::ECHO),
        Magic::New => rt_addr(runtime::ALLOC),
        Magic::Quit => rt(runtime::QUIT),

        Magic::High
        | Magic::Low
        | Magic::LengthArray
        | Magic::Inc
        | Magic::Dec
        | Magic::Succ
        | Magic::Pred
        | Magic::EnumToStr
        | Magic::Swap
        | Magic::GetCurrentException
        | Magic::StrToStr => Rewrite,

        Magic::SizeOf => LayoutQuery("size"),
        Magic::AlignOf => LayoutQuery("alignment"),
        Magic::OffsetOf => LayoutQuery("offset"),

        Magic::TypeTrait
        | Magic::GetTypeInfo
        | Magic::Compiles
        | Magic::Defined
        | Magic::DeclaredInScope
        | Magic::AstToStr
        | Magic::Quote
        | Magic::NimNodeOp
        | Magic::Incl
        | Magic::Excl
        | Magic::Card
        | Magic::InSet
        | Magic::PlusSet
        | Magic::MinusSet
        | Magic::MulSet
        | Magic::EqSet
        | Magic::LeSet
        | Magic::LtSet
        | Magic::PtrToInt
        | Magic::IntToPtr => Unsupported,

        Magic::Destroy | Magic::RunnableExamples => Ignore,
    }
}

/// The operands of a built-in with a fixed arity.
pub(super) fn operands<'n, const N: usize>(
    n: &Node,
    magic: Magic,
    args: &'n [Node],
) -> Result<&'n [Node; N], LowerError> {
    args.try_into().map_err(|_| {
        LowerError::internal(
            format!("`{}` expects {} operand(s), got {}", magic, N, args.len()),
            n.span,
        )
    })
}

impl ProcCtx<'_, '_> {
    pub(super) fn gen_magic(&mut self, n: &Node, magic: Magic, args: &[Node], dest: &mut Value) -> Result<(), LowerError> {
        log::trace!("built-in `{}`: {:?}", magic, strategy(magic));
        match strategy(magic) {
            Strategy::Binary(op) => {
                let [lhs, rhs] = operands::<2>(n, magic, args)?;
                let l = self.genx(lhs)?;
                let r = self.genx(rhs)?;
                let src = Rvalue::Binary {
                    op,
                    ty: self.ir_type(lhs.ty),
                    lhs: self.operand(&l, lhs.span)?,
                    rhs: self.operand(&r, rhs.span)?,
                };
                self.assign(dest, self.ir_type(n.ty), src, n.span)?;
                self.release(r);
                self.release(l);
                Ok(())
            }
            Strategy::Unary(op) => {
                let [arg] = operands::<1>(n, magic, args)?;
                let v = self.genx(arg)?;
                let src = Rvalue::Unary {
                    op,
                    ty: self.ir_type(arg.ty),
                    operand: self.operand(&v, arg.span)?,
                };
                self.assign(dest, self.ir_type(n.ty), src, n.span)?;
                self.release(v);
                Ok(())
            }
            Strategy::Identity => {
                let [arg] = operands::<1>(n, magic, args)?;
                self.gen(arg, dest)
            }
            Strategy::Conv => {
                let [arg] = operands::<1>(n, magic, args)?;
                let v = self.genx(arg)?;
                let ty = self.ir_type(n.ty);
                let value = self.operand(&v, arg.span)?;
                self.assign(dest, ty, Rvalue::Conv { ty, value }, n.span)?;
                self.release(v);
                Ok(())
            }
            Strategy::Addr => {
                let [arg] = operands::<1>(n, magic, args)?;
                let (place, held) = self.gen_place(arg)?;
                self.assign(dest, self.ir_type(n.ty), Rvalue::AddrOf(place), n.span)?;
                self.release_all(held);
                Ok(())
            }
            Strategy::ShortCircuit { and } => {
                let [lhs, rhs] = operands::<2>(n, magic, args)?;
                self.gen_short_circuit(n, and, lhs, rhs, dest)
            }
            Strategy::IsNil => {
                let [arg] = operands::<1>(n, magic, args)?;
                let v = self.genx(arg)?;
                let src = Rvalue::Binary {
                    op: BinOp::Eq,
                    ty: self.ir_type(arg.ty),
                    lhs: self.operand(&v, arg.span)?,
                    rhs: Operand::Const(Literal::Nil),
                };
                self.assign(dest, self.bool_ty(), src, n.span)?;
                self.release(v);
                Ok(())
            }
            Strategy::Runtime {
                routine,
                by_address,
            } => self.gen_runtime_magic(n, routine, by_address, args, dest),
            Strategy::Rewrite => self.gen_rewrite(n, magic, args, dest),
            Strategy::LayoutQuery(what) => {
                let ty = args.first().map(|a| a.ty).unwrap_or(n.ty);
                Err(LowerError::new(
                    LowerErrorKind::IncompleteTypeQuery {
                        what,
                        ty: self.type_name(ty),
                    },
                    n.span,
                ))
            }
            Strategy::Unsupported => Err(LowerError::new(LowerErrorKind::UnsupportedMagic { magic }, n.span)),
            Strategy::Ignore => Ok(()),
        }
    }

    fn gen_short_circuit(
        &mut self,
        n: &Node,
        and: bool,
        lhs: &Node,
        rhs: &Node,
        dest: &mut Value,
    ) -> Result<(), LowerError> {
        let ty = self.bool_ty();
        if let Value::Place(_) = dest {
            // `rhs` may read the destination: go through a temporary.
            let mut tmp = Value::Empty;
            self.gen_short_circuit(n, and, lhs, rhs, &mut tmp)?;
            let op = self.operand(&tmp, n.span)?;
            self.assign(dest, ty, Rvalue::Use(op), n.span)?;
            self.release(tmp);
            return Ok(());
        }
        let place = self.dest_place(dest, ty, n.span)?;
        let end = self.new_label();
        let mut into = Value::Place(place);
        self.gen(lhs, &mut into)?;
        let decided = self.operand(dest, n.span)?;
        // `and` is decided by false, `or` by true.
        self.branch(decided, !and, end);
        self.gen(rhs, &mut into)?;
        self.place(end, n.span)
    }

    fn gen_runtime_magic(
        &mut self,
        n: &Node,
        routine: &'static str,
        by_address: bool,
        args: &[Node],
        dest: &mut Value,
    ) -> Result<(), LowerError> {
        let mut values = Vec::with_capacity(args.len() + 1);
        let mut ops = Vec::with_capacity(args.len() + 1);
        let mut rest = args;
        if by_address {
            if let Some((first, tail)) = args.split_first() {
                let t = self.gen_address(first)?;
                ops.push(t.operand());
                values.push(Value::Temp(t));
                rest = tail;
            }
        }
        let (more_values, more_ops) = self.gen_operands(rest)?;
        values.extend(more_values);
        ops.extend(more_ops);

        if routine == runtime::ALLOC {
            // The allocator is told which type to lay out.
            let pointee = match args.first().map(|a| self.type_kind(a.ty)) {
                Some(TypeKind::Ref(t) | TypeKind::Ptr(t)) => self.ir_type(*t),
                _ => return Err(LowerError::internal("`new` on a non-reference", n.span)),
            };
            let int = self.m.types.intern(IrType::Int(self.m.int_bits()));
            let value = self.m.interner.intern_int(pointee.index() as i64);
            ops.push(Operand::Const(Literal::Int { ty: int, value }));
        }

        self.gen_runtime_call(n, routine, ops, dest)?;
        self.release_all(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::declare_runtime;
    use crate::{RuntimeLib, TableRuntime};
    use kiln_ast::build::ProgramBuilder;

    #[test]
    fn runtime_strategies_name_declared_routines() {
        let mut b = ProgramBuilder::new();
        b.module("main");
        declare_runtime(&mut b);
        let p = b.finish();
        let rt = TableRuntime::from_symbols(&p.symbols);
        for &m in Magic::ALL {
            if let Strategy::Runtime { routine, .. } = strategy(m) {
                assert!(rt.lookup(routine).is_some(), "{} uses undeclared `{}`", m, routine);
            }
        }
    }

    #[test]
    fn categories() {
        assert_eq!(strategy(Magic::AddU), Strategy::Binary(BinOp::Add));
        assert_eq!(strategy(Magic::LtEnum), Strategy::Binary(BinOp::Lt));
        assert_eq!(strategy(Magic::And), Strategy::ShortCircuit { and: true });
        assert_eq!(strategy(Magic::AlignOf), Strategy::LayoutQuery("alignment"));
        assert_eq!(strategy(Magic::Destroy), Strategy::Ignore);
        assert_eq!(
            strategy(Magic::AppendStrStr),
            Strategy::Runtime {
                routine: runtime::STRING_APPEND,
                by_address: true
            }
        );
        for m in [Magic::Incl, Magic::Card, Magic::Quote, Magic::PtrToInt] {
            assert_eq!(strategy(m), Strategy::Unsupported, "{}", m);
        }
    }
}
