// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Built-ins expressed through other constructs.
//!
//! Bounds and `succ`/`pred` expand into AST fragments that are lowered
//! again. Built-ins that name a location (`inc`, `swap`) or reuse a value
//! (`$` on enums) are lowered directly, so every operand is evaluated once.

use kiln_ast::{Magic, Node, NodeKind, TypeId, TypeKind, TypeTable};
use kiln_ir::{
    ArmPattern, BinOp, Instr, IrType, IrTypeId, LabelId, Literal, Operand, Place, Rvalue, SelectArm, SelectValue,
};

use super::expr::unsupported;
use super::magic::operands;
use crate::{runtime, LowerError, ProcCtx, Temp, Value};

fn builtin_call(at: &Node, magic: Magic, args: Vec<Node>, ty: TypeId) -> Node {
    let callee = at.derive(NodeKind::Builtin(magic), TypeTable::VOID);
    at.derive(
        NodeKind::Call {
            callee: Box::new(callee),
            args,
        },
        ty,
    )
}

fn int_node(at: &Node, value: i64, ty: TypeId) -> Node {
    at.derive(NodeKind::IntLit(value), ty)
}

impl ProcCtx<'_, '_> {
    pub(super) fn gen_rewrite(&mut self, n: &Node, magic: Magic, args: &[Node], dest: &mut Value) -> Result<(), LowerError> {
        match magic {
            Magic::Swap => {
                let [a, b] = operands::<2>(n, magic, args)?;
                self.gen_swap(a, b)
            }
            Magic::Inc | Magic::Dec => {
                let (x, step) = self.step_operands(n, magic, args)?;
                let op = if magic == Magic::Inc { BinOp::Add } else { BinOp::Sub };
                self.gen_step_in_place(x, op, &step)
            }
            Magic::EnumToStr => {
                let [x] = operands::<1>(n, magic, args)?;
                self.gen_enum_to_str(n, x, dest)
            }
            Magic::GetCurrentException => self.assign(dest, self.ir_type(n.ty), Rvalue::CurrentExc, n.span),
            Magic::StrToStr => {
                let [s] = operands::<1>(n, magic, args)?;
                self.gen(s, dest)
            }
            _ => {
                let expanded = self.expand(n, magic, args)?;
                self.gen(&expanded, dest)
            }
        }
    }

    fn expand(&self, n: &Node, magic: Magic, args: &[Node]) -> Result<Node, LowerError> {
        match magic {
            Magic::High | Magic::Low | Magic::LengthArray => {
                let [x] = operands::<1>(n, magic, args)?;
                self.expand_bound(n, magic, x)
            }
            Magic::Succ | Magic::Pred => {
                let (x, step) = self.step_operands(n, magic, args)?;
                let op = if magic == Magic::Succ { Magic::AddI } else { Magic::SubI };
                Ok(builtin_call(n, op, vec![x.clone(), step], n.ty))
            }
            _ => Err(LowerError::internal(format!("`{}` has no rewrite", magic), n.span)),
        }
    }

    /// An rvalue reading `place`. The place's operands are already
    /// evaluated; places without an operand form are read through their
    /// address, held in the returned temporary.
    fn read_place(&mut self, place: &Place, ty: IrTypeId) -> (Rvalue, Option<Temp>) {
        if let Some(op) = Value::Place(place.clone()).operand() {
            return (Rvalue::Use(op), None);
        }
        if let Place::Deref(op) = place {
            return (Rvalue::Load(op.clone()), None);
        }
        let ptr = self.m.types.intern(IrType::Ptr(ty));
        let addr = self.alloc(ptr);
        self.emit(Instr::Asgn {
            ty: ptr,
            dst: addr.place(),
            src: Rvalue::AddrOf(place.clone()),
        });
        (Rvalue::Load(addr.operand()), Some(addr))
    }

    /// `x = x op step`, with `x` evaluated once.
    fn gen_step_in_place(&mut self, x: &Node, op: BinOp, step: &Node) -> Result<(), LowerError> {
        let ty = self.ir_type(x.ty);
        let (place, held) = self.gen_place(x)?;
        let (read, addr) = self.read_place(&place, ty);
        let (lhs, current) = match read {
            Rvalue::Use(value) => (value, None),
            read => {
                let t = self.alloc(ty);
                self.emit(Instr::Asgn {
                    ty,
                    dst: t.place(),
                    src: read,
                });
                (t.operand(), Some(t))
            }
        };
        let s = self.genx(step)?;
        let rhs = self.operand(&s, step.span)?;
        self.emit(Instr::Asgn {
            ty,
            dst: place,
            src: Rvalue::Binary { op, ty, lhs, rhs },
        });
        self.release(s);
        current.into_iter().chain(addr).for_each(|t| self.free(t));
        self.release_all(held);
        Ok(())
    }

    /// Exchange two locations through one temporary. Each side is
    /// evaluated once, left to right.
    fn gen_swap(&mut self, a: &Node, b: &Node) -> Result<(), LowerError> {
        let ty = self.ir_type(a.ty);
        let (pa, held_a) = self.gen_place(a)?;
        let (pb, held_b) = self.gen_place(b)?;

        let saved = self.alloc(ty);
        let (read_a, addr_a) = self.read_place(&pa, ty);
        self.emit(Instr::Asgn {
            ty,
            dst: saved.place(),
            src: read_a,
        });
        let (read_b, addr_b) = self.read_place(&pb, ty);
        self.emit(Instr::Asgn {
            ty,
            dst: pa,
            src: read_b,
        });
        self.emit(Instr::Asgn {
            ty,
            dst: pb,
            src: Rvalue::Use(saved.operand()),
        });

        addr_b.into_iter().chain(addr_a).for_each(|t| self.free(t));
        self.free(saved);
        self.release_all(held_b);
        self.release_all(held_a);
        Ok(())
    }

    /// `$e` for an enum: one select over the ordinals, each arm storing
    /// the variant's name. Out-of-range values print as their ordinal.
    fn gen_enum_to_str(&mut self, n: &Node, x: &Node, dest: &mut Value) -> Result<(), LowerError> {
        let TypeKind::Enum { variants, .. } = self.type_kind(x.ty) else {
            return Err(unsupported(format!("`$` on `{}`", self.type_name(x.ty)), n));
        };
        let str_ty = self.ir_type(n.ty);
        let place = self.dest_place(dest, str_ty, n.span)?;
        let v = self.genx(x)?;
        let value = self.operand(&v, x.span)?;

        let labels: Vec<LabelId> = variants.iter().map(|_| self.new_label()).collect();
        let fallback = self.new_label();
        let end = self.new_label();
        let mut arms: Vec<SelectArm> = labels
            .iter()
            .enumerate()
            .map(|(i, &target)| SelectArm {
                pattern: ArmPattern::Values(vec![SelectValue::Value(self.int_literal(x.ty, i as i64))]),
                target,
            })
            .collect();
        arms.push(SelectArm {
            pattern: ArmPattern::Else,
            target: fallback,
        });
        self.emit(Instr::Select {
            ty: self.ir_type(x.ty),
            value: value.clone(),
            arms,
        });

        for (name, &label) in variants.iter().zip(&labels) {
            self.place(label, n.span)?;
            let text = Operand::Const(Literal::Str(self.intern(name)));
            self.emit(Instr::Asgn {
                ty: str_ty,
                dst: place.clone(),
                src: Rvalue::Use(text),
            });
            self.goto(end);
        }
        self.place(fallback, n.span)?;
        self.gen_runtime_call(n, runtime::INT_TO_STRING, vec![value], dest)?;
        self.release(v);
        self.place(end, n.span)
    }

    /// `high`, `low` and `len` over arrays are constants; over strings and
    /// sequences they go through the length.
    fn expand_bound(&self, n: &Node, magic: Magic, x: &Node) -> Result<Node, LowerError> {
        let length = match self.type_kind(x.ty) {
            TypeKind::Array { len, low, .. } => {
                let value = match magic {
                    Magic::High => low + *len as i64 - 1,
                    Magic::Low => *low,
                    _ => *len as i64,
                };
                return Ok(int_node(n, value, n.ty));
            }
            TypeKind::String => Magic::LengthStr,
            TypeKind::Seq(_) => Magic::LengthSeq,
            _ => {
                return Err(unsupported(
                    format!("`{}` on `{}`", magic, self.type_name(x.ty)),
                    n,
                ))
            }
        };
        let len = builtin_call(n, length, vec![x.clone()], n.ty);
        Ok(match magic {
            Magic::High => builtin_call(n, Magic::SubI, vec![len, int_node(n, 1, n.ty)], n.ty),
            Magic::Low => int_node(n, 0, n.ty),
            _ => len,
        })
    }

    /// `x` and the step of `inc`/`dec`/`succ`/`pred`, defaulting to 1.
    fn step_operands<'n>(&self, n: &Node, magic: Magic, args: &'n [Node]) -> Result<(&'n Node, Node), LowerError> {
        match args {
            [x] => Ok((x, int_node(n, 1, x.ty))),
            [x, step] => Ok((x, step.clone())),
            _ => Err(LowerError::internal(
                format!("`{}` expects 1 or 2 operands, got {}", magic, args.len()),
                n.span,
            )),
        }
    }
}
