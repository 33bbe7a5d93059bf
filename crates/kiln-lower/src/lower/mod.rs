// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! The lowering engine: typed AST to flat IR, one routine at a time.
//!
//! Expressions are lowered with destination passing. `gen(node, dest)`
//! writes the node's value into `dest`; an empty destination lets the
//! engine pick (an inline operand for leaves, a fresh temporary otherwise).

mod call;
mod control;
mod expr;
mod magic;
mod rewrite;
mod stmt;

use kiln_ast::{Module, ProcDecl, Span};
use kiln_ir::{validate, Instr, IrProc, IrType, SlotKind, ValidationError};

use crate::{LowerError, LowerErrorKind, ModuleCtx, ProcCtx, Value};

pub use magic::{strategy, Strategy};

/// Lower one routine with a body.
pub fn lower_proc(m: &ModuleCtx<'_>, decl: &ProcDecl) -> Result<IrProc, LowerError> {
    let span = decl.body.span;
    let sym = m.symbol(decl.sym, span)?;
    log::debug!("lowering routine `{}`", sym.name);

    let mut ctx = ProcCtx::new(m);
    ctx.open_scope();

    let mut params = Vec::with_capacity(decl.params.len());
    for &p in &decl.params {
        let psym = m.symbol(p, span)?;
        let mut ty = ctx.ir_type(psym.ty);
        if psym.flags.by_address() {
            ty = m.types.intern(IrType::Ptr(ty));
            ctx.mark_by_address(p);
        }
        let name = ctx.intern(&psym.name);
        params.push(ctx.slots.declare_fixed(p, ty, SlotKind::Param, Some(name)));
    }

    if let Some(r) = decl.result {
        let rsym = m.symbol(r, span)?;
        let ty = ctx.ir_type(rsym.ty);
        let name = ctx.intern(&rsym.name);
        let slot = ctx.slots.declare_fixed(r, ty, SlotKind::Result, Some(name));
        ctx.emit(Instr::Summon {
            slot,
            ty,
            name: Some(name),
        });
        ctx.set_result(slot);
    }

    match ctx.result() {
        Some(slot) if !ctx.is_void(decl.body.ty) => {
            // Expression-bodied routine: the body's value is the result.
            let mut dest = Value::Place(kiln_ir::Place::Slot(slot));
            ctx.source_loc(decl.body.span);
            ctx.gen(&decl.body, &mut dest)?;
        }
        _ => ctx.gen_stmt(&decl.body)?,
    }

    let exit = ctx.proc_exit();
    ctx.place(exit, span)?;
    ctx.close_scope(span)?;

    let name = ctx.intern(&sym.name);
    let sym_ref = m.sym_ref(sym);
    let proc = ctx.finish(Some(sym_ref), name, params);
    check(&proc, span)?;
    log::debug!("lowered `{}`: {} instructions", sym.name, proc.body.len());
    Ok(proc)
}

/// Lower a module's top-level statements into its initializer.
pub fn lower_init(m: &ModuleCtx<'_>, module: &Module) -> Result<IrProc, LowerError> {
    log::debug!("lowering initializer of `{}`", module.path);
    let span = module
        .top_level
        .first()
        .map(|n| n.span)
        .unwrap_or_else(Span::unknown);

    let mut ctx = ProcCtx::new(m);
    ctx.open_scope();
    for node in &module.top_level {
        ctx.gen_stmt(node)?;
    }
    let exit = ctx.proc_exit();
    ctx.place(exit, span)?;
    ctx.close_scope(span)?;

    let name = ctx.intern(&format!("{}.init", module.path));
    let proc = ctx.finish(None, name, Vec::new());
    check(&proc, span)?;
    Ok(proc)
}

/// Structural self-check; a failure here is a lowering bug.
fn check(proc: &IrProc, span: Span) -> Result<(), LowerError> {
    let Err(errors) = validate(proc) else {
        return Ok(());
    };
    let kind = match errors.into_iter().next() {
        Some(ValidationError::UnplacedLabel(l)) => LowerErrorKind::UnplacedLabel(l),
        Some(ValidationError::DuplicateLabel(l)) => LowerErrorKind::DuplicateLabel(l),
        Some(other) => LowerErrorKind::Internal(other.to_string()),
        None => return Ok(()),
    };
    Err(LowerError::new(kind, span))
}
