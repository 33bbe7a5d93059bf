// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Procedure Build Context - state for the routine being lowered.

use kiln_ast::{Span, SymbolId, TypeId, TypeKind};
use kiln_ir::{
    Instr, IrProc, IrType, IrTypeId, LabelId, LocId, Operand, Place, Rvalue, SlotId, StrId, SymRef,
    TreeBuilder,
};
use rustc_hash::FxHashSet;

use crate::{LowerError, LowerErrorKind, ModuleCtx, SlotManager, Temp, Value};

/// An enclosing block or loop that `break` can leave.
#[derive(Debug, Clone, Copy)]
pub struct BlockTarget {
    pub sym: Option<SymbolId>,
    pub label: LabelId,
}

/// Where `raise` and `return` go from the current position.
#[derive(Debug, Clone, Copy)]
pub struct ExitFrame {
    /// Entry of the innermost exception handler (or the routine's exit)
    pub exc: LabelId,
    /// Target of `return`
    pub ret: LabelId,
    /// Whether anything jumped to `ret` while this frame was active
    pub ret_used: bool,
}

pub struct ProcCtx<'c, 'a> {
    pub m: &'c ModuleCtx<'a>,
    tree: TreeBuilder,
    pub slots: SlotManager,
    next_label: u32,
    blocks: Vec<BlockTarget>,
    exits: Vec<ExitFrame>,
    by_address: FxHashSet<SymbolId>,
    result: Option<SlotId>,
    bool_ty: IrTypeId,
}

impl<'c, 'a> ProcCtx<'c, 'a> {
    pub fn new(m: &'c ModuleCtx<'a>) -> Self {
        let bool_ty = m.types.intern(IrType::Bool);
        let mut ctx = Self {
            m,
            tree: TreeBuilder::new(),
            slots: SlotManager::new(),
            next_label: 0,
            blocks: Vec::new(),
            exits: Vec::new(),
            by_address: FxHashSet::default(),
            result: None,
            bool_ty,
        };
        let exit = ctx.new_label();
        ctx.exits.push(ExitFrame {
            exc: exit,
            ret: exit,
            ret_used: false,
        });
        ctx
    }

    // ── Labels and jumps ────────────────────────────────────────

    pub fn new_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    pub fn emit(&mut self, instr: Instr) {
        self.tree.push(instr);
    }

    pub fn place(&mut self, label: LabelId, span: Span) -> Result<(), LowerError> {
        if self.tree.place(label) {
            Ok(())
        } else {
            Err(LowerError::new(LowerErrorKind::DuplicateLabel(label), span))
        }
    }

    pub fn place_loop(&mut self, label: LabelId, span: Span) -> Result<(), LowerError> {
        if self.tree.place_loop(label) {
            Ok(())
        } else {
            Err(LowerError::new(LowerErrorKind::DuplicateLabel(label), span))
        }
    }

    pub fn goto(&mut self, label: LabelId) {
        self.emit(Instr::Goto(label));
    }

    /// Jump to `target` when the bool operand equals `when`.
    pub fn branch(&mut self, cond: Operand, when: bool, target: LabelId) {
        self.emit(Instr::branch(self.bool_ty, cond, when, target));
    }

    // ── Block targets ───────────────────────────────────────────

    pub fn push_block(&mut self, sym: Option<SymbolId>) -> LabelId {
        let label = self.new_label();
        self.blocks.push(BlockTarget { sym, label });
        label
    }

    pub fn pop_block(&mut self) {
        self.blocks.pop();
    }

    /// Innermost block, or the named one, searching outwards.
    pub fn find_block(&self, target: Option<SymbolId>, span: Span) -> Result<LabelId, LowerError> {
        let found = match target {
            None => self.blocks.last(),
            Some(sym) => self.blocks.iter().rev().find(|b| b.sym == Some(sym)),
        };
        found.map(|b| b.label).ok_or_else(|| {
            let name = target.map(|sym| {
                self.m
                    .program
                    .symbol(sym)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| format!("#{}", sym.0))
            });
            LowerError::new(LowerErrorKind::UnresolvedBreak { target: name }, span)
        })
    }

    // ── Exit frames ─────────────────────────────────────────────

    /// The routine's own exit label.
    pub fn proc_exit(&self) -> LabelId {
        self.exits.first().map(|f| f.exc).unwrap_or(LabelId(0))
    }

    pub fn exc_target(&self) -> LabelId {
        self.exits.last().map(|f| f.exc).unwrap_or_else(|| self.proc_exit())
    }

    pub fn ret_target(&mut self) -> LabelId {
        match self.exits.last_mut() {
            Some(frame) => {
                frame.ret_used = true;
                frame.ret
            }
            None => LabelId(0),
        }
    }

    pub fn push_exit(&mut self, exc: LabelId, ret: LabelId) {
        self.exits.push(ExitFrame {
            exc,
            ret,
            ret_used: false,
        });
    }

    /// Current `return` target, without recording a use.
    pub fn peek_ret(&self) -> LabelId {
        self.exits.last().map(|f| f.ret).unwrap_or_else(|| self.proc_exit())
    }

    /// Pop a frame. A use of a `return` target shared with the enclosing
    /// frame is recorded there too.
    pub fn pop_exit(&mut self) -> Option<ExitFrame> {
        if self.exits.len() <= 1 {
            return None;
        }
        let frame = self.exits.pop()?;
        if frame.ret_used {
            if let Some(outer) = self.exits.last_mut() {
                if outer.ret == frame.ret {
                    outer.ret_used = true;
                }
            }
        }
        Some(frame)
    }

    // ── Types and locations ─────────────────────────────────────

    pub fn ir_type(&self, ty: TypeId) -> IrTypeId {
        self.m.types.ir_type(ty)
    }

    pub fn bool_ty(&self) -> IrTypeId {
        self.bool_ty
    }

    pub fn is_void(&self, ty: TypeId) -> bool {
        self.m.program.types.is_empty_type(ty)
    }

    pub fn type_kind(&self, ty: TypeId) -> &'a TypeKind {
        self.m.program.types.kind(ty)
    }

    /// Human-readable type name for messages.
    pub fn type_name(&self, ty: TypeId) -> String {
        match self.type_kind(ty) {
            TypeKind::Void => "void".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Char => "char".to_string(),
            TypeKind::Int { bits: 0, signed: true } => "int".to_string(),
            TypeKind::Int { bits: 0, signed: false } => "uint".to_string(),
            TypeKind::Int { bits, signed: true } => format!("int{}", bits),
            TypeKind::Int { bits, signed: false } => format!("uint{}", bits),
            TypeKind::Float { bits } => format!("float{}", bits),
            TypeKind::String => "string".to_string(),
            TypeKind::Seq(e) => format!("seq[{}]", self.type_name(*e)),
            TypeKind::Array { elem, len, .. } => format!("array[{}, {}]", len, self.type_name(*elem)),
            TypeKind::Tuple(items) => format!(
                "({})",
                items.iter().map(|t| self.type_name(*t)).collect::<Vec<_>>().join(", ")
            ),
            TypeKind::Object { name, .. } | TypeKind::Enum { name, .. } => name.clone(),
            TypeKind::Ptr(t) => format!("ptr {}", self.type_name(*t)),
            TypeKind::Ref(t) => format!("ref {}", self.type_name(*t)),
            TypeKind::Proc { .. } => "proc".to_string(),
            TypeKind::Set(t) => format!("set[{}]", self.type_name(*t)),
            TypeKind::NoReturn => "noreturn".to_string(),
            TypeKind::Nil => "nil".to_string(),
        }
    }

    pub fn loc(&self, span: Span) -> Option<LocId> {
        if span.is_unknown() {
            return None;
        }
        Some(self.m.interner.pack_location(span.file.0, span.line, span.col))
    }

    pub fn source_loc(&mut self, span: Span) {
        if !self.m.config.emit_source_locations {
            return;
        }
        if let Some(loc) = self.loc(span) {
            self.emit(Instr::SourceLoc(loc));
        }
    }

    pub fn intern(&self, s: &str) -> StrId {
        self.m.interner.intern_string(s)
    }

    // ── Storage ─────────────────────────────────────────────────

    pub fn alloc(&mut self, ty: IrTypeId) -> Temp {
        self.slots.allocate(ty)
    }

    pub fn free(&mut self, temp: Temp) {
        self.slots.free(temp);
    }

    /// Give back whatever storage a value owns.
    pub fn release(&mut self, value: Value) {
        if let Value::Temp(t) = value {
            self.slots.free(t);
        }
    }

    pub fn release_all(&mut self, values: Vec<Value>) {
        for v in values {
            self.release(v);
        }
    }

    pub fn open_scope(&mut self) {
        self.slots.open_scope();
    }

    pub fn close_scope(&mut self, span: Span) -> Result<(), LowerError> {
        self.slots
            .close_scope()
            .map_err(|slot| LowerError::new(LowerErrorKind::TempLeaked { slot }, span))
    }

    pub fn mark_by_address(&mut self, sym: SymbolId) {
        self.by_address.insert(sym);
    }

    /// Parameters passed by address hold a pointer to the caller's storage.
    pub fn is_by_address(&self, sym: SymbolId) -> bool {
        self.by_address.contains(&sym)
    }

    pub fn set_result(&mut self, slot: SlotId) {
        self.result = Some(slot);
    }

    pub fn result(&self) -> Option<SlotId> {
        self.result
    }

    // ── Destinations ────────────────────────────────────────────

    /// Make sure `dest` names storage, allocating a temporary if empty.
    pub fn dest_place(&mut self, dest: &mut Value, ty: IrTypeId, span: Span) -> Result<Place, LowerError> {
        if dest.is_empty() {
            *dest = Value::Temp(self.alloc(ty));
        }
        dest.place()
            .ok_or_else(|| LowerError::internal("cannot assign into an inline value", span))
    }

    /// Write `src` into `dest`.
    pub fn assign(&mut self, dest: &mut Value, ty: IrTypeId, src: Rvalue, span: Span) -> Result<(), LowerError> {
        let dst = self.dest_place(dest, ty, span)?;
        self.emit(Instr::Asgn { ty, dst, src });
        Ok(())
    }

    /// Deliver a leaf operand: inline when the caller has no destination.
    pub fn put(&mut self, dest: &mut Value, ty: IrTypeId, op: Operand, span: Span) -> Result<(), LowerError> {
        if dest.is_empty() {
            *dest = Value::Inline(op);
            return Ok(());
        }
        self.assign(dest, ty, Rvalue::Use(op), span)
    }

    /// Read a value as an operand.
    pub fn operand(&self, value: &Value, span: Span) -> Result<Operand, LowerError> {
        value
            .operand()
            .ok_or_else(|| LowerError::internal("value has no operand form", span))
    }

    pub fn finish(
        self,
        sym: Option<SymRef>,
        name: StrId,
        params: Vec<SlotId>,
    ) -> IrProc {
        IrProc {
            sym,
            name,
            params,
            result: self.result,
            slots: self.slots.finish(),
            body: self.tree.finish(),
        }
    }
}
