// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Slot manager - scoped allocation of temporaries and named locals.
//!
//! A [`Temp`] is an owned handle: it cannot be copied, and giving it back
//! with [`SlotManager::free`] consumes it. Freed slots go on a per-type free
//! list and are handed out again by later allocations.

use kiln_ast::SymbolId;
use kiln_ir::{IrTypeId, Operand, Place, SlotDecl, SlotId, SlotKind, StrId};
use rustc_hash::FxHashMap;

/// An allocated temporary slot.
#[must_use = "temporaries must be freed"]
#[derive(Debug, PartialEq, Eq)]
pub struct Temp {
    slot: SlotId,
    ty: IrTypeId,
}

impl Temp {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn ty(&self) -> IrTypeId {
        self.ty
    }

    pub fn operand(&self) -> Operand {
        Operand::Slot(self.slot)
    }

    pub fn place(&self) -> Place {
        Place::Slot(self.slot)
    }
}

#[derive(Debug, Default)]
struct Frame {
    /// Temporaries allocated in this scope and not yet freed
    live: Vec<SlotId>,
    /// Locals declared in this scope
    locals: Vec<(SymbolId, SlotId)>,
}

#[derive(Debug, Default)]
pub struct SlotManager {
    decls: Vec<SlotDecl>,
    free: FxHashMap<IrTypeId, Vec<SlotId>>,
    frames: Vec<Frame>,
    locals: FxHashMap<SymbolId, SlotId>,
}

impl SlotManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Close the innermost scope, releasing its locals.
    ///
    /// Fails with the first temporary still live in the scope.
    pub fn close_scope(&mut self) -> Result<(), SlotId> {
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        if let Some(&leaked) = frame.live.first() {
            return Err(leaked);
        }
        for (sym, slot) in frame.locals {
            self.locals.remove(&sym);
            if let Some(ty) = self.decl(slot).map(|d| d.ty) {
                self.release(slot, ty);
            }
        }
        Ok(())
    }

    /// A free slot of type `ty`, reused when one is available.
    pub fn allocate(&mut self, ty: IrTypeId) -> Temp {
        let slot = match self.free.get_mut(&ty).and_then(Vec::pop) {
            Some(slot) => {
                log::trace!("reusing slot {} for {}", slot, ty);
                slot
            }
            None => self.declare(ty, SlotKind::Temp, None),
        };
        if let Some(frame) = self.frames.last_mut() {
            frame.live.push(slot);
        }
        Temp { slot, ty }
    }

    pub fn free(&mut self, temp: Temp) {
        for frame in self.frames.iter_mut().rev() {
            if let Some(pos) = frame.live.iter().rposition(|s| *s == temp.slot) {
                frame.live.swap_remove(pos);
                break;
            }
        }
        self.release(temp.slot, temp.ty);
    }

    /// Declare a named local in the current scope. Locals are never
    /// reused while their scope is open.
    pub fn declare_local(&mut self, sym: SymbolId, ty: IrTypeId, name: Option<StrId>) -> SlotId {
        let slot = match self.free.get_mut(&ty).and_then(Vec::pop) {
            Some(slot) => {
                if let Some(d) = self.decls.iter_mut().find(|d| d.id == slot) {
                    d.kind = SlotKind::Local;
                    d.name = name;
                }
                slot
            }
            None => self.declare(ty, SlotKind::Local, name),
        };
        self.bind(sym, slot);
        slot
    }

    /// Declare a parameter or result slot. These live for the whole routine.
    pub fn declare_fixed(
        &mut self,
        sym: SymbolId,
        ty: IrTypeId,
        kind: SlotKind,
        name: Option<StrId>,
    ) -> SlotId {
        let slot = self.declare(ty, kind, name);
        self.locals.insert(sym, slot);
        slot
    }

    pub fn local(&self, sym: SymbolId) -> Option<SlotId> {
        self.locals.get(&sym).copied()
    }

    pub fn decl(&self, slot: SlotId) -> Option<&SlotDecl> {
        self.decls.get(slot.index())
    }

    /// Number of temporaries currently live, in every scope.
    pub fn live_temps(&self) -> usize {
        self.frames.iter().map(|f| f.live.len()).sum()
    }

    pub fn finish(self) -> Vec<SlotDecl> {
        self.decls
    }

    fn bind(&mut self, sym: SymbolId, slot: SlotId) {
        self.locals.insert(sym, slot);
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.push((sym, slot));
        }
    }

    fn declare(&mut self, ty: IrTypeId, kind: SlotKind, name: Option<StrId>) -> SlotId {
        let id = SlotId(self.decls.len() as u32);
        self.decls.push(SlotDecl { id, ty, kind, name });
        id
    }

    fn release(&mut self, slot: SlotId, ty: IrTypeId) {
        self.free.entry(ty).or_default().push(slot);
    }
}
