// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Lowered procedures and modules.

use crate::{Instr, IrTypeId, IrTypeTable, SlotId, StrId, SymRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotKind {
    Param,
    /// The routine's `result` variable
    Result,
    Local,
    Temp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotDecl {
    pub id: SlotId,
    pub ty: IrTypeId,
    pub kind: SlotKind,
    pub name: Option<StrId>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IrProc {
    /// How references to this routine are spelled; `None` for initializers
    pub sym: Option<SymRef>,
    pub name: StrId,
    pub params: Vec<SlotId>,
    pub result: Option<SlotId>,
    pub slots: Vec<SlotDecl>,
    pub body: Vec<Instr>,
}

impl IrProc {
    pub fn slot(&self, id: SlotId) -> Option<&SlotDecl> {
        self.slots.iter().find(|s| s.id == id)
    }
}

/// Packed source location, as stored in the module's location table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub file: u32,
    pub line: u32,
    pub col: u32,
}

/// A routine referenced but not defined in this module.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternDecl {
    pub sym: SymRef,
    pub name: StrId,
    /// Provided by the runtime support library
    pub runtime: bool,
}

/// Module-level variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalDecl {
    pub sym: SymRef,
    pub name: StrId,
    pub ty: IrTypeId,
}

/// One lowered compilation unit.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IrModule {
    pub name: String,
    pub procs: Vec<IrProc>,
    /// Top-level statements
    pub init: Option<IrProc>,
    pub strings: Vec<String>,
    pub ints: Vec<i64>,
    pub locations: Vec<Location>,
    pub types: IrTypeTable,
    pub globals: Vec<GlobalDecl>,
    pub externs: Vec<ExternDecl>,
}

impl IrModule {
    pub fn string(&self, id: StrId) -> &str {
        self.strings.get(id.index()).map(String::as_str).unwrap_or("")
    }

    pub fn int(&self, id: crate::IntId) -> i64 {
        self.ints.get(id.index()).copied().unwrap_or(0)
    }

    pub fn proc_named(&self, name: &str) -> Option<&IrProc> {
        self.procs.iter().find(|p| self.string(p.name) == name)
    }

    pub fn extern_for(&self, sym: SymRef) -> Option<&ExternDecl> {
        self.externs.iter().find(|e| e.sym == sym)
    }
}
