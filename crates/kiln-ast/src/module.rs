// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Compilation units and the program handed to the lowering stage.

use crate::{ModuleId, Node, Symbol, SymbolId, SymbolTable, TypeTable};

/// A routine with its body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcDecl {
    pub sym: SymbolId,
    pub params: Vec<SymbolId>,
    /// The `result` variable, for routines returning a value
    pub result: Option<SymbolId>,
    pub body: Node,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Module {
    pub id: ModuleId,
    /// Module path, e.g. `std/strutils`
    pub path: String,
    pub procs: Vec<ProcDecl>,
    /// Top-level statements, run by the module initializer
    pub top_level: Vec<Node>,
}

/// Everything the front end produced.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    pub modules: Vec<Module>,
    pub symbols: SymbolTable,
    pub types: TypeTable,
}

impl Program {
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    /// Find the declaration carrying a routine's body, in any module.
    pub fn proc_decl(&self, sym: SymbolId) -> Option<&ProcDecl> {
        self.modules
            .iter()
            .flat_map(|m| m.procs.iter())
            .find(|p| p.sym == sym)
    }
}
