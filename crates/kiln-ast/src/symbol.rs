// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Symbols resolved by the front end.

use crate::{Magic, ModuleId, SymbolId, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymKind {
    Var,
    Let,
    Const,
    Param,
    /// The implicit `result` variable of a routine
    Result,
    Proc,
    Func,
    /// Routine taking part in dynamic dispatch
    Method,
    Field,
    /// Label of a named block
    Label,
    Type,
    Module,
}

impl SymKind {
    pub fn is_routine(self) -> bool {
        matches!(self, SymKind::Proc | SymKind::Func | SymKind::Method)
    }

    pub fn is_variable(self) -> bool {
        matches!(
            self,
            SymKind::Var | SymKind::Let | SymKind::Param | SymKind::Result
        )
    }
}

/// Whether a routine can raise, as far as the front end knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RaisesInfo {
    /// Carries a known-safe marker (`raises: []` or equivalent)
    Never,
    /// Declared or inferred to raise
    May,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SymFlags {
    /// Module-level variable
    pub global: bool,
    /// Output-only parameter, passed by address
    pub out_param: bool,
    /// In-out parameter, passed by address
    pub var_param: bool,
    /// Routine never returns control to its caller
    pub noreturn: bool,
    /// Method that needs dynamic dispatch
    pub dynamic_dispatch: bool,
    /// Routine provided by the runtime support library
    pub runtime: bool,
    /// Foreign routine whose body must be emitted into every user module
    pub local_copy: bool,
    /// Forward declaration without a body yet
    pub forward: bool,
}

impl SymFlags {
    pub fn by_address(&self) -> bool {
        self.out_param || self.var_param
    }
}

/// Compile-time value of a `const` symbol.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Char(u8),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymKind,
    pub ty: TypeId,
    /// Compilation unit that declares the symbol
    pub module: ModuleId,
    /// Stable item id within the declaring module
    pub item: u32,
    pub magic: Option<Magic>,
    pub flags: SymFlags,
    pub raises: RaisesInfo,
    /// Field position within its object, for `Field` symbols
    pub position: u32,
    pub value: Option<ConstValue>,
}

/// Every symbol of the program, indexed by `SymbolId`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol; its id is assigned here.
    pub fn push(&mut self, mut sym: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        sym.id = id;
        self.symbols.push(sym);
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    /// Front ends patch symbols while building; lowering never does.
    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
