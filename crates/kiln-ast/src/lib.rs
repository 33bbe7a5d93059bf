// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Typed AST consumed by the kiln lowering stage.
//!
//! The front end hands over a fully resolved tree: every node carries its
//! type, every identifier is a symbol, every call knows its callee. Nothing
//! in here is mutated during lowering.

pub mod build;
pub mod magic;
pub mod module;
pub mod node;
pub mod span;
pub mod symbol;
pub mod types;

pub use magic::Magic;
pub use module::{Module, ProcDecl, Program};
pub use node::{CaseBranch, CaseItem, ExceptClause, IfBranch, Node, NodeKind, VarDef};
pub use span::{FileId, Span};
pub use symbol::{ConstValue, RaisesInfo, SymFlags, SymKind, Symbol, SymbolTable};
pub use types::{Type, TypeKind, TypeTable};

/// Unique identifier for AST nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}

/// Identity of a symbol in the front end's symbol table.
///
/// Stable for the whole compilation: two references to the same
/// declaration always carry the same id, across modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolId(pub u32);

/// Index into the front end's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeId(pub u32);

/// A compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleId(pub u32);
