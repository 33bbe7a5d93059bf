// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement and expression nodes.
//!
//! Statements and expressions share one node type: whether a node yields a
//! value is decided by its type, not by its kind.

use crate::{Magic, NodeId, Span, SymbolId, TypeId};

/// A node in the typed AST.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub ty: TypeId,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, ty: TypeId, span: Span) -> Self {
        Self { id: NodeId::DUMMY, kind, ty, span }
    }

    /// Build a synthesized node that reuses this node's location.
    pub fn derive(&self, kind: NodeKind, ty: TypeId) -> Node {
        Node { id: NodeId::DUMMY, kind, ty, span: self.span }
    }

    /// Children in source order. Used by analyses that only need to walk.
    pub fn children(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Call { callee, args } => {
                out.push(callee.as_ref());
                out.extend(args.iter());
            }
            NodeKind::If(branches) => {
                for b in branches {
                    if let Some(c) = &b.cond {
                        out.push(c);
                    }
                    out.push(&b.body);
                }
            }
            NodeKind::While { cond, body } => {
                out.push(cond);
                out.push(body);
            }
            NodeKind::Block { body, .. } => out.push(body),
            NodeKind::Case { scrutinee, branches } => {
                out.push(scrutinee);
                for b in branches {
                    for item in &b.items {
                        match item {
                            CaseItem::Value(v) => out.push(v),
                            CaseItem::Range(lo, hi) => {
                                out.push(lo);
                                out.push(hi);
                            }
                        }
                    }
                    out.push(&b.body);
                }
            }
            NodeKind::Try { body, handlers, finally } => {
                out.push(body);
                out.extend(handlers.iter().map(|h| &h.body));
                if let Some(f) = finally {
                    out.push(f);
                }
            }
            NodeKind::Return(v) | NodeKind::Raise(v) | NodeKind::Discard(v) => {
                if let Some(v) = v {
                    out.push(v);
                }
            }
            NodeKind::Asgn { dest, value } => {
                out.push(dest);
                out.push(value);
            }
            NodeKind::VarSection(defs) => out.extend(defs.iter().filter_map(|d| d.init.as_ref())),
            NodeKind::Stmts(items) | NodeKind::TupleConstr(items) | NodeKind::ArrayConstr(items) => {
                out.extend(items.iter())
            }
            NodeKind::Field { base, .. } => out.push(base),
            NodeKind::Index { base, index } => {
                out.push(base);
                out.push(index);
            }
            NodeKind::Deref(inner)
            | NodeKind::AddrOf(inner)
            | NodeKind::Conv(inner)
            | NodeKind::Cast(inner) => out.push(inner),
            NodeKind::ObjConstr(fields) => out.extend(fields.iter().map(|(_, v)| v)),
            NodeKind::Empty
            | NodeKind::IntLit(_)
            | NodeKind::UIntLit(_)
            | NodeKind::FloatLit(_)
            | NodeKind::StrLit(_)
            | NodeKind::CharLit(_)
            | NodeKind::BoolLit(_)
            | NodeKind::NilLit
            | NodeKind::Sym(_)
            | NodeKind::Builtin(_)
            | NodeKind::Break(_)
            | NodeKind::ProcDef(_)
            | NodeKind::Pragma
            | NodeKind::Comment(_)
            | NodeKind::Meta(_) => {}
        }
        out
    }
}

/// The kind of node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Nothing; lowers to nothing
    Empty,
    IntLit(i64),
    UIntLit(u64),
    FloatLit(f64),
    StrLit(String),
    CharLit(u8),
    BoolLit(bool),
    NilLit,
    /// Resolved identifier
    Sym(SymbolId),
    /// Direct reference to a built-in operation (callee position only)
    Builtin(Magic),
    /// Call; the callee is a `Sym`, a `Builtin`, or any proc-typed expression
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    /// `if`/`elif`/`else` chain; a branch without condition is the `else`
    If(Vec<IfBranch>),
    While {
        cond: Box<Node>,
        body: Box<Node>,
    },
    /// Named (`label`) or anonymous block; `break` leaves it
    Block {
        label: Option<SymbolId>,
        body: Box<Node>,
    },
    /// Break out of the innermost block/loop, or out of the named block
    Break(Option<SymbolId>),
    Case {
        scrutinee: Box<Node>,
        branches: Vec<CaseBranch>,
    },
    Try {
        body: Box<Node>,
        handlers: Vec<ExceptClause>,
        finally: Option<Box<Node>>,
    },
    Return(Option<Box<Node>>),
    /// `raise e`, or bare `raise` to re-raise the exception being handled
    Raise(Option<Box<Node>>),
    Asgn {
        dest: Box<Node>,
        value: Box<Node>,
    },
    VarSection(Vec<VarDef>),
    /// Statement list; if typed, the last node is the value
    Stmts(Vec<Node>),
    Discard(Option<Box<Node>>),
    Field {
        base: Box<Node>,
        field: SymbolId,
    },
    Index {
        base: Box<Node>,
        index: Box<Node>,
    },
    Deref(Box<Node>),
    AddrOf(Box<Node>),
    ObjConstr(Vec<(SymbolId, Node)>),
    TupleConstr(Vec<Node>),
    ArrayConstr(Vec<Node>),
    /// Value conversion to the node's type
    Conv(Box<Node>),
    /// Reinterpreting cast to the node's type
    Cast(Box<Node>),
    /// Nested routine declaration; its body is lowered separately
    ProcDef(SymbolId),
    Pragma,
    Comment(String),
    /// Reflection/meta-programming construct left over by the front end
    Meta(String),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IfBranch {
    /// `None` for the trailing `else`
    pub cond: Option<Node>,
    pub body: Node,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseBranch {
    /// Empty for the `else` branch
    pub items: Vec<CaseItem>,
    pub body: Node,
}

impl CaseBranch {
    pub fn is_else(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaseItem {
    Value(Node),
    /// Inclusive range `lo..hi`
    Range(Node, Node),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptClause {
    /// Empty means "catch anything"
    pub types: Vec<TypeId>,
    pub body: Node,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarDef {
    pub sym: SymbolId,
    pub init: Option<Node>,
}
