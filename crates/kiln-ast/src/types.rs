// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Source-level types as resolved by the front end.

use crate::{RaisesInfo, SymbolId, TypeId};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    /// `bits == 0` is the target's native integer
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    String,
    Seq(TypeId),
    Array { elem: TypeId, len: u64, low: i64 },
    Tuple(Vec<TypeId>),
    Object {
        name: String,
        fields: Vec<SymbolId>,
        /// Derives from the root exception type
        exception: bool,
    },
    Enum { name: String, variants: Vec<String> },
    Ptr(TypeId),
    Ref(TypeId),
    Proc {
        params: Vec<TypeId>,
        ret: TypeId,
        raises: RaisesInfo,
    },
    Set(TypeId),
    /// Type of expressions that never produce a value (`raise`, `return`)
    NoReturn,
    Nil,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Type {
    pub kind: TypeKind,
}

/// Front end type table.
///
/// Slot 0 is always `void`, so `TypeId::default()`-style placeholders are
/// harmless for statement nodes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeTable {
    types: Vec<Type>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self {
            types: vec![Type { kind: TypeKind::Void }],
        }
    }
}

impl TypeTable {
    pub const VOID: TypeId = TypeId(0);

    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a type; structurally equal types share an id.
    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        if let Some(pos) = self.types.iter().position(|t| t.kind == kind) {
            return TypeId(pos as u32);
        }
        self.types.push(Type { kind });
        TypeId(self.types.len() as u32 - 1)
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize)
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        self.types
            .get(id.0 as usize)
            .map(|t| &t.kind)
            .unwrap_or(&TypeKind::Void)
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Void)
    }

    /// Types that never carry a value at run time.
    pub fn is_empty_type(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Void | TypeKind::NoReturn)
    }

    pub fn is_exception(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Object { exception, .. } => *exception,
            TypeKind::Ref(inner) => self.is_exception(*inner),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
