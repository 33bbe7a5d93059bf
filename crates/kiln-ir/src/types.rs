// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IR types - canonical, interned, structurally compared.

use indexmap::IndexSet;

use crate::IrTypeId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IrType {
    Void,
    Bool,
    Char,
    Int(u8),
    UInt(u8),
    Float(u8),
    /// Typed pointer
    Ptr(IrTypeId),
    /// Pointer to the payload array of a string or seq
    PayloadPtr(IrTypeId),
    String,
    Seq(IrTypeId),
    Array { elem: IrTypeId, len: u64 },
    Object { name: String, fields: Vec<IrTypeId> },
    ProcPtr,
}

/// Interning table for IR types. `IrTypeId(0)` is always `void`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IrTypeTable {
    types: IndexSet<IrType>,
}

impl Default for IrTypeTable {
    fn default() -> Self {
        let mut types = IndexSet::new();
        types.insert(IrType::Void);
        Self { types }
    }
}

impl IrTypeTable {
    pub const VOID: IrTypeId = IrTypeId(0);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, ty: IrType) -> IrTypeId {
        let (idx, _) = self.types.insert_full(ty);
        IrTypeId(idx as u32)
    }

    /// Look up without inserting.
    pub fn find(&self, ty: &IrType) -> Option<IrTypeId> {
        self.types.get_index_of(ty).map(|i| IrTypeId(i as u32))
    }

    pub fn get(&self, id: IrTypeId) -> &IrType {
        self.types.get_index(id.index()).unwrap_or(&IrType::Void)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IrTypeId, &IrType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (IrTypeId(i as u32), t))
    }
}
