// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Mapping from front end types to canonical IR types.

use std::sync::{PoisonError, RwLock};

use kiln_ast::{Program, TypeId, TypeKind};
use kiln_ir::{IrType, IrTypeId, IrTypeTable};
use rustc_hash::FxHashMap;

/// Collaborator interface for type mapping.
pub trait TypeMapper: Sync {
    /// Canonical IR type of a source type.
    fn ir_type(&self, ty: TypeId) -> IrTypeId;
    /// Pointer-to-payload type of a string or seq.
    fn payload_ptr(&self, ty: TypeId) -> IrTypeId;
    /// Intern a derived IR type.
    fn intern(&self, ty: IrType) -> IrTypeId;
    /// Snapshot of every IR type handed out so far.
    fn table(&self) -> IrTypeTable;
}

/// Maps types on demand and caches the result per source type.
pub struct CachingTypeMapper<'a> {
    program: &'a Program,
    int_bits: u8,
    cache: RwLock<FxHashMap<TypeId, IrTypeId>>,
    table: RwLock<IrTypeTable>,
}

impl<'a> CachingTypeMapper<'a> {
    pub fn new(program: &'a Program, int_bits: u8) -> Self {
        Self {
            program,
            int_bits,
            cache: RwLock::new(FxHashMap::default()),
            table: RwLock::new(IrTypeTable::new()),
        }
    }

    /// Map every source type, with its pointer and payload types, before
    /// any worker starts. Later lookups of these are read-only, so their
    /// ids do not depend on which worker asks first.
    pub fn prime(&self) {
        self.intern(IrType::Ptr(IrTypeTable::VOID));
        self.intern(IrType::Int(self.int_bits));
        for i in 0..self.program.types.len() {
            let ty = TypeId(i as u32);
            let ir = self.ir_type(ty);
            self.intern(IrType::Ptr(ir));
            if matches!(self.program.types.kind(ty), TypeKind::String | TypeKind::Seq(_)) {
                self.payload_ptr(ty);
            }
        }
    }

    fn map(&self, ty: TypeId, visiting: &mut Vec<TypeId>) -> IrTypeId {
        if let Some(id) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ty)
        {
            return *id;
        }
        let kind = self.program.types.kind(ty);
        if visiting.contains(&ty) {
            // A recursive object seen through a reference: use its name only.
            let name = match kind {
                TypeKind::Object { name, .. } => name.clone(),
                _ => String::new(),
            };
            return self.intern(IrType::Object {
                name,
                fields: Vec::new(),
            });
        }
        visiting.push(ty);
        let ir = match kind {
            TypeKind::Void | TypeKind::NoReturn => IrType::Void,
            TypeKind::Bool => IrType::Bool,
            TypeKind::Char => IrType::Char,
            TypeKind::Int { bits, signed } => {
                let bits = if *bits == 0 { self.int_bits } else { *bits };
                if *signed {
                    IrType::Int(bits)
                } else {
                    IrType::UInt(bits)
                }
            }
            TypeKind::Float { bits } => IrType::Float(*bits),
            TypeKind::String => IrType::String,
            TypeKind::Seq(elem) => IrType::Seq(self.map(*elem, visiting)),
            TypeKind::Array { elem, len, .. } => IrType::Array {
                elem: self.map(*elem, visiting),
                len: *len,
            },
            TypeKind::Tuple(items) => IrType::Object {
                name: "tuple".to_string(),
                fields: items.iter().map(|t| self.map(*t, visiting)).collect(),
            },
            TypeKind::Object { name, fields, .. } => IrType::Object {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|f| {
                        let fty = self.program.symbol(*f).map(|s| s.ty).unwrap_or(TypeId(0));
                        self.map(fty, visiting)
                    })
                    .collect(),
            },
            TypeKind::Enum { .. } => IrType::Int(self.int_bits),
            TypeKind::Ptr(inner) | TypeKind::Ref(inner) => IrType::Ptr(self.map(*inner, visiting)),
            TypeKind::Proc { .. } => IrType::ProcPtr,
            TypeKind::Set(_) => IrType::UInt(64),
            TypeKind::Nil => IrType::Ptr(IrTypeTable::VOID),
        };
        visiting.pop();
        let id = self.intern(ir);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ty, id);
        id
    }
}

impl TypeMapper for CachingTypeMapper<'_> {
    fn ir_type(&self, ty: TypeId) -> IrTypeId {
        self.map(ty, &mut Vec::new())
    }

    fn payload_ptr(&self, ty: TypeId) -> IrTypeId {
        let elem = match self.program.types.kind(ty) {
            TypeKind::Seq(elem) => self.ir_type(*elem),
            _ => self.intern(IrType::Char),
        };
        self.intern(IrType::PayloadPtr(elem))
    }

    fn intern(&self, ty: IrType) -> IrTypeId {
        if let Some(id) = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find(&ty)
        {
            return id;
        }
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .intern(ty)
    }

    fn table(&self) -> IrTypeTable {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::build::ProgramBuilder;

    #[test]
    fn native_int_uses_configured_width() {
        let mut b = ProgramBuilder::new();
        b.module("main");
        let int = b.int();
        let u8t = b.ty(TypeKind::Int { bits: 8, signed: false });
        let p = b.finish();
        let m = CachingTypeMapper::new(&p, 32);
        let t = m.ir_type(int);
        assert_eq!(m.table().get(t), &IrType::Int(32));
        assert_eq!(m.table().get(m.ir_type(u8t)), &IrType::UInt(8));
        assert_eq!(m.ir_type(int), t);
    }

    #[test]
    fn seq_payload_and_recursive_object() {
        let mut b = ProgramBuilder::new();
        b.module("main");
        let int = b.int();
        let s = b.seq(int);
        let (node, _) = b.object("Node", &[("value", int)]);
        let p = b.finish();
        let m = CachingTypeMapper::new(&p, 64);
        let payload = m.payload_ptr(s);
        let elem = m.ir_type(int);
        assert_eq!(m.table().get(payload), &IrType::PayloadPtr(elem));
        match m.table().get(m.ir_type(node)) {
            IrType::Object { name, fields } => {
                assert_eq!(name, "Node");
                assert_eq!(fields, &vec![elem]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn primed_lookups_add_nothing() {
        let mut b = ProgramBuilder::new();
        b.module("main");
        let int = b.int();
        let text = b.string();
        let arr = b.array(int, 4);
        let p = b.finish();
        let m = CachingTypeMapper::new(&p, 64);
        m.prime();
        let before = m.table().len();

        let elem = m.ir_type(arr);
        m.intern(IrType::Ptr(elem));
        m.intern(IrType::Ptr(IrTypeTable::VOID));
        m.payload_ptr(text);
        m.ir_type(int);
        assert_eq!(m.table().len(), before);
    }
}
