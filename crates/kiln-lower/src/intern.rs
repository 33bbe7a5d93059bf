// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! String, integer and location interning.
//!
//! Tables are shared by every worker lowering the same module. Lookups of
//! known values take the read lock only. Workers race for ids, so the
//! finished module's tables are rebuilt in order of first use.

use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use indexmap::IndexSet;
use kiln_ir::{IdMap, IntId, IrModule, Location, LocId, StrId};

/// Collaborator interface for interning tables and location packing.
pub trait Interner: Sync {
    fn intern_string(&self, s: &str) -> StrId;
    fn intern_int(&self, v: i64) -> IntId;
    fn pack_location(&self, file: u32, line: u32, col: u32) -> LocId;
}

#[derive(Debug, Default)]
pub struct SharedInterner {
    strings: RwLock<IndexSet<String>>,
    ints: RwLock<IndexSet<i64>>,
    locations: RwLock<IndexSet<Location>>,
}

fn intern_in<T, Q>(table: &RwLock<IndexSet<T>>, value: &Q, to_owned: impl FnOnce(&Q) -> T) -> u32
where
    T: Hash + Eq + std::borrow::Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    if let Some(idx) = table
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get_index_of(value)
    {
        return idx as u32;
    }
    let mut w = table.write().unwrap_or_else(PoisonError::into_inner);
    let (idx, _) = w.insert_full(to_owned(value));
    idx as u32
}

impl SharedInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strings(&self) -> Vec<String> {
        let table = self.strings.read().unwrap_or_else(PoisonError::into_inner);
        table.iter().cloned().collect()
    }

    pub fn ints(&self) -> Vec<i64> {
        let table = self.ints.read().unwrap_or_else(PoisonError::into_inner);
        table.iter().copied().collect()
    }

    pub fn locations(&self) -> Vec<Location> {
        let table = self.locations.read().unwrap_or_else(PoisonError::into_inner);
        table.iter().copied().collect()
    }

    /// Store the tables in `module`, renumbered by first use in its
    /// globals, initializer, routines and externs. Entries the module
    /// never references are dropped.
    pub fn install(&self, module: &mut IrModule) {
        let mut first_use = FirstUse {
            strings: self.strings(),
            ints: self.ints(),
            locations: self.locations(),
            ..FirstUse::default()
        };
        module.remap_ids(&mut first_use);
        module.strings = first_use.new_strings.into_iter().collect();
        module.ints = first_use.new_ints.into_iter().collect();
        module.locations = first_use.new_locations.into_iter().collect();
    }
}

/// Old tables plus the new ones, filled as ids are visited.
#[derive(Default)]
struct FirstUse {
    strings: Vec<String>,
    ints: Vec<i64>,
    locations: Vec<Location>,
    new_strings: IndexSet<String>,
    new_ints: IndexSet<i64>,
    new_locations: IndexSet<Location>,
}

impl IdMap for FirstUse {
    fn str_id(&mut self, id: StrId) -> StrId {
        let s = self.strings.get(id.index()).cloned().unwrap_or_default();
        StrId(self.new_strings.insert_full(s).0 as u32)
    }

    fn int_id(&mut self, id: IntId) -> IntId {
        let v = self.ints.get(id.index()).copied().unwrap_or_default();
        IntId(self.new_ints.insert_full(v).0 as u32)
    }

    fn loc_id(&mut self, id: LocId) -> LocId {
        let loc = self.locations.get(id.index()).copied().unwrap_or(Location { file: 0, line: 0, col: 0 });
        LocId(self.new_locations.insert_full(loc).0 as u32)
    }
}

impl Interner for SharedInterner {
    fn intern_string(&self, s: &str) -> StrId {
        StrId(intern_in(&self.strings, s, str::to_string))
    }

    fn intern_int(&self, v: i64) -> IntId {
        IntId(intern_in(&self.ints, &v, |v| *v))
    }

    fn pack_location(&self, file: u32, line: u32, col: u32) -> LocId {
        let loc = Location { file, line, col };
        LocId(intern_in(&self.locations, &loc, |l| *l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let i = SharedInterner::new();
        let a = i.intern_string("main");
        let b = i.intern_string("util");
        assert_eq!(i.intern_string("main"), a);
        assert_ne!(a, b);
        assert_eq!(i.intern_int(10), i.intern_int(10));
        assert_eq!(i.pack_location(0, 3, 1), i.pack_location(0, 3, 1));
        assert_ne!(i.pack_location(0, 3, 1), i.pack_location(0, 4, 1));
        assert_eq!(i.strings(), vec!["main".to_string(), "util".to_string()]);
    }

    #[test]
    fn install_numbers_by_first_use() {
        use kiln_ir::{Instr, IrProc, Literal, Operand, Place, Rvalue, SlotId};

        let i = SharedInterner::new();
        let unused = i.intern_string("unused");
        let late = i.intern_string("late");
        let name = i.intern_string("main");
        let seven = i.intern_int(7);
        let mut module = IrModule::default();
        module.procs.push(IrProc {
            sym: None,
            name,
            params: Vec::new(),
            result: None,
            slots: Vec::new(),
            body: vec![Instr::Asgn {
                ty: kiln_ir::IrTypeId(1),
                dst: Place::Slot(SlotId(0)),
                src: Rvalue::Use(Operand::Const(Literal::Str(late))),
            }],
        });
        assert_ne!(unused, late);
        assert_eq!(seven, IntId(0));

        i.install(&mut module);
        assert_eq!(module.strings, vec!["main".to_string(), "late".to_string()]);
        assert_eq!(module.procs[0].name, StrId(0));
        assert!(module.ints.is_empty());
        assert_eq!(module.proc_named("main").map(|p| p.body.len()), Some(1));
    }

    #[test]
    fn concurrent_inserts_dedup() {
        let i = SharedInterner::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for n in 0..100 {
                        i.intern_int(n);
                    }
                });
            }
        });
        assert_eq!(i.ints().len(), 100);
    }
}
