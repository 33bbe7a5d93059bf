// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Cross-module symbol references.

use kiln_ast::Symbol;
use kiln_ir::SymRef;

use crate::ModuleCtx;

impl ModuleCtx<'_> {
    /// How this module spells a reference to `sym`.
    pub fn sym_ref(&self, sym: &Symbol) -> SymRef {
        if sym.module == self.id() {
            return SymRef::Local(sym.id);
        }
        let path = self
            .program
            .module(sym.module)
            .map(|m| m.path.as_str())
            .unwrap_or("");
        SymRef::Module {
            module: self.interner.intern_string(path),
            item: sym.item,
        }
    }

    /// Reference a symbol from lowered code. Routines are queued the first
    /// time they are seen.
    pub fn reference(&self, sym: &Symbol) -> SymRef {
        if sym.kind.is_routine() {
            self.enqueue(sym.id);
        }
        self.sym_ref(sym)
    }
}

#[cfg(test)]
mod tests {
    use kiln_ast::build::ProgramBuilder;
    use kiln_ast::RaisesInfo;
    use kiln_ir::SymRef;

    use crate::{CachingTypeMapper, LowerConfig, ModuleCtx, SharedInterner, TableRuntime};

    #[test]
    fn local_and_qualified_references() {
        let mut b = ProgramBuilder::new();
        b.module("util");
        let void = b.void();
        let pt = b.proc_type(&[], void, RaisesInfo::Never);
        let helper = b.routine("helper", pt, RaisesInfo::Never);
        let main = b.module("main");
        let int = b.int();
        let x = b.global("x", int);
        let p = b.finish();

        let cfg = LowerConfig::default();
        let interner = SharedInterner::new();
        let types = CachingTypeMapper::new(&p, 64);
        let rt = TableRuntime::from_symbols(&p.symbols);
        let module = p.module(main).unwrap();
        let ctx = ModuleCtx::new(&p, module, &cfg, &interner, &types, &rt);

        let xs = p.symbol(x).unwrap();
        assert_eq!(ctx.reference(xs), SymRef::Local(x));
        assert_eq!(ctx.pending_len(), 0);

        let hs = p.symbol(helper).unwrap();
        let r = ctx.reference(hs);
        match r {
            SymRef::Module { module, item } => {
                assert_eq!(interner.strings()[module.index()], "util");
                assert_eq!(item, hs.item);
            }
            other => panic!("expected qualified ref, got {:?}", other),
        }
        assert_eq!(ctx.pending_len(), 1);
        ctx.reference(hs);
        assert_eq!(ctx.pending_len(), 1);
        assert!(ctx.pending_from(0)[0].decl.is_none());
    }
}
