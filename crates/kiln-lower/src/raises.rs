// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Which calls can raise, and therefore get the checked form.

use std::sync::PoisonError;

use kiln_ast::{Node, NodeKind, RaisesInfo, Symbol, SymbolId, TypeId, TypeKind};
use rustc_hash::FxHashSet;

use crate::{CallChecking, ModuleCtx};

/// State of one raise inference.
#[derive(Default)]
struct RaiseSearch {
    path: FxHashSet<SymbolId>,
    /// Some answer below relied on a routine still on `path`
    assumed: bool,
}

impl ModuleCtx<'_> {
    /// Whether a direct call to `sym` must be checked.
    pub fn routine_may_raise(&self, sym: &Symbol) -> bool {
        match (self.config.call_checking, sym.raises) {
            (CallChecking::Off, _) => false,
            (_, RaisesInfo::Never) => false,
            (_, RaisesInfo::May) => true,
            (CallChecking::Conservative, RaisesInfo::Unknown) => true,
            (CallChecking::Precise, RaisesInfo::Unknown) => self.infer_raises(sym),
        }
    }

    /// Whether an indirect call through a value of proc type `ty` must be checked.
    pub fn proc_type_may_raise(&self, ty: TypeId) -> bool {
        let raises = match self.program.types.kind(ty) {
            TypeKind::Proc { raises, .. } => *raises,
            _ => RaisesInfo::Unknown,
        };
        match (self.config.call_checking, raises) {
            (CallChecking::Off, _) | (_, RaisesInfo::Never) => false,
            _ => true,
        }
    }

    /// Look into the body of a routine with no raise annotation.
    ///
    /// A routine may raise when any routine it reaches does. Routines on
    /// the current search path count as not raising; an answer is memoized
    /// only when it is positive or did not rest on that assumption.
    fn infer_raises(&self, sym: &Symbol) -> bool {
        if let Some(known) = self.memo(sym.id) {
            return known;
        }
        let mut search = RaiseSearch::default();
        let result = self.search_raises(sym, &mut search);
        self.remember(sym.id, result);
        result
    }

    fn search_raises(&self, sym: &Symbol, search: &mut RaiseSearch) -> bool {
        if let Some(known) = self.memo(sym.id) {
            return known;
        }
        let Some(decl) = self.decl(sym.id) else {
            // Foreign body we cannot see.
            return true;
        };
        if !search.path.insert(sym.id) {
            search.assumed = true;
            return false;
        }
        let outer = std::mem::take(&mut search.assumed);
        let result = self.node_may_raise(&decl.body, search);
        search.path.remove(&sym.id);
        if result || !search.assumed {
            self.remember(sym.id, result);
        }
        search.assumed |= outer;
        result
    }

    fn memo(&self, sym: SymbolId) -> Option<bool> {
        self.raise_memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&sym)
            .copied()
    }

    fn remember(&self, sym: SymbolId, raises: bool) {
        self.raise_memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sym, raises);
    }

    fn node_may_raise(&self, node: &Node, search: &mut RaiseSearch) -> bool {
        match &node.kind {
            NodeKind::Raise(_) => true,
            NodeKind::Call { callee, args } => {
                let callee_raises = match &callee.kind {
                    NodeKind::Builtin(_) => false,
                    NodeKind::Sym(id) => match self.program.symbol(*id) {
                        Some(s) if s.magic.is_some() => false,
                        Some(s) if s.kind.is_routine() => self.callee_may_raise(s, search),
                        _ => self.proc_type_may_raise(callee.ty),
                    },
                    _ => self.proc_type_may_raise(callee.ty),
                };
                callee_raises || args.iter().any(|a| self.node_may_raise(a, search))
            }
            _ => node.children().into_iter().any(|c| self.node_may_raise(c, search)),
        }
    }

    /// `routine_may_raise`, continuing the current search for unannotated callees.
    fn callee_may_raise(&self, sym: &Symbol, search: &mut RaiseSearch) -> bool {
        match (self.config.call_checking, sym.raises) {
            (CallChecking::Precise, RaisesInfo::Unknown) => self.search_raises(sym, search),
            _ => self.routine_may_raise(sym),
        }
    }
}

#[cfg(test)]
mod tests {
    use kiln_ast::build::ProgramBuilder;
    use kiln_ast::{Program, RaisesInfo, SymbolId};

    use crate::{CachingTypeMapper, CallChecking, LowerConfig, ModuleCtx, SharedInterner, TableRuntime};

    struct Fixture {
        program: Program,
        safe: SymbolId,
        risky: SymbolId,
        unknown_pure: SymbolId,
        unknown_raising: SymbolId,
    }

    fn fixture() -> Fixture {
        let mut b = ProgramBuilder::new();
        b.module("main");
        let void = b.void();
        let exc = b.exception("ValueError");
        let pt = b.proc_type(&[], void, RaisesInfo::Unknown);
        let safe = b.routine("safe", pt, RaisesInfo::Never);
        let risky = b.routine("risky", pt, RaisesInfo::May);
        let unknown_pure = b.routine("pure", pt, RaisesInfo::Unknown);
        let unknown_raising = b.routine("wraps", pt, RaisesInfo::Unknown);

        let body = b.call(safe, vec![], void);
        b.proc_decl(unknown_pure, vec![], None, body);
        let e = b.obj_constr(exc, vec![]);
        let r = b.raise(Some(e));
        b.proc_decl(unknown_raising, vec![], None, r);
        Fixture {
            program: b.finish(),
            safe,
            risky,
            unknown_pure,
            unknown_raising,
        }
    }

    fn checked(f: &Fixture, mode: CallChecking, sym: SymbolId) -> bool {
        checked_in(&f.program, mode, sym)
    }

    fn checked_in(program: &Program, mode: CallChecking, sym: SymbolId) -> bool {
        let cfg = LowerConfig {
            call_checking: mode,
            ..LowerConfig::default()
        };
        let interner = SharedInterner::new();
        let types = CachingTypeMapper::new(program, 64);
        let rt = TableRuntime::from_symbols(&program.symbols);
        let module = &program.modules[0];
        let ctx = ModuleCtx::new(program, module, &cfg, &interner, &types, &rt);
        ctx.routine_may_raise(program.symbol(sym).unwrap())
    }

    #[test]
    fn modes() {
        let f = fixture();
        assert!(!checked(&f, CallChecking::Conservative, f.safe));
        assert!(checked(&f, CallChecking::Conservative, f.risky));
        assert!(checked(&f, CallChecking::Conservative, f.unknown_pure));
        assert!(!checked(&f, CallChecking::Precise, f.unknown_pure));
        assert!(checked(&f, CallChecking::Precise, f.unknown_raising));
        assert!(!checked(&f, CallChecking::Off, f.risky));
    }

    #[test]
    fn mutual_recursion_settles_both_ways() {
        // ping() calls pong(); pong() calls ping() and then raises.
        // even() and odd() call each other and nothing else.
        let mut b = ProgramBuilder::new();
        b.module("main");
        let void = b.void();
        let exc = b.exception("ValueError");
        let pt = b.proc_type(&[], void, RaisesInfo::Unknown);
        let ping = b.routine("ping", pt, RaisesInfo::Unknown);
        let pong = b.routine("pong", pt, RaisesInfo::Unknown);
        let even = b.routine("even", pt, RaisesInfo::Unknown);
        let odd = b.routine("odd", pt, RaisesInfo::Unknown);

        let body = b.call(pong, vec![], void);
        b.proc_decl(ping, vec![], None, body);
        let back = b.call(ping, vec![], void);
        let e = b.obj_constr(exc, vec![]);
        let r = b.raise(Some(e));
        let body = b.stmts(vec![back, r]);
        b.proc_decl(pong, vec![], None, body);
        let body = b.call(odd, vec![], void);
        b.proc_decl(even, vec![], None, body);
        let body = b.call(even, vec![], void);
        b.proc_decl(odd, vec![], None, body);
        let program = b.finish();

        // Each query starts from a fresh context, so each member of a
        // cycle is seen once as the root and once as a callee.
        assert!(checked_in(&program, CallChecking::Precise, ping));
        assert!(checked_in(&program, CallChecking::Precise, pong));
        assert!(!checked_in(&program, CallChecking::Precise, even));
        assert!(!checked_in(&program, CallChecking::Precise, odd));
    }
}
