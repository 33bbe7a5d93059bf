// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Module Build Context - per compilation unit state shared by every
//! procedure lowered into it.

use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use kiln_ast::{Module, ModuleId, ProcDecl, Program, Span, Symbol, SymbolId};
use rustc_hash::FxHashMap;

use crate::{Interner, LowerConfig, LowerError, LowerErrorKind, RuntimeLib, TypeMapper};

/// A routine referenced from this module whose body may still need lowering.
#[derive(Debug, Clone, Copy)]
pub struct PendingProc<'a> {
    pub sym: SymbolId,
    /// `None` for routines without a body (runtime, foreign declarations)
    pub decl: Option<&'a ProcDecl>,
}

/// Read-mostly context; safe to share between workers.
pub struct ModuleCtx<'a> {
    pub program: &'a Program,
    pub module: &'a Module,
    pub config: &'a LowerConfig,
    pub interner: &'a dyn Interner,
    pub types: &'a dyn TypeMapper,
    pub runtime: &'a dyn RuntimeLib,
    decls: FxHashMap<SymbolId, &'a ProcDecl>,
    pending: Mutex<IndexMap<SymbolId, PendingProc<'a>>>,
    pub(crate) raise_memo: Mutex<FxHashMap<SymbolId, bool>>,
}

impl<'a> ModuleCtx<'a> {
    pub fn new(
        program: &'a Program,
        module: &'a Module,
        config: &'a LowerConfig,
        interner: &'a dyn Interner,
        types: &'a dyn TypeMapper,
        runtime: &'a dyn RuntimeLib,
    ) -> Self {
        let decls = program
            .modules
            .iter()
            .flat_map(|m| m.procs.iter())
            .map(|p| (p.sym, p))
            .collect();
        Self {
            program,
            module,
            config,
            interner,
            types,
            runtime,
            decls,
            pending: Mutex::new(IndexMap::new()),
            raise_memo: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.module.id
    }

    pub fn int_bits(&self) -> u8 {
        self.config.int_bits
    }

    pub fn symbol(&self, id: SymbolId, span: Span) -> Result<&'a Symbol, LowerError> {
        self.program.symbol(id).ok_or_else(|| {
            LowerError::new(
                LowerErrorKind::MissingDescriptor {
                    what: format!("symbol #{}", id.0),
                },
                span,
            )
        })
    }

    pub fn decl(&self, sym: SymbolId) -> Option<&'a ProcDecl> {
        self.decls.get(&sym).copied()
    }

    /// Queue a routine for lowering. Returns false if it was already queued.
    pub fn enqueue(&self, sym: SymbolId) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.contains_key(&sym) {
            return false;
        }
        log::trace!("queueing routine #{}", sym.0);
        pending.insert(
            sym,
            PendingProc {
                sym,
                decl: self.decl(sym),
            },
        );
        true
    }

    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queue entries from position `start` on, in insertion order.
    pub fn pending_from(&self, start: usize) -> Vec<PendingProc<'a>> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.values().skip(start).copied().collect()
    }
}
