// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Module-level driver.
//!
//! Lowers a module's initializer and routines, then drains the pending
//! queue: referenced routines that this module must emit are lowered in
//! further rounds, everything else becomes an extern declaration.
//!
//! Routines within a round are independent and are lowered on scoped
//! worker threads. Output does not depend on the number of jobs: types
//! are mapped before workers start, and interned tables are renumbered
//! by first use once the module is complete.

use kiln_ast::{ModuleId, ProcDecl, Program, Span, SymbolId};
use kiln_diagnostics::{DiagnosticSink, ToDiagnostic};
use kiln_ir::{ExternDecl, GlobalDecl, IrModule, IrProc};
use rustc_hash::FxHashSet;

use crate::context::PendingProc;
use crate::lower::{lower_init, lower_proc};
use crate::{
    CachingTypeMapper, Interner, LowerConfig, LowerError, LowerErrorKind, ModuleCtx, SharedInterner,
    TableRuntime, TypeMapper,
};

type Lowered = (SymbolId, Result<IrProc, LowerError>);

/// Lower one module. Per-routine failures are reported to `sink` and the
/// routine is left out; only a missing module is an error.
pub fn lower_module(
    program: &Program,
    id: ModuleId,
    config: &LowerConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<IrModule, LowerError> {
    let module = program.module(id).ok_or_else(|| {
        LowerError::new(
            LowerErrorKind::MissingDescriptor {
                what: format!("module #{}", id.0),
            },
            Span::unknown(),
        )
    })?;
    log::info!("lowering module `{}` ({} routines)", module.path, module.procs.len());

    let interner = SharedInterner::new();
    let types = CachingTypeMapper::new(program, config.int_bits);
    types.prime();
    let runtime = TableRuntime::from_symbols(&program.symbols);
    let m = ModuleCtx::new(program, module, config, &interner, &types, &runtime);

    let mut out = IrModule {
        name: module.path.clone(),
        ..IrModule::default()
    };

    for sym in program.symbols.iter().filter(|s| s.module == id && s.flags.global) {
        out.globals.push(GlobalDecl {
            sym: m.sym_ref(sym),
            name: interner.intern_string(&sym.name),
            ty: types.ir_type(sym.ty),
        });
    }

    if !module.top_level.is_empty() {
        match lower_init(&m, module) {
            Ok(init) => out.init = Some(init),
            Err(err) => report(sink, &err, &format!("{}.init", module.path)),
        }
    }

    let mut done: FxHashSet<SymbolId> = module.procs.iter().map(|p| p.sym).collect();
    let own: Vec<&ProcDecl> = module.procs.iter().collect();
    collect(program, &mut out, sink, lower_batch(&m, &own));

    let mut cursor = 0;
    loop {
        let pending = m.pending_from(cursor);
        if pending.is_empty() {
            break;
        }
        cursor += pending.len();
        let mut fresh: Vec<PendingProc<'_>> = pending.into_iter().filter(|p| done.insert(p.sym)).collect();
        fresh.sort_by_key(|p| p.sym);

        let mut batch = Vec::new();
        for p in fresh {
            let Some(sym) = program.symbol(p.sym) else {
                continue;
            };
            match p.decl {
                Some(decl) if sym.module == id || sym.flags.local_copy => batch.push(decl),
                _ => {
                    log::debug!("`{}` is external to `{}`", sym.name, module.path);
                    out.externs.push(ExternDecl {
                        sym: m.sym_ref(sym),
                        name: interner.intern_string(&sym.name),
                        runtime: sym.flags.runtime,
                    });
                }
            }
        }
        if !batch.is_empty() {
            log::debug!("lowering {} queued routine(s)", batch.len());
            collect(program, &mut out, sink, lower_batch(&m, &batch));
        }
    }

    interner.install(&mut out);
    out.types = types.table();
    log::info!(
        "module `{}`: {} routines, {} externs",
        out.name,
        out.procs.len(),
        out.externs.len()
    );
    Ok(out)
}

/// Lower every module of the program, in order.
pub fn lower_program(program: &Program, config: &LowerConfig, sink: &mut dyn DiagnosticSink) -> Vec<IrModule> {
    let mut modules = Vec::with_capacity(program.modules.len());
    for module in &program.modules {
        match lower_module(program, module.id, config, sink) {
            Ok(ir) => modules.push(ir),
            Err(err) => report(sink, &err, &module.path),
        }
    }
    modules
}

/// Lower independent routines, `config.jobs()` at a time.
fn lower_batch<'a>(m: &ModuleCtx<'a>, decls: &[&'a ProcDecl]) -> Vec<Lowered> {
    let jobs = m.config.jobs();
    if jobs <= 1 || decls.len() <= 1 {
        return decls.iter().map(|d| (d.sym, lower_proc(m, d))).collect();
    }

    let mut out = Vec::with_capacity(decls.len());
    for chunk in decls.chunks(jobs) {
        std::thread::scope(|s| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|&d| s.spawn(move || lower_proc(m, d)))
                .collect();
            for (handle, d) in handles.into_iter().zip(chunk) {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(LowerError::internal("lowering worker panicked", d.body.span)));
                out.push((d.sym, result));
            }
        });
    }
    out
}

fn collect(program: &Program, out: &mut IrModule, sink: &mut dyn DiagnosticSink, lowered: Vec<Lowered>) {
    for (sym, result) in lowered {
        match result {
            Ok(proc) => out.procs.push(proc),
            Err(err) => {
                let name = program
                    .symbol(sym)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| format!("#{}", sym.0));
                report(sink, &err, &name);
            }
        }
    }
}

fn report(sink: &mut dyn DiagnosticSink, err: &LowerError, item: &str) {
    log::warn!("skipping `{}`: {}", item, err);
    sink.report(err.to_diagnostic().in_item(item));
}
