// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Shared fixtures for the lowering integration tests.

#![allow(dead_code)]

use kiln_ast::build::ProgramBuilder;
use kiln_ast::{Node, Program, RaisesInfo, SymbolId, TypeId};
use kiln_diagnostics::Diagnostic;
use kiln_interp::{InterpError, Machine, Value};
use kiln_ir::{Instr, IrModule, IrProc};
use kiln_lower::runtime::{declare_runtime, ECHO};
use kiln_lower::{lower_program, LowerConfig};

/// A `main` module with the runtime routines declared next to it.
pub struct Fixture {
    pub b: ProgramBuilder,
    pub void: TypeId,
    pub int: TypeId,
    pub boolean: TypeId,
    pub string: TypeId,
    pub echo: SymbolId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut b = ProgramBuilder::new();
        b.module("main");
        declare_runtime(&mut b);
        let echo = b
            .program()
            .symbols
            .iter()
            .find(|s| s.name == ECHO)
            .map(|s| s.id)
            .expect("runtime declares echo");
        Self {
            void: b.void(),
            int: b.int(),
            boolean: b.bool(),
            string: b.string(),
            echo,
            b,
        }
    }

    /// A routine symbol with the given signature.
    pub fn routine(&mut self, name: &str, params: &[TypeId], ret: TypeId, raises: RaisesInfo) -> SymbolId {
        let ty = self.b.proc_type(params, ret, raises);
        self.b.routine(name, ty, raises)
    }

    /// `echo(text)` as a statement.
    pub fn echo(&mut self, text: &str) -> Node {
        let arg = self.b.str_lit(text);
        let void = self.void;
        self.b.call(self.echo, vec![arg], void)
    }

    /// A call statement with no arguments.
    pub fn call0(&mut self, callee: SymbolId) -> Node {
        let void = self.void;
        self.b.call(callee, Vec::new(), void)
    }

    pub fn magic(&mut self, magic: kiln_ast::Magic, args: Vec<Node>, ty: TypeId) -> Node {
        self.b.magic(magic, args, ty)
    }

    pub fn finish(self) -> Program {
        self.b.finish()
    }
}

pub fn config() -> LowerConfig {
    LowerConfig {
        jobs: Some(1),
        ..LowerConfig::default()
    }
}

pub fn lower(program: &Program, config: &LowerConfig) -> (Vec<IrModule>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let modules = lower_program(program, config, &mut diagnostics);
    (modules, diagnostics)
}

/// Lower with the default test config and insist on a clean result.
pub fn lower_ok(program: &Program) -> Vec<IrModule> {
    let (modules, diagnostics) = lower(program, &config());
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {:#?}", diagnostics);
    for m in &modules {
        for p in &m.procs {
            assert_eq!(kiln_ir::validate(p), Ok(()), "`{}` is malformed", m.string(p.name));
        }
    }
    modules
}

pub fn module<'m>(modules: &'m [IrModule], name: &str) -> &'m IrModule {
    modules
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("no module `{}`", name))
}

pub fn proc_named<'m>(modules: &'m [IrModule], module_name: &str, name: &str) -> &'m IrProc {
    module(modules, module_name)
        .proc_named(name)
        .unwrap_or_else(|| panic!("no routine `{}` in `{}`", name, module_name))
}

/// The body without source markers and slot declarations.
pub fn code(p: &IrProc) -> Vec<&Instr> {
    p.body
        .iter()
        .filter(|i| !matches!(i, Instr::SourceLoc(_) | Instr::Summon { .. }))
        .collect()
}

pub fn count(p: &IrProc, pred: impl Fn(&Instr) -> bool) -> usize {
    p.body.iter().filter(|i| pred(i)).count()
}

/// Run `name` in `main` and return its result and everything it echoed.
pub fn run(modules: Vec<IrModule>, name: &str, args: Vec<Value>) -> (Result<Value, InterpError>, String) {
    let mut vm = Machine::new(modules);
    let result = vm.call("main", name, args);
    (result, vm.output().to_string())
}
