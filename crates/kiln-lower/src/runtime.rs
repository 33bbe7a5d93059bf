// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! The runtime support library, as seen from lowering.
//!
//! Lowering only ever calls runtime routines by name. The routines are
//! ordinary symbols flagged `runtime`, usually declared by the `system`
//! module; [`declare_runtime`] declares the standard set for tools and tests.

use kiln_ast::build::ProgramBuilder;
use kiln_ast::{ModuleId, RaisesInfo, SymbolId, SymbolTable, TypeKind};
use rustc_hash::FxHashMap;

/// Collaborator interface for runtime routine lookup.
pub trait RuntimeLib: Sync {
    fn lookup(&self, name: &str) -> Option<SymbolId>;
}

/// Finds runtime routines among the program's symbols.
#[derive(Debug, Default)]
pub struct TableRuntime {
    by_name: FxHashMap<String, SymbolId>,
}

impl TableRuntime {
    pub fn from_symbols(symbols: &SymbolTable) -> Self {
        let by_name = symbols
            .iter()
            .filter(|s| s.flags.runtime && s.kind.is_routine())
            .map(|s| (s.name.clone(), s.id))
            .collect();
        Self { by_name }
    }
}

impl RuntimeLib for TableRuntime {
    fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }
}

pub const INT_TO_STRING: &str = "Int_toString";
pub const FLOAT_TO_STRING: &str = "Float_toString";
pub const BOOL_TO_STRING: &str = "Bool_toString";
pub const CHAR_TO_STRING: &str = "Char_toString";
pub const CSTRING_TO_STRING: &str = "CString_toString";
pub const STRING_LEN: &str = "String_len";
pub const SEQ_LEN: &str = "Seq_len";
pub const STRING_CONCAT: &str = "String_concat";
pub const STRING_PUSH: &str = "String_push";
pub const STRING_APPEND: &str = "String_append";
pub const SEQ_PUSH: &str = "Seq_push";
pub const STRING_SET_LEN: &str = "String_setLen";
pub const SEQ_SET_LEN: &str = "Seq_setLen";
pub const SEQ_NEW: &str = "Seq_new";
pub const STRING_EQ: &str = "String_eq";
pub const STRING_LE: &str = "String_le";
pub const STRING_LT: &str = "String_lt";
pub const ECHO: &str = "echo";
pub const ALLOC: &str = "alloc";
pub const QUIT: &str = "quit";

/// Declare the standard runtime routines in a `system` module.
///
/// Restores the builder's current module afterwards.
pub fn declare_runtime(b: &mut ProgramBuilder) -> ModuleId {
    let previous = b.current_module();
    let had_modules = !b.program().modules.is_empty();
    let system = b.module("system");

    let int = b.int();
    let float = b.float();
    let boolean = b.bool();
    let ch = b.char();
    let string = b.string();
    let void = b.void();
    let any_seq = b.seq(int);
    let string_ptr = b.ty(TypeKind::Ptr(string));
    let seq_ptr = b.ty(TypeKind::Ptr(any_seq));
    let int_ptr = b.ty(TypeKind::Ptr(int));

    let sigs: Vec<(&str, Vec<_>, _)> = vec![
        (INT_TO_STRING, vec![int], string),
        (FLOAT_TO_STRING, vec![float], string),
        (BOOL_TO_STRING, vec![boolean], string),
        (CHAR_TO_STRING, vec![ch], string),
        (CSTRING_TO_STRING, vec![string], string),
        (STRING_LEN, vec![string], int),
        (SEQ_LEN, vec![any_seq], int),
        (STRING_CONCAT, vec![string, string], string),
        (STRING_PUSH, vec![string_ptr, ch], void),
        (STRING_APPEND, vec![string_ptr, string], void),
        (SEQ_PUSH, vec![seq_ptr, int], void),
        (STRING_SET_LEN, vec![string_ptr, int], void),
        (SEQ_SET_LEN, vec![seq_ptr, int], void),
        (SEQ_NEW, vec![seq_ptr, int], void),
        (STRING_EQ, vec![string, string], boolean),
        (STRING_LE, vec![string, string], boolean),
        (STRING_LT, vec![string, string], boolean),
        (ECHO, vec![string], void),
        (ALLOC, vec![int_ptr, int], void),
    ];
    for (name, params, ret) in sigs {
        let ty = b.proc_type(&params, ret, RaisesInfo::Never);
        b.runtime_routine(name, ty, RaisesInfo::Never);
    }
    let quit_ty = b.proc_type(&[int], void, RaisesInfo::Never);
    let quit = b.runtime_routine(QUIT, quit_ty, RaisesInfo::Never);
    b.sym_mut(quit).flags.noreturn = true;

    if had_modules {
        if let Some(path) = b
            .program()
            .module(previous)
            .map(|m| m.path.clone())
        {
            b.module(&path);
        }
    }
    system
}
