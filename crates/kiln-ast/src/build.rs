// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Programmatic construction of typed ASTs.
//!
//! Tools and tests use this instead of a front end. Symbols are attached
//! to the module most recently opened with [`ProgramBuilder::module`].

use std::collections::HashMap;

use crate::{
    CaseBranch, CaseItem, ConstValue, ExceptClause, FileId, IfBranch, Magic, Module, ModuleId,
    Node, NodeId, NodeKind, ProcDecl, Program, RaisesInfo, Span, SymFlags, SymKind, Symbol,
    SymbolId, TypeId, TypeKind, TypeTable, VarDef,
};

pub struct ProgramBuilder {
    program: Program,
    current: ModuleId,
    next_item: HashMap<ModuleId, u32>,
    next_node: u32,
    line: u32,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            program: Program::default(),
            current: ModuleId(0),
            next_item: HashMap::new(),
            next_node: 0,
            line: 1,
        }
    }

    /// Open (or reopen) a module; later symbols and items belong to it.
    pub fn module(&mut self, path: &str) -> ModuleId {
        if let Some(m) = self.program.modules.iter().find(|m| m.path == path) {
            self.current = m.id;
            return m.id;
        }
        let id = ModuleId(self.program.modules.len() as u32);
        self.program.modules.push(Module {
            id,
            path: path.to_string(),
            procs: Vec::new(),
            top_level: Vec::new(),
        });
        self.current = id;
        id
    }

    pub fn current_module(&self) -> ModuleId {
        self.current
    }

    /// Set the source line used for subsequently built nodes.
    pub fn at(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self
    }

    // ── Types ───────────────────────────────────────────────────

    pub fn ty(&mut self, kind: TypeKind) -> TypeId {
        self.program.types.add(kind)
    }

    pub fn void(&mut self) -> TypeId {
        TypeTable::VOID
    }

    pub fn int(&mut self) -> TypeId {
        self.ty(TypeKind::Int { bits: 0, signed: true })
    }

    pub fn bool(&mut self) -> TypeId {
        self.ty(TypeKind::Bool)
    }

    pub fn float(&mut self) -> TypeId {
        self.ty(TypeKind::Float { bits: 64 })
    }

    pub fn char(&mut self) -> TypeId {
        self.ty(TypeKind::Char)
    }

    pub fn string(&mut self) -> TypeId {
        self.ty(TypeKind::String)
    }

    pub fn noreturn(&mut self) -> TypeId {
        self.ty(TypeKind::NoReturn)
    }

    pub fn seq(&mut self, elem: TypeId) -> TypeId {
        self.ty(TypeKind::Seq(elem))
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.ty(TypeKind::Array { elem, len, low: 0 })
    }

    /// An object type with the given `(name, type)` fields. Returns the type
    /// and the field symbols in declaration order.
    pub fn object(&mut self, name: &str, fields: &[(&str, TypeId)]) -> (TypeId, Vec<SymbolId>) {
        self.object_impl(name, fields, false)
    }

    /// An exception object type (no fields beyond its identity).
    pub fn exception(&mut self, name: &str) -> TypeId {
        self.object_impl(name, &[], true).0
    }

    fn object_impl(
        &mut self,
        name: &str,
        fields: &[(&str, TypeId)],
        exception: bool,
    ) -> (TypeId, Vec<SymbolId>) {
        let syms: Vec<SymbolId> = fields
            .iter()
            .enumerate()
            .map(|(i, (fname, fty))| {
                let id = self.symbol(fname, SymKind::Field, *fty);
                self.sym_mut(id).position = i as u32;
                id
            })
            .collect();
        let ty = self.ty(TypeKind::Object {
            name: name.to_string(),
            fields: syms.clone(),
            exception,
        });
        (ty, syms)
    }

    pub fn proc_type(&mut self, params: &[TypeId], ret: TypeId, raises: RaisesInfo) -> TypeId {
        self.ty(TypeKind::Proc {
            params: params.to_vec(),
            ret,
            raises,
        })
    }

    // ── Symbols ─────────────────────────────────────────────────

    /// Add a symbol to the current module.
    pub fn symbol(&mut self, name: &str, kind: SymKind, ty: TypeId) -> SymbolId {
        let item = self.next_item.entry(self.current).or_insert(0);
        let sym = Symbol {
            id: SymbolId(0),
            name: name.to_string(),
            kind,
            ty,
            module: self.current,
            item: *item,
            magic: None,
            flags: SymFlags::default(),
            raises: RaisesInfo::Unknown,
            position: 0,
            value: None,
        };
        *item += 1;
        self.program.symbols.push(sym)
    }

    /// Mutable access for adjusting flags after creation.
    ///
    /// Panics on an id that did not come from this builder.
    pub fn sym_mut(&mut self, id: SymbolId) -> &mut Symbol {
        match self.program.symbols.get_mut(id) {
            Some(s) => s,
            None => panic!("unknown symbol {:?}", id),
        }
    }

    pub fn var(&mut self, name: &str, ty: TypeId) -> SymbolId {
        self.symbol(name, SymKind::Var, ty)
    }

    pub fn global(&mut self, name: &str, ty: TypeId) -> SymbolId {
        let id = self.symbol(name, SymKind::Var, ty);
        self.sym_mut(id).flags.global = true;
        id
    }

    pub fn param(&mut self, name: &str, ty: TypeId) -> SymbolId {
        self.symbol(name, SymKind::Param, ty)
    }

    pub fn out_param(&mut self, name: &str, ty: TypeId) -> SymbolId {
        let id = self.symbol(name, SymKind::Param, ty);
        self.sym_mut(id).flags.out_param = true;
        id
    }

    pub fn result_var(&mut self, ty: TypeId) -> SymbolId {
        self.symbol("result", SymKind::Result, ty)
    }

    pub fn constant(&mut self, name: &str, ty: TypeId, value: ConstValue) -> SymbolId {
        let id = self.symbol(name, SymKind::Const, ty);
        self.sym_mut(id).value = Some(value);
        id
    }

    pub fn label(&mut self, name: &str) -> SymbolId {
        self.symbol(name, SymKind::Label, TypeTable::VOID)
    }

    /// A routine symbol; `ty` is its proc type.
    pub fn routine(&mut self, name: &str, ty: TypeId, raises: RaisesInfo) -> SymbolId {
        let id = self.symbol(name, SymKind::Proc, ty);
        self.sym_mut(id).raises = raises;
        id
    }

    pub fn magic_routine(&mut self, name: &str, ty: TypeId, magic: Magic) -> SymbolId {
        let id = self.symbol(name, SymKind::Proc, ty);
        let s = self.sym_mut(id);
        s.magic = Some(magic);
        s.raises = RaisesInfo::Never;
        id
    }

    /// A routine of the runtime support library.
    pub fn runtime_routine(&mut self, name: &str, ty: TypeId, raises: RaisesInfo) -> SymbolId {
        let id = self.routine(name, ty, raises);
        self.sym_mut(id).flags.runtime = true;
        id
    }

    // ── Nodes ───────────────────────────────────────────────────

    pub fn node(&mut self, kind: NodeKind, ty: TypeId) -> Node {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        Node {
            id,
            kind,
            ty,
            span: Span::new(FileId(self.current.0), self.line, 1),
        }
    }

    pub fn empty(&mut self) -> Node {
        self.node(NodeKind::Empty, TypeTable::VOID)
    }

    pub fn int_lit(&mut self, v: i64) -> Node {
        let ty = self.int();
        self.node(NodeKind::IntLit(v), ty)
    }

    pub fn bool_lit(&mut self, v: bool) -> Node {
        let ty = self.bool();
        self.node(NodeKind::BoolLit(v), ty)
    }

    pub fn str_lit(&mut self, v: &str) -> Node {
        let ty = self.string();
        self.node(NodeKind::StrLit(v.to_string()), ty)
    }

    pub fn sym(&mut self, id: SymbolId) -> Node {
        let ty = self.program.symbols.get(id).map(|s| s.ty).unwrap_or(TypeTable::VOID);
        self.node(NodeKind::Sym(id), ty)
    }

    /// Call a routine symbol; the node's type is `ret`.
    pub fn call(&mut self, callee: SymbolId, args: Vec<Node>, ret: TypeId) -> Node {
        let callee = self.sym(callee);
        self.node(
            NodeKind::Call {
                callee: Box::new(callee),
                args,
            },
            ret,
        )
    }

    /// Call through an arbitrary callee expression.
    pub fn call_expr(&mut self, callee: Node, args: Vec<Node>, ret: TypeId) -> Node {
        self.node(
            NodeKind::Call {
                callee: Box::new(callee),
                args,
            },
            ret,
        )
    }

    /// Apply a built-in operation directly.
    pub fn magic(&mut self, magic: Magic, args: Vec<Node>, ret: TypeId) -> Node {
        let callee = self.node(NodeKind::Builtin(magic), TypeTable::VOID);
        self.call_expr(callee, args, ret)
    }

    pub fn not(&mut self, operand: Node) -> Node {
        let ty = self.bool();
        self.magic(Magic::Not, vec![operand], ty)
    }

    pub fn asgn(&mut self, dest: Node, value: Node) -> Node {
        self.node(
            NodeKind::Asgn {
                dest: Box::new(dest),
                value: Box::new(value),
            },
            TypeTable::VOID,
        )
    }

    pub fn var_section(&mut self, defs: Vec<(SymbolId, Option<Node>)>) -> Node {
        let defs = defs
            .into_iter()
            .map(|(sym, init)| VarDef { sym, init })
            .collect();
        self.node(NodeKind::VarSection(defs), TypeTable::VOID)
    }

    pub fn stmts(&mut self, items: Vec<Node>) -> Node {
        self.node(NodeKind::Stmts(items), TypeTable::VOID)
    }

    pub fn discard(&mut self, value: Node) -> Node {
        self.node(NodeKind::Discard(Some(Box::new(value))), TypeTable::VOID)
    }

    pub fn if_(&mut self, branches: Vec<(Option<Node>, Node)>, ty: TypeId) -> Node {
        let branches = branches
            .into_iter()
            .map(|(cond, body)| IfBranch { cond, body })
            .collect();
        self.node(NodeKind::If(branches), ty)
    }

    pub fn while_(&mut self, cond: Node, body: Node) -> Node {
        self.node(
            NodeKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
            TypeTable::VOID,
        )
    }

    pub fn block(&mut self, label: Option<SymbolId>, body: Node) -> Node {
        let ty = body.ty;
        self.node(
            NodeKind::Block {
                label,
                body: Box::new(body),
            },
            ty,
        )
    }

    pub fn brk(&mut self, target: Option<SymbolId>) -> Node {
        let ty = self.noreturn();
        self.node(NodeKind::Break(target), ty)
    }

    /// `case`; each branch is `(items, body)` with empty items for `else`.
    pub fn case(&mut self, scrutinee: Node, branches: Vec<(Vec<CaseItem>, Node)>, ty: TypeId) -> Node {
        let branches = branches
            .into_iter()
            .map(|(items, body)| CaseBranch { items, body })
            .collect();
        self.node(
            NodeKind::Case {
                scrutinee: Box::new(scrutinee),
                branches,
            },
            ty,
        )
    }

    pub fn try_(
        &mut self,
        body: Node,
        handlers: Vec<(Vec<TypeId>, Node)>,
        finally: Option<Node>,
        ty: TypeId,
    ) -> Node {
        let handlers = handlers
            .into_iter()
            .map(|(types, body)| ExceptClause { types, body })
            .collect();
        self.node(
            NodeKind::Try {
                body: Box::new(body),
                handlers,
                finally: finally.map(Box::new),
            },
            ty,
        )
    }

    pub fn ret(&mut self, value: Option<Node>) -> Node {
        let ty = self.noreturn();
        self.node(NodeKind::Return(value.map(Box::new)), ty)
    }

    pub fn raise(&mut self, value: Option<Node>) -> Node {
        let ty = self.noreturn();
        self.node(NodeKind::Raise(value.map(Box::new)), ty)
    }

    /// Construct an object of type `ty` with `(field, value)` pairs.
    pub fn obj_constr(&mut self, ty: TypeId, fields: Vec<(SymbolId, Node)>) -> Node {
        self.node(NodeKind::ObjConstr(fields), ty)
    }

    pub fn field(&mut self, base: Node, field: SymbolId) -> Node {
        let ty = self.program.symbols.get(field).map(|s| s.ty).unwrap_or(TypeTable::VOID);
        self.node(
            NodeKind::Field {
                base: Box::new(base),
                field,
            },
            ty,
        )
    }

    pub fn index(&mut self, base: Node, index: Node, elem: TypeId) -> Node {
        self.node(
            NodeKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            elem,
        )
    }

    // ── Declarations ────────────────────────────────────────────

    pub fn proc_decl(
        &mut self,
        sym: SymbolId,
        params: Vec<SymbolId>,
        result: Option<SymbolId>,
        body: Node,
    ) {
        let module = self
            .program
            .symbols
            .get(sym)
            .map(|s| s.module)
            .unwrap_or(self.current);
        if let Some(m) = self.program.modules.iter_mut().find(|m| m.id == module) {
            m.procs.push(ProcDecl {
                sym,
                params,
                result,
                body,
            });
        }
    }

    pub fn top_level(&mut self, node: Node) {
        let current = self.current;
        if let Some(m) = self.program.modules.iter_mut().find(|m| m.id == current) {
            m.top_level.push(node);
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn finish(self) -> Program {
        self.program
    }
}
