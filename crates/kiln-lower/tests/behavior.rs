// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Lowered code, executed: evaluation order, exception routing and
//! value-producing control flow.

mod common;

use common::{count, lower_ok, run, Fixture};
use kiln_ast::{CaseItem, Magic, Node, NodeKind, RaisesInfo, SymbolId, TypeId, TypeKind};
use kiln_interp::{InterpError, Value};
use kiln_ir::Instr;

/// `name(): ty` whose body assigns `value(f)` to its result.
fn returning(f: &mut Fixture, name: &str, ty: TypeId, value: impl FnOnce(&mut Fixture) -> Node) -> SymbolId {
    let sym = f.routine(name, &[], ty, RaisesInfo::Never);
    let result = f.b.result_var(ty);
    let v = value(f);
    let target = f.b.sym(result);
    let body = f.b.asgn(target, v);
    f.b.proc_decl(sym, vec![], Some(result), body);
    sym
}

// ═══════════════════════════════════════════════════════════
// Short-circuit evaluation
// ═══════════════════════════════════════════════════════════

#[test]
fn and_or_skip_the_right_operand() {
    let mut f = Fixture::new();
    let boolean = f.boolean;

    // side(): bool = echo "side"; return true
    let side = f.routine("side", &[], boolean, RaisesInfo::Never);
    let result = f.b.result_var(boolean);
    let say = f.echo("side");
    let yes = f.b.bool_lit(true);
    let ret = f.b.ret(Some(yes));
    let body = f.b.stmts(vec![say, ret]);
    f.b.proc_decl(side, vec![], Some(result), body);

    for (name, magic, lhs) in [
        ("andFalse", Magic::And, false),
        ("orTrue", Magic::Or, true),
        ("andTrue", Magic::And, true),
        ("orFalse", Magic::Or, false),
    ] {
        returning(&mut f, name, boolean, |f| {
            let l = f.b.bool_lit(lhs);
            let r = f.b.call(side, vec![], boolean);
            f.magic(magic, vec![l, r], boolean)
        });
    }
    let modules = lower_ok(&f.finish());

    for (name, expected, output) in [
        ("andFalse", false, ""),
        ("orTrue", true, ""),
        ("andTrue", true, "side\n"),
        ("orFalse", true, "side\n"),
    ] {
        let (result, out) = run(modules.clone(), name, Vec::new());
        assert_eq!(result, Ok(Value::Bool(expected)), "{}", name);
        assert_eq!(out, output, "{}", name);
    }
}

#[test]
fn and_into_a_variable_it_reads() {
    // a = false; b = true; a = b and a
    let mut f = Fixture::new();
    let boolean = f.boolean;
    let alias = f.routine("alias", &[], boolean, RaisesInfo::Never);
    let result = f.b.result_var(boolean);
    let a = f.b.var("a", boolean);
    let b = f.b.var("b", boolean);
    let no = f.b.bool_lit(false);
    let yes = f.b.bool_lit(true);
    let decl = f.b.var_section(vec![(a, Some(no)), (b, Some(yes))]);
    let bv = f.b.sym(b);
    let av = f.b.sym(a);
    let both = f.magic(Magic::And, vec![bv, av], boolean);
    let target = f.b.sym(a);
    let update = f.b.asgn(target, both);
    let res = f.b.sym(result);
    let av = f.b.sym(a);
    let done = f.b.asgn(res, av);
    let body = f.b.stmts(vec![decl, update, done]);
    f.b.proc_decl(alias, vec![], Some(result), body);

    let (result, _) = run(lower_ok(&f.finish()), "alias", Vec::new());
    assert_eq!(result, Ok(Value::Bool(false)));
}

// ═══════════════════════════════════════════════════════════
// Exceptions
// ═══════════════════════════════════════════════════════════

#[test]
fn nested_handlers_reraise_outward() {
    let mut f = Fixture::new();
    let void = f.void;
    let e1 = f.b.exception("E1");
    let deep = f.routine("deep", &[], void, RaisesInfo::Never);

    let exc = f.b.obj_constr(e1, vec![]);
    let raise = f.b.raise(Some(exc));
    let say = f.echo("l3");
    let again = f.b.raise(None);
    let handler3 = f.b.stmts(vec![say, again]);
    let fin3 = f.echo("f3");
    let level3 = f.b.try_(raise, vec![(vec![e1], handler3)], Some(fin3), void);

    let say = f.echo("l2");
    let again = f.b.raise(None);
    let handler2 = f.b.stmts(vec![say, again]);
    let level2 = f.b.try_(level3, vec![(vec![e1], handler2)], None, void);

    let handler1 = f.echo("l1");
    let level1 = f.b.try_(level2, vec![(vec![e1], handler1)], None, void);
    let done = f.echo("done");
    let body = f.b.stmts(vec![level1, done]);
    f.b.proc_decl(deep, vec![], None, body);

    let modules = lower_ok(&f.finish());
    let (result, output) = run(modules, "deep", Vec::new());
    assert_eq!(result, Ok(Value::Void));
    assert_eq!(output, "l3\nf3\nl2\nl1\ndone\n");
}

#[test]
fn unmatched_exception_leaves_the_routine() {
    let mut f = Fixture::new();
    let void = f.void;
    let e1 = f.b.exception("E1");
    let e2 = f.b.exception("E2");
    let wrong = f.routine("wrong", &[], void, RaisesInfo::May);

    let exc = f.b.obj_constr(e2, vec![]);
    let raise = f.b.raise(Some(exc));
    let handler = f.echo("caught");
    let fin = f.echo("finally");
    let t = f.b.try_(raise, vec![(vec![e1], handler)], Some(fin), void);
    let after = f.echo("after");
    let body = f.b.stmts(vec![t, after]);
    f.b.proc_decl(wrong, vec![], None, body);

    let (result, output) = run(lower_ok(&f.finish()), "wrong", Vec::new());
    assert_eq!(result, Err(InterpError::Unhandled("E2".to_string())));
    assert_eq!(output, "finally\n");
}

#[test]
fn catch_all_and_multi_type_handlers() {
    let mut f = Fixture::new();
    let void = f.void;
    let e1 = f.b.exception("E1");
    let e2 = f.b.exception("E2");
    let e3 = f.b.exception("E3");

    for (name, raised) in [("first", e1), ("second", e2), ("other", e3)] {
        let sym = f.routine(name, &[], void, RaisesInfo::Never);
        let exc = f.b.obj_constr(raised, vec![]);
        let raise = f.b.raise(Some(exc));
        let either = f.echo("either");
        let any = f.echo("any");
        let t = f.b.try_(raise, vec![(vec![e1, e2], either), (vec![], any)], None, void);
        f.b.proc_decl(sym, vec![], None, t);
    }
    let modules = lower_ok(&f.finish());

    for (name, expected) in [("first", "either\n"), ("second", "either\n"), ("other", "any\n")] {
        let (result, output) = run(modules.clone(), name, Vec::new());
        assert_eq!(result, Ok(Value::Void), "{}", name);
        assert_eq!(output, expected, "{}", name);
    }
}

#[test]
fn return_runs_the_finally_once() {
    let mut f = Fixture::new();
    let (void, int) = (f.void, f.int);
    let early = f.routine("early", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);

    let one = f.b.int_lit(1);
    let ret = f.b.ret(Some(one));
    let fin = f.echo("fin");
    let t = f.b.try_(ret, vec![], Some(fin), void);
    let res = f.b.sym(result);
    let two = f.b.int_lit(2);
    let unreachable = f.b.asgn(res, two);
    let body = f.b.stmts(vec![t, unreachable]);
    f.b.proc_decl(early, vec![], Some(result), body);

    let (result, output) = run(lower_ok(&f.finish()), "early", Vec::new());
    assert_eq!(result, Ok(Value::Int(1)));
    assert_eq!(output, "fin\n");
}

// ═══════════════════════════════════════════════════════════
// Loops and value-producing constructs
// ═══════════════════════════════════════════════════════════

#[test]
fn while_true_leaves_through_break() {
    // var i = 0; while true: (i = i + 1; if i == 5: break); result = i
    let mut f = Fixture::new();
    let (void, int, boolean) = (f.void, f.int, f.boolean);
    let five = f.routine("five", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let i = f.b.var("i", int);

    let zero = f.b.int_lit(0);
    let decl = f.b.var_section(vec![(i, Some(zero))]);
    let iv = f.b.sym(i);
    let one = f.b.int_lit(1);
    let sum = f.magic(Magic::AddI, vec![iv, one], int);
    let target = f.b.sym(i);
    let step = f.b.asgn(target, sum);
    let iv = f.b.sym(i);
    let lit = f.b.int_lit(5);
    let eq = f.magic(Magic::EqI, vec![iv, lit], boolean);
    let brk = f.b.brk(None);
    let check = f.b.if_(vec![(Some(eq), brk)], void);
    let loop_body = f.b.stmts(vec![step, check]);
    let forever = f.b.bool_lit(true);
    let lp = f.b.while_(forever, loop_body);
    let res = f.b.sym(result);
    let iv = f.b.sym(i);
    let done = f.b.asgn(res, iv);
    let body = f.b.stmts(vec![decl, lp, done]);
    f.b.proc_decl(five, vec![], Some(result), body);

    let modules = lower_ok(&f.finish());
    let p = common::proc_named(&modules, "main", "five");
    // Only the `if` tests anything; the loop head does not.
    assert_eq!(count(p, |i| matches!(i, Instr::Select { .. })), 1);
    assert_eq!(count(p, |i| matches!(i, Instr::GotoLoop(_))), 1);

    let (result, _) = run(modules, "five", Vec::new());
    assert_eq!(result, Ok(Value::Int(5)));
}

#[test]
fn case_expression_writes_the_result() {
    let mut f = Fixture::new();
    let int = f.int;
    let classify = f.routine("classify", &[int], int, RaisesInfo::Never);
    let n = f.b.param("n", int);
    let result = f.b.result_var(int);

    let scrutinee = f.b.sym(n);
    let items_a = {
        let one = f.b.int_lit(1);
        let two = f.b.int_lit(2);
        vec![CaseItem::Value(one), CaseItem::Value(two)]
    };
    let items_b = {
        let lo = f.b.int_lit(3);
        let hi = f.b.int_lit(5);
        vec![CaseItem::Range(lo, hi)]
    };
    let ten = f.b.int_lit(10);
    let twenty = f.b.int_lit(20);
    let thirty = f.b.int_lit(30);
    let value = f.b.case(scrutinee, vec![(items_a, ten), (items_b, twenty), (vec![], thirty)], int);
    let target = f.b.sym(result);
    let body = f.b.asgn(target, value);
    f.b.proc_decl(classify, vec![n], Some(result), body);

    let modules = lower_ok(&f.finish());
    for (arg, expected) in [(2, 10), (3, 20), (5, 20), (9, 30)] {
        let (result, _) = run(modules.clone(), "classify", vec![Value::Int(arg)]);
        assert_eq!(result, Ok(Value::Int(expected)), "classify({})", arg);
    }
}

#[test]
fn if_expression_with_a_raising_branch() {
    // result = if ok: 7 else: raise Oops()
    let mut f = Fixture::new();
    let (int, boolean) = (f.int, f.boolean);
    let oops = f.b.exception("Oops");
    let pick = f.routine("pick", &[boolean], int, RaisesInfo::May);
    let ok = f.b.param("ok", boolean);
    let result = f.b.result_var(int);

    let cond = f.b.sym(ok);
    let seven = f.b.int_lit(7);
    let exc = f.b.obj_constr(oops, vec![]);
    let raise = f.b.raise(Some(exc));
    let value = f.b.if_(vec![(Some(cond), seven), (None, raise)], int);
    let target = f.b.sym(result);
    let body = f.b.asgn(target, value);
    f.b.proc_decl(pick, vec![ok], Some(result), body);

    let modules = lower_ok(&f.finish());
    let (result, _) = run(modules.clone(), "pick", vec![Value::Bool(true)]);
    assert_eq!(result, Ok(Value::Int(7)));
    let (result, _) = run(modules, "pick", vec![Value::Bool(false)]);
    assert_eq!(result, Err(InterpError::Unhandled("Oops".to_string())));
}

#[test]
fn inc_rewrites_to_an_add() {
    let mut f = Fixture::new();
    let (void, int) = (f.void, f.int);
    let bump = f.routine("bump", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let x = f.b.var("x", int);

    let start = f.b.int_lit(41);
    let decl = f.b.var_section(vec![(x, Some(start))]);
    let xv = f.b.sym(x);
    let inc = f.magic(Magic::Inc, vec![xv], void);
    let res = f.b.sym(result);
    let xv = f.b.sym(x);
    let done = f.b.asgn(res, xv);
    let body = f.b.stmts(vec![decl, inc, done]);
    f.b.proc_decl(bump, vec![], Some(result), body);

    let (result, _) = run(lower_ok(&f.finish()), "bump", Vec::new());
    assert_eq!(result, Ok(Value::Int(42)));
}

/// `next(): int = echo "next"; return 0`
fn next_index(f: &mut Fixture) -> SymbolId {
    let int = f.int;
    let next = f.routine("next", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let say = f.echo("next");
    let zero = f.b.int_lit(0);
    let ret = f.b.ret(Some(zero));
    let body = f.b.stmts(vec![say, ret]);
    f.b.proc_decl(next, vec![], Some(result), body);
    next
}

/// `var a: array[2, int]; a[0] = 5; a[1] = 6`
fn five_six(f: &mut Fixture) -> (SymbolId, Vec<Node>) {
    let int = f.int;
    let arr = f.b.array(int, 2);
    let a = f.b.var("a", arr);
    let decl = f.b.var_section(vec![(a, None)]);
    let mut stmts = vec![decl];
    for (i, v) in [(0, 5), (1, 6)] {
        let base = f.b.sym(a);
        let index = f.b.int_lit(i);
        let elem = f.b.index(base, index, int);
        let value = f.b.int_lit(v);
        stmts.push(f.b.asgn(elem, value));
    }
    (a, stmts)
}

#[test]
fn inc_evaluates_its_location_once() {
    // var a = [5, 6]; inc(a[next()]); result = a[0]
    let mut f = Fixture::new();
    let (void, int) = (f.void, f.int);
    let next = next_index(&mut f);
    let bump = f.routine("bump", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let (a, mut stmts) = five_six(&mut f);

    let base = f.b.sym(a);
    let at = f.b.call(next, vec![], int);
    let elem = f.b.index(base, at, int);
    stmts.push(f.magic(Magic::Inc, vec![elem], void));
    let base = f.b.sym(a);
    let zero = f.b.int_lit(0);
    let first = f.b.index(base, zero, int);
    let res = f.b.sym(result);
    stmts.push(f.b.asgn(res, first));
    let body = f.b.stmts(stmts);
    f.b.proc_decl(bump, vec![], Some(result), body);

    let (result, output) = run(lower_ok(&f.finish()), "bump", Vec::new());
    assert_eq!(result, Ok(Value::Int(6)));
    assert_eq!(output, "next\n");
}

#[test]
fn dec_by_a_step_evaluates_its_location_once() {
    let mut f = Fixture::new();
    let (void, int) = (f.void, f.int);
    let next = next_index(&mut f);
    let drop2 = f.routine("drop2", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let (a, mut stmts) = five_six(&mut f);

    let base = f.b.sym(a);
    let at = f.b.call(next, vec![], int);
    let elem = f.b.index(base, at, int);
    let step = f.b.int_lit(2);
    stmts.push(f.magic(Magic::Dec, vec![elem, step], void));
    let base = f.b.sym(a);
    let zero = f.b.int_lit(0);
    let first = f.b.index(base, zero, int);
    let res = f.b.sym(result);
    stmts.push(f.b.asgn(res, first));
    let body = f.b.stmts(stmts);
    f.b.proc_decl(drop2, vec![], Some(result), body);

    let (result, output) = run(lower_ok(&f.finish()), "drop2", Vec::new());
    assert_eq!(result, Ok(Value::Int(3)));
    assert_eq!(output, "next\n");
}

#[test]
fn swap_evaluates_each_location_once() {
    // var a = [5, 6]; var y = 9; swap(a[next()], y); result = a[0] * 10 + y
    let mut f = Fixture::new();
    let (void, int) = (f.void, f.int);
    let next = next_index(&mut f);
    let exchange = f.routine("exchange", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let (a, mut stmts) = five_six(&mut f);
    let y = f.b.var("y", int);
    let nine = f.b.int_lit(9);
    stmts.push(f.b.var_section(vec![(y, Some(nine))]));

    let base = f.b.sym(a);
    let at = f.b.call(next, vec![], int);
    let elem = f.b.index(base, at, int);
    let yv = f.b.sym(y);
    stmts.push(f.magic(Magic::Swap, vec![elem, yv], void));

    let base = f.b.sym(a);
    let zero = f.b.int_lit(0);
    let first = f.b.index(base, zero, int);
    let ten = f.b.int_lit(10);
    let scaled = f.magic(Magic::MulI, vec![first, ten], int);
    let yv = f.b.sym(y);
    let sum = f.magic(Magic::AddI, vec![scaled, yv], int);
    let res = f.b.sym(result);
    stmts.push(f.b.asgn(res, sum));
    let body = f.b.stmts(stmts);
    f.b.proc_decl(exchange, vec![], Some(result), body);

    let (result, output) = run(lower_ok(&f.finish()), "exchange", Vec::new());
    assert_eq!(result, Ok(Value::Int(95)));
    assert_eq!(output, "next\n");
}

#[test]
fn enum_to_string_evaluates_its_operand_once() {
    let mut f = Fixture::new();
    let string = f.string;
    let color = f.b.ty(TypeKind::Enum {
        name: "Color".to_string(),
        variants: vec!["red".to_string(), "green".to_string(), "blue".to_string()],
    });

    // pick(): Color = echo "pick"; return green
    let pick = f.routine("pick", &[], color, RaisesInfo::Never);
    let result = f.b.result_var(color);
    let say = f.echo("pick");
    let green = f.b.node(NodeKind::IntLit(1), color);
    let ret = f.b.ret(Some(green));
    let body = f.b.stmts(vec![say, ret]);
    f.b.proc_decl(pick, vec![], Some(result), body);

    returning(&mut f, "shown", string, |f| {
        let c = f.b.call(pick, vec![], color);
        f.magic(Magic::EnumToStr, vec![c], string)
    });

    // name(c: Color): string = $c
    let name = f.routine("name", &[color], string, RaisesInfo::Never);
    let c = f.b.param("c", color);
    let result = f.b.result_var(string);
    let cv = f.b.sym(c);
    let text = f.magic(Magic::EnumToStr, vec![cv], string);
    let target = f.b.sym(result);
    let body = f.b.asgn(target, text);
    f.b.proc_decl(name, vec![c], Some(result), body);

    let modules = lower_ok(&f.finish());
    let (result, output) = run(modules.clone(), "shown", Vec::new());
    assert_eq!(result, Ok(Value::Str("green".to_string())));
    assert_eq!(output, "pick\n");

    let (result, _) = run(modules.clone(), "name", vec![Value::Int(2)]);
    assert_eq!(result, Ok(Value::Str("blue".to_string())));
    // Out of range values print their ordinal.
    let (result, _) = run(modules, "name", vec![Value::Int(7)]);
    assert_eq!(result, Ok(Value::Str("7".to_string())));
}

// ═══════════════════════════════════════════════════════════
// Across modules
// ═══════════════════════════════════════════════════════════

#[test]
fn call_into_another_module() {
    let mut f = Fixture::new();
    let void = f.void;
    f.b.module("lib");
    let helper = f.routine("helper", &[], void, RaisesInfo::Never);
    let body = f.echo("helper");
    f.b.proc_decl(helper, vec![], None, body);

    f.b.module("main");
    let entry = f.routine("entry", &[], void, RaisesInfo::Never);
    let call = f.call0(helper);
    let done = f.echo("back");
    let body = f.b.stmts(vec![call, done]);
    f.b.proc_decl(entry, vec![], None, body);

    let (result, output) = run(lower_ok(&f.finish()), "entry", Vec::new());
    assert_eq!(result, Ok(Value::Void));
    assert_eq!(output, "helper\nback\n");
}
