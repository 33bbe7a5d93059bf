// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end shape of the core control-flow constructs.

mod common;

use common::{code, count, lower_ok, module, proc_named, run, Fixture};
use kiln_ast::{CaseItem, Magic, RaisesInfo};
use kiln_interp::Value;
use kiln_ir::{
    ArmPattern, BinOp, CallKind, Instr, IrType, LabelId, Literal, Operand, Place, Rvalue, SelectValue, SymRef, UnOp,
};

fn is_binary(i: &Instr, op: BinOp) -> bool {
    matches!(i, Instr::Asgn { src: Rvalue::Binary { op: o, .. }, .. } if *o == op)
}

fn gotos_to(body: &[&Instr], target: LabelId) -> usize {
    body.iter().filter(|i| ***i == Instr::Goto(target)).count()
}

// ═══════════════════════════════════════════════════════════
// while i < 10: i = i + 1
// ═══════════════════════════════════════════════════════════

#[test]
fn while_loop_layout() {
    let mut f = Fixture::new();
    let (int, boolean) = (f.int, f.boolean);
    let count_up = f.routine("countUp", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let i = f.b.var("i", int);

    let zero = f.b.int_lit(0);
    let decl = f.b.var_section(vec![(i, Some(zero))]);
    let iv = f.b.sym(i);
    let ten = f.b.int_lit(10);
    let cond = f.magic(Magic::LtI, vec![iv, ten], boolean);
    let iv = f.b.sym(i);
    let one = f.b.int_lit(1);
    let sum = f.magic(Magic::AddI, vec![iv, one], int);
    let target = f.b.sym(i);
    let step = f.b.asgn(target, sum);
    let lp = f.b.while_(cond, step);
    let res = f.b.sym(result);
    let iv = f.b.sym(i);
    let done = f.b.asgn(res, iv);
    let body = f.b.stmts(vec![decl, lp, done]);
    f.b.proc_decl(count_up, vec![], Some(result), body);

    let modules = lower_ok(&f.finish());
    let p = proc_named(&modules, "main", "countUp");
    assert_eq!(count(p, |i| is_binary(i, BinOp::Lt)), 1);
    assert_eq!(count(p, |i| is_binary(i, BinOp::Add)), 1);

    let code = code(p);
    let head = code
        .iter()
        .position(|i| matches!(i, Instr::LoopLabel(_)))
        .expect("loop head");
    let Instr::LoopLabel(head_label) = code[head] else { unreachable!() };
    let Instr::Asgn { dst: Place::Slot(flag), .. } = code[head + 1] else {
        panic!("expected the compare, got {}", code[head + 1]);
    };
    assert!(is_binary(code[head + 1], BinOp::Lt));
    let exit = match code[head + 2] {
        Instr::Select { value, arms, .. } => {
            assert_eq!(value, &Operand::Slot(*flag));
            assert_eq!(arms.len(), 1);
            assert_eq!(arms[0].pattern, ArmPattern::Values(vec![SelectValue::Value(Literal::Bool(false))]));
            arms[0].target
        }
        other => panic!("expected the conditional exit, got {}", other),
    };
    assert!(is_binary(code[head + 3], BinOp::Add));
    assert_eq!(code[head + 4], &Instr::GotoLoop(*head_label));
    assert_eq!(code[head + 5], &Instr::Label(exit));

    let (result, _) = run(modules, "countUp", Vec::new());
    assert_eq!(result, Ok(Value::Int(10)));
}

// ═══════════════════════════════════════════════════════════
// if x: a() elif y: b() else: c()
// ═══════════════════════════════════════════════════════════

#[test]
fn if_elif_else_layout() {
    let mut f = Fixture::new();
    let (void, boolean) = (f.void, f.boolean);
    let [a, b, c] = ["a", "b", "c"].map(|n| f.routine(n, &[], void, RaisesInfo::Never));
    let choose = f.routine("choose", &[boolean, boolean], void, RaisesInfo::Never);
    let x = f.b.param("x", boolean);
    let y = f.b.param("y", boolean);

    let xv = f.b.sym(x);
    let yv = f.b.sym(y);
    let call_a = f.call0(a);
    let call_b = f.call0(b);
    let call_c = f.call0(c);
    let body = f.b.if_(vec![(Some(xv), call_a), (Some(yv), call_b), (None, call_c)], void);
    f.b.proc_decl(choose, vec![x, y], None, body);

    let modules = lower_ok(&f.finish());
    let p = proc_named(&modules, "main", "choose");
    let code = code(p);

    let selects: Vec<LabelId> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Select { arms, .. } => {
                assert_eq!(arms.len(), 1);
                Some(arms[0].target)
            }
            _ => None,
        })
        .collect();
    assert_eq!(selects.len(), 2);
    assert_eq!(count(p, |i| matches!(i, Instr::Call(_))), 3);

    let gotos: Vec<LabelId> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Goto(l) => Some(*l),
            _ => None,
        })
        .collect();
    assert_eq!(gotos.len(), 2);
    let end = gotos[0];
    assert_eq!(gotos[1], end);
    assert!(!selects.contains(&end));
    assert_ne!(selects[0], selects[1]);

    // Two intermediate labels, the shared end, and the routine's exit.
    assert_eq!(count(p, |i| matches!(i, Instr::Label(_))), 4);
    for l in selects.iter().chain([&end]) {
        assert_eq!(count(p, |i| *i == Instr::Label(*l)), 1);
    }
}

// ═══════════════════════════════════════════════════════════
// if not x: echo "no"    and    while not done: ...
// ═══════════════════════════════════════════════════════════

fn is_not(i: &Instr) -> bool {
    matches!(i, Instr::Asgn { src: Rvalue::Unary { op: UnOp::Not, .. }, .. })
}

/// The single conditional branch of `code`: its tested value, the value
/// that takes the jump, and the target.
fn only_branch(code: &[&Instr]) -> (Operand, bool, LabelId) {
    let branches: Vec<_> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Select { value, arms, .. } => Some((value, arms)),
            _ => None,
        })
        .collect();
    assert_eq!(branches.len(), 1);
    let (value, arms) = branches[0];
    assert_eq!(arms.len(), 1);
    let ArmPattern::Values(values) = &arms[0].pattern else {
        panic!("expected a value arm");
    };
    let [SelectValue::Value(Literal::Bool(when))] = values.as_slice() else {
        panic!("expected a bool arm, got {:?}", values);
    };
    (value.clone(), *when, arms[0].target)
}

#[test]
fn if_not_inverts_the_branch() {
    let mut f = Fixture::new();
    let (void, boolean) = (f.void, f.boolean);
    let guard = f.routine("guard", &[boolean], void, RaisesInfo::Never);
    let x = f.b.param("x", boolean);

    let xv = f.b.sym(x);
    let cond = f.b.not(xv);
    let say = f.echo("no");
    let body = f.b.if_(vec![(Some(cond), say)], void);
    f.b.proc_decl(guard, vec![x], None, body);

    let modules = lower_ok(&f.finish());
    let p = proc_named(&modules, "main", "guard");
    assert_eq!(count(p, is_not), 0);

    let code = code(p);
    let (value, when, skip) = only_branch(&code);
    assert!(matches!(value, Operand::Slot(_)));
    // The branch skips the body when `x` is true.
    assert!(when);
    let call = code.iter().position(|i| matches!(i, Instr::Call(_))).expect("echo");
    let skip_at = code.iter().position(|i| **i == Instr::Label(skip)).expect("skip label");
    assert!(call < skip_at);

    let (_, output) = run(modules.clone(), "guard", vec![Value::Bool(false)]);
    assert_eq!(output, "no\n");
    let (_, output) = run(modules, "guard", vec![Value::Bool(true)]);
    assert_eq!(output, "");
}

#[test]
fn while_not_inverts_the_exit() {
    // var done = false; var n = 0
    // while not done: n = n + 1; done = 3 <= n
    let mut f = Fixture::new();
    let (int, boolean) = (f.int, f.boolean);
    let wait = f.routine("wait", &[], int, RaisesInfo::Never);
    let result = f.b.result_var(int);
    let done = f.b.var("done", boolean);
    let n = f.b.var("n", int);

    let no = f.b.bool_lit(false);
    let zero = f.b.int_lit(0);
    let decl = f.b.var_section(vec![(done, Some(no)), (n, Some(zero))]);
    let dv = f.b.sym(done);
    let cond = f.b.not(dv);
    let nv = f.b.sym(n);
    let one = f.b.int_lit(1);
    let sum = f.magic(Magic::AddI, vec![nv, one], int);
    let target = f.b.sym(n);
    let step = f.b.asgn(target, sum);
    let three = f.b.int_lit(3);
    let nv = f.b.sym(n);
    let reached = f.magic(Magic::LeI, vec![three, nv], boolean);
    let target = f.b.sym(done);
    let check = f.b.asgn(target, reached);
    let loop_body = f.b.stmts(vec![step, check]);
    let lp = f.b.while_(cond, loop_body);
    let res = f.b.sym(result);
    let nv = f.b.sym(n);
    let finish = f.b.asgn(res, nv);
    let body = f.b.stmts(vec![decl, lp, finish]);
    f.b.proc_decl(wait, vec![], Some(result), body);

    let modules = lower_ok(&f.finish());
    let p = proc_named(&modules, "main", "wait");
    assert_eq!(count(p, is_not), 0);

    let code = code(p);
    let head = code
        .iter()
        .position(|i| matches!(i, Instr::LoopLabel(_)))
        .expect("loop head");
    let (value, when, exit) = only_branch(&code);
    // The flag is tested directly and the loop exits when it is true.
    assert!(matches!(code[head + 1], Instr::Select { .. }));
    assert!(matches!(value, Operand::Slot(_)));
    assert!(when);
    let back = code.iter().position(|i| matches!(i, Instr::GotoLoop(_))).expect("back edge");
    assert_eq!(code[back + 1], &Instr::Label(exit));

    let (result, _) = run(modules, "wait", Vec::new());
    assert_eq!(result, Ok(Value::Int(3)));
}

// ═══════════════════════════════════════════════════════════
// case n of 1, 2: a() of 3..5: b() else: c()
// ═══════════════════════════════════════════════════════════

#[test]
fn case_layout() {
    let mut f = Fixture::new();
    let (void, int) = (f.void, f.int);
    let [a, b, c] = ["a", "b", "c"].map(|n| f.routine(n, &[], void, RaisesInfo::Never));
    let dispatch = f.routine("dispatch", &[int], void, RaisesInfo::Never);
    let n = f.b.param("n", int);

    let scrutinee = f.b.sym(n);
    let one = f.b.int_lit(1);
    let two = f.b.int_lit(2);
    let three = f.b.int_lit(3);
    let five = f.b.int_lit(5);
    let call_a = f.call0(a);
    let call_b = f.call0(b);
    let call_c = f.call0(c);
    let body = f.b.case(
        scrutinee,
        vec![
            (vec![CaseItem::Value(one), CaseItem::Value(two)], call_a),
            (vec![CaseItem::Range(three, five)], call_b),
            (vec![], call_c),
        ],
        void,
    );
    f.b.proc_decl(dispatch, vec![n], None, body);

    let modules = lower_ok(&f.finish());
    let p = proc_named(&modules, "main", "dispatch");
    let code = code(p);

    assert_eq!(count(p, |i| matches!(i, Instr::Select { .. })), 1);
    let arms = code
        .iter()
        .find_map(|i| match i {
            Instr::Select { arms, .. } => Some(arms),
            _ => None,
        })
        .expect("select");
    assert_eq!(arms.len(), 3);
    match &arms[0].pattern {
        ArmPattern::Values(values) => {
            assert_eq!(values.len(), 2);
            assert!(values.iter().all(|v| matches!(v, SelectValue::Value(_))));
        }
        other => panic!("expected discrete values, got {:?}", other),
    }
    match &arms[1].pattern {
        ArmPattern::Values(values) => assert!(matches!(values.as_slice(), [SelectValue::Range(..)])),
        other => panic!("expected a range, got {:?}", other),
    }
    assert_eq!(arms[2].pattern, ArmPattern::Else);

    let sections: Vec<LabelId> = arms.iter().map(|a| a.target).collect();
    assert_ne!(sections[0], sections[1]);
    assert_ne!(sections[1], sections[2]);
    assert_ne!(sections[0], sections[2]);

    // Every section but the last jumps to the one shared end.
    let gotos: Vec<LabelId> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Goto(l) => Some(*l),
            _ => None,
        })
        .collect();
    assert_eq!(gotos.len(), 2);
    let end = gotos[0];
    assert_eq!(gotos_to(&code, end), 2);
    let end_at = code.iter().position(|i| **i == Instr::Label(end)).expect("end label");
    let last_at = code
        .iter()
        .position(|i| **i == Instr::Label(sections[2]))
        .expect("last section");
    assert!(last_at < end_at);
    assert!(code[last_at..end_at].iter().all(|i| !i.is_jump()));
}

// ═══════════════════════════════════════════════════════════
// try: risky() except ValueKind: handle() finally: cleanup()
// ═══════════════════════════════════════════════════════════

struct TryProgram {
    program: kiln_ast::Program,
    risky: kiln_ast::SymbolId,
    handle: kiln_ast::SymbolId,
    cleanup: kiln_ast::SymbolId,
}

fn try_program() -> TryProgram {
    let mut f = Fixture::new();
    let void = f.void;
    let value_kind = f.b.exception("ValueKind");
    let risky = f.routine("risky", &[], void, RaisesInfo::May);
    let calm = f.routine("calm", &[], void, RaisesInfo::May);
    let handle = f.routine("handle", &[], void, RaisesInfo::Never);
    let cleanup = f.routine("cleanup", &[], void, RaisesInfo::Never);

    let exc = f.b.obj_constr(value_kind, vec![]);
    let body = f.b.raise(Some(exc));
    f.b.proc_decl(risky, vec![], None, body);
    let body = f.b.empty();
    f.b.proc_decl(calm, vec![], None, body);
    let body = f.echo("handled");
    f.b.proc_decl(handle, vec![], None, body);
    let body = f.echo("cleanup");
    f.b.proc_decl(cleanup, vec![], None, body);

    for (name, callee) in [("guarded", risky), ("quiet", calm)] {
        let sym = f.routine(name, &[], void, RaisesInfo::Never);
        let body = f.call0(callee);
        let on_error = f.call0(handle);
        let fin = f.call0(cleanup);
        let t = f.b.try_(body, vec![(vec![value_kind], on_error)], Some(fin), void);
        f.b.proc_decl(sym, vec![], None, t);
    }

    TryProgram {
        program: f.finish(),
        risky,
        handle,
        cleanup,
    }
}

#[test]
fn try_except_finally_layout() {
    let t = try_program();
    let modules = lower_ok(&t.program);
    let m = module(&modules, "main");
    let p = proc_named(&modules, "main", "guarded");
    let code = code(p);
    let calls_to = |sym| {
        code.iter()
            .filter_map(|i| i.call())
            .filter(|c| c.callee == Operand::Sym(SymRef::Local(sym)))
            .collect::<Vec<_>>()
    };

    let risky = calls_to(t.risky);
    assert_eq!(risky.len(), 1);
    assert_eq!(risky[0].kind, CallKind::CheckedDirect);
    let entry = risky[0].exit.expect("checked call has an exit");

    // The handler entry tests for ValueKind exactly once, then runs handle().
    assert_eq!(count(p, |i| matches!(i, Instr::TestExc { .. })), 1);
    let at = code.iter().position(|i| **i == Instr::Label(entry)).expect("entry label");
    match code[at + 1] {
        Instr::TestExc { ty: Some(ty), .. } => assert_eq!(
            m.types.get(*ty),
            &IrType::Object {
                name: "ValueKind".to_string(),
                fields: Vec::new(),
            }
        ),
        other => panic!("expected a type test, got {}", other),
    }
    let handled = code[at + 2].call().expect("handler call");
    assert_eq!(handled.callee, Operand::Sym(SymRef::Local(t.handle)));

    // cleanup() is emitted once; normal completion and the handler both
    // jump to the label right in front of it.
    assert_eq!(calls_to(t.cleanup).len(), 1);
    let cleanup_at = code
        .iter()
        .position(|i| i.call().is_some_and(|c| c.callee == Operand::Sym(SymRef::Local(t.cleanup))))
        .expect("cleanup call");
    let Instr::Label(fin) = code[cleanup_at - 1] else {
        panic!("expected the finally label, got {}", code[cleanup_at - 1]);
    };
    assert_eq!(gotos_to(&code, *fin), 2);
    let goto_sites: Vec<usize> = code
        .iter()
        .enumerate()
        .filter(|(_, i)| ***i == Instr::Goto(*fin))
        .map(|(n, _)| n)
        .collect();
    assert!(goto_sites[0] < at && at < goto_sites[1]);
}

#[test]
fn try_except_finally_runs_each_path_once() {
    let t = try_program();
    let modules = lower_ok(&t.program);

    let (result, output) = run(modules.clone(), "guarded", Vec::new());
    assert_eq!(result, Ok(Value::Void));
    assert_eq!(output, "handled\ncleanup\n");

    let (result, output) = run(modules, "quiet", Vec::new());
    assert_eq!(result, Ok(Value::Void));
    assert_eq!(output, "cleanup\n");
}
