// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Fall-through analysis.
//!
//! A node falls through when control can reach the point right after it.
//! Branches that cannot fall through are lowered without writing the
//! shared destination and without the jump to the join label.

use kiln_ast::{ConstValue, Magic, Node, NodeKind, Program, SymKind, SymbolId};

pub fn falls_through(program: &Program, node: &Node) -> bool {
    match &node.kind {
        NodeKind::Return(_) | NodeKind::Raise(_) | NodeKind::Break(_) => false,
        NodeKind::Call { callee, args } => {
            args.iter().all(|a| falls_through(program, a)) && !is_noreturn_callee(program, callee)
        }
        NodeKind::Stmts(items) => items.iter().all(|n| falls_through(program, n)),
        NodeKind::Asgn { value, .. } => falls_through(program, value),
        NodeKind::Discard(Some(value)) => falls_through(program, value),
        NodeKind::Block { label, body } => {
            falls_through(program, body) || breaks_to(body, *label, false)
        }
        NodeKind::If(branches) => {
            let has_else = branches.iter().any(|b| b.cond.is_none());
            !has_else || branches.iter().any(|b| falls_through(program, &b.body))
        }
        NodeKind::Case { branches, .. } => {
            let has_else = branches.iter().any(|b| b.is_else());
            !has_else || branches.iter().any(|b| falls_through(program, &b.body))
        }
        NodeKind::While { cond, body } => !is_const_true(program, cond) || breaks_to(body, None, false),
        NodeKind::Try {
            body,
            handlers,
            finally,
        } => {
            if let Some(f) = finally {
                if !falls_through(program, f) {
                    return false;
                }
            }
            falls_through(program, body) || handlers.iter().any(|h| falls_through(program, &h.body))
        }
        _ => true,
    }
}

/// `true` spelled as a literal or as a constant; loops on it never exit
/// through their condition.
pub fn is_const_true(program: &Program, n: &Node) -> bool {
    match &n.kind {
        NodeKind::BoolLit(b) => *b,
        NodeKind::Sym(id) => program
            .symbol(*id)
            .is_some_and(|s| s.kind == SymKind::Const && s.value == Some(ConstValue::Bool(true))),
        _ => false,
    }
}

fn is_noreturn_callee(program: &Program, callee: &Node) -> bool {
    match &callee.kind {
        NodeKind::Builtin(Magic::Quit) => true,
        NodeKind::Sym(id) => program
            .symbol(*id)
            .is_some_and(|s| s.flags.noreturn || s.magic == Some(Magic::Quit)),
        _ => false,
    }
}

/// Does `node` contain a `break` that leaves the enclosing block `label`
/// (or, for `None`, the innermost block or loop)?
fn breaks_to(node: &Node, label: Option<SymbolId>, nested: bool) -> bool {
    match &node.kind {
        NodeKind::Break(None) => !nested,
        NodeKind::Break(Some(target)) => Some(*target) == label || (!nested && label.is_none()),
        NodeKind::While { cond, body } => {
            breaks_to(cond, label, nested) || breaks_to(body, label, true)
        }
        NodeKind::Block { body, .. } => breaks_to(body, label, true),
        _ => node
            .children()
            .into_iter()
            .any(|c| breaks_to(c, label, nested)),
    }
}
