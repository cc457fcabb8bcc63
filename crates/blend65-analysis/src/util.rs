//! Shared helpers for statement-level def/use extraction.

use blend65_checker::{CheckResult, SymbolId};
use blend65_parser::ast::visitor::walk_expr;
use blend65_parser::ast::{Expr, ExprKind, NodeId, Statement};
use blend65_parser::Span;

/// Symbol written by a statement, if it writes a plain variable:
/// `let x = ...` (with initializer) or `x = ...` / `x op= ...`.
pub fn written_symbol(
    stmt: &Statement,
    types: &CheckResult,
    symbol_of_decl: impl Fn(NodeId) -> Option<SymbolId>,
) -> Option<SymbolId> {
    match stmt {
        Statement::Let(var) if var.init.is_some() => symbol_of_decl(var.id),
        Statement::Assign(assign) => match &assign.target.kind {
            ExprKind::Identifier(_) => types.use_of(assign.target.id),
            _ => None,
        },
        Statement::For(s) => symbol_of_decl(s.id),
        _ => None,
    }
}

/// Every identifier read by a statement: `(expr node, symbol, span)`.
///
/// The target of a plain `=` assignment is a write, not a read; compound
/// assignment reads it first.
pub fn read_symbols(stmt: &Statement, types: &CheckResult) -> Vec<(NodeId, SymbolId, Span)> {
    let mut reads = Vec::new();
    let mut collect = |expr: &Expr| {
        collect_reads(expr, types, &mut reads);
    };

    match stmt {
        Statement::Let(var) => {
            if let Some(init) = &var.init {
                collect(init);
            }
        }
        Statement::Assign(assign) => {
            let plain_target_ident = matches!(assign.target.kind, ExprKind::Identifier(_))
                && assign.op == blend65_parser::ast::AssignOp::Assign;
            if !plain_target_ident {
                collect(&assign.target);
            }
            collect(&assign.value);
        }
        Statement::If(s) => collect(&s.condition),
        Statement::While(s) => collect(&s.condition),
        Statement::For(s) => {
            collect(&s.from);
            collect(&s.to);
        }
        Statement::Return(r) => {
            if let Some(value) = &r.value {
                collect(value);
            }
        }
        Statement::Expression(e) => collect(&e.expr),
        Statement::Break(_) | Statement::Continue(_) | Statement::Block(_) => {}
    }

    reads
}

fn collect_reads(expr: &Expr, types: &CheckResult, reads: &mut Vec<(NodeId, SymbolId, Span)>) {
    walk_expr(expr, &mut |e| {
        if let ExprKind::Identifier(_) = &e.kind {
            if let Some(symbol) = types.use_of(e.id) {
                reads.push((e.id, symbol, e.location));
            }
        }
    });
}

/// True when any subexpression is a call.
pub fn contains_call(expr: &Expr) -> bool {
    let mut found = false;
    walk_expr(expr, &mut |e| {
        if matches!(e.kind, ExprKind::Call { .. }) {
            found = true;
        }
    });
    found
}

/// True when any subexpression is an array index or pointer dereference.
pub fn contains_memory_access(expr: &Expr) -> bool {
    let mut found = false;
    walk_expr(expr, &mut |e| match &e.kind {
        ExprKind::Index { .. } => found = true,
        ExprKind::Unary { op, .. } if *op == blend65_parser::ast::UnaryOp::Deref => found = true,
        _ => {}
    });
    found
}
