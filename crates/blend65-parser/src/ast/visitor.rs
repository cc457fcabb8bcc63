//! Lightweight AST walkers.
//!
//! Passes that only need to see every statement or expression use these
//! instead of writing their own recursion. The callbacks receive
//! references with the tree's lifetime, so callers may retain them.

use super::{Block, Declaration, Expr, ExprKind, Program, Statement};

/// Call `f` on every expression in the program, in source order,
/// visiting subexpressions after their parent.
pub fn walk_exprs<'a>(program: &'a Program, f: &mut impl FnMut(&'a Expr)) {
    for decl in &program.declarations {
        match decl {
            Declaration::Variable(v) => {
                if let Some(init) = &v.init {
                    walk_expr(init, f);
                }
            }
            Declaration::Constant(c) => walk_expr(&c.value, f),
            Declaration::Function(func) => walk_block_exprs(&func.body, f),
            Declaration::Enum(e) => {
                for member in &e.members {
                    if let Some(value) = &member.value {
                        walk_expr(value, f);
                    }
                }
            }
            Declaration::Import(_) | Declaration::MemoryMap(_) => {}
        }
    }
}

/// Call `f` on every statement in a block, recursing into nested blocks.
pub fn walk_stmts<'a>(block: &'a Block, f: &mut impl FnMut(&'a Statement)) {
    for stmt in &block.statements {
        walk_stmt(stmt, f);
    }
}

/// Call `f` on `stmt` and every statement nested inside it.
pub fn walk_stmt<'a>(stmt: &'a Statement, f: &mut impl FnMut(&'a Statement)) {
    f(stmt);
    match stmt {
        Statement::If(s) => {
            walk_stmts(&s.then_branch, f);
            if let Some(else_branch) = &s.else_branch {
                walk_stmt(else_branch, f);
            }
        }
        Statement::While(s) => walk_stmts(&s.body, f),
        Statement::For(s) => walk_stmts(&s.body, f),
        Statement::Block(b) => walk_stmts(b, f),
        _ => {}
    }
}

/// Call `f` on `expr` and every subexpression.
pub fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, f);
            walk_expr(rhs, f);
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, f),
        ExprKind::Call { callee, args } => {
            walk_expr(callee, f);
            for arg in args {
                walk_expr(arg, f);
            }
        }
        ExprKind::Index { base, index } => {
            walk_expr(base, f);
            walk_expr(index, f);
        }
        ExprKind::Member { base, .. } => walk_expr(base, f),
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            walk_expr(cond, f);
            walk_expr(then_expr, f);
            walk_expr(else_expr, f);
        }
        ExprKind::Cast { expr: inner, .. } => walk_expr(inner, f),
        ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Str(_) | ExprKind::Identifier(_) => {}
    }
}

/// Every expression appearing in a block, including those nested in
/// control-flow statements.
pub fn walk_block_exprs<'a>(block: &'a Block, f: &mut impl FnMut(&'a Expr)) {
    walk_stmts(block, &mut |stmt| match stmt {
        Statement::Let(v) => {
            if let Some(init) = &v.init {
                walk_expr(init, f);
            }
        }
        Statement::Assign(a) => {
            walk_expr(&a.target, f);
            walk_expr(&a.value, f);
        }
        Statement::If(s) => walk_expr(&s.condition, f),
        Statement::While(s) => walk_expr(&s.condition, f),
        Statement::For(s) => {
            walk_expr(&s.from, f);
            walk_expr(&s.to, f);
        }
        Statement::Return(r) => {
            if let Some(value) = &r.value {
                walk_expr(value, f);
            }
        }
        Statement::Expression(e) => walk_expr(&e.expr, f),
        Statement::Break(_) | Statement::Continue(_) | Statement::Block(_) => {}
    });
}
