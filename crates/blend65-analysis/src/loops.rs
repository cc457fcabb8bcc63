//! Loop analysis: nesting depth and loop-invariant expressions.
//!
//! An expression is invariant with respect to a loop when it is a
//! literal, a read of a variable the body never writes, or a pure
//! operator applied to invariant subexpressions. Calls and memory
//! accesses are conservatively variant.

use crate::framework::{AnalysisContext, Analyzer, Tier};
use blend65_checker::{Bindings, CheckResult, SymbolId, SymbolKind};
use blend65_parser::ast::visitor::walk_stmts;
use blend65_parser::ast::{Block, Expr, ExprKind, Statement, UnaryOp};
use blend65_parser::{MetaKey, MetaValue};
use rustc_hash::FxHashSet;

pub struct LoopAnalysis;

impl LoopAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn analyze_loop(
        &self,
        loop_id: blend65_parser::ast::NodeId,
        body: &Block,
        depth: u32,
        ctx: &mut AnalysisContext,
    ) {
        let bindings = ctx.bindings;
        let types = ctx.types;

        ctx.metadata
            .set(loop_id, MetaKey::LoopDepth, MetaValue::Int(depth as i64));

        // Symbols the body writes (assignments and declarations)
        let mut written: FxHashSet<SymbolId> = FxHashSet::default();
        walk_stmts(body, &mut |stmt: &Statement| match stmt {
            Statement::Assign(assign) => {
                if let ExprKind::Identifier(_) = &assign.target.kind {
                    if let Some(id) = types.use_of(assign.target.id) {
                        written.insert(id);
                    }
                }
            }
            Statement::Let(var) => {
                if let Some(id) = bindings.symbol_of(var.id) {
                    written.insert(id);
                }
            }
            Statement::For(s) => {
                if let Some(id) = bindings.symbol_of(s.id) {
                    written.insert(id);
                }
            }
            _ => {}
        });

        // Mark invariant statement-level expressions
        walk_stmts(body, &mut |stmt: &Statement| {
            let mut mark = |expr: &Expr| {
                if is_invariant(expr, &written, bindings, types) {
                    ctx.metadata
                        .set(expr.id, MetaKey::LoopInvariant, MetaValue::Bool(true));
                }
            };
            match stmt {
                Statement::Let(var) => {
                    if let Some(init) = &var.init {
                        mark(init);
                    }
                }
                Statement::Assign(assign) => mark(&assign.value),
                Statement::If(s) => mark(&s.condition),
                Statement::While(s) => mark(&s.condition),
                Statement::Return(r) => {
                    if let Some(value) = &r.value {
                        mark(value);
                    }
                }
                Statement::Expression(e) => mark(&e.expr),
                _ => {}
            }
        });
    }
}

/// Invariance test per the rules above.
fn is_invariant(
    expr: &Expr,
    written: &FxHashSet<SymbolId>,
    bindings: &Bindings,
    types: &CheckResult,
) -> bool {
    match &expr.kind {
        ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Str(_) => true,

        ExprKind::Identifier(_) => match types.use_of(expr.id) {
            Some(symbol_id) => {
                let symbol = bindings.table.symbol(symbol_id);
                let readonly_kind = matches!(
                    symbol.kind,
                    SymbolKind::Constant | SymbolKind::EnumMember
                );
                readonly_kind || !written.contains(&symbol_id)
            }
            None => false,
        },

        ExprKind::Binary { lhs, rhs, .. } => {
            is_invariant(lhs, written, bindings, types)
                && is_invariant(rhs, written, bindings, types)
        }

        ExprKind::Unary { op, operand } => {
            // Dereferences read memory the loop may be writing
            *op != UnaryOp::Deref && is_invariant(operand, written, bindings, types)
        }

        ExprKind::Cast { expr: inner, .. } => is_invariant(inner, written, bindings, types),

        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            is_invariant(cond, written, bindings, types)
                && is_invariant(then_expr, written, bindings, types)
                && is_invariant(else_expr, written, bindings, types)
        }

        ExprKind::Member { .. } => types
            .use_of(expr.id)
            .map(|id| bindings.table.symbol(id).kind == SymbolKind::EnumMember)
            .unwrap_or(false),

        // Calls and memory accesses are never invariant
        ExprKind::Call { .. } | ExprKind::Index { .. } => false,
    }
}

impl Analyzer for LoopAnalysis {
    fn name(&self) -> &'static str {
        "loop-analysis"
    }

    fn tier(&self) -> Tier {
        Tier::Interprocedural
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;
        for func in program.functions() {
            // Collect loops with their nesting depth, then analyze each
            let mut loops: Vec<(blend65_parser::ast::NodeId, &Block)> = Vec::new();
            for stmt in &func.body.statements {
                collect_loops(stmt, &mut loops);
            }
            for (loop_id, body) in loops {
                let depth = ctx
                    .bindings
                    .scope_of(loop_id)
                    .map(|s| ctx.bindings.table.loop_depth_at(s))
                    .unwrap_or(1);
                self.analyze_loop(loop_id, body, depth, ctx);
            }
        }
    }
}

fn collect_loops<'a>(
    stmt: &'a Statement,
    out: &mut Vec<(blend65_parser::ast::NodeId, &'a Block)>,
) {
    match stmt {
        Statement::While(s) => {
            out.push((s.id, &s.body));
            for inner in &s.body.statements {
                collect_loops(inner, out);
            }
        }
        Statement::For(s) => {
            out.push((s.id, &s.body));
            for inner in &s.body.statements {
                collect_loops(inner, out);
            }
        }
        Statement::If(s) => {
            for inner in &s.then_branch.statements {
                collect_loops(inner, out);
            }
            if let Some(else_branch) = &s.else_branch {
                collect_loops(else_branch, out);
            }
        }
        Statement::Block(b) => {
            for inner in &b.statements {
                collect_loops(inner, out);
            }
        }
        _ => {}
    }
}
