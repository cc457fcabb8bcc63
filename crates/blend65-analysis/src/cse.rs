//! Block-local common subexpression elimination (analysis only).
//!
//! Maintains a map from expression fingerprint to the variable holding
//! the first occurrence. A later matching expression is marked a CSE
//! candidate with the holder recorded as its replacement. Assignment to
//! any variable in a fingerprint invalidates every entry mentioning it;
//! the map resets at every control-flow boundary. Deliberately
//! conservative.

use crate::framework::{AnalysisContext, Analyzer, Tier};
use blend65_parser::ast::{AssignOp, Block, Expr, ExprKind, Statement, UnaryOp};
use blend65_parser::{MetaKey, MetaValue};
use rustc_hash::{FxHashMap, FxHashSet};

/// A remembered first occurrence.
#[derive(Debug, Clone)]
struct Available {
    holder: String,
    /// Variables the fingerprint reads
    vars: FxHashSet<String>,
}

pub struct CseAnalysis;

impl CseAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn process_block(&self, block: &Block, ctx: &mut AnalysisContext) {
        let mut available: FxHashMap<String, Available> = FxHashMap::default();

        for stmt in &block.statements {
            match stmt {
                Statement::Let(var) => {
                    if let Some(init) = &var.init {
                        self.process_store(var.id, &var.name.name, init, &mut available, ctx);
                    }
                }

                Statement::Assign(assign) => {
                    if let (ExprKind::Identifier(name), AssignOp::Assign) =
                        (&assign.target.kind, assign.op)
                    {
                        let name = name.clone();
                        self.process_store(assign.id, &name, &assign.value, &mut available, ctx);
                    } else if let ExprKind::Identifier(name) = &assign.target.kind {
                        // Compound assignment: the target changes value
                        invalidate(&mut available, name);
                    } else {
                        // Unknown memory effects
                        available.clear();
                    }
                }

                // Control flow is a join boundary: nested blocks start
                // fresh, and nothing survives past them
                Statement::If(s) => {
                    self.process_block(&s.then_branch, ctx);
                    if let Some(else_branch) = &s.else_branch {
                        self.process_else(else_branch, ctx);
                    }
                    available.clear();
                }
                Statement::While(s) => {
                    self.process_block(&s.body, ctx);
                    available.clear();
                }
                Statement::For(s) => {
                    self.process_block(&s.body, ctx);
                    available.clear();
                }
                Statement::Block(b) => {
                    self.process_block(b, ctx);
                    available.clear();
                }

                Statement::Return(_)
                | Statement::Break(_)
                | Statement::Continue(_)
                | Statement::Expression(_) => {}
            }
        }
    }

    fn process_else(&self, stmt: &Statement, ctx: &mut AnalysisContext) {
        match stmt {
            Statement::Block(b) => self.process_block(b, ctx),
            Statement::If(s) => {
                self.process_block(&s.then_branch, ctx);
                if let Some(else_branch) = &s.else_branch {
                    self.process_else(else_branch, ctx);
                }
            }
            _ => {}
        }
    }

    /// `target = expr` (or `let target = expr`): match against the map,
    /// then update it.
    fn process_store(
        &self,
        stmt_node: blend65_parser::ast::NodeId,
        target: &str,
        expr: &Expr,
        available: &mut FxHashMap<String, Available>,
        ctx: &mut AnalysisContext,
    ) {
        let printed = fingerprint(expr);

        if let Some(fp) = &printed {
            if let Some(entry) = available.get(fp) {
                ctx.metadata
                    .set(stmt_node, MetaKey::CSECandidate, MetaValue::Bool(true));
                ctx.metadata
                    .set(stmt_node, MetaKey::CSEAvailable, MetaValue::Str(fp.clone()));
                ctx.metadata.set(
                    stmt_node,
                    MetaKey::GVNReplacement,
                    MetaValue::Str(entry.holder.clone()),
                );
                // The target's old value still dies
                invalidate(available, target);
                return;
            }
        }

        // The target's old value dies: drop entries reading or held by it
        invalidate(available, target);

        if let Some(fp) = printed {
            let vars = read_vars(expr);
            // Self-referential stores (x = x + 1) are never available
            if !vars.contains(target) {
                available.insert(
                    fp,
                    Available {
                        holder: target.to_string(),
                        vars,
                    },
                );
            }
        }
    }
}

/// Drop entries that read `name` or are held by `name`.
fn invalidate(available: &mut FxHashMap<String, Available>, name: &str) {
    available.retain(|_, entry| entry.holder != name && !entry.vars.contains(name));
}

/// Canonical text of a pure expression (`a + b`), `None` when the
/// expression is not eligible (calls, memory access, strings).
fn fingerprint(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Number(n) => Some(n.to_string()),
        ExprKind::Bool(b) => Some(b.to_string()),
        ExprKind::Identifier(name) => Some(name.clone()),
        ExprKind::Binary { op, lhs, rhs } => Some(format!(
            "{} {} {}",
            fingerprint(lhs)?,
            op,
            fingerprint(rhs)?
        )),
        ExprKind::Unary { op, operand } => {
            if matches!(op, UnaryOp::Deref | UnaryOp::AddressOf) {
                None
            } else {
                Some(format!("{}{}", op, fingerprint(operand)?))
            }
        }
        ExprKind::Cast { expr: inner, .. } => Some(format!("cast({})", fingerprint(inner)?)),
        ExprKind::Str(_)
        | ExprKind::Call { .. }
        | ExprKind::Index { .. }
        | ExprKind::Member { .. }
        | ExprKind::Ternary { .. } => None,
    }
}

/// Identifier names a fingerprinted expression reads.
fn read_vars(expr: &Expr) -> FxHashSet<String> {
    let mut vars = FxHashSet::default();
    blend65_parser::ast::visitor::walk_expr(expr, &mut |e| {
        if let ExprKind::Identifier(name) = &e.kind {
            vars.insert(name.clone());
        }
    });
    vars
}

impl Analyzer for CseAnalysis {
    fn name(&self) -> &'static str {
        "cse"
    }

    fn tier(&self) -> Tier {
        Tier::Advanced
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;
        for func in program.functions() {
            self.process_block(&func.body, ctx);
        }
    }
}
