//! Expression complexity scoring for the 6502 target.
//!
//! Every expression gets a tree depth, a cost score, an estimated
//! register pressure clamped to the three CPU registers (A/X/Y), and a
//! flag for memory accesses. Word-typed operations cost double: the CPU
//! works a byte at a time.

use crate::framework::{AnalysisContext, Analyzer, Tier};
use blend65_checker::CheckResult;
use blend65_parser::ast::visitor::walk_block_exprs;
use blend65_parser::ast::{Expr, ExprKind, UnaryOp};
use blend65_parser::{MetaKey, MetaValue, MetadataStore};
use blend65_types::Type;

/// Computed facts for one expression node.
#[derive(Debug, Clone, Copy)]
struct Score {
    depth: u32,
    cost: u32,
    pressure: u32,
    memory: bool,
}

pub struct ExprComplexityAnalysis;

impl ExprComplexityAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn score(
        &self,
        expr: &Expr,
        types: &CheckResult,
        metadata: &mut MetadataStore,
    ) -> Score {
        let word_sized = matches!(types.type_of(expr.id), Some(Type::Word));
        let op_cost = if word_sized { 2 } else { 1 };

        let score = match &expr.kind {
            ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Str(_) => Score {
                depth: 1,
                cost: 1,
                pressure: 1,
                memory: false,
            },

            ExprKind::Identifier(_) | ExprKind::Member { .. } => Score {
                depth: 1,
                cost: 2,
                pressure: 1,
                memory: false,
            },

            ExprKind::Binary { lhs, rhs, .. } => {
                let l = self.score(lhs, types, metadata);
                let r = self.score(rhs, types, metadata);
                Score {
                    depth: 1 + l.depth.max(r.depth),
                    cost: op_cost + l.cost + r.cost,
                    pressure: combine_pressure(l.pressure, r.pressure),
                    memory: l.memory || r.memory,
                }
            }

            ExprKind::Unary { op, operand } => {
                let inner = self.score(operand, types, metadata);
                let memory = inner.memory || *op == UnaryOp::Deref;
                Score {
                    depth: 1 + inner.depth,
                    cost: op_cost + inner.cost,
                    pressure: inner.pressure,
                    memory,
                }
            }

            ExprKind::Cast { expr: inner, .. } => {
                let i = self.score(inner, types, metadata);
                Score {
                    depth: 1 + i.depth,
                    cost: i.cost,
                    pressure: i.pressure,
                    memory: i.memory,
                }
            }

            ExprKind::Index { base, index } => {
                let b = self.score(base, types, metadata);
                let i = self.score(index, types, metadata);
                Score {
                    depth: 1 + b.depth.max(i.depth),
                    cost: 3 + b.cost + i.cost,
                    pressure: combine_pressure(b.pressure, i.pressure).max(2),
                    memory: true,
                }
            }

            ExprKind::Call { callee, args } => {
                let _ = callee;
                let mut depth = 0;
                let mut cost = 6;
                let mut memory = false;
                for arg in args {
                    let a = self.score(arg, types, metadata);
                    depth = depth.max(a.depth);
                    cost += a.cost;
                    memory |= a.memory;
                }
                Score {
                    depth: 1 + depth,
                    cost,
                    // Calls clobber all three registers
                    pressure: 3,
                    memory,
                }
            }

            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let c = self.score(cond, types, metadata);
                let t = self.score(then_expr, types, metadata);
                let e = self.score(else_expr, types, metadata);
                Score {
                    depth: 1 + c.depth.max(t.depth).max(e.depth),
                    cost: op_cost + c.cost + t.cost + e.cost,
                    pressure: combine_pressure(c.pressure, t.pressure.max(e.pressure)),
                    memory: c.memory || t.memory || e.memory,
                }
            }
        };

        metadata.set(
            expr.id,
            MetaKey::ExprTreeDepth,
            MetaValue::Int(score.depth as i64),
        );
        metadata.set(
            expr.id,
            MetaKey::ExprComplexityScore,
            MetaValue::Int(score.cost as i64),
        );
        metadata.set(
            expr.id,
            MetaKey::ExprRegisterPressure,
            MetaValue::Int(score.pressure as i64),
        );
        metadata.set(
            expr.id,
            MetaKey::ExprContainsMemoryAccess,
            MetaValue::Bool(score.memory),
        );

        score
    }
}

/// Sethi-Ullman-style pressure combination, clamped to the 6502's three
/// registers.
fn combine_pressure(left: u32, right: u32) -> u32 {
    let combined = if left == right { left + 1 } else { left.max(right) };
    combined.clamp(1, 3)
}

impl Analyzer for ExprComplexityAnalysis {
    fn name(&self) -> &'static str {
        "expr-complexity"
    }

    fn tier(&self) -> Tier {
        Tier::Advanced
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;
        let types = ctx.types;
        for func in program.functions() {
            // Score statement-level expressions; subexpressions are
            // visited (and tagged) by the recursion itself
            let mut seen = rustc_hash::FxHashSet::default();
            walk_block_exprs(&func.body, &mut |expr| {
                if seen.insert(expr.id) {
                    self.score(expr, types, ctx.metadata);
                }
            });
        }
    }
}
