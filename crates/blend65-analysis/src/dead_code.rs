//! Dead code detection.
//!
//! Statements unreachable in the CFG are marked removable and reported as
//! warnings. Branches with compile-time constant conditions are marked
//! with the reason, metadata only.

use crate::framework::{AnalysisContext, Analyzer, Tier};
use blend65_checker::consteval::eval_const_bool;
use blend65_parser::ast::visitor::walk_stmts;
use blend65_parser::ast::{FunctionDecl, Statement};
use blend65_parser::{Diagnostic, DiagnosticCode, MetaKey, MetaValue, SourceLocation};

pub struct DeadCodeAnalysis;

impl DeadCodeAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn analyze_function(&self, func: &FunctionDecl, ctx: &mut AnalysisContext) {
        let bindings = ctx.bindings;
        let cfgs = ctx.cfgs;

        // Unreachable statements, straight off the CFG
        if let Some(cfg) = cfgs.get(&func.id) {
            let mut dead: Vec<_> = cfg
                .unreachable_nodes()
                .into_iter()
                .filter_map(|n| n.stmt.map(|s| (s, n.span)))
                .collect();
            dead.sort_by_key(|(_, span)| span.map(|s| s.start.offset).unwrap_or(0));

            for (stmt_id, span) in dead {
                ctx.metadata
                    .set(stmt_id, MetaKey::DeadCodeUnreachable, MetaValue::Bool(true));
                ctx.metadata.set(
                    stmt_id,
                    MetaKey::DeadCodeKind,
                    MetaValue::Str("UnreachableStatement".to_string()),
                );
                ctx.metadata
                    .set(stmt_id, MetaKey::DeadCodeRemovable, MetaValue::Bool(true));
                if let Some(span) = span {
                    ctx.diagnostics.push(Diagnostic::warning(
                        DiagnosticCode::UnreachableCode,
                        "unreachable code",
                        SourceLocation::new(ctx.program.source_name.clone(), span),
                    ));
                }
            }
        }

        // Branches that fold to a constant
        walk_stmts(&func.body, &mut |stmt: &Statement| {
            let Statement::If(s) = stmt else { return };
            let scope = bindings
                .scope_of(s.then_branch.id)
                .or_else(|| bindings.scope_of(func.id))
                .unwrap_or(bindings.table.module_scope());
            if let Some(value) = eval_const_bool(&s.condition, &bindings.table, scope) {
                ctx.metadata.set(
                    s.id,
                    MetaKey::DeadCodeKind,
                    MetaValue::Str("UnreachableBranch".to_string()),
                );
                ctx.metadata.set(
                    s.id,
                    MetaKey::DeadCodeReason,
                    MetaValue::Str(
                        if value {
                            "condition always true"
                        } else {
                            "condition always false"
                        }
                        .to_string(),
                    ),
                );
            }
        });
    }
}

impl Analyzer for DeadCodeAnalysis {
    fn name(&self) -> &'static str {
        "dead-code"
    }

    fn tier(&self) -> Tier {
        Tier::Flow
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;
        for func in program.functions() {
            self.analyze_function(func, ctx);
        }
    }
}
