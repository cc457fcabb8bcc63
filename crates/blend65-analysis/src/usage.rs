//! Variable usage analysis.
//!
//! Counts reads and writes per symbol and weights uses by loop nesting
//! depth. Produces hints only, never errors. Writes that are never
//! followed by a read mark the variable's assignments as dead stores
//! (metadata only).

use crate::framework::{AnalysisContext, Analyzer, Tier};
use crate::util::{read_symbols, written_symbol};
use blend65_checker::{Bindings, CheckResult, SymbolId, SymbolKind};
use blend65_parser::ast::visitor::walk_stmts;
use blend65_parser::ast::{Block, FunctionDecl, NodeId, Statement};
use blend65_parser::{Diagnostic, DiagnosticCode, MetaKey, MetaValue, SourceLocation};
use rustc_hash::FxHashMap;

#[derive(Debug, Default, Clone)]
struct UsageCounts {
    reads: u32,
    writes: u32,
    hot_path: u32,
}

#[derive(Default)]
struct FunctionUsage {
    counts: FxHashMap<SymbolId, UsageCounts>,
    write_sites: FxHashMap<SymbolId, Vec<NodeId>>,
}

impl FunctionUsage {
    /// Record one statement's direct reads and writes, weighted by the
    /// loop nesting depth at that statement.
    fn record(
        &mut self,
        stmt: &Statement,
        depth: u32,
        bindings: &Bindings,
        types: &CheckResult,
    ) {
        for (_, symbol, _) in read_symbols(stmt, types) {
            let entry = self.counts.entry(symbol).or_default();
            entry.reads += 1;
            entry.hot_path += depth;
        }
        if let Some(symbol) = written_symbol(stmt, types, |n| bindings.symbol_of(n)) {
            let entry = self.counts.entry(symbol).or_default();
            entry.writes += 1;
            entry.hot_path += depth;
            self.write_sites.entry(symbol).or_default().push(stmt.id());
        }
    }

    fn visit_block(
        &mut self,
        block: &Block,
        depth: u32,
        bindings: &Bindings,
        types: &CheckResult,
    ) {
        for stmt in &block.statements {
            self.record(stmt, depth, bindings, types);
            match stmt {
                Statement::If(s) => {
                    self.visit_block(&s.then_branch, depth, bindings, types);
                    if let Some(else_branch) = &s.else_branch {
                        self.visit_else(else_branch, depth, bindings, types);
                    }
                }
                Statement::While(s) => self.visit_block(&s.body, depth + 1, bindings, types),
                Statement::For(s) => self.visit_block(&s.body, depth + 1, bindings, types),
                Statement::Block(b) => self.visit_block(b, depth, bindings, types),
                _ => {}
            }
        }
    }

    fn visit_else(
        &mut self,
        stmt: &Statement,
        depth: u32,
        bindings: &Bindings,
        types: &CheckResult,
    ) {
        self.record(stmt, depth, bindings, types);
        match stmt {
            Statement::Block(b) => self.visit_block(b, depth, bindings, types),
            Statement::If(s) => {
                self.visit_block(&s.then_branch, depth, bindings, types);
                if let Some(else_branch) = &s.else_branch {
                    self.visit_else(else_branch, depth, bindings, types);
                }
            }
            _ => {}
        }
    }
}

pub struct VariableUsageAnalysis;

impl VariableUsageAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn analyze_function(&self, func: &FunctionDecl, ctx: &mut AnalysisContext) {
        let bindings = ctx.bindings;
        let types = ctx.types;

        let mut usage = FunctionUsage::default();
        usage.visit_block(&func.body, 0, bindings, types);

        // Attach counts and hints on local declarations
        walk_stmts(&func.body, &mut |stmt: &Statement| {
            let Statement::Let(var) = stmt else { return };
            let Some(symbol) = bindings.symbol_of(var.id) else {
                return;
            };
            let counts = usage.counts.get(&symbol).cloned().unwrap_or_default();
            ctx.metadata.set(
                var.id,
                MetaKey::UsageReadCount,
                MetaValue::Int(counts.reads as i64),
            );
            ctx.metadata.set(
                var.id,
                MetaKey::UsageWriteCount,
                MetaValue::Int(counts.writes as i64),
            );
            ctx.metadata.set(
                var.id,
                MetaKey::UsageHotPathCount,
                MetaValue::Int(counts.hot_path as i64),
            );

            let name = &var.name.name;
            let loc = SourceLocation::new(ctx.program.source_name.clone(), var.name.location);
            if counts.reads == 0 && counts.writes <= u32::from(var.init.is_some()) {
                ctx.diagnostics.push(Diagnostic::hint(
                    DiagnosticCode::UnusedVariable,
                    format!("variable '{}' is never used", name),
                    loc,
                ));
            } else if counts.reads == 0 {
                ctx.diagnostics.push(Diagnostic::hint(
                    DiagnosticCode::WriteOnlyVariable,
                    format!("variable '{}' is written but never read", name),
                    loc,
                ));
            }

            // With no reads at all, every write to the variable is dead
            if counts.reads == 0 {
                if let Some(sites) = usage.write_sites.get(&symbol) {
                    for &site in sites {
                        ctx.metadata
                            .set(site, MetaKey::UsageDeadStore, MetaValue::Bool(true));
                    }
                }
            }
        });

        // Parameters get usage hints too
        for param in &func.params {
            let Some(symbol) = bindings.symbol_of(param.id) else {
                continue;
            };
            if bindings.table.symbol(symbol).kind != SymbolKind::Parameter {
                continue;
            }
            let counts = usage.counts.get(&symbol).cloned().unwrap_or_default();
            ctx.metadata.set(
                param.id,
                MetaKey::UsageReadCount,
                MetaValue::Int(counts.reads as i64),
            );
            if counts.reads == 0 && counts.writes == 0 {
                ctx.diagnostics.push(Diagnostic::hint(
                    DiagnosticCode::UnusedVariable,
                    format!("parameter '{}' is never used", param.name.name),
                    SourceLocation::new(ctx.program.source_name.clone(), param.name.location),
                ));
            }
        }
    }
}

impl Analyzer for VariableUsageAnalysis {
    fn name(&self) -> &'static str {
        "variable-usage"
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
