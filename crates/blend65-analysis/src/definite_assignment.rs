//! Definite assignment analysis.
//!
//! Forward dataflow over the CFG: a variable is considered assigned at a
//! read site when some predecessor path has assigned it. Reads of local
//! variables with no assignment on any incoming path produce
//! `USE_BEFORE_INIT`. Parameters count as assigned at entry.

use crate::cfg::{Cfg, CfgNodeId};
use crate::framework::{AnalysisContext, Analyzer, Tier};
use crate::util::{read_symbols, written_symbol};
use blend65_checker::{SymbolId, SymbolKind};
use blend65_parser::ast::visitor::walk_stmts;
use blend65_parser::ast::{ExprKind, FunctionDecl, NodeId, Statement};
use blend65_parser::{Diagnostic, DiagnosticCode, MetaKey, MetaValue, SourceLocation};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct DefiniteAssignmentAnalysis;

impl DefiniteAssignmentAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn analyze_function(&self, func: &FunctionDecl, cfg: &Cfg, ctx: &mut AnalysisContext) {
        let bindings = ctx.bindings;
        let types = ctx.types;

        // Statement lookup by node id
        let mut stmts: FxHashMap<NodeId, &Statement> = FxHashMap::default();
        walk_stmts(&func.body, &mut |stmt| {
            stmts.insert(stmt.id(), stmt);
        });

        // Locals tracked by this analysis (declared inside the function)
        let module_scope = bindings.table.module_scope();
        let is_local = |id: SymbolId| {
            let symbol = bindings.table.symbol(id);
            symbol.scope != module_scope
                && matches!(symbol.kind, SymbolKind::Variable | SymbolKind::Parameter)
        };

        // Entry generates all parameters
        let mut entry_gen: FxHashSet<SymbolId> = FxHashSet::default();
        for param in &func.params {
            if let Some(id) = bindings.symbol_of(param.id) {
                entry_gen.insert(id);
            }
        }

        // Per-node gen sets
        let node_count = cfg.len();
        let mut gen: Vec<Option<SymbolId>> = vec![None; node_count];
        for node in cfg.nodes() {
            if let Some(stmt_id) = node.stmt {
                if let Some(stmt) = stmts.get(&stmt_id) {
                    gen[node.id.as_usize()] =
                        written_symbol(stmt, types, |n| bindings.symbol_of(n)).filter(|&s| is_local(s));
                }
            }
        }

        // Fixed point: OUT[n] = IN[n] ∪ gen[n]; IN[n] = ∪ preds OUT[p]
        let mut out_sets: Vec<FxHashSet<SymbolId>> = vec![FxHashSet::default(); node_count];
        out_sets[cfg.entry().as_usize()] = entry_gen;

        let mut changed = true;
        while changed {
            changed = false;
            for node in cfg.nodes() {
                if node.id == cfg.entry() {
                    continue;
                }
                let mut in_set: FxHashSet<SymbolId> = FxHashSet::default();
                for &pred in &node.preds {
                    in_set.extend(out_sets[pred.as_usize()].iter().copied());
                }
                let mut out_set = in_set;
                if let Some(written) = gen[node.id.as_usize()] {
                    out_set.insert(written);
                }
                if out_set != out_sets[node.id.as_usize()] {
                    out_sets[node.id.as_usize()] = out_set;
                    changed = true;
                }
            }
        }

        // Report reads not covered on any incoming path
        let mut reported: FxHashSet<(CfgNodeId, SymbolId)> = FxHashSet::default();
        for node in cfg.nodes() {
            let Some(stmt_id) = node.stmt else { continue };
            let Some(stmt) = stmts.get(&stmt_id) else {
                continue;
            };
            if !node.reachable {
                continue;
            }
            let mut in_set: FxHashSet<SymbolId> = FxHashSet::default();
            for &pred in &node.preds {
                in_set.extend(out_sets[pred.as_usize()].iter().copied());
            }
            for (_, symbol, span) in read_symbols(stmt, types) {
                if !is_local(symbol) || in_set.contains(&symbol) {
                    continue;
                }
                if !reported.insert((node.id, symbol)) {
                    continue;
                }
                let name = bindings.table.symbol(symbol).name.clone();
                ctx.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UseBeforeInit,
                    format!("'{}' may be read before it is assigned", name),
                    SourceLocation::new(ctx.program.source_name.clone(), span),
                ));
            }
        }

        // Declaration metadata
        walk_stmts(&func.body, &mut |stmt| {
            if let Statement::Let(var) = stmt {
                ctx.metadata.set(
                    var.id,
                    MetaKey::DefiniteAssignmentAlwaysInitialized,
                    MetaValue::Bool(var.init.is_some()),
                );
                if let Some(init) = &var.init {
                    match &init.kind {
                        ExprKind::Number(n) => ctx.metadata.set(
                            var.id,
                            MetaKey::DefiniteAssignmentInitValue,
                            MetaValue::Int(*n),
                        ),
                        ExprKind::Bool(b) => ctx.metadata.set(
                            var.id,
                            MetaKey::DefiniteAssignmentInitValue,
                            MetaValue::Int(*b as i64),
                        ),
                        _ => {}
                    }
                }
            }
        });
    }
}

impl Analyzer for DefiniteAssignmentAnalysis {
    fn name(&self) -> &'static str {
        "definite-assignment"
    }

    fn tier(&self) -> Tier {
        Tier::Flow
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;
        let cfgs = ctx.cfgs;
        for func in program.functions() {
            if let Some(cfg) = cfgs.get(&func.id) {
                self.analyze_function(func, cfg, ctx);
            }
        }
    }
}
