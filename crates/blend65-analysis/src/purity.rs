//! Function purity analysis.
//!
//! Four-valued lattice `Pure > ReadOnly > LocalEffects > Impure`. Each
//! function starts from its direct global and hardware accesses, then
//! levels propagate along call edges until a fixed point. The analysis
//! builds its own call edges so it does not depend on its tier peers.

use crate::framework::{AnalysisContext, Analyzer, Tier};
use blend65_checker::check::is_memory_mapped;
use blend65_checker::{SymbolKind};
use blend65_parser::ast::visitor::{walk_block_exprs, walk_stmts};
use blend65_parser::ast::{ExprKind, FunctionDecl, Statement};
use blend65_parser::{MetaKey, MetaValue};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Purity level, ordered from least to most pure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PurityLevel {
    Impure,
    LocalEffects,
    ReadOnly,
    Pure,
}

impl fmt::Display for PurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PurityLevel::Pure => "Pure",
            PurityLevel::ReadOnly => "ReadOnly",
            PurityLevel::LocalEffects => "LocalEffects",
            PurityLevel::Impure => "Impure",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Default)]
struct FunctionFacts {
    base: Option<PurityLevel>,
    written_globals: FxHashSet<String>,
    called: Vec<String>,
}

pub struct PurityAnalysis;

impl PurityAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn gather(&self, func: &FunctionDecl, ctx: &AnalysisContext) -> FunctionFacts {
        let bindings = ctx.bindings;
        let types = ctx.types;
        let module_scope = bindings.table.module_scope();

        let mut level = PurityLevel::Pure;
        let mut written = FxHashSet::default();
        let mut called = Vec::new();
        let mut lower = |level_ref: &mut PurityLevel, new: PurityLevel| {
            if new < *level_ref {
                *level_ref = new;
            }
        };

        // Statement-level effects: writes to globals
        walk_stmts(&func.body, &mut |stmt: &Statement| {
            let Statement::Assign(assign) = stmt else {
                return;
            };
            let ExprKind::Identifier(name) = &assign.target.kind else {
                // Writes through pointers or arrays of unknown residence
                lower(&mut level, PurityLevel::LocalEffects);
                return;
            };
            let Some(symbol_id) = types.use_of(assign.target.id) else {
                return;
            };
            let symbol = bindings.table.symbol(symbol_id);
            if symbol.scope == module_scope {
                written.insert(name.clone());
                if is_memory_mapped(&symbol.payload) {
                    lower(&mut level, PurityLevel::Impure);
                } else {
                    lower(&mut level, PurityLevel::LocalEffects);
                }
            }
        });

        // Expression-level effects: global reads, hardware intrinsics, calls
        walk_block_exprs(&func.body, &mut |expr| {
            match &expr.kind {
                ExprKind::Identifier(_) => {
                    if let Some(symbol_id) = types.use_of(expr.id) {
                        let symbol = bindings.table.symbol(symbol_id);
                        if symbol.scope == module_scope
                            && matches!(symbol.kind, SymbolKind::Variable)
                        {
                            lower(&mut level, PurityLevel::ReadOnly);
                        }
                    }
                }
                ExprKind::Call { callee, .. } => {
                    let Some(name) = callee.as_identifier() else {
                        return;
                    };
                    match name {
                        "poke" | "pokew" => lower(&mut level, PurityLevel::Impure),
                        "peek" | "peekw" => lower(&mut level, PurityLevel::ReadOnly),
                        "sizeof" | "length" | "lo" | "hi" => {}
                        _ => match types.use_of(callee.id) {
                            Some(symbol_id)
                                if bindings.table.symbol(symbol_id).kind
                                    == SymbolKind::Function =>
                            {
                                called.push(name.to_string());
                            }
                            // Imported or unresolved callee: conservative
                            _ => lower(&mut level, PurityLevel::Impure),
                        },
                    }
                }
                _ => {}
            }
        });

        called.sort_unstable();
        called.dedup();

        FunctionFacts {
            base: Some(level),
            written_globals: written,
            called,
        }
    }
}

impl Analyzer for PurityAnalysis {
    fn name(&self) -> &'static str {
        "purity"
    }

    fn tier(&self) -> Tier {
        Tier::Interprocedural
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;

        let mut facts: FxHashMap<String, FunctionFacts> = FxHashMap::default();
        for func in program.functions() {
            facts.insert(func.name.name.clone(), self.gather(func, ctx));
        }

        // Propagate levels and written-location sets along call edges to
        // a fixed point
        let mut levels: FxHashMap<String, PurityLevel> = facts
            .iter()
            .map(|(name, f)| (name.clone(), f.base.unwrap_or(PurityLevel::Impure)))
            .collect();
        let mut written_sets: FxHashMap<String, FxHashSet<String>> = facts
            .iter()
            .map(|(name, f)| (name.clone(), f.written_globals.clone()))
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            for (name, fact) in &facts {
                let mut level = levels[name];
                let mut inherited: Vec<String> = Vec::new();
                for callee in &fact.called {
                    let callee_level = levels
                        .get(callee)
                        .copied()
                        .unwrap_or(PurityLevel::Impure);
                    if callee_level < level {
                        level = callee_level;
                    }
                    if let Some(callee_written) = written_sets.get(callee) {
                        inherited.extend(callee_written.iter().cloned());
                    }
                }
                if level < levels[name] {
                    levels.insert(name.clone(), level);
                    changed = true;
                }
                let own = written_sets.get_mut(name).expect("facts and sets agree");
                for location in inherited {
                    if own.insert(location) {
                        changed = true;
                    }
                }
            }
        }

        for func in program.functions() {
            let name = &func.name.name;
            let level = levels[name];
            let fact = &facts[name];

            ctx.metadata.set(
                func.id,
                MetaKey::PurityLevel,
                MetaValue::Str(level.to_string()),
            );
            ctx.metadata.set(
                func.id,
                MetaKey::PurityHasSideEffects,
                MetaValue::Bool(level <= PurityLevel::LocalEffects),
            );
            let mut written: Vec<String> = written_sets[name].iter().cloned().collect();
            written.sort_unstable();
            ctx.metadata.set(
                func.id,
                MetaKey::PurityWrittenLocations,
                MetaValue::Names(written),
            );
            ctx.metadata.set(
                func.id,
                MetaKey::PurityCalledFunctions,
                MetaValue::Names(fact.called.clone()),
            );
        }
    }
}
