//! The compilation pipeline.
//!
//! Sequences parse → symbol binding → type checking → import resolution
//! → CFG/analyses → IL generation → SSA → verification → optimizer →
//! assembly IL. Every phase contributes a [`PhaseTiming`]; the pipeline
//! stops lowering once an error-severity diagnostic exists but still
//! runs the analyses, which are conservative by construction.

use crate::config::CompileOptions;
use crate::emit::build_asm;
use blend65_analysis::{AnalysisConfig, AnalysisOutput, AnalysisPipeline};
use blend65_asm::AsmBuilder;
use blend65_checker::{
    detect_unused_imports, Binder, Bindings, CheckResult, ImportResolver, ModuleRegistry,
    TypeChecker,
};
use blend65_compiler::{IlGenerator, Optimizer};
use blend65_il::{IlModule, SsaBuilder, SsaStats, VerifyError};
use blend65_parser::ast::Program;
use blend65_parser::{Diagnostic, DiagnosticBag, DiagnosticCode, Parser, SourceLocation, Span};
use serde::Serialize;
use std::time::Instant;

/// Timing record for one phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub name: String,
    pub time_ms: f64,
    pub success: bool,
}

/// Aggregated SSA statistics (when `collect_ssa_stats` is set).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SsaStatistics {
    pub phis_inserted: u32,
    pub registers_renamed: u32,
    pub dominance_checks: u32,
}

/// Everything `compile` returns.
pub struct CompileOutput {
    /// IL modules, post-optimization; empty when errors stopped lowering
    pub il: Vec<IlModule>,
    /// Assembly IL stream, when the pipeline reached emission
    pub asm: Option<AsmBuilder>,
    pub diagnostics: Vec<Diagnostic>,
    pub phase_timings: Vec<PhaseTiming>,
    /// False when any error-severity diagnostic was produced
    pub success: bool,
    pub ssa_stats: Option<SsaStatistics>,
}

/// Compile a set of `(source_key, source_text)` pairs.
pub fn compile(sources: &[(&str, &str)], options: &CompileOptions) -> CompileOutput {
    Pipeline::new(options).run(sources)
}

struct Pipeline<'a> {
    options: &'a CompileOptions,
    diagnostics: DiagnosticBag,
    timings: Vec<PhaseTiming>,
}

impl<'a> Pipeline<'a> {
    fn new(options: &'a CompileOptions) -> Self {
        Self {
            options,
            diagnostics: DiagnosticBag::new(),
            timings: Vec::new(),
        }
    }

    fn run(mut self, sources: &[(&str, &str)]) -> CompileOutput {
        // ---- parse ----
        let parse_start = Instant::now();
        let mut programs: Vec<Program> = Vec::new();
        for (index, (key, text)) in sources.iter().enumerate() {
            // The first source is the root module; its default name may
            // be overridden by the module_name option
            let source_name = if index == 0 {
                self.options.module_name.as_deref().unwrap_or(key)
            } else {
                key
            };
            let (program, errors) = Parser::new(text, source_name).parse();
            for error in &errors {
                self.diagnostics.push(Diagnostic::error(
                    parse_error_code(error),
                    error.to_string(),
                    SourceLocation::new(source_name, error.span()),
                ));
            }
            programs.push(program);
        }
        let parse_ok = !self.diagnostics.has_errors();
        self.record("parse", parse_start, parse_ok);

        if !parse_ok {
            // Nothing downstream can interpret a broken tree
            return self.finish(Vec::new(), None, None);
        }

        // ---- imports ----
        let import_start = Instant::now();
        let mut registry = ModuleRegistry::new();
        for program in &programs {
            registry.register(program.clone());
        }
        let (resolved_imports, import_diags) = ImportResolver::new(&registry).resolve();
        let import_ok = !import_diags.iter().any(|d| d.is_error());
        self.diagnostics.extend(import_diags);
        self.diagnostics
            .extend(detect_unused_imports(&registry, &resolved_imports));
        self.record("imports", import_start, import_ok);

        // ---- symbols + types, per module ----
        let bind_start = Instant::now();
        let mut bound: Vec<(Program, Bindings, CheckResult)> = Vec::new();
        for program in programs {
            let (mut bindings, bind_diags) = Binder::with_registry(&program, &registry).bind();
            self.diagnostics.extend(bind_diags);
            let (check, check_diags) = TypeChecker::new(&program, &mut bindings).check();
            self.diagnostics.extend(check_diags);
            bound.push((program, bindings, check));
        }
        let types_ok = !self.diagnostics.has_errors();
        self.record("symbols+types", bind_start, types_ok);

        // ---- analyses (run even when checking failed; they are
        // conservative and only add metadata and hints) ----
        let analysis_start = Instant::now();
        let analysis_config = AnalysisConfig {
            run_advanced: self.options.run_advanced_analysis,
        };
        let mut analyses: Vec<AnalysisOutput> = Vec::new();
        for (program, bindings, check) in &bound {
            let output = AnalysisPipeline::new(analysis_config).run(program, bindings, check);
            self.diagnostics.extend(output.diagnostics.iter().cloned());
            analyses.push(output);
        }
        self.record("analysis", analysis_start, true);

        if self.diagnostics.has_errors() {
            // Type or flow errors: lowering would work on a broken model
            return self.finish(Vec::new(), None, None);
        }

        // ---- IL generation ----
        let ilgen_start = Instant::now();
        let mut modules: Vec<IlModule> = Vec::new();
        let mut ilgen_ok = true;
        for (program, bindings, check) in &bound {
            let (module, errors) = IlGenerator::new(program, bindings, check).generate();
            for error in errors {
                ilgen_ok = false;
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::InternalError,
                    error.to_string(),
                    SourceLocation::new(program.source_name.clone(), program.location),
                ));
            }
            modules.push(module);
        }
        self.record("ilgen", ilgen_start, ilgen_ok);
        if !ilgen_ok {
            return self.finish(Vec::new(), None, None);
        }

        // ---- SSA construction ----
        let mut ssa_stats = SsaStatistics::default();
        if self.options.enable_ssa {
            let ssa_start = Instant::now();
            for module in &mut modules {
                for func in module.functions_mut() {
                    let stats: SsaStats = SsaBuilder::new().build(func);
                    ssa_stats.phis_inserted += stats.phis_inserted;
                    ssa_stats.registers_renamed += stats.registers_renamed;
                }
            }
            self.record("ssa", ssa_start, true);

            if self.options.verify_ssa {
                let verify_start = Instant::now();
                let ok = self.verify_modules(&modules, &mut ssa_stats);
                self.record("verify-ssa", verify_start, ok);
                if !ok {
                    return self.finish(modules, None, Some(ssa_stats));
                }
            }
        }

        // ---- optimizer ----
        let opt_start = Instant::now();
        let optimizer = Optimizer::new(self.options.optimization_level);
        for module in &mut modules {
            optimizer.run(module);
        }
        self.record("optimize", opt_start, true);

        if self.options.enable_ssa && self.options.verify_ssa {
            let verify_start = Instant::now();
            let ok = self.verify_modules(&modules, &mut ssa_stats);
            self.record("verify-ssa-post-opt", verify_start, ok);
            if !ok {
                return self.finish(modules, None, Some(ssa_stats));
            }
        }

        // ---- assembly IL ----
        let asm_start = Instant::now();
        let asm = match build_asm(&modules, self.options.target) {
            Ok(asm) => Some(asm),
            Err(error) => {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::InternalError,
                    format!("assembly emission failed: {}", error),
                    SourceLocation::new("<asm>", Span::dummy()),
                ));
                None
            }
        };
        self.record("asm", asm_start, asm.is_some());

        let stats = self.options.collect_ssa_stats.then_some(ssa_stats);
        self.finish(modules, asm, stats)
    }

    /// Verifier failures after our own passes are internal errors.
    fn verify_modules(&mut self, modules: &[IlModule], stats: &mut SsaStatistics) -> bool {
        let mut ok = true;
        for module in modules {
            let report = blend65_il::verify_module(module);
            stats.dominance_checks += report.dominance_checks;
            for error in &report.errors {
                ok = false;
                debug_assert!(false, "SSA verifier: {}", error);
                self.diagnostics.push(Diagnostic::error(
                    verify_error_code(error),
                    format!("internal error in module '{}': {}", module.name, error),
                    SourceLocation::new(module.name.clone(), Span::dummy()),
                ));
            }
        }
        ok
    }

    fn record(&mut self, name: &str, start: Instant, success: bool) {
        self.timings.push(PhaseTiming {
            name: name.to_string(),
            time_ms: start.elapsed().as_secs_f64() * 1000.0,
            success,
        });
    }

    fn finish(
        mut self,
        il: Vec<IlModule>,
        asm: Option<AsmBuilder>,
        ssa_stats: Option<SsaStatistics>,
    ) -> CompileOutput {
        self.diagnostics.sort_by_source_order();
        let success = !self.diagnostics.has_errors();
        CompileOutput {
            il,
            asm,
            diagnostics: self.diagnostics.into_vec(),
            phase_timings: self.timings,
            success,
            ssa_stats,
        }
    }
}

fn parse_error_code(error: &blend65_parser::ParseError) -> DiagnosticCode {
    use blend65_parser::ParseError;
    match error {
        ParseError::UnexpectedCharacter { .. } => DiagnosticCode::UnexpectedCharacter,
        ParseError::InvalidNumber { .. } => DiagnosticCode::InvalidNumber,
        _ => DiagnosticCode::UnexpectedToken,
    }
}

fn verify_error_code(error: &VerifyError) -> DiagnosticCode {
    match error {
        VerifyError::MultipleDefinitions { .. } => DiagnosticCode::MultipleDefinitions,
        VerifyError::UseBeforeDefinition { .. } => DiagnosticCode::UseBeforeDefinition,
        VerifyError::DominanceViolation { .. } => DiagnosticCode::DominanceViolation,
        VerifyError::PhiNotAtBlockStart { .. } => DiagnosticCode::PhiNotAtBlockStart,
        VerifyError::PhiInEntryBlock { .. } => DiagnosticCode::PhiInEntryBlock,
        VerifyError::PhiMissingOperand { .. } => DiagnosticCode::PhiMissingOperand,
        VerifyError::PhiOperandCountMismatch { .. } => DiagnosticCode::PhiOperandCountMismatch,
        VerifyError::PhiInvalidPredecessor { .. } => DiagnosticCode::PhiInvalidPredecessor,
        VerifyError::Structural(_) => DiagnosticCode::InternalError,
    }
}
