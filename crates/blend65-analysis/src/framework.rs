//! Analyzer interface and the tiered orchestrator.
//!
//! Analyses run in three tiers with a fixed tier order. Within a tier
//! every analysis owns its own metadata keys and reads none written by
//! its peers, so intra-tier order cannot affect results.

use crate::call_graph::CallGraphAnalysis;
use crate::cfg::{Cfg, CfgBuilder};
use crate::complexity::ExprComplexityAnalysis;
use crate::cse::CseAnalysis;
use crate::dead_code::DeadCodeAnalysis;
use crate::definite_assignment::DefiniteAssignmentAnalysis;
use crate::gvn::GvnAnalysis;
use crate::loops::LoopAnalysis;
use crate::purity::PurityAnalysis;
use crate::usage::VariableUsageAnalysis;
use blend65_checker::{Bindings, CheckResult};
use blend65_parser::ast::{NodeId, Program};
use blend65_parser::{Diagnostic, MetadataStore};
use rustc_hash::FxHashMap;

/// Analysis tier. Tiers run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// CFG-only analyses
    Flow,
    /// Call-graph and loop-structure analyses
    Interprocedural,
    /// Metadata-consuming advanced analyses (may be disabled)
    Advanced,
}

/// Everything an analysis can see and write.
pub struct AnalysisContext<'a> {
    pub program: &'a Program,
    pub bindings: &'a Bindings,
    pub types: &'a CheckResult,
    /// CFG per function declaration node
    pub cfgs: &'a FxHashMap<NodeId, Cfg>,
    pub metadata: &'a mut MetadataStore,
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

/// One analysis pass.
pub trait Analyzer {
    fn name(&self) -> &'static str;
    fn tier(&self) -> Tier;
    /// Run over the whole program. Skipping constructs the analysis does
    /// not understand is legal; throwing is not.
    fn analyze(&mut self, ctx: &mut AnalysisContext);
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisConfig {
    /// Run the tier-3 analyses (GVN, CSE, expression complexity)
    pub run_advanced: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { run_advanced: true }
    }
}

/// Result of a full analysis run.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub cfgs: FxHashMap<NodeId, Cfg>,
    pub metadata: MetadataStore,
    pub diagnostics: Vec<Diagnostic>,
}

/// The orchestrator: builds CFGs, then drives analyzers tier by tier.
pub struct AnalysisPipeline {
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        program: &Program,
        bindings: &Bindings,
        types: &CheckResult,
    ) -> AnalysisOutput {
        let mut cfgs = FxHashMap::default();
        for func in program.functions() {
            cfgs.insert(func.id, CfgBuilder::new(bindings).build(func));
        }

        let mut metadata = MetadataStore::new();
        let mut diagnostics = Vec::new();

        let mut analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(DefiniteAssignmentAnalysis::new()),
            Box::new(VariableUsageAnalysis::new()),
            Box::new(DeadCodeAnalysis::new()),
            Box::new(CallGraphAnalysis::new()),
            Box::new(PurityAnalysis::new()),
            Box::new(LoopAnalysis::new()),
        ];
        if self.config.run_advanced {
            analyzers.push(Box::new(GvnAnalysis::new()));
            analyzers.push(Box::new(CseAnalysis::new()));
            analyzers.push(Box::new(ExprComplexityAnalysis::new()));
        }

        for tier in [Tier::Flow, Tier::Interprocedural, Tier::Advanced] {
            for analyzer in analyzers.iter_mut().filter(|a| a.tier() == tier) {
                let mut ctx = AnalysisContext {
                    program,
                    bindings,
                    types,
                    cfgs: &cfgs,
                    metadata: &mut metadata,
                    diagnostics: &mut diagnostics,
                };
                analyzer.analyze(&mut ctx);
            }
        }

        // Diagnostics are reported in source order regardless of which
        // analysis produced them
        diagnostics.sort_by_key(|d| d.location.span.start.offset);

        AnalysisOutput {
            cfgs,
            metadata,
            diagnostics,
        }
    }
}
