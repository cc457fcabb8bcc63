//! Call graph construction and recursion detection.
//!
//! Builds a per-program call graph from direct call sites and finds
//! strongly connected components (Tarjan) to identify direct and mutual
//! recursion. Also decides inline candidacy for small leaf functions.

use crate::framework::{AnalysisContext, Analyzer, Tier};
use blend65_checker::{Bindings, CheckResult, SymbolKind};
use blend65_parser::ast::visitor::walk_block_exprs;
use blend65_parser::ast::{ExprKind, FunctionDecl, Program, Statement};
use blend65_parser::{MetaKey, MetaValue};
use rustc_hash::{FxHashMap, FxHashSet};

/// A call graph over the functions of one program.
#[derive(Debug, Clone)]
pub struct CallGraph {
    /// caller → callee → number of direct call sites
    edges: FxHashMap<String, FxHashMap<String, u32>>,
    /// All function names, in declaration order
    functions: Vec<String>,
    /// SCCs that contain recursion (mutual, or a self-calling member)
    recursive_sccs: Vec<FxHashSet<String>>,
}

impl CallGraph {
    /// Build the graph from every function's direct call sites.
    pub fn build(program: &Program, bindings: &Bindings, types: &CheckResult) -> Self {
        let mut edges: FxHashMap<String, FxHashMap<String, u32>> = FxHashMap::default();
        let mut functions = Vec::new();

        for func in program.functions() {
            let name = func.name.name.clone();
            functions.push(name.clone());
            let callees = edges.entry(name).or_default();
            walk_block_exprs(&func.body, &mut |expr| {
                let ExprKind::Call { callee, .. } = &expr.kind else {
                    return;
                };
                let Some(callee_name) = callee.as_identifier() else {
                    return;
                };
                // Only direct calls to module-level functions count
                let is_function = types
                    .use_of(callee.id)
                    .map(|id| bindings.table.symbol(id).kind == SymbolKind::Function)
                    .unwrap_or(false);
                if is_function {
                    *callees.entry(callee_name.to_string()).or_insert(0) += 1;
                }
            });
        }

        let mut graph = CallGraph {
            edges,
            functions,
            recursive_sccs: Vec::new(),
        };
        graph.recursive_sccs = graph.find_recursive_sccs();
        graph
    }

    /// Number of static call sites targeting `name`.
    pub fn call_count(&self, name: &str) -> u32 {
        self.edges
            .values()
            .filter_map(|callees| callees.get(name))
            .sum()
    }

    /// Direct callees of `name` with per-callee site counts.
    pub fn callees(&self, name: &str) -> Option<&FxHashMap<String, u32>> {
        self.edges.get(name)
    }

    /// Is `name` part of any recursion cycle (direct or mutual)?
    pub fn is_recursive(&self, name: &str) -> bool {
        self.recursive_sccs.iter().any(|scc| scc.contains(name))
    }

    /// Are two functions members of the same cycle?
    pub fn are_mutually_recursive(&self, a: &str, b: &str) -> bool {
        self.recursive_sccs
            .iter()
            .any(|scc| scc.contains(a) && scc.contains(b))
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Tarjan's algorithm over function indices; keeps the SCCs that
    /// actually contain recursion.
    fn find_recursive_sccs(&self) -> Vec<FxHashSet<String>> {
        let index_of: FxHashMap<&str, usize> = self
            .functions
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        // Adjacency as sorted index lists for deterministic traversal
        let succs: Vec<Vec<usize>> = self
            .functions
            .iter()
            .map(|name| {
                let mut out: Vec<usize> = self
                    .edges
                    .get(name)
                    .map(|callees| {
                        callees
                            .keys()
                            .filter_map(|callee| index_of.get(callee.as_str()).copied())
                            .collect()
                    })
                    .unwrap_or_default();
                out.sort_unstable();
                out
            })
            .collect();

        struct Tarjan<'g> {
            succs: &'g [Vec<usize>],
            index: u32,
            indices: Vec<Option<u32>>,
            lowlinks: Vec<u32>,
            on_stack: Vec<bool>,
            stack: Vec<usize>,
            sccs: Vec<Vec<usize>>,
        }

        impl Tarjan<'_> {
            fn strongconnect(&mut self, v: usize) {
                self.indices[v] = Some(self.index);
                self.lowlinks[v] = self.index;
                self.index += 1;
                self.stack.push(v);
                self.on_stack[v] = true;

                for i in 0..self.succs[v].len() {
                    let w = self.succs[v][i];
                    if self.indices[w].is_none() {
                        self.strongconnect(w);
                        self.lowlinks[v] = self.lowlinks[v].min(self.lowlinks[w]);
                    } else if self.on_stack[w] {
                        self.lowlinks[v] = self.lowlinks[v].min(self.indices[w].unwrap());
                    }
                }

                if Some(self.lowlinks[v]) == self.indices[v] {
                    let mut scc = Vec::new();
                    while let Some(w) = self.stack.pop() {
                        self.on_stack[w] = false;
                        scc.push(w);
                        if w == v {
                            break;
                        }
                    }
                    self.sccs.push(scc);
                }
            }
        }

        let n = self.functions.len();
        let mut tarjan = Tarjan {
            succs: &succs,
            index: 0,
            indices: vec![None; n],
            lowlinks: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            sccs: Vec::new(),
        };
        for v in 0..n {
            if tarjan.indices[v].is_none() {
                tarjan.strongconnect(v);
            }
        }

        tarjan
            .sccs
            .into_iter()
            .filter(|scc| scc.len() > 1 || (scc.len() == 1 && succs[scc[0]].contains(&scc[0])))
            .map(|scc| {
                scc.into_iter()
                    .map(|i| self.functions[i].clone())
                    .collect()
            })
            .collect()
    }
}

/// Maximum top-level statement count for an inline candidate.
const INLINE_MAX_SIZE: usize = 10;
/// A function called this many times or more is not inlined.
const INLINE_MAX_CALLS: u32 = 5;

pub struct CallGraphAnalysis;

impl CallGraphAnalysis {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for CallGraphAnalysis {
    fn name(&self) -> &'static str {
        "call-graph"
    }

    fn tier(&self) -> Tier {
        Tier::Interprocedural
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;
        let graph = CallGraph::build(program, ctx.bindings, ctx.types);

        for func in program.functions() {
            let name = &func.name.name;
            let size = func.body.statements.len();
            let call_count = graph.call_count(name);
            let recursive = graph.is_recursive(name);
            let has_loops = contains_loop(func);

            ctx.metadata.set(
                func.id,
                MetaKey::CallGraphCallCount,
                MetaValue::Int(call_count as i64),
            );
            ctx.metadata.set(
                func.id,
                MetaKey::CallGraphFunctionSize,
                MetaValue::Int(size as i64),
            );
            ctx.metadata.set(
                func.id,
                MetaKey::CallGraphRecursive,
                MetaValue::Bool(recursive),
            );

            let candidate = size <= INLINE_MAX_SIZE
                && !recursive
                && !func.exported
                && !has_loops
                && call_count < INLINE_MAX_CALLS;
            ctx.metadata.set(
                func.id,
                MetaKey::CallGraphInlineCandidate,
                MetaValue::Bool(candidate),
            );
        }
    }
}

fn contains_loop(func: &FunctionDecl) -> bool {
    let mut found = false;
    blend65_parser::ast::visitor::walk_stmts(&func.body, &mut |stmt| {
        if matches!(stmt, Statement::While(_) | Statement::For(_)) {
            found = true;
        }
    });
    found
}
