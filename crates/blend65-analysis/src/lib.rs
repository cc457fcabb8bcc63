//! Blend65 program analyses.
//!
//! Control-flow graphs plus a tiered pipeline of dataflow and
//! interprocedural analyses. Analyses communicate exclusively through
//! the optimization-metadata store; missing metadata is always a valid
//! conservative answer, and O0 output never depends on anything written
//! here.

pub mod call_graph;
pub mod cfg;
pub mod complexity;
pub mod cse;
pub mod dead_code;
pub mod definite_assignment;
pub mod framework;
pub mod gvn;
pub mod loops;
pub mod purity;
pub mod usage;
mod util;

pub use call_graph::{CallGraph, CallGraphAnalysis};
pub use cfg::{Cfg, CfgBuilder, CfgNode, CfgNodeId, CfgNodeKind};
pub use framework::{
    AnalysisConfig, AnalysisContext, AnalysisOutput, AnalysisPipeline, Analyzer, Tier,
};
pub use purity::PurityLevel;

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_checker::{Binder, TypeChecker};
    use blend65_parser::ast::{Declaration, Statement};
    use blend65_parser::{DiagnosticCode, MetaKey, MetaValue, Parser, Severity};

    fn analyze(source: &str) -> (blend65_parser::ast::Program, AnalysisOutput) {
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        let (mut bindings, bind_diags) = Binder::new(&program).bind();
        assert!(bind_diags.is_empty(), "bind errors: {:?}", bind_diags);
        let (types, check_diags) = TypeChecker::new(&program, &mut bindings).check();
        assert!(
            !check_diags.iter().any(|d| d.is_error()),
            "check errors: {:?}",
            check_diags
        );
        let output =
            AnalysisPipeline::new(AnalysisConfig::default()).run(&program, &bindings, &types);
        (program, output)
    }

    fn let_stmt_id(program: &blend65_parser::ast::Program, name: &str) -> blend65_parser::ast::NodeId {
        let mut found = None;
        for func in program.functions() {
            blend65_parser::ast::visitor::walk_stmts(&func.body, &mut |stmt| {
                if let Statement::Let(var) = stmt {
                    if var.name.name == name {
                        found = Some(var.id);
                    }
                }
            });
        }
        found.expect("let statement not found")
    }

    #[test]
    fn test_dead_code_after_return() {
        let (program, output) =
            analyze("function f(): void { return; let x: byte = 1; }");

        let warnings: Vec<_> = output
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::UnreachableCode)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warning);

        let x = let_stmt_id(&program, "x");
        assert_eq!(
            output.metadata.get_str(x, MetaKey::DeadCodeKind),
            Some("UnreachableStatement")
        );
        assert_eq!(
            output.metadata.get_bool(x, MetaKey::DeadCodeUnreachable),
            Some(true)
        );
        assert_eq!(
            output.metadata.get_bool(x, MetaKey::DeadCodeRemovable),
            Some(true)
        );
    }

    #[test]
    fn test_gvn_and_cse_candidates() {
        let (program, output) = analyze(
            "function f(): void {\n\
             let a: byte = 10;\n\
             let b: byte = 20;\n\
             let x: byte = a + b;\n\
             let y: byte = a + b;\n\
             }",
        );

        // Find the initializer expressions of x and y
        let mut inits = Vec::new();
        for func in program.functions() {
            blend65_parser::ast::visitor::walk_stmts(&func.body, &mut |stmt| {
                if let Statement::Let(var) = stmt {
                    if let Some(init) = &var.init {
                        inits.push((var.name.name.clone(), var.id, init.id));
                    }
                }
            });
        }
        let x_init = inits.iter().find(|(n, _, _)| n == "x").unwrap().2;
        let (_, y_decl, y_init) = inits.iter().find(|(n, _, _)| n == "y").unwrap().clone();

        // Both initializers are numbered, with the same number
        let x_num = output.metadata.get_int(x_init, MetaKey::GVNNumber);
        let y_num = output.metadata.get_int(y_init, MetaKey::GVNNumber);
        assert!(x_num.is_some());
        assert_eq!(x_num, y_num);

        // The second occurrence is redundant, replaceable by x
        assert_eq!(
            output.metadata.get_bool(y_init, MetaKey::GVNRedundant),
            Some(true)
        );
        assert_eq!(
            output.metadata.get_str(y_init, MetaKey::GVNReplacement),
            Some("x")
        );

        // CSE marks the y declaration with the available expression
        assert_eq!(
            output.metadata.get_bool(y_decl, MetaKey::CSECandidate),
            Some(true)
        );
        assert_eq!(
            output.metadata.get_str(y_decl, MetaKey::CSEAvailable),
            Some("a + b")
        );
    }

    #[test]
    fn test_cse_invalidation_on_write() {
        let (program, output) = analyze(
            "function f(): void {\n\
             let a: byte = 10;\n\
             let b: byte = 20;\n\
             let x: byte = a + b;\n\
             a = 1;\n\
             let y: byte = a + b;\n\
             }",
        );
        let y = let_stmt_id(&program, "y");
        assert_eq!(output.metadata.get_bool(y, MetaKey::CSECandidate), None);
    }

    #[test]
    fn test_use_before_init() {
        let (program, errors) =
            Parser::new("function f(): void { let x: byte; let y: byte = x; }", "main").parse();
        assert!(errors.is_empty());
        let (mut bindings, _) = Binder::new(&program).bind();
        let (types, _) = TypeChecker::new(&program, &mut bindings).check();
        let output =
            AnalysisPipeline::new(AnalysisConfig::default()).run(&program, &bindings, &types);
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::UseBeforeInit));
    }

    #[test]
    fn test_branch_assignment_reaches_read() {
        // Union semantics: assignment on one path suffices
        let (_, output) = analyze(
            "function f(c: bool): void {\n\
             let x: byte;\n\
             if c { x = 1; }\n\
             let y: byte = x;\n\
             }",
        );
        assert!(!output
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::UseBeforeInit));
    }

    #[test]
    fn test_unused_variable_hint() {
        let (_, output) = analyze("function f(): void { let unused: byte = 1; }");
        let hints: Vec<_> = output
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::UnusedVariable)
            .collect();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].severity, Severity::Hint);
    }

    #[test]
    fn test_write_only_variable_and_dead_store() {
        let (program, output) = analyze(
            "function f(): void { let w: byte = 0; w = 1; w = 2; let r: byte = 3; let s: byte = r; }",
        );
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::WriteOnlyVariable));
        let w = let_stmt_id(&program, "w");
        assert_eq!(output.metadata.get_bool(w, MetaKey::UsageDeadStore), Some(true));
    }

    #[test]
    fn test_call_graph_metadata() {
        let (program, output) = analyze(
            "function leaf(): byte { return 1; }\n\
             function looper(): void { while true { } }\n\
             function rec(n: byte): byte { return rec(n); }\n\
             export function main_entry(): void { let a: byte = leaf(); }",
        );

        let func_id = |name: &str| {
            program
                .declarations
                .iter()
                .find_map(|d| match d {
                    Declaration::Function(f) if f.name.name == name => Some(f.id),
                    _ => None,
                })
                .unwrap()
        };

        // leaf: small, non-recursive, not exported, no loops, called once
        assert_eq!(
            output
                .metadata
                .get_bool(func_id("leaf"), MetaKey::CallGraphInlineCandidate),
            Some(true)
        );
        assert_eq!(
            output
                .metadata
                .get_int(func_id("leaf"), MetaKey::CallGraphCallCount),
            Some(1)
        );

        // Loops disqualify
        assert_eq!(
            output
                .metadata
                .get_bool(func_id("looper"), MetaKey::CallGraphInlineCandidate),
            Some(false)
        );

        // Recursion disqualifies
        assert_eq!(
            output
                .metadata
                .get_bool(func_id("rec"), MetaKey::CallGraphRecursive),
            Some(true)
        );
        assert_eq!(
            output
                .metadata
                .get_bool(func_id("rec"), MetaKey::CallGraphInlineCandidate),
            Some(false)
        );

        // Exported disqualifies
        assert_eq!(
            output
                .metadata
                .get_bool(func_id("main_entry"), MetaKey::CallGraphInlineCandidate),
            Some(false)
        );
    }

    #[test]
    fn test_purity_levels() {
        let (program, output) = analyze(
            "let counter: byte = 0;\n\
             function pure_add(a: byte, b: byte): byte { return a + b; }\n\
             function reads(): byte { return counter; }\n\
             function writes(): void { counter = 1; }\n\
             function hardware(): void { poke(0xD020, 0); }\n\
             function caller(): void { hardware(); }",
        );

        let func_id = |name: &str| {
            program
                .declarations
                .iter()
                .find_map(|d| match d {
                    Declaration::Function(f) if f.name.name == name => Some(f.id),
                    _ => None,
                })
                .unwrap()
        };
        let level =
            |name: &str| output.metadata.get_str(func_id(name), MetaKey::PurityLevel).unwrap().to_string();

        assert_eq!(level("pure_add"), "Pure");
        assert_eq!(level("reads"), "ReadOnly");
        assert_eq!(level("writes"), "LocalEffects");
        assert_eq!(level("hardware"), "Impure");
        // Impurity propagates to callers
        assert_eq!(level("caller"), "Impure");

        // Written locations recorded
        let written = output
            .metadata
            .get(func_id("writes"), MetaKey::PurityWrittenLocations)
            .and_then(MetaValue::as_names)
            .unwrap();
        assert_eq!(written, ["counter"]);
    }

    #[test]
    fn test_loop_invariant_marking() {
        let (program, output) = analyze(
            "function f(n: byte): void {\n\
             let total: byte = 0;\n\
             for i = 0 to 10 {\n\
             let step: byte = n + 1;\n\
             total = total + step;\n\
             }\n\
             }",
        );

        // `n + 1` is invariant (n never written in the body)
        let mut step_init = None;
        let mut total_value = None;
        for func in program.functions() {
            blend65_parser::ast::visitor::walk_stmts(&func.body, &mut |stmt| match stmt {
                Statement::Let(var) if var.name.name == "step" => {
                    step_init = var.init.as_ref().map(|e| e.id);
                }
                Statement::Assign(assign) => {
                    total_value = Some(assign.value.id);
                }
                _ => {}
            });
        }
        assert_eq!(
            output
                .metadata
                .get_bool(step_init.unwrap(), MetaKey::LoopInvariant),
            Some(true)
        );
        // `total + step` is not invariant: both change in the body
        assert_eq!(
            output
                .metadata
                .get_bool(total_value.unwrap(), MetaKey::LoopInvariant),
            None
        );
    }

    #[test]
    fn test_complexity_scores() {
        let (program, output) = analyze(
            "function f(arr: byte[4], a: byte, b: byte): void { let x: byte = arr[a + b]; }",
        );
        let mut init = None;
        for func in program.functions() {
            blend65_parser::ast::visitor::walk_stmts(&func.body, &mut |stmt| {
                if let Statement::Let(var) = stmt {
                    init = var.init.as_ref().map(|e| e.id);
                }
            });
        }
        let init = init.unwrap();
        assert_eq!(
            output.metadata.get_bool(init, MetaKey::ExprContainsMemoryAccess),
            Some(true)
        );
        let depth = output.metadata.get_int(init, MetaKey::ExprTreeDepth).unwrap();
        assert!(depth >= 3);
        let pressure = output
            .metadata
            .get_int(init, MetaKey::ExprRegisterPressure)
            .unwrap();
        assert!((1..=3).contains(&pressure));
    }

    #[test]
    fn test_tier3_disabled() {
        let source = "function f(): void { let a: byte = 1; let x: byte = a + a; }";
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty());
        let (mut bindings, _) = Binder::new(&program).bind();
        let (types, _) = TypeChecker::new(&program, &mut bindings).check();
        let output = AnalysisPipeline::new(AnalysisConfig { run_advanced: false })
            .run(&program, &bindings, &types);

        let has_gvn = output
            .metadata
            .snapshot()
            .iter()
            .any(|(_, key, _)| key.contains("GVN"));
        assert!(!has_gvn);
    }

    #[test]
    fn test_orchestrator_idempotence() {
        let source = "function f(a: byte, b: byte): byte {\n\
                      let x: byte = a + b;\n\
                      let y: byte = a + b;\n\
                      return y;\n\
                      }";
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty());
        let (mut bindings, _) = Binder::new(&program).bind();
        let (types, _) = TypeChecker::new(&program, &mut bindings).check();

        let pipeline = AnalysisPipeline::new(AnalysisConfig::default());
        let first = pipeline.run(&program, &bindings, &types);
        let second = pipeline.run(&program, &bindings, &types);

        assert_eq!(first.metadata.snapshot(), second.metadata.snapshot());
        assert_eq!(first.diagnostics, second.diagnostics);
    }
}
