//! End-to-end pipeline scenarios.

use blend65_driver::{compile, CompileOptions, Target};
use blend65_il::InstrKind;
use blend65_parser::{DiagnosticCode, Severity};

fn compile_one(source: &str) -> blend65_driver::CompileOutput {
    compile(&[("main", source)], &CompileOptions::default())
}

#[test]
fn test_byte_word_promotion() {
    let output = compile_one(
        "function f(): void { let b: byte = 100; let w: word = b + 1000; }",
    );
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);
    assert!(output.diagnostics.is_empty());
    assert_eq!(output.il.len(), 1);
}

#[test]
fn test_narrowing_rejected_but_pipeline_continues() {
    let output = compile_one(
        "function f(): void { let w: word = 1000; let b: byte = w; }",
    );
    assert!(!output.success);

    let errors: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, DiagnosticCode::TypeMismatch);

    // The analysis phase still ran after checking failed
    let phases: Vec<&str> = output
        .phase_timings
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert!(phases.contains(&"analysis"));
    // Lowering did not
    assert!(!phases.contains(&"ilgen"));
}

#[test]
fn test_dead_code_after_return_warns() {
    let output = compile_one("function f(): void { return; let x: byte = 1; }");
    assert!(output.success, "warnings never fail a build");
    let warnings: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::UnreachableCode)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
}

#[test]
fn test_peek_lowering_end_to_end() {
    let output = compile_one("function f(): byte { let x: byte = peek(0xD020); return x; }");
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);

    let instrs: Vec<&InstrKind> = output.il[0]
        .functions()
        .iter()
        .flat_map(|f| f.blocks())
        .flat_map(|b| b.instructions.iter().map(|i| &i.kind))
        .collect();

    assert!(instrs
        .iter()
        .any(|k| matches!(k, InstrKind::HardwareRead { addr: 0xD020 })));
    assert!(!instrs.iter().any(|k| matches!(k, InstrKind::Peek { .. })));
    assert!(!instrs
        .iter()
        .any(|k| matches!(k, InstrKind::Const { value: 0xD020 })));
}

#[test]
fn test_unused_import_hint() {
    let output = compile(
        &[
            (
                "main",
                "module main;\nimport helper from util;\nfunction f(): void { }",
            ),
            (
                "util",
                "module util;\nexport function helper(): void { }",
            ),
        ],
        &CompileOptions::default(),
    );
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);

    let hints: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::UnusedImport)
        .collect();
    assert_eq!(hints.len(), 1);
    assert_eq!(hints[0].severity, Severity::Hint);
    assert!(hints[0].message.contains("helper"));
}

#[test]
fn test_wildcard_import_resolves_exports() {
    let output = compile(
        &[
            (
                "main",
                "module main;\nimport * from util;\nfunction f(): byte { return twice(2); }",
            ),
            (
                "util",
                "module util;\nexport function twice(v: byte): byte { return v + v; }",
            ),
        ],
        &CompileOptions::default(),
    );
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);
}

#[test]
fn test_module_not_found() {
    let output = compile_one("module main;\nimport helper from missing.module;");
    assert!(!output.success);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::ModuleNotFound));
}

#[test]
fn test_parse_failure_skips_semantic_phases() {
    let output = compile_one("function f(: void {");
    assert!(!output.success);
    let phases: Vec<&str> = output
        .phase_timings
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(phases, vec!["parse"]);
    assert!(output.il.is_empty());
}

#[test]
fn test_ssa_stats_collected() {
    let options = CompileOptions::default().with_ssa_stats(true);
    let output = compile(
        &[(
            "main",
            "function f(c: bool): byte {\n\
             let x: byte = 0;\n\
             if c { x = 1; } else { x = 2; }\n\
             return x;\n\
             }",
        )],
        &options,
    );
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);
    let stats = output.ssa_stats.expect("stats requested");
    assert!(stats.phis_inserted >= 1);
    assert!(stats.registers_renamed >= 3);
    assert!(stats.dominance_checks > 0);
}

#[test]
fn test_asm_stream_produced() {
    let output = compile(
        &[(
            "main",
            "export function start(): void { poke(0xD020, 0); }\nlet lives: byte = 3;",
        )],
        &CompileOptions::default().with_target(Target::C64),
    );
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);

    let asm = output.asm.expect("assembly stream");
    assert_eq!(asm.label_address("start"), Some(0x0801));
    let text = asm.to_text();
    assert!(text.contains("start:"));
    assert!(text.contains("lives:"));
    assert!(text.contains("RTS"));
}

#[test]
fn test_phase_timings_recorded() {
    let output = compile_one("function f(): void { }");
    assert!(output.success);
    let names: Vec<&str> = output
        .phase_timings
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "parse",
            "imports",
            "symbols+types",
            "analysis",
            "ilgen",
            "ssa",
            "verify-ssa",
            "optimize",
            "verify-ssa-post-opt",
            "asm"
        ]
    );
    assert!(output.phase_timings.iter().all(|p| p.success));
}

#[test]
fn test_module_name_override() {
    let options = CompileOptions::default().with_module_name("game");
    let output = compile(&[("main", "let x: byte = 1;")], &options);
    assert!(output.success);
    assert_eq!(output.il[0].name, "game");
}

#[test]
fn test_hints_never_fail_the_build() {
    let output = compile_one("function f(): void { let unused: byte = 1; }");
    assert!(output.success);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::UnusedVariable));
}

#[test]
fn test_use_before_init_is_an_error() {
    let output = compile_one("function f(): void { let x: byte; let y: byte = x; }");
    assert!(!output.success);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::UseBeforeInit));
}

#[test]
fn test_readme_example_compiles() {
    let source = "@map border: byte = 0xD020;\n\
                  export function start(): void {\n\
                  border = 0;\n\
                  for i = 0 to 7 {\n\
                  poke(0x0400 + i, 32);\n\
                  }\n\
                  }";
    let output = compile(
        &[("main", source)],
        &CompileOptions::default().with_target(Target::C64),
    );
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);
}

#[test]
fn test_o0_roundtrip_verifies() {
    // A program exercising loops, calls, intrinsics and casts survives
    // lowering, SSA, O0 and both verifier runs
    let output = compile_one(
        "@map border: byte = 0xD020;\n\
         const SPEED: byte = 2;\n\
         function clamp(v: word): byte {\n\
         if v > 255 { return 255; }\n\
         return v as byte;\n\
         }\n\
         function start(): void {\n\
         let total: word = 0;\n\
         for i = 0 to 100 {\n\
         total += SPEED;\n\
         }\n\
         border = clamp(total);\n\
         }",
    );
    assert!(output.success, "diagnostics: {:?}", output.diagnostics);
    assert!(output
        .phase_timings
        .iter()
        .filter(|p| p.name.starts_with("verify-ssa"))
        .all(|p| p.success));
}
