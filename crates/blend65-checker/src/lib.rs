//! Blend65 semantic analysis: symbol tables, module/import resolution,
//! and type checking.
//!
//! The flow mirrors the pipeline: [`Binder`] builds the scope tree and
//! declares every symbol, [`ImportResolver`] links modules through the
//! [`ModuleRegistry`], and [`TypeChecker`] resolves and verifies types,
//! producing the per-expression type table the IL generator consumes.

pub mod binder;
pub mod check;
pub mod consteval;
pub mod imports;
pub mod registry;
pub mod symbols;

pub use binder::{Binder, Bindings};
pub use check::{intrinsic_signature, CheckResult, TypeChecker, INTRINSICS};
pub use imports::{detect_unused_imports, ImportResolver};
pub use registry::{ModuleRegistry, ResolvedImport};
pub use symbols::{
    Declared, Scope, ScopeError, ScopeId, ScopeKind, Symbol, SymbolFlags, SymbolId, SymbolKind,
    SymbolPayload, SymbolTable,
};

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_parser::ast::Declaration;
    use blend65_parser::{DiagnosticCode, Parser};
    use blend65_types::Type;

    fn check(source: &str) -> (Bindings, CheckResult, Vec<blend65_parser::Diagnostic>) {
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        let (mut bindings, mut diags) = Binder::new(&program).bind();
        let (result, check_diags) = TypeChecker::new(&program, &mut bindings).check();
        diags.extend(check_diags);
        (bindings, result, diags)
    }

    #[test]
    fn test_byte_widens_in_word_context() {
        let (bindings, result, diags) =
            check("function f(): void { let b: byte = 100; let w: word = b + 1000; }");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);

        let b = bindings
            .table
            .all_symbols()
            .find(|s| s.name == "b")
            .unwrap();
        assert_eq!(b.ty, Some(Type::Byte));

        // The initializer `b + 1000` types as word
        let word_exprs = result
            .expr_types
            .values()
            .filter(|t| **t == Type::Word)
            .count();
        assert!(word_exprs >= 1);
    }

    #[test]
    fn test_narrowing_rejected() {
        let (_, _, diags) =
            check("function f(): void { let w: word = 1000; let b: byte = w; }");
        let errors: Vec<_> = diags.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, DiagnosticCode::TypeMismatch);
        assert!(errors[0].message.contains("explicit cast"));
    }

    #[test]
    fn test_compound_narrowing_rejected() {
        let (_, _, diags) = check(
            "function f(): void { let b: byte = 1; let w: word = 1000; b += w; }",
        );
        assert!(diags
            .iter()
            .any(|d| d.code == DiagnosticCode::NarrowingConversionRequired));
    }

    #[test]
    fn test_explicit_cast_allows_narrowing() {
        let (_, _, diags) =
            check("function f(): void { let w: word = 1000; let b: byte = w as byte; }");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_bool_is_distinct() {
        let (_, _, diags) = check("function f(): void { let b: byte = true; }");
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::TypeMismatch));

        let (_, _, diags) = check("function f(): void { if 1 { } }");
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::TypeMismatch));
    }

    #[test]
    fn test_undefined_symbol() {
        let (_, _, diags) = check("function f(): void { let x: byte = missing; }");
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::UndefinedSymbol));
    }

    #[test]
    fn test_errors_do_not_cascade() {
        // One bad declaration; uses of it stay quiet through `unknown`
        let (_, _, diags) =
            check("function f(): void { let x: sprite = 0; let y: byte = x + 1; }");
        let errors: Vec<_> = diags.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, DiagnosticCode::UnknownType);
    }

    #[test]
    fn test_call_checking() {
        let (_, _, diags) = check(
            "function add(a: byte, b: byte): byte { return a + b; }\n\
             function go(): void { let x: byte = add(1, 2); }",
        );
        assert!(diags.is_empty(), "{:?}", diags);

        let (_, _, diags) = check(
            "function add(a: byte, b: byte): byte { return a + b; }\n\
             function go(): void { let x: byte = add(1); }",
        );
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::TypeMismatch));
    }

    #[test]
    fn test_intrinsic_types() {
        let (_, _, diags) = check(
            "function f(): void {\n\
             let x: byte = peek(0xD020);\n\
             poke(0xD020, x);\n\
             let w: word = peekw(0xC000);\n\
             let l: byte = lo(w);\n\
             }",
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_missing_return() {
        let (_, _, diags) = check("function f(): byte { let x: byte = 1; }");
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::MissingReturn));

        let (_, _, diags) = check(
            "function f(b: bool): byte { if b { return 1; } else { return 2; } }",
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_break_outside_loop() {
        let (_, _, diags) = check("function f(): void { break; }");
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::InvalidBreak));
    }

    #[test]
    fn test_const_not_assignable() {
        let (_, _, diags) =
            check("const LIMIT: byte = 10;\nfunction f(): void { LIMIT = 2; }");
        assert!(diags
            .iter()
            .any(|d| d.code == DiagnosticCode::InvalidOperandType));
    }

    #[test]
    fn test_for_variable_width() {
        let (bindings, _, diags) =
            check("function f(): void { for i = 0 to 1000 { } }");
        assert!(diags.is_empty(), "{:?}", diags);
        let i = bindings
            .table
            .all_symbols()
            .find(|s| s.name == "i")
            .unwrap();
        assert_eq!(i.ty, Some(Type::Word));
    }

    #[test]
    fn test_enum_member_usage() {
        let (_, _, diags) = check(
            "enum Color { Black = 0, White = 1 }\n\
             function f(): void { let c: byte = Color.White; let d: byte = Black; }",
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_pointer_and_index() {
        let (_, _, diags) = check(
            "function f(p: *byte, arr: byte[4]): void {\n\
             let v: byte = *p;\n\
             let e: byte = arr[2];\n\
             let n: word = length(arr);\n\
             }",
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_program_helpers() {
        let (program, errors) = Parser::new(
            "module demo;\nexport function f(): void { }\nlet g: byte = 0;",
            "demo",
        )
        .parse();
        assert!(errors.is_empty());
        assert_eq!(program.module_name(), "demo");
        assert_eq!(program.functions().count(), 1);
        assert!(matches!(program.declarations[1], Declaration::Variable(_)));
    }
}
