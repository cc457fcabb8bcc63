//! Blend65 code generation: AST→IL lowering plus the O0 optimizer.

pub mod error;
pub mod ilgen;
pub mod optimize;

pub use error::{CompileError, CompileResult};
pub use ilgen::IlGenerator;
pub use optimize::{DeadConstElimination, IntrinsicLowering, OptLevel, Optimizer, Pass};

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_checker::{Binder, TypeChecker};
    use blend65_il::{verify_module, IlModule, IlType, InstrKind, SsaBuilder, StorageClass};
    use blend65_parser::Parser;

    fn lower(source: &str) -> IlModule {
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        let (mut bindings, bind_diags) = Binder::new(&program).bind();
        assert!(
            !bind_diags.iter().any(|d| d.is_error()),
            "bind errors: {:?}",
            bind_diags
        );
        let (types, check_diags) = TypeChecker::new(&program, &mut bindings).check();
        assert!(
            !check_diags.iter().any(|d| d.is_error()),
            "check errors: {:?}",
            check_diags
        );
        let (module, errors) = IlGenerator::new(&program, &bindings, &types).generate();
        assert!(errors.is_empty(), "lowering errors: {:?}", errors);
        module
    }

    fn lower_ssa_optimized(source: &str) -> IlModule {
        let mut module = lower(source);
        for func in module.functions_mut() {
            SsaBuilder::new().build(func);
        }
        let report = verify_module(&module);
        assert!(report.is_valid(), "pre-opt verify: {:?}", report.errors);

        Optimizer::new(OptLevel::O0).run(&mut module);

        let report = verify_module(&module);
        assert!(report.is_valid(), "post-opt verify: {:?}", report.errors);
        module
    }

    fn all_instrs(module: &IlModule) -> Vec<&InstrKind> {
        module
            .functions()
            .iter()
            .flat_map(|f| f.blocks())
            .flat_map(|b| b.instructions.iter().map(|i| &i.kind))
            .collect()
    }

    #[test]
    fn test_globals_and_exports() {
        let module = lower(
            "module demo;\n\
             export let score: word = 100;\n\
             const LIMIT: byte = 10;\n\
             @map border: byte = 0xD020;\n\
             @zp ptr: word = 0x10;\n\
             enum Color { Black = 0, White }",
        );
        assert_eq!(module.name, "demo");

        let score = module.global("score").unwrap();
        assert_eq!(score.storage, StorageClass::Ram);
        assert_eq!(score.initial, Some(100));

        let limit = module.global("LIMIT").unwrap();
        assert_eq!(limit.storage, StorageClass::ImmediateConstant);

        let border = module.global("border").unwrap();
        assert_eq!(border.storage, StorageClass::Map);
        assert_eq!(border.address, Some(0xD020));

        let zp = module.global("ptr").unwrap();
        assert_eq!(zp.storage, StorageClass::ZeroPage);

        let white = module.global("White").unwrap();
        assert_eq!(white.initial, Some(1));

        assert!(module.exports.iter().any(|e| e.local_name == "score"));
    }

    #[test]
    fn test_byte_word_promotion_in_il() {
        let module = lower(
            "function f(): word { let b: byte = 100; let w: word = b + 1000; return w; }",
        );
        let instrs = all_instrs(&module);
        // The addition is word-typed, with a zero-extension of the byte
        assert!(instrs
            .iter()
            .any(|k| matches!(k, InstrKind::ZeroExtend { .. })));
        let func = module.function("f").unwrap();
        let add_ty = func
            .blocks()
            .flat_map(|b| &b.instructions)
            .find_map(|i| match &i.kind {
                InstrKind::Binary { .. } => i.result.as_ref().map(|r| r.ty),
                _ => None,
            })
            .expect("no binary instruction");
        assert_eq!(add_ty, IlType::Word);
    }

    #[test]
    fn test_void_function_gets_implicit_return() {
        let module = lower("function f(): void { }");
        let func = module.function("f").unwrap();
        let entry = func.block(func.entry_block());
        assert!(matches!(
            entry.terminator,
            Some(blend65_il::Terminator::Return { value: None })
        ));
    }

    #[test]
    fn test_peek_constant_lowered_to_hardware_read() {
        let module =
            lower_ssa_optimized("function f(): byte { let x: byte = peek(0xD020); return x; }");
        let instrs = all_instrs(&module);

        assert!(
            instrs
                .iter()
                .any(|k| matches!(k, InstrKind::HardwareRead { addr: 0xD020 })),
            "expected HardwareRead(0xD020), got: {:?}",
            instrs
        );
        assert!(
            !instrs.iter().any(|k| matches!(k, InstrKind::Peek { .. })),
            "peek survived lowering"
        );
        // The address constant was swept
        assert!(
            !instrs
                .iter()
                .any(|k| matches!(k, InstrKind::Const { value: 0xD020 })),
            "dead address constant survived"
        );
    }

    #[test]
    fn test_peek_dynamic_address_stays_generic() {
        let module =
            lower_ssa_optimized("function f(a: word): byte { return peek(a); }");
        let instrs = all_instrs(&module);
        assert!(instrs.iter().any(|k| matches!(k, InstrKind::Peek { .. })));
        assert!(!instrs
            .iter()
            .any(|k| matches!(k, InstrKind::HardwareRead { .. })));
    }

    #[test]
    fn test_pokew_splits_little_endian() {
        let module =
            lower_ssa_optimized("function f(v: word): void { pokew(0xC000, v); }");
        let instrs = all_instrs(&module);

        let writes: Vec<u16> = instrs
            .iter()
            .filter_map(|k| match k {
                InstrKind::HardwareWrite { addr, .. } => Some(*addr),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![0xC000, 0xC001]);
        assert!(instrs
            .iter()
            .any(|k| matches!(k, InstrKind::Truncate { .. })));
        assert!(!instrs.iter().any(|k| matches!(k, InstrKind::PokeW { .. })));
    }

    #[test]
    fn test_peekw_combines_little_endian() {
        let module =
            lower_ssa_optimized("function f(): word { return peekw(0xC000); }");
        let instrs = all_instrs(&module);

        let reads: Vec<u16> = instrs
            .iter()
            .filter_map(|k| match k {
                InstrKind::HardwareRead { addr } => Some(*addr),
                _ => None,
            })
            .collect();
        assert_eq!(reads, vec![0xC000, 0xC001]);
        // Combine: zext, shift, or
        assert!(instrs
            .iter()
            .any(|k| matches!(k, InstrKind::Binary { op: blend65_il::BinOp::Shl, .. })));
        assert!(instrs
            .iter()
            .any(|k| matches!(k, InstrKind::Binary { op: blend65_il::BinOp::Or, .. })));
    }

    #[test]
    fn test_memory_mapped_assignment() {
        let module = lower(
            "@map border: byte = 0xD020;\n\
             function f(): void { border = 3; }",
        );
        let instrs = all_instrs(&module);
        assert!(instrs
            .iter()
            .any(|k| matches!(k, InstrKind::HardwareWrite { addr: 0xD020, .. })));
    }

    #[test]
    fn test_control_flow_lowering_verifies() {
        let module = lower_ssa_optimized(
            "function f(n: byte): byte {\n\
             let total: byte = 0;\n\
             for i = 0 to 10 {\n\
             if i < n { total += i; } else { total += 1; }\n\
             }\n\
             while total > 100 { total -= 1; }\n\
             return total;\n\
             }",
        );
        let func = module.function("f").unwrap();
        assert!(func.block_count() >= 8);
    }

    #[test]
    fn test_short_circuit_evaluation() {
        let module = lower_ssa_optimized(
            "function f(a: bool, b: bool): byte {\n\
             if a && b { return 1; }\n\
             if a || b { return 2; }\n\
             return 0;\n\
             }",
        );
        // Each logical operator becomes a diamond; the function verifies
        let func = module.function("f").unwrap();
        assert!(func.block_count() >= 7);
    }

    #[test]
    fn test_intrinsic_folding() {
        let module = lower(
            "function f(arr: byte[8]): word {\n\
             let a: word = sizeof(word);\n\
             let b: word = length(arr);\n\
             return a + b;\n\
             }",
        );
        let instrs = all_instrs(&module);
        assert!(instrs
            .iter()
            .any(|k| matches!(k, InstrKind::Const { value: 2 })));
        assert!(instrs
            .iter()
            .any(|k| matches!(k, InstrKind::Const { value: 8 })));
    }

    #[test]
    fn test_calls_lower_with_coercion() {
        let module = lower(
            "function wide(w: word): word { return w; }\n\
             function f(): word { return wide(5); }",
        );
        let func = module.function("f").unwrap();
        let has_call = func
            .blocks()
            .flat_map(|b| &b.instructions)
            .any(|i| matches!(&i.kind, InstrKind::Call { callee, .. } if callee == "wide"));
        assert!(has_call);
        // The byte literal 5 widens to word before the call
        let has_zext = func
            .blocks()
            .flat_map(|b| &b.instructions)
            .any(|i| matches!(i.kind, InstrKind::ZeroExtend { .. }));
        assert!(has_zext);
    }
}
