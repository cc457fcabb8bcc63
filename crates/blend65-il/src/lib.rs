//! Blend65 intermediate language.
//!
//! A strongly-typed three-address instruction set organized into
//! modules, functions, and basic blocks over typed virtual registers,
//! plus SSA construction (dominator tree, phi insertion, renaming) and a
//! pure SSA verifier.

pub mod block;
pub mod dom;
pub mod function;
pub mod instr;
pub mod module;
pub mod pretty;
pub mod ssa;
pub mod value;
pub mod verify;

pub use block::{BasicBlock, BlockId};
pub use dom::DominatorTree;
pub use function::IlFunction;
pub use instr::{BinOp, CmpOp, InstrId, InstrKind, Instruction, Terminator};
pub use module::{ExportKind, IlExport, IlGlobal, IlImport, IlModule, StorageClass};
pub use ssa::{SsaBuilder, SsaStats};
pub use value::{IlType, Register, RegisterId};
pub use verify::{verify_function, verify_module, VerifyError, VerifyReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssa_roundtrip_verifies() {
        // Build a diamond with a variable, convert to SSA, verify
        let mut func = IlFunction::new("f", IlType::Byte);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        let b2 = func.create_block(None);
        let b3 = func.create_block(None);

        let cond = func.emit(b0, InstrKind::ConstBool { value: true }, Some(IlType::Bool));
        func.set_terminator(
            b0,
            Terminator::CondBranch {
                cond: cond.unwrap(),
                then_block: b1,
                else_block: b2,
            },
        );
        let a = func.emit(b1, InstrKind::Const { value: 1 }, Some(IlType::Byte));
        func.emit(
            b1,
            InstrKind::StoreVar {
                name: "v".into(),
                value: a.unwrap(),
            },
            None,
        );
        func.set_terminator(b1, Terminator::Branch { target: b3 });
        let b = func.emit(b2, InstrKind::Const { value: 2 }, Some(IlType::Byte));
        func.emit(
            b2,
            InstrKind::StoreVar {
                name: "v".into(),
                value: b.unwrap(),
            },
            None,
        );
        func.set_terminator(b2, Terminator::Branch { target: b3 });
        let v = func.emit(b3, InstrKind::LoadVar { name: "v".into() }, Some(IlType::Byte));
        func.set_terminator(b3, Terminator::Return { value: v });

        let stats = SsaBuilder::new().build(&mut func);
        assert_eq!(stats.phis_inserted, 1);

        let report = verify_function(&func);
        assert!(report.is_valid(), "verifier errors: {:?}", report.errors);
        assert!(report.dominance_checks > 0);
    }

    #[test]
    fn test_pretty_print_contains_structure() {
        let mut func = IlFunction::new("demo", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        func.emit(b0, InstrKind::HardwareRead { addr: 0xD020 }, Some(IlType::Byte));
        func.set_terminator(b0, Terminator::Return { value: None });

        let text = pretty::function_to_string(&func);
        assert!(text.contains("fn demo"));
        assert!(text.contains("hw.read 0xD020"));
        assert!(text.contains("ret"));
    }
}
