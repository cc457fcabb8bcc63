//! SSA verification.
//!
//! A pure pass over one function: collects the single definition and all
//! uses of every register, then checks the SSA invariants. It never
//! mutates the function. Unreachable blocks are exempt from dominance
//! checks; they cannot execute.

use crate::block::BlockId;
use crate::dom::DominatorTree;
use crate::function::IlFunction;
use crate::instr::{InstrId, InstrKind};
use crate::module::IlModule;
use crate::value::RegisterId;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// SSA invariant violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    #[error("register {register} is defined more than once ({first} and {second})")]
    MultipleDefinitions {
        register: RegisterId,
        first: InstrId,
        second: InstrId,
    },

    #[error("register {register} is used at {instr} but never defined")]
    UseBeforeDefinition {
        register: RegisterId,
        instr: InstrId,
    },

    #[error("use of {register} in {use_block} is not dominated by its definition in {def_block}")]
    DominanceViolation {
        register: RegisterId,
        def_block: BlockId,
        use_block: BlockId,
    },

    #[error("phi {instr} appears after non-phi instructions in {block}")]
    PhiNotAtBlockStart { instr: InstrId, block: BlockId },

    #[error("phi {instr} appears in the entry block")]
    PhiInEntryBlock { instr: InstrId },

    #[error("phi {instr} has no operand for predecessor {pred}")]
    PhiMissingOperand { instr: InstrId, pred: BlockId },

    #[error("phi {instr} has {actual} operands but {expected} predecessors")]
    PhiOperandCountMismatch {
        instr: InstrId,
        expected: usize,
        actual: usize,
    },

    #[error("phi {instr} names {named} which is not a predecessor of {block}")]
    PhiInvalidPredecessor {
        instr: InstrId,
        named: BlockId,
        block: BlockId,
    },

    #[error("structural error: {0}")]
    Structural(String),
}

/// Verification outcome plus the counters `collect_ssa_stats` reports.
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub errors: Vec<VerifyError>,
    pub dominance_checks: u32,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Where a register is defined.
#[derive(Debug, Clone, Copy)]
enum DefSite {
    /// Function parameter: defined before the entry block runs
    Param,
    Instr {
        block: BlockId,
        index: usize,
        id: InstrId,
    },
}

/// Verify one function.
pub fn verify_function(func: &IlFunction) -> VerifyReport {
    let mut report = VerifyReport::default();

    if let Err(message) = func.validate_structure() {
        report.errors.push(VerifyError::Structural(message));
        return report;
    }

    let dom = DominatorTree::compute(func);
    let entry = func.entry_block();

    // Collect definitions
    let mut defs: FxHashMap<RegisterId, DefSite> = FxHashMap::default();
    for (_, param) in &func.params {
        defs.insert(param.id, DefSite::Param);
    }
    for block in func.blocks() {
        for (index, instr) in block.instructions.iter().enumerate() {
            if let Some(result) = &instr.result {
                match defs.get(&result.id) {
                    Some(DefSite::Instr { id: first, .. }) => {
                        report.errors.push(VerifyError::MultipleDefinitions {
                            register: result.id,
                            first: *first,
                            second: instr.id,
                        });
                    }
                    Some(DefSite::Param) => {
                        report.errors.push(VerifyError::MultipleDefinitions {
                            register: result.id,
                            first: instr.id,
                            second: instr.id,
                        });
                    }
                    None => {
                        defs.insert(
                            result.id,
                            DefSite::Instr {
                                block: block.id,
                                index,
                                id: instr.id,
                            },
                        );
                    }
                }
            }
        }
    }

    // Phi placement and operand shape
    for block in func.blocks() {
        let phi_prefix = block.phi_count();
        for (index, instr) in block.instructions.iter().enumerate() {
            let InstrKind::Phi { sources } = &instr.kind else {
                continue;
            };
            if block.id == entry {
                report
                    .errors
                    .push(VerifyError::PhiInEntryBlock { instr: instr.id });
            }
            if index >= phi_prefix {
                report.errors.push(VerifyError::PhiNotAtBlockStart {
                    instr: instr.id,
                    block: block.id,
                });
            }
            if sources.len() != block.preds.len() {
                report.errors.push(VerifyError::PhiOperandCountMismatch {
                    instr: instr.id,
                    expected: block.preds.len(),
                    actual: sources.len(),
                });
            }
            for (named, _) in sources {
                if !block.preds.contains(named) {
                    report.errors.push(VerifyError::PhiInvalidPredecessor {
                        instr: instr.id,
                        named: *named,
                        block: block.id,
                    });
                }
            }
            for pred in &block.preds {
                if !sources.iter().any(|(named, _)| named == pred) {
                    report.errors.push(VerifyError::PhiMissingOperand {
                        instr: instr.id,
                        pred: *pred,
                    });
                }
            }
        }
    }

    // Uses: dominance of definition over every use
    for block in func.blocks() {
        let block_reachable = dom.is_reachable(block.id);
        for (index, instr) in block.instructions.iter().enumerate() {
            if let InstrKind::Phi { sources } = &instr.kind {
                // Operand from predecessor P must be defined in a block
                // dominating P (P itself included)
                for (pred, reg) in sources {
                    match defs.get(&reg.id) {
                        None => report.errors.push(VerifyError::UseBeforeDefinition {
                            register: reg.id,
                            instr: instr.id,
                        }),
                        Some(DefSite::Param) => {}
                        Some(DefSite::Instr {
                            block: def_block, ..
                        }) => {
                            if !dom.is_reachable(*pred) {
                                continue;
                            }
                            report.dominance_checks += 1;
                            if !dom.dominates(*def_block, *pred) {
                                report.errors.push(VerifyError::DominanceViolation {
                                    register: reg.id,
                                    def_block: *def_block,
                                    use_block: *pred,
                                });
                            }
                        }
                    }
                }
                continue;
            }

            for reg in instr.used_registers() {
                check_use(
                    &mut report,
                    &defs,
                    &dom,
                    reg.id,
                    instr.id,
                    block.id,
                    index,
                    block_reachable,
                );
            }
        }

        if let Some(terminator) = &block.terminator {
            let index = block.instructions.len();
            for reg in terminator.used_registers() {
                // Terminator uses behave like a use at the end of the block
                let instr_id = block
                    .instructions
                    .last()
                    .map(|i| i.id)
                    .unwrap_or(InstrId::new(u32::MAX));
                check_use(
                    &mut report,
                    &defs,
                    &dom,
                    reg.id,
                    instr_id,
                    block.id,
                    index,
                    block_reachable,
                );
            }
        }
    }

    report
}

#[allow(clippy::too_many_arguments)]
fn check_use(
    report: &mut VerifyReport,
    defs: &FxHashMap<RegisterId, DefSite>,
    dom: &DominatorTree,
    register: RegisterId,
    instr: InstrId,
    use_block: BlockId,
    use_index: usize,
    block_reachable: bool,
) {
    match defs.get(&register) {
        None => report.errors.push(VerifyError::UseBeforeDefinition { register, instr }),
        Some(DefSite::Param) => {}
        Some(DefSite::Instr {
            block: def_block,
            index: def_index,
            ..
        }) => {
            if *def_block == use_block {
                // Textual order within a block is strict
                if *def_index >= use_index {
                    report.errors.push(VerifyError::UseBeforeDefinition { register, instr });
                }
            } else if block_reachable {
                report.dominance_checks += 1;
                if !dom.dominates(*def_block, use_block) {
                    report.errors.push(VerifyError::DominanceViolation {
                        register,
                        def_block: *def_block,
                        use_block,
                    });
                }
            }
        }
    }
}

/// Verify every function of a module.
pub fn verify_module(module: &IlModule) -> VerifyReport {
    let mut report = VerifyReport::default();
    for func in module.functions() {
        let mut partial = verify_function(func);
        report.errors.append(&mut partial.errors);
        report.dominance_checks += partial.dominance_checks;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{InstrKind, Instruction, Terminator};
    use crate::value::{IlType, Register};

    #[test]
    fn test_valid_straight_line() {
        let mut func = IlFunction::new("f", IlType::Byte);
        let b0 = func.create_block(Some("entry"));
        let value = func.emit(b0, InstrKind::Const { value: 7 }, Some(IlType::Byte));
        func.set_terminator(b0, Terminator::Return { value });
        let report = verify_function(&func);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn test_multiple_definitions_detected() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let reg = func.create_register(IlType::Byte);
        let id1 = func.next_instr_id();
        let id2 = func.next_instr_id();
        func.block_mut(b0).append(Instruction::new(
            id1,
            InstrKind::Const { value: 1 },
            Some(reg.clone()),
        ));
        func.block_mut(b0).append(Instruction::new(
            id2,
            InstrKind::Const { value: 2 },
            Some(reg),
        ));
        func.set_terminator(b0, Terminator::Return { value: None });

        let report = verify_function(&func);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::MultipleDefinitions { .. })));
    }

    #[test]
    fn test_use_before_definition_same_block() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let reg = func.create_register(IlType::Byte);
        let use_result = func.create_register(IlType::Byte);
        let id_use = func.next_instr_id();
        let id_def = func.next_instr_id();
        // Use first, then definition
        func.block_mut(b0).append(Instruction::new(
            id_use,
            InstrKind::Not { value: reg.clone() },
            Some(use_result),
        ));
        func.block_mut(b0).append(Instruction::new(
            id_def,
            InstrKind::Const { value: 1 },
            Some(reg),
        ));
        func.set_terminator(b0, Terminator::Return { value: None });

        let report = verify_function(&func);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::UseBeforeDefinition { .. })));
    }

    #[test]
    fn test_dominance_violation_across_blocks() {
        // b0 branches to b1 or b2; a value defined in b1 is used in b2
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        let b2 = func.create_block(None);

        let cond = func.emit(b0, InstrKind::ConstBool { value: true }, Some(IlType::Bool));
        func.set_terminator(
            b0,
            Terminator::CondBranch {
                cond: cond.unwrap(),
                then_block: b1,
                else_block: b2,
            },
        );

        let defined_in_b1 = func.emit(b1, InstrKind::Const { value: 3 }, Some(IlType::Byte));
        func.set_terminator(b1, Terminator::Return { value: None });

        func.emit(
            b2,
            InstrKind::Not {
                value: defined_in_b1.unwrap(),
            },
            Some(IlType::Byte),
        );
        func.set_terminator(b2, Terminator::Return { value: None });

        let report = verify_function(&func);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::DominanceViolation { .. })));
    }

    #[test]
    fn test_phi_in_entry_block_rejected() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let id = func.next_instr_id();
        let result = func.create_register(IlType::Byte);
        func.block_mut(b0).append(Instruction::new(
            id,
            InstrKind::Phi {
                sources: Vec::new(),
            },
            Some(result),
        ));
        func.set_terminator(b0, Terminator::Return { value: None });

        let report = verify_function(&func);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::PhiInEntryBlock { .. })));
    }

    #[test]
    fn test_phi_operand_checks() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        let b2 = func.create_block(None);
        let join = func.create_block(None);

        let cond = func.emit(b0, InstrKind::ConstBool { value: true }, Some(IlType::Bool));
        func.set_terminator(
            b0,
            Terminator::CondBranch {
                cond: cond.unwrap(),
                then_block: b1,
                else_block: b2,
            },
        );
        let v1 = func.emit(b1, InstrKind::Const { value: 1 }, Some(IlType::Byte));
        func.set_terminator(b1, Terminator::Branch { target: join });
        let _v2 = func.emit(b2, InstrKind::Const { value: 2 }, Some(IlType::Byte));
        func.set_terminator(b2, Terminator::Branch { target: join });

        // Phi with only one operand: missing one, count mismatch
        let id = func.next_instr_id();
        let result = func.create_register(IlType::Byte);
        func.block_mut(join).append(Instruction::new(
            id,
            InstrKind::Phi {
                sources: vec![(b1, v1.unwrap())],
            },
            Some(result),
        ));
        func.set_terminator(join, Terminator::Return { value: None });

        let report = verify_function(&func);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::PhiOperandCountMismatch { .. })));
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::PhiMissingOperand { .. })));
    }

    #[test]
    fn test_phi_not_at_block_start() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        func.set_terminator(b0, Terminator::Branch { target: b1 });

        let c = func.emit(b1, InstrKind::Const { value: 1 }, Some(IlType::Byte));
        let id = func.next_instr_id();
        let result = func.create_register(IlType::Byte);
        func.block_mut(b1).append(Instruction::new(
            id,
            InstrKind::Phi {
                sources: vec![(b0, c.unwrap())],
            },
            Some(result),
        ));
        func.set_terminator(b1, Terminator::Return { value: None });

        let report = verify_function(&func);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::PhiNotAtBlockStart { .. })));
    }

    #[test]
    fn test_verifier_does_not_mutate() {
        let mut func = IlFunction::new("f", IlType::Byte);
        let b0 = func.create_block(Some("entry"));
        let value = func.emit(b0, InstrKind::Const { value: 9 }, Some(IlType::Byte));
        func.set_terminator(b0, Terminator::Return { value });

        let before = format!("{:?}", func);
        let _ = verify_function(&func);
        assert_eq!(before, format!("{:?}", func));
    }
}
