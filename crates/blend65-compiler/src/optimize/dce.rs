//! Dead constant elimination.
//!
//! Removes `Const`/`ConstBool` instructions whose result register no
//! instruction, phi, or terminator reads. Runs after intrinsic lowering,
//! which orphans the address constants it folded into hardware accesses.

use super::Pass;
use blend65_il::{IlFunction, IlModule, InstrKind};
use rustc_hash::FxHashSet;

pub struct DeadConstElimination;

impl DeadConstElimination {
    pub fn new() -> Self {
        Self
    }

    fn sweep_function(&self, func: &mut IlFunction) {
        let mut used: FxHashSet<u32> = FxHashSet::default();
        for block in func.blocks() {
            for instr in &block.instructions {
                for reg in instr.used_registers() {
                    used.insert(reg.id.as_u32());
                }
            }
            if let Some(terminator) = &block.terminator {
                for reg in terminator.used_registers() {
                    used.insert(reg.id.as_u32());
                }
            }
        }

        for block in func.blocks_mut() {
            block.instructions.retain(|instr| {
                let is_const = matches!(
                    instr.kind,
                    InstrKind::Const { .. } | InstrKind::ConstBool { .. }
                );
                if !is_const {
                    return true;
                }
                match &instr.result {
                    Some(result) => used.contains(&result.id.as_u32()),
                    None => false,
                }
            });
        }
    }
}

impl Default for DeadConstElimination {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for DeadConstElimination {
    fn name(&self) -> &'static str {
        "dead-const-elimination"
    }

    fn run(&self, module: &mut IlModule) {
        for func in module.functions_mut() {
            self.sweep_function(func);
        }
    }
}
