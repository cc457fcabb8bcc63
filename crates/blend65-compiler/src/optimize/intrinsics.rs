//! Intrinsic lowering.
//!
//! A forward constant tracker proves which address operands are
//! compile-time constants; `Peek`/`Poke` through such addresses become
//! `HardwareRead`/`HardwareWrite`. Word variants split into two byte
//! accesses at `addr` and `addr+1`, little-endian, with the synthetic
//! byte-split and byte-combine arithmetic. New instructions get fresh
//! ids and registers, so SSA form is preserved.

use super::Pass;
use blend65_il::{
    BinOp, BlockId, IlFunction, IlModule, IlType, InstrKind, Instruction, Register,
};
use rustc_hash::FxHashMap;

/// Register → known constant value. With single-assignment registers a
/// whole-function map is sound; defs always precede uses. Widening and
/// truncation of known constants propagate.
fn track_constants(func: &IlFunction) -> FxHashMap<u32, u16> {
    let mut constants = FxHashMap::default();
    let mut changed = true;
    while changed {
        changed = false;
        for block in func.blocks() {
            for instr in &block.instructions {
                let Some(result) = &instr.result else { continue };
                if constants.contains_key(&result.id.as_u32()) {
                    continue;
                }
                let known = match &instr.kind {
                    InstrKind::Const { value } => Some(*value),
                    InstrKind::ZeroExtend { value } => {
                        constants.get(&value.id.as_u32()).copied()
                    }
                    InstrKind::Truncate { value } => {
                        constants.get(&value.id.as_u32()).map(|v| v & 0xFF)
                    }
                    _ => None,
                };
                if let Some(value) = known {
                    constants.insert(result.id.as_u32(), value);
                    changed = true;
                }
            }
        }
    }
    constants
}

pub struct IntrinsicLowering;

impl IntrinsicLowering {
    pub fn new() -> Self {
        Self
    }

    fn lower_function(&self, func: &mut IlFunction) {
        let constants = track_constants(func);
        let block_ids: Vec<BlockId> = func.block_ids().collect();

        for block_id in block_ids {
            let mut index = 0;
            while index < func.block(block_id).instructions.len() {
                let instr = func.block(block_id).instructions[index].clone();
                let advanced = match &instr.kind {
                    InstrKind::Peek { addr } => {
                        if let Some(&address) = constants.get(&addr.id.as_u32()) {
                            let replacement = Instruction::new(
                                instr.id,
                                InstrKind::HardwareRead { addr: address },
                                instr.result.clone(),
                            );
                            func.block_mut(block_id).replace_at(index, replacement);
                        }
                        1
                    }

                    InstrKind::Poke { addr, value } => {
                        if let Some(&address) = constants.get(&addr.id.as_u32()) {
                            let replacement = Instruction::new(
                                instr.id,
                                InstrKind::HardwareWrite {
                                    addr: address,
                                    value: value.clone(),
                                },
                                None,
                            );
                            func.block_mut(block_id).replace_at(index, replacement);
                        }
                        1
                    }

                    InstrKind::PeekW { addr } => {
                        match constants.get(&addr.id.as_u32()) {
                            Some(&address) => {
                                self.expand_word_read(func, block_id, index, address, &instr)
                            }
                            None => 1,
                        }
                    }

                    InstrKind::PokeW { addr, value } => match constants.get(&addr.id.as_u32()) {
                        Some(&address) => self.expand_word_write(
                            func,
                            block_id,
                            index,
                            address,
                            value.clone(),
                        ),
                        None => 1,
                    },

                    _ => 1,
                };
                index += advanced;
            }
        }
    }

    /// `r = peekw(const)` → two hardware reads combined little-endian:
    /// `r = zext(lo) | (zext(hi) << 8)`.
    fn expand_word_read(
        &self,
        func: &mut IlFunction,
        block: BlockId,
        index: usize,
        address: u16,
        original: &Instruction,
    ) -> usize {
        let result = original
            .result
            .clone()
            .expect("peekw defines a register");

        let lo = func.create_register(IlType::Byte);
        let hi = func.create_register(IlType::Byte);
        let lo_wide = func.create_register(IlType::Word);
        let hi_wide = func.create_register(IlType::Word);
        let eight = func.create_register(IlType::Word);
        let hi_shifted = func.create_register(IlType::Word);

        let seq = [
            (InstrKind::HardwareRead { addr: address }, Some(lo.clone())),
            (
                InstrKind::HardwareRead {
                    addr: address.wrapping_add(1),
                },
                Some(hi.clone()),
            ),
            (InstrKind::ZeroExtend { value: lo }, Some(lo_wide.clone())),
            (InstrKind::ZeroExtend { value: hi }, Some(hi_wide.clone())),
            (InstrKind::Const { value: 8 }, Some(eight.clone())),
            (
                InstrKind::Binary {
                    op: BinOp::Shl,
                    lhs: hi_wide,
                    rhs: eight,
                },
                Some(hi_shifted.clone()),
            ),
            (
                InstrKind::Binary {
                    op: BinOp::Or,
                    lhs: lo_wide,
                    rhs: hi_shifted,
                },
                Some(result),
            ),
        ];

        func.block_mut(block).remove_at(index);
        let mut insert_at = index;
        let count = seq.len();
        for (kind, result) in seq {
            let id = func.next_instr_id();
            func.block_mut(block)
                .insert_at(insert_at, Instruction::new(id, kind, result));
            insert_at += 1;
        }
        count
    }

    /// `pokew(const, v)` → split and store both halves:
    /// `hw[addr] = trunc(v); hw[addr+1] = trunc(v >> 8)`.
    fn expand_word_write(
        &self,
        func: &mut IlFunction,
        block: BlockId,
        index: usize,
        address: u16,
        value: Register,
    ) -> usize {
        let lo = func.create_register(IlType::Byte);
        let eight = func.create_register(IlType::Word);
        let hi_wide = func.create_register(IlType::Word);
        let hi = func.create_register(IlType::Byte);

        let seq = [
            (
                InstrKind::Truncate {
                    value: value.clone(),
                },
                Some(lo.clone()),
            ),
            (
                InstrKind::HardwareWrite {
                    addr: address,
                    value: lo,
                },
                None,
            ),
            (InstrKind::Const { value: 8 }, Some(eight.clone())),
            (
                InstrKind::Binary {
                    op: BinOp::Shr,
                    lhs: value,
                    rhs: eight,
                },
                Some(hi_wide.clone()),
            ),
            (InstrKind::Truncate { value: hi_wide }, Some(hi.clone())),
            (
                InstrKind::HardwareWrite {
                    addr: address.wrapping_add(1),
                    value: hi,
                },
                None,
            ),
        ];

        func.block_mut(block).remove_at(index);
        let mut insert_at = index;
        let count = seq.len();
        for (kind, result) in seq {
            let id = func.next_instr_id();
            func.block_mut(block)
                .insert_at(insert_at, Instruction::new(id, kind, result));
            insert_at += 1;
        }
        count
    }
}

impl Default for IntrinsicLowering {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for IntrinsicLowering {
    fn name(&self) -> &'static str {
        "intrinsic-lowering"
    }

    fn run(&self, module: &mut IlModule) {
        for func in module.functions_mut() {
            self.lower_function(func);
        }
    }
}
