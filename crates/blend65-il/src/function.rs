//! IL functions.

use crate::block::{BasicBlock, BlockId};
use crate::instr::{InstrId, InstrKind, Instruction, Terminator};
use crate::module::StorageClass;
use crate::value::{IlType, Register, RegisterId};
use rustc_hash::FxHashMap;

/// An IL function: ordered basic blocks (first is the entry), a register
/// factory, and a monotonically increasing instruction id counter.
#[derive(Debug, Clone)]
pub struct IlFunction {
    pub name: String,
    pub return_type: IlType,
    /// Parameter name + register; parameter registers are defined at entry
    pub params: Vec<(String, Register)>,
    blocks: Vec<BasicBlock>,
    next_instr: u32,
    next_register: u32,
    /// Preferred storage for parameters, advisory for the backend
    storage_hints: FxHashMap<String, StorageClass>,
    interrupt: bool,
}

impl IlFunction {
    pub fn new(name: impl Into<String>, return_type: IlType) -> Self {
        Self {
            name: name.into(),
            return_type,
            params: Vec::new(),
            blocks: Vec::new(),
            next_instr: 0,
            next_register: 0,
            storage_hints: FxHashMap::default(),
            interrupt: false,
        }
    }

    /// Add a parameter, allocating its register.
    pub fn add_param(&mut self, name: impl Into<String>, ty: IlType) -> Register {
        let name = name.into();
        let reg = self.create_named_register(ty, name.clone());
        self.params.push((name, reg.clone()));
        reg
    }

    // ----- factories -----

    pub fn create_block(&mut self, label: Option<&str>) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        let block = match label {
            Some(label) => BasicBlock::with_label(id, label),
            None => BasicBlock::new(id),
        };
        self.blocks.push(block);
        id
    }

    pub fn create_register(&mut self, ty: IlType) -> Register {
        let id = RegisterId::new(self.next_register);
        self.next_register += 1;
        Register::new(id, ty)
    }

    pub fn create_named_register(&mut self, ty: IlType, name: impl Into<String>) -> Register {
        let id = RegisterId::new(self.next_register);
        self.next_register += 1;
        Register::named(id, ty, name)
    }

    pub fn next_instr_id(&mut self) -> InstrId {
        let id = InstrId::new(self.next_instr);
        self.next_instr += 1;
        id
    }

    /// Append `kind` to `block` with an optional fresh result register.
    pub fn emit(
        &mut self,
        block: BlockId,
        kind: InstrKind,
        result_ty: Option<IlType>,
    ) -> Option<Register> {
        let id = self.next_instr_id();
        let result = result_ty.map(|ty| self.create_register(ty));
        let instr = Instruction::new(id, kind, result.clone());
        self.block_mut(block).append(instr);
        result
    }

    // ----- accessors -----

    pub fn entry_block(&self) -> BlockId {
        BlockId::new(0)
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.as_usize()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.as_usize()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut BasicBlock> {
        self.blocks.iter_mut()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len() as u32).map(BlockId::new)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn register_count(&self) -> u32 {
        self.next_register
    }

    pub fn is_interrupt(&self) -> bool {
        self.interrupt
    }

    pub fn set_interrupt(&mut self, interrupt: bool) {
        self.interrupt = interrupt;
    }

    pub fn set_parameter_storage_hint(&mut self, name: impl Into<String>, class: StorageClass) {
        self.storage_hints.insert(name.into(), class);
    }

    pub fn parameter_storage_hint(&self, name: &str) -> Option<StorageClass> {
        self.storage_hints.get(name).copied()
    }

    // ----- terminators and edges -----

    /// Set (or replace) a block's terminator, keeping predecessor and
    /// successor lists mirrored.
    pub fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        // Remove old edges
        if let Some(old) = self.blocks[block.as_usize()].terminator.take() {
            for target in old.targets() {
                self.remove_edge(block, target);
            }
        }
        for target in terminator.targets() {
            self.add_edge(block, target);
        }
        self.blocks[block.as_usize()].terminator = Some(terminator);
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId) {
        if !self.blocks[from.as_usize()].succs.contains(&to) {
            self.blocks[from.as_usize()].succs.push(to);
        }
        if !self.blocks[to.as_usize()].preds.contains(&from) {
            self.blocks[to.as_usize()].preds.push(from);
        }
    }

    fn remove_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.as_usize()].succs.retain(|&b| b != to);
        self.blocks[to.as_usize()].preds.retain(|&b| b != from);
    }

    /// Structural well-formedness: every block terminated, edge lists
    /// mirrored, entry block without predecessors.
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err(format!("function '{}' has no blocks", self.name));
        }
        if !self.blocks[0].preds.is_empty() {
            return Err(format!(
                "function '{}': entry block has predecessors",
                self.name
            ));
        }
        for block in &self.blocks {
            let Some(terminator) = &block.terminator else {
                return Err(format!(
                    "function '{}': block {} has no terminator",
                    self.name, block.id
                ));
            };
            let targets = terminator.targets();
            for target in &targets {
                if target.as_usize() >= self.blocks.len() {
                    return Err(format!(
                        "function '{}': block {} branches to missing {}",
                        self.name, block.id, target
                    ));
                }
                if !block.succs.contains(target) {
                    return Err(format!(
                        "function '{}': successor list of {} misses {}",
                        self.name, block.id, target
                    ));
                }
            }
            for succ in &block.succs {
                if !self.blocks[succ.as_usize()].preds.contains(&block.id) {
                    return Err(format!(
                        "function '{}': edge {} -> {} not mirrored",
                        self.name, block.id, succ
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_register_factories() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        assert_eq!(b0, BlockId::new(0));
        assert_eq!(b1, BlockId::new(1));

        let r0 = func.create_register(IlType::Byte);
        let r1 = func.create_register(IlType::Word);
        assert_ne!(r0.id, r1.id);
    }

    #[test]
    fn test_edges_mirrored_on_terminator_change() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        let b2 = func.create_block(None);

        func.set_terminator(b0, Terminator::Branch { target: b1 });
        assert_eq!(func.block(b1).preds, vec![b0]);

        // Retargeting removes the old edge
        func.set_terminator(b0, Terminator::Branch { target: b2 });
        assert!(func.block(b1).preds.is_empty());
        assert_eq!(func.block(b2).preds, vec![b0]);
        assert_eq!(func.block(b0).succs, vec![b2]);
    }

    #[test]
    fn test_validate_requires_terminators() {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        assert!(func.validate_structure().is_err());
        func.set_terminator(b0, Terminator::Return { value: None });
        assert!(func.validate_structure().is_ok());
    }
}
