//! Basic blocks.

use crate::instr::{Instruction, Terminator};
use std::fmt;

/// Basic block identifier (index into the function's block list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A basic block: instructions plus exactly one terminator when
/// finalized. Predecessor/successor lists are maintained by the owning
/// function so they stay mirrored.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: Option<String>,
    pub instructions: Vec<Instruction>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            label: None,
            instructions: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            terminator: None,
        }
    }

    pub fn with_label(id: BlockId, label: impl Into<String>) -> Self {
        let mut block = Self::new(id);
        block.label = Some(label.into());
        block
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// Append an instruction.
    pub fn append(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Insert an instruction at `index`.
    pub fn insert_at(&mut self, index: usize, instr: Instruction) {
        self.instructions.insert(index, instr);
    }

    /// Remove and return the instruction at `index`.
    pub fn remove_at(&mut self, index: usize) -> Instruction {
        self.instructions.remove(index)
    }

    /// Replace the instruction at `index`, returning the old one.
    pub fn replace_at(&mut self, index: usize, instr: Instruction) -> Instruction {
        std::mem::replace(&mut self.instructions[index], instr)
    }

    /// Number of phi instructions at the head of the block.
    pub fn phi_count(&self) -> usize {
        self.instructions
            .iter()
            .take_while(|i| i.kind.is_phi())
            .count()
    }
}
