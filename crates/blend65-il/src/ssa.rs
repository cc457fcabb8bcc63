//! SSA construction.
//!
//! Pre-SSA IL addresses mutable locals through `LoadVar`/`StoreVar`.
//! Construction places phis at the iterated dominance frontier of each
//! variable's defining blocks (Cytron et al.), then renames with a
//! per-variable stack while walking the dominator tree in preorder. All
//! `LoadVar`/`StoreVar` instructions are renamed away.
//!
//! A read on a path with no prior store resolves to a synthesized
//! constant zero in the entry block; real use-before-init sites were
//! already diagnosed by the definite-assignment analysis.

use crate::block::BlockId;
use crate::dom::DominatorTree;
use crate::function::IlFunction;
use crate::instr::{InstrId, InstrKind, Instruction};
use crate::value::{IlType, Register};
use rustc_hash::{FxHashMap, FxHashSet};

/// Counters collected during construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SsaStats {
    pub phis_inserted: u32,
    pub registers_renamed: u32,
}

/// SSA construction pass. One instance per function.
pub struct SsaBuilder {
    /// Variable each inserted phi belongs to
    phi_vars: FxHashMap<InstrId, String>,
    /// Current definition stack per variable
    stacks: FxHashMap<String, Vec<Register>>,
    /// LoadVar result register → its replacement
    replace: FxHashMap<u32, Register>,
    /// Lazily created entry-block zero constants per variable
    undef_regs: FxHashMap<String, Register>,
    /// IL type of each variable, collected before insertion
    var_types: FxHashMap<String, IlType>,
    /// Instructions to delete once renaming finishes
    removals: FxHashSet<InstrId>,
    stats: SsaStats,
}

impl SsaBuilder {
    pub fn new() -> Self {
        Self {
            phi_vars: FxHashMap::default(),
            stacks: FxHashMap::default(),
            replace: FxHashMap::default(),
            undef_regs: FxHashMap::default(),
            var_types: FxHashMap::default(),
            removals: FxHashSet::default(),
            stats: SsaStats::default(),
        }
    }

    /// Convert `func` into SSA form.
    pub fn build(mut self, func: &mut IlFunction) -> SsaStats {
        let dom = DominatorTree::compute(func);

        // Collect variables: defining blocks and IL type
        let mut def_blocks: FxHashMap<String, FxHashSet<BlockId>> = FxHashMap::default();
        let mut var_types: FxHashMap<String, IlType> = FxHashMap::default();
        for block in func.blocks() {
            for instr in &block.instructions {
                match &instr.kind {
                    InstrKind::StoreVar { name, value } => {
                        def_blocks.entry(name.clone()).or_default().insert(block.id);
                        var_types.entry(name.clone()).or_insert(value.ty);
                    }
                    InstrKind::LoadVar { name } => {
                        if let Some(result) = &instr.result {
                            var_types.entry(name.clone()).or_insert(result.ty);
                        }
                        // Ensure the variable exists even if never stored
                        def_blocks.entry(name.clone()).or_default();
                    }
                    _ => {}
                }
            }
        }

        self.var_types = var_types.clone();

        // Phi insertion at the iterated dominance frontier. The entry
        // block counts as a defining block: paths that skip every store
        // still carry a value.
        let entry = func.entry_block();
        let mut var_names: Vec<&String> = def_blocks.keys().collect();
        var_names.sort_unstable();
        let var_names: Vec<String> = var_names.into_iter().cloned().collect();

        for name in &var_names {
            let ty = var_types.get(name).copied().unwrap_or(IlType::Byte);
            let mut worklist: Vec<BlockId> = def_blocks[name].iter().copied().collect();
            worklist.sort_unstable();
            worklist.push(entry);
            let mut placed: FxHashSet<BlockId> = FxHashSet::default();
            let mut in_worklist: FxHashSet<BlockId> = worklist.iter().copied().collect();

            while let Some(block) = worklist.pop() {
                let frontier: Vec<BlockId> = {
                    let mut f: Vec<BlockId> =
                        dom.dominance_frontier(block).iter().copied().collect();
                    f.sort_unstable();
                    f
                };
                for candidate in frontier {
                    if candidate == entry || !placed.insert(candidate) {
                        continue;
                    }
                    let id = func.next_instr_id();
                    let result = func.create_named_register(ty, name.clone());
                    let phi = Instruction::new(
                        id,
                        InstrKind::Phi {
                            sources: Vec::new(),
                        },
                        Some(result),
                    );
                    func.block_mut(candidate).insert_at(0, phi);
                    self.phi_vars.insert(id, name.clone());
                    self.stats.phis_inserted += 1;
                    if in_worklist.insert(candidate) {
                        worklist.push(candidate);
                    }
                }
            }
        }

        // Renaming over the dominator tree
        self.rename_block(func, &dom, entry);

        // Fill phi operands arriving from unreachable predecessors
        self.patch_missing_phi_operands(func);

        // Delete the renamed-away LoadVar/StoreVar instructions
        let removals = std::mem::take(&mut self.removals);
        for block in func.blocks_mut() {
            block.instructions.retain(|i| !removals.contains(&i.id));
        }

        self.stats
    }

    fn rename_block(&mut self, func: &mut IlFunction, dom: &DominatorTree, block: BlockId) {
        let mut pushed: Vec<String> = Vec::new();

        let instr_count = func.block(block).instructions.len();
        for index in 0..instr_count {
            let (instr_id, is_phi) = {
                let instr = &func.block(block).instructions[index];
                (instr.id, instr.kind.is_phi())
            };

            if is_phi {
                if let Some(var) = self.phi_vars.get(&instr_id).cloned() {
                    let result = func.block(block).instructions[index]
                        .result
                        .clone()
                        .expect("phi defines a register");
                    self.stacks.entry(var.clone()).or_default().push(result);
                    pushed.push(var);
                }
                continue;
            }

            // Rewrite operands that referenced renamed loads
            {
                let instr = &mut func.block_mut(block).instructions[index];
                for reg in instr.kind.used_registers_mut() {
                    if let Some(replacement) = self.replace.get(&reg.id.as_u32()) {
                        *reg = replacement.clone();
                    }
                }
            }

            let kind = func.block(block).instructions[index].kind.clone();
            match kind {
                InstrKind::LoadVar { name } => {
                    let current = self.current_def(func, &name);
                    let result = func.block(block).instructions[index]
                        .result
                        .clone()
                        .expect("load defines a register");
                    self.replace.insert(result.id.as_u32(), current);
                    self.removals.insert(instr_id);
                    self.stats.registers_renamed += 1;
                }
                InstrKind::StoreVar { name, value } => {
                    self.stacks.entry(name.clone()).or_default().push(value);
                    pushed.push(name);
                    self.removals.insert(instr_id);
                    self.stats.registers_renamed += 1;
                }
                _ => {}
            }
        }

        // Terminator operands
        if let Some(terminator) = &mut func.block_mut(block).terminator {
            for reg in terminator.used_registers_mut() {
                if let Some(replacement) = self.replace.get(&reg.id.as_u32()) {
                    *reg = replacement.clone();
                }
            }
        }

        // Fill this block's slot in successor phis
        let succs = func.block(block).succs.clone();
        for succ in succs {
            let phi_count = func.block(succ).phi_count();
            for index in 0..phi_count {
                let instr_id = func.block(succ).instructions[index].id;
                let Some(var) = self.phi_vars.get(&instr_id).cloned() else {
                    continue;
                };
                let value = self.current_def(func, &var);
                if let InstrKind::Phi { sources } =
                    &mut func.block_mut(succ).instructions[index].kind
                {
                    sources.push((block, value));
                }
            }
        }

        // Children in the dominator tree
        for child in dom.children(block) {
            self.rename_block(func, dom, child);
        }

        for var in pushed.into_iter().rev() {
            if let Some(stack) = self.stacks.get_mut(&var) {
                stack.pop();
            }
        }
    }

    /// Current reaching definition of `var`, synthesizing an entry-block
    /// zero when no store reaches this point.
    fn current_def(&mut self, func: &mut IlFunction, var: &str) -> Register {
        if let Some(reg) = self.stacks.get(var).and_then(|s| s.last()) {
            return reg.clone();
        }
        if let Some(reg) = self.undef_regs.get(var) {
            return reg.clone();
        }
        let ty = self.var_types.get(var).copied().unwrap_or(IlType::Byte);
        let id = func.next_instr_id();
        let result = func.create_named_register(ty, var);
        let entry = func.entry_block();
        let instr = Instruction::new(id, InstrKind::Const { value: 0 }, Some(result.clone()));
        func.block_mut(entry).insert_at(0, instr);
        self.undef_regs.insert(var.to_string(), result.clone());
        result
    }

    /// Phi blocks may have predecessors the renaming walk never visited
    /// (unreachable code that still branches in). Give those slots the
    /// entry-block zero so operand counts match predecessor counts.
    fn patch_missing_phi_operands(&mut self, func: &mut IlFunction) {
        let block_ids: Vec<BlockId> = func.block_ids().collect();
        for block_id in block_ids {
            let preds = func.block(block_id).preds.clone();
            let phi_count = func.block(block_id).phi_count();
            for index in 0..phi_count {
                let instr_id = func.block(block_id).instructions[index].id;
                let Some(var) = self.phi_vars.get(&instr_id).cloned() else {
                    continue;
                };
                let missing: Vec<BlockId> = {
                    let InstrKind::Phi { sources } = &func.block(block_id).instructions[index].kind
                    else {
                        continue;
                    };
                    preds
                        .iter()
                        .copied()
                        .filter(|p| !sources.iter().any(|(src, _)| src == p))
                        .collect()
                };
                for pred in missing {
                    let value = self.undef_for(func, &var);
                    if let InstrKind::Phi { sources } =
                        &mut func.block_mut(block_id).instructions[index].kind
                    {
                        sources.push((pred, value));
                    }
                }
            }
        }
    }

    fn undef_for(&mut self, func: &mut IlFunction, var: &str) -> Register {
        if let Some(reg) = self.undef_regs.get(var) {
            return reg.clone();
        }
        let ty = self.var_types.get(var).copied().unwrap_or(IlType::Byte);
        let id = func.next_instr_id();
        let result = func.create_named_register(ty, var);
        let entry = func.entry_block();
        let instr = Instruction::new(id, InstrKind::Const { value: 0 }, Some(result.clone()));
        func.block_mut(entry).insert_at(0, instr);
        self.undef_regs.insert(var.to_string(), result.clone());
        result
    }
}

impl Default for SsaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Terminator;

    /// var x stored in both arms of a diamond, loaded at the join.
    fn diamond_with_var() -> IlFunction {
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

        let ten = func.emit(b1, InstrKind::Const { value: 10 }, Some(IlType::Byte));
        func.emit(
            b1,
            InstrKind::StoreVar {
                name: "x".to_string(),
                value: ten.unwrap(),
            },
            None,
        );
        func.set_terminator(b1, Terminator::Branch { target: b3 });

        let twenty = func.emit(b2, InstrKind::Const { value: 20 }, Some(IlType::Byte));
        func.emit(
            b2,
            InstrKind::StoreVar {
                name: "x".to_string(),
                value: twenty.unwrap(),
            },
            None,
        );
        func.set_terminator(b2, Terminator::Branch { target: b3 });

        let load = func.emit(
            b3,
            InstrKind::LoadVar {
                name: "x".to_string(),
            },
            Some(IlType::Byte),
        );
        func.set_terminator(
            b3,
            Terminator::Return {
                value: Some(load.unwrap()),
            },
        );

        func
    }

    #[test]
    fn test_phi_inserted_at_join() {
        let mut func = diamond_with_var();
        let stats = SsaBuilder::new().build(&mut func);
        assert_eq!(stats.phis_inserted, 1);

        let join = func.block(BlockId::new(3));
        assert!(join.instructions[0].kind.is_phi());
        let InstrKind::Phi { sources } = &join.instructions[0].kind else {
            panic!("expected phi");
        };
        assert_eq!(sources.len(), 2);

        // The return now uses the phi result
        let phi_result = join.instructions[0].result.clone().unwrap();
        match &join.terminator {
            Some(Terminator::Return { value: Some(v) }) => assert_eq!(*v, phi_result),
            other => panic!("unexpected terminator {:?}", other),
        }
    }

    #[test]
    fn test_var_ops_removed() {
        let mut func = diamond_with_var();
        SsaBuilder::new().build(&mut func);
        for block in func.blocks() {
            for instr in &block.instructions {
                assert!(
                    !matches!(
                        instr.kind,
                        InstrKind::LoadVar { .. } | InstrKind::StoreVar { .. }
                    ),
                    "var instruction survived SSA construction"
                );
            }
        }
    }

    #[test]
    fn test_straight_line_needs_no_phi() {
        let mut func = IlFunction::new("f", IlType::Byte);
        let b0 = func.create_block(Some("entry"));
        let one = func
            .emit(b0, InstrKind::Const { value: 1 }, Some(IlType::Byte))
            .unwrap();
        func.emit(
            b0,
            InstrKind::StoreVar {
                name: "x".to_string(),
                value: one.clone(),
            },
            None,
        );
        let load = func.emit(
            b0,
            InstrKind::LoadVar {
                name: "x".to_string(),
            },
            Some(IlType::Byte),
        );
        func.set_terminator(
            b0,
            Terminator::Return {
                value: Some(load.unwrap()),
            },
        );

        let stats = SsaBuilder::new().build(&mut func);
        assert_eq!(stats.phis_inserted, 0);
        // The load was forwarded to the stored constant
        let ret = func.block(b0).terminator.clone().unwrap();
        match ret {
            Terminator::Return { value: Some(v) } => {
                assert_eq!(v.id, one.id);
            }
            other => panic!("unexpected terminator {:?}", other),
        }
    }

    #[test]
    fn test_loop_variable_gets_header_phi() {
        // x = 0; while cond { x = x + 1 } return x
        let mut func = IlFunction::new("f", IlType::Byte);
        let b0 = func.create_block(Some("entry"));
        let header = func.create_block(None);
        let body = func.create_block(None);
        let exit = func.create_block(None);

        let zero = func.emit(b0, InstrKind::Const { value: 0 }, Some(IlType::Byte));
        func.emit(
            b0,
            InstrKind::StoreVar {
                name: "x".to_string(),
                value: zero.unwrap(),
            },
            None,
        );
        func.set_terminator(b0, Terminator::Branch { target: header });

        let cond = func.emit(header, InstrKind::ConstBool { value: true }, Some(IlType::Bool));
        func.set_terminator(
            header,
            Terminator::CondBranch {
                cond: cond.unwrap(),
                then_block: body,
                else_block: exit,
            },
        );

        let x = func.emit(
            body,
            InstrKind::LoadVar {
                name: "x".to_string(),
            },
            Some(IlType::Byte),
        );
        let one = func.emit(body, InstrKind::Const { value: 1 }, Some(IlType::Byte));
        let sum = func.emit(
            body,
            InstrKind::Binary {
                op: crate::instr::BinOp::Add,
                lhs: x.unwrap(),
                rhs: one.unwrap(),
            },
            Some(IlType::Byte),
        );
        func.emit(
            body,
            InstrKind::StoreVar {
                name: "x".to_string(),
                value: sum.unwrap(),
            },
            None,
        );
        func.set_terminator(body, Terminator::Branch { target: header });

        let result = func.emit(
            exit,
            InstrKind::LoadVar {
                name: "x".to_string(),
            },
            Some(IlType::Byte),
        );
        func.set_terminator(
            exit,
            Terminator::Return {
                value: Some(result.unwrap()),
            },
        );

        let stats = SsaBuilder::new().build(&mut func);
        assert!(stats.phis_inserted >= 1);
        assert!(func.block(header).instructions[0].kind.is_phi());
    }
}
