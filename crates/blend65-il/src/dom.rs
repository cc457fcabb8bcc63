//! Dominator tree and dominance frontiers.
//!
//! Cooper-Harvey-Kennedy iterative algorithm over the reverse postorder
//! of the block graph. Unreachable blocks have no immediate dominator
//! and dominate nothing.

use crate::block::BlockId;
use crate::function::IlFunction;
use rustc_hash::FxHashSet;

#[derive(Debug)]
pub struct DominatorTree {
    /// Reverse postorder of reachable blocks
    rpo: Vec<BlockId>,
    /// Position of each block in `rpo` (`None` when unreachable)
    rpo_index: Vec<Option<usize>>,
    /// Immediate dominator per block (`idom[entry] = entry`)
    idom: Vec<Option<BlockId>>,
    /// Dominance frontier per block
    frontiers: Vec<FxHashSet<BlockId>>,
}

impl DominatorTree {
    pub fn compute(func: &IlFunction) -> Self {
        let block_count = func.block_count();
        let entry = func.entry_block();

        // Postorder DFS, then reverse
        let mut visited = vec![false; block_count];
        let mut postorder = Vec::with_capacity(block_count);
        let mut stack = vec![(entry, 0usize)];
        visited[entry.as_usize()] = true;
        while let Some(top) = stack.len().checked_sub(1) {
            let (block, next) = stack[top];
            let succs = &func.block(block).succs;
            if next < succs.len() {
                stack[top].1 += 1;
                let succ = succs[next];
                if !visited[succ.as_usize()] {
                    visited[succ.as_usize()] = true;
                    stack.push((succ, 0));
                }
            } else {
                postorder.push(block);
                stack.pop();
            }
        }
        let rpo: Vec<BlockId> = postorder.into_iter().rev().collect();

        let mut rpo_index = vec![None; block_count];
        for (i, &block) in rpo.iter().enumerate() {
            rpo_index[block.as_usize()] = Some(i);
        }

        // Iterate to a fixed point
        let mut idom: Vec<Option<BlockId>> = vec![None; block_count];
        idom[entry.as_usize()] = Some(entry);

        let intersect = |idom: &[Option<BlockId>], rpo_index: &[Option<usize>], a: BlockId, b: BlockId| {
            let mut finger_a = a;
            let mut finger_b = b;
            while finger_a != finger_b {
                while rpo_index[finger_a.as_usize()] > rpo_index[finger_b.as_usize()] {
                    finger_a = idom[finger_a.as_usize()].expect("processed block has idom");
                }
                while rpo_index[finger_b.as_usize()] > rpo_index[finger_a.as_usize()] {
                    finger_b = idom[finger_b.as_usize()].expect("processed block has idom");
                }
            }
            finger_a
        };

        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                let preds = &func.block(block).preds;
                let mut new_idom: Option<BlockId> = None;
                for &pred in preds {
                    if idom[pred.as_usize()].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, &rpo_index, pred, current),
                    });
                }
                if new_idom != idom[block.as_usize()] && new_idom.is_some() {
                    idom[block.as_usize()] = new_idom;
                    changed = true;
                }
            }
        }

        // Dominance frontiers (Cooper et al. figure 5)
        let mut frontiers: Vec<FxHashSet<BlockId>> = vec![FxHashSet::default(); block_count];
        for &block in &rpo {
            let preds = func.block(block).preds.clone();
            if preds.len() < 2 {
                continue;
            }
            let Some(block_idom) = idom[block.as_usize()] else {
                continue;
            };
            for pred in preds {
                let mut runner = pred;
                while runner != block_idom {
                    if idom[runner.as_usize()].is_none() {
                        break;
                    }
                    frontiers[runner.as_usize()].insert(block);
                    runner = idom[runner.as_usize()].expect("checked above");
                }
            }
        }

        Self {
            rpo,
            rpo_index,
            idom,
            frontiers,
        }
    }

    /// Immediate dominator of `block`; the entry block is its own idom.
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom[block.as_usize()]
    }

    /// Does `a` dominate `b`? Every block dominates itself.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if self.rpo_index[b.as_usize()].is_none() || self.rpo_index[a.as_usize()].is_none() {
            return false;
        }
        let mut cursor = b;
        loop {
            if cursor == a {
                return true;
            }
            match self.idom[cursor.as_usize()] {
                Some(parent) if parent != cursor => cursor = parent,
                _ => return false,
            }
        }
    }

    pub fn dominance_frontier(&self, block: BlockId) -> &FxHashSet<BlockId> {
        &self.frontiers[block.as_usize()]
    }

    /// Blocks whose immediate dominator is `block`, in RPO.
    pub fn children(&self, block: BlockId) -> Vec<BlockId> {
        self.rpo
            .iter()
            .copied()
            .filter(|&b| b != block && self.idom[b.as_usize()] == Some(block))
            .collect()
    }

    pub fn reverse_postorder(&self) -> &[BlockId] {
        &self.rpo
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.rpo_index[block.as_usize()].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Terminator;
    use crate::value::IlType;

    /// Diamond: bb0 → bb1/bb2 → bb3
    fn diamond() -> (IlFunction, BlockId, BlockId, BlockId, BlockId) {
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        let b2 = func.create_block(None);
        let b3 = func.create_block(None);
        let cond = func.create_register(IlType::Bool);
        func.set_terminator(
            b0,
            Terminator::CondBranch {
                cond,
                then_block: b1,
                else_block: b2,
            },
        );
        func.set_terminator(b1, Terminator::Branch { target: b3 });
        func.set_terminator(b2, Terminator::Branch { target: b3 });
        func.set_terminator(b3, Terminator::Return { value: None });
        (func, b0, b1, b2, b3)
    }

    #[test]
    fn test_diamond_idoms() {
        let (func, b0, b1, b2, b3) = diamond();
        let dom = DominatorTree::compute(&func);
        assert_eq!(dom.idom(b0), Some(b0));
        assert_eq!(dom.idom(b1), Some(b0));
        assert_eq!(dom.idom(b2), Some(b0));
        // The join is dominated by the branch, not by either arm
        assert_eq!(dom.idom(b3), Some(b0));
    }

    #[test]
    fn test_dominates() {
        let (func, b0, b1, _, b3) = diamond();
        let dom = DominatorTree::compute(&func);
        assert!(dom.dominates(b0, b3));
        assert!(dom.dominates(b0, b1));
        assert!(dom.dominates(b1, b1));
        assert!(!dom.dominates(b1, b3));
        assert!(!dom.dominates(b3, b0));
    }

    #[test]
    fn test_dominance_frontier() {
        let (func, _, b1, b2, b3) = diamond();
        let dom = DominatorTree::compute(&func);
        assert!(dom.dominance_frontier(b1).contains(&b3));
        assert!(dom.dominance_frontier(b2).contains(&b3));
        assert!(dom.dominance_frontier(b3).is_empty());
    }

    #[test]
    fn test_loop_frontier() {
        // bb0 → bb1 (header) → bb2 (body) → bb1; bb1 → bb3 (exit)
        let mut func = IlFunction::new("f", IlType::Void);
        let b0 = func.create_block(Some("entry"));
        let b1 = func.create_block(None);
        let b2 = func.create_block(None);
        let b3 = func.create_block(None);
        let cond = func.create_register(IlType::Bool);
        func.set_terminator(b0, Terminator::Branch { target: b1 });
        func.set_terminator(
            b1,
            Terminator::CondBranch {
                cond,
                then_block: b2,
                else_block: b3,
            },
        );
        func.set_terminator(b2, Terminator::Branch { target: b1 });
        func.set_terminator(b3, Terminator::Return { value: None });

        let dom = DominatorTree::compute(&func);
        assert_eq!(dom.idom(b1), Some(b0));
        assert_eq!(dom.idom(b2), Some(b1));
        assert_eq!(dom.idom(b3), Some(b1));
        // The body's frontier contains the header it branches back to
        assert!(dom.dominance_frontier(b2).contains(&b1));
        assert!(dom.dominance_frontier(b1).contains(&b1));
    }
}
