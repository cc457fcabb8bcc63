//! Per-function control-flow graphs.
//!
//! Nodes live in an arena and refer to each other by index. Edges are
//! deduplicated on insertion. Reachability is a forward BFS from the
//! entry node, latched on each node.

use blend65_checker::consteval::eval_const_bool;
use blend65_checker::{Bindings, ScopeId};
use blend65_parser::ast::{Block, FunctionDecl, NodeId, Statement};
use blend65_parser::Span;
use std::collections::VecDeque;

/// CFG node identifier (index into the node arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CfgNodeId(pub u32);

impl CfgNodeId {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Kind of a CFG node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgNodeKind {
    Entry,
    Exit,
    Statement,
    Branch,
    Loop,
    Return,
}

/// One node of the control-flow graph.
#[derive(Debug)]
pub struct CfgNode {
    pub id: CfgNodeId,
    pub kind: CfgNodeKind,
    /// Back-reference to the AST statement, absent for entry/exit/merge
    pub stmt: Option<NodeId>,
    pub span: Option<Span>,
    pub preds: Vec<CfgNodeId>,
    pub succs: Vec<CfgNodeId>,
    pub reachable: bool,
}

/// Control-flow graph of one function body.
#[derive(Debug)]
pub struct Cfg {
    nodes: Vec<CfgNode>,
    entry: CfgNodeId,
    exit: CfgNodeId,
}

impl Cfg {
    pub fn entry(&self) -> CfgNodeId {
        self.entry
    }

    pub fn exit(&self) -> CfgNodeId {
        self.exit
    }

    pub fn node(&self, id: CfgNodeId) -> &CfgNode {
        &self.nodes[id.as_usize()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Unreachable nodes, excluding the exit node (an infinite loop makes
    /// the exit structurally unreachable without that being dead code).
    pub fn unreachable_nodes(&self) -> Vec<&CfgNode> {
        self.nodes
            .iter()
            .filter(|n| !n.reachable && n.id != self.exit)
            .collect()
    }

    /// True when some path from entry reaches the exit node.
    pub fn all_paths_reach_exit(&self) -> bool {
        self.node(self.exit).reachable
    }

    fn compute_reachability(&mut self) {
        let mut queue = VecDeque::new();
        queue.push_back(self.entry);
        self.nodes[self.entry.as_usize()].reachable = true;
        while let Some(id) = queue.pop_front() {
            let succs = self.nodes[id.as_usize()].succs.clone();
            for succ in succs {
                let node = &mut self.nodes[succ.as_usize()];
                if !node.reachable {
                    node.reachable = true;
                    queue.push_back(succ);
                }
            }
        }
    }
}

/// Builds a [`Cfg`] from a function body.
pub struct CfgBuilder<'a> {
    bindings: &'a Bindings,
    nodes: Vec<CfgNode>,
    /// Stack of (loop header, after-loop node) for break/continue
    loop_stack: Vec<(CfgNodeId, CfgNodeId)>,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(bindings: &'a Bindings) -> Self {
        Self {
            bindings,
            nodes: Vec::new(),
            loop_stack: Vec::new(),
        }
    }

    /// Build the graph for one function.
    pub fn build(mut self, func: &FunctionDecl) -> Cfg {
        let entry = self.new_node(CfgNodeKind::Entry, None, None);
        let exit = self.new_node(CfgNodeKind::Exit, None, None);

        let end = self.build_block(&func.body, Some(entry), exit);
        if let Some(end) = end {
            self.add_edge(end, exit);
        }

        let mut cfg = Cfg {
            nodes: self.nodes,
            entry,
            exit,
        };
        cfg.compute_reachability();
        cfg
    }

    /// Thread a statement list. `current` is the node control flows from;
    /// `None` means the chain was terminated (by return/break/continue),
    /// so following statements get no predecessor.
    fn build_block(
        &mut self,
        block: &Block,
        mut current: Option<CfgNodeId>,
        exit: CfgNodeId,
    ) -> Option<CfgNodeId> {
        for stmt in &block.statements {
            current = self.build_statement(stmt, current, exit);
        }
        current
    }

    fn build_statement(
        &mut self,
        stmt: &Statement,
        current: Option<CfgNodeId>,
        exit: CfgNodeId,
    ) -> Option<CfgNodeId> {
        match stmt {
            Statement::Let(_) | Statement::Assign(_) | Statement::Expression(_) => {
                let node = self.new_node(
                    CfgNodeKind::Statement,
                    Some(stmt.id()),
                    Some(stmt.location()),
                );
                if let Some(from) = current {
                    self.add_edge(from, node);
                }
                Some(node)
            }

            Statement::Return(_) => {
                let node =
                    self.new_node(CfgNodeKind::Return, Some(stmt.id()), Some(stmt.location()));
                if let Some(from) = current {
                    self.add_edge(from, node);
                }
                self.add_edge(node, exit);
                None
            }

            Statement::Break(_) => {
                let node = self.new_node(
                    CfgNodeKind::Statement,
                    Some(stmt.id()),
                    Some(stmt.location()),
                );
                if let Some(from) = current {
                    self.add_edge(from, node);
                }
                if let Some(&(_, after)) = self.loop_stack.last() {
                    self.add_edge(node, after);
                }
                None
            }

            Statement::Continue(_) => {
                let node = self.new_node(
                    CfgNodeKind::Statement,
                    Some(stmt.id()),
                    Some(stmt.location()),
                );
                if let Some(from) = current {
                    self.add_edge(from, node);
                }
                if let Some(&(header, _)) = self.loop_stack.last() {
                    self.add_edge(node, header);
                }
                None
            }

            Statement::If(s) => {
                let branch =
                    self.new_node(CfgNodeKind::Branch, Some(stmt.id()), Some(stmt.location()));
                if let Some(from) = current {
                    self.add_edge(from, branch);
                }
                let merge = self.new_node(CfgNodeKind::Statement, None, None);

                let then_end = self.build_block(&s.then_branch, Some(branch), exit);
                if let Some(end) = then_end {
                    self.add_edge(end, merge);
                }

                match &s.else_branch {
                    Some(else_branch) => {
                        let else_end = self.build_statement(else_branch, Some(branch), exit);
                        if let Some(end) = else_end {
                            self.add_edge(end, merge);
                        }
                    }
                    None => self.add_edge(branch, merge),
                }

                // A merge nothing flows into means both arms returned;
                // code after it is unreachable but still gets threaded
                Some(merge)
            }

            Statement::While(s) => {
                let header =
                    self.new_node(CfgNodeKind::Loop, Some(stmt.id()), Some(stmt.location()));
                if let Some(from) = current {
                    self.add_edge(from, header);
                }
                let after = self.new_node(CfgNodeKind::Statement, None, None);

                // A provably-true condition has no exit edge; the loop
                // never falls through
                let scope = self
                    .bindings
                    .scope_of(s.id)
                    .unwrap_or(self.bindings.table.module_scope());
                let always_true =
                    eval_const_bool(&s.condition, &self.bindings.table, scope) == Some(true);
                if !always_true {
                    self.add_edge(header, after);
                }

                self.loop_stack.push((header, after));
                let body_end = self.build_block(&s.body, Some(header), exit);
                self.loop_stack.pop();
                if let Some(end) = body_end {
                    self.add_edge(end, header);
                }

                Some(after)
            }

            Statement::For(s) => {
                let header =
                    self.new_node(CfgNodeKind::Loop, Some(stmt.id()), Some(stmt.location()));
                if let Some(from) = current {
                    self.add_edge(from, header);
                }
                let after = self.new_node(CfgNodeKind::Statement, None, None);
                // Range loops always terminate
                self.add_edge(header, after);

                self.loop_stack.push((header, after));
                let body_end = self.build_block(&s.body, Some(header), exit);
                self.loop_stack.pop();
                if let Some(end) = body_end {
                    self.add_edge(end, header);
                }

                Some(after)
            }

            Statement::Block(b) => self.build_block(b, current, exit),
        }
    }

    fn new_node(&mut self, kind: CfgNodeKind, stmt: Option<NodeId>, span: Option<Span>) -> CfgNodeId {
        let id = CfgNodeId(self.nodes.len() as u32);
        self.nodes.push(CfgNode {
            id,
            kind,
            stmt,
            span,
            preds: Vec::new(),
            succs: Vec::new(),
            reachable: false,
        });
        id
    }

    /// Insert an edge, collapsing parallel edges.
    fn add_edge(&mut self, from: CfgNodeId, to: CfgNodeId) {
        if !self.nodes[from.as_usize()].succs.contains(&to) {
            self.nodes[from.as_usize()].succs.push(to);
            self.nodes[to.as_usize()].preds.push(from);
        }
    }
}

/// Scope a statement should be resolved in while analysing a function.
/// Falls back to the function scope when the statement did not open one.
pub fn scope_for_stmt(bindings: &Bindings, func: &FunctionDecl, stmt: &Statement) -> ScopeId {
    bindings
        .scope_of(stmt.id())
        .or_else(|| bindings.scope_of(func.id))
        .unwrap_or(bindings.table.module_scope())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_checker::Binder;
    use blend65_parser::ast::Declaration;
    use blend65_parser::Parser;

    fn cfg_of(source: &str) -> Cfg {
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        let (bindings, diags) = Binder::new(&program).bind();
        assert!(diags.is_empty(), "bind errors: {:?}", diags);
        let func = program
            .declarations
            .iter()
            .find_map(|d| match d {
                Declaration::Function(f) => Some(f),
                _ => None,
            })
            .expect("no function");
        CfgBuilder::new(&bindings).build(func)
    }

    #[test]
    fn test_linear_chain() {
        let cfg = cfg_of("function f(): void { let a: byte = 1; let b: byte = 2; }");
        assert!(cfg.all_paths_reach_exit());
        assert!(cfg.unreachable_nodes().is_empty());
    }

    #[test]
    fn test_code_after_return_unreachable() {
        let cfg = cfg_of("function f(): void { return; let x: byte = 1; }");
        let dead = cfg.unreachable_nodes();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].kind, CfgNodeKind::Statement);
        assert!(cfg.all_paths_reach_exit());
    }

    #[test]
    fn test_if_both_arms_return() {
        let cfg = cfg_of(
            "function f(b: bool): byte {\n\
             if b { return 1; } else { return 2; }\n\
             let x: byte = 3;\n\
             }",
        );
        // The statement after the if has no path from entry
        let dead: Vec<_> = cfg
            .unreachable_nodes()
            .into_iter()
            .filter(|n| n.stmt.is_some())
            .collect();
        assert_eq!(dead.len(), 1);
    }

    #[test]
    fn test_while_loop_edges() {
        let cfg = cfg_of("function f(b: bool): void { while b { let x: byte = 1; } }");
        let header = cfg
            .nodes()
            .find(|n| n.kind == CfgNodeKind::Loop)
            .expect("no loop node");
        // Header has a body successor and an exit successor
        assert_eq!(header.succs.len(), 2);
        assert!(cfg.all_paths_reach_exit());
    }

    #[test]
    fn test_infinite_loop_exit_unreachable() {
        let cfg = cfg_of("function f(): void { while true { let x: byte = 1; } }");
        assert!(!cfg.all_paths_reach_exit());
        // The exit node is not reported as dead code
        assert!(cfg.unreachable_nodes().iter().all(|n| n.kind != CfgNodeKind::Exit));
    }

    #[test]
    fn test_break_terminates_chain() {
        let cfg = cfg_of(
            "function f(): void {\n\
             while true { break; let y: byte = 2; }\n\
             }",
        );
        let dead: Vec<_> = cfg
            .unreachable_nodes()
            .into_iter()
            .filter(|n| n.stmt.is_some())
            .collect();
        assert_eq!(dead.len(), 1);
        // break escapes the infinite loop, so the exit is reachable
        assert!(cfg.all_paths_reach_exit());
    }

    #[test]
    fn test_edges_are_mirrored() {
        let cfg = cfg_of("function f(b: bool): void { if b { let x: byte = 1; } }");
        for node in cfg.nodes() {
            for &succ in &node.succs {
                assert!(cfg.node(succ).preds.contains(&node.id));
            }
            for &pred in &node.preds {
                assert!(cfg.node(pred).succs.contains(&node.id));
            }
        }
    }
}
