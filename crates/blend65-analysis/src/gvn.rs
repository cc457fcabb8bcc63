//! Global value numbering.
//!
//! Assigns a stable integer to every pure expression within a function;
//! two expressions share a number when their operators match (commutative
//! operators compare order-insensitively), their operand numbers match,
//! and neither subtree contains a call. A write to a variable gives it a
//! fresh number, which transitively invalidates every expression built
//! on the old one. Branch bodies are numbered in isolation so a value
//! computed on one path is never offered as a replacement on another.

use crate::framework::{AnalysisContext, Analyzer, Tier};
use blend65_checker::{CheckResult, SymbolId};
use blend65_parser::ast::{Block, Expr, ExprKind, Statement, UnaryOp};
use blend65_parser::{MetaKey, MetaValue, MetadataStore};
use rustc_hash::FxHashMap;

/// Mutable numbering state; cloned at control-flow forks.
#[derive(Debug, Clone, Default)]
struct GvnState {
    /// Current value number of each variable
    var_value: FxHashMap<SymbolId, u32>,
    /// Structural key → value number
    expr_numbers: FxHashMap<String, u32>,
    /// Value number → variable currently holding the first occurrence
    holders: FxHashMap<u32, String>,
    next_number: u32,
}

impl GvnState {
    fn fresh(&mut self) -> u32 {
        let n = self.next_number;
        self.next_number += 1;
        n
    }

    fn number_for_key(&mut self, key: String) -> u32 {
        if let Some(&n) = self.expr_numbers.get(&key) {
            return n;
        }
        let n = self.fresh();
        self.expr_numbers.insert(key, n);
        n
    }

    fn var_number(&mut self, symbol: SymbolId) -> u32 {
        if let Some(&n) = self.var_value.get(&symbol) {
            return n;
        }
        let n = self.fresh();
        self.var_value.insert(symbol, n);
        n
    }

    /// A variable was written: fresh number, and it stops holding
    /// anything it held before.
    fn invalidate_var(&mut self, symbol: SymbolId, name: &str) {
        let n = self.fresh();
        self.var_value.insert(symbol, n);
        self.holders.retain(|_, holder| holder != name);
    }
}

pub struct GvnAnalysis;

impl GvnAnalysis {
    pub fn new() -> Self {
        Self
    }

    /// Number an expression tree bottom-up; `None` when the subtree is
    /// not numberable (contains a call or memory access).
    fn number_expr(
        &self,
        expr: &Expr,
        state: &mut GvnState,
        types: &CheckResult,
        metadata: &mut MetadataStore,
    ) -> Option<u32> {
        let number = match &expr.kind {
            ExprKind::Number(n) => Some(state.number_for_key(format!("lit:{}", n))),
            ExprKind::Bool(b) => Some(state.number_for_key(format!("lit:{}", b))),
            ExprKind::Str(_) => None,

            ExprKind::Identifier(_) => types.use_of(expr.id).map(|sym| state.var_number(sym)),

            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.number_expr(lhs, state, types, metadata)?;
                let r = self.number_expr(rhs, state, types, metadata)?;
                let (a, b) = if op.is_commutative() && r < l {
                    (r, l)
                } else {
                    (l, r)
                };
                Some(state.number_for_key(format!("{}:{}:{}", op, a, b)))
            }

            ExprKind::Unary { op, operand } => {
                if *op == UnaryOp::Deref || *op == UnaryOp::AddressOf {
                    // Memory access; dependent on stores we do not track
                    self.number_expr(operand, state, types, metadata);
                    None
                } else {
                    let n = self.number_expr(operand, state, types, metadata)?;
                    Some(state.number_for_key(format!("{}:{}", op, n)))
                }
            }

            ExprKind::Cast { expr: inner, ty } => {
                let n = self.number_expr(inner, state, types, metadata)?;
                Some(state.number_for_key(format!("cast:{:?}:{}", ty.kind, n)))
            }

            ExprKind::Member { .. } => types.use_of(expr.id).map(|sym| state.var_number(sym)),

            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let c = self.number_expr(cond, state, types, metadata)?;
                let t = self.number_expr(then_expr, state, types, metadata)?;
                let e = self.number_expr(else_expr, state, types, metadata)?;
                Some(state.number_for_key(format!("sel:{}:{}:{}", c, t, e)))
            }

            ExprKind::Call { callee, args } => {
                // Arguments still get numbered for their own redundancy
                for arg in args {
                    self.number_expr(arg, state, types, metadata);
                }
                let _ = callee;
                None
            }

            ExprKind::Index { base, index } => {
                self.number_expr(base, state, types, metadata);
                self.number_expr(index, state, types, metadata);
                None
            }
        };

        if let Some(n) = number {
            metadata.set(expr.id, MetaKey::GVNNumber, MetaValue::Int(n as i64));
        }
        number
    }

    /// Number a statement-level expression and mark redundancy against
    /// the holder table. `holder_name` is the variable the value lands in.
    fn process_value(
        &self,
        expr: &Expr,
        holder_name: Option<&str>,
        state: &mut GvnState,
        ctx: &mut AnalysisContext,
    ) -> Option<u32> {
        let number = self.number_expr(expr, state, ctx.types, ctx.metadata)?;

        // Trivial expressions are not worth replacing
        let compound = !matches!(
            expr.kind,
            ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Identifier(_)
        );
        if compound {
            if let Some(first_holder) = state.holders.get(&number) {
                ctx.metadata
                    .set(expr.id, MetaKey::GVNRedundant, MetaValue::Bool(true));
                ctx.metadata.set(
                    expr.id,
                    MetaKey::GVNReplacement,
                    MetaValue::Str(first_holder.clone()),
                );
            } else if let Some(holder) = holder_name {
                state.holders.insert(number, holder.to_string());
            }
        }
        Some(number)
    }

    fn process_block(&self, block: &Block, state: &mut GvnState, ctx: &mut AnalysisContext) {
        for stmt in &block.statements {
            self.process_statement(stmt, state, ctx);
        }
    }

    fn process_statement(&self, stmt: &Statement, state: &mut GvnState, ctx: &mut AnalysisContext) {
        match stmt {
            Statement::Let(var) => {
                if let Some(init) = &var.init {
                    let number = self.process_value(init, Some(&var.name.name), state, ctx);
                    if let (Some(symbol), Some(n)) = (ctx.bindings.symbol_of(var.id), number) {
                        state.var_value.insert(symbol, n);
                    } else if let Some(symbol) = ctx.bindings.symbol_of(var.id) {
                        state.invalidate_var(symbol, &var.name.name);
                    }
                }
            }

            Statement::Assign(assign) => {
                let holder = assign.target.as_identifier().map(str::to_string);
                let number = self.process_value(&assign.value, holder.as_deref(), state, ctx);
                if let ExprKind::Identifier(name) = &assign.target.kind {
                    if let Some(symbol) = ctx.types.use_of(assign.target.id) {
                        match (assign.op == blend65_parser::ast::AssignOp::Assign, number) {
                            (true, Some(n)) => {
                                state.holders.retain(|_, h| h != name);
                                state.var_value.insert(symbol, n);
                            }
                            _ => state.invalidate_var(symbol, name),
                        }
                    }
                }
            }

            Statement::If(s) => {
                self.process_value(&s.condition, None, state, ctx);
                // Each arm numbers in isolation
                let snapshot = state.clone();
                self.process_block(&s.then_branch, state, ctx);
                *state = snapshot.clone();
                if let Some(else_branch) = &s.else_branch {
                    self.process_statement(else_branch, state, ctx);
                }
                *state = snapshot;
                self.invalidate_written(&s.then_branch, state, ctx);
                if let Some(else_branch) = &s.else_branch {
                    self.invalidate_written_stmt(else_branch, state, ctx);
                }
            }

            Statement::While(s) => {
                // Loop-carried writes invalidate before the body runs
                self.invalidate_written(&s.body, state, ctx);
                self.process_value(&s.condition, None, state, ctx);
                let snapshot = state.clone();
                self.process_block(&s.body, state, ctx);
                *state = snapshot;
            }

            Statement::For(s) => {
                self.process_value(&s.from, None, state, ctx);
                self.process_value(&s.to, None, state, ctx);
                if let Some(symbol) = ctx.bindings.symbol_of(s.id) {
                    state.invalidate_var(symbol, &s.variable.name);
                }
                self.invalidate_written(&s.body, state, ctx);
                let snapshot = state.clone();
                self.process_block(&s.body, state, ctx);
                *state = snapshot;
            }

            Statement::Return(r) => {
                if let Some(value) = &r.value {
                    self.process_value(value, None, state, ctx);
                }
            }

            Statement::Expression(e) => {
                self.process_value(&e.expr, None, state, ctx);
            }

            Statement::Block(b) => self.process_block(b, state, ctx),

            Statement::Break(_) | Statement::Continue(_) => {}
        }
    }

    /// Give fresh numbers to everything a block writes.
    fn invalidate_written(&self, block: &Block, state: &mut GvnState, ctx: &AnalysisContext) {
        blend65_parser::ast::visitor::walk_stmts(block, &mut |stmt| match stmt {
            Statement::Assign(assign) => {
                if let ExprKind::Identifier(name) = &assign.target.kind {
                    if let Some(symbol) = ctx.types.use_of(assign.target.id) {
                        state.invalidate_var(symbol, name);
                    }
                }
            }
            Statement::For(s) => {
                if let Some(symbol) = ctx.bindings.symbol_of(s.id) {
                    state.invalidate_var(symbol, &s.variable.name);
                }
            }
            _ => {}
        });
    }

    fn invalidate_written_stmt(
        &self,
        stmt: &Statement,
        state: &mut GvnState,
        ctx: &AnalysisContext,
    ) {
        match stmt {
            Statement::Block(b) => self.invalidate_written(b, state, ctx),
            Statement::If(s) => {
                self.invalidate_written(&s.then_branch, state, ctx);
                if let Some(else_branch) = &s.else_branch {
                    self.invalidate_written_stmt(else_branch, state, ctx);
                }
            }
            other => {
                if let Statement::Assign(assign) = other {
                    if let ExprKind::Identifier(name) = &assign.target.kind {
                        if let Some(symbol) = ctx.types.use_of(assign.target.id) {
                            state.invalidate_var(symbol, name);
                        }
                    }
                }
            }
        }
    }
}

impl Analyzer for GvnAnalysis {
    fn name(&self) -> &'static str {
        "gvn"
    }

    fn tier(&self) -> Tier {
        Tier::Advanced
    }

    fn analyze(&mut self, ctx: &mut AnalysisContext) {
        let program = ctx.program;
        for func in program.functions() {
            let mut state = GvnState::default();
            self.process_block(&func.body, &mut state, ctx);
        }
    }
}
