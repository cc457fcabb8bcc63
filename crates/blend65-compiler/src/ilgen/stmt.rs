//! Statement lowering.

use crate::error::CompileError;
use blend65_parser::ast::{
    AssignOp, AssignStmt, Block, ExprKind, ForStmt, IfStmt, Statement, UnaryOp, VariableDecl,
    WhileStmt,
};
use blend65_il::{BinOp, IlType, InstrKind, Register, Terminator};

use super::IlGenerator;

impl IlGenerator<'_> {
    pub(crate) fn lower_stmt(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Let(var) => self.lower_let(var),
            Statement::Assign(assign) => self.lower_assign(assign),
            Statement::If(s) => self.lower_if(s),
            Statement::While(s) => self.lower_while(s),
            Statement::For(s) => self.lower_for(s),
            Statement::Break(_) => {
                if let Some(&(_, break_target)) = self.loop_stack.last() {
                    self.set_terminator(Terminator::Branch {
                        target: break_target,
                    });
                    let dead = self.create_block(None);
                    self.seal_and_switch(dead);
                }
            }
            Statement::Continue(_) => {
                if let Some(&(continue_target, _)) = self.loop_stack.last() {
                    self.set_terminator(Terminator::Branch {
                        target: continue_target,
                    });
                    let dead = self.create_block(None);
                    self.seal_and_switch(dead);
                }
            }
            Statement::Return(r) => {
                let value = r.value.as_ref().and_then(|expr| {
                    let reg = self.lower_expr(expr)?;
                    let ret_ty = self.func_mut().return_type;
                    Some(self.coerce(reg, ret_ty))
                });
                self.set_terminator(Terminator::Return { value });
                let dead = self.create_block(None);
                self.seal_and_switch(dead);
            }
            Statement::Expression(e) => {
                self.lower_expr(&e.expr);
            }
            Statement::Block(b) => self.lower_block_stmts(b),
        }
    }

    pub(crate) fn lower_block_stmts(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.lower_stmt(stmt);
        }
    }

    fn lower_let(&mut self, var: &VariableDecl) {
        let Some(init) = &var.init else {
            // Declaration without initializer: the slot materializes on
            // first store; definite assignment guards the reads
            return;
        };
        let Some(symbol) = self.bindings.symbol_of(var.id) else {
            return;
        };
        let ty = blend65_il::IlType::from_language(&self.symbol_type(symbol));
        let Some(value) = self.lower_expr(init) else {
            return;
        };
        let value = self.coerce(value, ty);
        let slot = self.slot_name(symbol);
        self.emit(InstrKind::StoreVar { name: slot, value }, None);
    }

    fn lower_assign(&mut self, assign: &AssignStmt) {
        // Compound assignment reads the target first
        let rhs = match assign.op {
            AssignOp::Assign => self.lower_expr(&assign.value),
            _ => {
                let current = self.lower_expr(&assign.target);
                let value = self.lower_expr(&assign.value);
                let (Some(current), Some(value)) = (current, value) else {
                    return;
                };
                let op = match assign.op {
                    AssignOp::AddAssign => BinOp::Add,
                    AssignOp::SubAssign => BinOp::Sub,
                    AssignOp::MulAssign => BinOp::Mul,
                    AssignOp::DivAssign => BinOp::Div,
                    AssignOp::ModAssign => BinOp::Mod,
                    AssignOp::BitAndAssign => BinOp::And,
                    AssignOp::BitOrAssign => BinOp::Or,
                    AssignOp::BitXorAssign => BinOp::Xor,
                    AssignOp::Assign => unreachable!(),
                };
                let ty = if current.ty == IlType::Word || value.ty == IlType::Word {
                    IlType::Word
                } else {
                    current.ty
                };
                let lhs = self.coerce(current, ty);
                let rhs = self.coerce(value, ty);
                self.emit(InstrKind::Binary { op, lhs, rhs }, Some(ty))
            }
        };
        let Some(rhs) = rhs else { return };
        self.store_into(&assign.target, rhs);
    }

    /// Store `value` into an lvalue expression.
    pub(crate) fn store_into(&mut self, target: &blend65_parser::ast::Expr, value: Register) {
        match &target.kind {
            ExprKind::Identifier(_) => {
                let Some(symbol) = self.types.use_of(target.id) else {
                    return;
                };
                let ty = blend65_il::IlType::from_language(&self.symbol_type(symbol));
                let value = self.coerce(value, ty);

                if self.is_module_scope_symbol(symbol) {
                    if let Some(address) = self.mapped_address(symbol) {
                        self.store_to_address(address, value, ty);
                    } else {
                        let name = self.bindings.table.symbol(symbol).name.clone();
                        self.emit(InstrKind::StoreGlobal { name, value }, None);
                    }
                } else {
                    let slot = self.slot_name(symbol);
                    self.emit(InstrKind::StoreVar { name: slot, value }, None);
                }
            }

            ExprKind::Index { base, index } => {
                let elem_ty = blend65_il::IlType::from_language(&self.expr_type(target.id));
                let Some(addr) = self.lower_element_address(base, index) else {
                    return;
                };
                let value = self.coerce(value, elem_ty);
                let kind = if elem_ty == IlType::Word {
                    InstrKind::PokeW { addr, value }
                } else {
                    InstrKind::Poke { addr, value }
                };
                self.emit(kind, None);
            }

            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => {
                let pointee_ty = blend65_il::IlType::from_language(&self.expr_type(target.id));
                let Some(addr) = self.lower_expr(operand) else {
                    return;
                };
                let addr = self.coerce(addr, IlType::Ptr);
                let value = self.coerce(value, pointee_ty);
                let kind = if pointee_ty == IlType::Word {
                    InstrKind::PokeW { addr, value }
                } else {
                    InstrKind::Poke { addr, value }
                };
                self.emit(kind, None);
            }

            _ => self.error(CompileError::internal(
                "assignment target survived checking but cannot be lowered",
            )),
        }
    }

    /// Write to a fixed address: hardware write for bytes, split word
    /// stores for words.
    fn store_to_address(&mut self, address: u16, value: Register, ty: IlType) {
        if ty == IlType::Word || ty == IlType::Ptr {
            let addr = self
                .emit(InstrKind::Const { value: address }, Some(IlType::Ptr))
                .expect("const produces a register");
            self.emit(InstrKind::PokeW { addr, value }, None);
        } else {
            self.emit(InstrKind::HardwareWrite { addr: address, value }, None);
        }
    }

    fn lower_if(&mut self, s: &IfStmt) {
        let Some(cond) = self.lower_expr(&s.condition) else {
            return;
        };

        let then_block = self.create_block(Some("then"));
        let else_block = self.create_block(Some("else"));
        let merge_block = self.create_block(Some("endif"));

        self.set_terminator(Terminator::CondBranch {
            cond,
            then_block,
            else_block,
        });

        self.seal_and_switch(then_block);
        self.lower_block_stmts(&s.then_branch);
        if !self.current_block_terminated() {
            self.set_terminator(Terminator::Branch {
                target: merge_block,
            });
        }

        self.seal_and_switch(else_block);
        if let Some(else_branch) = &s.else_branch {
            self.lower_stmt(else_branch);
        }
        if !self.current_block_terminated() {
            self.set_terminator(Terminator::Branch {
                target: merge_block,
            });
        }

        self.seal_and_switch(merge_block);
    }

    fn lower_while(&mut self, s: &WhileStmt) {
        let header = self.create_block(Some("while"));
        let body = self.create_block(Some("body"));
        let after = self.create_block(Some("endwhile"));

        self.set_terminator(Terminator::Branch { target: header });

        self.seal_and_switch(header);
        let Some(cond) = self.lower_expr(&s.condition) else {
            return;
        };
        self.set_terminator(Terminator::CondBranch {
            cond,
            then_block: body,
            else_block: after,
        });

        self.seal_and_switch(body);
        self.loop_stack.push((header, after));
        self.lower_block_stmts(&s.body);
        self.loop_stack.pop();
        if !self.current_block_terminated() {
            self.set_terminator(Terminator::Branch { target: header });
        }

        self.seal_and_switch(after);
    }

    /// `for i = a to b` — inclusive upper bound; the bound is evaluated
    /// once before the loop.
    fn lower_for(&mut self, s: &ForStmt) {
        let Some(symbol) = self.bindings.symbol_of(s.id) else {
            return;
        };
        let var_ty = blend65_il::IlType::from_language(&self.symbol_type(symbol));
        let slot = self.slot_name(symbol);

        let Some(from) = self.lower_expr(&s.from) else {
            return;
        };
        let from = self.coerce(from, var_ty);
        self.emit(
            InstrKind::StoreVar {
                name: slot.clone(),
                value: from,
            },
            None,
        );

        // Bound evaluated once, kept in its own slot
        let Some(to) = self.lower_expr(&s.to) else {
            return;
        };
        let to = self.coerce(to, var_ty);
        let bound_slot = self.temp_slot();
        self.emit(
            InstrKind::StoreVar {
                name: bound_slot.clone(),
                value: to,
            },
            None,
        );

        let header = self.create_block(Some("for"));
        let body = self.create_block(Some("body"));
        let step = self.create_block(Some("step"));
        let after = self.create_block(Some("endfor"));

        self.set_terminator(Terminator::Branch { target: header });

        // header: continue while i <= bound
        self.seal_and_switch(header);
        let i = self
            .emit(InstrKind::LoadVar { name: slot.clone() }, Some(var_ty))
            .expect("load produces a register");
        let bound = self
            .emit(
                InstrKind::LoadVar {
                    name: bound_slot.clone(),
                },
                Some(var_ty),
            )
            .expect("load produces a register");
        let cond = self
            .emit(
                InstrKind::Compare {
                    op: blend65_il::CmpOp::Le,
                    lhs: i,
                    rhs: bound,
                },
                Some(IlType::Bool),
            )
            .expect("compare produces a register");
        self.set_terminator(Terminator::CondBranch {
            cond,
            then_block: body,
            else_block: after,
        });

        // body: continue jumps to step, break to after
        self.seal_and_switch(body);
        self.loop_stack.push((step, after));
        self.lower_block_stmts(&s.body);
        self.loop_stack.pop();
        if !self.current_block_terminated() {
            self.set_terminator(Terminator::Branch { target: step });
        }

        // step: i = i + 1
        self.seal_and_switch(step);
        let i = self
            .emit(InstrKind::LoadVar { name: slot.clone() }, Some(var_ty))
            .expect("load produces a register");
        let one = self
            .emit(InstrKind::Const { value: 1 }, Some(var_ty))
            .expect("const produces a register");
        let next = self
            .emit(
                InstrKind::Binary {
                    op: BinOp::Add,
                    lhs: i,
                    rhs: one,
                },
                Some(var_ty),
            )
            .expect("add produces a register");
        self.emit(InstrKind::StoreVar { name: slot, value: next }, None);
        self.set_terminator(Terminator::Branch { target: header });

        self.seal_and_switch(after);
    }
}
