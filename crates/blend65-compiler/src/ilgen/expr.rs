//! Expression lowering.
//!
//! Returns the register carrying the value, or `None` for `void`
//! expressions (calls to void functions, failed subtrees). Numeric
//! promotion happens here: `byte` widens to `word` wherever the wider
//! operand demands it.

use crate::error::CompileError;
use blend65_checker::SymbolPayload;
use blend65_parser::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use blend65_types::Type;
use blend65_il::{BinOp, CmpOp, IlType, InstrKind, Register, Terminator};

use super::IlGenerator;

impl IlGenerator<'_> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Option<Register> {
        match &expr.kind {
            ExprKind::Number(n) => {
                let ty = IlType::from_language(&self.expr_type(expr.id));
                self.emit(InstrKind::Const { value: *n as u16 }, Some(ty))
            }

            ExprKind::Bool(b) => self.emit(InstrKind::ConstBool { value: *b }, Some(IlType::Bool)),

            ExprKind::Str(text) => {
                let name = self.intern_string(text);
                self.emit(InstrKind::AddressOfGlobal { name }, Some(IlType::Ptr))
            }

            ExprKind::Identifier(_) => self.lower_identifier(expr),

            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(expr, *op, lhs, rhs),

            ExprKind::Unary { op, operand } => self.lower_unary(expr, *op, operand),

            ExprKind::Call { callee, args } => self.lower_call(expr, callee, args),

            ExprKind::Index { base, index } => {
                let elem_ty = IlType::from_language(&self.expr_type(expr.id));
                let addr = self.lower_element_address(base, index)?;
                let kind = if elem_ty == IlType::Word {
                    InstrKind::PeekW { addr }
                } else {
                    InstrKind::Peek { addr }
                };
                self.emit(kind, Some(elem_ty))
            }

            ExprKind::Member { .. } => {
                // Enum member access resolves to its constant value
                let Some(symbol) = self.types.use_of(expr.id) else {
                    self.error(CompileError::internal("unresolved member expression"));
                    return None;
                };
                let SymbolPayload::EnumMember { value } =
                    self.bindings.table.symbol(symbol).payload
                else {
                    self.error(CompileError::unsupported("member access on non-enum value"));
                    return None;
                };
                let ty = IlType::from_language(&self.expr_type(expr.id));
                self.emit(InstrKind::Const { value: value as u16 }, Some(ty))
            }

            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.lower_ternary(expr, cond, then_expr, else_expr),

            ExprKind::Cast { expr: inner, .. } => {
                let target = IlType::from_language(&self.expr_type(expr.id));
                let value = self.lower_expr(inner)?;
                Some(self.coerce(value, target))
            }
        }
    }

    fn lower_identifier(&mut self, expr: &Expr) -> Option<Register> {
        let symbol = self.types.use_of(expr.id)?;
        let ty = IlType::from_language(&self.symbol_type(symbol));
        let symbol_data = self.bindings.table.symbol(symbol);

        // Compile-time constants fold to immediates
        match &symbol_data.payload {
            SymbolPayload::EnumMember { value } => {
                let value = *value as u16;
                return self.emit(InstrKind::Const { value }, Some(ty));
            }
            SymbolPayload::Constant { value: Some(value) } => {
                let value = *value as u16;
                return self.emit(InstrKind::Const { value }, Some(ty));
            }
            _ => {}
        }

        if self.is_module_scope_symbol(symbol) {
            if let Some(address) = self.mapped_address(symbol) {
                return self.load_from_address(address, ty);
            }
            // Arrays decay to their address
            if matches!(self.symbol_type(symbol), Type::Array(_)) {
                let name = symbol_data.name.clone();
                return self.emit(InstrKind::AddressOfGlobal { name }, Some(IlType::Ptr));
            }
            let name = symbol_data.name.clone();
            return self.emit(InstrKind::LoadGlobal { name }, Some(ty));
        }

        let slot = self.slot_name(symbol);
        self.emit(InstrKind::LoadVar { name: slot }, Some(ty))
    }

    fn load_from_address(&mut self, address: u16, ty: IlType) -> Option<Register> {
        if ty == IlType::Word || ty == IlType::Ptr {
            let addr = self.emit(InstrKind::Const { value: address }, Some(IlType::Ptr))?;
            self.emit(InstrKind::PeekW { addr }, Some(ty))
        } else {
            self.emit(InstrKind::HardwareRead { addr: address }, Some(ty))
        }
    }

    fn lower_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Option<Register> {
        if op.is_logical() {
            return self.lower_short_circuit(op, lhs, rhs);
        }

        let lhs_reg = self.lower_expr(lhs)?;
        let rhs_reg = self.lower_expr(rhs)?;

        if op.is_comparison() {
            // Compare at the wider operand type
            let ty = if lhs_reg.ty == IlType::Word || rhs_reg.ty == IlType::Word {
                IlType::Word
            } else {
                lhs_reg.ty
            };
            let lhs_reg = self.coerce(lhs_reg, ty);
            let rhs_reg = self.coerce(rhs_reg, ty);
            let cmp = match op {
                BinaryOp::Equal => CmpOp::Eq,
                BinaryOp::NotEqual => CmpOp::Ne,
                BinaryOp::Less => CmpOp::Lt,
                BinaryOp::LessEqual => CmpOp::Le,
                BinaryOp::Greater => CmpOp::Gt,
                BinaryOp::GreaterEqual => CmpOp::Ge,
                _ => unreachable!(),
            };
            return self.emit(
                InstrKind::Compare {
                    op: cmp,
                    lhs: lhs_reg,
                    rhs: rhs_reg,
                },
                Some(IlType::Bool),
            );
        }

        let ty = IlType::from_language(&self.expr_type(expr.id));
        let lhs_reg = self.coerce(lhs_reg, ty);
        let rhs_reg = self.coerce(rhs_reg, ty);
        let bin = match op {
            BinaryOp::Add => BinOp::Add,
            BinaryOp::Sub => BinOp::Sub,
            BinaryOp::Mul => BinOp::Mul,
            BinaryOp::Div => BinOp::Div,
            BinaryOp::Mod => BinOp::Mod,
            BinaryOp::BitAnd => BinOp::And,
            BinaryOp::BitOr => BinOp::Or,
            BinaryOp::BitXor => BinOp::Xor,
            BinaryOp::ShiftLeft => BinOp::Shl,
            BinaryOp::ShiftRight => BinOp::Shr,
            _ => unreachable!(),
        };
        self.emit(
            InstrKind::Binary {
                op: bin,
                lhs: lhs_reg,
                rhs: rhs_reg,
            },
            Some(ty),
        )
    }

    /// `&&` / `||` with proper short-circuiting through a temp slot.
    fn lower_short_circuit(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Register> {
        let slot = self.temp_slot();

        let lhs_reg = self.lower_expr(lhs)?;
        self.emit(
            InstrKind::StoreVar {
                name: slot.clone(),
                value: lhs_reg.clone(),
            },
            None,
        );

        let rhs_block = self.create_block(Some("sc_rhs"));
        let end_block = self.create_block(Some("sc_end"));

        // && evaluates the rhs when lhs is true; || when lhs is false
        let (then_block, else_block) = if op == BinaryOp::And {
            (rhs_block, end_block)
        } else {
            (end_block, rhs_block)
        };
        self.set_terminator(Terminator::CondBranch {
            cond: lhs_reg,
            then_block,
            else_block,
        });

        self.seal_and_switch(rhs_block);
        if let Some(rhs_reg) = self.lower_expr(rhs) {
            self.emit(
                InstrKind::StoreVar {
                    name: slot.clone(),
                    value: rhs_reg,
                },
                None,
            );
        }
        if !self.current_block_terminated() {
            self.set_terminator(Terminator::Branch { target: end_block });
        }

        self.seal_and_switch(end_block);
        self.emit(InstrKind::LoadVar { name: slot }, Some(IlType::Bool))
    }

    fn lower_unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> Option<Register> {
        match op {
            UnaryOp::Not | UnaryOp::BitNot => {
                let value = self.lower_expr(operand)?;
                let ty = value.ty;
                self.emit(InstrKind::Not { value }, Some(ty))
            }
            UnaryOp::Neg => {
                let value = self.lower_expr(operand)?;
                let ty = value.ty;
                self.emit(InstrKind::Neg { value }, Some(ty))
            }
            UnaryOp::Deref => {
                let pointee_ty = IlType::from_language(&self.expr_type(expr.id));
                let addr = self.lower_expr(operand)?;
                let addr = self.coerce(addr, IlType::Ptr);
                let kind = if pointee_ty == IlType::Word {
                    InstrKind::PeekW { addr }
                } else {
                    InstrKind::Peek { addr }
                };
                self.emit(kind, Some(pointee_ty))
            }
            UnaryOp::AddressOf => match &operand.kind {
                ExprKind::Identifier(_) => {
                    let symbol = self.types.use_of(operand.id)?;
                    if self.is_module_scope_symbol(symbol) {
                        if let Some(address) = self.mapped_address(symbol) {
                            return self
                                .emit(InstrKind::Const { value: address }, Some(IlType::Ptr));
                        }
                        let name = self.bindings.table.symbol(symbol).name.clone();
                        self.emit(InstrKind::AddressOfGlobal { name }, Some(IlType::Ptr))
                    } else {
                        self.error(CompileError::unsupported(
                            "address of a local variable (locals have no stable address)",
                        ));
                        None
                    }
                }
                ExprKind::Index { base, index } => self.lower_element_address(base, index),
                _ => {
                    self.error(CompileError::internal(
                        "address-of target survived checking but cannot be lowered",
                    ));
                    None
                }
            },
        }
    }

    /// Address of `base[index]`: base address plus scaled index.
    pub(crate) fn lower_element_address(
        &mut self,
        base: &Expr,
        index: &Expr,
    ) -> Option<Register> {
        let base_ty = self.expr_type(base.id);
        let elem_size = match &base_ty {
            Type::Array(arr) => arr.element.size_in_bytes(),
            Type::Pointer(pointee) => pointee.size_in_bytes(),
            _ => 1,
        };

        let base_reg = self.lower_expr(base)?;
        let base_reg = self.coerce(base_reg, IlType::Ptr);

        let index_reg = self.lower_expr(index)?;
        let index_reg = self.coerce(index_reg, IlType::Ptr);

        let offset = if elem_size > 1 {
            // Scale by shifting: element sizes here are 1 or 2
            let shift = self.emit(InstrKind::Const { value: 1 }, Some(IlType::Ptr))?;
            self.emit(
                InstrKind::Binary {
                    op: BinOp::Shl,
                    lhs: index_reg,
                    rhs: shift,
                },
                Some(IlType::Ptr),
            )?
        } else {
            index_reg
        };

        self.emit(
            InstrKind::Binary {
                op: BinOp::Add,
                lhs: base_reg,
                rhs: offset,
            },
            Some(IlType::Ptr),
        )
    }

    fn lower_call(&mut self, expr: &Expr, callee: &Expr, args: &[Expr]) -> Option<Register> {
        let name = callee.as_identifier()?;

        match name {
            "peek" | "peekw" | "poke" | "pokew" => {
                return self.lower_memory_intrinsic(name, args)
            }
            "lo" => {
                let value = self.lower_expr(args.first()?)?;
                let value = self.coerce(value, IlType::Word);
                return self.emit(InstrKind::Truncate { value }, Some(IlType::Byte));
            }
            "hi" => {
                let value = self.lower_expr(args.first()?)?;
                let value = self.coerce(value, IlType::Word);
                let eight = self.emit(InstrKind::Const { value: 8 }, Some(IlType::Word))?;
                let shifted = self.emit(
                    InstrKind::Binary {
                        op: BinOp::Shr,
                        lhs: value,
                        rhs: eight,
                    },
                    Some(IlType::Word),
                )?;
                return self.emit(InstrKind::Truncate { value: shifted }, Some(IlType::Byte));
            }
            "sizeof" => return self.lower_sizeof(args),
            "length" => return self.lower_length(args),
            _ => {}
        }

        // User function call
        let signature = self
            .types
            .use_of(callee.id)
            .and_then(|id| self.bindings.table.symbol(id).ty.clone());
        let (param_types, return_ty) = match &signature {
            Some(Type::Function(f)) => (
                f.params.clone(),
                IlType::from_language(&f.return_type),
            ),
            _ => (Vec::new(), IlType::from_language(&self.expr_type(expr.id))),
        };

        let mut arg_regs = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let reg = self.lower_expr(arg)?;
            let reg = match param_types.get(i) {
                Some(param_ty) => self.coerce(reg, IlType::from_language(param_ty)),
                None => reg,
            };
            arg_regs.push(reg);
        }

        let result_ty = if return_ty == IlType::Void {
            None
        } else {
            Some(return_ty)
        };
        self.emit(
            InstrKind::Call {
                callee: name.to_string(),
                args: arg_regs,
            },
            result_ty,
        )
    }

    fn lower_memory_intrinsic(&mut self, name: &str, args: &[Expr]) -> Option<Register> {
        let addr = self.lower_expr(args.first()?)?;
        let addr = self.coerce(addr, IlType::Ptr);
        match name {
            "peek" => self.emit(InstrKind::Peek { addr }, Some(IlType::Byte)),
            "peekw" => self.emit(InstrKind::PeekW { addr }, Some(IlType::Word)),
            "poke" => {
                let value = self.lower_expr(args.get(1)?)?;
                let value = self.coerce(value, IlType::Byte);
                self.emit(InstrKind::Poke { addr, value }, None);
                None
            }
            "pokew" => {
                let value = self.lower_expr(args.get(1)?)?;
                let value = self.coerce(value, IlType::Word);
                self.emit(InstrKind::PokeW { addr, value }, None);
                None
            }
            _ => None,
        }
    }

    /// `sizeof(type)` / `sizeof(expr)` folds at lowering time.
    fn lower_sizeof(&mut self, args: &[Expr]) -> Option<Register> {
        let arg = args.first()?;
        let size = if let Some(name) = arg.as_identifier() {
            match blend65_types::primitive_from_name(name) {
                Some(ty) => ty.size_in_bytes(),
                None => self
                    .types
                    .use_of(arg.id)
                    .map(|id| self.symbol_type(id).size_in_bytes())
                    .unwrap_or(0),
            }
        } else {
            self.expr_type(arg.id).size_in_bytes()
        };
        self.emit(
            InstrKind::Const {
                value: size.min(u16::MAX as u32) as u16,
            },
            Some(IlType::Word),
        )
    }

    /// `length(arr)` folds to the array's element count.
    fn lower_length(&mut self, args: &[Expr]) -> Option<Register> {
        let arg = args.first()?;
        let len = match self.expr_type(arg.id) {
            Type::Array(arr) => arr.length.unwrap_or(0),
            _ => 0,
        };
        self.emit(InstrKind::Const { value: len }, Some(IlType::Word))
    }

    fn lower_ternary(
        &mut self,
        expr: &Expr,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
    ) -> Option<Register> {
        let result_ty = IlType::from_language(&self.expr_type(expr.id));
        let slot = self.temp_slot();

        let cond_reg = self.lower_expr(cond)?;
        let then_block = self.create_block(Some("sel_then"));
        let else_block = self.create_block(Some("sel_else"));
        let end_block = self.create_block(Some("sel_end"));

        self.set_terminator(Terminator::CondBranch {
            cond: cond_reg,
            then_block,
            else_block,
        });

        self.seal_and_switch(then_block);
        if let Some(value) = self.lower_expr(then_expr) {
            let value = self.coerce(value, result_ty);
            self.emit(
                InstrKind::StoreVar {
                    name: slot.clone(),
                    value,
                },
                None,
            );
        }
        if !self.current_block_terminated() {
            self.set_terminator(Terminator::Branch { target: end_block });
        }

        self.seal_and_switch(else_block);
        if let Some(value) = self.lower_expr(else_expr) {
            let value = self.coerce(value, result_ty);
            self.emit(
                InstrKind::StoreVar {
                    name: slot.clone(),
                    value,
                },
                None,
            );
        }
        if !self.current_block_terminated() {
            self.set_terminator(Terminator::Branch { target: end_block });
        }

        self.seal_and_switch(end_block);
        self.emit(InstrKind::LoadVar { name: slot }, Some(result_ty))
    }
}
