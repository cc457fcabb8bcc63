//! Type resolution and type checking.
//!
//! Walks the bound AST, infers types for unannotated declarations,
//! verifies every expression and statement, and records the type of each
//! expression node for later phases. Errors accumulate; checking always
//! continues with `unknown` standing in for failed types.

use crate::binder::Bindings;
use crate::symbols::{ScopeId, SymbolId, SymbolKind, SymbolPayload};
use blend65_parser::ast::{
    AssignOp, BinaryOp, Block, Declaration, Expr, ExprKind, FunctionDecl, NodeId, Program,
    Statement, UnaryOp,
};
use blend65_parser::{Diagnostic, DiagnosticCode, SourceLocation, Span};
use blend65_types::{is_assignable, primitive_from_name, Type};
use rustc_hash::FxHashMap;

/// Checker output: per-expression types and identifier-use resolution.
#[derive(Debug, Default)]
pub struct CheckResult {
    /// Type of every checked expression node
    pub expr_types: FxHashMap<NodeId, Type>,
    /// Symbol referenced by each identifier-expression node
    pub uses: FxHashMap<NodeId, SymbolId>,
}

impl CheckResult {
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.expr_types.get(&node)
    }

    pub fn use_of(&self, node: NodeId) -> Option<SymbolId> {
        self.uses.get(&node).copied()
    }
}

/// Builtin pseudo-functions lowered specially by the IL generator.
pub const INTRINSICS: &[&str] = &["peek", "poke", "peekw", "pokew", "sizeof", "length", "lo", "hi"];

/// Signature of a fixed-arity intrinsic, `None` for the polymorphic ones
/// (`sizeof`, `length`).
pub fn intrinsic_signature(name: &str) -> Option<(Vec<Type>, Type)> {
    match name {
        "peek" => Some((vec![Type::Word], Type::Byte)),
        "poke" => Some((vec![Type::Word, Type::Byte], Type::Void)),
        "peekw" => Some((vec![Type::Word], Type::Word)),
        "pokew" => Some((vec![Type::Word, Type::Word], Type::Void)),
        "lo" => Some((vec![Type::Word], Type::Byte)),
        "hi" => Some((vec![Type::Word], Type::Byte)),
        _ => None,
    }
}

/// The type checker.
pub struct TypeChecker<'a> {
    program: &'a Program,
    bindings: &'a mut Bindings,
    result: CheckResult,
    diagnostics: Vec<Diagnostic>,
    current_scope: ScopeId,
    current_return: Option<Type>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(program: &'a Program, bindings: &'a mut Bindings) -> Self {
        let module_scope = bindings.table.module_scope();
        Self {
            program,
            bindings,
            result: CheckResult::default(),
            diagnostics: Vec::new(),
            current_scope: module_scope,
            current_return: None,
        }
    }

    /// Check the whole program.
    pub fn check(mut self) -> (CheckResult, Vec<Diagnostic>) {
        let program = self.program;
        for decl in &program.declarations {
            match decl {
                Declaration::Variable(var) => {
                    self.check_variable_decl(var.id, &var.ty, &var.init, var.name.location)
                }
                Declaration::Constant(konst) => {
                    let value = Some(konst.value.clone());
                    self.check_variable_decl(konst.id, &konst.ty, &value, konst.name.location)
                }
                Declaration::Function(func) => self.check_function(func),
                Declaration::Import(_) | Declaration::MemoryMap(_) | Declaration::Enum(_) => {}
            }
        }

        (self.result, self.diagnostics)
    }

    /// Shared path for `let`/`const`, global and local.
    fn check_variable_decl(
        &mut self,
        node: NodeId,
        _annotation: &Option<blend65_parser::ast::TypeExpr>,
        init: &Option<Expr>,
        name_span: Span,
    ) {
        let symbol = self.bindings.symbol_of(node);
        let declared_ty = symbol.and_then(|id| self.bindings.table.symbol(id).ty.clone());

        let init_ty = init.as_ref().map(|expr| self.check_expr(expr));

        match (&declared_ty, &init_ty) {
            (Some(declared), Some(actual)) => {
                if !is_assignable(actual, declared) {
                    let span = init.as_ref().map(|e| e.location).unwrap_or(name_span);
                    self.type_mismatch(declared, actual, span);
                }
            }
            (None, Some(actual)) => {
                if let Some(id) = symbol {
                    self.bindings.table.set_symbol_type(id, actual.clone());
                }
            }
            (None, None) => {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnknownType,
                    "cannot infer type without an initializer",
                    self.loc(name_span),
                ));
                if let Some(id) = symbol {
                    self.bindings.table.set_symbol_type(id, Type::Unknown);
                }
            }
            (Some(_), None) => {}
        }
    }

    fn check_function(&mut self, func: &FunctionDecl) {
        let Some(scope) = self.bindings.scope_of(func.id) else {
            return;
        };
        let previous_scope = self.current_scope;
        self.current_scope = scope;

        let signature = self
            .bindings
            .symbol_of(func.id)
            .and_then(|id| self.bindings.table.symbol(id).ty.clone());
        let return_ty = match signature {
            Some(Type::Function(f)) => (*f.return_type).clone(),
            _ => Type::Void,
        };
        self.current_return = Some(return_ty.clone());

        self.check_block(&func.body);

        // Non-void functions must return on every path
        if return_ty != Type::Void && return_ty != Type::Unknown && !block_always_returns(&func.body)
        {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::MissingReturn,
                format!("function '{}' does not return on every path", func.name.name),
                self.loc(func.name.location),
            ));
        }

        self.current_return = None;
        self.current_scope = previous_scope;
    }

    fn check_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.check_statement(stmt);
        }
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Let(var) => {
                self.check_variable_decl(var.id, &var.ty, &var.init, var.name.location)
            }

            Statement::Assign(assign) => {
                let target_ty = self.check_expr(&assign.target);
                let value_ty = self.check_expr(&assign.value);

                self.check_assign_target(&assign.target);

                if assign.op == AssignOp::Assign {
                    if !is_assignable(&value_ty, &target_ty) {
                        self.type_mismatch(&target_ty, &value_ty, assign.value.location);
                    }
                } else {
                    // Compound assignment is read-op-write on numerics
                    if !target_ty.is_numeric() && !target_ty.is_unknown() {
                        self.operand_error(&target_ty, assign.target.location);
                    }
                    if !value_ty.is_numeric() && !value_ty.is_unknown() {
                        self.operand_error(&value_ty, assign.value.location);
                    }
                    if !is_assignable(&value_ty, &target_ty) {
                        // The widened intermediate would narrow on store
                        self.diagnostics.push(Diagnostic::error(
                            DiagnosticCode::NarrowingConversionRequired,
                            format!(
                                "compound assignment would narrow '{}' into '{}'",
                                value_ty, target_ty
                            ),
                            self.loc(assign.value.location),
                        ));
                    }
                }
            }

            Statement::If(s) => {
                self.expect_bool(&s.condition);
                self.in_scope(s.then_branch.id, |this| this.check_block(&s.then_branch));
                if let Some(else_branch) = &s.else_branch {
                    match else_branch.as_ref() {
                        Statement::Block(b) => self.in_scope(b.id, |this| this.check_block(b)),
                        other => self.check_statement(other),
                    }
                }
            }

            Statement::While(s) => {
                self.expect_bool(&s.condition);
                self.in_scope(s.id, |this| this.check_block(&s.body));
            }

            Statement::For(s) => {
                let from_ty = self.check_expr(&s.from);
                let to_ty = self.check_expr(&s.to);
                for (ty, expr) in [(&from_ty, &s.from), (&to_ty, &s.to)] {
                    if !ty.is_numeric() && !ty.is_unknown() {
                        self.operand_error(ty, expr.location);
                    }
                }
                // Induction variable is as wide as the wider bound
                let var_ty = if from_ty == Type::Word || to_ty == Type::Word {
                    Type::Word
                } else {
                    Type::Byte
                };
                if let Some(id) = self.bindings.symbol_of(s.id) {
                    self.bindings.table.set_symbol_type(id, var_ty);
                }
                self.in_scope(s.id, |this| this.check_block(&s.body));
            }

            Statement::Break(s) => {
                if self.bindings.table.loop_depth_at(self.current_scope) == 0 {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::InvalidBreak,
                        "'break' outside of a loop",
                        self.loc(s.location),
                    ));
                }
            }

            Statement::Continue(s) => {
                if self.bindings.table.loop_depth_at(self.current_scope) == 0 {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::InvalidContinue,
                        "'continue' outside of a loop",
                        self.loc(s.location),
                    ));
                }
            }

            Statement::Return(s) => {
                let expected = self.current_return.clone().unwrap_or(Type::Void);
                match (&s.value, expected) {
                    (Some(expr), expected) => {
                        let actual = self.check_expr(expr);
                        if expected == Type::Void {
                            self.diagnostics.push(Diagnostic::error(
                                DiagnosticCode::TypeMismatch,
                                "void function cannot return a value",
                                self.loc(expr.location),
                            ));
                        } else if !is_assignable(&actual, &expected) {
                            self.type_mismatch(&expected, &actual, expr.location);
                        }
                    }
                    (None, expected) => {
                        if expected != Type::Void && !expected.is_unknown() {
                            self.diagnostics.push(Diagnostic::error(
                                DiagnosticCode::TypeMismatch,
                                format!("expected a return value of type '{}'", expected),
                                self.loc(s.location),
                            ));
                        }
                    }
                }
            }

            Statement::Expression(s) => {
                self.check_expr(&s.expr);
            }

            Statement::Block(b) => self.in_scope(b.id, |this| this.check_block(b)),
        }
    }

    /// Type of one expression, recorded in the result table.
    fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.check_expr_inner(expr);
        self.result.expr_types.insert(expr.id, ty.clone());
        ty
    }

    fn check_expr_inner(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Number(n) => {
                if (0..=0xFF).contains(n) {
                    Type::Byte
                } else if (0..=0xFFFF).contains(n) {
                    Type::Word
                } else {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::InvalidType,
                        format!("number literal {} does not fit in 16 bits", n),
                        self.loc(expr.location),
                    ));
                    Type::Unknown
                }
            }

            ExprKind::Bool(_) => Type::Bool,

            ExprKind::Str(_) => Type::unsized_array(Type::Byte),

            ExprKind::Identifier(name) => {
                match self.bindings.table.lookup_from(self.current_scope, name) {
                    Some(symbol) => {
                        let id = symbol.id;
                        let ty = symbol.ty.clone().unwrap_or(Type::Unknown);
                        self.result.uses.insert(expr.id, id);
                        ty
                    }
                    None => {
                        self.diagnostics.push(Diagnostic::error(
                            DiagnosticCode::UndefinedSymbol,
                            format!("cannot find name '{}'", name),
                            self.loc(expr.location),
                        ));
                        Type::Unknown
                    }
                }
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let lt = self.check_expr(lhs);
                let rt = self.check_expr(rhs);
                self.check_binary(*op, &lt, &rt, lhs.location, rhs.location)
            }

            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand);
                match op {
                    UnaryOp::Neg | UnaryOp::BitNot => {
                        if ty.is_numeric() || ty.is_unknown() {
                            ty
                        } else {
                            self.operand_error(&ty, operand.location);
                            Type::Unknown
                        }
                    }
                    UnaryOp::Not => {
                        if ty == Type::Bool || ty.is_unknown() {
                            Type::Bool
                        } else {
                            self.operand_error(&ty, operand.location);
                            Type::Unknown
                        }
                    }
                    UnaryOp::Deref => match ty.pointee_type() {
                        Some(pointee) => pointee.clone(),
                        None if ty.is_unknown() => Type::Unknown,
                        None => {
                            self.operand_error(&ty, operand.location);
                            Type::Unknown
                        }
                    },
                    UnaryOp::AddressOf => match &operand.kind {
                        ExprKind::Identifier(_) | ExprKind::Index { .. } => Type::pointer(ty),
                        _ => {
                            self.diagnostics.push(Diagnostic::error(
                                DiagnosticCode::InvalidOperandType,
                                "can only take the address of a variable or array element",
                                self.loc(operand.location),
                            ));
                            Type::Unknown
                        }
                    },
                }
            }

            ExprKind::Call { callee, args } => self.check_call(expr, callee, args),

            ExprKind::Index { base, index } => {
                let base_ty = self.check_expr(base);
                let index_ty = self.check_expr(index);
                if !index_ty.is_numeric() && !index_ty.is_unknown() {
                    self.operand_error(&index_ty, index.location);
                }
                match &base_ty {
                    Type::Array(arr) => (*arr.element).clone(),
                    Type::Pointer(pointee) => (**pointee).clone(),
                    Type::Unknown => Type::Unknown,
                    other => {
                        self.operand_error(other, base.location);
                        Type::Unknown
                    }
                }
            }

            ExprKind::Member { base, member } => {
                // Enum member access: `Color.Black`
                if let ExprKind::Identifier(base_name) = &base.kind {
                    let alias = self
                        .bindings
                        .table
                        .lookup_from(self.current_scope, base_name)
                        .filter(|s| s.kind == SymbolKind::TypeAlias)
                        .map(|s| s.id);
                    if alias.is_some() {
                        if let Some(member_sym) = self
                            .bindings
                            .table
                            .lookup_from(self.current_scope, member)
                            .filter(|s| s.kind == SymbolKind::EnumMember)
                        {
                            let id = member_sym.id;
                            let ty = member_sym.ty.clone().unwrap_or(Type::Byte);
                            self.result.uses.insert(expr.id, id);
                            return ty;
                        }
                    }
                }
                let base_ty = self.check_expr(base);
                if base_ty.is_unknown() {
                    return Type::Unknown;
                }
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::InvalidOperandType,
                    format!("type '{}' has no member '{}'", base_ty, member),
                    self.loc(expr.location),
                ));
                Type::Unknown
            }

            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expect_bool(cond);
                let then_ty = self.check_expr(then_expr);
                let else_ty = self.check_expr(else_expr);
                self.common_type(&then_ty, &else_ty, else_expr.location)
            }

            ExprKind::Cast { expr: inner, ty } => {
                let from = self.check_expr(inner);
                let to = self.resolve_cast_target(ty);
                let ok = (from.is_numeric() && to.is_numeric())
                    || from.is_unknown()
                    || to.is_unknown();
                if !ok {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::InvalidOperandType,
                        format!("cannot cast '{}' to '{}'", from, to),
                        self.loc(inner.location),
                    ));
                    return Type::Unknown;
                }
                to
            }
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lt: &Type,
        rt: &Type,
        lhs_span: Span,
        rhs_span: Span,
    ) -> Type {
        if op.is_arithmetic() || op.is_bitwise() {
            if !lt.is_numeric() && !lt.is_unknown() {
                self.operand_error(lt, lhs_span);
                return Type::Unknown;
            }
            if !rt.is_numeric() && !rt.is_unknown() {
                self.operand_error(rt, rhs_span);
                return Type::Unknown;
            }
            // byte op byte stays byte; anything wider promotes to word
            if *lt == Type::Word || *rt == Type::Word {
                Type::Word
            } else if lt.is_unknown() || rt.is_unknown() {
                Type::Unknown
            } else {
                Type::Byte
            }
        } else if op.is_comparison() {
            let comparable = (lt.is_numeric() && rt.is_numeric())
                || (*lt == Type::Bool && *rt == Type::Bool)
                || lt.is_unknown()
                || rt.is_unknown();
            if !comparable {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::InvalidOperandType,
                    format!("cannot compare '{}' with '{}'", lt, rt),
                    self.loc(lhs_span.merge(rhs_span)),
                ));
            }
            Type::Bool
        } else {
            // Logical
            for (ty, span) in [(lt, lhs_span), (rt, rhs_span)] {
                if *ty != Type::Bool && !ty.is_unknown() {
                    self.operand_error(ty, span);
                }
            }
            Type::Bool
        }
    }

    fn check_call(&mut self, expr: &Expr, callee: &Expr, args: &[Expr]) -> Type {
        let Some(name) = callee.as_identifier() else {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::InvalidOperandType,
                "only named functions can be called",
                self.loc(callee.location),
            ));
            for arg in args {
                self.check_expr(arg);
            }
            return Type::Unknown;
        };

        // Polymorphic intrinsics
        match name {
            "sizeof" => return self.check_sizeof(expr, args),
            "length" => return self.check_length(expr, args),
            _ => {}
        }

        // Fixed-arity intrinsics
        if let Some((params, ret)) = intrinsic_signature(name) {
            self.check_args(name, &params, args, expr.location);
            return ret;
        }

        // User functions
        let symbol_info = self
            .bindings
            .table
            .lookup_from(self.current_scope, name)
            .map(|s| (s.id, s.ty.clone()));
        match symbol_info {
            Some((id, ty)) => {
                self.result.uses.insert(callee.id, id);
                match ty {
                    Some(Type::Function(func)) => {
                        let params = func.params.clone();
                        self.check_args(name, &params, args, expr.location);
                        (*func.return_type).clone()
                    }
                    Some(Type::Unknown) | None => {
                        for arg in args {
                            self.check_expr(arg);
                        }
                        Type::Unknown
                    }
                    Some(other) => {
                        for arg in args {
                            self.check_expr(arg);
                        }
                        self.diagnostics.push(Diagnostic::error(
                            DiagnosticCode::InvalidOperandType,
                            format!("'{}' of type '{}' is not callable", name, other),
                            self.loc(callee.location),
                        ));
                        Type::Unknown
                    }
                }
            }
            None => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UndefinedSymbol,
                    format!("cannot find function '{}'", name),
                    self.loc(callee.location),
                ));
                Type::Unknown
            }
        }
    }

    fn check_args(&mut self, name: &str, params: &[Type], args: &[Expr], span: Span) {
        if params.len() != args.len() {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::TypeMismatch,
                format!(
                    "'{}' expects {} argument{}, got {}",
                    name,
                    params.len(),
                    if params.len() == 1 { "" } else { "s" },
                    args.len()
                ),
                self.loc(span),
            ));
        }
        for (param, arg) in params.iter().zip(args) {
            let actual = self.check_expr(arg);
            if !is_assignable(&actual, param) {
                self.type_mismatch(param, &actual, arg.location);
            }
        }
        // Extra arguments still get checked
        for arg in args.iter().skip(params.len()) {
            self.check_expr(arg);
        }
    }

    /// `sizeof(type)` or `sizeof(expr)`, folded at lowering.
    fn check_sizeof(&mut self, expr: &Expr, args: &[Expr]) -> Type {
        if args.len() != 1 {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::TypeMismatch,
                format!("'sizeof' expects 1 argument, got {}", args.len()),
                self.loc(expr.location),
            ));
            return Type::Word;
        }
        // A bare type name is allowed and is not an expression
        if let Some(name) = args[0].as_identifier() {
            if primitive_from_name(name).is_some() {
                return Type::Word;
            }
        }
        self.check_expr(&args[0]);
        Type::Word
    }

    fn check_length(&mut self, expr: &Expr, args: &[Expr]) -> Type {
        if args.len() != 1 {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::TypeMismatch,
                format!("'length' expects 1 argument, got {}", args.len()),
                self.loc(expr.location),
            ));
            return Type::Word;
        }
        let ty = self.check_expr(&args[0]);
        if !matches!(ty, Type::Array(_) | Type::Unknown) {
            self.operand_error(&ty, args[0].location);
        }
        Type::Word
    }

    fn check_assign_target(&mut self, target: &Expr) {
        if let ExprKind::Identifier(name) = &target.kind {
            if let Some(symbol) = self.bindings.table.lookup_from(self.current_scope, name) {
                let immutable = symbol.flags.is_const
                    || matches!(
                        symbol.kind,
                        SymbolKind::Function | SymbolKind::EnumMember | SymbolKind::TypeAlias
                    );
                if immutable {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::InvalidOperandType,
                        format!("cannot assign to '{}': it is not mutable", name),
                        self.loc(target.location),
                    ));
                }
            }
        }
    }

    fn resolve_cast_target(&mut self, ty: &blend65_parser::ast::TypeExpr) -> Type {
        use blend65_parser::ast::TypeExprKind;
        match &ty.kind {
            TypeExprKind::Named(name) => primitive_from_name(name).unwrap_or_else(|| {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnknownType,
                    format!("unknown type '{}'", name),
                    self.loc(ty.location),
                ));
                Type::Unknown
            }),
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::InvalidOperandType,
                    "casts are only supported between numeric types",
                    self.loc(ty.location),
                ));
                Type::Unknown
            }
        }
    }

    fn common_type(&mut self, a: &Type, b: &Type, span: Span) -> Type {
        if a == b {
            return a.clone();
        }
        if a.is_unknown() || b.is_unknown() {
            return Type::Unknown;
        }
        if a.is_numeric() && b.is_numeric() {
            return Type::Word;
        }
        self.type_mismatch(a, b, span);
        Type::Unknown
    }

    fn expect_bool(&mut self, expr: &Expr) {
        let ty = self.check_expr(expr);
        if ty != Type::Bool && !ty.is_unknown() {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::TypeMismatch,
                format!("expected 'bool', found '{}'", ty),
                self.loc(expr.location),
            ));
        }
    }

    fn in_scope(&mut self, node: NodeId, f: impl FnOnce(&mut Self)) {
        let previous = self.current_scope;
        if let Some(scope) = self.bindings.scope_of(node) {
            self.current_scope = scope;
        }
        f(self);
        self.current_scope = previous;
    }

    fn type_mismatch(&mut self, expected: &Type, actual: &Type, span: Span) {
        let hint = if *expected == Type::Byte && *actual == Type::Word {
            "; an explicit cast is required to narrow"
        } else {
            ""
        };
        self.diagnostics.push(Diagnostic::error(
            DiagnosticCode::TypeMismatch,
            format!("expected '{}', found '{}'{}", expected, actual, hint),
            self.loc(span),
        ));
    }

    fn operand_error(&mut self, ty: &Type, span: Span) {
        self.diagnostics.push(Diagnostic::error(
            DiagnosticCode::InvalidOperandType,
            format!("invalid operand of type '{}'", ty),
            self.loc(span),
        ));
    }

    fn loc(&self, span: Span) -> SourceLocation {
        SourceLocation::new(self.program.source_name.clone(), span)
    }
}

/// Does this symbol payload mark a memory-mapped global?
pub fn is_memory_mapped(payload: &SymbolPayload) -> bool {
    matches!(payload, SymbolPayload::MemoryMapped { .. })
}

/// True when every path through the block ends in `return`.
fn block_always_returns(block: &Block) -> bool {
    block.statements.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &Statement) -> bool {
    match stmt {
        Statement::Return(_) => true,
        Statement::If(s) => match &s.else_branch {
            Some(else_branch) => {
                block_always_returns(&s.then_branch) && stmt_always_returns(else_branch)
            }
            None => false,
        },
        Statement::Block(b) => block_always_returns(b),
        _ => false,
    }
}
