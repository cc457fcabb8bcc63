//! Symbol-table construction.
//!
//! The binder walks one program and declares every symbol: module-scope
//! declarations first (so functions are callable before their textual
//! definition), then function bodies with their nested block and loop
//! scopes. Type annotations are resolved here; inferred types are filled
//! in later by the checker.

use crate::consteval::eval_const_expr;
use crate::symbols::{Declared, ScopeId, SymbolId, SymbolPayload, SymbolTable};
use blend65_parser::ast::{
    Block, Declaration, EnumDecl, FunctionDecl, NodeId, Program, Statement, TypeExpr, TypeExprKind,
};
use blend65_parser::{Diagnostic, DiagnosticCode, SourceLocation, Span};
use blend65_types::{primitive_from_name, Type};
use rustc_hash::FxHashMap;

/// Everything the binder produces for one program.
#[derive(Debug)]
pub struct Bindings {
    pub table: SymbolTable,
    /// Scope created for a function body, block, or loop statement
    pub scope_of_node: FxHashMap<NodeId, ScopeId>,
    /// Symbol created for a declaration node
    pub symbol_of_decl: FxHashMap<NodeId, SymbolId>,
}

impl Bindings {
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scope_of_node.get(&node).copied()
    }

    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.symbol_of_decl.get(&node).copied()
    }
}

/// The binder.
pub struct Binder<'a> {
    program: &'a Program,
    /// Registry for resolving wildcard-import names, when available
    registry: Option<&'a crate::registry::ModuleRegistry>,
    table: SymbolTable,
    scope_of_node: FxHashMap<NodeId, ScopeId>,
    symbol_of_decl: FxHashMap<NodeId, SymbolId>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Binder<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            registry: None,
            table: SymbolTable::new(),
            scope_of_node: FxHashMap::default(),
            symbol_of_decl: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Bind with a registry so wildcard imports see the target module's
    /// exported names.
    pub fn with_registry(
        program: &'a Program,
        registry: &'a crate::registry::ModuleRegistry,
    ) -> Self {
        let mut binder = Self::new(program);
        binder.registry = Some(registry);
        binder
    }

    /// Bind the whole program.
    pub fn bind(mut self) -> (Bindings, Vec<Diagnostic>) {
        let program = self.program;

        // Module scope first
        for decl in &program.declarations {
            self.bind_global(decl);
        }

        // Then function bodies
        for decl in &program.declarations {
            if let Declaration::Function(func) = decl {
                self.bind_function_body(func);
            }
        }

        let bindings = Bindings {
            table: self.table,
            scope_of_node: self.scope_of_node,
            symbol_of_decl: self.symbol_of_decl,
        };
        (bindings, self.diagnostics)
    }

    fn bind_global(&mut self, decl: &Declaration) {
        match decl {
            Declaration::Import(import) => {
                let source_module = import.module_name();
                for name in &import.names {
                    let declared = self.table.declare_import(
                        &name.name,
                        import.id,
                        name.location,
                        &name.name,
                        &source_module,
                    );
                    self.record(declared, import.id, &name.name, name.location);
                }
                // Wildcard imports bind every exported name of the target
                if import.wildcard {
                    let Some(target) = self.registry.and_then(|r| r.get(&source_module)) else {
                        return;
                    };
                    let exported: Vec<String> = target
                        .declarations
                        .iter()
                        .filter_map(|d| d.exported_name().map(str::to_string))
                        .collect();
                    for name in exported {
                        let declared = self.table.declare_import(
                            &name,
                            import.id,
                            import.location,
                            &name,
                            &source_module,
                        );
                        self.record(declared, import.id, &name, import.location);
                    }
                }
            }

            Declaration::Variable(var) => {
                let ty = var.ty.as_ref().map(|t| self.resolve_type_expr(t));
                let declared = self.table.declare_variable(
                    &var.name.name,
                    var.id,
                    var.name.location,
                    ty,
                    var.exported,
                );
                self.record(declared, var.id, &var.name.name, var.name.location);
            }

            Declaration::Constant(konst) => {
                let ty = konst.ty.as_ref().map(|t| self.resolve_type_expr(t));
                let declared = self.table.declare_constant(
                    &konst.name.name,
                    konst.id,
                    konst.name.location,
                    ty,
                    konst.exported,
                );
                if let Some(id) = self.record(declared, konst.id, &konst.name.name, konst.name.location)
                {
                    let value =
                        eval_const_expr(&konst.value, &self.table, self.table.module_scope());
                    self.table
                        .set_symbol_payload(id, SymbolPayload::Constant { value });
                }
            }

            Declaration::Function(func) => {
                let param_names = func.params.iter().map(|p| p.name.name.clone()).collect();
                let declared = self.table.declare_function(
                    &func.name.name,
                    func.id,
                    func.name.location,
                    param_names,
                    func.exported,
                );
                if let Some(id) = self.record(declared, func.id, &func.name.name, func.name.location)
                {
                    let ty = self.function_type(func);
                    self.table.set_symbol_type(id, ty);
                }
            }

            Declaration::MemoryMap(map) => {
                let ty = self.resolve_type_expr(&map.ty);
                let declared = self.table.declare_memory_mapped(
                    &map.name.name,
                    map.id,
                    map.name.location,
                    ty,
                    map.address,
                    map.storage == blend65_parser::ast::StorageKind::ZeroPage,
                );
                self.record(declared, map.id, &map.name.name, map.name.location);
            }

            Declaration::Enum(e) => self.bind_enum(e),
        }
    }

    fn bind_enum(&mut self, e: &EnumDecl) {
        // Member values first: default is previous + 1, starting at 0
        let mut next_value = 0i64;
        let mut member_values = Vec::with_capacity(e.members.len());
        for member in &e.members {
            let value = match &member.value {
                Some(expr) => {
                    eval_const_expr(expr, &self.table, self.table.module_scope()).unwrap_or(next_value)
                }
                None => next_value,
            };
            member_values.push(value);
            next_value = value + 1;
        }

        // The enum type itself: byte when every member fits, word otherwise
        let repr = if member_values.iter().all(|v| (0..=0xFF).contains(v)) {
            Type::Byte
        } else {
            Type::Word
        };
        let declared = self.table.declare_type_alias(
            &e.name.name,
            e.id,
            e.name.location,
            repr.clone(),
            e.exported,
        );
        self.record(declared, e.id, &e.name.name, e.name.location);

        for (member, value) in e.members.iter().zip(member_values) {
            let declared = self.table.declare_enum_member(
                &member.name.name,
                member.id,
                member.name.location,
                value,
            );
            if let Some(id) = self.record(declared, member.id, &member.name.name, member.name.location)
            {
                self.table.set_symbol_type(id, repr.clone());
            }
        }
    }

    fn bind_function_body(&mut self, func: &FunctionDecl) {
        let Some(func_symbol) = self.symbol_of_decl.get(&func.id).copied() else {
            // Redeclared function; its body is not bound
            return;
        };

        let scope = self.table.enter_function_scope(func_symbol);
        self.scope_of_node.insert(func.id, scope);

        for param in &func.params {
            let ty = self.resolve_type_expr(&param.ty);
            let declared = self.table.declare_parameter(
                &param.name.name,
                param.id,
                param.name.location,
                Some(ty),
            );
            self.record(declared, param.id, &param.name.name, param.name.location);
        }

        // The body block shares the function scope
        self.scope_of_node.insert(func.body.id, scope);
        self.bind_statements(&func.body);

        self.exit_scope_checked(func.location);
    }

    fn bind_statements(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.bind_statement(stmt);
        }
    }

    fn bind_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Let(var) => {
                let ty = var.ty.as_ref().map(|t| self.resolve_type_expr(t));
                let declared = self.table.declare_variable(
                    &var.name.name,
                    var.id,
                    var.name.location,
                    ty,
                    false,
                );
                self.record(declared, var.id, &var.name.name, var.name.location);
            }

            Statement::If(s) => {
                let then_scope = self.table.enter_block_scope();
                self.scope_of_node.insert(s.then_branch.id, then_scope);
                self.bind_statements(&s.then_branch);
                self.exit_scope_checked(s.then_branch.location);

                if let Some(else_branch) = &s.else_branch {
                    match else_branch.as_ref() {
                        Statement::Block(b) => {
                            let else_scope = self.table.enter_block_scope();
                            self.scope_of_node.insert(b.id, else_scope);
                            self.bind_statements(b);
                            self.exit_scope_checked(b.location);
                        }
                        other => self.bind_statement(other),
                    }
                }
            }

            Statement::While(s) => {
                let scope = self.table.enter_loop_scope();
                self.scope_of_node.insert(s.id, scope);
                self.scope_of_node.insert(s.body.id, scope);
                self.bind_statements(&s.body);
                self.exit_scope_checked(s.location);
            }

            Statement::For(s) => {
                let scope = self.table.enter_loop_scope();
                self.scope_of_node.insert(s.id, scope);
                self.scope_of_node.insert(s.body.id, scope);
                // The induction variable lives in the loop scope
                let declared = self.table.declare_variable(
                    &s.variable.name,
                    s.id,
                    s.variable.location,
                    None,
                    false,
                );
                if let Declared::Ok(id) = declared {
                    self.symbol_of_decl.insert(s.id, id);
                }
                self.bind_statements(&s.body);
                self.exit_scope_checked(s.location);
            }

            Statement::Block(b) => {
                let scope = self.table.enter_block_scope();
                self.scope_of_node.insert(b.id, scope);
                self.bind_statements(b);
                self.exit_scope_checked(b.location);
            }

            Statement::Assign(_)
            | Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Return(_)
            | Statement::Expression(_) => {}
        }
    }

    /// Resolve a syntactic type to a semantic one, reporting unknown
    /// names and bad array lengths. Failures produce `Type::Unknown`.
    fn resolve_type_expr(&mut self, ty: &TypeExpr) -> Type {
        match &ty.kind {
            TypeExprKind::Named(name) => {
                if let Some(prim) = primitive_from_name(name) {
                    return prim;
                }
                // Enum names resolve through their type-alias symbol
                if let Some(symbol) = self.table.lookup_global(name) {
                    if symbol.kind == crate::symbols::SymbolKind::TypeAlias {
                        if let Some(alias_ty) = &symbol.ty {
                            return alias_ty.clone();
                        }
                    }
                }
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnknownType,
                    format!("unknown type '{}'", name),
                    self.loc(ty.location),
                ));
                Type::Unknown
            }

            TypeExprKind::Array { element, length } => {
                let elem = self.resolve_type_expr(element);
                match length {
                    None => Type::unsized_array(elem),
                    Some(expr) => {
                        let Some(len) =
                            eval_const_expr(expr, &self.table, self.table.current_scope())
                        else {
                            self.diagnostics.push(Diagnostic::error(
                                DiagnosticCode::InvalidType,
                                "array length must be a constant expression",
                                self.loc(expr.location),
                            ));
                            return Type::Unknown;
                        };
                        match Type::array(elem, len) {
                            Ok(ty) => ty,
                            Err(err) => {
                                self.diagnostics.push(Diagnostic::error(
                                    DiagnosticCode::InvalidType,
                                    err.to_string(),
                                    self.loc(expr.location),
                                ));
                                Type::Unknown
                            }
                        }
                    }
                }
            }

            TypeExprKind::Pointer(pointee) => Type::pointer(self.resolve_type_expr(pointee)),
        }
    }

    fn function_type(&mut self, func: &FunctionDecl) -> Type {
        let params = func
            .params
            .iter()
            .map(|p| self.resolve_type_expr(&p.ty))
            .collect();
        let ret = func
            .return_type
            .as_ref()
            .map(|t| self.resolve_type_expr(t))
            .unwrap_or(Type::Void);
        Type::function(params, ret)
    }

    /// Record a declaration result, emitting ALREADY_DECLARED on clash.
    fn record(
        &mut self,
        declared: Declared,
        node: NodeId,
        name: &str,
        span: Span,
    ) -> Option<SymbolId> {
        match declared {
            Declared::Ok(id) => {
                self.symbol_of_decl.insert(node, id);
                Some(id)
            }
            Declared::AlreadyDeclared { existing } => {
                let previous = self.table.symbol(existing).decl_span;
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::AlreadyDeclared,
                        format!("'{}' is already declared in this scope", name),
                        self.loc(span),
                    )
                    .with_related(self.loc(previous)),
                );
                None
            }
        }
    }

    fn exit_scope_checked(&mut self, span: Span) {
        if self.table.exit_scope().is_err() {
            // Unbalanced enter/exit is a binder bug, not a user error
            debug_assert!(false, "scope stack underflow");
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::InternalError,
                "internal error: scope stack underflow",
                self.loc(span),
            ));
        }
    }

    fn loc(&self, span: Span) -> SourceLocation {
        SourceLocation::new(self.program.source_name.clone(), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolKind;
    use blend65_parser::Parser;

    fn bind(source: &str) -> (Bindings, Vec<Diagnostic>) {
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        Binder::new(&program).bind()
    }

    #[test]
    fn test_globals_declared() {
        let (bindings, diags) = bind("let x: byte = 1;\nconst Y: word = 2;\nfunction f(): void { }");
        assert!(diags.is_empty());
        assert_eq!(
            bindings.table.lookup_global("x").unwrap().kind,
            SymbolKind::Variable
        );
        assert_eq!(
            bindings.table.lookup_global("Y").unwrap().kind,
            SymbolKind::Constant
        );
        assert_eq!(
            bindings.table.lookup_global("f").unwrap().kind,
            SymbolKind::Function
        );
    }

    #[test]
    fn test_function_type_resolved() {
        let (bindings, _) = bind("function add(a: byte, b: word): word { return b; }");
        let func = bindings.table.lookup_global("add").unwrap();
        assert_eq!(
            func.ty,
            Some(Type::function(vec![Type::Byte, Type::Word], Type::Word))
        );
    }

    #[test]
    fn test_duplicate_reported() {
        let (_, diags) = bind("let x: byte = 1;\nlet x: byte = 2;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::AlreadyDeclared);
        assert_eq!(diags[0].related.len(), 1);
    }

    #[test]
    fn test_unknown_type_absorbed() {
        let (bindings, diags) = bind("let x: sprite = 1;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::UnknownType);
        assert_eq!(bindings.table.lookup_global("x").unwrap().ty, Some(Type::Unknown));
    }

    #[test]
    fn test_enum_members_bound() {
        let (bindings, diags) = bind("enum Color { Black = 0, White, Red = 5 }");
        assert!(diags.is_empty());
        let white = bindings.table.lookup_global("White").unwrap();
        assert_eq!(white.payload, SymbolPayload::EnumMember { value: 1 });
        let red = bindings.table.lookup_global("Red").unwrap();
        assert_eq!(red.payload, SymbolPayload::EnumMember { value: 5 });
        // The enum name resolves as a type
        let (bindings2, diags2) = bind("enum Color { Black }\nlet c: Color = 0;");
        assert!(diags2.is_empty());
        assert_eq!(bindings2.table.lookup_global("c").unwrap().ty, Some(Type::Byte));
    }

    #[test]
    fn test_memory_mapped_symbols() {
        let (bindings, diags) = bind("@map border: byte = 0xD020;");
        assert!(diags.is_empty());
        let border = bindings.table.lookup_global("border").unwrap();
        assert_eq!(
            border.payload,
            SymbolPayload::MemoryMapped {
                address: 0xD020,
                zero_page: false
            }
        );
    }

    #[test]
    fn test_locals_and_scopes() {
        let (bindings, diags) = bind(
            "function f(): void {\n\
             let a: byte = 1;\n\
             while true { let a: word = 2; }\n\
             }",
        );
        assert!(diags.is_empty(), "{:?}", diags);
        // Two distinct `a` symbols exist
        let all_a: Vec<_> = bindings
            .table
            .all_symbols()
            .filter(|s| s.name == "a")
            .collect();
        assert_eq!(all_a.len(), 2);
    }

    #[test]
    fn test_for_variable_in_loop_scope() {
        let (bindings, diags) = bind("function f(): void { for i = 0 to 10 { } }");
        assert!(diags.is_empty());
        let i: Vec<_> = bindings
            .table
            .all_symbols()
            .filter(|s| s.name == "i")
            .collect();
        assert_eq!(i.len(), 1);
        assert!(bindings.table.lookup_global("i").is_none());
    }

    #[test]
    fn test_negative_array_length() {
        let (_, diags) = bind("let a: byte[0 - 1] = 0;");
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::InvalidType));
    }
}
