//! Symbol table with scope tree.
//!
//! Scopes live in an arena (`Vec<Scope>`) and refer to each other by
//! [`ScopeId`]; parent links are plain ids, never owning. Scopes are
//! created during binding and live for the whole compilation.

use blend65_parser::ast::NodeId;
use blend65_parser::Span;
use blend65_types::Type;
use rustc_hash::FxHashMap;

/// Scope identifier (index into the scope arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Symbol identifier (index into the symbol arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Scope kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Module (root) scope
    Module,
    /// Function body scope
    Function,
    /// Plain block scope
    Block,
    /// Loop body scope
    Loop,
}

/// Symbol kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Constant,
    Parameter,
    Function,
    Imported,
    EnumMember,
    TypeAlias,
}

/// Symbol flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolFlags {
    pub is_const: bool,
    pub is_exported: bool,
}

/// Kind-specific symbol payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolPayload {
    None,
    /// Function parameter names, in order (types live on the symbol's
    /// function type)
    Function { param_names: Vec<String> },
    /// Where an imported name came from
    Import {
        original_name: String,
        source_module: String,
    },
    /// Evaluated enum member value
    EnumMember { value: i64 },
    /// Evaluated constant initializer, when it folds to a number
    Constant { value: Option<i64> },
    /// Address-bound global (`@map` / `@zp`)
    MemoryMapped { address: u16, zero_page: bool },
}

/// Symbol information
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// Resolved type; `None` until the type-resolution pass runs
    pub ty: Option<Type>,
    pub flags: SymbolFlags,
    /// AST node that declared this symbol
    pub decl_node: NodeId,
    pub decl_span: Span,
    /// Scope the symbol was declared in
    pub scope: ScopeId,
    pub payload: SymbolPayload,
}

/// A scope in the scope tree.
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Name → symbol in this scope
    names: FxHashMap<String, SymbolId>,
    /// Declaration order
    order: Vec<SymbolId>,
    /// Nesting depth of enclosing loops, counting this one (loop scopes)
    pub loop_depth: u32,
    /// Owning function symbol (function scopes)
    pub function: Option<SymbolId>,
}

/// Result of a declaration attempt.
#[derive(Debug)]
pub enum Declared {
    /// Fresh declaration
    Ok(SymbolId),
    /// The name already exists in this scope
    AlreadyDeclared { existing: SymbolId },
}

impl Declared {
    pub fn ok(self) -> Option<SymbolId> {
        match self {
            Declared::Ok(id) => Some(id),
            Declared::AlreadyDeclared { .. } => None,
        }
    }
}

/// Symbol table: scope arena + symbol arena + a cursor for the scope the
/// binder is currently inside.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    current: ScopeId,
    loop_depth: u32,
}

impl SymbolTable {
    /// Create a table containing only the module scope.
    pub fn new() -> Self {
        let module_scope = Scope {
            id: ScopeId(0),
            kind: ScopeKind::Module,
            parent: None,
            children: Vec::new(),
            names: FxHashMap::default(),
            order: Vec::new(),
            loop_depth: 0,
            function: None,
        };
        Self {
            scopes: vec![module_scope],
            symbols: Vec::new(),
            current: ScopeId(0),
            loop_depth: 0,
        }
    }

    pub fn module_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.as_usize()]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.as_usize()]
    }

    /// Set a symbol's resolved type (type-resolution pass only).
    pub fn set_symbol_type(&mut self, id: SymbolId, ty: Type) {
        self.symbols[id.as_usize()].ty = Some(ty);
    }

    /// Update a symbol's payload (e.g. evaluated enum member value).
    pub fn set_symbol_payload(&mut self, id: SymbolId, payload: SymbolPayload) {
        self.symbols[id.as_usize()].payload = payload;
    }

    // ----- scope navigation -----

    fn push_scope(&mut self, kind: ScopeKind, function: Option<SymbolId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let loop_depth = if kind == ScopeKind::Loop {
            self.loop_depth + 1
        } else {
            self.loop_depth
        };
        self.scopes.push(Scope {
            id,
            kind,
            parent: Some(self.current),
            children: Vec::new(),
            names: FxHashMap::default(),
            order: Vec::new(),
            loop_depth,
            function,
        });
        self.scopes[self.current.as_usize()].children.push(id);
        if kind == ScopeKind::Loop {
            self.loop_depth += 1;
        }
        self.current = id;
        id
    }

    pub fn enter_function_scope(&mut self, function: SymbolId) -> ScopeId {
        self.push_scope(ScopeKind::Function, Some(function))
    }

    pub fn enter_block_scope(&mut self) -> ScopeId {
        self.push_scope(ScopeKind::Block, None)
    }

    pub fn enter_loop_scope(&mut self) -> ScopeId {
        self.push_scope(ScopeKind::Loop, None)
    }

    /// Leave the current scope. Leaving the module scope is an internal
    /// error surfaced to the caller, never a panic.
    pub fn exit_scope(&mut self) -> Result<ScopeId, ScopeError> {
        let scope = &self.scopes[self.current.as_usize()];
        let Some(parent) = scope.parent else {
            return Err(ScopeError::CannotExitModuleScope);
        };
        if scope.kind == ScopeKind::Loop {
            self.loop_depth -= 1;
        }
        let left = self.current;
        self.current = parent;
        Ok(left)
    }

    /// Re-position the cursor on an existing scope (used by passes that
    /// re-walk the tree after binding).
    pub fn set_current_scope(&mut self, id: ScopeId) {
        self.current = id;
    }

    // ----- declarations -----

    fn declare(
        &mut self,
        name: &str,
        kind: SymbolKind,
        decl_node: NodeId,
        decl_span: Span,
        ty: Option<Type>,
        flags: SymbolFlags,
        payload: SymbolPayload,
    ) -> Declared {
        let scope_id = self.current;
        if let Some(&existing) = self.scopes[scope_id.as_usize()].names.get(name) {
            return Declared::AlreadyDeclared { existing };
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            kind,
            ty,
            flags,
            decl_node,
            decl_span,
            scope: scope_id,
            payload,
        });
        let scope = &mut self.scopes[scope_id.as_usize()];
        scope.names.insert(name.to_string(), id);
        scope.order.push(id);
        Declared::Ok(id)
    }

    pub fn declare_variable(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        ty: Option<Type>,
        exported: bool,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::Variable,
            decl_node,
            decl_span,
            ty,
            SymbolFlags {
                is_const: false,
                is_exported: exported,
            },
            SymbolPayload::None,
        )
    }

    pub fn declare_constant(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        ty: Option<Type>,
        exported: bool,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::Constant,
            decl_node,
            decl_span,
            ty,
            SymbolFlags {
                is_const: true,
                is_exported: exported,
            },
            SymbolPayload::None,
        )
    }

    pub fn declare_parameter(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        ty: Option<Type>,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::Parameter,
            decl_node,
            decl_span,
            ty,
            SymbolFlags::default(),
            SymbolPayload::None,
        )
    }

    pub fn declare_function(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        param_names: Vec<String>,
        exported: bool,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::Function,
            decl_node,
            decl_span,
            None,
            SymbolFlags {
                is_const: false,
                is_exported: exported,
            },
            SymbolPayload::Function { param_names },
        )
    }

    pub fn declare_import(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        original_name: &str,
        source_module: &str,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::Imported,
            decl_node,
            decl_span,
            None,
            SymbolFlags::default(),
            SymbolPayload::Import {
                original_name: original_name.to_string(),
                source_module: source_module.to_string(),
            },
        )
    }

    pub fn declare_enum_member(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        value: i64,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::EnumMember,
            decl_node,
            decl_span,
            None,
            SymbolFlags {
                is_const: true,
                is_exported: false,
            },
            SymbolPayload::EnumMember { value },
        )
    }

    pub fn declare_type_alias(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        ty: Type,
        exported: bool,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::TypeAlias,
            decl_node,
            decl_span,
            Some(ty),
            SymbolFlags {
                is_const: false,
                is_exported: exported,
            },
            SymbolPayload::None,
        )
    }

    pub fn declare_memory_mapped(
        &mut self,
        name: &str,
        decl_node: NodeId,
        decl_span: Span,
        ty: Type,
        address: u16,
        zero_page: bool,
    ) -> Declared {
        self.declare(
            name,
            SymbolKind::Variable,
            decl_node,
            decl_span,
            Some(ty),
            SymbolFlags::default(),
            SymbolPayload::MemoryMapped { address, zero_page },
        )
    }

    // ----- lookups -----

    /// Look up a name in one scope only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes[scope.as_usize()]
            .names
            .get(name)
            .map(|&id| self.symbol(id))
    }

    /// Look up a name walking from `scope` to the module scope; nearest
    /// definition wins.
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(sym) = self.lookup_local(id, name) {
                return Some(sym);
            }
            cursor = self.scopes[id.as_usize()].parent;
        }
        None
    }

    /// Look up from the current scope.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.lookup_from(self.current, name)
    }

    /// Look up in the module scope only.
    pub fn lookup_global(&self, name: &str) -> Option<&Symbol> {
        self.lookup_local(self.module_scope(), name)
    }

    // ----- queries -----

    pub fn is_in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    pub fn is_in_function(&self) -> bool {
        self.enclosing_function_from(self.current).is_some()
    }

    /// Function symbol owning the current scope, if any.
    pub fn current_function(&self) -> Option<&Symbol> {
        self.enclosing_function_from(self.current)
            .map(|id| self.symbol(id))
    }

    /// Function symbol owning `scope`, if any.
    pub fn enclosing_function_from(&self, scope: ScopeId) -> Option<SymbolId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let s = &self.scopes[id.as_usize()];
            if let Some(func) = s.function {
                return Some(func);
            }
            cursor = s.parent;
        }
        None
    }

    /// Loop depth at `scope` (0 outside loops).
    pub fn loop_depth_at(&self, scope: ScopeId) -> u32 {
        self.scopes[scope.as_usize()].loop_depth
    }

    /// Exported module-scope symbols, in declaration order.
    pub fn exported_symbols(&self) -> Vec<&Symbol> {
        self.scopes[0]
            .order
            .iter()
            .map(|&id| self.symbol(id))
            .filter(|s| s.flags.is_exported)
            .collect()
    }

    /// Module-scope function symbols, in declaration order.
    pub fn function_symbols(&self) -> Vec<&Symbol> {
        self.symbols_by_kind(SymbolKind::Function, Some(self.module_scope()))
    }

    /// Symbols of a kind, within one scope or across the whole table.
    pub fn symbols_by_kind(&self, kind: SymbolKind, scope: Option<ScopeId>) -> Vec<&Symbol> {
        match scope {
            Some(scope) => self.scopes[scope.as_usize()]
                .order
                .iter()
                .map(|&id| self.symbol(id))
                .filter(|s| s.kind == kind)
                .collect(),
            None => self.symbols.iter().filter(|s| s.kind == kind).collect(),
        }
    }

    /// All symbols, in declaration order.
    pub fn all_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Symbols declared directly in `scope`, in declaration order.
    pub fn symbols_in_scope(&self, scope: ScopeId) -> impl Iterator<Item = &Symbol> {
        self.scopes[scope.as_usize()]
            .order
            .iter()
            .map(|&id| self.symbol(id))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal-precondition violations in scope navigation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("cannot exit the module scope")]
    CannotExitModuleScope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_parser::span::Span;

    fn dummy() -> (NodeId, Span) {
        (NodeId::new(0), Span::dummy())
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut table = SymbolTable::new();
        let (node, span) = dummy();
        let id = table
            .declare_variable("x", node, span, Some(Type::Byte), false)
            .ok()
            .unwrap();
        assert_eq!(table.lookup("x").unwrap().id, id);
        assert_eq!(table.lookup_local(table.module_scope(), "x").unwrap().id, id);
    }

    #[test]
    fn test_duplicate_declaration_fails() {
        let mut table = SymbolTable::new();
        let (node, span) = dummy();
        table.declare_variable("x", node, span, None, false);
        let result = table.declare_variable("x", node, span, None, false);
        assert!(matches!(result, Declared::AlreadyDeclared { .. }));
    }

    #[test]
    fn test_shadowing_in_nested_scope() {
        let mut table = SymbolTable::new();
        let (node, span) = dummy();
        let outer = table
            .declare_variable("x", node, span, Some(Type::Byte), false)
            .ok()
            .unwrap();

        table.enter_block_scope();
        let inner = table
            .declare_variable("x", node, span, Some(Type::Word), false)
            .ok()
            .unwrap();
        assert_eq!(table.lookup("x").unwrap().id, inner);

        table.exit_scope().unwrap();
        assert_eq!(table.lookup("x").unwrap().id, outer);
    }

    #[test]
    fn test_lookup_walks_ancestors() {
        let mut table = SymbolTable::new();
        let (node, span) = dummy();
        let id = table
            .declare_variable("g", node, span, None, false)
            .ok()
            .unwrap();
        table.enter_block_scope();
        table.enter_block_scope();
        assert_eq!(table.lookup("g").unwrap().id, id);
        assert!(table.lookup_local(table.current_scope(), "g").is_none());
    }

    #[test]
    fn test_cannot_exit_module_scope() {
        let mut table = SymbolTable::new();
        assert_eq!(table.exit_scope(), Err(ScopeError::CannotExitModuleScope));
    }

    #[test]
    fn test_loop_depth() {
        let mut table = SymbolTable::new();
        assert!(!table.is_in_loop());
        table.enter_loop_scope();
        assert!(table.is_in_loop());
        table.enter_loop_scope();
        assert_eq!(table.loop_depth_at(table.current_scope()), 2);
        table.exit_scope().unwrap();
        table.exit_scope().unwrap();
        assert!(!table.is_in_loop());
    }

    #[test]
    fn test_current_function() {
        let mut table = SymbolTable::new();
        let (node, span) = dummy();
        let func = table
            .declare_function("f", node, span, vec!["a".to_string()], false)
            .ok()
            .unwrap();
        assert!(!table.is_in_function());
        table.enter_function_scope(func);
        table.enter_block_scope();
        assert!(table.is_in_function());
        assert_eq!(table.current_function().unwrap().id, func);
    }

    #[test]
    fn test_exported_symbols() {
        let mut table = SymbolTable::new();
        let (node, span) = dummy();
        table.declare_variable("a", node, span, None, true);
        table.declare_variable("b", node, span, None, false);
        table.declare_function("f", node, span, vec![], true);
        let exported: Vec<_> = table.exported_symbols().iter().map(|s| s.name.clone()).collect();
        assert_eq!(exported, vec!["a", "f"]);
    }
}
