//! Module registry: fully-qualified module names to parsed programs.

use blend65_parser::ast::{NodeId, Program};
use blend65_parser::Span;
use rustc_hash::FxHashMap;

/// Registry of parsed programs, keyed by dotted module name.
///
/// Registration order is preserved so later passes iterate modules
/// deterministically.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    programs: FxHashMap<String, Program>,
    order: Vec<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed program under its declared module name.
    /// Re-registering a name replaces the previous program.
    pub fn register(&mut self, program: Program) {
        let name = program.module_name();
        if !self.programs.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.programs.insert(name, program);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    /// Module names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Programs in registration order.
    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.order.iter().filter_map(|name| self.programs.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// One successfully resolved import.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImport {
    /// Module containing the import declaration
    pub importing_module: String,
    /// Module the import points at
    pub target_module: String,
    /// Imported identifiers; empty for wildcard imports
    pub names: Vec<String>,
    /// The import declaration node
    pub node: NodeId,
    pub location: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_parser::Parser;

    fn program(source: &str, name: &str) -> Program {
        let (program, errors) = Parser::new(source, name).parse();
        assert!(errors.is_empty());
        program
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ModuleRegistry::new();
        registry.register(program("module util.math;", "util"));
        assert!(registry.contains("util.math"));
        assert!(!registry.contains("util"));
        assert_eq!(registry.get("util.math").unwrap().module_name(), "util.math");
    }

    #[test]
    fn test_order_preserved() {
        let mut registry = ModuleRegistry::new();
        registry.register(program("module b;", "b"));
        registry.register(program("module a;", "a"));
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
