//! Cross-module import resolution.
//!
//! Pass 1 checks that every import target exists in the registry. Pass 2
//! builds the resolved-import table for imports that survived pass 1.
//! Unused-import detection runs after resolution and only ever produces
//! hints.

use crate::registry::{ModuleRegistry, ResolvedImport};
use blend65_parser::ast::visitor;
use blend65_parser::ast::{ExprKind, Program};
use blend65_parser::{Diagnostic, DiagnosticCode, SourceLocation};
use rustc_hash::FxHashSet;

/// Import resolver over a registry of parsed programs.
pub struct ImportResolver<'a> {
    registry: &'a ModuleRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self {
            registry,
            diagnostics: Vec::new(),
        }
    }

    /// Run both passes over every registered module.
    pub fn resolve(mut self) -> (Vec<ResolvedImport>, Vec<Diagnostic>) {
        // Pass 1: report imports whose target module is absent
        let mut missing: FxHashSet<(String, String)> = FxHashSet::default();
        for program in self.registry.programs() {
            let importing = program.module_name();
            for import in program.imports() {
                let target = import.module_name();
                if !self.registry.contains(&target) {
                    missing.insert((importing.clone(), target.clone()));
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::ModuleNotFound,
                        format!("module '{}' not found", target),
                        SourceLocation::new(program.source_name.clone(), import.location),
                    ));
                }
            }
        }

        // Pass 2: build the resolved-import table, skipping pass-1 failures
        let mut resolved = Vec::new();
        for program in self.registry.programs() {
            let importing = program.module_name();
            for import in program.imports() {
                let target = import.module_name();
                if missing.contains(&(importing.clone(), target.clone())) {
                    continue;
                }
                resolved.push(ResolvedImport {
                    importing_module: importing.clone(),
                    target_module: target,
                    names: import.names.iter().map(|n| n.name.clone()).collect(),
                    node: import.id,
                    location: import.location,
                });
            }
        }

        (resolved, self.diagnostics)
    }
}

/// Report imported names that the importing module never references.
///
/// Wildcard imports are never reported. Severity is always hint.
pub fn detect_unused_imports(
    registry: &ModuleRegistry,
    resolved: &[ResolvedImport],
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for program in registry.programs() {
        let importing = program.module_name();
        let referenced = referenced_names(program);

        for import in resolved
            .iter()
            .filter(|r| r.importing_module == importing)
        {
            for name in &import.names {
                if !referenced.contains(name.as_str()) {
                    diagnostics.push(Diagnostic::hint(
                        DiagnosticCode::UnusedImport,
                        format!("imported name '{}' is never used", name),
                        SourceLocation::new(program.source_name.clone(), import.location),
                    ));
                }
            }
        }
    }

    diagnostics
}

/// Every identifier referenced in expression position in the module body.
fn referenced_names(program: &Program) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    visitor::walk_exprs(program, &mut |expr| {
        if let ExprKind::Identifier(name) = &expr.kind {
            names.insert(name.clone());
        }
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_parser::{Parser, Severity};

    fn registry_of(sources: &[(&str, &str)]) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for (name, source) in sources {
            let (program, errors) = Parser::new(source, *name).parse();
            assert!(errors.is_empty(), "parse errors in {}: {:?}", name, errors);
            registry.register(program);
        }
        registry
    }

    #[test]
    fn test_missing_module_reported() {
        let registry = registry_of(&[("main", "module main;\nimport helper from util;")]);
        let (resolved, diagnostics) = ImportResolver::new(&registry).resolve();
        assert!(resolved.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ModuleNotFound);
    }

    #[test]
    fn test_resolved_import_table() {
        let registry = registry_of(&[
            ("util", "module util;\nexport function helper(): void { }"),
            ("main", "module main;\nimport helper from util;"),
        ]);
        let (resolved, diagnostics) = ImportResolver::new(&registry).resolve();
        assert!(diagnostics.is_empty());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].importing_module, "main");
        assert_eq!(resolved[0].target_module, "util");
        assert_eq!(resolved[0].names, vec!["helper"]);
    }

    #[test]
    fn test_wildcard_import_records_empty_names() {
        let registry = registry_of(&[
            ("util", "module util;"),
            ("main", "module main;\nimport * from util;"),
        ]);
        let (resolved, _) = ImportResolver::new(&registry).resolve();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].names.is_empty());
    }

    #[test]
    fn test_unused_import_hint() {
        let registry = registry_of(&[
            ("util", "module util;\nexport function helper(): void { }"),
            ("main", "module main;\nimport helper from util;"),
        ]);
        let (resolved, _) = ImportResolver::new(&registry).resolve();
        let hints = detect_unused_imports(&registry, &resolved);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].code, DiagnosticCode::UnusedImport);
        assert_eq!(hints[0].severity, Severity::Hint);
        assert!(hints[0].message.contains("helper"));
    }

    #[test]
    fn test_used_import_not_reported() {
        let registry = registry_of(&[
            ("util", "module util;\nexport function helper(): void { }"),
            (
                "main",
                "module main;\nimport helper from util;\nfunction go(): void { helper(); }",
            ),
        ]);
        let (resolved, _) = ImportResolver::new(&registry).resolve();
        let hints = detect_unused_imports(&registry, &resolved);
        assert!(hints.is_empty());
    }
}
