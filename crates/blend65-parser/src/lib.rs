//! Blend65 front end: lexer, parser, AST, diagnostics, and the
//! optimization-metadata model shared by every later phase.

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod metadata;
pub mod parser;
pub mod span;
pub mod token;

pub use diagnostics::{
    render_diagnostics, Diagnostic, DiagnosticBag, DiagnosticCode, Severity, SourceLocation,
};
pub use lexer::{LexError, Lexer};
pub use metadata::{MetaKey, MetaValue, MetadataMap, MetadataStore};
pub use parser::{ParseError, Parser};
pub use span::{Position, Span};
pub use token::Token;

#[cfg(test)]
mod tests {
    use super::ast::*;
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        program
    }

    #[test]
    fn test_module_header() {
        let program = parse_ok("module game.sprites;");
        assert_eq!(program.module_name(), "game.sprites");
    }

    #[test]
    fn test_default_module_name() {
        let program = parse_ok("let x: byte = 1;");
        assert_eq!(program.module_name(), "main");
    }

    #[test]
    fn test_variable_declaration() {
        let program = parse_ok("let x: byte = 10;");
        let Declaration::Variable(var) = &program.declarations[0] else {
            panic!("expected variable declaration");
        };
        assert_eq!(var.name.name, "x");
        assert!(matches!(
            var.ty.as_ref().unwrap().kind,
            TypeExprKind::Named(ref n) if n == "byte"
        ));
        assert!(matches!(
            var.init.as_ref().unwrap().kind,
            ExprKind::Number(10)
        ));
    }

    #[test]
    fn test_function_declaration() {
        let program = parse_ok("function add(a: byte, b: word): word { return a + b; }");
        let Declaration::Function(func) = &program.declarations[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(func.name.name, "add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.body.statements.len(), 1);
        assert!(matches!(func.body.statements[0], Statement::Return(_)));
    }

    #[test]
    fn test_import_forms() {
        let program = parse_ok("import helper, twice from util.math;\nimport * from screen;");
        let Declaration::Import(named) = &program.declarations[0] else {
            panic!("expected import");
        };
        assert_eq!(named.names.len(), 2);
        assert!(!named.wildcard);
        assert_eq!(named.module_name(), "util.math");

        let Declaration::Import(wild) = &program.declarations[1] else {
            panic!("expected import");
        };
        assert!(wild.wildcard);
        assert!(wild.names.is_empty());
    }

    #[test]
    fn test_memory_map_declarations() {
        let program = parse_ok("@map border: byte = 0xD020;\n@zp ptr: word = 0x10;");
        let Declaration::MemoryMap(map) = &program.declarations[0] else {
            panic!("expected @map declaration");
        };
        assert_eq!(map.storage, StorageKind::Absolute);
        assert_eq!(map.address, 0xD020);

        let Declaration::MemoryMap(zp) = &program.declarations[1] else {
            panic!("expected @zp declaration");
        };
        assert_eq!(zp.storage, StorageKind::ZeroPage);
        assert_eq!(zp.address, 0x10);
    }

    #[test]
    fn test_enum_declaration() {
        let program = parse_ok("enum Color { Black = 0, White, Red = 2 }");
        let Declaration::Enum(e) = &program.declarations[0] else {
            panic!("expected enum");
        };
        assert_eq!(e.members.len(), 3);
        assert!(e.members[1].value.is_none());
    }

    #[test]
    fn test_precedence() {
        let program = parse_ok("let x: byte = 1 + 2 * 3;");
        let Declaration::Variable(var) = &program.declarations[0] else {
            panic!();
        };
        let ExprKind::Binary { op, rhs, .. } = &var.init.as_ref().unwrap().kind else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_cast_expression() {
        let program = parse_ok("function f(w: word): byte { return w as byte; }");
        let Declaration::Function(func) = &program.declarations[0] else {
            panic!();
        };
        let Statement::Return(ret) = &func.body.statements[0] else {
            panic!();
        };
        assert!(matches!(
            ret.value.as_ref().unwrap().kind,
            ExprKind::Cast { .. }
        ));
    }

    #[test]
    fn test_control_flow_statements() {
        let program = parse_ok(
            "function f(): void {\n\
             while true { break; }\n\
             for i = 0 to 10 { continue; }\n\
             if 1 < 2 { } else { }\n\
             }",
        );
        let Declaration::Function(func) = &program.declarations[0] else {
            panic!();
        };
        assert!(matches!(func.body.statements[0], Statement::While(_)));
        assert!(matches!(func.body.statements[1], Statement::For(_)));
        assert!(matches!(func.body.statements[2], Statement::If(_)));
    }

    #[test]
    fn test_assignment_statement_forms() {
        let program = parse_ok(
            "function f(): void { let a: byte = 0; a = 1; a += 2; }",
        );
        let Declaration::Function(func) = &program.declarations[0] else {
            panic!();
        };
        let Statement::Assign(plain) = &func.body.statements[1] else {
            panic!();
        };
        assert_eq!(plain.op, AssignOp::Assign);
        let Statement::Assign(compound) = &func.body.statements[2] else {
            panic!();
        };
        assert_eq!(compound.op, AssignOp::AddAssign);
    }

    #[test]
    fn test_assignment_is_not_an_expression() {
        let (_, errors) = Parser::new("function f(): void { let x: byte = (a = 1); }", "main").parse();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_invalid_assign_target() {
        let (_, errors) = Parser::new("function f(): void { 1 = 2; }", "main").parse();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParseError::InvalidAssignTarget { .. })));
    }

    #[test]
    fn test_error_recovery_continues() {
        let source = "let bad syntax here;\nlet ok: byte = 1;";
        let (program, errors) = Parser::new(source, "main").parse();
        assert!(!errors.is_empty());
        // The second declaration still parses
        assert!(program
            .declarations
            .iter()
            .any(|d| matches!(d, Declaration::Variable(v) if v.name.name == "ok")));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let program = parse_ok("function f(a: byte): byte { return a + a * a; }");
        let mut seen = std::collections::HashSet::new();
        fn walk_expr(expr: &Expr, seen: &mut std::collections::HashSet<u32>) {
            assert!(seen.insert(expr.id.as_u32()), "duplicate node id {}", expr.id);
            match &expr.kind {
                ExprKind::Binary { lhs, rhs, .. } => {
                    walk_expr(lhs, seen);
                    walk_expr(rhs, seen);
                }
                ExprKind::Unary { operand, .. } => walk_expr(operand, seen),
                _ => {}
            }
        }
        let Declaration::Function(func) = &program.declarations[0] else {
            panic!();
        };
        let Statement::Return(ret) = &func.body.statements[0] else {
            panic!();
        };
        walk_expr(ret.value.as_ref().unwrap(), &mut seen);
        assert!(seen.len() >= 5);
    }
}
