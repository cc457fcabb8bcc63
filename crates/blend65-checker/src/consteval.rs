//! Compile-time evaluation of constant expressions.
//!
//! Used for array lengths, enum member values, and `@map` addresses.
//! Returns `None` for anything that is not a compile-time number; the
//! caller decides whether that is an error.

use crate::symbols::{ScopeId, SymbolKind, SymbolPayload, SymbolTable};
use blend65_parser::ast::{BinaryOp, Expr, ExprKind, UnaryOp};

/// Evaluate `expr` against the symbols visible from `scope`.
pub fn eval_const_expr(expr: &Expr, table: &SymbolTable, scope: ScopeId) -> Option<i64> {
    match &expr.kind {
        ExprKind::Number(n) => Some(*n),

        ExprKind::Identifier(name) => {
            let symbol = table.lookup_from(scope, name)?;
            match &symbol.payload {
                SymbolPayload::EnumMember { value } => Some(*value),
                SymbolPayload::Constant { value } => *value,
                _ => None,
            }
        }

        // Enum member access (`Color.Black`); members share a flat
        // module-level namespace
        ExprKind::Member { member, .. } => {
            let symbol = table.lookup_from(scope, member)?;
            if symbol.kind != SymbolKind::EnumMember {
                return None;
            }
            match &symbol.payload {
                SymbolPayload::EnumMember { value } => Some(*value),
                _ => None,
            }
        }

        ExprKind::Unary { op, operand } => {
            let value = eval_const_expr(operand, table, scope)?;
            match op {
                UnaryOp::Neg => Some(-value),
                UnaryOp::BitNot => Some(!value),
                _ => None,
            }
        }

        ExprKind::Binary { op, lhs, rhs } => {
            let l = eval_const_expr(lhs, table, scope)?;
            let r = eval_const_expr(rhs, table, scope)?;
            match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                BinaryOp::Div => {
                    if r == 0 {
                        None
                    } else {
                        Some(l / r)
                    }
                }
                BinaryOp::Mod => {
                    if r == 0 {
                        None
                    } else {
                        Some(l % r)
                    }
                }
                BinaryOp::BitAnd => Some(l & r),
                BinaryOp::BitOr => Some(l | r),
                BinaryOp::BitXor => Some(l ^ r),
                BinaryOp::ShiftLeft => {
                    if (0..16).contains(&r) {
                        Some((l << r) & 0xFFFF)
                    } else {
                        None
                    }
                }
                BinaryOp::ShiftRight => {
                    if (0..16).contains(&r) {
                        Some(l >> r)
                    } else {
                        None
                    }
                }
                _ => None,
            }
        }

        _ => None,
    }
}

/// Evaluate a boolean condition, when it folds to a constant.
pub fn eval_const_bool(expr: &Expr, table: &SymbolTable, scope: ScopeId) -> Option<bool> {
    match &expr.kind {
        ExprKind::Bool(b) => Some(*b),
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => eval_const_bool(operand, table, scope).map(|b| !b),
        ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
            let l = eval_const_expr(lhs, table, scope)?;
            let r = eval_const_expr(rhs, table, scope)?;
            Some(match op {
                BinaryOp::Equal => l == r,
                BinaryOp::NotEqual => l != r,
                BinaryOp::Less => l < r,
                BinaryOp::LessEqual => l <= r,
                BinaryOp::Greater => l > r,
                BinaryOp::GreaterEqual => l >= r,
                _ => unreachable!(),
            })
        }
        ExprKind::Binary { op, lhs, rhs } if op.is_logical() => {
            let l = eval_const_bool(lhs, table, scope)?;
            let r = eval_const_bool(rhs, table, scope)?;
            Some(match op {
                BinaryOp::And => l && r,
                BinaryOp::Or => l || r,
                _ => unreachable!(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend65_parser::ast::NodeId;
    use blend65_parser::{Parser, Span};

    fn expr_of(source: &str) -> blend65_parser::ast::Expr {
        let full = format!("let x: byte = {};", source);
        let (program, errors) = Parser::new(&full, "t").parse();
        assert!(errors.is_empty());
        match &program.declarations[0] {
            blend65_parser::ast::Declaration::Variable(v) => v.init.clone().unwrap(),
            _ => panic!(),
        }
    }

    #[test]
    fn test_arithmetic_folding() {
        let table = SymbolTable::new();
        let scope = table.module_scope();
        assert_eq!(eval_const_expr(&expr_of("2 + 3 * 4"), &table, scope), Some(14));
        assert_eq!(eval_const_expr(&expr_of("1 << 8"), &table, scope), Some(256));
        assert_eq!(eval_const_expr(&expr_of("0xD020 & 0xFF"), &table, scope), Some(0x20));
    }

    #[test]
    fn test_division_by_zero_does_not_fold() {
        let table = SymbolTable::new();
        assert_eq!(
            eval_const_expr(&expr_of("1 / 0"), &table, table.module_scope()),
            None
        );
    }

    #[test]
    fn test_enum_member_reference() {
        let mut table = SymbolTable::new();
        table.declare_enum_member("Black", NodeId::new(0), Span::dummy(), 0);
        table.declare_enum_member("White", NodeId::new(1), Span::dummy(), 1);
        let scope = table.module_scope();
        assert_eq!(eval_const_expr(&expr_of("White + 1"), &table, scope), Some(2));
    }

    #[test]
    fn test_const_bool_folding() {
        let table = SymbolTable::new();
        let scope = table.module_scope();
        assert_eq!(eval_const_bool(&expr_of("true"), &table, scope), Some(true));
        assert_eq!(eval_const_bool(&expr_of("1 < 2"), &table, scope), Some(true));
        assert_eq!(eval_const_bool(&expr_of("2 == 3"), &table, scope), Some(false));
    }
}
