//! Statements

use super::decl::VariableDecl;
use super::{Expr, Identifier, NodeId};
use crate::span::Span;
use std::fmt;

/// A statement inside a function body.
#[derive(Debug, Clone)]
pub enum Statement {
    /// `let x: byte = 1;`
    Let(VariableDecl),
    /// `target = value;` and compound forms
    Assign(AssignStmt),
    /// `if cond { } else { }`
    If(IfStmt),
    /// `while cond { }`
    While(WhileStmt),
    /// `for i = a to b { }` (inclusive upper bound)
    For(ForStmt),
    /// `break;`
    Break(BreakStmt),
    /// `continue;`
    Continue(ContinueStmt),
    /// `return expr?;`
    Return(ReturnStmt),
    /// Bare expression statement (typically a call)
    Expression(ExprStmt),
    /// `{ ... }`
    Block(Block),
}

impl Statement {
    pub fn id(&self) -> NodeId {
        match self {
            Statement::Let(s) => s.id,
            Statement::Assign(s) => s.id,
            Statement::If(s) => s.id,
            Statement::While(s) => s.id,
            Statement::For(s) => s.id,
            Statement::Break(s) => s.id,
            Statement::Continue(s) => s.id,
            Statement::Return(s) => s.id,
            Statement::Expression(s) => s.id,
            Statement::Block(s) => s.id,
        }
    }

    pub fn location(&self) -> Span {
        match self {
            Statement::Let(s) => s.location,
            Statement::Assign(s) => s.location,
            Statement::If(s) => s.location,
            Statement::While(s) => s.location,
            Statement::For(s) => s.location,
            Statement::Break(s) => s.location,
            Statement::Continue(s) => s.location,
            Statement::Return(s) => s.location,
            Statement::Expression(s) => s.location,
            Statement::Block(s) => s.location,
        }
    }
}

/// A braced statement list.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Statement>,
    pub location: Span,
}

/// Assignment operator, `=` or a compound form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::BitAndAssign => "&=",
            AssignOp::BitOrAssign => "|=",
            AssignOp::BitXorAssign => "^=",
        };
        write!(f, "{}", s)
    }
}

/// Assignment statement. The target is restricted by the parser to an
/// identifier, index expression, or pointer dereference.
#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub id: NodeId,
    pub target: Expr,
    pub op: AssignOp,
    pub value: Expr,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub id: NodeId,
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Box<Statement>>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub id: NodeId,
    pub condition: Expr,
    pub body: Block,
    pub location: Span,
}

/// `for i = from to to_expr { body }` — iterates inclusively.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub id: NodeId,
    pub variable: Identifier,
    pub from: Expr,
    pub to: Expr,
    pub body: Block,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct BreakStmt {
    pub id: NodeId,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct ContinueStmt {
    pub id: NodeId,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub id: NodeId,
    pub value: Option<Expr>,
    pub location: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub id: NodeId,
    pub expr: Expr,
    pub location: Span,
}
