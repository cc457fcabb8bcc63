//! Abstract syntax tree for the Blend65 language.
//!
//! Every node that downstream passes may attach optimization metadata to
//! carries a [`NodeId`], unique within its [`Program`]. Metadata itself
//! lives in a side table keyed by `NodeId` (see [`crate::metadata`]), so
//! the tree stays immutable once parsing finishes.

mod decl;
mod expr;
mod stmt;
pub mod visitor;

pub use decl::{
    ConstantDecl, Declaration, EnumDecl, EnumMember, FunctionDecl, ImportDecl, MemoryMapDecl,
    ModuleDecl, Param, StorageKind, VariableDecl,
};
pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use stmt::{
    AssignOp, AssignStmt, Block, BreakStmt, ContinueStmt, ExprStmt, ForStmt, IfStmt, ReturnStmt,
    Statement, WhileStmt,
};

use crate::span::Span;
use std::fmt;

/// Unique id of an AST node within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An identifier occurrence with its own node id and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub id: NodeId,
    pub name: String,
    pub location: Span,
}

/// A parsed program: one source file.
#[derive(Debug, Clone)]
pub struct Program {
    /// The `module a.b;` header
    pub module: ModuleDecl,
    /// Top-level declarations, in source order
    pub declarations: Vec<Declaration>,
    /// Span of the whole file
    pub location: Span,
    /// Source key this program was parsed from (e.g. `main` or `@stdlib/c64`)
    pub source_name: String,
}

impl Program {
    /// Dotted module name from the header.
    pub fn module_name(&self) -> String {
        self.module.path.join(".")
    }

    /// Iterate all function declarations.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Function(f) => Some(f),
            _ => None,
        })
    }

    /// Iterate all import declarations.
    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Import(i) => Some(i),
            _ => None,
        })
    }
}

/// Syntactic type annotation, resolved to a semantic type by the checker.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub id: NodeId,
    pub kind: TypeExprKind,
    pub location: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// A simple name: `byte`, `word`, `bool`, `void`, or a user type
    Named(String),
    /// `T[n]` with a constant length expression, or `T[]`
    Array {
        element: Box<TypeExpr>,
        length: Option<Box<Expr>>,
    },
    /// `*T`
    Pointer(Box<TypeExpr>),
}
