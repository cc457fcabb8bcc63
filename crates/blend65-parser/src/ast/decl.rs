//! Top-level declarations

use super::stmt::Block;
use super::{Expr, Identifier, NodeId, TypeExpr};
use crate::span::Span;

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Declaration {
    Import(ImportDecl),
    Variable(VariableDecl),
    Constant(ConstantDecl),
    Function(FunctionDecl),
    MemoryMap(MemoryMapDecl),
    Enum(EnumDecl),
}

impl Declaration {
    pub fn id(&self) -> NodeId {
        match self {
            Declaration::Import(d) => d.id,
            Declaration::Variable(d) => d.id,
            Declaration::Constant(d) => d.id,
            Declaration::Function(d) => d.id,
            Declaration::MemoryMap(d) => d.id,
            Declaration::Enum(d) => d.id,
        }
    }

    pub fn location(&self) -> Span {
        match self {
            Declaration::Import(d) => d.location,
            Declaration::Variable(d) => d.location,
            Declaration::Constant(d) => d.location,
            Declaration::Function(d) => d.location,
            Declaration::MemoryMap(d) => d.location,
            Declaration::Enum(d) => d.location,
        }
    }

    /// The declared name, when this declaration is exported.
    pub fn exported_name(&self) -> Option<&str> {
        match self {
            Declaration::Variable(d) if d.exported => Some(&d.name.name),
            Declaration::Constant(d) if d.exported => Some(&d.name.name),
            Declaration::Function(d) if d.exported => Some(&d.name.name),
            Declaration::Enum(d) if d.exported => Some(&d.name.name),
            _ => None,
        }
    }
}

/// The `module a.b;` header.
#[derive(Debug, Clone)]
pub struct ModuleDecl {
    pub id: NodeId,
    /// Dot-separated path segments
    pub path: Vec<String>,
    pub location: Span,
}

/// `import a, b from c.d;` or `import * from c.d;`
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub id: NodeId,
    /// Imported identifiers; empty for a wildcard import
    pub names: Vec<Identifier>,
    /// True for `import *`
    pub wildcard: bool,
    /// Target module path segments
    pub module_path: Vec<String>,
    pub location: Span,
}

impl ImportDecl {
    pub fn module_name(&self) -> String {
        self.module_path.join(".")
    }
}

/// `let name: type = init;` — top level or inside a function body.
#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub id: NodeId,
    pub name: Identifier,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub exported: bool,
    pub location: Span,
}

/// `const name: type = value;`
#[derive(Debug, Clone)]
pub struct ConstantDecl {
    pub id: NodeId,
    pub name: Identifier,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
    pub exported: bool,
    pub location: Span,
}

/// Function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub name: Identifier,
    pub ty: TypeExpr,
    pub location: Span,
}

/// `function name(params): ret { body }`
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub name: Identifier,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    pub exported: bool,
    pub location: Span,
}

/// Storage class of an address-bound declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// `@map` — absolute memory-mapped address (e.g. `0xD020`)
    Absolute,
    /// `@zp` — zero-page address
    ZeroPage,
}

/// `@map name: type = 0xADDR;` or `@zp name: type = 0xZZ;`
#[derive(Debug, Clone)]
pub struct MemoryMapDecl {
    pub id: NodeId,
    pub storage: StorageKind,
    pub name: Identifier,
    pub ty: TypeExpr,
    pub address: u16,
    pub location: Span,
}

/// An enum member, with optional explicit value.
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub id: NodeId,
    pub name: Identifier,
    pub value: Option<Expr>,
    pub location: Span,
}

/// `enum Name { A = 1, B }`
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub id: NodeId,
    pub name: Identifier,
    pub members: Vec<EnumMember>,
    pub exported: bool,
    pub location: Span,
}
