//! Recursive-descent parser for the Blend65 language.
//!
//! The parser is resilient: on error it records a [`ParseError`] and
//! resynchronizes at the next statement boundary, so a single mistake
//! does not hide the rest of the file from later phases.

mod expr;
mod stmt;

use crate::ast::{
    ConstantDecl, Declaration, EnumDecl, EnumMember, FunctionDecl, Identifier, ImportDecl,
    MemoryMapDecl, ModuleDecl, NodeId, Param, Program, StorageKind, TypeExpr, TypeExprKind,
    VariableDecl,
};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::Token;
use thiserror::Error;

/// Parse errors. Each maps onto one diagnostic code.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected character '{char}'")]
    UnexpectedCharacter { char: char, span: Span },

    #[error("invalid numeric literal: {text}")]
    InvalidNumber { text: String, span: Span },

    #[error("invalid assignment target")]
    InvalidAssignTarget { span: Span },

    #[error("address of '{name}' must be a constant in 16-bit range")]
    InvalidAddress { name: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedCharacter { span, .. }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::InvalidAssignTarget { span }
            | ParseError::InvalidAddress { span, .. } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// The parser.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    next_node_id: u32,
    errors: Vec<ParseError>,
    source_name: String,
}

impl Parser {
    /// Lex and prepare to parse one source file.
    pub fn new(source: &str, source_name: impl Into<String>) -> Self {
        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        let errors = lex_errors
            .into_iter()
            .map(|e| match e {
                crate::lexer::LexError::UnexpectedCharacter { char, span } => {
                    ParseError::UnexpectedCharacter { char, span }
                }
                crate::lexer::LexError::InvalidNumber { text, span } => {
                    ParseError::InvalidNumber { text, span }
                }
            })
            .collect();
        Self {
            tokens,
            pos: 0,
            next_node_id: 0,
            errors,
            source_name: source_name.into(),
        }
    }

    /// Parse the whole file.
    ///
    /// Always returns a [`Program`], possibly partial; accumulated errors
    /// ride alongside. A missing `module` header defaults the module path
    /// to the source name.
    pub fn parse(mut self) -> (Program, Vec<ParseError>) {
        let start_span = self.current_span();

        let module = if self.check(&Token::Module) {
            match self.parse_module_header() {
                Ok(m) => m,
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                    self.default_module_decl(start_span)
                }
            }
        } else {
            self.default_module_decl(start_span)
        };

        let mut declarations = Vec::new();
        while !self.at_eof() {
            match self.parse_declaration() {
                Ok(decl) => declarations.push(decl),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        let location = start_span.merge(self.current_span());
        let program = Program {
            module,
            declarations,
            location,
            source_name: self.source_name.clone(),
        };
        (program, self.errors)
    }

    fn default_module_decl(&mut self, span: Span) -> ModuleDecl {
        ModuleDecl {
            id: self.next_id(),
            path: vec![self.source_name.clone()],
            location: span,
        }
    }

    fn parse_module_header(&mut self) -> ParseResult<ModuleDecl> {
        let start = self.expect(&Token::Module)?;
        let id = self.next_id();
        let path = self.parse_path()?;
        let end = self.expect(&Token::Semicolon)?;
        Ok(ModuleDecl {
            id,
            path,
            location: start.merge(end),
        })
    }

    /// Dotted path: `ident ('.' ident)*`
    fn parse_path(&mut self) -> ParseResult<Vec<String>> {
        let mut segments = vec![self.expect_identifier()?.name];
        while self.match_token(&Token::Dot) {
            segments.push(self.expect_identifier()?.name);
        }
        Ok(segments)
    }

    fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        let exported = self.match_token(&Token::Export);
        match self.peek() {
            Token::Import => self.parse_import().map(Declaration::Import),
            Token::Let => self.parse_variable(exported).map(Declaration::Variable),
            Token::Const => self.parse_constant(exported).map(Declaration::Constant),
            Token::Function => self.parse_function(exported).map(Declaration::Function),
            Token::AtMap => self.parse_memory_map(StorageKind::Absolute).map(Declaration::MemoryMap),
            Token::AtZp => self.parse_memory_map(StorageKind::ZeroPage).map(Declaration::MemoryMap),
            Token::Enum => self.parse_enum(exported).map(Declaration::Enum),
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn parse_import(&mut self) -> ParseResult<ImportDecl> {
        let start = self.expect(&Token::Import)?;
        let id = self.next_id();

        let (names, wildcard) = if self.match_token(&Token::Star) {
            (Vec::new(), true)
        } else {
            let mut names = vec![self.expect_identifier()?];
            while self.match_token(&Token::Comma) {
                names.push(self.expect_identifier()?);
            }
            (names, false)
        };

        self.expect(&Token::From)?;
        let module_path = self.parse_path()?;
        let end = self.expect(&Token::Semicolon)?;

        Ok(ImportDecl {
            id,
            names,
            wildcard,
            module_path,
            location: start.merge(end),
        })
    }

    pub(crate) fn parse_variable(&mut self, exported: bool) -> ParseResult<VariableDecl> {
        let start = self.expect(&Token::Let)?;
        let id = self.next_id();
        let name = self.expect_identifier()?;
        let ty = if self.match_token(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.match_token(&Token::Equal) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect(&Token::Semicolon)?;
        Ok(VariableDecl {
            id,
            name,
            ty,
            init,
            exported,
            location: start.merge(end),
        })
    }

    fn parse_constant(&mut self, exported: bool) -> ParseResult<ConstantDecl> {
        let start = self.expect(&Token::Const)?;
        let id = self.next_id();
        let name = self.expect_identifier()?;
        let ty = if self.match_token(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&Token::Equal)?;
        let value = self.parse_expr()?;
        let end = self.expect(&Token::Semicolon)?;
        Ok(ConstantDecl {
            id,
            name,
            ty,
            value,
            exported,
            location: start.merge(end),
        })
    }

    fn parse_function(&mut self, exported: bool) -> ParseResult<FunctionDecl> {
        let start = self.expect(&Token::Function)?;
        let id = self.next_id();
        let name = self.expect_identifier()?;

        self.expect(&Token::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                let param_id = self.next_id();
                let param_name = self.expect_identifier()?;
                self.expect(&Token::Colon)?;
                let ty = self.parse_type()?;
                let location = param_name.location.merge(ty.location);
                params.push(Param {
                    id: param_id,
                    name: param_name,
                    ty,
                    location,
                });
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RightParen)?;

        let return_type = if self.match_token(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        let location = start.merge(body.location);
        Ok(FunctionDecl {
            id,
            name,
            params,
            return_type,
            body,
            exported,
            location,
        })
    }

    fn parse_memory_map(&mut self, storage: StorageKind) -> ParseResult<MemoryMapDecl> {
        let marker = match storage {
            StorageKind::Absolute => Token::AtMap,
            StorageKind::ZeroPage => Token::AtZp,
        };
        let start = self.expect(&marker)?;
        let id = self.next_id();
        let name = self.expect_identifier()?;
        self.expect(&Token::Colon)?;
        let ty = self.parse_type()?;
        self.expect(&Token::Equal)?;

        let addr_span = self.current_span();
        let address = match self.advance() {
            Token::Number(n) if (0..=0xFFFF).contains(&n) => n as u16,
            _ => {
                return Err(ParseError::InvalidAddress {
                    name: name.name,
                    span: addr_span,
                })
            }
        };
        let end = self.expect(&Token::Semicolon)?;

        Ok(MemoryMapDecl {
            id,
            storage,
            name,
            ty,
            address,
            location: start.merge(end),
        })
    }

    fn parse_enum(&mut self, exported: bool) -> ParseResult<EnumDecl> {
        let start = self.expect(&Token::Enum)?;
        let id = self.next_id();
        let name = self.expect_identifier()?;
        self.expect(&Token::LeftBrace)?;

        let mut members = Vec::new();
        while !self.check(&Token::RightBrace) && !self.at_eof() {
            let member_id = self.next_id();
            let member_name = self.expect_identifier()?;
            let value = if self.match_token(&Token::Equal) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let location = match &value {
                Some(v) => member_name.location.merge(v.location),
                None => member_name.location,
            };
            members.push(EnumMember {
                id: member_id,
                name: member_name,
                value,
                location,
            });
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(&Token::RightBrace)?;

        Ok(EnumDecl {
            id,
            name,
            members,
            exported,
            location: start.merge(end),
        })
    }

    /// Type expression: `*T`, `name`, `name[n]`, `name[]` (suffixes nest).
    pub(crate) fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        if self.check(&Token::Star) {
            let start = self.expect(&Token::Star)?;
            let id = self.next_id();
            let pointee = self.parse_type()?;
            let location = start.merge(pointee.location);
            return Ok(TypeExpr {
                id,
                kind: TypeExprKind::Pointer(Box::new(pointee)),
                location,
            });
        }

        let name = self.expect_identifier()?;
        let mut ty = TypeExpr {
            id: self.next_id(),
            location: name.location,
            kind: TypeExprKind::Named(name.name),
        };

        while self.check(&Token::LeftBracket) {
            let _ = self.expect(&Token::LeftBracket)?;
            let length = if self.check(&Token::RightBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            let end = self.expect(&Token::RightBracket)?;
            let location = ty.location.merge(end);
            ty = TypeExpr {
                id: self.next_id(),
                kind: TypeExprKind::Array {
                    element: Box::new(ty),
                    length,
                },
                location,
            };
        }

        Ok(ty)
    }

    // ----- token helpers -----

    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    pub(crate) fn peek_next(&self) -> &Token {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx].0
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    pub(crate) fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].1
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: &Token) -> ParseResult<Span> {
        if self.check(token) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("'{}'", token),
                found: self.peek().describe(),
                span: self.current_span(),
            })
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> ParseResult<Identifier> {
        let span = self.current_span();
        match self.peek().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Identifier {
                    id: self.next_id(),
                    name,
                    location: span,
                })
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: other.describe(),
                span,
            }),
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.peek().describe(),
            span: self.current_span(),
        }
    }

    /// Skip to the next statement boundary after an error.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_eof() {
            if self.match_token(&Token::Semicolon) {
                return;
            }
            match self.peek() {
                Token::Function
                | Token::Let
                | Token::Const
                | Token::Import
                | Token::Enum
                | Token::If
                | Token::While
                | Token::For
                | Token::Return
                | Token::RightBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}
