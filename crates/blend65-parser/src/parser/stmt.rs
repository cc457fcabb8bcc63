//! Statement parsing

use super::{ParseError, ParseResult, Parser};
use crate::ast::{
    AssignOp, AssignStmt, Block, BreakStmt, ContinueStmt, ExprKind, ExprStmt, ForStmt, IfStmt,
    ReturnStmt, Statement, UnaryOp, WhileStmt,
};
use crate::token::Token;

impl Parser {
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.expect(&Token::LeftBrace)?;
        let id = self.next_id();
        let mut statements = Vec::new();
        while !self.check(&Token::RightBrace) && !self.at_eof() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.record_error(e);
                    self.synchronize();
                    // Avoid an infinite loop on a token the synchronizer
                    // stops at but the statement parser rejects
                    if self.check(&Token::RightBrace) || self.at_eof() {
                        break;
                    }
                }
            }
        }
        let end = self.expect(&Token::RightBrace)?;
        Ok(Block {
            id,
            statements,
            location: start.merge(end),
        })
    }

    pub(crate) fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek() {
            Token::Let => self.parse_variable(false).map(Statement::Let),
            Token::If => self.parse_if().map(Statement::If),
            Token::While => self.parse_while().map(Statement::While),
            Token::For => self.parse_for().map(Statement::For),
            Token::Break => {
                let span = self.expect(&Token::Break)?;
                let id = self.next_id();
                let end = self.expect(&Token::Semicolon)?;
                Ok(Statement::Break(BreakStmt {
                    id,
                    location: span.merge(end),
                }))
            }
            Token::Continue => {
                let span = self.expect(&Token::Continue)?;
                let id = self.next_id();
                let end = self.expect(&Token::Semicolon)?;
                Ok(Statement::Continue(ContinueStmt {
                    id,
                    location: span.merge(end),
                }))
            }
            Token::Return => self.parse_return().map(Statement::Return),
            Token::LeftBrace => self.parse_block().map(Statement::Block),
            _ => self.parse_expr_or_assign(),
        }
    }

    fn parse_if(&mut self) -> ParseResult<IfStmt> {
        let start = self.expect(&Token::If)?;
        let id = self.next_id();
        let condition = self.parse_expr()?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.match_token(&Token::Else) {
            if self.check(&Token::If) {
                Some(Box::new(Statement::If(self.parse_if()?)))
            } else {
                Some(Box::new(Statement::Block(self.parse_block()?)))
            }
        } else {
            None
        };

        let end = match &else_branch {
            Some(stmt) => stmt.location(),
            None => then_branch.location,
        };
        Ok(IfStmt {
            id,
            condition,
            then_branch,
            else_branch,
            location: start.merge(end),
        })
    }

    fn parse_while(&mut self) -> ParseResult<WhileStmt> {
        let start = self.expect(&Token::While)?;
        let id = self.next_id();
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        let location = start.merge(body.location);
        Ok(WhileStmt {
            id,
            condition,
            body,
            location,
        })
    }

    /// `for i = from to to { body }` — inclusive upper bound.
    fn parse_for(&mut self) -> ParseResult<ForStmt> {
        let start = self.expect(&Token::For)?;
        let id = self.next_id();
        let variable = self.expect_identifier()?;
        self.expect(&Token::Equal)?;
        let from = self.parse_expr()?;
        self.expect(&Token::To)?;
        let to = self.parse_expr()?;
        let body = self.parse_block()?;
        let location = start.merge(body.location);
        Ok(ForStmt {
            id,
            variable,
            from,
            to,
            body,
            location,
        })
    }

    fn parse_return(&mut self) -> ParseResult<ReturnStmt> {
        let start = self.expect(&Token::Return)?;
        let id = self.next_id();
        let value = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = self.expect(&Token::Semicolon)?;
        Ok(ReturnStmt {
            id,
            value,
            location: start.merge(end),
        })
    }

    /// Either a bare expression statement or an assignment. Assignment is
    /// a statement in Blend65, never an expression.
    fn parse_expr_or_assign(&mut self) -> ParseResult<Statement> {
        let expr = self.parse_expr()?;

        let op = if self.match_token(&Token::Equal) {
            Some(AssignOp::Assign)
        } else if self.match_token(&Token::PlusEqual) {
            Some(AssignOp::AddAssign)
        } else if self.match_token(&Token::MinusEqual) {
            Some(AssignOp::SubAssign)
        } else if self.match_token(&Token::StarEqual) {
            Some(AssignOp::MulAssign)
        } else if self.match_token(&Token::SlashEqual) {
            Some(AssignOp::DivAssign)
        } else if self.match_token(&Token::PercentEqual) {
            Some(AssignOp::ModAssign)
        } else if self.match_token(&Token::AmpEqual) {
            Some(AssignOp::BitAndAssign)
        } else if self.match_token(&Token::PipeEqual) {
            Some(AssignOp::BitOrAssign)
        } else if self.match_token(&Token::CaretEqual) {
            Some(AssignOp::BitXorAssign)
        } else {
            None
        };

        match op {
            Some(op) => {
                if !is_assign_target(&expr.kind) {
                    return Err(ParseError::InvalidAssignTarget {
                        span: expr.location,
                    });
                }
                let id = self.next_id();
                let value = self.parse_expr()?;
                let end = self.expect(&Token::Semicolon)?;
                let location = expr.location.merge(end);
                Ok(Statement::Assign(AssignStmt {
                    id,
                    target: expr,
                    op,
                    value,
                    location,
                }))
            }
            None => {
                let id = self.next_id();
                let end = self.expect(&Token::Semicolon)?;
                let location = expr.location.merge(end);
                Ok(Statement::Expression(ExprStmt {
                    id,
                    expr,
                    location,
                }))
            }
        }
    }

    pub(crate) fn record_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }
}

/// Valid assignment targets: names, array elements, pointer targets.
fn is_assign_target(kind: &ExprKind) -> bool {
    match kind {
        ExprKind::Identifier(_) | ExprKind::Index { .. } | ExprKind::Member { .. } => true,
        ExprKind::Unary { op, .. } => *op == UnaryOp::Deref,
        _ => false,
    }
}
