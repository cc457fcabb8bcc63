//! Expression parsing (precedence climbing)

use super::{ParseResult, Parser};
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::token::Token;

impl Parser {
    /// Entry point: ternary has the lowest precedence.
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> ParseResult<Expr> {
        let cond = self.parse_logical_or()?;
        if !self.match_token(&Token::Question) {
            return Ok(cond);
        }
        let then_expr = self.parse_ternary()?;
        self.expect(&Token::Colon)?;
        let else_expr = self.parse_ternary()?;
        let location = cond.location.merge(else_expr.location);
        Ok(Expr {
            id: self.next_id(),
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            location,
        })
    }

    fn parse_logical_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_logical_and()?;
        while self.match_token(&Token::PipePipe) {
            let rhs = self.parse_logical_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_bit_or()?;
        while self.match_token(&Token::AmpAmp) {
            let rhs = self.parse_bit_or()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_bit_xor()?;
        while self.check(&Token::Pipe) {
            self.advance();
            let rhs = self.parse_bit_xor()?;
            lhs = self.binary(BinaryOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_xor(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_bit_and()?;
        while self.check(&Token::Caret) {
            self.advance();
            let rhs = self.parse_bit_and()?;
            lhs = self.binary(BinaryOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check(&Token::Amp) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinaryOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.match_token(&Token::EqualEqual) {
                BinaryOp::Equal
            } else if self.match_token(&Token::BangEqual) {
                BinaryOp::NotEqual
            } else {
                break;
            };
            let rhs = self.parse_relational()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_shift()?;
        loop {
            let op = if self.match_token(&Token::Less) {
                BinaryOp::Less
            } else if self.match_token(&Token::LessEqual) {
                BinaryOp::LessEqual
            } else if self.match_token(&Token::Greater) {
                BinaryOp::Greater
            } else if self.match_token(&Token::GreaterEqual) {
                BinaryOp::GreaterEqual
            } else {
                break;
            };
            let rhs = self.parse_shift()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.match_token(&Token::LessLess) {
                BinaryOp::ShiftLeft
            } else if self.match_token(&Token::GreaterGreater) {
                BinaryOp::ShiftRight
            } else {
                break;
            };
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.match_token(&Token::Plus) {
                BinaryOp::Add
            } else if self.match_token(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_cast()?;
        loop {
            let op = if self.match_token(&Token::Star) {
                BinaryOp::Mul
            } else if self.match_token(&Token::Slash) {
                BinaryOp::Div
            } else if self.match_token(&Token::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_cast()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// `expr as type` — explicit conversion, binds tighter than arithmetic.
    fn parse_cast(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_unary()?;
        while self.match_token(&Token::As) {
            let ty = self.parse_type()?;
            let location = expr.location.merge(ty.location);
            expr = Expr {
                id: self.next_id(),
                kind: ExprKind::Cast {
                    expr: Box::new(expr),
                    ty,
                },
                location,
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = if self.match_token(&Token::Minus) {
            Some(UnaryOp::Neg)
        } else if self.match_token(&Token::Bang) {
            Some(UnaryOp::Not)
        } else if self.match_token(&Token::Tilde) {
            Some(UnaryOp::BitNot)
        } else if self.match_token(&Token::Star) {
            Some(UnaryOp::Deref)
        } else if self.match_token(&Token::Amp) {
            Some(UnaryOp::AddressOf)
        } else {
            None
        };

        if let Some(op) = op {
            let start = self.previous_span();
            let operand = self.parse_unary()?;
            let location = start.merge(operand.location);
            return Ok(Expr {
                id: self.next_id(),
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                location,
            });
        }

        self.parse_postfix()
    }

    /// Calls, indexing, member access.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(&Token::LeftParen) {
                let mut args = Vec::new();
                if !self.check(&Token::RightParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if !self.match_token(&Token::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(&Token::RightParen)?;
                let location = expr.location.merge(end);
                expr = Expr {
                    id: self.next_id(),
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    location,
                };
            } else if self.match_token(&Token::LeftBracket) {
                let index = self.parse_expr()?;
                let end = self.expect(&Token::RightBracket)?;
                let location = expr.location.merge(end);
                expr = Expr {
                    id: self.next_id(),
                    kind: ExprKind::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    location,
                };
            } else if self.match_token(&Token::Dot) {
                let member = self.expect_identifier()?;
                let location = expr.location.merge(member.location);
                expr = Expr {
                    id: self.next_id(),
                    kind: ExprKind::Member {
                        base: Box::new(expr),
                        member: member.name,
                    },
                    location,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Number(n),
                    location: span,
                })
            }
            Token::True => {
                self.advance();
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Bool(true),
                    location: span,
                })
            }
            Token::False => {
                self.advance();
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Bool(false),
                    location: span,
                })
            }
            Token::StringLiteral(s) => {
                self.advance();
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Str(s),
                    location: span,
                })
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Identifier(name),
                    location: span,
                })
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        let location = lhs.location.merge(rhs.location);
        Expr {
            id: self.next_id(),
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            location,
        }
    }
}
