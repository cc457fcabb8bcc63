//! Lexer for the Blend65 language.
//!
//! The logos-generated matcher is internal; its tokens are converted to
//! the public [`Token`] enum with full line/column/offset spans, and an
//! `Eof` token is appended.

use crate::span::{Position, Span};
use crate::token::Token;
use logos::Logos;

/// Logos-based token enum for lexing.
///
/// Converted to the public `Token` enum after matching; keywords must
/// come before identifiers so logos gives them priority.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*", lex_block_comment)]
    BlockComment,

    // Keywords
    #[token("module")]
    Module,

    #[token("import")]
    Import,

    #[token("from")]
    From,

    #[token("export")]
    Export,

    #[token("function")]
    Function,

    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("enum")]
    Enum,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("for")]
    For,

    #[token("to")]
    To,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    #[token("return")]
    Return,

    #[token("as")]
    As,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // Address-bound declaration markers
    #[token("@map")]
    AtMap,

    #[token("@zp")]
    AtZp,

    // Identifiers (after keywords)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Numbers: hex, binary, decimal
    #[regex(r"0x[0-9a-fA-F]+(_[0-9a-fA-F]+)*", parse_hex)]
    #[regex(r"0b[01]+(_[01]+)*", parse_binary)]
    #[regex(r"[0-9]+(_[0-9]+)*", parse_int)]
    Number(i64),

    // Strings
    #[regex(r#""([^"\\]|\\.)*""#, parse_string)]
    StringLiteral(String),

    // Operators (longest first)
    #[token("==")]
    EqualEqual,

    #[token("!=")]
    BangEqual,

    #[token("<=")]
    LessEqual,

    #[token(">=")]
    GreaterEqual,

    #[token("&&")]
    AmpAmp,

    #[token("||")]
    PipePipe,

    #[token("<<")]
    LessLess,

    #[token(">>")]
    GreaterGreater,

    #[token("+=")]
    PlusEqual,

    #[token("-=")]
    MinusEqual,

    #[token("*=")]
    StarEqual,

    #[token("/=")]
    SlashEqual,

    #[token("%=")]
    PercentEqual,

    #[token("&=")]
    AmpEqual,

    #[token("|=")]
    PipeEqual,

    #[token("^=")]
    CaretEqual,

    // Single-character tokens
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("!")]
    Bang,

    #[token("~")]
    Tilde,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    #[token("^")]
    Caret,

    #[token("=")]
    Equal,

    #[token("?")]
    Question,

    #[token(".")]
    Dot,

    #[token(":")]
    Colon,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

// Helper parsing functions

fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::Skip {
    let remainder = lex.remainder();
    if let Some(end) = remainder.find("*/") {
        lex.bump(end + 2);
    } else {
        lex.bump(remainder.len());
    }
    logos::Skip
}

fn parse_hex(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    let s = lex.slice()[2..].replace('_', "");
    i64::from_str_radix(&s, 16).ok()
}

fn parse_binary(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    let s = lex.slice()[2..].replace('_', "");
    i64::from_str_radix(&s, 2).ok()
}

fn parse_int(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    Some(unescape_string(inner))
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('0') => result.push('\0'),
                Some(c) => result.push(c),
                None => break,
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn convert_token(token: LogosToken) -> Token {
    match token {
        LogosToken::Whitespace | LogosToken::LineComment | LogosToken::BlockComment => {
            unreachable!("skipped by logos")
        }
        LogosToken::Module => Token::Module,
        LogosToken::Import => Token::Import,
        LogosToken::From => Token::From,
        LogosToken::Export => Token::Export,
        LogosToken::Function => Token::Function,
        LogosToken::Let => Token::Let,
        LogosToken::Const => Token::Const,
        LogosToken::Enum => Token::Enum,
        LogosToken::If => Token::If,
        LogosToken::Else => Token::Else,
        LogosToken::While => Token::While,
        LogosToken::For => Token::For,
        LogosToken::To => Token::To,
        LogosToken::Break => Token::Break,
        LogosToken::Continue => Token::Continue,
        LogosToken::Return => Token::Return,
        LogosToken::As => Token::As,
        LogosToken::True => Token::True,
        LogosToken::False => Token::False,
        LogosToken::AtMap => Token::AtMap,
        LogosToken::AtZp => Token::AtZp,
        LogosToken::Identifier(name) => Token::Identifier(name),
        LogosToken::Number(value) => Token::Number(value),
        LogosToken::StringLiteral(text) => Token::StringLiteral(text),
        LogosToken::EqualEqual => Token::EqualEqual,
        LogosToken::BangEqual => Token::BangEqual,
        LogosToken::LessEqual => Token::LessEqual,
        LogosToken::GreaterEqual => Token::GreaterEqual,
        LogosToken::AmpAmp => Token::AmpAmp,
        LogosToken::PipePipe => Token::PipePipe,
        LogosToken::LessLess => Token::LessLess,
        LogosToken::GreaterGreater => Token::GreaterGreater,
        LogosToken::PlusEqual => Token::PlusEqual,
        LogosToken::MinusEqual => Token::MinusEqual,
        LogosToken::StarEqual => Token::StarEqual,
        LogosToken::SlashEqual => Token::SlashEqual,
        LogosToken::PercentEqual => Token::PercentEqual,
        LogosToken::AmpEqual => Token::AmpEqual,
        LogosToken::PipeEqual => Token::PipeEqual,
        LogosToken::CaretEqual => Token::CaretEqual,
        LogosToken::Plus => Token::Plus,
        LogosToken::Minus => Token::Minus,
        LogosToken::Star => Token::Star,
        LogosToken::Slash => Token::Slash,
        LogosToken::Percent => Token::Percent,
        LogosToken::Bang => Token::Bang,
        LogosToken::Tilde => Token::Tilde,
        LogosToken::Less => Token::Less,
        LogosToken::Greater => Token::Greater,
        LogosToken::Amp => Token::Amp,
        LogosToken::Pipe => Token::Pipe,
        LogosToken::Caret => Token::Caret,
        LogosToken::Equal => Token::Equal,
        LogosToken::Question => Token::Question,
        LogosToken::Dot => Token::Dot,
        LogosToken::Colon => Token::Colon,
        LogosToken::LeftParen => Token::LeftParen,
        LogosToken::RightParen => Token::RightParen,
        LogosToken::LeftBrace => Token::LeftBrace,
        LogosToken::RightBrace => Token::RightBrace,
        LogosToken::LeftBracket => Token::LeftBracket,
        LogosToken::RightBracket => Token::RightBracket,
        LogosToken::Semicolon => Token::Semicolon,
        LogosToken::Comma => Token::Comma,
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedCharacter { char: char, span: Span },
    InvalidNumber { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. } => *span,
            LexError::InvalidNumber { span, .. } => *span,
        }
    }

    pub fn message(&self) -> String {
        match self {
            LexError::UnexpectedCharacter { char, .. } => {
                format!("unexpected character '{}'", char.escape_default())
            }
            LexError::InvalidNumber { text, .. } => format!("invalid numeric literal '{}'", text),
        }
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the whole input, appending an `Eof` token.
    ///
    /// Returns all successfully lexed tokens even on error so the parser
    /// can still attempt recovery on partially broken input.
    pub fn tokenize(self) -> (Vec<(Token, Span)>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut logos_lexer = LogosToken::lexer(self.source);
        let mut line = 1u32;
        let mut column = 1u32;
        let mut last_end = 0usize;

        while let Some(token_result) = logos_lexer.next() {
            let range = logos_lexer.span();

            // Advance line/column over skipped text
            for c in self.source[last_end..range.start].chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }

            let start = Position::new(line, column, range.start as u32);

            // Advance over the token text itself
            for c in self.source[range.start..range.end].chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }

            let end = Position::new(line, column, range.end as u32);
            let span = Span::new(start, end);

            match token_result {
                Ok(token) => tokens.push((convert_token(token), span)),
                Err(_) => {
                    let char = self.source[range.start..].chars().next().unwrap_or('\0');
                    errors.push(LexError::UnexpectedCharacter { char, span });
                }
            }

            last_end = range.end;
        }

        // Trailing text after the last token still moves the cursor
        for c in self.source[last_end..].chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        let eof_pos = Position::new(line, column, self.source.len() as u32);
        tokens.push((Token::Eof, Span::new(eof_pos, eof_pos)));

        (tokens, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = lex("let x function module");
        assert_eq!(
            tokens,
            vec![
                Token::Let,
                Token::Identifier("x".to_string()),
                Token::Function,
                Token::Module,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = lex("10 0xD020 0b1010");
        assert_eq!(
            tokens,
            vec![
                Token::Number(10),
                Token::Number(0xD020),
                Token::Number(0b1010),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_address_markers() {
        let tokens = lex("@map border: byte = 0xD020;");
        assert_eq!(tokens[0], Token::AtMap);
        assert_eq!(tokens[1], Token::Identifier("border".to_string()));
        assert_eq!(tokens[2], Token::Colon);
    }

    #[test]
    fn test_spans_track_lines() {
        let (tokens, _) = Lexer::new("let x\nlet y").tokenize();
        let (_, second_let_span) = &tokens[2];
        assert_eq!(second_let_span.start.line, 2);
        assert_eq!(second_let_span.start.column, 1);
    }

    #[test]
    fn test_comments_skipped() {
        let tokens = lex("let // trailing\n/* block */ x");
        assert_eq!(
            tokens,
            vec![Token::Let, Token::Identifier("x".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_string_literals() {
        let tokens = lex(r#"let s = "hi\n";"#);
        assert!(tokens.contains(&Token::StringLiteral("hi\n".to_string())));
    }

    #[test]
    fn test_unexpected_character_reported() {
        let (_, errors) = Lexer::new("let # x").tokenize();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            LexError::UnexpectedCharacter { char: '#', .. }
        ));
    }

    #[test]
    fn test_operators() {
        let tokens = lex("a += b << 2");
        assert_eq!(tokens[1], Token::PlusEqual);
        assert_eq!(tokens[3], Token::LessLess);
    }
}
