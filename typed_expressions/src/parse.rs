//! Text notation: lexer and precedence-climbing parser.
//!
//! Accepts what [`crate::strings::string_tree`] emits (call notation such
//! as `add(mul(c1, x1), c2)`) plus infix arithmetic, so hand-written
//! expressions and helper calls compile too.

use core::fmt;
use core::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("**")]
    StarStar,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Ident(s) => write!(f, "identifier {s:?}"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::StarStar => f.write_str("'**'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Caret => f.write_str("'^'"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected character {text:?} at {pos}")]
    InvalidCharacter { text: String, pos: usize },
    #[error("expected {expected}, found {found} at {pos}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        pos: usize,
    },
    #[error("empty expression")]
    Empty,
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn binding_power(self) -> (u8, u8) {
        match self {
            BinOp::Add | BinOp::Sub => (1, 2),
            BinOp::Mul | BinOp::Div => (3, 4),
            // right associative
            BinOp::Pow => (8, 7),
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Pow => a.powf(b),
        }
    }
}

const PREFIX_NEG_BP: u8 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Num(f64),
    Ident(String),
    Call { name: String, args: Vec<Ast> },
    Neg(Box<Ast>),
    Binary { op: BinOp, lhs: Box<Ast>, rhs: Box<Ast> },
}

impl Ast {
    /// Visits every identifier used as a value, left to right.
    pub fn for_each_ident<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Ast::Num(_) => {}
            Ast::Ident(name) => f(name),
            Ast::Call { args, .. } => args.iter().for_each(|a| a.for_each_ident(f)),
            Ast::Neg(inner) => inner.for_each_ident(f),
            Ast::Binary { lhs, rhs, .. } => {
                lhs.for_each_ident(f);
                rhs.for_each_ident(f);
            }
        }
    }
}

pub fn tokenize(source: &str) -> ParseResult<Vec<Token>> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    while let Some(kind) = lexer.next() {
        let span = lexer.span();
        match kind {
            Ok(kind) => tokens.push(Token { kind, span }),
            Err(()) => {
                return Err(ParseError::InvalidCharacter {
                    text: lexer.slice().to_string(),
                    pos: span.start,
                });
            }
        }
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: source.len()..source.len(),
    });
    Ok(tokens)
}

pub fn parse(source: &str) -> ParseResult<Ast> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    if parser.check(&TokenKind::Eof) {
        return Err(ParseError::Empty);
    }
    let ast = parser.parse_expr(0)?;
    parser.expect(TokenKind::Eof)?;
    Ok(ast)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // `tokens` always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    fn unexpected(&self, expected: String) -> ParseError {
        let tok = self.peek();
        ParseError::UnexpectedToken {
            expected,
            found: tok.kind.clone(),
            pos: tok.span.start,
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> ParseResult<Ast> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Caret | TokenKind::StarStar => BinOp::Pow,
                _ => break,
            };
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = Ast::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<Ast> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Number(n) => Ok(Ast::Num(n)),
            TokenKind::Minus => {
                let inner = self.parse_expr(PREFIX_NEG_BP)?;
                Ok(Ast::Neg(Box::new(inner)))
            }
            TokenKind::Plus => self.parse_expr(PREFIX_NEG_BP),
            TokenKind::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if !self.consume(&TokenKind::LParen) {
                    return Ok(Ast::Ident(name));
                }
                let mut args = Vec::new();
                if !self.consume(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expr(0)?);
                        if self.consume(&TokenKind::Comma) {
                            continue;
                        }
                        self.expect(TokenKind::RParen)?;
                        break;
                    }
                }
                Ok(Ast::Call { name, args })
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "an expression".to_string(),
                found,
                pos: tok.span.start,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Ast {
        Ast::Ident(s.to_string())
    }

    #[test]
    fn call_notation_round_trips_structure() {
        let ast = parse("add(mul(c1, x1), c2)").unwrap();
        assert_eq!(
            ast,
            Ast::Call {
                name: "add".into(),
                args: vec![
                    Ast::Call {
                        name: "mul".into(),
                        args: vec![ident("c1"), ident("x1")],
                    },
                    ident("c2"),
                ],
            }
        );
    }

    #[test]
    fn infix_precedence_and_associativity() {
        let ast = parse("1 + 2 * 3 ^ 2 ^ 1").unwrap();
        let Ast::Binary { op: BinOp::Add, rhs, .. } = ast else {
            panic!("expected add at root");
        };
        let Ast::Binary { op: BinOp::Mul, rhs, .. } = *rhs else {
            panic!("expected mul");
        };
        let Ast::Binary { op: BinOp::Pow, rhs, .. } = *rhs else {
            panic!("expected pow");
        };
        assert!(matches!(*rhs, Ast::Binary { op: BinOp::Pow, .. }));
    }

    #[test]
    fn unary_minus_binds_looser_than_pow() {
        let ast = parse("-x1**2").unwrap();
        let Ast::Neg(inner) = ast else {
            panic!("expected negation");
        };
        assert!(matches!(*inner, Ast::Binary { op: BinOp::Pow, .. }));
    }

    #[test]
    fn numbers_parse_in_all_forms() {
        assert_eq!(parse("2").unwrap(), Ast::Num(2.0));
        assert_eq!(parse("2.5e-1").unwrap(), Ast::Num(0.25));
        assert_eq!(parse(".5").unwrap(), Ast::Num(0.5));
    }

    #[test]
    fn errors_carry_positions() {
        assert_eq!(parse("").unwrap_err(), ParseError::Empty);
        assert!(matches!(
            parse("add(x1,").unwrap_err(),
            ParseError::UnexpectedToken { found: TokenKind::Eof, .. }
        ));
        assert!(matches!(
            parse("x1 $ 2").unwrap_err(),
            ParseError::InvalidCharacter { pos: 3, .. }
        ));
        assert!(matches!(
            parse("x1 x2").unwrap_err(),
            ParseError::UnexpectedToken { pos: 3, .. }
        ));
    }

    #[test]
    fn identifiers_are_visited_left_to_right() {
        let ast = parse("f(c2, x1 * c1) + c2").unwrap();
        let mut seen = Vec::new();
        ast.for_each_ident(&mut |s| seen.push(s));
        assert_eq!(seen, vec!["c2", "x1", "c1", "c2"]);
    }
}
