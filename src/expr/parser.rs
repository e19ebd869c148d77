//! Recursive-descent parser for expression text.
//!
//! Precedence, loosest first: `+ -`, `* /`, unary `-`, `**` (right
//! associative). As in Python, `-x**2` is `-(x**2)` and `2**-1` is allowed.

use std::marker::PhantomData;
use std::ops::Range;

use super::lexer::{tokenize, Token};
use super::{BinaryOp, Expr};
use crate::elementary::Elementary;
use crate::error::{AdError, Result};
use crate::Float;

/// Deepest tree, and deepest parenthesis or sign nesting, accepted from text.
///
/// Evaluation walks the tree recursively, so longer chains such as a sum of
/// thousands of terms are rejected here with a parse error.
pub(crate) const MAX_DEPTH: usize = 256;

// A parsed subtree with its height.
type Node<F> = (Expr<F>, usize);

pub(crate) fn parse<F: Float>(src: &str) -> Result<Expr<F>> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::<F> {
        tokens,
        pos: 0,
        end: src.len(),
        nesting: 0,
        _float: PhantomData,
    };
    let (expr, _) = parser.expression()?;
    if let Some((token, span)) = parser.tokens.get(parser.pos) {
        return Err(parse_error(span.start, format!("unexpected {:?}", token)));
    }
    Ok(expr)
}

fn parse_error(position: usize, message: impl Into<String>) -> AdError {
    AdError::Parse {
        position,
        message: message.into(),
    }
}

fn too_deep(position: usize) -> AdError {
    parse_error(
        position,
        format!("expression nested deeper than {} levels", MAX_DEPTH),
    )
}

// Height of a node over children of the given height.
fn height(at: usize, child: usize) -> Result<usize> {
    let h = child + 1;
    if h > MAX_DEPTH {
        return Err(too_deep(at));
    }
    Ok(h)
}

struct Parser<F> {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    end: usize,
    nesting: usize,
    _float: PhantomData<F>,
}

impl<F: Float> Parser<F> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(parse_error(self.position(), format!("expected {}", what)))
        }
    }

    fn expression(&mut self) -> Result<Node<F>> {
        let (mut lhs, mut depth) = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok((lhs, depth)),
            };
            let at = self.position();
            self.pos += 1;
            let (rhs, rhs_depth) = self.term()?;
            depth = height(at, depth.max(rhs_depth))?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Node<F>> {
        let (mut lhs, mut depth) = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok((lhs, depth)),
            };
            let at = self.position();
            self.pos += 1;
            let (rhs, rhs_depth) = self.unary()?;
            depth = height(at, depth.max(rhs_depth))?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // Every nested parenthesis, sign and exponent passes through here.
    fn unary(&mut self) -> Result<Node<F>> {
        if self.nesting == MAX_DEPTH {
            return Err(too_deep(self.position()));
        }
        self.nesting += 1;
        let node = self.signed();
        self.nesting -= 1;
        node
    }

    fn signed(&mut self) -> Result<Node<F>> {
        let at = self.position();
        if self.eat(&Token::Minus) {
            return match self.unary()? {
                (Expr::Const(c), depth) => Ok((Expr::Const(-c), depth)),
                (inner, depth) => Ok((Expr::Neg(Box::new(inner)), height(at, depth)?)),
            };
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Node<F>> {
        let (base, base_depth) = self.primary()?;
        let at = self.position();
        if self.eat(&Token::Pow) {
            let (exponent, exponent_depth) = self.unary()?;
            let depth = height(at, base_depth.max(exponent_depth))?;
            return Ok((base.pow(exponent), depth));
        }
        Ok((base, base_depth))
    }

    fn primary(&mut self) -> Result<Node<F>> {
        let start = self.position();
        let token = match self.tokens.get(self.pos) {
            Some((token, _)) => token.clone(),
            None => return Err(parse_error(start, "unexpected end of expression")),
        };
        self.pos += 1;
        match token {
            Token::Number(n) => F::from_f64(n)
                .map(|c| (Expr::Const(c), 1))
                .ok_or_else(|| parse_error(start, format!("{} is not representable", n))),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    self.call(start, name)
                } else {
                    Ok((Expr::Var(name), 1))
                }
            }
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            other => Err(parse_error(start, format!("unexpected {:?}", other))),
        }
    }

    // Called with the opening parenthesis already consumed.
    fn call(&mut self, start: usize, name: String) -> Result<Node<F>> {
        let func = Elementary::<F>::from_name(&name)
            .ok_or_else(|| AdError::UnknownFunction(name.clone()))?;

        let (arg, arg_depth) = self.expression()?;
        let mut params = Vec::new();
        while self.eat(&Token::Comma) {
            let at = self.position();
            let (param, _) = self.expression()?;
            let value = param
                .constant_value()
                .ok_or_else(|| parse_error(at, format!("{} parameters must be constants", name)))?;
            params.push(value);
        }
        self.expect(&Token::RParen, "')'")?;

        let arity = |expected: &'static str| AdError::Arity {
            function: name.clone(),
            expected,
            found: params.len() + 1,
        };
        let func = match func {
            Elementary::Log { .. } => match params.as_slice() {
                [] => Elementary::ln(),
                [base] => Elementary::log(*base),
                _ => return Err(arity("1 or 2")),
            },
            Elementary::Logistic {
                supremum,
                growth,
                midpoint,
            } => {
                if params.len() > 3 {
                    return Err(arity("1 to 4"));
                }
                Elementary::Logistic {
                    supremum: params.first().copied().unwrap_or(supremum),
                    growth: params.get(1).copied().unwrap_or(growth),
                    midpoint: params.get(2).copied().unwrap_or(midpoint),
                }
            }
            simple if params.is_empty() => simple,
            _ => return Err(arity("1")),
        };
        Ok((Expr::call(func, arg), height(start, arg_depth)?))
    }
}
