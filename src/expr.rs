//! Expression trees over the elementary function library.
//!
//! An [`Expr`] is an explicit representation of an arithmetic formula that
//! can be interpreted against any [`Scalar`]: plain floats, dual numbers or
//! graph variables. Build one with the operator overloads below or parse it
//! from text with [`Expr::parse`].
//!
//! ```
//! use adgrad::{Dual, Expr};
//!
//! let f: Expr<f64> = Expr::parse("x**2 + sin(y)").unwrap();
//! let x = Dual::variable(3.0);
//! let y = Dual::constant(0.0);
//! let out = f
//!     .eval(|name| match name {
//!         "x" => Some(x),
//!         "y" => Some(y),
//!         _ => None,
//!     })
//!     .unwrap();
//! assert_eq!(out.re, 9.0);
//! assert_eq!(out.eps, 6.0);
//! ```

mod lexer;
mod parser;

use std::fmt::{self, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use crate::elementary::Elementary;
use crate::error::{AdError, Result};
use crate::scalar::Scalar;
use crate::Float;

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
        }
    }
}

/// An arithmetic expression over named variables.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr<F> {
    Const(F),
    Var(String),
    Neg(Box<Expr<F>>),
    Binary(BinaryOp, Box<Expr<F>>, Box<Expr<F>>),
    Call(Elementary<F>, Box<Expr<F>>),
}

impl<F: Float> Expr<F> {
    /// Parse expression text such as `"tan(x) + exp(y) + sqrt(z)"`.
    pub fn parse(src: &str) -> Result<Self> {
        parser::parse(src)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn constant(value: F) -> Self {
        Expr::Const(value)
    }

    pub fn call(f: Elementary<F>, arg: Expr<F>) -> Self {
        Expr::Call(f, Box::new(arg))
    }

    pub fn pow(self, exponent: Expr<F>) -> Self {
        Expr::Binary(BinaryOp::Pow, Box::new(self), Box::new(exponent))
    }

    /// The value of a subtree that mentions no variables.
    ///
    /// `None` when a variable appears, or when the subtree itself fails to
    /// evaluate (a zero divisor, a call outside its domain). Evaluating such a
    /// subtree reports the error.
    pub fn constant_value(&self) -> Option<F> {
        match self {
            Expr::Const(c) => Some(*c),
            Expr::Var(_) => None,
            Expr::Neg(inner) => inner.constant_value().map(|c| -c),
            Expr::Call(f, arg) => f.evaluate(arg.constant_value()?).ok(),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.constant_value()?, rhs.constant_value()?);
                match op {
                    BinaryOp::Add => Some(a + b),
                    BinaryOp::Sub => Some(a - b),
                    BinaryOp::Mul => Some(a * b),
                    BinaryOp::Div => (b != F::zero()).then_some(a / b),
                    BinaryOp::Pow => Some(a.powf(b)),
                }
            }
        }
    }

    /// Variable names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.collect_variables(names),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
        }
    }

    /// Evaluate against any scalar type, resolving variables with `lookup`.
    ///
    /// A power whose exponent folds to a constant uses [`Scalar::powf`], one
    /// whose base folds to a constant uses [`Scalar::rpow`], anything else
    /// [`Scalar::pow`]. So `(0 - 2)**x` fails the same way `(-2)**x` does.
    pub fn eval<T>(&self, lookup: impl Fn(&str) -> Option<T>) -> Result<T>
    where
        T: Scalar<Float = F>,
    {
        self.eval_with(&lookup)
    }

    fn eval_with<T, L>(&self, lookup: &L) -> Result<T>
    where
        T: Scalar<Float = F>,
        L: Fn(&str) -> Option<T>,
    {
        match self {
            Expr::Const(c) => Ok(T::from_f(*c)),
            Expr::Var(name) => lookup(name).ok_or_else(|| AdError::UnknownVariable(name.clone())),
            Expr::Neg(inner) => Ok(-inner.eval_with(lookup)?),
            Expr::Call(f, arg) => arg.eval_with(lookup)?.apply(*f),
            Expr::Binary(op, lhs, rhs) => match op {
                BinaryOp::Add => Ok(lhs.eval_with(lookup)? + rhs.eval_with(lookup)?),
                BinaryOp::Sub => Ok(lhs.eval_with(lookup)? - rhs.eval_with(lookup)?),
                BinaryOp::Mul => Ok(lhs.eval_with(lookup)? * rhs.eval_with(lookup)?),
                BinaryOp::Div => lhs.eval_with(lookup)?.checked_div(rhs.eval_with(lookup)?),
                BinaryOp::Pow => {
                    if let Some(p) = rhs.constant_value() {
                        Ok(lhs.eval_with(lookup)?.powf(p))
                    } else if let Some(base) = lhs.constant_value() {
                        rhs.eval_with(lookup)?.rpow(base)
                    } else {
                        Ok(lhs.eval_with(lookup)?.pow(rhs.eval_with(lookup)?))
                    }
                }
            },
        }
    }
}

impl<F: Float> FromStr for Expr<F> {
    type Err = AdError;

    fn from_str(s: &str) -> Result<Self> {
        Expr::parse(s)
    }
}

impl<F: Float> Display for Expr<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) if *c < F::zero() => write!(f, "({})", c),
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Var(name) => f.write_str(name),
            Expr::Neg(inner) => write!(f, "(-{})", inner),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Call(Elementary::Log { base: Some(b) }, arg) => write!(f, "log({}, {})", arg, b),
            Expr::Call(
                Elementary::Logistic {
                    supremum,
                    growth,
                    midpoint,
                },
                arg,
            ) => write!(f, "logistic({}, {}, {}, {})", arg, supremum, growth, midpoint),
            Expr::Call(func, arg) => write!(f, "{}({})", func.name(), arg),
        }
    }
}

macro_rules! impl_expr_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<F: Float> $trait for Expr<F> {
            type Output = Expr<F>;
            fn $method(self, rhs: Expr<F>) -> Expr<F> {
                Expr::Binary($op, Box::new(self), Box::new(rhs))
            }
        }
    };
}

impl_expr_binop!(Add, add, BinaryOp::Add);
impl_expr_binop!(Sub, sub, BinaryOp::Sub);
impl_expr_binop!(Mul, mul, BinaryOp::Mul);
impl_expr_binop!(Div, div, BinaryOp::Div);

impl<F: Float> Neg for Expr<F> {
    type Output = Expr<F>;
    fn neg(self) -> Expr<F> {
        Expr::Neg(Box::new(self))
    }
}
