//! Elementary function library shared by both differentiation engines.
//!
//! Each [`Elementary`] knows its value, its local derivative and its domain.
//! [`Dual`](crate::Dual) and [`Var`](crate::Var) both go through
//! [`Elementary::value_and_derivative`], so forward and reverse mode apply
//! the same rule to the same primal value.

use std::fmt::{self, Display};

use crate::error::{AdError, Result};
use crate::Float;

/// A named elementary function `f : R -> R`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Elementary<F> {
    Sqrt,
    Exp,
    /// Logarithm in `base`; natural logarithm when `base` is `None`.
    Log { base: Option<F> },
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Sinh,
    Cosh,
    Tanh,
    /// `L / (1 + exp(-k (x - x0)))`.
    Logistic { supremum: F, growth: F, midpoint: F },
}

impl<F: Float> Elementary<F> {
    /// Natural logarithm.
    pub fn ln() -> Self {
        Elementary::Log { base: None }
    }

    /// Logarithm in the given base.
    pub fn log(base: F) -> Self {
        Elementary::Log { base: Some(base) }
    }

    /// Standard logistic function (`L = 1`, `k = 1`, `x0 = 0`).
    pub fn logistic() -> Self {
        Elementary::Logistic {
            supremum: F::one(),
            growth: F::one(),
            midpoint: F::zero(),
        }
    }

    /// Look up a function by the name used in expression text.
    ///
    /// Parameterised functions (`log`, `logistic`) come back with their
    /// defaults; the parser fills in extra arguments.
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "sqrt" => Elementary::Sqrt,
            "exp" => Elementary::Exp,
            "log" | "ln" => Elementary::ln(),
            "sin" => Elementary::Sin,
            "cos" => Elementary::Cos,
            "tan" => Elementary::Tan,
            "arcsin" | "asin" => Elementary::Arcsin,
            "arccos" | "acos" => Elementary::Arccos,
            "arctan" | "atan" => Elementary::Arctan,
            "sinh" => Elementary::Sinh,
            "cosh" => Elementary::Cosh,
            "tanh" => Elementary::Tanh,
            "logistic" => Elementary::logistic(),
            _ => return None,
        };
        Some(f)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Elementary::Sqrt => "sqrt",
            Elementary::Exp => "exp",
            Elementary::Log { .. } => "log",
            Elementary::Sin => "sin",
            Elementary::Cos => "cos",
            Elementary::Tan => "tan",
            Elementary::Arcsin => "arcsin",
            Elementary::Arccos => "arccos",
            Elementary::Arctan => "arctan",
            Elementary::Sinh => "sinh",
            Elementary::Cosh => "cosh",
            Elementary::Tanh => "tanh",
            Elementary::Logistic { .. } => "logistic",
        }
    }

    /// Reject `x` if it lies outside the function's domain.
    pub fn check_domain(&self, x: F) -> Result<()> {
        let ok = match *self {
            Elementary::Sqrt => x > F::zero(),
            Elementary::Log { base } => {
                if let Some(b) = base {
                    if !(b > F::zero() && b != F::one()) {
                        return Err(AdError::domain("log base", b));
                    }
                }
                x > F::zero()
            }
            // Odd multiples of pi/2 carry rounding error proportional to |x|.
            Elementary::Tan => x.cos().abs() > F::epsilon() * x.abs().max(F::one()),
            Elementary::Arcsin | Elementary::Arccos => x.abs() < F::one(),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(AdError::domain(self.name(), x))
        }
    }

    /// `f(x)`.
    pub fn evaluate(&self, x: F) -> Result<F> {
        self.value_and_derivative(x).map(|(v, _)| v)
    }

    /// `f'(x)`.
    pub fn local_derivative(&self, x: F) -> Result<F> {
        self.value_and_derivative(x).map(|(_, d)| d)
    }

    /// `(f(x), f'(x))` after the domain check.
    pub fn value_and_derivative(&self, x: F) -> Result<(F, F)> {
        self.check_domain(x)?;
        let one = F::one();
        let half = F::from(0.5).unwrap_or_else(F::nan);
        let pair = match *self {
            Elementary::Sqrt => (x.sqrt(), half * x.powf(-half)),
            Elementary::Exp => {
                let e = x.exp();
                (e, e)
            }
            Elementary::Log { base: None } => (x.ln(), one / x),
            Elementary::Log { base: Some(b) } => {
                let ln_b = b.ln();
                (x.ln() / ln_b, one / (x * ln_b))
            }
            Elementary::Sin => (x.sin(), x.cos()),
            Elementary::Cos => (x.cos(), -x.sin()),
            Elementary::Tan => {
                let c = x.cos();
                (x.tan(), one / (c * c))
            }
            Elementary::Arcsin => (x.asin(), one / (one - x * x).sqrt()),
            Elementary::Arccos => (x.acos(), -one / (one - x * x).sqrt()),
            Elementary::Arctan => (x.atan(), one / (one + x * x)),
            Elementary::Sinh => (x.sinh(), x.cosh()),
            Elementary::Cosh => (x.cosh(), x.sinh()),
            Elementary::Tanh => {
                let t = x.tanh();
                (t, one - t * t)
            }
            Elementary::Logistic {
                supremum,
                growth,
                midpoint,
            } => {
                // q is the standard sigmoid, so a zero supremum or an
                // overflowing exponential still leaves a finite derivative.
                let q = one / (one + (-growth * (x - midpoint)).exp());
                (supremum * q, growth * supremum * q * (one - q))
            }
        };
        Ok(pair)
    }
}

impl<F: Float> Display for Elementary<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
