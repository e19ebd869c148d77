use std::fmt::{self, Display};

use crate::elementary::Elementary;
use crate::error::{AdError, Result};
use crate::Float;

/// Forward-mode dual number: a value paired with its tangent (derivative).
///
/// `Dual { re, eps }` represents `re + eps·ε` where `ε² = 0`. The tangent is
/// the derivative with respect to whichever variable was seeded with
/// `eps = 1`.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dual<F: Float> {
    /// Primal (real) value.
    pub re: F,
    /// Tangent (dual) value.
    pub eps: F,
}

impl<F: Float> Display for Dual<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

impl<F: Float> Dual<F> {
    /// Create a new dual number.
    #[inline]
    pub fn new(re: F, eps: F) -> Self {
        Dual { re, eps }
    }

    /// Create a constant (zero derivative).
    #[inline]
    pub fn constant(re: F) -> Self {
        Dual { re, eps: F::zero() }
    }

    /// Create a variable (unit derivative) for differentiation.
    #[inline]
    pub fn variable(re: F) -> Self {
        Dual { re, eps: F::one() }
    }

    /// Apply the chain rule: given `f(self.re)` and `f'(self.re)`, produce the dual result.
    #[inline]
    fn chain(self, f_val: F, f_deriv: F) -> Self {
        Dual {
            re: f_val,
            eps: f_deriv * self.eps,
        }
    }

    /// Apply an elementary function, checking its domain against `re`.
    #[inline]
    pub fn apply(self, f: Elementary<F>) -> Result<Self> {
        let (val, deriv) = f.value_and_derivative(self.re)?;
        Ok(self.chain(val, deriv))
    }

    /// Quotient rule. Fails when the divisor's real part is exactly zero.
    #[inline]
    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        if rhs.re == F::zero() {
            return Err(AdError::DivisionByZero);
        }
        Ok(Dual {
            re: self.re / rhs.re,
            eps: (self.eps * rhs.re - self.re * rhs.eps) / (rhs.re * rhs.re),
        })
    }

    // ── Powers ──

    /// `self^p` for a constant exponent.
    #[inline]
    pub fn powf(self, p: F) -> Self {
        self.chain(self.re.powf(p), self.re.power_partial(p))
    }

    /// `self^exponent` with both base and exponent carrying tangents.
    ///
    /// For a non-positive base the `ln(base)` term is dropped and only the
    /// base's contribution is kept. This is an approximation: the exact
    /// derivative with respect to the exponent is undefined there.
    #[inline]
    pub fn pow(self, exponent: Self) -> Self {
        let val = self.re.powf(exponent.re);
        let d_base = self.re.power_partial(exponent.re);
        let eps = if self.re > F::zero() {
            d_base * self.eps + self.re.ln() * val * exponent.eps
        } else {
            d_base * self.eps
        };
        Dual { re: val, eps }
    }

    /// `base^self` for a constant base. Fails for a negative base.
    #[inline]
    pub fn rpow(self, base: F) -> Result<Self> {
        if base < F::zero() {
            return Err(AdError::domain("pow", base));
        }
        let val = base.powf(self.re);
        Ok(self.chain(val, base.ln() * val))
    }

    // ── Misc ──

    /// Component-wise absolute value of both parts.
    #[inline]
    pub fn abs(self) -> Self {
        Dual {
            re: self.re.abs(),
            eps: self.eps.abs(),
        }
    }
}
