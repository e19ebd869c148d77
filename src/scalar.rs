//! The [`Scalar`] trait for writing AD-generic numeric code.
//!
//! Functions written as `fn f<T: Scalar>(x: T) -> Result<T>` work
//! transparently with plain `f64`, `Dual<f64>` and `Var<f64>`. The
//! expression interpreter in [`crate::expr`] dispatches through this trait,
//! so the engine is chosen statically by the caller.
//!
//! Plain floats go through the same domain checks as the AD types: note that
//! `x.sqrt()` on an `f64` resolves to the inherent method, so call
//! `Scalar::sqrt(x)` to get the checked version.

use std::fmt::{Debug, Display};
use std::ops::{Add, Mul, Neg, Sub};

use crate::dual::Dual;
use crate::elementary::Elementary;
use crate::error::{AdError, Result};
use crate::float::Float;
use crate::graph::GraphThreadLocal;
use crate::var::Var;

/// The central trait for AD-generic numeric code.
pub trait Scalar:
    Copy
    + Debug
    + Display
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// The underlying primitive float type.
    type Float: Float;

    /// Lift a plain float to this scalar as a constant.
    fn from_f(val: Self::Float) -> Self;

    /// Extract the primal value.
    fn value(&self) -> Self::Float;

    /// Division that fails on a zero-valued divisor.
    fn checked_div(self, rhs: Self) -> Result<Self>;

    /// `self^p` for a constant exponent.
    fn powf(self, p: Self::Float) -> Self;

    /// `self^exponent` with a differentiable exponent.
    fn pow(self, exponent: Self) -> Self;

    /// `base^self` for a constant base.
    fn rpow(self, base: Self::Float) -> Result<Self>;

    /// Apply an elementary function.
    fn apply(self, f: Elementary<Self::Float>) -> Result<Self>;

    fn sqrt(self) -> Result<Self> {
        self.apply(Elementary::Sqrt)
    }

    fn exp(self) -> Result<Self> {
        self.apply(Elementary::Exp)
    }

    /// Natural logarithm.
    fn ln(self) -> Result<Self> {
        self.apply(Elementary::ln())
    }

    fn log(self, base: Self::Float) -> Result<Self> {
        self.apply(Elementary::log(base))
    }

    fn sin(self) -> Result<Self> {
        self.apply(Elementary::Sin)
    }

    fn cos(self) -> Result<Self> {
        self.apply(Elementary::Cos)
    }

    fn tan(self) -> Result<Self> {
        self.apply(Elementary::Tan)
    }

    fn arcsin(self) -> Result<Self> {
        self.apply(Elementary::Arcsin)
    }

    fn arccos(self) -> Result<Self> {
        self.apply(Elementary::Arccos)
    }

    fn arctan(self) -> Result<Self> {
        self.apply(Elementary::Arctan)
    }

    fn sinh(self) -> Result<Self> {
        self.apply(Elementary::Sinh)
    }

    fn cosh(self) -> Result<Self> {
        self.apply(Elementary::Cosh)
    }

    fn tanh(self) -> Result<Self> {
        self.apply(Elementary::Tanh)
    }

    /// `L / (1 + exp(-k (x - x0)))`.
    fn logistic(
        self,
        supremum: Self::Float,
        growth: Self::Float,
        midpoint: Self::Float,
    ) -> Result<Self> {
        self.apply(Elementary::Logistic {
            supremum,
            growth,
            midpoint,
        })
    }
}

macro_rules! impl_scalar_float {
    ($f:ty) => {
        impl Scalar for $f {
            type Float = $f;

            #[inline]
            fn from_f(val: $f) -> Self {
                val
            }

            #[inline]
            fn value(&self) -> $f {
                *self
            }

            #[inline]
            fn checked_div(self, rhs: Self) -> Result<Self> {
                if rhs == 0.0 {
                    return Err(AdError::DivisionByZero);
                }
                Ok(self / rhs)
            }

            #[inline]
            fn powf(self, p: $f) -> Self {
                <$f>::powf(self, p)
            }

            #[inline]
            fn pow(self, exponent: Self) -> Self {
                <$f>::powf(self, exponent)
            }

            #[inline]
            fn rpow(self, base: $f) -> Result<Self> {
                if base < 0.0 {
                    return Err(AdError::domain("pow", base));
                }
                Ok(<$f>::powf(base, self))
            }

            #[inline]
            fn apply(self, f: Elementary<$f>) -> Result<Self> {
                f.evaluate(self)
            }
        }
    };
}

impl_scalar_float!(f32);
impl_scalar_float!(f64);

impl<F: Float> Scalar for Dual<F> {
    type Float = F;

    #[inline]
    fn from_f(val: F) -> Self {
        Dual::constant(val)
    }

    #[inline]
    fn value(&self) -> F {
        self.re
    }

    #[inline]
    fn checked_div(self, rhs: Self) -> Result<Self> {
        Dual::checked_div(self, rhs)
    }

    #[inline]
    fn powf(self, p: F) -> Self {
        Dual::powf(self, p)
    }

    #[inline]
    fn pow(self, exponent: Self) -> Self {
        Dual::pow(self, exponent)
    }

    #[inline]
    fn rpow(self, base: F) -> Result<Self> {
        Dual::rpow(self, base)
    }

    #[inline]
    fn apply(self, f: Elementary<F>) -> Result<Self> {
        Dual::apply(self, f)
    }
}

impl<F: GraphThreadLocal> Scalar for Var<F> {
    type Float = F;

    #[inline]
    fn from_f(val: F) -> Self {
        Var::constant(val)
    }

    #[inline]
    fn value(&self) -> F {
        self.value
    }

    #[inline]
    fn checked_div(self, rhs: Self) -> Result<Self> {
        Var::checked_div(self, rhs)
    }

    #[inline]
    fn powf(self, p: F) -> Self {
        Var::powf(self, p)
    }

    #[inline]
    fn pow(self, exponent: Self) -> Self {
        Var::pow(self, exponent)
    }

    #[inline]
    fn rpow(self, base: F) -> Result<Self> {
        Var::rpow(self, base)
    }

    #[inline]
    fn apply(self, f: Elementary<F>) -> Result<Self> {
        Var::apply(self, f)
    }
}
