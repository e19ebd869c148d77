use std::fmt::{self, Display};

use crate::elementary::Elementary;
use crate::error::{AdError, Result};
use crate::graph::{self, GraphThreadLocal, NodeId, CONSTANT};
use crate::Float;

/// Reverse-mode AD variable.
///
/// Just a value and a graph index. `Copy` because the graph lives in a
/// thread-local, not inside this struct.
#[derive(Clone, Copy, Debug)]
pub struct Var<F: Float> {
    pub(crate) value: F,
    pub(crate) index: NodeId,
}

impl<F: Float> Var<F> {
    /// Create a constant (not tracked on the graph).
    #[inline]
    pub fn constant(value: F) -> Self {
        Var {
            value,
            index: CONSTANT,
        }
    }

    /// Wrap a node that was already recorded on a graph.
    #[inline]
    pub fn from_graph(value: F, index: NodeId) -> Self {
        Var { value, index }
    }

    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    /// Get the graph index (for advanced usage / testing).
    #[inline]
    pub fn index(&self) -> NodeId {
        self.index
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        self.index == CONSTANT
    }
}

impl<F: GraphThreadLocal> Var<F> {
    /// Record a new leaf on the active graph.
    #[inline]
    pub fn variable(value: F) -> Self {
        let index = graph::with_active_graph(|g| g.new_leaf(value));
        Var { value, index }
    }

    /// Record a unary result; constants stay off the graph.
    #[inline]
    pub(crate) fn unary(self, value: F, partial: F) -> Self {
        if self.is_constant() {
            return Var::constant(value);
        }
        let index = graph::with_active_graph(|g| g.push_unary(value, self.index, partial));
        Var { value, index }
    }

    /// Record a binary result with the partial for each operand.
    #[inline]
    pub(crate) fn binary(self, rhs: Self, value: F, lhs_partial: F, rhs_partial: F) -> Self {
        match (self.is_constant(), rhs.is_constant()) {
            (true, true) => Var::constant(value),
            (false, true) => self.unary(value, lhs_partial),
            (true, false) => rhs.unary(value, rhs_partial),
            (false, false) => {
                let index = graph::with_active_graph(|g| {
                    g.push_binary(value, self.index, lhs_partial, rhs.index, rhs_partial)
                });
                Var { value, index }
            }
        }
    }

    /// Apply an elementary function, checking its domain against the value.
    #[inline]
    pub fn apply(self, f: Elementary<F>) -> Result<Self> {
        let (val, deriv) = f.value_and_derivative(self.value)?;
        Ok(self.unary(val, deriv))
    }

    /// Division. Fails when the divisor's value is exactly zero.
    #[inline]
    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        if rhs.value == F::zero() {
            return Err(AdError::DivisionByZero);
        }
        let value = self.value / rhs.value;
        Ok(self.binary(
            rhs,
            value,
            F::one() / rhs.value,
            -self.value / (rhs.value * rhs.value),
        ))
    }

    /// `self^p` for a constant exponent.
    #[inline]
    pub fn powf(self, p: F) -> Self {
        self.unary(self.value.powf(p), self.value.power_partial(p))
    }

    /// `self^exponent`. As with [`Dual::pow`](crate::Dual::pow), a
    /// non-positive base records no edge for the exponent.
    #[inline]
    pub fn pow(self, exponent: Self) -> Self {
        let value = self.value.powf(exponent.value);
        let d_base = self.value.power_partial(exponent.value);
        if self.value > F::zero() {
            self.binary(exponent, value, d_base, self.value.ln() * value)
        } else {
            self.unary(value, d_base)
        }
    }

    /// `base^self` for a constant base. Fails for a negative base.
    #[inline]
    pub fn rpow(self, base: F) -> Result<Self> {
        if base < F::zero() {
            return Err(AdError::domain("pow", base));
        }
        let value = base.powf(self.value);
        Ok(self.unary(value, base.ln() * value))
    }
}

impl<F: Float> Display for Var<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<F: Float> Default for Var<F> {
    fn default() -> Self {
        Var::constant(F::zero())
    }
}
