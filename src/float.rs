use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive, ToPrimitive};

/// Marker trait for the primitive float types (`f32`, `f64`) the engines
/// are generic over.
///
/// AD value types (`Dual`, `Var`) do not implement this; they implement
/// [`Scalar`](crate::Scalar) instead.
pub trait Float:
    NumFloat
    + FloatConst
    + FromPrimitive
    + ToPrimitive
    + Copy
    + Default
    + Debug
    + Display
    + 'static
{
    /// Widen to `f64` for error reporting.
    #[inline]
    fn to_report(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }

    /// `d/da a^p` at `a = self`. Zero for `p = 0`, including at `a = 0`
    /// where `p * a^(p-1)` would be `0 * inf`.
    #[inline]
    fn power_partial(self, p: Self) -> Self {
        if p == Self::zero() {
            Self::zero()
        } else {
            p * self.powf(p - Self::one())
        }
    }
}

impl Float for f32 {}
impl Float for f64 {}
