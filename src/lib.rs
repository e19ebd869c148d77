//! Forward- and reverse-mode automatic differentiation.
//!
//! * [`Dual`] propagates a value/tangent pair through every operation
//!   (forward mode).
//! * [`Var`] records each operation on a [`Graph`](graph::Graph) whose edges
//!   carry local partials; adjoints come from a memoized backward pass
//!   (reverse mode).
//! * [`differentiate`] seeds either engine over a set of [`Expr`]s and
//!   assembles values and a Jacobian, choosing the mode by problem size
//!   unless told otherwise.
//!
//! ```
//! use adgrad::{differentiate, Expr, Mode, Variables};
//!
//! let vars = Variables::from([("x", 1.0_f64), ("y", 2.0), ("z", 3.0)]);
//! let f = Expr::parse("tan(x) + exp(y) + sqrt(z)")?;
//! let out = differentiate(&vars, &[f], Mode::Auto)?;
//! assert_eq!(out.mode, Mode::Reverse);
//! assert!((out.values[0] - 10.6785146).abs() < 1e-6);
//! # Ok::<(), adgrad::AdError>(())
//! ```

pub mod api;
pub mod dual;
pub mod elementary;
pub mod error;
pub mod expr;
pub mod float;
pub mod graph;
pub mod scalar;
pub mod var;
mod traits;

pub use api::{
    differentiate, forward_jacobian, reverse_gradient, reverse_jacobian, Derivatives,
    Differentiator, Mode, Variables,
};
pub use dual::Dual;
pub use elementary::Elementary;
pub use error::{AdError, Result};
pub use expr::{BinaryOp, Expr};
pub use float::Float;
pub use scalar::Scalar;
pub use var::Var;

/// Type alias for forward-mode dual numbers over `f64`.
pub type Dual64 = Dual<f64>;
/// Type alias for forward-mode dual numbers over `f32`.
pub type Dual32 = Dual<f32>;
/// Type alias for reverse-mode variables over `f64`.
pub type Var64 = Var<f64>;
/// Type alias for reverse-mode variables over `f32`.
pub type Var32 = Var<f32>;
