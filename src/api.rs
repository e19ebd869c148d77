//! Jacobian assembly and mode selection.
//!
//! Forward mode costs one pass per variable, reverse mode one pass per
//! function. [`Mode::Auto`] picks whichever needs fewer passes.

use std::fmt::{self, Display};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::dual::Dual;
use crate::error::{AdError, Result};
use crate::expr::Expr;
use crate::float::Float;
use crate::graph::{Graph, GraphGuard, GraphThreadLocal, NodeId};
use crate::var::Var;

/// Differentiation strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// Dual numbers, one pass per variable.
    Forward,
    /// Computational graph, one pass per function.
    Reverse,
    /// Forward when `#variables <= #functions`, reverse otherwise.
    #[default]
    Auto,
}

impl Mode {
    /// Resolve [`Mode::Auto`] for a problem size; explicit modes pass through.
    pub fn resolve(self, num_variables: usize, num_functions: usize) -> Mode {
        match self {
            Mode::Auto if num_variables <= num_functions => {
                log::debug!(
                    "{} variables <= {} functions: forward mode",
                    num_variables,
                    num_functions
                );
                Mode::Forward
            }
            Mode::Auto => {
                log::debug!(
                    "{} variables > {} functions: reverse mode",
                    num_variables,
                    num_functions
                );
                Mode::Reverse
            }
            explicit => explicit,
        }
    }
}

impl FromStr for Mode {
    type Err = AdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "forward" | "f" => Ok(Mode::Forward),
            "reverse" | "r" => Ok(Mode::Reverse),
            "auto" => Ok(Mode::Auto),
            other => Err(AdError::InvalidMode(other.to_string())),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Forward => "forward",
            Mode::Reverse => "reverse",
            Mode::Auto => "auto",
        })
    }
}

/// Insertion-ordered `name -> value` map. Column `j` of a Jacobian is the
/// `j`-th inserted variable.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variables<F> {
    values: IndexMap<String, F>,
}

impl<F: Float> Variables<F> {
    pub fn new() -> Self {
        Variables {
            values: IndexMap::new(),
        }
    }

    /// Insert or overwrite a variable. Overwriting keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: F) -> Option<F> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<F> {
        self.values.get(name).copied()
    }

    /// Column index of `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.values.get_index_of(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Values in column order.
    pub fn values(&self) -> Vec<F> {
        self.values.values().copied().collect()
    }
}

impl<F: Float, S: Into<String>> FromIterator<(S, F)> for Variables<F> {
    fn from_iter<I: IntoIterator<Item = (S, F)>>(iter: I) -> Self {
        Variables {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<F: Float, S: Into<String>, const N: usize> From<[(S, F); N]> for Variables<F> {
    fn from(pairs: [(S, F); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Function values and their Jacobian.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Derivatives<F> {
    /// The mode that produced these results (never [`Mode::Auto`]).
    pub mode: Mode,
    /// `values[i] = f_i(x)`.
    pub values: Vec<F>,
    /// `jacobian[i][j] = ∂f_i/∂x_j`, functions × variables.
    pub jacobian: Vec<Vec<F>>,
}

impl<F: Float> Derivatives<F> {
    /// Gradient of function `i`.
    pub fn gradient(&self, i: usize) -> &[F] {
        &self.jacobian[i]
    }
}

/// Compute the full Jacobian of `f : R^n → R^m` using forward mode.
///
/// Runs `f` once per input, seeding that input's tangent with 1 and every
/// other tangent with 0. Returns `(f(x), J)` where `J[i][j] = ∂f_i/∂x_j`.
///
/// ```
/// let (values, jac) = adgrad::forward_jacobian(
///     |x| Ok(vec![x[0] * x[1], x[0] + x[1]]),
///     &[3.0_f64, 4.0],
/// )
/// .unwrap();
/// assert_eq!(values, vec![12.0, 7.0]);
/// assert_eq!(jac, vec![vec![4.0, 3.0], vec![1.0, 1.0]]);
/// ```
pub fn forward_jacobian<F: Float>(
    f: impl Fn(&[Dual<F>]) -> Result<Vec<Dual<F>>>,
    x: &[F],
) -> Result<(Vec<F>, Vec<Vec<F>>)> {
    let n = x.len();
    if n == 0 {
        let outputs = f(&[])?;
        let values = outputs.iter().map(|d| d.re).collect();
        return Ok((values, vec![Vec::new(); outputs.len()]));
    }

    let mut values = Vec::new();
    let mut jac: Vec<Vec<F>> = Vec::new();
    for j in 0..n {
        log::trace!("forward pass {} of {}", j + 1, n);
        let inputs: Vec<Dual<F>> = x
            .iter()
            .enumerate()
            .map(|(k, &xi)| {
                if k == j {
                    Dual::variable(xi)
                } else {
                    Dual::constant(xi)
                }
            })
            .collect();
        let outputs = f(&inputs)?;
        if j == 0 {
            values = outputs.iter().map(|d| d.re).collect();
            jac = vec![vec![F::zero(); n]; outputs.len()];
        }
        for (row, out) in jac.iter_mut().zip(outputs.iter()) {
            row[j] = out.eps;
        }
    }

    Ok((values, jac))
}

/// Compute the value and gradient of a scalar function `f : R^n → R` using
/// reverse mode on a fresh graph.
///
/// ```
/// let (value, g) = adgrad::reverse_gradient(
///     |x: &[adgrad::Var<f64>]| Ok(x[0] * x[0] + x[1] * x[1]),
///     &[3.0, 4.0],
/// )
/// .unwrap();
/// assert_eq!(value, 25.0);
/// assert_eq!(g, vec![6.0, 8.0]);
/// ```
pub fn reverse_gradient<F: GraphThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Result<Var<F>>,
    x: &[F],
) -> Result<(F, Vec<F>)> {
    let mut graph = Graph::with_capacity(x.len() * 10);

    // Create input leaves.
    let leaves: Vec<NodeId> = x.iter().map(|&val| graph.new_leaf(val)).collect();
    let inputs: Vec<Var<F>> = x
        .iter()
        .zip(&leaves)
        .map(|(&val, &idx)| Var::from_graph(val, idx))
        .collect();

    let output = {
        let _guard = GraphGuard::new(&mut graph);
        f(&inputs)?
    };
    log::trace!("reverse pass over {} nodes", graph.len());

    let grad = if output.is_constant() {
        vec![F::zero(); x.len()]
    } else {
        graph.gradient(&leaves, output.index())
    };
    Ok((output.value(), grad))
}

/// Compute the full Jacobian of `f : R^n → R^m` using reverse mode.
///
/// Each row is built on its own fresh graph: `f` runs once per output and
/// only that output is differentiated.
pub fn reverse_jacobian<F: GraphThreadLocal>(
    f: impl Fn(&[Var<F>]) -> Result<Vec<Var<F>>>,
    x: &[F],
) -> Result<(Vec<F>, Vec<Vec<F>>)> {
    let mut values = Vec::new();
    let mut jac = Vec::new();
    let mut m = 1;
    let mut i = 0;
    while i < m {
        let mut outputs_len = 0;
        let (value, row) = reverse_gradient(
            |inputs| {
                let outputs = f(inputs)?;
                outputs_len = outputs.len();
                Ok(outputs.get(i).copied().unwrap_or_else(|| Var::constant(F::zero())))
            },
            x,
        )?;
        if i == 0 {
            m = outputs_len;
            if m == 0 {
                break;
            }
        }
        values.push(value);
        jac.push(row);
        i += 1;
    }
    Ok((values, jac))
}

/// Differentiate `exprs` at the point given by `vars`.
///
/// Returns one value per expression and the `functions × variables`
/// Jacobian, with columns in variable insertion order. An expression that
/// references a name missing from `vars` fails with
/// [`AdError::UnknownVariable`]; variables an expression does not use get a
/// zero partial.
pub fn differentiate<F: GraphThreadLocal>(
    vars: &Variables<F>,
    exprs: &[Expr<F>],
    mode: Mode,
) -> Result<Derivatives<F>> {
    let x = vars.values();
    let mode = mode.resolve(vars.len(), exprs.len());
    let (values, jacobian) = match mode {
        Mode::Forward => forward_jacobian(
            |inputs| {
                exprs
                    .iter()
                    .map(|e| e.eval(|name| vars.index_of(name).map(|j| inputs[j])))
                    .collect()
            },
            &x,
        )?,
        _ => {
            let mut values = Vec::with_capacity(exprs.len());
            let mut jacobian = Vec::with_capacity(exprs.len());
            for e in exprs {
                let (value, row) = reverse_gradient(
                    |inputs| e.eval(|name| vars.index_of(name).map(|j| inputs[j])),
                    &x,
                )?;
                values.push(value);
                jacobian.push(row);
            }
            (values, jacobian)
        }
    };
    Ok(Derivatives {
        mode,
        values,
        jacobian,
    })
}

/// Builder over [`differentiate`].
///
/// ```
/// use adgrad::{Differentiator, Mode, Variables};
///
/// let vars = Variables::from([("x", 1.0_f64), ("y", 1.0)]);
/// let result = Differentiator::parse(vars, &["x**2 + y**2", "exp(x + y)"])
///     .unwrap()
///     .run()
///     .unwrap();
/// assert_eq!(result.mode, Mode::Forward);
/// assert_eq!(result.jacobian[0], vec![2.0, 2.0]);
/// ```
#[derive(Clone, Debug)]
pub struct Differentiator<F> {
    vars: Variables<F>,
    exprs: Vec<Expr<F>>,
    mode: Mode,
}

impl<F: GraphThreadLocal> Differentiator<F> {
    pub fn new(vars: Variables<F>, exprs: Vec<Expr<F>>) -> Self {
        Differentiator {
            vars,
            exprs,
            mode: Mode::Auto,
        }
    }

    /// Parse each formula with [`Expr::parse`].
    pub fn parse<S: AsRef<str>>(vars: Variables<F>, formulas: &[S]) -> Result<Self> {
        let exprs = formulas
            .iter()
            .map(|s| Expr::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Differentiator::new(vars, exprs))
    }

    /// Force a mode instead of choosing by problem size.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// The mode [`run`](Self::run) will use.
    pub fn resolved_mode(&self) -> Mode {
        self.mode.resolve(self.vars.len(), self.exprs.len())
    }

    pub fn run(&self) -> Result<Derivatives<F>> {
        differentiate(&self.vars, &self.exprs, self.mode)
    }
}
