use std::f64::consts::PI;

use adgrad::graph::{Graph, GraphGuard};
use adgrad::{AdError, Scalar, Var, Var64};
use approx::assert_relative_eq;
use num_traits::FromPrimitive;

/// Run a single-variable reverse-mode differentiation.
fn reverse_grad(f: impl FnOnce(Var64) -> adgrad::Result<Var64>, x_val: f64) -> f64 {
    let mut graph = Graph::<f64>::new();
    let leaf = graph.new_leaf(x_val);
    let x = Var::from_graph(x_val, leaf);
    let y = {
        let _guard = GraphGuard::new(&mut graph);
        f(x).unwrap()
    };
    graph.adjoint(leaf, y.index())
}

/// Central finite difference for comparison.
fn finite_diff(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-7;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

fn check_reverse_elemental(
    f_rev: impl FnOnce(Var64) -> adgrad::Result<Var64>,
    f_f64: impl Fn(f64) -> f64,
    x: f64,
    tol: f64,
) {
    let grad = reverse_grad(f_rev, x);
    let expected = finite_diff(&f_f64, x);
    assert_relative_eq!(grad, expected, max_relative = tol);
}

// ── Arithmetic ──

#[test]
fn x_squared() {
    let grad = reverse_grad(|x| Ok(x * x), 3.0);
    assert_relative_eq!(grad, 6.0, max_relative = 1e-12);
}

#[test]
fn x_times_y() {
    let mut graph = Graph::<f64>::new();
    let xi = graph.new_leaf(3.0);
    let yi = graph.new_leaf(4.0);
    let x = Var::from_graph(3.0, xi);
    let y = Var::from_graph(4.0, yi);
    let z = {
        let _guard = GraphGuard::new(&mut graph);
        x * y
    };
    assert_eq!(z.value(), 12.0);
    assert_relative_eq!(graph.adjoint(xi, z.index()), 4.0, max_relative = 1e-12); // dz/dx = y
    assert_relative_eq!(graph.adjoint(yi, z.index()), 3.0, max_relative = 1e-12); // dz/dy = x
}

#[test]
fn quotient() {
    // d/dx (1 / x) = -1/x²
    let grad = reverse_grad(|x| 1.0 / x, 2.0);
    assert_relative_eq!(grad, -0.25, max_relative = 1e-12);
    let grad = reverse_grad(|x| x / (x + 1.0), 2.0);
    assert_relative_eq!(grad, 1.0 / 9.0, max_relative = 1e-12);
}

#[test]
fn subtraction_and_negation() {
    let grad = reverse_grad(|x| Ok(5.0 - x), 1.0);
    assert_relative_eq!(grad, -1.0);
    let grad = reverse_grad(|x| Ok(-(-x)), 1.0);
    assert_relative_eq!(grad, 1.0);
}

#[test]
fn division_by_zero() {
    let mut graph = Graph::<f64>::new();
    let _guard = GraphGuard::new(&mut graph);
    let x = Var64::variable(2.0);
    let zero = Var64::variable(0.0);
    assert_eq!((x / zero).unwrap_err(), AdError::DivisionByZero);
    assert_eq!((x / 0.0).unwrap_err(), AdError::DivisionByZero);
    assert_eq!((1.0 / zero).unwrap_err(), AdError::DivisionByZero);
}

#[test]
fn diamond_pattern() {
    // z = f(x) + g(x), both paths use x.
    // f(x) = x², g(x) = x³
    // dz/dx = 2x + 3x²
    let grad = reverse_grad(|x| Ok(x * x + x * x * x), 2.0);
    assert_relative_eq!(grad, 4.0 + 12.0, max_relative = 1e-12);
}

#[test]
fn fan_out() {
    // y = x + x + x = 3x
    let grad = reverse_grad(|x| Ok(x + x + x), 5.0);
    assert_relative_eq!(grad, 3.0, max_relative = 1e-12);
}

#[test]
fn wide_fan_out() {
    // y = sin(x) + sin(x) + ... with 40k terms, all reading the same leaf.
    let terms = 40_000;
    let grad = reverse_grad(
        |x| {
            let mut y = x.sin()?;
            for _ in 1..terms {
                y = y + x.sin()?;
            }
            Ok(y)
        },
        0.5,
    );
    assert_relative_eq!(grad, terms as f64 * 0.5_f64.cos(), max_relative = 1e-9);
}

#[test]
fn chain_depth() {
    // y = ((x²)²)² = x^8, dy/dx = 8*x^7
    let grad = reverse_grad(
        |x| {
            let a = x * x;
            let b = a * a;
            Ok(b * b)
        },
        2.0,
    );
    assert_relative_eq!(grad, 8.0 * 2.0_f64.powi(7), max_relative = 1e-10);
}

// ── Powers ──

#[test]
fn powf() {
    check_reverse_elemental(|x| Ok(x.powf(2.5)), |x| x.powf(2.5), 1.7, 1e-6);
}

#[test]
fn zero_exponent_at_zero_base() {
    assert_eq!(reverse_grad(|x| Ok(x.powf(0.0)), 0.0), 0.0);
    assert_eq!(reverse_grad(|x| Ok(x.pow(Var::constant(0.0))), 0.0), 0.0);
}

#[test]
fn pow_x_to_the_x() {
    let x_val = 1.5_f64;
    let grad = reverse_grad(|x| Ok(x.pow(x)), x_val);
    assert_relative_eq!(
        grad,
        x_val.powf(x_val) * (x_val.ln() + 1.0),
        max_relative = 1e-12
    );
}

#[test]
fn pow_non_positive_base_drops_exponent_edge() {
    let mut graph = Graph::<f64>::new();
    let bi = graph.new_leaf(-3.0);
    let ei = graph.new_leaf(2.0);
    let base = Var::from_graph(-3.0, bi);
    let exponent = Var::from_graph(2.0, ei);
    let y = {
        let _guard = GraphGuard::new(&mut graph);
        base.pow(exponent)
    };
    assert_eq!(y.value(), 9.0);
    assert_eq!(graph.adjoint(bi, y.index()), -6.0);
    assert_eq!(graph.adjoint(ei, y.index()), 0.0);
}

#[test]
fn rpow() {
    let grad = reverse_grad(|x| x.rpow(2.0), 1.5);
    assert_relative_eq!(grad, 2.0_f64.ln() * 2.0_f64.powf(1.5), max_relative = 1e-12);
}

// ── Elementals ──

#[test]
fn sqrt() { check_reverse_elemental(|x| x.sqrt(), f64::sqrt, 4.0, 1e-6); }

#[test]
fn exp() { check_reverse_elemental(|x| x.exp(), f64::exp, 1.0, 1e-6); }

#[test]
fn ln() { check_reverse_elemental(|x| x.ln(), f64::ln, 2.0, 1e-6); }

#[test]
fn log_base_2() { check_reverse_elemental(|x| x.log(2.0), f64::log2, 3.0, 1e-6); }

#[test]
fn sin() { check_reverse_elemental(|x| x.sin(), f64::sin, 1.0, 1e-6); }

#[test]
fn cos() { check_reverse_elemental(|x| x.cos(), f64::cos, 1.0, 1e-6); }

#[test]
fn tan() { check_reverse_elemental(|x| x.tan(), f64::tan, 0.5, 1e-6); }

#[test]
fn arcsin() { check_reverse_elemental(|x| x.arcsin(), f64::asin, 0.5, 1e-6); }

#[test]
fn arccos() { check_reverse_elemental(|x| x.arccos(), f64::acos, 0.5, 1e-6); }

#[test]
fn arctan() { check_reverse_elemental(|x| x.arctan(), f64::atan, 1.0, 1e-6); }

#[test]
fn sinh() { check_reverse_elemental(|x| x.sinh(), f64::sinh, 1.0, 1e-6); }

#[test]
fn cosh() { check_reverse_elemental(|x| x.cosh(), f64::cosh, 1.0, 1e-6); }

#[test]
fn tanh() { check_reverse_elemental(|x| x.tanh(), f64::tanh, 1.0, 1e-6); }

#[test]
fn logistic() {
    let sigma = |x: f64| 1.0 / (1.0 + (-x).exp());
    check_reverse_elemental(|x| x.logistic(1.0, 1.0, 0.0), sigma, 0.3, 1e-6);
}

// ── Compositions ──

#[test]
fn sin_of_exp() {
    let x_val = 0.5_f64;
    let grad = reverse_grad(|x| x.exp()?.sin(), x_val);
    let expected = x_val.exp().cos() * x_val.exp();
    assert_relative_eq!(grad, expected, max_relative = 1e-10);
}

#[test]
fn complex_composition() {
    // f(x) = x * sin(x) + cos(x²)
    let x_val = 1.5_f64;
    let grad = reverse_grad(|x| Ok(x * x.sin()? + (x * x).cos()?), x_val);
    let expected = x_val.sin() + x_val * x_val.cos() - 2.0 * x_val * (x_val * x_val).sin();
    assert_relative_eq!(grad, expected, max_relative = 1e-10);
}

// ── Domain errors ──

#[test]
fn domain_errors_carry_function_and_value() {
    let mut graph = Graph::<f64>::new();
    let _guard = GraphGuard::new(&mut graph);
    let err = Var64::variable(-1.0).ln().unwrap_err();
    assert_eq!(
        err,
        AdError::Domain {
            function: "log",
            value: -1.0
        }
    );
    assert!(Var64::variable(0.0).sqrt().is_err());
    assert!(Var64::variable(1.5).arcsin().is_err());
    assert!(Var64::variable(-1.0).arccos().is_err());
    assert!(Var64::variable(PI / 2.0).tan().is_err());
    assert!(Var64::variable(2.0).log(1.0).is_err());
    assert!(Var64::variable(-2.0).rpow(-1.0).is_err());
}

// ── Constants ──

#[test]
fn constant_addition() {
    // f(x) = x + 5.0
    let grad = reverse_grad(|x| Ok(x + Var64::constant(5.0)), 3.0);
    assert_relative_eq!(grad, 1.0, max_relative = 1e-12);
}

#[test]
fn scalar_multiplication() {
    // f(x) = 3.0 * x
    let grad = reverse_grad(|x| Ok(3.0 * x), 2.0);
    assert_relative_eq!(grad, 3.0, max_relative = 1e-12);
}

#[test]
fn constants_stay_off_the_graph() {
    let mut graph = Graph::<f64>::new();
    let y = {
        let _guard = GraphGuard::new(&mut graph);
        let a = Var64::constant(2.0);
        let b = Var64::constant(3.0);
        (a * b + a.exp().unwrap()).sin().unwrap()
    };
    assert!(y.is_constant());
    assert!(graph.is_empty());
}

#[test]
fn constant_output_has_zero_gradient() {
    let grad = reverse_grad(|_| Ok(Var64::constant(7.0)), 1.0);
    assert_eq!(grad, 0.0);
}

// ── Adjoints with a designated terminal ──

#[test]
fn unused_leaf_has_zero_adjoint() {
    let mut graph = Graph::<f64>::new();
    let xi = graph.new_leaf(1.0);
    let yi = graph.new_leaf(2.0);
    let x = Var::from_graph(1.0, xi);
    let z = {
        let _guard = GraphGuard::new(&mut graph);
        x.exp().unwrap()
    };
    assert_relative_eq!(graph.adjoint(xi, z.index()), 1.0_f64.exp());
    assert_eq!(graph.adjoint(yi, z.index()), 0.0);
}

#[test]
fn terminal_adjoint_is_one() {
    let mut graph = Graph::<f64>::new();
    let xi = graph.new_leaf(1.0);
    let x = Var::from_graph(1.0, xi);
    let z: Var64 = {
        let _guard = GraphGuard::new(&mut graph);
        x.sin().unwrap() * 4.0
    };
    assert_eq!(graph.adjoint(z.index(), z.index()), 1.0);
}

#[test]
fn intermediate_terminal_ignores_later_nodes() {
    let mut graph = Graph::<f64>::new();
    let xi = graph.new_leaf(2.0);
    let x = Var::from_graph(2.0, xi);
    let (mid, out) = {
        let _guard = GraphGuard::new(&mut graph);
        let mid = x * x;
        let out = mid * x;
        (mid, out)
    };
    // Same graph, two terminals: d(x²)/dx then d(x³)/dx.
    assert_relative_eq!(graph.adjoint(xi, mid.index()), 4.0);
    assert_relative_eq!(graph.adjoint(xi, out.index()), 12.0);
    assert_relative_eq!(graph.adjoint(xi, mid.index()), 4.0);
}

#[test]
fn gradient_collects_leaves_in_order() {
    let mut graph = Graph::<f64>::new();
    let leaves: Vec<_> = [1.0, 2.0, 3.0]
        .iter()
        .map(|&v| graph.new_leaf(v))
        .collect();
    let vars: Vec<Var64> = [1.0, 2.0, 3.0]
        .iter()
        .zip(&leaves)
        .map(|(&v, &i)| Var::from_graph(v, i))
        .collect();
    let f = {
        let _guard = GraphGuard::new(&mut graph);
        vars[0] * vars[1] + vars[2] * vars[2]
    };
    assert_eq!(graph.gradient(&leaves, f.index()), vec![2.0, 1.0, 6.0]);
}

// ── Scalar-generic code ──

fn poly<T: Scalar>(x: T) -> adgrad::Result<T> {
    // 3x² - 2x + 1
    let c = |v: f64| T::from_f(<T::Float as FromPrimitive>::from_f64(v).unwrap());
    let (three, two, one) = (c(3.0), c(2.0), c(1.0));
    Ok(three * x * x - two * x + one)
}

#[test]
fn generic_code_runs_on_both_engines() {
    let d = poly(adgrad::Dual::variable(2.0_f64)).unwrap();
    let r = reverse_grad(poly, 2.0);
    assert_eq!(d.re, 9.0);
    assert_relative_eq!(d.eps, 10.0);
    assert_relative_eq!(r, 10.0);
}

#[test]
fn zero_and_one_are_constants() {
    use num_traits::{One, Zero};
    assert!(Var64::zero().is_constant());
    assert_eq!(Var64::one().value(), 1.0);
}
