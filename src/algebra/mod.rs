//! Symbolic algebra.
//!
//! The solver talks to algebra through the `AlgebraEngine` trait so the
//! engine can be swapped (or faked in tests). `SymbolicEngine` is the
//! built-in implementation: an expression tree with exact rational
//! arithmetic, kept canonical by construction.

mod calculus;
mod eval;
mod expr;
mod number;
mod ops;
mod parser;
mod solve;

pub use calculus::{LimitPoint, LimitValue};
pub use expr::{Constant, Expr, Func};
pub use number::Number;
pub use ops::{add, div, expand, mul, neg, pow, sub, substitute};
pub use parser::parse_limit_point;

use crate::error::{AlgebraError, AlgebraResult};

/// Contract of the symbolic algebra collaborator.
///
/// Every operation is pure and deterministic. Malformed input fails with
/// `AlgebraError::Parse`; operations outside the engine's reach fail with
/// `AlgebraError::Unsupported` rather than returning a guess.
pub trait AlgebraEngine: Send + Sync {
    /// Parses text into an expression.
    fn parse(&self, text: &str) -> AlgebraResult<Expr>;

    /// Derivative with respect to `var`.
    fn differentiate(&self, expr: &Expr, var: &str) -> AlgebraResult<Expr>;

    /// Antiderivative with respect to `var`, without the integration constant.
    fn integrate(&self, expr: &Expr, var: &str) -> AlgebraResult<Expr>;

    /// Roots of `lhs = rhs` in `var`, in the engine's native order.
    fn solve(&self, lhs: &Expr, rhs: &Expr, var: &str) -> AlgebraResult<Vec<Expr>>;

    /// Limit of `expr` as `var` approaches `point`.
    fn limit(&self, expr: &Expr, var: &str, point: &LimitPoint) -> AlgebraResult<LimitValue>;

    /// Canonical form of `expr`.
    fn simplify(&self, expr: &Expr) -> Expr;

    /// Numeric value of a closed expression.
    fn evaluate(&self, expr: &Expr) -> AlgebraResult<Number>;
}

/// Built-in `AlgebraEngine`.
///
/// # Examples
///
/// ```
/// use mathroute::algebra::{AlgebraEngine, SymbolicEngine};
///
/// let engine = SymbolicEngine::new();
/// let f = engine.parse("x**2 + 3*x").unwrap();
/// let df = engine.differentiate(&f, "x").unwrap();
/// assert_eq!(df.to_string(), "2*x + 3");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolicEngine;

impl SymbolicEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AlgebraEngine for SymbolicEngine {
    fn parse(&self, text: &str) -> AlgebraResult<Expr> {
        parser::parse_expression(text)
    }

    fn differentiate(&self, expr: &Expr, var: &str) -> AlgebraResult<Expr> {
        Ok(calculus::differentiate(expr, var))
    }

    fn integrate(&self, expr: &Expr, var: &str) -> AlgebraResult<Expr> {
        calculus::integrate(expr, var)
    }

    fn solve(&self, lhs: &Expr, rhs: &Expr, var: &str) -> AlgebraResult<Vec<Expr>> {
        solve::solve(lhs, rhs, var)
    }

    fn limit(&self, expr: &Expr, var: &str, point: &LimitPoint) -> AlgebraResult<LimitValue> {
        calculus::limit(expr, var, point)
    }

    fn simplify(&self, expr: &Expr) -> Expr {
        ops::simplify(expr)
    }

    fn evaluate(&self, expr: &Expr) -> AlgebraResult<Number> {
        let simplified = ops::simplify(expr);
        if let Expr::Num(n) = simplified {
            return Ok(n);
        }
        let symbols = simplified.free_symbols();
        if let Some(first) = symbols.iter().next() {
            return Err(AlgebraError::unsupported(format!(
                "cannot evaluate with free symbol '{first}'"
            )));
        }
        eval::eval_finite(&simplified, None).map(Number::from_f64)
    }
}
