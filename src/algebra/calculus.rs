//! Differentiation, integration and limits.

use std::fmt;

use super::eval::{eval_f64, has_zero_division};
use super::expr::{Constant, Expr, Func};
use super::number::Number;
use super::ops::{add, div, expand, func, mul, neg, numer_denom, pow, sub, substitute};
use super::solve::{linear_coefficients, poly_coeffs};
use crate::error::{AlgebraError, AlgebraResult};

/// Deepest chain of L'Hôpital steps tried before giving up.
const MAX_LHOPITAL_DEPTH: usize = 8;

/// Values closer to zero than this are zero for limit decisions.
const ZERO_TOLERANCE: f64 = 1e-12;

/// Where a limit is taken.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitPoint {
    /// A finite expression.
    Finite(Expr),
    /// `+oo`.
    PosInfinity,
    /// `-oo`.
    NegInfinity,
}

impl fmt::Display for LimitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(e) => write!(f, "{e}"),
            Self::PosInfinity => write!(f, "oo"),
            Self::NegInfinity => write!(f, "-oo"),
        }
    }
}

/// The value of a limit.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitValue {
    /// The limit exists and is finite.
    Finite(Expr),
    /// Diverges to `+oo`.
    PosInfinity,
    /// Diverges to `-oo`.
    NegInfinity,
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(e) => write!(f, "{e}"),
            Self::PosInfinity => write!(f, "oo"),
            Self::NegInfinity => write!(f, "-oo"),
        }
    }
}

/// Symbolic derivative of `e` with respect to `var`.
#[must_use]
pub fn differentiate(e: &Expr, var: &str) -> Expr {
    if !e.contains_symbol(var) {
        return Expr::int(0);
    }
    match e {
        Expr::Num(_) | Expr::Const(_) => Expr::int(0),
        Expr::Sym(_) => Expr::int(1),
        Expr::Add(terms) => add(terms.iter().map(|t| differentiate(t, var)).collect()),
        Expr::Mul(factors) => add(
            (0..factors.len())
                .map(|i| {
                    let mut parts = factors.clone();
                    parts[i] = differentiate(&factors[i], var);
                    mul(parts)
                })
                .collect(),
        ),
        Expr::Pow(b, x) => {
            let base = (**b).clone();
            let exp = (**x).clone();
            let db = differentiate(b, var);
            if exp.contains_symbol(var) {
                let dx = differentiate(x, var);
                mul(vec![
                    e.clone(),
                    add(vec![
                        mul(vec![dx, func(Func::Log, base.clone())]),
                        mul(vec![exp, db, pow(base, Expr::int(-1))]),
                    ]),
                ])
            } else {
                let lowered = sub(exp.clone(), Expr::int(1));
                mul(vec![exp, pow(base, lowered), db])
            }
        }
        Expr::Func(f, a) => mul(vec![outer_derivative(*f, a), differentiate(a, var)]),
    }
}

fn outer_derivative(f: Func, a: &Expr) -> Expr {
    let u = a.clone();
    let half = Expr::rational(1, 2);
    match f {
        Func::Sin => func(Func::Cos, u),
        Func::Cos => neg(func(Func::Sin, u)),
        Func::Tan => add(vec![pow(func(Func::Tan, u), Expr::int(2)), Expr::int(1)]),
        Func::Asin => pow(sub(Expr::int(1), pow(u, Expr::int(2))), neg(half)),
        Func::Acos => neg(pow(sub(Expr::int(1), pow(u, Expr::int(2))), neg(half))),
        Func::Atan => pow(add(vec![pow(u, Expr::int(2)), Expr::int(1)]), Expr::int(-1)),
        Func::Sinh => func(Func::Cosh, u),
        Func::Cosh => func(Func::Sinh, u),
        Func::Tanh => sub(Expr::int(1), pow(func(Func::Tanh, u), Expr::int(2))),
        Func::Log => pow(u, Expr::int(-1)),
        Func::Exp => func(Func::Exp, u),
        Func::Abs => div(u.clone(), func(Func::Abs, u)),
    }
}

/// Indefinite integral of `e` with respect to `var`, without the constant.
pub fn integrate(e: &Expr, var: &str) -> AlgebraResult<Expr> {
    if !e.contains_symbol(var) {
        return Ok(mul(vec![e.clone(), Expr::sym(var)]));
    }
    match e {
        Expr::Add(terms) => {
            let mut parts = Vec::with_capacity(terms.len());
            for term in terms {
                parts.push(integrate(term, var)?);
            }
            Ok(add(parts))
        }
        Expr::Mul(factors) => {
            let (constant, dependent): (Vec<Expr>, Vec<Expr>) =
                factors.iter().cloned().partition(|f| !f.contains_symbol(var));
            if dependent.len() == 1 {
                let inner = integrate_factor(&dependent[0], var)?;
                return Ok(mul(constant.into_iter().chain([inner]).collect()));
            }
            let expanded = expand(e);
            if expanded != *e && matches!(expanded, Expr::Add(_)) {
                return integrate(&expanded, var);
            }
            Err(unsupported_integral(e))
        }
        _ => integrate_factor(e, var),
    }
}

fn unsupported_integral(e: &Expr) -> AlgebraError {
    AlgebraError::unsupported(format!("no antiderivative rule for {e}"))
}

fn integrate_factor(f: &Expr, var: &str) -> AlgebraResult<Expr> {
    match f {
        Expr::Sym(_) => Ok(mul(vec![
            Expr::rational(1, 2),
            pow(f.clone(), Expr::int(2)),
        ])),
        Expr::Pow(b, x) if !x.contains_symbol(var) => {
            let base = (**b).clone();
            let exp = (**x).clone();
            if let Some((a, _)) = linear_coefficients(&base, var) {
                if exp == Expr::int(-1) {
                    return Ok(div(func(Func::Log, base), a));
                }
                let raised = add(vec![exp, Expr::int(1)]);
                return Ok(div(pow(base, raised.clone()), mul(vec![raised, a])));
            }
            let expanded = expand(f);
            if expanded != *f && matches!(expanded, Expr::Add(_)) {
                return integrate(&expanded, var);
            }
            Err(unsupported_integral(f))
        }
        Expr::Pow(b, x) if !b.contains_symbol(var) => {
            let (a, _) = linear_coefficients(x, var).ok_or_else(|| unsupported_integral(f))?;
            Ok(div(f.clone(), mul(vec![a, func(Func::Log, (**b).clone())])))
        }
        Expr::Func(kind, arg) => {
            let u = (**arg).clone();
            let (a, _) = linear_coefficients(&u, var).ok_or_else(|| unsupported_integral(f))?;
            let antiderivative = match kind {
                Func::Exp => f.clone(),
                Func::Sin => neg(func(Func::Cos, u)),
                Func::Cos => func(Func::Sin, u),
                Func::Tan => neg(func(Func::Log, func(Func::Cos, u))),
                Func::Log => sub(mul(vec![u.clone(), func(Func::Log, u.clone())]), u),
                Func::Sinh => func(Func::Cosh, u),
                Func::Cosh => func(Func::Sinh, u),
                _ => return Err(unsupported_integral(f)),
            };
            Ok(div(antiderivative, a))
        }
        _ => Err(unsupported_integral(f)),
    }
}

/// Limit of `e` as `var` approaches `point`.
pub fn limit(e: &Expr, var: &str, point: &LimitPoint) -> AlgebraResult<LimitValue> {
    match point {
        LimitPoint::Finite(p) => limit_finite(e, var, p, 0),
        LimitPoint::PosInfinity => limit_infinite(e, var, 1.0),
        LimitPoint::NegInfinity => limit_infinite(e, var, -1.0),
    }
}

fn point_value(p: &Expr) -> AlgebraResult<f64> {
    let value = eval_f64(p, None)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AlgebraError::NotFinite)
    }
}

fn limit_finite(e: &Expr, var: &str, p: &Expr, depth: usize) -> AlgebraResult<LimitValue> {
    if depth > MAX_LHOPITAL_DEPTH {
        return Err(AlgebraError::unsupported("limit did not resolve"));
    }
    let (numer, denom) = numer_denom(e);
    let denominator_vanishes = if denom.contains_symbol(var) {
        let at = point_value(p)?;
        eval_f64(&denom, Some((var, at)))?.abs() < ZERO_TOLERANCE
    } else {
        false
    };

    if !denominator_vanishes {
        let value = substitute(e, var, p);
        return match eval_f64(&value, None) {
            Ok(v) if v.is_finite() => Ok(LimitValue::Finite(value)),
            Ok(_) => one_sided(e, var, point_value(p)?),
            Err(_) if !has_zero_division(&value) && !value.contains_symbol(var) => {
                Ok(LimitValue::Finite(value))
            }
            Err(err) => Err(err),
        };
    }

    let at = point_value(p)?;
    let numerator_at = eval_f64(&numer, Some((var, at)))?;
    if numerator_at.abs() < ZERO_TOLERANCE {
        tracing::trace!(depth, "0/0, applying L'Hôpital");
        let next = div(differentiate(&numer, var), differentiate(&denom, var));
        return limit_finite(&next, var, p, depth + 1);
    }
    one_sided(e, var, at)
}

/// Decides `c/0` forms by evaluating just left and right of the point.
fn one_sided(e: &Expr, var: &str, at: f64) -> AlgebraResult<LimitValue> {
    let mut signs = Vec::new();
    for h in [1e-6, 1e-8] {
        for side in [at - h, at + h] {
            let v = eval_f64(e, Some((var, side)))?;
            if v.is_nan() || v.abs() < 1e5 {
                return Err(AlgebraError::NoSolution(
                    "the limit is not finite and not a signed infinity".to_string(),
                ));
            }
            signs.push(v > 0.0);
        }
    }
    if signs.iter().all(|s| *s) {
        Ok(LimitValue::PosInfinity)
    } else if signs.iter().all(|s| !*s) {
        Ok(LimitValue::NegInfinity)
    } else {
        Err(AlgebraError::NoSolution(
            "one-sided limits differ".to_string(),
        ))
    }
}

fn leading(coeffs: &[Expr]) -> AlgebraResult<(usize, Expr, f64)> {
    let degree = coeffs.len().saturating_sub(1);
    let lead = coeffs
        .last()
        .cloned()
        .ok_or_else(|| AlgebraError::unsupported("empty polynomial"))?;
    let value = eval_f64(&lead, None)?;
    Ok((degree, lead, value))
}

fn limit_infinite(e: &Expr, var: &str, sign: f64) -> AlgebraResult<LimitValue> {
    let (numer, denom) = numer_denom(e);
    if let (Some(nc), Some(dc)) = (poly_coeffs(&numer, var), poly_coeffs(&denom, var)) {
        let (dn, ln, lnv) = leading(&nc)?;
        let (dd, ld, ldv) = leading(&dc)?;
        if ldv == 0.0 {
            return Err(AlgebraError::DivisionByZero);
        }
        return Ok(match dn.cmp(&dd) {
            std::cmp::Ordering::Less => LimitValue::Finite(Expr::int(0)),
            std::cmp::Ordering::Equal => LimitValue::Finite(div(ln, ld)),
            std::cmp::Ordering::Greater => {
                let parity = if (dn - dd) % 2 == 1 { sign } else { 1.0 };
                if lnv / ldv * parity > 0.0 {
                    LimitValue::PosInfinity
                } else {
                    LimitValue::NegInfinity
                }
            }
        });
    }
    probe_infinity(e, var, sign)
}

/// Numeric fallback for non-rational expressions at infinity. Accepts only
/// clear convergence or clear monotone growth.
fn probe_infinity(e: &Expr, var: &str, sign: f64) -> AlgebraResult<LimitValue> {
    let mut values = Vec::with_capacity(4);
    for magnitude in [1e5, 1e6, 1e7, 1e8] {
        let v = eval_f64(e, Some((var, sign * magnitude)))?;
        if v.is_nan() {
            return Err(AlgebraError::NotFinite);
        }
        values.push(v);
    }
    if values.iter().all(|v| *v == f64::INFINITY) {
        return Ok(LimitValue::PosInfinity);
    }
    if values.iter().all(|v| *v == f64::NEG_INFINITY) {
        return Ok(LimitValue::NegInfinity);
    }
    if values.iter().any(|v| v.is_infinite()) {
        return Err(AlgebraError::NotFinite);
    }

    let (v2, v3) = (values[2], values[3]);
    if (v3 - v2).abs() <= 1e-6 * v3.abs().max(1.0) {
        return Ok(LimitValue::Finite(recognize(v3)));
    }

    let growing = values.windows(2).all(|w| w[1].abs() > w[0].abs())
        && values.iter().all(|v| v.signum() == v3.signum());
    let steps: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let not_slowing = steps.windows(2).all(|s| s[1] >= 0.5 * s[0]);
    if growing && not_slowing {
        return Ok(if v3 > 0.0 {
            LimitValue::PosInfinity
        } else {
            LimitValue::NegInfinity
        });
    }
    Err(AlgebraError::unsupported("limit could not be determined"))
}

/// Maps a converged float back to an exact value when it is obviously one.
#[allow(clippy::cast_possible_truncation)]
fn recognize(v: f64) -> Expr {
    if v.abs() < 1e-6 {
        return Expr::int(0);
    }
    let rounded = v.round();
    if (v - rounded).abs() < 1e-6 {
        return Expr::Num(Number::from_f64(rounded));
    }
    for c in [Constant::E, Constant::Pi] {
        if let Some(cv) = c.to_f64() {
            if (v - cv).abs() < 1e-6 {
                return Expr::Const(c);
            }
        }
    }
    Expr::Num(Number::Float(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::parser::parse_expression;

    fn p(text: &str) -> Expr {
        parse_expression(text).unwrap()
    }

    fn d(text: &str) -> String {
        differentiate(&p(text), "x").to_string()
    }

    fn i(text: &str) -> String {
        integrate(&p(text), "x").unwrap().to_string()
    }

    fn lim(text: &str, point: LimitPoint) -> String {
        limit(&p(text), "x", &point).unwrap().to_string()
    }

    #[test]
    fn test_polynomial_derivatives() {
        assert_eq!(d("x**2"), "2*x");
        assert_eq!(d("3*x**2 + 2*x"), "6*x + 2");
        assert_eq!(d("5"), "0");
        assert_eq!(d("y*x"), "y");
    }

    #[test]
    fn test_chain_and_product_rules() {
        assert_eq!(d("sin(x)"), "cos(x)");
        assert_eq!(d("cos(2*x)"), "-2*sin(2*x)");
        assert_eq!(d("exp(x**2)"), "2*x*exp(x**2)");
        assert_eq!(d("log(x)"), "1/x");
        assert_eq!(d("sin(x)/x"), "cos(x)/x - sin(x)/x**2");
    }

    #[test]
    fn test_basic_integrals() {
        assert_eq!(i("x"), "x**2/2");
        assert_eq!(i("2*x"), "x**2");
        assert_eq!(i("x**2 + 1"), "x**3/3 + x");
        assert_eq!(i("1/x"), "log(x)");
        assert_eq!(i("cos(x)"), "sin(x)");
        assert_eq!(i("exp(2*x)"), "exp(2*x)/2");
        assert_eq!(i("5"), "5*x");
    }

    #[test]
    fn test_product_integrals_expand() {
        assert_eq!(i("x*(x + 1)"), "x**3/3 + x**2/2");
    }

    #[test]
    fn test_unsupported_integral() {
        let err = integrate(&p("exp(x**2)"), "x").unwrap_err();
        assert!(matches!(err, AlgebraError::Unsupported(_)));
    }

    #[test]
    fn test_limits_at_finite_points() {
        assert_eq!(lim("sin(x)/x", LimitPoint::Finite(Expr::int(0))), "1");
        assert_eq!(lim("(x**2 - 1)/(x - 1)", LimitPoint::Finite(Expr::int(1))), "2");
        assert_eq!(lim("(1 - cos(x))/x**2", LimitPoint::Finite(Expr::int(0))), "1/2");
        assert_eq!(lim("x**2 + 1", LimitPoint::Finite(Expr::int(2))), "5");
        assert_eq!(lim("1/x**2", LimitPoint::Finite(Expr::int(0))), "oo");
    }

    #[test]
    fn test_two_sided_divergence_fails() {
        let err = limit(&p("1/x"), "x", &LimitPoint::Finite(Expr::int(0))).unwrap_err();
        assert!(matches!(err, AlgebraError::NoSolution(_)));
    }

    #[test]
    fn test_limits_at_infinity() {
        assert_eq!(lim("1/x", LimitPoint::PosInfinity), "0");
        assert_eq!(lim("(2*x**2 + 1)/(x**2 + 3)", LimitPoint::PosInfinity), "2");
        assert_eq!(lim("x**3", LimitPoint::NegInfinity), "-oo");
        assert_eq!(lim("exp(-x)", LimitPoint::PosInfinity), "0");
        assert_eq!(lim("(1 + 1/x)**x", LimitPoint::PosInfinity), "E");
        assert_eq!(lim("log(x)", LimitPoint::PosInfinity), "oo");
    }

    #[test]
    fn test_oscillating_limit_is_not_invented() {
        assert!(limit(&p("sin(x)"), "x", &LimitPoint::PosInfinity).is_err());
    }
}
