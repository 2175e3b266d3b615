//! Polynomial equation solving.
//!
//! Equations are reduced to `numerator(lhs - rhs) = 0` and solved when the
//! numerator is a polynomial in the target variable. Roots come back in a
//! fixed order: rational roots ascending, then the roots of the remaining
//! quadratic (minus branch first). A list of rational roots only is
//! ascending throughout.

use super::eval::eval_f64;
use super::expr::Expr;
use super::number::{gcd, Number};
use super::ops::{add, div, expand, mul, neg, numer_denom, pow, sub};
use crate::error::{AlgebraError, AlgebraResult};

/// Divisor searches stop above this magnitude.
const MAX_ROOT_SEARCH: u64 = 1_000_000;

/// Highest polynomial degree the solver will take apart.
pub const MAX_POLY_DEGREE: usize = 64;

/// Coefficients of `e` as a polynomial in `var`, lowest degree first.
///
/// Returns `None` when `e` is not a polynomial in `var` (negative or
/// symbolic powers, `var` inside a function) or when its degree exceeds
/// `MAX_POLY_DEGREE`. The leading coefficient is
/// nonzero unless the polynomial is zero, in which case `[0]` is returned.
#[must_use]
pub fn poly_coeffs(e: &Expr, var: &str) -> Option<Vec<Expr>> {
    let expanded = expand(e);
    let terms: Vec<Expr> = match expanded {
        Expr::Add(terms) => terms,
        other => vec![other],
    };

    let mut coeffs: Vec<Vec<Expr>> = Vec::new();
    for term in terms {
        let factors = match term {
            Expr::Mul(factors) => factors,
            other => vec![other],
        };
        let mut degree = 0usize;
        let mut rest = Vec::new();
        for factor in factors {
            match &factor {
                Expr::Sym(s) if s == var => degree = degree.checked_add(1)?,
                Expr::Pow(b, x) if matches!(&**b, Expr::Sym(s) if s == var) => {
                    let k = x.as_number()?.as_integer()?;
                    degree = degree.checked_add(usize::try_from(k).ok()?)?;
                }
                f if f.contains_symbol(var) => return None,
                _ => rest.push(factor),
            }
        }
        if degree > MAX_POLY_DEGREE {
            return None;
        }
        if coeffs.len() <= degree {
            coeffs.resize_with(degree + 1, Vec::new);
        }
        coeffs[degree].push(mul(rest));
    }

    let mut out: Vec<Expr> = coeffs.into_iter().map(add).collect();
    while out.len() > 1 && out.last().is_some_and(Expr::is_zero) {
        out.pop();
    }
    if out.is_empty() {
        out.push(Expr::int(0));
    }
    Some(out)
}

/// `(a, c)` with `e = a*var + c`, when `e` is linear in `var`.
#[must_use]
pub fn linear_coefficients(e: &Expr, var: &str) -> Option<(Expr, Expr)> {
    let coeffs = poly_coeffs(e, var)?;
    match coeffs.as_slice() {
        [c, a] => Some((a.clone(), c.clone())),
        _ => None,
    }
}

/// Solves `lhs = rhs` for `var`.
pub fn solve(lhs: &Expr, rhs: &Expr, var: &str) -> AlgebraResult<Vec<Expr>> {
    let difference = expand(&sub(lhs.clone(), rhs.clone()));
    let (numer, denom) = numer_denom(&difference);
    let coeffs = poly_coeffs(&numer, var).ok_or_else(|| {
        AlgebraError::unsupported(format!("{numer} is not a polynomial in {var}"))
    })?;

    let mut roots = Vec::new();
    for root in polynomial_roots(&coeffs)? {
        if !roots.contains(&root) && !makes_zero(&denom, var, &root) {
            roots.push(root);
        }
    }
    if roots.is_empty() {
        return Err(AlgebraError::NoSolution(format!("no value of {var} satisfies the equation")));
    }
    Ok(roots)
}

/// True if `root` zeroes `denom`; roots that cannot be evaluated are kept.
fn makes_zero(denom: &Expr, var: &str, root: &Expr) -> bool {
    if !denom.contains_symbol(var) {
        return false;
    }
    let Ok(at) = eval_f64(root, None) else {
        return false;
    };
    eval_f64(denom, Some((var, at))).is_ok_and(|v| v.abs() < 1e-12)
}

fn polynomial_roots(coeffs: &[Expr]) -> AlgebraResult<Vec<Expr>> {
    match coeffs {
        [] | [_] => {
            let holds = coeffs.first().map_or(true, Expr::is_zero);
            Err(AlgebraError::NoSolution(if holds {
                "the equation holds for every value".to_string()
            } else {
                "the equation is never satisfied".to_string()
            }))
        }
        [c, a] => Ok(vec![neg(div(c.clone(), a.clone()))]),
        [c, b, a] => Ok(quadratic_roots(a, b, c)),
        _ => higher_degree_roots(coeffs),
    }
}

fn quadratic_roots(a: &Expr, b: &Expr, c: &Expr) -> Vec<Expr> {
    let discriminant = sub(
        pow(b.clone(), Expr::int(2)),
        mul(vec![Expr::int(4), a.clone(), c.clone()]),
    );
    let two_a = mul(vec![Expr::int(2), a.clone()]);
    if discriminant.is_zero() {
        return vec![div(neg(b.clone()), two_a)];
    }
    let root = pow(discriminant, Expr::rational(1, 2));
    vec![
        div(sub(neg(b.clone()), root.clone()), two_a.clone()),
        div(add(vec![neg(b.clone()), root]), two_a),
    ]
}

fn horner(coeffs: &[Number], x: Number) -> Number {
    coeffs
        .iter()
        .rev()
        .fold(Number::ZERO, |acc, c| acc * x + *c)
}

/// Divides by `(x - root)`; `coeffs` are lowest degree first.
fn deflate(coeffs: &[Number], root: Number) -> Vec<Number> {
    let mut out = vec![Number::ZERO; coeffs.len().saturating_sub(1)];
    let mut carry = Number::ZERO;
    for i in (1..coeffs.len()).rev() {
        carry = carry * root + coeffs[i];
        out[i - 1] = carry;
    }
    out
}

fn divisors(n: i64) -> Vec<i64> {
    let n = n.abs();
    let mut out = Vec::new();
    let mut d = 1i64;
    while d * d <= n {
        if n % d == 0 {
            out.push(d);
            if d != n / d {
                out.push(n / d);
            }
        }
        d += 1;
    }
    out
}

fn higher_degree_roots(coeffs: &[Expr]) -> AlgebraResult<Vec<Expr>> {
    let unsupported = || {
        AlgebraError::unsupported(format!(
            "degree {} polynomial without enough rational roots",
            coeffs.len() - 1
        ))
    };
    let mut poly: Vec<Number> = Vec::with_capacity(coeffs.len());
    for c in coeffs {
        match c.as_number() {
            Some(n) if n.is_exact() => poly.push(n),
            _ => return Err(unsupported()),
        }
    }
    let lcm = poly
        .iter()
        .filter_map(Number::as_fraction)
        .try_fold(1i64, |acc, (_, d)| (acc / gcd(acc, d).max(1)).checked_mul(d))
        .ok_or_else(unsupported)?;
    let poly: Vec<Number> = poly.iter().map(|c| *c * Number::int(lcm)).collect();

    let mut found: Vec<Number> = Vec::new();
    let mut current = poly;
    while current.len() > 3 {
        let Some(root) = find_rational_root(&current) else {
            break;
        };
        if !found.contains(&root) {
            found.push(root);
        }
        current = deflate(&current, root);
    }
    if current.len() > 3 {
        return Err(unsupported());
    }
    found.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut roots: Vec<Expr> = found.into_iter().map(Expr::Num).collect();
    let remainder: Vec<Expr> = current.into_iter().map(Expr::Num).collect();
    if remainder.len() > 1 {
        for root in polynomial_roots(&remainder)? {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
    }
    // All-rational root sets are listed in ascending order.
    let mut numeric: Vec<Number> = roots.iter().filter_map(Expr::as_number).collect();
    if numeric.len() == roots.len() {
        numeric.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        roots = numeric.into_iter().map(Expr::Num).collect();
    }
    Ok(roots)
}

fn find_rational_root(poly: &[Number]) -> Option<Number> {
    let constant = poly.first()?.as_integer()?;
    let leading = poly.last()?.as_integer()?;
    if constant == 0 {
        return Some(Number::ZERO);
    }
    if constant.unsigned_abs() > MAX_ROOT_SEARCH || leading.unsigned_abs() > MAX_ROOT_SEARCH {
        return None;
    }
    let mut candidates: Vec<Number> = Vec::new();
    for p in divisors(constant) {
        for q in divisors(leading) {
            for sign in [-1, 1] {
                candidates.push(Number::rational(sign * p, q));
            }
        }
    }
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().find(|c| horner(poly, *c).is_zero())
}
