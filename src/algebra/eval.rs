//! Floating-point evaluation.

use super::expr::{Constant, Expr};
use crate::error::{AlgebraError, AlgebraResult};

/// Evaluates `e` with an optional binding for one symbol.
///
/// The result may be infinite or NaN; callers decide whether that is an
/// error. Unbound symbols and the imaginary unit are errors.
pub fn eval_f64(e: &Expr, binding: Option<(&str, f64)>) -> AlgebraResult<f64> {
    Ok(match e {
        Expr::Num(n) => n.to_f64(),
        Expr::Sym(s) => match binding {
            Some((name, value)) if name == s => value,
            _ => return Err(AlgebraError::unsupported(format!("free symbol '{s}'"))),
        },
        Expr::Const(c) => c
            .to_f64()
            .ok_or_else(|| AlgebraError::unsupported(format!("complex value {}", Constant::I)))?,
        Expr::Add(terms) => {
            let mut sum = 0.0;
            for t in terms {
                sum += eval_f64(t, binding)?;
            }
            sum
        }
        Expr::Mul(factors) => {
            let mut product = 1.0;
            for f in factors {
                product *= eval_f64(f, binding)?;
            }
            product
        }
        Expr::Pow(b, x) => {
            let base = eval_f64(b, binding)?;
            let exp = eval_f64(x, binding)?;
            if base == 0.0 && exp < 0.0 {
                f64::INFINITY
            } else {
                base.powf(exp)
            }
        }
        Expr::Func(f, a) => f.apply(eval_f64(a, binding)?),
    })
}

/// Like `eval_f64`, but a non-finite result is an error.
pub fn eval_finite(e: &Expr, binding: Option<(&str, f64)>) -> AlgebraResult<f64> {
    let value = eval_f64(e, binding)?;
    if value.is_finite() {
        Ok(value)
    } else if value.is_infinite() && has_zero_division(e) {
        Err(AlgebraError::DivisionByZero)
    } else {
        Err(AlgebraError::NotFinite)
    }
}

/// Returns true if the tree contains `0 ** negative`.
#[must_use]
pub fn has_zero_division(e: &Expr) -> bool {
    match e {
        Expr::Pow(b, x) => {
            (b.is_zero() && x.as_number().is_some_and(|n| n.is_negative()))
                || has_zero_division(b)
                || has_zero_division(x)
        }
        Expr::Add(items) | Expr::Mul(items) => items.iter().any(has_zero_division),
        Expr::Func(_, a) => has_zero_division(a),
        Expr::Num(_) | Expr::Sym(_) | Expr::Const(_) => false,
    }
}
