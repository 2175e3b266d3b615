//! Canonicalizing constructors and tree rewrites.
//!
//! `add`, `mul`, `pow` and `func` assume canonical arguments and return a
//! canonical tree. Everything else in the engine builds through them, so a
//! tree produced anywhere in the crate is already simplified.

use super::expr::{factor_order, term_order, Constant, Expr, Func};
use super::number::{extract_square, Number};

/// Largest integer exponent `expand` multiplies out.
const MAX_EXPAND_POWER: i64 = 32;

/// Largest number of terms `expand` produces before giving up.
const MAX_EXPAND_TERMS: usize = 1024;

/// Canonical sum.
#[must_use]
pub fn add(terms: Vec<Expr>) -> Expr {
    let mut constant = Number::ZERO;
    let mut groups: Vec<(Expr, Number)> = Vec::new();

    let mut flat = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Expr::Add(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    for term in flat {
        if let Expr::Num(n) = term {
            constant = constant + n;
            continue;
        }
        let (coeff, rest) = term.split_coefficient();
        match groups.iter_mut().find(|(r, _)| *r == rest) {
            Some(group) => group.1 = group.1 + coeff,
            None => groups.push((rest, coeff)),
        }
    }

    let mut out: Vec<Expr> = groups
        .into_iter()
        .filter(|(_, c)| !c.is_zero())
        .map(|(rest, c)| scale(c, rest))
        .collect();
    if !constant.is_zero() {
        out.push(Expr::Num(constant));
    }
    match out.len() {
        0 => Expr::Num(constant),
        1 => out.pop().unwrap_or(Expr::int(0)),
        _ => {
            out.sort_by(term_order);
            Expr::Add(out)
        }
    }
}

/// Reattaches a coefficient to a coefficient-free term.
fn scale(coeff: Number, rest: Expr) -> Expr {
    if coeff.is_one() {
        return rest;
    }
    match rest {
        Expr::Mul(mut factors) => {
            factors.insert(0, Expr::Num(coeff));
            Expr::Mul(factors)
        }
        other => Expr::Mul(vec![Expr::Num(coeff), other]),
    }
}

/// Canonical product.
#[must_use]
pub fn mul(factors: Vec<Expr>) -> Expr {
    let mut coeff = Number::ONE;
    let mut groups: Vec<(Expr, Vec<Expr>)> = Vec::new();

    let mut flat = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor {
            Expr::Mul(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    for factor in flat {
        let (base, exp) = match factor {
            Expr::Num(n) => {
                coeff = coeff * n;
                continue;
            }
            Expr::Pow(b, e) => (*b, *e),
            other => (other, Expr::int(1)),
        };
        match groups.iter_mut().find(|(b, _)| *b == base) {
            Some(group) => group.1.push(exp),
            None => groups.push((base, vec![exp])),
        }
    }
    if coeff.is_zero() {
        return Expr::Num(coeff);
    }

    let mut out = Vec::with_capacity(groups.len());
    let mut refold = false;
    for (base, exps) in groups {
        match pow(base, add(exps)) {
            Expr::Num(n) => coeff = coeff * n,
            p @ Expr::Mul(_) => {
                refold = true;
                out.push(p);
            }
            p => out.push(p),
        }
    }
    if refold {
        out.insert(0, Expr::Num(coeff));
        return mul(out);
    }
    if coeff.is_zero() {
        return Expr::Num(coeff);
    }
    if out.is_empty() {
        return Expr::Num(coeff);
    }

    out.sort_by(factor_order);
    if out.len() == 1 {
        let single = out.pop().unwrap_or(Expr::int(1));
        if coeff.is_one() {
            return single;
        }
        if let Expr::Add(terms) = single {
            return add(
                terms
                    .into_iter()
                    .map(|t| mul(vec![Expr::Num(coeff), t]))
                    .collect(),
            );
        }
        return Expr::Mul(vec![Expr::Num(coeff), single]);
    }
    if !coeff.is_one() {
        out.insert(0, Expr::Num(coeff));
    }
    Expr::Mul(out)
}

/// Canonical power.
#[must_use]
pub fn pow(base: Expr, exp: Expr) -> Expr {
    if exp.is_zero() {
        return Expr::int(1);
    }
    if exp.is_one() {
        return base;
    }
    match (&base, exp.as_number()) {
        (Expr::Num(b), _) if b.is_one() => Expr::int(1),
        (Expr::Num(b), Some(e)) if b.is_zero() => {
            if e.is_negative() {
                raw_pow(base, exp)
            } else {
                Expr::int(0)
            }
        }
        (Expr::Num(b), Some(e)) => numeric_pow(*b, e),
        (Expr::Const(Constant::I), Some(e)) => match e.as_integer() {
            Some(k) => match k.rem_euclid(4) {
                0 => Expr::int(1),
                1 => Expr::Const(Constant::I),
                2 => Expr::int(-1),
                _ => Expr::Mul(vec![Expr::int(-1), Expr::Const(Constant::I)]),
            },
            None => raw_pow(base, exp),
        },
        (Expr::Const(Constant::E), _) => func(Func::Exp, exp),
        (Expr::Pow(b, e), Some(n)) if n.as_integer().is_some() => {
            pow((**b).clone(), mul(vec![(**e).clone(), exp.clone()]))
        }
        (Expr::Mul(factors), Some(n)) if n.as_integer().is_some() => mul(
            factors
                .iter()
                .map(|f| pow(f.clone(), exp.clone()))
                .collect(),
        ),
        (Expr::Func(Func::Exp, arg), _) => func(Func::Exp, mul(vec![(**arg).clone(), exp])),
        _ => raw_pow(base, exp),
    }
}

fn raw_pow(base: Expr, exp: Expr) -> Expr {
    Expr::Pow(Box::new(base), Box::new(exp))
}

fn numeric_pow(base: Number, exp: Number) -> Expr {
    if let Some(k) = exp.as_integer() {
        return match base.pow_int(k) {
            Some(n) => Expr::Num(n),
            None => raw_pow(Expr::Num(base), Expr::Num(exp)),
        };
    }
    let (p, q) = match (base, exp) {
        (Number::Rational(..), Number::Rational(p, q)) => (p, q),
        _ => {
            let value = base.to_f64().powf(exp.to_f64());
            return if value.is_finite() {
                Expr::Num(Number::Float(value))
            } else {
                raw_pow(Expr::Num(base), Expr::Num(exp))
            };
        }
    };
    if let Some(root) = u32::try_from(q).ok().and_then(|q| base.exact_root(q)) {
        if let Some(n) = root.pow_int(p) {
            return Expr::Num(n);
        }
    }
    if q != 2 {
        return raw_pow(Expr::Num(base), Expr::Num(exp));
    }
    if base.is_negative() {
        return mul(vec![
            pow(Expr::Const(Constant::I), Expr::int(p)),
            pow(Expr::Num(-base), Expr::Num(exp)),
        ]);
    }
    match base {
        Number::Rational(n, 1) => half_integer_power(n, p),
        Number::Rational(n, d) => mul(vec![
            half_integer_power(n, p),
            half_integer_power(d, -p),
        ]),
        Number::Float(_) => raw_pow(Expr::Num(base), Expr::Num(exp)),
    }
}

/// `n ** (p/2)` for a positive integer `n`, with square factors pulled out.
fn half_integer_power(n: i64, p: i64) -> Expr {
    let k = p.div_euclid(2);
    let odd = p.rem_euclid(2) == 1;
    let whole = Number::int(n).pow_int(k);
    if !odd {
        return whole.map_or_else(|| Expr::int(0), Expr::Num);
    }
    let (outside, inside) = extract_square(n);
    let surd = if inside == 1 {
        Expr::int(1)
    } else {
        raw_pow(Expr::int(inside), Expr::rational(1, 2))
    };
    if outside == 1 && k == 0 {
        return surd;
    }
    let whole = whole.unwrap_or(Number::ONE);
    mul(vec![Expr::Num(whole), Expr::int(outside), surd])
}

/// Canonical function application.
#[must_use]
pub fn func(f: Func, arg: Expr) -> Expr {
    if let Some(n) = arg.as_number() {
        if let Some(special) = special_value(f, n) {
            return special;
        }
        if let Number::Float(v) = n {
            let value = f.apply(v);
            if value.is_finite() {
                return Expr::Num(Number::Float(value));
            }
        }
    }
    match (f, &arg) {
        (Func::Sin | Func::Tan, Expr::Const(Constant::Pi)) => Expr::int(0),
        (Func::Cos, Expr::Const(Constant::Pi)) => Expr::int(-1),
        (Func::Log, Expr::Const(Constant::E)) => Expr::int(1),
        (Func::Exp, Expr::Func(Func::Log, inner)) | (Func::Log, Expr::Func(Func::Exp, inner)) => {
            (**inner).clone()
        }
        (Func::Abs, Expr::Func(Func::Abs, _)) => arg,
        _ => Expr::Func(f, Box::new(arg)),
    }
}

fn special_value(f: Func, n: Number) -> Option<Expr> {
    if f == Func::Abs {
        return Some(Expr::Num(n.abs()));
    }
    if n.is_zero() {
        return match f {
            Func::Sin | Func::Tan | Func::Asin | Func::Atan | Func::Sinh | Func::Tanh => {
                Some(Expr::int(0))
            }
            Func::Cos | Func::Cosh | Func::Exp => Some(Expr::int(1)),
            Func::Acos | Func::Log | Func::Abs => None,
        };
    }
    if n.is_one() {
        return match f {
            Func::Log | Func::Acos => Some(Expr::int(0)),
            _ => None,
        };
    }
    None
}

/// `-e`.
#[must_use]
pub fn neg(e: Expr) -> Expr {
    mul(vec![Expr::int(-1), e])
}

/// `a - b`.
#[must_use]
pub fn sub(a: Expr, b: Expr) -> Expr {
    add(vec![a, neg(b)])
}

/// `a / b`.
#[must_use]
pub fn div(a: Expr, b: Expr) -> Expr {
    mul(vec![a, pow(b, Expr::int(-1))])
}

/// Rebuilds a tree through the canonical constructors.
#[must_use]
pub fn simplify(e: &Expr) -> Expr {
    match e {
        Expr::Num(_) | Expr::Sym(_) | Expr::Const(_) => e.clone(),
        Expr::Add(terms) => add(terms.iter().map(simplify).collect()),
        Expr::Mul(factors) => mul(factors.iter().map(simplify).collect()),
        Expr::Pow(b, x) => pow(simplify(b), simplify(x)),
        Expr::Func(f, a) => func(*f, simplify(a)),
    }
}

/// Distributes products over sums and multiplies out small integer powers
/// of sums.
#[must_use]
pub fn expand(e: &Expr) -> Expr {
    match e {
        Expr::Num(_) | Expr::Sym(_) | Expr::Const(_) => e.clone(),
        Expr::Add(terms) => add(terms.iter().map(expand).collect()),
        Expr::Mul(factors) => distribute(factors.iter().map(expand).collect()),
        Expr::Pow(b, x) => {
            let base = expand(b);
            let exp = expand(x);
            match (exp.as_number().and_then(|n| n.as_integer()), &base) {
                (Some(k), Expr::Add(_)) if (2..=MAX_EXPAND_POWER).contains(&k) => {
                    let count = usize::try_from(k).unwrap_or(0);
                    distribute(vec![base; count])
                }
                _ => pow(base, exp),
            }
        }
        Expr::Func(f, a) => func(*f, expand(a)),
    }
}

fn distribute(factors: Vec<Expr>) -> Expr {
    let mut acc = vec![Expr::int(1)];
    for factor in &factors {
        let terms: &[Expr] = match factor {
            Expr::Add(terms) => terms,
            other => std::slice::from_ref(other),
        };
        if acc.len().saturating_mul(terms.len()) > MAX_EXPAND_TERMS {
            return mul(factors);
        }
        acc = acc
            .iter()
            .flat_map(|a| terms.iter().map(move |t| mul(vec![a.clone(), t.clone()])))
            .collect();
    }
    add(acc)
}

/// Replaces every occurrence of `var` with `value`.
#[must_use]
pub fn substitute(e: &Expr, var: &str, value: &Expr) -> Expr {
    match e {
        Expr::Sym(s) if s == var => value.clone(),
        Expr::Num(_) | Expr::Sym(_) | Expr::Const(_) => e.clone(),
        Expr::Add(terms) => add(terms.iter().map(|t| substitute(t, var, value)).collect()),
        Expr::Mul(factors) => mul(
            factors
                .iter()
                .map(|f| substitute(f, var, value))
                .collect(),
        ),
        Expr::Pow(b, x) => pow(substitute(b, var, value), substitute(x, var, value)),
        Expr::Func(f, a) => func(*f, substitute(a, var, value)),
    }
}

/// Splits an expression into numerator and denominator, combining the
/// terms of a sum over a common denominator.
#[must_use]
pub fn numer_denom(e: &Expr) -> (Expr, Expr) {
    match e {
        Expr::Num(Number::Rational(p, q)) => (Expr::int(*p), Expr::int(*q)),
        Expr::Pow(b, x) if x.as_number().is_some_and(|n| n.is_negative()) => {
            (Expr::int(1), pow((**b).clone(), neg((**x).clone())))
        }
        Expr::Mul(factors) => {
            let mut numer = Vec::new();
            let mut denom = Vec::new();
            for factor in factors {
                let (n, d) = numer_denom(factor);
                numer.push(n);
                denom.push(d);
            }
            (mul(numer), mul(denom))
        }
        Expr::Add(terms) => {
            let mut acc: Option<(Expr, Expr)> = None;
            for term in terms {
                let (n, d) = numer_denom(term);
                acc = Some(match acc {
                    None => (n, d),
                    Some((an, ad)) if ad == d => (add(vec![an, n]), ad),
                    Some((an, ad)) => (
                        add(vec![mul(vec![an, d.clone()]), mul(vec![n, ad.clone()])]),
                        mul(vec![ad, d]),
                    ),
                });
            }
            acc.map_or_else(|| (e.clone(), Expr::int(1)), |(n, d)| (expand(&n), d))
        }
        _ => (e.clone(), Expr::int(1)),
    }
}
