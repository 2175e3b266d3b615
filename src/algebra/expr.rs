//! Expression tree and its text form.
//!
//! Trees are built through the constructors in `ops`, which keep them in a
//! canonical shape: sums and products are flat, numeric coefficients are
//! folded into the first factor, and terms and factors are sorted. The
//! printer relies on that shape.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use super::number::Number;

/// Named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Ratio of a circle's circumference to its diameter.
    Pi,
    /// Euler's number.
    E,
    /// Imaginary unit.
    I,
}

impl Constant {
    /// Approximate real value; `None` for the imaginary unit.
    #[must_use]
    pub const fn to_f64(self) -> Option<f64> {
        match self {
            Self::Pi => Some(std::f64::consts::PI),
            Self::E => Some(std::f64::consts::E),
            Self::I => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pi => write!(f, "pi"),
            Self::E => write!(f, "E"),
            Self::I => write!(f, "I"),
        }
    }
}

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Inverse sine.
    Asin,
    /// Inverse cosine.
    Acos,
    /// Inverse tangent.
    Atan,
    /// Hyperbolic sine.
    Sinh,
    /// Hyperbolic cosine.
    Cosh,
    /// Hyperbolic tangent.
    Tanh,
    /// Natural logarithm.
    Log,
    /// Exponential.
    Exp,
    /// Absolute value.
    Abs,
}

impl Func {
    /// Looks a function up by name. `sqrt` is not a `Func`; the parser turns
    /// it into a power.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" | "arcsin" => Self::Asin,
            "acos" | "arccos" => Self::Acos,
            "atan" | "arctan" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "log" | "ln" => Self::Log,
            "exp" => Self::Exp,
            "abs" | "Abs" => Self::Abs,
            _ => return None,
        })
    }

    /// Applies the function to a float.
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Log => x.ln(),
            Self::Exp => x.exp(),
            Self::Abs => x.abs(),
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Abs => "abs",
        };
        f.write_str(name)
    }
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Num(Number),
    /// Single-letter variable.
    Sym(String),
    /// Named constant.
    Const(Constant),
    /// Sum of at least two terms.
    Add(Vec<Expr>),
    /// Product of at least two factors.
    Mul(Vec<Expr>),
    /// Base and exponent.
    Pow(Box<Expr>, Box<Expr>),
    /// Function application.
    Func(Func, Box<Expr>),
}

impl Expr {
    /// Integer literal.
    #[must_use]
    pub const fn int(n: i64) -> Self {
        Self::Num(Number::int(n))
    }

    /// Reduced fraction literal.
    #[must_use]
    pub fn rational(num: i64, den: i64) -> Self {
        Self::Num(Number::rational(num, den))
    }

    /// Symbol.
    #[must_use]
    pub fn sym(name: &str) -> Self {
        Self::Sym(name.to_string())
    }

    /// The numeric value, if this is a literal.
    #[must_use]
    pub const fn as_number(&self) -> Option<Number> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for the literal zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_number().is_some_and(|n| n.is_zero())
    }

    /// Returns true for the literal one.
    #[must_use]
    pub fn is_one(&self) -> bool {
        self.as_number().is_some_and(|n| n.is_one())
    }

    /// Returns true if `name` occurs anywhere in the tree.
    #[must_use]
    pub fn contains_symbol(&self, name: &str) -> bool {
        match self {
            Self::Sym(s) => s == name,
            Self::Num(_) | Self::Const(_) => false,
            Self::Add(items) | Self::Mul(items) => items.iter().any(|e| e.contains_symbol(name)),
            Self::Pow(b, e) => b.contains_symbol(name) || e.contains_symbol(name),
            Self::Func(_, a) => a.contains_symbol(name),
        }
    }

    /// All symbol names, sorted.
    #[must_use]
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Sym(s) => {
                out.insert(s.clone());
            }
            Self::Num(_) | Self::Const(_) => {}
            Self::Add(items) | Self::Mul(items) => {
                for e in items {
                    e.collect_symbols(out);
                }
            }
            Self::Pow(b, e) => {
                b.collect_symbols(out);
                e.collect_symbols(out);
            }
            Self::Func(_, a) => a.collect_symbols(out),
        }
    }

    /// Splits a term into its numeric coefficient and the remaining factor.
    #[must_use]
    pub fn split_coefficient(&self) -> (Number, Self) {
        match self {
            Self::Num(n) => (*n, Self::int(1)),
            Self::Mul(factors) => match factors.split_first() {
                Some((Self::Num(n), rest)) if rest.len() == 1 => (*n, rest[0].clone()),
                Some((Self::Num(n), rest)) => (*n, Self::Mul(rest.to_vec())),
                _ => (Number::ONE, self.clone()),
            },
            _ => (Number::ONE, self.clone()),
        }
    }

    /// Polynomial-style degree used to order the terms of a sum.
    fn sort_degree(&self) -> f64 {
        match self {
            Self::Num(_) | Self::Const(_) | Self::Func(..) => 0.0,
            Self::Sym(_) => 1.0,
            Self::Pow(b, e) => match e.as_number() {
                Some(n) => b.sort_degree() * n.to_f64(),
                None => b.sort_degree(),
            },
            Self::Mul(items) => items.iter().map(Self::sort_degree).sum(),
            Self::Add(items) => items
                .iter()
                .map(Self::sort_degree)
                .fold(0.0, f64::max),
        }
    }

    fn term_class(&self) -> u8 {
        if matches!(self, Self::Num(_)) {
            1
        } else if self.free_symbols().is_empty() {
            2
        } else {
            0
        }
    }

    fn factor_class(&self) -> u8 {
        match self {
            Self::Num(_) => 0,
            Self::Const(_) => 1,
            Self::Sym(_) => 2,
            Self::Func(..) => 3,
            Self::Add(_) | Self::Mul(_) => 4,
            Self::Pow(b, _) => b.factor_class(),
        }
    }
}

/// Ordering of the terms of a sum: higher degree first, then symbolic
/// terms, numbers, other constants.
#[must_use]
pub fn term_order(a: &Expr, b: &Expr) -> Ordering {
    b.sort_degree()
        .total_cmp(&a.sort_degree())
        .then_with(|| a.term_class().cmp(&b.term_class()))
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

/// Ordering of the factors of a product: numbers, constants, symbols,
/// functions, sums.
#[must_use]
pub fn factor_order(a: &Expr, b: &Expr) -> Ordering {
    a.factor_class()
        .cmp(&b.factor_class())
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

fn is_negative_term(e: &Expr) -> bool {
    e.split_coefficient().0.is_negative()
}

fn wrap(text: String) -> String {
    format!("({text})")
}

fn render_base(base: &Expr) -> String {
    match base {
        Expr::Sym(_) | Expr::Const(_) | Expr::Func(..) => base.to_string(),
        Expr::Num(n) if n.as_integer().is_some_and(|i| i >= 0) => base.to_string(),
        Expr::Num(Number::Float(v)) if *v >= 0.0 => base.to_string(),
        _ => wrap(base.to_string()),
    }
}

fn render_exponent(exp: &Expr) -> String {
    match exp {
        Expr::Sym(_) | Expr::Const(_) => exp.to_string(),
        Expr::Num(n) if n.as_integer().is_some_and(|i| i >= 0) => exp.to_string(),
        _ => wrap(exp.to_string()),
    }
}

fn render_power(base: &Expr, exp: &Expr) -> String {
    if let Some(n) = exp.as_number() {
        if n == Number::rational(1, 2) {
            return format!("sqrt({base})");
        }
        if n.is_negative() {
            let inner = render_power(base, &Expr::Num(-n));
            if (-n).is_one() && matches!(base, Expr::Add(_) | Expr::Mul(_)) {
                return format!("1/({inner})");
            }
            return format!("1/{inner}");
        }
        if n.is_one() {
            return base.to_string();
        }
    }
    format!("{}**{}", render_base(base), render_exponent(exp))
}

fn render_factor(factor: &Expr) -> String {
    match factor {
        Expr::Add(_) => wrap(factor.to_string()),
        Expr::Num(n) if n.is_negative() => wrap(factor.to_string()),
        _ => factor.to_string(),
    }
}

fn render_product(factors: &[Expr]) -> String {
    let (coeff, rest) = match factors.split_first() {
        Some((Expr::Num(n), rest)) => (*n, rest),
        _ => (Number::ONE, factors),
    };
    let negative = coeff.is_negative();
    let coeff = coeff.abs();

    let mut numer: Vec<String> = Vec::new();
    let mut denom: Vec<String> = Vec::new();
    match coeff {
        Number::Rational(p, q) => {
            if p != 1 {
                numer.push(p.to_string());
            }
            if q != 1 {
                denom.push(q.to_string());
            }
        }
        Number::Float(_) => {
            if !coeff.is_one() {
                numer.push(coeff.to_string());
            }
        }
    }
    for factor in rest {
        match factor {
            Expr::Pow(b, e) if e.as_number().is_some_and(|n| n.is_negative()) => {
                let positive = e.as_number().map_or(Number::ONE, |n| -n);
                let text = render_power(b, &Expr::Num(positive));
                let needs_parens = positive.is_one() && matches!(**b, Expr::Add(_) | Expr::Mul(_));
                denom.push(if needs_parens { wrap(text) } else { text });
            }
            _ => numer.push(render_factor(factor)),
        }
    }

    let numer = if numer.is_empty() {
        "1".to_string()
    } else {
        numer.join("*")
    };
    let body = match denom.len() {
        0 => numer,
        1 => format!("{numer}/{}", denom[0]),
        _ => format!("{numer}/({})", denom.join("*")),
    };
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

fn render_sum(terms: &[Expr]) -> String {
    let mut out = String::new();
    for (i, term) in terms.iter().enumerate() {
        if i == 0 {
            out.push_str(&term.to_string());
            continue;
        }
        if is_negative_term(term) {
            let (c, rest) = term.split_coefficient();
            let positive = -c;
            let text = match (&rest, positive.is_one()) {
                (Expr::Num(_), _) => positive.to_string(),
                (_, true) => rest.to_string(),
                (Expr::Mul(fs), false) => {
                    let mut factors = vec![Expr::Num(positive)];
                    factors.extend(fs.iter().cloned());
                    render_product(&factors)
                }
                (_, false) => render_product(&[Expr::Num(positive), rest.clone()]),
            };
            out.push_str(" - ");
            out.push_str(&text);
        } else {
            out.push_str(" + ");
            out.push_str(&term.to_string());
        }
    }
    out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Sym(s) => f.write_str(s),
            Self::Const(c) => write!(f, "{c}"),
            Self::Add(terms) => f.write_str(&render_sum(terms)),
            Self::Mul(factors) => f.write_str(&render_product(factors)),
            Self::Pow(b, e) => f.write_str(&render_power(b, e)),
            Self::Func(func, arg) => write!(f, "{func}({arg})"),
        }
    }
}
