//! Numeric coefficients: exact rationals with a floating-point fallback.
//!
//! Arithmetic stays exact while numerators and denominators fit in `i64`
//! and degrades to `f64` on overflow or when a float operand is involved.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Significant digits used when rendering floats.
const FLOAT_DIGITS: i32 = 15;

const SQUARE_SEARCH_LIMIT: i64 = 100_000;

/// Greatest common divisor of the magnitudes. Computed on `u64` so that
/// `i64::MIN` has a magnitude; a result that does not fit back in `i64`
/// (only `gcd(MIN, MIN)` or `gcd(MIN, 0)`) reports 1, leaving the fraction
/// unreduced.
pub(super) fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    i64::try_from(a).unwrap_or(1)
}

/// A numeric value inside an expression tree.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Reduced fraction; the denominator is always positive.
    Rational(i64, i64),
    /// Approximate value.
    Float(f64),
}

impl Number {
    /// Zero.
    pub const ZERO: Self = Self::Rational(0, 1);
    /// One.
    pub const ONE: Self = Self::Rational(1, 1);
    /// Minus one.
    pub const NEG_ONE: Self = Self::Rational(-1, 1);

    /// Integer value.
    #[must_use]
    pub const fn int(n: i64) -> Self {
        Self::Rational(n, 1)
    }

    /// Reduced fraction. A zero denominator yields a signed float infinity.
    #[must_use]
    pub fn rational(num: i64, den: i64) -> Self {
        if den == 0 {
            return Self::Float(match num.cmp(&0) {
                Ordering::Less => f64::NEG_INFINITY,
                Ordering::Equal => f64::NAN,
                Ordering::Greater => f64::INFINITY,
            });
        }
        let (num, den) = if den < 0 {
            match (num.checked_neg(), den.checked_neg()) {
                (Some(n), Some(d)) => (n, d),
                _ => return Self::Float(num as f64 / den as f64),
            }
        } else {
            (num, den)
        };
        let g = gcd(num, den).max(1);
        Self::Rational(num / g, den / g)
    }

    /// Float value, collapsed to an integer when it is one exactly.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
            return Self::int(value as i64);
        }
        Self::Float(value)
    }

    /// Parses a decimal literal such as `12`, `2.5` or `.75` exactly.
    #[must_use]
    pub fn parse_decimal(text: &str) -> Option<Self> {
        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        let digits = format!("{whole}{frac}");
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let scale = u32::try_from(frac.len()).ok()?;
        match (digits.parse::<i64>(), 10i64.checked_pow(scale)) {
            (Ok(num), Some(den)) => Some(Self::rational(num, den)),
            _ => text.parse::<f64>().ok().map(Self::Float),
        }
    }

    /// Returns true for exact or approximate zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Rational(n, _) => *n == 0,
            Self::Float(f) => *f == 0.0,
        }
    }

    /// Returns true for one.
    #[must_use]
    pub fn is_one(&self) -> bool {
        match self {
            Self::Rational(n, d) => *n == 1 && *d == 1,
            Self::Float(f) => (*f - 1.0).abs() < f64::EPSILON,
        }
    }

    /// Returns true for values below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Rational(n, _) => *n < 0,
            Self::Float(f) => *f < 0.0,
        }
    }

    /// Returns true if the value is exact.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        matches!(self, Self::Rational(..))
    }

    /// Returns the integer value of an exact integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Rational(n, 1) => Some(*n),
            _ => None,
        }
    }

    /// Numerator and denominator of an exact value.
    #[must_use]
    pub const fn as_fraction(&self) -> Option<(i64, i64)> {
        match self {
            Self::Rational(n, d) => Some((*n, *d)),
            Self::Float(_) => None,
        }
    }

    /// Approximate value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Rational(n, d) => *n as f64 / *d as f64,
            Self::Float(f) => *f,
        }
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        if self.is_negative() {
            -*self
        } else {
            *self
        }
    }

    /// Multiplicative inverse. `None` for zero.
    #[must_use]
    pub fn recip(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        Some(match self {
            Self::Rational(n, d) => Self::rational(*d, *n),
            Self::Float(f) => Self::Float(f.recip()),
        })
    }

    /// Integer power. `None` for `0 ** negative`.
    #[must_use]
    pub fn pow_int(&self, exp: i64) -> Option<Self> {
        if exp < 0 {
            return self.recip()?.pow_int(exp.checked_neg()?);
        }
        match self {
            Self::Rational(n, d) => {
                let e = u32::try_from(exp).ok();
                match e.map(|e| (n.checked_pow(e), d.checked_pow(e))) {
                    Some((Some(n), Some(d))) => Some(Self::Rational(n, d)),
                    _ => Some(Self::Float(self.to_f64().powf(exp as f64))),
                }
            }
            Self::Float(f) => Some(Self::Float(f.powf(exp as f64))),
        }
    }

    /// Decimal text: integers without a decimal point, everything else as a
    /// float with at most 15 significant digits.
    #[must_use]
    pub fn to_decimal_string(&self) -> String {
        match self {
            Self::Rational(n, 1) => n.to_string(),
            _ => format_float(self.to_f64()),
        }
    }

    /// Exact `k`-th root when one exists.
    #[must_use]
    pub fn exact_root(&self, k: u32) -> Option<Self> {
        let (n, d) = self.as_fraction()?;
        if n < 0 && k % 2 == 0 {
            return None;
        }
        let rn = integer_root(n, k)?;
        let rd = integer_root(d, k)?;
        Some(Self::rational(rn, rd))
    }
}

/// Exact integer `k`-th root, `None` when `n` is not a perfect power.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn integer_root(n: i64, k: u32) -> Option<i64> {
    if k == 0 {
        return None;
    }
    let negative = n < 0;
    let magnitude = n.checked_abs()?;
    let guess = (magnitude as f64).powf(1.0 / f64::from(k)).round() as i64;
    for candidate in [guess.saturating_sub(1), guess, guess.saturating_add(1)] {
        if candidate < 0 {
            continue;
        }
        if candidate.checked_pow(k) == Some(magnitude) {
            return Some(if negative { -candidate } else { candidate });
        }
    }
    None
}

/// Splits a positive integer into `(outside, inside)` with
/// `n = outside**2 * inside`. Trial division stops at `SQUARE_SEARCH_LIMIT`,
/// so very large inputs may keep a square factor inside.
#[must_use]
pub fn extract_square(n: i64) -> (i64, i64) {
    let mut outside = 1i64;
    let mut inside = n;
    let mut f = 2i64;
    while f <= SQUARE_SEARCH_LIMIT && f * f <= inside {
        let sq = f * f;
        while inside % sq == 0 {
            inside /= sq;
            outside *= f;
        }
        f += 1;
    }
    (outside, inside)
}

/// Renders a float with at most 15 significant digits and no trailing zeros.
#[must_use]
pub fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "oo".to_string()
        } else {
            "-oo".to_string()
        };
    }
    if value == 0.0 {
        return "0".to_string();
    }
    #[allow(clippy::cast_possible_truncation)]
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = FLOAT_DIGITS - 1 - magnitude;
    if !(0..=20).contains(&decimals) {
        return format!("{value:e}");
    }
    #[allow(clippy::cast_sign_loss)]
    let text = format!("{value:.prec$}", prec = decimals as usize);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Rational(n1, d1), Self::Rational(n2, d2)) => n1 == n2 && d1 == d2,
            _ => self.to_f64() == other.to_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Rational(n1, d1), Self::Rational(n2, d2)) => {
                let lhs = i128::from(*n1) * i128::from(*d2);
                let rhs = i128::from(*n2) * i128::from(*d1);
                Some(lhs.cmp(&rhs))
            }
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self::int(n)
    }
}

impl Neg for Number {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            Self::Rational(n, d) => match n.checked_neg() {
                Some(n) => Self::Rational(n, d),
                None => Self::Float(-self.to_f64()),
            },
            Self::Float(f) => Self::Float(-f),
        }
    }
}

impl Add for Number {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if let (Self::Rational(n1, d1), Self::Rational(n2, d2)) = (self, rhs) {
            let exact = n1
                .checked_mul(d2)
                .zip(n2.checked_mul(d1))
                .and_then(|(a, b)| a.checked_add(b))
                .zip(d1.checked_mul(d2));
            if let Some((num, den)) = exact {
                return Self::rational(num, den);
            }
        }
        Self::Float(self.to_f64() + rhs.to_f64())
    }
}

impl Sub for Number {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Mul for Number {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        if let (Self::Rational(n1, d1), Self::Rational(n2, d2)) = (self, rhs) {
            let g1 = gcd(n1, d2).max(1);
            let g2 = gcd(n2, d1).max(1);
            let exact = (n1 / g1)
                .checked_mul(n2 / g2)
                .zip((d1 / g2).checked_mul(d2 / g1));
            if let Some((num, den)) = exact {
                return Self::rational(num, den);
            }
        }
        Self::Float(self.to_f64() * rhs.to_f64())
    }
}

impl Div for Number {
    type Output = Self;

    /// Division by exact zero yields a float infinity (or NaN for `0/0`);
    /// callers that care check `is_zero` first.
    fn div(self, rhs: Self) -> Self {
        match rhs.recip() {
            Some(inv) => self * inv,
            None => Self::Float(self.to_f64() / 0.0),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rational(n, 1) => write!(f, "{n}"),
            Self::Rational(n, d) => write!(f, "{n}/{d}"),
            Self::Float(v) => write!(f, "{}", format_float(*v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_arithmetic() {
        let half = Number::rational(1, 2);
        let third = Number::rational(1, 3);
        assert_eq!(half + third, Number::rational(5, 6));
        assert_eq!(half * third, Number::rational(1, 6));
        assert_eq!(half / third, Number::rational(3, 2));
        assert_eq!(half - half, Number::ZERO);
    }

    #[test]
    fn test_i64_min_stays_exact() {
        let min = Number::int(-i64::MAX) + Number::NEG_ONE;
        assert_eq!(min, Number::int(i64::MIN));
        assert_eq!(Number::rational(i64::MIN, 2), Number::int(i64::MIN / 2));
        assert_eq!(min * Number::rational(1, 2), Number::int(i64::MIN / 2));
        assert_eq!(gcd(i64::MIN, 6), 2);
        assert_eq!(gcd(i64::MIN, i64::MIN), 1);
    }

    #[test]
    fn test_i64_min_negation_degrades_to_float() {
        let min = Number::int(i64::MIN);
        assert!(!(-min).is_exact());
        assert!(min.recip().is_some_and(|r| !r.is_exact()));
        assert!(min.abs().to_f64() > 0.0);
    }

    #[test]
    fn test_exact_root_near_i64_max() {
        assert_eq!(Number::int(i64::MAX).exact_root(1), Some(Number::int(i64::MAX)));
    }

    #[test]
    fn test_reduction_and_sign() {
        assert_eq!(Number::rational(4, -6), Number::Rational(-2, 3));
        assert!(Number::rational(4, -6).is_negative());
    }

    #[test]
    fn test_decimal_literals_are_exact() {
        assert_eq!(Number::parse_decimal("2.5"), Some(Number::rational(5, 2)));
        assert_eq!(Number::parse_decimal(".75"), Some(Number::rational(3, 4)));
        assert_eq!(Number::parse_decimal("12"), Some(Number::int(12)));
        assert_eq!(Number::parse_decimal("."), None);
        let sum = Number::parse_decimal("0.1").unwrap() + Number::parse_decimal("0.2").unwrap();
        assert_eq!(sum, Number::rational(3, 10));
    }

    #[test]
    fn test_powers() {
        assert_eq!(Number::rational(2, 3).pow_int(2), Some(Number::rational(4, 9)));
        assert_eq!(Number::rational(2, 3).pow_int(-1), Some(Number::rational(3, 2)));
        assert_eq!(Number::ZERO.pow_int(-1), None);
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        let big = Number::int(i64::MAX);
        assert!(!(big * big).is_exact());
    }

    #[test]
    fn test_roots() {
        assert_eq!(Number::int(16).exact_root(2), Some(Number::int(4)));
        assert_eq!(Number::rational(8, 27).exact_root(3), Some(Number::rational(2, 3)));
        assert_eq!(Number::int(8).exact_root(2), None);
        assert_eq!(extract_square(8), (2, 2));
        assert_eq!(extract_square(72), (6, 2));
        assert_eq!(extract_square(7), (1, 7));
    }

    #[test]
    fn test_display() {
        assert_eq!(Number::int(4).to_string(), "4");
        assert_eq!(Number::rational(-1, 2).to_string(), "-1/2");
        assert_eq!(Number::Float(0.1 + 0.2).to_string(), "0.3");
        assert_eq!(format_float(1.0 / 3.0), "0.333333333333333");
        assert_eq!(format_float(2.0), "2");
        assert_eq!(Number::rational(1, 2).to_decimal_string(), "0.5");
        assert_eq!(Number::int(-7).to_decimal_string(), "-7");
    }
}
