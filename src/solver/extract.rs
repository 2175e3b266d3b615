//! Pulls the mathematical payload out of a normalized question.
//!
//! Each problem kind has its own phrasing around the expression ("find the
//! derivative of ...", "... dx", "... as x -> 0"). The helpers here strip
//! that phrasing and return the bare expression text plus any variable the
//! question names explicitly.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{SolveError, SolveStage};

/// Question openers removed before parsing, repeatedly.
const PREFIXES: &str = r"(?i)^\s*(?:find\s+the|what\s+is|what's|whats|compute|calculate|evaluate|determine|find|the\s+function|function|the|solve)\b[\s:,]*";

const DERIVATIVE_KEYWORDS: &str = r"(?i)\b(?:derivative|differentiate)\b";

const DIFFERENTIAL_OPERATOR: &str = r"(?i)\bd/d([a-z])\b";

const INTEGRAL_KEYWORDS: &str = r"(?i)(?:\b(?:indefinite\s+)?(?:integrate|integral|antiderivative)\b|∫)";

/// A trailing `dx` / `d t`, optionally glued on with `*`.
const TRAILING_DIFFERENTIAL: &str = r"(?i)[\s*]*\bd\s*([a-z])\s*$";

const RESPECT_TO: &str = r"(?i)\bwith\s+respect\s+to\s+([a-z])\b";

const OF: &str = r"(?i)\bof\b";

const LIMIT_KEYWORDS: &str = r"(?i)\blim(?:it)?\b";

const LIMIT_CLAUSE: &str =
    r"(?i)\bas\s+([a-z])\s*(?:→|->|tends\s+to|goes\s+to|approaches|to)\s*([+\-−]?\S+)";

const FOR_VARIABLE: &str = r"(?i)^\s*for\s+([a-z])\b[\s:,]*";

struct Patterns {
    prefixes: Regex,
    derivative: Regex,
    operator: Regex,
    integral: Regex,
    differential: Regex,
    respect_to: Regex,
    of: Regex,
    limit: Regex,
    limit_clause: Regex,
    for_variable: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            prefixes: Regex::new(PREFIXES)?,
            derivative: Regex::new(DERIVATIVE_KEYWORDS)?,
            operator: Regex::new(DIFFERENTIAL_OPERATOR)?,
            integral: Regex::new(INTEGRAL_KEYWORDS)?,
            differential: Regex::new(TRAILING_DIFFERENTIAL)?,
            respect_to: Regex::new(RESPECT_TO)?,
            of: Regex::new(OF)?,
            limit: Regex::new(LIMIT_KEYWORDS)?,
            limit_clause: Regex::new(LIMIT_CLAUSE)?,
            for_variable: Regex::new(FOR_VARIABLE)?,
        })
    }
}

static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();

fn patterns(stage: SolveStage) -> Result<&'static Patterns, SolveError> {
    PATTERNS
        .get_or_init(Patterns::compile)
        .as_ref()
        .map_err(|e| SolveError::parse(stage, format!("pattern error: {e}")))
}

/// Expression text plus the variable the question names, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub expr: String,
    pub var: Option<String>,
}

/// The pieces of a limit question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitParts {
    pub expr: String,
    pub var: String,
    pub point: String,
}

/// The pieces of an equation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationParts {
    pub lhs: String,
    pub rhs: String,
    pub var: Option<String>,
}

fn tidy(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_start_matches(&[',', ';', ':', ' '][..])
        .trim_end_matches(&[',', ';', ':', '.', ' '][..])
        .to_string()
}

fn strip_with(p: &Patterns, text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = p.prefixes.replace(&current, "").trim().to_string();
        if next == current {
            return tidy(&current);
        }
        current = next;
    }
}

/// Removes question openers such as "what is" or "find the".
pub fn strip_prefixes(text: &str, stage: SolveStage) -> Result<String, SolveError> {
    Ok(strip_with(patterns(stage)?, text))
}

fn capture_var(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `derivative of x^2`, `d/dx sin(x)`, `differentiate f(x) = x**3 with respect to x`.
pub fn derivative_target(text: &str) -> Result<Target, SolveError> {
    let p = patterns(SolveStage::Derivative)?;
    let var = capture_var(&p.operator, text).or_else(|| capture_var(&p.respect_to, text));

    let mut body = p.derivative.replace_all(text, " ").into_owned();
    body = p.operator.replace_all(&body, " ").into_owned();
    body = p.respect_to.replace_all(&body, " ").into_owned();
    body = p.of.replace_all(&body, " ").into_owned();
    if let Some((_, rhs)) = body.rsplit_once('=') {
        body = rhs.to_string();
    }
    Ok(Target {
        expr: strip_with(p, &body),
        var,
    })
}

/// `integrate x`, `integral of sin(x) dx`, `∫ t**2 dt`.
pub fn integral_target(text: &str) -> Result<Target, SolveError> {
    let p = patterns(SolveStage::Integral)?;
    let mut var = capture_var(&p.respect_to, text);

    let mut body = p.integral.replace_all(text, " ").into_owned();
    body = p.respect_to.replace_all(&body, " ").into_owned();
    body = p.of.replace_all(&body, " ").into_owned();
    let trimmed = body.trim_end().to_string();
    if let Some(captures) = p.differential.captures(&trimmed) {
        if let (Some(whole), Some(v)) = (captures.get(0), captures.get(1)) {
            var = var.or_else(|| Some(v.as_str().to_string()));
            body = trimmed[..whole.start()].to_string();
        }
    }
    Ok(Target {
        expr: strip_with(p, &body),
        var,
    })
}

/// `limit of sin(x)/x as x -> 0`, `limit as x → oo of 1/x`.
///
/// # Errors
///
/// Fails with a limit parse error when the `as <var> -> <point>` clause is
/// missing.
pub fn limit_parts(text: &str) -> Result<LimitParts, SolveError> {
    let p = patterns(SolveStage::Limit)?;
    let captures = p.limit_clause.captures(text).ok_or_else(|| {
        SolveError::parse(
            SolveStage::Limit,
            "missing 'as <variable> -> <point>' clause",
        )
    })?;
    let (Some(whole), Some(var), Some(point)) = (captures.get(0), captures.get(1), captures.get(2))
    else {
        return Err(SolveError::parse(SolveStage::Limit, "incomplete limit clause"));
    };

    let rest = format!("{} {}", &text[..whole.start()], &text[whole.end()..]);
    let mut body = p.limit.replace_all(&rest, " ").into_owned();
    body = p.of.replace_all(&body, " ").into_owned();
    Ok(LimitParts {
        expr: strip_with(p, &body),
        var: var.as_str().to_string(),
        point: tidy(point.as_str()),
    })
}

/// Splits on the first `=`; a leading `for <var>` names the unknown.
pub fn equation_sides(text: &str) -> Result<EquationParts, SolveError> {
    let p = patterns(SolveStage::Equation)?;
    let (lhs, rhs) = text
        .split_once('=')
        .ok_or_else(|| SolveError::parse(SolveStage::Equation, "missing '='"))?;

    let mut lhs = strip_with(p, lhs);
    let var = capture_var(&p.for_variable, &lhs);
    if var.is_some() {
        lhs = strip_with(p, &p.for_variable.replace(&lhs, ""));
    }
    Ok(EquationParts {
        lhs,
        rhs: tidy(rhs),
        var,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_strip_repeatedly() {
        assert_eq!(
            strip_prefixes("what is the 2+2", SolveStage::Arithmetic).unwrap(),
            "2+2"
        );
        assert_eq!(
            strip_prefixes("Compute: 3*4", SolveStage::Arithmetic).unwrap(),
            "3*4"
        );
        assert_eq!(strip_prefixes("theta", SolveStage::Arithmetic).unwrap(), "theta");
    }

    #[test]
    fn test_derivative_target() {
        let t = derivative_target("find the derivative of x**2").unwrap();
        assert_eq!(t.expr, "x**2");
        assert_eq!(t.var, None);

        let t = derivative_target("d/dt t**3").unwrap();
        assert_eq!(t.expr, "t**3");
        assert_eq!(t.var.as_deref(), Some("t"));

        let t = derivative_target("derivative of f(x) = sin(x) with respect to x").unwrap();
        assert_eq!(t.expr, "sin(x)");
        assert_eq!(t.var.as_deref(), Some("x"));
    }

    #[test]
    fn test_integral_target() {
        let t = integral_target("integrate x").unwrap();
        assert_eq!(t.expr, "x");
        assert_eq!(t.var, None);

        let t = integral_target("integral of 3*x**2 dx").unwrap();
        assert_eq!(t.expr, "3*x**2");
        assert_eq!(t.var.as_deref(), Some("x"));

        let t = integral_target("∫ cos(t) d t").unwrap();
        assert_eq!(t.expr, "cos(t)");
        assert_eq!(t.var.as_deref(), Some("t"));
    }

    #[test]
    fn test_limit_parts_either_order() {
        let parts = limit_parts("limit of sin(x)/x as x -> 0").unwrap();
        assert_eq!(parts.expr, "sin(x)/x");
        assert_eq!(parts.var, "x");
        assert_eq!(parts.point, "0");

        let parts = limit_parts("limit as n → oo of (1 + 1/n)**n").unwrap();
        assert_eq!(parts.expr, "(1 + 1/n)**n");
        assert_eq!(parts.var, "n");
        assert_eq!(parts.point, "oo");
    }

    #[test]
    fn test_limit_requires_clause() {
        let err = limit_parts("limit of 1/x").unwrap_err();
        assert_eq!(err.stage(), Some(SolveStage::Limit));
        assert!(matches!(err, SolveError::Parse { .. }));
    }

    #[test]
    fn test_equation_sides() {
        let parts = equation_sides("x + 2 = 5").unwrap();
        assert_eq!(parts.lhs, "x + 2");
        assert_eq!(parts.rhs, "5");
        assert_eq!(parts.var, None);

        let parts = equation_sides("for y: 2*y = 8").unwrap();
        assert_eq!(parts.lhs, "2*y");
        assert_eq!(parts.var.as_deref(), Some("y"));
    }
}
