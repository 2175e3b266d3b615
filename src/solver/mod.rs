//! Problem classification and symbolic sub-solvers.
//!
//! A normalized question gets exactly one `ProblemKind` from a fixed keyword
//! precedence, then the matching sub-solver extracts the expression, runs
//! it through the `AlgebraEngine` and renders a `SolveResult` with that
//! kind's intrinsic confidence. Engine failures are converted to
//! `SolveError` at the sub-solver boundary and tagged with the stage.

mod extract;

pub(crate) use extract::strip_prefixes;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algebra::{parse_limit_point, sub, AlgebraEngine, Expr, SymbolicEngine};
use crate::confidence::Confidence;
use crate::error::{AlgebraError, SolveError, SolveStage};
use crate::result::SolveResult;

/// What a normalized question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// Symbolic derivative.
    Derivative,
    /// Indefinite integral.
    Integral,
    /// Limit at a point or at infinity.
    Limit,
    /// Equation to solve for one variable.
    Equation,
    /// Expression to evaluate.
    ArithmeticEvaluation,
    /// Nothing matched.
    Unclassified,
}

impl ProblemKind {
    /// The sub-solver stage for this kind; `None` when unclassified.
    #[must_use]
    pub const fn stage(self) -> Option<SolveStage> {
        match self {
            Self::Derivative => Some(SolveStage::Derivative),
            Self::Integral => Some(SolveStage::Integral),
            Self::Limit => Some(SolveStage::Limit),
            Self::Equation => Some(SolveStage::Equation),
            Self::ArithmeticEvaluation => Some(SolveStage::Arithmetic),
            Self::Unclassified => None,
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derivative => write!(f, "derivative"),
            Self::Integral => write!(f, "integral"),
            Self::Limit => write!(f, "limit"),
            Self::Equation => write!(f, "equation"),
            Self::ArithmeticEvaluation => write!(f, "arithmetic_evaluation"),
            Self::Unclassified => write!(f, "unclassified"),
        }
    }
}

const DERIVATIVE_KEYWORDS: &[&str] = &["derivative", "differentiate", "d/dx"];
const INTEGRAL_KEYWORDS: &[&str] = &["integrate", "integral", "∫"];
const LIMIT_KEYWORDS: &[&str] = &["limit"];
const ARITHMETIC_OPERATORS: &[char] = &['+', '-', '*', '/'];

/// Assigns a problem kind. First match wins, case-insensitive:
/// derivative, integral, limit, `=`, any of `+ - * /`.
///
/// # Examples
///
/// ```
/// use mathroute::solver::{classify, ProblemKind};
///
/// assert_eq!(classify("derivative of x**2"), ProblemKind::Derivative);
/// assert_eq!(classify("x + 2 = 5"), ProblemKind::Equation);
/// assert_eq!(classify("hello"), ProblemKind::Unclassified);
/// ```
#[must_use]
pub fn classify(normalized: &str) -> ProblemKind {
    let lowered = normalized.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    if has_any(DERIVATIVE_KEYWORDS) {
        ProblemKind::Derivative
    } else if has_any(INTEGRAL_KEYWORDS) {
        ProblemKind::Integral
    } else if has_any(LIMIT_KEYWORDS) {
        ProblemKind::Limit
    } else if lowered.contains('=') {
        ProblemKind::Equation
    } else if lowered.contains(ARITHMETIC_OPERATORS) {
        ProblemKind::ArithmeticEvaluation
    } else {
        ProblemKind::Unclassified
    }
}

/// The solving stage of the cascade.
///
/// Implemented by `SolverDispatcher`; the router holds it behind this trait
/// so tests can substitute a counting fake.
pub trait Solver: Send + Sync {
    /// Classifies and solves an already normalized question.
    ///
    /// # Errors
    ///
    /// Returns `SolveError` when the question is unclassified or the
    /// matching sub-solver cannot parse or solve it.
    fn solve(&self, normalized: &str) -> Result<SolveResult, SolveError>;
}

/// Picks the variable to work in: the named one, else `x` when present,
/// else the alphabetically first free symbol.
fn choose_variable(named: Option<String>, symbols: &BTreeSet<String>) -> Option<String> {
    named.or_else(|| {
        if symbols.contains("x") {
            Some("x".to_string())
        } else {
            symbols.iter().next().cloned()
        }
    })
}

/// Routes a classified question to its sub-solver.
#[derive(Clone)]
pub struct SolverDispatcher {
    engine: Arc<dyn AlgebraEngine>,
}

impl fmt::Debug for SolverDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverDispatcher").finish_non_exhaustive()
    }
}

impl Default for SolverDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverDispatcher {
    /// Creates a dispatcher over the built-in `SymbolicEngine`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(Arc::new(SymbolicEngine::new()))
    }

    /// Creates a dispatcher over a custom engine.
    #[must_use]
    pub fn with_engine(engine: Arc<dyn AlgebraEngine>) -> Self {
        Self { engine }
    }

    /// The engine used by every sub-solver.
    #[must_use]
    pub fn engine(&self) -> &dyn AlgebraEngine {
        self.engine.as_ref()
    }

    /// Runs the sub-solver for `kind`.
    ///
    /// # Errors
    ///
    /// `SolveError::UnsupportedOperation` for `Unclassified`; otherwise a
    /// parse or algebra error tagged with the failing stage.
    pub fn dispatch(&self, kind: ProblemKind, normalized: &str) -> Result<SolveResult, SolveError> {
        debug!(kind = %kind, "dispatching");
        match kind {
            ProblemKind::Derivative => self.derivative(normalized),
            ProblemKind::Integral => self.integral(normalized),
            ProblemKind::Limit => self.limit(normalized),
            ProblemKind::Equation => self.equation(normalized),
            ProblemKind::ArithmeticEvaluation => self.arithmetic(normalized),
            ProblemKind::Unclassified => Err(SolveError::UnsupportedOperation(
                "question does not match any supported problem kind".to_string(),
            )),
        }
    }

    fn parse(&self, stage: SolveStage, text: &str) -> Result<Expr, SolveError> {
        self.engine.parse(text).map_err(|e| SolveError::at(stage, e))
    }

    fn derivative(&self, text: &str) -> Result<SolveResult, SolveError> {
        let stage = SolveStage::Derivative;
        let target = extract::derivative_target(text)?;
        let f = self.parse(stage, &target.expr)?;
        let var = choose_variable(target.var, &f.free_symbols()).unwrap_or_else(|| "x".to_string());
        let df = self
            .engine
            .differentiate(&f, &var)
            .map_err(|e| SolveError::at(stage, e))?;

        Ok(SolveResult::solved(
            format!("f'({var}) = {df}"),
            vec![
                format!("Function: f({var}) = {f}"),
                format!("Derivative: f'({var}) = {df}"),
            ],
            df.to_string(),
            Confidence::DERIVATIVE,
        ))
    }

    fn integral(&self, text: &str) -> Result<SolveResult, SolveError> {
        let stage = SolveStage::Integral;
        let target = extract::integral_target(text)?;
        let f = self.parse(stage, &target.expr)?;
        let var = choose_variable(target.var, &f.free_symbols()).unwrap_or_else(|| "x".to_string());
        let antiderivative = self
            .engine
            .integrate(&f, &var)
            .map_err(|e| SolveError::at(stage, e))?;

        Ok(SolveResult::solved(
            format!("∫{f} d{var} = {antiderivative} + C"),
            vec![
                format!("Integral: ∫{f} d{var}"),
                format!("Solution: {antiderivative} + C"),
            ],
            antiderivative.to_string(),
            Confidence::INTEGRAL,
        ))
    }

    fn limit(&self, text: &str) -> Result<SolveResult, SolveError> {
        let stage = SolveStage::Limit;
        let parts = extract::limit_parts(text)?;
        let f = self.parse(stage, &parts.expr)?;
        let point = parse_limit_point(&parts.point).map_err(|e| SolveError::at(stage, e))?;
        let value = self
            .engine
            .limit(&f, &parts.var, &point)
            .map_err(|e| SolveError::at(stage, e))?;

        Ok(SolveResult::solved(
            value.to_string(),
            vec![
                format!("Limit: lim({}→{point}) {f}", parts.var),
                format!("Solution: {value}"),
            ],
            value.to_string(),
            Confidence::LIMIT,
        ))
    }

    fn equation(&self, text: &str) -> Result<SolveResult, SolveError> {
        let stage = SolveStage::Equation;
        let parts = extract::equation_sides(text)?;
        let lhs = self.parse(stage, &parts.lhs)?;
        let rhs = self.parse(stage, &parts.rhs)?;
        let rearranged = self.engine.simplify(&sub(lhs.clone(), rhs.clone()));

        let mut symbols = lhs.free_symbols();
        symbols.extend(rhs.free_symbols());
        let var = choose_variable(parts.var, &symbols).ok_or_else(|| {
            SolveError::at(
                stage,
                AlgebraError::NoSolution("the equation has no variable".to_string()),
            )
        })?;
        let roots = self
            .engine
            .solve(&lhs, &rhs, &var)
            .map_err(|e| SolveError::at(stage, e))?;

        let listed: Vec<String> = roots.iter().map(ToString::to_string).collect();
        let solution = format!("{var} = {}", listed.join(", "));
        Ok(SolveResult::solved(
            solution.clone(),
            vec![
                format!("Given equation: {} = {}", parts.lhs, parts.rhs),
                format!("Rearranged: {rearranged} = 0"),
                format!("Solution(s): {solution}"),
            ],
            solution,
            Confidence::EQUATION,
        ))
    }

    fn arithmetic(&self, text: &str) -> Result<SolveResult, SolveError> {
        let stage = SolveStage::Arithmetic;
        let body = extract::strip_prefixes(text, stage)?;
        let expr = self.parse(stage, &body)?;
        let value = if expr.free_symbols().is_empty() {
            self.engine
                .evaluate(&expr)
                .map_err(|e| SolveError::at(stage, e))?
                .to_decimal_string()
        } else {
            self.engine.simplify(&expr).to_string()
        };

        Ok(SolveResult::solved(
            value.clone(),
            vec![format!("Expression: {body}"), format!("Result: {value}")],
            value,
            Confidence::ARITHMETIC,
        ))
    }
}

impl Solver for SolverDispatcher {
    fn solve(&self, normalized: &str) -> Result<SolveResult, SolveError> {
        self.dispatch(classify(normalized), normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultSource;

    fn solve(text: &str) -> Result<SolveResult, SolveError> {
        SolverDispatcher::new().solve(text)
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify("derivative of x = 3"), ProblemKind::Derivative);
        assert_eq!(classify("d/dx x**2"), ProblemKind::Derivative);
        assert_eq!(classify("integral of the limit"), ProblemKind::Integral);
        assert_eq!(classify("∫ x dx"), ProblemKind::Integral);
        assert_eq!(classify("LIMIT of 1/x as x -> oo"), ProblemKind::Limit);
        assert_eq!(classify("x**2 = 4"), ProblemKind::Equation);
        assert_eq!(classify("2+2"), ProblemKind::ArithmeticEvaluation);
        assert_eq!(classify("sqrt(16)"), ProblemKind::Unclassified);
    }

    #[test]
    fn test_derivative() {
        let r = solve("derivative of x**2").unwrap();
        assert_eq!(r.solution, "2*x");
        assert_eq!(r.answer, "f'(x) = 2*x");
        assert_eq!(r.steps, vec!["Function: f(x) = x**2", "Derivative: f'(x) = 2*x"]);
        assert_eq!(r.confidence, Confidence::DERIVATIVE);
        assert_eq!(r.source, ResultSource::Solver);
    }

    #[test]
    fn test_derivative_picks_the_only_variable() {
        let r = solve("differentiate t**3").unwrap();
        assert_eq!(r.solution, "3*t**2");
        assert_eq!(r.answer, "f'(t) = 3*t**2");
    }

    #[test]
    fn test_integral_keeps_constant_out_of_solution() {
        let r = solve("integrate x").unwrap();
        assert_eq!(r.solution, "x**2/2");
        assert_eq!(r.answer, "∫x dx = x**2/2 + C");
        assert_eq!(r.confidence, Confidence::INTEGRAL);
    }

    #[test]
    fn test_limit() {
        let r = solve("limit of sin(x)/x as x -> 0").unwrap();
        assert_eq!(r.solution, "1");
        assert_eq!(r.steps[0], "Limit: lim(x→0) sin(x)/x");
        assert_eq!(r.confidence, Confidence::LIMIT);
    }

    #[test]
    fn test_limit_without_clause_is_a_parse_error() {
        let err = solve("limit of 1/x").unwrap_err();
        assert_eq!(err.stage(), Some(SolveStage::Limit));
    }

    #[test]
    fn test_equation_single_root() {
        let r = solve("x + 2 = 5").unwrap();
        assert_eq!(r.solution, "x = 3");
        assert_eq!(r.steps[1], "Rearranged: x - 3 = 0");
        assert_eq!(r.confidence, Confidence::EQUATION);
    }

    #[test]
    fn test_equation_reports_all_roots_in_engine_order() {
        let r = solve("x**2 - 5*x + 6 = 0").unwrap();
        assert_eq!(r.solution, "x = 2, 3");
    }

    #[test]
    fn test_equation_without_variable_fails() {
        let err = solve("2 = 3").unwrap_err();
        assert_eq!(err.stage(), Some(SolveStage::Equation));
    }

    #[test]
    fn test_arithmetic() {
        let r = solve("2+2").unwrap();
        assert_eq!(r.solution, "4");
        assert_eq!(r.steps, vec!["Expression: 2+2", "Result: 4"]);
        assert_eq!(r.confidence, Confidence::ARITHMETIC);

        assert_eq!(solve("what is 1/4").unwrap().solution, "0.25");
    }

    #[test]
    fn test_arithmetic_with_symbols_simplifies() {
        assert_eq!(solve("x + x").unwrap().solution, "2*x");
    }

    #[test]
    fn test_unclassified_is_unsupported() {
        let err = solve("hello").unwrap_err();
        assert!(matches!(err, SolveError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_parse_failure_carries_stage() {
        let err = solve("derivative of )(").unwrap_err();
        assert!(matches!(
            err,
            SolveError::Parse {
                stage: SolveStage::Derivative,
                ..
            }
        ));
    }
}
