//! Post-hoc answer verification.
//!
//! Verification is advisory. A failed check lowers the confidence the router
//! reports for a generated answer; it never suppresses the answer.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::algebra::{expand, sub, substitute, AlgebraEngine, Expr, SymbolicEngine};
use crate::error::{AlgebraError, AlgebraResult, SolveStage};
use crate::normalize::normalize;
use crate::solver::{classify, strip_prefixes, ProblemKind};

/// Numeric residue below which a difference counts as zero.
const RESIDUE_TOLERANCE: f64 = 1e-9;

/// Re-checks a proposed answer against the question it answers.
#[derive(Clone)]
pub struct AnswerVerifier {
    engine: Arc<dyn AlgebraEngine>,
}

impl fmt::Debug for AnswerVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerVerifier").finish_non_exhaustive()
    }
}

impl Default for AnswerVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// `x = 2, 3` split into the variable and its root texts.
fn root_list(answer: &str) -> Option<(&str, Vec<&str>)> {
    let (var, roots) = answer.split_once('=')?;
    let var = var.trim();
    let mut chars = var.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {}
        _ => return None,
    }
    Some((var, roots.split(',').map(str::trim).collect()))
}

impl AnswerVerifier {
    /// Verifier over the built-in `SymbolicEngine`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(Arc::new(SymbolicEngine::new()))
    }

    /// Verifier over a custom engine.
    #[must_use]
    pub fn with_engine(engine: Arc<dyn AlgebraEngine>) -> Self {
        Self { engine }
    }

    /// Returns true if `answer` checks out against `question`.
    ///
    /// Limit questions are not checked and always pass. Otherwise the left
    /// side of the question (the whole expression when there is no `=`) must
    /// equal the answer. An answer of the form `x = r1, r2` to an equation is
    /// checked by substituting every root. Unparseable text fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use mathroute::AnswerVerifier;
    ///
    /// let verifier = AnswerVerifier::new();
    /// assert!(verifier.verify("2+2", "4"));
    /// assert!(verifier.verify("x**2 = 4", "x = -2, 2"));
    /// assert!(!verifier.verify("2+2", "5"));
    /// ```
    #[must_use]
    pub fn verify(&self, question: &str, answer: &str) -> bool {
        let normalized = normalize(question);
        if classify(&normalized) == ProblemKind::Limit {
            debug!("limit answers are not verified");
            return true;
        }
        match self.check(&normalized, answer) {
            Ok(verified) => verified,
            Err(e) => {
                debug!(error = %e, "verification could not parse its input");
                false
            }
        }
    }

    fn check(&self, normalized: &str, answer: &str) -> AlgebraResult<bool> {
        let answer = normalize(answer);
        let (lhs_text, rhs_text) = match normalized.split_once('=') {
            Some((l, r)) => (l, Some(r)),
            None => (normalized, None),
        };
        let lhs_text = strip_prefixes(lhs_text, SolveStage::Equation)
            .map_err(|e| AlgebraError::parse(0, e.to_string()))?;
        let lhs = self.engine.parse(&lhs_text)?;

        if let (Some(rhs_text), Some((var, roots))) = (rhs_text, root_list(&answer)) {
            let rhs = self.engine.parse(rhs_text)?;
            let difference = sub(lhs, rhs);
            for root in roots {
                let value = self.engine.parse(root)?;
                if !self.vanishes(&substitute(&difference, var, &value)) {
                    return Ok(false);
                }
            }
            return Ok(true);
        }

        let candidate = self.engine.parse(&answer)?;
        Ok(self.vanishes(&sub(lhs, candidate)))
    }

    fn vanishes(&self, e: &Expr) -> bool {
        let reduced = self.engine.simplify(&expand(e));
        if reduced.is_zero() {
            return true;
        }
        reduced.free_symbols().is_empty()
            && self
                .engine
                .evaluate(&reduced)
                .is_ok_and(|n| n.to_f64().abs() < RESIDUE_TOLERANCE)
    }
}
