//! The routing cascade.
//!
//! `Router::route` is the only entry point the boundary layer needs. It is
//! total: every input, including empty and non-math text, yields exactly one
//! well-formed `SolveResult`. Stages run in a fixed order and each at most
//! once:
//!
//! 1. guardrail admission (rejection ends the request),
//! 2. knowledge base, accepted strictly above `kb_threshold`,
//! 3. web search + generation, when configured,
//! 4. direct language model, when configured, verified advisorily,
//! 5. symbolic solver dispatcher,
//! 6. static identity table,
//! 7. terminal fallback.
//!
//! Collaborator failures are logged and treated as absence.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algebra::{AlgebraEngine, SymbolicEngine};
use crate::collaborators::{
    CollaboratorGuard, GeneratedAnswer, KnowledgeBase, LanguageModel, WebSearch,
};
use crate::confidence::Confidence;
use crate::config::RouterConfig;
use crate::error::{CollaboratorError, ConfigError, ErrorKind};
use crate::guardrail::GuardrailValidator;
use crate::identity::IdentityTable;
use crate::normalize::normalize;
use crate::result::{ResultSource, SolveResult, ValidationVerdict};
use crate::solver::{Solver, SolverDispatcher};
use crate::trace::{RouteTrace, Stage, StageOutcome};
use crate::verify::AnswerVerifier;

/// Answer when no stage could handle the question.
pub const FALLBACK_MESSAGE: &str =
    "I couldn't find a solution. Please try rephrasing your question or provide more context.";

const FALLBACK_STEP: &str = "No suitable method found to solve this question.";
const REJECTED_STEP: &str = "Input validation failed.";

/// A result together with the trace of how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    /// The routed answer.
    pub result: SolveResult,
    /// Stages attempted for it.
    pub trace: RouteTrace,
}

/// Builder for `Router`.
///
/// Everything except the configuration is optional: without collaborators
/// the cascade is guardrail, solver, identity table, fallback.
#[derive(Default)]
pub struct RouterBuilder {
    config: RouterConfig,
    knowledge_base: Option<Arc<dyn KnowledgeBase>>,
    web_search: Option<Arc<dyn WebSearch>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    engine: Option<Arc<dyn AlgebraEngine>>,
    solver: Option<Arc<dyn Solver>>,
    identities: Option<IdentityTable>,
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("config", &self.config)
            .field("knowledge_base", &self.knowledge_base.is_some())
            .field("web_search", &self.web_search.is_some())
            .field("language_model", &self.language_model.is_some())
            .finish_non_exhaustive()
    }
}

impl RouterBuilder {
    /// Starts from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the knowledge-base collaborator.
    #[must_use]
    pub fn knowledge_base(mut self, kb: Arc<dyn KnowledgeBase>) -> Self {
        self.knowledge_base = Some(kb);
        self
    }

    /// Enables the web search + generation stage.
    #[must_use]
    pub fn web_search(mut self, web: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(web);
        self
    }

    /// Enables the direct language-model stage.
    #[must_use]
    pub fn language_model(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(llm);
        self
    }

    /// Sets the algebra engine used by the default dispatcher and verifier.
    #[must_use]
    pub fn engine(mut self, engine: Arc<dyn AlgebraEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Replaces the solver stage entirely.
    #[must_use]
    pub fn solver(mut self, solver: Arc<dyn Solver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Uses this identity table instead of the configured or bundled one.
    #[must_use]
    pub fn identity_table(mut self, table: IdentityTable) -> Self {
        self.identities = Some(table);
        self
    }

    /// Validates the configuration and assembles the router.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for invalid settings, an unreadable identity
    /// table, or guardrail lists that do not compile.
    pub fn build(self) -> Result<Router, ConfigError> {
        self.config.validate()?;
        let guardrail = GuardrailValidator::new(&self.config.guardrail)?;
        let identities = match (self.identities, &self.config.identity_table) {
            (Some(table), _) => table,
            (None, Some(path)) => IdentityTable::load(path)?,
            (None, None) => IdentityTable::bundled()?,
        };
        let engine: Arc<dyn AlgebraEngine> = self
            .engine
            .unwrap_or_else(|| Arc::new(SymbolicEngine::new()));
        let solver = self
            .solver
            .unwrap_or_else(|| Arc::new(SolverDispatcher::with_engine(Arc::clone(&engine))));

        Ok(Router {
            guard: CollaboratorGuard::new(self.config.collaborator_timeout()),
            config: self.config,
            guardrail,
            solver,
            verifier: AnswerVerifier::with_engine(engine),
            identities,
            knowledge_base: self.knowledge_base,
            web_search: self.web_search,
            language_model: self.language_model,
        })
    }
}

/// The confidence-gated routing cascade.
///
/// Holds only read-only state after construction; share it across threads
/// behind an `Arc`.
///
/// # Examples
///
/// ```
/// use mathroute::{ResultSource, Router};
///
/// let router = Router::new().unwrap();
/// let result = router.route("derivative of x^2");
/// assert_eq!(result.solution, "2*x");
/// assert_eq!(result.source, ResultSource::Solver);
/// ```
pub struct Router {
    config: RouterConfig,
    guardrail: GuardrailValidator,
    solver: Arc<dyn Solver>,
    verifier: AnswerVerifier,
    identities: IdentityTable,
    knowledge_base: Option<Arc<dyn KnowledgeBase>>,
    web_search: Option<Arc<dyn WebSearch>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    guard: CollaboratorGuard,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("identities", &self.identities.len())
            .field("knowledge_base", &self.knowledge_base.is_some())
            .field("web_search", &self.web_search.is_some())
            .field("language_model", &self.language_model.is_some())
            .finish_non_exhaustive()
    }
}

fn unavailable(stage: Stage, err: &CollaboratorError) -> StageOutcome {
    warn!(stage = %stage, error = %err, "collaborator unavailable");
    StageOutcome::Failed {
        kind: err.kind(),
        message: err.to_string(),
    }
}

impl Router {
    /// Router with the default configuration and no collaborators.
    ///
    /// # Errors
    ///
    /// Only if the bundled defaults are malformed.
    pub fn new() -> Result<Self, ConfigError> {
        RouterBuilder::new().build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Guardrail admission check, usable without routing.
    #[must_use]
    pub fn validate_input(&self, question: &str) -> bool {
        self.guardrail.is_admitted(question)
    }

    /// Full guardrail verdict, including the rejection message.
    #[must_use]
    pub fn validate(&self, question: &str) -> ValidationVerdict {
        self.guardrail.validate(question)
    }

    /// Output sanitization, usable without routing.
    #[must_use]
    pub fn sanitize_output(&self, text: &str) -> String {
        self.guardrail.sanitize(text)
    }

    /// Answers a question.
    #[must_use]
    pub fn route(&self, question: &str) -> SolveResult {
        self.route_with_trace(question).result
    }

    /// Answers a question and reports the stages attempted.
    #[must_use]
    pub fn route_with_trace(&self, question: &str) -> RouteOutcome {
        let normalized = normalize(question);
        let mut trace = RouteTrace::new(normalized.clone());
        let request_id = trace.request_id;
        debug!(%request_id, normalized = %normalized, "routing question");

        let verdict = self.guardrail.validate(question);
        if !verdict.admitted {
            let message = verdict
                .message
                .unwrap_or_else(|| self.guardrail.rejection_message().to_string());
            info!(%request_id, "question rejected by guardrail");
            trace.record(
                Stage::Guardrail,
                StageOutcome::Failed {
                    kind: ErrorKind::RejectedInput,
                    message: message.clone(),
                },
            );
            return RouteOutcome {
                result: SolveResult::terminal(message, REJECTED_STEP),
                trace,
            };
        }
        trace.record(Stage::Guardrail, StageOutcome::Passed);

        let result = self
            .knowledge_base_stage(&normalized, &mut trace)
            .or_else(|| self.web_search_stage(question, &mut trace))
            .or_else(|| self.language_model_stage(question, &normalized, &mut trace))
            .or_else(|| self.solver_stage(&normalized, &mut trace))
            .or_else(|| self.identity_stage(&normalized, &mut trace))
            .unwrap_or_else(|| {
                warn!(%request_id, "all routing stages failed");
                trace.record(
                    Stage::Fallback,
                    StageOutcome::Accepted {
                        confidence: Confidence::ZERO,
                    },
                );
                SolveResult::terminal(FALLBACK_MESSAGE, FALLBACK_STEP)
            });

        info!(
            %request_id,
            source = %result.source,
            confidence = result.confidence.value(),
            "question routed"
        );
        RouteOutcome { result, trace }
    }

    fn accept(&self, mut result: SolveResult, stage: Stage, trace: &mut RouteTrace) -> SolveResult {
        result.answer = self.guardrail.sanitize(&result.answer);
        debug!(
            request_id = %trace.request_id,
            stage = %stage,
            confidence = result.confidence.value(),
            "stage accepted"
        );
        trace.record(
            stage,
            StageOutcome::Accepted {
                confidence: result.confidence,
            },
        );
        result
    }

    fn knowledge_base_stage(&self, normalized: &str, trace: &mut RouteTrace) -> Option<SolveResult> {
        let kb = Arc::clone(self.knowledge_base.as_ref()?);
        let query = normalized.to_string();
        let outcome = match self.guard.call("knowledge_base", move || kb.search(&query)) {
            Ok(Some(hit)) if hit.confidence.exceeds(self.config.kb_threshold) => {
                let result = SolveResult {
                    answer: hit.answer,
                    steps: hit.steps,
                    solution: hit.solution,
                    confidence: hit.confidence,
                    source: ResultSource::KnowledgeBase,
                };
                return Some(self.accept(result, Stage::KnowledgeBase, trace));
            }
            Ok(Some(hit)) => {
                debug!(
                    confidence = hit.confidence.value(),
                    threshold = self.config.kb_threshold,
                    "knowledge-base hit below threshold"
                );
                StageOutcome::BelowThreshold {
                    confidence: hit.confidence,
                }
            }
            Ok(None) => StageOutcome::NoResult,
            Err(e) => unavailable(Stage::KnowledgeBase, &e),
        };
        trace.record(Stage::KnowledgeBase, outcome);
        None
    }

    fn web_search_stage(&self, question: &str, trace: &mut RouteTrace) -> Option<SolveResult> {
        let web = Arc::clone(self.web_search.as_ref()?);
        let query = question.to_string();
        let outcome = match self.guard.call("web_search", move || web.search_and_generate(&query)) {
            Ok(Some(generated))
                if generated.confidence.is_positive() && !generated.answer.trim().is_empty() =>
            {
                let result = generated_result(generated, ResultSource::WebSearch, None);
                return Some(self.accept(result, Stage::WebSearch, trace));
            }
            Ok(Some(generated)) => StageOutcome::BelowThreshold {
                confidence: generated.confidence,
            },
            Ok(None) => StageOutcome::NoResult,
            Err(e) => unavailable(Stage::WebSearch, &e),
        };
        trace.record(Stage::WebSearch, outcome);
        None
    }

    fn language_model_stage(
        &self,
        question: &str,
        normalized: &str,
        trace: &mut RouteTrace,
    ) -> Option<SolveResult> {
        let llm = Arc::clone(self.language_model.as_ref()?);
        let query = question.to_string();
        let generated = match self.guard.call("llm", move || llm.generate(&query)) {
            Ok(Some(generated)) if !generated.answer.trim().is_empty() => generated,
            Ok(_) => {
                trace.record(Stage::Llm, StageOutcome::NoResult);
                return None;
            }
            Err(e) => {
                trace.record(Stage::Llm, unavailable(Stage::Llm, &e));
                return None;
            }
        };

        let verified = (!generated.solution.trim().is_empty()
            && self.verifier.verify(normalized, &generated.solution))
            || self.verifier.verify(normalized, &generated.answer);
        debug!(request_id = %trace.request_id, verified, "language-model answer checked");

        if verified {
            let result = generated_result(generated, ResultSource::Llm, Some(Confidence::VERIFIED));
            return Some(self.accept(result, Stage::Llm, trace));
        }
        let mut result =
            generated_result(generated, ResultSource::Llm, Some(Confidence::UNVERIFIED));
        result.answer = self.guardrail.sanitize(&result.answer);
        trace.record(
            Stage::Llm,
            StageOutcome::Downgraded {
                confidence: result.confidence,
                kind: ErrorKind::VerificationFailed,
            },
        );
        Some(result)
    }

    fn solver_stage(&self, normalized: &str, trace: &mut RouteTrace) -> Option<SolveResult> {
        match self.solver.solve(normalized) {
            Ok(result) if result.confidence.is_positive() => {
                let result = result.with_source(ResultSource::Solver);
                Some(self.accept(result, Stage::Solver, trace))
            }
            Ok(result) => {
                trace.record(
                    Stage::Solver,
                    StageOutcome::BelowThreshold {
                        confidence: result.confidence,
                    },
                );
                None
            }
            Err(e) => {
                debug!(request_id = %trace.request_id, error = %e, "solver could not handle question");
                trace.record(
                    Stage::Solver,
                    StageOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                );
                None
            }
        }
    }

    fn identity_stage(&self, normalized: &str, trace: &mut RouteTrace) -> Option<SolveResult> {
        match self.identities.lookup(normalized) {
            Some(entry) => Some(self.accept(entry.to_result(), Stage::IdentityTable, trace)),
            None => {
                trace.record(Stage::IdentityTable, StageOutcome::NoResult);
                None
            }
        }
    }
}

fn generated_result(
    generated: GeneratedAnswer,
    source: ResultSource,
    confidence: Option<Confidence>,
) -> SolveResult {
    SolveResult {
        answer: generated.answer,
        steps: generated.steps,
        solution: generated.solution,
        confidence: confidence.unwrap_or(generated.confidence),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new().unwrap()
    }

    #[test]
    fn test_rejection_short_circuits() {
        let outcome = router().route_with_trace("what is the weather today");
        assert_eq!(outcome.result.source, ResultSource::None);
        assert_eq!(outcome.result.confidence, Confidence::ZERO);
        assert_eq!(outcome.trace.stage_order(), vec![Stage::Guardrail]);
        assert!(outcome.result.answer.contains("mathematics"));
    }

    #[test]
    fn test_solver_result() {
        let r = router().route("2+2");
        assert_eq!(r.solution, "4");
        assert_eq!(r.source, ResultSource::Solver);
    }

    #[test]
    fn test_fallback_is_terminal() {
        let outcome = router().route_with_trace("solve sqrt(16)");
        // Unclassified, no identity entry.
        assert_eq!(outcome.result.answer, FALLBACK_MESSAGE);
        assert_eq!(outcome.result.confidence, Confidence::ZERO);
        assert_eq!(
            outcome.trace.stage_order(),
            vec![Stage::Guardrail, Stage::Solver, Stage::IdentityTable, Stage::Fallback]
        );
    }

    #[test]
    fn test_guardrail_primitives() {
        let r = router();
        assert!(r.validate_input("x + 1 = 2"));
        assert!(!r.validate_input(""));
        assert_eq!(r.sanitize_output("I'm not sure  the answer is 4"), "the answer is 4");
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let config = RouterConfig {
            kb_threshold: 2.0,
            ..RouterConfig::default()
        };
        assert!(Router::builder().config(config).build().is_err());
    }
}
