//! `SolveResult`, the structured response every route produces.
//!
//! A result is produced by exactly one cascade stage and is immutable once
//! returned. All fields are always present; `source` names the stage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;

/// Which cascade stage produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    /// Knowledge-base hit above the threshold.
    KnowledgeBase,
    /// Web search + generation (optional stage).
    WebSearch,
    /// Direct language-model answer (optional stage).
    Llm,
    /// Symbolic solver dispatcher.
    Solver,
    /// Static identity override.
    IdentityTable,
    /// Guardrail rejection or exhausted cascade.
    None,
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KnowledgeBase => write!(f, "knowledge_base"),
            Self::WebSearch => write!(f, "web_search"),
            Self::Llm => write!(f, "llm"),
            Self::Solver => write!(f, "solver"),
            Self::IdentityTable => write!(f, "identity_table"),
            Self::None => write!(f, "none"),
        }
    }
}

/// The answer to one routed question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    /// Human-readable answer.
    pub answer: String,
    /// Ordered explanation steps.
    pub steps: Vec<String>,
    /// Machine-oriented solution text (e.g. `2*x`, `x = 3`).
    pub solution: String,
    /// Stage confidence.
    pub confidence: Confidence,
    /// Producing stage.
    pub source: ResultSource,
}

impl SolveResult {
    /// Creates a result attributed to the solver stage.
    #[must_use]
    pub fn solved(
        answer: impl Into<String>,
        steps: Vec<String>,
        solution: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            answer: answer.into(),
            steps,
            solution: solution.into(),
            confidence,
            source: ResultSource::Solver,
        }
    }

    /// Creates a zero-confidence terminal result.
    #[must_use]
    pub fn terminal(answer: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            steps: vec![step.into()],
            solution: String::new(),
            confidence: Confidence::ZERO,
            source: ResultSource::None,
        }
    }

    /// Re-attributes the result to another stage.
    #[must_use]
    pub fn with_source(mut self, source: ResultSource) -> Self {
        self.source = source;
        self
    }

    /// Replaces the confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Returns true if the result carries an answer a caller can use.
    #[must_use]
    pub fn is_answer(&self) -> bool {
        self.source != ResultSource::None && self.confidence.is_positive()
    }
}

/// Admit/reject decision of the guardrail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Whether the question is admitted.
    pub admitted: bool,

    /// Rejection message; `None` when admitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationVerdict {
    /// Admits the question.
    #[must_use]
    pub const fn admit() -> Self {
        Self {
            admitted: true,
            message: None,
        }
    }

    /// Rejects the question with a user-facing message.
    #[must_use]
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            admitted: false,
            message: Some(message.into()),
        }
    }
}
