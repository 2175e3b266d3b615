//! Per-request route traces.
//!
//! A trace records every cascade stage that was attempted and how it ended.
//! It is returned alongside the result by `Router::route_with_trace` and is
//! the observable record of the cascade order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confidence::Confidence;
use crate::error::ErrorKind;

/// Unique identifier for a routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cascade stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input admission.
    Guardrail,
    /// Knowledge-base lookup.
    KnowledgeBase,
    /// Web search + generation.
    WebSearch,
    /// Direct language-model query.
    Llm,
    /// Symbolic solver dispatcher.
    Solver,
    /// Static identity overrides.
    IdentityTable,
    /// Terminal "no solution" result.
    Fallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Guardrail => "guardrail",
            Self::KnowledgeBase => "knowledge_base",
            Self::WebSearch => "web_search",
            Self::Llm => "llm",
            Self::Solver => "solver",
            Self::IdentityTable => "identity_table",
            Self::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// How an attempted stage ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The guardrail admitted the question.
    Passed,
    /// The stage produced the returned result.
    Accepted {
        /// Confidence of the returned result.
        confidence: Confidence,
    },
    /// The stage produced the returned result, but it failed verification.
    Downgraded {
        /// Reduced confidence.
        confidence: Confidence,
        /// Always `VerificationFailed`.
        kind: ErrorKind,
    },
    /// The stage answered, but not confidently enough.
    BelowThreshold {
        /// Confidence that failed the gate.
        confidence: Confidence,
    },
    /// The stage had nothing to offer.
    NoResult,
    /// The stage failed.
    Failed {
        /// Error discriminant.
        kind: ErrorKind,
        /// Internal message; never shown to the end user.
        message: String,
    },
}

impl StageOutcome {
    /// Returns true if this stage produced the final result.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. } | Self::Downgraded { .. })
    }

    /// Error discriminant, if the stage failed or was downgraded.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { kind, .. } | Self::Downgraded { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// One attempted stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Which stage.
    pub stage: Stage,
    /// How it ended.
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// The record of one `route` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTrace {
    /// Request identifier, also attached to log lines.
    pub request_id: RequestId,
    /// When routing started.
    pub started_at: DateTime<Utc>,
    /// The normalized question.
    pub normalized: String,
    /// Attempted stages in order.
    pub stages: Vec<StageRecord>,
}

impl RouteTrace {
    /// Starts a trace for a normalized question.
    #[must_use]
    pub fn new(normalized: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            started_at: Utc::now(),
            normalized: normalized.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage record.
    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push(StageRecord { stage, outcome });
    }

    /// Returns true if `stage` was attempted.
    #[must_use]
    pub fn attempted(&self, stage: Stage) -> bool {
        self.stages.iter().any(|r| r.stage == stage)
    }

    /// Outcome of `stage`, if it was attempted.
    #[must_use]
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// The stage that produced the result.
    #[must_use]
    pub fn accepted_stage(&self) -> Option<Stage> {
        self.stages
            .iter()
            .find(|r| r.outcome.is_accepted())
            .map(|r| r.stage)
    }

    /// Attempted stages in order.
    #[must_use]
    pub fn stage_order(&self) -> Vec<Stage> {
        self.stages.iter().map(|r| r.stage).collect()
    }
}
