//! Error types for mathroute.
//!
//! Every component reports failures through its own strongly typed error.
//! None of them escape `Router::route`: the router converts each one into a
//! zero-confidence `SolveResult` and records its `ErrorKind` in the trace.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error discriminant recorded in route traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The guardrail vetoed the question.
    RejectedInput,
    /// Text could not be interpreted as an expression.
    ParseError,
    /// No sub-solver handles the question.
    UnsupportedOperation,
    /// A collaborator timed out or failed.
    CollaboratorUnavailable,
    /// A proposed answer did not survive re-checking.
    VerificationFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RejectedInput => write!(f, "rejected_input"),
            Self::ParseError => write!(f, "parse_error"),
            Self::UnsupportedOperation => write!(f, "unsupported_operation"),
            Self::CollaboratorUnavailable => write!(f, "collaborator_unavailable"),
            Self::VerificationFailed => write!(f, "verification_failed"),
        }
    }
}

/// Errors raised by the algebra engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlgebraError {
    /// Malformed input text.
    #[error("parse error at {position}: {message}")]
    Parse {
        /// Byte offset of the offending token.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// A multi-letter name that is neither a function nor a constant.
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// The operation is outside the engine's rules.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Division by an exact zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The equation or limit has no value.
    #[error("no solution: {0}")]
    NoSolution(String),

    /// Numeric evaluation produced infinity or NaN.
    #[error("result is not a finite number")]
    NotFinite,
}

impl AlgebraError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Creates an unsupported-operation error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Returns true if the input text could not be read at all.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::UnknownIdentifier(_))
    }
}

/// Which sub-solver (or the classifier) produced a `SolveError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStage {
    /// Problem classification.
    Classify,
    /// Derivative sub-solver.
    Derivative,
    /// Integral sub-solver.
    Integral,
    /// Limit sub-solver.
    Limit,
    /// Equation sub-solver.
    Equation,
    /// Arithmetic evaluation.
    Arithmetic,
}

impl fmt::Display for SolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classify => write!(f, "classify"),
            Self::Derivative => write!(f, "derivative"),
            Self::Integral => write!(f, "integral"),
            Self::Limit => write!(f, "limit"),
            Self::Equation => write!(f, "equation"),
            Self::Arithmetic => write!(f, "arithmetic"),
        }
    }
}

/// Errors produced at the sub-solver boundary of the dispatcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// The question text could not be read as an expression.
    #[error("{stage} parse error: {message}")]
    Parse {
        /// Failing sub-solver.
        stage: SolveStage,
        /// Underlying message.
        message: String,
    },

    /// The engine could not carry out the operation.
    #[error("{stage} error: {message}")]
    Algebra {
        /// Failing sub-solver.
        stage: SolveStage,
        /// Underlying message.
        message: String,
    },

    /// No sub-solver handles the question.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl SolveError {
    /// Wraps an engine error with the stage that hit it.
    #[must_use]
    pub fn at(stage: SolveStage, err: AlgebraError) -> Self {
        if err.is_parse() {
            Self::Parse {
                stage,
                message: err.to_string(),
            }
        } else {
            Self::Algebra {
                stage,
                message: err.to_string(),
            }
        }
    }

    /// Creates a parse error for a stage without an engine error behind it.
    #[must_use]
    pub fn parse(stage: SolveStage, message: impl Into<String>) -> Self {
        Self::Parse {
            stage,
            message: message.into(),
        }
    }

    /// Returns the stage that failed, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<SolveStage> {
        match self {
            Self::Parse { stage, .. } | Self::Algebra { stage, .. } => Some(*stage),
            Self::UnsupportedOperation(_) => None,
        }
    }

    /// Returns the trace discriminant for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } | Self::Algebra { .. } => ErrorKind::ParseError,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
        }
    }
}

/// Failures of an external collaborator (knowledge base, web search, LLM).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// No answer within the configured timeout.
    #[error("{collaborator} timed out after {timeout_ms}ms")]
    Timeout {
        /// Collaborator name.
        collaborator: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Transport failure or a crash inside the collaborator.
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        /// Collaborator name.
        collaborator: String,
        /// Failure description.
        message: String,
    },
}

impl CollaboratorError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Returns true if the collaborator did not answer in time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Always `CollaboratorUnavailable`.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::CollaboratorUnavailable
    }
}

/// A confidence value outside `[0.0, 1.0]` (or NaN).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("confidence value {value} is out of range [0.0, 1.0]")]
pub struct ConfidenceOutOfRange {
    /// The rejected value.
    pub value: f32,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file contents are malformed.
    #[error("failed to parse {format}: {message}")]
    Parse {
        /// `toml` or `json`.
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// A field is out of range.
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for engine operations.
pub type AlgebraResult<T> = Result<T, AlgebraError>;
