//! # mathroute - confidence-gated routing for math questions
//!
//! mathroute answers free-form math questions by running them through a
//! fixed cascade of solving strategies and returning one structured,
//! confidence-scored result per question.
//!
//! ## Core Concepts
//!
//! - **Guardrail**: admits math questions, rejects everything else, and
//!   strips hedging phrases from outgoing answers
//! - **Normalizer**: rewrites question text into a canonical expression form
//! - **Solver dispatcher**: classifies a question (derivative, integral,
//!   limit, equation, arithmetic) and solves it symbolically
//! - **Cascade**: knowledge base, optional generative stages, solver,
//!   identity table, fallback; the first acceptable answer wins
//! - **Confidence**: each stage attaches a score in `[0, 1]` used for gating
//!
//! ## Usage
//!
//! ```rust
//! use mathroute::{Confidence, ResultSource, Router};
//!
//! let router = Router::new()?;
//!
//! let result = router.route("solve x + 2 = 5");
//! assert_eq!(result.solution, "x = 3");
//! assert_eq!(result.confidence, Confidence::EQUATION);
//! assert_eq!(result.source, ResultSource::Solver);
//!
//! let rejected = router.route("what is the weather today");
//! assert_eq!(rejected.source, ResultSource::None);
//! # Ok::<(), mathroute::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod confidence;
pub mod config;
pub mod error;
pub mod result;

// Text processing
pub mod guardrail;
pub mod normalize;

// Solving
pub mod algebra;
pub mod identity;
pub mod solver;
pub mod verify;

// Collaborators and routing
pub mod collaborators;
pub mod embedding;
pub mod router;
pub mod trace;

// Re-export primary types at crate root for convenience
pub use collaborators::{
    CollaboratorGuard, GeneratedAnswer, InMemoryKnowledgeBase, KbHit, KnowledgeBase,
    LanguageModel, WebSearch,
};
pub use confidence::Confidence;
pub use config::{GuardrailConfig, RouterConfig};
pub use error::{AlgebraError, CollaboratorError, ConfigError, ErrorKind, SolveError, SolveStage};
pub use guardrail::GuardrailValidator;
pub use identity::{IdentityEntry, IdentityTable};
pub use normalize::normalize;
pub use result::{ResultSource, SolveResult, ValidationVerdict};
pub use router::{RouteOutcome, Router, RouterBuilder, FALLBACK_MESSAGE};
pub use solver::{classify, ProblemKind, Solver, SolverDispatcher};
pub use trace::{RequestId, RouteTrace, Stage, StageOutcome, StageRecord};
pub use verify::AnswerVerifier;
