//! External collaborators consumed by the router.
//!
//! The knowledge base, web search and language model are injected as trait
//! objects. The router never calls them directly: every call goes through
//! `CollaboratorGuard`, so a slow, failing or panicking collaborator only
//! costs its own stage.

mod guard;
mod memory;

pub use guard::CollaboratorGuard;
pub use memory::{InMemoryKnowledgeBase, KbEntry, Steps, DEFAULT_MIN_SCORE};

use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::error::CollaboratorError;

/// A knowledge-base match. Owned by the collaborator; the router only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbHit {
    /// Stored answer.
    pub answer: String,
    /// Stored explanation steps.
    pub steps: Vec<String>,
    /// Stored solution text.
    pub solution: String,
    /// Match score.
    pub confidence: Confidence,
    /// Subject area, e.g. `Calculus`.
    pub topic: String,
    /// Difficulty label.
    pub difficulty: String,
}

/// Output of a generative collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    /// Full answer text.
    pub answer: String,
    /// Explanation steps.
    pub steps: Vec<String>,
    /// Final solution line.
    pub solution: String,
    /// Self-reported confidence.
    pub confidence: Confidence,
}

/// Similarity search over stored solved questions.
pub trait KnowledgeBase: Send + Sync {
    /// Best match for `text`, or `None` when nothing is close enough.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` on infrastructure failure.
    fn search(&self, text: &str) -> Result<Option<KbHit>, CollaboratorError>;
}

/// Web search followed by answer generation over the retrieved context.
pub trait WebSearch: Send + Sync {
    /// Generated answer, or `None` when the sources are insufficient.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` on transport failure.
    fn search_and_generate(&self, text: &str) -> Result<Option<GeneratedAnswer>, CollaboratorError>;
}

/// Direct language-model query.
pub trait LanguageModel: Send + Sync {
    /// Generated answer, or `None` when the model declines.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` on transport failure.
    fn generate(&self, question: &str) -> Result<Option<GeneratedAnswer>, CollaboratorError>;
}
