//! Reference knowledge base held in memory.
//!
//! Entries are embedded once at load time; a search embeds the query and
//! returns the best cosine match whose score reaches `min_score`. The score
//! is reported as the hit's confidence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{KbHit, KnowledgeBase};
use crate::confidence::Confidence;
use crate::embedding::{cosine_similarity, lexical_embedding};
use crate::error::{CollaboratorError, ConfigError};
use crate::normalize::normalize;

/// Minimum similarity for a match.
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

/// Steps stored either as a list or as one newline-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Steps {
    /// One step per element.
    List(Vec<String>),
    /// One step per non-blank line.
    Text(String),
}

impl Default for Steps {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl Steps {
    /// The steps as a list, blank lines dropped.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::List(steps) => steps.clone(),
            Self::Text(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

fn default_topic() -> String {
    "General".to_string()
}

fn default_difficulty() -> String {
    "Unknown".to_string()
}

/// A stored solved question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbEntry {
    /// The question as originally asked.
    pub question: String,
    /// Answer text.
    pub answer: String,
    /// Explanation steps.
    #[serde(default)]
    pub steps: Steps,
    /// Solution text.
    #[serde(default)]
    pub solution: String,
    /// Subject area.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Difficulty label.
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

/// `KnowledgeBase` over a fixed list of entries.
#[derive(Debug, Clone)]
pub struct InMemoryKnowledgeBase {
    entries: Vec<(Vec<f32>, KbEntry)>,
    min_score: f32,
}

impl InMemoryKnowledgeBase {
    /// Indexes `entries`.
    #[must_use]
    pub fn new(entries: Vec<KbEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (lexical_embedding(&normalize(&e.question)), e))
            .collect();
        Self {
            entries,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Parses a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed JSON.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let entries: Vec<KbEntry> = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            format: "json",
            message: e.to_string(),
        })?;
        Ok(Self::new(entries))
    }

    /// Reads a JSON array of entries from disk.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Parse`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let kb = Self::from_json_str(&text)?;
        debug!(path = %path.display(), entries = kb.len(), "loaded knowledge base");
        Ok(kb)
    }

    /// Sets the minimum similarity for a match.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` outside `[0, 1]`.
    pub fn with_min_score(mut self, min_score: f32) -> Result<Self, ConfigError> {
        if min_score.is_nan() || !(0.0..=1.0).contains(&min_score) {
            return Err(ConfigError::invalid(
                "min_score",
                format!("{min_score} is outside [0, 1]"),
            ));
        }
        self.min_score = min_score;
        Ok(self)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KnowledgeBase for InMemoryKnowledgeBase {
    fn search(&self, text: &str) -> Result<Option<KbHit>, CollaboratorError> {
        let query = lexical_embedding(&normalize(text));
        let best = self
            .entries
            .iter()
            .map(|(embedding, entry)| (cosine_similarity(&query, embedding), entry))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        let Some((score, entry)) = best else {
            return Ok(None);
        };
        if score < self.min_score {
            debug!(score, min_score = self.min_score, "no knowledge-base match");
            return Ok(None);
        }
        Ok(Some(KbHit {
            answer: entry.answer.clone(),
            steps: entry.steps.to_vec(),
            solution: entry.solution.clone(),
            confidence: Confidence::saturating(score),
            topic: entry.topic.clone(),
            difficulty: entry.difficulty.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KB: &str = r#"[
        {
            "question": "What is the derivative of sin(x)?",
            "answer": "The derivative of sin(x) is cos(x).",
            "steps": ["d/dx sin(x) = cos(x)"],
            "solution": "cos(x)",
            "topic": "Calculus",
            "difficulty": "Easy"
        },
        {
            "question": "What is the sum of the interior angles of a triangle?",
            "answer": "180 degrees",
            "steps": "Angles of a triangle sum to a straight angle.\n\nSo the sum is 180 degrees.",
            "solution": "180"
        }
    ]"#;

    #[test]
    fn test_exact_question_matches_with_full_score() {
        let kb = InMemoryKnowledgeBase::from_json_str(KB).unwrap();
        let hit = kb.search("what is the derivative of sin(x)").unwrap().unwrap();
        assert_eq!(hit.solution, "cos(x)");
        assert!(hit.confidence.value() > 0.99);
        assert_eq!(hit.topic, "Calculus");
    }

    #[test]
    fn test_text_steps_and_defaults() {
        let kb = InMemoryKnowledgeBase::from_json_str(KB).unwrap();
        let hit = kb
            .search("What is the sum of the interior angles of a triangle?")
            .unwrap()
            .unwrap();
        assert_eq!(hit.steps.len(), 2);
        assert_eq!(hit.topic, "General");
        assert_eq!(hit.difficulty, "Unknown");
    }

    #[test]
    fn test_unrelated_question_misses() {
        let kb = InMemoryKnowledgeBase::from_json_str(KB).unwrap();
        assert!(kb.search("integrate 7*q**5").unwrap().is_none());
        assert!(InMemoryKnowledgeBase::new(Vec::new()).search("x").unwrap().is_none());
    }

    #[test]
    fn test_min_score_is_validated() {
        let kb = InMemoryKnowledgeBase::new(Vec::new());
        assert!(kb.clone().with_min_score(1.5).is_err());
        assert!(kb.with_min_score(0.9).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KB.as_bytes()).unwrap();
        let kb = InMemoryKnowledgeBase::load(file.path()).unwrap();
        assert_eq!(kb.len(), 2);
    }
}
