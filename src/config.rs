//! Router configuration.
//!
//! Configuration is plain data loaded once at startup (TOML) and read-only
//! afterwards. Every field has a default so an empty file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default knowledge-base acceptance threshold (strictly greater than).
pub const DEFAULT_KB_THRESHOLD: f32 = 0.85;

/// Default per-collaborator timeout.
pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 10_000;

/// Default minimum trimmed question length.
pub const DEFAULT_MIN_LENGTH: usize = 2;

const MATH_KEYWORDS: &[&str] = &[
    "solve",
    "equation",
    "expression",
    "function",
    "derivative",
    "differentiate",
    "integral",
    "integrate",
    "limit",
    "matrix",
    "vector",
    "polynomial",
    "quadratic",
    "linear",
    "graph",
    "plot",
    "calculate",
    "compute",
    "evaluate",
    "simplify",
    "expand",
    "factor",
    "trigonometry",
    "algebra",
    "calculus",
    "geometry",
    "probability",
    "statistics",
    "logarithm",
    "exponential",
    "series",
    "sequence",
    "theorem",
    "laplace",
    "fourier",
    "differential",
];

const BANNED_TOPICS: &[&str] = &[
    "kill", "murder", "violence", "harm", "weapon", "drug", "illegal", "political", "election",
    "religion", "religious", "race", "gender", "sex", "porn", "adult",
];

const HALLUCINATION_MARKERS: &[&str] = &[
    "I'm not sure",
    "I don't know",
    "I cannot",
    "I'm not able",
    "I don't have",
    "I apologize",
    "Sorry, I",
    "I'm sorry",
    "I'm unable",
    "I cannot help",
    "I'm not capable",
    "I don't understand",
];

const REJECTION_MESSAGE: &str = "This system only handles mathematics-related questions. \
Please ask a valid math problem such as an equation, derivative, integral, or Laplace transform.";

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Guardrail word lists and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Minimum length of the trimmed question, in characters.
    pub min_length: usize,
    /// Case-insensitive substrings that veto a question.
    pub banned_topics: Vec<String>,
    /// Whole-word keywords that admit a question.
    pub math_keywords: Vec<String>,
    /// Hedging phrases deleted from outgoing answers.
    pub hallucination_markers: Vec<String>,
    /// Message returned on rejection.
    pub rejection_message: String,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            banned_topics: owned(BANNED_TOPICS),
            math_keywords: owned(MATH_KEYWORDS),
            hallucination_markers: owned(HALLUCINATION_MARKERS),
            rejection_message: REJECTION_MESSAGE.to_string(),
        }
    }
}

/// Top-level router configuration.
///
/// ```toml
/// kb_threshold = 0.85
/// collaborator_timeout_ms = 5000
/// identity_table = "identities.json"
///
/// [guardrail]
/// min_length = 2
/// banned_topics = ["weapon"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// KB hits are accepted only when their confidence is strictly above this.
    pub kb_threshold: f32,
    /// Upper bound on any single collaborator call.
    pub collaborator_timeout_ms: u64,
    /// Optional identity table file; the bundled table is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_table: Option<PathBuf>,
    /// Guardrail settings.
    pub guardrail: GuardrailConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            kb_threshold: DEFAULT_KB_THRESHOLD,
            collaborator_timeout_ms: DEFAULT_COLLABORATOR_TIMEOUT_MS,
            identity_table: None,
            guardrail: GuardrailConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed TOML, `ConfigError::Invalid` for
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            format: "toml",
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`RouterConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded router config");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kb_threshold.is_nan() || !(0.0..=1.0).contains(&self.kb_threshold) {
            return Err(ConfigError::invalid(
                "kb_threshold",
                format!("{} is outside [0, 1]", self.kb_threshold),
            ));
        }
        if self.collaborator_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "collaborator_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.guardrail.min_length == 0 {
            return Err(ConfigError::invalid("guardrail.min_length", "must be at least 1"));
        }
        if self.guardrail.rejection_message.trim().is_empty() {
            return Err(ConfigError::invalid(
                "guardrail.rejection_message",
                "cannot be empty",
            ));
        }
        Ok(())
    }

    /// Collaborator timeout as a `Duration`.
    #[must_use]
    pub const fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}
