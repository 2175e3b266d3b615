//! Input admission and output sanitization.
//!
//! The guardrail sits at the request boundary. `validate` decides whether a
//! raw question is a math question at all; `sanitize` strips hedging phrases
//! from answer text before it reaches a caller. Neither call fails.

use regex::{Regex, RegexBuilder};

use crate::config::GuardrailConfig;
use crate::error::ConfigError;
use crate::result::ValidationVerdict;

/// Characters that count as math content on their own.
const MATH_SYMBOLS: &[char] = &[
    '+', '-', '*', '/', '=', '^', '(', ')', 'π', '√', '∑', '∫', '∞',
];

/// Variables and function names that count as math content when they stand
/// alone as words.
const MATH_TOKENS: &str = r"(?i)\b(?:x|y|z|sin|cos|tan|cot|sec|csc|log|ln|exp|sqrt)\b";

/// Digits, variables, operators, parentheses and whitespace only.
const SIMPLE_EXPRESSION: &str = r"^[0-9xyzXYZ+\-*/^=\s()]+$";

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::invalid("guardrail", e.to_string()))
}

fn alternation(words: &[String], whole_word: bool) -> Result<Option<Regex>, ConfigError> {
    let words: Vec<String> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if words.is_empty() {
        return Ok(None);
    }
    let body = words.join("|");
    let pattern = if whole_word {
        format!(r"\b(?:{body})\b")
    } else {
        format!("(?:{body})")
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| ConfigError::invalid("guardrail", e.to_string()))
}

/// Admit/reject and sanitize primitives, compiled from a `GuardrailConfig`.
#[derive(Debug, Clone)]
pub struct GuardrailValidator {
    min_length: usize,
    banned: Vec<String>,
    keywords: Option<Regex>,
    markers: Option<Regex>,
    tokens: Regex,
    simple_expression: Regex,
    whitespace: Regex,
    rejection_message: String,
}

impl GuardrailValidator {
    /// Compiles the configured word lists.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` if a list does not compile to a regex.
    pub fn new(config: &GuardrailConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            min_length: config.min_length,
            banned: config
                .banned_topics
                .iter()
                .map(|b| b.trim().to_lowercase())
                .filter(|b| !b.is_empty())
                .collect(),
            keywords: alternation(&config.math_keywords, true)?,
            markers: alternation(&config.hallucination_markers, false)?,
            tokens: compile(MATH_TOKENS)?,
            simple_expression: compile(SIMPLE_EXPRESSION)?,
            whitespace: compile(r"\s+")?,
            rejection_message: config.rejection_message.clone(),
        })
    }

    /// The fixed user-facing rejection message.
    #[must_use]
    pub fn rejection_message(&self) -> &str {
        &self.rejection_message
    }

    /// Decides whether `question` is admitted.
    ///
    /// Order matters: length, then banned topics, then math content. A banned
    /// token vetoes the question even when it is full of math symbols.
    #[must_use]
    pub fn validate(&self, question: &str) -> ValidationVerdict {
        let trimmed = question.trim();
        if trimmed.chars().count() < self.min_length {
            return ValidationVerdict::reject(self.rejection_message.clone());
        }

        let lowered = trimmed.to_lowercase();
        if let Some(banned) = self.banned.iter().find(|b| lowered.contains(b.as_str())) {
            tracing::debug!(token = %banned, "guardrail: banned topic");
            return ValidationVerdict::reject(self.rejection_message.clone());
        }

        if self.has_math_content(trimmed) {
            ValidationVerdict::admit()
        } else {
            ValidationVerdict::reject(self.rejection_message.clone())
        }
    }

    /// Boolean form of `validate`.
    #[must_use]
    pub fn is_admitted(&self, question: &str) -> bool {
        self.validate(question).admitted
    }

    fn has_math_content(&self, trimmed: &str) -> bool {
        if self.keywords.as_ref().is_some_and(|k| k.is_match(trimmed)) {
            return true;
        }
        if trimmed
            .chars()
            .any(|c| c.is_ascii_digit() || MATH_SYMBOLS.contains(&c))
        {
            return true;
        }
        if self.tokens.is_match(trimmed) {
            return true;
        }
        self.simple_expression.is_match(trimmed)
    }

    /// Deletes hedging phrases (case-insensitive), collapses whitespace and
    /// trims. Idempotent: the passes repeat until the text stops changing,
    /// so a deletion that glues a new marker together is caught too.
    #[must_use]
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = self.sanitize_once(text);
        loop {
            let next = self.sanitize_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn sanitize_once(&self, text: &str) -> String {
        let stripped = match &self.markers {
            Some(markers) => markers.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };
        self.whitespace
            .replace_all(&stripped, " ")
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> GuardrailValidator {
        GuardrailValidator::new(&GuardrailConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_short() {
        let g = guard();
        assert!(!g.is_admitted(""));
        assert!(!g.is_admitted("   "));
        assert!(!g.is_admitted("x"));
        assert!(g.is_admitted("x+"));
    }

    #[test]
    fn test_admits_keyword() {
        let g = guard();
        assert!(g.is_admitted("what is the Laplace transform of a step"));
        assert!(g.is_admitted("please simplify this"));
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        let g = guard();
        // "limits" is not the keyword "limit" and carries no other math content.
        assert!(!g.is_admitted("speed limits apply here"));
    }

    #[test]
    fn test_admits_symbols() {
        let g = guard();
        assert!(g.is_admitted("2+2"));
        assert!(g.is_admitted("∫ sin"));
        assert!(g.is_admitted("what about sin of a"));
    }

    #[test]
    fn test_rejects_non_math() {
        let g = guard();
        assert!(!g.is_admitted("what is the weather today"));
        assert!(!g.is_admitted("asdkjfh"));
    }

    #[test]
    fn test_banned_topic_wins_over_math() {
        let g = guard();
        let v = g.validate("solve x + 2 = 5 with a weapon");
        assert!(!v.admitted);
        assert_eq!(v.message.as_deref(), Some(g.rejection_message()));
        assert!(!g.is_admitted("ELECTION 2+2"));
    }

    #[test]
    fn test_admission_has_no_message() {
        assert_eq!(guard().validate("x + 1 = 2").message, None);
    }

    #[test]
    fn test_sanitize_removes_markers() {
        let g = guard();
        assert_eq!(g.sanitize("I'm not sure, but   x = 3"), ", but x = 3");
        assert_eq!(g.sanitize("i APOLOGIZE the answer is 4"), "the answer is 4");
        assert_eq!(g.sanitize(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let g = guard();
        for text in [
            "I'm I'm not sure not sure x",
            "I'm  not sure  x = 2",
            "  plain\t\ttext \n",
            "Sorry, Sorry, I I the end",
        ] {
            let once = g.sanitize(text);
            assert_eq!(g.sanitize(&once), once, "input: {text:?}");
        }
    }

    #[test]
    fn test_custom_lists() {
        let config = GuardrailConfig {
            banned_topics: vec!["casino".to_string()],
            math_keywords: Vec::new(),
            ..GuardrailConfig::default()
        };
        let g = GuardrailValidator::new(&config).unwrap();
        assert!(!g.is_admitted("casino odds 2/3"));
        assert!(g.is_admitted("weapon 2+2"));
        assert!(!g.is_admitted("integrate something"));
    }
}
