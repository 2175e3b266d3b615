//! Static identity overrides.
//!
//! A small ordered list of `(pattern, precomputed answer)` pairs for known
//! recurring questions that the symbolic solver does not cover (Laplace
//! transforms of elementary functions). It is a finite override layer, not
//! general knowledge: a question matches when its lowercased normalized form
//! contains the lowercased normalized pattern, and the first match wins.
//! An occurrence only counts when it is not the prefix of a longer word,
//! number or power: `t**2` does not match inside `t**25` or `t**2.5`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::error::ConfigError;
use crate::normalize::normalize;
use crate::result::{ResultSource, SolveResult};

/// The table compiled into the crate.
const BUNDLED: &str = include_str!("../data/identities.json");

/// One override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEntry {
    /// Substring to look for in the question.
    pub pattern: String,
    /// Human-readable answer.
    pub answer: String,
    /// Machine-oriented solution text.
    pub solution: String,
    /// Explanation steps.
    #[serde(default)]
    pub steps: Vec<String>,
}

impl IdentityEntry {
    /// The precomputed result, always at full confidence.
    #[must_use]
    pub fn to_result(&self) -> SolveResult {
        SolveResult {
            answer: self.answer.clone(),
            steps: self.steps.clone(),
            solution: self.solution.clone(),
            confidence: Confidence::ONE,
            source: ResultSource::IdentityTable,
        }
    }
}

/// True when the text after a pattern occurrence does not extend it.
fn ends_at_boundary(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_alphanumeric() || c == '_' => false,
        Some('*' | '^' | '/') => false,
        Some('.') => !chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => true,
    }
}

/// Ordered identity overrides with normalized match keys.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    entries: Vec<(String, IdentityEntry)>,
}

impl IdentityTable {
    /// Builds a table, preserving entry order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a pattern is blank.
    pub fn from_entries(entries: Vec<IdentityEntry>) -> Result<Self, ConfigError> {
        let mut keyed = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let key = normalize(&entry.pattern).to_lowercase();
            if key.is_empty() {
                return Err(ConfigError::invalid(
                    format!("identity_table[{index}].pattern"),
                    "cannot be empty",
                ));
            }
            keyed.push((key, entry));
        }
        Ok(Self { entries: keyed })
    }

    /// Parses a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed JSON.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let entries: Vec<IdentityEntry> =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse {
                format: "json",
                message: e.to_string(),
            })?;
        Self::from_entries(entries)
    }

    /// Reads a JSON table from disk.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), entries = table.len(), "loaded identity table");
        Ok(table)
    }

    /// The table shipped with the crate.
    ///
    /// # Errors
    ///
    /// Only if the bundled file is malformed.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_json_str(BUNDLED)
    }

    /// First entry whose pattern occurs in `normalized`, case-insensitively
    /// and ending at a term boundary.
    #[must_use]
    pub fn lookup(&self, normalized: &str) -> Option<&IdentityEntry> {
        let haystack = normalized.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| {
                haystack
                    .match_indices(key.as_str())
                    .any(|(at, _)| ends_at_boundary(&haystack[at + key.len()..]))
            })
            .map(|(_, entry)| entry)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_table_loads() {
        let table = IdentityTable::bundled().unwrap();
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_lookup_is_case_insensitive_substring() {
        let table = IdentityTable::bundled().unwrap();
        let q = normalize("What is the LAPLACE transform of t^3?");
        let entry = table.lookup(&q).unwrap();
        assert_eq!(entry.solution, "L{t^3} = 3! / s^4 = 6 / s^4");

        let result = entry.to_result();
        assert_eq!(result.confidence, Confidence::ONE);
        assert_eq!(result.source, ResultSource::IdentityTable);
    }

    #[test]
    fn test_superscript_phrasing_matches() {
        let table = IdentityTable::bundled().unwrap();
        let q = normalize("Laplace transform of t⁴");
        assert!(table.lookup(&q).unwrap().answer.contains("24 / s^5"));
    }

    #[test]
    fn test_miss() {
        let table = IdentityTable::bundled().unwrap();
        assert!(table.lookup(&normalize("laplace transform of t^7")).is_none());
    }

    #[test]
    fn test_longer_exponent_does_not_match() {
        let table = IdentityTable::bundled().unwrap();
        assert!(table.lookup("laplace transform of t**25").is_none());
        assert!(table.lookup(&normalize("Laplace transform of t^20?")).is_none());
        assert!(table.lookup("laplace transform of t**2.5").is_none());
        assert!(table.lookup("laplace transform of t**2*t").is_none());
        assert!(table.lookup("laplace transform of sin(t)s").is_none());
    }

    #[test]
    fn test_boundary_allows_trailing_punctuation() {
        let table = IdentityTable::bundled().unwrap();
        assert!(table.lookup("laplace transform of t**2.").is_some());
        assert!(table.lookup("the laplace transform of t**2, please").is_some());
        let later = "laplace transform of t**25 or laplace transform of t**2";
        assert_eq!(table.lookup(later).unwrap().solution, "L{t^2} = 2! / s^3 = 2 / s^3");
    }

    #[test]
    fn test_first_match_wins() {
        let table = IdentityTable::from_json_str(
            r#"[
                {"pattern": "foo", "answer": "first", "solution": "1"},
                {"pattern": "foo bar", "answer": "second", "solution": "2"}
            ]"#,
        )
        .unwrap();
        assert_eq!(table.lookup("foo bar").unwrap().answer, "first");
    }

    #[test]
    fn test_blank_pattern_rejected() {
        let err = IdentityTable::from_json_str(r#"[{"pattern": " ", "answer": "a", "solution": "b"}]"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"pattern": "golden ratio", "answer": "phi", "solution": "(1 + sqrt(5))/2"}}]"#)
            .unwrap();
        let table = IdentityTable::load(file.path()).unwrap();
        assert!(table.lookup("what is the golden ratio").is_some());
    }
}
